pub mod automation;
pub mod morph;
pub mod probability;
pub mod section;

pub use automation::*;
pub use morph::*;
pub use probability::*;
pub use section::*;
