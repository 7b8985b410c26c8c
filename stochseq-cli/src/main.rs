use std::fs::File;
use std::process;

use stochseq_core::config::Config;
use stochseq_core::{Engine, TickReport};
use stochseq_types::{Easing, InstrumentRole, Step};

const USAGE: &str = "\
usage: stochseq [options]

  --steps N            pattern length (default from config)
  --ticks N            steps to play (default: two loops)
  --seed X             override the random seed
  --preset FILE        import a JSON preset before playing
  --export             print the current preset as JSON and exit
  --morph SRC:TGT[:DURATION[:EASING]]
                       morph between two sections while playing
  --section NAME       evaluate every step in NAME instead of the layout
  --values             print automation values for each step
  -v, --verbose        debug logging
";

fn init_logging(verbose: bool) {
    use simplelog::*;

    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };

    let log_path = dirs::config_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("stochseq")
        .join("stochseq.log");

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file_logger: Option<Box<dyn SharedLogger>> = File::create(&log_path)
        .ok()
        .map(|file| WriteLogger::new(log_level, simplelog::Config::default(), file) as Box<dyn SharedLogger>);
    let term_logger: Box<dyn SharedLogger> = TermLogger::new(
        log_level,
        simplelog::Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );

    let loggers: Vec<Box<dyn SharedLogger>> = file_logger.into_iter().chain([term_logger]).collect();
    if CombinedLogger::init(loggers).is_err() {
        eprintln!("stochseq: logger already initialized");
    }

    log::info!("stochseq starting (log level: {:?})", log_level);
}

fn flag_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn parse_flag<T: std::str::FromStr>(args: &[String], name: &str) -> Option<T> {
    let raw = flag_value(args, name)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => fail(&format!("invalid value for {}: '{}'", name, raw)),
    }
}

fn fail(message: &str) -> ! {
    eprintln!("stochseq: {}", message);
    process::exit(1);
}

struct MorphRequest {
    source: String,
    target: String,
    duration: u32,
    easing: Easing,
}

/// `SRC:TGT[:DURATION[:EASING]]`
fn parse_morph(spec: &str) -> Option<MorphRequest> {
    let mut parts = spec.split(':');
    let source = parts.next().filter(|s| !s.is_empty())?.to_string();
    let target = parts.next().filter(|s| !s.is_empty())?.to_string();
    let duration = match parts.next() {
        Some(d) => d.parse().ok()?,
        None => 4,
    };
    let easing = match parts.next() {
        Some(id) => Easing::from_id(id)?,
        None => Easing::default(),
    };
    Some(MorphRequest {
        source,
        target,
        duration,
        easing,
    })
}

fn load_preset(engine: &mut Engine, path: &str) {
    let contents = std::fs::read_to_string(path)
        .unwrap_or_else(|e| fail(&format!("cannot read {}: {}", path, e)));
    let data: serde_json::Value = serde_json::from_str(&contents)
        .unwrap_or_else(|e| fail(&format!("{} is not valid JSON: {}", path, e)));
    match engine.import_preset(&data) {
        Ok(report) => {
            if !report.is_clean() {
                eprintln!(
                    "stochseq: preset loaded with {} defaulted and {} skipped fields",
                    report.defaulted.len(),
                    report.skipped.len()
                );
            }
        }
        Err(e) => fail(&format!("preset rejected: {}", e)),
    }
}

fn cell(report: &TickReport, role: InstrumentRole) -> char {
    match report.decision(role) {
        None => ' ',
        Some(d) if !d.triggered => '.',
        Some(d) if d.is_accent => 'X',
        Some(d) if d.is_ghost => 'o',
        Some(_) => 'x',
    }
}

fn print_header(engine: &Engine) {
    let roles: String = InstrumentRole::ALL
        .iter()
        .map(|r| format!("{:>5}", r.key()))
        .collect();
    println!(
        "seed {}  steps {}  quantization {}",
        engine.trigger().seed(),
        engine.step_count(),
        engine.trigger().quantization()
    );
    println!("step  section   {}", roles);
}

fn print_tick(report: &TickReport, show_values: bool) {
    let cells: String = InstrumentRole::ALL
        .iter()
        .map(|r| format!("{:>5}", cell(report, *r)))
        .collect();
    println!(
        "{:>4}  {:<8}  {}",
        report.step,
        report.section.as_deref().unwrap_or("-"),
        cells
    );
    if show_values {
        let values: Vec<String> = report
            .automation
            .iter()
            .map(|(id, v)| format!("{}={:.2}", id, v))
            .collect();
        println!("      {}", values.join(" "));
    }
    if let Some(done) = &report.morph_completed {
        println!("      morph complete: {} -> {}", done.source, done.target);
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print!("{}", USAGE);
        return;
    }
    let verbose = args.iter().any(|a| a == "--verbose" || a == "-v");
    init_logging(verbose);

    let mut engine = Engine::new(Config::load());

    if let Some(steps) = parse_flag::<usize>(&args, "--steps") {
        engine.set_step_count(steps);
    }
    if let Some(seed) = parse_flag::<f64>(&args, "--seed") {
        // Default curves are drawn from the seed
        engine.trigger_mut().set_seed(seed);
        engine.trigger_mut().reset_to_defaults();
    }
    if let Some(path) = flag_value(&args, "--preset") {
        load_preset(&mut engine, path);
    }

    if args.iter().any(|a| a == "--export") {
        match serde_json::to_string_pretty(&engine.export_preset()) {
            Ok(text) => println!("{}", text),
            Err(e) => fail(&format!("cannot serialize preset: {}", e)),
        }
        return;
    }

    if let Some(spec) = flag_value(&args, "--morph") {
        let request = parse_morph(spec)
            .unwrap_or_else(|| fail(&format!("invalid morph '{}', expected SRC:TGT[:DURATION[:EASING]]", spec)));
        if let Err(e) = engine.start_morph(&request.source, &request.target, request.duration, request.easing) {
            fail(&format!("cannot start morph: {}", e));
        }
    }

    let section = flag_value(&args, "--section").map(str::to_string);
    let show_values = args.iter().any(|a| a == "--values");
    let ticks = parse_flag::<Step>(&args, "--ticks").unwrap_or(engine.step_count() as Step * 2);

    print_header(&engine);
    let mut fired = [0usize; InstrumentRole::ALL.len()];
    for step in 0..ticks {
        let report = engine.tick(step, section.as_deref());
        for role in report.triggered() {
            if let Some(i) = InstrumentRole::ALL.iter().position(|r| *r == role) {
                fired[i] += 1;
            }
        }
        print_tick(&report, show_values);
    }

    let summary: Vec<String> = InstrumentRole::ALL
        .iter()
        .zip(fired)
        .map(|(role, count)| format!("{} {}", role.key(), count))
        .collect();
    println!("triggers over {} steps: {}", ticks, summary.join(", "));
}
