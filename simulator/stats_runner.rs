// Stats Runner - Load trace YAML files and print their statistics
//
// Usage:
//   cargo run --bin stats_runner traces/run.yaml
//   cargo run --bin stats_runner traces/  (runs all .yaml files in directory)

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ec_stats::{TraceError, TraceFile};
use log::{error, info, LevelFilter};
use simple_logger::SimpleLogger;

fn main() {
    if let Err(e) = SimpleLogger::new().with_level(LevelFilter::Info).env().init() {
        eprintln!("Failed to initialise logger: {}", e);
    }

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <trace.yaml | directory/>", args[0]);
        eprintln!("\nExamples:");
        eprintln!("  {} traces/run.yaml", args[0]);
        eprintln!("  {} traces/", args[0]);
        std::process::exit(1);
    }

    let path = Path::new(&args[1]);

    let traces = if path.is_file() {
        vec![path.to_path_buf()]
    } else if path.is_dir() {
        find_traces(path)
    } else {
        eprintln!("Error: Path does not exist: {}", path.display());
        std::process::exit(1);
    };

    if traces.is_empty() {
        eprintln!("No .yaml files found in {}", path.display());
        std::process::exit(1);
    }

    let mut failed = 0;
    for (i, trace_path) in traces.iter().enumerate() {
        info!("{}/{} {}", i + 1, traces.len(), trace_path.display());
        if let Err(e) = run_trace_file(trace_path) {
            error!("{}: {}", trace_path.display(), e);
            failed += 1;
        }
    }

    if failed > 0 {
        eprintln!("{} of {} trace(s) failed", failed, traces.len());
        std::process::exit(1);
    }
}

fn find_traces(dir: &Path) -> Vec<PathBuf> {
    let mut traces = Vec::new();

    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            let ext = path.extension().and_then(|s| s.to_str());
            if ext == Some("yaml") || ext == Some("yml") {
                traces.push(path);
            }
        }
    }

    traces.sort();
    traces
}

fn run_trace_file(path: &Path) -> Result<(), TraceError> {
    let trace = TraceFile::load(path)?;

    if let Some(ref name) = trace.meta.name {
        println!("\n{}", name);
    }
    if let Some(ref desc) = trace.meta.description {
        println!("{}", desc);
    }

    let stats = trace.stats()?;
    stats.print_summary();

    Ok(())
}
