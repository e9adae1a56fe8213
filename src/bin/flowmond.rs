//! flowmond - Metrics collector daemon.
//!
//! Samples the registered collectors on a fixed cadence, converts their
//! counters into rates over a sliding window and writes one JSON sample per
//! sink interval to stdout.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(not(target_os = "linux"))]
use flowmon::collector::MockFs;
#[cfg(target_os = "linux")]
use flowmon::collector::RealFs;
use flowmon::collector::{CollectorRegistry, mock, procfs};
use flowmon::ring::ValueRingFactory;
use flowmon::source::{CollectorSource, ConsoleSink, MetricFilter};

/// Metrics collector daemon.
#[derive(Parser)]
#[command(name = "flowmond", about = "Metrics collector daemon", version)]
struct Args {
    /// Interval between collector updates, in milliseconds.
    #[arg(long, default_value = "500", value_parser = clap::value_parser!(u64).range(1..))]
    collect_interval_ms: u64,

    /// Interval between emitted samples, in milliseconds.
    #[arg(long, default_value = "500", value_parser = clap::value_parser!(u64).range(1..))]
    sink_interval_ms: u64,

    /// Look-back window for rate computation, in milliseconds.
    #[arg(long, default_value = "1000")]
    window_ms: u64,

    /// Path to /proc filesystem.
    #[arg(long, default_value = "/proc")]
    proc_path: PathBuf,

    /// Only emit metrics containing this substring (repeatable).
    #[arg(long, value_name = "SUBSTRING")]
    include: Vec<String>,

    /// Do not emit metrics containing this substring (repeatable).
    #[arg(long, value_name = "SUBSTRING")]
    exclude: Vec<String>,

    /// Only emit metrics matching this regex (repeatable).
    #[arg(long, value_name = "REGEX")]
    include_regex: Vec<String>,

    /// Only emit a basic subset of metrics (cpu, load/1, running and blocked processes).
    #[arg(long)]
    basic: bool,

    /// Disable the built-in metric excludes.
    #[arg(short, long)]
    all: bool,

    /// Print all available metrics and exit.
    #[arg(long)]
    metrics: bool,

    /// Register only the synthetic mock collector.
    #[arg(long)]
    no_procfs: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Logs go to stderr so that samples on stdout stay machine-readable.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["flowmond", "flowmon"] {
        match format!("{}={}", target, level).parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => eprintln!("invalid log directive for {}: {}", target, e),
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Builds the metric filter from the command line.
fn build_filter(args: &Args) -> Result<MetricFilter, regex::Error> {
    let mut filter = if args.all {
        MetricFilter::new()
    } else {
        MetricFilter::with_defaults()
    };
    if args.basic {
        filter = filter.with_basic();
    }
    for pattern in &args.include_regex {
        filter = filter.include(pattern)?;
    }
    for substring in &args.include {
        filter = filter.include_substring(substring);
    }
    for substring in &args.exclude {
        filter = filter.exclude_substring(substring);
    }
    Ok(filter)
}

/// Registers the built-in collectors.
fn build_registry(args: &Args, factory: &ValueRingFactory) -> CollectorRegistry {
    let mut registry = CollectorRegistry::new();
    mock::register(&mut registry, factory);

    if args.no_procfs {
        debug!("Procfs collectors: disabled");
    } else {
        #[cfg(target_os = "linux")]
        let fs = RealFs::new();
        #[cfg(not(target_os = "linux"))]
        let fs = MockFs::typical_system();
        procfs::register(&mut registry, factory, fs, &args.proc_path);
    }

    registry
}

fn main() -> ExitCode {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    let filter = match build_filter(&args) {
        Ok(filter) => filter,
        Err(e) => {
            error!("Invalid metric filter: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let collect_interval = Duration::from_millis(args.collect_interval_ms);
    let sink_interval = Duration::from_millis(args.sink_interval_ms);
    let window = Duration::from_millis(args.window_ms);
    let factory = ValueRingFactory::new(window, collect_interval);

    let registry = build_registry(&args, &factory);
    let source = CollectorSource::new(registry, collect_interval, sink_interval).with_filter(filter);

    if args.metrics {
        let mut stdout = std::io::stdout().lock();
        return match source.print_metrics(&mut stdout) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("Failed to print metrics: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    info!("flowmond {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Config: collect={}ms, sink={}ms, window={}ms, ring={} samples, proc={}",
        args.collect_interval_ms,
        args.sink_interval_ms,
        args.window_ms,
        factory.length(),
        args.proc_path.display()
    );

    // Setup graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    let mut sink = ConsoleSink::stdout();
    if let Err(e) = source.run(&mut sink, running) {
        error!("Collection failed: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Shutdown complete");
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["flowmond"]);
        assert_eq!(args.collect_interval_ms, 500);
        assert_eq!(args.sink_interval_ms, 500);
        assert_eq!(args.window_ms, 1000);
        assert_eq!(args.proc_path, PathBuf::from("/proc"));
        assert!(!args.all);
        assert!(!args.basic);
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(Args::try_parse_from(["flowmond", "--collect-interval-ms", "0"]).is_err());
    }

    #[test]
    fn test_build_filter() {
        let args = Args::parse_from(["flowmond", "--exclude", "load"]);
        let filter = build_filter(&args).unwrap();
        assert!(!filter.accepts("mock"));
        assert!(!filter.accepts("load/1"));
        assert!(filter.accepts("cpu"));

        let args = Args::parse_from(["flowmond", "-a", "--include", "mock"]);
        let filter = build_filter(&args).unwrap();
        assert!(filter.accepts("mock"));
        assert!(!filter.accepts("cpu"));

        let args = Args::parse_from(["flowmond", "--basic"]);
        let filter = build_filter(&args).unwrap();
        assert!(filter.accepts("cpu"));
        assert!(filter.accepts("procs/blocked"));
        assert!(!filter.accepts("load/5"));
        assert!(!filter.accepts("mock"));

        let args = Args::parse_from(["flowmond", "--basic", "--include", "ctxt"]);
        let filter = build_filter(&args).unwrap();
        assert!(filter.accepts("ctxt"));
        assert!(filter.accepts("load/1"));

        let args = Args::parse_from(["flowmond", "--include-regex", "("]);
        assert!(build_filter(&args).is_err());
    }

    #[test]
    fn test_build_registry() {
        let factory = ValueRingFactory::default();
        let args = Args::parse_from(["flowmond", "--no-procfs"]);
        assert_eq!(build_registry(&args, &factory).names(), vec!["mock"]);

        let args = Args::parse_from(["flowmond"]);
        assert_eq!(
            build_registry(&args, &factory).names(),
            vec!["mock", "stat", "load"]
        );
    }
}
