//! FlowRunner CLI Entry Point
//!
//! Validates and smoke-runs workflow layouts from the command line. Every
//! action id referenced by the layout is bound to a tracing stub, so a
//! layout can be exercised end to end before any real actions exist.
//!
//! # Usage
//!
//! ```bash
//! # Smoke-run a layout with stub actions
//! flowrunner workflow.json
//!
//! # Validate only
//! flowrunner workflow.json --check
//!
//! # Several runs over a larger pool
//! flowrunner workflow.yaml --workers 8 --runs 3
//! ```

use std::env;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, error, info};

use flowrunner::workflow::parser::load_layout;
use flowrunner::{ActionRegistry, Engine, RunStatus, WorkerPool, APP_NAME, VERSION};

/// Default number of pool workers.
const DEFAULT_WORKERS: usize = 4;

/// Default per-run completion wait.
const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Command-line configuration parsed from arguments.
#[derive(Debug)]
struct Config {
    layout_path: Option<String>,
    check_only: bool,
    workers: usize,
    runs: usize,
    timeout_ms: u64,
    verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            layout_path: None,
            check_only: false,
            workers: DEFAULT_WORKERS,
            runs: 1,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            verbose: false,
        }
    }
}

/// Context for stub runs: lists the actions that executed.
struct SimContext {
    executed: Mutex<Vec<String>>,
}

impl SimContext {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            executed: Mutex::new(Vec::new()),
        })
    }

    fn record(&self, action: &str) {
        self.executed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(action.to_string());
    }

    fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Prints the application banner with version information.
fn print_banner() {
    println!();
    println!("{} v{}", APP_NAME, VERSION);
    println!("Tree-Structured Workflow Execution Engine");
    println!();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: flowrunner [OPTIONS] <LAYOUT_FILE>");
    println!();
    println!("Arguments:");
    println!("  <LAYOUT_FILE>    Path to a workflow layout (JSON or YAML)");
    println!();
    println!("Options:");
    println!("  --check          Validate the layout without running it");
    println!("  --workers N      Worker pool size (default: {})", DEFAULT_WORKERS);
    println!("  --runs N         Number of runs to execute (default: 1)");
    println!(
        "  --timeout-ms T   Per-run completion wait in ms (default: {})",
        DEFAULT_TIMEOUT_MS
    );
    println!("  --verbose        Enable debug logging");
    println!("  --help           Show this help message");
    println!("  --version        Show version information");
    println!();
    println!("Examples:");
    println!("  flowrunner pipeline.json");
    println!("  flowrunner pipeline.yaml --check");
    println!("  flowrunner pipeline.json --workers 8 --runs 3");
}

/// Parses command-line arguments into a Config struct.
fn parse_arguments(args: &[String]) -> Result<Config, String> {
    let mut config = Config::default();
    let mut i = 1; // Skip program name

    while i < args.len() {
        let arg = &args[i];

        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("{} {}", APP_NAME, VERSION);
                std::process::exit(0);
            }
            "--check" => {
                config.check_only = true;
            }
            "--verbose" | "-v" => {
                config.verbose = true;
            }
            "--workers" => {
                i += 1;
                if i >= args.len() {
                    return Err("--workers requires a number argument".to_string());
                }
                config.workers = args[i]
                    .parse()
                    .map_err(|_| format!("Invalid workers value: {}", args[i]))?;
            }
            "--runs" => {
                i += 1;
                if i >= args.len() {
                    return Err("--runs requires a number argument".to_string());
                }
                config.runs = args[i]
                    .parse()
                    .map_err(|_| format!("Invalid runs value: {}", args[i]))?;
            }
            "--timeout-ms" => {
                i += 1;
                if i >= args.len() {
                    return Err("--timeout-ms requires a number argument".to_string());
                }
                config.timeout_ms = args[i]
                    .parse()
                    .map_err(|_| format!("Invalid timeout value: {}", args[i]))?;
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            _ => {
                if config.layout_path.is_some() {
                    return Err(format!("Unexpected argument: {}", arg));
                }
                config.layout_path = Some(arg.clone());
            }
        }
        i += 1;
    }

    Ok(config)
}

/// Builds a registry binding every referenced action id to a tracing stub.
fn stub_registry(action_ids: &[&str]) -> ActionRegistry<SimContext> {
    let mut registry = ActionRegistry::new();
    for id in action_ids {
        let name = id.to_string();
        registry.register(name.clone(), move || {
            let name = name.clone();
            Box::new(move |ctx: &SimContext| {
                info!("[STUB] action {}", name);
                ctx.record(&name);
            })
        });
    }
    registry
}

/// Main application entry point.
fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    // Parse arguments
    let config = parse_arguments(&args).map_err(|e| {
        eprintln!("Error: {}", e);
        eprintln!();
        print_usage();
        e
    })?;

    // Setup logging
    setup_logging(config.verbose);

    // Print banner
    print_banner();

    let Some(layout_path) = config.layout_path else {
        print_usage();
        return Err("No layout file specified".to_string().into());
    };

    // Load layout
    let layout = load_layout(&layout_path).map_err(|e| {
        error!("Failed to load layout: {}", e);
        format!("Could not load layout from '{}': {}", layout_path, e)
    })?;

    let action_ids = layout.action_ids();
    info!(
        "Layout '{}': {} nodes, {} action references",
        layout.name,
        layout.node_count(),
        action_ids.len()
    );

    // Bind every referenced id to a stub and build the workflow
    let registry = stub_registry(&action_ids);
    let pool = Arc::new(WorkerPool::new(config.workers));
    let mut engine = Engine::new(layout, registry, pool);
    engine.init()?;

    if config.check_only {
        println!("Layout OK: '{}' is valid and fully resolvable", engine.name());
        return Ok(());
    }

    // Execute runs
    for _ in 0..config.runs {
        let context = SimContext::new();
        let handle = engine.run(Arc::clone(&context))?;
        handle.wait_timeout(Duration::from_millis(config.timeout_ms));

        if !handle.is_done() {
            return Err(format!(
                "Run {} did not complete within {} ms",
                handle.seq_id(),
                config.timeout_ms
            )
            .into());
        }

        let status = handle.status();
        let executed = context.executed();
        debug!("Run {} executed: {:?}", handle.seq_id(), executed);
        println!();
        println!(
            "Run {}: {:?}, {} actions executed in {:.2?}",
            handle.seq_id(),
            status,
            executed.len(),
            handle.duration().unwrap_or_default()
        );
        println!("{}", handle.render_timeline());

        if status != RunStatus::Exited {
            return Err(format!("Run {} ended in status {:?}", handle.seq_id(), status).into());
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("flowrunner")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_parse_defaults() {
        let config = parse_arguments(&args(&["layout.json"])).unwrap();
        assert_eq!(config.layout_path.as_deref(), Some("layout.json"));
        assert!(!config.check_only);
        assert_eq!(config.workers, DEFAULT_WORKERS);
        assert_eq!(config.runs, 1);
        assert!(!config.verbose);
    }

    #[test]
    fn test_parse_options() {
        let config = parse_arguments(&args(&[
            "layout.yaml",
            "--check",
            "--workers",
            "8",
            "--runs",
            "3",
            "--timeout-ms",
            "500",
            "--verbose",
        ]))
        .unwrap();
        assert!(config.check_only);
        assert_eq!(config.workers, 8);
        assert_eq!(config.runs, 3);
        assert_eq!(config.timeout_ms, 500);
        assert!(config.verbose);
    }

    #[test]
    fn test_parse_rejects_unknown_option() {
        assert!(parse_arguments(&args(&["--frobnicate"])).is_err());
    }

    #[test]
    fn test_parse_rejects_extra_positional() {
        assert!(parse_arguments(&args(&["a.json", "b.json"])).is_err());
    }

    #[test]
    fn test_parse_rejects_missing_option_value() {
        assert!(parse_arguments(&args(&["layout.json", "--workers"])).is_err());
    }

    #[test]
    fn test_stub_registry_covers_all_ids() {
        let registry = stub_registry(&["a", "b", "c"]);
        assert_eq!(registry.len(), 3);
        assert!(registry.contains("b"));
    }
}
