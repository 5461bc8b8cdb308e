mod commands;

use clap::{ArgGroup, Parser};
use commands::Format;
use roost_config::{Config, DEFAULT_CONFIG_PATH};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "roost",
    version,
    about = "Register this host with the Roost fleet inventory service",
    group(ArgGroup::new("action").required(true).args(["register", "unregister", "checkin"]))
)]
struct Cli {
    /// Register the host with the inventory service.
    #[arg(long)]
    register: bool,

    /// Unregister the host and remove local registration state.
    #[arg(long)]
    unregister: bool,

    /// Send a light check-in message with fresh canonical facts.
    #[arg(long)]
    checkin: bool,

    /// Output format.
    #[arg(long, value_enum, default_value_t = Format::Human)]
    format: Format,

    /// Path to the client configuration file.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false)]
    trace: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("ROOST_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .init();

    let config = match Config::load_or_default(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(commands::EXIT_FAILURE);
        }
    };

    let code = if cli.register {
        commands::register::run(&config, cli.format)
    } else if cli.unregister {
        commands::unregister::run(&config, cli.format)
    } else {
        commands::checkin::run(&config, cli.format)
    };
    ExitCode::from(code)
}
