pub mod checkin;
pub mod register;
pub mod unregister;

use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressStyle};
use roost_api::SecureTransport;
use roost_config::Config;
use roost_core::Outcome;
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Plain messages, failures prefixed with "Error: ".
    Human,
    /// A single `{"message": ..., "ok": ...}` object.
    Json,
}

/// Print the outcome in the requested format and map it to an exit code.
pub fn report(outcome: &Outcome, format: Format) -> u8 {
    match format {
        Format::Json => match serde_json::to_string(outcome) {
            Ok(line) => println!("{line}"),
            Err(e) => {
                eprintln!("error: could not serialize outcome: {e}");
                return EXIT_FAILURE;
            }
        },
        Format::Human => {
            if outcome.ok {
                println!("{}", outcome.message);
            } else {
                println!("Error: {}", outcome.message);
            }
        }
    }
    if outcome.ok {
        EXIT_SUCCESS
    } else {
        EXIT_FAILURE
    }
}

/// Progress spinner for the long-running network actions. Draws on stderr
/// and only in human format, so the stdout contract stays a single line.
pub fn spinner(msg: &str, format: Format) -> Option<ProgressBar> {
    if format != Format::Human {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    Some(pb)
}

pub fn clear_spinner(pb: Option<ProgressBar>) {
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
}

fn timeout(config: &Config) -> Option<Duration> {
    config.network.timeout_seconds.map(Duration::from_secs)
}

pub fn inventory_transport(config: &Config) -> SecureTransport {
    SecureTransport::new(
        config.inventory.clone(),
        config.identity.clone(),
        timeout(config),
    )
}

pub fn ingress_transport(config: &Config) -> SecureTransport {
    SecureTransport::new(
        config.ingress.clone(),
        config.identity.clone(),
        timeout(config),
    )
}
