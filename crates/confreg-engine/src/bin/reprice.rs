//! # Reprice Tool
//!
//! Recomputes every active registration of an event with the live pricing
//! library, as of the moment each registration was created, and reports
//! where the stored total drifted.
//!
//! ## Usage
//! ```bash
//! # Report only
//! cargo run -p confreg-engine --bin reprice -- --event annual-2026
//!
//! # Correct drifted totals (increases become pending amounts)
//! cargo run -p confreg-engine --bin reprice -- --event annual-2026 --apply
//! ```

use std::env;
use std::path::PathBuf;

use chrono::Utc;
use confreg_core::Money;
use confreg_engine::{init_tracing, EngineConfig, RegistrationService};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut event_id: Option<String> = None;
    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut apply = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--event" | "-e" => {
                if i + 1 < args.len() {
                    event_id = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--apply" => apply = true,
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            other => eprintln!("Ignoring unknown argument: {}", other),
        }
        i += 1;
    }

    let Some(event_id) = event_id else {
        print_help();
        return Err("--event is required".into());
    };

    let mut config = EngineConfig::load(config_path)?;
    if let Some(path) = db_path {
        config.database.path = path;
    }
    init_tracing(&config.logging);

    let service = RegistrationService::from_config(&config).await?;
    let lines = service.reprice_event(&event_id, apply, Utc::now()).await?;

    println!("Event:     {}", event_id);
    println!("Zone:      {}", service.zone().name());
    println!("Mode:      {}", if apply { "apply" } else { "report" });
    println!();
    println!(
        "{:<38} {:>12} {:>12} {:>12}",
        "registration", "stored", "expected", "drift"
    );

    let mut drifted = 0usize;
    let mut net = Money::zero();
    for line in &lines {
        if line.drift.is_zero() {
            continue;
        }
        drifted += 1;
        net += line.drift;
        println!(
            "{:<38} {:>12} {:>12} {:>12}{}",
            line.registration_id,
            line.stored_total.to_string(),
            line.expected_total.to_string(),
            line.drift.to_string(),
            if line.applied {
                "  ✓"
            } else if line.organizer_adjusted {
                "  (organizer-adjusted, left as is)"
            } else {
                ""
            }
        );
    }

    println!();
    println!(
        "{} of {} active registrations drifted (net {})",
        drifted,
        lines.len(),
        net
    );
    if drifted > 0 && !apply {
        println!("Re-run with --apply to correct them.");
    }

    service.database().close().await;
    Ok(())
}

fn print_help() {
    println!("Conference Registration Reprice Tool");
    println!();
    println!("Usage: reprice --event <ID> [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -e, --event <ID>      Event to reprice (required)");
    println!("  -d, --db <PATH>       Database file (overrides config)");
    println!("  -c, --config <PATH>   Config file (default: platform config dir)");
    println!("      --apply           Write corrected totals");
    println!("  -h, --help            Show this help message");
}
