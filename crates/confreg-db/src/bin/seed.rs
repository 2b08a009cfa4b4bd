//! # Seed Data Generator
//!
//! Populates the database with a demo conference for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./confreg_dev.db with event "demo-2025"
//! cargo run -p confreg-db --bin seed
//!
//! # Custom event id and database path
//! cargo run -p confreg-db --bin seed -- --event annual-2026 --db ./data/confreg.db
//!
//! # Fallback price when no registration tier applies
//! cargo run -p confreg-db --bin seed -- --default-price 525.50
//! ```
//!
//! ## Generated Data
//! - One event with early-bird / regular / late / walk-in registration tiers
//! - Spouse and child tiers, a breakfast add-on
//! - Seat-limited and unlimited activities
//! - Percentage, fixed and single-use discount codes

use std::env;

use chrono::{Duration, Utc};
use confreg_core::validation::{normalize_code, validate_discount_value, validate_price_tiers};
use confreg_core::{Activity, DiscountCode, DiscountType, Event, Money, PriceTier, ValidationError};
use confreg_db::{Database, DbConfig};
use uuid::Uuid;

/// `(label, price, start, end)`, in list order.
const REGISTRATION_TIERS: &[(&str, &str, Option<&str>, Option<&str>)] = &[
    ("Early-bird", "400.00", None, Some("2025-10-31")),
    ("Regular", "500.00", Some("2025-11-01"), Some("2025-12-11")),
    ("Late", "550.00", Some("2025-12-12"), Some("2026-01-15")),
    ("Walk-in", "600.00", None, None),
];

/// `(name, seat limit)`
const ACTIVITIES: &[(&str, Option<u32>)] = &[
    ("Golf", Some(24)),
    ("Harbor Cruise", Some(80)),
    ("City Tour", None),
];

/// `(code, type, value, usage limit, days until expiry)`
const DISCOUNT_CODES: &[(&str, DiscountType, i64, Option<u32>, Option<i64>)] = &[
    ("save20", DiscountType::Percentage, 2000, None, Some(90)),
    ("speaker", DiscountType::Percentage, 10_000, Some(40), None),
    ("fifty-off", DiscountType::Fixed, 5000, None, Some(30)),
    ("vip_once", DiscountType::Fixed, 15_000, Some(1), None),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut event_id = String::from("demo-2025");
    let mut db_path = String::from("./confreg_dev.db");
    let mut default_price = String::from("500.00");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--event" | "-e" => {
                if i + 1 < args.len() {
                    event_id = args[i + 1].clone();
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--default-price" | "-p" => {
                if i + 1 < args.len() {
                    default_price = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Conference Registration Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -e, --event <ID>   Event id to create (default: demo-2025)");
                println!("  -d, --db <PATH>    Database file path (default: ./confreg_dev.db)");
                println!("  -p, --default-price <AMOUNT>");
                println!("                     Fallback event price (default: 500.00)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Conference Registration Seed Data Generator");
    println!("==============================================");
    println!("Database: {}", db_path);
    println!("Event:    {}", event_id);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    if db.events().get_by_id(&event_id).await?.is_some() {
        println!("⚠ Event {} already exists", event_id);
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    let event = demo_event(&event_id, Money::parse_decimal(&default_price)?)?;
    validate_price_tiers(&event.registration_tiers)?;
    db.events().insert(&event).await?;
    println!(
        "✓ Created event with {} registration tiers and {} activities",
        event.registration_tiers.len(),
        event.activities.len()
    );

    let now = Utc::now();
    for (raw, discount_type, value, usage_limit, expires_in_days) in DISCOUNT_CODES {
        let code = normalize_code(raw)?;
        validate_discount_value(*discount_type, *value)?;

        let discount = DiscountCode {
            id: Uuid::new_v4().to_string(),
            event_id: event_id.clone(),
            code: code.clone(),
            discount_type: *discount_type,
            discount_value: *value,
            expiry_date: expires_in_days.map(|days| now + Duration::days(days)),
            usage_limit: *usage_limit,
            used_count: 0,
        };

        if let Err(e) = db.discount_codes().insert(&discount).await {
            eprintln!("Failed to insert {}: {}", code, e);
            continue;
        }
        println!("  + discount code {}", code);
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

fn demo_event(id: &str, default_price: Money) -> Result<Event, ValidationError> {
    let registration_tiers = REGISTRATION_TIERS
        .iter()
        .map(|(label, price, start, end)| {
            Ok(PriceTier::dated(*label, Money::parse_decimal(price)?, *start, *end))
        })
        .collect::<Result<Vec<_>, ValidationError>>()?;

    Ok(Event {
        id: id.to_string(),
        name: "Annual Members Conference".to_string(),
        default_price,
        registration_tiers,
        spouse_tiers: vec![
            PriceTier::dated("Spouse early", Money::from_major(150), None, Some("2025-10-31")),
            PriceTier::open("Spouse", Money::from_major(200)),
        ],
        child_tiers: vec![PriceTier::open("Child", Money::from_major(75))],
        breakfast_price: Some(Money::from_major(40)),
        breakfast_end_date: Some("2026-01-10".to_string()),
        activities: ACTIVITIES
            .iter()
            .map(|(name, seat_limit)| Activity {
                name: name.to_string(),
                seat_limit: *seat_limit,
            })
            .collect(),
    })
}
