//! Example fetching and flattening the current month's bulletin.
//!
//! Run with:
//! ```bash
//! cargo run --example fetch            # delimited text
//! cargo run --example fetch -- records # key-value records
//! ```

use cvrf_bulletin::{BulletinError, BulletinManager, Config, Delivery, DeliveryFormat};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Hold the guard until the end of main, or file logs may be lost.
    let _guard = cvrf_bulletin::logging::init_logging(&config);

    let format = match std::env::args().nth(1).as_deref() {
        Some("records") => DeliveryFormat::Records,
        _ => DeliveryFormat::Csv,
    };

    let manager = BulletinManager::new(&config);

    match manager.monthly_report(None, format).await {
        Ok(Delivery::Csv(text)) => print!("{text}"),
        Ok(Delivery::Records(records)) => {
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Err(BulletinError::NotYetPublished { month }) => {
            eprintln!("The {month} bulletin is not yet published. Try again later.");
        }
        Err(BulletinError::NoReportableData) => {
            eprintln!("Bulletin received, but no vulnerability had complete ratings and a remediation.");
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
