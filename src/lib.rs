pub mod aggregator;
pub mod config;
pub mod delivery;
pub mod error;
pub mod flatten;
pub mod logging;
pub mod manager;
pub mod models;
pub mod parser;
pub mod sources;

pub use config::Config;
pub use delivery::{Delivery, DeliveryFormat};
pub use error::{BulletinError, Result};
pub use manager::BulletinManager;
pub use models::{BulletinRow, BulletinTable, Catalog};
