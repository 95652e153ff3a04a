pub mod models;
pub mod services;
pub mod testing;

pub use models::*;
pub use services::{notifier_from_config, Notifier};
