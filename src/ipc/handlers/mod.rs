pub mod core;
pub mod merit;
pub mod reports;
pub mod trend;
