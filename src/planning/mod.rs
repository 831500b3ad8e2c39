pub mod error;
pub mod radiation;
pub mod reanalysis;
