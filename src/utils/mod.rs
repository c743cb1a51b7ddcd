//! Utility functions and types

pub mod data_loader;

pub use data_loader::{read_csv_bytes, write_csv_bytes};
