//! Data layer module
//!
//! Owns the process-wide MySQL connection pool.

mod database;

pub use database::Database;
