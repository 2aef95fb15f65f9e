//! athena-glance - browse Athena data catalogs and run SQL queries.
//!
//! This library exposes the core modules for the binary and for
//! integration tests.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod paginator;
pub mod persistence;
pub mod query;
pub mod service;
pub mod session;
