//! Integration tests for athena-glance.

pub mod catalog_test;
pub mod credentials_test;
pub mod persistence_test;
pub mod query_test;
