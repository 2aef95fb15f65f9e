//! Catalog browsing for athena-glance.
//!
//! Lists the data catalog, database, table and column levels and keeps
//! what has been fetched in a lazily expanded tree.

mod browser;
mod tree;

pub use browser::{
    CatalogBrowser, CatalogEntry, ColumnEntry, DatabaseEntry, ListedChild, Listing, TableEntry,
};
pub use tree::{CatalogNode, CatalogTree, NodeAddress, NodeId, NodeKind};
