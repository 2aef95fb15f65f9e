//! Catalog listing calls.
//!
//! Each level is listed from its parent's identifying names. Entries the
//! service returns without a name cannot be addressed further down, so they
//! are dropped here.

use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::paginator::Paginator;
use crate::service::{ColumnMetadata, QueryService};

/// A data catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub name: String,
    pub catalog_type: Option<String>,
}

/// A database inside a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseEntry {
    pub name: String,
    pub description: Option<String>,
}

/// A table inside a database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableEntry {
    pub name: String,
    pub table_type: Option<String>,
}

/// A column of a table. Partition keys follow the regular columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnEntry {
    pub name: String,
    pub data_type: Option<String>,
    pub comment: Option<String>,
    pub partition_key: bool,
}

impl ColumnEntry {
    fn from_metadata(column: ColumnMetadata, partition_key: bool) -> Option<Self> {
        Some(Self {
            name: column.name?,
            data_type: column.data_type,
            comment: column.comment,
            partition_key,
        })
    }
}

/// The listing needed to fill one level of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
    Catalogs,
    Databases {
        catalog: String,
    },
    Tables {
        catalog: String,
        database: String,
    },
    Columns {
        catalog: String,
        database: String,
        table: String,
    },
}

/// A named child produced by a listing, with an optional one-line detail
/// (catalog type, table type, column type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedChild {
    pub name: String,
    pub detail: Option<String>,
}

impl ListedChild {
    pub fn new(name: impl Into<String>, detail: Option<String>) -> Self {
        Self {
            name: name.into(),
            detail,
        }
    }
}

/// Lists catalogs, databases, tables and columns.
pub struct CatalogBrowser<'a> {
    service: &'a dyn QueryService,
    paginator: Paginator,
}

impl<'a> CatalogBrowser<'a> {
    pub fn new(service: &'a dyn QueryService) -> Self {
        Self {
            service,
            paginator: Paginator::new(),
        }
    }

    pub fn with_paginator(mut self, paginator: Paginator) -> Self {
        self.paginator = paginator;
        self
    }

    pub async fn list_catalogs(&self) -> Result<Vec<CatalogEntry>> {
        let service = self.service;
        let catalogs = self
            .paginator
            .fetch_all(|token| async move { service.list_data_catalogs(token.as_deref()).await })
            .await?;
        debug!("Listed {} catalog(s)", catalogs.len());

        Ok(catalogs
            .into_iter()
            .filter_map(|c| {
                Some(CatalogEntry {
                    name: c.catalog_name?,
                    catalog_type: c.catalog_type,
                })
            })
            .collect())
    }

    pub async fn list_databases(&self, catalog: &str) -> Result<Vec<DatabaseEntry>> {
        let service = self.service;
        let databases = self
            .paginator
            .fetch_all(|token| async move { service.list_databases(catalog, token.as_deref()).await })
            .await?;
        debug!("Listed {} database(s) in {}", databases.len(), catalog);

        Ok(databases
            .into_iter()
            .filter_map(|d| {
                Some(DatabaseEntry {
                    name: d.name?,
                    description: d.description,
                })
            })
            .collect())
    }

    pub async fn list_tables(&self, catalog: &str, database: &str) -> Result<Vec<TableEntry>> {
        let service = self.service;
        let tables = self
            .paginator
            .fetch_all(|token| async move {
                service
                    .list_table_metadata(catalog, database, token.as_deref())
                    .await
            })
            .await?;
        debug!("Listed {} table(s) in {}.{}", tables.len(), catalog, database);

        Ok(tables
            .into_iter()
            .filter_map(|t| {
                Some(TableEntry {
                    name: t.name?,
                    table_type: t.table_type,
                })
            })
            .collect())
    }

    /// Lists a table's columns with a single metadata call.
    pub async fn list_columns(
        &self,
        catalog: &str,
        database: &str,
        table: &str,
    ) -> Result<Vec<ColumnEntry>> {
        let Some(metadata) = self
            .service
            .get_table_metadata(catalog, database, table)
            .await?
        else {
            return Ok(Vec::new());
        };

        let columns = metadata
            .columns
            .unwrap_or_default()
            .into_iter()
            .filter_map(|c| ColumnEntry::from_metadata(c, false));
        let partition_keys = metadata
            .partition_keys
            .unwrap_or_default()
            .into_iter()
            .filter_map(|c| ColumnEntry::from_metadata(c, true));

        Ok(columns.chain(partition_keys).collect())
    }

    /// Runs a listing and reduces the entries to names and details.
    pub async fn fetch_listing(&self, listing: &Listing) -> Result<Vec<ListedChild>> {
        let children = match listing {
            Listing::Catalogs => self
                .list_catalogs()
                .await?
                .into_iter()
                .map(|c| ListedChild::new(c.name, c.catalog_type))
                .collect(),
            Listing::Databases { catalog } => self
                .list_databases(catalog)
                .await?
                .into_iter()
                .map(|d| ListedChild::new(d.name, d.description))
                .collect(),
            Listing::Tables { catalog, database } => self
                .list_tables(catalog, database)
                .await?
                .into_iter()
                .map(|t| ListedChild::new(t.name, t.table_type))
                .collect(),
            Listing::Columns {
                catalog,
                database,
                table,
            } => self
                .list_columns(catalog, database, table)
                .await?
                .into_iter()
                .map(|c| ListedChild::new(c.name, c.data_type))
                .collect(),
        };
        Ok(children)
    }
}
