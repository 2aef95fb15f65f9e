//! Lazily expanded catalog tree.
//!
//! Nodes live in an arena and refer to their parent by index. A node's
//! address (the catalog, database and table names needed for the next
//! listing) is found by walking the parent chain. Replaced subtrees are
//! freed and their slots reused.

use std::fmt;

use serde::Serialize;

use super::browser::{CatalogBrowser, Listing, ListedChild};
use crate::error::{AthenaError, Result};

/// Handle to a node in a [`CatalogTree`].
///
/// The generation changes whenever a slot is freed, so the id of a removed
/// node never resolves to the node that later takes its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeKind {
    Catalog,
    Database,
    Table,
    Column,
}

impl NodeKind {
    /// Kind of this node's children, if it can have any.
    pub fn child_kind(&self) -> Option<NodeKind> {
        match self {
            Self::Catalog => Some(Self::Database),
            Self::Database => Some(Self::Table),
            Self::Table => Some(Self::Column),
            Self::Column => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogNode {
    pub kind: NodeKind,
    pub name: String,
    /// Catalog type, table type or column type, when known.
    pub detail: Option<String>,
    pub parent: Option<NodeId>,
    /// `None` until the node has been expanded.
    children: Option<Vec<NodeId>>,
}

impl CatalogNode {
    pub fn is_expanded(&self) -> bool {
        self.children.is_some()
    }

    pub fn is_leaf(&self) -> bool {
        self.kind == NodeKind::Column
    }
}

/// Identifying names of a node and its ancestors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NodeAddress {
    pub catalog: String,
    pub database: Option<String>,
    pub table: Option<String>,
    pub column: Option<String>,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<CatalogNode>,
}

/// Arena-backed tree of catalogs, databases, tables and columns.
///
/// Refreshing a node or attaching new children frees the old subtree.
#[derive(Debug, Clone, Default)]
pub struct CatalogTree {
    slots: Vec<Slot>,
    free: Vec<usize>,
    roots: Vec<NodeId>,
}

impl CatalogTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node(&self, id: NodeId) -> Option<&CatalogNode> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)?
            .node
            .as_ref()
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut CatalogNode> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)?
            .node
            .as_mut()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Children of an expanded node; `None` if not fetched yet.
    pub fn children(&self, id: NodeId) -> Option<&[NodeId]> {
        self.node(id)?.children.as_deref()
    }

    /// Finds a child of `parent`, or a root when `parent` is `None`, by name.
    pub fn find(&self, parent: Option<NodeId>, name: &str) -> Option<NodeId> {
        let candidates = match parent {
            Some(id) => self.children(id)?,
            None => self.roots(),
        };
        candidates
            .iter()
            .copied()
            .find(|id| self.node(*id).is_some_and(|n| n.name == name))
    }

    /// Collects the identifying names along the parent chain.
    pub fn address(&self, id: NodeId) -> Option<NodeAddress> {
        let mut address = NodeAddress::default();
        let mut current = Some(id);

        while let Some(node_id) = current {
            let node = self.node(node_id)?;
            let name = Some(node.name.clone());
            match node.kind {
                NodeKind::Catalog => address.catalog = node.name.clone(),
                NodeKind::Database => address.database = name,
                NodeKind::Table => address.table = name,
                NodeKind::Column => address.column = name,
            }
            current = node.parent;
        }

        Some(address)
    }

    /// The listing that fills a node's children. Columns have none.
    pub fn listing_for(&self, id: NodeId) -> Option<Listing> {
        let node = self.node(id)?;
        let address = self.address(id)?;
        match node.kind {
            NodeKind::Catalog => Some(Listing::Databases {
                catalog: address.catalog,
            }),
            NodeKind::Database => Some(Listing::Tables {
                catalog: address.catalog,
                database: address.database?,
            }),
            NodeKind::Table => Some(Listing::Columns {
                catalog: address.catalog,
                database: address.database?,
                table: address.table?,
            }),
            NodeKind::Column => None,
        }
    }

    fn push(&mut self, kind: NodeKind, child: ListedChild, parent: Option<NodeId>) -> NodeId {
        let node = CatalogNode {
            kind,
            name: child.name,
            detail: child.detail,
            parent,
            children: if kind == NodeKind::Column {
                Some(Vec::new())
            } else {
                None
            },
        };

        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.node = Some(node);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId {
                    index: self.slots.len() - 1,
                    generation: 0,
                }
            }
        }
    }

    /// Frees the given nodes and everything below them.
    fn release(&mut self, ids: Vec<NodeId>) {
        let mut pending = ids;
        while let Some(id) = pending.pop() {
            let Some(slot) = self
                .slots
                .get_mut(id.index)
                .filter(|slot| slot.generation == id.generation)
            else {
                continue;
            };
            let Some(node) = slot.node.take() else {
                continue;
            };
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(id.index);
            pending.extend(node.children.unwrap_or_default());
        }
    }

    /// Replaces the roots with the given catalogs.
    pub fn set_catalogs(&mut self, catalogs: Vec<ListedChild>) -> &[NodeId] {
        let previous = std::mem::take(&mut self.roots);
        self.release(previous);

        let roots: Vec<NodeId> = catalogs
            .into_iter()
            .map(|c| self.push(NodeKind::Catalog, c, None))
            .collect();
        self.roots = roots;
        &self.roots
    }

    /// Stores fetched children under a node, replacing any previous ones.
    pub fn attach(&mut self, id: NodeId, children: Vec<ListedChild>) -> Result<&[NodeId]> {
        let node = self
            .node_mut(id)
            .ok_or_else(|| AthenaError::internal(format!("Unknown catalog node {id}")))?;
        let kind = node
            .kind
            .child_kind()
            .ok_or_else(|| AthenaError::internal("Columns have no children"))?;
        let previous = node.children.take().unwrap_or_default();
        self.release(previous);

        let ids: Vec<NodeId> = children
            .into_iter()
            .map(|child| self.push(kind, child, Some(id)))
            .collect();
        let node = self
            .node_mut(id)
            .ok_or_else(|| AthenaError::internal(format!("Unknown catalog node {id}")))?;
        Ok(node.children.insert(ids).as_slice())
    }

    /// Fetches the catalogs and makes them the roots.
    pub async fn load_catalogs(&mut self, browser: &CatalogBrowser<'_>) -> Result<&[NodeId]> {
        let catalogs = browser.fetch_listing(&Listing::Catalogs).await?;
        Ok(self.set_catalogs(catalogs))
    }

    /// Returns a node's children, fetching them on first expansion.
    pub async fn expand(&mut self, id: NodeId, browser: &CatalogBrowser<'_>) -> Result<Vec<NodeId>> {
        if let Some(children) = self.children(id) {
            return Ok(children.to_vec());
        }
        let listing = self
            .listing_for(id)
            .ok_or_else(|| AthenaError::internal(format!("Unknown catalog node {id}")))?;
        let children = browser.fetch_listing(&listing).await?;
        Ok(self.attach(id, children)?.to_vec())
    }

    /// Drops a node's children so the next expansion fetches them again.
    pub fn refresh(&mut self, id: NodeId) {
        let Some(node) = self.node_mut(id) else {
            return;
        };
        if node.kind == NodeKind::Column {
            return;
        }
        let previous = node.children.take().unwrap_or_default();
        self.release(previous);
    }
}
