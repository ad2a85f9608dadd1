//! Tree repository over self-referencing entities.
//!
//! # Responsibility
//! - Traverse `parent_id` hierarchies with `WITH RECURSIVE`.
//! - Load every traversal result through the tree default scope
//!   (`base_query`) and assemble nested trees in memory.
//!
//! # Invariants
//! - Only live nodes take part in traversal; a trashed node cuts its
//!   subtree off.
//! - Sibling order follows the entity ordering, then `id ASC`.
//! - Flat descendant/ancestor lists include the node itself; counts do not.
//! - Cyclic parent links never loop: each node is visited once.

use crate::model::{EntityId, Record};
use crate::repo::base_repo::BaseRepository;
use crate::repo::descriptor::{EntityDescriptor, TreeSpec, PRIMARY_COLUMN, SOFT_DELETE_COLUMN};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::query::{quote, SelectQuery, TrashFilter};
use log::debug;
use rusqlite::Connection;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Repository for entities with tree capability.
pub struct TreeRepository<'conn> {
    base: BaseRepository<'conn>,
    tree: TreeSpec,
}

impl<'conn> TreeRepository<'conn> {
    /// Wraps `base`; fails when its entity has no tree capability.
    pub fn try_new(base: BaseRepository<'conn>) -> RepoResult<Self> {
        let tree = base
            .descriptor()
            .tree
            .ok_or(RepoError::NotTree(base.kind()))?;
        Ok(Self { base, tree })
    }

    /// Flat repository operations (list, paginate, delete, restore).
    pub fn base(&self) -> &BaseRepository<'conn> {
        &self.base
    }

    pub fn descriptor(&self) -> &'static EntityDescriptor {
        self.base.descriptor()
    }

    /// Applies the tree join set and ordering to any builder.
    pub fn base_query(&self, qb: SelectQuery) -> SelectQuery {
        self.descriptor().apply_default_scope(qb)
    }

    /// Every live root with its live descendants nested under `children`.
    pub fn find_trees(&self) -> RepoResult<Vec<Record>> {
        let nodes = self.load(|qb| qb)?;
        let roots: Vec<String> = nodes
            .iter()
            .filter(|node| self.parent_of(node).is_none())
            .filter_map(node_id)
            .collect();
        Ok(assemble(&self.tree, nodes, &roots))
    }

    /// Live nodes without a parent.
    pub fn find_roots(&self) -> RepoResult<Vec<Record>> {
        let parent = quote(self.tree.parent_column);
        self.load(|qb| {
            let column = format!("{}.{parent}", quote(qb.alias()));
            qb.and_where(format!("{column} IS NULL"), [])
        })
    }

    /// `id` and its live descendants as a flat list.
    pub fn find_descendants(&self, id: EntityId) -> RepoResult<Vec<Record>> {
        let ids = self.descendant_ids(id)?;
        self.load_ids(&ids)
    }

    /// `id` with its live descendants nested under `children`.
    pub fn find_descendants_tree(&self, id: EntityId) -> RepoResult<Record> {
        let nodes = self.find_descendants(id)?;
        assemble(&self.tree, nodes, &[id.to_string()])
            .into_iter()
            .next()
            .ok_or_else(|| self.not_found(id))
    }

    /// Live ancestors of `id` and `id` itself, root first.
    pub fn find_ancestors(&self, id: EntityId) -> RepoResult<Vec<Record>> {
        let ids = self.ancestor_ids(id)?;
        let mut by_id: HashMap<String, Record> = self
            .load_ids(&ids)?
            .into_iter()
            .filter_map(|node| node_id(&node).map(|key| (key, node)))
            .collect();

        let mut chain = Vec::with_capacity(by_id.len());
        let mut cursor = Some(id.to_string());
        while let Some(key) = cursor {
            let Some(node) = by_id.remove(&key) else {
                break;
            };
            cursor = self.parent_of(&node);
            chain.push(node);
        }
        chain.reverse();
        Ok(chain)
    }

    /// Chain from the root down to `id`, each ancestor nesting the next
    /// under `children`.
    pub fn find_ancestors_tree(&self, id: EntityId) -> RepoResult<Record> {
        let chain = self.find_ancestors(id)?;
        let children = self.tree.children_relation;
        chain
            .into_iter()
            .rev()
            .fold(None, |inner: Option<Record>, mut node| {
                let nested = inner.map(Value::Object).into_iter().collect();
                node.insert(children.to_string(), Value::Array(nested));
                Some(node)
            })
            .ok_or_else(|| self.not_found(id))
    }

    /// Number of live descendants of `id`, excluding `id`.
    pub fn count_descendants(&self, id: EntityId) -> RepoResult<u64> {
        Ok(self.descendant_ids(id)?.len().saturating_sub(1) as u64)
    }

    /// Number of live ancestors of `id`, excluding `id`.
    pub fn count_ancestors(&self, id: EntityId) -> RepoResult<u64> {
        Ok(self.ancestor_ids(id)?.len().saturating_sub(1) as u64)
    }

    fn load(&self, scope: impl FnOnce(SelectQuery) -> SelectQuery) -> RepoResult<Vec<Record>> {
        let qb = scope(self.base_query(self.base.create_query_builder()));
        self.base.fetch(&qb.trash(TrashFilter::Exclude))
    }

    fn load_ids(&self, ids: &[EntityId]) -> RepoResult<Vec<Record>> {
        self.load(|qb| qb.where_in_ids(ids))
    }

    fn descendant_ids(&self, id: EntityId) -> RepoResult<Vec<EntityId>> {
        let sql = format!(
            "WITH RECURSIVE subtree(id) AS (
                SELECT {pk}
                FROM {table}
                WHERE {pk} = ?1
                  AND {tombstone} IS NULL
                UNION
                SELECT child.{pk}
                FROM {table} child
                INNER JOIN subtree parent ON child.{parent} = parent.id
                WHERE child.{tombstone} IS NULL
            )
            SELECT id FROM subtree;",
            pk = quote(PRIMARY_COLUMN),
            table = quote(self.descriptor().table),
            tombstone = quote(SOFT_DELETE_COLUMN),
            parent = quote(self.tree.parent_column),
        );
        self.collect_ids(&sql, id, "descendants")
    }

    fn ancestor_ids(&self, id: EntityId) -> RepoResult<Vec<EntityId>> {
        let sql = format!(
            "WITH RECURSIVE lineage(id, parent_id) AS (
                SELECT {pk}, {parent}
                FROM {table}
                WHERE {pk} = ?1
                  AND {tombstone} IS NULL
                UNION
                SELECT node.{pk}, node.{parent}
                FROM {table} node
                INNER JOIN lineage child ON node.{pk} = child.parent_id
                WHERE node.{tombstone} IS NULL
            )
            SELECT id FROM lineage;",
            pk = quote(PRIMARY_COLUMN),
            table = quote(self.descriptor().table),
            tombstone = quote(SOFT_DELETE_COLUMN),
            parent = quote(self.tree.parent_column),
        );
        self.collect_ids(&sql, id, "ancestors")
    }

    fn collect_ids(&self, sql: &str, id: EntityId, direction: &str) -> RepoResult<Vec<EntityId>> {
        let conn: &Connection = self.base.connection();
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query([id.to_string()])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            let text: String = row.get(0)?;
            let parsed = Uuid::parse_str(&text).map_err(|_| {
                RepoError::InvalidData(format!(
                    "invalid uuid `{text}` in {}.{PRIMARY_COLUMN}",
                    self.descriptor().table
                ))
            })?;
            ids.push(parsed);
        }
        if ids.is_empty() {
            return Err(self.not_found(id));
        }
        debug!(
            "event=tree_traverse module=repo status=ok alias={} direction={direction} nodes={}",
            self.descriptor().alias,
            ids.len()
        );
        Ok(ids)
    }

    fn parent_of(&self, node: &Record) -> Option<String> {
        node.get(self.tree.parent_column)
            .and_then(Value::as_str)
            .map(str::to_owned)
    }

    fn not_found(&self, id: EntityId) -> RepoError {
        RepoError::NotFound {
            kind: self.base.kind(),
            id: id.to_string(),
        }
    }
}

fn node_id(node: &Record) -> Option<String> {
    node.get(PRIMARY_COLUMN)
        .and_then(Value::as_str)
        .map(str::to_owned)
}

/// Nests `nodes` under `roots` by parent column, keeping input order among
/// siblings.
fn assemble(tree: &TreeSpec, nodes: Vec<Record>, roots: &[String]) -> Vec<Record> {
    let mut children_of: HashMap<String, Vec<String>> = HashMap::new();
    let mut by_id: HashMap<String, Record> = HashMap::with_capacity(nodes.len());
    for node in nodes {
        let Some(id) = node_id(&node) else {
            continue;
        };
        if let Some(parent) = node.get(tree.parent_column).and_then(Value::as_str) {
            children_of
                .entry(parent.to_string())
                .or_default()
                .push(id.clone());
        }
        by_id.insert(id, node);
    }

    let mut visited = HashSet::new();
    roots
        .iter()
        .filter_map(|root| build_node(tree, root, &mut by_id, &children_of, &mut visited))
        .collect()
}

fn build_node(
    tree: &TreeSpec,
    id: &str,
    by_id: &mut HashMap<String, Record>,
    children_of: &HashMap<String, Vec<String>>,
    visited: &mut HashSet<String>,
) -> Option<Record> {
    if !visited.insert(id.to_string()) {
        return None;
    }
    let mut node = by_id.remove(id)?;
    let children: Vec<Value> = children_of
        .get(id)
        .map(|ids| {
            ids.iter()
                .filter_map(|child| build_node(tree, child, by_id, children_of, visited))
                .map(Value::Object)
                .collect()
        })
        .unwrap_or_default();
    node.insert(tree.children_relation.to_string(), Value::Array(children));
    Some(node)
}
