//! Generic entity repository parameterized by an entity descriptor.
//!
//! # Responsibility
//! - Hand out builders pre-aliased to the entity (`create_query_builder`).
//! - Apply the entity's default scope (`build_base_query`) to every
//!   list/find/detail read.
//! - Implement trash-aware delete and restore.
//!
//! # Invariants
//! - Every read path starts from `build_base_query`; callers may narrow or
//!   reorder scope per call.
//! - Loaded records pass through registered subscribers before return.
//! - Writes only touch declared descriptor columns.

use crate::model::kind::EntityKind;
use crate::model::{EntityId, Record};
use crate::repo::descriptor::{EntityDescriptor, RelationKind, PRIMARY_COLUMN, SOFT_DELETE_COLUMN};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::page::{page_offset, PaginateMeta, Paginated};
use crate::repo::query::{json_to_sql, quote, QueryError, SelectQuery, TrashFilter};
use crate::repo::subscriber::SubscriberSet;
use log::{debug, error};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Transaction, TransactionBehavior};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::time::Instant;
use uuid::Uuid;

const NOW_MS_SQL: &str = "(strftime('%s', 'now') * 1000)";

/// Outcome of a trash-aware delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteSummary {
    /// Live rows moved to the trash.
    pub trashed: usize,
    /// Rows removed permanently.
    pub purged: usize,
}

/// Repository over one entity table.
pub struct BaseRepository<'conn> {
    conn: &'conn Connection,
    descriptor: &'static EntityDescriptor,
    subscribers: SubscriberSet,
}

impl<'conn> BaseRepository<'conn> {
    pub fn new(conn: &'conn Connection, descriptor: &'static EntityDescriptor) -> Self {
        Self {
            conn,
            descriptor,
            subscribers: SubscriberSet::new(),
        }
    }

    pub fn with_subscribers(mut self, subscribers: SubscriberSet) -> Self {
        self.subscribers = subscribers;
        self
    }

    pub fn descriptor(&self) -> &'static EntityDescriptor {
        self.descriptor
    }

    pub fn kind(&self) -> EntityKind {
        self.descriptor.kind
    }

    /// Alias every query of this repository is scoped to.
    pub fn alias(&self) -> &'static str {
        self.descriptor.alias
    }

    pub fn connection(&self) -> &'conn Connection {
        self.conn
    }

    /// Bare builder pre-aliased to this entity.
    pub fn create_query_builder(&self) -> SelectQuery {
        SelectQuery::new(self.descriptor)
    }

    /// Builder with this entity's default joins and ordering applied.
    pub fn build_base_query(&self) -> SelectQuery {
        let qb = self.create_query_builder();
        self.descriptor.apply_default_scope(qb)
    }

    /// Runs `qb` and applies subscribers to every loaded record.
    pub fn fetch(&self, qb: &SelectQuery) -> RepoResult<Vec<Record>> {
        let started_at = Instant::now();
        let records = qb.get_many(self.conn).map_err(|err| {
            error!(
                "event=repo_fetch module=repo status=error alias={} duration_ms={} error={err}",
                self.alias(),
                started_at.elapsed().as_millis()
            );
            err
        })?;
        debug!(
            "event=repo_fetch module=repo status=ok alias={} rows={} duration_ms={}",
            self.alias(),
            records.len(),
            started_at.elapsed().as_millis()
        );
        Ok(records
            .into_iter()
            .map(|record| self.subscribers.apply(self.kind(), record))
            .collect())
    }

    /// Runs `qb` and returns the first record.
    pub fn fetch_one(&self, qb: &SelectQuery) -> RepoResult<Option<Record>> {
        let record = qb.get_one(self.conn)?;
        Ok(record.map(|record| self.subscribers.apply(self.kind(), record)))
    }

    /// Lists every record in default scope.
    pub fn find(&self, trash: TrashFilter) -> RepoResult<Vec<Record>> {
        self.find_with(trash, |qb| qb)
    }

    /// Lists records in default scope narrowed by `scope`.
    pub fn find_with(
        &self,
        trash: TrashFilter,
        scope: impl FnOnce(SelectQuery) -> SelectQuery,
    ) -> RepoResult<Vec<Record>> {
        let qb = scope(self.build_base_query().trash(trash));
        self.fetch(&qb)
    }

    /// Lists one page of records in default scope narrowed by `scope`.
    ///
    /// `page` is 1-based.
    pub fn paginate(
        &self,
        page: u32,
        limit: u32,
        trash: TrashFilter,
        scope: impl FnOnce(SelectQuery) -> SelectQuery,
    ) -> RepoResult<Paginated<Record>> {
        let page = page.max(1);
        let limit = limit.max(1);
        let qb = scope(self.build_base_query().trash(trash));
        let total_items = qb.get_count(self.conn)?;
        let items = self.fetch(&qb.skip(page_offset(page, limit)).take(limit))?;
        let meta = PaginateMeta::new(total_items, items.len() as u64, limit, page);
        Ok(Paginated { items, meta })
    }

    /// Loads one record in default scope.
    pub fn find_one(&self, id: EntityId, with_trashed: bool) -> RepoResult<Record> {
        let trash = if with_trashed {
            TrashFilter::Include
        } else {
            TrashFilter::Exclude
        };
        let qb = self.build_base_query().trash(trash).where_in_ids(&[id]);
        self.fetch_one(&qb)?.ok_or_else(|| RepoError::NotFound {
            kind: self.kind(),
            id: id.to_string(),
        })
    }

    /// Loads records by id in default scope, in default order.
    pub fn find_by_ids(&self, ids: &[EntityId], trash: TrashFilter) -> RepoResult<Vec<Record>> {
        self.find_with(trash, |qb| qb.where_in_ids(ids))
    }

    pub fn count(&self, trash: TrashFilter) -> RepoResult<u64> {
        self.create_query_builder()
            .trash(trash)
            .get_count(self.conn)
    }

    /// Whether a live record with `id` exists.
    pub fn exists(&self, id: EntityId) -> RepoResult<bool> {
        let count = self
            .create_query_builder()
            .where_in_ids(&[id])
            .get_count(self.conn)?;
        Ok(count > 0)
    }

    /// Inserts one record and returns its id.
    ///
    /// A missing or `null` `id` gets a fresh UUID. Keys that are not columns
    /// (relations, derived fields) are not written.
    pub fn insert(&self, record: &Record) -> RepoResult<EntityId> {
        let id = match record.get(PRIMARY_COLUMN) {
            None | Some(JsonValue::Null) => Uuid::new_v4(),
            Some(JsonValue::String(text)) => Uuid::parse_str(text).map_err(|_| {
                RepoError::InvalidData(format!("invalid uuid `{text}` for {}.id", self.alias()))
            })?,
            Some(other) => {
                return Err(RepoError::InvalidData(format!(
                    "invalid id value `{other}` for {}.id",
                    self.alias()
                )))
            }
        };

        let mut columns = vec![quote(PRIMARY_COLUMN)];
        let mut values = vec![Value::Text(id.to_string())];
        for column in self.descriptor.columns {
            if *column == PRIMARY_COLUMN {
                continue;
            }
            if let Some(value) = record.get(*column) {
                columns.push(quote(column));
                values.push(json_to_sql(value));
            }
        }

        let placeholders = vec!["?"; values.len()].join(", ");
        self.conn.execute(
            &format!(
                "INSERT INTO {} ({}) VALUES ({placeholders});",
                quote(self.descriptor.table),
                columns.join(", ")
            ),
            params_from_iter(values),
        )?;
        debug!(
            "event=repo_insert module=repo status=ok alias={} id={id}",
            self.alias()
        );
        Ok(id)
    }

    /// Updates declared columns present in `changes` on a live record.
    pub fn update(&self, id: EntityId, changes: &Record) -> RepoResult<()> {
        let mut assignments = Vec::new();
        let mut values = Vec::new();
        for column in self.descriptor.columns {
            if matches!(
                *column,
                PRIMARY_COLUMN | "created_at" | "updated_at" | SOFT_DELETE_COLUMN
            ) {
                continue;
            }
            if let Some(value) = changes.get(*column) {
                assignments.push(format!("{} = ?", quote(column)));
                values.push(json_to_sql(value));
            }
        }
        assignments.push(format!("{} = {NOW_MS_SQL}", quote("updated_at")));
        values.push(Value::Text(id.to_string()));

        let changed = self.conn.execute(
            &format!(
                "UPDATE {} SET {} WHERE {} = ? AND {} IS NULL;",
                quote(self.descriptor.table),
                assignments.join(", "),
                quote(PRIMARY_COLUMN),
                quote(SOFT_DELETE_COLUMN)
            ),
            params_from_iter(values),
        )?;
        if changed == 0 {
            return Err(self.not_found(id));
        }
        Ok(())
    }

    /// Links `owner` to `targets` through a many-to-many relation.
    pub fn attach(&self, relation: &str, owner: EntityId, targets: &[EntityId]) -> RepoResult<()> {
        let declared =
            self.descriptor
                .relation(relation)
                .ok_or_else(|| QueryError::UnknownRelation {
                    alias: self.alias().to_string(),
                    relation: relation.to_string(),
                })?;
        let RelationKind::ManyToMany {
            join_table,
            owner_column,
            target_column,
        } = declared.kind
        else {
            return Err(RepoError::InvalidData(format!(
                "relation `{relation}` on {} is not many-to-many",
                self.alias()
            )));
        };

        let sql = format!(
            "INSERT OR IGNORE INTO {} ({}, {}) VALUES (?1, ?2);",
            quote(join_table),
            quote(owner_column),
            quote(target_column)
        );
        for target in targets {
            let pair = [owner.to_string(), target.to_string()];
            self.conn.execute(&sql, pair)?;
        }
        Ok(())
    }

    /// Deletes records by id.
    ///
    /// With `trash`, live rows move to the trash and rows already in the
    /// trash are purged. Without it, every matching row is purged.
    pub fn delete(&self, ids: &[EntityId], trash: bool) -> RepoResult<DeleteSummary> {
        if ids.is_empty() {
            return Ok(DeleteSummary::default());
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let (live, trashed) = self.partition_by_tombstone(&tx, ids)?;

        let summary = if trash {
            DeleteSummary {
                trashed: self.soft_delete_rows(&tx, &live)?,
                purged: self.purge_rows(&tx, &trashed)?,
            }
        } else {
            let all: Vec<String> = live.into_iter().chain(trashed).collect();
            DeleteSummary {
                trashed: 0,
                purged: self.purge_rows(&tx, &all)?,
            }
        };
        tx.commit()?;

        debug!(
            "event=repo_delete module=repo status=ok alias={} trash={trash} trashed={} purged={}",
            self.alias(),
            summary.trashed,
            summary.purged
        );
        Ok(summary)
    }

    /// Restores trashed records and returns them in default scope.
    pub fn restore(&self, ids: &[EntityId]) -> RepoResult<Vec<Record>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let (placeholders, params) = id_params(ids.iter().map(|id| id.to_string()));
        let restored = self.conn.execute(
            &format!(
                "UPDATE {table} SET {tombstone} = NULL, {updated} = {NOW_MS_SQL} \
                 WHERE {id} IN ({placeholders}) AND {tombstone} IS NOT NULL;",
                table = quote(self.descriptor.table),
                tombstone = quote(SOFT_DELETE_COLUMN),
                updated = quote("updated_at"),
                id = quote(PRIMARY_COLUMN),
            ),
            params_from_iter(params),
        )?;
        debug!(
            "event=repo_restore module=repo status=ok alias={} restored={restored}",
            self.alias()
        );
        self.find_by_ids(ids, TrashFilter::Exclude)
    }

    fn partition_by_tombstone(
        &self,
        conn: &Connection,
        ids: &[EntityId],
    ) -> RepoResult<(Vec<String>, Vec<String>)> {
        let (placeholders, params) = id_params(ids.iter().map(|id| id.to_string()));
        let mut stmt = conn.prepare(&format!(
            "SELECT {id}, {tombstone} IS NOT NULL FROM {table} WHERE {id} IN ({placeholders});",
            id = quote(PRIMARY_COLUMN),
            tombstone = quote(SOFT_DELETE_COLUMN),
            table = quote(self.descriptor.table),
        ))?;
        let mut rows = stmt.query(params_from_iter(params))?;

        let mut live = Vec::new();
        let mut trashed = Vec::new();
        while let Some(row) = rows.next()? {
            let id: String = row.get(0)?;
            if row.get::<_, bool>(1)? {
                trashed.push(id);
            } else {
                live.push(id);
            }
        }
        Ok((live, trashed))
    }

    fn soft_delete_rows(&self, conn: &Connection, ids: &[String]) -> RepoResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let (placeholders, params) = id_params(ids.iter().cloned());
        let changed = conn.execute(
            &format!(
                "UPDATE {table} SET {tombstone} = {NOW_MS_SQL}, {updated} = {NOW_MS_SQL} \
                 WHERE {id} IN ({placeholders});",
                table = quote(self.descriptor.table),
                tombstone = quote(SOFT_DELETE_COLUMN),
                updated = quote("updated_at"),
                id = quote(PRIMARY_COLUMN),
            ),
            params_from_iter(params),
        )?;
        Ok(changed)
    }

    fn purge_rows(&self, conn: &Connection, ids: &[String]) -> RepoResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let (placeholders, params) = id_params(ids.iter().cloned());
        let changed = conn.execute(
            &format!(
                "DELETE FROM {} WHERE {} IN ({placeholders});",
                quote(self.descriptor.table),
                quote(PRIMARY_COLUMN)
            ),
            params_from_iter(params),
        )?;
        Ok(changed)
    }

    fn not_found(&self, id: EntityId) -> RepoError {
        RepoError::NotFound {
            kind: self.kind(),
            id: id.to_string(),
        }
    }
}

/// Decodes one record into a typed model.
pub fn decode<T: DeserializeOwned>(record: Record) -> RepoResult<T> {
    serde_json::from_value(JsonValue::Object(record))
        .map_err(|err| RepoError::InvalidData(err.to_string()))
}

/// Decodes records into typed models, failing on the first bad record.
pub fn decode_all<T: DeserializeOwned>(records: Vec<Record>) -> RepoResult<Vec<T>> {
    records.into_iter().map(decode).collect()
}

fn id_params(ids: impl Iterator<Item = String>) -> (String, Vec<Value>) {
    let params: Vec<Value> = ids.map(Value::Text).collect();
    let placeholders = vec!["?"; params.len()].join(", ");
    (placeholders, params)
}
