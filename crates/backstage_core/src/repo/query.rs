//! Alias-scoped select builder and joined-row hydration.
//!
//! # Responsibility
//! - Build SQLite `SELECT` statements scoped to one entity alias.
//! - Left-join-and-select relations by name, aliased per join.
//! - Hydrate flat joined rows into one nested `Record` per root entity.
//!
//! # Invariants
//! - Builder methods never fail; bad alias/relation/column names surface
//!   when the query is rendered or executed.
//! - Result order follows the declared ordering, then root `id ASC`.
//! - Pagination counts root entities, not joined rows.
//! - Joined relations never include soft-deleted target rows.

use crate::model::{EntityId, Record};
use crate::repo::descriptor::{
    descriptor, EntityDescriptor, OrderDirection, Relation, RelationKind, PRIMARY_COLUMN,
    SOFT_DELETE_COLUMN,
};
use crate::repo::error::RepoResult;
use log::trace;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params_from_iter, Connection, Row};
use serde_json::Value as JsonValue;
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type QueryResult<T> = Result<T, QueryError>;

/// Name resolution errors raised while rendering a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    UnknownRelation { alias: String, relation: String },
    DuplicateAlias(String),
    UnknownAlias(String),
    UnknownColumn { alias: String, column: String },
}

impl Display for QueryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownRelation { alias, relation } => write!(
                f,
                "relation `{relation}` is not declared on alias `{alias}`"
            ),
            Self::DuplicateAlias(alias) => write!(f, "alias `{alias}` is used more than once"),
            Self::UnknownAlias(alias) => write!(f, "alias `{alias}` is not part of the query"),
            Self::UnknownColumn { alias, column } => {
                write!(f, "column `{column}` does not exist on alias `{alias}`")
            }
        }
    }
}

impl Error for QueryError {}

/// Root-entity visibility with respect to the soft delete tombstone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrashFilter {
    /// Only live rows.
    #[default]
    Exclude,
    /// Live and trashed rows.
    Include,
    /// Only trashed rows.
    Only,
}

#[derive(Debug, Clone)]
struct JoinClause {
    relation: String,
    alias: String,
}

#[derive(Debug, Clone)]
struct OrderClause {
    alias: Option<String>,
    column: String,
    direction: OrderDirection,
}

#[derive(Debug, Clone)]
struct WhereClause {
    sql: String,
    params: Vec<Value>,
}

#[derive(Debug, Clone, Copy)]
struct ResolvedJoin<'q> {
    alias: &'q str,
    relation: &'static Relation,
    target: &'static EntityDescriptor,
}

/// Select builder pre-scoped to one entity alias.
///
/// Every builder method consumes and returns the builder, so scope
/// customizations compose as plain `fn(SelectQuery) -> SelectQuery`.
#[derive(Debug, Clone)]
pub struct SelectQuery {
    descriptor: &'static EntityDescriptor,
    alias: String,
    joins: Vec<JoinClause>,
    wheres: Vec<WhereClause>,
    orders: Vec<OrderClause>,
    trash: TrashFilter,
    skip: Option<u32>,
    take: Option<u32>,
}

impl SelectQuery {
    /// Creates a builder aliased by the descriptor's declared alias.
    pub fn new(descriptor: &'static EntityDescriptor) -> Self {
        Self::with_alias(descriptor, descriptor.alias)
    }

    /// Creates a builder with an explicit root alias.
    pub fn with_alias(descriptor: &'static EntityDescriptor, alias: impl Into<String>) -> Self {
        Self {
            descriptor,
            alias: alias.into(),
            joins: Vec::new(),
            wheres: Vec::new(),
            orders: Vec::new(),
            trash: TrashFilter::default(),
            skip: None,
            take: None,
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn descriptor(&self) -> &'static EntityDescriptor {
        self.descriptor
    }

    /// Returns `(relation, alias)` pairs in join order.
    pub fn joined(&self) -> Vec<(&str, &str)> {
        self.joins
            .iter()
            .map(|join| (join.relation.as_str(), join.alias.as_str()))
            .collect()
    }

    /// Returns `(field, direction)` pairs in ordering priority.
    pub fn ordering(&self) -> Vec<(String, OrderDirection)> {
        self.orders
            .iter()
            .map(|order| {
                let field = match &order.alias {
                    Some(alias) => format!("{alias}.{}", order.column),
                    None => order.column.clone(),
                };
                (field, order.direction)
            })
            .collect()
    }

    pub fn trash_filter(&self) -> TrashFilter {
        self.trash
    }

    /// Left-joins relation `relation` of the root entity and selects it
    /// under `alias`.
    pub fn left_join_and_select(mut self, relation: &str, alias: &str) -> Self {
        self.joins.push(JoinClause {
            relation: relation.to_string(),
            alias: alias.to_string(),
        });
        self
    }

    /// Replaces the ordering with one clause. `field` is a root column or
    /// `alias.column`.
    pub fn order_by(mut self, field: &str, direction: OrderDirection) -> Self {
        self.orders.clear();
        self.add_order_by(field, direction)
    }

    /// Appends one ordering clause.
    pub fn add_order_by(mut self, field: &str, direction: OrderDirection) -> Self {
        let (alias, column) = match field.split_once('.') {
            Some((alias, column)) => (Some(alias.to_string()), column.to_string()),
            None => (None, field.to_string()),
        };
        self.orders.push(OrderClause {
            alias,
            column,
            direction,
        });
        self
    }

    /// Adds one `AND`-combined condition. `sql` uses anonymous `?` params.
    pub fn and_where(
        mut self,
        sql: impl Into<String>,
        params: impl IntoIterator<Item = Value>,
    ) -> Self {
        self.wheres.push(WhereClause {
            sql: sql.into(),
            params: params.into_iter().collect(),
        });
        self
    }

    /// Restricts root entities to `ids`. An empty list matches nothing.
    pub fn where_in_ids(self, ids: &[EntityId]) -> Self {
        if ids.is_empty() {
            return self.and_where("0 = 1", []);
        }
        let column = self.column_ref(PRIMARY_COLUMN);
        let placeholders = vec!["?"; ids.len()].join(", ");
        self.and_where(
            format!("{column} IN ({placeholders})"),
            ids.iter().map(|id| Value::Text(id.to_string())),
        )
    }

    /// Includes trashed root rows.
    pub fn with_deleted(self) -> Self {
        self.trash(TrashFilter::Include)
    }

    /// Returns only trashed root rows.
    pub fn only_deleted(self) -> Self {
        self.trash(TrashFilter::Only)
    }

    pub fn trash(mut self, filter: TrashFilter) -> Self {
        self.trash = filter;
        self
    }

    /// Skips `count` root entities.
    pub fn skip(mut self, count: u32) -> Self {
        self.skip = Some(count);
        self
    }

    /// Takes at most `count` root entities.
    pub fn take(mut self, count: u32) -> Self {
        self.take = Some(count);
        self
    }

    /// Quoted `"alias"."column"` reference on the root alias.
    pub fn column_ref(&self, column: &str) -> String {
        format!("{}.{}", quote(&self.alias), quote(column))
    }

    /// Renders the joined select without pagination.
    pub fn to_sql(&self) -> QueryResult<(String, Vec<Value>)> {
        let joins = self.resolve_joins()?;
        self.render_select(&joins, None)
    }

    /// Executes the query and hydrates one record per root entity.
    pub fn get_many(&self, conn: &Connection) -> RepoResult<Vec<Record>> {
        let joins = self.resolve_joins()?;

        let id_filter = if self.skip.is_some() || self.take.is_some() {
            let ids = self.page_ids(conn, &joins)?;
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            let placeholders = vec!["?"; ids.len()].join(", ");
            Some(WhereClause {
                sql: format!("{} IN ({placeholders})", self.column_ref(PRIMARY_COLUMN)),
                params: ids,
            })
        } else {
            None
        };

        let (sql, params) = self.render_select(&joins, id_filter.as_ref())?;
        trace!(
            "event=query_select module=repo alias={} sql={sql}",
            self.alias
        );

        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(params))?;
        let mut hydrator = Hydrator::new(self.descriptor, &joins);
        while let Some(row) = rows.next()? {
            hydrator.push_row(row)?;
        }
        Ok(hydrator.finish())
    }

    /// Executes the query and returns the first root entity.
    pub fn get_one(&self, conn: &Connection) -> RepoResult<Option<Record>> {
        let records = self.clone().take(1).get_many(conn)?;
        Ok(records.into_iter().next())
    }

    /// Counts distinct root entities matching the conditions.
    pub fn get_count(&self, conn: &Connection) -> RepoResult<u64> {
        let joins = self.resolve_joins()?;
        let (where_sql, params) = self.render_where(None);
        let sql = format!(
            "SELECT COUNT(DISTINCT {}) {}{where_sql}",
            self.column_ref(PRIMARY_COLUMN),
            self.render_from(&joins)
        );
        let count: i64 = conn.query_row(&sql, params_from_iter(params), |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    fn resolve_joins(&self) -> QueryResult<Vec<ResolvedJoin<'_>>> {
        let mut aliases = HashSet::from([self.alias.as_str()]);
        let mut resolved = Vec::with_capacity(self.joins.len());
        for join in &self.joins {
            let relation = self.descriptor.relation(&join.relation).ok_or_else(|| {
                QueryError::UnknownRelation {
                    alias: self.alias.clone(),
                    relation: join.relation.clone(),
                }
            })?;
            if !aliases.insert(join.alias.as_str()) {
                return Err(QueryError::DuplicateAlias(join.alias.clone()));
            }
            resolved.push(ResolvedJoin {
                alias: join.alias.as_str(),
                relation,
                target: descriptor(relation.target),
            });
        }
        Ok(resolved)
    }

    fn render_select(
        &self,
        joins: &[ResolvedJoin<'_>],
        extra: Option<&WhereClause>,
    ) -> QueryResult<(String, Vec<Value>)> {
        let mut columns: Vec<String> = self
            .descriptor
            .columns
            .iter()
            .map(|column| self.column_ref(column))
            .collect();
        for join in joins {
            columns.extend(
                join.target
                    .columns
                    .iter()
                    .map(|column| format!("{}.{}", quote(join.alias), quote(column))),
            );
        }

        let (where_sql, params) = self.render_where(extra);
        let sql = format!(
            "SELECT {} {}{where_sql}{}",
            columns.join(", "),
            self.render_from(joins),
            self.render_order(joins)?
        );
        Ok((sql, params))
    }

    fn page_ids(&self, conn: &Connection, joins: &[ResolvedJoin<'_>]) -> RepoResult<Vec<Value>> {
        let id_column = self.column_ref(PRIMARY_COLUMN);
        let (where_sql, mut params) = self.render_where(None);
        let sql = format!(
            "SELECT {id_column} {}{where_sql} GROUP BY {id_column}{} LIMIT ? OFFSET ?",
            self.render_from(joins),
            self.render_order(joins)?
        );
        params.push(Value::Integer(self.take.map_or(-1, i64::from)));
        params.push(Value::Integer(i64::from(self.skip.unwrap_or(0))));

        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(params))?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(row.get::<_, Value>(0)?);
        }
        Ok(ids)
    }

    fn render_from(&self, joins: &[ResolvedJoin<'_>]) -> String {
        let mut sql = format!(
            "FROM {} AS {}",
            quote(self.descriptor.table),
            quote(&self.alias)
        );
        let owner = quote(&self.alias);
        let id = quote(PRIMARY_COLUMN);
        for join in joins {
            let target = quote(join.alias);
            let table = quote(join.target.table);
            let live = format!("{target}.{} IS NULL", quote(SOFT_DELETE_COLUMN));
            let clause = match join.relation.kind {
                RelationKind::ManyToOne { column } => format!(
                    " LEFT JOIN {table} AS {target} ON {target}.{id} = {owner}.{} AND {live}",
                    quote(column)
                ),
                RelationKind::OneToMany { inverse_column } => format!(
                    " LEFT JOIN {table} AS {target} ON {target}.{} = {owner}.{id} AND {live}",
                    quote(inverse_column)
                ),
                RelationKind::ManyToMany {
                    join_table,
                    owner_column,
                    target_column,
                } => {
                    let link = quote(&format!("{}__link", join.alias));
                    format!(
                        " LEFT JOIN {} AS {link} ON {link}.{} = {owner}.{id} \
                         LEFT JOIN {table} AS {target} ON {target}.{id} = {link}.{} AND {live}",
                        quote(join_table),
                        quote(owner_column),
                        quote(target_column)
                    )
                }
            };
            sql.push_str(&clause);
        }
        sql
    }

    fn render_where(&self, extra: Option<&WhereClause>) -> (String, Vec<Value>) {
        let mut conditions = Vec::new();
        let mut params = Vec::new();

        let tombstone = self.column_ref(SOFT_DELETE_COLUMN);
        match self.trash {
            TrashFilter::Exclude => conditions.push(format!("{tombstone} IS NULL")),
            TrashFilter::Only => conditions.push(format!("{tombstone} IS NOT NULL")),
            TrashFilter::Include => {}
        }

        for clause in self.wheres.iter().chain(extra) {
            conditions.push(format!("({})", clause.sql));
            params.extend(clause.params.iter().cloned());
        }

        if conditions.is_empty() {
            return (String::new(), params);
        }
        (format!(" WHERE {}", conditions.join(" AND ")), params)
    }

    fn render_order(&self, joins: &[ResolvedJoin<'_>]) -> QueryResult<String> {
        let mut clauses = Vec::with_capacity(self.orders.len() + 1);
        let mut orders_by_root_id = false;

        for order in &self.orders {
            let (alias, target) = match order.alias.as_deref() {
                None => (self.alias.as_str(), self.descriptor),
                Some(alias) if alias == self.alias => (self.alias.as_str(), self.descriptor),
                Some(alias) => {
                    let join = joins
                        .iter()
                        .find(|join| join.alias == alias)
                        .ok_or_else(|| QueryError::UnknownAlias(alias.to_string()))?;
                    (join.alias, join.target)
                }
            };
            if !target.has_column(&order.column) {
                return Err(QueryError::UnknownColumn {
                    alias: alias.to_string(),
                    column: order.column.clone(),
                });
            }
            if alias == self.alias && order.column == PRIMARY_COLUMN {
                orders_by_root_id = true;
            }
            clauses.push(format!(
                "{}.{} {}",
                quote(alias),
                quote(&order.column),
                order.direction.as_sql()
            ));
        }

        // Root id breaks ties so repeated listings keep the same order.
        if !orders_by_root_id {
            clauses.push(format!("{} ASC", self.column_ref(PRIMARY_COLUMN)));
        }
        Ok(format!(" ORDER BY {}", clauses.join(", ")))
    }
}

/// Quotes one SQL identifier.
pub(crate) fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// Converts one SQLite cell to JSON.
pub(crate) fn sql_to_json(value: ValueRef<'_>) -> JsonValue {
    match value {
        ValueRef::Null => JsonValue::Null,
        ValueRef::Integer(number) => JsonValue::from(number),
        ValueRef::Real(number) => serde_json::Number::from_f64(number)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        ValueRef::Text(text) => JsonValue::String(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Blob(bytes) => {
            JsonValue::Array(bytes.iter().map(|b| JsonValue::from(*b)).collect())
        }
    }
}

/// Converts one JSON value to a SQLite bind value.
pub(crate) fn json_to_sql(value: &JsonValue) -> Value {
    match value {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(flag) => Value::Integer(i64::from(*flag)),
        JsonValue::Number(number) => match number.as_i64() {
            Some(integer) => Value::Integer(integer),
            None => number.as_f64().map_or(Value::Null, Value::Real),
        },
        JsonValue::String(text) => Value::Text(text.clone()),
        other => Value::Text(other.to_string()),
    }
}

struct Hydrator<'j, 'q> {
    root: &'static EntityDescriptor,
    joins: &'j [ResolvedJoin<'q>],
    records: Vec<Record>,
    index: HashMap<String, usize>,
    seen: HashSet<(usize, usize, String)>,
}

impl<'j, 'q> Hydrator<'j, 'q> {
    fn new(root: &'static EntityDescriptor, joins: &'j [ResolvedJoin<'q>]) -> Self {
        Self {
            root,
            joins,
            records: Vec::new(),
            index: HashMap::new(),
            seen: HashSet::new(),
        }
    }

    fn push_row(&mut self, row: &Row<'_>) -> RepoResult<()> {
        let Some(root_id) = read_id(row, 0, self.root)? else {
            return Ok(());
        };

        let slot = match self.index.get(&root_id) {
            Some(slot) => *slot,
            None => {
                let mut record = read_record(row, 0, self.root)?;
                for join in self.joins {
                    let empty = if join.relation.kind.is_to_many() {
                        JsonValue::Array(Vec::new())
                    } else {
                        JsonValue::Null
                    };
                    record.insert(join.relation.name.to_string(), empty);
                }
                self.records.push(record);
                self.index.insert(root_id, self.records.len() - 1);
                self.records.len() - 1
            }
        };

        let mut offset = self.root.columns.len();
        for (join_index, join) in self.joins.iter().enumerate() {
            if let Some(target_id) = read_id(row, offset, join.target)? {
                let related = read_record(row, offset, join.target)?;
                let entry = self.records[slot]
                    .entry(join.relation.name)
                    .or_insert(JsonValue::Null);
                match entry {
                    JsonValue::Array(items) => {
                        if self.seen.insert((slot, join_index, target_id)) {
                            items.push(JsonValue::Object(related));
                        }
                    }
                    slot_value if slot_value.is_null() => {
                        *slot_value = JsonValue::Object(related);
                    }
                    _ => {}
                }
            }
            offset += join.target.columns.len();
        }
        Ok(())
    }

    fn finish(self) -> Vec<Record> {
        self.records
    }
}

fn read_record(
    row: &Row<'_>,
    offset: usize,
    descriptor: &EntityDescriptor,
) -> rusqlite::Result<Record> {
    let mut record = Record::new();
    for (index, column) in descriptor.columns.iter().enumerate() {
        record.insert(
            (*column).to_string(),
            sql_to_json(row.get_ref(offset + index)?),
        );
    }
    Ok(record)
}

fn read_id(
    row: &Row<'_>,
    offset: usize,
    descriptor: &EntityDescriptor,
) -> rusqlite::Result<Option<String>> {
    let position = descriptor
        .columns
        .iter()
        .position(|column| *column == PRIMARY_COLUMN)
        .unwrap_or(0);
    let key = match row.get_ref(offset + position)? {
        ValueRef::Null => None,
        ValueRef::Text(text) => Some(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Integer(number) => Some(number.to_string()),
        other => Some(sql_to_json(other).to_string()),
    };
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::{quote, QueryError, SelectQuery, TrashFilter};
    use crate::repo::descriptor::{OrderDirection, MENU, MESSAGE_RECEIVE, PERMISSION, USER};

    #[test]
    fn builder_is_scoped_to_descriptor_alias() {
        let qb = SelectQuery::new(&MESSAGE_RECEIVE);
        assert_eq!(qb.alias(), "message-receive");
        let (sql, params) = qb.to_sql().unwrap();
        assert!(sql.contains("FROM \"message_receives\" AS \"message-receive\""));
        assert!(sql.contains("\"message-receive\".\"deleted_at\" IS NULL"));
        assert!(params.is_empty());
    }

    #[test]
    fn many_to_many_join_goes_through_link_table() {
        let (sql, _) = SelectQuery::new(&PERMISSION)
            .left_join_and_select("roles", "roles")
            .to_sql()
            .unwrap();
        assert!(sql.contains("LEFT JOIN \"role_permissions\" AS \"roles__link\""));
        let join = r#"LEFT JOIN "roles" AS "roles" ON "roles"."id" = "roles__link"."role_id""#;
        assert!(sql.contains(join));
        assert!(sql.contains("\"roles\".\"deleted_at\" IS NULL"));
    }

    #[test]
    fn ordering_appends_root_id_tiebreak() {
        let (sql, _) = SelectQuery::new(&USER)
            .order_by("created_at", OrderDirection::Desc)
            .to_sql()
            .unwrap();
        assert!(sql.ends_with("ORDER BY \"user\".\"created_at\" DESC, \"user\".\"id\" ASC"));
    }

    #[test]
    fn order_by_replaces_previous_ordering() {
        let qb = SelectQuery::new(&MENU)
            .order_by("name", OrderDirection::Asc)
            .order_by("sort", OrderDirection::Desc);
        assert_eq!(
            qb.ordering(),
            vec![("sort".to_string(), OrderDirection::Desc)]
        );
    }

    #[test]
    fn unknown_relation_surfaces_at_render_time() {
        let qb = SelectQuery::new(&USER).left_join_and_select("friends", "friends");
        assert_eq!(
            qb.to_sql().unwrap_err(),
            QueryError::UnknownRelation {
                alias: "user".to_string(),
                relation: "friends".to_string(),
            }
        );
    }

    #[test]
    fn duplicate_join_alias_is_rejected() {
        let err = SelectQuery::new(&USER)
            .left_join_and_select("roles", "user")
            .to_sql()
            .unwrap_err();
        assert_eq!(err, QueryError::DuplicateAlias("user".to_string()));
    }

    #[test]
    fn ordering_on_unknown_column_is_rejected() {
        let err = SelectQuery::new(&USER)
            .order_by("age", OrderDirection::Asc)
            .to_sql()
            .unwrap_err();
        assert!(matches!(err, QueryError::UnknownColumn { column, .. } if column == "age"));
    }

    #[test]
    fn trash_filters_render_tombstone_conditions() {
        let (include, _) = SelectQuery::new(&USER).with_deleted().to_sql().unwrap();
        assert!(!include.contains("\"user\".\"deleted_at\" IS"));

        let only = SelectQuery::new(&USER).only_deleted();
        assert_eq!(only.trash_filter(), TrashFilter::Only);
        let (sql, _) = only.to_sql().unwrap();
        assert!(sql.contains("\"user\".\"deleted_at\" IS NOT NULL"));
    }

    #[test]
    fn where_in_empty_ids_matches_nothing() {
        let (sql, params) = SelectQuery::new(&USER).where_in_ids(&[]).to_sql().unwrap();
        assert!(sql.contains("(0 = 1)"));
        assert!(params.is_empty());
    }

    #[test]
    fn quote_escapes_embedded_quotes() {
        assert_eq!(quote("a\"b"), "\"a\"\"b\"");
    }
}
