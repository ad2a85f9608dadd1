//! Permission listing, optionally narrowed to one role.

use crate::dto::query::QueryPermissionDto;
use crate::model::{EntityId, Record};
use crate::repo::base_repo::BaseRepository;
use crate::repo::descriptor::PRIMARY_COLUMN;
use crate::repo::error::RepoResult;
use crate::repo::page::Paginated;
use crate::repo::query::{SelectQuery, TrashFilter};
use rusqlite::types::Value;

const GRANTED_TO_ROLE_SQL: &str =
    r#"IN (SELECT "permission_id" FROM "role_permissions" WHERE "role_id" = ?)"#;

pub struct PermissionService<'conn> {
    repo: BaseRepository<'conn>,
}

impl<'conn> PermissionService<'conn> {
    pub fn new(repo: BaseRepository<'conn>) -> Self {
        Self { repo }
    }

    /// Live permissions, limited to those granted to `query.role` when set.
    pub fn list(&self, query: &QueryPermissionDto) -> RepoResult<Paginated<Record>> {
        let role = query.role;
        let scope = |qb: SelectQuery| match role {
            Some(role) => granted_to(qb, role),
            None => qb,
        };
        let trash = TrashFilter::Exclude;
        self.repo.paginate(query.page, query.limit, trash, scope)
    }
}

fn granted_to(qb: SelectQuery, role: EntityId) -> SelectQuery {
    let sql = format!("{} {GRANTED_TO_ROLE_SQL}", qb.column_ref(PRIMARY_COLUMN));
    qb.and_where(sql, [Value::Text(role.to_string())])
}
