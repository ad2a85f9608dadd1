//! Generic CRUD use cases driven by validated request DTOs.
//!
//! # Responsibility
//! - Map list/detail/delete/restore DTOs onto repository calls.
//!
//! # Invariants
//! - Reads always go through the repository's default scope.
//! - A delete without an explicit `trashed` flag moves rows to the trash.

use crate::dto::query::{DeleteDto, DetailQueryDto, ListQueryDto, RestoreDto};
use crate::model::{EntityId, Record};
use crate::repo::base_repo::{BaseRepository, DeleteSummary};
use crate::repo::error::RepoResult;
use crate::repo::page::Paginated;
use crate::repo::query::TrashFilter;

/// Use-case service over one entity repository.
pub struct CrudService<'conn> {
    repo: BaseRepository<'conn>,
}

impl<'conn> CrudService<'conn> {
    pub fn new(repo: BaseRepository<'conn>) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &BaseRepository<'conn> {
        &self.repo
    }

    /// One page of records honoring the requested trash mode.
    pub fn list(&self, query: &ListQueryDto) -> RepoResult<Paginated<Record>> {
        let trash = query.trashed.filter();
        self.repo.paginate(query.page, query.limit, trash, |qb| qb)
    }

    /// One record; trashed records only when `trashed` is set.
    pub fn detail(&self, id: EntityId, query: &DetailQueryDto) -> RepoResult<Record> {
        self.repo.find_one(id, query.trashed.unwrap_or(false))
    }

    pub fn delete(&self, request: &DeleteDto) -> RepoResult<DeleteSummary> {
        let trash = request.trashed.unwrap_or(true);
        self.repo.delete(&request.ids, trash)
    }

    /// Restores trashed records and returns them.
    pub fn restore(&self, request: &RestoreDto) -> RepoResult<Vec<Record>> {
        self.repo.restore(&request.ids)
    }

    /// Every live record in default scope.
    pub fn all(&self) -> RepoResult<Vec<Record>> {
        self.repo.find(TrashFilter::Exclude)
    }
}
