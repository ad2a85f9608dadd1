//! Menu tree use cases.

use crate::model::{EntityId, Record};
use crate::repo::error::RepoResult;
use crate::repo::tree_repo::TreeRepository;
use crate::util::to_flat_trees;

pub struct MenuService<'conn> {
    repo: TreeRepository<'conn>,
}

impl<'conn> MenuService<'conn> {
    pub fn new(repo: TreeRepository<'conn>) -> Self {
        Self { repo }
    }

    /// Nested menu trees with `permission` resolved on every node.
    pub fn trees(&self) -> RepoResult<Vec<Record>> {
        self.repo.find_trees()
    }

    /// Menu trees flattened depth first, each node tagged with `depth`.
    pub fn flat(&self) -> RepoResult<Vec<Record>> {
        Ok(to_flat_trees(self.repo.find_trees()?, 0))
    }

    /// Root-to-node breadcrumb for `id`.
    pub fn breadcrumb(&self, id: EntityId) -> RepoResult<Vec<Record>> {
        self.repo.find_ancestors(id)
    }
}
