//! In-process entity registry.
//!
//! Associates each entity kind with its descriptor and tree capability so
//! callers can resolve repositories by kind at runtime.

use crate::model::kind::EntityKind;
use crate::repo::base_repo::BaseRepository;
use crate::repo::descriptor::{EntityDescriptor, ALL_DESCRIPTORS};
use crate::repo::subscriber::SubscriberSet;
use crate::repo::tree_repo::TreeRepository;
use log::debug;
use rusqlite::Connection;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Entity registration/lookup errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    InvalidAlias(String),
    DuplicateEntity(EntityKind),
    EntityNotRegistered(EntityKind),
    NotTreeEntity(EntityKind),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidAlias(value) => write!(f, "entity alias is invalid: {value}"),
            Self::DuplicateEntity(kind) => write!(f, "entity already registered: {kind}"),
            Self::EntityNotRegistered(kind) => write!(f, "entity not registered: {kind}"),
            Self::NotTreeEntity(kind) => write!(f, "entity has no tree capability: {kind}"),
        }
    }
}

impl Error for RegistryError {}

/// One registered entity.
#[derive(Debug, Clone, Copy)]
pub struct RegisteredEntity {
    pub descriptor: &'static EntityDescriptor,
    pub is_tree: bool,
}

/// Runtime entity registry.
#[derive(Default)]
pub struct RepositoryRegistry {
    entities: BTreeMap<EntityKind, RegisteredEntity>,
    subscribers: SubscriberSet,
}

impl RepositoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in entity and the default subscribers.
    pub fn with_defaults() -> Result<Self, RegistryError> {
        let mut registry = Self {
            entities: BTreeMap::new(),
            subscribers: SubscriberSet::with_defaults(),
        };
        for descriptor in ALL_DESCRIPTORS {
            registry.register(descriptor)?;
        }
        Ok(registry)
    }

    /// Replaces the subscribers handed to every resolved repository.
    pub fn set_subscribers(&mut self, subscribers: SubscriberSet) {
        self.subscribers = subscribers;
    }

    /// Registers one entity descriptor.
    pub fn register(&mut self, descriptor: &'static EntityDescriptor) -> Result<(), RegistryError> {
        if !is_valid_alias(descriptor.alias) {
            return Err(RegistryError::InvalidAlias(descriptor.alias.to_string()));
        }
        if self.entities.contains_key(&descriptor.kind) {
            return Err(RegistryError::DuplicateEntity(descriptor.kind));
        }

        self.entities.insert(
            descriptor.kind,
            RegisteredEntity {
                descriptor,
                is_tree: descriptor.is_tree(),
            },
        );
        debug!(
            "event=registry_register module=registry status=ok kind={} alias={} tree={}",
            descriptor.kind,
            descriptor.alias,
            descriptor.is_tree()
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Registered kinds in sorted order.
    pub fn kinds(&self) -> Vec<EntityKind> {
        self.entities.keys().copied().collect()
    }

    pub fn get(&self, kind: EntityKind) -> Option<RegisteredEntity> {
        self.entities.get(&kind).copied()
    }

    pub fn is_tree(&self, kind: EntityKind) -> Result<bool, RegistryError> {
        Ok(self.require(kind)?.is_tree)
    }

    /// Repository for `kind` over `conn`.
    pub fn repository<'conn>(
        &self,
        kind: EntityKind,
        conn: &'conn Connection,
    ) -> Result<BaseRepository<'conn>, RegistryError> {
        let entity = self.require(kind)?;
        let repo = BaseRepository::new(conn, entity.descriptor);
        Ok(repo.with_subscribers(self.subscribers.clone()))
    }

    /// Tree repository for `kind` over `conn`.
    pub fn tree_repository<'conn>(
        &self,
        kind: EntityKind,
        conn: &'conn Connection,
    ) -> Result<TreeRepository<'conn>, RegistryError> {
        if !self.is_tree(kind)? {
            return Err(RegistryError::NotTreeEntity(kind));
        }
        TreeRepository::try_new(self.repository(kind, conn)?)
            .map_err(|_| RegistryError::NotTreeEntity(kind))
    }

    fn require(&self, kind: EntityKind) -> Result<RegisteredEntity, RegistryError> {
        match self.get(kind) {
            Some(entity) => Ok(entity),
            None => Err(RegistryError::EntityNotRegistered(kind)),
        }
    }
}

fn is_valid_alias(value: &str) -> bool {
    if value.is_empty() {
        return false;
    }
    value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}
