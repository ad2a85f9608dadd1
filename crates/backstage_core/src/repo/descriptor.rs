//! Entity descriptors: the per-entity default query scope as data.
//!
//! # Responsibility
//! - Describe table, alias, columns and relations for every entity.
//! - Carry each entity's default scope: eager joins and ordering.
//!
//! # Invariants
//! - `alias` is the SQL alias used by every query built for the entity.
//! - Every name in `joins` is a relation declared in `relations`; a joined
//!   relation is aliased by its own name.
//! - Applying the default scope is pure with respect to its input builder.

use crate::model::kind::EntityKind;
use crate::repo::query::SelectQuery;

/// Soft delete tombstone column shared by every entity table.
pub const SOFT_DELETE_COLUMN: &str = "deleted_at";
/// Primary key column shared by every entity table.
pub const PRIMARY_COLUMN: &str = "id";

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl OrderDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// One ordering clause on a root column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub field: &'static str,
    pub direction: OrderDirection,
}

impl OrderBy {
    pub const fn asc(field: &'static str) -> Self {
        Self {
            field,
            direction: OrderDirection::Asc,
        }
    }

    pub const fn desc(field: &'static str) -> Self {
        Self {
            field,
            direction: OrderDirection::Desc,
        }
    }
}

/// How a relation is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// Foreign key `column` on the owner table points at the target id.
    ManyToOne { column: &'static str },
    /// Foreign key `inverse_column` on the target table points at the owner id.
    OneToMany { inverse_column: &'static str },
    /// Link rows in `join_table`.
    ManyToMany {
        join_table: &'static str,
        owner_column: &'static str,
        target_column: &'static str,
    },
}

impl RelationKind {
    /// Whether the hydrated relation is a list.
    pub fn is_to_many(self) -> bool {
        !matches!(self, Self::ManyToOne { .. })
    }
}

/// Named relation from one entity to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    pub name: &'static str,
    pub target: EntityKind,
    pub kind: RelationKind,
}

/// Hierarchy declaration for tree entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeSpec {
    /// Self-referencing foreign key column.
    pub parent_column: &'static str,
    /// Relation holding nested children in assembled trees.
    pub children_relation: &'static str,
}

/// Static description of one entity and its default query scope.
#[derive(Debug)]
pub struct EntityDescriptor {
    pub kind: EntityKind,
    pub table: &'static str,
    pub alias: &'static str,
    pub columns: &'static [&'static str],
    pub relations: &'static [Relation],
    /// Relations eagerly left-joined by the default scope.
    pub joins: &'static [&'static str],
    pub order: Option<OrderBy>,
    /// `Some` marks the tree capability.
    pub tree: Option<TreeSpec>,
}

impl EntityDescriptor {
    pub fn relation(&self, name: &str) -> Option<&'static Relation> {
        self.relations.iter().find(|relation| relation.name == name)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(&column)
    }

    pub fn is_tree(&self) -> bool {
        self.tree.is_some()
    }

    /// Applies this entity's eager joins and ordering to `qb`.
    pub fn apply_default_scope(&self, qb: SelectQuery) -> SelectQuery {
        let qb = self.joins.iter().fold(qb, |qb, relation| {
            qb.left_join_and_select(relation, relation)
        });
        match self.order {
            Some(order) => qb.order_by(order.field, order.direction),
            None => qb,
        }
    }
}

// Every table carries `id` first and the three timestamp columns last.
macro_rules! columns {
    ($($column:literal),* $(,)?) => {
        &["id", $($column,)* "created_at", "updated_at", "deleted_at"]
    };
}

pub static ACTION: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::Action,
    table: "actions",
    alias: "action",
    columns: columns!("name", "description"),
    relations: &[],
    joins: &[],
    order: None,
    tree: None,
};

pub static AVATAR: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::Avatar,
    table: "avatars",
    alias: "avatar",
    columns: columns!("url", "user_id"),
    relations: &[],
    joins: &[],
    order: Some(OrderBy::desc("created_at")),
    tree: None,
};

pub static BANNER: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::Banner,
    table: "banners",
    alias: "banner",
    columns: columns!("title", "link", "image_id"),
    relations: &[Relation {
        name: "image",
        target: EntityKind::Media,
        kind: RelationKind::ManyToOne { column: "image_id" },
    }],
    joins: &["image"],
    order: Some(OrderBy::asc("created_at")),
    tree: None,
};

pub static MEDIA: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::Media,
    table: "medias",
    alias: "media",
    columns: columns!("name", "url", "mime"),
    relations: &[],
    joins: &[],
    order: Some(OrderBy::asc("created_at")),
    tree: None,
};

pub static PERMISSION: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::Permission,
    table: "permissions",
    alias: "permission",
    columns: columns!("name", "label", "description"),
    relations: &[Relation {
        name: "roles",
        target: EntityKind::Role,
        kind: RelationKind::ManyToMany {
            join_table: "role_permissions",
            owner_column: "permission_id",
            target_column: "role_id",
        },
    }],
    joins: &["roles"],
    order: None,
    tree: None,
};

pub static ROLE: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::Role,
    table: "roles",
    alias: "role",
    columns: columns!("name", "label"),
    relations: &[Relation {
        name: "permissions",
        target: EntityKind::Permission,
        kind: RelationKind::ManyToMany {
            join_table: "role_permissions",
            owner_column: "role_id",
            target_column: "permission_id",
        },
    }],
    joins: &["permissions"],
    order: None,
    tree: None,
};

pub static MESSAGE: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::Message,
    table: "messages",
    alias: "message",
    columns: columns!("title", "body", "sender_id"),
    relations: &[],
    joins: &[],
    order: Some(OrderBy::desc("created_at")),
    tree: None,
};

pub static MESSAGE_RECEIVE: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::MessageReceive,
    table: "message_receives",
    alias: "message-receive",
    columns: columns!("message_id", "receiver_id", "read_at"),
    relations: &[],
    joins: &[],
    order: None,
    tree: None,
};

pub static USER: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::User,
    table: "users",
    alias: "user",
    columns: columns!("username", "nickname", "email", "avatar_id"),
    relations: &[
        Relation {
            name: "roles",
            target: EntityKind::Role,
            kind: RelationKind::ManyToMany {
                join_table: "user_roles",
                owner_column: "user_id",
                target_column: "role_id",
            },
        },
        Relation {
            name: "permissions",
            target: EntityKind::Permission,
            kind: RelationKind::ManyToMany {
                join_table: "user_permissions",
                owner_column: "user_id",
                target_column: "permission_id",
            },
        },
        Relation {
            name: "avatar",
            target: EntityKind::Avatar,
            kind: RelationKind::ManyToOne {
                column: "avatar_id",
            },
        },
    ],
    joins: &["roles", "permissions", "avatar"],
    order: Some(OrderBy::desc("created_at")),
    tree: None,
};

pub static MENU: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::Menu,
    table: "menus",
    alias: "menu",
    columns: columns!("name", "path", "sort", "parent_id", "permission_id"),
    relations: &[
        Relation {
            name: "p",
            target: EntityKind::Permission,
            kind: RelationKind::ManyToOne {
                column: "permission_id",
            },
        },
        Relation {
            name: "parent",
            target: EntityKind::Menu,
            kind: RelationKind::ManyToOne {
                column: "parent_id",
            },
        },
        Relation {
            name: "children",
            target: EntityKind::Menu,
            kind: RelationKind::OneToMany {
                inverse_column: "parent_id",
            },
        },
    ],
    joins: &["p", "parent", "children"],
    order: Some(OrderBy::asc("sort")),
    tree: Some(TreeSpec {
        parent_column: "parent_id",
        children_relation: "children",
    }),
};

/// Every built-in descriptor, in `EntityKind::ALL` order.
pub static ALL_DESCRIPTORS: [&EntityDescriptor; 10] = [
    &ACTION,
    &AVATAR,
    &BANNER,
    &MEDIA,
    &PERMISSION,
    &ROLE,
    &MESSAGE,
    &MESSAGE_RECEIVE,
    &USER,
    &MENU,
];

/// Returns the built-in descriptor for `kind`.
pub fn descriptor(kind: EntityKind) -> &'static EntityDescriptor {
    match kind {
        EntityKind::Action => &ACTION,
        EntityKind::Avatar => &AVATAR,
        EntityKind::Banner => &BANNER,
        EntityKind::Media => &MEDIA,
        EntityKind::Permission => &PERMISSION,
        EntityKind::Role => &ROLE,
        EntityKind::Message => &MESSAGE,
        EntityKind::MessageReceive => &MESSAGE_RECEIVE,
        EntityKind::User => &USER,
        EntityKind::Menu => &MENU,
    }
}
