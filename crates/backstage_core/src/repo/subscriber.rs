//! Post-load entity subscribers.
//!
//! # Responsibility
//! - Derive computed display fields right after records are hydrated.
//!
//! # Invariants
//! - `after_load` is pure: it takes a record and returns a new one.
//! - Subscribers run on root records and on nested relation records of the
//!   kind they listen to.
//! - Re-running a subscriber on its own output yields the same record.

use crate::model::kind::EntityKind;
use crate::model::Record;
use crate::repo::descriptor::descriptor;
use serde_json::Value;
use std::sync::Arc;

/// Hook invoked once per loaded record of one entity kind.
pub trait EntitySubscriber: Send + Sync {
    fn listen_to(&self) -> EntityKind;
    fn after_load(&self, record: Record) -> Record;
}

/// Copies the joined permission name (`p.name`) into `permission` on menus.
///
/// Missing `p` is a no-op and leaves `permission` unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct MenuPermissionSubscriber;

impl EntitySubscriber for MenuPermissionSubscriber {
    fn listen_to(&self) -> EntityKind {
        EntityKind::Menu
    }

    fn after_load(&self, mut record: Record) -> Record {
        let name = record
            .get("p")
            .and_then(|p| p.get("name"))
            .and_then(Value::as_str)
            .map(str::to_owned);
        if let Some(name) = name {
            record.insert("permission".to_string(), Value::String(name));
        }
        record
    }
}

/// Ordered set of subscribers applied by repositories after each load.
#[derive(Clone, Default)]
pub struct SubscriberSet {
    subscribers: Vec<Arc<dyn EntitySubscriber>>,
}

impl SubscriberSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribers every built-in repository runs.
    pub fn with_defaults() -> Self {
        let mut set = Self::new();
        set.register(Arc::new(MenuPermissionSubscriber));
        set
    }

    pub fn register(&mut self, subscriber: Arc<dyn EntitySubscriber>) {
        self.subscribers.push(subscriber);
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Runs matching subscribers on `record` and its nested relations.
    pub fn apply(&self, kind: EntityKind, mut record: Record) -> Record {
        if self.subscribers.is_empty() {
            return record;
        }

        for relation in descriptor(kind).relations {
            let Some(value) = record.remove(relation.name) else {
                continue;
            };
            let value = match value {
                Value::Object(nested) => Value::Object(self.apply(relation.target, nested)),
                Value::Array(items) => Value::Array(
                    items
                        .into_iter()
                        .map(|item| match item {
                            Value::Object(nested) => {
                                Value::Object(self.apply(relation.target, nested))
                            }
                            other => other,
                        })
                        .collect(),
                ),
                other => other,
            };
            record.insert(relation.name.to_string(), value);
        }

        self.subscribers
            .iter()
            .filter(|subscriber| subscriber.listen_to() == kind)
            .fold(record, |record, subscriber| subscriber.after_load(record))
    }
}

#[cfg(test)]
mod tests {
    use super::{EntitySubscriber, MenuPermissionSubscriber, SubscriberSet};
    use crate::model::kind::EntityKind;
    use crate::model::Record;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn copies_permission_name_when_p_is_present() {
        let loaded = MenuPermissionSubscriber.after_load(record(json!({
            "id": "m1",
            "name": "Users",
            "p": { "id": "p1", "name": "user.manage" }
        })));
        assert_eq!(loaded["permission"], json!("user.manage"));
        assert_eq!(loaded["name"], json!("Users"));
    }

    #[test]
    fn leaves_permission_unset_without_p() {
        let loaded = MenuPermissionSubscriber.after_load(record(json!({
            "id": "m1",
            "p": null
        })));
        assert!(!loaded.contains_key("permission"));

        let loaded = MenuPermissionSubscriber.after_load(record(json!({ "id": "m2" })));
        assert!(!loaded.contains_key("permission"));
    }

    #[test]
    fn is_idempotent() {
        let input = record(json!({ "id": "m1", "p": { "name": "menu.view" } }));
        let once = MenuPermissionSubscriber.after_load(input);
        let twice = MenuPermissionSubscriber.after_load(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn set_applies_to_nested_menu_relations_only() {
        let set = SubscriberSet::with_defaults();
        let loaded = set.apply(
            EntityKind::Menu,
            record(json!({
                "id": "root",
                "p": { "id": "p1", "name": "root.view" },
                "parent": null,
                "children": [
                    { "id": "child", "p": { "name": "child.view" } },
                    { "id": "bare" }
                ]
            })),
        );
        assert_eq!(loaded["permission"], json!("root.view"));
        assert_eq!(loaded["children"][0]["permission"], json!("child.view"));
        assert!(loaded["children"][1].get("permission").is_none());
        // `p` is a permission record, not a menu.
        assert!(loaded["p"].get("permission").is_none());
    }

    #[test]
    fn set_ignores_other_kinds() {
        let set = SubscriberSet::with_defaults();
        let input = record(json!({ "id": "u1", "p": { "name": "nope" } }));
        let loaded = set.apply(EntityKind::User, input.clone());
        assert_eq!(loaded, input);
    }
}
