use backstage_core::db::open_db_in_memory;
use backstage_core::model::entity::Menu;
use backstage_core::registry::{RegistryError, RepositoryRegistry};
use backstage_core::repo::entities::{menu_repository, permission_repository, user_repository};
use backstage_core::repo::{decode_all, RepoError, SubscriberSet, TreeRepository};
use backstage_core::service::MenuService;
use backstage_core::{EntityKind, Record};
use rusqlite::Connection;
use serde_json::{json, Value};
use uuid::Uuid;

struct Fixture {
    conn: Connection,
    root: Uuid,
    child_a: Uuid,
    child_b: Uuid,
    leaf: Uuid,
    root2: Uuid,
    trashed: Uuid,
    under_trashed: Uuid,
}

fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

fn id_of(value: &Value) -> String {
    value["id"].as_str().unwrap().to_string()
}

fn ids(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .map(|record| record["id"].as_str().unwrap().to_string())
        .collect()
}

// root (p = menu.view)
// ├── child_a (sort 1, p = menu.view)
// │   └── leaf
// └── child_b (sort 2)
// root2
// └── trashed (deleted)
//     └── under_trashed
fn setup() -> Fixture {
    let conn = open_db_in_memory().unwrap();
    let permission = permission_repository(&conn)
        .insert(&record(json!({ "name": "menu.view" })))
        .unwrap();

    let ids: Vec<Uuid> = (0..7).map(|_| Uuid::new_v4()).collect();
    let fixture = Fixture {
        root: ids[0],
        child_a: ids[1],
        child_b: ids[2],
        leaf: ids[3],
        root2: ids[4],
        trashed: ids[5],
        under_trashed: ids[6],
        conn,
    };

    let menus = menu_repository(&fixture.conn).unwrap();
    let view = Some(permission);
    let rows = [
        (fixture.root, "Root", 0, None, view),
        (fixture.child_b, "Child B", 2, Some(fixture.root), None),
        (fixture.child_a, "Child A", 1, Some(fixture.root), view),
        (fixture.leaf, "Leaf", 0, Some(fixture.child_a), None),
        (fixture.root2, "Root 2", 1, None, None),
        (fixture.trashed, "Trashed", 0, Some(fixture.root2), None),
        (
            fixture.under_trashed,
            "Under Trashed",
            0,
            Some(fixture.trashed),
            None,
        ),
    ];
    for (id, name, sort, parent, permission) in rows {
        menus
            .base()
            .insert(&record(json!({
                "id": id.to_string(),
                "name": name,
                "sort": sort,
                "parent_id": parent.map(|p: Uuid| p.to_string()),
                "permission_id": permission.map(|p: Uuid| p.to_string()),
            })))
            .unwrap();
    }
    menus.base().delete(&[fixture.trashed], true).unwrap();
    fixture
}

#[test]
fn find_trees_nests_live_nodes_in_sort_order() {
    let fixture = setup();
    let menus = menu_repository(&fixture.conn).unwrap();

    let trees = menus.find_trees().unwrap();
    assert_eq!(
        ids(&trees),
        vec![fixture.root.to_string(), fixture.root2.to_string()]
    );

    let children = trees[0]["children"].as_array().unwrap();
    let child_ids: Vec<String> = children.iter().map(id_of).collect();
    assert_eq!(
        child_ids,
        vec![fixture.child_a.to_string(), fixture.child_b.to_string()]
    );
    assert_eq!(id_of(&children[0]["children"][0]), fixture.leaf.to_string());
    assert_eq!(
        trees[1]["children"],
        json!([]),
        "trashed subtree is cut off"
    );

    assert_eq!(trees[0]["permission"], json!("menu.view"));
    assert_eq!(children[0]["permission"], json!("menu.view"));
    assert!(children[1].get("permission").is_none());

    let typed: Vec<Menu> = decode_all(trees).unwrap();
    assert!(typed[0].is_root());
    assert_eq!(typed[0].children[0].children[0].name, "Leaf");
    assert_eq!(typed[0].permission.as_deref(), Some("menu.view"));
}

#[test]
fn find_roots_returns_parentless_live_nodes() {
    let fixture = setup();
    let menus = menu_repository(&fixture.conn).unwrap();
    assert_eq!(
        ids(&menus.find_roots().unwrap()),
        vec![fixture.root.to_string(), fixture.root2.to_string()]
    );
}

#[test]
fn descendants_include_the_node_and_count_excludes_it() {
    let fixture = setup();
    let menus = menu_repository(&fixture.conn).unwrap();

    let mut flat = ids(&menus.find_descendants(fixture.root).unwrap());
    flat.sort();
    let mut expected = vec![
        fixture.root.to_string(),
        fixture.child_a.to_string(),
        fixture.child_b.to_string(),
        fixture.leaf.to_string(),
    ];
    expected.sort();
    assert_eq!(flat, expected);
    assert_eq!(menus.count_descendants(fixture.root).unwrap(), 3);
    assert_eq!(menus.count_descendants(fixture.leaf).unwrap(), 0);
    assert_eq!(menus.count_descendants(fixture.root2).unwrap(), 0);

    let subtree = menus.find_descendants_tree(fixture.child_a).unwrap();
    assert_eq!(subtree["id"], json!(fixture.child_a.to_string()));
    assert_eq!(id_of(&subtree["children"][0]), fixture.leaf.to_string());
}

#[test]
fn ancestors_run_root_first_and_nest_as_a_chain() {
    let fixture = setup();
    let menus = menu_repository(&fixture.conn).unwrap();

    assert_eq!(
        ids(&menus.find_ancestors(fixture.leaf).unwrap()),
        vec![
            fixture.root.to_string(),
            fixture.child_a.to_string(),
            fixture.leaf.to_string()
        ]
    );
    assert_eq!(menus.count_ancestors(fixture.leaf).unwrap(), 2);
    assert_eq!(menus.count_ancestors(fixture.root).unwrap(), 0);

    let chain = menus.find_ancestors_tree(fixture.leaf).unwrap();
    assert_eq!(chain["id"], json!(fixture.root.to_string()));
    let middle = &chain["children"][0];
    assert_eq!(id_of(middle), fixture.child_a.to_string());
    assert_eq!(chain["children"].as_array().unwrap().len(), 1);
    assert_eq!(id_of(&middle["children"][0]), fixture.leaf.to_string());
    assert_eq!(middle["children"][0]["children"], json!([]));
}

#[test]
fn unknown_or_trashed_nodes_are_not_found() {
    let fixture = setup();
    let menus = menu_repository(&fixture.conn).unwrap();

    for id in [Uuid::new_v4(), fixture.trashed] {
        match menus.find_descendants(id) {
            Err(RepoError::NotFound { kind, .. }) => assert_eq!(kind, EntityKind::Menu),
            other => panic!("expected NotFound, got {other:?}"),
        }
        assert!(matches!(
            menus.count_ancestors(id),
            Err(RepoError::NotFound { .. })
        ));
    }
}

#[test]
fn default_scope_joins_parent_children_and_permission() {
    let fixture = setup();
    let menus = menu_repository(&fixture.conn).unwrap();

    let child = menus.base().find_one(fixture.child_a, false).unwrap();
    assert_eq!(child["parent"]["id"], json!(fixture.root.to_string()));
    assert_eq!(child["p"]["name"], json!("menu.view"));
    assert_eq!(child["permission"], json!("menu.view"));
    assert_eq!(child["children"].as_array().unwrap().len(), 1);

    let qb = menus.base_query(menus.base().create_query_builder());
    assert_eq!(
        qb.joined(),
        vec![("p", "p"), ("parent", "parent"), ("children", "children")]
    );
}

#[test]
fn menu_service_flattens_trees_with_depth() {
    let fixture = setup();
    let service = MenuService::new(menu_repository(&fixture.conn).unwrap());

    let flat = service.flat().unwrap();
    let shape: Vec<(String, u64)> = flat
        .iter()
        .map(|node| {
            (
                id_of(&Value::Object(node.clone())),
                node["depth"].as_u64().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        shape,
        vec![
            (fixture.root.to_string(), 0),
            (fixture.child_a.to_string(), 1),
            (fixture.leaf.to_string(), 2),
            (fixture.child_b.to_string(), 1),
            (fixture.root2.to_string(), 0),
        ]
    );

    let crumbs = service.breadcrumb(fixture.child_b).unwrap();
    assert_eq!(
        ids(&crumbs),
        vec![fixture.root.to_string(), fixture.child_b.to_string()]
    );
}

#[test]
fn tree_operations_require_tree_capability() {
    let conn = open_db_in_memory().unwrap();
    match TreeRepository::try_new(user_repository(&conn)) {
        Err(RepoError::NotTree(kind)) => assert_eq!(kind, EntityKind::User),
        Err(other) => panic!("expected NotTree, got {other}"),
        Ok(_) => panic!("user repository must not be a tree"),
    }

    let registry = RepositoryRegistry::with_defaults().unwrap();
    assert!(matches!(
        registry.tree_repository(EntityKind::User, &conn),
        Err(RegistryError::NotTreeEntity(EntityKind::User))
    ));
    assert!(registry.tree_repository(EntityKind::Menu, &conn).is_ok());

    let empty = RepositoryRegistry::new();
    assert!(matches!(
        empty.repository(EntityKind::Menu, &conn),
        Err(RegistryError::EntityNotRegistered(EntityKind::Menu))
    ));
}

#[test]
fn registry_subscribers_can_be_replaced() {
    let fixture = setup();
    let mut registry = RepositoryRegistry::with_defaults().unwrap();
    let derived = registry
        .repository(EntityKind::Menu, &fixture.conn)
        .unwrap()
        .find_one(fixture.child_a, false)
        .unwrap();
    assert_eq!(derived["permission"], json!("menu.view"));

    registry.set_subscribers(SubscriberSet::new());
    let raw = registry
        .repository(EntityKind::Menu, &fixture.conn)
        .unwrap()
        .find_one(fixture.child_a, false)
        .unwrap();
    assert_eq!(raw["p"]["name"], json!("menu.view"));
    assert!(raw.get("permission").is_none());
}
