use backstage_core::db::open_db_in_memory;
use backstage_core::dto::{
    DeleteDto, DetailQueryDto, ListQueryDto, QueryPermissionDto, RestoreDto, TrashMode,
};
use backstage_core::repo::entities::{action_repository, permission_repository, role_repository};
use backstage_core::repo::{DeleteSummary, RepoError};
use backstage_core::service::{CrudService, PermissionService};
use backstage_core::{EntityKind, Record, RepositoryRegistry};
use serde_json::{json, Value};

fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

fn names(records: &[Record]) -> Vec<&str> {
    records
        .iter()
        .map(|record| record["name"].as_str().unwrap())
        .collect()
}

#[test]
fn crud_service_drives_trash_lifecycle_from_dtos() {
    let conn = open_db_in_memory().unwrap();
    let registry = RepositoryRegistry::with_defaults().unwrap();
    let service = CrudService::new(registry.repository(EntityKind::Action, &conn).unwrap());

    let actions = action_repository(&conn);
    let read = actions.insert(&record(json!({ "name": "read" }))).unwrap();
    let write = actions.insert(&record(json!({ "name": "write" }))).unwrap();

    let summary = service
        .delete(&DeleteDto {
            trashed: None,
            ids: vec![read],
        })
        .unwrap();
    assert_eq!(
        summary,
        DeleteSummary {
            trashed: 1,
            purged: 0,
        }
    );

    let live = service.list(&ListQueryDto::default()).unwrap();
    assert_eq!(names(&live.items), vec!["write"]);

    let only = service
        .list(&ListQueryDto {
            trashed: TrashMode::Only,
            ..ListQueryDto::default()
        })
        .unwrap();
    assert_eq!(names(&only.items), vec!["read"]);

    let all = service
        .list(&ListQueryDto {
            trashed: TrashMode::All,
            ..ListQueryDto::default()
        })
        .unwrap();
    assert_eq!(all.meta.total_items, 2);

    assert!(matches!(
        service.detail(read, &DetailQueryDto::default()),
        Err(RepoError::NotFound { .. })
    ));
    let trashed = DetailQueryDto {
        trashed: Some(true),
    };
    let detail = service.detail(read, &trashed).unwrap();
    assert_eq!(detail["name"], json!("read"));

    let restored = service.restore(&RestoreDto { ids: vec![read] }).unwrap();
    assert_eq!(names(&restored), vec!["read"]);
    assert_eq!(service.all().unwrap().len(), 2);

    let summary = service
        .delete(&DeleteDto {
            trashed: Some(false),
            ids: vec![read, write],
        })
        .unwrap();
    assert_eq!(
        summary,
        DeleteSummary {
            trashed: 0,
            purged: 2,
        }
    );
}

#[test]
fn permission_service_filters_by_role() {
    let conn = open_db_in_memory().unwrap();
    let roles = role_repository(&conn);
    let permissions = permission_repository(&conn);

    let admin = roles.insert(&record(json!({ "name": "admin" }))).unwrap();
    let guest = roles.insert(&record(json!({ "name": "guest" }))).unwrap();
    let manage = permissions
        .insert(&record(json!({ "name": "user.manage" })))
        .unwrap();
    let view = permissions
        .insert(&record(json!({ "name": "user.view" })))
        .unwrap();
    permissions
        .insert(&record(json!({ "name": "menu.edit" })))
        .unwrap();
    roles.attach("permissions", admin, &[manage, view]).unwrap();
    roles.attach("permissions", guest, &[view]).unwrap();

    let service = PermissionService::new(permission_repository(&conn));

    let everything = service.list(&QueryPermissionDto::default()).unwrap();
    assert_eq!(everything.meta.total_items, 3);

    let guest_only = service
        .list(&QueryPermissionDto {
            role: Some(guest),
            ..QueryPermissionDto::default()
        })
        .unwrap();
    assert_eq!(names(&guest_only.items), vec!["user.view"]);
    // The default scope still joins every role holding the permission.
    assert_eq!(guest_only.items[0]["roles"].as_array().unwrap().len(), 2);

    let admin_page = service
        .list(&QueryPermissionDto {
            page: 1,
            limit: 1,
            role: Some(admin),
        })
        .unwrap();
    assert_eq!(admin_page.items.len(), 1);
    assert_eq!(admin_page.meta.total_items, 2);
    assert_eq!(admin_page.meta.total_pages, 2);
}
