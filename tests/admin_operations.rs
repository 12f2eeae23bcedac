// Integration tests for the administrative operations exposed through the
// operation registry.

mod helpers;

use std::collections::HashMap;
use std::sync::Arc;

use helpers::TestDb;
use rulegate::admin::{register_admin_operations, ADMIN_OPERATIONS};
use rulegate::errors::GateError;
use rulegate::registry::{self, BuiltinBundles, OperationRegistry, SharedHandler};
use rulegate::storage::{self, BundleFilter};
use sea_orm::{ConnectionTrait, DatabaseConnection};
use serde_json::{json, Value};

fn admin_registry(db: &DatabaseConnection, loader: BuiltinBundles) -> Arc<OperationRegistry> {
    let registry = Arc::new(OperationRegistry::new());
    register_admin_operations(&registry, db, Arc::new(loader));
    registry
}

fn echo() -> SharedHandler {
    Arc::new(|args: Value| async move { Ok::<_, GateError>(args) })
}

async fn call(registry: &OperationRegistry, name: &str, args: Value) -> Result<Value, GateError> {
    let handler = registry
        .get(name)
        .unwrap_or_else(|| panic!("operation {name} not registered"));
    handler.call(args).await
}

#[tokio::test]
async fn test_all_admin_operations_registered() {
    let test_db = TestDb::new().await;
    let registry = admin_registry(test_db.connection(), BuiltinBundles::new());

    for name in ADMIN_OPERATIONS {
        assert!(registry.contains(name), "missing {name}");
    }
    assert_eq!(registry.len(), ADMIN_OPERATIONS.len());
}

#[tokio::test]
async fn test_rule_lifecycle() {
    let test_db = TestDb::new().await;
    let registry = admin_registry(test_db.connection(), BuiltinBundles::new());

    let user = call(&registry, "addUser", json!({ "phone": "+15551000", "role": "admin" }))
        .await
        .unwrap();
    let group = call(&registry, "addUserGroup", json!({ "name": "ops" }))
        .await
        .unwrap();
    let rule = call(
        &registry,
        "addRule",
        json!({ "operation": "restart", "kind": "userGroup", "type": "allow" }),
    )
    .await
    .unwrap();
    assert_eq!(rule["operation"], "restart");
    assert_eq!(rule["type"], "allow");

    let user_id = user["id"].clone();
    let group_id = group["id"].clone();
    let rule_id = rule["id"].clone();

    call(
        &registry,
        "connectUserGroupToRule",
        json!({ "userGroupId": group_id, "ruleId": rule_id }),
    )
    .await
    .unwrap();
    call(
        &registry,
        "connectUserToGroup",
        json!({ "userId": user_id, "userGroupId": group_id }),
    )
    .await
    .unwrap();

    let details = call(&registry, "getRule", json!({ "id": rule_id })).await.unwrap();
    assert_eq!(details["groups"][0]["name"], "ops");
    assert_eq!(details["users"], json!([]));

    let user_details = call(&registry, "getUser", json!({ "phone": "+15551000" }))
        .await
        .unwrap();
    assert_eq!(user_details["groups"][0]["name"], "ops");

    let group_details = call(&registry, "getUserGroup", json!({ "id": group_id }))
        .await
        .unwrap();
    assert_eq!(group_details["users"][0]["phone"], "+15551000");
    assert_eq!(group_details["rules"][0]["operation"], "restart");

    // disconnecting twice is a no-op
    for _ in 0..2 {
        call(
            &registry,
            "disconnectUserToGroup",
            json!({ "userId": user_id, "userGroupId": group_id }),
        )
        .await
        .unwrap();
    }
    let db = test_db.connection();
    let uid = user_id.as_i64().unwrap() as i32;
    let gid = group_id.as_i64().unwrap() as i32;
    assert!(!storage::membership_exists(db, uid, gid).await.unwrap());

    let updated = call(
        &registry,
        "updateRule",
        json!({ "id": rule_id, "operation": "restart", "kind": "userRole", "type": "deny", "role": "admin" }),
    )
    .await
    .unwrap();
    assert_eq!(updated["kind"], "userRole");
    assert_eq!(updated["role"], "admin");

    let listed = call(&registry, "listRule", json!({ "type": "deny" })).await.unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);

    call(&registry, "removeRule", json!({ "id": rule_id })).await.unwrap();
    assert_eq!(call(&registry, "getRule", json!({ "id": rule_id })).await.unwrap(), Value::Null);

    // removal of a missing rule is reported
    let err = call(&registry, "removeRule", json!({ "id": rule_id })).await.unwrap_err();
    assert!(matches!(err, GateError::NotFound(_)));
}

#[tokio::test]
async fn test_add_rule_validation() {
    let test_db = TestDb::new().await;
    let registry = admin_registry(test_db.connection(), BuiltinBundles::new());

    let err = call(&registry, "addRule", json!({ "operation": "", "kind": "any" }))
        .await
        .unwrap_err();
    assert!(matches!(err, GateError::BadRequest(_)));

    let err = call(
        &registry,
        "addRule",
        json!({ "operation": "op", "kind": "any", "type": "maybe" }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, GateError::BadRequest(_)));

    // malformed input never reaches the store
    let err = call(&registry, "addRule", json!({ "kind": "any" })).await.unwrap_err();
    assert!(matches!(err, GateError::Serde(_)));
}

#[tokio::test]
async fn test_list_operations_accept_missing_filter() {
    let test_db = TestDb::new().await;
    let registry = admin_registry(test_db.connection(), BuiltinBundles::new());

    call(&registry, "addUser", json!({ "phone": "+15552000" })).await.unwrap();
    call(&registry, "addUser", json!({ "phone": "+15552001", "role": "admin" }))
        .await
        .unwrap();

    let all = call(&registry, "listUser", Value::Null).await.unwrap();
    assert_eq!(all.as_array().unwrap().len(), 2);
    assert_eq!(all[0]["role"], "user");

    let admins = call(&registry, "listUser", json!({ "role": "admin" })).await.unwrap();
    assert_eq!(admins.as_array().unwrap().len(), 1);
    assert_eq!(admins[0]["phone"], "+15552001");
}

#[tokio::test]
async fn test_save_bundle_semantics() {
    let test_db = TestDb::new().await;
    let db = test_db.connection();

    let bundle = storage::save_bundle(db, "reports", "/reports/index.js", false)
        .await
        .unwrap();
    assert!(bundle.status);

    let mut disabled = bundle.clone();
    disabled.status = false;
    storage::update_bundle(db, disabled).await.unwrap();

    // pass_if_exist leaves the stored bundle untouched
    let kept = storage::save_bundle(db, "reports", "/reports/index.js", true)
        .await
        .unwrap();
    assert!(!kept.status);
    assert_eq!(kept.id, bundle.id);

    // otherwise an existing bundle is reactivated
    let reactivated = storage::save_bundle(db, "reports", "/reports/index.js", false)
        .await
        .unwrap();
    assert!(reactivated.status);
    assert_eq!(reactivated.id, bundle.id);

    let all = storage::list_bundles(db, BundleFilter::default()).await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn test_sync_bundles_registers_active_bundles() {
    let test_db = TestDb::new().await;
    let db = test_db.connection();

    let loader = BuiltinBundles::new()
        .with_bundle("/reports/index.js", vec![("viewReport".to_string(), echo())]);

    // a stored but inactive bundle is skipped
    let mut stale = storage::save_bundle(db, "legacy", "/legacy/index.js", false)
        .await
        .unwrap();
    stale.status = false;
    storage::update_bundle(db, stale).await.unwrap();

    let configured: HashMap<String, String> = [
        ("reports".to_string(), "/reports/index.js".to_string()),
        ("missing".to_string(), "/missing/index.js".to_string()),
    ]
    .into_iter()
    .collect();

    let registry = OperationRegistry::new();
    let registered = registry::sync_bundles(db, &registry, &loader, &configured)
        .await
        .unwrap();

    // the missing bundle fails to load without aborting the sync
    assert_eq!(registered, 1);
    assert!(registry.contains("viewReport"));

    let active = storage::list_bundles(
        db,
        BundleFilter {
            status: Some(true),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(active.len(), 2);
}

#[tokio::test]
async fn test_sync_bundles_skips_bundle_that_fails_to_save() {
    let test_db = TestDb::new().await;
    let db = test_db.connection();

    db.execute_unprepared(
        "CREATE TRIGGER reject_broken_bundle BEFORE INSERT ON operation_bundles \
         WHEN NEW.bundle_path = '/broken/index.js' \
         BEGIN SELECT RAISE(ABORT, 'bundle rejected'); END;",
    )
    .await
    .unwrap();

    let loader = BuiltinBundles::new()
        .with_bundle("/reports/index.js", vec![("viewReport".to_string(), echo())]);
    let configured: HashMap<String, String> = [
        ("broken".to_string(), "/broken/index.js".to_string()),
        ("reports".to_string(), "/reports/index.js".to_string()),
    ]
    .into_iter()
    .collect();

    let registry = OperationRegistry::new();
    let registered = registry::sync_bundles(db, &registry, &loader, &configured)
        .await
        .unwrap();

    assert_eq!(registered, 1);
    assert!(registry.contains("viewReport"));

    let all = storage::list_bundles(db, BundleFilter::default()).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].bundle_path, "/reports/index.js");
}

#[tokio::test]
async fn test_save_bundle_registers_handlers_immediately() {
    let test_db = TestDb::new().await;
    let loader = BuiltinBundles::new()
        .with_bundle("/reports/index.js", vec![("viewReport".to_string(), echo())]);
    let registry = admin_registry(test_db.connection(), loader);
    assert!(!registry.contains("viewReport"));

    let saved = call(
        &registry,
        "saveBundle",
        json!({ "name": "reports", "modulePath": "/reports/index.js" }),
    )
    .await
    .unwrap();
    assert_eq!(saved["status"], true);
    assert!(registry.contains("viewReport"));

    let out = call(&registry, "viewReport", json!({ "month": 3 })).await.unwrap();
    assert_eq!(out, json!({ "month": 3 }));

    // a bundle the loader cannot provide is still recorded
    let before = registry.len();
    let unknown = call(
        &registry,
        "saveBundle",
        json!({ "name": "audit", "modulePath": "/audit/index.js" }),
    )
    .await
    .unwrap();
    assert_eq!(unknown["bundlePath"], "/audit/index.js");
    assert_eq!(registry.len(), before);
}
