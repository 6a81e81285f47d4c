//! Round-trips against a live `PostgreSQL`, so everything here is
//! `#[ignore]`d by default: `cargo test --test db_integration -- --ignored`
//!
//! Connection comes from the environment:
//!   `LOCKWORK_TEST_DB_HOST` (default: localhost)
//!   `LOCKWORK_TEST_DB_PORT` (default: 5433)
//!   `LOCKWORK_TEST_DB_USER` (default: `lockwork_test`)
//!   `LOCKWORK_TEST_DB_PASSWORD` (default: `lockwork_test`)
//!   `LOCKWORK_TEST_DB_NAME` (default: `lockwork_test`)

#![allow(clippy::unwrap_used)]

use lockwork_db::entities::{access_key, door, permission, user};
use lockwork_db::repositories::{
    AccessKeyRepository, DoorRepository, PermissionRepository, UserRepository,
};
use lockwork_db::test_utils::{TestDatabase, TestDbConfig};
use sea_orm::Set;

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_database_connection() {
    let config = TestDbConfig::default();
    let result = TestDatabase::with_config(config).await;
    assert!(result.is_ok(), "Failed to connect: {:?}", result.err());
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_database_cleanup() {
    let db = TestDatabase::new().await.expect("Failed to connect");
    let result = db.cleanup().await;
    assert!(result.is_ok(), "Cleanup failed: {:?}", result.err());
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_permission_replace_round_trip() {
    let db = TestDatabase::create_unique().await.expect("create db");
    let conn = db.connection().clone();

    let users = UserRepository::new(conn.clone());
    let keys = AccessKeyRepository::new(conn.clone());
    let doors = DoorRepository::new(conn.clone());
    let perms = PermissionRepository::new(conn);

    let admin = users
        .create(user::ActiveModel {
            name: Set("admin".to_string()),
            role: Set(user::UserRole::Admin),
            ..Default::default()
        })
        .await
        .unwrap();

    let key = keys
        .create(access_key::ActiveModel {
            key_uid: Set("04A1B2C3".to_string()),
            label: Set("front desk badge".to_string()),
            user_id: Set(Some(admin.id)),
            status: Set(access_key::KeyStatus::Active),
            ..Default::default()
        })
        .await
        .unwrap();

    let mut door_ids = Vec::new();
    for (name, addr) in [
        ("Main Entrance", "127.0.0.1:9001"),
        ("Server Room", "127.0.0.1:9002"),
        ("Archive", "127.0.0.1:9003"),
    ] {
        let d = doors
            .create(door::ActiveModel {
                name: Set(name.to_string()),
                location: Set("HQ".to_string()),
                device_address: Set(addr.to_string()),
                status: Set(door::DoorStatus::Unknown),
                ..Default::default()
            })
            .await
            .unwrap();
        door_ids.push(d.id);
    }

    // Grant doors 0 and 1, then replace with 1 and 2.
    perms
        .create(permission::ActiveModel {
            key_id: Set(key.id),
            door_id: Set(door_ids[0]),
            granted_by: Set(admin.id),
            granted_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        })
        .await
        .unwrap();
    perms
        .create(permission::ActiveModel {
            key_id: Set(key.id),
            door_id: Set(door_ids[1]),
            granted_by: Set(admin.id),
            granted_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        })
        .await
        .unwrap();

    let outcome = perms
        .replace_for_key(key.id, &[door_ids[1], door_ids[2]], admin.id)
        .await
        .unwrap();
    assert_eq!(outcome.removed, vec![door_ids[0]]);
    assert_eq!(outcome.added, vec![door_ids[2]]);

    let remaining = perms.list_for_key(key.id).await.unwrap();
    let remaining_doors: Vec<i64> = remaining.iter().map(|p| p.door_id).collect();
    assert_eq!(remaining_doors, vec![door_ids[1], door_ids[2]]);

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_key_delete_cascades_permissions() {
    let db = TestDatabase::create_unique().await.expect("create db");
    let conn = db.connection().clone();

    let users = UserRepository::new(conn.clone());
    let keys = AccessKeyRepository::new(conn.clone());
    let doors = DoorRepository::new(conn.clone());
    let perms = PermissionRepository::new(conn);

    let admin = users
        .create(user::ActiveModel {
            name: Set("admin".to_string()),
            role: Set(user::UserRole::Admin),
            ..Default::default()
        })
        .await
        .unwrap();
    let key = keys
        .create(access_key::ActiveModel {
            key_uid: Set("04FFEE00".to_string()),
            label: Set("visitor badge".to_string()),
            user_id: Set(None),
            status: Set(access_key::KeyStatus::Active),
            ..Default::default()
        })
        .await
        .unwrap();
    let d = doors
        .create(door::ActiveModel {
            name: Set("Lobby".to_string()),
            location: Set("HQ".to_string()),
            device_address: Set("127.0.0.1:9010".to_string()),
            status: Set(door::DoorStatus::Unknown),
            ..Default::default()
        })
        .await
        .unwrap();

    perms
        .create(permission::ActiveModel {
            key_id: Set(key.id),
            door_id: Set(d.id),
            granted_by: Set(admin.id),
            granted_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(keys.delete(key.id).await.unwrap(), 1);
    assert!(perms.list_for_door(d.id).await.unwrap().is_empty());

    db.drop_database().await.unwrap();
}

#[test]
fn test_config_from_env() {
    let config = TestDbConfig::default();
    assert!(!config.host.is_empty());
    assert!(config.port > 0);
    assert!(!config.username.is_empty());
    assert!(!config.database.is_empty());
}

#[test]
fn test_database_url_format() {
    let config = TestDbConfig {
        host: "testhost".to_string(),
        port: 5432,
        username: "testuser".to_string(),
        password: "testpass".to_string(),
        database: "testdb".to_string(),
    };

    let url = config.database_url();
    assert!(url.starts_with("postgres://"));
    assert!(url.contains("testhost"));
    assert!(url.contains("5432"));
    assert!(url.contains("testuser"));
    assert!(url.contains("testdb"));
}

#[test]
fn test_postgres_url_format() {
    let config = TestDbConfig::default();
    let url = config.postgres_url();
    assert!(url.ends_with("/postgres"));
}
