//! PostgreSQL-in-docker backup and restore against a real container

use super::common::{is_docker_available, psql, start_postgres_container};
use chrono::Local;
use db_backups::utils::confirm::AssumeYes;
use db_backups::{
    BackupManager, BackupRequest, Collaborators, DestinationKind, HandlerKind, RestoreManager,
    RestoreRequest,
};
use std::sync::Arc;
use test_utils::ConfigBuilder;

#[test]
#[ignore] // Requires Docker
fn test_pg_container_backup_and_restore() {
    if !is_docker_available() {
        println!("Skipping test: Docker not available");
        return;
    }

    let container = format!("db-backups-it-{}", std::process::id());
    let guard = start_postgres_container(&container).expect("Failed to start PostgreSQL");

    psql(guard.name(), "orders", "CREATE TABLE items (id int); INSERT INTO items VALUES (42);")
        .expect("Failed to seed database");

    let builder = ConfigBuilder::new()
        .with_local_dir("local")
        .with_pg_user("postgres");
    let local_dir = builder.path("local");
    let (config, _temp_dir) = builder.build();

    let report = BackupManager::new(config.clone())
        .run(&BackupRequest {
            db_name: "orders".to_string(),
            handler: HandlerKind::PgContainer,
            container: Some(guard.name().to_string()),
            destinations: vec![DestinationKind::Local],
            file: None,
            encrypt: false,
            pass_spec: None,
        })
        .expect("Backup failed");
    assert!(local_dir.join(&report.artifact_name).is_file());

    psql(guard.name(), "orders", "DELETE FROM items;").expect("Failed to clear table");

    let collaborators = Collaborators {
        confirm: Arc::new(AssumeYes),
        ..Collaborators::default()
    };
    let restored = RestoreManager::with_collaborators(config, collaborators)
        .run(&RestoreRequest {
            db_name: "orders".to_string(),
            handler: HandlerKind::PgContainer,
            container: Some(guard.name().to_string()),
            source: DestinationKind::Local,
            file: None,
            date: Local::now().date_naive(),
            pass_spec: None,
        })
        .expect("Restore failed");

    assert_eq!(restored, report.artifact_name);
    assert_eq!(
        psql(guard.name(), "orders", "SELECT id FROM items;").unwrap(),
        "42"
    );
}
