//! Backup runs: validation, fan-out, encryption and work dir cleanup

use db_backups::{BackupRequest, DestinationKind, ErrorKind, HandlerKind};
use serial_test::serial;
use std::path::PathBuf;
use test_utils::{
    ConfigBuilder, MockExecutor, MockObjectStorage, MockResponse, StorageCall, TestContext,
    sample_s3_settings,
};

fn request(handler: HandlerKind, destinations: &[DestinationKind]) -> BackupRequest {
    BackupRequest {
        db_name: "orders".to_string(),
        handler,
        container: None,
        destinations: destinations.to_vec(),
        file: None,
        encrypt: false,
        pass_spec: None,
    }
}

#[test]
fn test_pg_backup_to_local_and_s3() {
    let ctx = TestContext::new();
    let manager = ctx.backup_manager();

    let report = manager
        .run(&request(
            HandlerKind::Pg,
            &[DestinationKind::Local, DestinationKind::S3],
        ))
        .unwrap();

    assert!(report.artifact_name.ends_with(".orders.backup.tar.gz"));
    assert!(!report.encrypted);
    assert_eq!(report.locations.len(), 2);

    // LOCAL copy
    let local_files = ctx.list_files(&ctx.local_dir());
    assert_eq!(local_files, vec![report.artifact_name.clone()]);
    assert_eq!(
        PathBuf::from(&report.locations[0]),
        ctx.local_dir().join(&report.artifact_name)
    );

    // S3 object under the configured prefix
    let key = format!("nightly/{}", report.artifact_name);
    assert_eq!(ctx.storage.keys(), vec![key.clone()]);
    assert_eq!(
        report.locations[1],
        format!("https://s3.example.test/backups/{}", key)
    );

    assert!(ctx.leftover_work_dirs().is_empty());
}

#[test]
fn test_mysql_backup_to_file_destination_creates_directory() {
    let ctx = TestContext::new();
    let target = ctx.temp_dir().join("exports/mysql");
    let mut req = request(HandlerKind::Mysql, &[DestinationKind::File]);
    req.file = Some(target.clone());

    let report = ctx.backup_manager().run(&req).unwrap();

    assert!(target.join(&report.artifact_name).is_file());
    assert!(ctx.executor.was_called("mysqldump"));
    assert!(ctx.storage.get_calls().is_empty());
}

#[test]
fn test_file_destination_without_argument_fails_before_dump() {
    let ctx = TestContext::new();

    let err = ctx
        .backup_manager()
        .run(&request(HandlerKind::Pg, &[DestinationKind::File]))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(err.to_string().contains("requires a file argument"));
    assert!(ctx.executor.get_calls().is_empty());
    assert!(ctx.leftover_work_dirs().is_empty());
}

#[test]
#[serial]
fn test_missing_s3_settings_fail_before_dump() {
    for name in db_backups::config::S3_VARIABLES {
        std::env::remove_var(name);
    }
    let ctx = TestContext::from_builder(ConfigBuilder::minimal());

    let err = ctx
        .backup_manager()
        .run(&request(HandlerKind::Pg, &[DestinationKind::S3]))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(err.missing_variables().len(), 6);
    assert!(!ctx.executor.was_called("pg_dump"));
}

#[test]
fn test_s3_failure_after_local_copy_keeps_work_dir() {
    let ctx = TestContext::new()
        .with_storage(MockObjectStorage::new(sample_s3_settings()).failing_uploads());

    let err = ctx
        .backup_manager()
        .run(&request(
            HandlerKind::Pg,
            &[DestinationKind::Local, DestinationKind::S3],
        ))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transfer);
    assert!(err.to_string().contains("S3"));

    // LOCAL already succeeded and is not rolled back
    assert_eq!(ctx.list_files(&ctx.local_dir()).len(), 1);
    assert!(matches!(
        ctx.storage.get_calls().as_slice(),
        [StorageCall::Upload { .. }]
    ));

    let leftovers = ctx.leftover_work_dirs();
    assert_eq!(leftovers.len(), 1);
    assert!(ctx
        .list_files(&leftovers[0])
        .iter()
        .any(|name| name.ends_with(".tar.gz")));
}

#[test]
fn test_failed_dump_delivers_nothing() {
    let executor = MockExecutor::new().expect(
        "pg_dump",
        MockResponse::Failure {
            output: "pg_dump: error: database \"orders\" does not exist".to_string(),
            exit_code: 1,
        },
    );
    let ctx = TestContext::new().with_executor(executor);

    let err = ctx
        .backup_manager()
        .run(&request(
            HandlerKind::Pg,
            &[DestinationKind::Local, DestinationKind::S3],
        ))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Execution);
    assert!(ctx.list_files(&ctx.local_dir()).is_empty());
    assert!(ctx.storage.get_calls().is_empty());
}

#[test]
#[serial]
fn test_encrypted_backup_uploads_enc_artifact() {
    std::env::remove_var("ENCRYPT_PASS");
    let ctx = TestContext::from_builder(
        ConfigBuilder::minimal()
            .with_s3(&sample_s3_settings())
            .with_encrypt_pass("cipher-secret"),
    );
    let mut req = request(HandlerKind::Pg, &[DestinationKind::S3]);
    req.encrypt = true;

    let report = ctx.backup_manager().run(&req).unwrap();

    assert!(report.encrypted);
    assert!(report.artifact_name.ends_with(".tar.gz.enc"));
    assert_eq!(
        ctx.storage.keys(),
        vec![format!("nightly/{}", report.artifact_name)]
    );

    let cipher = ctx
        .executor
        .get_calls()
        .into_iter()
        .find(|c| c.line.starts_with("openssl enc"))
        .unwrap();
    assert!(cipher.line.contains("-e -pbkdf2 -iter 10000 -pass env:ENCRYPT_PASS"));
    assert!(!cipher.line.contains("cipher-secret"));
    assert_eq!(
        cipher.envs,
        vec![("ENCRYPT_PASS".to_string(), "cipher-secret".to_string())]
    );
}

#[test]
#[serial]
fn test_encryption_without_secret_fails_before_dump() {
    std::env::remove_var("ENCRYPT_PASS");
    let ctx = TestContext::new();
    let mut req = request(HandlerKind::Pg, &[DestinationKind::Local]);
    req.encrypt = true;

    let err = ctx.backup_manager().run(&req).unwrap_err();

    assert_eq!(err.missing_variables(), ["ENCRYPT_PASS".to_string()]);
    assert!(ctx.executor.get_calls().is_empty());
}
