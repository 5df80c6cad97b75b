//! Restore runs: source lookup by date, decryption and replay

use chrono::NaiveDate;
use db_backups::{DestinationKind, ErrorKind, HandlerKind, RestoreRequest};
use serial_test::serial;
use test_utils::{backup_name, write_backup, ConfigBuilder, StorageCall, TestContext};

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

fn request(handler: HandlerKind, source: DestinationKind) -> RestoreRequest {
    RestoreRequest {
        db_name: "orders".to_string(),
        handler,
        container: None,
        source,
        file: None,
        date: day(),
        pass_spec: None,
    }
}

#[test]
fn test_local_restore_picks_latest_backup_of_the_day() {
    let ctx = TestContext::new();
    let local = ctx.local_dir();
    write_backup(&local, day(), "010000", "orders", ".tar.gz");
    write_backup(&local, day(), "230000", "orders", ".tar.gz");
    write_backup(&local, day().succ_opt().unwrap(), "000001", "orders", ".tar.gz");

    let restored = ctx
        .restore_manager()
        .run(&request(HandlerKind::Pg, DestinationKind::Local))
        .unwrap();

    assert_eq!(restored, backup_name(day(), "230000", "orders", ".tar.gz"));
    assert!(ctx.executor.was_called("230000.orders.backup.tar.gz"));
    assert!(ctx.executor.was_called("ON_ERROR_STOP=1"));
    assert!(ctx.leftover_work_dirs().is_empty());
    // Source files are only copied
    assert_eq!(ctx.list_files(&local).len(), 3);
}

#[test]
#[serial]
fn test_local_restore_decrypts_enc_backup() {
    std::env::remove_var("ENCRYPT_PASS");
    let ctx = TestContext::from_builder(ConfigBuilder::minimal().with_encrypt_pass("cipher-secret"));
    write_backup(&ctx.local_dir(), day(), "020000", "orders", ".tar.gz.enc");

    let restored = ctx
        .restore_manager()
        .run(&request(HandlerKind::Mysql, DestinationKind::Local))
        .unwrap();

    assert_eq!(restored, backup_name(day(), "020000", "orders", ".tar.gz"));

    let lines = ctx.executor.lines();
    let decrypt = lines.iter().position(|l| l.contains("openssl enc")).unwrap();
    let unpack = lines.iter().position(|l| l.contains("tar -xzf")).unwrap();
    let create = lines
        .iter()
        .position(|l| l.contains("CREATE DATABASE IF NOT EXISTS"))
        .unwrap();
    assert!(decrypt < unpack && unpack < create);
    assert!(lines[decrypt].contains(" -d "));
}

#[test]
fn test_s3_restore_downloads_latest_key_for_date() {
    let ctx = TestContext::new();
    let older = format!("nightly/{}", backup_name(day(), "010000", "orders", ".tar.gz"));
    let newer = format!("nightly/{}", backup_name(day(), "020000", "orders", ".tar.gz"));
    ctx.storage.put(&older, b"old archive");
    ctx.storage.put(&newer, b"new archive");
    ctx.storage.put("nightly/2024-03-02-000000.orders.backup.tar.gz", b"next day");

    let restored = ctx
        .restore_manager()
        .run(&request(HandlerKind::Pg, DestinationKind::S3))
        .unwrap();

    assert_eq!(restored, backup_name(day(), "020000", "orders", ".tar.gz"));
    assert_eq!(
        ctx.storage.get_calls(),
        vec![
            StorageCall::List {
                prefix: "nightly/2024-03-01".to_string()
            },
            StorageCall::Download { key: newer },
        ]
    );
}

#[test]
fn test_file_restore_uses_given_archive() {
    let ctx = TestContext::new();
    let archive = ctx.create_file("manual/orders-copy.backup.tar.gz", "fake archive");
    let mut req = request(HandlerKind::Pg, DestinationKind::File);
    req.file = Some(archive.clone());

    let restored = ctx.restore_manager().run(&req).unwrap();

    assert_eq!(restored, "orders-copy.backup.tar.gz");
    assert!(archive.exists());
}

#[test]
fn test_missing_backup_for_date_fails_before_replay() {
    let ctx = TestContext::new();
    write_backup(&ctx.local_dir(), day().pred_opt().unwrap(), "020000", "orders", ".tar.gz");

    let err = ctx
        .restore_manager()
        .run(&request(HandlerKind::Pg, DestinationKind::Local))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Restore);
    assert!(!ctx.executor.was_called("psql"));
}

#[test]
fn test_missing_source_file_is_restore_error() {
    let ctx = TestContext::new();
    let mut req = request(HandlerKind::Pg, DestinationKind::File);
    req.file = Some(ctx.temp_dir().join("absent.tar.gz"));

    let err = ctx.restore_manager().run(&req).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Restore);
    assert!(err.to_string().contains("does not exist"));
    assert!(ctx.executor.get_calls().is_empty());
}

#[test]
fn test_container_restore_requires_container_name() {
    let ctx = TestContext::new();
    write_backup(&ctx.local_dir(), day(), "020000", "orders", ".tar.gz");

    let err = ctx
        .restore_manager()
        .run(&request(HandlerKind::PgContainer, DestinationKind::Local))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(ctx.executor.get_calls().is_empty());
}
