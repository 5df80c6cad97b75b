//! Backup and restore through every handler kind

use db_backups::{ErrorKind, HandlerKind};
use rstest::rstest;
use test_utils::{MockExecutor, MockResponse, TestContext, SAMPLE_DUMP};

fn container_for(kind: HandlerKind) -> Option<&'static str> {
    kind.requires_container().then_some("pg-main")
}

#[rstest]
#[case(HandlerKind::Mysql, "mysqldump")]
#[case(HandlerKind::Pg, "pg_dump")]
#[case(HandlerKind::PgContainer, "docker exec pg-main")]
fn test_backup_leaves_only_the_archive(#[case] kind: HandlerKind, #[case] dump_marker: &str) {
    let ctx = TestContext::new();
    let handler = ctx.handler(kind, "orders", container_for(kind)).unwrap();

    let archive = handler.backup().unwrap();

    assert!(ctx.executor.was_called(dump_marker));
    assert!(ctx.executor.was_called("tar -czf"));
    assert!(archive.exists());
    assert!(archive.to_string_lossy().ends_with(".orders.backup.tar.gz"));

    let files = ctx.list_files(&ctx.handler_work_dir());
    assert_eq!(files.len(), 1, "raw dump should be removed: {:?}", files);
}

#[rstest]
#[case(HandlerKind::Mysql)]
#[case(HandlerKind::Pg)]
fn test_passwords_never_reach_recorded_masks(#[case] kind: HandlerKind) {
    let ctx = TestContext::new();
    let handler = ctx.handler(kind, "orders", None).unwrap();

    handler.backup().unwrap();

    for call in ctx.executor.get_calls() {
        assert!(!call.masked.contains("pg-secret"), "{}", call.masked);
        assert!(!call.masked.contains("mysql-secret"), "{}", call.masked);
    }
}

#[rstest]
#[case(HandlerKind::Mysql)]
#[case(HandlerKind::Pg)]
#[case(HandlerKind::PgContainer)]
fn test_restore_unpacks_archive_and_replays(#[case] kind: HandlerKind) {
    let ctx = TestContext::new();
    let archive = ctx.create_file(
        "incoming/2024-03-01-020000.orders.backup.tar.gz",
        "fake archive",
    );
    let handler = ctx.handler(kind, "orders", container_for(kind)).unwrap();

    handler.restore(&archive).unwrap();

    assert!(ctx.executor.was_called("tar -xzf"));
    let extracted = ctx.handler_work_dir().join("extracted");
    assert!(
        ctx.list_files(&extracted).is_empty(),
        "extracted dump should be removed"
    );
}

#[test]
fn test_restore_accepts_raw_dump() {
    let ctx = TestContext::new();
    let raw = ctx.create_file("incoming/orders.sql", SAMPLE_DUMP);
    let handler = ctx.handler(HandlerKind::Pg, "orders", None).unwrap();

    handler.restore(&raw).unwrap();

    assert!(!ctx.executor.was_called("tar -xzf"));
    assert!(ctx.executor.was_called("ON_ERROR_STOP=1"));
    assert!(raw.exists(), "caller's dump is not removed");
}

#[test]
fn test_restore_of_missing_backup_fails_before_any_command() {
    let ctx = TestContext::new();
    let handler = ctx.handler(HandlerKind::Mysql, "orders", None).unwrap();

    let err = handler
        .restore(&ctx.temp_dir().join("nope.tar.gz"))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Restore);
    assert!(err.to_string().contains("backup does not exist"));
    assert!(ctx.executor.get_calls().is_empty());
}

#[test]
fn test_failed_dump_stops_before_archiving() {
    let executor = MockExecutor::new().expect(
        "pg_dump",
        MockResponse::Failure {
            output: "pg_dump: error: connection to server failed".to_string(),
            exit_code: 1,
        },
    );
    let ctx = TestContext::new().with_executor(executor);
    let handler = ctx.handler(HandlerKind::Pg, "orders", None).unwrap();

    let err = handler.backup().unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Execution);
    assert!(err.to_string().contains("connection to server failed"));
    assert!(!ctx.executor.was_called("tar -czf"));
}

#[test]
fn test_clean_exit_without_dump_is_artifact_missing() {
    let mut ctx = TestContext::new();
    // No fake tools: the dump exits cleanly but writes nothing
    ctx.executor = MockExecutor::new();
    let handler = ctx.handler(HandlerKind::Mysql, "orders", None).unwrap();

    let err = handler.backup().unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ArtifactMissing);
    assert!(!ctx.executor.was_called("tar -czf"));
}

#[test]
fn test_missing_dump_binary_is_configuration_error() {
    let executor = MockExecutor::new().without_binary("mysqldump");
    let ctx = TestContext::new().with_executor(executor);
    let handler = ctx.handler(HandlerKind::Mysql, "orders", None).unwrap();

    let err = handler.backup().unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(ctx.executor.get_calls().is_empty());
}

#[rstest]
#[case(HandlerKind::PgContainer, "orders", None)]
#[case(HandlerKind::PgContainer, "orders", Some("  "))]
#[case(HandlerKind::Pg, "", None)]
fn test_invalid_handler_arguments(
    #[case] kind: HandlerKind,
    #[case] db_name: &str,
    #[case] container: Option<&str>,
) {
    let ctx = TestContext::new();
    let err = ctx.handler(kind, db_name, container).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}
