//! Container-mediated PostgreSQL: confirmation and in-container cleanup

use db_backups::{ErrorKind, HandlerKind};
use parking_lot::Mutex;
use std::sync::Arc;
use test_utils::{MockExecutor, MockResponse, TestContext, SAMPLE_DUMP};

const LISTING: &str = " orders    | postgres | UTF8 | C | C |\n template1 | postgres | UTF8 | C | C |\n";

fn existing_database_executor() -> MockExecutor {
    MockExecutor::new().expect(
        "-lqt",
        MockResponse::Success {
            output: LISTING.to_string(),
        },
    )
}

#[test]
fn test_existing_database_prompts_once_and_drops_on_yes() {
    let prompts = Arc::new(Mutex::new(Vec::new()));
    let recorded = prompts.clone();
    let ctx = TestContext::new()
        .with_executor(existing_database_executor())
        .with_confirm(move |prompt: &str| {
            recorded.lock().push(prompt.to_string());
            true
        });
    let raw = ctx.create_file("incoming/orders.sql", SAMPLE_DUMP);
    let handler = ctx
        .handler(HandlerKind::PgContainer, "orders", Some("pg-main"))
        .unwrap();

    handler.restore(&raw).unwrap();

    let prompts = prompts.lock();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("orders"));

    let lines = ctx.executor.lines();
    let drop = lines.iter().position(|l| l.contains("dropdb")).unwrap();
    let create = lines.iter().position(|l| l.contains("createdb")).unwrap();
    let replay = lines.iter().position(|l| l.contains("ON_ERROR_STOP=1")).unwrap();
    assert!(drop < create && create < replay);
}

#[test]
fn test_declined_prompt_leaves_database_untouched() {
    let ctx = TestContext::new()
        .with_executor(existing_database_executor())
        .with_confirm(|_: &str| false);
    let raw = ctx.create_file("incoming/orders.sql", SAMPLE_DUMP);
    let handler = ctx
        .handler(HandlerKind::PgContainer, "orders", Some("pg-main"))
        .unwrap();

    let err = handler.restore(&raw).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Restore);
    assert!(err.to_string().contains("database exists: orders"));
    assert!(!ctx.executor.was_called("dropdb"));
    assert!(!ctx.executor.was_called("ON_ERROR_STOP=1"));
}

#[test]
fn test_similar_database_name_does_not_count_as_existing() {
    let executor = MockExecutor::new().expect(
        "-lqt",
        MockResponse::Success {
            output: " orders_archive | postgres | UTF8 | C | C |\n".to_string(),
        },
    );
    let ctx = TestContext::new()
        .with_executor(executor)
        .with_confirm(|_: &str| -> bool { panic!("no prompt expected") });
    let raw = ctx.create_file("incoming/orders.sql", SAMPLE_DUMP);
    let handler = ctx
        .handler(HandlerKind::PgContainer, "orders", Some("pg-main"))
        .unwrap();

    handler.restore(&raw).unwrap();

    assert!(!ctx.executor.was_called("dropdb"));
    assert_eq!(ctx.executor.call_count("createdb"), 1);
}

#[test]
fn test_backup_survives_failed_container_cleanup() {
    let executor = MockExecutor::new().expect(
        "rm -f",
        MockResponse::Failure {
            output: "rm: cannot remove".to_string(),
            exit_code: 1,
        },
    );
    let ctx = TestContext::new().with_executor(executor);
    let handler = ctx
        .handler(HandlerKind::PgContainer, "orders", Some("pg-main"))
        .unwrap();

    let archive = handler.backup().unwrap();

    assert!(archive.exists());
    let lines = ctx.executor.lines();
    assert!(lines[0].starts_with("docker exec pg-main sh -c"));
    assert!(lines[1].starts_with("docker cp pg-main:/tmp/"));
    assert!(ctx.executor.was_called("rm -f /tmp/"));
}
