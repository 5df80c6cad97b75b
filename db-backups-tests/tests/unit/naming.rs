//! Artifact naming and date matching

use chrono::{Local, NaiveDate, TimeZone};
use db_backups::utils::naming::{
    backup_filename, decrypted_path, encrypted_path, is_backup_for_date, ArtifactPaths,
};
use rstest::rstest;
use std::path::{Path, PathBuf};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_artifact_paths_share_timestamp() {
    let now = Local.with_ymd_and_hms(2024, 3, 1, 2, 0, 5).unwrap();
    let paths = ArtifactPaths::new(Path::new("/work"), "orders", "postgres", now);

    assert_eq!(
        paths.raw,
        PathBuf::from("/work/2024-03-01-020005.orders.backup.postgres.sql")
    );
    assert_eq!(
        paths.compressed,
        PathBuf::from("/work/2024-03-01-020005.orders.backup.tar.gz")
    );
}

#[test]
fn test_same_second_names_collide() {
    let now = Local.with_ymd_and_hms(2024, 3, 1, 2, 0, 5).unwrap();
    assert_eq!(
        backup_filename("orders", ".tar.gz", now),
        backup_filename("orders", ".tar.gz", now)
    );
}

#[rstest]
#[case("2024-03-01-020005.orders.backup.tar.gz", true)]
#[case("2024-03-01-020005.orders.backup.tar.gz.enc", true)]
#[case("2024-03-01-020005.orders.backup.mysql.sql", false)]
#[case("2024-03-02-020005.orders.backup.tar.gz", false)]
#[case("notes-2024-03-01.tar.gz", false)]
fn test_is_backup_for_date(#[case] name: &str, #[case] expected: bool) {
    assert_eq!(is_backup_for_date(name, day(2024, 3, 1)), expected);
}

#[test]
fn test_encrypted_suffix_is_appended_and_stripped() {
    let archive = Path::new("/work/x.backup.tar.gz");
    let encrypted = encrypted_path(archive);

    assert_eq!(encrypted, PathBuf::from("/work/x.backup.tar.gz.enc"));
    assert_eq!(decrypted_path(&encrypted), archive);
    assert_eq!(decrypted_path(archive), archive);
}
