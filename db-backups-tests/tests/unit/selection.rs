//! Handler and destination selection from user input

use db_backups::destinations::{parse_destination_list, resolve_all, Destination};
use db_backups::utils::encryption::PassSpec;
use db_backups::{DestinationKind, ErrorKind, HandlerKind};
use rstest::rstest;
use serial_test::serial;
use std::path::{Path, PathBuf};
use test_utils::{sample_s3_settings, ConfigBuilder};

#[rstest]
#[case("MYSQL", HandlerKind::Mysql)]
#[case("pg", HandlerKind::Pg)]
#[case(" Pg_Container ", HandlerKind::PgContainer)]
fn test_handler_keys_are_case_insensitive(#[case] input: &str, #[case] expected: HandlerKind) {
    assert_eq!(input.parse::<HandlerKind>().unwrap(), expected);
}

#[test]
fn test_unknown_handler_is_configuration_error() {
    let err = "ORACLE".parse::<HandlerKind>().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn test_container_handler_requires_container() {
    assert!(HandlerKind::PgContainer.requires_container());
    assert!(!HandlerKind::Pg.requires_container());
    assert_eq!(HandlerKind::PgContainer.required_variables(), ["PG_USER"]);
}

#[rstest]
#[case("LOCAL", vec![DestinationKind::Local])]
#[case("s3, local", vec![DestinationKind::S3, DestinationKind::Local])]
#[case("FILE,LOCAL,file", vec![DestinationKind::File, DestinationKind::Local])]
fn test_destination_lists(#[case] input: &str, #[case] expected: Vec<DestinationKind>) {
    assert_eq!(parse_destination_list(input).unwrap(), expected);
}

#[rstest]
#[case("")]
#[case(" , ")]
#[case("LOCAL,FTP")]
fn test_bad_destination_lists(#[case] input: &str) {
    let err = parse_destination_list(input).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn test_file_destination_requires_argument() {
    let (config, _temp_dir) = ConfigBuilder::minimal().build();

    let err = resolve_all(&[DestinationKind::File], None, &config).unwrap_err();
    assert!(err.to_string().contains("requires a file argument"));

    let resolved = resolve_all(&[DestinationKind::File], Some(Path::new("/srv/out")), &config)
        .unwrap();
    assert_eq!(resolved, vec![Destination::File(PathBuf::from("/srv/out"))]);
}

#[test]
#[serial]
fn test_missing_variables_are_reported_together() {
    std::env::remove_var("LOCAL_PATH");
    for name in db_backups::config::S3_VARIABLES {
        std::env::remove_var(name);
    }
    let (config, _temp_dir) = ConfigBuilder::new().build();

    let err = resolve_all(&[DestinationKind::S3, DestinationKind::Local], None, &config)
        .unwrap_err();
    let missing = err.missing_variables();
    assert_eq!(missing.len(), 7);
    assert!(missing.contains(&"S3_BUCKET_NAME".to_string()));
    assert!(missing.contains(&"LOCAL_PATH".to_string()));
}

#[test]
#[serial]
fn test_resolves_configured_destinations_in_order() {
    for name in db_backups::config::S3_VARIABLES {
        std::env::remove_var(name);
    }
    std::env::remove_var("LOCAL_PATH");
    let settings = sample_s3_settings();
    let (config, _temp_dir) = ConfigBuilder::minimal().with_s3(&settings).build();

    let resolved =
        resolve_all(&[DestinationKind::Local, DestinationKind::S3], None, &config).unwrap();
    assert_eq!(resolved[0].kind(), DestinationKind::Local);
    assert_eq!(resolved[1], Destination::S3(settings));
}

#[rstest]
#[case("env:ENCRYPT_PASS", PassSpec::Env("ENCRYPT_PASS".to_string()))]
#[case("file:/etc/db-backups/pass", PassSpec::File(PathBuf::from("/etc/db-backups/pass")))]
#[case("fd:3", PassSpec::Fd(3))]
fn test_pass_specs(#[case] input: &str, #[case] expected: PassSpec) {
    let spec: PassSpec = input.parse().unwrap();
    assert_eq!(spec, expected);
    assert_eq!(spec.to_string(), input);
}

#[test]
fn test_plain_password_spec_is_rejected() {
    assert!("pass:hunter2".parse::<PassSpec>().is_err());
    assert!("fd:three".parse::<PassSpec>().is_err());
}
