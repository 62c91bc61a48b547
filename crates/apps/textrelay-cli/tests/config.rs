use std::fs;
use tempfile::TempDir;
use textrelay_cli::CliConfig;
use textrelay_core::RelayError;

#[test]
fn loads_cli_config_from_file() {
    let temp = TempDir::new().expect("tempdir");
    let path = temp.path().join("textrelay.toml");
    fs::write(
        &path,
        r#"
[session]
region = "GB"

[loopback]
available = false
fail = ["07700900123"]
"#,
    )
    .expect("write config");

    let config = CliConfig::from_path(&path).expect("load config");
    assert_eq!(config.session.region, "GB");
    assert!(!config.loopback.available);
    assert_eq!(config.loopback.fail, vec!["07700900123".to_owned()]);
    assert!(config.session.address_policy().is_well_formed("07700900123"));
}

#[test]
fn blank_region_in_file_is_rejected() {
    let temp = TempDir::new().expect("tempdir");
    let path = temp.path().join("textrelay.toml");
    fs::write(&path, "[session]\nregion = \"\"\n").expect("write config");

    let err = CliConfig::from_path(&path).unwrap_err();
    assert_eq!(err, RelayError::config("region must not be empty"));
}
