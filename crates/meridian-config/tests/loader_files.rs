//! File-based loading tests.

use std::io::Write;

use meridian_config::{ConfigError, ConfigLoader, Environment, ServiceUrlResolver};
use tempfile::Builder;

fn write_file(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_toml_file() {
    let file = write_file(
        ".toml",
        r#"
        service_name = "orders"
        service_version = "1.4.0"
        environment = "production"

        [http]
        timeout_secs = 3.0

        [services]
        census = "http://census:8001/"
        billing = "https://billing.internal"
        "#,
    );

    let settings = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();

    assert_eq!(settings.service_name, "orders");
    assert_eq!(settings.environment, Environment::Production);
    assert_eq!(settings.http.timeout().unwrap().as_secs(), 3);

    let resolver = ServiceUrlResolver::new(settings);
    assert_eq!(resolver.get_base_url("census").unwrap(), "http://census:8001");
    assert_eq!(resolver.list_services(), vec!["billing", "census"]);
}

#[test]
fn test_load_json_file() {
    let file = write_file(
        ".json",
        r#"{"service_name": "orders", "logging": {"level": "warn", "json": false}}"#,
    );

    let settings = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();

    assert_eq!(settings.logging.level, "warn");
    assert!(!settings.log_config().json_format);
}

#[test]
fn test_unknown_extension_rejected() {
    let file = write_file(".yaml", "service_name: orders");
    let result = ConfigLoader::new().with_file(file.path());
    assert!(matches!(result, Err(ConfigError::UnsupportedFormat { .. })));
}

#[test]
fn test_unknown_field_rejected() {
    let file = write_file(
        ".toml",
        r#"
        service_name = "orders"
        census_base_url = "http://census:8001"
        "#,
    );
    let result = ConfigLoader::new().with_file(file.path());
    assert!(matches!(result, Err(ConfigError::Toml(_))));
}

#[test]
fn test_optional_file_present() {
    let file = write_file(".toml", r#"service_name = "billing""#);
    let settings = ConfigLoader::new()
        .with_optional_file(file.path())
        .unwrap()
        .load()
        .unwrap();
    assert_eq!(settings.service_name, "billing");
}
