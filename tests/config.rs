use assert_matches::assert_matches;

use ccvi_catalog::config::{Config, ConfigLoader};
use ccvi_catalog::domain::{AssemblyStrategy, ArchiveEntry, FileRole};
use ccvi_catalog::error::CcviError;

fn parse(json: serde_json::Value) -> Config {
    serde_json::from_value(json).unwrap()
}

#[test]
fn minimal_config_uses_ccvi_defaults() {
    let config = parse(serde_json::json!({
        "qtr_url": "https://example.org/latest.zip",
        "full_url": "https://example.org/full.zip",
    }));

    let resolved = ConfigLoader::resolve_config(config).unwrap();
    assert_eq!(resolved.qtr_filename, "latest_data.zip");
    assert_eq!(resolved.full_filename, "latest_data_full.zip");
    assert_eq!(resolved.year_column, "year");
    assert_eq!(resolved.quarter_column, "quarter");
    assert_eq!(resolved.strategy, AssemblyStrategy::Full);
    assert_eq!(resolved.dataset.name, "climate-conflict-vulnerability-index");
    assert_eq!(
        resolved
            .roles
            .role_of(&ArchiveEntry::new("exposure_layers.parquet", 1)),
        FileRole::PrimaryTimeSeries
    );
}

#[test]
fn overrides_are_applied() {
    let config = parse(serde_json::json!({
        "qtr_url": "https://example.org/latest.zip",
        "full_url": "https://example.org/full.zip",
        "year_column": "yr",
        "quarter_column": "qtr",
        "strategy": "summary",
        "dataset": { "name": "ccvi-test", "tags": ["geodata"] },
        "roles": [{ "pattern": "^NOTES\\.txt$", "role": "structure_doc" }],
    }));

    let resolved = ConfigLoader::resolve_config(config).unwrap();
    assert_eq!(resolved.year_column, "yr");
    assert_eq!(resolved.quarter_column, "qtr");
    assert_eq!(resolved.strategy, AssemblyStrategy::Summary);
    assert_eq!(resolved.dataset.name, "ccvi-test");
    assert_eq!(resolved.dataset.title, "Climate Conflict Vulnerability Index");
    assert_eq!(resolved.dataset.tags, vec!["geodata".to_string()]);
    assert_eq!(
        resolved.roles.role_of(&ArchiveEntry::new("README.md", 1)),
        FileRole::Payload
    );
}

#[test]
fn invalid_values_are_rejected() {
    let bad_url = parse(serde_json::json!({
        "qtr_url": "not a url",
        "full_url": "https://example.org/full.zip",
    }));
    assert_matches!(
        ConfigLoader::resolve_config(bad_url),
        Err(CcviError::InvalidConfig(_))
    );

    let same_names = parse(serde_json::json!({
        "qtr_url": "https://example.org/latest.zip",
        "full_url": "https://example.org/full.zip",
        "qtr_filename": "data.zip",
        "full_filename": "data.zip",
    }));
    assert_matches!(
        ConfigLoader::resolve_config(same_names),
        Err(CcviError::InvalidConfig(_))
    );

    let same_columns = parse(serde_json::json!({
        "qtr_url": "https://example.org/latest.zip",
        "full_url": "https://example.org/full.zip",
        "year_column": "period",
        "quarter_column": "period",
    }));
    assert_matches!(
        ConfigLoader::resolve_config(same_columns),
        Err(CcviError::InvalidConfig(message)) if message.contains("quarter_column")
    );

    let bad_pattern = parse(serde_json::json!({
        "qtr_url": "https://example.org/latest.zip",
        "full_url": "https://example.org/full.zip",
        "roles": [{ "pattern": "(", "role": "payload" }],
    }));
    assert_matches!(
        ConfigLoader::resolve_config(bad_pattern),
        Err(CcviError::InvalidPattern { .. })
    );
}

#[test]
fn explicit_path_must_exist() {
    let temp = tempfile::tempdir().unwrap();
    let missing = temp.path().join("absent.json");
    assert_matches!(
        ConfigLoader::resolve(missing.to_str()),
        Err(CcviError::ConfigRead(_))
    );

    let broken = temp.path().join("broken.json");
    std::fs::write(&broken, "{ not json").unwrap();
    assert_matches!(
        ConfigLoader::resolve(broken.to_str()),
        Err(CcviError::ConfigParse(_))
    );
}
