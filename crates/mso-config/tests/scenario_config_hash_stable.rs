//! Config hash stability.
//!
//! GREEN when:
//! - The same layers hash identically across calls.
//! - Key order within YAML does not change the hash.
//! - Different values change the hash.
//! - Overlays take effect and the merged result still hashes stably.
//! - Files on disk load the same as their string contents.

use std::io::Write;

use mso_config::{load_layered_yaml, load_layered_yaml_from_strings, MediaConfig};

const BASE_YAML: &str = r#"
media:
  subscription_id: "00000000-0000-0000-0000-000000000001"
  resource_group: "media-rg"
  account_name: "mediaacct"
  arm_endpoint: "https://management.azure.com"
aad:
  token_env: "MSO_ARM_TOKEN"
"#;

const BASE_YAML_REORDERED: &str = r#"
aad:
  token_env: "MSO_ARM_TOKEN"
media:
  arm_endpoint: "https://management.azure.com"
  account_name: "mediaacct"
  resource_group: "media-rg"
  subscription_id: "00000000-0000-0000-0000-000000000001"
"#;

const OVERLAY_YAML: &str = r#"
media:
  resource_group: "media-rg-staging"
  arm_endpoint: "https://management.usgovcloudapi.net"
"#;

#[test]
fn same_input_produces_identical_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();

    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.canonical_json, b.canonical_json);
}

#[test]
fn reordered_keys_produce_same_hash() {
    let original = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let reordered = load_layered_yaml_from_strings(&[BASE_YAML_REORDERED]).unwrap();

    assert_eq!(
        original.config_hash, reordered.config_hash,
        "reordering keys in YAML must not change the hash"
    );
}

#[test]
fn different_values_produce_different_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();

    assert_ne!(a.config_hash, b.config_hash);
}

#[test]
fn overlay_takes_effect_in_media_config() {
    let loaded = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    let media = MediaConfig::from_config_json(&loaded.config_json).unwrap();

    assert_eq!(media.resource_group, "media-rg-staging");
    assert_eq!(media.account_name, "mediaacct");
    assert_eq!(media.arm_endpoint, "https://management.usgovcloudapi.net");
    assert_eq!(media.arm_token_env, "MSO_ARM_TOKEN");
}

#[test]
fn hash_is_64_hex_chars() {
    let loaded = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();

    assert_eq!(loaded.config_hash.len(), 64);
    assert!(loaded.config_hash.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn files_load_like_strings() {
    let mut base = tempfile::NamedTempFile::new().unwrap();
    base.write_all(BASE_YAML.as_bytes()).unwrap();
    let mut overlay = tempfile::NamedTempFile::new().unwrap();
    overlay.write_all(OVERLAY_YAML.as_bytes()).unwrap();

    let base_path = base.path().to_str().unwrap().to_string();
    let overlay_path = overlay.path().to_str().unwrap().to_string();
    let from_files = load_layered_yaml(&[&base_path, &overlay_path]).unwrap();
    let from_strings = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();

    assert_eq!(from_files.config_hash, from_strings.config_hash);
}

#[test]
fn missing_file_names_path() {
    let err = load_layered_yaml(&["/definitely/not/here/mso.yaml"]).unwrap_err();
    assert!(err.to_string().contains("/definitely/not/here/mso.yaml"));
}
