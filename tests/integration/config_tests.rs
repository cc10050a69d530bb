//! Config loading: file + environment overlay + validation.

use std::collections::HashMap;

use cngprotect::adapters::config_file::JsonConfigFile;
use cngprotect::adapters::ledger::Signer;
use cngprotect::app::ports::{ConfigError, ConfigPort};
use cngprotect::config::{ArchiveMode, BridgeConfig};

const SENDER: &str = "0x1111111111111111111111111111111111111111";

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn secrets_from_environment_override_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cngprotect.json");
    std::fs::write(
        &path,
        format!(
            r#"{{
                "device_id": "Device_09",
                "ledger": {{ "sender_address": "{SENDER}", "signer_token": "from-file" }},
                "archive": {{ "mode": "local", "local_dir": "/tmp/cng" }}
            }}"#
        ),
    )
    .unwrap();

    let mut cfg = JsonConfigFile::new(&path).load().unwrap();
    cfg.apply_overrides(lookup(&[
        ("CNGPROTECT_SIGNER_TOKEN", "from-env"),
        ("CNGPROTECT_ARCHIVE_KEY", "hmac-key"),
        ("CNGPROTECT_FEED_AUTH", ""),
    ]));

    assert_eq!(cfg.device_id, "Device_09");
    assert_eq!(cfg.ledger.signer_token.as_deref(), Some("from-env"));
    assert_eq!(cfg.archive.signing_key.as_deref(), Some("hmac-key"));
    // Empty values are ignored.
    assert_eq!(cfg.feed.auth_token, None);
    assert_eq!(cfg.archive.mode, ArchiveMode::Local);
    cfg.validate().unwrap();
    assert_eq!(Signer::from_config(&cfg.ledger).unwrap().address().to_string(), SENDER);
}

#[test]
fn defaults_need_only_a_sender() {
    let mut cfg = BridgeConfig::default();
    assert!(matches!(cfg.validate(), Err(ConfigError::ValidationFailed(_))));
    cfg.ledger.sender_address = SENDER.into();
    cfg.validate().unwrap();
    assert_eq!(cfg.device_id, "Device_01");
    assert_eq!(cfg.feed.device_path, "/cng_protect/devices/device_01/live_data");
    assert_eq!(cfg.archive.artifact_path, "./temp_log.json");
}

#[test]
fn unknown_archive_mode_is_corrupted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cngprotect.json");
    std::fs::write(&path, r#"{ "archive": { "mode": "ipfs" } }"#).unwrap();
    assert!(matches!(
        JsonConfigFile::new(&path).load(),
        Err(ConfigError::Corrupted(_))
    ));
}

#[test]
fn wallet_key_from_environment_is_enough_to_run() {
    let key = "46".repeat(32);
    let mut cfg = BridgeConfig::default();
    cfg.apply_overrides(lookup(&[("CNGPROTECT_WALLET_KEY", &key)]));
    cfg.validate().unwrap();
    assert_eq!(cfg.ledger.wallet_key.as_deref(), Some(key.as_str()));
    assert!(cfg.ledger.sender_address.is_empty());
    let signer = Signer::from_config(&cfg.ledger).unwrap();
    assert!(matches!(signer, Signer::Local(_)));
    assert_eq!(signer.address().to_string(), "0x9d8a62f656a8d1615c1294fd71e9cfb3e4855a4f");
}
