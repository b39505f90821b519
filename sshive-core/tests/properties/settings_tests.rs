//! Property-based tests for settings persistence and validation

use std::path::PathBuf;

use proptest::prelude::*;
use sshive_core::{AppSettings, ConfigError, ConfigManager, LaunchSettings, TerminalSettings};
use tempfile::TempDir;

fn arb_valid_settings() -> impl Strategy<Value = AppSettings> {
    (
        any::<bool>(),
        2u64..=120,
        1u64..=120,
        0u64..=60_000,
        any::<bool>(),
        prop::option::of("/tmp/[a-z]{1,8}"),
        prop::option::of("[A-Za-z][A-Za-z -]{0,15}"),
    )
        .prop_flat_map(|(verify, preflight, conversion, grace, hold, temp, preferred)| {
            (1..preflight).prop_map(move |connect| AppSettings {
                launch: LaunchSettings {
                    verify_credentials: verify,
                    preflight_timeout_secs: preflight,
                    connect_timeout_secs: connect,
                    conversion_timeout_secs: conversion,
                    key_handoff_grace_ms: grace,
                    hold_window_on_failure: hold,
                    temp_dir: temp.clone().map(PathBuf::from),
                },
                terminal: TerminalSettings {
                    preferred: preferred.clone(),
                },
            })
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property: valid settings survive a save and load unchanged
    #[test]
    fn prop_settings_persist(settings in arb_valid_settings()) {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_config_dir(dir.path().to_path_buf());

        manager.save_settings(&settings).unwrap();
        let loaded = manager.load_settings().unwrap();
        prop_assert_eq!(loaded, settings);
    }

    /// Property: a connect timeout not shorter than the probe bound is rejected
    #[test]
    fn prop_connect_timeout_bounded(preflight in 1u64..=60, extra in 0u64..=60) {
        let mut settings = AppSettings::default();
        settings.launch.preflight_timeout_secs = preflight;
        settings.launch.connect_timeout_secs = preflight + extra;

        let result = ConfigManager::validate_settings(&settings);
        prop_assert!(
            matches!(result, Err(ConfigError::Validation { ref field, .. }) if field == "launch.connect_timeout_secs"),
            "unexpected result: {:?}",
            result
        );
    }
}
