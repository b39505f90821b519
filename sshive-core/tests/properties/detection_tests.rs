//! Property-based tests for terminal detection
//!
//! Detection runs against generated tool inventories so the results do not
//! depend on what the test host has installed.

use std::sync::Arc;

use proptest::prelude::*;
use sshive_core::terminal::profiles_for;
use sshive_core::{LaunchError, Platform, TerminalDetector, ToolSet};

fn linux_executables() -> Vec<&'static str> {
    profiles_for(Platform::Linux)
        .into_iter()
        .map(|p| p.executable)
        .collect()
}

fn arb_installed() -> impl Strategy<Value = Vec<&'static str>> {
    prop::sample::subsequence(linux_executables(), 0..=linux_executables().len())
}

fn detector(installed: &[&str], preferred: Option<String>) -> TerminalDetector {
    let tools = ToolSet::new().with_tools(installed);
    TerminalDetector::new(Platform::Linux, Arc::new(tools)).with_preferred(preferred)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: detection picks the best-ranked installed terminal
    #[test]
    fn prop_detect_picks_best_rank(installed in arb_installed()) {
        let result = detector(&installed, None).detect();
        if installed.is_empty() {
            prop_assert!(matches!(result, Err(LaunchError::NoTerminalFound(_))));
        } else {
            let best = profiles_for(Platform::Linux)
                .into_iter()
                .find(|p| installed.contains(&p.executable))
                .unwrap();
            prop_assert_eq!(result.unwrap().name(), best.name);
        }
    }

    /// Property: repeated detection over the same inventory gives the same answer
    #[test]
    fn prop_detection_is_deterministic(installed in arb_installed()) {
        let first = detector(&installed, None).detect_all();
        let second = detector(&installed, None).detect_all();
        prop_assert_eq!(first.len(), installed.len());
        prop_assert_eq!(first, second);
    }

    /// Property: all detected terminals are listed in rank order
    #[test]
    fn prop_detect_all_ranked(installed in arb_installed()) {
        let ranks: Vec<u8> = detector(&installed, None)
            .detect_all()
            .iter()
            .map(|t| t.profile.priority_rank)
            .collect();
        prop_assert!(ranks.windows(2).all(|w| w[0] <= w[1]));
    }

    /// Property: an installed preferred terminal wins, a missing one is ignored
    #[test]
    fn prop_preferred_terminal(
        installed in arb_installed(),
        preferred in prop::sample::select(linux_executables()),
    ) {
        let with_pref = detector(&installed, Some(preferred.to_string())).detect();
        let without = detector(&installed, None).detect();

        if installed.contains(&preferred) {
            prop_assert_eq!(with_pref.unwrap().profile.executable, preferred);
        } else {
            prop_assert_eq!(with_pref.ok(), without.ok());
        }
    }
}
