//! Property-based tests for the connection model and group tree

use proptest::prelude::*;
use sshive_core::{AuthMethod, Connection, GroupPath, GroupTree};

// ============================================================================
// Generators
// ============================================================================

fn arb_host() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,10}(\\.[a-z]{2,6}){0,2}"
}

fn arb_user() -> impl Strategy<Value = String> {
    "[a-z_][a-z0-9_]{0,11}"
}

fn arb_segment() -> impl Strategy<Value = String> {
    "[A-Za-z0-9][A-Za-z0-9 _-]{0,10}"
}

fn arb_group_path() -> impl Strategy<Value = GroupPath> {
    prop::collection::vec(arb_segment(), 0..4).prop_map(GroupPath::new)
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: a connection without credential material always validates
    #[test]
    fn prop_plain_connection_is_valid(
        host in arb_host(),
        user in arb_user(),
        port in 1u16..=u16::MAX,
    ) {
        let conn = Connection::new("server", &host, &user).with_port(port);
        prop_assert!(conn.validate().is_ok());
        prop_assert_eq!(conn.auth_method, AuthMethod::None);
        prop_assert_eq!(conn.destination(), format!("{user}@{host}"));
    }

    /// Property: a password is never written out when a connection is serialized
    #[test]
    fn prop_password_never_serialized(
        host in arb_host(),
        user in arb_user(),
        password in "pw-[A-Za-z0-9!#%&*+=?]{8,20}",
    ) {
        let conn = Connection::new("server", &host, &user).with_password(password.clone());
        let json = serde_json::to_string(&conn).unwrap();
        prop_assert!(!json.contains(&password));
        let shown = format!("{conn:?}");
        prop_assert!(!shown.contains(&password));
    }

    /// Property: the key-file method follows the extension, case-insensitively
    #[test]
    fn prop_key_method_follows_extension(stem in "[a-z]{1,10}", upper in any::<bool>()) {
        let ext = if upper { "PPK" } else { "ppk" };
        let ppk = Connection::new("s", "h", "u").with_key(format!("/keys/{stem}.{ext}"));
        prop_assert_eq!(ppk.auth_method, AuthMethod::PpkKey);

        let openssh = Connection::new("s", "h", "u").with_key(format!("/keys/{stem}"));
        prop_assert_eq!(openssh.auth_method, AuthMethod::SshKey);
    }

    /// Property: rendering and re-parsing a group path is stable
    #[test]
    fn prop_group_path_display_parse(path in arb_group_path()) {
        let reparsed = GroupPath::parse(&path.to_string());
        prop_assert_eq!(&reparsed, &path);
        prop_assert_eq!(reparsed.depth(), path.segments().len());
    }

    /// Property: every connection appears exactly once in the group tree
    #[test]
    fn prop_group_tree_counts_connections(
        paths in prop::collection::vec(arb_group_path(), 0..12),
    ) {
        let connections: Vec<Connection> = paths
            .iter()
            .enumerate()
            .map(|(i, path)| {
                Connection::new(format!("c{i}"), "host", "user").with_group_path(path.clone())
            })
            .collect();

        let tree = GroupTree::from_connections(&connections);
        prop_assert_eq!(tree.root().connection_count(), connections.len());

        for conn in &connections {
            let node = tree.find(&conn.group_path);
            prop_assert!(node.is_some());
            prop_assert!(node.unwrap().connections.contains(&conn.id));
        }
    }
}
