//! Property-based tests for path normalization.

use super::is_nested_under;
use super::normalize::{absolutize, resolve_components};
use proptest::prelude::*;
use std::path::{Component, PathBuf};

fn path_component_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9_-]{1,12}"
}

fn absolute_path_strategy() -> impl Strategy<Value = PathBuf> {
    prop::collection::vec(path_component_strategy(), 1..6).prop_map(|parts| {
        let mut path = PathBuf::from("/");
        for part in parts {
            path.push(part);
        }
        path
    })
}

fn dotted_path_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            Just(".".to_string()),
            Just("..".to_string()),
            path_component_strategy(),
        ],
        1..8,
    )
    .prop_map(|parts| format!("/{}", parts.join("/")))
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 2000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn absolutize_is_idempotent(path in absolute_path_strategy()) {
        let once = absolutize(&path).unwrap();
        let twice = absolutize(&once).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn resolved_paths_have_no_dot_components(s in dotted_path_strategy()) {
        if let Ok(resolved) = resolve_components(std::path::Path::new(&s)) {
            for component in resolved.components() {
                prop_assert_ne!(component, Component::CurDir);
                prop_assert_ne!(component, Component::ParentDir);
            }
        }
    }

    #[test]
    fn derived_layout_is_nested(base in absolute_path_strategy(), leaf in path_component_strategy()) {
        let derived = base.join("tmp").join(leaf);
        prop_assert!(is_nested_under(&derived, &base));
        prop_assert!(!is_nested_under(&base, &base));
    }
}
