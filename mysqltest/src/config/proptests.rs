//! Property-based tests for the configuration schema.

use super::schema::{AutoStart, InstanceConfig, Timeouts};
use proptest::prelude::*;
use std::path::PathBuf;
use std::time::Duration;

fn path_strategy() -> impl Strategy<Value = PathBuf> {
    prop::collection::vec("[a-z0-9_]{1,10}", 1..5)
        .prop_map(|parts| PathBuf::from(format!("/{}", parts.join("/"))))
}

fn timeouts_strategy() -> impl Strategy<Value = Timeouts> {
    (1u64..600_000, 1u64..600_000, 1u64..10_000).prop_map(|(launch, connect, tick)| Timeouts {
        launch: Duration::from_millis(launch),
        connect: Duration::from_millis(connect),
        tick: Duration::from_millis(tick),
    })
}

fn config_strategy() -> impl Strategy<Value = InstanceConfig> {
    (
        prop::option::of(path_strategy()),
        prop::option::of(path_strategy()),
        prop::option::of(any::<u16>()),
        any::<bool>(),
        0u8..=2,
        prop::option::of(timeouts_strategy()),
    )
        .prop_map(|(base_dir, socket, port, skip_networking, auto_start, timeouts)| {
            InstanceConfig {
                base_dir,
                socket,
                port,
                skip_networking,
                auto_start: AutoStart::try_from(auto_start).unwrap_or_default(),
                timeouts,
                ..InstanceConfig::default()
            }
        })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 1000,
        .. ProptestConfig::default()
    })]

    // Serializing and re-reading a config is lossless
    #[test]
    fn config_yaml_roundtrip(config in config_strategy()) {
        let yaml = serde_yaml::to_string(&config).unwrap();
        let back: InstanceConfig = serde_yaml::from_str(&yaml).unwrap();
        prop_assert_eq!(back, config);
    }

    // Only 0, 1 and 2 are valid auto-start levels
    #[test]
    fn auto_start_accepts_only_known_levels(value in any::<u8>()) {
        prop_assert_eq!(AutoStart::try_from(value).is_ok(), value <= 2);
    }
}
