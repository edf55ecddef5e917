//! Property-based tests for DSN reduction and rendering.

use super::{Datasource, DatasourceOption, Protocol};
use proptest::prelude::*;

fn word() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,10}"
}

fn option_strategy() -> impl Strategy<Value = DatasourceOption> {
    prop_oneof![
        prop_oneof![Just(Protocol::Unix), Just(Protocol::Tcp)].prop_map(DatasourceOption::Protocol),
        word().prop_map(|s| DatasourceOption::Socket(format!("/tmp/{s}.sock").into())),
        word().prop_map(DatasourceOption::Host),
        (1u16..=65535).prop_map(DatasourceOption::Port),
        word().prop_map(DatasourceOption::Dbname),
        word().prop_map(DatasourceOption::User),
        word().prop_map(DatasourceOption::Password),
        any::<bool>().prop_map(DatasourceOption::ParseTime),
        any::<bool>().prop_map(DatasourceOption::MultiStatements),
    ]
}

proptest! {
    #[test]
    fn exactly_one_addressing_mode(options in prop::collection::vec(option_strategy(), 0..12)) {
        let dsn = Datasource::from_options(options).to_string();
        let unix = dsn.contains("@unix(");
        let tcp = dsn.contains("@tcp(");
        prop_assert!(unix ^ tcp);
    }

    #[test]
    fn reduction_is_last_wins(options in prop::collection::vec(option_strategy(), 0..12), user in word()) {
        let mut with_user = options.clone();
        with_user.push(DatasourceOption::User(user.clone()));
        let ds = Datasource::from_options(with_user);
        prop_assert_eq!(ds.user(), user.as_str());
    }

    #[test]
    fn query_parameters_sorted(options in prop::collection::vec(option_strategy(), 0..12)) {
        let dsn = Datasource::from_options(options).to_string();
        if let Some((_, query)) = dsn.split_once('?') {
            let names: Vec<&str> = query
                .split('&')
                .filter_map(|pair| pair.split_once('=').map(|(name, _)| name))
                .collect();
            let mut sorted = names.clone();
            sorted.sort_unstable();
            prop_assert_eq!(names, sorted);
        }
    }
}
