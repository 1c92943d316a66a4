// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Sanity checks for the shared fixtures

use sql_understanding_test_utils::{LineCost, SqlFixtures, scope};
use sql_understanding_analyzer::StatementCollector;

#[test]
fn test_fixture_trees_fit_their_sources() {
    for fixture in [
        SqlFixtures::close_orders(),
        SqlFixtures::two_procedures(),
        SqlFixtures::package_spec(),
        SqlFixtures::flat_statements(5),
    ] {
        fixture.tree.validate().expect("fixture tree is well formed");
        let lines = fixture.source.lines().count() as u32;
        assert_eq!(fixture.tree.end_line, lines, "{}", fixture.source);
    }
}

#[test]
fn test_fixture_procedures_are_named() {
    let scope = scope();
    let fixture = SqlFixtures::two_procedures();
    let collection = StatementCollector::new(&fixture.source, &scope, &LineCost::default())
        .collect(&fixture.tree)
        .unwrap();

    let keys: Vec<&str> = collection.procedures.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec![
            "PKG_ORDERS:pkg_orders.sql:RELEASE:7",
            "PKG_ORDERS:pkg_orders.sql:RESERVE:2"
        ]
    );
}
