// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! End-to-end runs of the analyzer against the mock oracle

use std::sync::Arc;
use std::time::Duration;

use sql_understanding_analyzer::{
    Analyzer, AnalyzerConfig, AnalyzerError, AnalyzerResult, RunReport, SinkChannel,
};
use sql_understanding_ir::{
    ColumnInfo, DeclaredVariable, LineRange, ParsedNode, RangeAnalysis, TableEntry,
    VariableAnalysis,
};
use sql_understanding_test_utils::{
    GraphAssertions, LineCost, MockOracle, MockOracleBuilder, Recording, RecordingSink,
    SourceFixture, SqlFixtures, config,
};

async fn run(
    fixture: &SourceFixture,
    oracle: Arc<MockOracle>,
    config: AnalyzerConfig,
) -> (AnalyzerResult<RunReport>, Recording) {
    let analyzer = Analyzer::with_token_cost(config, oracle, Arc::new(LineCost::default()))
        .expect("valid config");
    let (channel, endpoint) = SinkChannel::pair(16);
    let consumer = RecordingSink::spawn(endpoint);
    let result = analyzer.run(&fixture.tree, &fixture.source, channel).await;
    (result, consumer.await.expect("consumer task"))
}

fn summary(line: u32, text: &str) -> RangeAnalysis {
    RangeAnalysis::new(LineRange::new(line, line), text)
}

fn close_orders_oracle() -> MockOracleBuilder {
    MockOracleBuilder::new()
        .with_summary(4, 4, "totals the order amounts")
        .with_summary(6, 6, "closes the order")
        .with_analysis(
            7,
            7,
            summary(7, "logs the closure").with_calls(vec!["AUDIT_PKG.LOG_CLOSE"]),
        )
        .with_analysis(
            5,
            8,
            RangeAnalysis::new(LineRange::new(5, 8), "closes large orders")
                .with_variables(vec!["v_total"]),
        )
        .with_table(
            4,
            4,
            TableEntry::new(4, 4, "orders")
                .with_dml_type("SELECT")
                .with_description("customer orders")
                .with_columns(vec![ColumnInfo::new("amount").with_description("order amount")]),
        )
        .with_table(
            6,
            6,
            TableEntry::new(6, 6, "ORDERS")
                .with_dml_type("UPDATE")
                .with_columns(vec![ColumnInfo::new("status").with_description("order state")]),
        )
        .with_variables(
            2,
            2,
            VariableAnalysis {
                summary: Some("running total".to_string()),
                variables: vec![DeclaredVariable {
                    name: "v_total".to_string(),
                    var_type: Some("NUMBER".to_string()),
                    value: Some(serde_json::Value::from(0)),
                    ..Default::default()
                }],
            },
        )
}

#[tokio::test]
async fn test_full_run_streams_every_mutation() {
    let fixture = SqlFixtures::close_orders();
    let oracle = Arc::new(close_orders_oracle().build());

    let (result, recording) = run(&fixture, Arc::clone(&oracle), config()).await;
    let report = result.unwrap();

    assert_eq!(report.nodes, 8);
    assert_eq!(report.procedures, 1);
    assert_eq!(report.batches, 2);
    assert_eq!(report.apply.applied, vec![1, 2]);
    assert_eq!(report.static_graph.declarations, 1);
    GraphAssertions::assert_completed(&recording);

    // Static graph first, then batch statements
    GraphAssertions::assert_before(&recording, "MERGE (parent)-[:PARENT_OF]->(child)", "totals the order amounts");
    GraphAssertions::assert_statement(&recording, "MERGE (v:Variable {name: 'v_total'");
    GraphAssertions::assert_statement(&recording, "role: '변수 선언및 초기화', scope: 'Local'");

    GraphAssertions::assert_statement(&recording, "MERGE (n)-[:FROM]->(t)");
    GraphAssertions::assert_statement(&recording, "MERGE (n)-[:WRITES]->(t)");
    GraphAssertions::assert_statement(&recording, "p.procedure_name = 'LOG_CLOSE'");
    GraphAssertions::assert_statement(&recording, "SET v.`5_8` = 'Used'");
}

#[tokio::test]
async fn test_parent_sees_child_summaries() {
    let fixture = SqlFixtures::close_orders();
    let oracle = Arc::new(close_orders_oracle().build());

    let (result, _) = run(&fixture, Arc::clone(&oracle), config()).await;
    result.unwrap();

    let code = oracle.code_sent_for("5-8").expect("IF was analysed");
    assert!(code.contains("6: closes the order"), "{code}");
    assert!(code.contains("7: logs the closure"), "{code}");
    assert!(!code.contains("UPDATE ORDERS"), "{code}");
}

#[tokio::test]
async fn test_parent_waits_for_slow_child() {
    let fixture = SqlFixtures::close_orders();
    let oracle = Arc::new(
        close_orders_oracle()
            .with_delay(6, 6, Duration::from_millis(150))
            .build(),
    );
    let mut config = config();
    config.token_limit = 10;

    let (result, _) = run(&fixture, Arc::clone(&oracle), config).await;
    let report = result.unwrap();

    // One leaf per batch: SELECT, UPDATE, CALL, then IF
    assert_eq!(report.batches, 4);
    assert_eq!(report.apply.applied, vec![1, 2, 3, 4]);
    let calls = oracle.code_calls();
    assert_eq!(calls.last().map(Vec::as_slice), Some(["5-8".to_string()].as_slice()));
    let code = oracle.code_sent_for("5-8").unwrap();
    assert!(code.contains("6: closes the order"), "{code}");
}

#[tokio::test]
async fn test_batches_apply_in_id_order() {
    let fixture = SqlFixtures::flat_statements(6);
    let mut builder = MockOracleBuilder::new().with_delay(1, 1, Duration::from_millis(200));
    for line in 1..=6 {
        builder = builder.with_summary(line, line, &format!("summary of line {line}"));
    }
    let oracle = Arc::new(builder.build());
    let mut config = config();
    config.token_limit = 20;

    let (result, recording) = run(&fixture, oracle, config).await;
    let report = result.unwrap();

    assert_eq!(report.batches, 3);
    assert_eq!(report.apply.applied, vec![1, 2, 3]);
    GraphAssertions::assert_before(&recording, "summary of line 2", "summary of line 3");
    GraphAssertions::assert_before(&recording, "summary of line 4", "summary of line 5");
}

#[tokio::test]
async fn test_oracle_concurrency_is_bounded() {
    let fixture = SqlFixtures::flat_statements(12);
    let mut builder = MockOracleBuilder::new();
    for line in 1..=12 {
        builder = builder.with_delay(line, line, Duration::from_millis(30));
    }
    let oracle = Arc::new(builder.build());
    let mut config = config();
    config.token_limit = 10;
    config.max_concurrency = 3;

    let (result, recording) = run(&fixture, Arc::clone(&oracle), config).await;
    assert_eq!(result.unwrap().batches, 12);
    assert!(oracle.peak_concurrency() <= 3, "peak {}", oracle.peak_concurrency());
    assert!(oracle.peak_concurrency() >= 2);
    GraphAssertions::assert_completed(&recording);
}

#[tokio::test]
async fn test_procedure_summarised_once_after_all_members() {
    let fixture = SqlFixtures::two_procedures();
    // INSERT gets no analysis; RESERVE still finalises once both members settle
    let oracle = Arc::new(
        MockOracleBuilder::new()
            .with_summary(3, 3, "bumps the hold counter")
            .with_summary(1, 10, "inventory package")
            .build(),
    );

    let (result, recording) = run(&fixture, Arc::clone(&oracle), config()).await;
    let report = result.unwrap();

    assert_eq!(report.procedures, 2);
    assert_eq!(report.apply.procedure_summaries, 1);
    let calls = oracle.procedure_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].keys().collect::<Vec<_>>(), vec!["ASSIGNMENT_3_3"]);

    GraphAssertions::assert_statement(&recording, "MATCH (n:PROCEDURE {procedure_name: 'RESERVE'");
    GraphAssertions::assert_no_statement(&recording, "procedure_name: 'RELEASE', folder_name");
    GraphAssertions::assert_completed(&recording);
}

#[tokio::test]
async fn test_table_fragments_accumulate_across_statements() {
    let fixture = SqlFixtures::close_orders();
    let oracle = Arc::new(close_orders_oracle().build());

    let (result, recording) = run(&fixture, Arc::clone(&oracle), config()).await;
    assert_eq!(result.unwrap().apply.table_summaries, 1);

    let requests = oracle.table_calls();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].table_display, "ORDERS");
    assert_eq!(requests[0].summaries, vec!["customer orders"]);
    let columns: Vec<&str> = requests[0].columns.keys().map(String::as_str).collect();
    assert_eq!(columns, vec!["amount", "status"]);

    GraphAssertions::assert_statement(&recording, "SET t.description = 'ORDERS: customer orders'");
    GraphAssertions::assert_before(
        &recording,
        "Procedure built from 4 fragments",
        "SET t.description",
    );
}

#[tokio::test]
async fn test_finalize_failures_do_not_abort() {
    let fixture = SqlFixtures::close_orders();
    let oracle = Arc::new(
        close_orders_oracle()
            .failing_procedure_summaries()
            .failing_table_summaries()
            .build(),
    );

    let (result, recording) = run(&fixture, Arc::clone(&oracle), config()).await;
    result.unwrap();

    assert_eq!(oracle.procedure_calls().len(), 1);
    assert_eq!(oracle.table_calls().len(), 1);
    GraphAssertions::assert_no_statement(&recording, "Procedure built from");
    GraphAssertions::assert_no_statement(&recording, "SET t.description");
    GraphAssertions::assert_completed(&recording);
}

#[tokio::test]
async fn test_batch_oracle_failure_is_fatal() {
    let fixture = SqlFixtures::flat_statements(3);
    let oracle = Arc::new(MockOracleBuilder::new().failing_at(2, 2).build());
    let mut config = config();
    config.token_limit = 10;

    let (result, recording) = run(&fixture, oracle, config).await;

    assert!(matches!(result, Err(AnalyzerError::Oracle(_))));
    GraphAssertions::assert_failed_with(&recording, "mock failure for 2-2");
}

#[tokio::test]
async fn test_declaration_failure_is_skipped() {
    let fixture = SqlFixtures::close_orders();
    let oracle = Arc::new(close_orders_oracle().failing_at(2, 2).build());

    let (result, recording) = run(&fixture, oracle, config()).await;

    assert_eq!(result.unwrap().static_graph.declarations, 0);
    GraphAssertions::assert_no_statement(&recording, "MERGE (v:Variable");
    GraphAssertions::assert_completed(&recording);
}

#[tokio::test]
async fn test_malformed_tree_is_fatal() {
    let fixture = SourceFixture {
        source: "BEGIN\nNULL;\nEND;".to_string(),
        tree: ParsedNode::new("FILE", 1, 3).with_children(vec![ParsedNode::new("SELECT", 2, 5)]),
    };

    let (result, recording) = run(&fixture, Arc::new(MockOracle::new()), config()).await;

    assert!(matches!(result, Err(AnalyzerError::MalformedTree(_))));
    assert!(recording.error_message().is_some());
    assert!(recording.units().is_empty());
}

#[tokio::test]
async fn test_run_without_batches_still_completes() {
    let fixture = SourceFixture {
        source: "PROCEDURE noop IS\nBEGIN NULL; END;".to_string(),
        tree: ParsedNode::new("FILE", 1, 2).with_children(vec![
            ParsedNode::new("PROCEDURE", 1, 2).with_children(vec![ParsedNode::new("SPEC", 1, 1)]),
        ]),
    };
    let oracle = Arc::new(MockOracle::new());

    let (result, recording) = run(&fixture, Arc::clone(&oracle), config()).await;
    let report = result.unwrap();

    assert_eq!(report.batches, 0);
    assert!(oracle.code_calls().is_empty());
    GraphAssertions::assert_statement(&recording, "n.summary = '파일 노드'");
    GraphAssertions::assert_completed(&recording);
}

#[tokio::test]
async fn test_package_variable_is_global() {
    let fixture = SqlFixtures::package_spec();
    let oracle = Arc::new(
        MockOracleBuilder::new()
            .with_variables(
                2,
                2,
                VariableAnalysis {
                    summary: Some("hold limit".to_string()),
                    variables: vec![DeclaredVariable {
                        name: "g_limit".to_string(),
                        value: Some(serde_json::Value::from(10)),
                        ..Default::default()
                    }],
                },
            )
            .build(),
    );
    let mut config = config();
    config.locale = "en".to_string();

    let (result, recording) = run(&fixture, oracle, config).await;
    let report = result.unwrap();

    assert_eq!(report.static_graph.declarations, 1);
    GraphAssertions::assert_statement(&recording, "n.summary = 'File Start Node'");
    GraphAssertions::assert_statement(&recording, "role: '패키지 전역 변수', scope: 'Global'");
    GraphAssertions::assert_statement(&recording, "value: 10");
    GraphAssertions::assert_completed(&recording);
}
