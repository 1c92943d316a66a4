// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Dependency gate run before a batch calls the oracle.

use crate::model::{AnalysisBatch, NodeArena};

/// Wait until every analyzable child of every member is settled
///
/// Children that are not analyzable are signalled at collection time and
/// never block. Must be awaited outside the oracle concurrency limit, so
/// waiting batches do not hold permits.
pub async fn wait_for_children(batch: &AnalysisBatch, arena: &NodeArena) {
    for id in &batch.nodes {
        for child in arena.children(*id).filter(|child| child.analyzable) {
            child.signal().wait().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NodeId, StatementNode};
    use std::sync::Arc;
    use std::time::Duration;

    fn arena() -> NodeArena {
        let c1 = StatementNode::new(NodeId(0), "SELECT".into(), vec![(2, String::new())], 2, 2);
        let c2 = StatementNode::new(NodeId(1), "ASSIGNMENT".into(), vec![(3, String::new())], 3, 3);
        let declare = StatementNode::new(NodeId(2), "DECLARE".into(), vec![(4, String::new())], 4, 4);
        let mut parent = StatementNode::new(NodeId(3), "IF".into(), vec![], 1, 5);
        parent.children = vec![NodeId(0), NodeId(1), NodeId(2)];
        NodeArena::new(vec![c1, c2, declare, parent])
    }

    #[tokio::test]
    async fn test_gate_waits_for_every_analyzable_child() {
        let arena = Arc::new(arena());
        let batch = AnalysisBatch::new(2, vec![NodeId(3)], &arena);

        let gate = {
            let arena = Arc::clone(&arena);
            tokio::spawn(async move { wait_for_children(&batch, &arena).await })
        };

        arena.get(NodeId(0)).signal().set();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!gate.is_finished());

        // The DECLARE child is not analyzable and is never awaited
        arena.get(NodeId(1)).signal().set();
        tokio::time::timeout(Duration::from_secs(1), gate)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_leaf_batch_passes_immediately() {
        let arena = arena();
        let batch = AnalysisBatch::new(1, vec![NodeId(0), NodeId(1)], &arena);
        tokio::time::timeout(Duration::from_millis(50), wait_for_children(&batch, &arena))
            .await
            .unwrap();
    }
}
