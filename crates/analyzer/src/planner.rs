// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Batch Planner
//!
//! Greedy packing of analyzable nodes into token-budgeted batches.
//!
//! - A node with children is always flushed into a batch of its own, so it
//!   is analysed once its children's summaries exist.
//! - A leaf joins the running batch unless that would push it past the
//!   budget, in which case the running batch is flushed first.
//! - A leaf costing more than the whole budget still gets a batch.

use crate::model::{AnalysisBatch, NodeArena, NodeId};

pub struct BatchPlanner {
    token_limit: usize,
}

impl BatchPlanner {
    pub fn new(token_limit: usize) -> Self {
        Self { token_limit }
    }

    /// Pack the analyzable nodes of `arena` in traversal order
    pub fn plan(&self, arena: &NodeArena) -> Vec<AnalysisBatch> {
        let mut batches = Vec::new();
        let mut current: Vec<NodeId> = Vec::new();
        let mut current_tokens = 0;

        let flush = |nodes: Vec<NodeId>, batches: &mut Vec<AnalysisBatch>| {
            if !nodes.is_empty() {
                let id = batches.len() + 1;
                batches.push(AnalysisBatch::new(id, nodes, arena));
            }
        };

        for node in arena.iter().filter(|node| node.analyzable) {
            if node.has_children() {
                flush(std::mem::take(&mut current), &mut batches);
                current_tokens = 0;
                flush(vec![node.id], &mut batches);
                continue;
            }

            if !current.is_empty() && current_tokens + node.token > self.token_limit {
                flush(std::mem::take(&mut current), &mut batches);
                current_tokens = 0;
            }

            current.push(node.id);
            current_tokens += node.token;
        }
        flush(current, &mut batches);

        batches
    }
}
