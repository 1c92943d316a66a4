// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! One-shot completion signal attached to every statement node.

use std::sync::Arc;

use tokio::sync::watch;

/// Marks a node's analysis as settled
///
/// Setting the signal a second time is a bug and panics.
#[derive(Debug, Clone)]
pub struct CompletionSignal {
    state: Arc<watch::Sender<bool>>,
}

impl Default for CompletionSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionSignal {
    pub fn new() -> Self {
        let (state, _) = watch::channel(false);
        Self {
            state: Arc::new(state),
        }
    }

    pub fn set(&self) {
        let previous = self.state.send_replace(true);
        assert!(!previous, "completion signal set twice");
    }

    pub fn is_set(&self) -> bool {
        *self.state.borrow()
    }

    /// Resolves once [`set`](Self::set) has been called
    pub async fn wait(&self) {
        let mut receiver = self.state.subscribe();
        // The sender lives as long as `self`, so this cannot fail
        let _ = receiver.wait_for(|set| *set).await;
    }
}
