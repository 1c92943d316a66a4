// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Token cost of statement code.

use tiktoken_rs::CoreBPE;

use crate::error::{AnalyzerError, AnalyzerResult};

/// Resource cost of a piece of code, in batch budget units
pub trait TokenCost: Send + Sync {
    fn cost(&self, code: &str) -> usize;
}

/// cl100k_base token count of the JSON-encoded code text
pub struct TokenCounter {
    bpe: CoreBPE,
}

impl TokenCounter {
    pub fn cl100k() -> AnalyzerResult<Self> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| AnalyzerError::TokenCounter(e.to_string()))?;
        Ok(Self { bpe })
    }
}

impl TokenCost for TokenCounter {
    fn cost(&self, code: &str) -> usize {
        let encoded = serde_json::Value::String(code.to_string()).to_string();
        self.bpe.encode_ordinary(&encoded).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cost_counts_json_quotes() {
        let counter = TokenCounter::cl100k().unwrap();
        // The surrounding quotes of the JSON literal always cost something
        assert!(counter.cost("") >= 1);
        assert!(counter.cost("1: SELECT * FROM orders;") > counter.cost("1: NULL;"));
    }

    #[test]
    fn test_cost_grows_with_code() {
        let counter = TokenCounter::cl100k().unwrap();
        let line = "12: UPDATE orders SET status = 'SHIPPED' WHERE id = p_id;";
        let block = vec![line; 20].join("\n");
        assert!(counter.cost(&block) > 10 * counter.cost(line));
    }
}
