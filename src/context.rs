//! Context window selection
//!
//! Picks the slice of history sent to the model. The window is always a
//! suffix of the history: oldest turns are dropped first and a turn is never
//! split. The budget is a soft ceiling: when the newest turn alone is over
//! budget it is still sent on its own.

mod metric;


pub use metric::{CharHeuristic, Cl100k, SizeMetric};

use crate::config::TokenizerKind;
use crate::db::Turn;
use std::fmt;
use std::sync::Arc;

/// Fixed per-message cost on top of the content (role markers, separators)
pub const TURN_OVERHEAD_TOKENS: usize = 10;
/// Room left for the model's reply
pub const RESPONSE_RESERVE_TOKENS: usize = 512;
/// Context length assumed when the backend does not report one
pub const DEFAULT_CONTEXT_TOKENS: usize = 4096;

/// Size budget for the context window
#[derive(Clone)]
pub enum Budget {
    /// At most this many turns
    Turns(usize),
    /// At most this many tokens, as counted by `metric` plus per-turn overhead
    Tokens {
        ceiling: usize,
        metric: Arc<dyn SizeMetric>,
    },
}

impl fmt::Debug for Budget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Budget::Turns(n) => f.debug_tuple("Turns").field(n).finish(),
            Budget::Tokens { ceiling, metric } => f
                .debug_struct("Tokens")
                .field("ceiling", ceiling)
                .field("metric", &metric.name())
                .finish(),
        }
    }
}

impl Budget {
    pub fn tokens(ceiling: usize, metric: impl SizeMetric + 'static) -> Self {
        Budget::Tokens {
            ceiling,
            metric: Arc::new(metric),
        }
    }

    /// Token budget for history given the model's full context length.
    ///
    /// Reserves room for the system prompt and the reply.
    pub fn for_context_length(
        context_length: usize,
        system_prompt: &str,
        metric: Arc<dyn SizeMetric>,
    ) -> Self {
        let reserved =
            metric.measure(system_prompt) + TURN_OVERHEAD_TOKENS + RESPONSE_RESERVE_TOKENS;
        Budget::Tokens {
            ceiling: context_length.saturating_sub(reserved),
            metric,
        }
    }

    /// Cost of a single turn under this budget
    pub fn cost(&self, turn: &Turn) -> usize {
        match self {
            Budget::Turns(_) => 1,
            Budget::Tokens { metric, .. } => metric.measure(turn.text()) + TURN_OVERHEAD_TOKENS,
        }
    }

    pub fn limit(&self) -> usize {
        match self {
            Budget::Turns(n) => *n,
            Budget::Tokens { ceiling, .. } => *ceiling,
        }
    }

    /// Total cost of a run of turns
    #[allow(dead_code)] // Used in tests
    pub fn total(&self, turns: &[Turn]) -> usize {
        turns.iter().map(|t| self.cost(t)).sum()
    }
}

/// Build the size metric selected in configuration
pub fn metric_for(kind: TokenizerKind) -> Arc<dyn SizeMetric> {
    match kind {
        TokenizerKind::Heuristic => Arc::new(CharHeuristic),
        TokenizerKind::Cl100k => Arc::new(Cl100k),
    }
}

/// Longest suffix of `history` that fits `budget`.
///
/// A non-empty history always yields at least its newest turn.
pub fn build_context<'a>(history: &'a [Turn], budget: &Budget) -> &'a [Turn] {
    let limit = budget.limit();
    let mut used = 0usize;
    let mut start = history.len();

    for (idx, turn) in history.iter().enumerate().rev() {
        let cost = budget.cost(turn);
        if used + cost > limit {
            break;
        }
        used += cost;
        start = idx;
    }

    if start == history.len() && !history.is_empty() {
        start = history.len() - 1;
    }

    let window = &history[start..];
    if start > 0 {
        tracing::debug!(
            kept = window.len(),
            dropped = start,
            limit,
            budget = ?budget,
            "Context window truncated"
        );
    }
    window
}
