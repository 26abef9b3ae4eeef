//! Size metrics for token budgets

use std::sync::OnceLock;

/// Measures how much of a budget a piece of text consumes
pub trait SizeMetric: Send + Sync {
    /// Approximate token count of `text`
    fn measure(&self, text: &str) -> usize;

    fn name(&self) -> &'static str;
}

/// Four characters per token. Cheap and good enough for English prose.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharHeuristic;

impl SizeMetric for CharHeuristic {
    fn measure(&self, text: &str) -> usize {
        text.chars().count() / 4
    }

    fn name(&self) -> &'static str {
        "heuristic"
    }
}

static CL100K_BASE: OnceLock<Option<tiktoken_rs::CoreBPE>> = OnceLock::new();

/// `cl100k_base` BPE token counts. Falls back to [`CharHeuristic`] if the
/// encoder fails to load.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cl100k;

impl Cl100k {
    fn bpe() -> Option<&'static tiktoken_rs::CoreBPE> {
        CL100K_BASE
            .get_or_init(|| match tiktoken_rs::cl100k_base() {
                Ok(bpe) => Some(bpe),
                Err(e) => {
                    tracing::warn!(error = %e, "cl100k_base unavailable, using character heuristic");
                    None
                }
            })
            .as_ref()
    }
}

impl SizeMetric for Cl100k {
    fn measure(&self, text: &str) -> usize {
        match Self::bpe() {
            Some(bpe) => bpe.encode_with_special_tokens(text).len(),
            None => CharHeuristic.measure(text),
        }
    }

    fn name(&self) -> &'static str {
        "cl100k"
    }
}
