//! Token-budget-aware text trimming.
//!
//! [`TokenBudget::trim`] cuts text down to a tier's context budget. Text
//! already within budget is returned unchanged, and every trimmed result is
//! itself within budget, so trimming is idempotent.
//!
//! Trimming proceeds in three stages:
//!
//! 1. Greedily pack whole sentences into the first chunk that fits.
//! 2. If the first sentence alone is over budget, pack its words instead.
//! 3. If not even one word fits, take a character slice proportional to
//!    the budget, halving it until it fits.

use tiktoken_rs::CoreBPE;
use unicode_segmentation::UnicodeSegmentation;

use super::tier::{ModelTier, TierSet};

/// Rough characters-per-token ratio used for the hard slice.
const CHARS_PER_TOKEN: usize = 4;

/// Trims text to per-tier token budgets.
pub struct TokenBudget {
    bpe: Option<CoreBPE>,
    tiers: TierSet,
}

impl TokenBudget {
    /// Creates a budget manager using the `cl100k_base` encoding.
    ///
    /// If the encoding cannot be loaded, trimming becomes the identity.
    #[must_use]
    pub fn new(tiers: TierSet) -> Self {
        let bpe = match tiktoken_rs::cl100k_base() {
            Ok(bpe) => Some(bpe),
            Err(e) => {
                tracing::warn!(error = %e, "tokenizer unavailable, text will not be trimmed");
                None
            }
        };
        Self { bpe, tiers }
    }

    /// Creates a budget manager with no tokenizer; [`trim`](Self::trim)
    /// returns its input unchanged.
    #[must_use]
    pub const fn without_tokenizer(tiers: TierSet) -> Self {
        Self { bpe: None, tiers }
    }

    /// Returns the token budget for `tier`.
    #[must_use]
    pub const fn budget(&self, tier: ModelTier) -> usize {
        self.tiers.spec(tier).budget
    }

    /// Counts tokens, or `None` without a tokenizer.
    #[must_use]
    pub fn count(&self, text: &str) -> Option<usize> {
        self.bpe
            .as_ref()
            .map(|bpe| bpe.encode_with_special_tokens(text).len())
    }

    /// Trims `text` to the budget of `tier`.
    #[must_use]
    pub fn trim(&self, text: &str, tier: ModelTier) -> String {
        self.trim_to(text, self.budget(tier))
    }

    /// Trims `text` to at most `budget` tokens.
    #[must_use]
    pub fn trim_to(&self, text: &str, budget: usize) -> String {
        let Some(bpe) = self.bpe.as_ref() else {
            return text.to_string();
        };
        let count = |s: &str| bpe.encode_with_special_tokens(s).len();

        let total = count(text);
        if total <= budget {
            return text.to_string();
        }
        tracing::debug!(tokens = total, budget, "trimming text to budget");

        let sentences: Vec<&str> = text.split_sentence_bounds().collect();
        let chunk = pack(&sentences, budget, &count);
        if !chunk.is_empty() {
            return chunk;
        }

        if let Some(first) = sentences.first() {
            let words: Vec<&str> = first.split_word_bounds().collect();
            let chunk = pack(&words, budget, &count);
            if !chunk.is_empty() {
                return chunk;
            }
        }

        hard_slice(text, budget, &count)
    }
}

/// Greedily concatenates leading pieces while the running count fits.
///
/// Token counts are not strictly additive across piece boundaries, so the
/// joined chunk is re-counted and shortened until it fits.
fn pack(pieces: &[&str], budget: usize, count: &impl Fn(&str) -> usize) -> String {
    let mut taken = 0;
    let mut running = 0;
    for piece in pieces {
        let n = count(piece);
        if running + n > budget {
            break;
        }
        running += n;
        taken += 1;
    }

    let mut chunk = pieces[..taken].concat();
    while taken > 0 && count(&chunk) > budget {
        taken -= 1;
        chunk = pieces[..taken].concat();
    }
    chunk
}

fn hard_slice(text: &str, budget: usize, count: &impl Fn(&str) -> usize) -> String {
    let mut limit = budget.saturating_mul(CHARS_PER_TOKEN);
    loop {
        let slice: String = text.chars().take(limit).collect();
        if limit == 0 || count(&slice) <= budget {
            return slice;
        }
        limit /= 2;
    }
}

impl std::fmt::Debug for TokenBudget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenBudget")
            .field("tokenizer", &self.bpe.as_ref().map(|_| "cl100k_base"))
            .field("tiers", &self.tiers)
            .finish()
    }
}
