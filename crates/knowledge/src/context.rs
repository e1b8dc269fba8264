//! Context assembly under a token budget.

use crate::tokens::{count_tokens, truncate_to_tokens};
use crate::types::{AssembledContext, ContextEntry, ContextOrigin, ContextSource, RetrievalResult};
use tracing::debug;

/// Packs evidence into marked entries without exceeding the token budget.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextAssembler;

impl ContextAssembler {
    /// Build the context for one query.
    ///
    /// Retrieved chunks are taken greedily in rank order and packing stops at
    /// the first chunk that would overflow. A selection becomes the single
    /// entry `[1]`. Only a first entry that is larger than the whole budget
    /// gets truncated.
    pub fn assemble(source: ContextSource, token_budget: usize) -> AssembledContext {
        let mut context = AssembledContext::empty(token_budget);

        match source {
            ContextSource::Retrieved(mut results) => {
                results.sort_by_key(|r| r.rank);
                for result in results {
                    if !Self::push_chunk(&mut context, result) {
                        break;
                    }
                }
            }
            ContextSource::Selection(text) => {
                Self::push(&mut context, ContextOrigin::Selection, &text);
            }
        }

        debug!(
            entries = context.entries.len(),
            tokens = context.total_tokens(),
            budget = token_budget,
            "Assembled context"
        );
        context
    }

    /// Returns false once the budget is exhausted.
    fn push_chunk(context: &mut AssembledContext, result: RetrievalResult) -> bool {
        if result.chunk.text.trim().is_empty() {
            debug!(chunk_id = %result.chunk.id, "Skipping empty chunk");
            return true;
        }
        let origin = ContextOrigin::Chunk {
            chunk_id: result.chunk.id,
            section: result.chunk.section,
            position: result.chunk.position,
            score: result.score,
        };
        Self::push(context, origin, &result.chunk.text)
    }

    fn push(context: &mut AssembledContext, origin: ContextOrigin, text: &str) -> bool {
        let text = text.trim();
        let used = context.total_tokens();
        let tokens = count_tokens(text);

        let (text, tokens) = if used + tokens <= context.token_budget {
            (text, tokens)
        } else if context.is_empty() {
            let cut = truncate_to_tokens(text, context.token_budget);
            (cut, count_tokens(cut))
        } else {
            return false;
        };

        if tokens == 0 {
            return false;
        }

        let marker = context.entries.len() + 1;
        context.entries.push(ContextEntry {
            marker,
            origin,
            text: text.to_string(),
            token_count: tokens,
        });
        used + tokens < context.token_budget
    }
}
