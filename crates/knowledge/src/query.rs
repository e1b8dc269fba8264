//! Query validation at pipeline entry.

use crate::types::{Query, QueryKind, QueryRequest, QueryType};
use bookrag_core::{AppError, AppResult};

impl Query {
    /// Validate an inbound request before any external call is made.
    ///
    /// The question is trimmed and measured in characters. A selection-based
    /// request needs non-blank `selected_text`; a full-book request must not
    /// carry one.
    pub fn parse(request: QueryRequest, max_query_length: usize) -> AppResult<Self> {
        let text = request.query.trim();
        if text.is_empty() {
            return Err(AppError::InvalidQuery("query must not be empty".to_string()));
        }

        let length = text.chars().count();
        if length > max_query_length {
            return Err(AppError::InvalidQuery(format!(
                "query is {} characters long, the limit is {}",
                length, max_query_length
            )));
        }

        let selected = request
            .selected_text
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let kind = match (request.query_type, selected) {
            (QueryType::FullBook, None) => QueryKind::FullBook,
            (QueryType::FullBook, Some(_)) => {
                return Err(AppError::InvalidQuery(
                    "selected_text is only allowed for selection_based queries".to_string(),
                ))
            }
            (QueryType::SelectionBased, Some(selected_text)) => QueryKind::Selection {
                selected_text: selected_text.to_string(),
            },
            (QueryType::SelectionBased, None) => {
                return Err(AppError::InvalidQuery(
                    "selection_based queries require non-empty selected_text".to_string(),
                ))
            }
        };

        Ok(Self {
            text: text.to_string(),
            kind,
        })
    }
}
