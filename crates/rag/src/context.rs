//! Context formatting
//!
//! Renders retrieved chunks into one text block for the generation
//! prompt. When retrieval came back empty the block degrades to a fixed
//! sentinel so the prompt always carries an explicit context section.

use bot_factory_core::RetrievalResult;

/// Fixed sentinel included in the prompt when nothing was retrieved
pub const NO_CONTEXT_SENTINEL: &str = "No relevant information found.";

/// Format retrieved chunks for the generation prompt
///
/// Each chunk renders as `[CATEGORY]` followed by its text; blocks are
/// joined by a horizontal rule. Input order is preserved: the retriever
/// already sorted by similarity and the formatter must not re-sort.
pub fn format_context(results: &[RetrievalResult]) -> String {
    if results.is_empty() {
        return NO_CONTEXT_SENTINEL.to_string();
    }

    results
        .iter()
        .map(|r| format!("[{}]\n{}", r.category.to_uppercase(), r.text))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}
