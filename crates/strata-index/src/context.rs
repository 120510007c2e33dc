use std::fmt::Write;

use crate::retriever::SearchResult;

pub const NO_CONTEXT: &str = "No relevant context found.";

/// Render results as numbered context blocks for a downstream prompt.
#[must_use]
pub fn format_context(results: &[SearchResult], max_code_examples: usize) -> String {
    if results.is_empty() {
        return NO_CONTEXT.to_owned();
    }

    let mut out = String::from("=== DOCUMENTATION CONTEXT ===\n\n");
    for (i, result) in results.iter().enumerate() {
        let chunk = &result.record.chunk;
        let _ = writeln!(out, "[Context {}] (Score: {:.3})", i + 1, result.score);
        let _ = writeln!(out, "Source: {}", chunk.source_url);
        let _ = writeln!(out, "Topic: {}", chunk.title);
        if !chunk.functions.is_empty() {
            let _ = writeln!(out, "Functions: {}", chunk.functions.join(", "));
        }
        if !chunk.concepts.is_empty() {
            let _ = writeln!(out, "Concepts: {}", chunk.concepts.join(", "));
        }
        let _ = writeln!(out, "Content: {}", chunk.content);
        if !chunk.code_examples.is_empty() {
            out.push_str("Code Examples:\n");
            for (j, code) in chunk.code_examples.iter().take(max_code_examples).enumerate() {
                let _ = writeln!(out, "  {}. {code}", j + 1);
            }
        }
        out.push_str("---\n\n");
    }
    out
}
