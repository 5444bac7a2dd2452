//! Context-inclusion gating and summary-request detection.
//!
//! Hand-rolled heuristics over the raw user query. Both are pure functions
//! of the query text; the behavioral tests below freeze the rule set.
//!
//! The gating question is: does this query stand alone, or does it lean on
//! earlier turns? Standalone queries get no history (cheaper, and avoids
//! the LLM chasing stale context); follow-ups get the recent window.

/// Queries that are complete requests on their own, verbatim.
const STANDALONE_PHRASES: &[&str] = &[
    "find invoice",
    "show emails",
    "show my emails",
    "check my inbox",
    "any new emails",
    "any unread messages",
    "show my calendar",
    "what's on my calendar",
    "list my meetings",
];

/// Words that signal the query refers back to earlier turns.
const CONTEXT_INDICATORS: &[&str] = &[
    // pronouns and demonstratives
    "it", "that", "this", "those", "them", "they", "he", "she", "him", "her", "its",
    // comparatives and continuations
    "more", "another", "again", "also", "instead", "earlier", "previous", "same",
    // short acknowledgements
    "yes", "no", "ok", "okay", "sure", "thanks",
];

/// Verbs that open a standalone action request.
const ACTION_VERBS: &[&str] = &[
    "find", "search", "show", "get", "list", "fetch", "check", "display", "open", "create",
];

/// Keywords that mark a summary request (suppresses tool-result widgets).
const SUMMARY_KEYWORDS: &[&str] = &[
    "summary",
    "summarize",
    "summarise",
    "sum up",
    "brief",
    "briefly",
    "overview",
    "recap",
    "catch me up",
    "quick look",
    "highlights",
    "what's important",
    "key points",
    "tldr",
    "tl;dr",
    "in short",
    "gist",
];

/// Decide whether prior conversation history should accompany this query.
pub fn should_include_history(query: &str) -> bool {
    let lowered = query.trim().to_lowercase();

    // Known standalone phrases never need history.
    if STANDALONE_PHRASES
        .iter()
        .any(|phrase| lowered == *phrase || lowered.trim_end_matches(['?', '!', '.']) == *phrase)
    {
        return false;
    }

    // Any contextual indicator word forces history in.
    let words: Vec<&str> = lowered
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .collect();
    if words
        .iter()
        .any(|w| CONTEXT_INDICATORS.contains(w))
    {
        return true;
    }

    // A leading action verb with no context indicator stands alone.
    if let Some(first) = words.first() {
        if ACTION_VERBS.contains(first) {
            return false;
        }
    }

    // Ambiguous: include history.
    true
}

/// Whether the query asks for a summary, which suppresses widget emission
/// from tool results for this turn (the LLM may still emit its own).
pub fn is_summary_request(query: &str) -> bool {
    let lowered = query.to_lowercase();
    SUMMARY_KEYWORDS.iter().any(|kw| lowered.contains(kw))
}
