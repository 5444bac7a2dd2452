//! Response parser — forgiving extraction of structured output.
//!
//! The LLM is instructed to emit a single JSON object, but real models
//! wrap it in fences, leave trailing commas, put raw newlines inside
//! string literals, or abandon JSON entirely and write prose. Each of
//! those is a first-class case here, not an afterthought. The parser
//! never fails a turn: it always produces a `ParsedResponse`, in the
//! worst case with a canned fallback string.
//!
//! Extraction ladder:
//! 1. unwrap a fenced code block if present
//! 2. slice from the first `{` to the last `}`
//! 3. strict JSON parse
//! 4. repair pass (trailing commas, raw newlines in strings) and retry
//! 5. plain-text extraction of the `response` field, else the residue
//!    outside fences/braces, else a canned fallback

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::LazyLock;
use tracing::{debug, trace};

use attache_core::tool::ToolCall;
use attache_core::widget::WidgetDescriptor;

/// Matches `"response": "<properly escaped value>"`.
static RESPONSE_ESCAPED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""response"\s*:\s*"((?:[^"\\]|\\.)*)""#).expect("static regex")
});

/// Matches `"response": "<value with raw newlines>"`, terminated by a quote
/// followed by a comma or closing brace.
static RESPONSE_RAW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)"response"\s*:\s*"(.*?)"\s*[,}]"#).expect("static regex")
});

/// Matches a fenced code block, optionally labeled `json`.
static FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(.*?)```").expect("static regex")
});

/// The structured record extracted from one LLM reply.
#[derive(Debug, Clone, Default)]
pub struct ParsedResponse {
    pub thinking: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub response: String,
    pub widgets: Vec<WidgetDescriptor>,
}

/// Parses accumulated LLM output into a [`ParsedResponse`].
pub struct ResponseParser {
    id_counter: AtomicU64,
}

impl ResponseParser {
    pub fn new() -> Self {
        Self {
            id_counter: AtomicU64::new(1),
        }
    }

    /// Parse raw LLM output. Never fails.
    pub fn parse(&self, raw: &str) -> ParsedResponse {
        let candidate = unwrap_fence(raw);

        if let Some(slice) = slice_braces(candidate) {
            if let Ok(value) = serde_json::from_str::<Value>(slice) {
                return self.normalize(value, raw);
            }
            let repaired = repair_json(slice);
            if let Ok(value) = serde_json::from_str::<Value>(&repaired) {
                debug!("Parsed LLM output after repair pass");
                return self.normalize(value, raw);
            }
            trace!("JSON unparseable even after repair; falling back to text extraction");
        }

        ParsedResponse {
            response: plain_text_extract(raw),
            ..Default::default()
        }
    }

    /// Build a `ParsedResponse` from a parsed JSON value.
    fn normalize(&self, value: Value, raw: &str) -> ParsedResponse {
        let Value::Object(obj) = value else {
            return ParsedResponse {
                response: plain_text_extract(raw),
                ..Default::default()
            };
        };

        let thinking = obj
            .get("thinking")
            .and_then(|v| v.as_str())
            .map(String::from);

        let tool_calls: Vec<ToolCall> = obj
            .get("tool_calls")
            .or_else(|| obj.get("toolCalls"))
            .and_then(|v| v.as_array())
            .map(|calls| {
                calls
                    .iter()
                    .filter_map(|call| self.normalize_call(call))
                    .collect()
            })
            .unwrap_or_default();

        let widgets = obj
            .get("widgets")
            .and_then(|v| v.as_array())
            .map(|widgets| {
                widgets
                    .iter()
                    .filter_map(|w| serde_json::from_value(w.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();

        let response = match obj.get("response") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Object(inner)) => ["summary", "text", "message"]
                .iter()
                .find_map(|key| inner.get(*key).and_then(|v| v.as_str()))
                .map(String::from)
                .unwrap_or_else(|| plain_text_extract(raw)),
            _ => {
                if tool_calls.is_empty() {
                    plain_text_extract(raw)
                } else {
                    // A pure tool-call reply legitimately has no response text
                    String::new()
                }
            }
        };

        ParsedResponse {
            thinking,
            tool_calls,
            response,
            widgets,
        }
    }

    fn normalize_call(&self, value: &Value) -> Option<ToolCall> {
        let obj = value.as_object()?;
        let name = obj.get("name")?.as_str()?.to_string();

        let id = obj
            .get("id")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(String::from)
            .unwrap_or_else(|| {
                format!("tool-{}", self.id_counter.fetch_add(1, Ordering::Relaxed))
            });

        let arguments = match obj.get("arguments") {
            Some(Value::Object(map)) => map.clone(),
            // Some models stringify the arguments object
            Some(Value::String(s)) => serde_json::from_str::<Map<String, Value>>(s)
                .unwrap_or_default(),
            _ => Map::new(),
        };

        Some(ToolCall {
            id,
            name,
            arguments,
        })
    }
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new()
    }
}

/// If the text contains a fenced code block, return its body.
fn unwrap_fence(raw: &str) -> &str {
    match FENCE.captures(raw) {
        Some(caps) => caps.get(1).map(|m| m.as_str().trim()).unwrap_or(raw),
        None => raw,
    }
}

/// Slice from the first `{` to the last `}`, inclusive.
fn slice_braces(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

/// One repair pass over almost-JSON:
/// - drop trailing commas before `}` or `]`
/// - escape raw `\n` / `\r` inside string literals
fn repair_json(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;
    let chars: Vec<char> = input.chars().collect();

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];

        if in_string {
            if escaped {
                escaped = false;
                out.push(c);
            } else {
                match c {
                    '\\' => {
                        escaped = true;
                        out.push(c);
                    }
                    '"' => {
                        in_string = false;
                        out.push(c);
                    }
                    '\n' => out.push_str("\\n"),
                    '\r' => out.push_str("\\r"),
                    _ => out.push(c),
                }
            }
            i += 1;
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' => {
                // Trailing comma: look past whitespace for a closer
                let mut j = i + 1;
                while j < chars.len() && chars[j].is_whitespace() {
                    j += 1;
                }
                if j < chars.len() && (chars[j] == '}' || chars[j] == ']') {
                    // drop the comma
                } else {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
        i += 1;
    }

    out
}

/// Unescape the standard JSON escapes in a regex-captured string body.
fn unescape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some('u') => {
                let code: String = chars.by_ref().take(4).collect();
                if let Some(decoded) =
                    u32::from_str_radix(&code, 16).ok().and_then(char::from_u32)
                {
                    out.push(decoded);
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Last-resort extraction when the output is not parseable JSON.
fn plain_text_extract(raw: &str) -> String {
    // Try to pull the response field's value straight out of the text
    if let Some(caps) = RESPONSE_ESCAPED.captures(raw) {
        let value = unescape(caps.get(1).map(|m| m.as_str()).unwrap_or_default());
        if !value.trim().is_empty() {
            return value;
        }
    }
    if let Some(caps) = RESPONSE_RAW.captures(raw) {
        let value = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        if !value.trim().is_empty() {
            return value.to_string();
        }
    }

    // Strip fenced blocks and the widest brace region; keep the residue
    let without_fences = FENCE.replace_all(raw, "");
    let cleaned: &str = &without_fences;
    let residue = match (cleaned.find('{'), cleaned.rfind('}')) {
        (Some(start), Some(end)) if end > start => {
            format!("{}{}", &cleaned[..start], &cleaned[end + 1..])
        }
        _ => cleaned.to_string(),
    };

    let trimmed = residue.trim();
    if trimmed.is_empty() {
        "I've processed your request.".to_string()
    } else {
        trimmed.to_string()
    }
}
