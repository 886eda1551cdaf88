//! Placeholder scanning and resolution.
//!
//! Two marker syntaxes share one scanner:
//! - `{{key}}`: context lookup against the session's item store; the key
//!   must be brace-free.
//! - `{name}`: parameter lookup against the stage's parameters; the name
//!   must be identifier-shaped, so JSON-ish text like `{x:1}` is literal.
//!
//! `{{key}}` keys containing `:output` are output-path references: the part
//! before `:output` is the stage key, the remainder is a path navigated
//! into the stored record (`:` or `.` separated, numeric segments index
//! arrays).

use serde_json::Value;

use cadenza_core::store::{keys, ItemStore, StoreError};
use cadenza_core::types::TurnParameters;

/// Built-in context key resolving to the execution context's session id.
pub const SESSION_ID_KEY: &str = "sessionId";

/// A template marker found by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker {
    /// `{{key}}` context lookup
    Context {
        key: String,
        start: usize,
        end: usize,
    },
    /// `{name}` parameter lookup
    Parameter {
        name: String,
        start: usize,
        end: usize,
    },
}

impl Marker {
    /// Byte span of the marker within the template
    pub fn span(&self) -> (usize, usize) {
        match self {
            Marker::Context { start, end, .. } => (*start, *end),
            Marker::Parameter { start, end, .. } => (*start, *end),
        }
    }
}

/// Scan a template for markers, left to right.
///
/// A `{{` candidate whose key would contain a brace is not a marker; the
/// scan advances one char instead, so `{{{a}}}` yields the inner `{{a}}`
/// with literal braces around it.
pub fn find_markers(content: &str) -> Vec<Marker> {
    let bytes = content.as_bytes();
    let mut markers = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'{' {
            i += 1;
            continue;
        }

        if i + 1 < bytes.len() && bytes[i + 1] == b'{' {
            if let Some(relative) = content[i + 2..].find("}}") {
                let key = &content[i + 2..i + 2 + relative];
                if !key.is_empty() && !key.contains('{') && !key.contains('}') {
                    let end = i + 2 + relative + 2;
                    markers.push(Marker::Context {
                        key: key.to_string(),
                        start: i,
                        end,
                    });
                    i = end;
                    continue;
                }
            }
            i += 1;
            continue;
        }

        if let Some(name_len) = match_identifier(&content[i + 1..]) {
            let after = i + 1 + name_len;
            if bytes.get(after) == Some(&b'}') {
                markers.push(Marker::Parameter {
                    name: content[i + 1..after].to_string(),
                    start: i,
                    end: after + 1,
                });
                i = after + 1;
                continue;
            }
        }
        i += 1;
    }

    markers
}

fn match_identifier(content: &str) -> Option<usize> {
    let mut chars = content.char_indices();
    let (_, first) = chars.next()?;
    if !first.is_ascii_alphabetic() && first != '_' {
        return None;
    }
    let mut len = first.len_utf8();
    for (index, ch) in chars {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            len = index + ch.len_utf8();
        } else {
            break;
        }
    }
    Some(len)
}

/// Resolves markers against the session context and the stage parameters.
pub struct PlaceholderResolver<'a> {
    items: &'a dyn ItemStore,
    session_id: &'a str,
    parameters: &'a TurnParameters,
}

impl<'a> PlaceholderResolver<'a> {
    /// Create a resolver for one stage run
    pub fn new(
        items: &'a dyn ItemStore,
        session_id: &'a str,
        parameters: &'a TurnParameters,
    ) -> Self {
        Self {
            items,
            session_id,
            parameters,
        }
    }

    /// Substitute every resolvable marker in the template.
    ///
    /// Markers whose key or parameter is absent stay in place; the
    /// validation middleware rejects them afterwards.
    pub async fn resolve(&self, template: &str) -> Result<String, StoreError> {
        let markers = find_markers(template);
        if markers.is_empty() {
            return Ok(template.to_string());
        }

        let mut output = String::with_capacity(template.len());
        let mut cursor = 0;
        for marker in &markers {
            let (start, end) = marker.span();
            output.push_str(&template[cursor..start]);
            let resolved = match marker {
                Marker::Context { key, .. } => self.resolve_context(key).await?,
                Marker::Parameter { name, .. } => self.resolve_parameter(name).await?,
            };
            match resolved {
                Some(value) => output.push_str(&value),
                None => output.push_str(&template[start..end]),
            }
            cursor = end;
        }
        output.push_str(&template[cursor..]);
        Ok(output)
    }

    /// Context-lookup contract: the resolved value, or empty when absent.
    pub async fn lookup(&self, key: &str) -> Result<String, StoreError> {
        Ok(self.resolve_context(key).await?.unwrap_or_default())
    }

    async fn resolve_context(&self, key: &str) -> Result<Option<String>, StoreError> {
        if key == SESSION_ID_KEY {
            return Ok(Some(self.session_id.to_string()));
        }

        if let Some((stage_key, path)) = split_output_reference(key) {
            let record_key = keys::StageKeys::for_stage_key(stage_key).output();
            let Some(record) = self.items.load_item(self.session_id, &record_key).await? else {
                return Ok(None);
            };
            if path.is_empty() {
                return Ok(Some(display_string(&record)));
            }
            let raw = display_string(&record);
            let root: Value = match &record {
                Value::String(text) => match serde_json::from_str(text) {
                    Ok(parsed) => parsed,
                    // Record is not navigable JSON: hand back the raw record.
                    Err(_) => return Ok(Some(raw)),
                },
                other => other.clone(),
            };
            return Ok(Some(match navigate(&root, path) {
                Some(node) => display_string(node),
                None => "{}".to_string(),
            }));
        }

        let item = self.items.load_item(self.session_id, key).await?;
        Ok(item.map(|value| display_string(&value)))
    }

    async fn resolve_parameter(&self, name: &str) -> Result<Option<String>, StoreError> {
        let Some(value) = self.parameters.extras.get(name) else {
            return Ok(None);
        };
        // One level of indirection: a "{{key}}" parameter value resolves as
        // a context lookup.
        if let Value::String(text) = value {
            let trimmed = text.trim();
            if trimmed.len() > 4 && trimmed.starts_with("{{") && trimmed.ends_with("}}") {
                let inner = &trimmed[2..trimmed.len() - 2];
                if !inner.contains('{') && !inner.contains('}') {
                    return self.resolve_context(inner).await;
                }
            }
        }
        Ok(Some(display_string(value)))
    }
}

fn split_output_reference(key: &str) -> Option<(&str, &str)> {
    let index = key.find(":output")?;
    let stage_key = &key[..index];
    let rest = &key[index + ":output".len()..];
    if rest.is_empty() {
        Some((stage_key, ""))
    } else {
        rest.strip_prefix(':').map(|path| (stage_key, path))
    }
}

fn navigate<'v>(root: &'v Value, path: &str) -> Option<&'v Value> {
    let mut current = root;
    for segment in path.split(|c| c == ':' || c == '.') {
        if segment.is_empty() {
            return None;
        }
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn display_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
