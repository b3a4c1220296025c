// Response decoding and sanitization
//
// Legacy `CMD_API_*` endpoints answer with url-encoded `key=value` pairs
// (one pair per `&` or per line, `name[]=` for lists, `name[key]=` for
// maps). The newer `/api/*` endpoints answer with JSON. Both shapes are
// parsed into a `serde_json::Value` tree, checked for the panel's `error`
// marker, then normalized leaf by leaf.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::error::Error;

/// The panel's marker for "no limit". Decoded to `null`, never to zero.
pub const UNLIMITED: &str = "unlimited";

/// Fields the panel serializes as comma-separated lists inside one value.
const DEFAULT_LIST_FIELDS: &[&str] = &["ips", "ns"];

const SNIPPET_LEN: usize = 200;

/// Decoder for panel responses.
///
/// Holds the set of field names whose text values are comma-separated
/// lists. Cheap to clone; one codec is shared by a connection and every
/// connection derived from it.
#[derive(Debug, Clone)]
pub struct ResponseCodec {
    list_fields: HashSet<String>,
}

impl Default for ResponseCodec {
    fn default() -> Self {
        Self::with_list_fields(DEFAULT_LIST_FIELDS.iter().copied())
    }
}

impl ResponseCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a codec that splits the given fields on commas.
    pub fn with_list_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            list_fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse, error-check and sanitize a raw response body.
    ///
    /// A body whose only field is `list` collapses to that list.
    pub fn decode(&self, body: &str) -> Result<Value, Error> {
        let parsed = parse(body)?;
        check_error(&parsed)?;
        Ok(self.sanitize(parsed))
    }

    /// Apply the leaf normalization rules to an already parsed tree.
    pub fn sanitize(&self, value: Value) -> Value {
        let value = match value {
            Value::Object(mut map) if map.len() == 1 && map.contains_key("list") => {
                map.remove("list").unwrap_or(Value::Null)
            }
            other => other,
        };
        self.sanitize_value(None, value)
    }

    fn sanitize_value(&self, key: Option<&str>, value: Value) -> Value {
        match value {
            Value::String(text) => self.sanitize_text(key, &text),
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| self.sanitize_value(None, item))
                    .collect(),
            ),
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| {
                        let v = self.sanitize_value(Some(&k), v);
                        (k, v)
                    })
                    .collect(),
            ),
            other => other,
        }
    }

    fn sanitize_text(&self, key: Option<&str>, raw: &str) -> Value {
        let text = trim_control(raw);

        if key.is_some_and(|k| self.list_fields.contains(k)) {
            return Value::Array(
                text.split(',')
                    .map(trim_control)
                    .filter(|item| !item.is_empty())
                    .map(|item| Value::String(item.to_owned()))
                    .collect(),
            );
        }

        match text {
            "yes" => Value::Bool(true),
            "no" => Value::Bool(false),
            UNLIMITED => Value::Null,
            _ => Value::String(text.to_owned()),
        }
    }
}

// ── Parsing ──────────────────────────────────────────────────────────

/// Parse a body into a raw tree without sanitizing it.
///
/// Empty bodies parse to an empty object. Bodies that look like JSON must
/// be valid JSON; anything else must contain at least one `key=value` pair.
pub fn parse(body: &str) -> Result<Value, Error> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok(Value::Object(Map::new()));
    }

    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return serde_json::from_str(trimmed)
            .map_err(|e| Error::decode(format!("invalid JSON body: {e}")));
    }

    if !trimmed.contains('=') {
        return Err(Error::decode(format!(
            "body is neither key=value nor JSON: {:?}",
            truncate(trimmed, SNIPPET_LEN)
        )));
    }

    Ok(Value::Object(parse_query(trimmed)))
}

/// Parse a url-encoded `key=value` blob into a map.
///
/// Also used for nested values, e.g. the per-domain settings embedded in
/// an `ADDITIONAL_DOMAINS` response.
pub fn parse_query(text: &str) -> Map<String, Value> {
    let unescaped = unescape_entities(text);
    let normalized = unescaped.replace(|c| c == '\r' || c == '\n', "&");

    let mut map = Map::new();
    for (raw_key, value) in url::form_urlencoded::parse(normalized.as_bytes()) {
        let (base, path) = split_key(&raw_key);
        if base.is_empty() {
            continue;
        }
        let slot = map.entry(base.to_owned()).or_insert(Value::Null);
        insert_path(slot, &path, value.into_owned());
    }
    map
}

/// Split `name[a][]` into `("name", [Some("a"), None])`.
///
/// Keys with unbalanced brackets are kept verbatim.
fn split_key(raw: &str) -> (&str, Vec<Option<String>>) {
    let Some(open) = raw.find('[') else {
        return (raw, Vec::new());
    };

    let mut path = Vec::new();
    let mut rest = &raw[open..];
    while let Some(stripped) = rest.strip_prefix('[') {
        let Some(close) = stripped.find(']') else {
            return (raw, Vec::new());
        };
        let segment = &stripped[..close];
        path.push((!segment.is_empty()).then(|| segment.to_owned()));
        rest = &stripped[close + 1..];
    }

    if rest.is_empty() {
        (&raw[..open], path)
    } else {
        (raw, Vec::new())
    }
}

fn insert_path(slot: &mut Value, path: &[Option<String>], value: String) {
    let Some((head, rest)) = path.split_first() else {
        *slot = Value::String(value);
        return;
    };

    match head {
        None => {
            if !slot.is_array() {
                *slot = Value::Array(Vec::new());
            }
            if let Value::Array(items) = slot {
                items.push(Value::Null);
                if let Some(last) = items.last_mut() {
                    insert_path(last, rest, value);
                }
            }
        }
        Some(key) => {
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            if let Value::Object(map) = slot {
                let child = map.entry(key.clone()).or_insert(Value::Null);
                insert_path(child, rest, value);
            }
        }
    }
}

/// Replace `&#NN` two-digit character references before splitting. A
/// trailing `;` is left in place.
fn unescape_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find("&#") {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 2..];
        let digits = after.get(..2).filter(|d| d.bytes().all(|b| b.is_ascii_digit()));
        match digits.and_then(|d| d.parse::<u8>().ok()) {
            Some(code) => {
                out.push(char::from(code));
                rest = &after[2..];
            }
            None => {
                out.push_str("&#");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

// ── Error marker ─────────────────────────────────────────────────────

fn check_error(value: &Value) -> Result<(), Error> {
    let Value::Object(map) = value else {
        return Ok(());
    };
    if !map.get("error").is_some_and(is_truthy) {
        return Ok(());
    }

    let field = |name: &str| match map.get(name) {
        Some(Value::String(s)) => trim_control(s).to_owned(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };

    let mut text = field("text");
    if text.is_empty() {
        text = field("message");
    }
    Err(Error::Api {
        details: field("details"),
        text,
    })
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => {
            let s = trim_control(s);
            !s.is_empty() && s != "0"
        }
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

fn trim_control(s: &str) -> &str {
    s.trim_matches(|c: char| c.is_control() || c.is_whitespace())
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Strip tags from an HTML body and shorten it for diagnostics.
pub fn html_snippet(body: &str) -> String {
    let mut text = String::with_capacity(body.len().min(1024));
    let mut in_tag = false;
    for c in body.chars() {
        match c {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                text.push(' ');
            }
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate(&collapsed, SNIPPET_LEN)
}
