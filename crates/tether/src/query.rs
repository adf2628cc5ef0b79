#![forbid(unsafe_code)]

//! Query-string parsing.
//!
//! [`parse_query`] turns `a=1&b=2&a=3` into an insertion-ordered list of
//! parameters. A key seen once is [`ParamValue::Single`]; a repeat
//! promotes it to [`ParamValue::Multi`] in place, keeping the key's first
//! position. `+` decodes as a space and `%XX` escapes are decoded; a
//! malformed escape is an error rather than being passed through.
//!
//! [`parse_url_query`] is the same parser applied to a full URL: it finds
//! the query between `?` and any `#` fragment, and yields an empty list
//! when the URL has no query at all.

use thiserror::Error;

/// One query parameter's value(s).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParamValue {
    Single(String),
    /// The key appeared more than once; values in occurrence order.
    Multi(Vec<String>),
}

impl ParamValue {
    /// First (or only) value.
    #[must_use]
    pub fn first(&self) -> &str {
        match self {
            Self::Single(v) => v,
            Self::Multi(vs) => vs.first().map_or("", String::as_str),
        }
    }

    /// All values in occurrence order.
    #[must_use]
    pub fn all(&self) -> Vec<&str> {
        match self {
            Self::Single(v) => vec![v.as_str()],
            Self::Multi(vs) => vs.iter().map(String::as_str).collect(),
        }
    }

    fn push(&mut self, value: String) {
        match self {
            Self::Single(existing) => {
                *self = Self::Multi(vec![std::mem::take(existing), value]);
            }
            Self::Multi(vs) => vs.push(value),
        }
    }
}

/// Parse failure for one query component.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryParseError {
    /// A `%` not followed by two hex digits.
    #[error("invalid percent escape in query component {component:?}")]
    InvalidEscape { component: String },
    /// Percent-decoding produced bytes that are not UTF-8.
    #[error("query component {component:?} does not decode to UTF-8")]
    InvalidUtf8 { component: String },
}

/// Ordered query parameters.
pub type Params = Vec<(String, ParamValue)>;

/// Parse a query string (with or without its leading `?`).
///
/// Empty segments (`a=1&&b=2`) are skipped; a segment without `=` becomes
/// a key with an empty value.
pub fn parse_query(query: &str) -> Result<Params, QueryParseError> {
    let query = query.strip_prefix('?').unwrap_or(query);
    let query = query.split('#').next().unwrap_or("");

    let mut params: Params = Vec::new();
    for segment in query.split('&') {
        if segment.is_empty() {
            continue;
        }
        let (raw_key, raw_value) = match segment.split_once('=') {
            Some((k, v)) => (k, v),
            None => (segment, ""),
        };
        let key = decode_component(raw_key)?;
        let value = decode_component(raw_value)?;

        match params.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => existing.push(value),
            None => params.push((key, ParamValue::Single(value))),
        }
    }
    Ok(params)
}

/// Parse the query portion of a full URL.
pub fn parse_url_query(url: &str) -> Result<Params, QueryParseError> {
    match url.split_once('?') {
        Some((_, rest)) => parse_query(rest),
        None => Ok(Vec::new()),
    }
}

/// Look up a key in parsed parameters.
#[must_use]
pub fn get<'a>(params: &'a Params, key: &str) -> Option<&'a ParamValue> {
    params.iter().find(|(k, _)| k == key).map(|(_, v)| v)
}

fn decode_component(raw: &str) -> Result<String, QueryParseError> {
    let invalid_escape = || QueryParseError::InvalidEscape {
        component: raw.to_owned(),
    };

    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' => {
                let hex = bytes.get(i + 1..i + 3).ok_or_else(invalid_escape)?;
                let high = hex_digit(hex[0]).ok_or_else(invalid_escape)?;
                let low = hex_digit(hex[1]).ok_or_else(invalid_escape)?;
                out.push(high << 4 | low);
                i += 3;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8(out).map_err(|_| QueryParseError::InvalidUtf8 {
        component: raw.to_owned(),
    })
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
