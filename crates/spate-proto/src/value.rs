//! Protocol value model shared by the encoder and decoder.

use std::collections::BTreeMap;

/// A single value carried over the wire.
///
/// The daemon's protocol distinguishes integers, booleans, doubles,
/// strings, arrays, and structs; anything more exotic is rejected at
/// decode time.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// 64-bit signed integer (`i4`/`i8` on the wire).
    Int(i64),
    /// Boolean encoded as `0`/`1`.
    Bool(bool),
    /// Double-precision float.
    Double(f64),
    /// UTF-8 string, entity-unescaped.
    String(String),
    /// Ordered sequence of values.
    Array(Vec<Value>),
    /// Named members; ordering follows member names for determinism.
    Struct(BTreeMap<String, Value>),
}

impl Value {
    /// Convenience constructor for string values.
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    /// Borrow the string content, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    /// Integer view of the value.
    ///
    /// The daemon renders large counters as string payloads on some
    /// builds, so numeric strings are accepted here as well.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            Self::Bool(value) => Some(i64::from(*value)),
            Self::String(value) => value.trim().parse().ok(),
            _ => None,
        }
    }

    /// Boolean view of the value; integers map through `!= 0`.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            Self::Int(value) => Some(*value != 0),
            _ => None,
        }
    }

    /// Float view of the value.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Double(value) => Some(*value),
            #[expect(
                clippy::cast_precision_loss,
                reason = "rate figures comfortably fit f64 precision"
            )]
            Self::Int(value) => Some(*value as f64),
            Self::String(value) => value.trim().parse().ok(),
            _ => None,
        }
    }

    /// Borrow the elements, if this is an array.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow the members, if this is a struct.
    #[must_use]
    pub fn as_struct(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Struct(members) => Some(members),
            _ => None,
        }
    }

    /// Consume the value into its array elements.
    #[must_use]
    pub fn into_array(self) -> Option<Vec<Value>> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Apply the five standard entity escapes to text content.
#[must_use]
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

/// Reverse the five standard entity escapes.
///
/// Unknown entities are passed through verbatim; the daemon only ever
/// emits the standard five.
#[must_use]
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        let replaced = [
            ("&amp;", '&'),
            ("&lt;", '<'),
            ("&gt;", '>'),
            ("&quot;", '"'),
            ("&apos;", '\''),
        ]
        .iter()
        .find_map(|(entity, ch)| rest.strip_prefix(entity).map(|tail| (*ch, tail)));
        match replaced {
            Some((ch, tail)) => {
                out.push(ch);
                rest = tail;
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_strings_coerce_to_integers() {
        assert_eq!(Value::string("12345").as_i64(), Some(12_345));
        assert_eq!(Value::Int(7).as_i64(), Some(7));
        assert_eq!(Value::string("not a number").as_i64(), None);
    }

    #[test]
    fn escape_round_trips_the_standard_entities() {
        let raw = "a < b & \"c\" > 'd'";
        assert_eq!(unescape(&escape(raw)), raw);
    }

    #[test]
    fn unescape_leaves_unknown_entities_alone() {
        assert_eq!(unescape("x &copy; y"), "x &copy; y");
        assert_eq!(unescape("tail &"), "tail &");
    }
}
