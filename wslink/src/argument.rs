//!
//! Typed RPC argument tree (spec §9 design note: "Dynamic `args`/`kwargs`
//! substitution"). `serde_json::Value` cannot hold a raw binary blob, so
//! inbound arguments are modeled as this small tagged variant instead —
//! every place a client-supplied `wslink_binN` placeholder resolved
//! against the session's received-attachments map becomes an
//! [`Argument::Bytes`] leaf before a method handler ever sees it.
//!

use ahash::AHashMap;
use serde_json::Value;

/// One node of a request's `args`/`kwargs` tree, post attachment
/// substitution (spec §4.1 decode side).
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Bytes(Vec<u8>),
    Array(Vec<Argument>),
    Object(AHashMap<String, Argument>),
}

impl From<&Value> for Argument {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Argument::Null,
            Value::Bool(b) => Argument::Bool(*b),
            Value::Number(n) => Argument::Number(n.clone()),
            Value::String(s) => Argument::String(s.clone()),
            Value::Array(items) => Argument::Array(items.iter().map(Argument::from).collect()),
            Value::Object(map) => Argument::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Argument::from(v)))
                    .collect(),
            ),
        }
    }
}

impl Argument {
    /// Convert back to `serde_json::Value` for reply serialization.
    /// Returns `None` if the tree still contains raw [`Argument::Bytes`]
    /// — those have no JSON representation and the caller should treat
    /// this as a `RESULT_SERIALIZE_ERROR` (spec §4.5 "Result
    /// serialization failure"). A method that wants to emit a blob must
    /// first register it via `addAttachment` and embed the returned
    /// placeholder key as an `Argument::String`.
    pub fn to_value(&self) -> Option<Value> {
        Some(match self {
            Argument::Null => Value::Null,
            Argument::Bool(b) => Value::Bool(*b),
            Argument::Number(n) => Value::Number(n.clone()),
            Argument::String(s) => Value::String(s.clone()),
            Argument::Bytes(_) => return None,
            Argument::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(item.to_value()?);
                }
                Value::Array(out)
            }
            Argument::Object(map) => {
                let mut out = serde_json::Map::with_capacity(map.len());
                for (k, v) in map {
                    out.insert(k.clone(), v.to_value()?);
                }
                Value::Object(out)
            }
        })
    }

    /// Recursively substitute any string leaf matching an outstanding
    /// placeholder key in `received` with the raw bytes it names,
    /// draining the entry (spec §4.1: "the entry is removed from
    /// Received Attachments").
    pub fn substitute_attachments(self, received: &mut AHashMap<String, Vec<u8>>) -> Argument {
        match self {
            Argument::String(s) => {
                if is_placeholder_key(&s) {
                    if let Some(bytes) = received.remove(&s) {
                        return Argument::Bytes(bytes);
                    }
                }
                Argument::String(s)
            }
            Argument::Array(items) => Argument::Array(
                items
                    .into_iter()
                    .map(|item| item.substitute_attachments(received))
                    .collect(),
            ),
            Argument::Object(map) => Argument::Object(
                map.into_iter()
                    .map(|(k, v)| (k, v.substitute_attachments(received)))
                    .collect(),
            ),
            other => other,
        }
    }
}

/// `^wslink_bin\d+$` without pulling in the `regex` crate for a single
/// fixed-prefix/all-digits check (the `rpc` crate this was grounded on
/// carries the same `regex` dependency commented out as unused).
pub fn is_placeholder_key(s: &str) -> bool {
    match s.strip_prefix("wslink_bin") {
        Some(rest) => !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_key_matching() {
        assert!(is_placeholder_key("wslink_bin0"));
        assert!(is_placeholder_key("wslink_bin42"));
        assert!(!is_placeholder_key("wslink_bin"));
        assert!(!is_placeholder_key("wslink_binx"));
        assert!(!is_placeholder_key("xwslink_bin1"));
    }

    #[test]
    fn substitution_replaces_only_known_keys() {
        let mut received = AHashMap::new();
        received.insert("wslink_bin7".to_string(), vec![0u8, 1, 2]);

        let arg = Argument::Array(vec![
            Argument::String("wslink_bin7".to_string()),
            Argument::String("wslink_bin8".to_string()),
            Argument::String("not-a-placeholder".to_string()),
        ]);

        let result = arg.substitute_attachments(&mut received);
        match result {
            Argument::Array(items) => {
                assert_eq!(items[0], Argument::Bytes(vec![0, 1, 2]));
                assert_eq!(items[1], Argument::String("wslink_bin8".to_string()));
                assert_eq!(items[2], Argument::String("not-a-placeholder".to_string()));
            }
            _ => panic!("expected array"),
        }
        assert!(received.is_empty());
    }

    #[test]
    fn bytes_leaf_fails_to_serialize() {
        let arg = Argument::Array(vec![Argument::Bytes(vec![1, 2, 3])]);
        assert_eq!(arg.to_value(), None);
    }
}
