//!
//! Attachment codec (spec §4.1, component C1): turning [`Argument::Bytes`]
//! leaves into `wslink_binN` placeholders on the way out, and the
//! header/binary/JSON send ordering every reply and publish goes
//! through.
//!

use workflow_websocket::server::{Message, WebSocketSink};

use crate::argument::{is_placeholder_key, Argument};
use crate::error::Result;
use crate::messages::WireMessage;
use crate::publish::AttachmentTable;

/// Recursively replace [`Argument::Bytes`] leaves with a freshly
/// allocated placeholder key, registering the blob in `table` with a
/// zero refcount (spec §4.1 encode side: "the blob itself is stored in
/// the publish attachment map... with refcount incremented" — the
/// increment happens later, at send time, in [`send_with_attachments`]).
pub fn extract_bytes(arg: Argument, table: &AttachmentTable) -> Argument {
    match arg {
        Argument::Bytes(bytes) => Argument::String(table.add(bytes)),
        Argument::Array(items) => {
            Argument::Array(items.into_iter().map(|item| extract_bytes(item, table)).collect())
        }
        Argument::Object(map) => Argument::Object(
            map.into_iter()
                .map(|(k, v)| (k, extract_bytes(v, table)))
                .collect(),
        ),
        other => other,
    }
}

/// Scan serialized JSON text for every *known* placeholder key — i.e.
/// one already present in the publish attachment map — in
/// first-appearance order (spec §4.1: "the sender scans the serialized
/// JSON text for every known placeholder key"; spec §4.3
/// `getAttachmentMap`: "snapshot for the sender's scan step"). This is a
/// literal substring match against each known key, not a structural
/// walk restricted to quoted-string positions — spec §9 Open Questions
/// preserves the source's substring-match behavior (`if key in
/// encMsg`), under which a user string that happens to contain a live
/// key's text as incidental content still triggers a send, rather than
/// tightening it to only structurally-quoted placeholder strings. Keys
/// with no entry in the attachment map are never candidates, so an
/// Attachment Header is never emitted without a blob behind it.
pub fn scan_placeholder_keys(text: &str, known_keys: &[String]) -> Vec<String> {
    let mut matches: Vec<(usize, &String)> = known_keys
        .iter()
        .filter_map(|key| text.find(key.as_str()).map(|pos| (pos, key)))
        .collect();
    matches.sort_by_key(|(pos, _)| *pos);
    matches.into_iter().map(|(_, key)| key.clone()).collect()
}

/// Send `message` preceded by an Attachment Header + binary frame for
/// every placeholder key it (or its serialized text) references (spec
/// §4.1 "Send protocol"). Used for both RPC replies and publishes —
/// both are "a publish or reply [that] carries binary blobs" per spec.
pub async fn send_with_attachments(
    sink: &WebSocketSink,
    table: &AttachmentTable,
    message: WireMessage,
) -> Result<()> {
    let text = serde_json::to_string(&message)?;
    let known_keys = table.snapshot_keys();
    let keys = scan_placeholder_keys(&text, &known_keys);

    for key in &keys {
        table.register(key);
        let header = WireMessage::attachment_header(vec![key.clone()]);
        sink.send(Message::Text(serde_json::to_string(&header)?))?;
        if let Some(bytes) = table.get(key) {
            sink.send(Message::Binary((*bytes).clone()))?;
        }
        table.unregister(key);
    }

    sink.send(Message::Text(text))?;
    table.free(&keys);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_dedups_in_first_appearance_order() {
        let text = r#"{"args":["wslink_bin3","wslink_bin1","wslink_bin3"]}"#;
        let known = vec!["wslink_bin3".to_string(), "wslink_bin1".to_string()];
        assert_eq!(
            scan_placeholder_keys(text, &known),
            vec!["wslink_bin3".to_string(), "wslink_bin1".to_string()]
        );
    }

    #[test]
    fn scan_ignores_keys_not_in_the_known_set() {
        let text = r#"{"args":["wslink_bin9","not-a-key",123]}"#;
        let known = vec!["wslink_bin3".to_string()];
        assert!(scan_placeholder_keys(text, &known).is_empty());
    }

    #[test]
    fn scan_never_emits_a_header_for_an_unregistered_key() {
        // Spec §3 invariant: a placeholder key in the payload only
        // triggers substitution if it corresponds to a live attachment
        // map entry; otherwise it is left as a literal string.
        let table = AttachmentTable::new();
        let text = r#"{"result":"wslink_bin0"}"#;
        let known = table.snapshot_keys();
        assert!(scan_placeholder_keys(text, &known).is_empty());
    }

    #[test]
    fn extract_bytes_replaces_nested_blobs() {
        let table = AttachmentTable::new();
        let arg = Argument::Array(vec![Argument::Bytes(vec![1, 2, 3])]);
        let replaced = extract_bytes(arg, &table);
        match replaced {
            Argument::Array(items) => match &items[0] {
                Argument::String(key) => assert!(is_placeholder_key(key)),
                other => panic!("expected placeholder string, got {other:?}"),
            },
            other => panic!("expected array, got {other:?}"),
        }
    }
}
