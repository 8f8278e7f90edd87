//! Error parser - turns the remote service's XML error documents into
//! readable `code: message` errors.

use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;

use crate::domain::MediaError;

/// Namespace of the `code` and `message` elements in remote error documents.
pub const DATA_SERVICES_METADATA_NAMESPACE: &str =
    "http://schemas.microsoft.com/ado/2007/08/dataservices/metadata";

/// Rewrite an error carrying an XML error document as `RemoteService("code: message")`.
///
/// The innermost cause is inspected (for a `Transfer` aggregate, its first
/// failure). Anything that is not such a document is returned unchanged, so
/// parsing an already parsed error is a no-op.
pub fn parse(error: Option<MediaError>) -> Option<MediaError> {
    let error = error?;
    match describe_error_document(&base_message(&error)) {
        Some(text) => Some(MediaError::RemoteService(text)),
        None => Some(error),
    }
}

fn base_message(error: &MediaError) -> String {
    if let MediaError::Transfer { failures, .. } = error
        && let Some(first) = failures.first()
    {
        return base_message(first);
    }

    let mut current: &(dyn std::error::Error + 'static) = error;
    while let Some(next) = current.source() {
        current = next;
    }
    current.to_string()
}

fn describe_error_document(text: &str) -> Option<String> {
    let (code, message) = read_code_and_message(text)?;
    let code = code.filter(|c| !c.trim().is_empty());
    let message = message.filter(|m| !m.trim().is_empty());

    match (code, message) {
        (Some(code), Some(message)) => Some(format!("{code}: {message}")),
        (Some(code), None) => Some(code),
        (None, Some(message)) => Some(message),
        (None, None) => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Code,
    Message,
}

fn field_of(ns: &ResolveResult<'_>, local_name: &[u8]) -> Option<Field> {
    match ns {
        ResolveResult::Bound(Namespace(uri))
            if *uri == DATA_SERVICES_METADATA_NAMESPACE.as_bytes() =>
        {
            match local_name {
                b"code" => Some(Field::Code),
                b"message" => Some(Field::Message),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Text of the first `code` and `message` children of the root element.
///
/// Returns `None` when `text` is not a well-formed XML document.
fn read_code_and_message(text: &str) -> Option<(Option<String>, Option<String>)> {
    let mut reader = NsReader::from_str(text);
    let mut depth = 0usize;
    let mut saw_root = false;
    let mut reading: Option<Field> = None;
    let mut buffer = String::new();
    let mut code = None;
    let mut message = None;

    loop {
        let (ns, event) = reader.read_resolved_event().ok()?;
        match event {
            Event::Start(start) => {
                depth += 1;
                if depth == 1 {
                    if saw_root {
                        return None;
                    }
                    saw_root = true;
                }
                if depth == 2 {
                    reading = field_of(&ns, start.local_name().as_ref());
                    buffer.clear();
                }
            }
            Event::Empty(start) => {
                if depth == 0 {
                    if saw_root {
                        return None;
                    }
                    saw_root = true;
                } else if depth == 1 {
                    match field_of(&ns, start.local_name().as_ref()) {
                        Some(Field::Code) => {
                            code.get_or_insert_with(String::new);
                        }
                        Some(Field::Message) => {
                            message.get_or_insert_with(String::new);
                        }
                        None => {}
                    }
                }
            }
            Event::End(_) => {
                if depth == 2 {
                    match reading.take() {
                        Some(Field::Code) => {
                            code.get_or_insert_with(|| buffer.clone());
                        }
                        Some(Field::Message) => {
                            message.get_or_insert_with(|| buffer.clone());
                        }
                        None => {}
                    }
                }
                depth = depth.checked_sub(1)?;
            }
            Event::Text(content) => {
                if depth == 0 && !content.iter().all(u8::is_ascii_whitespace) {
                    return None;
                }
                if reading.is_some() {
                    buffer.push_str(&content.unescape().ok()?);
                }
            }
            Event::CData(content) => {
                if reading.is_some() {
                    buffer.push_str(std::str::from_utf8(&content).ok()?);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    (saw_root && depth == 0).then_some((code, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;
    use rstest::rstest;

    fn document(children: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="utf-8" standalone="yes"?><error xmlns="{DATA_SERVICES_METADATA_NAMESPACE}">{children}</error>"#
        )
    }

    #[test]
    fn none_stays_none() {
        assert!(parse(None).is_none());
    }

    #[rstest]
    #[case("<code>ResourceNotFound</code><message xml:lang=\"en-US\">Asset not found</message>", "ResourceNotFound: Asset not found")]
    #[case("<code>ResourceNotFound</code>", "ResourceNotFound")]
    #[case("<message>Asset not found</message>", "Asset not found")]
    #[case("<code>  </code><message>Asset not found</message>", "Asset not found")]
    #[case("<code>A&amp;B</code><message>x &lt; y</message>", "A&B: x < y")]
    #[case("<message>first</message><message>second</message>", "first")]
    fn parses_code_and_message(#[case] children: &str, #[case] expected: &str) {
        let parsed = parse(Some(MediaError::transport(document(children)))).unwrap();
        assert_eq!(parsed.kind(), ErrorKind::RemoteService);
        assert_eq!(parsed.to_string(), expected);
    }

    #[rstest]
    #[case("connection reset by peer")]
    #[case("<error><code>NoNamespace</code></error>")]
    #[case("<error xmlns=\"urn:other\"><code>Other</code></error>")]
    #[case("<error><unclosed>")]
    fn unparsable_input_is_returned_unchanged(#[case] text: &str) {
        let parsed = parse(Some(MediaError::transport(text))).unwrap();
        assert!(matches!(parsed, MediaError::Transport { .. }));
        assert_eq!(parsed.to_string(), text);
    }

    #[test]
    fn empty_document_is_returned_unchanged() {
        let parsed = parse(Some(MediaError::transport(document("")))).unwrap();
        assert!(matches!(parsed, MediaError::Transport { .. }));
    }

    #[test]
    fn nested_code_elements_are_ignored() {
        let text = document("<inner><code>Deep</code></inner><message>Top</message>");
        let parsed = parse(Some(MediaError::transport(text))).unwrap();
        assert_eq!(parsed.to_string(), "Top");
    }

    #[test]
    fn uses_innermost_source() {
        let inner = std::io::Error::other(document("<code>Throttled</code>"));
        let outer = MediaError::Transport {
            message: "request failed".to_string(),
            source: Some(Box::new(inner)),
        };
        assert_eq!(parse(Some(outer)).unwrap().to_string(), "Throttled");
    }

    #[test]
    fn uses_first_failure_of_transfer_batch() {
        let batch = MediaError::Transfer {
            total: 3,
            failures: vec![
                MediaError::transport(document("<code>AuthenticationFailed</code>")),
                MediaError::Cancelled,
            ],
        };
        assert_eq!(
            parse(Some(batch)).unwrap().to_string(),
            "AuthenticationFailed"
        );
    }

    #[test]
    fn parse_is_idempotent() {
        let once = parse(Some(MediaError::transport(document(
            "<code>C</code><message>M</message>",
        ))));
        let once_text = once.as_ref().map(ToString::to_string);
        let twice = parse(once);
        assert_eq!(twice.map(|e| e.to_string()), once_text);
    }
}
