//! Extraction of the search-result payload embedded in a scraped page.

use serde_json::Value;

use crate::suggestion::SuggestionError;

const PAYLOAD_START_ANCHOR: &str = "{\"serverModelJSONstring\":\"";
const PAYLOAD_END_ANCHOR: &str = "\",\"redux";

/// Returns the still-escaped payload between the page anchors.
///
/// Start anchors are tried in page order. The payload of the first one whose
/// line also holds an end anchor runs up to the last end anchor on that line.
fn locate_payload(body: &str) -> Option<&str> {
    body.match_indices(PAYLOAD_START_ANCHOR).find_map(|(index, _)| {
        let rest = &body[index + PAYLOAD_START_ANCHOR.len()..];
        let line_end = rest
            .find(|ch: char| ch == '\n' || ch == '\r')
            .unwrap_or(rest.len());
        let line = &rest[..line_end];
        line.rfind(PAYLOAD_END_ANCHOR).map(|end| &line[..end])
    })
}

/// Turns the embedded payload back into JSON text.
fn unescape_payload(payload: &str) -> String {
    payload.replace("\\u0022", "\"").replace("\\\\\"", "\\\"")
}

/// Parses a raw page body into the loosely-typed search result items.
///
/// A page without the embedded payload, or a payload without
/// `searchResult.items`, has no results and yields `Value::Array([])`.
pub fn parse_search_page(body: &str) -> Result<Value, SuggestionError> {
    let Some(payload) = locate_payload(body) else {
        return Ok(Value::Array(Vec::new()));
    };

    let json = unescape_payload(payload);
    let parsed: Value = serde_json::from_str(&json).map_err(|error| {
        let snippet: String = json.chars().take(120).collect();
        SuggestionError::MalformedPayload(format!("{error}; prefix={snippet}"))
    })?;

    match parsed.pointer("/searchResult/items") {
        None | Some(Value::Null) => Ok(Value::Array(Vec::new())),
        Some(items) => Ok(items.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::{locate_payload, parse_search_page, unescape_payload};
    use crate::suggestion::SuggestionError;
    use serde_json::json;

    fn page_with_payload(payload: &str) -> String {
        format!(
            "<html><script>window.__state = {{\"serverModelJSONstring\":\"{payload}\",\"reduxState\":{{}}}};</script></html>"
        )
    }

    #[test]
    fn test_empty_items_payload_yields_empty_list() {
        let body = page_with_payload(r"{\u0022searchResult\u0022:{\u0022items\u0022:[]}}");

        let items = parse_search_page(&body).expect("empty payload should parse");

        assert_eq!(items, json!([]));
    }

    #[test]
    fn test_missing_anchor_yields_empty_list() {
        let items = parse_search_page("<html><body>No results</body></html>")
            .expect("missing anchor is not an error");

        assert_eq!(items, json!([]));
    }

    #[test]
    fn test_missing_nested_keys_yield_empty_list() {
        let no_items = page_with_payload(r"{\u0022searchResult\u0022:{}}");
        let no_result = page_with_payload(r"{\u0022other\u0022:1}");
        let null_items =
            page_with_payload(r"{\u0022searchResult\u0022:{\u0022items\u0022:null}}");

        for body in [no_items, no_result, null_items] {
            assert_eq!(
                parse_search_page(&body).expect("missing keys are not an error"),
                json!([])
            );
        }
    }

    #[test]
    fn test_items_are_extracted_in_order() {
        let body = page_with_payload(
            r"{\u0022searchResult\u0022:{\u0022items\u0022:[{\u0022id\u0022:\u0022a\u0022},{\u0022id\u0022:\u0022b\u0022}]}}",
        );

        let items = parse_search_page(&body).expect("payload should parse");

        assert_eq!(items, json!([{"id": "a"}, {"id": "b"}]));
    }

    #[test]
    fn test_malformed_payload_is_reported() {
        let body = page_with_payload(r"{\u0022searchResult\u0022:");

        let error = parse_search_page(&body).expect_err("truncated JSON should fail");

        assert!(matches!(error, SuggestionError::MalformedPayload(_)));
    }

    #[test]
    fn test_escaped_quote_inside_value_survives_unescape() {
        assert_eq!(
            unescape_payload(r#"{"n":"Say \\"Hi\\""}"#),
            r#"{"n":"Say \"Hi\""}"#
        );
        let body = page_with_payload(r#"{"searchResult":{"items":[{"n":"Say \\"Hi\\""}]}}"#);

        let items = parse_search_page(&body).expect("escaped quotes should parse");

        assert_eq!(items, json!([{"n": "Say \"Hi\""}]));
    }

    #[test]
    fn test_payload_ends_at_last_anchor_on_the_same_line() {
        let body = "{\"serverModelJSONstring\":\"A\",\"redux B\",\"redux C\nD\",\"redux";

        assert_eq!(locate_payload(body), Some("A\",\"redux B"));
    }

    #[test]
    fn test_end_anchor_on_a_later_line_is_not_matched() {
        let body = "{\"serverModelJSONstring\":\"{}\n\",\"redux";

        assert_eq!(locate_payload(body), None);
        assert_eq!(parse_search_page(body).expect("no payload"), json!([]));
    }

    #[test]
    fn test_unclosed_anchor_falls_through_to_next_payload() {
        let body = format!(
            "{{\"serverModelJSONstring\":\"broken\n{}",
            page_with_payload(r#"{"searchResult":{"items":[{"id":"a"}]}}"#)
        );

        let items = parse_search_page(&body).expect("second payload should parse");

        assert_eq!(items, json!([{"id": "a"}]));
    }
}
