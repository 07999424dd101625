//! Response normalization.
//!
//! Turns a [`RawResponse`] into a [`Normalized`] value, dispatching once on
//! the content type. Callers match on the variant instead of re-inspecting
//! the payload.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::html::HtmlDocument;
use crate::response::RawResponse;

/// A response body converted into a structured value.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    /// JSON document.
    Json(Value),
    /// Parsed HTML element tree.
    Html(HtmlDocument),
    /// Anything else, passed through untouched.
    Raw(Bytes),
}

impl Normalized {
    /// Name of the variant, for logs and CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            Normalized::Json(_) => "json",
            Normalized::Html(_) => "html",
            Normalized::Raw(_) => "raw",
        }
    }

    /// The JSON value, or a `MalformedResponse` naming what was found instead.
    pub fn into_json(self) -> Result<Value> {
        match self {
            Normalized::Json(value) => Ok(value),
            other => Err(Error::MalformedResponse(format!(
                "expected JSON, got {}",
                other.kind()
            ))),
        }
    }

    /// The HTML document, or a `MalformedResponse` naming what was found instead.
    pub fn into_html(self) -> Result<HtmlDocument> {
        match self {
            Normalized::Html(doc) => Ok(doc),
            other => Err(Error::MalformedResponse(format!(
                "expected HTML, got {}",
                other.kind()
            ))),
        }
    }

    /// Deserialize the JSON value into a typed structure.
    pub fn deserialize<T: DeserializeOwned>(self) -> Result<T> {
        let value = self.into_json()?;
        serde_json::from_value(value).map_err(|e| Error::MalformedResponse(e.to_string()))
    }
}

/// How a body should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Json,
    Html,
    Raw,
}

fn classify(response: &RawResponse) -> BodyKind {
    match response.content_type() {
        Some(ct) if ct.contains("json") => BodyKind::Json,
        Some(ct) if ct.contains("html") => BodyKind::Html,
        Some(_) => BodyKind::Raw,
        None => sniff(&response.body),
    }
}

// Untyped bodies: only an object or array counts as JSON.
fn sniff(body: &[u8]) -> BodyKind {
    let first = body.iter().find(|b| !b.is_ascii_whitespace());
    match first {
        Some(b'{') | Some(b'[') => BodyKind::Json,
        Some(b'<') => BodyKind::Html,
        _ => BodyKind::Raw,
    }
}

/// Normalize a response body according to its content type.
///
/// JSON that fails to parse yields [`Error::MalformedResponse`]. HTML never
/// fails: the parser recovers from broken markup the way browsers do.
pub fn normalize(response: RawResponse) -> Result<Normalized> {
    match classify(&response) {
        BodyKind::Json => {
            let value = serde_json::from_slice(&response.body).map_err(|e| {
                Error::MalformedResponse(format!("invalid JSON body: {}", e))
            })?;
            Ok(Normalized::Json(value))
        }
        BodyKind::Html => {
            let text = std::str::from_utf8(&response.body).map_err(|e| {
                Error::MalformedResponse(format!("HTML body is not UTF-8: {}", e))
            })?;
            Ok(Normalized::Html(HtmlDocument::parse(text)))
        }
        BodyKind::Raw => Ok(Normalized::Raw(response.body)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::ElementQuery;
    use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
    use serde_json::json;

    fn response(content_type: Option<&'static str>, body: &'static str) -> RawResponse {
        let mut headers = HeaderMap::new();
        if let Some(ct) = content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(ct));
        }
        RawResponse::new(200, headers, body)
    }

    #[test]
    fn test_json_mapping() {
        let normalized =
            normalize(response(Some("application/json"), r#"{"id": 1, "name": "a"}"#)).unwrap();
        assert_eq!(normalized, Normalized::Json(json!({"id": 1, "name": "a"})));
    }

    #[test]
    fn test_json_round_trip_preserves_pairs() {
        let inputs = [
            json!({"id": 1, "name": "a"}),
            json!({"nested": {"list": [1, 2, {"x": null}]}, "flag": true, "pi": 3.5}),
            json!([{"a": "b"}, {"c": "d"}]),
            json!({}),
        ];
        for input in inputs {
            let body = serde_json::to_vec(&input).unwrap();
            let raw = RawResponse::new(200, json_headers(), body);
            let value = normalize(raw).unwrap().into_json().unwrap();
            let reserialized: Value =
                serde_json::from_slice(&serde_json::to_vec(&value).unwrap()).unwrap();
            assert_eq!(reserialized, input);
        }
    }

    fn json_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        headers
    }

    #[test]
    fn test_malformed_json() {
        let err = normalize(response(Some("application/json"), "{not json")).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }

    #[test]
    fn test_vendor_json_content_type() {
        let normalized =
            normalize(response(Some("application/problem+json"), r#"{"title":"x"}"#)).unwrap();
        assert_eq!(normalized.kind(), "json");
    }

    #[test]
    fn test_html_is_parsed() {
        let normalized = normalize(response(
            Some("text/html;charset=utf-8"),
            "<html><body><a href='/x'>link</a></body></html>",
        ))
        .unwrap();
        let doc = normalized.into_html().unwrap();
        assert_eq!(doc.find_by_attribute("href", Some("/x"))[0].text(), "link");
    }

    #[test]
    fn test_other_content_is_raw() {
        let normalized = normalize(response(Some("text/plain"), "hello")).unwrap();
        assert_eq!(normalized, Normalized::Raw(Bytes::from_static(b"hello")));
        assert!(matches!(
            normalized.into_json(),
            Err(Error::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_untyped_body_is_sniffed() {
        assert_eq!(normalize(response(None, " [1,2]")).unwrap().kind(), "json");
        assert_eq!(normalize(response(None, "<p>x</p>")).unwrap().kind(), "html");
        assert_eq!(normalize(response(None, "")).unwrap().kind(), "raw");
    }

    #[test]
    fn test_deserialize_typed() {
        #[derive(serde::Deserialize)]
        struct Item {
            id: u32,
        }
        let item: Item = normalize(response(Some("application/json"), r#"{"id":7}"#))
            .unwrap()
            .deserialize()
            .unwrap();
        assert_eq!(item.id, 7);
    }
}
