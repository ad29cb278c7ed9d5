//! Edge invocation event model.
//!
//! The edge runtime delivers an origin-response event: the viewer's request
//! (`uri`, raw `querystring`) alongside the response the origin produced. The
//! function returns that response, either untouched or rewritten.
//!
//! ```json
//! {"Records": [{"cf": {
//!     "request":  {"uri": "/photo.png", "querystring": "w=200&h=100"},
//!     "response": {"status": "200", "statusDescription": "OK",
//!                  "headers": {"content-type": [{"key": "Content-Type", "value": "image/png"}]}}
//! }}]}
//! ```
//!
//! Only the fields the pipeline reads are modelled on the request. Header
//! maps are keyed by the lower-case header name; each entry keeps the
//! original casing in `key`.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum EventError {
    #[error("event contains no records")]
    NoRecords,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeEvent {
    #[serde(rename = "Records")]
    pub records: Vec<EdgeRecord>,
}

impl EdgeEvent {
    /// Wrap a single request/response pair.
    pub fn single(request: EdgeRequest, response: EdgeResponse) -> Self {
        Self {
            records: vec![EdgeRecord {
                cf: CfPayload { request, response },
            }],
        }
    }

    /// Take the first record's request and response.
    pub fn into_parts(self) -> Result<(EdgeRequest, EdgeResponse), EventError> {
        let record = self
            .records
            .into_iter()
            .next()
            .ok_or(EventError::NoRecords)?;
        Ok((record.cf.request, record.cf.response))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub cf: CfPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CfPayload {
    pub request: EdgeRequest,
    #[serde(default)]
    pub response: EdgeResponse,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRequest {
    pub uri: String,
    #[serde(default)]
    pub querystring: String,
}

impl EdgeRequest {
    pub fn new(uri: impl Into<String>, querystring: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            querystring: querystring.into(),
        }
    }
}

/// The response envelope threaded through the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeResponse {
    #[serde(deserialize_with = "status_from_string_or_number")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_description: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, Vec<HeaderEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_encoding: Option<BodyEncoding>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyEncoding {
    Text,
    Base64,
}

impl EdgeResponse {
    /// Replace every value of `name` with a single entry.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.insert(
            name.to_ascii_lowercase(),
            vec![HeaderEntry {
                key: Some(name.to_string()),
                value: value.into(),
            }],
        );
    }

    /// First value of `name`, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .and_then(|entries| entries.first())
            .map(|entry| entry.value.as_str())
    }

    pub fn status_code(&self) -> Option<u16> {
        self.status.parse().ok()
    }
}

/// The runtime sends `status` as a string, but hand-written events often use
/// a number.
fn status_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Status {
        Text(String),
        Code(u64),
    }

    Ok(match Status::deserialize(deserializer)? {
        Status::Text(s) => s,
        Status::Code(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN_RESPONSE: &str = r#"{
        "Records": [{
            "cf": {
                "config": {"distributionId": "EDFDVBD6EXAMPLE"},
                "request": {
                    "clientIp": "203.0.113.178",
                    "method": "GET",
                    "uri": "/albums/photo.heic",
                    "querystring": "w=300&f=webp",
                    "headers": {"host": [{"key": "Host", "value": "d111111abcdef8.cloudfront.net"}]}
                },
                "response": {
                    "status": "200",
                    "statusDescription": "OK",
                    "headers": {
                        "content-type": [{"key": "Content-Type", "value": "image/heic"}],
                        "x-cache": [{"value": "Miss from cloudfront"}]
                    }
                }
            }
        }]
    }"#;

    #[test]
    fn parses_origin_response_event() {
        let event: EdgeEvent = serde_json::from_str(ORIGIN_RESPONSE).unwrap();
        let (request, response) = event.into_parts().unwrap();

        assert_eq!(request.uri, "/albums/photo.heic");
        assert_eq!(request.querystring, "w=300&f=webp");
        assert_eq!(response.status, "200");
        assert_eq!(response.status_code(), Some(200));
        assert_eq!(response.status_description.as_deref(), Some("OK"));
        assert_eq!(response.header("Content-Type"), Some("image/heic"));
        assert_eq!(response.header("x-cache"), Some("Miss from cloudfront"));
        assert_eq!(response.headers["x-cache"][0].key, None);
        assert_eq!(response.body, None);
    }

    #[test]
    fn missing_querystring_and_response_default() {
        let event: EdgeEvent =
            serde_json::from_str(r#"{"Records": [{"cf": {"request": {"uri": "/a.png"}}}]}"#)
                .unwrap();
        let (request, response) = event.into_parts().unwrap();
        assert_eq!(request.querystring, "");
        assert_eq!(response, EdgeResponse::default());
    }

    #[test]
    fn numeric_status_is_accepted() {
        let response: EdgeResponse =
            serde_json::from_str(r#"{"status": 404, "headers": {}}"#).unwrap();
        assert_eq!(response.status, "404");
    }

    #[test]
    fn empty_records_rejected() {
        let event: EdgeEvent = serde_json::from_str(r#"{"Records": []}"#).unwrap();
        assert_eq!(event.into_parts().unwrap_err(), EventError::NoRecords);
    }

    #[test]
    fn serializes_with_platform_field_names() {
        let mut response = EdgeResponse {
            status: "200".to_string(),
            status_description: Some("OK".to_string()),
            body: Some("aGk=".to_string()),
            body_encoding: Some(BodyEncoding::Base64),
            ..EdgeResponse::default()
        };
        response.set_header("Content-Type", "image/png");

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["statusDescription"], "OK");
        assert_eq!(json["bodyEncoding"], "base64");
        assert_eq!(json["headers"]["content-type"][0]["key"], "Content-Type");
        assert_eq!(json["headers"]["content-type"][0]["value"], "image/png");
    }

    #[test]
    fn set_header_replaces_existing_entries() {
        let mut response = EdgeResponse::default();
        response.headers.insert(
            "content-type".to_string(),
            vec![
                HeaderEntry {
                    key: Some("content-type".to_string()),
                    value: "a".to_string(),
                },
                HeaderEntry {
                    key: None,
                    value: "b".to_string(),
                },
            ],
        );
        response.set_header("Content-Type", "text/plain");
        assert_eq!(response.headers["content-type"].len(), 1);
        assert_eq!(response.header("CONTENT-TYPE"), Some("text/plain"));
    }
}
