use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Response status codes of the GENESIS-Online API.
///
/// Unknown codes are preserved as [`StatusCode::Other`] rather than rejected,
/// since the upstream API defines more codes than the client branches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum StatusCode {
    /// 0 - the request matched an object.
    Match,
    /// 22 - the request matched, with a caveat in the status message.
    PartlyMatch,
    /// 89 - the result is too large; a batch job is required.
    BackgroundRequired,
    /// 99 - a batch job has been started for this request.
    BackgroundRunning,
    /// 104 - no matching object.
    NoMatch,
    /// Any other code the API may return.
    Other(i64),
}

impl From<i64> for StatusCode {
    fn from(code: i64) -> Self {
        match code {
            0 => StatusCode::Match,
            22 => StatusCode::PartlyMatch,
            89 => StatusCode::BackgroundRequired,
            99 => StatusCode::BackgroundRunning,
            104 => StatusCode::NoMatch,
            other => StatusCode::Other(other),
        }
    }
}

impl From<StatusCode> for i64 {
    fn from(code: StatusCode) -> Self {
        match code {
            StatusCode::Match => 0,
            StatusCode::PartlyMatch => 22,
            StatusCode::BackgroundRequired => 89,
            StatusCode::BackgroundRunning => 99,
            StatusCode::NoMatch => 104,
            StatusCode::Other(other) => other,
        }
    }
}

/// Identity of the service and method that produced a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ident {
    #[serde(rename = "Service")]
    pub service: String,
    #[serde(rename = "Method")]
    pub method: String,
}

/// Status block of a response: numeric code, human-readable message, and
/// message type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    #[serde(rename = "Code")]
    pub code: StatusCode,
    #[serde(rename = "Content", default)]
    pub content: String,
    #[serde(rename = "Type", default)]
    pub kind: String,
}

impl Status {
    /// The canned success status the API localizes by request language,
    /// reproduced verbatim (spelling included).
    pub(crate) fn success(language: &str) -> Self {
        let en = language == "en";
        Status {
            code: StatusCode::Match,
            content: if en { "successfull" } else { "erfolgreich" }.to_string(),
            kind: if en { "information" } else { "Information" }.to_string(),
        }
    }
}

/// Payload of a normalized response.
///
/// Chart and map endpoints return raw PNG bytes; file-flavoured endpoints
/// return CSV text; everything else is JSON. Binary payloads serialize as a
/// single-key `{"$binary": "<base64>"}` object so stored envelopes remain
/// valid JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Binary(BinaryContent),
    Text(String),
    Json(Value),
}

impl Content {
    pub fn binary(bytes: Vec<u8>) -> Self {
        Content::Binary(BinaryContent(bytes))
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Content::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Content::Binary(b) => Some(&b.0),
            _ => None,
        }
    }
}

/// Raw bytes wrapped for JSON persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryContent(pub Vec<u8>);

impl Serialize for BinaryContent {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("$binary", &BASE64.encode(&self.0))?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for BinaryContent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct Repr {
            #[serde(rename = "$binary")]
            data: String,
        }
        let repr = Repr::deserialize(deserializer)?;
        let bytes = BASE64.decode(repr.data.as_bytes()).map_err(serde::de::Error::custom)?;
        Ok(BinaryContent(bytes))
    }
}

/// The normalized response shape shared by every endpoint.
///
/// All five fields are always present after normalization, regardless of
/// which endpoint produced the response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "Ident")]
    pub ident: Ident,
    #[serde(rename = "Status")]
    pub status: Status,
    #[serde(rename = "Parameter", default)]
    pub parameter: Map<String, Value>,
    #[serde(rename = "Content")]
    pub content: Content,
    #[serde(rename = "Copyright", default)]
    pub copyright: String,
}

impl Envelope {
    /// The `language` request parameter echoed back by the server, if any.
    pub fn language(&self) -> Option<&str> {
        self.parameter.get("language").and_then(Value::as_str)
    }
}

/// A response as the API sends it, with the payload still nested under
/// `Object`.
#[derive(Debug, Deserialize)]
pub(crate) struct RawEnvelope {
    #[serde(rename = "Ident")]
    ident: Ident,
    #[serde(rename = "Status")]
    status: Status,
    #[serde(rename = "Parameter", default)]
    parameter: Map<String, Value>,
    #[serde(rename = "Object", default)]
    object: Value,
    #[serde(rename = "Copyright", default)]
    copyright: String,
}

impl RawEnvelope {
    pub(crate) fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| Error::Standardization {
            message: "response does not match the GENESIS envelope shape".to_string(),
            source: Some(e),
        })
    }

    /// Flattens the nested `Object.Content` and renames `Object` to
    /// `Content`, yielding the normalized envelope.
    pub(crate) fn normalize(self) -> Result<Envelope> {
        let content = match self.object {
            Value::Null => Content::Json(Value::Null),
            Value::Object(mut map) => {
                let inner = map.remove("Content").ok_or_else(|| {
                    Error::standardization("response object carries no Content field")
                })?;
                Content::Json(inner)
            }
            other => Content::Json(other),
        };

        Ok(Envelope {
            ident: self.ident,
            status: self.status,
            parameter: self.parameter,
            content,
            copyright: self.copyright,
        })
    }
}
