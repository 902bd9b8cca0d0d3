//! Server-side object shapes and the normalized result item.
//!
//! The object search endpoint answers with a JSON array of objects. Each
//! element is untrusted: it is decoded on its own, and an element that lacks
//! any of the fields a [`SearchResultItem`] needs is dropped instead of
//! failing the whole search.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::SearchError;

/// One CMDB object as returned by the server.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawObject {
    pub id: i64,
    pub object_key: String,
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    pub object_type: RawObjectType,
    pub avatar: RawAvatar,
    #[serde(rename = "_links")]
    pub links: RawLinks,
}

/// Object type the object belongs to.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawObjectType {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub object_schema_id: Option<i64>,
}

/// Avatar icon URLs in several sizes. Only the 48px variant is required.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAvatar {
    #[serde(default)]
    pub url16: Option<String>,
    pub url48: String,
    #[serde(default)]
    pub url72: Option<String>,
    #[serde(default)]
    pub url144: Option<String>,
    #[serde(default)]
    pub url288: Option<String>,
    #[serde(default)]
    pub object_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawLinks {
    #[serde(rename = "self")]
    pub self_link: String,
}

/// Normalized search result handed to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultItem {
    pub id: i64,
    pub key: String,
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub type_id: i64,
    /// Canonical object URL, exactly the server's `_links.self`.
    pub url: String,
    pub icon: String,
}

impl SearchResultItem {
    /// `[name](url)`
    pub fn markdown_link(&self) -> String {
        format!("[{}]({})", self.name, self.url)
    }

    /// `<a href="url">name</a>`
    pub fn html_link(&self) -> String {
        format!("<a href=\"{}\">{}</a>", self.url, self.name)
    }
}

impl From<RawObject> for SearchResultItem {
    fn from(raw: RawObject) -> Self {
        Self {
            id: raw.id,
            key: raw.object_key,
            name: raw.name,
            type_name: raw.object_type.name,
            type_id: raw.object_type.id,
            url: raw.links.self_link,
            icon: raw.avatar.url48,
        }
    }
}

/// Decode a search response body into result items, in server order.
///
/// An empty body or a JSON `null` is an empty result. Anything other than an
/// array is rejected.
pub fn parse_search_results(body: &str) -> Result<Vec<SearchResultItem>, SearchError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    let value: Value = serde_json::from_str(body).map_err(|e| SearchError::InvalidResponse {
        message: e.to_string(),
    })?;

    let elements = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Array(elements) => elements,
        other => {
            return Err(SearchError::InvalidResponse {
                message: format!("expected a JSON array, got {}", json_kind(&other)),
            })
        }
    };

    let total = elements.len();
    let items: Vec<SearchResultItem> = elements
        .into_iter()
        .enumerate()
        .filter_map(|(index, element)| match RawObject::deserialize(element) {
            Ok(raw) => Some(SearchResultItem::from(raw)),
            Err(e) => {
                debug!(index, error = %e, "Dropping malformed search result");
                None
            }
        })
        .collect();

    if items.len() < total {
        debug!(kept = items.len(), total, "Some search results were dropped");
    }

    Ok(items)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
