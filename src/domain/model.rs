use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Document 中最小的可路由片段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fragment {
    pub identifiers: BTreeSet<String>,
    pub content: String,
    /// 由 splitter 帶入的片段屬性（例如 `data-service-*`）
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    /// enrichment 類 knot 附加到片段上的資料
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub context: serde_json::Map<String, serde_json::Value>,
}

impl Fragment {
    /// Empty identifier strings are dropped; they can never be routed on.
    pub fn new<I, S>(identifiers: I, content: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            identifiers: identifiers
                .into_iter()
                .map(Into::into)
                .filter(|id: &String| !id.is_empty())
                .collect(),
            content: content.into(),
            attributes: BTreeMap::new(),
            context: serde_json::Map::new(),
        }
    }

    /// 沒有任何 identifier 的靜態片段，任何 knot 都不會匹配
    pub fn raw(content: impl Into<String>) -> Self {
        Self::new(Vec::<String>::new(), content)
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn has_identifier(&self, identifier: &str) -> bool {
        self.identifiers.contains(identifier)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRequest {
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl ClientRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            path: path.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// 錯誤標記：哪個 knot 在什麼原因下把 document 標為失敗
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentError {
    pub source: String,
    pub message: String,
}

/// 在整條 pipeline 中傳遞的共享文件
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub client_request: ClientRequest,
    #[serde(default)]
    pub client_response: ClientResponse,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fragments: Option<Vec<Fragment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<DocumentError>,
}

impl Document {
    pub fn new(client_request: ClientRequest) -> Self {
        Self {
            client_request,
            ..Default::default()
        }
    }

    pub fn with_fragments(mut self, fragments: Vec<Fragment>) -> Self {
        self.fragments = Some(fragments);
        self
    }

    pub fn fragments(&self) -> Option<&[Fragment]> {
        self.fragments.as_deref()
    }

    /// Fragments can be edited in place but not added, removed or reordered.
    pub fn fragments_mut(&mut self) -> impl Iterator<Item = &mut Fragment> {
        self.fragments.iter_mut().flatten()
    }

    pub fn mark_failed(&mut self, source: impl Into<String>, message: impl Into<String>) {
        self.error = Some(DocumentError {
            source: source.into(),
            message: message.into(),
        });
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}
