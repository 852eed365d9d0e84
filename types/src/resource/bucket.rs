use serde::{Deserialize, Serialize};

/// Storage bucket, stored as a row of `storage.buckets`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub name: String,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub allowed_mime_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size_limit: Option<i64>,
    #[serde(default)]
    pub avif_autodetection: bool,
}

impl Bucket {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            public: false,
            allowed_mime_types: Vec::new(),
            file_size_limit: None,
            avif_autodetection: false,
        }
    }

    pub fn identity(&self) -> String {
        self.name.clone()
    }
}
