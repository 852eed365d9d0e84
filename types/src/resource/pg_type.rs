use serde::{Deserialize, Serialize};

use super::qualified;

/// Attribute of a composite type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeAttribute {
    pub name: String,
    pub data_type: String,
}

/// User-defined type: an enum when `enums` is non-empty, a composite when
/// `attributes` is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PgType {
    pub schema: String,
    pub name: String,
    pub format: String,
    #[serde(default)]
    pub enums: Vec<String>,
    #[serde(default)]
    pub attributes: Vec<TypeAttribute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl PgType {
    pub fn enumeration(
        schema: impl Into<String>,
        name: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let name = name.into();
        Self {
            schema: schema.into(),
            format: name.clone(),
            name,
            enums: values.into_iter().map(Into::into).collect(),
            attributes: Vec::new(),
            comment: None,
        }
    }

    pub fn is_enum(&self) -> bool {
        !self.enums.is_empty()
    }

    pub fn identity(&self) -> String {
        qualified(&self.schema, &self.name)
    }
}
