use serde::{Deserialize, Serialize};

use super::ColumnRef;

/// How a relation was declared from the point of view of the declaring model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationKind {
    /// This model holds the foreign key
    #[default]
    HasOne,
    /// The target model holds the foreign key
    HasMany,
    /// Both models are referenced from a through table
    ManyToMany,
}

impl RelationKind {
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HasOne => "hasOne",
            Self::HasMany => "hasMany",
            Self::ManyToMany => "manyToMany",
        }
    }
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RelationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hasOne" => Ok(Self::HasOne),
            "hasMany" => Ok(Self::HasMany),
            "manyToMany" => Ok(Self::ManyToMany),
            other => Err(format!(
                "unknown join type '{other}' (expected hasOne, hasMany or manyToMany)"
            )),
        }
    }
}

/// A foreign-key edge. `source` holds the key, `target` is the referenced column.
///
/// Identity is structural: two relations with the same endpoints are the same
/// relation whatever kind or constraint name they were declared with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    pub source: ColumnRef,
    pub target: ColumnRef,
    #[serde(default)]
    pub kind: RelationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub through: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint_name: Option<String>,
}

impl Relation {
    pub fn new(source: ColumnRef, target: ColumnRef, kind: RelationKind) -> Self {
        Self {
            source,
            target,
            kind,
            through: None,
            constraint_name: None,
        }
    }

    /// Constraint name, falling back to the Postgres default `{table}_{column}_fkey`.
    pub fn constraint(&self) -> String {
        self.constraint_name
            .clone()
            .unwrap_or_else(|| format!("{}_{}_fkey", self.source.table, self.source.column))
    }

    pub fn same_edge(&self, other: &Relation) -> bool {
        self.source == other.source && self.target == other.target
    }

    pub fn identity(&self) -> String {
        format!("{} -> {}", self.source, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_ignores_kind() {
        let a = Relation::new(
            ColumnRef::new("public", "lessons", "course_id"),
            ColumnRef::new("public", "courses", "id"),
            RelationKind::HasOne,
        );
        let mut b = a.clone();
        b.kind = RelationKind::HasMany;
        b.constraint_name = Some("custom".into());

        assert!(a.same_edge(&b));
        assert_eq!(a.identity(), b.identity());
        assert_eq!(a.constraint(), "lessons_course_id_fkey");
        assert_eq!(b.constraint(), "custom");
    }

    #[test]
    fn parses_join_types() {
        assert_eq!("manyToMany".parse::<RelationKind>(), Ok(RelationKind::ManyToMany));
        assert!("belongsTo".parse::<RelationKind>().is_err());
    }
}
