//! Join fields recovered from foreign keys
//!
//! For a model table:
//!
//! - each foreign key it holds becomes a `hasOne` field,
//! - each foreign key pointing at it becomes a `hasMany` field,
//! - each junction table (exactly two foreign keys) linking it to another
//!   model becomes a `manyToMany` field.

use std::collections::HashSet;

use supaform_types::{JoinTag, Relation, RelationKind, Table};

use super::render::{bare, ident};

/// A field to add to a model struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinField {
    pub ident: String,
    /// Field type
    pub rust_type: String,
    /// Struct name of the joined model
    pub target: String,
    pub tag: JoinTag,
}

/// Field names already taken on a struct.
#[derive(Debug, Default)]
pub struct Taken(HashSet<String>);

impl Taken {
    pub fn new(names: impl IntoIterator<Item = String>) -> Self {
        Self(names.into_iter().map(|n| bare(&n).to_string()).collect())
    }

    /// `base`, else `base_by_{key}`, else a numbered variant.
    pub fn claim(&mut self, base: &str, key: &str) -> String {
        let mut candidates = vec![ident(base), ident(&format!("{base}_by_{key}"))];
        let mut n = 2;
        while candidates.iter().all(|c| self.0.contains(bare(c))) {
            candidates.push(ident(&format!("{base}_by_{key}_{n}")));
            n += 1;
        }
        let name = candidates
            .into_iter()
            .find(|c| !self.0.contains(bare(c)))
            .unwrap_or_default();
        self.0.insert(bare(&name).to_string());
        name
    }
}

fn on(table: &Table, schema: &str, name: &str) -> bool {
    table.schema == schema && table.name == name
}

/// How `through` is written in a join tag.
fn through_reference(schema: &str, table: &str) -> String {
    if schema == "public" {
        table.to_string()
    } else {
        format!("{schema}.{table}")
    }
}

/// Join fields of `table`. `model_name` answers the struct name of a table
/// that gets a model, `None` for tables left out.
pub fn join_fields(
    table: &Table,
    relations: &[&Relation],
    model_name: &impl Fn(&str, &str) -> Option<String>,
    taken: &mut Taken,
) -> Vec<JoinField> {
    let mut out = Vec::new();

    for rel in relations.iter().filter(|r| on(table, &r.source.schema, &r.source.table)) {
        let Some(target) = model_name(&rel.target.schema, &rel.target.table) else {
            continue;
        };
        let fk = &rel.source.column;
        let base = fk
            .strip_suffix("_id")
            .or_else(|| fk.strip_suffix("_ref"))
            .filter(|b| !b.is_empty())
            .unwrap_or(&rel.target.table);
        out.push(JoinField {
            ident: taken.claim(base, fk),
            rust_type: format!("Option<Box<{target}>>"),
            tag: JoinTag {
                join_type: RelationKind::HasOne,
                primary_key: Some(rel.target.column.clone()),
                foreign_key: Some(fk.clone()),
                ..JoinTag::default()
            },
            target,
        });
    }

    for rel in relations.iter().filter(|r| on(table, &r.target.schema, &r.target.table)) {
        let Some(source) = model_name(&rel.source.schema, &rel.source.table) else {
            continue;
        };
        out.push(JoinField {
            ident: taken.claim(&rel.source.table, &rel.source.column),
            rust_type: format!("Vec<{source}>"),
            tag: JoinTag {
                join_type: RelationKind::HasMany,
                primary_key: Some(rel.target.column.clone()),
                foreign_key: Some(rel.source.column.clone()),
                ..JoinTag::default()
            },
            target: source,
        });
    }

    for (near, far) in junction_pairs(table, relations) {
        let Some(target) = model_name(&far.target.schema, &far.target.table) else {
            continue;
        };
        if model_name(&near.source.schema, &near.source.table).is_none() {
            continue;
        }
        out.push(JoinField {
            ident: taken.claim(&far.target.table, &far.source.column),
            rust_type: format!("Vec<{target}>"),
            tag: JoinTag {
                join_type: RelationKind::ManyToMany,
                through: Some(through_reference(&near.source.schema, &near.source.table)),
                source_primary_key: Some(near.target.column.clone()),
                source_foreign_key: Some(near.source.column.clone()),
                target_primary_key: Some(far.target.column.clone()),
                target_foreign: Some(far.source.column.clone()),
                ..JoinTag::default()
            },
            target,
        });
    }

    out
}

/// `(edge into table, other edge)` for every junction referencing `table`.
fn junction_pairs<'a>(
    table: &Table,
    relations: &[&'a Relation],
) -> Vec<(&'a Relation, &'a Relation)> {
    let mut junctions: Vec<(&str, &str)> = Vec::new();
    for rel in relations {
        let key = (rel.source.schema.as_str(), rel.source.table.as_str());
        if !junctions.contains(&key) {
            junctions.push(key);
        }
    }

    let mut pairs = Vec::new();
    for (schema, name) in junctions {
        let edges: Vec<&'a Relation> = relations
            .iter()
            .copied()
            .filter(|r| r.source.schema == schema && r.source.table == name)
            .collect();
        if let [a, b] = edges[..] {
            if on(table, &a.target.schema, &a.target.table) {
                pairs.push((a, b));
            }
            if on(table, &b.target.schema, &b.target.table) {
                pairs.push((b, a));
            }
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use supaform_types::{Column, ColumnRef};

    fn fk(source: (&str, &str), target: (&str, &str)) -> Relation {
        Relation::new(
            ColumnRef::new("public", source.0, source.1),
            ColumnRef::new("public", target.0, target.1),
            RelationKind::HasOne,
        )
    }

    fn modeled(_: &str, table: &str) -> Option<String> {
        (table != "audit").then(|| heck::ToPascalCase::to_pascal_case(table))
    }

    #[test]
    fn has_one_and_has_many() {
        let lessons_course = fk(("lessons", "course_id"), ("courses", "id"));
        let audit = fk(("audit", "course_id"), ("courses", "id"));
        let relations = vec![&lessons_course, &audit];

        let lessons = Table::new("public", "lessons").column(Column::new("course_id", "bigint"));
        let mut taken = Taken::new(["id".to_string(), "course_id".to_string()]);
        let fields = join_fields(&lessons, &relations, &modeled, &mut taken);
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].ident, "course");
        assert_eq!(fields[0].rust_type, "Option<Box<Courses>>");
        assert_eq!(fields[0].tag.to_string(), "joinType:hasOne;primaryKey:id;foreignKey:course_id");

        let courses = Table::new("public", "courses");
        let fields = join_fields(&courses, &relations, &modeled, &mut Taken::default());
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].ident, "lessons");
        assert_eq!(fields[0].rust_type, "Vec<Lessons>");
        assert_eq!(
            fields[0].tag.to_string(),
            "joinType:hasMany;primaryKey:id;foreignKey:course_id"
        );
    }

    #[test]
    fn junction_tables_become_many_to_many() {
        let student = fk(("enrollments", "student_id"), ("students", "id"));
        let course = fk(("enrollments", "course_id"), ("courses", "id"));
        let relations = vec![&student, &course];

        let students = Table::new("public", "students");
        let fields = join_fields(&students, &relations, &modeled, &mut Taken::default());
        let names: Vec<_> = fields.iter().map(|f| f.ident.as_str()).collect();
        assert_eq!(names, ["enrollments", "courses"]);
        assert_eq!(
            fields[1].tag.to_string(),
            "joinType:manyToMany;through:enrollments;sourcePrimaryKey:id;sourceForeignKey:student_id;targetPrimaryKey:id;targetForeign:course_id"
        );
        assert_eq!(fields[1].target, "Courses");
    }

    #[test]
    fn colliding_names_use_the_key() {
        let author = fk(("posts", "author_id"), ("users", "id"));
        let editor = fk(("posts", "editor_id"), ("users", "id"));
        let relations = vec![&author, &editor];

        let users = Table::new("public", "users");
        let fields = join_fields(&users, &relations, &modeled, &mut Taken::default());
        let names: Vec<_> = fields.iter().map(|f| f.ident.as_str()).collect();
        // two keys on one table also read as a self-referencing junction
        assert_eq!(names, ["posts", "posts_by_editor_id", "users", "users_by_author_id"]);
    }

    #[test]
    fn taken_names_are_claimed_once() {
        let mut taken = Taken::new(["type".to_string()]);
        assert_eq!(taken.claim("type", "kind"), "type_by_kind");
        assert_eq!(taken.claim("type", "kind"), "type_by_kind_2");
        assert_eq!(taken.claim("match", "x"), "r#match");
    }
}
