//! Bound model aliases in function definitions
//!
//! An RPC definition is a template: `:alias` tokens stand for the tables of
//! the models bound in the `models` attribute.
//!
//! ```text
//! models = "s:Submissions"
//! select * from :s s where s.id = candidate_id
//!     => select * from submissions s where s.id = candidate_id
//! ```
//!
//! Single-quoted literals are never rewritten, in either direction.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use supaform_core::map_code;
use supaform_types::ModelBinding;

static ALIAS_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|[^:A-Za-z0-9_]):([A-Za-z_][A-Za-z0-9_]*)\b")
        .expect("alias token pattern is valid")
});

static TABLE_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)\b(from|join)(\s+)((?:"?[A-Za-z_][A-Za-z0-9_]*"?\.)?"?[A-Za-z_][A-Za-z0-9_]*"?)(\s+(?:as\s+)?)([A-Za-z_][A-Za-z0-9_]*)\b"#,
    )
    .expect("table reference pattern is valid")
});

/// Words that follow a table reference without being its alias.
const NOT_AN_ALIAS: &[&str] = &[
    "as", "cross", "full", "group", "having", "inner", "join", "lateral", "left", "limit",
    "natural", "offset", "on", "order", "outer", "returning", "right", "select", "set", "union",
    "using", "values", "where", "window", "for",
];

/// Split `s:Submissions, c:Candidate` into `(alias, model)` pairs.
pub fn parse_bindings(models: &str) -> Result<Vec<(String, String)>, String> {
    supaform_types::tags::split_list(models)
        .into_iter()
        .map(|pair| match pair.split_once(':') {
            Some((alias, model)) if !alias.trim().is_empty() && !model.trim().is_empty() => {
                Ok((alias.trim().to_string(), model.trim().to_string()))
            }
            _ => Err(format!("binding '{pair}' is not of the form alias:Model")),
        })
        .collect()
}

/// How a bound table is written into a definition.
pub fn table_reference(schema: &str, table: &str) -> String {
    if schema == "public" {
        table.to_string()
    } else {
        format!("{schema}.{table}")
    }
}

/// Replace every bound `:alias` with its table. Unbound tokens are kept.
pub fn substitute(template: &str, bindings: &[ModelBinding]) -> String {
    if bindings.is_empty() {
        return template.to_string();
    }
    let by_alias: HashMap<&str, &ModelBinding> =
        bindings.iter().map(|b| (b.alias.as_str(), b)).collect();

    map_code(template, |code| {
        ALIAS_TOKEN
            .replace_all(code, |caps: &Captures<'_>| match by_alias.get(&caps[2]) {
                Some(binding) => format!(
                    "{}{}",
                    &caps[1],
                    table_reference(&binding.schema, &binding.table)
                ),
                None => caps[0].to_string(),
            })
            .into_owned()
    })
}

/// A `FROM`/`JOIN` reference recognised while importing a definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferredBinding {
    pub alias: String,
    pub schema: String,
    pub table: String,
}

/// Rewrite references to known tables into `:alias` tokens.
///
/// Only references written exactly as [`substitute`] would write them back
/// are rewritten, so that a generated template reproduces the definition
/// byte for byte. An alias bound to two different tables is left alone the
/// second time.
pub fn infer_bindings(
    definition: &str,
    is_known: impl Fn(&str, &str) -> bool,
) -> (String, Vec<InferredBinding>) {
    let mut found: Vec<InferredBinding> = Vec::new();

    let rewritten = map_code(definition, |code| {
        TABLE_REFERENCE
            .replace_all(code, |caps: &Captures<'_>| {
                let whole = caps[0].to_string();
                let alias = &caps[5];
                if NOT_AN_ALIAS.contains(&alias.to_ascii_lowercase().as_str()) {
                    return whole;
                }

                let reference = caps[3].replace('"', "");
                let (schema, table) = match reference.split_once('.') {
                    Some((schema, table)) => (schema.to_string(), table.to_string()),
                    None => ("public".to_string(), reference.clone()),
                };
                if !is_known(&schema, &table) || table_reference(&schema, &table) != caps[3] {
                    return whole;
                }

                match found.iter().find(|b| b.alias == alias) {
                    Some(b) if b.schema != schema || b.table != table => return whole,
                    Some(_) => {}
                    None => found.push(InferredBinding {
                        alias: alias.to_string(),
                        schema,
                        table,
                    }),
                }
                format!("{}{}:{}{}{}", &caps[1], &caps[2], alias, &caps[4], alias)
            })
            .into_owned()
    });

    (rewritten, found)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(alias: &str, schema: &str, table: &str) -> ModelBinding {
        ModelBinding {
            alias: alias.into(),
            model: String::new(),
            schema: schema.into(),
            table: table.into(),
        }
    }

    #[test]
    fn bindings_list() {
        assert_eq!(
            parse_bindings("s:Submissions, sc:Scouter").unwrap(),
            vec![
                ("s".to_string(), "Submissions".to_string()),
                ("sc".to_string(), "Scouter".to_string()),
            ]
        );
        assert!(parse_bindings("Submissions").is_err());
        assert!(parse_bindings("").unwrap().is_empty());
    }

    #[test]
    fn substitutes_bound_aliases_only() {
        let bindings = [binding("s", "public", "submissions"), binding("a", "audit", "events")];
        let sql = "select s.id::text from :s s join :a a on a.id = s.id where x = :other";
        assert_eq!(
            substitute(sql, &bindings),
            "select s.id::text from submissions s join audit.events a on a.id = s.id where x = :other"
        );
        assert_eq!(substitute(":s", &bindings), "submissions");
    }

    #[test]
    fn infers_known_tables() {
        let known = |schema: &str, table: &str| {
            matches!((schema, table), ("public", "submissions") | ("audit", "events"))
        };
        let sql = "select * from submissions s join audit.events as e on true join other o on true where false";
        let (template, found) = infer_bindings(sql, known);
        assert_eq!(
            template,
            "select * from :s s join :e as e on true join other o on true where false"
        );
        assert_eq!(
            found,
            vec![
                InferredBinding {
                    alias: "s".into(),
                    schema: "public".into(),
                    table: "submissions".into(),
                },
                InferredBinding {
                    alias: "e".into(),
                    schema: "audit".into(),
                    table: "events".into(),
                },
            ]
        );
        let bindings = [
            binding("s", "public", "submissions"),
            binding("e", "audit", "events"),
        ];
        assert_eq!(substitute(&template, &bindings), sql);
    }

    #[test]
    fn literals_are_left_alone() {
        let bindings = [binding("s", "public", "submissions")];
        assert_eq!(
            substitute("select ':s' from :s s where note = 'it''s :s'", &bindings),
            "select ':s' from submissions s where note = 'it''s :s'"
        );

        let known = |_: &str, table: &str| table == "submissions";
        let (template, found) =
            infer_bindings("select 'from submissions s' from submissions s", known);
        assert_eq!(template, "select 'from submissions s' from :s s");
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn keywords_are_not_aliases() {
        let (template, found) = infer_bindings("select 1 from submissions where true", |_, _| true);
        assert_eq!(template, "select 1 from submissions where true");
        assert!(found.is_empty());

        // written qualified, substitution would drop the schema
        let (template, found) = infer_bindings("from public.submissions s", |_, _| true);
        assert_eq!(template, "from public.submissions s");
        assert!(found.is_empty());
    }
}
