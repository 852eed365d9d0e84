//! Postgres type grammar and Supabase naming conventions
//!
//! Type spellings, default expressions and the platform objects the
//! reconciler must leave alone.

use std::sync::LazyLock;

use regex::Regex;
use supaform_types::{FunctionParam, ReturnType, split_top_level_commas};

// =============================================================================
// Naming Conventions
// =============================================================================

/// Generate default name for a primary key constraint
pub fn default_name_for_pk(table: &str) -> String {
    format!("{}_pkey", table)
}

/// Generate default name for a unique constraint on a single column
pub fn default_name_for_unique(table: &str, column: &str) -> String {
    format!("{}_{}_key", table, column)
}

/// Policy name for one of the four rules generated from a `read`/`write` tag.
pub fn policy_name(owner: &str, suffix: &str) -> String {
    format!("{}_{}", owner, suffix)
}

// =============================================================================
// Type Names
// =============================================================================

/// Canonical spelling of a Postgres type, as pg-meta reports it.
///
/// - `int4` -> `integer`, `varchar(40)` -> `character varying(40)`
/// - `timestamptz` -> `timestamp with time zone`
/// - `_text` and `text[]` -> `text[]`
pub fn normalize_type(sql_type: &str) -> String {
    let collapsed = collapse_whitespace(sql_type).to_ascii_lowercase();
    let ty = collapsed.trim();

    if let Some(inner) = ty.strip_suffix("[]") {
        return format!("{}[]", normalize_type(inner));
    }
    if let Some(inner) = ty.strip_prefix('_') {
        return format!("{}[]", normalize_type(inner));
    }

    let (base, params) = match ty.find('(') {
        Some(open) => (ty[..open].trim(), Some(ty[open..].replace(' ', ""))),
        None => (ty, None),
    };
    let base = match base {
        "int2" | "smallserial" | "serial2" => "smallint",
        "int" | "int4" | "serial" | "serial4" => "integer",
        "int8" | "bigserial" | "serial8" => "bigint",
        "float4" => "real",
        "float8" | "float" => "double precision",
        "bool" => "boolean",
        "varchar" => "character varying",
        "char" | "bpchar" => "character",
        "decimal" => "numeric",
        "timestamp" => "timestamp without time zone",
        "timestamptz" => "timestamp with time zone",
        "time" => "time without time zone",
        "timetz" => "time with time zone",
        "varbit" => "bit varying",
        other => other,
    };
    match params {
        Some(params) => format!("{base}{params}"),
        None => base.to_string(),
    }
}

/// Whether a declared type implies a sequence-backed column.
pub fn is_serial_type(sql_type: &str) -> bool {
    matches!(
        sql_type.trim().to_ascii_lowercase().as_str(),
        "serial" | "serial2" | "serial4" | "serial8" | "smallserial" | "bigserial"
    )
}

/// Whether a column of this type can be backed by an identity.
pub fn is_integer_type(sql_type: &str) -> bool {
    matches!(
        normalize_type(sql_type).as_str(),
        "smallint" | "integer" | "bigint"
    )
}

/// Return type with its type names canonicalized and spacing folded.
pub fn normalize_return_type(returns: &ReturnType) -> String {
    match returns {
        ReturnType::Scalar(ty) => normalize_type(ty),
        ReturnType::SetOf(ty) => format!("setof {}", normalize_type(ty)),
        ReturnType::Table(cols) => {
            let cols = cols
                .iter()
                .map(|c| {
                    format!(
                        "{} {}",
                        c.name.to_ascii_lowercase(),
                        normalize_type(&c.data_type)
                    )
                })
                .collect::<Vec<_>>();
            format!("table({})", cols.join(", "))
        }
    }
}

// =============================================================================
// Default Values
// =============================================================================

static TRAILING_CAST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"::"?[A-Za-z_][A-Za-z0-9_]*"?(?:\."?[A-Za-z_][A-Za-z0-9_]*"?)?(?: (?:varying|precision|with time zone|without time zone))?(?:\(\d+(?:,\s*\d+)?\))?(?:\[\])*\s*$"#,
    )
    .expect("trailing cast pattern is valid")
});

/// Remove trailing `::type` casts and collapse whitespace.
///
/// `'draft'::status` -> `'draft'`, `'{}'::text[]` -> `'{}'`,
/// `now()` is kept as is. A cast inside a string literal is not touched.
pub fn normalize_default(expr: &str) -> String {
    let mut text = collapse_whitespace(expr);
    loop {
        let Some(found) = TRAILING_CAST.find(&text) else {
            break;
        };
        let quotes = text[..found.start()].matches('\'').count();
        if quotes % 2 == 1 || found.start() == 0 {
            break;
        }
        text.truncate(found.start());
        text = text.trim_end().to_string();
    }
    strip_wrapping_parens(&text)
}

fn strip_wrapping_parens(text: &str) -> String {
    let mut s = text.trim();
    while s.starts_with('(') && s.ends_with(')') && balanced(&s[1..s.len() - 1]) {
        s = s[1..s.len() - 1].trim();
    }
    s.to_string()
}

fn balanced(s: &str) -> bool {
    let mut depth = 0i32;
    let mut quoted = false;
    for c in s.chars() {
        match c {
            '\'' => quoted = !quoted,
            '(' if !quoted => depth += 1,
            ')' if !quoted => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Check if a default is backed by a sequence
pub fn is_serial_expression(expr: &str) -> bool {
    expr.trim_start().to_ascii_lowercase().starts_with("nextval(")
}

/// Extract the sequence name from a `nextval('...'::regclass)` expression.
///
/// - `nextval('users_id_seq'::regclass)` → `users_id_seq`
/// - `nextval('"myschema"."users_id_seq"'::regclass)` → `users_id_seq`
pub fn extract_nextval_sequence(expr: &str) -> Option<String> {
    let inner = expr
        .trim()
        .strip_prefix("nextval('")?
        .strip_suffix("'::regclass)")?;
    let name_part = match inner.rfind('.') {
        Some(pos) => &inner[pos + 1..],
        None => inner,
    };
    let name = name_part.trim_matches('"');
    if name.is_empty() {
        return None;
    }
    Some(name.to_string())
}

pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

// =============================================================================
// Function Arguments
// =============================================================================

/// Parse `pg_get_function_arguments` output into typed parameters.
///
/// `candidate_id uuid DEFAULT NULL::uuid, limit_to integer` yields two
/// parameters; `OUT` arguments are not part of the signature and are skipped.
pub fn parse_function_arguments(args: &str) -> Vec<FunctionParam> {
    split_top_level_commas(args)
        .into_iter()
        .filter_map(|arg| {
            let arg = collapse_whitespace(arg);
            if arg.is_empty() {
                return None;
            }
            let (head, default) = split_default(&arg);
            let mut words: Vec<&str> = head.split(' ').collect();
            match words.first().map(|w| w.to_ascii_uppercase()) {
                Some(mode) if mode == "OUT" => return None,
                Some(mode) if mode == "IN" || mode == "INOUT" || mode == "VARIADIC" => {
                    words.remove(0);
                }
                _ => {}
            }
            let (name, data_type) = match words.as_slice() {
                [] => return None,
                [ty] => (String::new(), (*ty).to_string()),
                [name, rest @ ..] => (name.trim_matches('"').to_string(), rest.join(" ")),
            };
            Some(FunctionParam {
                name,
                data_type: normalize_type(&data_type),
                default: default.map(normalize_default),
            })
        })
        .collect()
}

fn split_default(arg: &str) -> (&str, Option<&str>) {
    let upper = arg.to_ascii_uppercase();
    if let Some(pos) = upper.find(" DEFAULT ") {
        return (&arg[..pos], Some(arg[pos + 9..].trim()));
    }
    if let Some(pos) = arg.find(" = ") {
        return (&arg[..pos], Some(arg[pos + 3..].trim()));
    }
    (arg, None)
}

// =============================================================================
// Rust Type Mapping
// =============================================================================

/// Strip `Option<...>`, returning the inner type and whether it was optional.
pub fn unwrap_option(rust_type: &str) -> (&str, bool) {
    let ty = rust_type.trim();
    match generic_arg(ty, "Option") {
        Some(inner) => (inner, true),
        None => (ty, false),
    }
}

/// `Vec<Inner>` -> `Some("Inner")` for the given wrapper name, also when
/// path-qualified (`std::vec::Vec<...>`).
pub fn generic_arg<'a>(rust_type: &'a str, wrapper: &str) -> Option<&'a str> {
    let ty = rust_type.trim();
    let open = ty.find('<')?;
    let head = ty[..open].trim();
    let last = head.rsplit("::").next().unwrap_or(head);
    if last != wrapper || !ty.ends_with('>') {
        return None;
    }
    Some(ty[open + 1..ty.len() - 1].trim())
}

/// Innermost named type after removing `Option`, `Box` and `Vec` wrappers,
/// without its path.
pub fn target_struct(rust_type: &str) -> &str {
    let mut ty = rust_type.trim();
    loop {
        match ["Option", "Box", "Vec"]
            .iter()
            .find_map(|w| generic_arg(ty, w))
        {
            Some(inner) => ty = inner,
            None => break,
        }
    }
    ty.rsplit("::").next().unwrap_or(ty)
}

/// SQL type for a Rust field type, when it maps to a builtin.
pub fn rust_type_to_sql(rust_type: &str) -> Option<String> {
    let (ty, _) = unwrap_option(rust_type);
    if let Some(inner) = generic_arg(ty, "Vec") {
        if inner == "u8" {
            return Some("bytea".into());
        }
        return rust_type_to_sql(inner).map(|t| format!("{t}[]"));
    }
    let head = ty.split('<').next().unwrap_or(ty);
    let last = head.rsplit("::").next().unwrap_or(head);
    let sql = match last {
        "i16" => "smallint",
        "i32" => "integer",
        "i64" => "bigint",
        "f32" => "real",
        "f64" => "double precision",
        "bool" => "boolean",
        "String" | "str" | "&str" => "text",
        "Uuid" => "uuid",
        "Value" => "jsonb",
        "NaiveDate" => "date",
        "NaiveTime" => "time without time zone",
        "NaiveDateTime" => "timestamp without time zone",
        "DateTime" => "timestamp with time zone",
        _ => return None,
    };
    Some(sql.to_string())
}

/// Rust field type for a column, as written by the generator.
pub fn sql_type_to_rust(sql_type: &str, nullable: bool) -> String {
    let ty = normalize_type(sql_type);
    let base = match ty.strip_suffix("[]") {
        Some(inner) => format!("Vec<{}>", sql_type_to_rust(inner, false)),
        None => scalar_rust_type(&ty).to_string(),
    };
    if nullable {
        format!("Option<{base}>")
    } else {
        base
    }
}

fn scalar_rust_type(ty: &str) -> &'static str {
    let base = ty.split('(').next().unwrap_or(ty).trim();
    match base {
        "smallint" => "i16",
        "integer" => "i32",
        "bigint" => "i64",
        "real" => "f32",
        "double precision" => "f64",
        "boolean" => "bool",
        "uuid" => "Uuid",
        "json" | "jsonb" => "Value",
        "date" => "NaiveDate",
        "time without time zone" => "NaiveTime",
        "timestamp without time zone" => "NaiveDateTime",
        "timestamp with time zone" => "DateTime<Utc>",
        "bytea" => "Vec<u8>",
        _ => "String",
    }
}

// =============================================================================
// Platform Objects
// =============================================================================

/// Roles created and owned by the Supabase platform.
pub const PLATFORM_ROLES: &[&str] = &[
    "postgres",
    "anon",
    "authenticated",
    "service_role",
    "authenticator",
    "dashboard_user",
    "pgbouncer",
    "pgsodium_keyholder",
    "pgsodium_keyiduser",
    "pgsodium_keymaker",
];

/// Schemas whose objects are managed by the platform.
pub const PROTECTED_SCHEMAS: &[&str] = &["auth", "storage"];

/// System namespace names that should be skipped
pub const SYSTEM_NAMESPACE_NAMES: &[&str] = &["pg_toast", "pg_catalog", "information_schema"];

/// Check if a role belongs to the platform
pub fn is_platform_role(name: &str) -> bool {
    PLATFORM_ROLES.contains(&name) || name.starts_with("pg_") || name.starts_with("supabase")
}

pub fn is_protected_schema(name: &str) -> bool {
    PROTECTED_SCHEMAS.contains(&name)
}

/// Check if a namespace is a system namespace
pub fn is_system_namespace(name: &str) -> bool {
    name.starts_with("pg_toast")
        || name.starts_with("pg_temp_")
        || SYSTEM_NAMESPACE_NAMES.contains(&name)
}
