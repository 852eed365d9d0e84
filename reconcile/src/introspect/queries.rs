//! SQL sent through pg-meta's `/query` for what its REST endpoints lack.
//!
//! Each query returns one JSON object per row, matching the `PgMeta*` row
//! structs in [`wire`](super::wire).

use supaform_core::quote_literal;

/// Role membership edges, excluding platform-internal grants.
pub const ROLE_MEMBERSHIPS: &str = r#"
    SELECT parent.rolname AS role, child.rolname AS member
    FROM pg_auth_members m
    JOIN pg_roles parent ON parent.oid = m.roleid
    JOIN pg_roles child ON child.oid = m.member
    WHERE child.rolname NOT LIKE 'pg\_%'
    ORDER BY child.rolname, parent.rolname
"#;

/// Enum and composite types with their labels and attribute type names.
/// `{schemas}` is replaced by a quoted, comma-separated schema list.
pub const TYPES: &str = r#"
    SELECT
        n.nspname AS schema,
        t.typname AS name,
        format_type(t.oid, NULL) AS format,
        COALESCE(
            (SELECT array_agg(e.enumlabel ORDER BY e.enumsortorder)
             FROM pg_enum e WHERE e.enumtypid = t.oid),
            '{}'::name[]
        ) AS enums,
        COALESCE(
            (SELECT json_agg(json_build_object(
                        'name', a.attname,
                        'type_name', format_type(a.atttypid, a.atttypmod))
                    ORDER BY a.attnum)
             FROM pg_attribute a
             WHERE a.attrelid = t.typrelid AND a.attnum > 0 AND NOT a.attisdropped),
            '[]'::json
        ) AS attributes,
        obj_description(t.oid, 'pg_type') AS comment
    FROM pg_type t
    JOIN pg_namespace n ON n.oid = t.typnamespace
    LEFT JOIN pg_class c ON c.oid = t.typrelid
    WHERE n.nspname IN ({schemas})
      AND (t.typtype = 'e' OR (t.typtype = 'c' AND c.relkind = 'c'))
    ORDER BY n.nspname, t.typname
"#;

/// Rows of `storage.buckets`.
pub const BUCKETS: &str = r#"
    SELECT id, name, public, allowed_mime_types, file_size_limit, avif_autodetection
    FROM storage.buckets
    ORDER BY created_at, id
"#;

/// [`TYPES`] restricted to the given schemas.
pub fn types_in(schemas: &[String]) -> String {
    let list = schemas
        .iter()
        .map(|s| quote_literal(s))
        .collect::<Vec<_>>()
        .join(", ");
    TYPES.replace("{schemas}", &list)
}
