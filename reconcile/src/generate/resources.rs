//! One source file per remote resource

use supaform_core::parse;
use supaform_types::{Bucket, ColumnTag, Function, ParamTag, PgType, Role, Table};

use super::MARKER;
use super::policy_tags::RuleTags;
use super::relations::JoinField;
use super::render::{ItemAttr, bare, header, tag_attr, use_siblings};
use crate::grammar::sql_type_to_rust;
use crate::rpc::InferredBinding;

const PRELUDE: &str = "use supaform::prelude::*;";

fn imports(siblings: &[String]) -> Vec<String> {
    let mut out = vec![PRELUDE.to_string()];
    out.extend(use_siblings(siblings));
    out
}

fn rules(attr: ItemAttr, tags: &RuleTags) -> ItemAttr {
    attr.list("read", &tags.read)
        .maybe_sql("readUsing", tags.read_using.as_deref())
        .list("write", &tags.write)
        .maybe_sql("writeCheck", tags.write_check.as_deref())
        .maybe_sql("writeUsing", tags.write_using.as_deref())
}

/// `impl Name { pub fn read_using() -> Clause { ... } }` for reducible rules.
fn rule_builders(code: &mut String, struct_name: &str, tags: &RuleTags) {
    let builders = tags.builders();
    if builders.is_empty() {
        return;
    }
    code.push_str(&format!("\nimpl {struct_name} {{\n"));
    for (i, (name, clause)) in builders.iter().enumerate() {
        if i > 0 {
            code.push('\n');
        }
        code.push_str(&format!("    pub fn {name}() -> Clause {{\n"));
        code.push_str(&format!("        {}\n", parse(clause).node.to_builder_source()));
        code.push_str("    }\n");
    }
    code.push_str("}\n");
}

// =============================================================================
// Models
// =============================================================================

/// A model table with its columns, joins and rules.
pub struct ModelSource<'a> {
    pub struct_name: &'a str,
    pub table: &'a Table,
    pub joins: &'a [JoinField],
    pub rules: &'a RuleTags,
}

pub fn render_model(model: &ModelSource<'_>) -> String {
    let table = model.table;
    let mut siblings: Vec<String> = model
        .joins
        .iter()
        .map(|j| j.target.clone())
        .filter(|t| t != model.struct_name)
        .collect();
    siblings.sort();
    siblings.dedup();

    let mut code = header(MARKER, &imports(&siblings));
    if let Some(comment) = &table.comment {
        for line in comment.lines() {
            code.push_str(&format!("/// {line}\n"));
        }
    }
    code.push_str("#[derive(Debug, Clone, Serialize, Deserialize, Model)]\n");
    let attr = ItemAttr::new("model")
        .string("schema", &table.schema)
        .string("table", &table.name)
        .flag("rlsEnabled", table.rls_enabled)
        .flag("rlsForced", table.rls_forced);
    code.push_str(&rules(attr, model.rules).render());
    code.push('\n');
    code.push_str(&format!("pub struct {} {{\n", model.struct_name));

    let mut fields = super::relations::Taken::default();
    for column in &table.columns {
        let tag = ColumnTag {
            name: Some(column.name.clone()),
            data_type: Some(column.data_type.clone()),
            primary_key: column.primary_key,
            auto_increment: column.auto_increment,
            nullable: None,
            default: column.default.clone(),
            unique: column.unique,
        };
        let field = fields.claim(&column.name, "column");
        code.push_str(&format!("    #[serde(rename = {:?})]\n", column.name));
        code.push_str(&format!("    {}\n", tag_attr("column", &tag.to_string())));
        code.push_str(&format!(
            "    pub {field}: {},\n",
            sql_type_to_rust(&column.data_type, column.nullable && !column.primary_key)
        ));
    }
    for join in model.joins {
        code.push_str(&format!("    #[serde(default, rename = {:?})]\n", bare(&join.ident)));
        code.push_str(&format!("    {}\n", tag_attr("join", &join.tag.to_string())));
        code.push_str(&format!("    pub {}: {},\n", join.ident, join.rust_type));
    }
    code.push_str("}\n");

    rule_builders(&mut code, model.struct_name, model.rules);
    code
}

// =============================================================================
// Roles, Buckets, Types
// =============================================================================

fn unit_struct(code: &mut String, derive: &str, attr: &ItemAttr, struct_name: &str) {
    code.push_str(&format!("#[derive(Debug, Clone, Copy, Default, {derive})]\n"));
    code.push_str(&attr.render());
    code.push('\n');
    code.push_str(&format!("pub struct {struct_name};\n"));
}

pub fn render_role(struct_name: &str, role: &Role) -> String {
    let mut code = header(MARKER, &imports(&[]));
    let attr = ItemAttr::new("role")
        .string("name", &role.name)
        .int("connectionLimit", i64::from(role.connection_limit))
        .flag("inherit", role.inherit)
        .list("inherits", &role.inherits)
        .flag("canLogin", role.can_login)
        .flag("canCreateDb", role.can_create_db)
        .flag("canCreateRole", role.can_create_role)
        .flag("replication", role.replication)
        .flag("superuser", role.superuser)
        .flag("bypassRls", role.bypass_rls)
        .maybe_string("validUntil", role.valid_until.as_deref());
    unit_struct(&mut code, "Role", &attr, struct_name);
    code
}

pub fn render_bucket(struct_name: &str, bucket: &Bucket, tags: &RuleTags) -> String {
    let mut code = header(MARKER, &imports(&[]));
    let mut attr = ItemAttr::new("bucket")
        .string("name", &bucket.name)
        .flag("public", bucket.public)
        .list("allowedMimeTypes", &bucket.allowed_mime_types);
    if let Some(limit) = bucket.file_size_limit {
        attr = attr.int("fileSizeLimit", limit);
    }
    attr = attr.flag("avifAutodetection", bucket.avif_autodetection);
    unit_struct(&mut code, "Bucket", &rules(attr, tags), struct_name);
    rule_builders(&mut code, struct_name, tags);
    code
}

pub fn render_type(struct_name: &str, pg_type: &PgType) -> String {
    let mut code = header(MARKER, &imports(&[]));
    let attributes: Vec<String> = pg_type
        .attributes
        .iter()
        .map(|a| format!("{}:{}", a.name, a.data_type))
        .collect();
    let attr = ItemAttr::new("pg_type")
        .string("schema", &pg_type.schema)
        .string("name", &pg_type.name)
        .string("format", &pg_type.format)
        .list("enums", &pg_type.enums);
    let attr = if attributes.is_empty() {
        attr
    } else {
        attr.string("attributes", &attributes.join(", "))
    };
    let attr = attr.maybe_string("comment", pg_type.comment.as_deref());
    unit_struct(&mut code, "PgType", &attr, struct_name);
    code
}

// =============================================================================
// Functions
// =============================================================================

/// A function with its definition rewritten into a template.
pub struct RpcSource<'a> {
    pub struct_name: &'a str,
    pub function: &'a Function,
    pub template: &'a str,
    /// Inferred aliases with the struct names of their models
    pub bindings: &'a [(InferredBinding, String)],
}

pub fn render_function(rpc: &RpcSource<'_>) -> String {
    let function = rpc.function;
    let mut code = header(MARKER, &imports(&[]));
    code.push_str("#[derive(Debug, Clone, Default, Serialize, Deserialize, Rpc)]\n");

    let models: Vec<String> = rpc
        .bindings
        .iter()
        .map(|(binding, model)| format!("{}:{model}", binding.alias))
        .collect();
    let attr = ItemAttr::new("rpc")
        .string("name", &function.name)
        .string("schema", &function.schema)
        .string("security", &function.security.as_str().to_ascii_lowercase())
        .string("behavior", &function.behavior.as_str().to_ascii_lowercase())
        .string("language", &function.language.to_ascii_lowercase())
        .string("returns", &function.returns.to_string())
        .list("models", &models)
        .raw("definition", rpc.template)
        .wrapped();
    code.push_str(&attr.render());
    code.push('\n');

    if function.params.is_empty() {
        code.push_str(&format!("pub struct {};\n", rpc.struct_name));
        return code;
    }
    code.push_str(&format!("pub struct {} {{\n", rpc.struct_name));
    let mut taken = super::relations::Taken::default();
    for (i, param) in function.params.iter().enumerate() {
        let name = if param.name.is_empty() {
            format!("arg{}", i + 1)
        } else {
            param.name.clone()
        };
        let tag = ParamTag {
            name: Some(param.name.clone()).filter(|n| !n.is_empty()),
            data_type: Some(param.data_type.clone()),
            default: param.default.clone(),
        };
        code.push_str(&format!("    {}\n", tag_attr("param", &tag.to_string())));
        code.push_str(&format!(
            "    pub {}: {},\n",
            taken.claim(&name, "param"),
            sql_type_to_rust(&param.data_type, false)
        ));
    }
    code.push_str("}\n");
    code
}
