//! Attribute parsing.
//!
//! Item attributes are `key = literal` lists fed through the `set` methods of
//! the declaration records, so a misspelled key or a mistyped value is a
//! compile error pointing at the attribute. Field tags are validated with the
//! same tag parsers the reconciler uses.

use supaform_types::{AttrValue, DeclError, Declaration};
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{Attribute, Expr, ExprLit, ExprUnary, Lit, LitStr, Meta, Result, Token, UnOp};

/// Apply every `#[<name>(key = value, ...)]` attribute to `decl`.
pub fn apply_item_attrs(attrs: &[Attribute], decl: &mut Declaration) -> Result<()> {
    let name = decl.attribute();
    for attr in attrs.iter().filter(|a| a.path().is_ident(name)) {
        let metas = attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?;
        for meta in metas {
            let Meta::NameValue(nv) = &meta else {
                return Err(syn::Error::new(
                    meta.span(),
                    format!("expected `key = value` inside #[{name}(...)]"),
                ));
            };
            let Some(key) = nv.path.get_ident() else {
                return Err(syn::Error::new(nv.path.span(), "expected a plain key"));
            };
            let value = literal(&nv.value)?;
            decl.set(&key.to_string(), value)
                .map_err(|e: DeclError| syn::Error::new(nv.span(), e.to_string()))?;
        }
    }
    Ok(())
}

fn literal(expr: &Expr) -> Result<AttrValue> {
    match expr {
        Expr::Lit(ExprLit { lit, .. }) => match lit {
            Lit::Str(s) => Ok(AttrValue::Str(s.value())),
            Lit::Bool(b) => Ok(AttrValue::Bool(b.value)),
            Lit::Int(i) => Ok(AttrValue::Int(i.base10_parse()?)),
            other => Err(syn::Error::new(
                other.span(),
                "expected a string, boolean or integer literal",
            )),
        },
        Expr::Unary(ExprUnary {
            op: UnOp::Neg(_),
            expr,
            ..
        }) => match literal(expr)? {
            AttrValue::Int(i) => Ok(AttrValue::Int(-i)),
            _ => Err(syn::Error::new(expr.span(), "only integers can be negated")),
        },
        other => Err(syn::Error::new(
            other.span(),
            "expected a string, boolean or integer literal",
        )),
    }
}

/// The string of a `#[name("...")]` attribute, if present.
pub fn tag(attrs: &[Attribute], name: &str) -> Result<Option<LitStr>> {
    attrs
        .iter()
        .find(|a| a.path().is_ident(name))
        .map(|a| a.parse_args::<LitStr>())
        .transpose()
}

/// `rename` of `#[serde(rename = "...")]`, ignoring other serde keys.
pub fn serde_rename(attrs: &[Attribute]) -> Result<Option<String>> {
    let mut rename = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let value: LitStr = meta.value()?.parse()?;
                rename = Some(value.value());
            } else if meta.input.peek(Token![=]) {
                let _: Expr = meta.value()?.parse()?;
            } else if meta.input.peek(syn::token::Paren) {
                let content;
                syn::parenthesized!(content in meta.input);
                content.parse::<proc_macro2::TokenStream>()?;
            }
            Ok(())
        })?;
    }
    Ok(rename)
}
