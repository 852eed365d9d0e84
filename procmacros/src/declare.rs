//! `Declared` impl generation.
//!
//! The derive builds the declaration record at compile time, then emits the
//! tokens constructing the same record at runtime.

use proc_macro2::TokenStream;
use quote::{ToTokens, quote};
use supaform_types::{
    BucketDecl, ColumnTag, Declaration, FieldDecl, JoinTag, ModelDecl, ParamDecl, ParamTag,
    RoleDecl, RpcDecl, TypeDecl,
};
use syn::{Data, DeriveInput, Fields, Result};

use crate::attrs;
use crate::paths;

pub fn derive(input: DeriveInput, derive_name: &str) -> Result<TokenStream> {
    let struct_name = input.ident.to_string();
    let Some(mut decl) = Declaration::for_derive(derive_name, &struct_name) else {
        return Err(syn::Error::new_spanned(&input.ident, "unsupported derive"));
    };
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            format!("{derive_name} can only be derived for structs"),
        ));
    };

    attrs::apply_item_attrs(&input.attrs, &mut decl)?;
    match &mut decl {
        Declaration::Model(model) => model.fields = model_fields(&data.fields)?,
        Declaration::Rpc(rpc) => rpc.params = rpc_params(&data.fields)?,
        _ => {}
    }

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let types = paths::types();
    let body = declaration_tokens(&decl);

    Ok(quote! {
        impl #impl_generics #types::Declared for #ident #ty_generics #where_clause {
            fn declaration() -> #types::Declaration {
                #body
            }
        }
    })
}

fn type_text(ty: &syn::Type) -> String {
    ty.to_token_stream()
        .to_string()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

fn named(fields: &Fields) -> impl Iterator<Item = &syn::Field> {
    fields.iter().filter(|f| f.ident.is_some())
}

fn model_fields(fields: &Fields) -> Result<Vec<FieldDecl>> {
    let mut out = Vec::new();
    for field in named(fields) {
        let column = attrs::tag(&field.attrs, "column")?;
        let join = attrs::tag(&field.attrs, "join")?;
        if let Some(tag) = &column {
            ColumnTag::parse(&tag.value()).map_err(|e| syn::Error::new(tag.span(), e))?;
        }
        if let Some(tag) = &join {
            JoinTag::parse(&tag.value()).map_err(|e| syn::Error::new(tag.span(), e))?;
        }
        out.push(FieldDecl {
            ident: field.ident.as_ref().map(|i| i.to_string()).unwrap_or_default(),
            rust_type: type_text(&field.ty),
            serde_rename: attrs::serde_rename(&field.attrs)?,
            column: column.map(|t| t.value()),
            join: join.map(|t| t.value()),
        });
    }
    Ok(out)
}

fn rpc_params(fields: &Fields) -> Result<Vec<ParamDecl>> {
    let mut out = Vec::new();
    for field in named(fields) {
        let param = attrs::tag(&field.attrs, "param")?;
        if let Some(tag) = &param {
            ParamTag::parse(&tag.value()).map_err(|e| syn::Error::new(tag.span(), e))?;
        }
        out.push(ParamDecl {
            ident: field.ident.as_ref().map(|i| i.to_string()).unwrap_or_default(),
            rust_type: type_text(&field.ty),
            param: param.map(|t| t.value()),
        });
    }
    Ok(out)
}

// =============================================================================
// Record literals
// =============================================================================

fn text(value: &str) -> TokenStream {
    let string = paths::string();
    quote!(#string::from(#value))
}

fn opt_text(value: &Option<String>) -> TokenStream {
    match value {
        Some(v) => {
            let v = text(v);
            quote!(::std::option::Option::Some(#v))
        }
        None => quote!(::std::option::Option::None),
    }
}

fn opt<T: ToTokens>(value: &Option<T>) -> TokenStream {
    match value {
        Some(v) => quote!(::std::option::Option::Some(#v)),
        None => quote!(::std::option::Option::None),
    }
}

fn declaration_tokens(decl: &Declaration) -> TokenStream {
    let types = paths::types();
    match decl {
        Declaration::Model(d) => {
            let record = model_tokens(d);
            quote!(#types::Declaration::Model(#record))
        }
        Declaration::Rpc(d) => {
            let record = rpc_tokens(d);
            quote!(#types::Declaration::Rpc(#record))
        }
        Declaration::Role(d) => {
            let record = role_tokens(d);
            quote!(#types::Declaration::Role(#record))
        }
        Declaration::Bucket(d) => {
            let record = bucket_tokens(d);
            quote!(#types::Declaration::Bucket(#record))
        }
        Declaration::Type(d) => {
            let record = type_tokens(d);
            quote!(#types::Declaration::Type(#record))
        }
    }
}

fn model_tokens(d: &ModelDecl) -> TokenStream {
    let types = paths::types();
    let vec = paths::vec();
    let struct_name = text(&d.struct_name);
    let schema = opt_text(&d.schema);
    let table = opt_text(&d.table);
    let read = opt_text(&d.read);
    let write = opt_text(&d.write);
    let read_using = opt_text(&d.read_using);
    let write_check = opt_text(&d.write_check);
    let write_using = opt_text(&d.write_using);
    let rls_enabled = opt(&d.rls_enabled);
    let rls_forced = opt(&d.rls_forced);
    let fields = d.fields.iter().map(|f| {
        let ident = text(&f.ident);
        let rust_type = text(&f.rust_type);
        let serde_rename = opt_text(&f.serde_rename);
        let column = opt_text(&f.column);
        let join = opt_text(&f.join);
        quote! {
            #types::FieldDecl {
                ident: #ident,
                rust_type: #rust_type,
                serde_rename: #serde_rename,
                column: #column,
                join: #join,
            }
        }
    });
    quote! {
        #types::ModelDecl {
            struct_name: #struct_name,
            schema: #schema,
            table: #table,
            read: #read,
            write: #write,
            read_using: #read_using,
            write_check: #write_check,
            write_using: #write_using,
            rls_enabled: #rls_enabled,
            rls_forced: #rls_forced,
            fields: #vec::from([#(#fields),*]),
        }
    }
}

fn rpc_tokens(d: &RpcDecl) -> TokenStream {
    let types = paths::types();
    let vec = paths::vec();
    let struct_name = text(&d.struct_name);
    let name = opt_text(&d.name);
    let schema = opt_text(&d.schema);
    let security = opt_text(&d.security);
    let behavior = opt_text(&d.behavior);
    let language = opt_text(&d.language);
    let returns = opt_text(&d.returns);
    let models = opt_text(&d.models);
    let definition = opt_text(&d.definition);
    let params = d.params.iter().map(|p| {
        let ident = text(&p.ident);
        let rust_type = text(&p.rust_type);
        let param = opt_text(&p.param);
        quote! {
            #types::ParamDecl {
                ident: #ident,
                rust_type: #rust_type,
                param: #param,
            }
        }
    });
    quote! {
        #types::RpcDecl {
            struct_name: #struct_name,
            name: #name,
            schema: #schema,
            security: #security,
            behavior: #behavior,
            language: #language,
            returns: #returns,
            models: #models,
            definition: #definition,
            params: #vec::from([#(#params),*]),
        }
    }
}

fn role_tokens(d: &RoleDecl) -> TokenStream {
    let types = paths::types();
    let struct_name = text(&d.struct_name);
    let name = opt_text(&d.name);
    let connection_limit = opt(&d.connection_limit);
    let inherit = opt(&d.inherit);
    let inherits = opt_text(&d.inherits);
    let can_login = opt(&d.can_login);
    let can_create_db = opt(&d.can_create_db);
    let can_create_role = opt(&d.can_create_role);
    let replication = opt(&d.replication);
    let superuser = opt(&d.superuser);
    let bypass_rls = opt(&d.bypass_rls);
    let valid_until = opt_text(&d.valid_until);
    quote! {
        #types::RoleDecl {
            struct_name: #struct_name,
            name: #name,
            connection_limit: #connection_limit,
            inherit: #inherit,
            inherits: #inherits,
            can_login: #can_login,
            can_create_db: #can_create_db,
            can_create_role: #can_create_role,
            replication: #replication,
            superuser: #superuser,
            bypass_rls: #bypass_rls,
            valid_until: #valid_until,
        }
    }
}

fn bucket_tokens(d: &BucketDecl) -> TokenStream {
    let types = paths::types();
    let struct_name = text(&d.struct_name);
    let name = opt_text(&d.name);
    let public = opt(&d.public);
    let allowed_mime_types = opt_text(&d.allowed_mime_types);
    let file_size_limit = opt(&d.file_size_limit);
    let avif_autodetection = opt(&d.avif_autodetection);
    let read = opt_text(&d.read);
    let write = opt_text(&d.write);
    let read_using = opt_text(&d.read_using);
    let write_check = opt_text(&d.write_check);
    let write_using = opt_text(&d.write_using);
    quote! {
        #types::BucketDecl {
            struct_name: #struct_name,
            name: #name,
            public: #public,
            allowed_mime_types: #allowed_mime_types,
            file_size_limit: #file_size_limit,
            avif_autodetection: #avif_autodetection,
            read: #read,
            write: #write,
            read_using: #read_using,
            write_check: #write_check,
            write_using: #write_using,
        }
    }
}

fn type_tokens(d: &TypeDecl) -> TokenStream {
    let types = paths::types();
    let struct_name = text(&d.struct_name);
    let schema = opt_text(&d.schema);
    let name = opt_text(&d.name);
    let format = opt_text(&d.format);
    let enums = opt_text(&d.enums);
    let attributes = opt_text(&d.attributes);
    let comment = opt_text(&d.comment);
    quote! {
        #types::TypeDecl {
            struct_name: #struct_name,
            schema: #schema,
            name: #name,
            format: #format,
            enums: #enums,
            attributes: #attributes,
            comment: #comment,
        }
    }
}
