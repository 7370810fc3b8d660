use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    Data, DeriveInput, Fields, FieldsNamed, Ident, LitStr, Type, parse_macro_input,
    spanned::Spanned,
};

/// Implements `FromRow`, `Record`, `Param` and `Output` for a struct mapped
/// to table columns.
///
/// Field options: `#[sqlbind(column = "...")]`, `#[sqlbind(id)]` (identity
/// field written back after inserts; defaults to a field named `id` or
/// `ID`), `#[sqlbind(skip)]`.
#[proc_macro_derive(Record, attributes(sqlbind))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_record(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Implements `Mapper` for a struct holding a `db` handle and `Op` fields.
///
/// Struct options: `#[sqlbind(package = "...", type_name = "...")]`, which
/// default to the module path and the struct name. Field options:
/// `#[sqlbind(name = "...")]` names the statement of an `Op` field (default:
/// the field name in PascalCase), `#[sqlbind(skip)]` leaves a field alone.
#[proc_macro_derive(Mapper, attributes(sqlbind))]
pub fn derive_mapper(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_mapper(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

// ============================================================================
// Record
// ============================================================================

#[derive(Default)]
struct RecordFieldOptions {
    column: Option<String>,
    id: bool,
    skip: bool,
}

fn expand_record(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = input.ident.clone();
    let fields = named_fields(&input, "Record")?;

    let mut field_idents = Vec::<Ident>::new();
    let mut field_names = Vec::<String>::new();
    let mut columns = Vec::<String>::new();
    let mut skipped = Vec::<Ident>::new();
    let mut explicit_id: Option<Ident> = None;

    for field in &fields.named {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| syn::Error::new(field.span(), "Record requires named fields"))?;
        let options = parse_record_field_options(&field.attrs)?;

        if options.skip {
            if options.id || options.column.is_some() {
                return Err(syn::Error::new(
                    field.span(),
                    "#[sqlbind(skip)] cannot be combined with id or column",
                ));
            }
            skipped.push(ident);
            continue;
        }

        if options.id {
            if explicit_id.is_some() {
                return Err(syn::Error::new(
                    field.span(),
                    "only one field can be marked #[sqlbind(id)]",
                ));
            }
            explicit_id = Some(ident.clone());
        }

        let name = unraw(&ident);
        columns.push(options.column.unwrap_or_else(|| name.clone()));
        field_names.push(name);
        field_idents.push(ident);
    }

    let identity = explicit_id.or_else(|| {
        ["id", "ID"].iter().find_map(|wanted| {
            field_idents
                .iter()
                .find(|ident| unraw(ident) == *wanted)
                .cloned()
        })
    });

    let assign_identity = match identity {
        Some(ident) => quote! {
            fn assign_identity(&mut self, id: i64) -> bool {
                match ::sqlbind::FromValue::from_value(&::sqlbind::Value::Integer(id)) {
                    Ok(value) => {
                        self.#ident = value;
                        true
                    }
                    Err(_) => false,
                }
            }
        },
        None => quote! {},
    };

    Ok(quote! {
        impl ::sqlbind::FromRow for #struct_name {
            fn from_row(row: &::sqlbind::RowRef<'_>) -> ::sqlbind::Result<Self> {
                Ok(Self {
                    #( #field_idents: row.get_as(#columns)?, )*
                    #( #skipped: ::core::default::Default::default(), )*
                })
            }
        }

        impl ::sqlbind::Record for #struct_name {
            fn columns() -> Vec<&'static str> {
                vec![#( #columns ),*]
            }

            fn to_value(&self) -> ::sqlbind::Value {
                let mut fields = ::std::collections::BTreeMap::new();
                #( fields.insert(#field_names.to_string(), ::sqlbind::Param::to_value(&self.#field_idents)); )*
                ::sqlbind::Value::Record(fields)
            }

            #assign_identity
        }

        impl ::sqlbind::Param for #struct_name {
            fn to_value(&self) -> ::sqlbind::Value {
                <Self as ::sqlbind::Record>::to_value(self)
            }

            fn assign_identity(&mut self, id: i64) -> bool {
                <Self as ::sqlbind::Record>::assign_identity(self, id)
            }
        }

        impl ::sqlbind::Output for #struct_name {
            fn shape() -> ::sqlbind::result::ReturnShape {
                ::sqlbind::result::ReturnShape::Value
            }

            fn columns() -> Vec<&'static str> {
                <Self as ::sqlbind::Record>::columns()
            }

            fn decode(result: ::sqlbind::QueryResult) -> ::sqlbind::Result<Self> {
                ::sqlbind::result::decode_one(&result)
            }
        }
    })
}

fn parse_record_field_options(attrs: &[syn::Attribute]) -> syn::Result<RecordFieldOptions> {
    let mut options = RecordFieldOptions::default();

    for attr in attrs {
        if !attr.path().is_ident("sqlbind") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("column") {
                let value = meta.value()?;
                let lit: LitStr = value.parse()?;
                options.column = Some(lit.value());
                return Ok(());
            }

            if meta.path.is_ident("id") {
                options.id = true;
                return Ok(());
            }

            if meta.path.is_ident("skip") {
                options.skip = true;
                return Ok(());
            }

            Err(meta.error(
                "Unsupported #[sqlbind(...)] option. Supported: column = \"...\", id, skip",
            ))
        })?;
    }

    Ok(options)
}

// ============================================================================
// Mapper
// ============================================================================

#[derive(Default)]
struct MapperOptions {
    package: Option<String>,
    type_name: Option<String>,
}

#[derive(Default)]
struct MapperFieldOptions {
    name: Option<String>,
    skip: bool,
}

enum DbField {
    Missing,
    Handle(Ident),
    Optional(Ident),
}

fn expand_mapper(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = input.ident.clone();
    let options = parse_mapper_options(&input.attrs)?;
    let fields = named_fields(&input, "Mapper")?;

    let mut db = DbField::Missing;
    let mut cache_arm = quote! { ::sqlbind::CacheField::Absent };
    let mut cache_init: Option<TokenStream2> = None;
    let mut op_idents = Vec::<Ident>::new();
    let mut op_names = Vec::<String>::new();
    let mut defaulted = Vec::<Ident>::new();

    for field in &fields.named {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| syn::Error::new(field.span(), "Mapper requires named fields"))?;
        let field_options = parse_mapper_field_options(&field.attrs)?;
        let name = unraw(&ident);

        if field_options.skip {
            defaulted.push(ident);
            continue;
        }

        if name == "db" {
            db = match generic_argument(&field.ty, "Option") {
                Some(_) => DbField::Optional(ident),
                None => DbField::Handle(ident),
            };
            continue;
        }

        if name == "cache" {
            if is_boxed_self(&field.ty, &struct_name) {
                cache_arm = quote! { ::sqlbind::CacheField::Slot(&mut self.#ident) };
                cache_init = Some(quote! { #ident: None, });
            } else {
                let ty = &field.ty;
                let written = quote!(#ty).to_string();
                cache_arm = quote! { ::sqlbind::CacheField::Mistyped(#written) };
                defaulted.push(ident);
            }
            continue;
        }

        if type_ends_with(&field.ty, "Op") {
            op_names.push(field_options.name.unwrap_or_else(|| to_pascal_case(&name)));
            op_idents.push(ident);
            continue;
        }

        if field_options.name.is_some() {
            return Err(syn::Error::new(
                field.span(),
                "#[sqlbind(name = ...)] is only valid on Op fields",
            ));
        }
        defaulted.push(ident);
    }

    let (handle_body, db_init) = match &db {
        DbField::Missing => (quote! { None }, quote! { let _ = db; }),
        DbField::Handle(ident) => (
            quote! { Some(::std::sync::Arc::clone(&self.#ident)) },
            quote! {},
        ),
        DbField::Optional(ident) => (quote! { self.#ident.clone() }, quote! {}),
    };
    let db_field_init = match &db {
        DbField::Missing => quote! {},
        DbField::Handle(ident) => quote! { #ident: db, },
        DbField::Optional(ident) => quote! { #ident: Some(db), },
    };

    let package = match options.package {
        Some(package) => quote! { #package },
        None => quote! { module_path!() },
    };
    let type_name = options
        .type_name
        .unwrap_or_else(|| struct_name.to_string());

    Ok(quote! {
        impl ::sqlbind::binder::Mapper for #struct_name {
            fn package() -> &'static str {
                #package
            }

            fn type_name() -> &'static str {
                #type_name
            }

            fn handle(&self) -> Option<::sqlbind::Db> {
                #handle_body
            }

            fn with_handle(db: ::sqlbind::Db) -> Self {
                #db_init
                Self {
                    #db_field_init
                    #( #op_idents: ::sqlbind::Op::default(), )*
                    #cache_init
                    #( #defaulted: ::core::default::Default::default(), )*
                }
            }

            fn visit_operations(
                &mut self,
                visitor: &mut ::sqlbind::OperationVisitor<'_>,
            ) -> ::sqlbind::Result<()> {
                #( visitor.visit(#op_names, &mut self.#op_idents)?; )*
                Ok(())
            }

            fn cache_field(&mut self) -> ::sqlbind::CacheField<'_, Self> {
                #cache_arm
            }
        }
    })
}

fn parse_mapper_options(attrs: &[syn::Attribute]) -> syn::Result<MapperOptions> {
    let mut options = MapperOptions::default();

    for attr in attrs {
        if !attr.path().is_ident("sqlbind") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("package") {
                let value = meta.value()?;
                let lit: LitStr = value.parse()?;
                options.package = Some(lit.value());
                return Ok(());
            }

            if meta.path.is_ident("type_name") {
                let value = meta.value()?;
                let lit: LitStr = value.parse()?;
                options.type_name = Some(lit.value());
                return Ok(());
            }

            Err(meta.error(
                "Unsupported #[sqlbind(...)] option. Supported: package = \"...\", type_name = \"...\"",
            ))
        })?;
    }

    Ok(options)
}

fn parse_mapper_field_options(attrs: &[syn::Attribute]) -> syn::Result<MapperFieldOptions> {
    let mut options = MapperFieldOptions::default();

    for attr in attrs {
        if !attr.path().is_ident("sqlbind") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let value = meta.value()?;
                let lit: LitStr = value.parse()?;
                options.name = Some(lit.value());
                return Ok(());
            }

            if meta.path.is_ident("skip") {
                options.skip = true;
                return Ok(());
            }

            Err(meta.error("Unsupported #[sqlbind(...)] option. Supported: name = \"...\", skip"))
        })?;
    }

    Ok(options)
}

// ============================================================================
// Helpers
// ============================================================================

fn named_fields<'a>(input: &'a DeriveInput, derive: &str) -> syn::Result<&'a FieldsNamed> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            format!("{derive} does not support generic structs"),
        ));
    }

    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new(
            input.ident.span(),
            format!("{derive} can only be derived for structs"),
        ));
    };

    match &data.fields {
        Fields::Named(fields) => Ok(fields),
        _ => Err(syn::Error::new(
            input.ident.span(),
            format!("{derive} requires named fields"),
        )),
    }
}

fn unraw(ident: &Ident) -> String {
    ident.to_string().trim_start_matches("r#").to_string()
}

fn type_ends_with(ty: &Type, ident: &str) -> bool {
    let Type::Path(type_path) = ty else {
        return false;
    };
    type_path
        .path
        .segments
        .last()
        .map(|segment| segment.ident == ident)
        .unwrap_or(false)
}

/// `T` of `Wrapper<T>`, matched on the last path segment.
fn generic_argument<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let syn::PathArguments::AngleBracketed(arguments) = &segment.arguments else {
        return None;
    };
    arguments.args.iter().find_map(|arg| match arg {
        syn::GenericArgument::Type(inner) => Some(inner),
        _ => None,
    })
}

/// `Option<Box<Self>>` or `Option<Box<StructName>>`
fn is_boxed_self(ty: &Type, struct_name: &Ident) -> bool {
    generic_argument(ty, "Option")
        .and_then(|inner| generic_argument(inner, "Box"))
        .is_some_and(|inner| type_ends_with(inner, "Self") || type_ends_with(inner, &struct_name.to_string()))
}

fn to_pascal_case(value: &str) -> String {
    let mut out = String::new();
    for chunk in value.split('_').filter(|part| !part.is_empty()) {
        let mut chars = chunk.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    if out.is_empty() {
        value.to_string()
    } else {
        out
    }
}
