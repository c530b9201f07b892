use convert_case::Case;
use syn::parse::{Parse, ParseStream};
use syn::{Attribute, Error, ExprPath, LitStr};

pub struct ObjectAttributes {
    pub constructor: Option<ExprPath>,
    pub rename_all: Option<Case>,
}

fn parse_case(value: &LitStr) -> Result<Case, Error> {
    match value.value().as_str() {
        "PascalCase" => Ok(Case::Pascal),
        "camelCase" => Ok(Case::Camel),
        "snake_case" => Ok(Case::Snake),
        "kebab-case" => Ok(Case::Kebab),
        "SCREAMING_SNAKE_CASE" => Ok(Case::ScreamingSnake),
        other => Err(Error::new(
            value.span(),
            format!("Unsupported case: {other}"),
        )),
    }
}

impl TryFrom<&Attribute> for ObjectAttributes {
    type Error = Error;

    fn try_from(value: &Attribute) -> Result<Self, Self::Error> {
        let mut constructor = None;
        let mut rename_all = None;
        value.parse_nested_meta(|meta| {
            if meta.path.is_ident("constructor") {
                let path: LitStr = meta.value()?.parse()?;
                constructor = Some(path.parse()?);
            } else if meta.path.is_ident("rename_all") {
                let case: LitStr = meta.value()?.parse()?;
                rename_all = Some(parse_case(&case)?);
            } else {
                return Err(meta.error("unsupported object attribute"));
            }

            Ok(())
        })?;

        Ok(Self {
            constructor,
            rename_all,
        })
    }
}

#[derive(Default)]
pub struct FieldAttributes {
    pub name: Option<LitStr>,
    pub ignore: bool,
}

impl TryFrom<&Attribute> for FieldAttributes {
    type Error = Error;

    fn try_from(value: &Attribute) -> Result<Self, Self::Error> {
        let mut name = None;
        let mut ignore = false;
        value.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                name = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("ignore") {
                ignore = true;
            } else {
                return Err(meta.error("unsupported property attribute"));
            }

            Ok(())
        })?;

        Ok(Self { name, ignore })
    }
}

pub struct ObjectAliasAttributes;

impl Parse for ObjectAliasAttributes {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        if input.is_empty() {
            Ok(Self)
        } else {
            Err(input.error("object_alias does not take arguments"))
        }
    }
}
