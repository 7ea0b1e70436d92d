//! Parameter marshaling across the extern boundary.
//!
//! Unity passes `string` as a UTF-8 pointer and `double`/`bool` by value. Every other
//! type crosses as JSON text.

use serde::Serialize;

use crate::collect::TypeCollection;
use crate::ir::mapper::map_member_type;
use crate::ir::model::ParsedType;
use crate::ir::names::escape_csharp_keyword;

/// How a value crosses into the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marshal {
    /// Pointer decoded with `UTF8ToString`.
    Str,
    /// `double` passed by value.
    Number,
    /// `bool` passed as an integer.
    Bool,
    /// Serialized with `AITJsonSettings.Serialize`, parsed with `JSON.parse`.
    Json,
}

impl Marshal {
    /// Classifies a mapped C# type.
    pub fn of(cs_type: &str) -> Self {
        match cs_type {
            "string" => Self::Str,
            "double" => Self::Number,
            "bool" => Self::Bool,
            _ => Self::Json,
        }
    }

    /// Declared type in the `DllImport` extern.
    pub const fn extern_type(self) -> &'static str {
        match self {
            Self::Str | Self::Json => "string",
            Self::Number => "double",
            Self::Bool => "bool",
        }
    }

    /// C# argument expression passed to the extern.
    pub fn call_arg(self, name: &str) -> String {
        match self {
            Self::Json => format!("AITJsonSettings.Serialize({name})"),
            _ => name.to_string(),
        }
    }

    /// JS expression that decodes the raw extern argument.
    pub fn js_value(self, name: &str) -> String {
        match self {
            Self::Str => format!("UTF8ToString({name})"),
            Self::Number => name.to_string(),
            Self::Bool => format!("!!{name}"),
            Self::Json => format!("JSON.parse(UTF8ToString({name}))"),
        }
    }
}

/// One host-side parameter and its extern/glue counterparts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamView {
    /// C# identifier, also used as the glue parameter name.
    pub name: String,
    /// Name on the browser side.
    pub js_name: String,
    /// Public C# type.
    pub cs_type: String,
    /// ` = null` style default, empty when required.
    pub default: String,
    /// Type in the extern declaration.
    pub extern_type: String,
    /// Argument passed to the extern.
    pub call_arg: String,
    /// Decoding expression in the glue function.
    pub js_value: String,
    /// XML doc text.
    pub doc: String,
}

impl ParamView {
    /// `Type name = default`
    pub fn declaration(&self) -> String {
        format!("{} {}{}", self.cs_type, self.name, self.default)
    }
}

/// A parameter before defaults are decided.
#[derive(Debug, Clone, Copy)]
pub struct ParamSource<'a> {
    /// Declared name.
    pub name: &'a str,
    /// Declared type.
    pub ty: &'a ParsedType,
    /// Declared optional.
    pub optional: bool,
    /// JSDoc text.
    pub description: Option<&'a str>,
}

const VALUE_TYPES: &[&str] = &[
    "int", "double", "float", "bool", "long", "short", "byte", "char", "decimal", "DateTime",
];

fn is_value_type(cs_type: &str, collection: &TypeCollection) -> bool {
    VALUE_TYPES.contains(&cs_type) || collection.is_enum(cs_type)
}

/// Builds parameter views for members of `owner`.
///
/// Parameters typed `void` are dropped. Once a parameter is optional, every later one
/// gets a default too: `null` for reference and nullable types, `default` otherwise.
pub fn param_views(
    sources: &[ParamSource<'_>],
    owner: &str,
    collection: &TypeCollection,
) -> Vec<ParamView> {
    let mut views = Vec::new();
    let mut optional_seen = false;
    for source in sources {
        if source.ty.is_void() {
            continue;
        }
        let mut cs_type = map_member_type(source.ty, owner, source.name);
        if cs_type == "void" {
            cs_type = "object".to_string();
        }
        let optional = source.optional || source.ty.optional;
        if optional && is_value_type(&cs_type, collection) {
            cs_type.push('?');
        }
        optional_seen |= optional;
        let default = if !optional_seen {
            String::new()
        } else if is_value_type(&cs_type, collection) {
            " = default".to_string()
        } else {
            " = null".to_string()
        };
        let name = escape_csharp_keyword(source.name);
        let marshal = Marshal::of(&cs_type);
        views.push(ParamView {
            js_name: source.name.to_string(),
            cs_type,
            default,
            extern_type: marshal.extern_type().to_string(),
            call_arg: marshal.call_arg(&name),
            js_value: marshal.js_value(&name),
            doc: source.description.unwrap_or(source.name).to_string(),
            name,
        });
    }
    views
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::collect::CollectedType;
    use crate::ir::model::{EnumValue, Literal, TypeKind};

    fn source<'a>(name: &'a str, ty: &'a ParsedType, optional: bool) -> ParamSource<'a> {
        ParamSource {
            name,
            ty,
            optional,
            description: None,
        }
    }

    #[test]
    fn test_marshal_classification() {
        assert_eq!(Marshal::of("string"), Marshal::Str);
        assert_eq!(Marshal::of("double"), Marshal::Number);
        assert_eq!(Marshal::of("double?"), Marshal::Json);
        assert_eq!(Marshal::Json.call_arg("options"), "AITJsonSettings.Serialize(options)");
        assert_eq!(Marshal::Json.js_value("options"), "JSON.parse(UTF8ToString(options))");
        assert_eq!(Marshal::Str.js_value("text"), "UTF8ToString(text)");
    }

    #[test]
    fn test_defaults_after_first_optional() {
        let text = ParsedType::primitive("string");
        let number = ParsedType::primitive("number");
        let views = param_views(
            &[
                source("text", &text, false),
                source("count", &number, true),
                source("limit", &number, false),
                source("label", &text, false),
            ],
            "Api",
            &TypeCollection::default(),
        );
        let declarations: Vec<String> = views.iter().map(ParamView::declaration).collect();
        assert_eq!(
            declarations,
            vec![
                "string text",
                "double? count = null",
                "double limit = default",
                "string label = null"
            ]
        );
        assert_eq!(views[1].extern_type, "string");
        assert_eq!(views[2].extern_type, "double");
    }

    #[test]
    fn test_void_params_dropped_and_keywords_escaped() {
        let void = ParsedType::primitive("void");
        let any = ParsedType::primitive("any");
        let views = param_views(
            &[source("args_0", &void, false), source("params", &any, false)],
            "Api",
            &TypeCollection::default(),
        );
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].name, "paramsParam");
        assert_eq!(views[0].js_name, "params");
        assert_eq!(views[0].cs_type, "object");
    }

    #[test]
    fn test_optional_enum_becomes_nullable() {
        let mut collection = TypeCollection::default();
        collection.types.insert(
            "Mode".into(),
            CollectedType::Enum {
                values: vec![EnumValue {
                    name: None,
                    value: Literal::String("on".into()),
                }],
                description: None,
            },
        );
        let mode = ParsedType::new(
            TypeKind::Object {
                name: Some("Mode".into()),
                properties: vec![],
            },
            "Mode",
        );
        let views = param_views(&[source("mode", &mode, true)], "Api", &collection);
        assert_eq!(views[0].declaration(), "Mode? mode = null");
        assert_eq!(views[0].call_arg, "AITJsonSettings.Serialize(mode)");
    }
}
