//! `AIT.Types.cs`: every collected class and enum as C# syntax.

use std::collections::HashSet;

use super::csharp::{
    CsClass, CsConstants, CsEnum, CsEnumMember, CsField, CsFile, CsItem, CsMember, CsMethod,
    CsProperty,
};
use crate::collect::{CollectedType, Field, TypeCollection};
use crate::ir::model::{EnumValue, Literal};
use crate::ir::names::{enum_member_name, escape_csharp_string};

/// Namespaces the type file relies on.
pub const TYPE_USINGS: &[&str] = &[
    "System",
    "System.Collections.Generic",
    "System.Runtime.Serialization",
    "Newtonsoft.Json",
    "UnityEngine.Scripting",
];

/// Builds the type file, leaving out the names in `skip`.
pub fn types_file(header: String, collection: &TypeCollection, skip: &HashSet<String>) -> CsFile {
    let mut results = Vec::new();
    let mut tagged = Vec::new();
    let mut enums = Vec::new();
    let mut classes = Vec::new();
    let mut stubs = Vec::new();
    for (name, collected) in &collection.types {
        if skip.contains(name) {
            continue;
        }
        let item = type_item(name, collected);
        match collected {
            CollectedType::ResultUnion { .. } => results.push(item),
            CollectedType::Tagged { .. } => tagged.push(item),
            CollectedType::Enum { .. } => enums.push(item),
            CollectedType::Class { .. } => classes.push(item),
            CollectedType::Stub => stubs.push(item),
        }
    }

    let mut items = Vec::new();
    for (title, section) in [
        ("Result Types", results),
        ("Discriminated Unions", tagged),
        ("Enums", enums),
        ("Classes", classes),
        ("External Types", stubs),
    ] {
        if !section.is_empty() {
            items.push(CsItem::Section(title.to_string()));
            items.extend(section);
        }
    }

    CsFile {
        header,
        usings: TYPE_USINGS.iter().map(|u| (*u).to_string()).collect(),
        namespace: "AppsInToss".to_string(),
        items,
    }
}

/// One collected type as a namespace-level item.
pub fn type_item(name: &str, collected: &CollectedType) -> CsItem {
    match collected {
        CollectedType::Class {
            fields,
            is_result,
            description,
        } => CsItem::Class(plain_class(name, fields, *is_result, description.clone())),
        CollectedType::Enum {
            values,
            description,
        } => CsItem::Enum(enum_decl(name, values, description.clone())),
        CollectedType::ResultUnion {
            success,
            error_codes,
        } => CsItem::Class(result_class(name, success, error_codes)),
        CollectedType::Tagged {
            discriminator,
            tags,
            fields,
        } => CsItem::Class(tagged_class(name, discriminator, tags, fields)),
        CollectedType::Stub => CsItem::Class(CsClass::serializable(
            name,
            Some(format!("{name} is referenced by the bridge package but never declared.")),
        )),
    }
}

fn field(field: &Field) -> CsField {
    let mut attributes = vec!["Preserve".to_string()];
    if field.is_callback() {
        attributes.push("JsonIgnore".to_string());
    } else if field.json_name != field.name {
        attributes.push(format!(
            "JsonProperty(\"{}\")",
            escape_csharp_string(&field.json_name)
        ));
    }
    CsField {
        name: field.name.clone(),
        ty: field.ty.clone(),
        doc: field.description.clone(),
        attributes,
    }
}

fn plain_class(
    name: &str,
    fields: &[Field],
    is_result: bool,
    description: Option<String>,
) -> CsClass {
    let mut class = CsClass::serializable(name, description);
    class
        .members
        .extend(fields.iter().map(|f| CsMember::Field(field(f))));
    if is_result && !fields.iter().any(|f| f.json_name == "error") {
        class.members.push(CsMember::Field(CsField {
            name: "error".to_string(),
            ty: "string".to_string(),
            doc: Some("Error message set by the bridge when the call failed.".to_string()),
            attributes: vec!["Preserve".to_string()],
        }));
    }
    class
}

fn enum_decl(name: &str, values: &[EnumValue], description: Option<String>) -> CsEnum {
    let mut seen = HashSet::new();
    let members = values
        .iter()
        .enumerate()
        .map(|(index, value)| {
            let (label, numeric, wire) = match &value.value {
                Literal::String(text) => (text.clone(), None, Some(text.clone())),
                Literal::Number(number) => {
                    let integral = number.parse::<i64>().ok().map(|n| n.to_string());
                    let wire = integral.is_none().then(|| number.clone());
                    (format!("Value{number}"), integral, wire)
                }
                Literal::Bool(flag) => (flag.to_string(), None, Some(flag.to_string())),
            };
            let mut member = enum_member_name(value.name.as_deref().unwrap_or(&label));
            if !seen.insert(member.clone()) {
                member = format!("{member}{index}");
                seen.insert(member.clone());
            }
            let wire = wire.filter(|wire| *wire != member);
            CsEnumMember {
                name: member,
                value: numeric,
                wire,
            }
        })
        .collect();
    CsEnum {
        name: name.to_string(),
        doc: description,
        members,
    }
}

fn json_ignored(name: &str, ty: &str, expr: String) -> CsMember {
    CsMember::Property(CsProperty {
        name: name.to_string(),
        ty: ty.to_string(),
        expr,
        attributes: vec!["JsonIgnore".to_string()],
    })
}

fn preserved(name: &str) -> CsMember {
    CsMember::Field(CsField {
        name: name.to_string(),
        ty: "string".to_string(),
        doc: None,
        attributes: vec!["Preserve".to_string()],
    })
}

/// `Success | "CODE_A" | "CODE_B"` as a success/error wrapper.
fn result_class(name: &str, success: &str, error_codes: &[String]) -> CsClass {
    let mut class = CsClass::serializable(
        name,
        Some(format!(
            "Either a {success} or one of the error codes in {name}.ErrorCodes."
        )),
    );
    class.members.extend([
        preserved("_type"),
        preserved("_successJson"),
        preserved("_errorCode"),
        json_ignored("IsSuccess", "bool", "_type == \"success\"".to_string()),
        json_ignored("IsError", "bool", "_type == \"error\"".to_string()),
        CsMember::Method(CsMethod {
            signature: format!("public {success} GetSuccess()"),
            body: vec![
                "if (!IsSuccess || string.IsNullOrEmpty(_successJson)) return default;".to_string(),
                format!(
                    "return JsonConvert.DeserializeObject<{success}>(_successJson, AITJsonSettings.Default);"
                ),
            ],
        }),
        CsMember::Method(CsMethod {
            signature: "public string GetErrorCode()".to_string(),
            body: vec!["return IsError ? _errorCode : null;".to_string()],
        }),
        CsMember::Method(CsMethod {
            signature: format!(
                "public TResult Match<TResult>(Func<{success}, TResult> onSuccess, Func<string, TResult> onError)"
            ),
            body: vec!["return IsSuccess ? onSuccess(GetSuccess()) : onError(_errorCode);".to_string()],
        }),
        CsMember::Method(CsMethod {
            signature: format!("public {name} OnSuccess(Action<{success}> action)"),
            body: vec![
                "if (IsSuccess) action?.Invoke(GetSuccess());".to_string(),
                "return this;".to_string(),
            ],
        }),
        CsMember::Method(CsMethod {
            signature: format!("public {name} OnError(Action<string> action)"),
            body: vec![
                "if (IsError) action?.Invoke(_errorCode);".to_string(),
                "return this;".to_string(),
            ],
        }),
        CsMember::Constants(CsConstants {
            name: "ErrorCodes".to_string(),
            values: error_codes
                .iter()
                .map(|code| (enum_member_name(code), code.clone()))
                .collect(),
        }),
    ]);
    class
}

/// Object union merged into one class with one `Is<Tag>` check per tag.
fn tagged_class(name: &str, discriminator: &str, tags: &[String], fields: &[Field]) -> CsClass {
    let mut class = CsClass::serializable(
        name,
        Some(format!("One of {} shapes distinguished by `{discriminator}`.", tags.len())),
    );
    class
        .members
        .extend(fields.iter().map(|f| CsMember::Field(field(f))));
    let Some(tag_field) = fields.iter().find(|f| f.json_name == discriminator) else {
        return class;
    };
    for tag in tags {
        let property = format!("Is{}", enum_member_name(tag));
        if fields.iter().any(|f| f.name == property) {
            continue;
        }
        class.members.push(json_ignored(
            &property,
            "bool",
            format!("{} == \"{}\"", tag_field.name, escape_csharp_string(tag)),
        ));
    }
    class
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::codegen::emit::Emit;

    fn field(json: &str, name: &str, ty: &str, optional: bool) -> Field {
        Field {
            json_name: json.into(),
            name: name.into(),
            ty: ty.into(),
            optional,
            description: None,
        }
    }

    #[test]
    fn test_tagged_class_has_discriminator_checks() {
        let class = tagged_class(
            "Outcome",
            "status",
            &["OK".into(), "ERR".into()],
            &[
                field("status", "Status", "string", false),
                field("value", "Value", "double?", true),
                field("code", "Code", "string", true),
            ],
        );
        let text = class.emit();
        assert!(text.contains("public double? Value;"));
        assert!(text.contains("public string Code;"));
        assert!(text.contains("public bool IsOK => Status == \"OK\";"));
        assert!(text.contains("public bool IsERR => Status == \"ERR\";"));
    }

    #[test]
    fn test_result_class_shape() {
        let text = result_class("BuyResult", "BuyResultSuccess", &["USER_CANCELED".into()]).emit();
        for needle in [
            "public string _type;",
            "public string _successJson;",
            "public string _errorCode;",
            "public bool IsSuccess => _type == \"success\";",
            "public BuyResultSuccess GetSuccess()",
            "public string GetErrorCode()",
            "public TResult Match<TResult>(Func<BuyResultSuccess, TResult> onSuccess, Func<string, TResult> onError)",
            "public BuyResult OnSuccess(Action<BuyResultSuccess> action)",
            "public BuyResult OnError(Action<string> action)",
            "public const string USER_CANCELED = \"USER_CANCELED\";",
        ] {
            assert!(text.contains(needle), "missing {needle} in\n{text}");
        }
    }

    #[test]
    fn test_enum_members_keep_literal_order() {
        let en = enum_decl(
            "Orientation",
            &[
                EnumValue {
                    name: None,
                    value: Literal::String("portrait".into()),
                },
                EnumValue {
                    name: None,
                    value: Literal::String("landscape".into()),
                },
            ],
            None,
        );
        let names: Vec<&str> = en.members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Portrait", "Landscape"]);
        assert_eq!(en.members[0].wire.as_deref(), Some("portrait"));

        let numeric = enum_decl(
            "Level",
            &[EnumValue {
                name: Some("High".into()),
                value: Literal::Number("2".into()),
            }],
            None,
        );
        assert_eq!(numeric.members[0].value.as_deref(), Some("2"));
        assert_eq!(numeric.members[0].wire, None);
    }

    #[test]
    fn test_fields_attributes() {
        let class = plain_class(
            "Options",
            &[
                field("url", "Url", "string", false),
                field("onDone", "OnDone", "System.Action", true),
            ],
            true,
            None,
        );
        let text = class.emit();
        assert!(text.contains("[JsonProperty(\"url\")]\n    public string Url;"));
        assert!(text.contains("[JsonIgnore]\n    public System.Action OnDone;"));
        assert!(text.contains("public string error;"));
    }

    #[test]
    fn test_types_file_skips_and_orders_sections() {
        let mut collection = TypeCollection::default();
        collection.types.insert("Missing".into(), CollectedType::Stub);
        collection.types.insert(
            "EventData".into(),
            CollectedType::Class {
                fields: vec![],
                is_result: false,
                description: None,
            },
        );
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
        let skip = HashSet::from(["EventData".to_string()]);
        let text = types_file(String::new(), &collection, &skip).emit();
        assert!(!text.contains("class EventData"));
        let enums = text.find("// Enums").unwrap();
        let stubs = text.find("// External Types").unwrap();
        assert!(enums < stubs);
        assert!(text.contains("public class Missing"));
    }
}
