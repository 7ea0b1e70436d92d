//! IR to C# type names.
//!
//! [`map_type`] is total: shapes with no better mapping degrade to `object`. The
//! owner-qualified variant [`map_member_type`] applies the same naming rules as the type
//! collector, so a parameter's declared type always matches a collected class or enum.

use std::collections::HashMap;
use std::sync::LazyLock;

use super::model::{ParsedType, TypeKind, UnionShape};
use super::names::{capitalize, clean_name, singularize};

/// Declared names with a fixed C# counterpart.
pub static TYPE_MAPPING: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("string", "string"),
        ("number", "double"),
        ("boolean", "bool"),
        ("void", "void"),
        ("any", "void"),
        ("unknown", "object"),
        ("object", "object"),
        ("null", "object"),
        ("undefined", "object"),
        ("never", "object"),
        ("Date", "DateTime"),
        ("ArrayBuffer", "byte[]"),
        ("Uint8Array", "byte[]"),
        ("Error", "Exception"),
    ])
});

const NULLABLE_VALUE_TYPES: &[&str] = &[
    "int", "double", "float", "bool", "long", "short", "byte", "char", "decimal", "DateTime",
];

/// Maps a type without owner context.
pub fn map_type(ty: &ParsedType) -> String {
    let base = match &ty.kind {
        TypeKind::Primitive { name, .. } => TYPE_MAPPING
            .get(name.as_str())
            .map_or_else(|| "object".to_string(), |m| (*m).to_string()),
        TypeKind::Array { element } => format!("{}[]", map_type(element)),
        TypeKind::Object { name: Some(name), .. } => named(name),
        TypeKind::Object { name: None, .. } => "object".to_string(),
        TypeKind::Union {
            name: Some(name), ..
        } if ty.string_literal_members().is_some() || has_object_members(ty) => clean_name(name),
        TypeKind::Union { members, shape, .. } => match shape {
            UnionShape::Plain => collapse_union(members),
            UnionShape::Result { .. } | UnionShape::Tagged(_) => "object".to_string(),
        },
        TypeKind::Function { params, .. } => {
            if params.is_empty() {
                "System.Action".to_string()
            } else {
                let args: Vec<String> = params.iter().map(|p| map_type(&p.ty)).collect();
                format!("System.Action<{}>", args.join(", "))
            }
        }
        TypeKind::Record { key, value } => format!(
            "Dictionary<{}, {}>",
            map_type(key),
            record_value(value, map_type(value))
        ),
        TypeKind::Promise { inner } => return map_type(inner),
        TypeKind::Unknown { name } if name.contains('.') => clean_name(name),
        TypeKind::Unknown { .. } => "object".to_string(),
    };
    nullable(base, ty)
}

/// Maps a type used as `member` of `owner` (an API or a collected class).
///
/// Anonymous objects, inline literal unions, anonymous-element arrays and
/// object-member unions get owner-qualified names; everything else maps as [`map_type`].
pub fn map_member_type(ty: &ParsedType, owner: &str, member: &str) -> String {
    match &ty.kind {
        TypeKind::Promise { inner } => map_member_type(inner, owner, member),
        TypeKind::Array { element } => {
            if synthesized_name(element, owner, member).is_some() {
                format!("{}[]", element_name(owner, member))
            } else {
                format!("{}[]", map_member_type(element, owner, member))
            }
        }
        TypeKind::Function { params, .. } if !params.is_empty() => {
            let args: Vec<String> = params
                .iter()
                .map(|p| map_member_type(&p.ty, owner, member))
                .collect();
            format!("System.Action<{}>", args.join(", "))
        }
        TypeKind::Record { key, value } => format!(
            "Dictionary<{}, {}>",
            map_type(key),
            record_value(value, map_member_type(value, owner, member))
        ),
        _ => match synthesized_name(ty, owner, member) {
            Some(name) => name,
            None => map_type(ty),
        },
    }
}

/// Owner-qualified name for an anonymous shape, `None` when the type maps by itself.
pub fn synthesized_name(ty: &ParsedType, owner: &str, member: &str) -> Option<String> {
    let synthesized = match &ty.kind {
        TypeKind::Object {
            name: None,
            properties,
        } => !properties.is_empty(),
        TypeKind::Union { name: None, .. } => {
            ty.string_literal_members().is_some() || has_object_members(ty)
        }
        _ => false,
    };
    synthesized.then(|| owned_name(owner, member))
}

/// `Owner + Member`, or `MemberType` without an owner.
pub fn owned_name(owner: &str, member: &str) -> String {
    if owner.is_empty() {
        format!("{}Type", capitalize(member))
    } else {
        format!("{owner}{}", capitalize(member))
    }
}

/// Element class name for an array of anonymous objects.
pub fn element_name(owner: &str, member: &str) -> String {
    let singular = capitalize(&singularize(member));
    if owner.is_empty() {
        format!("{singular}Item")
    } else {
        format!("{owner}{singular}")
    }
}

/// Union whose members carry properties and can be merged into one class.
pub fn has_object_members(ty: &ParsedType) -> bool {
    match &ty.kind {
        TypeKind::Union { members, shape, .. } => match shape {
            UnionShape::Tagged(_) | UnionShape::Result { .. } => true,
            UnionShape::Plain => members
                .iter()
                .any(|m| m.properties().is_some_and(|p| !p.is_empty())),
        },
        _ => false,
    }
}

/// Declared names with a fixed C# mapping never get a generated class.
pub fn is_builtin(name: &str) -> bool {
    TYPE_MAPPING.contains_key(clean_name(name).as_str())
}

fn named(name: &str) -> String {
    let cleaned = clean_name(name);
    TYPE_MAPPING
        .get(cleaned.as_str())
        .map_or(cleaned, |m| (*m).to_string())
}

/// Plain unions collapse to their first named, non-undefined member.
fn collapse_union(members: &[ParsedType]) -> String {
    if let Some(named_member) = members
        .iter()
        .find(|m| !m.is_nullish() && m.declared_name().is_some())
    {
        return map_type(named_member);
    }
    if !members.is_empty() && members.iter().all(|m| m.string_literal().is_some()) {
        return "string".to_string();
    }
    let mut mapped = members.iter().map(map_type);
    match mapped.next() {
        Some(first) if mapped.all(|m| m == first) => first,
        _ => "object".to_string(),
    }
}

fn record_value(value: &ParsedType, mapped: String) -> String {
    match (&value.kind, value.primitive_name()) {
        (TypeKind::Union { .. }, _) | (_, Some("never")) => "object".to_string(),
        _ => mapped,
    }
}

fn nullable(base: String, ty: &ParsedType) -> String {
    if (ty.is_nullable || ty.optional) && NULLABLE_VALUE_TYPES.contains(&base.as_str()) {
        format!("{base}?")
    } else {
        base
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::ir::model::{Literal, ParsedParameter, Property};

    fn object(name: Option<&str>, props: &[(&str, ParsedType)]) -> ParsedType {
        ParsedType::new(
            TypeKind::Object {
                name: name.map(str::to_string),
                properties: props
                    .iter()
                    .map(|(n, t)| Property {
                        name: (*n).to_string(),
                        ty: t.clone(),
                        optional: false,
                        description: None,
                    })
                    .collect(),
            },
            name.unwrap_or("{…}"),
        )
    }

    fn lit(value: &str) -> ParsedType {
        ParsedType::new(
            TypeKind::Primitive {
                name: "string".into(),
                literal: Some(Literal::String(value.into())),
            },
            format!("\"{value}\""),
        )
    }

    fn union(name: Option<&str>, members: Vec<ParsedType>) -> ParsedType {
        ParsedType::new(
            TypeKind::Union {
                name: name.map(str::to_string),
                members,
                shape: UnionShape::Plain,
            },
            "…",
        )
    }

    #[test]
    fn test_primitives() {
        assert_eq!(map_type(&ParsedType::primitive("string")), "string");
        assert_eq!(map_type(&ParsedType::primitive("number")), "double");
        assert_eq!(map_type(&ParsedType::primitive("boolean")), "bool");
        assert_eq!(map_type(&ParsedType::primitive("void")), "void");
        assert_eq!(map_type(&ParsedType::primitive("any")), "void");
        assert_eq!(map_type(&ParsedType::primitive("unknown")), "object");
    }

    #[test]
    fn test_nullable_value_types() {
        let mut ty = ParsedType::primitive("number");
        ty.is_nullable = true;
        assert_eq!(map_type(&ty), "double?");
        let mut ty = ParsedType::primitive("string");
        ty.is_nullable = true;
        assert_eq!(map_type(&ty), "string");
    }

    #[test]
    fn test_arrays_promises_records() {
        let array = ParsedType::new(
            TypeKind::Array {
                element: Box::new(ParsedType::primitive("number")),
            },
            "number[]",
        );
        assert_eq!(map_type(&array), "double[]");
        let promise = ParsedType::new(
            TypeKind::Promise {
                inner: Box::new(array),
            },
            "Promise<number[]>",
        );
        assert_eq!(map_type(&promise), "double[]");
        let record = ParsedType::new(
            TypeKind::Record {
                key: Box::new(ParsedType::primitive("string")),
                value: Box::new(union(None, vec![lit("a"), lit("b")])),
            },
            "Record<string, 'a' | 'b'>",
        );
        assert_eq!(map_type(&record), "Dictionary<string, object>");
    }

    #[test]
    fn test_named_objects_are_cleaned() {
        assert_eq!(
            map_type(&object(Some("import(\"./x\").Location$1"), &[])),
            "Location"
        );
        assert_eq!(map_type(&object(Some("Date"), &[])), "DateTime");
        assert_eq!(map_type(&object(None, &[("a", ParsedType::primitive("string"))])), "object");
    }

    #[test]
    fn test_union_collapse() {
        let ty = union(
            None,
            vec![ParsedType::primitive("undefined"), object(Some("Location"), &[])],
        );
        assert_eq!(map_type(&ty), "Location");
        let ty = union(None, vec![ParsedType::primitive("string"), ParsedType::primitive("number")]);
        assert_eq!(map_type(&ty), "object");
        assert_eq!(map_type(&union(Some("Orientation"), vec![lit("a"), lit("b")])), "Orientation");
        let numeric = union(
            Some("Id"),
            vec![ParsedType::primitive("number"), ParsedType::primitive("number")],
        );
        assert_eq!(map_type(&numeric), "double");
    }

    #[test]
    fn test_functions() {
        let callback = ParsedType::new(
            TypeKind::Function {
                params: vec![ParsedParameter {
                    name: "e".into(),
                    ty: object(Some("Location"), &[]),
                    optional: false,
                    description: None,
                }],
                return_type: Box::new(ParsedType::primitive("void")),
            },
            "(e: Location) => void",
        );
        assert_eq!(map_type(&callback), "System.Action<Location>");
        let disposer = ParsedType::new(
            TypeKind::Function {
                params: vec![],
                return_type: Box::new(ParsedType::primitive("void")),
            },
            "() => void",
        );
        assert_eq!(map_type(&disposer), "System.Action");
    }

    #[test]
    fn test_member_names_are_owner_qualified() {
        let anon = object(None, &[("x", ParsedType::primitive("number"))]);
        assert_eq!(map_member_type(&anon, "GetThing", "options"), "GetThingOptions");
        assert_eq!(map_member_type(&anon, "", "options"), "OptionsType");

        let list = ParsedType::new(
            TypeKind::Array {
                element: Box::new(anon),
            },
            "{…}[]",
        );
        assert_eq!(map_member_type(&list, "Order", "items"), "OrderItem[]");
        assert_eq!(map_member_type(&list, "", "items"), "ItemItem[]");

        let literals = union(None, vec![lit("portrait"), lit("landscape")]);
        assert_eq!(
            map_member_type(&literals, "SetOrientation", "orientation"),
            "SetOrientationOrientation"
        );
        assert_eq!(
            map_member_type(&ParsedType::primitive("string"), "X", "y"),
            "string"
        );
    }
}
