//! Type-support gate run before anything is generated.

use crate::error::{GeneratorError, Result, TypeDiagnostic};
use crate::ir::model::{ParsedApi, ParsedType, TypeKind, UnionShape};

const SUPPORTED_PRIMITIVES: &[&str] = &[
    "string",
    "number",
    "boolean",
    "void",
    "any",
    "unknown",
    "object",
    "null",
    "undefined",
    "never",
];

/// Finds the first unsupported node under `ty`.
fn unsupported(ty: &ParsedType, depth: usize, max_depth: usize) -> Option<&ParsedType> {
    if depth > max_depth {
        return None;
    }
    let next = depth + 1;
    match &ty.kind {
        TypeKind::Primitive { name, .. } => {
            (!SUPPORTED_PRIMITIVES.contains(&name.as_str())).then_some(ty)
        }
        TypeKind::Promise { inner } => unsupported(inner, next, max_depth),
        TypeKind::Array { element } => unsupported(element, next, max_depth),
        TypeKind::Object { properties, .. } => properties
            .iter()
            .find_map(|p| unsupported(&p.ty, next, max_depth)),
        TypeKind::Union { shape, members, .. } => match shape {
            UnionShape::Result { .. } | UnionShape::Tagged(_) => None,
            UnionShape::Plain => members
                .iter()
                .find_map(|m| unsupported(m, next, max_depth)),
        },
        TypeKind::Function { .. } | TypeKind::Record { .. } => None,
        TypeKind::Unknown { name } => {
            let named = !name.is_empty() && !name.contains('|');
            (!(ty.is_nullable && named)).then_some(ty)
        }
    }
}

fn diagnostic(api: &ParsedApi, location: &str, ty: &ParsedType) -> TypeDiagnostic {
    TypeDiagnostic {
        api: api.name.clone(),
        location: location.to_string(),
        raw: ty.raw.clone(),
        kind: ty.kind_name().to_string(),
    }
}

/// Every unsupported parameter, return or event payload type.
pub fn check_types(apis: &[ParsedApi], max_depth: usize) -> Vec<TypeDiagnostic> {
    let mut diagnostics = Vec::new();
    for api in apis {
        for param in &api.parameters {
            if let Some(bad) = unsupported(&param.ty, 0, max_depth) {
                diagnostics.push(diagnostic(api, &param.name, bad));
            }
        }
        if let Some(bad) = unsupported(&api.return_type, 0, max_depth) {
            diagnostics.push(diagnostic(api, "return", bad));
        }
        if let Some(data) = api.event_data()
            && let Some(bad) = unsupported(data, 0, max_depth)
        {
            diagnostics.push(diagnostic(api, "onEvent", bad));
        }
    }
    diagnostics
}

/// Fails with every diagnostic at once.
pub fn ensure_supported(apis: &[ParsedApi], max_depth: usize) -> Result<()> {
    let diagnostics = check_types(apis, max_depth);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(GeneratorError::TypeUnsupported(diagnostics))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::ir::model::{ApiKind, ParsedParameter, Property};

    fn api(param: ParsedType, ret: ParsedType) -> ParsedApi {
        ParsedApi {
            name: "doThing".into(),
            pascal_name: "DoThing".into(),
            original_name: "doThing".into(),
            category: "Other".into(),
            namespace: None,
            parameters: vec![ParsedParameter {
                name: "options".into(),
                ty: param,
                optional: false,
                description: None,
            }],
            return_type: ret,
            is_async: false,
            kind: ApiKind::Function,
            nested_callbacks: vec![],
            deprecated: None,
            description: None,
        }
    }

    fn object(props: Vec<(&str, ParsedType)>) -> ParsedType {
        ParsedType::new(
            TypeKind::Object {
                name: None,
                properties: props
                    .into_iter()
                    .map(|(name, ty)| Property {
                        name: name.into(),
                        ty,
                        optional: false,
                        description: None,
                    })
                    .collect(),
            },
            "{ ... }",
        )
    }

    #[test]
    fn test_supported_shapes_pass() {
        let param = object(vec![
            ("name", ParsedType::primitive("string")),
            (
                "tags",
                ParsedType::new(
                    TypeKind::Array {
                        element: Box::new(ParsedType::primitive("string")),
                    },
                    "string[]",
                ),
            ),
        ]);
        let ret = ParsedType::new(
            TypeKind::Promise {
                inner: Box::new(ParsedType::primitive("void")),
            },
            "Promise<void>",
        );
        assert!(ensure_supported(&[api(param, ret)], 32).is_ok());
    }

    #[test]
    fn test_nested_unknown_is_reported_with_location() {
        let param = object(vec![(
            "mode",
            ParsedType::new(
                TypeKind::Unknown {
                    name: "T extends U ? X : Y".into(),
                },
                "T extends U ? X : Y",
            ),
        )]);
        let ret = ParsedType::primitive("bigint");
        let diagnostics = check_types(&[api(param, ret)], 32);
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].location, "options");
        assert_eq!(diagnostics[0].kind, "unknown");
        assert_eq!(diagnostics[0].raw, "T extends U ? X : Y");
        assert_eq!(diagnostics[1].location, "return");
        assert_eq!(diagnostics[1].kind, "primitive");
    }

    #[test]
    fn test_nullable_named_unknown_passes() {
        let mut ty = ParsedType::unknown("Foo");
        ty.is_nullable = true;
        assert!(check_types(&[api(ty, ParsedType::primitive("void"))], 32).is_empty());
        let err = ensure_supported(
            &[api(ParsedType::unknown("A | B"), ParsedType::primitive("void"))],
            32,
        )
        .unwrap_err();
        assert!(matches!(err, GeneratorError::TypeUnsupported(d) if d.len() == 1));
    }
}
