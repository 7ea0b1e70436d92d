//! Structural pattern detectors over the IR.
//!
//! All detectors are pure predicates or extractors; none of them look at names except
//! for the `onEvent`/`onError` pair that defines a callback-based API.

use std::collections::HashSet;

use super::model::{
    NestedCallback, ParsedParameter, ParsedType, Property, TaggedUnion, TypeKind, UnionShape,
};

/// Takes a single `{ onEvent, onError }` argument and returns a zero-argument disposer.
pub fn is_callback_based(params: &[ParsedParameter], return_type: &ParsedType) -> bool {
    let [param] = params else {
        return false;
    };
    if !matches!(param.ty.kind, TypeKind::Object { .. }) {
        return false;
    }
    let is_function = |name: &str| {
        param
            .ty
            .property(name)
            .is_some_and(|p| matches!(p.ty.kind, TypeKind::Function { .. }))
    };
    is_function("onEvent") && is_function("onError") && is_disposer(return_type)
}

/// `() => void`
pub fn is_disposer(ty: &ParsedType) -> bool {
    match &ty.kind {
        TypeKind::Function {
            params,
            return_type,
        } => params.is_empty() && return_type.is_void(),
        _ => false,
    }
}

/// Collects callbacks found at depth ≥ 1 inside object parameters.
///
/// Function properties directly on a parameter object (depth 0) are the top-level
/// callbacks and are skipped. Results are unique by property path.
pub fn nested_callbacks(params: &[ParsedParameter]) -> Vec<NestedCallback> {
    let mut found = Vec::new();
    let mut seen = HashSet::new();
    for param in params {
        let Some(properties) = param.ty.properties() else {
            continue;
        };
        for prop in properties {
            if matches!(prop.ty.kind, TypeKind::Object { .. } | TypeKind::Union { .. }) {
                walk(&prop.ty, &[prop.name.clone()], 1, &mut seen, &mut found);
            }
        }
    }
    found
}

fn walk(
    ty: &ParsedType,
    path: &[String],
    depth: usize,
    seen: &mut HashSet<String>,
    found: &mut Vec<NestedCallback>,
) {
    match &ty.kind {
        TypeKind::Object { properties, .. } => {
            for prop in properties {
                let mut child = path.to_vec();
                child.push(prop.name.clone());
                match &prop.ty.kind {
                    TypeKind::Function {
                        params,
                        return_type,
                    } if depth >= 1 => {
                        if seen.insert(child.join(".")) {
                            found.push(NestedCallback {
                                name: prop.name.clone(),
                                path: child,
                                parameter_type: params.first().map(|p| p.ty.clone()),
                                return_type: Some((**return_type).clone()),
                            });
                        }
                    }
                    TypeKind::Object { .. } | TypeKind::Union { .. } => {
                        walk(&prop.ty, &child, depth + 1, seen, found);
                    }
                    _ => {}
                }
            }
        }
        TypeKind::Union { members, .. } => {
            for member in members {
                walk(member, path, depth, seen, found);
            }
        }
        _ => {}
    }
}

/// Classifies union members.
///
/// One object plus string literals is a result union; two or more objects sharing a
/// string-literal property form a tagged union. Anything else stays plain.
pub fn union_shape(members: &[ParsedType]) -> UnionShape {
    if let Some(shape) = result_shape(members) {
        return shape;
    }
    tagged_union(members).map_or(UnionShape::Plain, UnionShape::Tagged)
}

fn result_shape(members: &[ParsedType]) -> Option<UnionShape> {
    let mut success = None;
    let mut error_codes = Vec::new();
    for member in members {
        if let Some(code) = member.string_literal() {
            error_codes.push(code.to_string());
        } else if matches!(member.kind, TypeKind::Object { .. }) && success.is_none() {
            success = Some(member);
        } else {
            return None;
        }
    }
    let success = success?;
    if error_codes.is_empty() {
        return None;
    }
    Some(UnionShape::Result {
        success: Box::new(success.clone()),
        error_codes,
    })
}

/// Finds the discriminator of an object union and merges the member properties.
pub fn tagged_union(members: &[ParsedType]) -> Option<TaggedUnion> {
    if members.len() < 2 {
        return None;
    }
    let shapes: Vec<&[Property]> = members
        .iter()
        .map(|m| match &m.kind {
            TypeKind::Object { properties, .. } if !properties.is_empty() => {
                Some(properties.as_slice())
            }
            _ => None,
        })
        .collect::<Option<_>>()?;

    let discriminator = shapes[0].iter().find_map(|candidate| {
        candidate.ty.string_literal()?;
        shapes
            .iter()
            .all(|props| {
                props
                    .iter()
                    .any(|p| p.name == candidate.name && p.ty.string_literal().is_some())
            })
            .then(|| candidate.name.clone())
    })?;

    let tags = shapes
        .iter()
        .filter_map(|props| {
            props
                .iter()
                .find(|p| p.name == discriminator)
                .and_then(|p| p.ty.string_literal())
                .map(str::to_string)
        })
        .collect();

    let mut merged: Vec<Property> = Vec::new();
    for props in &shapes {
        for prop in *props {
            if merged.iter().any(|m| m.name == prop.name) {
                continue;
            }
            let everywhere = shapes.iter().all(|other| {
                other
                    .iter()
                    .any(|p| p.name == prop.name && !p.optional)
            });
            let mut merged_prop = prop.clone();
            merged_prop.optional = !everywhere;
            if merged_prop.name == discriminator {
                merged_prop.ty = ParsedType::primitive("string");
            }
            merged.push(merged_prop);
        }
    }

    Some(TaggedUnion {
        discriminator,
        tags,
        merged,
    })
}
