//! Lowers declaration type expressions into the IR.
//!
//! References are resolved against the [`SymbolTable`]; generic parameters are substituted
//! with already-lowered arguments so utility types such as `Parameters<T>` and
//! `ReturnType<T>` can be evaluated structurally.

use std::collections::HashMap;

use super::detect;
use super::model::{Literal, ParsedParameter, ParsedType, Property, TypeKind, UnionShape};
use super::names::clean_name;
use crate::surface::{
    JsDoc, Member, MemberKind, Param, SymbolTable, TypeExpr, TypeParam, TypeSymbol, ValueSymbol,
};

type Scope = HashMap<String, ParsedType>;

/// Host types that are known without a declaration.
const BUILTIN_OBJECTS: &[&str] = &[
    "Date",
    "Error",
    "ArrayBuffer",
    "Uint8Array",
    "Blob",
    "File",
    "Map",
    "Set",
    "RegExp",
];

/// Converts [`TypeExpr`] trees into [`ParsedType`] trees.
#[derive(Debug)]
pub struct TypeBuilder<'a> {
    symbols: &'a SymbolTable,
    max_depth: usize,
    resolving: Vec<String>,
}

impl<'a> TypeBuilder<'a> {
    /// Creates a builder over a symbol table.
    pub fn new(symbols: &'a SymbolTable, max_depth: usize) -> Self {
        Self {
            symbols,
            max_depth,
            resolving: Vec::new(),
        }
    }

    /// Lowers a type expression with no generic bindings.
    pub fn build(&mut self, expr: &TypeExpr) -> ParsedType {
        self.lower(expr, &Scope::new(), 0)
    }

    /// Lowers a function signature, binding its generic parameters to their constraints.
    pub fn build_signature(
        &mut self,
        type_params: &[TypeParam],
        params: &[Param],
        ret: &TypeExpr,
    ) -> (Vec<ParsedParameter>, ParsedType) {
        let scope = self.bind(type_params, &[], &Scope::new(), 0);
        let params = self.lower_params(params, &scope, 0);
        let ret = self.lower(ret, &scope, 0);
        (params, ret)
    }

    fn lower(&mut self, expr: &TypeExpr, scope: &Scope, depth: usize) -> ParsedType {
        let raw = expr.to_string();
        if depth > self.max_depth {
            return opaque(&raw);
        }
        let next = depth + 1;
        match expr {
            TypeExpr::Keyword(keyword) => {
                let mut ty = ParsedType::primitive(keyword);
                if keyword == "null" || keyword == "undefined" {
                    ty.is_nullable = true;
                }
                ty
            }
            TypeExpr::StringLit(value) => {
                literal("string", Literal::String(value.clone()), raw)
            }
            TypeExpr::NumberLit(value) => {
                literal("number", Literal::Number(value.clone()), raw)
            }
            TypeExpr::BoolLit(value) => literal("boolean", Literal::Bool(*value), raw),
            TypeExpr::Ref { name, args } => self.lower_ref(name, args, raw, scope, depth),
            TypeExpr::Array(element) => {
                let element = self.lower(element, scope, next);
                ParsedType::new(
                    TypeKind::Array {
                        element: Box::new(element),
                    },
                    raw,
                )
            }
            TypeExpr::Tuple(items) => {
                let element = items.first().map_or_else(
                    || ParsedType::primitive("unknown"),
                    |first| self.lower(first, scope, next),
                );
                ParsedType::new(
                    TypeKind::Array {
                        element: Box::new(element),
                    },
                    raw,
                )
            }
            TypeExpr::Union(items) => self.lower_union(items, raw, scope, depth),
            TypeExpr::Intersection(items) => self.lower_intersection(items, raw, scope, depth),
            TypeExpr::Object(members) => {
                let mut ty = self.lower_members(members, scope, depth);
                ty.raw = raw;
                ty
            }
            TypeExpr::Function {
                type_params,
                params,
                ret,
            } => {
                let inner = self.bind(type_params, &[], scope, next);
                let params = self.lower_params(params, &inner, next);
                let return_type = self.lower(ret, &inner, next);
                ParsedType::new(
                    TypeKind::Function {
                        params,
                        return_type: Box::new(return_type),
                    },
                    raw,
                )
            }
            TypeExpr::TypeQuery(name) => {
                let symbols = self.symbols;
                match symbols.lookup_value(name) {
                    Some(ValueSymbol::Function { overloads, .. }) => match overloads.first() {
                        Some(sig) => {
                            let function = TypeExpr::Function {
                                type_params: sig.type_params.clone(),
                                params: sig.params.clone(),
                                ret: Box::new(sig.ret.clone()),
                            };
                            self.lower(&function, scope, next)
                        }
                        None => ParsedType::unknown(name),
                    },
                    Some(ValueSymbol::Variable { ty, .. }) => {
                        self.lower(ty, scope, next)
                    }
                    None => ParsedType::new(TypeKind::Unknown { name: raw.clone() }, raw),
                }
            }
            TypeExpr::Keyof(_) => {
                let mut ty = ParsedType::primitive("string");
                ty.raw = raw;
                ty
            }
            TypeExpr::Opaque(text) if text.starts_with('`') => {
                let mut ty = ParsedType::primitive("string");
                ty.raw = raw;
                ty
            }
            TypeExpr::Opaque(text) => ParsedType::new(TypeKind::Unknown { name: text.clone() }, raw),
        }
    }

    /// Parameters with destructuring patterns named `options`, `options1`, ...
    fn lower_params(&mut self, params: &[Param], scope: &Scope, depth: usize) -> Vec<ParsedParameter> {
        let mut lowered = Vec::new();
        for (index, param) in params.iter().enumerate() {
            let name = param.name.clone().unwrap_or_else(|| {
                if index == 0 {
                    "options".to_string()
                } else {
                    format!("options{index}")
                }
            });
            if param.rest
                && let TypeExpr::Ref {
                    name: utility,
                    args,
                } = &param.ty
                && utility == "Parameters"
                && let Some(target) = args.first()
                && let TypeKind::Function { params, .. } = self.lower(target, scope, depth + 1).kind
            {
                lowered.extend(params);
                continue;
            }
            let mut ty = self.lower(&param.ty, scope, depth + 1);
            let optional = param.optional || ty.is_nullable;
            ty.optional = param.optional;
            lowered.push(ParsedParameter {
                name,
                ty,
                optional,
                description: None,
            });
        }
        lowered
    }

    fn lower_ref(
        &mut self,
        name: &str,
        args: &[TypeExpr],
        raw: String,
        scope: &Scope,
        depth: usize,
    ) -> ParsedType {
        if args.is_empty()
            && let Some(bound) = scope.get(name)
        {
            return bound.clone();
        }
        let next = depth + 1;
        let arg = |builder: &mut Self, index: usize| {
            args.get(index).map_or_else(
                || ParsedType::primitive("unknown"),
                |a| builder.lower(a, scope, next),
            )
        };

        match name {
            "Promise" | "PromiseLike" => {
                let inner = arg(self, 0);
                return ParsedType::new(
                    TypeKind::Promise {
                        inner: Box::new(inner),
                    },
                    raw,
                );
            }
            "Array" | "ReadonlyArray" => {
                let element = arg(self, 0);
                return ParsedType::new(
                    TypeKind::Array {
                        element: Box::new(element),
                    },
                    raw,
                );
            }
            "Record" => {
                let key = arg(self, 0);
                let value = arg(self, 1);
                return ParsedType::new(
                    TypeKind::Record {
                        key: Box::new(key),
                        value: Box::new(value),
                    },
                    raw,
                );
            }
            "Partial" | "Required" | "Readonly" => {
                let mut inner = arg(self, 0);
                if name != "Readonly" {
                    set_optional(&mut inner, name == "Partial");
                }
                return inner;
            }
            "NonNullable" => {
                let mut inner = arg(self, 0);
                inner.is_nullable = false;
                return inner;
            }
            "Awaited" => return arg(self, 0).awaited().clone(),
            "Omit" | "Pick" => {
                let target = arg(self, 0);
                let keys = arg(self, 1);
                return pick(target, &keys, name == "Pick", raw);
            }
            "ReturnType" => {
                let target = arg(self, 0);
                return match target.kind {
                    TypeKind::Function { return_type, .. } => *return_type,
                    _ => ParsedType::new(TypeKind::Unknown { name: raw.clone() }, raw),
                };
            }
            "Parameters" => {
                let target = arg(self, 0);
                let element = match target.kind {
                    TypeKind::Function { params, .. } => params
                        .into_iter()
                        .next()
                        .map_or_else(|| ParsedType::primitive("unknown"), |p| p.ty),
                    _ => ParsedType::primitive("unknown"),
                };
                return ParsedType::new(
                    TypeKind::Array {
                        element: Box::new(element),
                    },
                    raw,
                );
            }
            "Function" => {
                return ParsedType::new(
                    TypeKind::Function {
                        params: Vec::new(),
                        return_type: Box::new(ParsedType::primitive("void")),
                    },
                    raw,
                );
            }
            _ => {}
        }

        if BUILTIN_OBJECTS.contains(&name) {
            return named_object(name, Vec::new(), raw);
        }
        if let Some(owner) = self.symbols.enum_of_member(name) {
            return named_object(owner, Vec::new(), raw);
        }
        let symbols = self.symbols;
        match symbols.lookup_type(name) {
            Some(symbol) => self.lower_symbol(name, symbol, args, raw, scope, depth),
            None => named_object(&clean_name(name), Vec::new(), raw),
        }
    }

    fn lower_symbol(
        &mut self,
        name: &str,
        symbol: &TypeSymbol,
        args: &[TypeExpr],
        raw: String,
        scope: &Scope,
        depth: usize,
    ) -> ParsedType {
        let key = name.rsplit('.').next().unwrap_or(name).to_string();
        if self.resolving.contains(&key) {
            return named_object(&key, Vec::new(), raw);
        }
        self.resolving.push(key.clone());
        let next = depth + 1;
        let lowered = match symbol {
            TypeSymbol::Interface {
                type_params,
                extends,
                members,
                ..
            } => {
                let inner = self.bind(type_params, args, scope, next);
                let mut ty = self.lower_members(members, &inner, next);
                if let TypeKind::Object { name, properties } = &mut ty.kind {
                    *name = Some(key.clone());
                    let mut inherited = Vec::new();
                    for base in extends {
                        let base = self.lower(base, &inner, next);
                        for prop in base.properties().unwrap_or_default() {
                            let shadowed = properties.iter().any(|p| p.name == prop.name)
                                || inherited.iter().any(|p: &Property| p.name == prop.name);
                            if !shadowed {
                                inherited.push(prop.clone());
                            }
                        }
                    }
                    inherited.append(properties);
                    *properties = inherited;
                }
                ty.raw = raw;
                ty
            }
            TypeSymbol::Alias { type_params, ty, .. } => {
                let inner = self.bind(type_params, args, scope, next);
                let mut lowered = self.lower(ty, &inner, next);
                match &mut lowered.kind {
                    TypeKind::Object { name: slot @ None, .. }
                    | TypeKind::Union { name: slot @ None, .. } => *slot = Some(key.clone()),
                    TypeKind::Unknown { name } => name.clone_from(&key),
                    _ => {}
                }
                lowered.raw = raw;
                lowered
            }
            TypeSymbol::Enum { .. } => named_object(&key, Vec::new(), raw),
        };
        self.resolving.pop();
        lowered
    }

    /// Binds generic parameters to arguments, then defaults, then constraints.
    fn bind(&mut self, params: &[TypeParam], args: &[TypeExpr], outer: &Scope, depth: usize) -> Scope {
        let mut scope = outer.clone();
        for (index, param) in params.iter().enumerate() {
            let bound = if let Some(arg) = args.get(index) {
                self.lower(arg, outer, depth)
            } else if let Some(default) = &param.default {
                self.lower(default, &scope, depth)
            } else if let Some(constraint) = &param.constraint {
                self.lower(constraint, &scope, depth)
            } else {
                ParsedType::primitive("unknown")
            };
            scope.insert(param.name.clone(), bound);
        }
        scope
    }

    /// Object members: a call signature makes the type callable, index-only objects are records.
    fn lower_members(&mut self, members: &[Member], scope: &Scope, depth: usize) -> ParsedType {
        let next = depth + 1;
        if let Some(call) = members.iter().find(|m| m.kind == MemberKind::Call) {
            return self.lower(&call.ty, scope, next);
        }
        let named: Vec<&Member> = members
            .iter()
            .filter(|m| matches!(m.kind, MemberKind::Property | MemberKind::Method))
            .collect();
        if named.is_empty()
            && let Some(Member {
                kind: MemberKind::Index(key),
                ty,
                ..
            }) = members.first()
        {
            let key = self.lower(key, scope, next);
            let value = self.lower(ty, scope, next);
            return ParsedType::new(
                TypeKind::Record {
                    key: Box::new(key),
                    value: Box::new(value),
                },
                "",
            );
        }
        let mut properties: Vec<Property> = Vec::new();
        for member in named {
            if properties.iter().any(|p| p.name == member.name) {
                continue;
            }
            let mut ty = self.lower(&member.ty, scope, next);
            let optional = member.optional || ty.is_nullable;
            ty.optional = member.optional;
            properties.push(Property {
                name: member.name.clone(),
                ty,
                optional,
                description: member
                    .doc
                    .as_deref()
                    .and_then(|doc| JsDoc::parse(doc).description),
            });
        }
        ParsedType::new(
            TypeKind::Object {
                name: None,
                properties,
            },
            "",
        )
    }

    fn lower_union(&mut self, items: &[TypeExpr], raw: String, scope: &Scope, depth: usize) -> ParsedType {
        let mut members: Vec<ParsedType> = Vec::new();
        let mut nullable = false;
        for item in items {
            let ty = self.lower(item, scope, depth + 1);
            if matches!(ty.primitive_name(), Some("null" | "undefined")) {
                nullable = true;
                continue;
            }
            nullable |= ty.is_nullable;
            match ty.kind {
                TypeKind::Union {
                    name: None,
                    members: inner,
                    shape: UnionShape::Plain,
                } => members.extend(inner),
                kind => members.push(ParsedType {
                    kind,
                    is_nullable: false,
                    ..ty
                }),
            }
        }

        let is_bool = |t: &ParsedType| {
            matches!(&t.kind, TypeKind::Primitive { literal: Some(Literal::Bool(_)), .. })
        };
        if members.iter().filter(|&t| is_bool(t)).count() == 2
            && let Some(index) = members.iter().position(is_bool)
        {
            members.retain(|t| !is_bool(t));
            members.insert(index, ParsedType::primitive("boolean"));
        }

        match members.len() {
            0 => {
                let mut ty = ParsedType::primitive("undefined");
                ty.raw = raw;
                ty.is_nullable = true;
                ty
            }
            1 => {
                let mut ty = members.remove(0);
                ty.is_nullable = nullable;
                ty.raw = raw;
                ty
            }
            _ => {
                let shape = detect::union_shape(&members);
                let mut ty = ParsedType::new(
                    TypeKind::Union {
                        name: None,
                        members,
                        shape,
                    },
                    raw,
                );
                ty.is_nullable = nullable;
                ty
            }
        }
    }

    /// Merges object and union-member properties; the first named part names the result.
    fn lower_intersection(
        &mut self,
        items: &[TypeExpr],
        raw: String,
        scope: &Scope,
        depth: usize,
    ) -> ParsedType {
        let parts: Vec<ParsedType> = items
            .iter()
            .map(|item| self.lower(item, scope, depth + 1))
            .collect();
        if let Some(primitive) = parts
            .iter()
            .find(|p| matches!(p.primitive_name(), Some("string" | "number" | "boolean")))
        {
            let mut ty = primitive.clone();
            ty.raw = raw;
            return ty;
        }
        if let Some(function) = parts
            .iter()
            .find(|p| matches!(p.kind, TypeKind::Function { .. }))
        {
            return function.clone();
        }

        let mut name = None;
        let mut properties: Vec<Property> = Vec::new();
        let mut merge = |props: &[Property]| {
            for prop in props {
                if !properties.iter().any(|p| p.name == prop.name) {
                    properties.push(prop.clone());
                }
            }
        };
        for part in &parts {
            match &part.kind {
                TypeKind::Object {
                    name: part_name,
                    properties: props,
                } => {
                    if name.is_none() {
                        name.clone_from(part_name);
                    }
                    merge(props);
                }
                TypeKind::Union { members, .. } => {
                    for member in members {
                        merge(member.properties().unwrap_or_default());
                    }
                }
                _ => {}
            }
        }
        named_object_opt(name, properties, raw)
    }
}

fn literal(name: &str, value: Literal, raw: String) -> ParsedType {
    ParsedType::new(
        TypeKind::Primitive {
            name: name.to_string(),
            literal: Some(value),
        },
        raw,
    )
}

fn named_object(name: &str, properties: Vec<Property>, raw: String) -> ParsedType {
    named_object_opt(Some(name.to_string()), properties, raw)
}

fn named_object_opt(name: Option<String>, properties: Vec<Property>, raw: String) -> ParsedType {
    ParsedType::new(TypeKind::Object { name, properties }, raw)
}

/// Placeholder for a type cut off by the depth guard.
fn opaque(raw: &str) -> ParsedType {
    named_object(&clean_name(raw), Vec::new(), raw.to_string())
}

fn set_optional(ty: &mut ParsedType, optional: bool) {
    if let TypeKind::Object { properties, .. } = &mut ty.kind {
        for prop in properties {
            prop.optional = optional;
            prop.ty.optional = optional;
        }
    }
}

/// `Pick<T, K>` / `Omit<T, K>` over string-literal keys; the result is anonymous.
fn pick(target: ParsedType, keys: &ParsedType, keep: bool, raw: String) -> ParsedType {
    let names: Vec<&str> = match keys.string_literal() {
        Some(key) => vec![key],
        None => keys.string_literal_members().unwrap_or_default(),
    };
    match target.kind {
        TypeKind::Object { properties, .. } => {
            let properties = properties
                .into_iter()
                .filter(|p| names.contains(&p.name.as_str()) == keep)
                .collect();
            named_object_opt(None, properties, raw)
        }
        kind => ParsedType { kind, raw, ..target },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::surface::{Decl, parse_source};

    fn build_alias(src: &str, alias: &str) -> ParsedType {
        let items = parse_source(src).unwrap();
        let mut symbols = SymbolTable::new();
        symbols.add_items(&items);
        let mut builder = TypeBuilder::new(&symbols, 32);
        builder.build(&TypeExpr::Ref {
            name: alias.into(),
            args: vec![],
        })
    }

    fn build_fn(src: &str, name: &str) -> (Vec<ParsedParameter>, ParsedType) {
        let items = parse_source(src).unwrap();
        let mut symbols = SymbolTable::new();
        symbols.add_items(&items);
        let sig = items
            .iter()
            .find_map(|item| match &item.decl {
                Decl::Function(sig) if sig.name == name => Some(sig.clone()),
                _ => None,
            })
            .unwrap();
        let mut builder = TypeBuilder::new(&symbols, 32);
        builder.build_signature(&sig.type_params, &sig.params, &sig.ret)
    }

    #[test]
    fn test_nullable_collapse() {
        let ty = build_alias("type A = string | null | undefined;", "A");
        assert_eq!(ty.primitive_name(), Some("string"));
        assert!(ty.is_nullable);
    }

    #[test]
    fn test_literal_union_keeps_alias_name() {
        let ty = build_alias("type Orientation = 'portrait' | 'landscape';", "Orientation");
        assert_eq!(ty.declared_name(), Some("Orientation"));
        assert_eq!(
            ty.string_literal_members().unwrap(),
            vec!["portrait", "landscape"]
        );
    }

    #[test]
    fn test_boolean_literals_collapse() {
        let ty = build_alias("type B = true | false | undefined;", "B");
        assert_eq!(ty.primitive_name(), Some("boolean"));
        assert!(ty.is_nullable);
    }

    #[test]
    fn test_interface_extends_and_generic_substitution() {
        let ty = build_alias(
            "interface Base<T> { value: T }\ninterface Child extends Base<number> { label?: string }\ntype C = Child;",
            "C",
        );
        let props = ty.properties().unwrap();
        assert_eq!(props[0].name, "value");
        assert_eq!(props[0].ty.primitive_name(), Some("number"));
        assert!(props[1].optional);
        assert_eq!(ty.declared_name(), Some("Child"));
    }

    #[test]
    fn test_intersection_merges_members() {
        let ty = build_alias(
            "interface A { a: string }\ntype I = A & { b: number } & ({ c: string } | { d: string });",
            "I",
        );
        let names: Vec<&str> = ty.properties().unwrap().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
        assert_eq!(ty.declared_name(), Some("A"));
    }

    #[test]
    fn test_callable_interface_with_parameters_and_return_type() {
        let src = "declare function getPermission(name: string): Promise<'allowed' | 'denied'>;\n\
                   interface PermissionFn<T extends (...a: any[]) => any> { (...args: Parameters<T>): ReturnType<T>; }\n\
                   type P = PermissionFn<typeof getPermission>;";
        let ty = build_alias(src, "P");
        let TypeKind::Function {
            params,
            return_type,
        } = ty.kind
        else {
            panic!("expected function, got {ty:?}");
        };
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].name, "name");
        assert!(matches!(return_type.kind, TypeKind::Promise { .. }));
    }

    #[test]
    fn test_destructured_params_named_by_index() {
        let (params, ret) = build_fn(
            "declare function f(a: string, { x }: { x: number }): Promise<void>;",
            "f",
        );
        assert_eq!(params[1].name, "options1");
        assert!(params[1].ty.is_anonymous_object());
        assert!(matches!(ret.kind, TypeKind::Promise { .. }));
    }

    #[test]
    fn test_self_reference_stops() {
        let ty = build_alias("interface Node { next?: Node; value: string }\ntype N = Node;", "N");
        let next = ty.property("next").unwrap();
        assert_eq!(next.ty.declared_name(), Some("Node"));
        assert!(next.ty.properties().unwrap().is_empty());
    }

    #[test]
    fn test_enum_member_reference_is_enum_object() {
        let ty = build_alias(
            "declare enum Accuracy { Low = 1, High = 2 }\ntype A = Accuracy.High;",
            "A",
        );
        assert_eq!(ty.declared_name(), Some("Accuracy"));
    }

    #[test]
    fn test_tagged_union_detected() {
        let ty = build_alias(
            "type R = { status: 'OK'; value: number } | { status: 'ERR'; code: string };",
            "R",
        );
        let TypeKind::Union {
            shape: UnionShape::Tagged(tagged),
            name,
            ..
        } = &ty.kind
        else {
            panic!("expected tagged union");
        };
        assert_eq!(name.as_deref(), Some("R"));
        assert_eq!(tagged.merged.len(), 3);
    }

    #[test]
    fn test_omit_and_partial() {
        let ty = build_alias(
            "interface O { a: string; b: number; c: boolean }\ntype X = Partial<Omit<O, 'b' | 'c'>>;",
            "X",
        );
        let props = ty.properties().unwrap();
        assert_eq!(props.len(), 1);
        assert!(props[0].optional);
        assert_eq!(ty.declared_name(), Some("X"));
    }
}
