//! Type collection: one C# class or enum per distinct name.
//!
//! Every API is walked depth first with the same owner/member naming the mapper uses, so
//! each name a generated signature mentions has exactly one definition. The first shape
//! collected under a name wins; later shapes under the same name are dropped with a
//! warning.

use std::collections::HashSet;

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, warn};

use crate::ir::mapper::{
    element_name, has_object_members, is_builtin, map_member_type, owned_name, synthesized_name,
};
use crate::ir::model::{
    EnumValue, Literal, ParsedApi, ParsedType, ParsedTypeDefinition, Property,
    TypeDefinitionKind, TypeKind, UnionShape,
};
use crate::ir::names::{clean_name, pascal_case};

/// Passes over the pending list before unresolved names become stubs.
const MAX_RESOLVE_PASSES: usize = 10;

/// One serialized field of a generated class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Property name on the wire.
    pub json_name: String,
    /// C# field name.
    pub name: String,
    /// C# type.
    pub ty: String,
    /// Declared optional.
    pub optional: bool,
    /// JSDoc text.
    pub description: Option<String>,
}

impl Field {
    /// Callback fields cannot be serialized.
    pub fn is_callback(&self) -> bool {
        self.ty.starts_with("System.Action") || self.ty.starts_with("System.Func")
    }
}

/// Body of a collected type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectedType {
    /// Plain serializable class.
    Class {
        /// Fields in declaration order.
        fields: Vec<Field>,
        /// Returned by an API; carries an extra `error` field.
        is_result: bool,
        /// JSDoc text.
        description: Option<String>,
    },
    /// Enum from a literal union or a declared enum.
    Enum {
        /// Members in declaration order.
        values: Vec<EnumValue>,
        /// JSDoc text.
        description: Option<String>,
    },
    /// `Success | "ERROR_A" | "ERROR_B"` wrapper.
    ResultUnion {
        /// C# type of the success payload.
        success: String,
        /// Error codes in declaration order.
        error_codes: Vec<String>,
    },
    /// Object union merged into one class with a discriminator.
    Tagged {
        /// Discriminator field on the wire.
        discriminator: String,
        /// Tag values in member order.
        tags: Vec<String>,
        /// Merged fields.
        fields: Vec<Field>,
    },
    /// Referenced name with no definition anywhere.
    Stub,
}

impl CollectedType {
    /// Short label used in logs and reports.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Class { .. } => "class",
            Self::Enum { .. } => "enum",
            Self::ResultUnion { .. } => "result",
            Self::Tagged { .. } => "tagged",
            Self::Stub => "stub",
        }
    }
}

/// Output of [`TypeCollector::finish`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeCollection {
    /// Collected types keyed by cleaned name, in collection order.
    pub types: IndexMap<String, CollectedType>,
    /// Named types referenced without properties, in first-seen order.
    pub externals: Vec<String>,
    /// Externals that never resolved and were emitted as stubs.
    pub unresolved: Vec<String>,
}

impl TypeCollection {
    /// Whether `name` is a collected enum.
    pub fn is_enum(&self, name: &str) -> bool {
        matches!(self.types.get(name), Some(CollectedType::Enum { .. }))
    }

    /// Whether `name` is a collected class-like type.
    pub fn is_class(&self, name: &str) -> bool {
        matches!(
            self.types.get(name),
            Some(
                CollectedType::Class { .. }
                    | CollectedType::ResultUnion { .. }
                    | CollectedType::Tagged { .. }
                    | CollectedType::Stub
            )
        )
    }
}

/// Walks APIs and type definitions into a [`TypeCollection`].
#[derive(Debug)]
pub struct TypeCollector<'d> {
    definitions: &'d [ParsedTypeDefinition],
    max_depth: usize,
    types: IndexMap<String, CollectedType>,
    in_progress: HashSet<String>,
    pending: IndexSet<String>,
    externals: IndexSet<String>,
}

impl<'d> TypeCollector<'d> {
    /// Creates a collector that resolves external names against `definitions`.
    pub fn new(definitions: &'d [ParsedTypeDefinition], max_depth: usize) -> Self {
        Self {
            definitions,
            max_depth,
            types: IndexMap::new(),
            in_progress: HashSet::new(),
            pending: IndexSet::new(),
            externals: IndexSet::new(),
        }
    }

    /// Collects every type reachable from one API.
    pub fn collect_api(&mut self, api: &ParsedApi) {
        let owner = api.pascal_name.as_str();
        for param in &api.parameters {
            self.visit(&param.ty, owner, &param.name, 0);
        }

        let returned = api.return_type.awaited();
        match &returned.kind {
            TypeKind::Object {
                name, properties, ..
            } if !properties.is_empty() => {
                let class = name
                    .as_deref()
                    .map_or_else(|| owned_name(owner, "result"), clean_name);
                self.add_class(&class, properties, true, None, 0);
            }
            _ => self.visit(returned, owner, "result", 0),
        }

        if let Some(data) = api.event_data() {
            self.visit(data, owner, "data", 0);
        }
        for callback in &api.nested_callbacks {
            if let Some(param) = &callback.parameter_type {
                self.visit(param, owner, &callback.name, 0);
            }
        }
    }

    /// Adds the remaining definitions, resolves pending externals and returns the result.
    ///
    /// Definitions go first so names they reference are resolved or stubbed too.
    pub fn finish(mut self) -> TypeCollection {
        let definitions = self.definitions;
        for definition in definitions {
            if !self.types.contains_key(&definition.name) {
                self.add_definition(&definition.name);
            }
        }

        let mut unresolved = IndexSet::new();
        for pass in 0..MAX_RESOLVE_PASSES {
            if self.pending.is_empty() {
                break;
            }
            debug!("Resolving {} external types (pass {pass})", self.pending.len());
            let batch: Vec<String> = self.pending.drain(..).collect();
            for name in batch {
                if self.types.contains_key(&name) {
                    continue;
                }
                if !self.add_definition(&name) {
                    unresolved.insert(name);
                }
            }
        }
        unresolved.extend(self.pending.drain(..));
        unresolved.retain(|name| !self.types.contains_key(name));
        for name in &unresolved {
            warn!("Type {name} has no definition, emitting a stub class");
            self.types.insert(name.clone(), CollectedType::Stub);
        }

        TypeCollection {
            types: self.types,
            externals: self.externals.into_iter().collect(),
            unresolved: unresolved.into_iter().collect(),
        }
    }

    fn add_definition(&mut self, name: &str) -> bool {
        let definitions = self.definitions;
        let Some(definition) = definitions.iter().find(|d| d.name == name) else {
            return false;
        };
        match &definition.kind {
            TypeDefinitionKind::Enum { values } => {
                self.types.insert(
                    definition.name.clone(),
                    CollectedType::Enum {
                        values: values.clone(),
                        description: definition.description.clone(),
                    },
                );
                true
            }
            TypeDefinitionKind::Interface { properties } if !properties.is_empty() => {
                self.add_class(
                    &definition.name,
                    properties,
                    false,
                    definition.description.clone(),
                    0,
                );
                true
            }
            TypeDefinitionKind::Interface { .. } => false,
        }
    }

    fn visit(&mut self, ty: &ParsedType, owner: &str, member: &str, depth: usize) {
        if depth > self.max_depth {
            warn!("Type depth limit reached at {owner}.{member}");
            return;
        }
        let next = depth + 1;
        match &ty.kind {
            TypeKind::Primitive { .. } => {}
            TypeKind::Promise { inner } => self.visit(inner, owner, member, depth),
            TypeKind::Array { element } => {
                if synthesized_name(element, owner, member).is_some() {
                    self.collect_shape(element, &element_name(owner, member), next);
                } else {
                    self.visit(element, owner, member, next);
                }
            }
            TypeKind::Function { params, .. } => {
                for param in params {
                    self.visit(&param.ty, owner, member, next);
                }
            }
            TypeKind::Record { value, .. } => {
                if !matches!(value.kind, TypeKind::Union { .. }) {
                    self.visit(value, owner, member, next);
                }
            }
            TypeKind::Object { name: Some(name), properties } => {
                if is_builtin(name) {
                    return;
                }
                let cleaned = clean_name(name);
                if properties.is_empty() {
                    self.mark_external(cleaned);
                } else {
                    self.add_class(&cleaned, properties, false, None, next);
                }
            }
            TypeKind::Object { name: None, .. } => {
                if let Some(synthesized) = synthesized_name(ty, owner, member) {
                    self.collect_shape(ty, &synthesized, next);
                }
            }
            TypeKind::Union { name, members, .. } => {
                if let Some(synthesized) = synthesized_name(ty, owner, member) {
                    self.collect_shape(ty, &synthesized, next);
                } else if let Some(name) = name
                    && (ty.string_literal_members().is_some() || has_object_members(ty))
                {
                    self.collect_shape(ty, &clean_name(name), next);
                } else {
                    for m in members {
                        self.visit(m, owner, member, next);
                    }
                }
            }
            TypeKind::Unknown { name } => {
                if name.contains('.') {
                    let cleaned = clean_name(name);
                    if !cleaned.is_empty() && !is_builtin(&cleaned) {
                        self.mark_external(cleaned);
                    }
                }
            }
        }
    }

    /// Collects an object or union under an already decided name.
    fn collect_shape(&mut self, ty: &ParsedType, name: &str, depth: usize) {
        match &ty.kind {
            TypeKind::Object { properties, .. } => {
                self.add_class(name, properties, false, None, depth);
            }
            TypeKind::Union { members, shape, .. } => {
                if let Some(literals) = ty.string_literal_members() {
                    let values = literals
                        .into_iter()
                        .map(|value| EnumValue {
                            name: None,
                            value: Literal::String(value.to_string()),
                        })
                        .collect();
                    self.insert(
                        name,
                        CollectedType::Enum {
                            values,
                            description: None,
                        },
                    );
                    return;
                }
                match shape {
                    UnionShape::Result {
                        success,
                        error_codes,
                    } => {
                        self.visit(success, name, "success", depth);
                        let success = map_member_type(success, name, "success");
                        self.insert(
                            name,
                            CollectedType::ResultUnion {
                                success,
                                error_codes: error_codes.clone(),
                            },
                        );
                    }
                    UnionShape::Tagged(tagged) => {
                        if !self.begin(name) {
                            return;
                        }
                        for prop in &tagged.merged {
                            self.visit(&prop.ty, name, &prop.name, depth + 1);
                        }
                        let fields = fields(name, &tagged.merged);
                        self.in_progress.remove(name);
                        self.insert(
                            name,
                            CollectedType::Tagged {
                                discriminator: tagged.discriminator.clone(),
                                tags: tagged.tags.clone(),
                                fields,
                            },
                        );
                    }
                    UnionShape::Plain => {
                        let merged = merge_members(members);
                        self.add_class(name, &merged, false, None, depth);
                    }
                }
            }
            _ => self.visit(ty, name, "", depth),
        }
    }

    fn add_class(
        &mut self,
        name: &str,
        properties: &[Property],
        is_result: bool,
        description: Option<String>,
        depth: usize,
    ) {
        if !self.begin(name) {
            if let Some(CollectedType::Class {
                fields: existing, ..
            }) = self.types.get(name)
                && *existing != fields(name, properties)
            {
                warn!("Type {name} collected twice with different shapes, keeping the first");
            }
            return;
        }
        for prop in properties {
            self.visit(&prop.ty, name, &prop.name, depth + 1);
        }
        let fields = fields(name, properties);
        self.in_progress.remove(name);
        self.insert(
            name,
            CollectedType::Class {
                fields,
                is_result,
                description,
            },
        );
    }

    /// Marks `name` as being collected; false when it already exists or is in progress.
    fn begin(&mut self, name: &str) -> bool {
        if self.types.contains_key(name) || self.in_progress.contains(name) {
            return false;
        }
        self.in_progress.insert(name.to_string());
        true
    }

    fn insert(&mut self, name: &str, collected: CollectedType) {
        match self.types.get(name) {
            Some(existing) if *existing != collected => {
                warn!(
                    "Type {name} already collected as {}, dropping {} shape",
                    existing.kind_name(),
                    collected.kind_name()
                );
            }
            Some(_) => {}
            None => {
                debug!("Collected {} {name}", collected.kind_name());
                self.types.insert(name.to_string(), collected);
            }
        }
    }

    fn mark_external(&mut self, name: String) {
        if name.is_empty() || self.types.contains_key(&name) || self.in_progress.contains(&name) {
            return;
        }
        self.externals.insert(name.clone());
        self.pending.insert(name);
    }
}

/// Fields of a class named `owner`.
pub fn fields(owner: &str, properties: &[Property]) -> Vec<Field> {
    properties
        .iter()
        .map(|prop| Field {
            json_name: prop.name.clone(),
            name: field_name(owner, &prop.name),
            ty: map_member_type(&prop.ty, owner, &prop.name),
            optional: prop.optional,
            description: prop.description.clone(),
        })
        .collect()
}

/// C# field name; a field cannot share its class name.
fn field_name(owner: &str, json_name: &str) -> String {
    let name: String = pascal_case(json_name)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    let name = if name.starts_with(|c: char| c.is_ascii_digit()) || name.is_empty() {
        format!("_{name}")
    } else {
        name
    };
    if name == owner {
        format!("{name}Value")
    } else {
        name
    }
}

/// Properties of all object members, first declaration wins.
///
/// A property stays required only when every object member declares it as required.
fn merge_members(members: &[ParsedType]) -> Vec<Property> {
    let objects: Vec<&[Property]> = members
        .iter()
        .filter_map(ParsedType::properties)
        .filter(|p| !p.is_empty())
        .collect();
    let mut merged: Vec<Property> = Vec::new();
    for props in &objects {
        for prop in *props {
            if merged.iter().any(|m| m.name == prop.name) {
                continue;
            }
            let everywhere = objects
                .iter()
                .all(|other| other.iter().any(|p| p.name == prop.name && !p.optional));
            let mut merged_prop = prop.clone();
            merged_prop.optional = !everywhere;
            merged.push(merged_prop);
        }
    }
    merged
}

/// Collects every type used by `apis` plus all standalone definitions.
pub fn collect_types(
    apis: &[ParsedApi],
    definitions: &[ParsedTypeDefinition],
    max_depth: usize,
) -> TypeCollection {
    let mut collector = TypeCollector::new(definitions, max_depth);
    for api in apis {
        collector.collect_api(api);
    }
    let collection = collector.finish();
    debug!(
        "Collected {} types ({} stubs)",
        collection.types.len(),
        collection.unresolved.len()
    );
    collection
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use crate::surface::{SymbolTable, parse_source, scan_symbols};

    fn collect(src: &str) -> TypeCollection {
        let mut symbols = SymbolTable::new();
        symbols.add_items(&parse_source(src).unwrap());
        let config = GeneratorConfig {
            fallback_category: Some("Other".into()),
            ..GeneratorConfig::default()
        };
        let scan = scan_symbols(&symbols, &config).unwrap();
        collect_types(&scan.apis, &scan.definitions, 32)
    }

    fn class_fields<'c>(collection: &'c TypeCollection, name: &str) -> &'c [Field] {
        match collection.types.get(name) {
            Some(CollectedType::Class { fields, .. } | CollectedType::Tagged { fields, .. }) => {
                fields
            }
            other => unreachable!("{name} is not a class: {other:?}"),
        }
    }

    #[test]
    fn test_same_param_name_different_owners() {
        let collection = collect(
            r#"
export declare function openA(options: { url: string }): Promise<void>;
export declare function openB(options: { count: number }): Promise<void>;
"#,
        );
        assert_eq!(class_fields(&collection, "OpenAOptions")[0].ty, "string");
        assert_eq!(class_fields(&collection, "OpenBOptions")[0].ty, "double");
    }

    #[test]
    fn test_inline_literal_union_becomes_enum() {
        let collection = collect(
            r#"
export declare function setDeviceOrientation(options: { type: "portrait" | "landscape" }): Promise<void>;
"#,
        );
        let fields = class_fields(&collection, "SetDeviceOrientationOptions");
        assert_eq!(fields[0].ty, "SetDeviceOrientationOptionsType");
        let Some(CollectedType::Enum { values, .. }) =
            collection.types.get("SetDeviceOrientationOptionsType")
        else {
            unreachable!("enum expected");
        };
        let literals: Vec<&Literal> = values.iter().map(|v| &v.value).collect();
        assert_eq!(
            literals,
            vec![
                &Literal::String("portrait".into()),
                &Literal::String("landscape".into())
            ]
        );
    }

    #[test]
    fn test_result_and_array_elements() {
        let collection = collect(
            r#"
export declare function getOrders(): Promise<{ orders: { orderId: string }[]; hasNext: boolean }>;
"#,
        );
        let Some(CollectedType::Class {
            fields, is_result, ..
        }) = collection.types.get("GetOrdersResult")
        else {
            unreachable!("result class expected");
        };
        assert!(is_result);
        assert_eq!(fields[0].ty, "GetOrdersResultOrder[]");
        assert!(collection.types.contains_key("GetOrdersResultOrder"));
    }

    #[test]
    fn test_result_union_and_tagged_union() {
        let collection = collect(
            r#"
type Outcome = { status: "OK"; value: number } | { status: "ERR"; code: string };
export declare function check(): Promise<Outcome>;
export declare function buy(): Promise<{ orderId: string } | "USER_CANCELED" | "FAILED">;
"#,
        );
        let Some(CollectedType::Tagged {
            discriminator,
            tags,
            fields,
        }) = collection.types.get("Outcome")
        else {
            unreachable!("tagged union expected");
        };
        assert_eq!(discriminator, "status");
        assert_eq!(tags, &vec!["OK".to_string(), "ERR".to_string()]);
        let optional: Vec<(&str, bool)> =
            fields.iter().map(|f| (f.name.as_str(), f.optional)).collect();
        assert_eq!(
            optional,
            vec![("Status", false), ("Value", true), ("Code", true)]
        );

        let Some(CollectedType::ResultUnion {
            success,
            error_codes,
        }) = collection.types.get("BuyResult")
        else {
            unreachable!("result union expected");
        };
        assert_eq!(success, "BuyResultSuccess");
        assert_eq!(error_codes, &vec!["USER_CANCELED".to_string(), "FAILED".to_string()]);
        assert!(collection.types.contains_key("BuyResultSuccess"));
    }

    #[test]
    fn test_externals_resolve_or_stub() {
        let collection = collect(
            r#"
export interface Known { id: string }
export declare function a(x: import("./m").Known): Promise<void>;
export declare function b(x: import("./m").Missing): Promise<void>;
"#,
        );
        assert_eq!(collection.externals, vec!["Missing"]);
        assert!(matches!(
            collection.types.get("Known"),
            Some(CollectedType::Class { .. })
        ));
        assert_eq!(collection.types.get("Missing"), Some(&CollectedType::Stub));
        assert_eq!(collection.unresolved, vec!["Missing"]);
    }

    #[test]
    fn test_standalone_definition_externals_are_stubbed() {
        let collection = collect(
            r#"
export interface Standalone { dep: Missing; label: string }
export declare function getLocale(): Promise<string>;
"#,
        );
        assert_eq!(class_fields(&collection, "Standalone")[0].ty, "Missing");
        assert_eq!(collection.types.get("Missing"), Some(&CollectedType::Stub));
        assert_eq!(collection.unresolved, vec!["Missing"]);
    }

    #[test]
    fn test_self_reference_terminates() {
        let collection = collect(
            r#"
interface Node { name: string; children: Node[] }
export declare function tree(): Promise<Node>;
"#,
        );
        let fields = class_fields(&collection, "Node");
        assert_eq!(fields[1].ty, "Node[]");
    }

    #[test]
    fn test_callback_fields_and_names() {
        let fields = fields(
            "Options",
            &[
                Property {
                    name: "options".into(),
                    ty: ParsedType::primitive("string"),
                    optional: false,
                    description: None,
                },
                Property {
                    name: "on-done".into(),
                    ty: ParsedType::new(
                        TypeKind::Function {
                            params: vec![],
                            return_type: Box::new(ParsedType::primitive("void")),
                        },
                        "() => void",
                    ),
                    optional: true,
                    description: None,
                },
            ],
        );
        assert_eq!(fields[0].name, "OptionsValue");
        assert_eq!(fields[1].name, "OnDone");
        assert!(fields[1].is_callback());
    }
}
