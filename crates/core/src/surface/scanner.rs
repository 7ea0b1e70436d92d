//! Walks the declaration files and classifies every exported value into APIs.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::ast::{EnumInit, EnumMember, Member, TypeExpr};
use super::jsdoc::JsDoc;
use super::parser::parse_source;
use super::symbols::{SymbolTable, TypeSymbol, ValueSymbol};
use crate::categories::resolve_category;
use crate::config::GeneratorConfig;
use crate::error::{GeneratorError, Result};
use crate::ir::builder::TypeBuilder;
use crate::ir::detect;
use crate::ir::model::{
    ApiKind, EnumValue, Literal, ParsedApi, ParsedParameter, ParsedType, ParsedTypeDefinition,
    TypeDefinitionKind, TypeKind,
};
use crate::ir::names::{capitalize, pascal_case};

const DECLARATION_SUFFIXES: &[&str] = &[".d.ts", ".d.cts", ".d.mts"];
const EVENT_LISTENER: &str = "addEventListener";

/// Everything the scanner extracted from a source directory.
#[derive(Debug, Clone, Default)]
pub struct SurfaceScan {
    /// APIs in declaration order, categories resolved.
    pub apis: Vec<ParsedApi>,
    /// Standalone enums and interfaces.
    pub definitions: Vec<ParsedTypeDefinition>,
}

/// Declaration files under `dir`, sorted by path.
pub fn discover_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(GeneratorError::SourceNotFound(dir.display().to_string()));
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            GeneratorError::io(path, std::io::Error::other(e.to_string()))
        })?;
        let name = entry.file_name().to_string_lossy();
        if entry.file_type().is_file() && DECLARATION_SUFFIXES.iter().any(|s| name.ends_with(s)) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Parses every file into one symbol table. Earlier paths win on name conflicts.
pub fn load_symbols(files: &[PathBuf]) -> Result<SymbolTable> {
    let mut symbols = SymbolTable::new();
    for file in files {
        let src = std::fs::read_to_string(file).map_err(|e| GeneratorError::io(file, e))?;
        let items = parse_source(&src).map_err(|e| GeneratorError::Parse {
            file: file.clone(),
            message: e.to_string(),
        })?;
        debug!("Parsed {} ({} items)", file.display(), items.len());
        symbols.add_items(&items);
    }
    Ok(symbols)
}

/// Scans a source directory.
pub fn scan_dir(dir: &Path, config: &GeneratorConfig) -> Result<SurfaceScan> {
    let files = discover_files(dir)?;
    info!("Scanning {} declaration files in {}", files.len(), dir.display());
    let symbols = load_symbols(&files)?;
    let scan = scan_symbols(&symbols, config)?;
    if scan.apis.is_empty() {
        return Err(GeneratorError::NoApis(dir.to_path_buf()));
    }
    Ok(scan)
}

/// Classifies exported values and collects type definitions.
///
/// Fails with [`GeneratorError::MissingCategory`] listing every API without a category.
pub fn scan_symbols(symbols: &SymbolTable, config: &GeneratorConfig) -> Result<SurfaceScan> {
    let mut scanner = Scanner {
        symbols,
        builder: TypeBuilder::new(symbols, config.max_type_depth),
        apis: Vec::new(),
        seen: HashSet::new(),
    };
    for (name, value) in symbols.exported_values() {
        scanner.scan_value(name, value);
    }
    let definitions = scanner.definitions();

    let mut apis = scanner.apis;
    let before = apis.len();
    apis.retain(|api| !config.exclude.contains(&api.name));
    if apis.len() != before {
        debug!("Excluded {} APIs by configuration", before - apis.len());
    }
    assign_categories(&mut apis, config)?;

    info!(
        "Found {} APIs and {} type definitions",
        apis.len(),
        definitions.len()
    );
    Ok(SurfaceScan { apis, definitions })
}

/// Resolves every API's category, failing with all unmapped names at once.
pub fn assign_categories(apis: &mut [ParsedApi], config: &GeneratorConfig) -> Result<()> {
    let mut missing = Vec::new();
    for api in apis.iter_mut() {
        match resolve_category(&api.name, api.is_event_subscription(), config) {
            Some(category) => api.category = category,
            None => missing.push(api.name.clone()),
        }
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(GeneratorError::MissingCategory(missing))
    }
}

struct Scanner<'a> {
    symbols: &'a SymbolTable,
    builder: TypeBuilder<'a>,
    apis: Vec<ParsedApi>,
    seen: HashSet<String>,
}

impl Scanner<'_> {
    fn scan_value(&mut self, name: &str, value: &ValueSymbol) {
        match value {
            ValueSymbol::Function { overloads, doc } => {
                let Some(sig) = overloads.first() else {
                    return;
                };
                let (params, ret) =
                    self.builder
                        .build_signature(&sig.type_params, &sig.params, &sig.ret);
                self.push(function_api(name, name, None, params, ret, doc.as_deref()));
            }
            ValueSymbol::Variable { ty, doc } => {
                let members = self.declared_members(ty);
                if let Some(listener) = members.iter().find(|m| m.name == EVENT_LISTENER) {
                    let listener = listener.clone();
                    self.scan_events(name, &listener);
                    return;
                }
                let lowered = self.builder.build(ty);
                match &lowered.kind {
                    TypeKind::Function {
                        params,
                        return_type,
                    } => {
                        let api = function_api(
                            name,
                            name,
                            None,
                            params.clone(),
                            (**return_type).clone(),
                            doc.as_deref(),
                        );
                        self.push(api);
                    }
                    TypeKind::Object { properties, .. } => {
                        let mut methods = 0;
                        for prop in properties {
                            let TypeKind::Function {
                                params,
                                return_type,
                            } = &prop.ty.kind
                            else {
                                continue;
                            };
                            let doc = members
                                .iter()
                                .find(|m| m.name == prop.name)
                                .and_then(|m| m.doc.as_deref());
                            let api = function_api(
                                &format!("{name}{}", capitalize(&prop.name)),
                                &prop.name,
                                Some(name),
                                params.clone(),
                                (**return_type).clone(),
                                doc,
                            );
                            self.push(api);
                            methods += 1;
                        }
                        debug!("Namespace {name}: {methods} methods");
                    }
                    _ => debug!("Skipping non-callable export {name}"),
                }
            }
        }
    }

    /// Syntactic members of an inline object type or a referenced interface.
    fn declared_members(&self, ty: &TypeExpr) -> Vec<Member> {
        match ty {
            TypeExpr::Object(members) => members.clone(),
            TypeExpr::Ref { name, .. } => match self.symbols.lookup_type(name) {
                Some(TypeSymbol::Interface { members, .. }) => members.clone(),
                Some(TypeSymbol::Alias { ty, .. }) => self.declared_members(ty),
                _ => Vec::new(),
            },
            _ => Vec::new(),
        }
    }

    /// One subscription API per event map entry that has an `onEvent` callback.
    fn scan_events(&mut self, namespace: &str, listener: &Member) {
        let pascal_namespace = pascal_case(namespace);
        let event_map = event_map_of(listener).unwrap_or_else(|| TypeExpr::Ref {
            name: pascal_namespace.clone(),
            args: Vec::new(),
        });
        let map_members = self.declared_members(&event_map);
        let map = self.builder.build(&event_map);
        let Some(events) = map.properties() else {
            warn!("Event namespace {namespace} has no resolvable event map `{event_map}`");
            return;
        };

        let prefix = pascal_namespace
            .strip_suffix("Event")
            .unwrap_or(&pascal_namespace);
        for event in events {
            let Some(on_event) = event.ty.property("onEvent") else {
                continue;
            };
            let TypeKind::Function { params, .. } = &on_event.ty.kind else {
                continue;
            };
            let event_data = params.first().map(|param| {
                let mut data = param.ty.clone();
                if let TypeKind::Object { name, .. } = &mut data.kind
                    && name.is_none()
                {
                    *name = Some(format!("{prefix}{}Data", pascal_case(&event.name)));
                }
                Box::new(data)
            });
            let name = format!("{pascal_namespace}Subscribe{}", pascal_case(&event.name));
            let description = map_members
                .iter()
                .find(|m| m.name == event.name)
                .and_then(|m| m.doc.as_deref())
                .and_then(|doc| JsDoc::parse(doc).description)
                .or_else(|| Some(format!("Subscribes to the {namespace}.{} event.", event.name)));
            let disposer = ParsedType::new(
                TypeKind::Function {
                    params: Vec::new(),
                    return_type: Box::new(ParsedType::primitive("void")),
                },
                "() => void",
            );
            self.push(ParsedApi {
                pascal_name: name.clone(),
                name,
                original_name: EVENT_LISTENER.to_string(),
                category: String::new(),
                namespace: Some(namespace.to_string()),
                parameters: Vec::new(),
                return_type: disposer,
                is_async: false,
                kind: ApiKind::EventSubscription {
                    event_name: event.name.clone(),
                    event_data,
                },
                nested_callbacks: Vec::new(),
                deprecated: None,
                description,
            });
        }
    }

    fn push(&mut self, api: ParsedApi) {
        if self.seen.insert(api.name.clone()) {
            self.apis.push(api);
        } else {
            warn!("Duplicate API name {}, keeping the first declaration", api.name);
        }
    }

    fn definitions(&mut self) -> Vec<ParsedTypeDefinition> {
        let mut definitions = Vec::new();
        for (public, local, symbol) in self.symbols.exported_types() {
            let description = symbol.doc().and_then(|doc| JsDoc::parse(doc).description);
            let kind = match symbol {
                TypeSymbol::Enum { members, .. } => Some(TypeDefinitionKind::Enum {
                    values: enum_values(members),
                }),
                TypeSymbol::Interface { .. } | TypeSymbol::Alias { .. } => {
                    let ty = self.builder.build(&TypeExpr::Ref {
                        name: local.to_string(),
                        args: Vec::new(),
                    });
                    definition_kind(&ty)
                }
            };
            match kind {
                Some(kind) => definitions.push(ParsedTypeDefinition {
                    name: public.to_string(),
                    kind,
                    description,
                }),
                None => debug!("Type {public} is not an enum or interface, skipped"),
            }
        }
        definitions
    }
}

fn function_api(
    name: &str,
    original_name: &str,
    namespace: Option<&str>,
    mut parameters: Vec<ParsedParameter>,
    return_type: ParsedType,
    doc: Option<&str>,
) -> ParsedApi {
    let doc = doc.map(JsDoc::parse).unwrap_or_default();
    for param in &mut parameters {
        if let Some(text) = doc.params.get(&param.name) {
            param.description = Some(text.clone());
        }
    }
    let callback_based = detect::is_callback_based(&parameters, &return_type);
    let is_async = !callback_based && matches!(return_type.kind, TypeKind::Promise { .. });
    let nested_callbacks = detect::nested_callbacks(&parameters);
    ParsedApi {
        name: name.to_string(),
        pascal_name: pascal_case(name),
        original_name: original_name.to_string(),
        category: String::new(),
        namespace: namespace.map(str::to_string),
        parameters,
        return_type,
        is_async,
        kind: if callback_based {
            ApiKind::CallbackBased
        } else {
            ApiKind::Function
        },
        nested_callbacks,
        deprecated: doc.deprecated,
        description: doc.description,
    }
}

/// Event map named by `addEventListener<K extends keyof Map>`.
fn event_map_of(listener: &Member) -> Option<TypeExpr> {
    let TypeExpr::Function { type_params, .. } = &listener.ty else {
        return None;
    };
    type_params.iter().find_map(|param| match &param.constraint {
        Some(TypeExpr::Keyof(inner)) => Some((**inner).clone()),
        _ => None,
    })
}

fn enum_values(members: &[EnumMember]) -> Vec<EnumValue> {
    let mut next: i64 = 0;
    members
        .iter()
        .map(|member| {
            let value = match &member.value {
                Some(EnumInit::Str(text)) => Literal::String(text.clone()),
                Some(EnumInit::Num(text)) => {
                    if let Ok(n) = text.parse::<i64>() {
                        next = n + 1;
                    }
                    Literal::Number(text.clone())
                }
                None => {
                    let value = Literal::Number(next.to_string());
                    next += 1;
                    value
                }
            };
            EnumValue {
                name: Some(member.name.clone()),
                value,
            }
        })
        .collect()
}

fn definition_kind(ty: &ParsedType) -> Option<TypeDefinitionKind> {
    if let Some(literals) = ty.string_literal_members() {
        return Some(TypeDefinitionKind::Enum {
            values: literals
                .into_iter()
                .map(|value| EnumValue {
                    name: None,
                    value: Literal::String(value.to_string()),
                })
                .collect(),
        });
    }
    match ty.properties() {
        Some(properties) if !properties.is_empty() => Some(TypeDefinitionKind::Interface {
            properties: properties.to_vec(),
        }),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn scan(src: &str) -> SurfaceScan {
        scan_with(src, &GeneratorConfig {
            fallback_category: Some("Other".into()),
            ..GeneratorConfig::default()
        })
    }

    fn scan_with(src: &str, config: &GeneratorConfig) -> SurfaceScan {
        let mut symbols = SymbolTable::new();
        symbols.add_items(&parse_source(src).unwrap());
        scan_symbols(&symbols, config).unwrap()
    }

    fn api<'s>(scan: &'s SurfaceScan, name: &str) -> &'s ParsedApi {
        scan.apis.iter().find(|a| a.name == name).unwrap()
    }

    #[test]
    fn test_free_functions_and_docs() {
        let scan = scan(
            r#"
/**
 * Reads the clipboard.
 * @param format Output format
 * @deprecated Use readText instead.
 */
export declare function getClipboardText(format?: string): Promise<string>;
export declare const closeView: () => Promise<void>;
"#,
        );
        let clip = api(&scan, "getClipboardText");
        assert_eq!(clip.pascal_name, "GetClipboardText");
        assert_eq!(clip.category, "Clipboard");
        assert!(clip.is_async);
        assert_eq!(clip.description.as_deref(), Some("Reads the clipboard."));
        assert_eq!(
            clip.parameters[0].description.as_deref(),
            Some("Output format")
        );
        assert!(clip.parameters[0].optional);
        assert_eq!(clip.deprecated.as_deref(), Some("Use readText instead."));
        assert_eq!(api(&scan, "closeView").category, "Navigation");
    }

    #[test]
    fn test_namespace_methods() {
        let scan = scan(
            r#"
declare function getItem(key: string): Promise<string | null>;
export declare const Storage: {
    /** Reads one key. */
    getItem: typeof getItem;
    setItem(key: string, value: string): Promise<void>;
    version: string;
};
"#,
        );
        assert_eq!(scan.apis.len(), 2);
        let get = api(&scan, "StorageGetItem");
        assert_eq!(get.original_name, "getItem");
        assert_eq!(get.namespace.as_deref(), Some("Storage"));
        assert_eq!(get.category, "Storage");
        assert_eq!(get.description.as_deref(), Some("Reads one key."));
        assert_eq!(api(&scan, "StorageSetItem").parameters.len(), 2);
    }

    #[test]
    fn test_event_namespace() {
        let scan = scan(
            r#"
interface TdsEvent {
    navigationAccessoryEvent: {
        onEvent: (data: { id: string }) => void;
        onError?: (error: Error) => void;
    };
    backEvent: {
        onEvent: () => void;
    };
}
export declare const tdsEvent: {
    addEventListener: <K extends keyof TdsEvent>(event: K, handlers: TdsEvent[K]) => () => void;
};
"#,
        );
        let nav = api(&scan, "TdsEventSubscribeNavigationAccessoryEvent");
        assert_eq!(nav.original_name, "addEventListener");
        assert_eq!(nav.category, "AppEvents");
        assert_eq!(nav.event_name(), Some("navigationAccessoryEvent"));
        assert_eq!(
            nav.event_data().unwrap().declared_name(),
            Some("TdsNavigationAccessoryEventData")
        );
        let back = api(&scan, "TdsEventSubscribeBackEvent");
        assert!(back.event_data().is_none());
        assert!(!back.is_async);
    }

    #[test]
    fn test_callback_based_with_nested_callbacks() {
        let scan = scan(
            r#"
interface Order { orderId: string }
export declare function createOrder(params: {
    options: { sku: string; processProductGrant: (p: { orderId: string }) => Promise<boolean> };
    onEvent: (event: Order) => void;
    onError: (error: unknown) => void;
}): () => void;
"#,
        );
        let order = api(&scan, "createOrder");
        assert!(order.is_callback_based());
        assert!(!order.is_async);
        assert_eq!(order.nested_callbacks.len(), 1);
        assert_eq!(
            order.nested_callbacks[0].path,
            vec!["options", "processProductGrant"]
        );
    }

    #[test]
    fn test_exclude_and_missing_category() {
        let src = "export declare function debugOnly(): void;\nexport declare function unknownApi(): void;";
        let config = GeneratorConfig {
            exclude: vec!["debugOnly".into()],
            ..GeneratorConfig::default()
        };
        let mut symbols = SymbolTable::new();
        symbols.add_items(&parse_source(src).unwrap());
        let err = scan_symbols(&symbols, &config).unwrap_err();
        match err {
            GeneratorError::MissingCategory(names) => assert_eq!(names, vec!["unknownApi"]),
            other => unreachable!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_type_definitions() {
        let scan = scan(
            r#"
/** Screen orientation. */
export type Orientation = "portrait" | "landscape";
export declare enum Accuracy { Lowest = 1, Low, High = 4 }
interface Location$1 { latitude: number; longitude: number }
export { Location$1 as Location };
export declare function getLocale(): string;
"#,
        );
        let names: Vec<&str> = scan.definitions.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Orientation", "Accuracy", "Location"]);
        let TypeDefinitionKind::Enum { values } = &scan.definitions[1].kind else {
            unreachable!("Accuracy is an enum");
        };
        let numbers: Vec<&Literal> = values.iter().map(|v| &v.value).collect();
        assert_eq!(
            numbers,
            vec![
                &Literal::Number("1".into()),
                &Literal::Number("2".into()),
                &Literal::Number("4".into())
            ]
        );
        assert_eq!(
            scan.definitions[0].description.as_deref(),
            Some("Screen orientation.")
        );
    }

    #[test]
    fn test_discover_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("b")).unwrap();
        std::fs::write(dir.path().join("b/x.d.ts"), "").unwrap();
        std::fs::write(dir.path().join("a.d.mts"), "").unwrap();
        std::fs::write(dir.path().join("c.ts"), "").unwrap();
        let files = discover_files(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|f| f.strip_prefix(dir.path()).unwrap().display().to_string())
            .collect();
        assert_eq!(names, vec!["a.d.mts", "b/x.d.ts"]);
        assert!(discover_files(&dir.path().join("missing")).is_err());
    }
}
