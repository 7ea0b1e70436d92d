//! C# and jslib emission.
//!
//! Structural output (classes and enums) goes through a small C# AST in [`csharp`] printed
//! by [`emit`]. Method bodies, the callback registry and the glue functions are tera
//! templates compiled once per [`GeneratorContext`].

mod bridge;
mod core_file;
mod csharp;
mod emit;
mod glue;
mod host;
mod manual;
mod params;
mod plan;
mod types;

use std::collections::{BTreeMap, HashSet};
use std::error::Error as _;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::Serialize;
use tera::{Context, Tera};
use tracing::debug;

pub use bridge::{BRIDGE_FILE, bridge_namespaces};
pub use core_file::{Route, RouteKind, routes};
pub use csharp::{
    CsClass, CsConstants, CsEnum, CsEnumMember, CsField, CsFile, CsItem, CsMember, CsMethod,
    CsProperty,
};
pub use emit::Emit;
pub use glue::UNSUBSCRIBE_EXTERN;
pub use manual::{DEVICE_PIXEL_RATIO_EXTERN, SCREEN_CATEGORY};
pub use params::{Marshal, ParamView};
pub use plan::{ApiPlan, NestedPlan, Shape, extern_name, plan};

use crate::categories::sort_categories;
use crate::collect::TypeCollection;
use crate::config::GeneratorConfig;
use crate::error::{GeneratorError, Result};
use crate::ir::model::{GeneratedCode, ParsedApi};

/// Shell file declaring the partial class.
pub const SHELL_FILE: &str = "AIT.cs";
/// Callback registry file.
pub const CORE_FILE: &str = "AITCore.cs";
/// Collected types file.
pub const TYPES_FILE: &str = "AIT.Types.cs";
/// Directory holding the jslib files, relative to the output root.
pub const PLUGINS_DIR: &str = "Plugins";

/// `AIT.{Category}.cs`
pub fn category_file_name(category: &str) -> String {
    format!("AIT.{category}.cs")
}

/// `AppsInToss-{Category}.jslib`
pub fn jslib_file_name(category: &str) -> String {
    format!("AppsInToss-{category}.jslib")
}

const TEMPLATES: &[(&str, &str)] = &[
    ("header.jinja2", include_str!("../../templates/header.jinja2")),
    ("ait_shell.jinja2", include_str!("../../templates/ait_shell.jinja2")),
    ("category_file.jinja2", include_str!("../../templates/category_file.jinja2")),
    ("async_method.jinja2", include_str!("../../templates/async_method.jinja2")),
    ("event_method.jinja2", include_str!("../../templates/event_method.jinja2")),
    ("callback_method.jinja2", include_str!("../../templates/callback_method.jinja2")),
    ("ait_core.jinja2", include_str!("../../templates/ait_core.jinja2")),
    ("jslib_file.jinja2", include_str!("../../templates/jslib_file.jinja2")),
    ("glue_async.jinja2", include_str!("../../templates/glue_async.jinja2")),
    ("glue_event.jinja2", include_str!("../../templates/glue_event.jinja2")),
    ("glue_callback.jinja2", include_str!("../../templates/glue_callback.jinja2")),
    ("glue_unsubscribe.jinja2", include_str!("../../templates/glue_unsubscribe.jinja2")),
    ("screen_method.jinja2", include_str!("../../templates/screen_method.jinja2")),
    ("glue_screen.jinja2", include_str!("../../templates/glue_screen.jinja2")),
    ("unity_bridge.jinja2", include_str!("../../templates/unity_bridge.jinja2")),
];

/// State shared by every rendering call of one run.
#[derive(Debug)]
pub struct GeneratorContext {
    config: GeneratorConfig,
    templates: OnceLock<Tera>,
}

impl GeneratorContext {
    /// Creates a context; templates compile on first use.
    pub const fn new(config: GeneratorConfig) -> Self {
        Self {
            config,
            templates: OnceLock::new(),
        }
    }

    /// Run configuration.
    pub const fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    fn templates(&self) -> Result<&Tera> {
        if let Some(tera) = self.templates.get() {
            return Ok(tera);
        }
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        tera.add_raw_templates(TEMPLATES.iter().copied())
            .map_err(|e| template_error("<init>", &e))?;
        debug!("Compiled {} templates", TEMPLATES.len());
        Ok(self.templates.get_or_init(|| tera))
    }

    /// Renders a template from a serializable view.
    pub fn render<S: Serialize>(&self, name: &str, view: &S) -> Result<String> {
        let context = Context::from_serialize(view).map_err(|e| template_error(name, &e))?;
        self.render_context(name, &context)
    }

    /// Renders a template from a prepared context.
    pub fn render_context(&self, name: &str, context: &Context) -> Result<String> {
        self.templates()?
            .render(name, context)
            .map_err(|e| template_error(name, &e))
    }

    fn header(&self, file_name: &str) -> Result<String> {
        let mut context = Context::new();
        context.insert("file_name", file_name);
        Ok(self
            .render_context("header.jinja2", &context)?
            .trim_end()
            .to_string())
    }
}

/// Tera nests the useful message in the source chain.
fn template_error(name: &str, err: &tera::Error) -> GeneratorError {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    GeneratorError::Template {
        name: name.to_string(),
        message,
    }
}

/// One rendered file, path relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    /// Relative path such as `AIT.Device.cs` or `Plugins/AppsInToss-Device.jslib`.
    pub path: PathBuf,
    /// File text.
    pub contents: String,
}

/// API count of one category file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySummary {
    /// Category name.
    pub category: String,
    /// `AIT.{Category}.cs`
    pub file: String,
    /// Methods in the file.
    pub api_count: usize,
}

/// Everything one run renders.
#[derive(Debug, Clone, Default)]
pub struct Generation {
    /// Files to write.
    pub files: Vec<OutputFile>,
    /// Per-API text, used by the completeness gate.
    pub code: Vec<GeneratedCode>,
    /// Categories in file order.
    pub categories: Vec<CategorySummary>,
    /// `unity-bridge.ts` text; written outside the output directory.
    pub bridge: String,
}

impl Generation {
    /// Looks up a rendered file by relative path.
    pub fn file(&self, path: &str) -> Option<&OutputFile> {
        self.files.iter().find(|f| f.path == Path::new(path))
    }
}

fn output(path: impl Into<PathBuf>, contents: String) -> OutputFile {
    let mut contents = contents.trim_end().to_string();
    contents.push('\n');
    OutputFile {
        path: path.into(),
        contents,
    }
}

#[derive(Debug, Serialize)]
struct ShellView<'a> {
    header: &'a str,
    api_count: usize,
    category_count: usize,
}

#[derive(Debug, Serialize)]
struct CategoryView<'a> {
    header: &'a str,
    category: &'a str,
    methods: String,
}

/// Renders every output file for a scanned API set.
pub fn generate(
    ctx: &GeneratorContext,
    apis: &[ParsedApi],
    collection: &TypeCollection,
) -> Result<Generation> {
    let plans: Vec<ApiPlan<'_>> = apis.iter().map(|api| plan(api, collection)).collect();

    let mut by_category: BTreeMap<&str, Vec<&ApiPlan<'_>>> = BTreeMap::new();
    for plan in &plans {
        by_category.entry(&plan.api.category).or_default().push(plan);
    }
    let categories = sort_categories(by_category.keys().copied());
    let unsubscribe_home = categories
        .iter()
        .find(|category| {
            by_category
                .get(category.as_str())
                .is_some_and(|plans| plans.iter().any(|p| p.is_subscription()))
        })
        .or_else(|| categories.first())
        .cloned();

    let mut generation = Generation::default();
    let shell_header = ctx.header(SHELL_FILE)?;
    generation.files.push(output(
        SHELL_FILE,
        ctx.render(
            "ait_shell.jinja2",
            &ShellView {
                header: &shell_header,
                api_count: apis.len(),
                category_count: categories.len(),
            },
        )?,
    ));

    for category in &categories {
        let members = by_category
            .get(category.as_str())
            .map(Vec::as_slice)
            .unwrap_or_default();
        let file = category_file_name(category);
        let mut methods = Vec::with_capacity(members.len());
        let mut functions = Vec::with_capacity(members.len() + 1);
        for plan in members {
            let host_code = host::render_method(ctx, plan)?.trim_end().to_string();
            let glue_code = glue::render_function(ctx, plan)?.trim_end().to_string();
            methods.push(host_code.clone());
            functions.push(glue_code.clone());
            generation.code.push(GeneratedCode {
                api: plan.api.pascal_name.clone(),
                category: category.clone(),
                host_code,
                glue_code,
            });
        }
        if unsubscribe_home.as_ref() == Some(category) {
            functions.push(glue::render_unsubscribe(ctx)?.trim_end().to_string());
        }
        if category == SCREEN_CATEGORY {
            methods.push(manual::render_methods(ctx)?);
            functions.push(manual::render_functions(ctx)?);
        }

        push_category_files(ctx, &mut generation, category, &methods, &functions)?;
        debug!("Rendered {} ({} APIs)", file, members.len());
        generation.categories.push(CategorySummary {
            category: category.clone(),
            file,
            api_count: members.len(),
        });
    }

    if !categories.iter().any(|c| c == SCREEN_CATEGORY) {
        push_category_files(
            ctx,
            &mut generation,
            SCREEN_CATEGORY,
            &[manual::render_methods(ctx)?],
            &[manual::render_functions(ctx)?],
        )?;
    }

    let event_types = core_file::event_type_names(&plans, collection);
    let header = ctx.header(CORE_FILE)?;
    generation.files.push(output(
        CORE_FILE,
        core_file::render_core(ctx, &header, &plans, collection, &event_types)?,
    ));

    let skip: HashSet<String> = event_types.into_iter().collect();
    let header = ctx.header(TYPES_FILE)?;
    generation.files.push(output(
        TYPES_FILE,
        types::types_file(header, collection, &skip).emit(),
    ));

    generation.bridge = bridge::render_bridge(ctx, apis)?;
    Ok(generation)
}

/// Adds `AIT.{Category}.cs` and its `.jslib` to the generation.
fn push_category_files(
    ctx: &GeneratorContext,
    generation: &mut Generation,
    category: &str,
    methods: &[String],
    functions: &[String],
) -> Result<()> {
    let file = category_file_name(category);
    let header = ctx.header(&file)?;
    generation.files.push(output(
        file.as_str(),
        ctx.render(
            "category_file.jinja2",
            &CategoryView {
                header: &header,
                category,
                methods: methods.join("\n\n"),
            },
        )?,
    ));

    let jslib = jslib_file_name(category);
    let header = ctx.header(&jslib)?;
    generation.files.push(output(
        PathBuf::from(PLUGINS_DIR).join(&jslib),
        glue::render_file(ctx, &header, category, functions)?,
    ));
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::collect::collect_types;
    use crate::surface::{SymbolTable, parse_source, scan_symbols};

    fn generate_from(src: &str) -> Generation {
        let mut symbols = SymbolTable::new();
        symbols.add_items(&parse_source(src).unwrap());
        let config = GeneratorConfig {
            fallback_category: Some("Other".into()),
            ..GeneratorConfig::default()
        };
        let scan = scan_symbols(&symbols, &config).unwrap();
        let collection = collect_types(&scan.apis, &scan.definitions, 32);
        let ctx = GeneratorContext::new(config);
        generate(&ctx, &scan.apis, &collection).unwrap()
    }

    #[test]
    fn test_templates_compile() {
        let ctx = GeneratorContext::new(GeneratorConfig::default());
        assert!(ctx.templates().is_ok());
        assert!(ctx.templates.get().is_some());
    }

    #[test]
    fn test_unknown_template_is_template_error() {
        let ctx = GeneratorContext::new(GeneratorConfig::default());
        let err = ctx.render_context("missing.jinja2", &Context::new()).unwrap_err();
        assert!(matches!(err, GeneratorError::Template { name, .. } if name == "missing.jinja2"));
    }

    #[test]
    fn test_generates_file_set() {
        let generation = generate_from(
            r#"
export declare function getClipboardText(): Promise<string>;
export declare function setClipboardText(text: string): Promise<void>;
"#,
        );
        let paths: Vec<String> = generation
            .files
            .iter()
            .map(|f| f.path.to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(
            paths,
            vec![
                "AIT.cs",
                "AIT.Clipboard.cs",
                "Plugins/AppsInToss-Clipboard.jslib",
                "AIT.Screen.cs",
                "Plugins/AppsInToss-Screen.jslib",
                "AITCore.cs",
                "AIT.Types.cs"
            ]
        );
        let category = generation.file("AIT.Clipboard.cs").unwrap();
        assert!(category.contents.contains("GetClipboardText"));
        assert!(category.contents.contains("__SetClipboardText_Internal(text, callbackId, \"void\")"));
        let jslib = generation.file("Plugins/AppsInToss-Clipboard.jslib").unwrap();
        assert!(jslib.contents.contains("__GetClipboardText_Internal: function(callbackId, typeName)"));
        assert!(jslib.contents.contains("__AITUnsubscribe_Internal"));
        assert_eq!(generation.categories[0].api_count, 2);
        assert_eq!(generation.code.len(), 2);
    }

    #[test]
    fn test_unsubscribe_glue_goes_to_first_subscription_category() {
        let generation = generate_from(
            r#"
export declare function getClipboardText(): Promise<string>;
export declare const tdsEvent: {
    addEventListener: <K extends keyof TdsEvent>(event: K, handler: TdsEvent[K]) => () => void;
};
interface TdsEvent {
    navigationAccessoryEvent: { onEvent: (data: { id: string }) => void };
}
"#,
        );
        let clipboard = generation.file("Plugins/AppsInToss-Clipboard.jslib").unwrap();
        assert!(!clipboard.contents.contains("__AITUnsubscribe_Internal"));
        let count: usize = generation
            .files
            .iter()
            .filter(|f| f.contents.contains("__AITUnsubscribe_Internal: function"))
            .count();
        assert_eq!(count, 1);
        let core = generation.file(CORE_FILE).unwrap();
        assert!(core.contents.contains("case \"void\":"));
    }

    #[test]
    fn test_screen_api_joins_configured_category() {
        let mut symbols = SymbolTable::new();
        symbols.add_items(&parse_source("export declare function getSafeArea(): Promise<number>;").unwrap());
        let mut config = GeneratorConfig::default();
        config.categories.insert("getSafeArea".into(), SCREEN_CATEGORY.into());
        let scan = scan_symbols(&symbols, &config).unwrap();
        let collection = collect_types(&scan.apis, &scan.definitions, 32);
        let generation = generate(&GeneratorContext::new(config), &scan.apis, &collection).unwrap();

        let screen_files = generation
            .files
            .iter()
            .filter(|f| f.path == Path::new("AIT.Screen.cs"))
            .count();
        assert_eq!(screen_files, 1);
        let screen = generation.file("AIT.Screen.cs").unwrap();
        assert!(screen.contents.contains("GetSafeArea("));
        assert!(screen.contents.contains("GetDevicePixelRatio()"));
        let glue = generation.file("Plugins/AppsInToss-Screen.jslib").unwrap();
        assert!(glue.contents.contains("__GetSafeArea_Internal: function"));
        assert!(glue.contents.contains("__GetDevicePixelRatio_Internal: function()"));
        assert_eq!(generation.categories.len(), 1);
        assert_eq!(generation.categories[0].api_count, 1);
    }

    #[test]
    fn test_bridge_rendered_with_namespaces() {
        let generation = generate_from(
            r#"
export declare const IAP: { getProductItemList(): Promise<string[]> };
export declare function getLocale(): Promise<string>;
"#,
        );
        assert!(generation.bridge.contains("import { IAP } from '@apps-in-toss/web-framework';"));
        assert!(generation
            .files
            .iter()
            .any(|f| f.contents.contains("window.AppsInToss.IAP.getProductItemList(")));
    }
}
