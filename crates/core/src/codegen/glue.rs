//! jslib glue rendering: one browser function per extern.

use serde::Serialize;

use super::GeneratorContext;
use super::params::ParamView;
use super::plan::{ApiPlan, Shape};
use crate::error::Result;

/// Extern implemented once for every subscription API.
pub const UNSUBSCRIBE_EXTERN: &str = "__AITUnsubscribe_Internal";

#[derive(Debug, Serialize)]
struct ArgView<'a> {
    name: &'a str,
    key: &'a str,
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct NestedGlueView<'a> {
    name: &'a str,
    guard: &'a str,
    target: &'a str,
}

#[derive(Debug, Serialize)]
struct GlueView<'a> {
    api_name: &'a str,
    extern_name: &'a str,
    params: String,
    args: Vec<ArgView<'a>>,
    target: String,
    call: String,
    result_union: bool,
    event_name: &'a str,
    is_void: bool,
    nested: Vec<NestedGlueView<'a>>,
}

#[derive(Debug, Serialize)]
struct FileView<'a> {
    header: &'a str,
    category: &'a str,
    functions: String,
}

/// `window.AppsInToss[.ns]`
fn bridge_object(plan: &ApiPlan<'_>) -> String {
    plan.api.namespace.as_ref().map_or_else(
        || "window.AppsInToss".to_string(),
        |ns| format!("window.AppsInToss.{ns}"),
    )
}

fn arg_views(params: &[ParamView]) -> Vec<ArgView<'_>> {
    params
        .iter()
        .map(|p| ArgView {
            name: &p.name,
            key: &p.js_name,
            value: &p.js_value,
        })
        .collect()
}

fn param_list(params: &[ParamView], trailing: [&str; 2]) -> String {
    params
        .iter()
        .map(|p| p.name.as_str())
        .chain(trailing)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Renders the glue function for one API.
pub fn render_function(ctx: &GeneratorContext, plan: &ApiPlan<'_>) -> Result<String> {
    let api = plan.api;
    let object = bridge_object(plan);
    let mut view = GlueView {
        api_name: &api.pascal_name,
        extern_name: &plan.extern_name,
        params: String::new(),
        args: Vec::new(),
        target: object.clone(),
        call: String::new(),
        result_union: false,
        event_name: "",
        is_void: false,
        nested: Vec::new(),
    };
    let template = match &plan.shape {
        Shape::Async {
            params,
            result_union,
            ..
        } => {
            view.params = param_list(params, ["callbackId", "typeName"]);
            let values: Vec<String> = params.iter().map(|p| format!("{}Val", p.name)).collect();
            view.call = format!("{object}.{}({})", api.original_name, values.join(", "));
            view.args = arg_views(params);
            view.result_union = *result_union;
            "glue_async.jinja2"
        }
        Shape::Event {
            event_name,
            data_type,
        } => {
            view.params = "subscriptionId, typeName".to_string();
            view.event_name = event_name;
            view.is_void = data_type.is_none();
            "glue_event.jinja2"
        }
        Shape::Callback {
            params,
            event_type,
            nested,
        } => {
            view.params = param_list(params, ["subscriptionId", "typeName"]);
            view.call = format!("{object}.{}", api.original_name);
            view.args = arg_views(params);
            view.is_void = event_type.is_none();
            view.nested = nested
                .iter()
                .map(|n| NestedGlueView {
                    name: &n.name,
                    guard: &n.js_guard,
                    target: &n.js_target,
                })
                .collect();
            "glue_callback.jinja2"
        }
    };
    ctx.render(template, &view)
}

/// Renders the shared unsubscribe function.
pub fn render_unsubscribe(ctx: &GeneratorContext) -> Result<String> {
    ctx.render_context("glue_unsubscribe.jinja2", &tera::Context::new())
}

/// Renders a complete `.jslib` file from its functions.
pub fn render_file(
    ctx: &GeneratorContext,
    header: &str,
    category: &str,
    functions: &[String],
) -> Result<String> {
    ctx.render(
        "jslib_file.jinja2",
        &FileView {
            header,
            category,
            functions: functions.join(",\n\n"),
        },
    )
}
