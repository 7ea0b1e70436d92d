//! C# method rendering for the category files.

use serde::Serialize;

use super::GeneratorContext;
use super::plan::{ApiPlan, NestedPlan, Shape};
use crate::error::Result;
use crate::ir::model::ParsedApi;
use crate::ir::names::{escape_csharp_string, xml_safe};

#[derive(Debug, Serialize)]
struct AsyncView<'a> {
    doc: String,
    name: &'a str,
    signature: String,
    return_type: &'a str,
    is_void: bool,
    extern_name: &'a str,
    extern_params: String,
    call_args: String,
}

#[derive(Debug, Serialize)]
struct EventView<'a> {
    doc: String,
    name: &'a str,
    signature: String,
    data_type: &'a str,
    is_void: bool,
    extern_name: &'a str,
}

#[derive(Debug, Serialize)]
struct CallbackView<'a> {
    doc: String,
    name: &'a str,
    signature: String,
    event_type: &'a str,
    is_void: bool,
    nested: Vec<NestedView<'a>>,
    extern_name: &'a str,
    extern_params: String,
    call_args: String,
}

#[derive(Debug, Serialize)]
struct NestedView<'a> {
    name: &'a str,
    guard: &'a str,
    access: &'a str,
}

/// Renders the public method and its extern declaration.
pub fn render_method(ctx: &GeneratorContext, plan: &ApiPlan<'_>) -> Result<String> {
    let api = plan.api;
    let name = api.pascal_name.as_str();
    match &plan.shape {
        Shape::Async {
            params,
            return_type,
            ..
        } => {
            let is_void = return_type == "void";
            let doc_params: Vec<(&str, &str)> = params
                .iter()
                .map(|p| (p.name.as_str(), p.doc.as_str()))
                .collect();
            let returns = (!is_void).then_some("The API result");
            let mut extern_params: Vec<String> = params
                .iter()
                .map(|p| format!("{} {}", p.extern_type, p.name))
                .collect();
            extern_params.extend(["string callbackId".into(), "string typeName".into()]);
            let mut call_args: Vec<String> = params.iter().map(|p| p.call_arg.clone()).collect();
            call_args.extend(["callbackId".into(), format!("\"{return_type}\"")]);
            ctx.render(
                "async_method.jinja2",
                &AsyncView {
                    doc: doc_block(api, &doc_params, returns, true),
                    name,
                    signature: params
                        .iter()
                        .map(|p| p.declaration())
                        .collect::<Vec<_>>()
                        .join(", "),
                    return_type,
                    is_void,
                    extern_name: &plan.extern_name,
                    extern_params: extern_params.join(", "),
                    call_args: call_args.join(", "),
                },
            )
        }
        Shape::Event { data_type, .. } => {
            let handler = data_type
                .as_deref()
                .map_or_else(|| "Action".to_string(), |data| format!("Action<{data}>"));
            ctx.render(
                "event_method.jinja2",
                &EventView {
                    doc: doc_block(
                        api,
                        &[("onEvent", "Event callback"), ("onError", "Error callback")],
                        Some("Action that removes the subscription"),
                        false,
                    ),
                    name,
                    signature: format!(
                        "{handler} onEvent, Action<AITException> onError = null"
                    ),
                    data_type: data_type.as_deref().unwrap_or("void"),
                    is_void: data_type.is_none(),
                    extern_name: &plan.extern_name,
                },
            )
        }
        Shape::Callback {
            params,
            event_type,
            nested,
        } => {
            let handler = event_type
                .as_deref()
                .map_or_else(|| "Action".to_string(), |data| format!("Action<{data}>"));
            let mut signature = vec![format!("{handler} onEvent")];
            signature.extend(params.iter().map(|p| p.declaration()));
            signature.push("Action<AITException> onError = null".to_string());

            let mut doc_params = vec![("onEvent", "Event callback")];
            doc_params.extend(params.iter().map(|p| (p.name.as_str(), p.doc.as_str())));
            doc_params.push(("onError", "Error callback"));

            let route = plan.route_type();
            let mut extern_params: Vec<String> = params
                .iter()
                .map(|p| format!("{} {}", p.extern_type, p.name))
                .collect();
            extern_params.extend(["string subscriptionId".into(), "string typeName".into()]);
            let mut call_args: Vec<String> = params.iter().map(|p| p.call_arg.clone()).collect();
            call_args.extend(["subscriptionId".into(), format!("\"{route}\"")]);

            ctx.render(
                "callback_method.jinja2",
                &CallbackView {
                    doc: doc_block(
                        api,
                        &doc_params,
                        Some("Action that removes the subscription"),
                        false,
                    ),
                    name,
                    signature: signature.join(", "),
                    event_type: route,
                    is_void: event_type.is_none(),
                    nested: nested.iter().map(nested_view).collect(),
                    extern_name: &plan.extern_name,
                    extern_params: extern_params.join(", "),
                    call_args: call_args.join(", "),
                },
            )
        }
    }
}

fn nested_view(nested: &NestedPlan) -> NestedView<'_> {
    NestedView {
        name: &nested.name,
        guard: &nested.cs_guard,
        access: &nested.cs_access,
    }
}

/// XML docs plus the attributes every generated method carries.
fn doc_block(
    api: &ParsedApi,
    params: &[(&str, &str)],
    returns: Option<&str>,
    throws: bool,
) -> String {
    let summary = api
        .description
        .as_deref()
        .map(xml_safe)
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| {
            let target = api.namespace.as_ref().map_or_else(
                || api.original_name.clone(),
                |ns| format!("{ns}.{}", api.original_name),
            );
            format!("Calls {target} on the Apps in Toss bridge.")
        });
    let mut lines = vec![
        "/// <summary>".to_string(),
        format!("/// {summary}"),
        "/// </summary>".to_string(),
    ];
    for (name, text) in params {
        lines.push(format!("/// <param name=\"{name}\">{}</param>", xml_safe(text)));
    }
    if let Some(returns) = returns {
        lines.push(format!("/// <returns>{returns}</returns>"));
    }
    if throws {
        lines.push(
            "/// <exception cref=\"AITException\">Thrown when the API call fails</exception>"
                .to_string(),
        );
    }
    lines.push("[Preserve]".to_string());
    lines.push(format!("[APICategory(\"{}\")]", api.category));
    if let Some(message) = &api.deprecated {
        let message = message.split_whitespace().collect::<Vec<_>>().join(" ");
        if message.is_empty() {
            lines.push("[System.Obsolete]".to_string());
        } else {
            lines.push(format!(
                "[System.Obsolete(\"{}\")]",
                escape_csharp_string(&message)
            ));
        }
    }
    lines
        .into_iter()
        .map(|line| format!("        {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
