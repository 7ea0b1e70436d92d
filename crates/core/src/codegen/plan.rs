//! Per-API binding plan shared by the C# and jslib renderers.
//!
//! Both sides of an extern are rendered from the same [`ApiPlan`], so names, arity and
//! marshaling are decided once.

use std::slice;

use tracing::warn;

use super::params::{ParamSource, ParamView, param_views};
use crate::collect::{TypeCollection, fields};
use crate::ir::mapper::map_member_type;
use crate::ir::model::{ParsedApi, ParsedType, Property, TypeKind};
use crate::ir::names::escape_csharp_keyword;

/// Name of the browser function behind an API's extern.
pub fn extern_name(api: &ParsedApi) -> String {
    format!("__{}_Internal", api.pascal_name)
}

/// Decided shape of one API binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiPlan<'a> {
    /// Source API.
    pub api: &'a ParsedApi,
    /// `__Name_Internal`
    pub extern_name: String,
    /// Invocation style with its resolved types.
    pub shape: Shape,
}

/// Invocation style of a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    /// Awaitable call completed through `OnAITCallback`.
    Async {
        /// Host parameters.
        params: Vec<ParamView>,
        /// C# result type, `void` when nothing is returned.
        return_type: String,
        /// Result is a success-or-error-code union.
        result_union: bool,
    },
    /// `addEventListener` subscription.
    Event {
        /// Event key.
        event_name: String,
        /// Payload type, `None` for payload-less events.
        data_type: Option<String>,
    },
    /// `{ onEvent, onError, … }` call returning a disposer.
    Callback {
        /// Parameters besides `onEvent`/`onError`.
        params: Vec<ParamView>,
        /// Payload type of `onEvent`, `None` when it takes nothing.
        event_type: Option<String>,
        /// Callbacks inside the parameter objects.
        nested: Vec<NestedPlan>,
    },
}

/// Registration of one nested callback on both sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedPlan {
    /// Callback property name.
    pub name: String,
    /// Null-conditional C# path, e.g. `options?.ProcessProductGrant`.
    pub cs_guard: String,
    /// Plain C# path, e.g. `options.ProcessProductGrant`.
    pub cs_access: String,
    /// JS condition that the parent object exists.
    pub js_guard: String,
    /// JS assignment target.
    pub js_target: String,
}

impl ApiPlan<'_> {
    /// Type name the host registry routes the API's callbacks by.
    pub fn route_type(&self) -> &str {
        match &self.shape {
            Shape::Async { return_type, .. } => return_type,
            Shape::Event { data_type, .. } => data_type.as_deref().unwrap_or("void"),
            Shape::Callback { event_type, .. } => event_type.as_deref().unwrap_or("void"),
        }
    }

    /// Routed through the subscription registry.
    pub const fn is_subscription(&self) -> bool {
        !matches!(self.shape, Shape::Async { .. })
    }
}

/// Plans one API.
pub fn plan<'a>(api: &'a ParsedApi, collection: &TypeCollection) -> ApiPlan<'a> {
    let owner = api.pascal_name.as_str();
    let shape = if let Some(event_name) = api.event_name() {
        Shape::Event {
            event_name: event_name.to_string(),
            data_type: api
                .event_data()
                .filter(|data| !data.is_void())
                .map(|data| map_member_type(data, owner, "data")),
        }
    } else if let (true, Some(param)) = (api.is_callback_based(), api.parameters.first()) {
        callback_shape(api, param.name.as_str(), &param.ty, collection)
    } else {
        let sources: Vec<ParamSource<'_>> = api
            .parameters
            .iter()
            .map(|p| ParamSource {
                name: &p.name,
                ty: &p.ty,
                optional: p.optional,
                description: p.description.as_deref(),
            })
            .collect();
        let returned = api.return_type.awaited();
        let return_type = if returned.is_void() {
            "void".to_string()
        } else {
            map_member_type(returned, owner, "result")
        };
        Shape::Async {
            params: param_views(&sources, owner, collection),
            return_type,
            result_union: api.return_type.result_shape().is_some(),
        }
    };
    ApiPlan {
        api,
        extern_name: extern_name(api),
        shape,
    }
}

fn callback_shape(
    api: &ParsedApi,
    param_name: &str,
    args: &ParsedType,
    collection: &TypeCollection,
) -> Shape {
    let args_class = map_member_type(args, &api.pascal_name, param_name);
    let properties = args.properties().unwrap_or_default();
    let event_type = properties
        .iter()
        .find(|p| p.name == "onEvent")
        .and_then(|p| match &p.ty.kind {
            TypeKind::Function { params, .. } => params.first(),
            _ => None,
        })
        .filter(|first| !first.ty.is_void())
        .map(|first| map_member_type(&first.ty, &args_class, "onEvent"));

    let sources: Vec<ParamSource<'_>> = properties
        .iter()
        .filter(|p| p.name != "onEvent" && p.name != "onError")
        .map(|p| ParamSource {
            name: &p.name,
            ty: &p.ty,
            optional: p.optional,
            description: p.description.as_deref(),
        })
        .collect();
    let params = param_views(&sources, &args_class, collection);

    let nested = api
        .nested_callbacks
        .iter()
        .filter_map(|callback| {
            let resolved = nested_plan(&callback.path, properties, &args_class, &params);
            if resolved.is_none() {
                warn!(
                    "Nested callback {} of {} cannot be bound, skipping",
                    callback.path.join("."),
                    api.pascal_name
                );
            }
            resolved
        })
        .collect();

    Shape::Callback {
        params,
        event_type,
        nested,
    }
}

/// Finds a property by name on an object or any member of a union.
fn find_property<'t>(ty: &'t ParsedType, name: &str) -> Option<&'t Property> {
    if let Some(found) = ty.property(name) {
        return Some(found);
    }
    match &ty.kind {
        TypeKind::Union { members, .. } => members.iter().find_map(|m| m.property(name)),
        _ => None,
    }
}

fn nested_plan(
    path: &[String],
    properties: &[Property],
    args_class: &str,
    params: &[ParamView],
) -> Option<NestedPlan> {
    let (first, rest) = path.split_first()?;
    let (name, _) = path.split_last()?;
    let root = properties.iter().find(|p| &p.name == first)?;
    let param = params.iter().find(|p| &p.js_name == first)?;

    let root_name = escape_csharp_keyword(&root.name);
    let mut cs_path = vec![root_name];
    let mut js_path = vec![format!("{}Val", param.name)];
    let mut owner = args_class.to_string();
    let mut member = root.name.clone();
    let mut ty = &root.ty;
    for segment in rest {
        let class = map_member_type(ty, &owner, &member);
        let prop = find_property(ty, segment)?;
        let field = fields(&class, slice::from_ref(prop)).into_iter().next()?;
        cs_path.push(field.name);
        js_path.push(segment.clone());
        owner = class;
        member = segment.clone();
        ty = &prop.ty;
    }
    if let TypeKind::Function { params, .. } = &ty.kind
        && params.len() > 1
    {
        return None;
    }

    let js_parents = &js_path[..js_path.len() - 1];
    let js_guard = (1..=js_parents.len())
        .map(|n| js_parents[..n].join("."))
        .collect::<Vec<_>>()
        .join(" && ");
    Some(NestedPlan {
        name: name.clone(),
        cs_guard: cs_path.join("?."),
        cs_access: cs_path.join("."),
        js_guard,
        js_target: js_path.join("."),
    })
}
