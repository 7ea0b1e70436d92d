//! `AITCore.cs`: callback routing for every result and subscription type.

use std::collections::BTreeSet;

use serde::Serialize;

use super::GeneratorContext;
use super::emit::{Emit, indent};
use super::plan::ApiPlan;
use super::types::type_item;
use crate::collect::TypeCollection;
use crate::error::Result;

/// How `RouteCallback` turns a JSON payload into a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteKind {
    /// `JsonConvert.DeserializeObject<T>`
    Object,
    /// `Enum.TryParse<T>` with a JSON fallback.
    Enum,
    /// Quotes stripped.
    String,
    /// `== "true"`
    Bool,
    /// `double.TryParse`
    Double,
    /// Callback invoked without a value.
    Void,
}

/// One `case` of a routing switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    /// Type name sent by the glue layer.
    pub type_name: String,
    /// Decoding strategy.
    pub kind: RouteKind,
}

#[derive(Debug, Serialize)]
struct CoreView<'a> {
    header: &'a str,
    routes: &'a [Route],
    subscriptions: &'a [Route],
    event_types: String,
}

fn route_kind(type_name: &str, collection: &TypeCollection) -> RouteKind {
    match type_name {
        "void" => RouteKind::Void,
        "string" => RouteKind::String,
        "bool" => RouteKind::Bool,
        "double" => RouteKind::Double,
        name if collection.is_enum(name) => RouteKind::Enum,
        _ => RouteKind::Object,
    }
}

/// Distinct routes ordered objects first, then enums, then primitives; `void` always last.
pub fn routes<'p, I>(type_names: I, collection: &TypeCollection) -> Vec<Route>
where
    I: IntoIterator<Item = &'p str>,
{
    let mut distinct: BTreeSet<(RouteKind, &str)> = type_names
        .into_iter()
        .map(|name| (route_kind(name, collection), name))
        .collect();
    distinct.insert((RouteKind::Void, "void"));
    distinct
        .into_iter()
        .map(|(kind, name)| Route {
            type_name: name.to_string(),
            kind,
        })
        .collect()
}

/// Names of the classes emitted in `AITCore.cs` instead of the type file.
pub fn event_type_names(plans: &[ApiPlan<'_>], collection: &TypeCollection) -> BTreeSet<String> {
    plans
        .iter()
        .filter(|plan| plan.api.is_event_subscription())
        .map(|plan| plan.route_type())
        .filter(|name| collection.is_class(name))
        .map(str::to_string)
        .collect()
}

/// Renders `AITCore.cs`.
pub fn render_core(
    ctx: &GeneratorContext,
    header: &str,
    plans: &[ApiPlan<'_>],
    collection: &TypeCollection,
    event_types: &BTreeSet<String>,
) -> Result<String> {
    let callbacks = routes(
        plans
            .iter()
            .filter(|p| !p.is_subscription())
            .map(ApiPlan::route_type),
        collection,
    );
    let subscriptions = routes(
        plans
            .iter()
            .filter(|p| p.is_subscription())
            .map(ApiPlan::route_type),
        collection,
    );
    let event_classes = event_types
        .iter()
        .filter_map(|name| collection.types.get(name).map(|ty| type_item(name, ty)))
        .map(|item| indent(&item.emit(), 1))
        .collect::<Vec<_>>()
        .join("\n\n");
    ctx.render(
        "ait_core.jinja2",
        &CoreView {
            header,
            routes: &callbacks,
            subscriptions: &subscriptions,
            event_types: event_classes,
        },
    )
}
