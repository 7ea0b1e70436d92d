//! `unity-bridge.ts`: puts the web framework and its namespace objects on `window.AppsInToss`.

use std::collections::BTreeSet;

use serde::Serialize;

use super::GeneratorContext;
use crate::error::Result;
use crate::ir::model::ParsedApi;

/// File name of the bridge module.
pub const BRIDGE_FILE: &str = "unity-bridge.ts";

#[derive(Debug, Serialize)]
struct BridgeView<'a> {
    namespaces: Vec<&'a str>,
}

/// Namespace objects the glue calls through, sorted and deduplicated.
pub fn bridge_namespaces(apis: &[ParsedApi]) -> Vec<&str> {
    apis.iter()
        .filter_map(|api| api.namespace.as_deref())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Renders the bridge module for the namespaces used by `apis`.
pub fn render_bridge(ctx: &GeneratorContext, apis: &[ParsedApi]) -> Result<String> {
    ctx.render(
        "unity_bridge.jinja2",
        &BridgeView {
            namespaces: bridge_namespaces(apis),
        },
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use crate::ir::model::{ApiKind, ParsedType};

    fn api(name: &str, namespace: Option<&str>) -> ParsedApi {
        ParsedApi {
            name: name.into(),
            pascal_name: name.into(),
            original_name: name.into(),
            category: "Device".into(),
            namespace: namespace.map(Into::into),
            parameters: Vec::new(),
            return_type: ParsedType::primitive("void"),
            is_async: true,
            kind: ApiKind::Function,
            nested_callbacks: Vec::new(),
            deprecated: None,
            description: None,
        }
    }

    #[test]
    fn test_namespaces_sorted_and_unique() {
        let apis = [
            api("b", Some("Storage")),
            api("a", None),
            api("c", Some("IAP")),
            api("d", Some("Storage")),
        ];
        assert_eq!(bridge_namespaces(&apis), vec!["IAP", "Storage"]);
    }

    #[test]
    fn test_bridge_exposes_namespaces() {
        let ctx = GeneratorContext::new(GeneratorConfig::default());
        let text = render_bridge(&ctx, &[api("getItems", Some("IAP")), api("x", Some("Storage"))]).unwrap();
        assert!(text.contains("import * as WebFramework from '@apps-in-toss/web-framework';"));
        assert!(text.contains("import { IAP } from '@apps-in-toss/web-framework';"));
        assert!(text.contains("      Storage: typeof Storage;"));
        assert!(text.contains("const _aitNamespaces = { IAP, Storage };"));
        assert!(text.contains("Object.defineProperty(window.AppsInToss, _name"));
        assert!(text.trim_end().ends_with("export default WebFramework;"));
    }

    #[test]
    fn test_bridge_without_namespaces() {
        let ctx = GeneratorContext::new(GeneratorConfig::default());
        let text = render_bridge(&ctx, &[api("getLocale", None)]).unwrap();
        assert!(!text.contains("import {"));
        assert!(text.contains("window.AppsInToss = WebFramework as typeof WebFramework & {\n};"));
    }
}
