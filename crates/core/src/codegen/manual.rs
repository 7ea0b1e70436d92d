//! Browser APIs outside the bridge package, written by hand into the `Screen` category.

use serde::Serialize;

use super::GeneratorContext;
use crate::error::Result;

/// Category holding the hand-written browser APIs.
pub const SCREEN_CATEGORY: &str = "Screen";

/// Extern backing `AIT.GetDevicePixelRatio`.
pub const DEVICE_PIXEL_RATIO_EXTERN: &str = "__GetDevicePixelRatio_Internal";

#[derive(Debug, Serialize)]
struct ManualView<'a> {
    category: &'a str,
    extern_name: &'a str,
}

const VIEW: ManualView<'static> = ManualView {
    category: SCREEN_CATEGORY,
    extern_name: DEVICE_PIXEL_RATIO_EXTERN,
};

/// Host methods of the `Screen` category.
pub fn render_methods(ctx: &GeneratorContext) -> Result<String> {
    Ok(ctx.render("screen_method.jinja2", &VIEW)?.trim_end().to_string())
}

/// Glue functions of the `Screen` category.
pub fn render_functions(ctx: &GeneratorContext) -> Result<String> {
    Ok(ctx.render("glue_screen.jinja2", &VIEW)?.trim_end().to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;

    #[test]
    fn test_extern_and_glue_share_name() {
        let ctx = GeneratorContext::new(GeneratorConfig::default());
        let host = render_methods(&ctx).unwrap();
        assert!(host.contains("[APICategory(\"Screen\")]"));
        assert!(host.contains("private static extern double __GetDevicePixelRatio_Internal();"));
        assert!(host.contains("return 1.0;"));
        let glue = render_functions(&ctx).unwrap();
        assert!(glue.starts_with("    __GetDevicePixelRatio_Internal: function() {"));
        assert!(glue.contains("return dpr;"));
    }
}
