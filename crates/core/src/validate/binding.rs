//! Extern ↔ glue consistency, checked on the generated text itself.
//!
//! Both sides are parsed back out of the emitted files, so the check holds even if the
//! two renderers drift apart.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use walkdir::WalkDir;

use crate::config::BindingThresholds;
use crate::error::{GeneratorError, Result};

static EXTERN_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r#"DllImport\("__Internal"\)\]\s*(?:(?:private|public|internal|protected)\s+)*static\s+extern\s+(\w+)\s+(\w+)\s*\(([^)]*)\)"#,
    )
    .ok()
});

static GLUE_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*(\w+)\s*:\s*function\s*\(([^)]*)\)\s*\{").ok());

const HANDLER_NAMES: &[&str] = &["onEvent", "onError"];

/// A `DllImport` extern declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternDecl {
    /// Function name.
    pub name: String,
    /// Declared return type.
    pub return_type: String,
    /// `(type, name)` pairs.
    pub params: Vec<(String, String)>,
}

/// A function inside a `mergeInto` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlueFunction {
    /// Property name.
    pub name: String,
    /// Parameter names.
    pub params: Vec<String>,
    /// Text between the braces.
    pub body: String,
}

/// Extern and glue function disagreeing on parameter count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArityMismatch {
    /// Shared name.
    pub name: String,
    /// Parameters on the C# side.
    pub extern_arity: usize,
    /// Parameters on the JS side.
    pub glue_arity: usize,
}

/// Findings of one binding check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingReport {
    /// Externs considered.
    pub externs: usize,
    /// Glue functions considered.
    pub glue_functions: usize,
    /// Externs with a same-named glue function.
    pub matched: usize,
    /// Externs without glue.
    pub unpaired_externs: Vec<String>,
    /// Glue without an extern.
    pub unpaired_glue: Vec<String>,
    /// Paired functions with different arity.
    pub arity_mismatches: Vec<ArityMismatch>,
    /// Paired functions taking strings.
    pub string_functions: usize,
    /// Of those, the ones not decoding every string with `UTF8ToString`.
    pub missing_utf8: Vec<String>,
    /// Paired void externs.
    pub void_functions: usize,
    /// Of those, the ones never calling `SendMessage`.
    pub missing_send_message: Vec<String>,
}

fn ratio(ok: usize, total: usize) -> f64 {
    if total == 0 {
        1.0
    } else {
        ok as f64 / total as f64
    }
}

impl BindingReport {
    /// Share of externs that have glue.
    pub fn match_ratio(&self) -> f64 {
        ratio(self.matched, self.externs)
    }

    /// Share of string-taking functions that decode their strings.
    pub fn utf8_ratio(&self) -> f64 {
        ratio(
            self.string_functions - self.missing_utf8.len(),
            self.string_functions,
        )
    }

    /// Share of void externs replying through `SendMessage`.
    pub fn send_message_ratio(&self) -> f64 {
        ratio(
            self.void_functions - self.missing_send_message.len(),
            self.void_functions,
        )
    }

    /// Threshold violations; empty when the check passes.
    pub fn failures(&self, thresholds: &BindingThresholds) -> Vec<String> {
        let mut failures = Vec::new();
        if self.match_ratio() < thresholds.min_match_ratio {
            failures.push(format!(
                "match ratio {:.2} below {:.2}; unpaired externs: {}",
                self.match_ratio(),
                thresholds.min_match_ratio,
                self.unpaired_externs.join(", ")
            ));
        }
        for mismatch in &self.arity_mismatches {
            failures.push(format!(
                "{}: extern takes {} parameters, glue takes {}",
                mismatch.name, mismatch.extern_arity, mismatch.glue_arity
            ));
        }
        if self.utf8_ratio() < thresholds.min_utf8_ratio {
            failures.push(format!(
                "UTF8ToString ratio {:.2} below {:.2}: {}",
                self.utf8_ratio(),
                thresholds.min_utf8_ratio,
                self.missing_utf8.join(", ")
            ));
        }
        if self.send_message_ratio() < thresholds.min_send_message_ratio {
            failures.push(format!(
                "SendMessage ratio {:.2} below {:.2}: {}",
                self.send_message_ratio(),
                thresholds.min_send_message_ratio,
                self.missing_send_message.join(", ")
            ));
        }
        failures
    }
}

/// Extracts every `DllImport("__Internal")` extern.
pub fn parse_externs(text: &str) -> Vec<ExternDecl> {
    let Some(re) = EXTERN_RE.as_ref() else {
        return Vec::new();
    };
    re.captures_iter(text)
        .map(|caps| ExternDecl {
            return_type: caps[1].to_string(),
            name: caps[2].to_string(),
            params: caps[3]
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .filter_map(|p| {
                    let (ty, name) = p.rsplit_once(char::is_whitespace)?;
                    Some((ty.trim().to_string(), name.to_string()))
                })
                .collect(),
        })
        .collect()
}

/// Text inside the braces opening at `open`, skipping string literals.
fn brace_body(text: &str, open: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (offset, c) in text[open..].char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' | '`' => quote = Some(c),
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[open + 1..open + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Extracts every `name: function(...) { ... }` glue function.
pub fn parse_glue(text: &str) -> Vec<GlueFunction> {
    let Some(re) = GLUE_RE.as_ref() else {
        return Vec::new();
    };
    re.captures_iter(text)
        .filter(|caps| !HANDLER_NAMES.contains(&&caps[1]))
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let body = brace_body(text, whole.end() - 1)?;
            Some(GlueFunction {
                name: caps[1].to_string(),
                params: caps[2]
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect(),
                body: body.to_string(),
            })
        })
        .collect()
}

/// Cross-checks externs against glue functions.
pub fn check_bindings(
    externs: &[ExternDecl],
    glue: &[GlueFunction],
    thresholds: &BindingThresholds,
) -> BindingReport {
    let allowed = |name: &str| thresholds.allow_unpaired.iter().any(|a| a == name);
    let externs: BTreeMap<&str, &ExternDecl> = externs
        .iter()
        .filter(|e| !allowed(&e.name))
        .map(|e| (e.name.as_str(), e))
        .collect();
    let glue: BTreeMap<&str, &GlueFunction> = glue
        .iter()
        .filter(|g| !allowed(&g.name))
        .map(|g| (g.name.as_str(), g))
        .collect();

    let mut report = BindingReport {
        externs: externs.len(),
        glue_functions: glue.len(),
        unpaired_glue: glue
            .keys()
            .filter(|name| !externs.contains_key(*name))
            .map(|name| (*name).to_string())
            .collect(),
        ..BindingReport::default()
    };
    for (name, decl) in &externs {
        let Some(function) = glue.get(name) else {
            report.unpaired_externs.push((*name).to_string());
            continue;
        };
        report.matched += 1;
        if decl.params.len() != function.params.len() {
            report.arity_mismatches.push(ArityMismatch {
                name: (*name).to_string(),
                extern_arity: decl.params.len(),
                glue_arity: function.params.len(),
            });
            continue;
        }
        let string_params: Vec<&str> = decl
            .params
            .iter()
            .zip(&function.params)
            .filter(|((ty, _), _)| ty == "string")
            .map(|(_, js)| js.as_str())
            .collect();
        if !string_params.is_empty() {
            report.string_functions += 1;
            let decoded = string_params
                .iter()
                .all(|p| function.body.contains(&format!("UTF8ToString({p})")));
            if !decoded {
                report.missing_utf8.push((*name).to_string());
            }
        }
        if decl.return_type == "void" {
            report.void_functions += 1;
            if !function.body.contains("SendMessage") {
                report.missing_send_message.push((*name).to_string());
            }
        }
    }
    report
}

/// Runs the check over a generated output directory.
pub fn check_output_dir(dir: &Path, thresholds: &BindingThresholds) -> Result<BindingReport> {
    let mut externs = Vec::new();
    let mut glue = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            GeneratorError::io(dir, std::io::Error::other(e.to_string()))
        })?;
        let path = entry.path();
        let extension = path.extension().and_then(|e| e.to_str());
        if !entry.file_type().is_file() || !matches!(extension, Some("cs" | "jslib")) {
            continue;
        }
        let text = std::fs::read_to_string(path).map_err(|e| GeneratorError::io(path, e))?;
        if extension == Some("cs") {
            externs.extend(parse_externs(&text));
        } else {
            glue.extend(parse_glue(&text));
        }
    }
    Ok(check_bindings(&externs, &glue, thresholds))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const CS: &str = r#"
#if UNITY_WEBGL && !UNITY_EDITOR
        [System.Runtime.InteropServices.DllImport("__Internal")]
        private static extern void __SetClipboardText_Internal(string text, string callbackId, string typeName);

        [System.Runtime.InteropServices.DllImport("__Internal")]
        private static extern void __GetLocale_Internal(string callbackId, string typeName);
#endif
"#;

    const JS: &str = r#"
mergeInto(LibraryManager.library, {
    __SetClipboardText_Internal: function(text, callbackId, typeName) {
        var textVal = UTF8ToString(text);
        var callback = UTF8ToString(callbackId);
        var typeNameStr = UTF8ToString(typeName);
        var label = '}';
        SendMessage('AITCore', 'OnAITCallback', '{}');
    },

    __GetLocale_Internal: function(callbackId) {
        return { onEvent: function(data) {}, onError: function(error) {} };
    },

    helperOnly: function() {
    }
});
"#;

    #[test]
    fn test_parse_externs() {
        let externs = parse_externs(CS);
        assert_eq!(externs.len(), 2);
        assert_eq!(externs[0].name, "__SetClipboardText_Internal");
        assert_eq!(externs[0].return_type, "void");
        assert_eq!(
            externs[0].params[0],
            ("string".to_string(), "text".to_string())
        );
    }

    #[test]
    fn test_parse_glue_skips_handlers_and_matches_braces() {
        let glue = parse_glue(JS);
        let names: Vec<&str> = glue.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["__SetClipboardText_Internal", "__GetLocale_Internal", "helperOnly"]
        );
        assert!(glue[0].body.contains("SendMessage"));
        assert!(!glue[0].body.contains("__GetLocale_Internal"));
    }

    #[test]
    fn test_report_flags_arity_and_unpaired() {
        let thresholds = BindingThresholds::default();
        let report = check_bindings(&parse_externs(CS), &parse_glue(JS), &thresholds);
        assert_eq!(report.matched, 2);
        assert_eq!(report.unpaired_glue, vec!["helperOnly"]);
        assert_eq!(report.arity_mismatches.len(), 1);
        assert_eq!(report.arity_mismatches[0].glue_arity, 1);
        assert_eq!(report.string_functions, 1);
        assert!(report.missing_utf8.is_empty());
        let failures = report.failures(&thresholds);
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("__GetLocale_Internal"));
    }

    #[test]
    fn test_allowed_names_are_ignored() {
        let thresholds = BindingThresholds {
            allow_unpaired: vec!["__GetLocale_Internal".into(), "helperOnly".into()],
            ..BindingThresholds::default()
        };
        let report = check_bindings(&parse_externs(CS), &parse_glue(JS), &thresholds);
        assert!(report.failures(&thresholds).is_empty());
        assert!((report.match_ratio() - 1.0).abs() < f64::EPSILON);
    }
}
