//! Name synthesis helpers shared by the mapper, collector and templates.
//!
//! Each heuristic is a small pure function. Known ambiguous inputs:
//! - `Foo$1` and `Foo1` both clean to a name starting with `Foo`; the `$N` suffix is dropped
//!   first so `Foo$1` becomes `Foo`.
//! - two anonymous objects owned by the same API and parameter name map to the same
//!   synthesized name; the collector keeps the first.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// C# reserved words that cannot be parameter names.
pub static CSHARP_KEYWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "abstract", "as", "base", "bool", "break", "byte", "case", "catch", "char", "checked",
        "class", "const", "continue", "decimal", "default", "delegate", "do", "double", "else",
        "enum", "event", "explicit", "extern", "false", "finally", "fixed", "float", "for",
        "foreach", "goto", "if", "implicit", "in", "int", "interface", "internal", "is", "lock",
        "long", "namespace", "new", "null", "object", "operator", "out", "override", "params",
        "private", "protected", "public", "readonly", "ref", "return", "sbyte", "sealed",
        "short", "sizeof", "stackalloc", "static", "string", "struct", "switch", "this",
        "throw", "true", "try", "typeof", "uint", "ulong", "unchecked", "unsafe", "ushort",
        "using", "virtual", "void", "volatile", "while",
    ]
    .into_iter()
    .collect()
});

static IMPORT_PREFIX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"import\(\s*["'][^"']*["']\s*\)\."#).ok());
static GENERATED_SUFFIX: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\$\d+$").ok());

/// Upper-cases the first character.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Lower-cases the first character.
pub fn decapitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_lowercase().chain(chars).collect()
    })
}

/// PascalCase for identifiers that may contain `-`, `_` or spaces.
pub fn pascal_case(s: &str) -> String {
    s.split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(capitalize)
        .collect()
}

/// Reduces a declared type name to a C# identifier.
///
/// Strips `import("…").` prefixes, `typeof `, generic arguments, namespace qualifiers,
/// everything after the first `|`, compiler `$N` suffixes and non-identifier characters.
pub fn clean_name(raw: &str) -> String {
    let mut name = match IMPORT_PREFIX.as_ref() {
        Some(re) => re.replace_all(raw.trim(), "").into_owned(),
        None => raw.trim().to_string(),
    };
    if let Some(rest) = name.strip_prefix("typeof ") {
        name = rest.to_string();
    }
    if let Some(idx) = name.find('|') {
        name.truncate(idx);
    }
    if let Some(idx) = name.find('<') {
        name.truncate(idx);
    }
    if let Some(last) = name.rsplit('.').next() {
        name = last.to_string();
    }
    let name = match GENERATED_SUFFIX.as_ref() {
        Some(re) => re.replace(name.trim(), "").into_owned(),
        None => name.trim().to_string(),
    };
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

/// Drops one trailing `s` (`orders` → `order`).
pub fn singularize(s: &str) -> String {
    match s.strip_suffix('s') {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => s.to_string(),
    }
}

/// Appends `Param` to C# keywords (`params` → `paramsParam`).
pub fn escape_csharp_keyword(name: &str) -> String {
    if CSHARP_KEYWORDS.contains(name) {
        format!("{name}Param")
    } else {
        name.to_string()
    }
}

/// C# member name for an enum value (`landscape` → `Landscape`, `2x` → `_2x`).
pub fn enum_member_name(value: &str) -> String {
    let sanitized: String = value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    let prefixed = if sanitized.starts_with(|c: char| c.is_ascii_digit()) || sanitized.is_empty() {
        format!("_{sanitized}")
    } else {
        sanitized
    };
    capitalize(&prefixed)
}

/// `"text"` → `text` for C# string literals.
pub fn escape_csharp_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Collapses a JSDoc block into single-line XML doc text.
///
/// Markdown list markers and backticks are removed, and `&`, `<`, `>` are escaped.
pub fn xml_safe(text: &str) -> String {
    let joined = text
        .lines()
        .map(|line| {
            let trimmed = line.trim_start();
            trimmed
                .strip_prefix("- ")
                .or_else(|| trimmed.strip_prefix("* "))
                .unwrap_or(trimmed)
        })
        .collect::<Vec<_>>()
        .join(" ");
    joined
        .replace('`', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
