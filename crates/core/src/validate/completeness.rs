//! Post-generation gates: nothing dropped, nothing obviously malformed.

use std::collections::HashMap;

use crate::codegen::{Generation, category_file_name};
use crate::error::{GeneratorError, MissingApi, Result};
use crate::ir::model::ParsedApi;

/// Fails when any API has no method text or is absent from its category file.
pub fn ensure_complete(apis: &[ParsedApi], generation: &Generation) -> Result<()> {
    let host: HashMap<&str, &str> = generation
        .code
        .iter()
        .map(|code| (code.api.as_str(), code.host_code.as_str()))
        .collect();
    let missing: Vec<MissingApi> = apis
        .iter()
        .filter_map(|api| {
            let file = category_file_name(&api.category);
            let has_code = host
                .get(api.pascal_name.as_str())
                .is_some_and(|code| !code.trim().is_empty());
            let in_file = generation
                .file(&file)
                .is_some_and(|f| f.contents.contains(api.pascal_name.as_str()));
            (!(has_code && in_file)).then(|| MissingApi {
                file,
                api: api.pascal_name.clone(),
            })
        })
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(GeneratorError::Incomplete { missing })
    }
}

/// First unbalanced delimiter, skipping strings and comments.
pub fn unbalanced(text: &str) -> Option<String> {
    let mut stack: Vec<(char, usize)> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut line = 1;
    while let Some(c) = chars.next() {
        match c {
            '\n' => line += 1,
            '/' if chars.peek() == Some(&'/') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        line += 1;
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = ' ';
                for next in chars.by_ref() {
                    if next == '\n' {
                        line += 1;
                    }
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            '"' | '\'' | '`' => {
                let quote = c;
                while let Some(next) = chars.next() {
                    match next {
                        '\\' => {
                            chars.next();
                        }
                        '\n' => {
                            line += 1;
                            if quote != '`' {
                                break;
                            }
                        }
                        _ if next == quote => break,
                        _ => {}
                    }
                }
            }
            '{' | '(' | '[' => stack.push((c, line)),
            '}' | ')' | ']' => {
                let expected = match c {
                    '}' => '{',
                    ')' => '(',
                    _ => '[',
                };
                match stack.pop() {
                    Some((open, _)) if open == expected => {}
                    Some((open, opened)) => {
                        return Some(format!(
                            "line {line}: `{c}` closes `{open}` opened on line {opened}"
                        ));
                    }
                    None => return Some(format!("line {line}: unmatched `{c}`")),
                }
            }
            _ => {}
        }
    }
    stack
        .pop()
        .map(|(open, opened)| format!("line {opened}: `{open}` is never closed"))
}

/// Shape problems in the rendered files. These never fail a run.
pub fn syntax_warnings(generation: &Generation) -> Vec<String> {
    let mut warnings = Vec::new();
    for file in &generation.files {
        let name = file.path.display();
        if let Some(problem) = unbalanced(&file.contents) {
            warnings.push(format!("{name}: {problem}"));
        }
        let is_jslib = file.path.extension().is_some_and(|e| e == "jslib");
        if is_jslib && !file.contents.contains("mergeInto(LibraryManager.library") {
            warnings.push(format!("{name}: missing mergeInto(LibraryManager.library"));
        }
        if !is_jslib && file.contents.contains(" extern ") && !file.contents.contains("DllImport") {
            warnings.push(format!("{name}: extern declared without DllImport"));
        }
    }
    warnings
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::codegen::OutputFile;
    use crate::ir::model::{ApiKind, GeneratedCode, ParsedType};

    fn api(name: &str) -> ParsedApi {
        ParsedApi {
            name: name.into(),
            pascal_name: crate::ir::names::capitalize(name),
            original_name: name.into(),
            category: "Device".into(),
            namespace: None,
            parameters: vec![],
            return_type: ParsedType::primitive("void"),
            is_async: false,
            kind: ApiKind::Function,
            nested_callbacks: vec![],
            deprecated: None,
            description: None,
        }
    }

    #[test]
    fn test_missing_api_is_reported() {
        let generation = Generation {
            files: vec![OutputFile {
                path: "AIT.Device.cs".into(),
                contents: "public static void SetScreenAwakeMode() {}".into(),
            }],
            code: vec![GeneratedCode {
                api: "SetScreenAwakeMode".into(),
                category: "Device".into(),
                host_code: "SetScreenAwakeMode".into(),
                glue_code: String::new(),
            }],
            categories: vec![],
            bridge: String::new(),
        };
        assert!(ensure_complete(&[api("setScreenAwakeMode")], &generation).is_ok());
        let err = ensure_complete(
            &[api("setScreenAwakeMode"), api("setSecureScreen")],
            &generation,
        )
        .unwrap_err();
        let GeneratorError::Incomplete { missing } = err else {
            unreachable!("incomplete expected");
        };
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].api, "SetSecureScreen");
        assert_eq!(missing[0].file, "AIT.Device.cs");
    }

    #[test]
    fn test_balance_ignores_strings_and_comments() {
        assert!(unbalanced("void F() { var s = \"{\"; // }\n /* ( */ }").is_none());
        assert!(unbalanced("var t = '}';").is_none());
        assert_eq!(unbalanced("{ (").unwrap(), "line 1: `(` is never closed");
        assert!(unbalanced("{\n)").unwrap().starts_with("line 2:"));
    }

    #[test]
    fn test_jslib_without_merge_into_warns() {
        let generation = Generation {
            files: vec![OutputFile {
                path: "Plugins/AppsInToss-Device.jslib".into(),
                contents: "var x = {};".into(),
            }],
            ..Generation::default()
        };
        let warnings = syntax_warnings(&generation);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("mergeInto"));
    }
}
