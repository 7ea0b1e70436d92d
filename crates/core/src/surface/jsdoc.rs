//! JSDoc tag extraction.

use std::collections::BTreeMap;

/// Parsed JSDoc block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsDoc {
    /// Text before the first tag.
    pub description: Option<String>,
    /// `@param` descriptions by parameter name.
    pub params: BTreeMap<String, String>,
    /// `@deprecated` message; empty when the tag has no text.
    pub deprecated: Option<String>,
    /// `@returns` text.
    pub returns: Option<String>,
}

impl JsDoc {
    /// Parses a comment body with its `/**`, `*/` and `*` markers stripped.
    pub fn parse(body: &str) -> Self {
        let mut doc = Self::default();
        let mut description = Vec::new();
        let mut current: Option<(String, Vec<String>)> = None;

        for line in body.lines() {
            let line = line.trim();
            if let Some(tagged) = line.strip_prefix('@') {
                if let Some((tag, text)) = current.take() {
                    doc.apply(&tag, &text.join("\n"));
                }
                let (tag, rest) = tagged.split_once(char::is_whitespace).unwrap_or((tagged, ""));
                current = Some((tag.to_string(), vec![rest.trim().to_string()]));
            } else if let Some((_, text)) = current.as_mut() {
                text.push(line.to_string());
            } else {
                description.push(line);
            }
        }
        if let Some((tag, text)) = current.take() {
            doc.apply(&tag, &text.join("\n"));
        }

        let description = description.join("\n").trim().to_string();
        if !description.is_empty() {
            doc.description = Some(description);
        }
        doc
    }

    fn apply(&mut self, tag: &str, text: &str) {
        let text = text.trim();
        match tag {
            "param" => {
                let text = strip_type_annotation(text);
                let (name, rest) = text.split_once(char::is_whitespace).unwrap_or((text, ""));
                let name = name.trim_matches(|c| c == '[' || c == ']');
                let name = name.split('=').next().unwrap_or(name);
                let rest = rest.trim().trim_start_matches('-').trim();
                if !name.is_empty() && !rest.is_empty() {
                    self.params
                        .entry(name.to_string())
                        .or_insert_with(|| rest.to_string());
                }
            }
            "deprecated" => self.deprecated = Some(text.to_string()),
            "returns" | "return" => {
                let text = strip_type_annotation(text);
                if !text.is_empty() {
                    self.returns = Some(text.to_string());
                }
            }
            _ => {}
        }
    }
}

/// Drops a leading `{Type}` annotation.
fn strip_type_annotation(text: &str) -> &str {
    if text.starts_with('{') {
        if let Some(end) = text.find('}') {
            return text[end + 1..].trim_start();
        }
    }
    text
}
