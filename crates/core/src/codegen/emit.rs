//! C# text emission via the Emit trait.
//!
//! Every node emits itself at column zero; containers indent their children with
//! [`indent`]. Output uses four-space indentation and `\n` line endings.

use super::csharp::{
    CsClass, CsConstants, CsEnum, CsEnumMember, CsField, CsFile, CsItem, CsMember, CsMethod,
    CsProperty,
};
use crate::ir::names::{escape_csharp_string, xml_safe};

/// Converts a syntax node to C# source text.
pub trait Emit {
    /// Source text of the node, without a trailing newline.
    fn emit(&self) -> String;
}

/// Indents every non-empty line by `levels` * 4 spaces.
pub fn indent(text: &str, levels: usize) -> String {
    let pad = "    ".repeat(levels);
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{pad}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `/// <summary>` block, empty when there is no text.
pub fn summary(doc: Option<&str>) -> String {
    match doc.map(xml_safe).filter(|text| !text.is_empty()) {
        Some(text) => format!("/// <summary>\n/// {text}\n/// </summary>\n"),
        None => String::new(),
    }
}

fn attributes(attrs: &[String]) -> String {
    attrs.iter().map(|a| format!("[{a}]\n")).collect()
}

// =============================================================================
// Members
// =============================================================================

impl Emit for CsField {
    fn emit(&self) -> String {
        format!(
            "{}{}public {} {};",
            summary(self.doc.as_deref()),
            attributes(&self.attributes),
            self.ty,
            self.name
        )
    }
}

impl Emit for CsProperty {
    fn emit(&self) -> String {
        format!(
            "{}public {} {} => {};",
            attributes(&self.attributes),
            self.ty,
            self.name,
            self.expr
        )
    }
}

impl Emit for CsMethod {
    fn emit(&self) -> String {
        let body = self.body.join("\n");
        format!("{}\n{{\n{}\n}}", self.signature, indent(&body, 1))
    }
}

impl Emit for CsConstants {
    fn emit(&self) -> String {
        let values = self
            .values
            .iter()
            .map(|(name, value)| {
                format!("public const string {name} = \"{}\";", escape_csharp_string(value))
            })
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "public static class {}\n{{\n{}\n}}",
            self.name,
            indent(&values, 1)
        )
    }
}

impl Emit for CsMember {
    fn emit(&self) -> String {
        match self {
            Self::Field(field) => field.emit(),
            Self::Property(property) => property.emit(),
            Self::Method(method) => method.emit(),
            Self::Constants(constants) => constants.emit(),
        }
    }
}

// =============================================================================
// Declarations
// =============================================================================

impl Emit for CsClass {
    fn emit(&self) -> String {
        let mut output = summary(self.doc.as_deref());
        output.push_str(&attributes(&self.attributes));
        output.push_str(&format!("public class {}\n{{\n", self.name));
        let members = self
            .members
            .iter()
            .map(|m| indent(&m.emit(), 1))
            .collect::<Vec<_>>()
            .join("\n");
        if !members.is_empty() {
            output.push_str(&members);
            output.push('\n');
        }
        output.push('}');
        output
    }
}

impl Emit for CsEnumMember {
    fn emit(&self) -> String {
        let mut output = String::new();
        if let Some(wire) = &self.wire {
            output.push_str(&format!(
                "[EnumMember(Value = \"{}\")]\n",
                escape_csharp_string(wire)
            ));
        }
        output.push_str(&self.name);
        if let Some(value) = &self.value {
            output.push_str(&format!(" = {value}"));
        }
        output.push(',');
        output
    }
}

impl Emit for CsEnum {
    fn emit(&self) -> String {
        let members = self
            .members
            .iter()
            .map(|m| indent(&m.emit(), 1))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "{}public enum {}\n{{\n{members}\n}}",
            summary(self.doc.as_deref()),
            self.name
        )
    }
}

impl Emit for CsItem {
    fn emit(&self) -> String {
        match self {
            Self::Section(title) => {
                let rule = format!("// {}", "=".repeat(67));
                format!("{rule}\n// {title}\n{rule}")
            }
            Self::Class(class) => class.emit(),
            Self::Enum(en) => en.emit(),
        }
    }
}

// =============================================================================
// Files
// =============================================================================

impl Emit for CsFile {
    fn emit(&self) -> String {
        let mut output = self.header.clone();
        if !output.is_empty() && !output.ends_with('\n') {
            output.push('\n');
        }
        output.push('\n');
        for using in &self.usings {
            output.push_str(&format!("using {using};\n"));
        }
        output.push_str(&format!("\nnamespace {}\n{{\n", self.namespace));
        let items = self
            .items
            .iter()
            .map(|item| indent(&item.emit(), 1))
            .collect::<Vec<_>>()
            .join("\n\n");
        output.push_str(&items);
        output.push_str("\n}\n");
        output
    }
}
