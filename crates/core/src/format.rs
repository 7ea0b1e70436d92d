//! Post-processing of generated C# files.

use std::path::Path;
use std::process::Command;

use tracing::{debug, warn};

/// What a format pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormatReport {
    /// Files whose doc comments changed.
    pub cleaned: usize,
    /// `dotnet csharpier` ran successfully.
    pub formatter_ran: bool,
}

/// Removes markdown leftovers from a `///` line; other lines pass through.
pub fn clean_doc_line(line: &str) -> String {
    let indent_len = line.len() - line.trim_start().len();
    let (indent, rest) = line.split_at(indent_len);
    let Some(body) = rest.strip_prefix("///") else {
        return line.to_string();
    };
    let text = body.trim_start();
    let text = text
        .strip_prefix("- ")
        .or_else(|| text.strip_prefix("* "))
        .unwrap_or(text)
        .replace('`', "");
    if text.is_empty() {
        format!("{indent}///")
    } else {
        format!("{indent}/// {text}")
    }
}

/// Applies [`clean_doc_line`] to every line, keeping the trailing newline.
pub fn clean_doc_comments(text: &str) -> String {
    let mut cleaned: Vec<String> = text.lines().map(clean_doc_line).collect();
    if text.ends_with('\n') {
        cleaned.push(String::new());
    }
    cleaned.join("\n")
}

/// Cleans the doc comments of every `.cs` file in `dir`; returns how many changed.
pub fn clean_output(dir: &Path) -> Result<usize, String> {
    let entries =
        std::fs::read_dir(dir).map_err(|e| format!("Failed to read {}: {e}", dir.display()))?;
    let mut cleaned_files = 0;
    for entry in entries {
        let path = entry
            .map_err(|e| format!("Failed to read {}: {e}", dir.display()))?
            .path();
        if !path.extension().is_some_and(|e| e == "cs") {
            continue;
        }
        let text = std::fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
        let cleaned = clean_doc_comments(&text);
        if cleaned != text {
            std::fs::write(&path, cleaned)
                .map_err(|e| format!("Failed to write {}: {e}", path.display()))?;
            cleaned_files += 1;
        }
    }
    Ok(cleaned_files)
}

/// Cleans every `.cs` file in `dir`, then runs `dotnet csharpier format` when available.
pub fn format_output(dir: &Path) -> Result<FormatReport, String> {
    let mut report = FormatReport {
        cleaned: clean_output(dir)?,
        formatter_ran: false,
    };
    debug!("Cleaned doc comments in {} files", report.cleaned);

    let Ok(dotnet) = which::which("dotnet") else {
        warn!("dotnet not found on PATH, skipping csharpier");
        return Ok(report);
    };
    let output = Command::new(dotnet)
        .args(["csharpier", "format"])
        .arg(dir)
        .output()
        .map_err(|e| format!("Failed to run dotnet csharpier: {e}"))?;
    if output.status.success() {
        report.formatter_ran = true;
    } else {
        warn!(
            "csharpier failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_doc_line() {
        assert_eq!(
            clean_doc_line("        /// - Returns `true` when done"),
            "        /// Returns true when done"
        );
        assert_eq!(clean_doc_line("    ///"), "    ///");
        assert_eq!(clean_doc_line("var s = \"`x`\";"), "var s = \"`x`\";");
    }

    #[test]
    fn test_format_output_cleans_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("AIT.cs"), "/// * `a`\nclass A {}\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "/// `keep`\n").unwrap();
        assert_eq!(clean_output(dir.path()).unwrap(), 1);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("AIT.cs")).unwrap(),
            "/// a\nclass A {}\n"
        );
        assert_eq!(
            std::fs::read_to_string(dir.path().join("notes.txt")).unwrap(),
            "/// `keep`\n"
        );
    }
}
