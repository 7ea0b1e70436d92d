//! Golden snapshot comparison.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use similar::TextDiff;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::GoldenThresholds;
use crate::error::{GeneratorError, Result};

static CLASS_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\bclass\s+\w+").ok());
static ENUM_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\benum\s+\w+").ok());
static METHOD_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\[APICategory\(").ok());

fn count(re: &LazyLock<Option<Regex>>, text: &str) -> usize {
    re.as_ref().map_or(0, |re| re.find_iter(text).count())
}

/// Drops comments, blank lines and trailing whitespace; normalizes line endings.
pub fn normalize(text: &str) -> String {
    text.replace("\r\n", "\n")
        .lines()
        .map(str::trim_end)
        .filter(|line| {
            let trimmed = line.trim_start();
            !trimmed.is_empty()
                && !trimmed.starts_with("//")
                && !trimmed.starts_with("/*")
                && !trimmed.starts_with('*')
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Declaration counts of a text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    /// `class X`
    pub classes: usize,
    /// `enum X`
    pub enums: usize,
    /// API methods (one `[APICategory]` each).
    pub methods: usize,
}

impl Counts {
    /// Counts declarations in normalized text.
    pub fn of(text: &str) -> Self {
        let text = normalize(text);
        Self {
            classes: count(&CLASS_RE, &text),
            enums: count(&ENUM_RE, &text),
            methods: count(&METHOD_RE, &text),
        }
    }

    fn add(&mut self, other: Self) {
        self.classes += other.classes;
        self.enums += other.enums;
        self.methods += other.methods;
    }
}

/// Result of comparing an output directory to its snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoldenReport {
    /// Totals over the generated files.
    pub generated: Counts,
    /// Totals over the snapshot.
    pub golden: Counts,
    /// Unified diffs of files whose normalized text differs, by relative path.
    pub diffs: BTreeMap<String, String>,
    /// Snapshot files absent from the output.
    pub missing: Vec<String>,
}

impl GoldenReport {
    /// Count regressions below the ratio; empty when the comparison passes.
    pub fn failures(&self, thresholds: GoldenThresholds) -> Vec<String> {
        let checks = [
            ("classes", self.generated.classes, self.golden.classes),
            ("enums", self.generated.enums, self.golden.enums),
            ("API methods", self.generated.methods, self.golden.methods),
        ];
        let mut failures: Vec<String> = checks
            .into_iter()
            .filter(|(_, generated, golden)| {
                (*generated as f64) < (*golden as f64) * thresholds.min_count_ratio
            })
            .map(|(label, generated, golden)| {
                format!(
                    "{label}: {generated} generated, snapshot has {golden} (minimum ratio {:.2})",
                    thresholds.min_count_ratio
                )
            })
            .collect();
        failures.extend(self.missing.iter().map(|file| format!("{file}: missing from output")));
        failures
    }

    /// No textual differences at all.
    pub fn is_identical(&self) -> bool {
        self.diffs.is_empty() && self.missing.is_empty()
    }
}

/// Unified diff of two normalized texts; `None` when they match.
pub fn diff(name: &str, golden: &str, generated: &str) -> Option<String> {
    let golden = normalize(golden);
    let generated = normalize(generated);
    if golden == generated {
        return None;
    }
    let diff = TextDiff::from_lines(&golden, &generated);
    Some(
        diff.unified_diff()
            .context_radius(3)
            .header(&format!("{name} (golden)"), &format!("{name} (generated)"))
            .to_string(),
    )
}

fn snapshot_files(dir: &Path) -> Result<BTreeMap<String, PathBuf>> {
    let mut files = BTreeMap::new();
    if !dir.is_dir() {
        return Ok(files);
    }
    for entry in WalkDir::new(dir) {
        let entry =
            entry.map_err(|e| GeneratorError::io(dir, std::io::Error::other(e.to_string())))?;
        let path = entry.path();
        let tracked = path
            .extension()
            .is_some_and(|e| e == "cs" || e == "jslib");
        if !entry.file_type().is_file() || !tracked {
            continue;
        }
        if let Ok(relative) = path.strip_prefix(dir) {
            let key = relative.to_string_lossy().replace('\\', "/");
            files.insert(key, path.to_path_buf());
        }
    }
    Ok(files)
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| GeneratorError::io(path, e))
}

/// Compares every `.cs`/`.jslib` file of a snapshot with the generated output.
pub fn compare_dirs(generated: &Path, golden: &Path) -> Result<GoldenReport> {
    let golden_files = snapshot_files(golden)?;
    let generated_files = snapshot_files(generated)?;
    let mut report = GoldenReport::default();
    for path in generated_files.values() {
        report.generated.add(Counts::of(&read(path)?));
    }
    for (name, path) in &golden_files {
        let expected = read(path)?;
        report.golden.add(Counts::of(&expected));
        match generated_files.get(name) {
            Some(actual) => {
                if let Some(text) = diff(name, &expected, &read(actual)?) {
                    report.diffs.insert(name.clone(), text);
                }
            }
            None => report.missing.push(name.clone()),
        }
    }
    debug!(
        "Golden comparison: {} files, {} differ, {} missing",
        golden_files.len(),
        report.diffs.len(),
        report.missing.len()
    );
    Ok(report)
}

/// Replaces the snapshot with the generated `.cs`/`.jslib` files.
pub fn update_golden(generated: &Path, golden: &Path) -> Result<usize> {
    for stale in snapshot_files(golden)?.values() {
        std::fs::remove_file(stale).map_err(|e| GeneratorError::io(stale, e))?;
    }
    let files = snapshot_files(generated)?;
    for (name, source) in &files {
        let target = golden.join(name);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| GeneratorError::io(parent, e))?;
        }
        std::fs::copy(source, &target).map_err(|e| GeneratorError::io(&target, e))?;
    }
    info!("Updated {} golden files in {}", files.len(), golden.display());
    Ok(files.len())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_drops_comments_and_blank_lines() {
        let text = "// header\r\n\r\nclass A   \r\n{\r\n    /// <summary>\r\n}\r\n";
        assert_eq!(normalize(text), "class A\n{\n}");
    }

    #[test]
    fn test_counts() {
        let counts = Counts::of(
            "public class A {}\npublic enum B {}\n[APICategory(\"X\")]\n// class Hidden\n",
        );
        assert_eq!(
            counts,
            Counts {
                classes: 1,
                enums: 1,
                methods: 1
            }
        );
    }

    #[test]
    fn test_compare_and_update() {
        let generated = tempfile::tempdir().unwrap();
        let golden = tempfile::tempdir().unwrap();
        std::fs::write(generated.path().join("AIT.cs"), "// new\nclass A {}\n").unwrap();
        std::fs::write(golden.path().join("AIT.cs"), "class A {}\n").unwrap();
        std::fs::write(golden.path().join("AIT.Types.cs"), "class B {}\nclass C {}\n").unwrap();

        let report = compare_dirs(generated.path(), golden.path()).unwrap();
        assert!(report.diffs.is_empty());
        assert_eq!(report.missing, vec!["AIT.Types.cs"]);
        assert_eq!(report.generated.classes, 1);
        assert_eq!(report.golden.classes, 3);
        assert_eq!(report.failures(GoldenThresholds::default()).len(), 2);

        assert_eq!(update_golden(generated.path(), golden.path()).unwrap(), 1);
        let report = compare_dirs(generated.path(), golden.path()).unwrap();
        assert!(report.is_identical());
        assert!(report.failures(GoldenThresholds::default()).is_empty());
    }

    #[test]
    fn test_diff_is_unified() {
        let text = diff("AIT.cs", "class A {}\n", "class B {}\n").unwrap();
        assert!(text.contains("--- AIT.cs (golden)"));
        assert!(text.contains("-class A {}"));
        assert!(text.contains("+class B {}"));
    }
}
