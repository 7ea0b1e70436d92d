//! Compiles the generated C# against minimal Unity and Newtonsoft stubs.
//!
//! Only runs when `mcs` or `csc` is on `PATH`.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

static DIAGNOSTIC_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?m)^(.+?)\((\d+),(\d+)\):\s*error\s+(CS\d+):\s*(.*?)\s*$").ok()
});

const STUBS: &str = r"
namespace UnityEngine
{
    public class Object
    {
        public static void DontDestroyOnLoad(Object target) {}
    }
    public class Component : Object {}
    public class Behaviour : Component {}
    public class MonoBehaviour : Behaviour {}
    public class GameObject : Object
    {
        public GameObject(string name) {}
        public T AddComponent<T>() where T : Component, new() { return new T(); }
    }
    public static class Debug
    {
        public static void Log(object message) {}
        public static void LogWarning(object message) {}
        public static void LogError(object message) {}
    }
}

namespace UnityEngine.Scripting
{
    [System.AttributeUsage(System.AttributeTargets.All)]
    public class PreserveAttribute : System.Attribute {}
}

namespace Newtonsoft.Json
{
    public abstract class JsonConverter {}
    public class JsonSerializerSettings
    {
        public System.Collections.Generic.IList<JsonConverter> Converters { get; } =
            new System.Collections.Generic.List<JsonConverter>();
    }
    public static class JsonConvert
    {
        public static string SerializeObject(object value) { return null; }
        public static string SerializeObject(object value, JsonSerializerSettings settings) { return null; }
        public static T DeserializeObject<T>(string value) { return default(T); }
        public static T DeserializeObject<T>(string value, JsonSerializerSettings settings) { return default(T); }
    }
    [System.AttributeUsage(System.AttributeTargets.Field | System.AttributeTargets.Property)]
    public class JsonPropertyAttribute : System.Attribute
    {
        public JsonPropertyAttribute() {}
        public JsonPropertyAttribute(string propertyName) {}
    }
    [System.AttributeUsage(System.AttributeTargets.Field | System.AttributeTargets.Property)]
    public class JsonIgnoreAttribute : System.Attribute {}
}

namespace Newtonsoft.Json.Converters
{
    public class StringEnumConverter : Newtonsoft.Json.JsonConverter {}
}
";

/// One `error CSxxxx` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerDiagnostic {
    /// Source file as reported.
    pub file: String,
    /// 1-based line.
    pub line: u32,
    /// 1-based column.
    pub column: u32,
    /// `CSxxxx`
    pub code: String,
    /// Compiler message.
    pub message: String,
}

/// Outcome of a compile check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileOutcome {
    /// No compiler available.
    Skipped(String),
    /// Compiled cleanly.
    Passed,
    /// Compiler errors.
    Failed(Vec<CompilerDiagnostic>),
}

/// First of `mcs`/`csc` found on `PATH`.
pub fn find_compiler() -> Option<PathBuf> {
    ["mcs", "csc"]
        .into_iter()
        .find_map(|name| which::which(name).ok())
}

/// Parses `file(line,col): error CSxxxx: message` lines.
pub fn parse_diagnostics(output: &str) -> Vec<CompilerDiagnostic> {
    let Some(re) = DIAGNOSTIC_RE.as_ref() else {
        return Vec::new();
    };
    re.captures_iter(output)
        .map(|caps| CompilerDiagnostic {
            file: caps[1].trim().to_string(),
            line: caps[2].parse().unwrap_or(0),
            column: caps[3].parse().unwrap_or(0),
            code: caps[4].to_string(),
            message: caps[5].to_string(),
        })
        .collect()
}

fn cs_files(dir: &Path) -> Result<Vec<PathBuf>, String> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| format!("Failed to read {}: {e}", dir.display()))?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|e| e == "cs"))
        .collect();
    files.sort();
    Ok(files)
}

/// Compiles every `.cs` file in `dir` as a library.
pub fn compile_output(dir: &Path) -> Result<CompileOutcome, String> {
    let Some(compiler) = find_compiler() else {
        return Ok(CompileOutcome::Skipped(
            "neither mcs nor csc found on PATH".to_string(),
        ));
    };
    let files = cs_files(dir)?;
    if files.is_empty() {
        return Err(format!("No .cs files in {}", dir.display()));
    }

    let work = tempfile::tempdir().map_err(|e| format!("Failed to create temp dir: {e}"))?;
    let stubs = work.path().join("Stubs.cs");
    std::fs::write(&stubs, STUBS).map_err(|e| format!("Failed to write stubs: {e}"))?;
    let assembly = work.path().join("AppsInToss.dll");

    debug!(compiler = %compiler.display(), files = files.len(), "Compiling generated sources");
    let output = Command::new(&compiler)
        .arg("-target:library")
        .arg("-nologo")
        .arg("-r:System.Runtime.Serialization.dll")
        .arg(format!("-out:{}", assembly.display()))
        .arg(&stubs)
        .args(&files)
        .output()
        .map_err(|e| format!("Failed to run {}: {e}", compiler.display()))?;

    if output.status.success() {
        info!("Generated C# compiled with {}", compiler.display());
        return Ok(CompileOutcome::Passed);
    }
    let text = format!(
        "{}\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    let diagnostics = parse_diagnostics(&text);
    if diagnostics.is_empty() {
        return Err(format!("Compiler failed without diagnostics:\n{}", text.trim()));
    }
    Ok(CompileOutcome::Failed(diagnostics))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_diagnostics() {
        let output = "AIT.Types.cs(12,9): error CS0246: The type or namespace name `Foo' could not be found\r\n\
                      AIT.cs(3,1): warning CS0105: duplicate using\n";
        let diagnostics = parse_diagnostics(output);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].file, "AIT.Types.cs");
        assert_eq!(diagnostics[0].line, 12);
        assert_eq!(diagnostics[0].column, 9);
        assert_eq!(diagnostics[0].code, "CS0246");
        assert!(diagnostics[0].message.starts_with("The type or namespace name"));
    }

    #[test]
    fn test_empty_output_dir_is_error_or_skip() {
        let dir = tempfile::tempdir().unwrap();
        match compile_output(dir.path()) {
            Ok(CompileOutcome::Skipped(_)) => assert!(find_compiler().is_none()),
            Err(message) => assert!(message.contains("No .cs files")),
            Ok(other) => unreachable!("unexpected outcome {other:?}"),
        }
    }
}
