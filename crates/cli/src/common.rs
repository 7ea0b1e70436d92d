use std::path::{Path, PathBuf};

use console::style;
use tracing::debug;

const BRIDGE_DIRS: &[&str] = &["node_modules/@apps-in-toss/web-bridge/built"];
const FRAMEWORK_ROOT: &str = "node_modules/@apps-in-toss/web-framework";
const FRAMEWORK_DIRS: &[&str] = &["dist-web", "built", "dist", "lib"];

/// Runs a command body and maps its result to an exit code.
pub fn run_command<F>(f: F) -> i32
where
    F: FnOnce() -> Result<(), String>,
{
    match f() {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{} {}", style("✗").red().bold(), style(err).red());
            1
        }
    }
}

pub fn success(message: &str) {
    println!("{} {message}", style("✓").green().bold());
}

pub fn warning(message: &str) {
    eprintln!("{} {}", style("!").yellow().bold(), style(message).yellow());
}

/// Holds a declaration file other than `index.d.ts`.
fn has_declarations(dir: &Path) -> bool {
    std::fs::read_dir(dir).is_ok_and(|entries| {
        entries.filter_map(Result::ok).any(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            name.ends_with(".d.ts") && name != "index.d.ts"
        })
    })
}

/// Finds the bridge type definitions under `root`.
pub fn discover_source(root: &Path) -> Result<PathBuf, String> {
    let candidates = BRIDGE_DIRS
        .iter()
        .map(|dir| root.join(dir))
        .chain(
            FRAMEWORK_DIRS
                .iter()
                .map(|dir| root.join(FRAMEWORK_ROOT).join(dir)),
        );
    for candidate in candidates {
        debug!("Looking for declarations in {}", candidate.display());
        if candidate.is_dir() && has_declarations(&candidate) {
            return Ok(candidate);
        }
    }
    Err(format!(
        "Type definitions not found under {}. Run `npm install` or pass --source-path",
        root.join("node_modules").display()
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_prefers_bridge_and_skips_index_only() {
        let root = tempfile::tempdir().unwrap();
        let framework = root.path().join(FRAMEWORK_ROOT).join("dist");
        std::fs::create_dir_all(&framework).unwrap();
        std::fs::write(framework.join("bridge.d.ts"), "").unwrap();
        let index_only = root.path().join(FRAMEWORK_ROOT).join("dist-web");
        std::fs::create_dir_all(&index_only).unwrap();
        std::fs::write(index_only.join("index.d.ts"), "").unwrap();

        assert_eq!(discover_source(root.path()).unwrap(), framework);

        let bridge = root.path().join(BRIDGE_DIRS[0]);
        std::fs::create_dir_all(&bridge).unwrap();
        std::fs::write(bridge.join("types.d.ts"), "").unwrap();
        assert_eq!(discover_source(root.path()).unwrap(), bridge);
    }

    #[test]
    fn test_discover_fails_without_node_modules() {
        let root = tempfile::tempdir().unwrap();
        assert!(discover_source(root.path()).unwrap_err().contains("--source-path"));
    }

    #[test]
    fn test_run_command_exit_codes() {
        assert_eq!(run_command(|| Ok(())), 0);
        assert_eq!(run_command(|| Err("boom".to_string())), 1);
    }
}
