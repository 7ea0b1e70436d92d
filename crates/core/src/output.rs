//! Writes a rendered generation into the Unity output directory.
//!
//! Every file is first written into a staging directory inside the output root; only
//! when all writes succeeded are stale files removed and the staged files renamed into
//! place.

use std::collections::HashSet;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::codegen::{OutputFile, PLUGINS_DIR};
use crate::error::{GeneratorError, Result};

const STAGING_PREFIX: &str = ".ait-codegen-";

/// What a write changed on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSummary {
    /// Generated files written.
    pub written: usize,
    /// `.meta` sidecars created.
    pub meta_created: usize,
    /// Stale files removed, relative to the output directory.
    pub removed: Vec<PathBuf>,
}

/// Deterministic Unity GUID for a path relative to the output directory.
pub fn meta_guid(relative: &Path) -> String {
    let key = relative.to_string_lossy().replace('\\', "/");
    let digest = Sha256::digest(key.as_bytes());
    hex::encode(digest)[..32].to_string()
}

/// `.meta` text for a generated file.
pub fn meta_contents(relative: &Path) -> String {
    let guid = meta_guid(relative);
    let is_jslib = relative.extension().is_some_and(|e| e == "jslib");
    if is_jslib {
        format!(
            "fileFormatVersion: 2
guid: {guid}
PluginImporter:
  externalObjects: {{}}
  serializedVersion: 2
  iconMap: {{}}
  executionOrder: {{}}
  defineConstraints: []
  isPreloaded: 0
  isOverridable: 0
  isExplicitlyReferenced: 0
  validateReferences: 1
  platformData:
  - first:
      Any:
    second:
      enabled: 0
      settings: {{}}
  - first:
      Editor: Editor
    second:
      enabled: 0
      settings:
        DefaultValueInitialized: true
  - first:
      WebGL: WebGL
    second:
      enabled: 1
      settings: {{}}
  userData:
  assetBundleName:
  assetBundleVariant:
"
        )
    } else {
        format!(
            "fileFormatVersion: 2
guid: {guid}
MonoImporter:
  externalObjects: {{}}
  serializedVersion: 2
  defaultReferences: []
  executionOrder: 0
  icon: {{instanceID: 0}}
  userData:
  assetBundleName:
  assetBundleVariant:
"
        )
    }
}

fn meta_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".meta");
    PathBuf::from(name)
}

/// Generated files of a previous run: `*.cs` at the root and `Plugins/*.jslib`.
fn existing_outputs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for (sub, extension) in [(None, "cs"), (Some(PLUGINS_DIR), "jslib")] {
        let folder = sub.map_or_else(|| dir.to_path_buf(), |s| dir.join(s));
        if !folder.is_dir() {
            continue;
        }
        let entries = fs::read_dir(&folder).map_err(|e| GeneratorError::io(&folder, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| GeneratorError::io(&folder, e))?;
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|e| e == extension) {
                let relative = sub.map_or_else(
                    || PathBuf::from(entry.file_name()),
                    |s| Path::new(s).join(entry.file_name()),
                );
                found.push(relative);
            }
        }
    }
    found.sort();
    Ok(found)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| GeneratorError::io(parent, e))?;
    }
    fs::write(path, contents).map_err(|e| GeneratorError::io(path, e))
}

/// Writes `files` under `dir`, replacing the previous generation.
pub fn write_output(dir: &Path, files: &[OutputFile], write_meta: bool) -> Result<WriteSummary> {
    fs::create_dir_all(dir).map_err(|e| GeneratorError::io(dir, e))?;

    let mut staged: Vec<(PathBuf, String)> = files
        .iter()
        .map(|f| (f.path.clone(), f.contents.clone()))
        .collect();
    let mut meta_created = 0;
    if write_meta {
        for file in files {
            let meta = meta_path(&file.path);
            if !dir.join(&meta).exists() {
                staged.push((meta, meta_contents(&file.path)));
                meta_created += 1;
            }
        }
    }

    let staging = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempdir_in(dir)
        .map_err(|e| GeneratorError::io(dir, e))?;
    staged
        .par_iter()
        .try_for_each(|(relative, contents)| write_file(&staging.path().join(relative), contents))?;
    debug!("Staged {} files in {}", staged.len(), staging.path().display());

    let keep: HashSet<&Path> = files.iter().map(|f| f.path.as_path()).collect();
    let mut removed = Vec::new();
    for relative in existing_outputs(dir)? {
        if keep.contains(relative.as_path()) {
            continue;
        }
        let path = dir.join(&relative);
        fs::remove_file(&path).map_err(|e| GeneratorError::io(&path, e))?;
        let meta = meta_path(&path);
        if meta.exists() {
            fs::remove_file(&meta).map_err(|e| GeneratorError::io(&meta, e))?;
        }
        debug!("Removed stale {}", relative.display());
        removed.push(relative);
    }

    for (relative, _) in &staged {
        let target = dir.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| GeneratorError::io(parent, e))?;
        }
        fs::rename(staging.path().join(relative), &target)
            .map_err(|e| GeneratorError::io(&target, e))?;
    }

    info!(
        "Wrote {} files to {} ({} stale removed)",
        files.len(),
        dir.display(),
        removed.len()
    );
    Ok(WriteSummary {
        written: files.len(),
        meta_created,
        removed,
    })
}

/// Replaces the file at `path` in one rename; parent directories are created.
///
/// Used for `unity-bridge.ts`, which lives outside the output directory and has no `.meta`.
pub fn write_bridge(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|e| GeneratorError::io(parent, e))?;
    let mut staged =
        tempfile::NamedTempFile::new_in(parent).map_err(|e| GeneratorError::io(parent, e))?;
    staged
        .write_all(contents.as_bytes())
        .map_err(|e| GeneratorError::io(path, e))?;
    staged
        .persist(path)
        .map_err(|e| GeneratorError::io(path, e.error))?;
    info!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn file(path: &str, contents: &str) -> OutputFile {
        OutputFile {
            path: path.into(),
            contents: contents.into(),
        }
    }

    #[test]
    fn test_guid_is_stable_and_path_based() {
        let a = meta_guid(Path::new("AIT.cs"));
        assert_eq!(a.len(), 32);
        assert_eq!(a, meta_guid(Path::new("AIT.cs")));
        assert_ne!(a, meta_guid(Path::new("AIT.Types.cs")));
        assert!(meta_contents(Path::new("Plugins/AppsInToss-Device.jslib")).contains("WebGL: WebGL"));
        assert!(meta_contents(Path::new("AIT.cs")).contains("MonoImporter:"));
    }

    #[test]
    fn test_write_replaces_stale_and_keeps_existing_meta() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("Plugins")).unwrap();
        fs::write(root.join("AIT.Old.cs"), "old").unwrap();
        fs::write(root.join("AIT.Old.cs.meta"), "old meta").unwrap();
        fs::write(root.join("Plugins/AppsInToss-Old.jslib"), "old").unwrap();
        fs::write(root.join("AIT.cs.meta"), "custom meta").unwrap();
        fs::write(root.join("README.md"), "keep").unwrap();

        let summary = write_output(
            root,
            &[
                file("AIT.cs", "shell\n"),
                file("Plugins/AppsInToss-Device.jslib", "glue\n"),
            ],
            true,
        )
        .unwrap();

        assert_eq!(summary.written, 2);
        assert_eq!(summary.meta_created, 1);
        assert_eq!(
            summary.removed,
            vec![
                PathBuf::from("AIT.Old.cs"),
                Path::new("Plugins").join("AppsInToss-Old.jslib")
            ]
        );
        assert_eq!(fs::read_to_string(root.join("AIT.cs")).unwrap(), "shell\n");
        assert_eq!(fs::read_to_string(root.join("AIT.cs.meta")).unwrap(), "custom meta");
        assert!(root.join("Plugins/AppsInToss-Device.jslib.meta").exists());
        assert!(!root.join("AIT.Old.cs.meta").exists());
        assert!(root.join("README.md").exists());
        let leftovers = fs::read_dir(root)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(STAGING_PREFIX))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_no_meta_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let summary = write_output(dir.path(), &[file("AIT.cs", "x\n")], false).unwrap();
        assert_eq!(summary.meta_created, 0);
        assert!(!dir.path().join("AIT.cs.meta").exists());
    }

    #[test]
    fn test_bridge_write_creates_parents_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("WebGLTemplates/AITTemplate/BuildConfig~/unity-bridge.ts");
        write_bridge(&path, "first\n").unwrap();
        write_bridge(&path, "second\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second\n");
        assert_eq!(fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn test_screen_files_survive_regeneration() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let files = [
            file("AIT.Screen.cs", "screen\n"),
            file("Plugins/AppsInToss-Screen.jslib", "glue\n"),
        ];
        write_output(root, &files, true).unwrap();
        let summary = write_output(root, &files, true).unwrap();
        assert!(summary.removed.is_empty());
        assert_eq!(summary.meta_created, 0);
        assert!(root.join("AIT.Screen.cs.meta").exists());
    }
}
