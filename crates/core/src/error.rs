//! Error types for the generation pipeline.

use std::fmt;
use std::path::PathBuf;

/// One unsupported type found by the type-support gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDiagnostic {
    /// API that owns the offending type.
    pub api: String,
    /// Parameter name, or `return` for the return type.
    pub location: String,
    /// Raw declaration text of the type.
    pub raw: String,
    /// IR kind that failed (e.g. `unknown`, `object`).
    pub kind: String,
}

impl fmt::Display for TypeDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}: unsupported {} type `{}`",
            self.api, self.location, self.kind, self.raw
        )
    }
}

/// API missing from the file it was expected in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingApi {
    /// Generated file that should contain the API.
    pub file: String,
    /// Pascal-case name of the API.
    pub api: String,
}

/// Fatal generation failures.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// One or more API types have no host mapping.
    #[error("unsupported types found:\n{}", join_lines(.0))]
    TypeUnsupported(Vec<TypeDiagnostic>),

    /// APIs with no category mapping.
    #[error("no category mapping for APIs: {}", .0.join(", "))]
    MissingCategory(Vec<String>),

    /// A template failed to compile or render.
    #[error("template `{name}` failed: {message}")]
    Template {
        /// Template name.
        name: String,
        /// Underlying tera message chain.
        message: String,
    },

    /// APIs silently dropped during generation.
    #[error("generated code is missing APIs:\n{}", join_missing(missing))]
    Incomplete {
        /// Every API that is absent from its expected file.
        missing: Vec<MissingApi>,
    },

    /// The scanner found nothing to generate.
    #[error("no APIs found in {}", .0.display())]
    NoApis(PathBuf),

    /// Invalid or unreadable configuration file.
    #[error("configuration error: {0}")]
    Config(String),

    /// Type definition directory could not be located.
    #[error("type definitions not found: {0}")]
    SourceNotFound(String),

    /// A declaration file could not be parsed.
    #[error("parse error in {}: {message}", file.display())]
    Parse {
        /// File being parsed.
        file: PathBuf,
        /// Parser message with position.
        message: String,
    },

    /// Filesystem failure.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl GeneratorError {
    /// Wraps an I/O error with the path it happened at.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

fn join_lines(items: &[TypeDiagnostic]) -> String {
    items
        .iter()
        .map(|d| format!("  - {d}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn join_missing(items: &[MissingApi]) -> String {
    let mut by_file: std::collections::BTreeMap<&str, Vec<&str>> =
        std::collections::BTreeMap::new();
    for item in items {
        by_file.entry(&item.file).or_default().push(&item.api);
    }
    by_file
        .into_iter()
        .map(|(file, apis)| format!("  {file}: {}", apis.join(", ")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Result alias used across the core crate.
pub type Result<T, E = GeneratorError> = std::result::Result<T, E>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_incomplete_groups_by_file() {
        let err = GeneratorError::Incomplete {
            missing: vec![
                MissingApi {
                    file: "AIT.Device.cs".into(),
                    api: "SetScreenAwakeMode".into(),
                },
                MissingApi {
                    file: "AIT.Device.cs".into(),
                    api: "SetSecureScreen".into(),
                },
            ],
        };
        let text = err.to_string();
        assert!(text.contains("AIT.Device.cs: SetScreenAwakeMode, SetSecureScreen"));
    }

    #[test]
    fn test_type_diagnostic_display() {
        let d = TypeDiagnostic {
            api: "getThing".into(),
            location: "options".into(),
            raw: "Foo<Bar>".into(),
            kind: "unknown".into(),
        };
        assert_eq!(
            d.to_string(),
            "getThing.options: unsupported unknown type `Foo<Bar>`"
        );
    }
}
