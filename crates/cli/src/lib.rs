//! Command-line front end of `ait-codegen`.

mod common;
mod format;
mod generate;
mod verify;

use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

const LOG_ENV: &str = "AIT_LOG";
const LOG_TARGETS: &[&str] = &["ait_codegen_core", "ait_codegen_cli"];

#[derive(Parser, Debug)]
#[command(
    name = "ait-codegen",
    version,
    about = "Generates the Apps in Toss Unity SDK from the web bridge declarations"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate C# bindings and jslib glue
    Generate(generate::GenerateArgs),
    /// Clean doc comments and run csharpier over generated files
    Format(format::FormatArgs),
    /// Check binding consistency, golden snapshots and compilation
    Verify(verify::VerifyArgs),
}

fn is_plain_level(s: &str) -> bool {
    matches!(
        s.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    )
}

/// Filter spec for a raw `AIT_LOG` value.
fn filter_spec(value: Option<&str>) -> String {
    match value {
        Some(level) if is_plain_level(level) => LOG_TARGETS
            .iter()
            .map(|target| format!("{target}={level}"))
            .collect::<Vec<_>>()
            .join(","),
        Some(spec) if !spec.trim().is_empty() => spec.to_string(),
        _ => "warn".to_string(),
    }
}

/// Installs the stderr subscriber; `AIT_LOG` takes a level or a full filter spec.
pub fn init_tracing() {
    let filter = filter_spec(std::env::var(LOG_ENV).ok().as_deref());
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(EnvFilter::new(filter));

    if tracing_subscriber::registry()
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        eprintln!("Warning: tracing subscriber already initialized");
    }
}

/// Parses `args` (program name first) and runs the command; returns the exit code.
pub fn run<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) => match cli.command {
            Some(Commands::Generate(args)) => generate::run(args),
            Some(Commands::Format(args)) => format::run(args),
            Some(Commands::Verify(args)) => verify::run(args),
            None => {
                let mut cmd = Cli::command();
                let _ = cmd.print_help();
                println!();
                0
            }
        },
        Err(e) => {
            let code = e.exit_code();
            let _ = e.print();
            code
        }
    }
}

/// Entry point of the binary.
pub fn run_cli() -> i32 {
    init_tracing();
    run(std::env::args_os())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_spec() {
        assert_eq!(filter_spec(None), "warn");
        assert_eq!(
            filter_spec(Some("debug")),
            "ait_codegen_core=debug,ait_codegen_cli=debug"
        );
        assert_eq!(filter_spec(Some("ait_codegen_core=trace")), "ait_codegen_core=trace");
        assert_eq!(filter_spec(Some("  ")), "warn");
    }

    #[test]
    fn test_cli_parses_commands() {
        Cli::command().debug_assert();
        let cli = Cli::try_parse_from([
            "ait-codegen",
            "generate",
            "--output",
            "out",
            "--source-path",
            "types",
            "--no-meta",
        ])
        .unwrap();
        let Some(Commands::Generate(args)) = cli.command else {
            unreachable!("generate expected");
        };
        assert_eq!(args.output.to_str(), Some("out"));
        assert!(args.no_meta);
    }

    #[test]
    fn test_missing_output_is_usage_error() {
        assert_eq!(run(["ait-codegen", "generate"]), 2);
    }

    fn declarations(text: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/bridge.d.ts"), text).unwrap();
        dir
    }

    #[test]
    fn test_unsupported_type_exits_with_failure() {
        let dir = declarations(
            "export declare function getLocale(mode: string extends T ? number : string): Promise<string>;\n",
        );
        let source = dir.path().join("src");
        let output = dir.path().join("out");
        let code = run([
            "ait-codegen",
            "generate",
            "--output",
            output.to_str().unwrap(),
            "--source-path",
            source.to_str().unwrap(),
        ]);
        assert_eq!(code, 1);
        assert!(!output.exists());
    }

    #[test]
    fn test_generate_honors_no_bridge() {
        let dir = declarations(
            "export declare function getClipboardText(): Promise<string>;\n",
        );
        let source = dir.path().join("src");
        let output = dir.path().join("Runtime/SDK");
        let code = run([
            "ait-codegen",
            "generate",
            "--output",
            output.to_str().unwrap(),
            "--source-path",
            source.to_str().unwrap(),
            "--no-meta",
            "--no-bridge",
        ]);
        assert_eq!(code, 0);
        assert!(output.join("AIT.Clipboard.cs").is_file());
        assert!(!output.join("AIT.Clipboard.cs.meta").exists());
        assert!(!dir.path().join("WebGLTemplates").exists());
    }
}
