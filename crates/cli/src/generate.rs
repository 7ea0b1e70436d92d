use std::path::PathBuf;

use ait_codegen_core::config::CONFIG_FILE_NAME;
use ait_codegen_core::{GenerationReport, GeneratorConfig, run_generation};
use clap::Args;
use console::style;
use tracing::debug;

use crate::common::{discover_source, run_command, success, warning};

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Directory receiving AIT*.cs and Plugins/*.jslib
    #[arg(long, short, value_name = "DIR")]
    pub output: PathBuf,

    /// Directory holding the bridge .d.ts files; discovered under node_modules when omitted
    #[arg(long = "source-path", value_name = "DIR")]
    pub source_path: Option<PathBuf>,

    /// Config file; defaults to ait-codegen.toml in the source directory
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Do not create Unity .meta files
    #[arg(long = "no-meta")]
    pub no_meta: bool,

    /// Do not write unity-bridge.ts next to the WebGL template
    #[arg(long = "no-bridge")]
    pub no_bridge: bool,
}

pub fn run(args: GenerateArgs) -> i32 {
    run_command(|| run_inner(args))
}

fn run_inner(args: GenerateArgs) -> Result<(), String> {
    let source = match args.source_path {
        Some(path) => path,
        None => {
            let cwd = std::env::current_dir()
                .map_err(|e| format!("Failed to read current directory: {e}"))?;
            discover_source(&cwd)?
        }
    };
    let config_path = args
        .config
        .unwrap_or_else(|| source.join(CONFIG_FILE_NAME));
    debug!("Using config {}", config_path.display());
    let mut config = GeneratorConfig::load(&config_path).map_err(|e| e.to_string())?;
    if args.no_meta {
        config.write_meta = false;
    }
    if args.no_bridge {
        config.write_bridge = false;
    }

    let report = run_generation(&source, &args.output, &config).map_err(|e| e.to_string())?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &GenerationReport) {
    for warning_text in &report.warnings {
        warning(warning_text);
    }
    for name in &report.unresolved {
        warning(&format!("{name} is not defined anywhere, emitted as an empty class"));
    }
    println!();
    for category in &report.categories {
        println!(
            "  {:<28} {:>3} APIs",
            style(&category.file).cyan(),
            category.api_count
        );
    }
    println!();
    success(&format!(
        "Generated {} APIs and {} types into {}",
        report.api_count,
        report.type_count,
        report.output.display()
    ));
    if let Some(bridge) = &report.bridge {
        println!("  bridge {}", style(bridge.display()).dim());
    }
    if !report.written.removed.is_empty() {
        println!(
            "  removed {} stale files",
            style(report.written.removed.len()).dim()
        );
    }
}
