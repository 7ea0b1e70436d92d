use std::path::PathBuf;

use ait_codegen_core::GeneratorConfig;
use ait_codegen_core::validate::{
    CompileOutcome, check_output_dir, compare_dirs, compile_output, update_golden,
};
use clap::Args;
use console::style;

use crate::common::{run_command, success, warning};

#[derive(Args, Debug, Clone)]
pub struct VerifyArgs {
    /// Directory holding a generated SDK
    #[arg(long, short, value_name = "DIR")]
    pub output: PathBuf,

    /// Golden snapshot directory to compare against
    #[arg(long, value_name = "DIR")]
    pub golden: Option<PathBuf>,

    /// Overwrite the golden snapshot with the current output
    #[arg(long = "update-golden", requires = "golden")]
    pub update_golden: bool,

    /// Compile the generated C# with mcs/csc when available
    #[arg(long)]
    pub compile: bool,

    /// Config file carrying the thresholds
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

pub fn run(args: VerifyArgs) -> i32 {
    run_command(|| run_inner(&args))
}

fn run_inner(args: &VerifyArgs) -> Result<(), String> {
    let config = match &args.config {
        Some(path) => GeneratorConfig::load(path).map_err(|e| e.to_string())?,
        None => GeneratorConfig::default(),
    };
    let mut failures = Vec::new();

    let binding = check_output_dir(&args.output, &config.binding).map_err(|e| e.to_string())?;
    for name in &binding.unpaired_glue {
        warning(&format!("glue function {name} has no extern"));
    }
    let binding_failures = binding.failures(&config.binding);
    if binding_failures.is_empty() {
        success(&format!(
            "Bindings: {}/{} externs paired, UTF8ToString {:.0}%, SendMessage {:.0}%",
            binding.matched,
            binding.externs,
            binding.utf8_ratio() * 100.0,
            binding.send_message_ratio() * 100.0
        ));
    }
    failures.extend(binding_failures);

    if let Some(golden) = &args.golden {
        if args.update_golden {
            let count = update_golden(&args.output, golden).map_err(|e| e.to_string())?;
            success(&format!("Updated {count} golden files in {}", golden.display()));
        } else {
            let report = compare_dirs(&args.output, golden).map_err(|e| e.to_string())?;
            for diff in report.diffs.values() {
                eprintln!("{}", style(diff).dim());
            }
            let golden_failures = report.failures(config.golden);
            if golden_failures.is_empty() {
                success(&format!(
                    "Golden: {} classes, {} enums, {} API methods ({} files differ)",
                    report.generated.classes,
                    report.generated.enums,
                    report.generated.methods,
                    report.diffs.len()
                ));
            }
            failures.extend(golden_failures);
        }
    }

    if args.compile {
        match compile_output(&args.output)? {
            CompileOutcome::Passed => success("Generated C# compiles"),
            CompileOutcome::Skipped(reason) => warning(&format!("Compile check skipped: {reason}")),
            CompileOutcome::Failed(diagnostics) => {
                failures.extend(diagnostics.iter().map(|d| {
                    format!(
                        "{}({},{}): {} {}",
                        d.file, d.line, d.column, d.code, d.message
                    )
                }));
            }
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(format!("Verification failed:\n  {}", failures.join("\n  ")))
    }
}
