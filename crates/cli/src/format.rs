use std::path::PathBuf;

use ait_codegen_core::format::format_output;
use clap::Args;

use crate::common::{run_command, success, warning};

#[derive(Args, Debug, Clone)]
pub struct FormatArgs {
    /// Directory holding the generated .cs files
    #[arg(long, short, value_name = "DIR", default_value = ".")]
    pub output: PathBuf,
}

pub fn run(args: FormatArgs) -> i32 {
    run_command(|| {
        let report = format_output(&args.output)?;
        if !report.formatter_ran {
            warning("csharpier did not run; only doc comments were cleaned");
        }
        success(&format!(
            "Formatted {} ({} files cleaned)",
            args.output.display(),
            report.cleaned
        ));
        Ok(())
    })
}
