//! Gates and regression checks around generation.
//!
//! The type gate runs before any file is rendered and completeness right after; both
//! are fatal. Syntax findings are only warnings. Binding, golden and compiler checks run
//! over an already written output directory.

pub mod binding;
pub mod compiler;
pub mod completeness;
pub mod golden;
pub mod types;

pub use binding::{BindingReport, check_bindings, check_output_dir, parse_externs, parse_glue};
pub use compiler::{CompileOutcome, CompilerDiagnostic, compile_output, find_compiler};
pub use completeness::{ensure_complete, syntax_warnings};
pub use golden::{GoldenReport, compare_dirs, normalize, update_golden};
pub use types::{check_types, ensure_supported};
