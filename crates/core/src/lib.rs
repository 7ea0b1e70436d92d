//! Binding generator for the Apps in Toss Unity SDK.
//!
//! Reads the `.d.ts` declarations of the web bridge and emits a C# API surface for
//! Unity together with the `.jslib` glue that forwards each extern to the browser.
//!
//! ```text
//! surface ──► ir ──► collect ──► codegen ──► validate ──► output
//! (scan)     (IR,    (types)     (C#/JS)     (gates)      (disk)
//!            detect,
//!            map)
//! ```
//!
//! [`pipeline::run_generation`] drives the whole run.

pub mod categories;
pub mod codegen;
pub mod collect;
pub mod config;
pub mod error;
pub mod format;
pub mod ir;
pub mod output;
pub mod pipeline;
pub mod surface;
pub mod validate;

pub use config::{BindingThresholds, GeneratorConfig, GoldenThresholds};
pub use error::{GeneratorError, Result};
pub use pipeline::{GenerationReport, run_generation};
