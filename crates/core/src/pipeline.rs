//! One generation run: scan, gate, collect, render, verify, write.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::codegen::{CategorySummary, Generation, GeneratorContext, generate};
use crate::collect::collect_types;
use crate::config::GeneratorConfig;
use crate::error::Result;
use crate::output::{WriteSummary, write_bridge, write_output};
use crate::surface::scan_dir;
use crate::validate::{ensure_complete, ensure_supported, syntax_warnings};

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct GenerationReport {
    /// Directory the files were written to.
    pub output: PathBuf,
    /// APIs generated.
    pub api_count: usize,
    /// Classes and enums in the type file and registry.
    pub type_count: usize,
    /// External names left as stubs.
    pub unresolved: Vec<String>,
    /// Per-category API counts in file order.
    pub categories: Vec<CategorySummary>,
    /// Non-fatal shape problems in the generated text.
    pub warnings: Vec<String>,
    /// Disk changes.
    pub written: WriteSummary,
    /// Where `unity-bridge.ts` was written, if it was.
    pub bridge: Option<PathBuf>,
}

/// Files rendered in memory, gates passed.
#[derive(Debug, Clone)]
pub struct Rendered {
    /// Files and per-API code.
    pub generation: Generation,
    /// Collected classes and enums.
    pub type_count: usize,
    /// External names left as stubs.
    pub unresolved: Vec<String>,
}

/// Renders everything in memory without touching the output directory.
pub fn render(source: &Path, config: &GeneratorConfig) -> Result<Rendered> {
    debug!("Stage: scan");
    let scan = scan_dir(source, config)?;

    debug!("Stage: type check");
    ensure_supported(&scan.apis, config.max_type_depth)?;

    debug!("Stage: collect");
    let collection = collect_types(&scan.apis, &scan.definitions, config.max_type_depth);
    for name in &collection.unresolved {
        warn!("External type {name} was never defined, emitting a stub");
    }

    debug!("Stage: generate");
    let ctx = GeneratorContext::new(config.clone());
    let generation = generate(&ctx, &scan.apis, &collection)?;

    debug!("Stage: completeness");
    ensure_complete(&scan.apis, &generation)?;

    Ok(Rendered {
        generation,
        type_count: collection.types.len(),
        unresolved: collection.unresolved,
    })
}

/// Generates bindings from `source` into `output`.
///
/// Nothing is written unless every fatal gate passed.
pub fn run_generation(
    source: &Path,
    output: &Path,
    config: &GeneratorConfig,
) -> Result<GenerationReport> {
    info!("Generating bindings from {}", source.display());
    let Rendered {
        generation,
        type_count,
        unresolved,
    } = render(source, config)?;

    debug!("Stage: syntax");
    let warnings = syntax_warnings(&generation);
    for warning in &warnings {
        warn!("{warning}");
    }

    debug!("Stage: write");
    let written = write_output(output, &generation.files, config.write_meta)?;
    let bridge = if config.write_bridge {
        let path = output.join(&config.bridge_file);
        write_bridge(&path, &generation.bridge)?;
        Some(path)
    } else {
        None
    };

    let api_count = generation.code.len();
    info!(
        "Generated {api_count} APIs in {} categories",
        generation.categories.len()
    );
    Ok(GenerationReport {
        output: output.to_path_buf(),
        api_count,
        type_count,
        unresolved,
        categories: generation.categories,
        warnings,
        written,
        bridge,
    })
}
