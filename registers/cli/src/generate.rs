// Licensed under the Apache-2.0 license

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use axion_registers_generator::{analysis_summary, write_vhdl, GeneratorConfig};
use axion_registers_input::Analysis;

/// Prints the analysis, then writes every module that resolved without
/// errors. Modules with errors are reported and skipped; the command fails
/// if any were skipped.
pub fn run(analysis: &Analysis, output: &Path, config: &GeneratorConfig) -> Result<()> {
    print!("{}", analysis_summary(&analysis.modules));

    let written = write_clean(analysis, output, config)?;
    let skipped = analysis.modules.len() - written.len();
    println!(
        "Generated {} file(s) in {}",
        written.len(),
        output.display()
    );
    if skipped > 0 {
        bail!("{skipped} module(s) not generated because of errors");
    }
    Ok(())
}

fn write_clean(
    analysis: &Analysis,
    output: &Path,
    config: &GeneratorConfig,
) -> Result<Vec<PathBuf>> {
    let mut written = vec![];
    for module in &analysis.modules {
        if module.has_errors() {
            for diag in &module.parsing_errors {
                log::error!(
                    "{}: {}",
                    module.name,
                    diag.formatted.as_deref().unwrap_or(&diag.msg)
                );
            }
            log::warn!("skipping '{}'", module.name);
            continue;
        }
        let path = write_vhdl(module, output, config)
            .with_context(|| format!("failed to write VHDL for '{}'", module.name))?;
        written.push(path);
    }
    Ok(written)
}
