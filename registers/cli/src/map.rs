// Licensed under the Apache-2.0 license

use anyhow::Result;
use axion_registers_generator::analysis_summary;
use axion_registers_input::Analysis;

pub fn run(analysis: &Analysis, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&analysis.modules)?);
    } else {
        print!("{}", analysis_summary(&analysis.modules));
    }
    Ok(())
}
