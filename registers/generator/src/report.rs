// Licensed under the Apache-2.0 license

//! Plain-text analysis tables for resolved modules.

use std::fmt::Write;

use crate::types::{Module, RegisterEntry};
use crate::util::format_address;

const RULE_WIDTH: usize = 110;

fn type_label(width: u32) -> String {
    if width == 1 {
        "bit".to_string()
    } else {
        format!("[{}:0]", width - 1)
    }
}

fn strobe_label(read: bool, write: bool) -> String {
    match (read, write) {
        (true, true) => "RD, WR".to_string(),
        (true, false) => "RD".to_string(),
        (false, true) => "WR".to_string(),
        (false, false) => "None".to_string(),
    }
}

fn strobe_ports(name: &str, read: bool, write: bool) -> Vec<String> {
    let mut ports = vec![];
    if read {
        ports.push(format!("{name}_rd_strobe"));
    }
    if write {
        ports.push(format!("{name}_wr_strobe"));
    }
    ports
}

impl Module {
    /// Table of every register: name, type, absolute address, offset,
    /// access, strobes and the ports the generated entity exposes.
    pub fn summary_table(&self) -> String {
        let mut output = String::new();
        let rule = "=".repeat(RULE_WIDTH);
        writeln!(output, "{rule}").unwrap();
        writeln!(output, "Module: {}", self.name).unwrap();
        if let Some(source) = &self.source {
            writeln!(output, "File: {source}").unwrap();
        }
        if self.cdc_enabled {
            writeln!(output, "CDC: Enabled (Stages: {})", self.cdc_stages).unwrap();
        } else {
            writeln!(output, "CDC: Disabled").unwrap();
        }
        writeln!(output, "Base Address: {}", format_address(self.base_address, 4)).unwrap();
        writeln!(output, "{rule}").unwrap();

        if self.entries.is_empty() {
            writeln!(output, "No registers found in this module.").unwrap();
            return output;
        }

        writeln!(
            output,
            "{:<25} {:<8} {:<10} {:<10} {:<8} {:<15} Ports Generated",
            "Signal Name", "Type", "Abs.Addr", "Offset", "Access", "Strobes"
        )
        .unwrap();
        writeln!(
            output,
            "{} {} {} {} {} {} {}",
            "-".repeat(25),
            "-".repeat(8),
            "-".repeat(10),
            "-".repeat(10),
            "-".repeat(8),
            "-".repeat(15),
            "-".repeat(40)
        )
        .unwrap();

        for entry in &self.entries {
            let abs = format_address(entry.address(), 4);
            let rel = format_address(entry.relative_address(), 4);
            match entry {
                RegisterEntry::Single(r) => {
                    let mut ports = vec![r.signal_name.clone()];
                    ports.extend(strobe_ports(&r.signal_name, r.read_strobe, r.write_strobe));
                    writeln!(
                        output,
                        "{:<25} {:<8} {:<10} {:<10} {:<8} {:<15} {}",
                        r.signal_name,
                        type_label(r.width),
                        abs,
                        rel,
                        r.access_mode,
                        strobe_label(r.read_strobe, r.write_strobe),
                        ports.join(", ")
                    )
                    .unwrap();
                }
                RegisterEntry::Packed(p) => {
                    let mut ports: Vec<String> = p.fields.iter().map(|f| f.name.clone()).collect();
                    ports.extend(strobe_ports(&p.reg_name, p.read_strobe(), p.write_strobe()));
                    writeln!(
                        output,
                        "{:<25} {:<8} {:<10} {:<10} {:<8} {:<15} {}",
                        p.reg_name,
                        "packed",
                        abs,
                        rel,
                        entry.access_summary(),
                        strobe_label(p.read_strobe(), p.write_strobe()),
                        ports.join(", ")
                    )
                    .unwrap();
                    for f in &p.fields {
                        writeln!(
                            output,
                            "  .{:<22} {:<8} {:<10} {:<10} {:<8}",
                            f.name,
                            format!("[{}:{}]", f.bit_high, f.bit_low),
                            "",
                            "",
                            f.access_mode
                        )
                        .unwrap();
                    }
                }
            }
        }
        writeln!(output).unwrap();
        writeln!(output, "Total Registers: {}", self.entries.len()).unwrap();

        for diag in self.parsing_errors.iter().chain(&self.diagnostics) {
            writeln!(output, "{diag}").unwrap();
        }
        output
    }
}

/// Tables for every module followed by the overall totals.
pub fn analysis_summary(modules: &[Module]) -> String {
    let mut output = String::new();
    for module in modules {
        writeln!(output).unwrap();
        output.push_str(&module.summary_table());
    }
    let rule = "=".repeat(RULE_WIDTH);
    let total: usize = modules.iter().map(|m| m.entries.len()).sum();
    writeln!(output).unwrap();
    writeln!(output, "{rule}").unwrap();
    writeln!(output, "Summary: {} module(s) analyzed", modules.len()).unwrap();
    writeln!(output, "Total Registers: {total}").unwrap();
    writeln!(output, "{rule}").unwrap();
    output
}
