// Licensed under the Apache-2.0 license

//! VHDL generation for resolved modules.
//!
//! The generator first flattens a [`Module`] into a list of [`Storage`]
//! words, one per standalone or packed register, each with the hardware
//! ports bound to it. The submodules then emit text from that model:
//! - `axi`: entity, AXI4-Lite channel trackers and response logic
//! - `registers`: storage process, read mux and strobes
//! - `cdc`: synchronizer chains and output port drivers
//!
//! Generation is a pure function of its input and never fails on a module
//! that passed resolution.

mod axi;
mod cdc;
mod registers;

use std::fmt::Write;
use std::fs;
use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::config::GeneratorConfig;
use crate::types::{AccessMode, Module, RegisterEntry};
use crate::util::{format_address, slot_count, vhdl_offset, SLOT_BITS, SLOT_BYTES};

/// A hardware port bound to a slice of a storage word.
#[derive(Clone, Debug)]
struct Port {
    name: String,
    bit_low: u32,
    width: u32,
    access: AccessMode,
}

impl Port {
    fn vhdl_type(&self) -> String {
        vhdl_type(self.width)
    }

    fn bit_high(&self) -> u32 {
        self.bit_low + self.width - 1
    }

    /// Driven by the module (sampled into storage) rather than by the bus.
    fn is_input(&self) -> bool {
        self.access == AccessMode::ReadOnly
    }
}

/// One AXI-domain storage word, `<name>_reg`.
#[derive(Clone, Debug)]
struct Storage {
    name: String,
    width: u32,
    relative_address: u64,
    default_value: u64,
    /// Bit ranges the bus may write.
    writable: Vec<Range<u32>>,
    /// Bit ranges returned on reads; everything else reads as zero.
    readable: Vec<Range<u32>>,
    ports: Vec<Port>,
    read_strobe: bool,
    write_strobe: bool,
}

impl Storage {
    fn signal(&self) -> String {
        format!("{}_reg", self.name)
    }

    fn slots(&self) -> u32 {
        slot_count(self.width)
    }

    fn slot_offset(&self, slot: u32) -> u64 {
        self.relative_address + slot as u64 * SLOT_BYTES
    }

    fn is_writable(&self) -> bool {
        !self.writable.is_empty()
    }
}

fn ranges_for(access: AccessMode, bits: Range<u32>) -> (Vec<Range<u32>>, Vec<Range<u32>>) {
    let w = if access.is_writable() { vec![bits.clone()] } else { vec![] };
    let r = if access.is_readable() { vec![bits] } else { vec![] };
    (w, r)
}

fn build_model(module: &Module) -> Vec<Storage> {
    module
        .entries
        .iter()
        .map(|entry| match entry {
            RegisterEntry::Single(r) => {
                let (writable, readable) = ranges_for(r.access_mode, 0..r.width);
                Storage {
                    name: r.signal_name.clone(),
                    width: r.width,
                    relative_address: r.relative_address,
                    default_value: r.default_value,
                    writable,
                    readable,
                    ports: vec![Port {
                        name: r.signal_name.clone(),
                        bit_low: 0,
                        width: r.width,
                        access: r.access_mode,
                    }],
                    read_strobe: r.read_strobe,
                    write_strobe: r.write_strobe,
                }
            }
            RegisterEntry::Packed(p) => {
                let mut writable = vec![];
                let mut readable = vec![];
                for f in &p.fields {
                    let (w, r) = ranges_for(f.access_mode, f.bit_low..f.bit_high + 1);
                    writable.extend(w);
                    readable.extend(r);
                }
                Storage {
                    name: p.reg_name.clone(),
                    width: p.used_bits.max(1),
                    relative_address: p.relative_address,
                    default_value: p.default_value,
                    writable,
                    readable,
                    ports: p
                        .fields
                        .iter()
                        .map(|f| Port {
                            name: f.name.clone(),
                            bit_low: f.bit_low,
                            width: f.width(),
                            access: f.access_mode,
                        })
                        .collect(),
                    read_strobe: p.read_strobe(),
                    write_strobe: p.write_strobe(),
                }
            }
        })
        .collect()
}

//=============================================================================
// Shared text helpers
//=============================================================================

const INDENT: &str = "    ";

fn indent(level: usize) -> String {
    INDENT.repeat(level)
}

fn vhdl_type(width: u32) -> String {
    if width == 1 {
        "std_logic".to_string()
    } else {
        format!("std_logic_vector({} downto 0)", width - 1)
    }
}

/// `sig`, `sig(lo)` or `sig(hi downto lo)` for a vector of `sig_width` bits.
fn bits(sig: &str, sig_width: u32, lo: u32, hi: u32) -> String {
    if lo == hi {
        format!("{sig}({lo})")
    } else if lo == 0 && hi + 1 == sig_width {
        sig.to_string()
    } else {
        format!("{sig}({hi} downto {lo})")
    }
}

/// Boolean decode of `addr_signal` against one relative offset.
fn decode(addr_signal: &str, offset: u64) -> String {
    format!(
        "unsigned({addr_signal}) = unsigned(BASE_ADDR) + {}",
        vhdl_offset(offset)
    )
}

/// Decode that matches any slot of `storage`.
fn decode_any(addr_signal: &str, storage: &Storage) -> String {
    if storage.slots() == 1 {
        return decode(addr_signal, storage.relative_address);
    }
    (0..storage.slots())
        .map(|slot| format!("({})", decode(addr_signal, storage.slot_offset(slot))))
        .collect::<Vec<_>>()
        .join(" or ")
}

/// Intersection of `ranges` with one 32-bit slot, as absolute bit ranges.
fn slot_pieces(ranges: &[Range<u32>], slot: u32) -> Vec<Range<u32>> {
    let lo = slot * SLOT_BITS;
    let hi = lo + SLOT_BITS;
    ranges
        .iter()
        .filter_map(|r| {
            let a = r.start.max(lo);
            let b = r.end.min(hi);
            (a < b).then_some(a..b)
        })
        .collect()
}

//=============================================================================
// Entry points
//=============================================================================

/// Generates the `<module><suffix>` entity implementing the module's
/// register map behind an AXI4-Lite slave.
pub fn generate_vhdl(module: &Module, config: &GeneratorConfig) -> String {
    let model = build_model(module);
    let entity = config.entity_name(&module.name);
    let mut output = String::new();

    if config.emit_header_comment {
        write_header(&mut output, module, &entity);
    }
    writeln!(output, "library ieee;").unwrap();
    writeln!(output, "use ieee.std_logic_1164.all;").unwrap();
    writeln!(output, "use ieee.numeric_std.all;").unwrap();
    writeln!(output).unwrap();

    axi::write_entity(&mut output, module, &model, &entity);
    writeln!(output).unwrap();
    writeln!(output, "architecture rtl of {entity} is").unwrap();
    axi::write_declarations(&mut output);
    registers::write_declarations(&mut output, &model);
    if module.cdc_enabled {
        cdc::write_declarations(&mut output, module, &model, config);
    }
    writeln!(output, "begin").unwrap();
    writeln!(output).unwrap();
    axi::write_handshakes(&mut output);
    registers::write_address_hit(&mut output, &model);
    axi::write_write_process(&mut output);
    axi::write_read_process(&mut output, &model);
    registers::write_register_process(&mut output, module, &model);
    registers::write_strobes(&mut output, &model);
    cdc::write_outputs(&mut output, module, &model);
    writeln!(output, "end architecture rtl;").unwrap();

    for storage in model.iter().filter(|s| s.slots() > 1) {
        log::info!(
            "{}: '{}' ({} bits) emitted as {} AXI slots",
            entity,
            storage.name,
            storage.width,
            storage.slots()
        );
    }
    output
}

/// Writes the generated entity to `<dir>/<module><suffix>.vhd`, replacing
/// any existing file.
pub fn write_vhdl(module: &Module, dir: &Path, config: &GeneratorConfig) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(config.file_name(&module.name));
    fs::write(&path, generate_vhdl(module, config))?;
    log::info!("generated {}", path.display());
    Ok(path)
}

fn write_header(output: &mut String, module: &Module, entity: &str) {
    let rule = format!("--{}", "-".repeat(78));
    writeln!(output, "{rule}").unwrap();
    writeln!(output, "-- {entity}").unwrap();
    writeln!(output, "-- AXI4-Lite register interface for module '{}'", module.name).unwrap();
    writeln!(output, "-- Generated by axion. Do not edit.").unwrap();
    writeln!(output, "--").unwrap();
    writeln!(
        output,
        "-- Base address : {} (BASE_ADDR generic default)",
        format_address(module.base_address, 8)
    )
    .unwrap();
    if module.cdc_enabled {
        writeln!(output, "-- CDC          : enabled, {} stages", module.cdc_stages).unwrap();
    } else {
        writeln!(output, "-- CDC          : disabled").unwrap();
    }
    writeln!(output, "--").unwrap();
    if module.entries.is_empty() {
        writeln!(output, "-- No registers; every access returns SLVERR.").unwrap();
    } else {
        writeln!(
            output,
            "-- {:<10} {:<24} {:<7} {:<6} Default",
            "Offset", "Register", "Access", "Width"
        )
        .unwrap();
        for entry in &module.entries {
            let (width, default) = match entry {
                RegisterEntry::Single(r) => (r.width, r.default_value),
                RegisterEntry::Packed(p) => (p.used_bits, p.default_value),
            };
            writeln!(
                output,
                "-- {:<10} {:<24} {:<7} {:<6} {}",
                format_address(entry.relative_address(), 4),
                entry.name(),
                entry.access_summary(),
                width,
                format_address(default, 1)
            )
            .unwrap();
            if let RegisterEntry::Packed(p) = entry {
                for f in &p.fields {
                    writeln!(
                        output,
                        "--   [{:>2}:{:<2}] {:<21} {:<7}",
                        f.bit_high, f.bit_low, f.name, f.access_mode
                    )
                    .unwrap();
                }
            }
        }
    }
    writeln!(output, "{rule}").unwrap();
    writeln!(output).unwrap();
}
