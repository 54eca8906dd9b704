// Licensed under the Apache-2.0 license

//! Storage words, byte-lane writes and strobe pulses.

use std::fmt::Write;

use super::{bits, cdc, decode, decode_any, indent, slot_pieces, Storage};
use crate::types::Module;
use crate::util::{vhdl_literal, SLOT_BITS};

pub(super) fn write_declarations(output: &mut String, model: &[Storage]) {
    if model.is_empty() {
        return;
    }
    writeln!(output, "{}-- register storage", indent(1)).unwrap();
    for storage in model {
        writeln!(
            output,
            "{}signal {} : std_logic_vector({} downto 0) := {};",
            indent(1),
            storage.signal(),
            storage.width - 1,
            vhdl_literal(storage.default_value, storage.width)
        )
        .unwrap();
    }
    writeln!(output).unwrap();
}

/// `wr_addr_hit` is high when the captured write address maps to any slot.
pub(super) fn write_address_hit(output: &mut String, model: &[Storage]) {
    if model.is_empty() {
        writeln!(output, "{}wr_addr_hit <= '0';", indent(1)).unwrap();
        writeln!(output).unwrap();
        return;
    }
    let terms: Vec<String> = model
        .iter()
        .map(|s| format!("({})", decode_any("wr_addr_reg", s)))
        .collect();
    writeln!(output, "{}wr_addr_hit <= '1' when", indent(1)).unwrap();
    for (n, term) in terms.iter().enumerate() {
        let joiner = if n == 0 { "" } else { "or " };
        writeln!(output, "{}{joiner}{term}", indent(2)).unwrap();
    }
    writeln!(output, "{}else '0';", indent(2)).unwrap();
    writeln!(output).unwrap();
}

/// Samples module inputs, applies resets and commits bus writes.
pub(super) fn write_register_process(output: &mut String, module: &Module, model: &[Storage]) {
    let has_inputs = model.iter().any(|s| s.ports.iter().any(|p| p.is_input()));
    let writable: Vec<&Storage> = model.iter().filter(|s| s.is_writable()).collect();
    if !has_inputs && writable.is_empty() {
        return;
    }

    let i1 = indent(1);
    let i2 = indent(2);
    let i3 = indent(3);
    writeln!(output, "{i1}reg_proc : process (s_axi_aclk)").unwrap();
    writeln!(output, "{i1}begin").unwrap();
    writeln!(output, "{i2}if rising_edge(s_axi_aclk) then").unwrap();

    if has_inputs {
        writeln!(output, "{i3}-- hardware inputs").unwrap();
        for storage in model {
            for port in storage.ports.iter().filter(|p| p.is_input()) {
                writeln!(
                    output,
                    "{i3}{} <= {};",
                    bits(&storage.signal(), storage.width, port.bit_low, port.bit_high()),
                    cdc::input_source(module, port)
                )
                .unwrap();
            }
        }
        writeln!(output).unwrap();
    }

    if !writable.is_empty() {
        writeln!(output, "{i3}if s_axi_aresetn = '0' then").unwrap();
        for storage in &writable {
            writeln!(
                output,
                "{}{} <= {};",
                indent(4),
                storage.signal(),
                vhdl_literal(storage.default_value, storage.width)
            )
            .unwrap();
        }
        writeln!(output, "{i3}elsif wr_en = '1' then").unwrap();
        write_lane_updates(output, &writable, 4);
        writeln!(output, "{i3}end if;").unwrap();
    }

    writeln!(output, "{i2}end if;").unwrap();
    writeln!(output, "{i1}end process reg_proc;").unwrap();
    writeln!(output).unwrap();
}

/// One decode branch per slot; inside, one guarded update per byte lane,
/// restricted to writable bits and to the register width.
fn write_lane_updates(output: &mut String, writable: &[&Storage], level: usize) {
    let i = indent(level);
    let j = indent(level + 1);
    let k = indent(level + 2);
    let mut first = true;
    for storage in writable {
        for slot in 0..storage.slots() {
            let pieces = slot_pieces(&storage.writable, slot);
            if pieces.is_empty() {
                continue;
            }
            let keyword = if first { "if" } else { "elsif" };
            first = false;
            writeln!(
                output,
                "{i}{keyword} {} then",
                decode("wr_addr_reg", storage.slot_offset(slot))
            )
            .unwrap();
            let base = slot * SLOT_BITS;
            for lane in 0..4 {
                let lane_lo = base + lane * 8;
                let lane_hi = lane_lo + 8;
                let lane_pieces: Vec<_> = pieces
                    .iter()
                    .filter_map(|p| {
                        let a = p.start.max(lane_lo);
                        let b = p.end.min(lane_hi);
                        (a < b).then_some((a, b - 1))
                    })
                    .collect();
                if lane_pieces.is_empty() {
                    continue;
                }
                writeln!(output, "{j}if wr_strb_reg({lane}) = '1' then").unwrap();
                for (lo, hi) in lane_pieces {
                    writeln!(
                        output,
                        "{k}{} <= {};",
                        bits(&storage.signal(), storage.width, lo, hi),
                        bits("wr_data_reg", SLOT_BITS, lo - base, hi - base)
                    )
                    .unwrap();
                }
                writeln!(output, "{j}end if;").unwrap();
            }
        }
    }
    if !first {
        writeln!(output, "{i}end if;").unwrap();
    }
}

pub(super) fn write_strobes(output: &mut String, model: &[Storage]) {
    let strobed: Vec<&Storage> = model
        .iter()
        .filter(|s| s.read_strobe || s.write_strobe)
        .collect();
    if strobed.is_empty() {
        return;
    }
    writeln!(output, "{}-- access strobes", indent(1)).unwrap();
    for storage in strobed {
        if storage.read_strobe {
            writeln!(
                output,
                "{}{}_rd_strobe <= '1' when rvalid_int = '1' and s_axi_rready = '1' and ({}) else '0';",
                indent(1),
                storage.name,
                decode_any("rd_addr_reg", storage)
            )
            .unwrap();
        }
        if storage.write_strobe {
            writeln!(
                output,
                "{}{}_wr_strobe <= '1' when wr_en = '1' and ({}) else '0';",
                indent(1),
                storage.name,
                decode_any("wr_addr_reg", storage)
            )
            .unwrap();
        }
    }
    writeln!(output).unwrap();
}
