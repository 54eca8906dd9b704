// Licensed under the Apache-2.0 license

//! Entity declaration and the AXI4-Lite channel logic.
//!
//! Write path: the AW and W channels are captured by independent trackers,
//! in either order. Once both hold a value and the B channel is free, `wr_en`
//! pulses for one cycle, the storage process applies the write and the
//! response is raised until `s_axi_bready`.
//!
//! Read path: AR is captured, then the decoded value is loaded into
//! `rdata_int` and held with `s_axi_rvalid` until `s_axi_rready`.

use std::fmt::Write;

use super::{bits, decode, indent, slot_pieces, Storage};
use crate::types::Module;
use crate::util::{vhdl_literal, SLOT_BITS};

pub(super) fn write_entity(output: &mut String, module: &Module, model: &[Storage], entity: &str) {
    let mut ports: Vec<(String, &str, String)> = vec![
        ("s_axi_aclk".into(), "in", "std_logic".into()),
        ("s_axi_aresetn".into(), "in", "std_logic".into()),
        ("s_axi_awaddr".into(), "in", "std_logic_vector(31 downto 0)".into()),
        ("s_axi_awvalid".into(), "in", "std_logic".into()),
        ("s_axi_awready".into(), "out", "std_logic".into()),
        ("s_axi_wdata".into(), "in", "std_logic_vector(31 downto 0)".into()),
        ("s_axi_wstrb".into(), "in", "std_logic_vector(3 downto 0)".into()),
        ("s_axi_wvalid".into(), "in", "std_logic".into()),
        ("s_axi_wready".into(), "out", "std_logic".into()),
        ("s_axi_bresp".into(), "out", "std_logic_vector(1 downto 0)".into()),
        ("s_axi_bvalid".into(), "out", "std_logic".into()),
        ("s_axi_bready".into(), "in", "std_logic".into()),
        ("s_axi_araddr".into(), "in", "std_logic_vector(31 downto 0)".into()),
        ("s_axi_arvalid".into(), "in", "std_logic".into()),
        ("s_axi_arready".into(), "out", "std_logic".into()),
        ("s_axi_rdata".into(), "out", "std_logic_vector(31 downto 0)".into()),
        ("s_axi_rresp".into(), "out", "std_logic_vector(1 downto 0)".into()),
        ("s_axi_rvalid".into(), "out", "std_logic".into()),
        ("s_axi_rready".into(), "in", "std_logic".into()),
    ];
    if module.cdc_enabled {
        ports.push(("module_clk".into(), "in", "std_logic".into()));
    }
    for storage in model {
        for port in &storage.ports {
            let dir = if port.is_input() { "in" } else { "out" };
            ports.push((port.name.clone(), dir, port.vhdl_type()));
        }
        if storage.read_strobe {
            ports.push((format!("{}_rd_strobe", storage.name), "out", "std_logic".into()));
        }
        if storage.write_strobe {
            ports.push((format!("{}_wr_strobe", storage.name), "out", "std_logic".into()));
        }
    }

    let name_width = ports.iter().map(|(n, _, _)| n.len()).max().unwrap_or(0);
    writeln!(output, "entity {entity} is").unwrap();
    writeln!(output, "{}generic (", indent(1)).unwrap();
    writeln!(
        output,
        "{}BASE_ADDR : std_logic_vector(31 downto 0) := {}",
        indent(2),
        vhdl_literal(module.base_address, 32)
    )
    .unwrap();
    writeln!(output, "{});", indent(1)).unwrap();
    writeln!(output, "{}port (", indent(1)).unwrap();
    let last = ports.len() - 1;
    for (i, (name, dir, ty)) in ports.iter().enumerate() {
        let sep = if i == last { "" } else { ";" };
        writeln!(output, "{}{name:<name_width$} : {dir:<3} {ty}{sep}", indent(2)).unwrap();
    }
    writeln!(output, "{});", indent(1)).unwrap();
    writeln!(output, "end entity {entity};").unwrap();
}

pub(super) fn write_declarations(output: &mut String) {
    let i = indent(1);
    writeln!(output, "{i}constant AXI_RESP_OKAY   : std_logic_vector(1 downto 0) := \"00\";").unwrap();
    writeln!(output, "{i}constant AXI_RESP_SLVERR : std_logic_vector(1 downto 0) := \"10\";").unwrap();
    writeln!(output).unwrap();
    writeln!(output, "{i}-- write channel").unwrap();
    writeln!(output, "{i}signal aw_captured : std_logic := '0';").unwrap();
    writeln!(output, "{i}signal w_captured  : std_logic := '0';").unwrap();
    writeln!(output, "{i}signal wr_addr_reg : std_logic_vector(31 downto 0) := (others => '0');").unwrap();
    writeln!(output, "{i}signal wr_data_reg : std_logic_vector(31 downto 0) := (others => '0');").unwrap();
    writeln!(output, "{i}signal wr_strb_reg : std_logic_vector(3 downto 0) := (others => '0');").unwrap();
    writeln!(output, "{i}signal wr_en       : std_logic;").unwrap();
    writeln!(output, "{i}signal wr_addr_hit : std_logic;").unwrap();
    writeln!(output, "{i}signal bvalid_int  : std_logic := '0';").unwrap();
    writeln!(output, "{i}signal bresp_int   : std_logic_vector(1 downto 0) := AXI_RESP_OKAY;").unwrap();
    writeln!(output).unwrap();
    writeln!(output, "{i}-- read channel").unwrap();
    writeln!(output, "{i}signal ar_captured : std_logic := '0';").unwrap();
    writeln!(output, "{i}signal rd_addr_reg : std_logic_vector(31 downto 0) := (others => '0');").unwrap();
    writeln!(output, "{i}signal rvalid_int  : std_logic := '0';").unwrap();
    writeln!(output, "{i}signal rdata_int   : std_logic_vector(31 downto 0) := (others => '0');").unwrap();
    writeln!(output, "{i}signal rresp_int   : std_logic_vector(1 downto 0) := AXI_RESP_OKAY;").unwrap();
    writeln!(output).unwrap();
}

pub(super) fn write_handshakes(output: &mut String) {
    writeln!(output, "{}-- AXI4-Lite handshakes", indent(1)).unwrap();
    for line in [
        "s_axi_awready <= s_axi_aresetn and not aw_captured;",
        "s_axi_wready  <= s_axi_aresetn and not w_captured;",
        "s_axi_bvalid  <= bvalid_int;",
        "s_axi_bresp   <= bresp_int;",
        "s_axi_arready <= s_axi_aresetn and not ar_captured and not rvalid_int;",
        "s_axi_rvalid  <= rvalid_int;",
        "s_axi_rdata   <= rdata_int;",
        "s_axi_rresp   <= rresp_int;",
        "",
        "-- Commit once address and data are both held and the response slot is free.",
        "wr_en <= aw_captured and w_captured and (not bvalid_int or s_axi_bready);",
        "",
    ] {
        if line.is_empty() {
            writeln!(output).unwrap();
        } else {
            writeln!(output, "{}{line}", indent(1)).unwrap();
        }
    }
}

pub(super) fn write_write_process(output: &mut String) {
    let text = "\
axi_write_proc : process (s_axi_aclk)
begin
    if rising_edge(s_axi_aclk) then
        if s_axi_aresetn = '0' then
            aw_captured <= '0';
            w_captured  <= '0';
            wr_addr_reg <= (others => '0');
            wr_data_reg <= (others => '0');
            wr_strb_reg <= (others => '0');
            bvalid_int  <= '0';
            bresp_int   <= AXI_RESP_OKAY;
        else
            -- address phase
            if aw_captured = '0' and s_axi_awvalid = '1' then
                wr_addr_reg <= s_axi_awaddr;
                aw_captured <= '1';
            end if;

            -- data phase
            if w_captured = '0' and s_axi_wvalid = '1' then
                wr_data_reg <= s_axi_wdata;
                wr_strb_reg <= s_axi_wstrb;
                w_captured  <= '1';
            end if;

            -- response phase
            if bvalid_int = '1' and s_axi_bready = '1' then
                bvalid_int <= '0';
            end if;

            if wr_en = '1' then
                aw_captured <= '0';
                w_captured  <= '0';
                bvalid_int  <= '1';
                if wr_addr_hit = '1' then
                    bresp_int <= AXI_RESP_OKAY;
                else
                    bresp_int <= AXI_RESP_SLVERR;
                end if;
            end if;
        end if;
    end if;
end process axi_write_proc;
";
    for line in text.lines() {
        if line.is_empty() {
            writeln!(output).unwrap();
        } else {
            writeln!(output, "{}{line}", indent(1)).unwrap();
        }
    }
    writeln!(output).unwrap();
}

pub(super) fn write_read_process(output: &mut String, model: &[Storage]) {
    let head = "\
axi_read_proc : process (s_axi_aclk)
begin
    if rising_edge(s_axi_aclk) then
        if s_axi_aresetn = '0' then
            ar_captured <= '0';
            rd_addr_reg <= (others => '0');
            rvalid_int  <= '0';
            rdata_int   <= (others => '0');
            rresp_int   <= AXI_RESP_OKAY;
        else
            if rvalid_int = '1' and s_axi_rready = '1' then
                rvalid_int <= '0';
            end if;

            -- address phase
            if ar_captured = '0' and rvalid_int = '0' and s_axi_arvalid = '1' then
                rd_addr_reg <= s_axi_araddr;
                ar_captured <= '1';
            end if;

            -- data phase
            if ar_captured = '1' then
                ar_captured <= '0';
                rvalid_int  <= '1';
                rdata_int   <= (others => '0');
                rresp_int   <= AXI_RESP_OKAY;";
    for line in head.lines() {
        if line.is_empty() {
            writeln!(output).unwrap();
        } else {
            writeln!(output, "{}{line}", indent(1)).unwrap();
        }
    }

    write_read_mux(output, model, 5);

    for line in [
        "            end if;",
        "        end if;",
        "    end if;",
        "end process axi_read_proc;",
    ] {
        writeln!(output, "{}{line}", indent(1)).unwrap();
    }
    writeln!(output).unwrap();
}

/// `if/elsif` chain over every slot; unmatched addresses answer SLVERR.
fn write_read_mux(output: &mut String, model: &[Storage], level: usize) {
    let i = indent(level);
    let j = indent(level + 1);
    let mut first = true;
    for storage in model {
        for slot in 0..storage.slots() {
            let keyword = if first { "if" } else { "elsif" };
            first = false;
            writeln!(
                output,
                "{i}{keyword} {} then",
                decode("rd_addr_reg", storage.slot_offset(slot))
            )
            .unwrap();
            let pieces = slot_pieces(&storage.readable, slot);
            if pieces.is_empty() {
                writeln!(output, "{j}null; -- reads as zero").unwrap();
            }
            let base = slot * SLOT_BITS;
            for piece in pieces {
                let (lo, hi) = (piece.start, piece.end - 1);
                writeln!(
                    output,
                    "{j}{} <= {};",
                    bits("rdata_int", SLOT_BITS, lo - base, hi - base),
                    bits(&storage.signal(), storage.width, lo, hi)
                )
                .unwrap();
            }
        }
    }
    if first {
        writeln!(output, "{i}rresp_int <= AXI_RESP_SLVERR;").unwrap();
    } else {
        writeln!(output, "{i}else").unwrap();
        writeln!(output, "{j}rresp_int <= AXI_RESP_SLVERR;").unwrap();
        writeln!(output, "{i}end if;").unwrap();
    }
}
