// Licensed under the Apache-2.0 license

//! Clock-domain crossing between `s_axi_aclk` and `module_clk`.
//!
//! With CDC enabled every register port gets a chain `<port>_sync0` ..
//! `<port>_sync(N-1)`. Inputs are resynchronized into the bus domain and
//! the last stage is what the storage process samples. Outputs are
//! resynchronized into the module domain and the last stage drives the
//! port. Without CDC no chain and no `module_clk` port exist.

use std::fmt::Write;

use super::{bits, indent, Port, Storage};
use crate::config::GeneratorConfig;
use crate::types::Module;

fn stage(port: &Port, n: u32) -> String {
    format!("{}_sync{n}", port.name)
}

fn last_stage(module: &Module, port: &Port) -> String {
    stage(port, module.cdc_stages.max(1) - 1)
}

fn zero(port: &Port) -> &'static str {
    if port.width == 1 {
        "'0'"
    } else {
        "(others => '0')"
    }
}

/// Value the storage process samples for an input port.
pub(super) fn input_source(module: &Module, port: &Port) -> String {
    if module.cdc_enabled {
        last_stage(module, port)
    } else {
        port.name.clone()
    }
}

pub(super) fn write_declarations(
    output: &mut String,
    module: &Module,
    model: &[Storage],
    config: &GeneratorConfig,
) {
    let ports: Vec<&Port> = model.iter().flat_map(|s| &s.ports).collect();
    if ports.is_empty() {
        return;
    }
    let stages = module.cdc_stages.max(1);
    writeln!(output, "{}-- synchronizer stages", indent(1)).unwrap();
    for port in &ports {
        for n in 0..stages {
            writeln!(
                output,
                "{}signal {} : {} := {};",
                indent(1),
                stage(port, n),
                port.vhdl_type(),
                zero(port)
            )
            .unwrap();
        }
    }
    if config.cdc_async_reg_attribute {
        writeln!(output).unwrap();
        writeln!(output, "{}attribute ASYNC_REG : string;", indent(1)).unwrap();
        for port in &ports {
            for n in 0..stages {
                writeln!(
                    output,
                    "{}attribute ASYNC_REG of {} : signal is \"TRUE\";",
                    indent(1),
                    stage(port, n)
                )
                .unwrap();
            }
        }
    }
    writeln!(output).unwrap();
}

fn write_chain_process(output: &mut String, module: &Module, name: &str, clock: &str, chains: &[(&Port, String)]) {
    if chains.is_empty() {
        return;
    }
    let stages = module.cdc_stages.max(1);
    writeln!(output, "{}{name} : process ({clock})", indent(1)).unwrap();
    writeln!(output, "{}begin", indent(1)).unwrap();
    writeln!(output, "{}if rising_edge({clock}) then", indent(2)).unwrap();
    for (port, source) in chains {
        writeln!(output, "{}{} <= {source};", indent(3), stage(port, 0)).unwrap();
        for n in 1..stages {
            writeln!(output, "{}{} <= {};", indent(3), stage(port, n), stage(port, n - 1)).unwrap();
        }
    }
    writeln!(output, "{}end if;", indent(2)).unwrap();
    writeln!(output, "{}end process {name};", indent(1)).unwrap();
    writeln!(output).unwrap();
}

/// Drives every output port and, with CDC, the synchronizer chains.
pub(super) fn write_outputs(output: &mut String, module: &Module, model: &[Storage]) {
    let outputs: Vec<(&Storage, &Port)> = model
        .iter()
        .flat_map(|s| s.ports.iter().filter(|p| !p.is_input()).map(move |p| (s, p)))
        .collect();

    if module.cdc_enabled {
        let inputs: Vec<(&Port, String)> = model
            .iter()
            .flat_map(|s| &s.ports)
            .filter(|p| p.is_input())
            .map(|p| (p, p.name.clone()))
            .collect();
        write_chain_process(output, module, "cdc_in_proc", "s_axi_aclk", &inputs);

        let from_bus: Vec<(&Port, String)> = outputs
            .iter()
            .map(|(s, p)| (*p, bits(&s.signal(), s.width, p.bit_low, p.bit_high())))
            .collect();
        write_chain_process(output, module, "cdc_out_proc", "module_clk", &from_bus);
    }

    if outputs.is_empty() {
        return;
    }
    writeln!(output, "{}-- register outputs", indent(1)).unwrap();
    for (storage, port) in &outputs {
        let source = if module.cdc_enabled {
            last_stage(module, port)
        } else {
            bits(&storage.signal(), storage.width, port.bit_low, port.bit_high())
        };
        writeln!(output, "{}{} <= {source};", indent(1), port.name).unwrap();
    }
    writeln!(output).unwrap();
}
