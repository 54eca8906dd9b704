// Licensed under the Apache-2.0 license

use std::fs;
use std::path::Path;

use axion_registers_generator::{generate_vhdl, GeneratorConfig, ResolutionError, ResolveConfig};
use axion_registers_input::{analyze_sources, analyze_sources_with_config, InputError};
use tempfile::TempDir;

const UART_VHD: &str = r#"
-- @axion_def BASE_ADDR=0x1000
entity uart is
end entity uart;

architecture rtl of uart is
    signal data   : std_logic_vector(7 downto 0); -- @axion RW W_STROBE
    signal status : std_logic_vector(31 downto 0); -- @axion RO R_STROBE
begin
end architecture rtl;
"#;

const SPI_TOML: &str = r#"
module = "spi"
base_addr = "0x1004"

[[registers]]
name = "ctrl"
access = "RW"
"#;

fn write(dir: &Path, name: &str, text: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, text).unwrap();
}

fn init_logging() {
    let _ = simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Debug)
        .init();
}

#[test]
fn batch_collects_modules_and_errors() {
    init_logging();
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "uart.vhd", UART_VHD);
    write(tmp.path(), "spi.toml", SPI_TOML);
    write(tmp.path(), "broken.json", "{ not json");
    write(tmp.path(), "notes.vhd", "entity notes is end;\n");
    write(tmp.path(), "README.md", "# nothing here");
    write(
        tmp.path(),
        "excl/skip.vhd",
        "entity skip is end;\nsignal s : std_logic; -- @axion RO",
    );

    let analysis = analyze_sources(&[tmp.path()], &["excl".to_string()]);

    let names: Vec<&str> = analysis.modules.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["spi", "uart"]);
    assert_eq!(analysis.errors.len(), 1);
    assert!(matches!(analysis.errors[0].error, InputError::Schema { .. }));
    assert!(analysis.errors[0].to_string().contains("broken.json"));
    assert!(!analysis.is_clean());

    // uart 0x1004 (status) collides with spi 0x1004 (ctrl)
    for module in &analysis.modules {
        assert!(module.has_errors(), "{} should carry the conflict", module.name);
        assert!(module
            .parsing_errors
            .iter()
            .any(|d| d.msg.contains("across modules") && d.msg.contains("0x1004")));
    }
    let uart = &analysis.modules[1];
    assert_eq!(uart.register("status").unwrap().address, 0x1004);
}

#[test]
fn missing_directory_is_recorded() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("nope");
    let analysis = analyze_sources(&[missing.as_path()], &[]);
    assert!(analysis.modules.is_empty());
    assert_eq!(analysis.errors.len(), 1);
    assert!(matches!(analysis.errors[0].error, InputError::Io { .. }));
}

#[test]
fn glob_exclude_skips_files() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "uart.vhd", UART_VHD);
    write(tmp.path(), "uart_tb.vhd", &UART_VHD.replace("uart", "uart_tb"));
    let analysis = analyze_sources(&[tmp.path()], &["*_tb.vhd".to_string()]);
    assert_eq!(analysis.modules.len(), 1);
    assert!(analysis.is_clean());
}

#[test]
fn intra_module_conflict_partial_and_strict() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "mod_x.vhd",
        "entity mod_x is end;\n\
         signal reg_a : std_logic_vector(31 downto 0); -- @axion RW ADDR=0x4\n\
         signal reg_b : std_logic_vector(31 downto 0); -- @axion RW ADDR=0x4\n",
    );

    let analysis = analyze_sources(&[tmp.path()], &[]);
    let module = &analysis.modules[0];
    assert!(module.has_errors());
    let conflict = module
        .parsing_errors
        .iter()
        .find(|d| d.msg.starts_with("Address Conflict"))
        .unwrap();
    assert!(conflict.msg.contains("reg_a") && conflict.msg.contains("reg_b"));
    assert!(conflict.formatted.is_some());

    let strict = analyze_sources_with_config(&[tmp.path()], &[], &ResolveConfig::new());
    assert!(matches!(strict, Err(ResolutionError::AddressConflict(_))));
}

#[test]
fn vhdl_and_structured_sources_generate_the_same_entity() {
    let vhdl_dir = TempDir::new().unwrap();
    let toml_dir = TempDir::new().unwrap();
    let json_dir = TempDir::new().unwrap();

    write(
        vhdl_dir.path(),
        "sensor.vhd",
        r#"
-- @axion_def BASE_ADDR=0x2000 CDC_EN CDC_STAGE=3
entity sensor is end;
architecture rtl of sensor is
    signal status : std_logic_vector(15 downto 0); -- @axion RO DESC="Status"
    signal gain   : std_logic_vector(7 downto 0); -- @axion RW ADDR=0x10 DEFAULT=0x40 W_STROBE
    signal en     : std_logic; -- @axion RW REG_NAME=ctrl
    signal mode   : std_logic_vector(2 downto 0); -- @axion RW REG_NAME=ctrl
begin
end;
"#,
    );
    write(
        toml_dir.path(),
        "sensor.toml",
        r#"
[module]
name = "sensor"
base_addr = 0x2000

[config]
cdc_en = true
cdc_stage = 3

[[registers]]
name = "status"
access = "RO"
width = 16
description = "Status"

[[registers]]
name = "gain"
addr = "0x10"
width = 8
default = "0x40"
w_strobe = true

[[registers]]
name = "en"
width = 1
reg_name = "ctrl"

[[registers]]
name = "mode"
width = 3
reg_name = "ctrl"
"#,
    );
    write(
        json_dir.path(),
        "sensor.json",
        r#"{
  "module": "sensor",
  "base_addr": "0x2000",
  "config": { "cdc_en": true, "cdc_stage": 3 },
  "registers": [
    { "name": "status", "access": "RO", "width": 16, "description": "Status" },
    { "name": "gain", "addr": 16, "width": 8, "default": 64, "w_strobe": true },
    { "name": "en", "width": 1, "reg_name": "ctrl" },
    { "name": "mode", "width": 3, "reg_name": "ctrl" }
  ]
}"#,
    );

    let config = GeneratorConfig::default();
    let outputs: Vec<String> = [&vhdl_dir, &toml_dir, &json_dir]
        .iter()
        .map(|dir| {
            let analysis = analyze_sources(&[dir.path()], &[]);
            assert!(analysis.is_clean(), "{:?}", analysis.errors);
            assert_eq!(analysis.modules.len(), 1);
            generate_vhdl(&analysis.modules[0], &config)
        })
        .collect();

    assert_eq!(outputs[0], outputs[1]);
    assert_eq!(outputs[0], outputs[2]);
    assert!(outputs[0].contains("entity sensor_axion_reg is"));
    assert!(outputs[0].contains("ctrl_reg"));
}

#[test]
fn oversized_base_address_is_recorded_not_fatal() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "huge.vhd",
        "-- @axion_def BASE_ADDR=0xFFFFFFFFFFFFFFFC\n\
         entity huge is end;\n\
         signal a : std_logic_vector(31 downto 0); -- @axion RW\n\
         signal b : std_logic_vector(31 downto 0); -- @axion RW\n",
    );
    write(tmp.path(), "spi.toml", SPI_TOML);

    let analysis = analyze_sources(&[tmp.path()], &[]);
    let names: Vec<&str> = analysis.modules.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["huge", "spi"]);
    let huge = &analysis.modules[0];
    assert!(huge.has_errors());
    assert!(huge.entries.is_empty());
    assert!(!analysis.modules[1].has_errors());
}

#[test]
fn derived_signal_name_clash_is_recorded() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "clash.toml",
        r#"
module = "clash"

[[registers]]
name = "ctrl"
access = "RW"

[[registers]]
name = "ctrl_reg"
access = "RO"
"#,
    );
    let analysis = analyze_sources(&[tmp.path()], &[]);
    let module = &analysis.modules[0];
    assert!(module.has_errors());
    assert!(module.parsing_errors.iter().any(|d| d.msg.contains("ctrl_reg")));
}
