// Licensed under the Apache-2.0 license

mod generate;
mod map;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use axion_registers_generator::{ConflictPolicy, GeneratorConfig, ResolveConfig};
use axion_registers_input::{analyze_sources_with_config, parse_int_literal, Analysis};
use clap::{ArgAction, Args, Parser, Subcommand};
use log::LevelFilter;
use simple_logger::SimpleLogger;

#[derive(Parser, Debug)]
#[command(
    name = "axion",
    author,
    version,
    about = "Compile annotated VHDL, TOML and JSON register maps into AXI4-Lite register files"
)]
struct Cli {
    /// More output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Directory to scan for .vhd, .vhdl, .toml and .json sources
    #[arg(short = 's', long = "source", value_name = "DIR", required = true)]
    sources: Vec<PathBuf>,

    /// File name, directory name or file-name glob to skip
    #[arg(short = 'x', long = "exclude", value_name = "PATTERN")]
    excludes: Vec<String>,

    /// Record conflicts on the affected modules instead of stopping
    #[arg(long)]
    partial: bool,

    /// First address handed out by auto-allocation
    #[arg(long, value_name = "ADDR", value_parser = parse_address)]
    start_address: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write one `<module>_axion_reg.vhd` per module
    Generate {
        #[command(flatten)]
        sources: SourceArgs,

        /// Output directory
        #[arg(short, long, value_name = "DIR", default_value = "output")]
        output: PathBuf,

        /// Entity and file name suffix
        #[arg(long, default_value = "_axion_reg")]
        suffix: String,

        /// Omit the register table comment at the top of each file
        #[arg(long)]
        no_header: bool,

        /// Omit ASYNC_REG attributes on synchronizer stages
        #[arg(long)]
        no_async_reg: bool,
    },
    /// Print the resolved register map
    Map {
        #[command(flatten)]
        sources: SourceArgs,

        /// Print the resolved modules as JSON
        #[arg(long)]
        json: bool,
    },
}

fn parse_address(text: &str) -> Result<u64, String> {
    parse_int_literal(text).map_err(|e| e.to_string())
}

impl SourceArgs {
    fn resolve_config(&self) -> ResolveConfig {
        let policy = if self.partial {
            ConflictPolicy::Partial
        } else {
            ConflictPolicy::Strict
        };
        ResolveConfig::new()
            .policy(policy)
            .start_address(self.start_address.unwrap_or(0))
    }

    /// Scans and resolves every source. Unreadable files are fatal unless
    /// the policy is partial.
    fn analyze(&self) -> Result<Analysis> {
        let config = self.resolve_config();
        let analysis = analyze_sources_with_config(&self.sources, &self.excludes, &config)
            .context("address resolution failed")?;
        for err in &analysis.errors {
            log::error!("{err}");
        }
        if !self.partial && !analysis.errors.is_empty() {
            bail!(
                "{} source file(s) could not be read; rerun with --partial to skip them",
                analysis.errors.len()
            );
        }
        Ok(analysis)
    }
}

fn log_level(cli: &Cli) -> LevelFilter {
    let json = matches!(cli.command, Commands::Map { json: true, .. });
    match (cli.quiet, cli.verbose) {
        (true, _) => LevelFilter::Warn,
        // keep stdout parseable
        (false, 0) if json => LevelFilter::Warn,
        (false, 0) => LevelFilter::Info,
        (false, 1) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    SimpleLogger::new()
        .with_level(log_level(&cli))
        .init()
        .context("failed to install logger")?;

    match &cli.command {
        Commands::Generate {
            sources,
            output,
            suffix,
            no_header,
            no_async_reg,
        } => {
            let config = GeneratorConfig::new()
                .entity_suffix(suffix)
                .header(!no_header)
                .async_reg(!no_async_reg);
            generate::run(&sources.analyze()?, output, &config)
        }
        Commands::Map { sources, json } => map::run(&sources.analyze()?, *json),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_args() {
        let cli = Cli::try_parse_from([
            "axion", "-v", "generate", "-s", "rtl", "-s", "regs", "-x", "tb", "-o", "out",
            "--partial", "--start-address", "0x100", "--no-header",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        assert_eq!(log_level(&cli), LevelFilter::Debug);
        let Commands::Generate {
            sources,
            output,
            no_header,
            suffix,
            ..
        } = cli.command
        else {
            panic!("expected generate");
        };
        assert_eq!(sources.sources, vec![PathBuf::from("rtl"), PathBuf::from("regs")]);
        assert_eq!(sources.excludes, vec!["tb".to_string()]);
        assert_eq!(output, PathBuf::from("out"));
        assert!(no_header);
        assert_eq!(suffix, "_axion_reg");
        let config = sources.resolve_config();
        assert!(!config.is_strict());
        assert_eq!(config.start_address, 0x100);
    }

    #[test]
    fn test_map_json_is_quiet() {
        let cli = Cli::try_parse_from(["axion", "map", "-s", ".", "--json"]).unwrap();
        assert_eq!(log_level(&cli), LevelFilter::Warn);
        let cli = Cli::try_parse_from(["axion", "map", "-s", "."]).unwrap();
        assert_eq!(log_level(&cli), LevelFilter::Info);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(Cli::try_parse_from(["axion", "generate"]).is_err());
        assert!(Cli::try_parse_from(["axion", "map", "-s", ".", "--start-address", "zz"]).is_err());
        assert!(Cli::try_parse_from(["axion", "-q", "-v", "map", "-s", "."]).is_err());
    }
}
