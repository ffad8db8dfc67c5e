// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Entry point for the opsh interactive operations shell.
// Author: Lukas Bower

use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::LevelFilter;
use opsh::{BusyPolicy, ConfigOverrides, Console, EngineConfig};

/// Command-line arguments for the opsh binary.
#[derive(Debug, Parser)]
#[command(author, version, about = "Interactive operations shell")]
struct Cli {
    /// Configuration file (TOML). Defaults to $OPSH_CONFIG or ./opsh.toml.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory receiving audit and error logs.
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Queue submissions while a command is running instead of rejecting them.
    #[arg(long)]
    queue: bool,

    /// Enable debug logging on stderr.
    #[arg(short, long)]
    verbose: bool,

    /// Run commands from a script file instead of the interactive prompt.
    #[arg(long, value_name = "FILE", conflicts_with = "command")]
    script: Option<PathBuf>,

    /// Run a single command line and exit.
    #[arg(short = 'c', long = "command", value_name = "LINE")]
    command: Option<String>,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let mut builder =
        env_logger::Builder::from_env(Env::default().default_filter_or(default_level.as_str()));
    builder.format_timestamp_millis();
    let _ = builder.try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let overrides = ConfigOverrides {
        log_dir: cli.log_dir,
        busy_policy: cli.queue.then_some(BusyPolicy::Queue),
    };
    let config =
        EngineConfig::resolve(cli.config, &overrides).context("failed to load configuration")?;
    let console = Console::new(config, io::stdout()).context("failed to start engine")?;

    if let Some(line) = cli.command {
        console.execute(&line)?;
        return console.wait_idle();
    }
    if let Some(path) = cli.script {
        let file = File::open(&path)
            .with_context(|| format!("failed to open script {}", path.display()))?;
        return console.run_script(BufReader::new(file));
    }
    console.banner()?;
    console.repl()
}
