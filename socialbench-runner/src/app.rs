/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use std::io::Write;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::{config::RunConfig, output::Output, recorder::Recorder, registry::Tools};

/// Parsed command line options.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the registered tools and the queries each one answers.
    Tools {},
    /// Benchmark one tool on one query over a baseline and a sequence of change batches.
    Run(RunConfig),
}

/// The CLI used to drive a benchmark application.
#[derive(Debug, Parser)]
pub struct App {
    #[command(subcommand)]
    command: Commands,
}

impl App {
    /// Construct [`Self`] by parsing commandline arguments from [`std::env::args]`.
    pub fn parse() -> Self {
        <Self as clap::Parser>::parse()
    }

    /// Construct [`Self`] by parsing command line arguments from the iterator.
    pub fn try_parse_from<I, T>(itr: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Ok(<Self as clap::Parser>::try_parse_from(itr)?)
    }

    /// Construct [`Self`] directly from a [`Commands`] enum.
    pub fn from_commands(command: Commands) -> Self {
        Self { command }
    }

    pub fn command(&self) -> &Commands {
        &self.command
    }

    /// Run the application against the registered `tools`.
    ///
    /// For `run`, the options and the inputs the tool checks up front are validated before
    /// the header is written, so such problems produce no metric output at all.
    pub fn run(&self, tools: &Tools, mut output: &mut dyn Output) -> anyhow::Result<()> {
        match &self.command {
            Commands::Tools {} => {
                writeln!(output, "Registered tools:")?;
                for name in tools.names() {
                    let queries = tools.queries(name).unwrap_or_default();
                    writeln!(output, "    {}: {}", name, queries.join(", "))?;
                }
            }
            Commands::Run(config) => {
                tools.check(config).context("invalid run configuration")?;
                config.check().context("invalid run configuration")?;
                tools.check_inputs(config)?;

                tracing::info!(
                    tool = %config.tool,
                    query = %config.query,
                    change_path = %config.change_path.display(),
                    sequences = config.sequences,
                    run_index = config.run_index,
                    "starting run"
                );

                let mut recorder =
                    Recorder::new(config.labels(), config.memory_sampling, output)?;
                if let Some(path) = &config.output_file {
                    recorder = recorder.with_checkpoint(path.clone());
                }

                recorder.header()?;
                tools.call(config, &mut recorder)?;
                tracing::info!(snapshots = recorder.snapshots().len(), "run complete");
            }
        }
        Ok(())
    }
}

///////////
// Tests //
///////////
