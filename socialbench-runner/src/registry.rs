/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use std::collections::HashMap;

use thiserror::Error;

use crate::{config::RunConfig, recorder::Recorder};

/// The entry point of a registered tool: run one benchmark described by the config,
/// reporting through the recorder.
pub type Benchmark = Box<dyn Fn(&RunConfig, &mut Recorder<'_>) -> anyhow::Result<()>>;

/// Validates the inputs a tool will read, before anything is written.
pub type InputCheck = Box<dyn Fn(&RunConfig) -> anyhow::Result<()>>;

struct Tool {
    queries: Vec<&'static str>,
    inputs: Option<InputCheck>,
    benchmark: Benchmark,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("A tool named \"{0}\" already exists")]
    AlreadyExists(String),
    #[error("unknown tool \"{tool}\", registered tools are: {known}")]
    UnknownTool { tool: String, known: String },
    #[error("tool \"{tool}\" does not support query \"{query}\", supported: {supported}")]
    UnsupportedQuery {
        tool: String,
        query: String,
        supported: String,
    },
}

/// Benchmarkable tools keyed by name.
#[derive(Default)]
pub struct Tools {
    tools: HashMap<String, Tool>,
}

impl Tools {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `benchmark` under `name`, answering the listed `queries`.
    ///
    /// Fails without modifying the registry if `name` is already taken.
    pub fn register<F>(
        &mut self,
        name: impl Into<String>,
        queries: &[&'static str],
        benchmark: F,
    ) -> anyhow::Result<()>
    where
        F: Fn(&RunConfig, &mut Recorder<'_>) -> anyhow::Result<()> + 'static,
    {
        self.insert(name.into(), queries, None, Box::new(benchmark))
    }

    /// Like [`Self::register`], with `inputs` run by [`Self::check_inputs`] before the
    /// benchmark is called.
    pub fn register_checked<C, F>(
        &mut self,
        name: impl Into<String>,
        queries: &[&'static str],
        inputs: C,
        benchmark: F,
    ) -> anyhow::Result<()>
    where
        C: Fn(&RunConfig) -> anyhow::Result<()> + 'static,
        F: Fn(&RunConfig, &mut Recorder<'_>) -> anyhow::Result<()> + 'static,
    {
        self.insert(name.into(), queries, Some(Box::new(inputs)), Box::new(benchmark))
    }

    fn insert(
        &mut self,
        name: String,
        queries: &[&'static str],
        inputs: Option<InputCheck>,
        benchmark: Benchmark,
    ) -> anyhow::Result<()> {
        use std::collections::hash_map::Entry;

        match self.tools.entry(name) {
            Entry::Vacant(entry) => {
                entry.insert(Tool {
                    queries: queries.to_vec(),
                    inputs,
                    benchmark,
                });
                Ok(())
            }
            Entry::Occupied(entry) => {
                Err(RegistryError::AlreadyExists(entry.key().clone()).into())
            }
        }
    }

    /// Registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.tools.keys().map(String::as_str).collect();
        names.sort();
        names
    }

    /// Queries answered by `tool`, or `None` if no such tool is registered.
    pub fn queries(&self, tool: &str) -> Option<&[&'static str]> {
        self.tools.get(tool).map(|t| t.queries.as_slice())
    }

    /// Ensure the configured tool exists and answers the configured query.
    pub fn check(&self, config: &RunConfig) -> Result<(), RegistryError> {
        self.find(config).map(|_| ())
    }

    /// Run the input check registered for `config.tool`, if any.
    pub fn check_inputs(&self, config: &RunConfig) -> anyhow::Result<()> {
        match &self.find(config)?.inputs {
            Some(inputs) => inputs(config),
            None => Ok(()),
        }
    }

    /// Invoke the benchmark registered for `config.tool`.
    pub fn call(&self, config: &RunConfig, recorder: &mut Recorder<'_>) -> anyhow::Result<()> {
        let tool = self.find(config)?;
        (tool.benchmark)(config, recorder)
    }

    fn find(&self, config: &RunConfig) -> Result<&Tool, RegistryError> {
        let tool = self
            .tools
            .get(&config.tool)
            .ok_or_else(|| RegistryError::UnknownTool {
                tool: config.tool.clone(),
                known: self.names().join(", "),
            })?;

        if !tool.queries.contains(&config.query.as_str()) {
            return Err(RegistryError::UnsupportedQuery {
                tool: config.tool.clone(),
                query: config.query.clone(),
                supported: tool.queries.join(", "),
            });
        }
        Ok(tool)
    }
}

///////////
// Tests //
///////////
