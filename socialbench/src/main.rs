/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

mod backend;
mod utils;

use socialbench_runner as runner;

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();
    utils::tracing::init_subscriber();

    let mut output = runner::output::default();
    if cli.quiet {
        output = output.without_progress();
    }
    cli.run(&mut output)
}

/// The top-level CLI for the benchmark binary.
#[derive(Debug, clap::Parser)]
struct Cli {
    /// Do not draw progress bars.
    #[arg(long, action)]
    quiet: bool,

    #[command(flatten)]
    app: runner::App,
}

impl Cli {
    fn parse() -> Self {
        <Self as clap::Parser>::parse()
    }

    fn run(&self, output: &mut dyn runner::Output) -> anyhow::Result<()> {
        let mut tools = runner::registry::Tools::new();
        backend::register_tools(&mut tools)?;

        self.app.run(&tools, output)
    }

    #[cfg(test)]
    fn from_commands(commands: runner::app::Commands, quiet: bool) -> Self {
        Self {
            quiet,
            app: runner::App::from_commands(commands),
        }
    }
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    use runner::{app::Commands, output::Memory, snapshot::HEADER};

    /// Alice and Bob are friends. Bob comments on Alice's post, then both like the comment.
    fn write_dataset(dir: &Path) {
        let files = [
            ("csv-users-initial.csv", "1|Alice\n2|Bob\n"),
            ("csv-friends-initial.csv", "1|2\n"),
            ("csv-posts-initial.csv", "10|2010-02-14 11:00:00|hello|1\n"),
            ("csv-comments-initial.csv", ""),
            ("csv-likes-initial.csv", ""),
            ("change01.csv", "Comments|20|2010-02-14 11:09:43|first|2|10\n"),
            ("change02.csv", "Likes|1|20\nLikes|2|20\n"),
        ];
        for (name, contents) in files {
            std::fs::write(dir.join(name), contents).unwrap();
        }
    }

    fn run(dir: &Path, tool: &str, query: &str) -> anyhow::Result<Vec<String>> {
        let mut output = Memory::new();
        run_into(dir, tool, query, &mut output)?;
        Ok(output.lines())
    }

    fn run_into(dir: &Path, tool: &str, query: &str, output: &mut Memory) -> anyhow::Result<()> {
        let app = runner::App::try_parse_from([
            "socialbench",
            "run",
            "--tool",
            tool,
            "--change-path",
            dir.to_str().unwrap(),
            "--change-set",
            "tiny",
            "--query",
            query,
            "--run-index",
            "0",
            "--sequences",
            "2",
            "--memory-sampling",
            "resident",
        ])?;
        let cli = Cli {
            quiet: true,
            app,
        };
        cli.run(output)
    }

    fn elements(lines: &[String]) -> Vec<&str> {
        lines
            .iter()
            .filter(|l| l.contains(",Elements,"))
            .filter_map(|l| l.rsplit(',').next())
            .collect()
    }

    #[test]
    fn friendship_scores_end_to_end() {
        let _guard = utils::tracing::init_test_subscriber();
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path());

        for tool in ["InMemory", "InMemoryBatch"] {
            let lines = run(dir.path(), tool, "Q2").unwrap();

            // Header, three timed setup phases, then two lines per batch plus its result.
            assert_eq!(lines.len(), 1 + 2 * (3 + 2) + (1 + 2));
            assert_eq!(lines[0], HEADER);
            assert!(lines[1].starts_with(&format!("{},Q2,tiny,0,0,Initialization,Time,", tool)));

            assert_eq!(elements(&lines), vec!["", "20", "20"]);
        }
    }

    #[test]
    fn influential_posts_end_to_end() {
        let _guard = utils::tracing::init_test_subscriber();
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path());

        let lines = run(dir.path(), "InMemory", "Q1").unwrap();
        assert_eq!(elements(&lines), vec!["10", "10", "10"]);
        assert!(lines.iter().any(|l| l.starts_with("InMemory,Q1,tiny,0,2,Updates,Elements,")));
    }

    #[test]
    fn missing_baseline_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path());
        std::fs::remove_file(dir.path().join("csv-likes-initial.csv")).unwrap();

        for tool in ["InMemory", "InMemoryBatch"] {
            let mut output = Memory::new();
            let err = run_into(dir.path(), tool, "Q2", &mut output).unwrap_err();
            assert!(format!("{:#}", err).contains("csv-likes-initial.csv"));
            assert!(output.lines().is_empty());
        }
    }

    #[test]
    fn unknown_tool_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path());

        let err = run(dir.path(), "Neo4j", "Q2").unwrap_err();
        assert!(format!("{:#}", err).contains("InMemoryBatch"));
    }

    #[test]
    fn lists_tools() {
        let cli = Cli::from_commands(Commands::Tools {}, true);
        let mut output = Memory::new();
        cli.run(&mut output).unwrap();

        let lines = output.lines();
        assert_eq!(lines[0], "Registered tools:");
        assert_eq!(lines[1].trim(), "InMemory: Q1, Q2");
        assert_eq!(lines[2].trim(), "InMemoryBatch: Q1, Q2");
    }
}
