/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use indicatif::ProgressDrawTarget;

/// Return an [`Output`] printing metric lines to `stdout` and progress bars to `stderr`.
pub fn default() -> DefaultOutput {
    DefaultOutput::new()
}

/// Destination of the metric stream.
///
/// * `sink`: Receives the header and one line per snapshot.
/// * `draw_target`: Where progress bars are drawn. Metric lines must stay machine readable,
///   so this must never be the same stream as `sink`.
pub trait Output {
    fn sink(&mut self) -> &mut dyn std::io::Write;
    fn draw_target(&self) -> ProgressDrawTarget;
}

/// Allows `&mut dyn Output` to be used with `write!` and `writeln!`.
impl std::io::Write for &mut dyn Output {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.sink().write(buf)
    }
    fn flush(&mut self) -> std::io::Result<()> {
        self.sink().flush()
    }
}

/// Metric lines go to `stdout`; progress bars go to `stderr` unless hidden.
#[derive(Debug)]
pub struct DefaultOutput {
    stdout: std::io::Stdout,
    progress: bool,
}

impl DefaultOutput {
    pub fn new() -> Self {
        Self {
            stdout: std::io::stdout(),
            progress: true,
        }
    }

    /// Suppress progress bars while still printing metric lines.
    pub fn without_progress(mut self) -> Self {
        self.progress = false;
        self
    }
}

impl Default for DefaultOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl Output for DefaultOutput {
    fn sink(&mut self) -> &mut dyn std::io::Write {
        &mut self.stdout
    }

    fn draw_target(&self) -> ProgressDrawTarget {
        if self.progress {
            ProgressDrawTarget::stderr()
        } else {
            ProgressDrawTarget::hidden()
        }
    }
}

/// Captures the metric stream in a buffer. Progress bars are hidden.
#[derive(Debug, Default)]
pub struct Memory(Vec<u8>);

impl Memory {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Consume `self`, returning everything written so far.
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }

    /// Return the captured text split into lines.
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.0)
            .lines()
            .map(String::from)
            .collect()
    }
}

impl Output for Memory {
    fn sink(&mut self) -> &mut dyn std::io::Write {
        &mut self.0
    }

    fn draw_target(&self) -> ProgressDrawTarget {
        ProgressDrawTarget::hidden()
    }
}

///////////
// Tests //
///////////
