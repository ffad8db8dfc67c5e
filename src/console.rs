// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Line-oriented console front end driving the opsh scheduler.
// Author: Lukas Bower

//! Console front end.
//!
//! The console echoes each submitted line, hands it to the [`Scheduler`] and
//! prints results as the worker delivers them. A handful of meta-commands act
//! on the console itself rather than being submitted.

use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::Local;
use log::error;

use crate::config::EngineConfig;
use crate::engine::record::STATUS_PROCESSING;
use crate::engine::{CompletionSink, ExecutionRecord, Scheduler, Submission};

/// Prompt printed by the interactive loop.
pub const PROMPT: &str = "opsh> ";

const BANNER: &str = "opsh operations shell\n\
----------------------------------------\n\
Enter a command and press Enter.\n\
Type 'help' to show all capabilities, 'cancel' to stop the running command.\n";

const IDLE_POLL: Duration = Duration::from_millis(250);

/// Lines handled by the console itself instead of the engine.
const META_COMMANDS: &[&str] = &["quit", "exit", "cancel", "history", "clear"];

/// Result of handling a single console line.
#[derive(Debug, PartialEq, Eq)]
pub enum ConsoleStatus {
    /// Continue reading lines.
    Continue,
    /// Leave the console loop.
    Quit,
}

/// [`CompletionSink`] that prints results to a shared writer.
pub struct ConsoleSink<W> {
    writer: Arc<Mutex<W>>,
}

impl<W: Write + Send> CompletionSink for ConsoleSink<W> {
    fn on_started(&self, id: u64, _line: &str) {
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(err) = writeln!(writer, "[{STATUS_PROCESSING}]").and_then(|()| writer.flush()) {
            error!("failed to print status of invocation {id}: {err}");
        }
    }

    fn on_complete(&self, record: ExecutionRecord) {
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let written = writeln!(writer, "{}\n", record.text())
            .and_then(|()| writeln!(writer, "[{}]", record.status()))
            .and_then(|()| writer.flush());
        if let Err(err) = written {
            error!("failed to print result of invocation {}: {err}", record.id());
        }
    }
}

/// Interactive and scripted console over a [`Scheduler`].
pub struct Console<W> {
    scheduler: Scheduler,
    writer: Arc<Mutex<W>>,
}

impl<W: Write + Send + 'static> Console<W> {
    /// Build the console and its scheduler.
    pub fn new(config: EngineConfig, writer: W) -> Result<Self> {
        let writer = Arc::new(Mutex::new(writer));
        let sink = Arc::new(ConsoleSink {
            writer: Arc::clone(&writer),
        });
        let scheduler = Scheduler::new(config, sink)?;
        Ok(Self { scheduler, writer })
    }
}

impl<W: Write + Send> Console<W> {
    /// The scheduler driven by this console.
    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Shared output writer.
    #[must_use]
    pub fn writer(&self) -> &Arc<Mutex<W>> {
        &self.writer
    }

    /// Write a line directly to the console output.
    pub fn write_line(&self, message: &str) -> Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| anyhow!("console writer lock poisoned"))?;
        writeln!(writer, "{message}")?;
        writer.flush()?;
        Ok(())
    }

    /// Print the start-up banner.
    pub fn banner(&self) -> Result<()> {
        self.write_line(BANNER)
    }

    /// Handle one line: meta-commands act locally, everything else is submitted.
    ///
    /// Every non-empty line lands in the history, meta-commands included.
    pub fn execute(&self, line: &str) -> Result<ConsoleStatus> {
        let line = line.trim();
        let command = line.to_ascii_lowercase();
        if META_COMMANDS.contains(&command.as_str()) {
            self.scheduler.history()?.record(line);
        }
        match command.as_str() {
            "" => return Ok(ConsoleStatus::Continue),
            "quit" | "exit" => {
                self.write_line("closing console")?;
                return Ok(ConsoleStatus::Quit);
            }
            "cancel" => {
                self.cancel()?;
                return Ok(ConsoleStatus::Continue);
            }
            "history" => {
                let listing = {
                    let history = self.scheduler.history()?;
                    history
                        .entries()
                        .iter()
                        .map(|entry| format!("{:>4}  {}", entry.seq, entry.line))
                        .collect::<Vec<_>>()
                        .join("\n")
                };
                self.write_line(&listing)?;
                return Ok(ConsoleStatus::Continue);
            }
            "clear" => {
                self.write_line("Terminal output cleared.\n")?;
                return Ok(ConsoleStatus::Continue);
            }
            _ => {}
        }

        self.write_line(&format!("[{}] > {line}", Local::now().format("%H:%M:%S")))?;
        match self.scheduler.submit(line)? {
            Submission::Ignored | Submission::Started { .. } => {}
            Submission::Queued { id, position } => {
                self.write_line(&format!("Queued as invocation {id} (position {position})"))?;
            }
            Submission::Busy { active } => {
                self.write_line(&format!(
                    "Busy: invocation {active} is still running. Type 'cancel' to stop it."
                ))?;
            }
        }
        Ok(ConsoleStatus::Continue)
    }

    fn cancel(&self) -> Result<()> {
        let message = match self.scheduler.terminate_active()? {
            None => "No command is running".to_owned(),
            Some(termination) => match termination.child {
                Some(outcome) => format!(
                    "Cancelling invocation {}: {outcome}",
                    termination.id
                ),
                None => format!("Cancelling invocation {}", termination.id),
            },
        };
        self.write_line(&message)
    }

    /// Block until the scheduler has nothing running, queued or undelivered.
    pub fn wait_idle(&self) -> Result<()> {
        while !self.scheduler.wait_idle(IDLE_POLL)? {}
        Ok(())
    }

    /// Run lines from `reader` one at a time until EOF or `quit`.
    ///
    /// Blank lines and `#` comments are skipped. Each line's invocation is
    /// allowed to finish before the next line is read.
    pub fn run_script<R: BufRead>(&self, reader: R) -> Result<()> {
        for line in reader.lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if self.execute(trimmed)? == ConsoleStatus::Quit {
                break;
            }
            self.wait_idle()?;
        }
        self.wait_idle()
    }

    /// Run an interactive loop against stdin.
    pub fn repl(&self) -> Result<()> {
        let stdin = io::stdin();
        let mut reader = stdin.lock();
        let mut line = String::new();
        loop {
            {
                let mut writer = self
                    .writer
                    .lock()
                    .map_err(|_| anyhow!("console writer lock poisoned"))?;
                write!(writer, "{PROMPT}")?;
                writer.flush()?;
            }
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                self.write_line("")?;
                break;
            }
            if self.execute(&line)? == ConsoleStatus::Quit {
                break;
            }
        }
        self.wait_idle()
    }
}
