//! A small RAII spinner for wrapping a long-running subcommand operation
//! (install/update) without wiring a full event stream.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

fn default_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {msg}")
        .unwrap()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
}

fn success_style() -> ProgressStyle {
    ProgressStyle::with_template("{msg}").unwrap()
}

pub struct PlainSpinner {
    pb: ProgressBar,
    finished: bool,
}

impl PlainSpinner {
    pub fn start(message: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.enable_steady_tick(Duration::from_millis(80));
        pb.set_style(default_style());
        pb.set_message(style(message.to_string()).yellow().to_string());
        Self { pb, finished: false }
    }

    pub fn finish_with_message(mut self, message: &str) {
        self.pb.set_style(success_style());
        self.pb
            .finish_with_message(style(message.to_string()).green().to_string());
        self.finished = true;
    }

    pub fn fail_with_message(mut self, message: &str) {
        self.pb.set_style(success_style());
        self.pb
            .finish_with_message(style(message.to_string()).red().to_string());
        self.finished = true;
    }
}

impl Drop for PlainSpinner {
    fn drop(&mut self) {
        if !self.finished {
            self.pb.finish_and_clear();
        }
    }
}
