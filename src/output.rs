//! Console front-end.
//!
//! [`ConsoleObserver`] turns engine events into coloured lines and drives a
//! progress bar; [`OutputFormatter`] holds the shared styling helpers.

use crate::file_organizer::Summary;
use crate::observer::{Event, Observer};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

/// Styling helpers for all CLI output.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Creates a progress bar for `total` files.
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("█▓░"));
        }
        pb
    }

    /// Formats the summary table of moved files per category.
    pub fn summary_table(summary: &Summary) -> String {
        let width = summary
            .iter()
            .map(|(name, _)| name.len())
            .max()
            .unwrap_or(0)
            .max(8); // At least "Category" width

        let mut lines = vec![
            format!(
                "{:<width$} | {}",
                "Category".bold(),
                "Files".bold(),
                width = width
            ),
            "-".repeat(width + 10),
        ];

        for (category, count) in summary.iter() {
            lines.push(format!(
                "{:<width$} | {} {}",
                category,
                count.to_string().green(),
                plural_files(count),
                width = width
            ));
        }

        let total = summary.total();
        lines.push("-".repeat(width + 10));
        lines.push(format!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total.to_string().green().bold(),
            plural_files(total),
            width = width
        ));

        lines.join("\n")
    }
}

fn plural_files(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}

/// Observer that renders events to the terminal.
#[derive(Default)]
pub struct ConsoleObserver {
    progress: Option<ProgressBar>,
}

impl ConsoleObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prints a line without tearing the progress bar.
    fn print(&self, line: &str) {
        match &self.progress {
            Some(pb) => pb.println(line),
            None => println!("{}", line),
        }
    }

    fn finish_progress(&mut self) {
        if let Some(pb) = self.progress.take() {
            pb.finish_and_clear();
        }
    }
}

impl Observer for ConsoleObserver {
    fn on_event(&mut self, event: &Event) {
        let text = event.to_string();
        match event {
            Event::Skipped { .. } => self.print(&text.dimmed().to_string()),
            Event::Previewed { .. } => self.print(&text.yellow().to_string()),
            Event::Moved { .. } | Event::Restored { .. } => self.print(&text.green().to_string()),
            Event::RestoreFailed { .. } => self.print(&text.red().to_string()),
            Event::Summary { counts } => {
                self.finish_progress();
                OutputFormatter::header("📊 Summary Report");
                println!("{}", OutputFormatter::summary_table(counts));
            }
            Event::UndoEmpty => OutputFormatter::error(&text),
            Event::UndoComplete { .. } => {
                self.finish_progress();
                println!();
                OutputFormatter::success(&text);
            }
        }
    }

    fn on_progress(&mut self, processed: usize, total: usize) {
        let pb = self
            .progress
            .get_or_insert_with(|| OutputFormatter::create_progress_bar(total as u64));
        pb.set_length(total as u64);
        pb.set_position(processed as u64);
    }
}
