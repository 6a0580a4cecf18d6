//! Live terminal rendering of a running simulation.
//!
//! A single spinner line shows the activity indicator and per-status
//! counts; every new log entry is printed above it. When the run ends a
//! summary table of all execution records is printed.

use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

use colored::{ColoredString, Colorize};
use indicatif::{ProgressBar, ProgressStyle};
use promise_sim::{LogEntry, LogStream, SimSnapshot, Simulator, TaskExecutionRecord, TaskStatus, Tone};
use tokio_util::sync::CancellationToken;

/// Spinner line plus log printer.
pub struct LiveDisplay {
    status_bar: ProgressBar,
}

impl LiveDisplay {
    /// Create a new live display.
    ///
    /// If `no_color` is true or stderr is not a terminal (piped),
    /// color output is disabled.
    pub fn new(no_color: bool) -> Self {
        if no_color || !std::io::stderr().is_terminal() {
            colored::control::set_override(false);
        }

        let status_bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {wide_msg}") {
            status_bar.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
        }
        status_bar.enable_steady_tick(Duration::from_millis(100));

        Self { status_bar }
    }

    /// One status line from a snapshot.
    ///
    /// Shows the indicator's elapsed reading while a unit is animating,
    /// followed by pending / completed / failed counts.
    pub fn format_status(snapshot: &SimSnapshot) -> String {
        let count = |status: TaskStatus| {
            snapshot
                .records
                .iter()
                .filter(|r| r.status == status)
                .count()
        };
        let activity = if snapshot.animating {
            format!("running {:.1}s", snapshot.elapsed_secs).cyan()
        } else {
            "idle".dimmed()
        };
        format!(
            "{}  |  pending: {}  |  completed: {}  |  failed: {}",
            activity,
            count(TaskStatus::Pending).to_string().yellow(),
            count(TaskStatus::Completed).to_string().green(),
            count(TaskStatus::Failed).to_string().red(),
        )
    }

    /// One printed line for a log entry.
    pub fn format_log_line(entry: &LogEntry) -> String {
        let marker = match entry.tone {
            Tone::Info => "•".cyan(),
            Tone::Resolved => "✔".green(),
            Tone::Rejected => "✘".red(),
        };
        format!(
            "  {} {} {}",
            entry.at.format("%H:%M:%S%.3f").to_string().dimmed(),
            marker,
            entry.message
        )
    }

    /// Update the spinner line.
    pub fn update(&self, snapshot: &SimSnapshot) {
        self.status_bar.set_message(Self::format_status(snapshot));
    }

    /// Print a log entry above the spinner.
    pub fn print_entry(&self, entry: &LogEntry) {
        self.status_bar.println(Self::format_log_line(entry));
    }

    /// Print every entry appended after `printed` and return the new cursor.
    pub fn print_new_entries(&self, log: &LogStream, printed: u64) -> u64 {
        log.entries_after(printed)
            .iter()
            .fold(printed, |_, entry| {
                self.print_entry(entry);
                entry.seq
            })
    }

    /// Stop the display and clear the spinner.
    pub fn finish(&self) {
        self.status_bar.finish_and_clear();
    }
}

fn status_marker(status: TaskStatus) -> ColoredString {
    match status {
        TaskStatus::Pending => "…".yellow(),
        TaskStatus::Completed => "✔".green(),
        TaskStatus::Failed => "✘".red(),
    }
}

fn status_label(status: TaskStatus) -> ColoredString {
    let label = format!("{:<9}", status.to_string());
    match status {
        TaskStatus::Pending => label.yellow(),
        TaskStatus::Completed => label.green(),
        TaskStatus::Failed => label.red(),
    }
}

/// One summary row for an execution record.
pub fn format_record(record: &TaskExecutionRecord) -> String {
    format!(
        "  {} {:<9} {:<26} {} {:>5.1}s  {}",
        status_marker(record.status),
        record.execution.to_string(),
        record.task.name,
        status_label(record.status),
        record.elapsed_secs,
        record.step.dimmed()
    )
}

/// Print the final summary table to stdout.
pub fn print_summary(snapshot: &SimSnapshot) {
    println!();
    println!("  {}", "Task executions".bold());
    println!();
    for record in &snapshot.records {
        println!("{}", format_record(record));
    }
    println!();
    if !snapshot.completed.is_empty() {
        let names: Vec<&str> = snapshot
            .completed
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        println!("  {} {}", "Completed:".bold(), names.join(", "));
    }
    if let Some(message) = &snapshot.log {
        println!("  {} {}", "Last message:".bold(), message);
    }
}

/// Run the live display loop.
///
/// Prints every log entry as it is appended and refreshes the spinner line
/// once per engine tick. Stops when the [`CancellationToken`] is cancelled,
/// after flushing entries that are still unprinted.
pub async fn display_loop(sim: Arc<Simulator>, cancel: CancellationToken, no_color: bool) {
    let display = LiveDisplay::new(no_color);
    let mut log_rx = sim.subscribe_log();
    let mut refresh = tokio::time::interval(sim.tick());
    let mut printed = 0u64;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                display.print_new_entries(sim.log(), printed);
                display.update(&sim.snapshot());
                break;
            }
            changed = log_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let _ = log_rx.borrow_and_update();
                printed = display.print_new_entries(sim.log(), printed);
            }
            _ = refresh.tick() => {
                display.update(&sim.snapshot());
            }
        }
    }

    display.finish();
}

#[cfg(test)]
mod tests {
    use super::*;
    use promise_sim::{ExecutionId, LogSource, TaskDefinition};

    fn plain() {
        colored::control::set_override(false);
    }

    fn record(status: TaskStatus, elapsed_secs: f64) -> TaskExecutionRecord {
        let mut record =
            TaskExecutionRecord::new(ExecutionId::from_raw(12), TaskDefinition::new(1, "Ordering a Pizza"));
        record.status = status;
        record.elapsed_secs = elapsed_secs;
        record
    }

    #[test]
    fn test_format_status_counts() {
        plain();
        let snapshot = SimSnapshot {
            records: vec![
                record(TaskStatus::Pending, 0.4),
                record(TaskStatus::Completed, 1.2),
                record(TaskStatus::Failed, 2.0),
                record(TaskStatus::Completed, 2.5),
            ],
            log: None,
            animating: true,
            elapsed_secs: 0.4,
            completed: Vec::new(),
        };
        let status = LiveDisplay::format_status(&snapshot);
        assert!(status.contains("running 0.4s"), "got: {status}");
        assert!(status.contains("pending: 1"), "got: {status}");
        assert!(status.contains("completed: 2"), "got: {status}");
        assert!(status.contains("failed: 1"), "got: {status}");
    }

    #[test]
    fn test_format_status_idle() {
        plain();
        let snapshot = SimSnapshot {
            records: Vec::new(),
            log: None,
            animating: false,
            elapsed_secs: 1.7,
            completed: Vec::new(),
        };
        assert!(LiveDisplay::format_status(&snapshot).starts_with("idle"));
    }

    #[test]
    fn test_format_record() {
        plain();
        let row = format_record(&record(TaskStatus::Failed, 2.34));
        assert!(row.contains("exec-12"), "got: {row}");
        assert!(row.contains("Ordering a Pizza"), "got: {row}");
        assert!(row.contains("Failed"), "got: {row}");
        assert!(row.contains("2.3s"), "got: {row}");
    }

    #[test]
    fn test_format_log_line_markers() {
        plain();
        let entry = LogStream::new().push(LogSource::Race, Tone::Rejected, "First task failed: boom");
        let line = LiveDisplay::format_log_line(&entry);
        assert!(line.contains("✘"), "got: {line}");
        assert!(line.ends_with("First task failed: boom"), "got: {line}");
    }

    #[test]
    fn test_print_new_entries_advances_cursor() {
        plain();
        let display = LiveDisplay::new(true);
        let log = LogStream::new();
        log.push(LogSource::All, Tone::Info, "Starting all tasks in parallel...");
        log.push(LogSource::All, Tone::Resolved, "All tasks resolved successfully!");

        let printed = display.print_new_entries(&log, 0);
        assert_eq!(printed, 2);
        assert_eq!(display.print_new_entries(&log, printed), 2);

        log.push(LogSource::Race, Tone::Info, "Starting race between tasks...");
        assert_eq!(display.print_new_entries(&log, printed), 3);
        display.finish();
    }

    #[tokio::test(start_paused = true)]
    async fn test_display_loop_stops_on_cancel() {
        let sim = Arc::new(
            Simulator::builder()
                .with_outcomes(promise_sim::ScriptedOutcomes::new([]))
                .build(),
        );
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(display_loop(sim.clone(), cancel.clone(), true));

        sim.submit_all();
        sim.wait_idle().await;
        cancel.cancel();
        handle.await.unwrap();

        assert!(!sim.log().is_empty());
        assert_eq!(sim.registry().pending_count(), 0);
    }
}
