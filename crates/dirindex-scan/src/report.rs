//! Periodic status line rendering.

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use crossterm::cursor::MoveUp;
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::progress::{ProgressCounter, ProgressSnapshot};

const MEGABYTE: f64 = 1e6;
const LAST_FILE_LABEL: &str = "Last processed file: ";
const PLACEHOLDER: [&str; 2] = [
    "Elapsed Time: --:--:--, Files processed: ----, MB processed: ----, Speed: ---- MB/s",
    "Last processed file: ----------------",
];

/// Background task that redraws a two-line status block on every tick.
///
/// The reporter only reads the shared [`ProgressCounter`]; it never
/// coordinates with the walk beyond that.
pub struct StatusReporter {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

impl StatusReporter {
    /// Report to stdout. Must be called inside a tokio runtime.
    pub fn spawn(progress: Arc<ProgressCounter>, interval: Duration, width: usize) -> Self {
        Self::spawn_with_writer(progress, interval, width, io::stdout())
    }

    pub fn spawn_with_writer<W>(
        progress: Arc<ProgressCounter>,
        interval: Duration,
        width: usize,
        mut writer: W,
    ) -> Self
    where
        W: Write + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            if let Err(err) = draw(&mut writer, &PLACEHOLDER.map(String::from), false) {
                tracing::debug!(error = %err, "status output closed");
                return;
            }

            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately.
            ticker.tick().await;
            let mut previous_bytes = 0;

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let snapshot = progress.snapshot();
                        let delta = snapshot.bytes_processed.saturating_sub(previous_bytes);
                        previous_bytes = snapshot.bytes_processed;
                        let speed = delta as f64 / interval.as_secs_f64();

                        let lines = status_lines(&snapshot, speed, width);
                        if let Err(err) = draw(&mut writer, &lines, true) {
                            tracing::debug!(error = %err, "status output closed");
                            break;
                        }
                    }
                }
            }
        });

        Self { handle, cancel }
    }

    /// Stop the task and wait for it to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(err) = self.handle.await {
            tracing::warn!(error = %err, "status reporter task failed");
        }
    }
}

fn draw<W: Write>(writer: &mut W, lines: &[String; 2], redraw: bool) -> io::Result<()> {
    if redraw {
        queue!(writer, MoveUp(2))?;
    }
    for line in lines {
        queue!(writer, Clear(ClearType::CurrentLine))?;
        writeln!(writer, "{line}")?;
    }
    writer.flush()
}

/// Render the two status lines.
///
/// `speed` is in bytes per second. Megabytes are decimal.
pub fn status_lines(snapshot: &ProgressSnapshot, speed: f64, width: usize) -> [String; 2] {
    let secs = snapshot.elapsed.as_secs();
    let (h, m, s) = (secs / 3600, (secs / 60) % 60, secs % 60);

    let counts = format!(
        "Elapsed Time: {h:02}:{m:02}:{s:02}, Files processed: {}, MB processed: {:.2}, Speed: {:.2} MB/s",
        snapshot.files_processed,
        snapshot.bytes_processed as f64 / MEGABYTE,
        speed / MEGABYTE,
    );

    let last = snapshot.last_path.to_string_lossy();
    let budget = width.saturating_sub(LAST_FILE_LABEL.len());
    let last = format!("{LAST_FILE_LABEL}{}", truncate_path(&last, budget));

    [counts, last]
}

/// Shorten `s` to at most `max` characters, ending in `...` when cut.
pub fn truncate_path(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let keep = max.saturating_sub(3);
    let mut out: String = s.chars().take(keep).collect();
    out.push_str(&"..."[..max.min(3)]);
    out
}

/// Terminal width in columns, 80 when it cannot be determined.
pub fn terminal_width() -> usize {
    match crossterm::terminal::size() {
        Ok((cols, _)) if cols > 0 => cols as usize,
        Ok(_) => 80,
        Err(err) => {
            tracing::debug!(error = %err, "terminal width unavailable");
            80
        }
    }
}
