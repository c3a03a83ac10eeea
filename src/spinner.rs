//! Wait indicator shown while a request has not produced its first chunk.
//!
//! The spinner runs as its own task and only ever touches stderr.  It never sees response
//! data.

use std::io::{self, Write};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Frames drawn in order, one per tick.
pub const FRAMES: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// Interval between frames.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);

/// A cancellable background spinner.
#[derive(Debug)]
pub struct Spinner {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Spinner {
    /// Starts drawing frames every `interval`.  Must be called within a tokio runtime.
    pub fn start(interval: Duration) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            let mut frames = FRAMES.iter().cycle();
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Some(frame) = frames.next() {
                            let mut stderr = io::stderr();
                            let _ = write!(stderr, "\r{frame}");
                            let _ = stderr.flush();
                        }
                    }
                }
            }
            let mut stderr = io::stderr();
            let _ = write!(stderr, "\r \r");
            let _ = stderr.flush();
        });
        Self {
            cancel,
            task: Some(task),
        }
    }

    /// Stops the spinner and waits for it to clear its line.  Idempotent.
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    /// Returns true until [`Spinner::stop`] has been called.
    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
