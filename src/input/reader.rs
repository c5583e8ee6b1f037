//! Line reader for user answers.
//!
//! Reads lines from a source (stdin in the binary) on a dedicated thread and
//! forwards them onto the foreground message channel.

use std::io::{self, BufRead};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

use tracing::debug;

use crate::events::Message;

pub struct StdinReader {
    handle: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
}

impl StdinReader {
    /// Spawn a reader over stdin.
    pub fn stdin(tx: Sender<Message>) -> io::Result<Self> {
        Self::spawn(io::BufReader::new(io::stdin()), tx)
    }

    /// Spawn a reader over any line source.
    pub fn spawn<R: BufRead + Send + 'static>(source: R, tx: Sender<Message>) -> io::Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();

        let handle = thread::Builder::new()
            .name("pcode-stdin".to_string())
            .spawn(move || Self::read_loop(source, running_clone, tx))?;

        Ok(Self {
            handle: Some(handle),
            running,
        })
    }

    fn read_loop<R: BufRead>(mut source: R, running: Arc<AtomicBool>, tx: Sender<Message>) {
        let mut line = String::new();

        while running.load(Ordering::SeqCst) {
            line.clear();
            match source.read_line(&mut line) {
                Ok(0) => {
                    let _ = tx.send(Message::Closed);
                    break;
                }
                Ok(_) => {
                    let text = line.strip_suffix('\n').unwrap_or(&line);
                    let text = text.strip_suffix('\r').unwrap_or(text);
                    if tx.send(Message::Line(text.to_string())).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!(error = %e, "input source failed");
                    let _ = tx.send(Message::Closed);
                    break;
                }
            }
        }
        running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop forwarding lines.
    ///
    /// A thread blocked on stdin is detached, not joined; it ends when the
    /// source closes or the process exits.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.is_finished() {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for StdinReader {
    fn drop(&mut self) {
        self.stop();
    }
}
