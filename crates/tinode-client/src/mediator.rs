//! Terminal input thread.
//!
//! Line reads block, so they run on a dedicated named thread that feeds an
//! unbounded queue. The session loop only ever polls that queue.
//!
//! The thread stops after forwarding `exit` or `quit`, at end of input, on a
//! read error, or when the session loop dropped the receiver. A thread stuck
//! in a read at shutdown is given a grace period and then abandoned; the
//! process exit reclaims it.

use std::{
    io::{self, BufRead},
    thread::{self, JoinHandle},
    time::Duration,
};

use tokio::sync::mpsc;

/// Consumer half of the input queue.
pub type InputReceiver = mpsc::UnboundedReceiver<String>;

/// Handle to the running input thread.
#[derive(Debug)]
pub struct InputReader {
    handle: JoinHandle<()>,
}

/// True for the commands that end operator input.
pub fn is_exit_command(line: &str) -> bool {
    matches!(line.trim(), "exit" | "quit")
}

/// Spawn the input thread over `reader`, pushing lines into `tx`.
///
/// # Errors
///
/// Returns the OS error if the thread cannot be spawned.
pub fn spawn_input_reader<R>(reader: R, tx: mpsc::UnboundedSender<String>) -> io::Result<InputReader>
where
    R: BufRead + Send + 'static,
{
    let handle =
        thread::Builder::new().name("tn-input".to_string()).spawn(move || read_lines(reader, &tx))?;
    Ok(InputReader { handle })
}

fn read_lines<R: BufRead>(mut reader: R, tx: &mpsc::UnboundedSender<String>) {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {},
            Err(e) => {
                tracing::warn!("input read failed: {e}");
                break;
            },
        }

        // Invalid UTF-8 is replaced, never fatal.
        let text = String::from_utf8_lossy(&buf);
        let line = text.trim_end_matches(['\r', '\n']).to_string();
        let exit = is_exit_command(&line);
        if tx.send(line).is_err() || exit {
            break;
        }
    }
    tracing::debug!("input thread finished");
}

impl InputReader {
    /// Whether the thread has stopped.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait up to `grace` for the thread to stop, then abandon it.
    ///
    /// Returns true if the thread finished in time.
    pub async fn finish(self, grace: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + grace;
        while !self.handle.is_finished() {
            if tokio::time::Instant::now() >= deadline {
                tracing::debug!("input thread still blocked, abandoning it");
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        if self.handle.join().is_err() {
            tracing::warn!("input thread panicked");
        }
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Cursor;

    use super::*;

    async fn collect(input: impl AsRef<[u8]> + Send + 'static) -> Vec<String> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let reader = spawn_input_reader(Cursor::new(input), tx).unwrap();
        assert!(reader.finish(Duration::from_secs(5)).await);
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    #[tokio::test]
    async fn strips_newlines() {
        assert_eq!(collect("get me\r\nleave grp1\n").await, vec!["get me", "leave grp1"]);
    }

    #[tokio::test]
    async fn stops_after_exit() {
        assert_eq!(collect("get me\nquit\nget fnd\n").await, vec!["get me", "quit"]);
    }

    #[tokio::test]
    async fn forwards_last_line_without_newline() {
        assert_eq!(collect("sub grp1").await, vec!["sub grp1"]);
    }

    #[tokio::test]
    async fn invalid_utf8_does_not_end_input() {
        let lines = collect(b"pub grp1 caf\xe9\nget me --desc\n".as_slice()).await;
        assert_eq!(lines, vec!["pub grp1 caf\u{fffd}", "get me --desc"]);
    }

    #[test]
    fn exit_detection_ignores_whitespace() {
        assert!(is_exit_command("  exit "));
        assert!(is_exit_command("quit"));
        assert!(!is_exit_command("exiting"));
    }
}
