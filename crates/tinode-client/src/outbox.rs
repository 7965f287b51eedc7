//! Operator-facing output queue.
//!
//! Everything meant for the terminal (rendered server messages, usage text,
//! completion reports) is queued as finished lines. The engine drains the
//! queue and writes each line over the live prompt, so producers never touch
//! the terminal directly.

use tokio::sync::mpsc;

/// Producer handle for terminal output.
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<String>,
}

/// Consumer half of an [`Outbox`].
pub type OutputReceiver = mpsc::UnboundedReceiver<String>;

impl Outbox {
    /// Create an outbox and the receiver the engine drains.
    pub fn new() -> (Self, OutputReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue one line.
    pub fn println(&self, line: impl Into<String>) {
        // Receiver only goes away at shutdown; late output is dropped.
        let _ = self.tx.send(line.into());
    }

    /// Queue multi-line text, one entry per line.
    pub fn push_text(&self, text: &str) {
        for line in text.trim_end().lines() {
            self.println(line);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn text_is_split_into_lines() {
        let (outbox, mut rx) = Outbox::new();
        outbox.push_text("usage: get\n\n  --desc\n");

        let lines: Vec<String> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(lines, vec!["usage: get", "", "  --desc"]);
    }

    #[test]
    fn closed_receiver_is_ignored() {
        let (outbox, rx) = Outbox::new();
        drop(rx);
        outbox.println("nobody listening");
    }
}
