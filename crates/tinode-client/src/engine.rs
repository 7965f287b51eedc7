//! Session stream engine.
//!
//! One cooperative loop over five sources, polled in priority order:
//!
//! 1. operator input: compile and queue the request
//! 2. outbound room: send the oldest queued request
//! 3. queued output: write over the prompt
//! 4. inbound stream: dispatch to the session
//! 5. idle timer: redraw the prompt once per quiet period
//!
//! Input is read only while no request waits for outbound room, and waiting
//! never blocks inbound dispatch. A peer that stops reading until its acks
//! are consumed therefore cannot stall the loop.
//!
//! ```text
//! ┌─────────┐ exit/quit/EOF ┌──────────┐ stream end ┌──────────┐
//! │ Running │──────────────>│ Draining │───────────>│ Finished │
//! └─────────┘               └──────────┘            └──────────┘
//!      │          stream end or failure                  ^
//!      └─────────────────────────────────────────────────┘
//! ```
//!
//! Draining stops reading input and closes the outbound half; acks that
//! arrive before the server ends the stream are still dispatched. Queued
//! output is always flushed before [`Engine::run`] returns.

use std::{collections::VecDeque, io::Write};

use tinode_proto::ClientMessage;

use crate::{
    config::EngineConfig,
    connection::Connection,
    error::EngineError,
    mediator::InputReceiver,
    outbox::OutputReceiver,
    session::{Credentials, LineOutcome, Session},
};

/// Drives one session over one connection.
pub struct Engine<W: Write> {
    session: Session,
    connection: Connection,
    input: InputReceiver,
    output: OutputReceiver,
    terminal: W,
    config: EngineConfig,
}

impl<W: Write> Engine<W> {
    /// Assemble an engine. `output` must be the receiver of the outbox the
    /// session writes to.
    pub fn new(
        session: Session,
        connection: Connection,
        input: InputReceiver,
        output: OutputReceiver,
        terminal: W,
        config: EngineConfig,
    ) -> Self {
        Self { session, connection, input, output, terminal, config }
    }

    /// Run until the stream ends.
    ///
    /// # Errors
    ///
    /// - `EngineError::Transport` if the stream reports a failure
    /// - `EngineError::Io` if the terminal cannot be written
    pub async fn run(&mut self, credentials: Option<&Credentials>) -> Result<(), EngineError> {
        let mut input_open = true;
        let mut prompt_shown = false;
        let mut outgoing: VecDeque<ClientMessage> = self.session.start(credentials).into();

        loop {
            tokio::select! {
                biased;

                line = self.input.recv(), if input_open && outgoing.is_empty() => {
                    prompt_shown = false;
                    let outcome = match line {
                        Some(line) => self.session.handle_line(&line),
                        None => LineOutcome::Exit,
                    };
                    match outcome {
                        LineOutcome::Send(message) => outgoing.push_back(message),
                        LineOutcome::Handled => {},
                        LineOutcome::Exit => {
                            tracing::debug!("input finished, closing outbound stream");
                            input_open = false;
                            self.connection.close_outbound();
                        },
                    }
                }

                permit = self.connection.reserve(), if !outgoing.is_empty() => {
                    match (permit, outgoing.pop_front()) {
                        (Ok(permit), Some(message)) => {
                            tracing::debug!(
                                id = message.request.id(),
                                kind = message.request.kind(),
                                "sending request"
                            );
                            permit.send(message);
                        },
                        (Err(e), _) => {
                            tracing::warn!(dropped = outgoing.len() + 1, "request not sent: {e}");
                            outgoing.clear();
                            input_open = false;
                            self.connection.close_outbound();
                        },
                        (Ok(_), None) => {},
                    }
                }

                Some(line) = self.output.recv() => {
                    prompt_shown = false;
                    self.write_line(&line)?;
                }

                inbound = self.connection.recv() => {
                    match inbound {
                        Some(Ok(message)) => self.session.dispatch(message),
                        Some(Err(e)) => {
                            tracing::error!("stream failed: {e}");
                            self.connection.close_outbound();
                            self.connection.stop();
                            self.flush_output()?;
                            return Err(e.into());
                        },
                        None => break,
                    }
                }

                () = tokio::time::sleep(self.config.idle_interval) => {
                    if input_open && !prompt_shown {
                        write!(self.terminal, "{}", self.config.prompt)?;
                        self.terminal.flush()?;
                        prompt_shown = true;
                    }
                }
            }
        }

        tracing::debug!(pending = self.session.pending(), "stream closed");
        self.flush_output()
    }

    /// Session state.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Terminal sink.
    pub fn terminal(&self) -> &W {
        &self.terminal
    }

    fn write_line(&mut self, line: &str) -> Result<(), EngineError> {
        writeln!(self.terminal, "\r{line}")?;
        self.terminal.flush()?;
        Ok(())
    }

    fn flush_output(&mut self) -> Result<(), EngineError> {
        while let Ok(line) = self.output.try_recv() {
            self.write_line(&line)?;
        }
        Ok(())
    }
}
