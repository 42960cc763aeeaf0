//! Host loop: one run from an event source to a record writer.
//!
//! ```text
//! EventLines ──line──> RunContext::on_event ──record──> RecordWriter
//!     │                       │
//!     └── I/O error ──────────┴──> on_run_end, then error
//! ```
//!
//! `on_run_end` always runs, so counters are reported and the writer is
//! finished even when the source fails part way through.

use crate::acquisition::run::{RunContext, RunSummary};
use crate::config::AcquisitionConfig;
use crate::error::{AppResult, DaqError};
use crate::source::EventDecoder;
use crate::storage::RecordWriter;
use std::borrow::Borrow;
use tracing::{error, warn};

/// Drives a [`RunContext`] over an event iterator.
pub struct Converter<W: RecordWriter> {
    context: RunContext<W>,
    acquisition: AcquisitionConfig,
}

impl<W: RecordWriter> Converter<W> {
    /// Converter writing to `writer` with the given acquisition settings.
    pub fn new(writer: W, acquisition: AcquisitionConfig) -> Self {
        Self {
            context: RunContext::new(writer),
            acquisition,
        }
    }

    /// Access the run context.
    pub fn context(&self) -> &RunContext<W> {
        &self.context
    }

    /// Consume the converter and return the writer.
    pub fn into_writer(self) -> W {
        self.context.into_writer()
    }

    /// Convert every event from `events` as run `run_id`.
    ///
    /// Malformed events, whether the source or the decoder rejects them, are
    /// counted and skipped. A fatal error (I/O from the
    /// source, storage failures) stops event processing; the run is still ended
    /// and the first fatal error is returned.
    ///
    /// # Errors
    ///
    /// - configuration errors at run begin, before any event is read
    /// - the first fatal error raised while processing or ending the run
    pub fn run<D, I, E>(&mut self, run_id: i64, decoder: &D, events: I) -> AppResult<RunSummary>
    where
        D: EventDecoder,
        I: IntoIterator<Item = AppResult<E>>,
        E: Borrow<D::Event>,
    {
        self.context.on_run_begin(run_id, &self.acquisition)?;

        let mut failure: Option<DaqError> = None;
        for (index, item) in events.into_iter().enumerate() {
            let outcome = match item {
                Ok(event) => self.context.on_event(decoder, event.borrow()),
                Err(err) => self.context.on_source_error(err),
            };
            match outcome {
                Ok(_) => {}
                Err(err) if !err.is_fatal() => {
                    warn!(event = index, error = %err, "event skipped");
                }
                Err(err) => {
                    error!(event = index, error = %err, "stopping run");
                    failure = Some(err);
                    break;
                }
            }
        }

        let ended = self.context.on_run_end(run_id);
        if let Some(err) = failure {
            return Err(err);
        }
        ended?.ok_or_else(|| DaqError::InvalidState(format!("run {} was not active", run_id)))
    }
}
