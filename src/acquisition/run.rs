//! Run lifecycle and per-event record building.
//!
//! # State Machine
//!
//! ```text
//! Idle ──on_run_begin──> Active ──on_run_end──> Idle
//!                          │  ▲
//!                          └──┘ on_event (one record per accepted event)
//! ```
//!
//! For every accepted event the context resets the buffers once, routes each
//! measurement batch up to `max_points` batches, hands the record to the writer
//! and only then allows the buffers to be touched again.

use super::buffers::SampleBufferSet;
use super::demux::{EventDemultiplexer, RouteOutcome};
use super::measurement::MeasurementBatch;
use super::record::{Record, RecordSchema};
use super::schema::ChannelSchema;
use crate::config::AcquisitionConfig;
use crate::error::{AppResult, DaqError};
use crate::source::EventDecoder;
use crate::storage::RecordWriter;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// Lifecycle state of a [`RunContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    /// No run in progress
    Idle,
    /// Run accepting events
    Active,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Idle => write!(f, "Idle"),
            RunState::Active => write!(f, "Active"),
        }
    }
}

/// Diagnostic counters for one run. Reset at run begin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounters {
    /// Events that produced a record.
    pub good_banks: u64,
    /// Events skipped because the bank was absent or malformed.
    ///
    /// Absent events count here too, so `good_banks + bad_banks` always equals
    /// the number of events delivered to the run.
    pub bad_banks: u64,
    /// Subset of `bad_banks` that failed to decode.
    pub decode_failures: u64,
    /// Measurement batches dropped because the point counter was full.
    pub capacity_overflows: u64,
    /// Measurements for channels that are not saved.
    pub ignored_measurements: u64,
    /// Samples dropped past the buffer capacity.
    pub truncated_samples: u64,
    /// Records accepted by the writer.
    pub records_written: u64,
}

impl RunCounters {
    /// Every event delivered to the run.
    pub fn total_events(&self) -> u64 {
        self.good_banks + self.bad_banks
    }

    fn absorb(&mut self, outcome: RouteOutcome) {
        self.ignored_measurements += outcome.ignored;
        self.truncated_samples += outcome.truncated_samples;
    }
}

/// Report produced when a run ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Run number given at begin.
    pub run_id: i64,
    /// Channels saved per record.
    pub channel_count: usize,
    /// Slots per channel buffer.
    pub sample_capacity: usize,
    /// Final counter values.
    pub counters: RunCounters,
    /// When the run began.
    pub started_at: DateTime<Utc>,
    /// When the run ended.
    pub ended_at: DateTime<Utc>,
}

/// What happened to one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// A record was appended.
    Recorded {
        /// Point count stored in the record.
        point_count: i32,
        /// Routing tally over all accepted batches.
        route: RouteOutcome,
    },
    /// The event had no data for this digitizer.
    Absent,
}

struct ActiveRun {
    run_id: i64,
    schema: ChannelSchema,
    buffers: SampleBufferSet,
    max_points: i32,
    started_at: DateTime<Utc>,
}

/// Drives one run at a time from begin to end.
///
/// The context owns the record writer and, while a run is active, the only
/// sample buffers. There is no internal locking; callers deliver events
/// sequentially.
pub struct RunContext<W: RecordWriter> {
    writer: W,
    demux: EventDemultiplexer,
    counters: RunCounters,
    num_points: i32,
    active: Option<ActiveRun>,
}

impl<W: RecordWriter> RunContext<W> {
    /// Idle context that will write records to `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            demux: EventDemultiplexer::new(),
            counters: RunCounters::default(),
            num_points: 0,
            active: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RunState {
        if self.active.is_some() {
            RunState::Active
        } else {
            RunState::Idle
        }
    }

    /// Counters of the current run, or of the last one after it ended.
    pub fn counters(&self) -> RunCounters {
        self.counters
    }

    /// Schema of the active run.
    pub fn schema(&self) -> Option<&ChannelSchema> {
        self.active.as_ref().map(|run| &run.schema)
    }

    /// Borrow the writer.
    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// Consume the context and return the writer.
    pub fn into_writer(self) -> W {
        self.writer
    }

    /// Start a run.
    ///
    /// Builds the channel schema, allocates buffers, resets counters and declares
    /// the record layout to the writer.
    ///
    /// # Errors
    ///
    /// - [`DaqError::InvalidState`] if a run is already active
    /// - [`DaqError::Configuration`] for an invalid channel count, capacity or
    ///   point limit; the context stays idle
    /// - any writer error from `declare_schema`; the context stays idle
    #[instrument(skip_all, fields(run_id = run_id))]
    pub fn on_run_begin(&mut self, run_id: i64, config: &AcquisitionConfig) -> AppResult<()> {
        if let Some(run) = &self.active {
            return Err(DaqError::InvalidState(format!(
                "cannot begin run {} while run {} is active",
                run_id, run.run_id
            )));
        }

        config.validate()?;
        let schema = ChannelSchema::new(config.nchan, config.max_channels, config.sample_capacity)?;
        let max_points = i32::try_from(config.max_points).map_err(|_| {
            DaqError::Configuration(format!("max_points {} is too large", config.max_points))
        })?;

        let buffers = SampleBufferSet::new(&schema);

        let layout = RecordSchema::new(&schema, config.field_prefix.clone());
        self.writer.declare_schema(&layout)?;

        self.counters = RunCounters::default();
        self.num_points = 0;
        self.active = Some(ActiveRun {
            run_id,
            schema,
            buffers,
            max_points,
            started_at: Utc::now(),
        });

        info!(
            run_id,
            channels = schema.channel_count(),
            sample_capacity = schema.sample_capacity(),
            writer = self.writer.name(),
            "begin run"
        );
        Ok(())
    }

    /// Process one raw event.
    ///
    /// Returns [`EventOutcome::Absent`] when the decoder finds no data; the event
    /// is counted as a bad bank. A decode failure is counted the same way and
    /// then returned so the host can report it; it is never fatal.
    ///
    /// # Errors
    ///
    /// - [`DaqError::InvalidState`] if no run is active
    /// - [`DaqError::Decode`] for a malformed event
    /// - any writer error from `append`
    pub fn on_event<D: EventDecoder>(
        &mut self,
        decoder: &D,
        event: &D::Event,
    ) -> AppResult<EventOutcome> {
        if self.active.is_none() {
            return Err(DaqError::InvalidState(
                "event delivered while no run is active".to_string(),
            ));
        }

        match decoder.measurements(event) {
            Ok(Some(batches)) if !batches.is_empty() => self.record_batches(&batches),
            Ok(_) => {
                self.counters.bad_banks += 1;
                debug!("event has no digitizer bank");
                Ok(EventOutcome::Absent)
            }
            Err(err) => self.reject_event(err),
        }
    }

    /// Account for an event the source could not deliver intact.
    ///
    /// A non-fatal error (a line that is not valid text, say) is counted as a
    /// malformed event exactly like a decode failure and handed back. Fatal
    /// errors pass through untouched.
    ///
    /// # Errors
    ///
    /// Always returns `err`, or [`DaqError::InvalidState`] if no run is active.
    pub fn on_source_error(&mut self, err: DaqError) -> AppResult<EventOutcome> {
        if self.active.is_none() {
            return Err(DaqError::InvalidState(
                "event delivered while no run is active".to_string(),
            ));
        }
        self.reject_event(err)
    }

    fn reject_event(&mut self, err: DaqError) -> AppResult<EventOutcome> {
        if !err.is_fatal() {
            self.counters.bad_banks += 1;
            self.counters.decode_failures += 1;
            warn!(error = %err, "skipping malformed event");
        }
        Err(err)
    }

    /// Build and append the record for one accepted event.
    ///
    /// `batches` holds at least one batch; each batch is one point.
    fn record_batches(&mut self, batches: &[MeasurementBatch]) -> AppResult<EventOutcome> {
        let Some(run) = self.active.as_mut() else {
            return Err(DaqError::InvalidState(
                "event delivered while no run is active".to_string(),
            ));
        };

        run.buffers.reset();
        let mut route = RouteOutcome::default();
        for batch in batches {
            if self.num_points < run.max_points {
                self.num_points += 1;
                route.merge(self.demux.route(batch, &mut run.buffers, &run.schema));
            } else {
                self.counters.capacity_overflows += 1;
                warn!(num_points = self.num_points, "Too many points!");
            }
        }
        self.counters.absorb(route);

        let point_count = self.num_points;
        let record = Record {
            point_count,
            buffers: &run.buffers,
        };
        // The counter restarts even if the writer fails.
        self.num_points = 0;
        self.writer.append(&record)?;

        self.counters.records_written += 1;
        self.counters.good_banks += 1;
        Ok(EventOutcome::Recorded { point_count, route })
    }

    /// End the active run.
    ///
    /// Releases the buffers, finishes the writer and logs the bank counters.
    /// Calling it again once idle is a no-op returning `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns the writer's `finish` error. The context is idle afterwards
    /// either way.
    #[instrument(skip_all, fields(run_id = run_id))]
    pub fn on_run_end(&mut self, run_id: i64) -> AppResult<Option<RunSummary>> {
        let Some(run) = self.active.take() else {
            debug!(run_id, "run end requested while idle");
            return Ok(None);
        };
        if run.run_id != run_id {
            warn!(
                expected = run.run_id,
                got = run_id,
                "run end id does not match the active run"
            );
        }

        let finished = self.writer.finish();

        info!(run_id = run.run_id, "End of conversion");
        info!(count = self.counters.good_banks, "Good banks");
        info!(count = self.counters.bad_banks, "Bad banks");
        if self.counters.capacity_overflows > 0 {
            info!(count = self.counters.capacity_overflows, "Point overflows");
        }

        finished?;

        Ok(Some(RunSummary {
            run_id: run.run_id,
            channel_count: run.schema.channel_count(),
            sample_capacity: run.schema.sample_capacity(),
            counters: self.counters,
            started_at: run.started_at,
            ended_at: Utc::now(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::measurement::Measurement;
    use crate::storage::MemoryWriter;

    /// Decoder over pre-built batches; `Err` strings become decode failures.
    struct Scripted;

    impl EventDecoder for Scripted {
        type Event = Result<Option<Vec<MeasurementBatch>>, String>;

        fn measurements(&self, event: &Self::Event) -> AppResult<Option<Vec<MeasurementBatch>>> {
            event.clone().map_err(DaqError::Decode)
        }
    }

    fn config(nchan: usize, capacity: usize) -> AcquisitionConfig {
        AcquisitionConfig {
            nchan,
            sample_capacity: capacity,
            ..AcquisitionConfig::default()
        }
    }

    #[test]
    fn test_lifecycle_states() {
        let mut ctx = RunContext::new(MemoryWriter::new());
        assert_eq!(ctx.state(), RunState::Idle);

        ctx.on_run_begin(1, &config(2, 4)).unwrap();
        assert_eq!(ctx.state(), RunState::Active);
        assert!(ctx.on_run_begin(2, &config(2, 4)).is_err());

        let summary = ctx.on_run_end(1).unwrap().unwrap();
        assert_eq!(summary.run_id, 1);
        assert_eq!(ctx.state(), RunState::Idle);
        assert!(ctx.on_run_end(1).unwrap().is_none());
        assert_eq!(ctx.writer().finish_count(), 1);
    }

    #[test]
    fn test_invalid_nchan_keeps_context_idle() {
        let mut ctx = RunContext::new(MemoryWriter::new());
        let err = ctx.on_run_begin(1, &config(9, 4)).unwrap_err();
        assert!(matches!(err, DaqError::Configuration(_)));
        assert_eq!(ctx.state(), RunState::Idle);
        assert!(ctx.writer().schemas().is_empty());
    }

    #[test]
    fn test_event_while_idle_rejected() {
        let mut ctx = RunContext::new(MemoryWriter::new());
        let err = ctx.on_event(&Scripted, &Ok(None)).unwrap_err();
        assert!(matches!(err, DaqError::InvalidState(_)));
    }

    #[test]
    fn test_records_one_per_accepted_event() {
        let mut ctx = RunContext::new(MemoryWriter::new());
        ctx.on_run_begin(5, &config(2, 4)).unwrap();

        let event = Ok(Some(vec![vec![
            Measurement::new(0, vec![1.0, 2.0, 3.0]),
            Measurement::new(5, vec![9.0]),
        ]]));
        let outcome = ctx.on_event(&Scripted, &event).unwrap();
        assert!(matches!(outcome, EventOutcome::Recorded { point_count: 1, .. }));

        let writer = ctx.writer();
        assert_eq!(writer.records().len(), 1);
        assert_eq!(writer.records()[0].buffers[0], vec![1.0, 2.0, 3.0, 0.0]);
        assert_eq!(writer.records()[0].buffers[1], vec![0.0; 4]);
        assert_eq!(ctx.counters().ignored_measurements, 1);
    }

    #[test]
    fn test_buffers_reset_between_events() {
        let mut ctx = RunContext::new(MemoryWriter::new());
        ctx.on_run_begin(1, &config(1, 2)).unwrap();

        ctx.on_event(&Scripted, &Ok(Some(vec![vec![Measurement::new(0, vec![4.0, 4.0])]])))
            .unwrap();
        ctx.on_event(&Scripted, &Ok(Some(vec![vec![Measurement::new(0, vec![7.0])]])))
            .unwrap();

        let records = ctx.writer().records();
        assert_eq!(records[1].buffers[0], vec![7.0, 0.0]);
    }

    #[test]
    fn test_absent_and_malformed_events_skipped() {
        let mut ctx = RunContext::new(MemoryWriter::new());
        ctx.on_run_begin(1, &config(1, 2)).unwrap();

        assert_eq!(
            ctx.on_event(&Scripted, &Ok(None)).unwrap(),
            EventOutcome::Absent
        );
        let err = ctx
            .on_event(&Scripted, &Err("bad header".to_string()))
            .unwrap_err();
        assert!(!err.is_fatal());

        let counters = ctx.counters();
        assert_eq!(counters.bad_banks, 2);
        assert_eq!(counters.decode_failures, 1);
        assert_eq!(counters.good_banks, 0);
        assert!(ctx.writer().records().is_empty());
    }

    #[test]
    fn test_empty_batch_list_is_absent() {
        let mut ctx = RunContext::new(MemoryWriter::new());
        ctx.on_run_begin(1, &config(1, 2)).unwrap();

        let outcome = ctx.on_event(&Scripted, &Ok(Some(Vec::new()))).unwrap();

        assert_eq!(outcome, EventOutcome::Absent);
        assert!(ctx.writer().records().is_empty());
        assert_eq!(ctx.counters().bad_banks, 1);
    }

    #[test]
    fn test_source_error_counts_as_malformed() {
        let mut ctx = RunContext::new(MemoryWriter::new());
        ctx.on_run_begin(1, &config(1, 2)).unwrap();

        let err = ctx
            .on_source_error(DaqError::Decode("line 2: invalid utf-8".to_string()))
            .unwrap_err();
        assert!(!err.is_fatal());

        let fatal = ctx
            .on_source_error(DaqError::Io(std::io::Error::other("gone")))
            .unwrap_err();
        assert!(fatal.is_fatal());

        let counters = ctx.counters();
        assert_eq!(counters.bad_banks, 1);
        assert_eq!(counters.decode_failures, 1);
    }

    #[test]
    fn test_oversized_capacity_never_reaches_writer() {
        let mut ctx = RunContext::new(MemoryWriter::new());
        let err = ctx.on_run_begin(1, &config(8, usize::MAX / 4)).unwrap_err();

        assert!(matches!(err, DaqError::Configuration(_)));
        assert_eq!(ctx.state(), RunState::Idle);
        assert!(ctx.writer().schemas().is_empty());
    }

    #[test]
    fn test_second_batch_overflows_point_limit() {
        let mut ctx = RunContext::new(MemoryWriter::new());
        ctx.on_run_begin(1, &config(1, 3)).unwrap();

        let event = Ok(Some(vec![
            vec![Measurement::new(0, vec![1.0])],
            vec![Measurement::new(0, vec![2.0, 2.0])],
        ]));
        let outcome = ctx.on_event(&Scripted, &event).unwrap();

        assert!(matches!(outcome, EventOutcome::Recorded { point_count: 1, .. }));
        assert_eq!(ctx.counters().capacity_overflows, 1);
        assert_eq!(ctx.writer().records()[0].buffers[0], vec![1.0, 0.0, 0.0]);
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_overflow_and_summary_are_logged() {
        let mut ctx = RunContext::new(MemoryWriter::new());
        ctx.on_run_begin(3, &config(1, 1)).unwrap();
        let batch = vec![Measurement::new(0, vec![1.0])];
        ctx.on_event(&Scripted, &Ok(Some(vec![batch.clone(), batch])))
            .unwrap();
        ctx.on_run_end(3).unwrap();

        assert!(logs_contain("Too many points!"));
        assert!(logs_contain("Good banks"));
        assert!(logs_contain("Bad banks"));
    }

    #[test]
    fn test_point_counter_accumulates_up_to_limit() {
        let mut ctx = RunContext::new(MemoryWriter::new());
        let mut cfg = config(1, 2);
        cfg.max_points = 3;
        ctx.on_run_begin(1, &cfg).unwrap();

        let batch = vec![Measurement::new(0, vec![1.0])];
        let event = Ok(Some(vec![batch.clone(), batch.clone()]));
        ctx.on_event(&Scripted, &event).unwrap();
        ctx.on_event(&Scripted, &Ok(Some(vec![batch]))).unwrap();

        let records = ctx.writer().records();
        assert_eq!(records[0].point_count, 2);
        assert_eq!(records[1].point_count, 1);
        assert_eq!(ctx.counters().capacity_overflows, 0);
    }

    #[test]
    fn test_counters_reset_at_run_begin() {
        let mut ctx = RunContext::new(MemoryWriter::new());
        ctx.on_run_begin(1, &config(1, 2)).unwrap();
        ctx.on_event(&Scripted, &Ok(None)).unwrap();
        ctx.on_run_end(1).unwrap();
        assert_eq!(ctx.counters().bad_banks, 1);

        ctx.on_run_begin(2, &config(1, 2)).unwrap();
        assert_eq!(ctx.counters(), RunCounters::default());
        assert_eq!(ctx.writer().schemas().len(), 2);
    }
}
