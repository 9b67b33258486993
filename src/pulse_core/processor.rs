//! Per-run processing state
//!
//! `PulseProcessor` owns the aggregation table and segment history for the
//! whole run. Lifecycle:
//!
//! ```text
//! open(config) → process(event)* → close()
//! ```
//!
//! `process` returns the rows produced by that event (raw frames, or the
//! averages of a segment that just ended). `close` consumes the processor and
//! returns the final drain, so the end-of-stream flush happens exactly once.

use super::accumulator::AggregationTable;
use super::bx_filter::BunchCrossingFilter;
use super::decoder::decode_frame;
use super::event::{PulseEvent, RawDigi};
use super::record::{OutputRecord, OutputRecordEmitter, OutputSchema, RecordMeta};
use super::segment::{SegmentFlushController, SegmentId, SegmentTransition};
use crate::config::{ConfigError, ProcessorConfig};

/// Counters reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessorStats {
    pub events_seen: u64,
    pub events_filtered: u64,
    pub frames_decoded: u64,
    /// Frames left out of averages for peaking below threshold
    pub frames_below_threshold: u64,
    pub records_emitted: u64,
    /// Table drains, including the final one
    pub flushes: u64,
    /// Segment ids that came back after being closed
    pub recurring_segments: u64,
    /// Averaged rows whose pedestal variance came out negative
    pub negative_variances: u64,
}

/// Rows and counters left when a run is closed
#[derive(Debug)]
pub struct CloseSummary {
    pub records: Vec<OutputRecord>,
    pub stats: ProcessorStats,
}

pub struct PulseProcessor {
    config: ProcessorConfig,
    bx_filter: BunchCrossingFilter,
    table: AggregationTable,
    segments: SegmentFlushController,
    emitter: OutputRecordEmitter,
    /// Run of the most recent accepted event, stamped on averaged rows
    run: u32,
    stats: ProcessorStats,
}

impl PulseProcessor {
    /// Validate `config` and set up an empty run
    pub fn open(config: ProcessorConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let schema = OutputSchema::new(config.average, config.splits_by_lumi());
        let bx_filter = BunchCrossingFilter::new(config.filter_bx.clone(), config.invert_bx_selection);

        log::info!(
            "⚙️  Pulse processor: mode={}, pedestal samples={}, EB={}, EE={}",
            if config.average { "average" } else { "raw" },
            config.pedestal_samples,
            config.process_eb,
            config.process_ee
        );
        if config.average {
            log::info!(
                "   ├─ Split by lumi: {}",
                config.splits_by_lumi()
            );
            log::info!(
                "   └─ Min amplitude for average: {}",
                config.min_amplitude_for_average
            );
        }
        if bx_filter.is_enabled() {
            log::info!(
                "   Bunch crossing filter: {:?} (inverted: {})",
                config.filter_bx,
                config.invert_bx_selection
            );
        }
        log::info!("   Output columns: {}", schema.columns().join(", "));

        Ok(Self {
            table: AggregationTable::new(config.min_amplitude_for_average),
            segments: SegmentFlushController::new(config.splits_by_lumi()),
            emitter: OutputRecordEmitter::new(schema),
            bx_filter,
            config,
            run: 0,
            stats: ProcessorStats::default(),
        })
    }

    pub fn schema(&self) -> OutputSchema {
        self.emitter.schema()
    }

    pub fn stats(&self) -> &ProcessorStats {
        &self.stats
    }

    pub fn table(&self) -> &AggregationTable {
        &self.table
    }

    pub fn process(&mut self, event: &PulseEvent) -> Vec<OutputRecord> {
        self.stats.events_seen += 1;

        if !self.bx_filter.allow(event.bx) {
            self.stats.events_filtered += 1;
            return Vec::new();
        }

        let mut records = Vec::new();

        match self.segments.observe(event.lumi) {
            SegmentTransition::Boundary {
                closed,
                opened,
                recurring,
            } => {
                if recurring {
                    self.stats.recurring_segments += 1;
                    log::warn!(
                        "⚠️  Lumisection {} already found previously, will be filled two times",
                        opened
                    );
                }
                log::debug!("Lumisection {} closed, {} opened", closed, opened);
                records.extend(self.flush(closed));
            }
            SegmentTransition::Started(id) => {
                log::debug!("First lumisection {}", id);
            }
            SegmentTransition::Unchanged => {}
        }

        self.run = event.run;
        let meta = RecordMeta {
            run: event.run,
            lumi: event.lumi,
            bx: event.bx,
        };

        if self.config.process_eb {
            self.fill_digis(meta, &event.eb_digis, &mut records);
        }
        if self.config.process_ee {
            self.fill_digis(meta, &event.ee_digis, &mut records);
        }

        self.stats.records_emitted += records.len() as u64;
        records
    }

    /// Final drain. Consumes the processor so it cannot run twice.
    pub fn close(mut self) -> CloseSummary {
        let lumi = self.segments.current().unwrap_or(0);
        let records = if self.config.average {
            self.flush(lumi)
        } else {
            Vec::new()
        };
        self.stats.records_emitted += records.len() as u64;

        log::info!(
            "✅ Run closed: {} events ({} filtered), {} frames, {} records, {} flushes",
            self.stats.events_seen,
            self.stats.events_filtered,
            self.stats.frames_decoded,
            self.stats.records_emitted,
            self.stats.flushes
        );

        CloseSummary {
            records,
            stats: self.stats,
        }
    }

    fn fill_digis(&mut self, meta: RecordMeta, digis: &[RawDigi], records: &mut Vec<OutputRecord>) {
        for digi in digis {
            let frame = decode_frame(digi.id, &digi.samples, self.config.pedestal_samples);
            self.stats.frames_decoded += 1;

            if !self.config.average {
                records.push(self.emitter.raw(meta, &frame));
            } else if !self.table.accumulate(&frame) {
                self.stats.frames_below_threshold += 1;
            }
        }
    }

    /// Drain the table into rows stamped with `lumi`, then reset it
    fn flush(&mut self, lumi: SegmentId) -> Vec<OutputRecord> {
        let averaged = self.table.drain();
        self.table.reset();
        self.stats.flushes += 1;

        let negative = averaged.iter().filter(|a| a.pedestal_variance < 0.0).count();
        if negative > 0 {
            self.stats.negative_variances += negative as u64;
            log::warn!(
                "⚠️  {} averaged channels with negative pedestal variance, pedestal_rms will be NaN",
                negative
            );
        }

        log::debug!("Flushed {} averaged channels (lumi {})", averaged.len(), lumi);

        averaged
            .iter()
            .map(|avg| self.emitter.averaged(self.run, lumi, avg))
            .collect()
    }
}
