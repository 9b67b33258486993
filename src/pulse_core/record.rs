//! Persisted row shape
//!
//! The set of active columns is decided once from configuration and never
//! changes during a run. Inactive columns are `None` on every record.

use super::accumulator::AveragedPulse;
use super::decoder::{DecodedFrame, NUM_SAMPLES};
use super::segment::SegmentId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub run: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lumi: Option<SegmentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bx: Option<u16>,
    pub id: u32,
    pub pulse: [f32; NUM_SAMPLES],
    pub gain: [f32; NUM_SAMPLES],
    pub pedestal: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pedestal_rms: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gainmask: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nevt: Option<u32>,
}

/// Which optional columns a run writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSchema {
    pub lumi: bool,
    pub bx: bool,
    pub pedestal_rms: bool,
    pub gainmask: bool,
    pub nevt: bool,
}

impl OutputSchema {
    /// Raw mode writes lumi, bx and gain mask. Average mode writes pedestal
    /// rms and event count, plus lumi only when splitting by lumi.
    pub fn new(average: bool, split_by_lumi: bool) -> Self {
        Self {
            lumi: !average || split_by_lumi,
            bx: !average,
            pedestal_rms: average,
            gainmask: !average,
            nevt: average,
        }
    }

    /// Column names in row order
    pub fn columns(&self) -> Vec<&'static str> {
        let mut columns = vec!["run"];
        if self.lumi {
            columns.push("lumi");
        }
        if self.bx {
            columns.push("bx");
        }
        columns.extend(["id", "pulse", "gain", "pedestal"]);
        if self.pedestal_rms {
            columns.push("pedestal_rms");
        }
        if self.gainmask {
            columns.push("gainmask");
        }
        if self.nevt {
            columns.push("nevt");
        }
        columns
    }
}

/// Event-level metadata attached to raw records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordMeta {
    pub run: u32,
    pub lumi: SegmentId,
    pub bx: u16,
}

/// Square root of a drained variance. A negative variance is passed through
/// to `sqrt` and yields NaN.
pub fn pedestal_rms(variance: f64) -> f32 {
    variance.sqrt() as f32
}

#[derive(Debug, Clone)]
pub struct OutputRecordEmitter {
    schema: OutputSchema,
}

impl OutputRecordEmitter {
    pub fn new(schema: OutputSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> OutputSchema {
        self.schema
    }

    pub fn raw(&self, meta: RecordMeta, frame: &DecodedFrame) -> OutputRecord {
        OutputRecord {
            run: meta.run,
            lumi: self.schema.lumi.then_some(meta.lumi),
            bx: self.schema.bx.then_some(meta.bx),
            id: frame.id,
            pulse: frame.pulse,
            gain: frame.gain.map(f32::from),
            pedestal: frame.pedestal,
            pedestal_rms: self.schema.pedestal_rms.then_some(0.0),
            gainmask: self.schema.gainmask.then_some(frame.gain_mask),
            nevt: self.schema.nevt.then_some(0),
        }
    }

    /// `lumi` is the segment the pulse was accumulated in, 0 if segmentation
    /// never started.
    pub fn averaged(&self, run: u32, lumi: SegmentId, avg: &AveragedPulse) -> OutputRecord {
        OutputRecord {
            run,
            lumi: self.schema.lumi.then_some(lumi),
            bx: self.schema.bx.then_some(0),
            id: avg.key.id,
            pulse: avg.pulse.map(|v| v as f32),
            gain: avg.gain.map(|v| v as f32),
            pedestal: avg.pedestal as f32,
            pedestal_rms: self
                .schema
                .pedestal_rms
                .then(|| pedestal_rms(avg.pedestal_variance)),
            gainmask: self.schema.gainmask.then_some(0),
            nevt: self.schema.nevt.then_some(avg.count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pulse_core::accumulator::AccumulatorKey;
    use crate::pulse_core::decoder::decode_frame;

    fn averaged_pulse(variance: f64) -> AveragedPulse {
        AveragedPulse {
            key: AccumulatorKey { id: 42, gain: 1 },
            pulse: [250.0; NUM_SAMPLES],
            gain: [1.0; NUM_SAMPLES],
            pedestal: 200.0,
            pedestal_variance: variance,
            count: 12,
        }
    }

    #[test]
    fn test_schema_columns() {
        assert_eq!(
            OutputSchema::new(false, false).columns(),
            vec!["run", "lumi", "bx", "id", "pulse", "gain", "pedestal", "gainmask"]
        );
        assert_eq!(
            OutputSchema::new(true, false).columns(),
            vec!["run", "id", "pulse", "gain", "pedestal", "pedestal_rms", "nevt"]
        );
        assert_eq!(
            OutputSchema::new(true, true).columns(),
            vec!["run", "lumi", "id", "pulse", "gain", "pedestal", "pedestal_rms", "nevt"]
        );
        // splitting is meaningless without averaging
        assert_eq!(OutputSchema::new(false, true), OutputSchema::new(false, false));
    }

    #[test]
    fn test_raw_record() {
        let emitter = OutputRecordEmitter::new(OutputSchema::new(false, false));
        let frame = decode_frame(9, &[0x1064; NUM_SAMPLES], 3);
        let meta = RecordMeta {
            run: 316000,
            lumi: 12,
            bx: 41,
        };

        let record = emitter.raw(meta, &frame);
        assert_eq!(record.run, 316000);
        assert_eq!(record.lumi, Some(12));
        assert_eq!(record.bx, Some(41));
        assert_eq!(record.gain, [1.0; NUM_SAMPLES]);
        assert_eq!(record.gainmask, Some(0b10));
        assert_eq!(record.pedestal_rms, None);
        assert_eq!(record.nevt, None);
    }

    #[test]
    fn test_averaged_record() {
        let emitter = OutputRecordEmitter::new(OutputSchema::new(true, false));

        let record = emitter.averaged(316000, 7, &averaged_pulse(4.0));
        assert_eq!(record.lumi, None);
        assert_eq!(record.bx, None);
        assert_eq!(record.gainmask, None);
        assert_eq!(record.id, 42);
        assert_eq!(record.pedestal_rms, Some(2.0));
        assert_eq!(record.nevt, Some(12));
    }

    #[test]
    fn test_negative_variance_yields_nan_rms() {
        assert!(pedestal_rms(-1e-12).is_nan());
        assert_eq!(pedestal_rms(0.0), 0.0);

        let emitter = OutputRecordEmitter::new(OutputSchema::new(true, true));
        let record = emitter.averaged(1, 3, &averaged_pulse(-1e-9));
        assert!(record.pedestal_rms.map_or(false, f32::is_nan));
    }

    #[test]
    fn test_inactive_columns_are_not_serialized() {
        let emitter = OutputRecordEmitter::new(OutputSchema::new(true, false));
        let record = emitter.averaged(1, 0, &averaged_pulse(1.0));

        let json: serde_json::Value = serde_json::to_value(&record).unwrap();
        let obj = json.as_object().unwrap();
        assert!(!obj.contains_key("lumi"));
        assert!(!obj.contains_key("bx"));
        assert!(!obj.contains_key("gainmask"));
        assert_eq!(obj["nevt"], 12);
        assert_eq!(obj.len(), OutputSchema::new(true, false).columns().len());
    }
}
