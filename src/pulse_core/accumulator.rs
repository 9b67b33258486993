//! Running-sum accumulation of pulses keyed by (channel, initial gain)
//!
//! Entries are kept in first-insertion order so that drained output is
//! deterministic and diffable between runs. A hash index gives O(1) lookup.

use super::decoder::{DecodedFrame, NUM_SAMPLES};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccumulatorKey {
    pub id: u32,
    /// Gain code of the first sample
    pub gain: u8,
}

impl AccumulatorKey {
    pub fn of(frame: &DecodedFrame) -> Self {
        Self {
            id: frame.id,
            gain: frame.gain[0],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Accumulator {
    pub count: u32,
    pub sum_pulse: [f64; NUM_SAMPLES],
    pub sum_gain: [f64; NUM_SAMPLES],
    pub sum_pedestal: f64,
    pub sum_pedestal_sq: f64,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            count: 0,
            sum_pulse: [0.0; NUM_SAMPLES],
            sum_gain: [0.0; NUM_SAMPLES],
            sum_pedestal: 0.0,
            sum_pedestal_sq: 0.0,
        }
    }

    fn add(&mut self, frame: &DecodedFrame) {
        for j in 0..NUM_SAMPLES {
            self.sum_pulse[j] += f64::from(frame.pulse[j]);
            self.sum_gain[j] += f64::from(frame.gain[j]);
        }
        let pedestal = f64::from(frame.pedestal);
        self.sum_pedestal += pedestal;
        self.sum_pedestal_sq += pedestal.powi(2);
        self.count += 1;
    }

    /// Population mean/variance snapshot.
    ///
    /// The variance is `E[p^2] - E[p]^2` and is not clamped: cancellation can
    /// leave it slightly negative.
    pub fn average(&self, key: AccumulatorKey) -> AveragedPulse {
        let den = f64::from(self.count);
        let mut pulse = [0.0; NUM_SAMPLES];
        let mut gain = [0.0; NUM_SAMPLES];
        for j in 0..NUM_SAMPLES {
            pulse[j] = self.sum_pulse[j] / den;
            gain[j] = self.sum_gain[j] / den;
        }
        let pedestal = self.sum_pedestal / den;

        AveragedPulse {
            key,
            pulse,
            gain,
            pedestal,
            pedestal_variance: self.sum_pedestal_sq / den - pedestal.powi(2),
            count: self.count,
        }
    }
}

/// One drained accumulator
#[derive(Debug, Clone, PartialEq)]
pub struct AveragedPulse {
    pub key: AccumulatorKey,
    pub pulse: [f64; NUM_SAMPLES],
    pub gain: [f64; NUM_SAMPLES],
    pub pedestal: f64,
    pub pedestal_variance: f64,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregationTable {
    min_amplitude: f64,
    index: HashMap<AccumulatorKey, usize>,
    entries: Vec<(AccumulatorKey, Accumulator)>,
}

impl AggregationTable {
    /// Frames whose peak above pedestal is strictly below `min_amplitude`
    /// are treated as empty and skipped.
    pub fn new(min_amplitude: f64) -> Self {
        Self {
            min_amplitude,
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    /// Add a frame to its accumulator. Returns false if the frame was
    /// skipped as an empty pulse.
    pub fn accumulate(&mut self, frame: &DecodedFrame) -> bool {
        if f64::from(frame.peak_above_pedestal()) < self.min_amplitude {
            return false;
        }

        let key = AccumulatorKey::of(frame);
        let idx = match self.index.get(&key) {
            Some(&idx) => idx,
            None => {
                self.entries.push((key, Accumulator::new()));
                let idx = self.entries.len() - 1;
                self.index.insert(key, idx);
                idx
            }
        };
        self.entries[idx].1.add(frame);
        true
    }

    pub fn get(&self, key: &AccumulatorKey) -> Option<&Accumulator> {
        self.index.get(key).map(|&idx| &self.entries[idx].1)
    }

    /// Averages of every accumulator, in first-insertion order. Does not
    /// modify the table.
    pub fn drain(&self) -> Vec<AveragedPulse> {
        self.entries
            .iter()
            .map(|(key, acc)| acc.average(*key))
            .collect()
    }

    pub fn reset(&mut self) {
        self.index.clear();
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
