//! Input event types

use super::decoder::NUM_SAMPLES;
use super::segment::SegmentId;
use serde::{Deserialize, Serialize};

/// Packed samples of one channel as delivered by the digitizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDigi {
    pub id: u32,
    pub samples: [u16; NUM_SAMPLES],
}

/// One triggered event with its barrel and endcap digis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PulseEvent {
    pub run: u32,
    pub lumi: SegmentId,
    pub bx: u16,
    #[serde(default)]
    pub eb_digis: Vec<RawDigi>,
    #[serde(default)]
    pub ee_digis: Vec<RawDigi>,
}

impl PulseEvent {
    pub fn from_jsonl(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}
