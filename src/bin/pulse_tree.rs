//! Pulse Tree - Digitized Pulse Reduction
//!
//! Reads a JSONL stream of events and writes either one row per channel frame
//! (raw mode) or per-(channel, gain) averages (DO_AVERAGE=true).
//!
//! ## Usage
//!
//! ```bash
//! PULSE_INPUT_PATH=events.jsonl cargo run --release --bin pulse_tree -- --backend sqlite
//! ```
//!
//! ## Environment Variables
//!
//! - PULSE_INPUT_PATH - JSONL event stream (required)
//! - PULSE_OUTPUT_PATH - Output file (default: pulses.jsonl, or data/pulses.db with --backend sqlite)
//! - N_PEDESTAL_SAMPLES - Leading samples averaged into the pedestal (default: 3)
//! - DO_AVERAGE - Average pulses instead of writing every frame (default: false)
//! - SPLIT_BY_LUMI - Flush averages at each lumisection boundary (default: false)
//! - MIN_AMPLITUDE_FOR_AVERAGE - Minimum peak above pedestal to enter an average (default: -9e9)
//! - PROCESS_EB / PROCESS_EE - Enable barrel / endcap digis (default: true)
//! - FILTER_BX - Comma-separated bunch crossings to keep (default: keep all)
//! - INVERT_BX_SELECTION - Drop the listed bunch crossings instead (default: false)
//! - RUST_LOG - Logging level (optional, default: info)

use pulsetree::config::{ProcessorConfig, RuntimeConfig};
use pulsetree::pulse_core::{run, EventReader, PulseProcessor, RecordWriter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    dotenv::dotenv().ok();

    let backend = RuntimeConfig::parse_backend_from_args();
    let runtime = RuntimeConfig::from_env(backend)?;
    let config = ProcessorConfig::from_env()?;

    log::info!("🚀 Starting Pulse Tree");
    log::info!("   Input: {}", runtime.input_path.display());
    log::info!("   Output: {}", runtime.output_path.display());

    let reader = EventReader::open(&runtime.input_path)?;
    let processor = PulseProcessor::open(config)?;
    let mut writer = RecordWriter::new(runtime.backend, &runtime.output_path, processor.schema())?;

    log::info!("📊 Backend: {}", writer.backend_type());

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    log::warn!("⚠️  Received CTRL+C, finishing with a final flush...");
                    stop.store(true, Ordering::SeqCst);
                }
                Err(err) => log::error!("❌ Failed to listen for CTRL+C: {}", err),
            }
        });
    }

    let summary = run(reader, processor, &mut writer, &stop).await?;

    let stats = summary.stats;
    log::info!(
        "✅ Wrote {} records ({} frames below threshold, {} recurring lumisections, {} unparsable lines)",
        stats.records_emitted,
        stats.frames_below_threshold,
        stats.recurring_segments,
        summary.bad_lines
    );
    if summary.read_failed {
        log::warn!("⚠️  Input ended on a read error; output covers events read before it");
    }
    if stats.negative_variances > 0 {
        log::warn!(
            "⚠️  {} averaged rows had negative pedestal variance (pedestal_rms is NaN/NULL)",
            stats.negative_variances
        );
    }

    Ok(())
}
