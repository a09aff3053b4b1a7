//! Fuzz target: `FeedbackDecoder::feed`
//!
//! Interprets the input as a sequence of (delta µs, level) triples and
//! drives them into the feedback-line decoder. Asserts that it never
//! panics and that a clean frame after a reset still decodes.
//!
//! cargo fuzz run fuzz_feedback_decoder

#![no_main]

use brewstation::control::feedback::{Edge, FeedbackDecoder, pulse_edges};
use brewstation::control::protocol::{FeedbackReport, Frame, PowerLevel};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut decoder = FeedbackDecoder::new();
    let mut t = 0u64;

    for chunk in data.chunks_exact(3) {
        t += u64::from(u16::from_le_bytes([chunk[0], chunk[1]])) * 2;
        if let Some(Ok(report)) = decoder.feed(Edge { at_us: t, high: chunk[2] & 1 != 0 }) {
            assert!(report.level.step() < 6);
            assert!(report.fault.is_none_or(|f| f.code < 8));
        }
    }

    // After a reset the decoder must accept a clean frame again.
    decoder.reset();
    let report = FeedbackReport { level: PowerLevel::P60, fault: None };
    let decoded = pulse_edges(Frame::encode(report.status_byte()), t + 1_000_000)
        .filter_map(|e| decoder.feed(e))
        .last();
    assert_eq!(decoded, Some(Ok(report)));
});
