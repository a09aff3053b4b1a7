//! Cooker feedback line: edge capture and frame decoding.
//!
//! The interrupt handler timestamps every edge into [`LINE_CAPTURE`]; the
//! control loop drains the buffer on each induction tick and feeds the
//! edges through a [`FeedbackDecoder`]. Only the mark (HIGH) widths carry
//! information, so the decoder measures rising-to-falling intervals.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use heapless::{Deque, Vec};

use super::protocol::{
    FRAME_BITS, FRAME_US, FeedbackReport, Frame, FrameError, LONG_US, ONE_TOLERANCE_US, PulseTrain,
    SHORT_US, START_MARK_US, START_TOLERANCE_US, ZERO_TOLERANCE_US,
};

/// Longest induction period the capture buffer is sized for.
pub const MAX_TICK_MS: u32 = 1_000;

/// Frames a continuously reporting cooker can put on the line in one
/// tick, plus a partial frame at each end.
const FRAMES_PER_TICK: usize = (MAX_TICK_MS as usize * 1_000).div_ceil(FRAME_US as usize) + 2;

/// Edges buffered between two induction ticks.
pub const EDGE_CAPACITY: usize = FRAMES_PER_TICK * PulseTrain::LEN as usize;

pub type EdgeBuffer = Vec<Edge, EDGE_CAPACITY>;

/// A line transition: timestamp (µs, monotonic) and the level after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub at_us: u64,
    pub high: bool,
}

// ── ISR-side capture ──────────────────────────────────────────

struct CaptureState {
    edges: Deque<Edge, EDGE_CAPACITY>,
    overflowed: bool,
}

/// Interrupt-safe edge FIFO.
pub struct LineCapture {
    inner: Mutex<CriticalSectionRawMutex, RefCell<CaptureState>>,
}

impl LineCapture {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(CaptureState {
                edges: Deque::new(),
                overflowed: false,
            })),
        }
    }

    /// Called from the edge interrupt. Drops the edge when full.
    pub fn record(&self, edge: Edge) {
        self.inner.lock(|s| {
            let mut s = s.borrow_mut();
            if s.edges.push_back(edge).is_err() {
                s.overflowed = true;
            }
        });
    }

    /// Move every buffered edge into `out`. Returns `true` if edges were
    /// lost since the previous drain.
    pub fn drain(&self, out: &mut EdgeBuffer) -> bool {
        self.inner.lock(|s| {
            let mut s = s.borrow_mut();
            while let Some(edge) = s.edges.pop_front() {
                if out.push(edge).is_err() {
                    s.overflowed = true;
                    break;
                }
            }
            core::mem::take(&mut s.overflowed)
        })
    }
}

impl Default for LineCapture {
    fn default() -> Self {
        Self::new()
    }
}

/// Edges captured from the feedback interrupt line.
pub static LINE_CAPTURE: LineCapture = LineCapture::new();

// ── Decoder ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Start,
    One,
    Zero,
}

fn classify(width_us: u32) -> Option<Mark> {
    let near = |target: u32, tol: u32| width_us.abs_diff(target) <= tol;
    if near(START_MARK_US, START_TOLERANCE_US) {
        Some(Mark::Start)
    } else if near(LONG_US, ONE_TOLERANCE_US) {
        Some(Mark::One)
    } else if near(SHORT_US, ZERO_TOLERANCE_US) {
        Some(Mark::Zero)
    } else {
        None
    }
}

/// Reassembles feedback frames from captured edges.
///
/// Bits arriving outside a frame (no start mark seen) are ignored, so the
/// decoder synchronises on the next start mark after any error.
#[derive(Debug, Default, Clone)]
pub struct FeedbackDecoder {
    rise_at: Option<u64>,
    /// Rise of the most recent start mark.
    frame_start_us: Option<u64>,
    in_frame: bool,
    bits: u64,
    count: u32,
}

impl FeedbackDecoder {
    pub const fn new() -> Self {
        Self {
            rise_at: None,
            frame_start_us: None,
            in_frame: false,
            bits: 0,
            count: 0,
        }
    }

    /// Drop any partial frame.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Feed one edge. Yields once per completed (or abandoned) frame.
    pub fn feed(&mut self, edge: Edge) -> Option<Result<FeedbackReport, FrameError>> {
        if edge.high {
            self.rise_at = Some(edge.at_us);
            return None;
        }
        let rise = self.rise_at.take()?;
        let width = u32::try_from(edge.at_us.saturating_sub(rise)).unwrap_or(u32::MAX);

        let bit = match classify(width) {
            Some(Mark::Start) => {
                self.frame_start_us = Some(rise);
                self.in_frame = true;
                self.bits = 0;
                self.count = 0;
                return None;
            }
            Some(Mark::One) => true,
            Some(Mark::Zero) => false,
            None => {
                let was_framing = self.in_frame;
                self.reset();
                return was_framing.then_some(Err(FrameError::Width(width)));
            }
        };
        if !self.in_frame {
            return None;
        }

        self.bits = (self.bits << 1) | u64::from(bit);
        self.count += 1;
        if self.count < FRAME_BITS {
            return None;
        }

        let frame = Frame(self.bits);
        self.in_frame = false;
        self.bits = 0;
        self.count = 0;
        Some(frame.decode().and_then(FeedbackReport::from_status))
    }
}

impl FeedbackDecoder {
    /// When the last frame yielded by [`feed`](Self::feed) started on the
    /// line (µs, same clock as the edges).
    pub fn frame_start_us(&self) -> Option<u64> {
        self.frame_start_us
    }
}

/// Edge sequence a transmitter produces for `frame`, starting at `start_us`.
pub fn pulse_edges(frame: Frame, start_us: u64) -> impl Iterator<Item = Edge> {
    PulseTrain::new(frame).scan(start_us, |t, pulse| {
        let edge = Edge { at_us: *t, high: pulse.high };
        *t += u64::from(pulse.duration_us);
        Some(edge)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::protocol::PowerLevel;
    use crate::error::LineFault;

    fn decode_all(dec: &mut FeedbackDecoder, edges: impl Iterator<Item = Edge>) -> std::vec::Vec<Result<FeedbackReport, FrameError>> {
        edges.filter_map(|e| dec.feed(e)).collect()
    }

    fn status_frame(report: FeedbackReport) -> Frame {
        Frame::encode(report.status_byte())
    }

    #[test]
    fn decodes_a_clean_frame() {
        let report = FeedbackReport { level: PowerLevel::P60, fault: None };
        let mut dec = FeedbackDecoder::new();
        let out = decode_all(&mut dec, pulse_edges(status_frame(report), 1_000));
        assert_eq!(out, vec![Ok(report)]);
        assert_eq!(dec.frame_start_us(), Some(1_000));
    }

    #[test]
    fn decodes_a_fault_report() {
        let report = FeedbackReport { level: PowerLevel::Off, fault: Some(LineFault { code: 3 }) };
        let mut dec = FeedbackDecoder::new();
        let out = decode_all(&mut dec, pulse_edges(status_frame(report), 0));
        assert_eq!(out, vec![Ok(report)]);
    }

    #[test]
    fn tolerates_timing_jitter() {
        let report = FeedbackReport { level: PowerLevel::P100, fault: None };
        let mut dec = FeedbackDecoder::new();
        // Stretch every mark by 300 µs.
        let edges = pulse_edges(status_frame(report), 0).map(|e| Edge {
            at_us: if e.high { e.at_us } else { e.at_us + 300 },
            high: e.high,
        });
        assert_eq!(decode_all(&mut dec, edges), vec![Ok(report)]);
    }

    #[test]
    fn width_error_resynchronises_on_next_frame() {
        let report = FeedbackReport { level: PowerLevel::P20, fault: None };
        let mut dec = FeedbackDecoder::new();

        let mut edges: std::vec::Vec<Edge> = pulse_edges(status_frame(report), 0).take(20).collect();
        // 3 ms mark matches nothing.
        edges.push(Edge { at_us: 200_000, high: true });
        edges.push(Edge { at_us: 203_000, high: false });
        edges.extend(pulse_edges(status_frame(report), 300_000));

        let out = decode_all(&mut dec, edges.into_iter());
        assert_eq!(out, vec![Err(FrameError::Width(3_000)), Ok(report)]);
    }

    #[test]
    fn noise_outside_a_frame_is_ignored() {
        let mut dec = FeedbackDecoder::new();
        assert_eq!(dec.feed(Edge { at_us: 0, high: true }), None);
        assert_eq!(dec.feed(Edge { at_us: 1_280, high: false }), None);
        assert_eq!(dec.feed(Edge { at_us: 2_000, high: true }), None);
        assert_eq!(dec.feed(Edge { at_us: 2_050, high: false }), None);
    }

    #[test]
    fn command_frame_is_rejected_as_status_when_step_is_invalid() {
        let mut dec = FeedbackDecoder::new();
        let out = decode_all(&mut dec, pulse_edges(Frame::encode(0x06), 0));
        assert_eq!(out, vec![Err(FrameError::Level(6))]);
    }

    #[test]
    fn capture_holds_a_tick_of_back_to_back_frames() {
        let report = FeedbackReport { level: PowerLevel::P40, fault: None };
        let capture = LineCapture::new();
        let mut start = 0;
        while start < u64::from(MAX_TICK_MS) * 1_000 {
            for e in pulse_edges(status_frame(report), start) {
                capture.record(e);
            }
            start += u64::from(FRAME_US);
        }
        let mut out = EdgeBuffer::new();
        assert!(!capture.drain(&mut out));

        let mut dec = FeedbackDecoder::new();
        let out = decode_all(&mut dec, out.into_iter());
        assert_eq!(out.len(), 5);
        assert!(out.iter().all(|r| *r == Ok(report)));
    }

    #[test]
    fn capture_reports_overflow_once() {
        let capture = LineCapture::new();
        for i in 0..(EDGE_CAPACITY as u64 + 5) {
            capture.record(Edge { at_us: i, high: i % 2 == 0 });
        }
        let mut out = EdgeBuffer::new();
        assert!(capture.drain(&mut out));
        assert_eq!(out.len(), EDGE_CAPACITY);
        assert_eq!(out[0].at_us, 0);

        out.clear();
        assert!(!capture.drain(&mut out));
        assert!(out.is_empty());
    }
}
