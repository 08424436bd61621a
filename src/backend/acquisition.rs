//! Acquisition protocol
//!
//! One call to [`Acquisition::acquire`] produces one complete sample set or
//! fails leaving the [`CurveData`] buffers untouched.
//!
//! # Sequence
//!
//! 1. Refuse immediately if the port is closed (no I/O).
//! 2. Pick the excitation from the mode. In alternating mode the toggle flips
//!    here, before any I/O, so it flips on failures too.
//! 3. Flush, write the command byte.
//! 4. Accumulate short reads until [`FRAME_BYTES`] arrive or the budget expires.
//! 5. Decode straight into the destination buffers and mark them active.
//!
//! The frame is read into a scratch buffer first, so nothing in the model
//! changes until the whole frame is in hand.

use crate::backend::protocol::{Frame, FRAME_BYTES};
use crate::backend::transport::SerialTransport;
use crate::curve::CurveData;
use crate::error::{CurveBugError, Result, ResultExt};
use crate::types::Excitation;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Wall-clock budget for reading one frame
pub const DEFAULT_FRAME_TIMEOUT: Duration = Duration::from_millis(1000);

/// Size of the rolling window for recent frame times
const RECENT_WINDOW_SIZE: usize = 100;

/// Statistics for acquisitions
///
/// Tracks success rates and frame-time latency.
#[derive(Debug, Clone)]
pub struct FrameStats {
    /// Total number of complete frames
    pub successful_frames: u64,
    /// Total number of failed acquisitions
    pub failed_frames: u64,
    /// Failures where the budget expired short of a frame
    pub incomplete_frames: u64,
    /// Total frame time in microseconds
    pub total_frame_time_us: u64,
    /// Last frame time in microseconds
    pub last_frame_time_us: u64,
    /// Total bytes read
    pub total_bytes_read: u64,

    // Latency tracking
    /// Minimum frame time observed (microseconds)
    pub min_frame_time_us: u64,
    /// Maximum frame time observed (microseconds)
    pub max_frame_time_us: u64,
    /// Rolling window of recent frame times for jitter calculation
    pub recent_frame_times: VecDeque<u64>,
}

impl Default for FrameStats {
    fn default() -> Self {
        Self {
            successful_frames: 0,
            failed_frames: 0,
            incomplete_frames: 0,
            total_frame_time_us: 0,
            last_frame_time_us: 0,
            total_bytes_read: 0,
            min_frame_time_us: u64::MAX,
            max_frame_time_us: 0,
            recent_frame_times: VecDeque::with_capacity(RECENT_WINDOW_SIZE),
        }
    }
}

impl FrameStats {
    /// Calculate average frame time in microseconds
    pub fn avg_frame_time_us(&self) -> f64 {
        if self.successful_frames == 0 {
            0.0
        } else {
            self.total_frame_time_us as f64 / self.successful_frames as f64
        }
    }

    /// Calculate success rate as percentage
    pub fn success_rate(&self) -> f64 {
        let total = self.successful_frames + self.failed_frames;
        if total == 0 {
            100.0
        } else {
            (self.successful_frames as f64 / total as f64) * 100.0
        }
    }

    /// Record a complete frame with latency tracking
    pub fn record_success(&mut self, time_us: u64, bytes: u64) {
        self.successful_frames += 1;
        self.total_frame_time_us += time_us;
        self.last_frame_time_us = time_us;
        self.total_bytes_read += bytes;

        self.min_frame_time_us = self.min_frame_time_us.min(time_us);
        self.max_frame_time_us = self.max_frame_time_us.max(time_us);

        self.recent_frame_times.push_back(time_us);
        if self.recent_frame_times.len() > RECENT_WINDOW_SIZE {
            self.recent_frame_times.pop_front();
        }
    }

    /// Record a failed acquisition
    pub fn record_failure(&mut self, error: &CurveBugError, bytes: u64) {
        self.failed_frames += 1;
        self.total_bytes_read += bytes;
        if error.is_frame_incomplete() {
            self.incomplete_frames += 1;
        }
    }

    /// Calculate jitter (max - min) over recent window in microseconds
    pub fn jitter_us(&self) -> u64 {
        self.recent_max_us().saturating_sub(self.recent_min_us())
    }

    /// Calculate standard deviation of recent frame times in microseconds
    pub fn stddev_us(&self) -> f64 {
        if self.recent_frame_times.len() < 2 {
            return 0.0;
        }
        let mean = self.recent_frame_times.iter().sum::<u64>() as f64
            / self.recent_frame_times.len() as f64;
        let variance = self
            .recent_frame_times
            .iter()
            .map(|&t| (t as f64 - mean).powi(2))
            .sum::<f64>()
            / (self.recent_frame_times.len() - 1) as f64;
        variance.sqrt()
    }

    /// Get the recent min frame time (from rolling window)
    pub fn recent_min_us(&self) -> u64 {
        self.recent_frame_times.iter().min().copied().unwrap_or(0)
    }

    /// Get the recent max frame time (from rolling window)
    pub fn recent_max_us(&self) -> u64 {
        self.recent_frame_times.iter().max().copied().unwrap_or(0)
    }

    /// Reset all statistics
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Drives the instrument for one frame at a time
#[derive(Debug, Clone)]
pub struct Acquisition {
    frame_timeout: Duration,
    scratch: Box<Frame>,
    stats: FrameStats,
}

impl Default for Acquisition {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_TIMEOUT)
    }
}

impl Acquisition {
    /// Create an acquisition engine with the given frame read budget
    pub fn new(frame_timeout: Duration) -> Self {
        Self {
            frame_timeout,
            scratch: Box::new([0u8; FRAME_BYTES]),
            stats: FrameStats::default(),
        }
    }

    pub fn frame_timeout(&self) -> Duration {
        self.frame_timeout
    }

    pub fn set_frame_timeout(&mut self, frame_timeout: Duration) {
        self.frame_timeout = frame_timeout;
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    /// Acquire one frame into `curves`.
    ///
    /// Returns the excitation that was stored. On any error the buffers and
    /// the active strength are unchanged; only the alternating toggle moves.
    pub fn acquire(
        &mut self,
        transport: &mut dyn SerialTransport,
        curves: &mut CurveData,
    ) -> Result<Excitation> {
        if !transport.is_open() {
            return Err(CurveBugError::TransportUnavailable);
        }

        let excitation = curves.next_excitation();
        let started = Instant::now();

        match self.exchange(transport, excitation) {
            Ok(()) => {
                curves.store_frame(excitation, &self.scratch);
                let elapsed_us = started.elapsed().as_micros() as u64;
                self.stats.record_success(elapsed_us, FRAME_BYTES as u64);
                tracing::trace!(
                    "Acquired {:?} frame in {} us",
                    excitation,
                    elapsed_us
                );
                Ok(excitation)
            }
            Err((error, received)) => {
                self.stats.record_failure(&error, received as u64);
                Err(error)
            }
        }
    }

    /// Send the command and fill the scratch frame.
    /// On failure, also reports how many bytes did arrive.
    fn exchange(
        &mut self,
        transport: &mut dyn SerialTransport,
        excitation: Excitation,
    ) -> std::result::Result<(), (CurveBugError, usize)> {
        transport
            .flush()
            .context("Failed to flush port")
            .map_err(|e| (e, 0))?;
        transport
            .write(&[excitation.command_byte()])
            .context("Failed to send command")
            .map_err(|e| (e, 0))?;

        let received = read_frame(transport, &mut self.scratch, self.frame_timeout)?;
        debug_assert_eq!(received, FRAME_BYTES);
        Ok(())
    }
}

/// Accumulate reads into `frame` until it is full or `budget` has elapsed.
///
/// Every read is capped to the time left before the deadline, so the call
/// never blocks past `budget`. The transport's own read timeout is restored
/// before returning.
pub fn read_frame(
    transport: &mut dyn SerialTransport,
    frame: &mut Frame,
    budget: Duration,
) -> std::result::Result<usize, (CurveBugError, usize)> {
    let configured = transport.read_timeout();
    let result = fill_frame(transport, frame, budget, configured);

    if transport.read_timeout() != configured {
        if let Err(e) = transport.set_read_timeout(configured) {
            tracing::debug!("Failed to restore read timeout: {}", e);
        }
    }
    result
}

fn fill_frame(
    transport: &mut dyn SerialTransport,
    frame: &mut Frame,
    budget: Duration,
    per_read: Duration,
) -> std::result::Result<usize, (CurveBugError, usize)> {
    let deadline = Instant::now() + budget;
    let mut received = 0;

    while received < FRAME_BYTES {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err((
                CurveBugError::FrameIncomplete {
                    received,
                    expected: FRAME_BYTES,
                },
                received,
            ));
        }

        let timeout = per_read.min(remaining);
        if timeout != transport.read_timeout() {
            transport
                .set_read_timeout(timeout)
                .map_err(|e| (e.with_context("Failed to set read timeout"), received))?;
        }

        match transport.read(&mut frame[received..]) {
            Ok(n) => received += n,
            Err(e) => return Err((e.with_context("Failed to read frame"), received)),
        }
    }

    Ok(received)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock_device::MockCurveTracer;
    use crate::backend::transport::MockSerialTransport;
    use crate::types::{Channel, ExcitationMode};
    use std::sync::{Arc, Mutex};

    fn short_budget() -> Acquisition {
        Acquisition::new(Duration::from_millis(30))
    }

    fn acquired_weak_and_standard() -> CurveData {
        let mut curves = CurveData::with_mode(ExcitationMode::Alternating);
        let mut port = MockCurveTracer::connected();
        let mut acq = Acquisition::default();
        acq.acquire(&mut port, &mut curves).unwrap();
        acq.acquire(&mut port, &mut curves).unwrap();
        curves
    }

    #[test]
    fn test_closed_port_fails_without_io() {
        let mut port = MockSerialTransport::new();
        port.expect_is_open().return_const(false);
        port.expect_flush().never();
        port.expect_write().never();
        port.expect_read().never();

        let mut curves = CurveData::with_mode(ExcitationMode::Alternating);
        let before = curves.clone();
        let result = Acquisition::default().acquire(&mut port, &mut curves);

        assert!(matches!(result, Err(CurveBugError::TransportUnavailable)));
        // Toggle does not move when no acquisition was attempted
        assert_eq!(curves, before);
    }

    #[test]
    fn test_write_failure_leaves_buffers() {
        let mut port = MockSerialTransport::new();
        port.expect_is_open().return_const(true);
        port.expect_flush().returning(|| Ok(()));
        port.expect_write().returning(|_| {
            Err(CurveBugError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "unplugged",
            )))
        });
        port.expect_read().never();

        let mut curves = acquired_weak_and_standard();
        let before = curves.clone();
        let mut acq = Acquisition::default();
        assert!(acq.acquire(&mut port, &mut curves).is_err());

        assert_eq!(
            curves.channel(Channel::Ch1, Excitation::Standard),
            before.channel(Channel::Ch1, Excitation::Standard)
        );
        assert_eq!(curves.active(), before.active());
        assert_eq!(acq.stats().failed_frames, 1);
        assert_eq!(acq.stats().incomplete_frames, 0);
    }

    #[test]
    fn test_sends_command_byte_for_mode() {
        let mut port = MockSerialTransport::new();
        port.expect_is_open().return_const(true);
        port.expect_flush().times(1).returning(|| Ok(()));
        port.expect_write()
            .withf(|bytes| bytes.first() == Some(&b'W'))
            .times(1)
            .returning(|bytes| Ok(bytes.len()));
        port.expect_read_timeout().return_const(Duration::from_millis(50));
        port.expect_set_read_timeout().returning(|_| Ok(()));
        port.expect_read().returning(|buf| {
            buf.fill(0);
            Ok(buf.len())
        });

        let mut curves = CurveData::with_mode(ExcitationMode::Weak);
        let stored = Acquisition::default().acquire(&mut port, &mut curves).unwrap();
        assert_eq!(stored, Excitation::Weak);
        assert!(curves.last_was_weak());
    }

    #[test]
    fn test_chunked_frame_is_assembled() {
        let mut port = MockCurveTracer::connected().with_chunk_size(13);
        let mut curves = CurveData::new();
        let mut acq = Acquisition::default();

        assert_eq!(acq.acquire(&mut port, &mut curves).unwrap(), Excitation::Standard);
        assert_eq!(curves.active_channel(Channel::Ch1).len(), 336);
        assert_eq!(acq.stats().successful_frames, 1);
        assert_eq!(acq.stats().total_bytes_read, FRAME_BYTES as u64);
    }

    #[test]
    fn test_short_frame_leaves_model_unchanged() {
        let mut curves = acquired_weak_and_standard();
        let before = curves.clone();

        let mut port = MockCurveTracer::connected().with_truncated_frames(2015);
        let mut acq = short_budget();
        let err = acq.acquire(&mut port, &mut curves).unwrap_err();

        assert!(err.is_frame_incomplete());
        for channel in [Channel::Ch1, Channel::Ch2] {
            for excitation in [Excitation::Standard, Excitation::Weak] {
                assert_eq!(
                    curves.channel(channel, excitation),
                    before.channel(channel, excitation)
                );
            }
        }
        assert_eq!(curves.active(), before.active());
        assert_eq!(acq.stats().incomplete_frames, 1);
        assert_eq!(acq.stats().total_bytes_read, 2015);
    }

    #[test]
    fn test_alternating_toggle_flips_on_failure() {
        let mut curves = CurveData::with_mode(ExcitationMode::Alternating);
        let mut port = MockCurveTracer::connected().with_truncated_frames(10);
        let log = port.command_log();
        let mut acq = short_budget();

        for _ in 0..4 {
            assert!(acq.acquire(&mut port, &mut curves).is_err());
        }
        assert_eq!(*log.lock().unwrap(), b"TWTW".to_vec());
        assert!(curves.active_channel(Channel::Ch1).is_empty());
    }

    #[test]
    fn test_alternating_stores_under_strength_sent() {
        let curves = acquired_weak_and_standard();
        assert_eq!(curves.active(), Excitation::Weak);
        assert!(curves.showing_both_strengths());
        assert!(!curves.channel(Channel::Ch2, Excitation::Standard).is_empty());
    }

    #[test]
    fn test_read_error_fails_the_call() {
        let mut port = MockSerialTransport::new();
        port.expect_is_open().return_const(true);
        port.expect_flush().returning(|| Ok(()));
        port.expect_write().returning(|bytes| Ok(bytes.len()));
        port.expect_read_timeout().return_const(Duration::from_millis(50));
        port.expect_set_read_timeout().returning(|_| Ok(()));
        port.expect_read()
            .times(1)
            .returning(|_| Err(CurveBugError::Io(std::io::Error::other("device reset"))));

        let mut curves = CurveData::new();
        assert!(Acquisition::default().acquire(&mut port, &mut curves).is_err());
        assert!(curves.active_channel(Channel::Ch1).is_empty());
    }

    #[test]
    fn test_budget_bounds_a_silent_device() {
        let mut port = MockCurveTracer::connected().with_truncated_frames(0);
        let mut curves = CurveData::new();
        let mut acq = short_budget();

        let started = Instant::now();
        assert!(acq.acquire(&mut port, &mut curves).is_err());
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn test_slow_read_is_cut_to_remaining_budget() {
        let budget = Duration::from_millis(200);
        let mut port = MockCurveTracer::connected()
            .with_truncated_frames(0)
            .with_read_timeout(Duration::from_millis(150))
            .with_read_delay(Duration::from_millis(150));
        let mut curves = CurveData::new();
        let mut acq = Acquisition::new(budget);

        let started = Instant::now();
        let err = acq.acquire(&mut port, &mut curves).unwrap_err();
        let elapsed = started.elapsed();

        assert!(err.is_frame_incomplete());
        assert!(elapsed <= budget + Duration::from_millis(20), "took {:?}", elapsed);
        assert_eq!(port.read_timeout(), Duration::from_millis(150));
    }

    #[test]
    fn test_read_timeout_capped_then_restored() {
        let configured = Duration::from_secs(1);
        let current = Arc::new(Mutex::new(configured));
        let requested = Arc::new(Mutex::new(Vec::new()));

        let mut port = MockSerialTransport::new();
        port.expect_is_open().return_const(true);
        port.expect_flush().returning(|| Ok(()));
        port.expect_write().returning(|bytes| Ok(bytes.len()));
        let now = Arc::clone(&current);
        port.expect_read_timeout()
            .returning(move || *now.lock().unwrap());
        let (now, log) = (Arc::clone(&current), Arc::clone(&requested));
        port.expect_set_read_timeout().returning(move |t| {
            *now.lock().unwrap() = t;
            log.lock().unwrap().push(t);
            Ok(())
        });
        port.expect_read().returning(|_| {
            std::thread::sleep(Duration::from_millis(5));
            Ok(0)
        });

        let mut curves = CurveData::new();
        assert!(short_budget().acquire(&mut port, &mut curves).is_err());

        let requested = requested.lock().unwrap();
        let (restore, capped) = requested.split_last().unwrap();
        assert_eq!(*restore, configured);
        assert!(!capped.is_empty());
        assert!(capped.iter().all(|t| *t <= Duration::from_millis(30)));
        assert_eq!(*current.lock().unwrap(), configured);
    }

    #[test]
    fn test_frame_stats_latency() {
        let mut stats = FrameStats::default();
        stats.record_success(1000, 2016);
        stats.record_success(3000, 2016);

        assert_eq!(stats.successful_frames, 2);
        assert_eq!(stats.avg_frame_time_us(), 2000.0);
        assert_eq!(stats.jitter_us(), 2000);
        assert!(stats.stddev_us() > 0.0);

        stats.record_failure(
            &CurveBugError::FrameIncomplete {
                received: 5,
                expected: FRAME_BYTES,
            },
            5,
        );
        assert!((stats.success_rate() - 66.666).abs() < 0.01);

        stats.reset();
        assert_eq!(stats.successful_frames, 0);
        assert_eq!(stats.jitter_us(), 0);
    }
}
