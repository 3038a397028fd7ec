//! Re-sequencing writer in front of the video encoder.
//!
//! Render workers finish frames in any order and [`OrderedFrameWriter::submit`]
//! them. Frames wait in a pending map keyed by index; whichever thread finds
//! the next expected index present becomes the single drainer and appends the
//! contiguous run to the sink, releasing the state lock around each append.
//!
//! Every submitted frame carries its pool buffer and backpressure permit.
//! Both are released exactly once: when the frame was appended, or when it is
//! discarded on cancellation or failure.

use std::collections::BTreeMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use reel_common::clock::{estimate_eta, ExportClock};
use reel_common::error::{ExportError, ExportResult};

use crate::backpressure::SlotPermit;
use crate::cancel::{CancelToken, CancelWaker};
use crate::media::FrameSink;
use crate::pool::PooledBuffer;
use crate::progress::{ExportProgress, ExportStage, ProgressCallback};

/// A rendered frame waiting for its turn.
pub struct RenderedFrame {
    pub index: u64,
    pub pts_secs: f64,
    pub buffer: PooledBuffer,
    pub permit: SlotPermit,
}

impl std::fmt::Debug for RenderedFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderedFrame")
            .field("index", &self.index)
            .field("pts_secs", &self.pts_secs)
            .finish()
    }
}

/// Outcome of a fully drained writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterSummary {
    pub frames_written: u64,
    pub frames_dropped: u64,
}

#[derive(Default)]
struct WriterState {
    pending: BTreeMap<u64, RenderedFrame>,
    next_index: u64,
    draining: bool,
    finished: bool,
    cancelled: bool,
    failure: Option<ExportError>,
    failed: bool,
    submitted: u64,
    written: u64,
    dropped: u64,
}

impl WriterState {
    fn stopped(&self) -> bool {
        self.cancelled || self.failed
    }

    /// Move every pending frame out so it can be dropped after unlocking.
    fn take_pending(&mut self) -> Vec<RenderedFrame> {
        let frames: Vec<RenderedFrame> = std::mem::take(&mut self.pending).into_values().collect();
        self.dropped += frames.len() as u64;
        frames
    }

    fn record_failure(&mut self, err: ExportError) {
        if err.is_cancelled() {
            self.cancelled = true;
        } else if !self.failed {
            self.failed = true;
            self.failure = Some(err);
        }
    }
}

/// State plus the condvar `wait_until_done` sleeps on.
#[derive(Default)]
struct WriterShared {
    state: Mutex<WriterState>,
    done: Condvar,
}

impl WriterShared {
    fn lock(&self) -> MutexGuard<'_, WriterState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CancelWaker for WriterShared {
    fn wake(&self) {
        let _state = self.lock();
        self.done.notify_all();
    }
}

/// Writes frames to a [`FrameSink`] in strictly increasing index order.
pub struct OrderedFrameWriter {
    shared: Arc<WriterShared>,
    sink: Mutex<Box<dyn FrameSink>>,
    total_frames: u64,
    progress: Option<ProgressCallback>,
    progress_interval: u64,
    clock: ExportClock,
    cancel: CancelToken,
}

impl OrderedFrameWriter {
    pub fn new(
        sink: Box<dyn FrameSink>,
        total_frames: u64,
        progress: Option<ProgressCallback>,
        progress_interval: u64,
        cancel: CancelToken,
    ) -> Self {
        let shared = Arc::new(WriterShared::default());
        cancel.register(&shared);
        Self {
            shared,
            sink: Mutex::new(sink),
            total_frames,
            progress,
            progress_interval: progress_interval.max(1),
            clock: ExportClock::start(),
            cancel,
        }
    }

    fn lock(&self) -> MutexGuard<'_, WriterState> {
        self.shared.lock()
    }

    /// Hand over a rendered frame.
    ///
    /// Each index may be submitted once. After cancellation or failure the
    /// frame is dropped immediately, releasing its buffer and slot.
    pub fn submit(&self, frame: RenderedFrame) {
        let mut state = self.lock();
        let duplicate = frame.index < state.next_index || state.pending.contains_key(&frame.index);
        debug_assert!(!duplicate, "frame {} submitted twice", frame.index);
        if duplicate {
            tracing::error!(index = frame.index, "Duplicate frame submission");
            state.record_failure(ExportError::encode_at(frame.index, "duplicate frame index"));
        }
        if state.stopped() || self.cancel.is_cancelled() {
            state.dropped += 1;
            let discarded = state.take_pending();
            drop(state);
            drop(discarded);
            drop(frame);
            self.shared.done.notify_all();
            return;
        }
        state.submitted += 1;
        state.pending.insert(frame.index, frame);
        if state.draining {
            return;
        }
        state.draining = true;
        drop(state);
        self.drain();
    }

    /// Append the contiguous run starting at `next_index`. Only one thread
    /// drains at a time; the caller must have set `draining`.
    fn drain(&self) {
        loop {
            let mut state = self.lock();
            if self.cancel.is_cancelled() {
                state.cancelled = true;
            }
            if state.stopped() {
                let discarded = state.take_pending();
                state.draining = false;
                drop(state);
                drop(discarded);
                self.shared.done.notify_all();
                return;
            }
            let next = state.next_index;
            let Some(frame) = state.pending.remove(&next) else {
                state.draining = false;
                drop(state);
                self.shared.done.notify_all();
                return;
            };
            drop(state);

            let result = self.append(&frame);
            // Buffer and slot go back before the next frame is looked at.
            drop(frame);

            let mut state = self.lock();
            let report = match result {
                Ok(()) => {
                    state.next_index += 1;
                    state.written += 1;
                    let written = state.written;
                    (written % self.progress_interval == 0 || written == self.total_frames)
                        .then(|| self.rendering_progress(written))
                }
                Err(err) => {
                    if !err.is_cancelled() {
                        tracing::error!(index = next, error = %err, "Frame append failed");
                    }
                    state.record_failure(err);
                    None
                }
            };
            drop(state);
            if let (Some(progress), Some(cb)) = (report, &self.progress) {
                cb(progress);
            }
        }
    }

    /// Blocks while the encoder is not ready for more data.
    fn append(&self, frame: &RenderedFrame) -> ExportResult<()> {
        let mut sink = self.sink.lock().unwrap_or_else(|e| e.into_inner());
        self.cancel.check()?;
        sink.append(frame.index, frame.pts_secs, &frame.buffer, &self.cancel)
    }

    fn rendering_progress(&self, written: u64) -> ExportProgress {
        let total = self.total_frames.max(1);
        ExportProgress {
            fraction: (written as f64 / total as f64 * 0.99).clamp(0.0, 0.99),
            eta_secs: estimate_eta(self.clock.elapsed_secs(), written, total),
            frames_written: written,
            total_frames: self.total_frames,
            stage: ExportStage::Rendering,
        }
    }

    /// No more submissions will follow.
    pub fn finish(&self) {
        self.lock().finished = true;
        self.shared.done.notify_all();
    }

    /// Drop everything pending and refuse further frames.
    pub fn cancel(&self) {
        let mut state = self.lock();
        state.cancelled = true;
        let discarded = if state.draining {
            // The drainer discards once its current append returns.
            Vec::new()
        } else {
            state.take_pending()
        };
        drop(state);
        drop(discarded);
        self.shared.done.notify_all();
    }

    /// Record a failure raised outside the writer, e.g. by a render task.
    pub fn fail(&self, err: ExportError) {
        let mut state = self.lock();
        state.record_failure(err);
        let discarded = if state.draining {
            Vec::new()
        } else {
            state.take_pending()
        };
        drop(state);
        drop(discarded);
        self.shared.done.notify_all();
    }

    /// Block until every submitted frame was written or discarded.
    ///
    /// Succeeds only after [`finish`](Self::finish) with nothing pending.
    pub fn wait_until_done(&self) -> ExportResult<WriterSummary> {
        let mut state = self.lock();
        loop {
            if self.cancel.is_cancelled() && !state.stopped() {
                state.cancelled = true;
            }
            if !state.draining {
                if state.stopped() {
                    let discarded = state.take_pending();
                    let failure = state.failure.take();
                    drop(state);
                    drop(discarded);
                    return Err(failure.unwrap_or(ExportError::Cancelled));
                }
                if state.finished && state.pending.is_empty() {
                    return Ok(WriterSummary {
                        frames_written: state.written,
                        frames_dropped: state.dropped,
                    });
                }
            }
            state = self
                .shared
                .done
                .wait(state)
                .unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Whether the writer gave up after a cancellation or failure.
    pub fn is_stopped(&self) -> bool {
        self.lock().stopped()
    }

    pub fn frames_written(&self) -> u64 {
        self.lock().written
    }

    pub fn frames_submitted(&self) -> u64 {
        self.lock().submitted
    }

    pub fn frames_dropped(&self) -> u64 {
        self.lock().dropped
    }

    pub fn next_index(&self) -> u64 {
        self.lock().next_index
    }

    /// Give the sink back once the writer is done with it.
    pub fn into_sink(self) -> Box<dyn FrameSink> {
        self.sink.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex as StdMutex};

    use crate::backpressure::FrameSlots;
    use crate::frame::PixelBuffer;
    use crate::pool::BufferPool;

    #[derive(Clone, Default)]
    struct RecordingSink {
        indices: Arc<StdMutex<Vec<u64>>>,
        fail_at: Option<u64>,
    }

    impl FrameSink for RecordingSink {
        fn append(
            &mut self,
            index: u64,
            _pts: f64,
            _frame: &PixelBuffer,
            _cancel: &CancelToken,
        ) -> ExportResult<()> {
            if self.fail_at == Some(index) {
                return Err(ExportError::encode_at(index, "disk full"));
            }
            self.indices.lock().unwrap().push(index);
            Ok(())
        }

        fn finish(&mut self) -> ExportResult<()> {
            Ok(())
        }
    }

    struct Fixture {
        pool: BufferPool,
        slots: FrameSlots,
        cancel: CancelToken,
    }

    impl Fixture {
        fn new(capacity: usize) -> Self {
            Self {
                pool: BufferPool::new(capacity, 2, 2).unwrap(),
                slots: FrameSlots::new(capacity).unwrap(),
                cancel: CancelToken::new(),
            }
        }

        fn frame(&self, index: u64) -> RenderedFrame {
            RenderedFrame {
                index,
                pts_secs: index as f64,
                permit: self.slots.acquire(&self.cancel).unwrap(),
                buffer: self.pool.acquire(&self.cancel).unwrap(),
            }
        }
    }

    #[test]
    fn test_out_of_order_submissions_are_written_in_order() {
        let fx = Fixture::new(8);
        let sink = RecordingSink::default();
        let writer = OrderedFrameWriter::new(Box::new(sink.clone()), 5, None, 30, fx.cancel.clone());
        for index in [3, 1, 4, 0, 2] {
            writer.submit(fx.frame(index));
        }
        writer.finish();
        let summary = writer.wait_until_done().unwrap();
        assert_eq!(summary.frames_written, 5);
        assert_eq!(*sink.indices.lock().unwrap(), vec![0, 1, 2, 3, 4]);
        assert_eq!(fx.slots.in_flight(), 0);
        assert_eq!(fx.pool.available(), 8);
    }

    #[test]
    fn test_gap_holds_later_frames() {
        let fx = Fixture::new(4);
        let sink = RecordingSink::default();
        let writer = OrderedFrameWriter::new(Box::new(sink.clone()), 3, None, 30, fx.cancel.clone());
        writer.submit(fx.frame(1));
        writer.submit(fx.frame(2));
        assert!(sink.indices.lock().unwrap().is_empty());
        assert_eq!(fx.slots.in_flight(), 2);
        writer.submit(fx.frame(0));
        assert_eq!(writer.next_index(), 3);
    }

    #[test]
    fn test_cancel_discards_pending() {
        let fx = Fixture::new(4);
        let sink = RecordingSink::default();
        let writer = OrderedFrameWriter::new(Box::new(sink.clone()), 4, None, 30, fx.cancel.clone());
        writer.submit(fx.frame(0));
        writer.submit(fx.frame(2));
        writer.submit(fx.frame(3));
        writer.cancel();
        assert_eq!(fx.slots.in_flight(), 0);
        assert_eq!(fx.pool.available(), 4);
        // Late frames are dropped, not written.
        writer.submit(fx.frame(1));
        assert!(matches!(writer.wait_until_done(), Err(ExportError::Cancelled)));
        assert_eq!(*sink.indices.lock().unwrap(), vec![0]);
        assert_eq!(fx.slots.acquired_count(), fx.slots.released_count());
    }

    #[test]
    fn test_sink_failure_surfaces_with_index() {
        let fx = Fixture::new(4);
        let sink = RecordingSink {
            fail_at: Some(1),
            ..RecordingSink::default()
        };
        let writer = OrderedFrameWriter::new(Box::new(sink), 3, None, 30, fx.cancel.clone());
        for index in 0..3 {
            writer.submit(fx.frame(index));
        }
        writer.finish();
        match writer.wait_until_done() {
            Err(ExportError::EncodeFailed { frame_index, .. }) => assert_eq!(frame_index, Some(1)),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(fx.slots.in_flight(), 0);
    }

    #[test]
    fn test_progress_cadence() {
        let fx = Fixture::new(4);
        let reports = Arc::new(StdMutex::new(Vec::new()));
        let progress: ProgressCallback = {
            let reports = reports.clone();
            Arc::new(move |p: ExportProgress| reports.lock().unwrap().push(p.frames_written))
        };
        let writer = OrderedFrameWriter::new(
            Box::new(RecordingSink::default()),
            7,
            Some(progress),
            3,
            fx.cancel.clone(),
        );
        for index in 0..7 {
            writer.submit(fx.frame(index));
        }
        writer.finish();
        writer.wait_until_done().unwrap();
        assert_eq!(*reports.lock().unwrap(), vec![3, 6, 7]);
    }

    #[test]
    fn test_token_cancel_unblocks_wait() {
        let fx = Fixture::new(2);
        let writer = OrderedFrameWriter::new(
            Box::new(RecordingSink::default()),
            10,
            None,
            30,
            fx.cancel.clone(),
        );
        writer.submit(fx.frame(1));
        fx.cancel.cancel();
        assert!(writer.wait_until_done().unwrap_err().is_cancelled());
        assert_eq!(fx.slots.in_flight(), 0);
    }

    #[test]
    fn test_cancel_from_another_thread_wakes_waiter() {
        let fx = Fixture::new(2);
        let writer = OrderedFrameWriter::new(
            Box::new(RecordingSink::default()),
            10,
            None,
            30,
            fx.cancel.clone(),
        );
        writer.submit(fx.frame(1));
        let trigger = fx.cancel.clone();
        let canceller = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(30));
            trigger.cancel();
        });
        let started = std::time::Instant::now();
        assert!(writer.wait_until_done().unwrap_err().is_cancelled());
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
        canceller.join().unwrap();
        assert_eq!(fx.slots.in_flight(), 0);
    }

    #[test]
    #[should_panic(expected = "submitted twice")]
    #[cfg(debug_assertions)]
    fn test_duplicate_submission_panics_in_debug() {
        let fx = Fixture::new(4);
        let writer = OrderedFrameWriter::new(
            Box::new(RecordingSink::default()),
            4,
            None,
            30,
            fx.cancel.clone(),
        );
        writer.submit(fx.frame(1));
        writer.submit(fx.frame(1));
    }
}
