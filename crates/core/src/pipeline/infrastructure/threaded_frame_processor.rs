use std::collections::BTreeMap;
use std::thread::ScopedJoinHandle;

use crossbeam_channel::{Receiver, Sender};

use crate::pipeline::frame_processor::{FrameProcessor, KeepFrameFn};
use crate::pipeline::frame_stage::{FrameStage, ProcessedFrame};
use crate::shared::constants::MAX_DEFAULT_WORKERS;
use crate::shared::frame::Frame;
use crate::shared::BoxError;
use crate::video::domain::video_reader::VideoReader;

const DEFAULT_CHANNEL_CAPACITY: usize = 8;

/// Runs the per-frame stage on a worker pool.
///
/// Layout: `reader → N workers → calling thread [reorder → sink]`
///
/// Decoding overlaps with inference, and results are released to the sink
/// strictly by sequence number so the blink detector sees frames in order.
pub struct ThreadedFrameProcessor {
    workers: usize,
    channel_capacity: usize,
}

impl ThreadedFrameProcessor {
    pub fn new(workers: usize, channel_capacity: usize) -> Self {
        Self {
            workers: workers.max(1),
            channel_capacity: channel_capacity.max(1),
        }
    }

    /// Available parallelism, capped at [`MAX_DEFAULT_WORKERS`].
    pub fn default_workers() -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(MAX_DEFAULT_WORKERS)
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl Default for ThreadedFrameProcessor {
    fn default() -> Self {
        Self::new(Self::default_workers(), DEFAULT_CHANNEL_CAPACITY)
    }
}

impl FrameProcessor for ThreadedFrameProcessor {
    fn process(
        &self,
        reader: &mut dyn VideoReader,
        stage: &FrameStage,
        keep_enhanced: &KeepFrameFn,
        sink: &mut dyn FnMut(ProcessedFrame),
    ) -> Result<usize, BoxError> {
        let cap = self.channel_capacity;
        let (frame_tx, frame_rx) = crossbeam_channel::bounded::<(usize, Frame)>(cap);
        let (result_tx, result_rx) = crossbeam_channel::bounded::<(usize, ProcessedFrame)>(cap);

        std::thread::scope(|scope| {
            let reader_handle = scope.spawn(move || read_frames(reader, frame_tx));

            let worker_handles: Vec<_> = (0..self.workers)
                .map(|_| {
                    let rx = frame_rx.clone();
                    let tx = result_tx.clone();
                    scope.spawn(move || run_worker(rx, tx, stage, keep_enhanced))
                })
                .collect();
            drop(frame_rx);
            drop(result_tx);

            let delivered = reorder_into(result_rx, sink);

            join_threads(reader_handle, worker_handles, delivered)
        })
    }
}

fn read_frames(
    reader: &mut dyn VideoReader,
    frame_tx: Sender<(usize, Frame)>,
) -> Result<usize, BoxError> {
    let mut seq = 0;
    for item in reader.frames() {
        let frame = item?;
        if frame_tx.send((seq, frame)).is_err() {
            break;
        }
        seq += 1;
    }
    Ok(seq)
}

fn run_worker(
    frame_rx: Receiver<(usize, Frame)>,
    result_tx: Sender<(usize, ProcessedFrame)>,
    stage: &FrameStage,
    keep_enhanced: &KeepFrameFn,
) {
    for (seq, frame) in frame_rx {
        let keep = keep_enhanced(frame.index());
        if result_tx.send((seq, stage.process(frame, keep))).is_err() {
            break;
        }
    }
}

/// Releases results to `sink` in sequence order; returns how many were
/// delivered.
fn reorder_into(
    result_rx: Receiver<(usize, ProcessedFrame)>,
    sink: &mut dyn FnMut(ProcessedFrame),
) -> usize {
    let mut pending: BTreeMap<usize, ProcessedFrame> = BTreeMap::new();
    let mut next = 0;
    for (seq, processed) in result_rx {
        pending.insert(seq, processed);
        while let Some(ready) = pending.remove(&next) {
            sink(ready);
            next += 1;
        }
    }
    if !pending.is_empty() {
        log::warn!("{} processed frame(s) never became contiguous", pending.len());
    }
    next
}

/// Joins the pipeline threads and coalesces the first error encountered.
fn join_threads(
    reader_handle: ScopedJoinHandle<'_, Result<usize, BoxError>>,
    worker_handles: Vec<ScopedJoinHandle<'_, ()>>,
    delivered: usize,
) -> Result<usize, BoxError> {
    let mut first_error: Option<BoxError> = None;

    let decoded = match reader_handle.join() {
        Ok(Ok(count)) => count,
        Ok(Err(e)) => {
            first_error = Some(e);
            0
        }
        Err(_) => {
            first_error = Some("Reader thread panicked".into());
            0
        }
    };

    for handle in worker_handles {
        if handle.join().is_err() && first_error.is_none() {
            first_error = Some("Frame worker panicked".into());
        }
    }

    if let Some(e) = first_error {
        return Err(e);
    }
    if delivered != decoded {
        return Err(format!("{decoded} frame(s) decoded but {delivered} processed").into());
    }
    Ok(decoded)
}
