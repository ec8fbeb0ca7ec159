// THEORY:
// The `parallel_pipeline` module puts the synchronous `CompositionPipeline`
// behind two async front ends. Neither one queues work: both are built for a
// camera or editor that keeps producing frames and only cares about the most
// recent answer.
//
// 1.  **SingleShotAnalyzer**: one request, one result. The pipeline runs on the
//     blocking thread pool so the caller's task is never stalled by the pixel
//     loops. A second request while one is in flight is rejected with
//     `AnalysisError::Busy`.
// 2.  **StreamingAnalyzer**: frames are pushed in as fast as they arrive and
//     each is either admitted or dropped on the spot. A frame is dropped when
//     an analysis is still running (one in-flight slot) or when the previous
//     analysis started less than `stream_min_interval` ago. Results flow out as
//     `StreamUpdate`s over a bounded channel, which can also be consumed as a
//     `futures::Stream`. Workers never wait on that channel: when the consumer
//     falls behind and it is full, the new update is dropped. Failed frames,
//     including oracle failures, are logged and skipped.
//
// The in-flight slot is an atomic flag released by a guard when the worker
// finishes, so a panicking worker cannot wedge the analyzer.

use crate::core_modules::advice::Advice;
use crate::core_modules::composition::CompositionScore;
use crate::core_modules::region::Region;
use crate::error::{AnalysisError, Result};
use crate::oracle::SourceImage;
use crate::pipeline::{AnalysisResult, CompositionPipeline};
use futures::Stream;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{trace, warn};

const UPDATE_CHANNEL_CAPACITY: usize = 16;

/// Holds the single in-flight slot until dropped.
struct InFlightGuard {
    flag: Arc<AtomicBool>,
}

impl InFlightGuard {
    fn try_acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag: Arc::clone(flag) })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Runs one analysis at a time off the caller's task.
pub struct SingleShotAnalyzer {
    pipeline: Arc<CompositionPipeline>,
    busy: Arc<AtomicBool>,
}

impl SingleShotAnalyzer {
    pub fn new(pipeline: CompositionPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Analyzes `source` on the blocking pool. Fails with `Busy` instead of waiting
    /// when another analysis is still running.
    pub async fn analyze(&self, source: SourceImage) -> Result<AnalysisResult> {
        let slot = InFlightGuard::try_acquire(&self.busy).ok_or(AnalysisError::Busy)?;
        let pipeline = Arc::clone(&self.pipeline);
        tokio::task::spawn_blocking(move || {
            let _slot = slot;
            pipeline.analyze_frame(&source)
        })
        .await
        .map_err(|e| AnalysisError::Worker(e.to_string()))?
    }
}

/// A frame admitted into the streaming analyzer.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    pub frame_id: u64,
    pub timestamp: Instant,
    pub source: SourceImage,
}

/// What the streaming analyzer did with a submitted frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameAdmission {
    Accepted(u64),
    /// Another frame was still being analyzed.
    DroppedBusy(u64),
    /// The previous analysis started less than the minimum interval ago.
    DroppedTooSoon(u64),
}

impl FrameAdmission {
    pub fn frame_id(self) -> u64 {
        match self {
            Self::Accepted(id) | Self::DroppedBusy(id) | Self::DroppedTooSoon(id) => id,
        }
    }

    pub fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

/// The outcome of one streamed frame.
#[derive(Debug, Clone)]
pub struct StreamUpdate {
    pub frame_id: u64,
    /// When the frame was admitted.
    pub timestamp: Instant,
    pub regions: Vec<Region>,
    pub score: Option<CompositionScore>,
    pub advice: Vec<Advice>,
}

/// Rate-limited, drop-on-busy analysis of a live frame feed.
pub struct StreamingAnalyzer {
    pipeline: Arc<CompositionPipeline>,
    runtime: Handle,
    in_flight: Arc<AtomicBool>,
    last_start: Mutex<Option<Instant>>,
    min_interval: Duration,
    frame_counter: AtomicU64,
    updates: mpsc::Sender<StreamUpdate>,
}

impl StreamingAnalyzer {
    /// Creates the analyzer and the receiving end of its update channel.
    ///
    /// Must be called from within a tokio runtime; workers are spawned on it.
    pub fn new(pipeline: CompositionPipeline) -> Result<(Self, mpsc::Receiver<StreamUpdate>)> {
        let runtime = Handle::try_current().map_err(|e| AnalysisError::Worker(e.to_string()))?;
        let (updates, receiver) = mpsc::channel(UPDATE_CHANNEL_CAPACITY);
        let analyzer = Self {
            min_interval: pipeline.config().stream_min_interval(),
            pipeline: Arc::new(pipeline),
            runtime,
            in_flight: Arc::new(AtomicBool::new(false)),
            last_start: Mutex::new(None),
            frame_counter: AtomicU64::new(0),
            updates,
        };
        Ok((analyzer, receiver))
    }

    /// Like `new`, with the updates exposed as a `Stream`.
    pub fn with_stream(
        pipeline: CompositionPipeline,
    ) -> Result<(Self, impl Stream<Item = StreamUpdate> + Send + 'static)> {
        let (analyzer, receiver) = Self::new(pipeline)?;
        Ok((analyzer, update_stream(receiver)))
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Offers a frame to the analyzer. Never blocks on the analysis itself.
    pub fn submit(&self, source: SourceImage) -> FrameAdmission {
        let frame_id = self.frame_counter.fetch_add(1, Ordering::Relaxed);

        let Some(slot) = InFlightGuard::try_acquire(&self.in_flight) else {
            trace!(frame_id, "frame dropped: analysis in flight");
            return FrameAdmission::DroppedBusy(frame_id);
        };

        let now = Instant::now();
        {
            let mut last_start = self.last_start.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(previous) = *last_start {
                if now.duration_since(previous) < self.min_interval {
                    trace!(frame_id, "frame dropped: too soon after previous analysis");
                    return FrameAdmission::DroppedTooSoon(frame_id);
                }
            }
            *last_start = Some(now);
        }

        let frame = FrameBuffer {
            frame_id,
            timestamp: now,
            source,
        };
        let pipeline = Arc::clone(&self.pipeline);
        let updates = self.updates.clone();
        self.runtime.spawn_blocking(move || {
            let outcome = pipeline.analyze_frame(&frame.source);
            drop(slot);
            match outcome {
                Ok(result) => {
                    let update = StreamUpdate {
                        frame_id: frame.frame_id,
                        timestamp: frame.timestamp,
                        regions: result.regions,
                        score: result.score,
                        advice: result.advice,
                    };
                    match updates.try_send(update) {
                        Ok(()) => {}
                        Err(TrySendError::Full(update)) => {
                            trace!(frame_id = update.frame_id, "update dropped: consumer is behind");
                        }
                        Err(TrySendError::Closed(update)) => {
                            trace!(frame_id = update.frame_id, "update receiver closed");
                        }
                    }
                }
                Err(e) if e.is_oracle_failure() => {
                    warn!(frame_id = frame.frame_id, error = %e, "saliency oracle failed; frame skipped");
                }
                Err(e) => {
                    warn!(frame_id = frame.frame_id, error = %e, "frame analysis failed; frame skipped");
                }
            }
        });

        FrameAdmission::Accepted(frame_id)
    }
}

/// Adapts an update receiver into a `Stream` that ends when the analyzer is dropped.
pub fn update_stream(
    receiver: mpsc::Receiver<StreamUpdate>,
) -> impl Stream<Item = StreamUpdate> + Send + 'static {
    futures::stream::unfold(receiver, |mut receiver| async move {
        receiver.recv().await.map(|update| (update, receiver))
    })
}
