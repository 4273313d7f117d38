//! Event-driven metrics collection.
//!
//! Hot paths call [`record_metric`], which is a channel send (or nothing at
//! all when metrics are disabled). A dedicated thread aggregates the events
//! and reports totals through the log.

use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam_channel::{self, select, Receiver, Sender};
use once_cell::sync::OnceCell;

use super::config::TelemetryConfig;

/// Global metrics event sender
static METRICS_SENDER: OnceCell<Sender<MetricsEvent>> = OnceCell::new();

/// Metrics events for fire-and-forget recording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsEvent {
    // ========== Decoder ==========
    /// A frame was decoded completely.
    FrameDecoded,

    /// A frame's declared length did not match its payload structure.
    FrameSizeError,

    /// A malformed or rejected frame was abandoned along with its payload.
    FrameDiscarded,

    /// A frame of unknown type was skipped.
    UnknownFrameSkipped { bytes: usize },

    // ========== Send path ==========
    /// A datagram entered the batch arena.
    PacketBuffered { bytes: usize, copied: bool },

    /// Buffered datagrams were handed to the socket.
    BatchFlushed { packets: usize, bytes: usize },

    /// The arena had no room for another maximum-size packet.
    ArenaExhausted,

    /// The socket reported `WouldBlock` during a flush.
    SendBlocked,
}

/// Totals accumulated by a [`MetricsCollector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSummary {
    pub frames_decoded: u64,
    pub frame_size_errors: u64,
    pub frames_discarded: u64,
    pub unknown_frames: u64,
    pub unknown_bytes: u64,
    pub packets_buffered: u64,
    pub packets_copied: u64,
    pub bytes_buffered: u64,
    pub batches_flushed: u64,
    pub packets_sent: u64,
    pub bytes_sent: u64,
    pub arena_exhausted: u64,
    pub send_blocked: u64,
}

/// Aggregates events into a [`MetricsSummary`].
#[derive(Debug, Default)]
pub struct MetricsCollector {
    summary: MetricsSummary,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process_event(&mut self, event: MetricsEvent) {
        let s = &mut self.summary;
        match event {
            MetricsEvent::FrameDecoded => s.frames_decoded += 1,
            MetricsEvent::FrameSizeError => s.frame_size_errors += 1,
            MetricsEvent::FrameDiscarded => s.frames_discarded += 1,
            MetricsEvent::UnknownFrameSkipped { bytes } => {
                s.unknown_frames += 1;
                s.unknown_bytes += bytes as u64;
            }
            MetricsEvent::PacketBuffered { bytes, copied } => {
                s.packets_buffered += 1;
                s.bytes_buffered += bytes as u64;
                if copied {
                    s.packets_copied += 1;
                }
            }
            MetricsEvent::BatchFlushed { packets, bytes } => {
                s.batches_flushed += 1;
                s.packets_sent += packets as u64;
                s.bytes_sent += bytes as u64;
            }
            MetricsEvent::ArenaExhausted => s.arena_exhausted += 1,
            MetricsEvent::SendBlocked => s.send_blocked += 1,
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        self.summary
    }

    /// Log the current totals.
    pub fn report(&self) {
        let s = &self.summary;
        tracing::info!(
            frames_decoded = s.frames_decoded,
            frame_size_errors = s.frame_size_errors,
            frames_discarded = s.frames_discarded,
            unknown_frames = s.unknown_frames,
            packets_buffered = s.packets_buffered,
            packets_copied = s.packets_copied,
            packets_sent = s.packets_sent,
            bytes_sent = s.bytes_sent,
            arena_exhausted = s.arena_exhausted,
            send_blocked = s.send_blocked,
            "metrics report"
        );
    }
}

/// Handle to the metrics thread for graceful shutdown
pub struct MetricsHandle {
    thread: Option<JoinHandle<MetricsSummary>>,
    shutdown_tx: Option<Sender<()>>,
}

impl MetricsHandle {
    /// Create a disabled handle (when metrics are disabled)
    pub fn disabled() -> Self {
        Self {
            thread: None,
            shutdown_tx: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.thread.is_some()
    }

    /// Stop the metrics thread after it drains pending events.
    ///
    /// Returns the final totals, or `None` for a disabled handle.
    pub fn shutdown(self) -> Option<MetricsSummary> {
        if let Some(tx) = self.shutdown_tx {
            let _ = tx.send(());
        }
        let handle = self.thread?;
        match handle.join() {
            Ok(summary) => Some(summary),
            Err(_) => {
                tracing::error!("Metrics thread panicked during shutdown");
                None
            }
        }
    }
}

/// Record a metrics event (fire-and-forget)
///
/// A no-op until [`start_metrics_task`] has run.
#[inline]
pub fn record_metric(event: MetricsEvent) {
    if let Some(sender) = METRICS_SENDER.get() {
        // Receiver is gone after shutdown.
        let _ = sender.send(event);
    }
}

/// Start the metrics thread and install the global sender.
///
/// Fails if metrics were already started in this process.
pub fn start_metrics_task(config: &TelemetryConfig) -> Result<MetricsHandle> {
    let (tx, rx) = crossbeam_channel::unbounded();
    METRICS_SENDER
        .set(tx)
        .map_err(|_| anyhow::anyhow!("metrics already started"))?;

    let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
    let interval = Duration::from_secs(config.report_interval_secs.max(1));

    let thread = std::thread::Builder::new()
        .name("qframe-metrics".to_string())
        .spawn(move || run_collector(rx, shutdown_rx, interval))
        .context("spawning metrics thread")?;

    tracing::debug!(interval_secs = interval.as_secs(), "metrics collector started");

    Ok(MetricsHandle {
        thread: Some(thread),
        shutdown_tx: Some(shutdown_tx),
    })
}

fn run_collector(rx: Receiver<MetricsEvent>, shutdown_rx: Receiver<()>, interval: Duration) -> MetricsSummary {
    let mut collector = MetricsCollector::new();
    let ticker = crossbeam_channel::tick(interval);

    loop {
        select! {
            recv(rx) -> event => match event {
                Ok(event) => collector.process_event(event),
                Err(_) => break,
            },
            recv(ticker) -> _ => collector.report(),
            recv(shutdown_rx) -> _ => break,
        }
    }

    for event in rx.try_iter() {
        collector.process_event(event);
    }
    collector.report();
    collector.summary()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_counts_events() {
        let mut collector = MetricsCollector::new();
        collector.process_event(MetricsEvent::FrameDecoded);
        collector.process_event(MetricsEvent::FrameDecoded);
        collector.process_event(MetricsEvent::FrameSizeError);
        collector.process_event(MetricsEvent::FrameDiscarded);
        collector.process_event(MetricsEvent::UnknownFrameSkipped { bytes: 10 });
        collector.process_event(MetricsEvent::PacketBuffered { bytes: 1200, copied: true });
        collector.process_event(MetricsEvent::PacketBuffered { bytes: 800, copied: false });
        collector.process_event(MetricsEvent::BatchFlushed { packets: 2, bytes: 2000 });
        collector.process_event(MetricsEvent::SendBlocked);

        let s = collector.summary();
        assert_eq!(s.frames_decoded, 2);
        assert_eq!(s.frame_size_errors, 1);
        assert_eq!(s.frames_discarded, 1);
        assert_eq!(s.unknown_frames, 1);
        assert_eq!(s.unknown_bytes, 10);
        assert_eq!(s.packets_buffered, 2);
        assert_eq!(s.packets_copied, 1);
        assert_eq!(s.bytes_buffered, 2000);
        assert_eq!(s.batches_flushed, 1);
        assert_eq!(s.packets_sent, 2);
        assert_eq!(s.send_blocked, 1);
        assert_eq!(s.arena_exhausted, 0);
    }

    #[test]
    fn test_collector_thread_drains_on_shutdown() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
        for _ in 0..5 {
            tx.send(MetricsEvent::FrameDecoded).unwrap();
        }
        shutdown_tx.send(()).unwrap();

        let summary = run_collector(rx, shutdown_rx, Duration::from_secs(3600));
        assert_eq!(summary.frames_decoded, 5);
    }

    #[test]
    fn test_disabled_handle() {
        let handle = MetricsHandle::disabled();
        assert!(!handle.is_enabled());
        assert_eq!(handle.shutdown(), None);
    }
}
