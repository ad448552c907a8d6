//! 分发事件录制钩子
//!
//! 把每一次分发和失效保护变成一条事件，经有界通道交给别的线程处理。
//! 通道满时丢事件而不阻塞分发任务。

use crate::dispatcher::DispatchReport;
use crate::hooks::{DispatchCallback, FailsafeReason};
use autorc_protocol::CommandFrame;
use crossbeam_channel::{Receiver, Sender, bounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// 一条分发事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchEvent {
    /// 一帧分发完成
    Dispatched {
        at: Instant,
        frame: CommandFrame,
        report: DispatchReport,
    },
    /// 执行了失效保护
    Failsafe { at: Instant, reason: FailsafeReason },
}

impl DispatchEvent {
    /// 事件发生时间
    pub fn at(&self) -> Instant {
        match self {
            Self::Dispatched { at, .. } | Self::Failsafe { at, .. } => *at,
        }
    }

    /// 如果是失效保护事件，返回原因
    pub fn failsafe_reason(&self) -> Option<FailsafeReason> {
        match self {
            Self::Failsafe { reason, .. } => Some(*reason),
            Self::Dispatched { .. } => None,
        }
    }
}

/// 异步事件录制钩子
///
/// ```rust
/// use autorc_driver::recording::EventRecordingHook;
/// use autorc_driver::hooks::{DispatchCallback, FailsafeReason};
///
/// let (hook, events) = EventRecordingHook::new(16);
/// hook.on_failsafe(FailsafeReason::ShutdownCommand);
///
/// let event = events.try_recv().unwrap();
/// assert_eq!(event.failsafe_reason(), Some(FailsafeReason::ShutdownCommand));
/// ```
#[derive(Debug)]
pub struct EventRecordingHook {
    tx: Sender<DispatchEvent>,
    dropped_events: Arc<AtomicU64>,
    event_counter: Arc<AtomicU64>,
}

impl EventRecordingHook {
    /// 创建录制钩子，返回钩子和事件接收端
    #[must_use]
    pub fn new(capacity: usize) -> (Self, Receiver<DispatchEvent>) {
        let (tx, rx) = bounded(capacity);
        let hook = Self {
            tx,
            dropped_events: Arc::new(AtomicU64::new(0)),
            event_counter: Arc::new(AtomicU64::new(0)),
        };
        (hook, rx)
    }

    /// 丢弃事件计数器（可在注册前克隆持有）
    #[must_use]
    pub fn dropped_events(&self) -> &Arc<AtomicU64> {
        &self.dropped_events
    }

    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// 成功入队的事件计数器
    #[must_use]
    pub fn event_counter(&self) -> &Arc<AtomicU64> {
        &self.event_counter
    }

    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.event_counter.load(Ordering::Relaxed)
    }

    fn push(&self, event: DispatchEvent) {
        if self.tx.try_send(event).is_ok() {
            self.event_counter.fetch_add(1, Ordering::Relaxed);
        } else {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl DispatchCallback for EventRecordingHook {
    #[inline]
    fn on_frame_dispatched(&self, frame: &CommandFrame, report: &DispatchReport) {
        self.push(DispatchEvent::Dispatched {
            at: Instant::now(),
            frame: *frame,
            report: *report,
        });
    }

    #[inline]
    fn on_failsafe(&self, reason: FailsafeReason) {
        self.push(DispatchEvent::Failsafe {
            at: Instant::now(),
            reason,
        });
    }
}
