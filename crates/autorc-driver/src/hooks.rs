//! 钩子系统
//!
//! 分发器每处理完一帧、每执行一次失效保护时触发回调，
//! 供上层做遥测、录制或测试断言。
//!
//! # 使用示例
//!
//! ```rust
//! use autorc_driver::hooks::{DispatchCallback, HookManager};
//! use autorc_driver::recording::EventRecordingHook;
//! use std::sync::Arc;
//!
//! let mut hooks = HookManager::new();
//! let (hook, _events) = EventRecordingHook::new(64);
//! hooks.add_callback(Arc::new(hook) as Arc<dyn DispatchCallback>);
//! assert_eq!(hooks.len(), 1);
//! ```

use crate::dispatcher::DispatchReport;
use autorc_protocol::CommandFrame;
use std::fmt;
use std::sync::Arc;

/// 失效保护的触发原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FailsafeReason {
    /// 看门狗时间窗内没有收到完整帧
    WatchdogTimeout,
    /// 收到 SHUTDOWN_ALL 命令
    ShutdownCommand,
    /// 控制器停止（`stop()` 或 drop）
    ControllerStopped,
}

impl fmt::Display for FailsafeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::WatchdogTimeout => "watchdog timeout",
            Self::ShutdownCommand => "shutdown command",
            Self::ControllerStopped => "controller stopped",
        };
        f.write_str(s)
    }
}

/// 分发回调 Trait
///
/// 回调在分发任务线程上同步执行，实现必须非阻塞（推荐 `try_send`）。
///
/// # 示例
///
/// ```rust
/// use autorc_driver::hooks::DispatchCallback;
/// use autorc_driver::DispatchReport;
/// use autorc_protocol::CommandFrame;
/// use crossbeam_channel::Sender;
///
/// struct SpeedTap {
///     sender: Sender<u8>,
/// }
///
/// impl DispatchCallback for SpeedTap {
///     fn on_frame_dispatched(&self, frame: &CommandFrame, _report: &DispatchReport) {
///         let _ = self.sender.try_send(frame.speed);
///     }
/// }
/// ```
pub trait DispatchCallback: Send + Sync {
    /// 一帧分发完成后调用（无差异的帧同样触发，`report.is_noop()` 为真）
    fn on_frame_dispatched(&self, frame: &CommandFrame, report: &DispatchReport) {
        let _ = (frame, report);
    }

    /// 执行器被强制置为全部关闭后调用
    fn on_failsafe(&self, reason: FailsafeReason) {
        let _ = reason;
    }
}

/// 钩子管理器
///
/// 由分发器独占，不需要额外同步。
#[derive(Default, Clone)]
pub struct HookManager {
    callbacks: Vec<Arc<dyn DispatchCallback>>,
}

impl HookManager {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            callbacks: Vec::new(),
        }
    }

    /// 添加回调
    pub fn add_callback(&mut self, callback: Arc<dyn DispatchCallback>) {
        self.callbacks.push(callback);
    }

    /// 移除所有回调
    pub fn clear(&mut self) {
        self.callbacks.clear();
    }

    /// 触发所有分发回调
    pub fn trigger_dispatched(&self, frame: &CommandFrame, report: &DispatchReport) {
        for callback in self.callbacks.iter() {
            callback.on_frame_dispatched(frame, report);
        }
    }

    /// 触发所有失效保护回调
    pub fn trigger_failsafe(&self, reason: FailsafeReason) {
        for callback in self.callbacks.iter() {
            callback.on_failsafe(reason);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl fmt::Debug for HookManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookManager")
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}
