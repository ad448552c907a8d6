//! 控制器运行指标
//!
//! 原子计数器，组帧任务与分发任务各自更新，任意线程都可以无锁读取快照。

use std::sync::atomic::{AtomicU64, Ordering};

/// 控制器实时指标
///
/// # 使用示例
///
/// ```rust
/// use autorc_driver::ControllerMetrics;
/// use std::sync::atomic::Ordering;
///
/// let metrics = ControllerMetrics::new();
/// metrics.frames_assembled.fetch_add(1, Ordering::Relaxed);
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.frames_assembled, 1);
/// ```
#[derive(Debug, Default)]
pub struct ControllerMetrics {
    /// 组帧任务从通道取到的字节数
    pub bytes_received: AtomicU64,

    /// 位置 0 上被丢弃的非操作码字节数
    pub bytes_discarded: AtomicU64,

    /// 组装完成的帧数
    pub frames_assembled: AtomicU64,

    /// 分发器处理的帧数（包括无差异的帧）
    pub frames_dispatched: AtomicU64,

    /// 看门狗超时次数（每次都触发一次全部关闭）
    pub watchdog_timeouts: AtomicU64,

    /// 因超过看门狗截止时间而放弃的组帧周期数
    pub assembly_aborts: AtomicU64,

    /// 分发器收到的过期帧（属于已超时周期）
    pub stale_frames: AtomicU64,

    /// 被拒绝的输入（如转向角 0）
    pub rejected_inputs: AtomicU64,

    /// 执行器硬件写入失败次数
    pub actuator_errors: AtomicU64,
}

impl ControllerMetrics {
    /// 创建新的指标实例（所有计数器初始化为 0）
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取指标快照
    ///
    /// 各计数器分别以 `Relaxed` 读取，彼此之间可能有微小的时间差。
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            bytes_discarded: self.bytes_discarded.load(Ordering::Relaxed),
            frames_assembled: self.frames_assembled.load(Ordering::Relaxed),
            frames_dispatched: self.frames_dispatched.load(Ordering::Relaxed),
            watchdog_timeouts: self.watchdog_timeouts.load(Ordering::Relaxed),
            assembly_aborts: self.assembly_aborts.load(Ordering::Relaxed),
            stale_frames: self.stale_frames.load(Ordering::Relaxed),
            rejected_inputs: self.rejected_inputs.load(Ordering::Relaxed),
            actuator_errors: self.actuator_errors.load(Ordering::Relaxed),
            isr_overruns: 0,
        }
    }

    /// 重置所有计数器
    pub fn reset(&self) {
        self.bytes_received.store(0, Ordering::Relaxed);
        self.bytes_discarded.store(0, Ordering::Relaxed);
        self.frames_assembled.store(0, Ordering::Relaxed);
        self.frames_dispatched.store(0, Ordering::Relaxed);
        self.watchdog_timeouts.store(0, Ordering::Relaxed);
        self.assembly_aborts.store(0, Ordering::Relaxed);
        self.stale_frames.store(0, Ordering::Relaxed);
        self.rejected_inputs.store(0, Ordering::Relaxed);
        self.actuator_errors.store(0, Ordering::Relaxed);
    }
}

/// 指标快照（不可变，用于读取）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub bytes_received: u64,
    pub bytes_discarded: u64,
    pub frames_assembled: u64,
    pub frames_dispatched: u64,
    pub watchdog_timeouts: u64,
    pub assembly_aborts: u64,
    pub stale_frames: u64,
    pub rejected_inputs: u64,
    pub actuator_errors: u64,
    /// 中断回调因通道满丢弃的字节数（由 `SerialIsr` 统计）
    pub isr_overruns: u64,
}

impl MetricsSnapshot {
    /// 组帧成功率（组成帧所用字节 / 收到的字节）
    pub fn framing_efficiency(&self) -> f64 {
        if self.bytes_received == 0 {
            return 1.0;
        }
        let framed = self.frames_assembled * autorc_protocol::FRAME_LEN as u64;
        framed as f64 / self.bytes_received as f64
    }
}
