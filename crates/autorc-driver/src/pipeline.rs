//! 组帧任务与分发任务
//!
//! 两个任务严格交替：分发器发出一次“恢复”请求，组帧器完成一个组帧周期，
//! 通过“帧就绪”通道交回一帧。两个方向的通道都只有一个槽位。
//!
//! 每个恢复请求都带着分发器的看门狗截止时间。截止时间一过，
//! 组帧器放弃当前周期（丢弃半帧），分发器执行全部关闭并开始下一周期。
//! 迟到的帧带着旧的周期号，分发器会将其丢弃。

use crate::dispatcher::Dispatcher;
use crate::error::DriverError;
use crate::hooks::FailsafeReason;
use crate::metrics::ControllerMetrics;
use autorc_hal::{ActuatorOutputs, ReceptionControl};
use autorc_protocol::{AssemblyStep, CommandFrame, FrameAssembler};
use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Pipeline 配置
///
/// # Example
///
/// ```
/// use autorc_driver::PipelineConfig;
///
/// // 默认配置（看门狗 30s，单字节超时 30s，字节通道容量 4）
/// let config = PipelineConfig::default();
/// assert!(config.validate().is_ok());
///
/// let config = PipelineConfig {
///     watchdog_timeout_ms: 500,
///     ..Default::default()
/// };
/// assert_eq!(config.watchdog_timeout().as_millis(), 500);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PipelineConfig {
    /// 看门狗超时（毫秒）：这段时间内没有完整帧就全部关闭
    pub watchdog_timeout_ms: u64,
    /// 单字节等待超时（毫秒）：超时不写入任何东西，继续等待
    pub byte_timeout_ms: u64,
    /// 中断回调到组帧任务的字节通道容量
    pub byte_channel_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            watchdog_timeout_ms: 30_000,
            byte_timeout_ms: 30_000,
            byte_channel_capacity: 4,
        }
    }
}

impl PipelineConfig {
    /// 校验配置，任何一项为 0 都是无效配置
    pub fn validate(&self) -> Result<(), DriverError> {
        if self.watchdog_timeout_ms == 0 {
            return Err(DriverError::InvalidConfig(
                "watchdog_timeout_ms must be non-zero".to_string(),
            ));
        }
        if self.byte_timeout_ms == 0 {
            return Err(DriverError::InvalidConfig(
                "byte_timeout_ms must be non-zero".to_string(),
            ));
        }
        if self.byte_channel_capacity == 0 {
            return Err(DriverError::InvalidConfig(
                "byte_channel_capacity must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn watchdog_timeout(&self) -> Duration {
        Duration::from_millis(self.watchdog_timeout_ms)
    }

    pub fn byte_timeout(&self) -> Duration {
        Duration::from_millis(self.byte_timeout_ms)
    }
}

/// 恢复请求（分发器 → 组帧器）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssemblyRequest {
    /// 周期号，单调递增
    pub cycle: u64,
    /// 分发器放弃等待的时刻
    pub deadline: Instant,
}

/// 帧就绪（组帧器 → 分发器）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssembledFrame {
    pub cycle: u64,
    pub frame: CommandFrame,
}

/// 组帧任务持有的通道端
#[derive(Debug)]
pub struct AssemblerChannels {
    pub bytes: Receiver<u8>,
    pub resume_rx: Receiver<AssemblyRequest>,
    pub ready_tx: Sender<AssembledFrame>,
    /// 停止信号：发送端被 drop 时断开
    pub stop_rx: Receiver<()>,
}

/// 分发任务持有的通道端
#[derive(Debug)]
pub struct DispatcherChannels {
    pub resume_tx: Sender<AssemblyRequest>,
    pub ready_rx: Receiver<AssembledFrame>,
    pub stop_rx: Receiver<()>,
}

/// 创建两个任务之间的握手通道（各一个槽位）
pub fn pipeline_channels(
    bytes: Receiver<u8>,
    stop_rx: Receiver<()>,
) -> (AssemblerChannels, DispatcherChannels) {
    let (resume_tx, resume_rx) = crossbeam_channel::bounded(1);
    let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
    (
        AssemblerChannels {
            bytes,
            resume_rx,
            ready_tx,
            stop_rx: stop_rx.clone(),
        },
        DispatcherChannels {
            resume_tx,
            ready_rx,
            stop_rx,
        },
    )
}

/// 一个组帧周期的结果
enum CycleOutcome {
    Frame(CommandFrame),
    /// 截止时间已过，半帧丢弃
    Abandoned,
    /// 所有字节发送端都已释放
    SourceClosed,
    Stopped,
}

/// 设置当前线程为实时优先级（可选 feature）
#[cfg(feature = "realtime")]
fn set_realtime_priority(task: &str) {
    use thread_priority::*;
    use tracing::info;

    match set_current_thread_priority(ThreadPriority::Max) {
        Ok(_) => {
            info!("{} thread priority set to MAX (realtime)", task);
        },
        Err(e) => {
            warn!(
                "Failed to set {} thread priority: {}. \
                On Linux, you may need to run with CAP_SYS_NICE or use rtkit.",
                task, e
            );
        },
    }
}

#[cfg(not(feature = "realtime"))]
fn set_realtime_priority(_task: &str) {}

/// 组帧任务循环
///
/// 每个周期：等待恢复请求 → 打开接收 → 收集一帧 → 关闭接收 → 发出帧就绪。
///
/// # 参数
/// - `reception`: 接收开关（板卡上对应 UART 接收中断使能）
/// - `channels`: 组帧任务一侧的通道端
/// - `config`: Pipeline 配置
/// - `metrics`: 运行指标
pub fn assemble_loop<R: ReceptionControl>(
    mut reception: R,
    channels: AssemblerChannels,
    config: PipelineConfig,
    metrics: Arc<ControllerMetrics>,
) {
    set_realtime_priority("Assembler");

    let mut assembler = FrameAssembler::new();
    let byte_timeout = config.byte_timeout();

    loop {
        let request = crossbeam_channel::select! {
            recv(channels.resume_rx) -> msg => match msg {
                Ok(request) => request,
                Err(_) => {
                    trace!("Assembler: resume channel disconnected");
                    break;
                },
            },
            recv(channels.stop_rx) -> _ => break,
        };

        assembler.reset();
        reception.enable_reception();
        let outcome = collect_frame(&mut assembler, &channels, byte_timeout, request, &metrics);
        reception.disable_reception();

        match outcome {
            CycleOutcome::Frame(frame) => {
                metrics.frames_assembled.fetch_add(1, Ordering::Relaxed);
                trace!("Assembler: cycle {} frame {:?}", request.cycle, frame.to_bytes());
                let ready = AssembledFrame {
                    cycle: request.cycle,
                    frame,
                };
                let sent = crossbeam_channel::select! {
                    send(channels.ready_tx, ready) -> res => res.is_ok(),
                    recv(channels.stop_rx) -> _ => false,
                };
                if !sent {
                    break;
                }
            },
            CycleOutcome::Abandoned => {
                metrics.assembly_aborts.fetch_add(1, Ordering::Relaxed);
                debug!(
                    "Assembler: cycle {} abandoned at position {}",
                    request.cycle,
                    assembler.position()
                );
            },
            CycleOutcome::SourceClosed => {
                warn!("Assembler: byte source closed, exiting");
                break;
            },
            CycleOutcome::Stopped => break,
        }
    }

    trace!("Assembler: loop exited");
}

/// 收集一帧，直到完成、截止时间到或停止
fn collect_frame(
    assembler: &mut FrameAssembler,
    channels: &AssemblerChannels,
    byte_timeout: Duration,
    request: AssemblyRequest,
    metrics: &ControllerMetrics,
) -> CycleOutcome {
    loop {
        let now = Instant::now();
        if now >= request.deadline {
            return CycleOutcome::Abandoned;
        }
        let wait = request.deadline.saturating_duration_since(now).min(byte_timeout);

        let byte = crossbeam_channel::select! {
            recv(channels.bytes) -> msg => match msg {
                Ok(byte) => byte,
                Err(_) => return CycleOutcome::SourceClosed,
            },
            recv(channels.stop_rx) -> _ => return CycleOutcome::Stopped,
            default(wait) => {
                // 单字节超时：什么都不写，继续等
                trace!("Assembler: no byte within {:?}", wait);
                continue;
            },
        };

        metrics.bytes_received.fetch_add(1, Ordering::Relaxed);
        match assembler.push(byte) {
            AssemblyStep::Discarded(b) => {
                metrics.bytes_discarded.fetch_add(1, Ordering::Relaxed);
                trace!("Assembler: discarded 0x{:02X}", b);
            },
            AssemblyStep::Pending(_) => {},
            AssemblyStep::Complete(frame) => return CycleOutcome::Frame(frame),
        }
    }
}

/// 一次等待帧就绪的结果
enum WaitOutcome {
    Frame(CommandFrame),
    Timeout,
    Stopped,
}

/// 分发任务循环
///
/// 每个周期：发出恢复请求 → 在看门狗截止时间前等待帧就绪 →
/// 有帧则差异分发，超时则全部关闭。退出前执行一次全部关闭。
pub fn dispatch_loop<O: ActuatorOutputs>(
    mut dispatcher: Dispatcher<O>,
    channels: DispatcherChannels,
    config: PipelineConfig,
) {
    set_realtime_priority("Dispatcher");

    let metrics = dispatcher.metrics().clone();
    let watchdog = config.watchdog_timeout();
    let mut cycle: u64 = 0;

    loop {
        cycle += 1;
        let request = AssemblyRequest {
            cycle,
            deadline: Instant::now() + watchdog,
        };

        let resumed = crossbeam_channel::select! {
            send(channels.resume_tx, request) -> res => res.is_ok(),
            recv(channels.stop_rx) -> _ => false,
        };
        if !resumed {
            break;
        }

        match wait_for_frame(&channels, request, &metrics) {
            WaitOutcome::Frame(frame) => {
                dispatcher.dispatch(&frame);
            },
            WaitOutcome::Timeout => {
                metrics.watchdog_timeouts.fetch_add(1, Ordering::Relaxed);
                warn!("No frame within {:?}, forcing shutdown", watchdog);
                dispatcher.failsafe(FailsafeReason::WatchdogTimeout);
            },
            WaitOutcome::Stopped => break,
        }
    }

    dispatcher.failsafe(FailsafeReason::ControllerStopped);
    trace!("Dispatcher: loop exited");
}

fn wait_for_frame(
    channels: &DispatcherChannels,
    request: AssemblyRequest,
    metrics: &ControllerMetrics,
) -> WaitOutcome {
    loop {
        let timeout = request.deadline.saturating_duration_since(Instant::now());
        let assembled = crossbeam_channel::select! {
            recv(channels.ready_rx) -> msg => match msg {
                Ok(assembled) => assembled,
                Err(_) => {
                    trace!("Dispatcher: ready channel disconnected");
                    return WaitOutcome::Stopped;
                },
            },
            recv(channels.stop_rx) -> _ => return WaitOutcome::Stopped,
            default(timeout) => return WaitOutcome::Timeout,
        };

        if assembled.cycle != request.cycle {
            metrics.stale_frames.fetch_add(1, Ordering::Relaxed);
            debug!(
                "Dispatcher: dropping stale frame from cycle {} (current {})",
                assembled.cycle, request.cycle
            );
            continue;
        }
        return WaitOutcome::Frame(assembled.frame);
    }
}
