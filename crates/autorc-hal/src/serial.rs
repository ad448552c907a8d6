//! 串口接收接缝
//!
//! 板卡上 UART 接收中断每收到一个字节就推入队列。
//! 这里用 crossbeam 有界通道替代队列，中断回调只做 `try_send`，
//! 所有解析逻辑都推迟到组帧任务。

use crate::HalError;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::trace;

/// 字节接收开关
///
/// 组帧任务在一个组帧周期开始时打开接收，收满一帧后关闭。
/// 板卡实现可以在这里开关 UART 的接收中断。
pub trait ReceptionControl {
    fn enable_reception(&mut self);
    fn disable_reception(&mut self);
}

/// 软件接收开关
///
/// 与 [`SerialIsr`] 共享同一个标志：关闭期间到达的字节直接丢弃，
/// 等价于接收中断被屏蔽。
#[derive(Debug, Clone, Default)]
pub struct ReceptionGate {
    enabled: Arc<AtomicBool>,
}

impl ReceptionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前是否允许接收
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }
}

impl ReceptionControl for ReceptionGate {
    fn enable_reception(&mut self) {
        self.enabled.store(true, Ordering::Release);
    }

    fn disable_reception(&mut self) {
        self.enabled.store(false, Ordering::Release);
    }
}

/// 串口接收中断回调（生产者一端）
///
/// 可以克隆后交给中断上下文或模拟串口的线程。
///
/// # 性能要求
///
/// - 不阻塞：只调用 `try_send`
/// - 不分配：只更新原子计数器
///
/// # 示例
///
/// ```rust
/// use autorc_hal::{ReceptionControl, serial_channel};
///
/// let (isr, bytes, mut gate) = serial_channel(4);
/// gate.enable_reception();
///
/// isr.on_byte_received(0xF1).unwrap();
/// assert_eq!(bytes.try_recv().unwrap(), 0xF1);
/// ```
#[derive(Debug, Clone)]
pub struct SerialIsr {
    tx: Sender<u8>,
    gate: ReceptionGate,
    overruns: Arc<AtomicU64>,
    gated_drops: Arc<AtomicU64>,
}

impl SerialIsr {
    /// 接收到一个字节（在中断上下文中调用）
    ///
    /// # 错误
    ///
    /// - `ReceptionDisabled`: 接收已关闭，字节被丢弃
    /// - `ChannelFull`: 通道已满，字节被丢弃（计入溢出计数）
    /// - `ChannelClosed`: 组帧任务已退出
    #[inline]
    pub fn on_byte_received(&self, byte: u8) -> Result<(), HalError> {
        if !self.gate.is_enabled() {
            self.gated_drops.fetch_add(1, Ordering::Relaxed);
            return Err(HalError::ReceptionDisabled);
        }

        match self.tx.try_send(byte) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.overruns.fetch_add(1, Ordering::Relaxed);
                trace!("Byte channel full, dropping 0x{:02X}", byte);
                Err(HalError::ChannelFull)
            },
            Err(TrySendError::Disconnected(_)) => Err(HalError::ChannelClosed),
        }
    }

    /// 通道满导致丢弃的字节数
    pub fn overrun_count(&self) -> u64 {
        self.overruns.load(Ordering::Relaxed)
    }

    /// 接收关闭期间丢弃的字节数
    pub fn gated_drop_count(&self) -> u64 {
        self.gated_drops.load(Ordering::Relaxed)
    }

    /// 清零溢出和接收关闭期间的丢弃计数（所有克隆共享同一组计数）
    pub fn reset_counters(&self) {
        self.overruns.store(0, Ordering::Relaxed);
        self.gated_drops.store(0, Ordering::Relaxed);
    }

    /// 接收当前是否打开
    pub fn is_reception_enabled(&self) -> bool {
        self.gate.is_enabled()
    }
}

/// 创建串口字节通道
///
/// 返回中断回调、组帧任务使用的接收端，以及与回调共享的接收开关。
/// 接收开关初始为关闭，由组帧任务在每个周期开始时打开。
pub fn serial_channel(capacity: usize) -> (SerialIsr, Receiver<u8>, ReceptionGate) {
    let (tx, rx) = crossbeam_channel::bounded(capacity);
    let gate = ReceptionGate::new();
    let isr = SerialIsr {
        tx,
        gate: gate.clone(),
        overruns: Arc::new(AtomicU64::new(0)),
        gated_drops: Arc::new(AtomicU64::new(0)),
    };
    (isr, rx, gate)
}
