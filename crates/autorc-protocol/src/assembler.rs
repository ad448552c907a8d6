//! 组帧状态机
//!
//! 把串口逐字节到达的数据拼成 4 字节命令帧。没有帧头分隔符，
//! 唯一的同步手段是“位置 0 必须是合法操作码”：
//! - 位置 0 收到非法字节 → 丢弃，继续在位置 0 扫描
//! - 位置 0 合法 → 顺序收集位置 1..=3
//! - 收满 4 字节 → 产出一帧并回到位置 0
//!
//! 状态机本身不做 IO，也不关心超时；等待字节、超时处理由驱动层的组帧任务负责。

use crate::constants::FRAME_LEN;
use crate::frame::{CommandFrame, Opcode};

/// 单个字节推入后的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyStep {
    /// 字节被丢弃（位置 0 不是合法操作码）
    Discarded(u8),
    /// 字节已写入，等待更多字节；值为下一个待写位置
    Pending(usize),
    /// 收满一帧
    Complete(CommandFrame),
}

/// 组帧器状态
///
/// 仅由组帧任务持有：当前位置与正在拼装的缓冲区。
/// 分发器只会拿到 `AssemblyStep::Complete` 中的完整拷贝。
///
/// # Example
///
/// ```
/// use autorc_protocol::{AssemblyStep, FrameAssembler, Opcode};
///
/// let mut assembler = FrameAssembler::new();
/// let mut frame = None;
/// for byte in [0xAA, 0xF1, 80, 150, 0x20] {
///     if let AssemblyStep::Complete(f) = assembler.push(byte) {
///         frame = Some(f);
///     }
/// }
/// let frame = frame.unwrap();
/// assert_eq!(frame.opcode, Opcode::DriveForward);
/// assert_eq!(frame.speed, 80);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FrameAssembler {
    buffer: [u8; FRAME_LEN],
    position: usize,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 回到位置 0，丢弃半帧
    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// 下一个待写位置（0..=3）
    pub fn position(&self) -> usize {
        self.position
    }

    /// 是否正处于一帧的中间
    pub fn is_mid_frame(&self) -> bool {
        self.position != 0
    }

    /// 推入一个字节
    pub fn push(&mut self, byte: u8) -> AssemblyStep {
        if self.position == 0 && !Opcode::is_valid(byte) {
            return AssemblyStep::Discarded(byte);
        }

        self.buffer[self.position] = byte;
        self.position += 1;

        if self.position < FRAME_LEN {
            return AssemblyStep::Pending(self.position);
        }

        self.position = 0;
        match CommandFrame::from_bytes(self.buffer) {
            Ok(frame) => AssemblyStep::Complete(frame),
            // 位置 0 已校验，这里不可能失败；失败时当作丢弃处理
            Err(_) => AssemblyStep::Discarded(self.buffer[0]),
        }
    }

    /// 批量推入，返回其中完成的所有帧
    pub fn extend(&mut self, bytes: &[u8]) -> Vec<CommandFrame> {
        bytes
            .iter()
            .filter_map(|&byte| match self.push(byte) {
                AssemblyStep::Complete(frame) => Some(frame),
                _ => None,
            })
            .collect()
    }
}
