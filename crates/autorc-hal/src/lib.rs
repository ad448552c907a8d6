//! # AutoRC Hardware Abstraction Layer
//!
//! 控制核心与外设之间的接缝：
//!
//! - **串口接收**：中断上下文只做一件事，把字节非阻塞地塞进有界通道
//!   （[`SerialIsr`]），组帧任务从通道另一端取字节。
//! - **接收开关**：组帧任务在一个组帧周期前后打开/关闭接收（[`ReceptionControl`]）。
//! - **执行器输出**：牵引 PWM、方向脚、转向 PWM、喇叭、指示灯（[`ActuatorOutputs`]）。
//!
//! 寄存器级访问（UART、PWM 占空比寄存器、GPIO 电平）不在本 crate 内实现，
//! 由具体板卡的 trait 实现提供。

use thiserror::Error;

pub mod outputs;
pub mod reader;
pub mod serial;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use outputs::{ActuatorOutputs, DriveIndicator, SteeringIndicator};
pub use reader::{ReaderByteSource, ReaderExit};
pub use serial::{ReceptionControl, ReceptionGate, SerialIsr, serial_channel};

/// 硬件层统一错误类型
#[derive(Error, Debug)]
pub enum HalError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    /// 字节通道已满（组帧任务没跟上）
    #[error("Byte channel full")]
    ChannelFull,
    /// 字节通道已关闭（组帧任务已退出）
    #[error("Byte channel closed")]
    ChannelClosed,
    /// 接收中断处于关闭状态
    #[error("Reception disabled")]
    ReceptionDisabled,
    /// 外设写入失败
    #[error("Output error on {output}: {message}")]
    Output {
        output: &'static str,
        message: String,
    },
}

impl HalError {
    /// 构造外设写入错误
    pub fn output(output: &'static str, message: impl Into<String>) -> Self {
        Self::Output {
            output,
            message: message.into(),
        }
    }
}
