//! # AutoRC Protocol
//!
//! 遥控车串口命令协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `constants`: 协议常量（操作码范围、转向中位、配件位）
//! - `frame`: 命令帧、操作码、配件位域
//! - `assembler`: 字节流 → 命令帧的组帧状态机
//!
//! ## 帧格式
//!
//! ```text
//! Byte 0: opcode          0xF1..=0xF5
//! Byte 1: traction_speed  0..=255
//! Byte 2: steering_angle  0..=255（150 = 中位）
//! Byte 3: accessory_mask  Bit 7 前灯 / Bit 6 尾灯 / Bit 5 喇叭 / Bit 4-0 保留
//! ```
//!
//! 没有帧头/帧尾分隔符，同步完全依赖操作码范围校验。

pub mod assembler;
pub mod constants;
pub mod frame;

// 重新导出常用类型
pub use assembler::{AssemblyStep, FrameAssembler};
pub use constants::*;
pub use frame::{AccessoryMask, CommandFrame, FrameDelta, Opcode};

use thiserror::Error;

/// 协议解析错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid frame length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Invalid opcode: 0x{opcode:02X}")]
    InvalidOpcode { opcode: u8 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::InvalidLength {
            expected: 4,
            actual: 3,
        };
        assert_eq!(err.to_string(), "Invalid frame length: expected 4, got 3");

        let err = ProtocolError::InvalidOpcode { opcode: 0xAA };
        assert_eq!(err.to_string(), "Invalid opcode: 0xAA");
    }
}
