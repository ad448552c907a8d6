//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use autorc_sdk::prelude::*;
//! ```

// 驱动层
pub use crate::driver::{
    Controller, ControllerBuilder, DispatchCallback, DispatchReport, FailsafeReason,
    MetricsSnapshot, PipelineConfig,
};

// 硬件抽象层（板卡需要实现的 Trait）
pub use crate::hal::{ActuatorOutputs, DriveIndicator, ReceptionControl, SerialIsr, SteeringIndicator};

// 协议层
pub use crate::protocol::{AccessoryMask, CENTER_ANGLE, CommandFrame, Opcode};

// 错误类型
pub use crate::driver::DriverError;
pub use crate::hal::HalError;
pub use crate::protocol::ProtocolError;
