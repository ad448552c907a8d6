//! AutoRC SDK - 遥控车控制核心
//!
//! 串口字节流 → 4 字节命令帧 → 与已应用命令比较 → 只驱动变化的执行器，
//! 链路静默超过看门狗时间则全部关闭。
//!
//! # 架构设计
//!
//! 分层架构，从底层到高层：
//!
//! - **协议层** (`protocol`): 命令帧、操作码、配件位域、组帧状态机
//! - **硬件抽象层** (`hal`): 串口中断回调、接收开关、执行器输出 trait
//! - **驱动层** (`driver`): 组帧任务、分发任务、执行器控制、控制器生命周期
//!
//! # 快速开始
//!
//! ```rust
//! use autorc_sdk::prelude::*;
//! use autorc_sdk::hal::mock::RecordingOutputs;
//! use std::time::Duration;
//!
//! let mut controller = ControllerBuilder::new()
//!     .watchdog_timeout(Duration::from_secs(1))
//!     .build(RecordingOutputs::new())?;
//!
//! assert_eq!(controller.last_applied(), CommandFrame::safe_default());
//! controller.stop()?;
//! # Ok::<(), DriverError>(())
//! ```

pub use autorc_driver as driver;
pub use autorc_hal as hal;
pub use autorc_protocol as protocol;

pub mod prelude;

// --- 常用类型 ---
pub use driver::{
    Controller, ControllerBuilder, DispatchCallback, DispatchReport, DriverError, FailsafeReason,
    MetricsSnapshot, PipelineConfig,
};
pub use hal::{ActuatorOutputs, HalError, ReceptionControl, SerialIsr};
pub use protocol::{AccessoryMask, CommandFrame, Opcode, ProtocolError};

/// 初始化日志
///
/// 安装 `tracing-subscriber` 的 fmt 输出，过滤规则取自 `RUST_LOG`，缺省为 `info`；
/// 同时把 `log` crate 的记录桥接到 `tracing`。重复调用是空操作。
///
/// 库代码本身从不安装 subscriber，由应用在 `main` 里调用一次。
pub fn init_logger() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_log::LogTracer::init();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
