//! 驱动层模块
//!
//! 控制核心的两个任务及其生命周期：
//! - 组帧任务：在分发器的恢复请求下收集一帧，丢弃非操作码的帧头字节
//! - 分发任务：看门狗限时等待帧就绪，按字段差异驱动执行器，超时则全部关闭
//! - 执行器控制：速度/角度到 PWM 计数的换算与指示灯
//! - 钩子系统与运行指标
//!
//! # 使用场景
//!
//! 板卡代码实现 [`autorc_hal::ActuatorOutputs`]，用 [`ControllerBuilder`] 启动控制器，
//! 再把 [`Controller::isr`] 返回的回调接到 UART 接收中断上。

pub mod actuator;
mod builder;
mod controller;
pub mod dispatcher;
mod error;
pub mod hooks;
pub mod metrics;
pub mod pipeline;
pub mod recording;

pub use actuator::ActuatorControl;
pub use builder::ControllerBuilder;
pub use controller::Controller;
pub use dispatcher::{DispatchReport, Dispatcher};
pub use error::DriverError;
pub use hooks::{DispatchCallback, FailsafeReason, HookManager};
pub use metrics::{ControllerMetrics, MetricsSnapshot};
pub use pipeline::{
    AssembledFrame, AssemblerChannels, AssemblyRequest, DispatcherChannels, PipelineConfig,
    assemble_loop, dispatch_loop, pipeline_channels,
};
pub use recording::{DispatchEvent, EventRecordingHook};
