//! Builder 模式实现
//!
//! 提供链式构造 `Controller` 实例的便捷方式。

use crate::controller::Controller;
use crate::error::DriverError;
use crate::hooks::{DispatchCallback, HookManager};
use crate::pipeline::PipelineConfig;
use autorc_hal::ActuatorOutputs;
use std::sync::Arc;
use std::time::Duration;

/// Controller Builder（链式构造）
///
/// # Example
///
/// ```
/// use autorc_driver::ControllerBuilder;
/// use autorc_hal::mock::RecordingOutputs;
/// use std::time::Duration;
///
/// let mut controller = ControllerBuilder::new()
///     .watchdog_timeout(Duration::from_millis(500))
///     .byte_timeout(Duration::from_millis(100))
///     .build(RecordingOutputs::new())
///     .unwrap();
///
/// assert_eq!(controller.config().watchdog_timeout_ms, 500);
/// controller.stop().unwrap();
/// ```
#[derive(Debug, Default)]
pub struct ControllerBuilder {
    pipeline_config: PipelineConfig,
    hooks: HookManager,
}

impl ControllerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 整体替换 Pipeline 配置
    pub fn pipeline_config(mut self, config: PipelineConfig) -> Self {
        self.pipeline_config = config;
        self
    }

    /// 看门狗超时（毫秒精度）
    pub fn watchdog_timeout(mut self, timeout: Duration) -> Self {
        self.pipeline_config.watchdog_timeout_ms = duration_ms(timeout);
        self
    }

    /// 单字节等待超时（毫秒精度）
    pub fn byte_timeout(mut self, timeout: Duration) -> Self {
        self.pipeline_config.byte_timeout_ms = duration_ms(timeout);
        self
    }

    /// 字节通道容量
    pub fn byte_channel_capacity(mut self, capacity: usize) -> Self {
        self.pipeline_config.byte_channel_capacity = capacity;
        self
    }

    /// 注册分发回调
    pub fn add_callback(mut self, callback: Arc<dyn DispatchCallback>) -> Self {
        self.hooks.add_callback(callback);
        self
    }

    /// 启动控制器
    ///
    /// # 错误
    /// - `InvalidConfig`: 配置校验失败（如超时为 0）
    /// - `TaskThread`: 线程创建失败
    pub fn build<O>(self, outputs: O) -> Result<Controller, DriverError>
    where
        O: ActuatorOutputs + Send + 'static,
    {
        Controller::start_with_hooks(outputs, self.pipeline_config, self.hooks)
    }
}

fn duration_ms(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}
