//! Mock 硬件后端
//!
//! 记录所有执行器写入，供单元测试与集成测试断言“写了什么、没写什么”。

use crate::{ActuatorOutputs, DriveIndicator, HalError, ReceptionControl, SteeringIndicator};
use parking_lot::Mutex;
use std::sync::Arc;

/// 默认每周期计数（模拟 50Hz PWM，204 MHz 时钟）
pub const MOCK_TICKS_PER_CYCLE: u32 = 4_080_000;

/// 一次硬件写入
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputWrite {
    TractionDuty(u32),
    Direction { forward: bool, backward: bool },
    SteeringDuty(u32),
    Horn(bool),
    DriveIndicator(Option<DriveIndicator>),
    SteeringIndicator(Option<SteeringIndicator>),
}

impl OutputWrite {
    /// 是否属于牵引子系统
    pub fn is_traction(&self) -> bool {
        matches!(
            self,
            Self::TractionDuty(_) | Self::Direction { .. } | Self::DriveIndicator(_)
        )
    }

    /// 是否属于转向子系统
    pub fn is_steering(&self) -> bool {
        matches!(self, Self::SteeringDuty(_) | Self::SteeringIndicator(_))
    }

    /// 是否属于配件子系统
    pub fn is_accessory(&self) -> bool {
        matches!(self, Self::Horn(_))
    }
}

#[derive(Debug, Default)]
struct RecorderState {
    writes: Vec<OutputWrite>,
    fail_steering: bool,
}

/// 记录型执行器输出
///
/// 克隆出来的实例共享同一份写入记录：一份交给控制器线程，一份留在测试里断言。
#[derive(Debug, Clone)]
pub struct RecordingOutputs {
    ticks_per_cycle: u32,
    state: Arc<Mutex<RecorderState>>,
}

impl Default for RecordingOutputs {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingOutputs {
    pub fn new() -> Self {
        Self::with_ticks_per_cycle(MOCK_TICKS_PER_CYCLE)
    }

    pub fn with_ticks_per_cycle(ticks_per_cycle: u32) -> Self {
        Self {
            ticks_per_cycle,
            state: Arc::new(Mutex::new(RecorderState::default())),
        }
    }

    /// 取走并清空所有写入记录
    pub fn take_writes(&self) -> Vec<OutputWrite> {
        std::mem::take(&mut self.state.lock().writes)
    }

    /// 当前写入记录的拷贝
    pub fn writes(&self) -> Vec<OutputWrite> {
        self.state.lock().writes.clone()
    }

    /// 写入次数
    pub fn write_count(&self) -> usize {
        self.state.lock().writes.len()
    }

    /// 让转向 PWM 写入失败（模拟外设故障）
    pub fn set_fail_steering(&self, fail: bool) {
        self.state.lock().fail_steering = fail;
    }

    fn record(&self, write: OutputWrite) {
        self.state.lock().writes.push(write);
    }
}

impl ActuatorOutputs for RecordingOutputs {
    fn ticks_per_cycle(&self) -> u32 {
        self.ticks_per_cycle
    }

    fn set_traction_duty(&mut self, ticks: u32) -> Result<(), HalError> {
        self.record(OutputWrite::TractionDuty(ticks));
        Ok(())
    }

    fn set_direction(&mut self, forward: bool, backward: bool) -> Result<(), HalError> {
        self.record(OutputWrite::Direction { forward, backward });
        Ok(())
    }

    fn set_steering_duty(&mut self, ticks: u32) -> Result<(), HalError> {
        if self.state.lock().fail_steering {
            return Err(HalError::output("steering_pwm", "mock failure"));
        }
        self.record(OutputWrite::SteeringDuty(ticks));
        Ok(())
    }

    fn set_horn(&mut self, on: bool) -> Result<(), HalError> {
        self.record(OutputWrite::Horn(on));
        Ok(())
    }

    fn set_drive_indicator(&mut self, indicator: Option<DriveIndicator>) -> Result<(), HalError> {
        self.record(OutputWrite::DriveIndicator(indicator));
        Ok(())
    }

    fn set_steering_indicator(
        &mut self,
        indicator: Option<SteeringIndicator>,
    ) -> Result<(), HalError> {
        self.record(OutputWrite::SteeringIndicator(indicator));
        Ok(())
    }
}

/// 接收开关事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceptionEvent {
    Enabled,
    Disabled,
}

/// 记录型接收开关
#[derive(Debug, Clone, Default)]
pub struct RecordingReception {
    events: Arc<Mutex<Vec<ReceptionEvent>>>,
}

impl RecordingReception {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ReceptionEvent> {
        self.events.lock().clone()
    }
}

impl ReceptionControl for RecordingReception {
    fn enable_reception(&mut self) {
        self.events.lock().push(ReceptionEvent::Enabled);
    }

    fn disable_reception(&mut self) {
        self.events.lock().push(ReceptionEvent::Disabled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_outputs_shared_log() {
        let outputs = RecordingOutputs::new();
        let mut worker = outputs.clone();

        worker.set_horn(true).unwrap();
        worker.set_traction_duty(42).unwrap();

        assert_eq!(
            outputs.take_writes(),
            vec![OutputWrite::Horn(true), OutputWrite::TractionDuty(42)]
        );
        assert_eq!(outputs.write_count(), 0);
    }

    #[test]
    fn test_recording_outputs_steering_failure() {
        let mut outputs = RecordingOutputs::new();
        outputs.set_fail_steering(true);
        assert!(outputs.set_steering_duty(100).is_err());
        assert!(outputs.writes().is_empty());
    }

    #[test]
    fn test_write_classification() {
        assert!(OutputWrite::TractionDuty(0).is_traction());
        assert!(OutputWrite::DriveIndicator(None).is_traction());
        assert!(OutputWrite::SteeringIndicator(Some(SteeringIndicator::Center)).is_steering());
        assert!(OutputWrite::Horn(false).is_accessory());
        assert!(!OutputWrite::Horn(false).is_traction());
    }
}
