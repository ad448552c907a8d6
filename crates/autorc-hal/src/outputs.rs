//! 执行器输出接口
//!
//! 控制核心只通过这个 trait 写硬件。所有写入必须是幂等且非阻塞的：
//! 同一个值写两次与写一次效果相同，调用立即返回。

use crate::HalError;

/// 牵引方向指示灯（三选一）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriveIndicator {
    /// 前进（LED 3）
    Forward,
    /// 后退（LED 1）
    Reverse,
    /// 刹车（LED 2）
    Brake,
}

/// 转向指示灯颜色（RGB 三选一）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SteeringIndicator {
    /// 角度小于中位（绿）
    Left,
    /// 角度大于中位（红）
    Right,
    /// 中位（蓝）
    Center,
}

/// 执行器硬件输出
///
/// 板卡实现负责 PWM 通道、方向脚、喇叭脚和指示灯的寄存器写入。
pub trait ActuatorOutputs {
    /// 每个 PWM 周期的计数值（由 PWM 外设在初始化后报告）
    fn ticks_per_cycle(&self) -> u32;

    /// 牵引 PWM 占空比（计数值）
    fn set_traction_duty(&mut self, ticks: u32) -> Result<(), HalError>;

    /// 前进/后退方向脚电平
    ///
    /// 两脚同时为高是刹车/滑行安全态，只在全部关闭时使用。
    fn set_direction(&mut self, forward: bool, backward: bool) -> Result<(), HalError>;

    /// 转向 PWM 占空比（计数值）
    fn set_steering_duty(&mut self, ticks: u32) -> Result<(), HalError>;

    /// 喇叭输出电平
    fn set_horn(&mut self, on: bool) -> Result<(), HalError>;

    /// 牵引指示灯；`None` 表示全灭
    fn set_drive_indicator(&mut self, indicator: Option<DriveIndicator>) -> Result<(), HalError>;

    /// 转向指示灯；`None` 表示全灭
    fn set_steering_indicator(
        &mut self,
        indicator: Option<SteeringIndicator>,
    ) -> Result<(), HalError>;
}

impl<T: ActuatorOutputs + ?Sized> ActuatorOutputs for Box<T> {
    fn ticks_per_cycle(&self) -> u32 {
        (**self).ticks_per_cycle()
    }

    fn set_traction_duty(&mut self, ticks: u32) -> Result<(), HalError> {
        (**self).set_traction_duty(ticks)
    }

    fn set_direction(&mut self, forward: bool, backward: bool) -> Result<(), HalError> {
        (**self).set_direction(forward, backward)
    }

    fn set_steering_duty(&mut self, ticks: u32) -> Result<(), HalError> {
        (**self).set_steering_duty(ticks)
    }

    fn set_horn(&mut self, on: bool) -> Result<(), HalError> {
        (**self).set_horn(on)
    }

    fn set_drive_indicator(&mut self, indicator: Option<DriveIndicator>) -> Result<(), HalError> {
        (**self).set_drive_indicator(indicator)
    }

    fn set_steering_indicator(
        &mut self,
        indicator: Option<SteeringIndicator>,
    ) -> Result<(), HalError> {
        (**self).set_steering_indicator(indicator)
    }
}
