//! 执行器控制
//!
//! 把命令字段翻译成硬件写入：牵引、转向、配件、全部关闭。
//! 除了由 PWM 外设报告的每周期计数之外不保存任何状态，
//! “要不要写”由分发器根据帧差异决定，这里只负责“怎么写”。

use crate::error::DriverError;
use autorc_hal::{ActuatorOutputs, DriveIndicator, SteeringIndicator};
use autorc_protocol::{
    AccessoryMask, CENTER_ANGLE, Opcode, SPEED_FULL_SCALE, STEERING_TICKS_NUMERATOR,
};
use tracing::{debug, trace};

/// 执行器控制器
pub struct ActuatorControl<O> {
    outputs: O,
    ticks_per_cycle: u32,
}

impl<O: ActuatorOutputs> ActuatorControl<O> {
    /// 创建执行器控制器，从硬件读取每周期计数
    pub fn new(outputs: O) -> Self {
        let ticks_per_cycle = outputs.ticks_per_cycle();
        Self {
            outputs,
            ticks_per_cycle,
        }
    }

    /// PWM 每周期计数
    pub fn ticks_per_cycle(&self) -> u32 {
        self.ticks_per_cycle
    }

    /// 速度 → 牵引占空比计数：`ticks_per_cycle * speed / 255`
    pub fn traction_ticks(&self, speed: u8) -> u32 {
        let ticks = u64::from(self.ticks_per_cycle) * u64::from(speed) / u64::from(SPEED_FULL_SCALE);
        // speed <= 255，结果不会超过 ticks_per_cycle
        ticks as u32
    }

    /// 角度 → 转向占空比计数：`ticks_per_cycle * K / angle`
    ///
    /// 角度为 0 时返回 `None`。
    pub fn steering_ticks(&self, angle: u8) -> Option<u32> {
        if angle == 0 {
            return None;
        }
        let ticks = u64::from(self.ticks_per_cycle) * u64::from(STEERING_TICKS_NUMERATOR)
            / u64::from(angle);
        Some(u32::try_from(ticks).unwrap_or(u32::MAX))
    }

    /// 牵引控制
    ///
    /// - 前进/后退：按速度设置占空比，方向脚互斥，点亮对应指示灯
    /// - 刹车：占空比清零，两个方向脚都拉低
    ///
    /// # 错误
    /// - `InvalidInput`: 操作码不是牵引类命令
    /// - `Hal`: 硬件写入失败
    pub fn traction(&mut self, opcode: Opcode, speed: u8) -> Result<(), DriverError> {
        let ticks = self.traction_ticks(speed);
        match opcode {
            Opcode::DriveForward => {
                self.outputs.set_traction_duty(ticks)?;
                self.outputs.set_direction(true, false)?;
                self.outputs.set_drive_indicator(Some(DriveIndicator::Forward))?;
            },
            Opcode::DriveReverse => {
                self.outputs.set_traction_duty(ticks)?;
                self.outputs.set_direction(false, true)?;
                self.outputs.set_drive_indicator(Some(DriveIndicator::Reverse))?;
            },
            Opcode::Brake => {
                self.outputs.set_traction_duty(0)?;
                self.outputs.set_direction(false, false)?;
                self.outputs.set_drive_indicator(Some(DriveIndicator::Brake))?;
            },
            other => {
                return Err(DriverError::InvalidInput(format!(
                    "{:?} is not a traction command",
                    other
                )));
            },
        }
        trace!("Traction {:?} speed={} ticks={}", opcode, speed, ticks);
        Ok(())
    }

    /// 转向控制
    ///
    /// # 错误
    /// - `InvalidInput`: 角度为 0（换算公式除零），不写硬件
    /// - `Hal`: 硬件写入失败
    pub fn steering(&mut self, angle: u8) -> Result<(), DriverError> {
        let ticks = self.steering_ticks(angle).ok_or_else(|| {
            DriverError::InvalidInput("steering angle must be non-zero".to_string())
        })?;

        self.outputs.set_steering_duty(ticks)?;
        let indicator = match angle.cmp(&CENTER_ANGLE) {
            std::cmp::Ordering::Less => SteeringIndicator::Left,
            std::cmp::Ordering::Greater => SteeringIndicator::Right,
            std::cmp::Ordering::Equal => SteeringIndicator::Center,
        };
        self.outputs.set_steering_indicator(Some(indicator))?;
        trace!("Steering angle={} ticks={}", angle, ticks);
        Ok(())
    }

    /// 配件控制
    ///
    /// 只有喇叭接到了硬件；灯光位不产生写入。
    pub fn accessories(&mut self, mask: AccessoryMask) -> Result<(), DriverError> {
        self.outputs.set_horn(mask.horn())?;
        trace!("Accessories mask=0b{:08b}", mask.bits());
        Ok(())
    }

    /// 全部关闭：转向回中（转向指示灯显示居中）、牵引占空比清零且两个方向脚都拉高、
    /// 行驶指示灯熄灭、喇叭关闭
    ///
    /// 即使某一项写入失败也会继续尝试其余各项，返回第一个错误。
    pub fn shutdown(&mut self) -> Result<(), DriverError> {
        let center_ticks = self.steering_ticks(CENTER_ANGLE).unwrap_or_default();

        let results = [
            self.outputs.set_steering_duty(center_ticks),
            self.outputs.set_traction_duty(0),
            self.outputs.set_direction(true, true),
            self.outputs.set_drive_indicator(None),
            self.outputs.set_steering_indicator(Some(SteeringIndicator::Center)),
            self.outputs.set_horn(false),
        ];

        debug!("Actuators shut down");
        results
            .into_iter()
            .find_map(Result::err)
            .map_or(Ok(()), |e| Err(DriverError::from(e)))
    }

    /// 借用底层硬件输出
    pub fn outputs(&self) -> &O {
        &self.outputs
    }

    /// 取回底层硬件输出
    pub fn into_outputs(self) -> O {
        self.outputs
    }
}
