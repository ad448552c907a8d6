//! 命令帧结构体定义
//!
//! 包含操作码、配件位域以及 4 字节命令帧本身。

use crate::{ProtocolError, constants::*};
use bilge::prelude::*;
use num_enum::IntoPrimitive;

// ============================================================================
// 操作码
// ============================================================================

/// 命令操作码（Byte 0）
///
/// 五个保留值占据连续区间 `0xF1..=0xF5`，区间外的字节不是合法帧头。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Opcode {
    /// 前进
    DriveForward = OPCODE_DRIVE_FORWARD,
    /// 后退
    DriveReverse = OPCODE_DRIVE_REVERSE,
    /// 刹车
    Brake = OPCODE_BRAKE,
    /// 头部/云台命令（保留，当前不驱动任何硬件）
    HeadCommand = OPCODE_HEAD_COMMAND,
    /// 全部关闭
    ShutdownAll = OPCODE_SHUTDOWN_ALL,
}

impl Opcode {
    /// 字节是否落在合法操作码区间内
    #[inline]
    pub fn is_valid(byte: u8) -> bool {
        (OPCODE_MIN..=OPCODE_MAX).contains(&byte)
    }

    /// 是否为牵引类命令（前进 / 后退 / 刹车）
    #[inline]
    pub fn is_traction(self) -> bool {
        matches!(self, Self::DriveForward | Self::DriveReverse | Self::Brake)
    }

    /// 转换为 u8
    #[inline]
    pub fn as_u8(self) -> u8 {
        self.into()
    }
}

impl TryFrom<u8> for Opcode {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            OPCODE_DRIVE_FORWARD => Ok(Opcode::DriveForward),
            OPCODE_DRIVE_REVERSE => Ok(Opcode::DriveReverse),
            OPCODE_BRAKE => Ok(Opcode::Brake),
            OPCODE_HEAD_COMMAND => Ok(Opcode::HeadCommand),
            OPCODE_SHUTDOWN_ALL => Ok(Opcode::ShutdownAll),
            _ => Err(ProtocolError::InvalidOpcode { opcode: value }),
        }
    }
}

// ============================================================================
// 配件位域
// ============================================================================

/// 配件位域（Byte 3）
///
/// 只有喇叭位接到了硬件输出；灯光位保留在数据模型里，留给后续硬件版本使用。
#[bitsize(8)]
#[derive(FromBits, DebugBits, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessoryMask {
    pub aux_channels: u5,    // Bit 0-4: 保留通道 A-E
    pub horn: bool,          // Bit 5: 喇叭
    pub rear_lights: bool,   // Bit 6: 尾灯
    pub front_lights: bool,  // Bit 7: 前灯
}

impl AccessoryMask {
    /// 所有配件关闭
    pub fn off() -> Self {
        Self::from(u8::new(0))
    }

    /// 从原始字节构造
    pub fn from_bits(bits: u8) -> Self {
        Self::from(u8::new(bits))
    }

    /// 原始字节
    pub fn bits(self) -> u8 {
        u8::from(self).value()
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for AccessoryMask {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.bits())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for AccessoryMask {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        <u8 as serde::Deserialize>::deserialize(deserializer).map(AccessoryMask::from_bits)
    }
}

// ============================================================================
// 命令帧
// ============================================================================

/// 4 字节命令帧 `[opcode, traction_speed, steering_angle, accessory_mask]`
///
/// 帧是瞬态的：组帧器产出一帧，交给分发器比较后即丢弃。
/// 分发器用同一类型保存“已应用命令”。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CommandFrame {
    pub opcode: Opcode,
    /// 牵引速度，仅对前进/后退/刹车有意义
    pub speed: u8,
    /// 转向绝对角度，`CENTER_ANGLE` 为直行
    pub angle: u8,
    pub accessories: AccessoryMask,
}

impl CommandFrame {
    pub fn new(opcode: Opcode, speed: u8, angle: u8, accessories: AccessoryMask) -> Self {
        Self {
            opcode,
            speed,
            angle,
            accessories,
        }
    }

    /// 上电安全状态：刹车、转向居中、配件关闭
    pub fn safe_default() -> Self {
        Self::new(Opcode::Brake, 0, CENTER_ANGLE, AccessoryMask::off())
    }

    /// 全部关闭后硬件所处的状态
    ///
    /// 关闭会把转向拉回中位、清掉配件，所以在分发器看来它等价于这一帧。
    pub fn shutdown_state() -> Self {
        Self::new(Opcode::ShutdownAll, 0, CENTER_ANGLE, AccessoryMask::off())
    }

    /// 从 4 字节数组解析
    pub fn from_bytes(bytes: [u8; FRAME_LEN]) -> Result<Self, ProtocolError> {
        let opcode = Opcode::try_from(bytes[0])?;
        Ok(Self {
            opcode,
            speed: bytes[1],
            angle: bytes[2],
            accessories: AccessoryMask::from_bits(bytes[3]),
        })
    }

    /// 编码为 4 字节数组
    pub fn to_bytes(&self) -> [u8; FRAME_LEN] {
        [
            self.opcode.as_u8(),
            self.speed,
            self.angle,
            self.accessories.bits(),
        ]
    }

    /// 与上一次已应用命令逐字段比较
    pub fn diff(&self, previous: &CommandFrame) -> FrameDelta {
        FrameDelta {
            drive: self.opcode != previous.opcode || self.speed != previous.speed,
            steering: self.angle != previous.angle,
            accessories: self.accessories != previous.accessories,
        }
    }
}

impl Default for CommandFrame {
    fn default() -> Self {
        Self::safe_default()
    }
}

impl TryFrom<[u8; FRAME_LEN]> for CommandFrame {
    type Error = ProtocolError;

    fn try_from(bytes: [u8; FRAME_LEN]) -> Result<Self, Self::Error> {
        Self::from_bytes(bytes)
    }
}

impl TryFrom<&[u8]> for CommandFrame {
    type Error = ProtocolError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let fixed: [u8; FRAME_LEN] =
            bytes.try_into().map_err(|_| ProtocolError::InvalidLength {
                expected: FRAME_LEN,
                actual: bytes.len(),
            })?;
        Self::from_bytes(fixed)
    }
}

/// 两帧之间的字段差异
///
/// 操作码与速度合并为一个“驱动”字段：任一变化都会重新走操作码分支。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameDelta {
    pub drive: bool,
    pub steering: bool,
    pub accessories: bool,
}

impl FrameDelta {
    /// 两帧完全一致
    pub fn is_empty(&self) -> bool {
        !(self.drive || self.steering || self.accessories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_try_from() {
        assert_eq!(Opcode::try_from(0xF1).unwrap(), Opcode::DriveForward);
        assert_eq!(Opcode::try_from(0xF2).unwrap(), Opcode::DriveReverse);
        assert_eq!(Opcode::try_from(0xF3).unwrap(), Opcode::Brake);
        assert_eq!(Opcode::try_from(0xF4).unwrap(), Opcode::HeadCommand);
        assert_eq!(Opcode::try_from(0xF5).unwrap(), Opcode::ShutdownAll);

        assert!(matches!(
            Opcode::try_from(0xF0),
            Err(ProtocolError::InvalidOpcode { opcode: 0xF0 })
        ));
        assert!(Opcode::try_from(0xF6).is_err());
        assert!(Opcode::try_from(0x00).is_err());
    }

    #[test]
    fn test_opcode_is_valid_matches_try_from() {
        for byte in 0..=u8::MAX {
            assert_eq!(Opcode::is_valid(byte), Opcode::try_from(byte).is_ok(), "byte 0x{byte:02X}");
        }
    }

    #[test]
    fn test_opcode_is_traction() {
        assert!(Opcode::DriveForward.is_traction());
        assert!(Opcode::DriveReverse.is_traction());
        assert!(Opcode::Brake.is_traction());
        assert!(!Opcode::HeadCommand.is_traction());
        assert!(!Opcode::ShutdownAll.is_traction());
    }

    #[test]
    fn test_accessory_mask_bits() {
        let mask = AccessoryMask::from_bits(ACCESSORY_HORN);
        assert!(mask.horn());
        assert!(!mask.front_lights());
        assert!(!mask.rear_lights());

        let mask = AccessoryMask::from_bits(ACCESSORY_FRONT_LIGHTS | ACCESSORY_REAR_LIGHTS);
        assert!(mask.front_lights());
        assert!(mask.rear_lights());
        assert!(!mask.horn());

        // 保留位不影响已定义位
        let mask = AccessoryMask::from_bits(ACCESSORY_RESERVED_MASK);
        assert!(!mask.horn());
        assert_eq!(mask.aux_channels().value(), 0b1_1111);
    }

    #[test]
    fn test_accessory_mask_encode() {
        let mut mask = AccessoryMask::off();
        mask.set_horn(true);
        mask.set_front_lights(true);
        assert_eq!(mask.bits(), 0b1010_0000);
        assert_eq!(AccessoryMask::default().bits(), 0);
    }

    #[test]
    fn test_frame_from_bytes() {
        let frame = CommandFrame::from_bytes([0xF1, 80, 150, 0x20]).unwrap();
        assert_eq!(frame.opcode, Opcode::DriveForward);
        assert_eq!(frame.speed, 80);
        assert_eq!(frame.angle, CENTER_ANGLE);
        assert!(frame.accessories.horn());
        assert_eq!(frame.to_bytes(), [0xF1, 80, 150, 0x20]);
    }

    #[test]
    fn test_frame_from_bytes_invalid_opcode() {
        let result = CommandFrame::from_bytes([0xAA, 80, 150, 0x20]);
        assert!(matches!(result, Err(ProtocolError::InvalidOpcode { opcode: 0xAA })));
    }

    #[test]
    fn test_frame_from_slice_length() {
        let short: &[u8] = &[0xF1, 0x00, 0x96];
        assert!(matches!(
            CommandFrame::try_from(short),
            Err(ProtocolError::InvalidLength {
                expected: 4,
                actual: 3
            })
        ));

        let exact: &[u8] = &[0xF3, 0, 150, 0];
        assert_eq!(CommandFrame::try_from(exact).unwrap(), CommandFrame::safe_default());
    }

    #[test]
    fn test_safe_default_and_shutdown_state() {
        let safe = CommandFrame::default();
        assert_eq!(safe.to_bytes(), [OPCODE_BRAKE, 0, CENTER_ANGLE, 0]);

        let off = CommandFrame::shutdown_state();
        assert_eq!(off.to_bytes(), [OPCODE_SHUTDOWN_ALL, 0, CENTER_ANGLE, 0]);
    }

    #[test]
    fn test_diff_identical_is_empty() {
        let frame = CommandFrame::from_bytes([0xF1, 80, 150, 0x20]).unwrap();
        assert!(frame.diff(&frame).is_empty());
    }

    #[test]
    fn test_diff_accessories_only() {
        let previous = CommandFrame::safe_default();
        let mut next = previous;
        next.accessories = AccessoryMask::from_bits(ACCESSORY_HORN);

        let delta = next.diff(&previous);
        assert!(!delta.drive);
        assert!(!delta.steering);
        assert!(delta.accessories);
    }

    #[test]
    fn test_diff_speed_counts_as_drive() {
        let previous = CommandFrame::from_bytes([0xF1, 80, 150, 0]).unwrap();
        let next = CommandFrame::from_bytes([0xF1, 81, 150, 0]).unwrap();
        assert_eq!(
            next.diff(&previous),
            FrameDelta {
                drive: true,
                steering: false,
                accessories: false
            }
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_frame_serde_json() {
        let frame = CommandFrame::from_bytes([0xF2, 10, 120, 0x80]).unwrap();
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains("DriveReverse"));
        let back: CommandFrame = serde_json::from_str(&json).unwrap();
        assert_eq!(back, frame);
    }
}
