//! 协议常量定义

/// 命令帧长度（字节）
pub const FRAME_LEN: usize = 4;

/// 合法操作码下界（含）
pub const OPCODE_MIN: u8 = 0xF1;

/// 合法操作码上界（含）
pub const OPCODE_MAX: u8 = 0xF5;

/// 前进
pub const OPCODE_DRIVE_FORWARD: u8 = 0xF1;
/// 后退
pub const OPCODE_DRIVE_REVERSE: u8 = 0xF2;
/// 刹车
pub const OPCODE_BRAKE: u8 = 0xF3;
/// 云台/头部（保留）
pub const OPCODE_HEAD_COMMAND: u8 = 0xF4;
/// 全部关闭
pub const OPCODE_SHUTDOWN_ALL: u8 = 0xF5;

/// 转向中位角度（直行）
pub const CENTER_ANGLE: u8 = 150;

/// 牵引速度满量程
pub const SPEED_FULL_SCALE: u8 = 255;

/// 转向占空比换算常数 K：`ticks = ticks_per_cycle * K / angle`
pub const STEERING_TICKS_NUMERATOR: u32 = 10;

/// 配件位：前灯（Bit 7）
pub const ACCESSORY_FRONT_LIGHTS: u8 = 1 << 7;
/// 配件位：尾灯（Bit 6）
pub const ACCESSORY_REAR_LIGHTS: u8 = 1 << 6;
/// 配件位：喇叭（Bit 5）
pub const ACCESSORY_HORN: u8 = 1 << 5;
/// 配件位：保留通道 A-E（Bit 4-0，未接线）
pub const ACCESSORY_RESERVED_MASK: u8 = 0b0001_1111;
