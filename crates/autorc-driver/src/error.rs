//! 驱动层错误类型定义

use autorc_hal::HalError;
use autorc_protocol::ProtocolError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 硬件层错误
    #[error("HAL error: {0}")]
    Hal(#[from] HalError),

    /// 协议解析错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 任务间通道已关闭（对端线程退出）
    #[error("Task channel closed")]
    ChannelClosed,

    /// 任务线程错误
    #[error("Task thread error: {0}")]
    TaskThread(String),

    /// 操作超时
    #[error("Operation timeout")]
    Timeout,

    /// 无效输入（如转向角为 0）
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// 无效配置
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::DriverError;
    use autorc_hal::HalError;
    use autorc_protocol::ProtocolError;

    /// 测试 DriverError 的 Display 实现
    #[test]
    fn test_driver_error_display() {
        let driver_error = DriverError::Hal(HalError::ChannelFull);
        let msg = format!("{}", driver_error);
        assert!(msg.contains("HAL") && msg.contains("full"), "Hal error message: {}", msg);

        let driver_error = DriverError::Protocol(ProtocolError::InvalidOpcode { opcode: 0x12 });
        let msg = format!("{}", driver_error);
        assert!(msg.contains("Invalid opcode: 0x12"), "Protocol error message: {}", msg);

        assert_eq!(format!("{}", DriverError::ChannelClosed), "Task channel closed");
        assert_eq!(format!("{}", DriverError::Timeout), "Operation timeout");

        let msg = format!("{}", DriverError::TaskThread("dispatcher".to_string()));
        assert!(msg.contains("Task thread") && msg.contains("dispatcher"));

        let msg = format!("{}", DriverError::InvalidInput("steering angle 0".to_string()));
        assert!(msg.contains("Invalid input") && msg.contains("angle"));
    }

    /// 测试 From<HalError> 转换
    #[test]
    fn test_from_hal_error() {
        let driver_error: DriverError = HalError::ReceptionDisabled.into();
        assert!(matches!(driver_error, DriverError::Hal(HalError::ReceptionDisabled)));
    }

    /// 测试 From<ProtocolError> 转换
    #[test]
    fn test_from_protocol_error() {
        let driver_error: DriverError = ProtocolError::InvalidLength {
            expected: 4,
            actual: 2,
        }
        .into();
        match driver_error {
            DriverError::Protocol(ProtocolError::InvalidLength { expected, actual }) => {
                assert_eq!((expected, actual), (4, 2));
            },
            _ => panic!("Expected Protocol variant"),
        }
    }
}
