//! 主机端字节源
//!
//! 在没有真实 UART 中断的主机上，用一个后台线程从任意 `std::io::Read`
//! （串口设备文件、管道、测试用的 `Cursor`）读取字节，并逐字节调用
//! [`SerialIsr::on_byte_received`]，扮演中断上下文的角色。

use crate::{HalError, SerialIsr};
use std::io::{ErrorKind, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, trace};

/// 读线程单次读取的缓冲区大小
const READ_CHUNK: usize = 64;

/// 读线程退出原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderExit {
    /// 读到 EOF
    EndOfStream,
    /// 字节通道关闭（控制器已停止）
    ChannelClosed,
    /// 读取出错
    ReadError,
}

/// 后台读线程句柄
pub struct ReaderByteSource {
    handle: JoinHandle<ReaderExit>,
    bytes_read: Arc<AtomicU64>,
}

impl ReaderByteSource {
    /// 启动读线程
    ///
    /// # 错误
    /// - `HalError::Io`: 线程创建失败
    pub fn spawn<R>(reader: R, isr: SerialIsr) -> Result<Self, HalError>
    where
        R: Read + Send + 'static,
    {
        let bytes_read = Arc::new(AtomicU64::new(0));
        let counter = bytes_read.clone();

        let handle = thread::Builder::new()
            .name("autorc-serial-reader".into())
            .spawn(move || read_loop(reader, isr, counter))?;

        Ok(Self { handle, bytes_read })
    }

    /// 已读取的字节数（包括被丢弃的字节）
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read.load(Ordering::Relaxed)
    }

    /// 读线程是否已退出
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// 等待读线程退出
    pub fn join(self) -> Result<ReaderExit, HalError> {
        self.handle.join().map_err(|_| {
            HalError::Io(std::io::Error::other("serial reader thread panicked"))
        })
    }
}

fn read_loop<R: Read>(mut reader: R, isr: SerialIsr, bytes_read: Arc<AtomicU64>) -> ReaderExit {
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        let n = match reader.read(&mut chunk) {
            Ok(0) => {
                debug!("Serial reader reached end of stream");
                return ReaderExit::EndOfStream;
            },
            Ok(n) => n,
            // 串口设备的读超时是正常情况
            Err(e) if matches!(e.kind(), ErrorKind::Interrupted | ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                continue;
            },
            Err(e) => {
                error!("Serial read error: {}", e);
                return ReaderExit::ReadError;
            },
        };

        bytes_read.fetch_add(n as u64, Ordering::Relaxed);

        for &byte in &chunk[..n] {
            match isr.on_byte_received(byte) {
                Ok(()) => {},
                Err(HalError::ChannelClosed) => {
                    debug!("Byte channel closed, serial reader exiting");
                    return ReaderExit::ChannelClosed;
                },
                // 接收关闭或通道满：与真实中断一样，字节丢失
                Err(e) => trace!("Dropped byte 0x{:02X}: {}", byte, e),
            }
        }
    }
}
