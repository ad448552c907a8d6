//! 控制器句柄
//!
//! 对外的 `Controller` 结构体，持有组帧、分发两个后台线程以及中断回调。

use crate::dispatcher::Dispatcher;
use crate::error::DriverError;
use crate::hooks::HookManager;
use crate::metrics::{ControllerMetrics, MetricsSnapshot};
use crate::pipeline::{PipelineConfig, assemble_loop, dispatch_loop, pipeline_channels};
use arc_swap::ArcSwap;
use autorc_hal::{ActuatorOutputs, ReaderByteSource, SerialIsr, serial_channel};
use autorc_protocol::CommandFrame;
use crossbeam_channel::{RecvTimeoutError, Sender};
use std::io::Read;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{error, info, warn};

/// 停止时等待每个线程退出的上限
const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Extension trait for timeout-capable thread joins
trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> Result<(), DriverError>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> Result<(), DriverError> {
        let name = self.thread().name().unwrap_or("unnamed").to_string();
        let (tx, rx) = crossbeam_channel::bounded(1);

        // 由旁路线程执行阻塞的 join
        thread::spawn(move || {
            let _ = tx.send(self.join().is_ok());
        });

        match rx.recv_timeout(timeout) {
            Ok(true) => Ok(()),
            Ok(false) | Err(RecvTimeoutError::Disconnected) => {
                Err(DriverError::TaskThread(format!("{} thread panicked", name)))
            },
            Err(RecvTimeoutError::Timeout) => Err(DriverError::TaskThread(format!(
                "{} thread did not exit within {:?}",
                name, timeout
            ))),
        }
    }
}

/// 运行中的控制器
///
/// 启动时先把硬件置为安全状态（刹车、转向居中、配件关闭），然后开启两个任务线程。
/// `stop()` 或 drop 会通知两个任务退出，分发任务在退出前执行一次全部关闭。
///
/// # Example
///
/// ```no_run
/// use autorc_driver::{Controller, PipelineConfig};
/// # fn board_outputs() -> autorc_hal::mock::RecordingOutputs {
/// #     autorc_hal::mock::RecordingOutputs::new()
/// # }
///
/// let mut controller = Controller::start(board_outputs(), PipelineConfig::default())?;
///
/// // 交给 UART 接收中断
/// let isr = controller.isr();
/// let _ = isr.on_byte_received(0xF3);
///
/// controller.stop()?;
/// # Ok::<(), autorc_driver::DriverError>(())
/// ```
pub struct Controller {
    stop_tx: Option<Sender<()>>,
    isr: SerialIsr,
    assembler_thread: Option<JoinHandle<()>>,
    dispatcher_thread: Option<JoinHandle<()>>,
    metrics: Arc<ControllerMetrics>,
    applied: Arc<ArcSwap<CommandFrame>>,
    config: PipelineConfig,
}

impl Controller {
    /// 以默认钩子启动控制器
    ///
    /// # 错误
    /// - `InvalidConfig`: 配置校验失败
    /// - `TaskThread`: 线程创建失败
    pub fn start<O>(outputs: O, config: PipelineConfig) -> Result<Self, DriverError>
    where
        O: ActuatorOutputs + Send + 'static,
    {
        Self::start_with_hooks(outputs, config, HookManager::new())
    }

    pub(crate) fn start_with_hooks<O>(
        outputs: O,
        config: PipelineConfig,
        hooks: HookManager,
    ) -> Result<Self, DriverError>
    where
        O: ActuatorOutputs + Send + 'static,
    {
        config.validate()?;

        let (isr, bytes_rx, gate) = serial_channel(config.byte_channel_capacity);
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);
        let (assembler_side, dispatcher_side) = pipeline_channels(bytes_rx, stop_rx);

        let metrics = Arc::new(ControllerMetrics::new());
        let mut dispatcher = Dispatcher::new(outputs, metrics.clone(), hooks);
        if let Err(e) = dispatcher.apply_startup_state() {
            warn!("Failed to apply startup safe state: {}", e);
        }
        let applied = dispatcher.published();

        let metrics_assembler = metrics.clone();
        let config_assembler = config.clone();
        let assembler_thread = thread::Builder::new()
            .name("autorc-assembler".into())
            .spawn(move || {
                assemble_loop(gate, assembler_side, config_assembler, metrics_assembler);
            })
            .map_err(|e| DriverError::TaskThread(format!("failed to spawn assembler: {}", e)))?;

        let config_dispatcher = config.clone();
        let dispatcher_thread = thread::Builder::new()
            .name("autorc-dispatcher".into())
            .spawn(move || {
                dispatch_loop(dispatcher, dispatcher_side, config_dispatcher);
            })
            .map_err(|e| DriverError::TaskThread(format!("failed to spawn dispatcher: {}", e)))?;

        info!(
            "Controller started (watchdog {:?}, byte timeout {:?})",
            config.watchdog_timeout(),
            config.byte_timeout()
        );

        Ok(Self {
            stop_tx: Some(stop_tx),
            isr,
            assembler_thread: Some(assembler_thread),
            dispatcher_thread: Some(dispatcher_thread),
            metrics,
            applied,
            config,
        })
    }

    /// 串口接收中断回调（可克隆多份）
    pub fn isr(&self) -> SerialIsr {
        self.isr.clone()
    }

    /// 用后台线程把任意 `Read` 接到中断回调上（主机端代替 UART 中断）
    pub fn attach_reader<R>(&self, reader: R) -> Result<ReaderByteSource, DriverError>
    where
        R: Read + Send + 'static,
    {
        Ok(ReaderByteSource::spawn(reader, self.isr())?)
    }

    /// 获取性能指标快照
    pub fn metrics(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            isr_overruns: self.isr.overrun_count(),
            ..self.metrics.snapshot()
        }
    }

    /// 重置性能指标（包括中断回调的溢出计数）
    pub fn reset_metrics(&self) {
        self.metrics.reset();
        self.isr.reset_counters();
    }

    /// 最近一次实际生效的命令（无锁读取）
    pub fn last_applied(&self) -> CommandFrame {
        **self.applied.load()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// 两个任务线程是否都在运行
    pub fn is_running(&self) -> bool {
        let alive = |h: &Option<JoinHandle<()>>| h.as_ref().is_some_and(|h| !h.is_finished());
        self.stop_tx.is_some() && alive(&self.assembler_thread) && alive(&self.dispatcher_thread)
    }

    /// 停止控制器
    ///
    /// 分发任务退出前执行全部关闭。重复调用是空操作。
    ///
    /// # 错误
    /// - `TaskThread`: 线程 panic 或未能在时限内退出
    pub fn stop(&mut self) -> Result<(), DriverError> {
        // 断开停止通道，两个任务的 select 都会立即返回
        if self.stop_tx.take().is_none() {
            return Ok(());
        }

        let mut result = Ok(());
        for handle in [self.dispatcher_thread.take(), self.assembler_thread.take()]
            .into_iter()
            .flatten()
        {
            if let Err(e) = handle.join_timeout(JOIN_TIMEOUT) {
                error!("{}", e);
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }

        info!("Controller stopped");
        result
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
