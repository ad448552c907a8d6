//! 命令分发器
//!
//! 持有“已应用命令”，把新帧与之逐字段比较，只对变化的子系统调用执行器控制。
//! 已应用命令只在对应硬件写入成功后才更新，因此它始终反映硬件的真实状态：
//! 一次失败的写入会在下一次收到同样的帧时重试。

use crate::actuator::ActuatorControl;
use crate::error::DriverError;
use crate::hooks::{FailsafeReason, HookManager};
use crate::metrics::ControllerMetrics;
use arc_swap::ArcSwap;
use autorc_hal::ActuatorOutputs;
use autorc_protocol::{AccessoryMask, CENTER_ANGLE, CommandFrame, Opcode};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{debug, error, info, trace, warn};

/// 一次分发实际触达的子系统
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DispatchReport {
    /// 写了牵引
    pub traction: bool,
    /// 写了转向
    pub steering: bool,
    /// 写了配件
    pub accessories: bool,
    /// 执行了全部关闭
    pub shutdown: bool,
}

impl DispatchReport {
    /// 没有任何硬件写入
    pub fn is_noop(&self) -> bool {
        !(self.traction || self.steering || self.accessories || self.shutdown)
    }
}

/// 命令分发器
///
/// 由分发任务独占。`published` 是已应用命令的无锁快照，供其他线程读取。
pub struct Dispatcher<O> {
    control: ActuatorControl<O>,
    applied: CommandFrame,
    metrics: Arc<ControllerMetrics>,
    hooks: HookManager,
    published: Arc<ArcSwap<CommandFrame>>,
}

impl<O: ActuatorOutputs> Dispatcher<O> {
    pub fn new(outputs: O, metrics: Arc<ControllerMetrics>, hooks: HookManager) -> Self {
        let applied = CommandFrame::safe_default();
        Self {
            control: ActuatorControl::new(outputs),
            applied,
            metrics,
            hooks,
            published: Arc::new(ArcSwap::from_pointee(applied)),
        }
    }

    /// 已应用命令
    pub fn applied(&self) -> CommandFrame {
        self.applied
    }

    /// 已应用命令的共享快照句柄
    pub fn published(&self) -> Arc<ArcSwap<CommandFrame>> {
        self.published.clone()
    }

    /// 执行器控制
    pub fn control(&self) -> &ActuatorControl<O> {
        &self.control
    }

    pub fn metrics(&self) -> &Arc<ControllerMetrics> {
        &self.metrics
    }

    /// 把硬件置为初始的已应用命令（刹车、转向居中、配件关闭）
    ///
    /// 每一项都会尝试，返回第一个错误。
    pub fn apply_startup_state(&mut self) -> Result<(), DriverError> {
        let results = [
            self.control.traction(Opcode::Brake, 0),
            self.control.steering(CENTER_ANGLE),
            self.control.accessories(AccessoryMask::off()),
        ];
        self.applied = CommandFrame::safe_default();
        self.publish();
        info!("Startup safe state applied");

        match results.into_iter().find_map(Result::err) {
            Some(e) => {
                self.metrics.actuator_errors.fetch_add(1, Ordering::Relaxed);
                Err(e)
            },
            None => Ok(()),
        }
    }

    /// 分发一帧
    ///
    /// - 操作码或速度变化：牵引类命令写牵引，HEAD_COMMAND 只记录，SHUTDOWN_ALL 全部关闭
    /// - 转向角变化：写转向（与操作码分支无关）
    /// - 配件位变化：写配件（与操作码分支无关）
    ///
    /// SHUTDOWN_ALL 帧的其余字段被忽略；硬件已经处于关闭状态时不再重复写入。
    pub fn dispatch(&mut self, frame: &CommandFrame) -> DispatchReport {
        let mut report = DispatchReport::default();

        if frame.opcode == Opcode::ShutdownAll {
            if self.applied != CommandFrame::shutdown_state() {
                self.failsafe(FailsafeReason::ShutdownCommand);
                report.shutdown = true;
            }
            self.finish(frame, &report);
            return report;
        }

        let delta = frame.diff(&self.applied);
        trace!("Dispatch {:?} delta={:?}", frame, delta);

        if delta.drive {
            if frame.opcode == Opcode::HeadCommand {
                // 头部命令保留，不驱动硬件
                debug!("Head command received, no actuator attached");
                self.applied.opcode = frame.opcode;
                self.applied.speed = frame.speed;
            } else {
                let result = self.control.traction(frame.opcode, frame.speed);
                if self.record("traction", result) {
                    self.applied.opcode = frame.opcode;
                    self.applied.speed = frame.speed;
                    report.traction = true;
                }
            }
        }

        if delta.steering {
            let result = self.control.steering(frame.angle);
            if self.record("steering", result) {
                self.applied.angle = frame.angle;
                report.steering = true;
            }
        }

        if delta.accessories {
            let result = self.control.accessories(frame.accessories);
            if self.record("accessories", result) {
                self.applied.accessories = frame.accessories;
                report.accessories = true;
            }
        }

        self.finish(frame, &report);
        report
    }

    /// 失效保护：无条件全部关闭
    ///
    /// 硬件写入失败只记录，已应用命令仍然置为关闭状态。
    pub fn failsafe(&mut self, reason: FailsafeReason) {
        if let Err(e) = self.control.shutdown() {
            error!("Shutdown ({}) failed: {}", reason, e);
            self.metrics.actuator_errors.fetch_add(1, Ordering::Relaxed);
        }
        self.applied = CommandFrame::shutdown_state();
        self.publish();
        info!("Failsafe shutdown: {}", reason);
        self.hooks.trigger_failsafe(reason);
    }

    fn finish(&mut self, frame: &CommandFrame, report: &DispatchReport) {
        self.publish();
        self.metrics.frames_dispatched.fetch_add(1, Ordering::Relaxed);
        if !report.is_noop() {
            debug!("Dispatched {:?}: {:?}", frame.to_bytes(), report);
        }
        self.hooks.trigger_dispatched(frame, report);
    }

    /// 记录一次子系统写入的结果，成功返回 true
    fn record(&self, subsystem: &str, result: Result<(), DriverError>) -> bool {
        match result {
            Ok(()) => true,
            Err(DriverError::InvalidInput(msg)) => {
                warn!("Rejected {} input: {}", subsystem, msg);
                self.metrics.rejected_inputs.fetch_add(1, Ordering::Relaxed);
                false
            },
            Err(e) => {
                error!("{} write failed: {}", subsystem, e);
                self.metrics.actuator_errors.fetch_add(1, Ordering::Relaxed);
                false
            },
        }
    }

    fn publish(&self) {
        self.published.store(Arc::new(self.applied));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::EventRecordingHook;
    use autorc_hal::{DriveIndicator, SteeringIndicator};
    use autorc_hal::mock::{OutputWrite, RecordingOutputs};
    use autorc_protocol::ACCESSORY_HORN;

    const TPC: u32 = 1_500_000;

    fn dispatcher() -> (Dispatcher<RecordingOutputs>, RecordingOutputs, Arc<ControllerMetrics>) {
        let outputs = RecordingOutputs::with_ticks_per_cycle(TPC);
        let metrics = Arc::new(ControllerMetrics::new());
        let dispatcher = Dispatcher::new(outputs.clone(), metrics.clone(), HookManager::new());
        (dispatcher, outputs, metrics)
    }

    fn frame(bytes: [u8; 4]) -> CommandFrame {
        CommandFrame::from_bytes(bytes).unwrap()
    }

    fn shutdown_writes() -> Vec<OutputWrite> {
        vec![
            OutputWrite::SteeringDuty(TPC * 10 / 150),
            OutputWrite::TractionDuty(0),
            OutputWrite::Direction {
                forward: true,
                backward: true,
            },
            OutputWrite::DriveIndicator(None),
            OutputWrite::SteeringIndicator(Some(SteeringIndicator::Center)),
            OutputWrite::Horn(false),
        ]
    }

    #[test]
    fn test_initial_applied_is_safe_default() {
        let (dispatcher, outputs, _) = dispatcher();
        assert_eq!(dispatcher.applied(), CommandFrame::safe_default());
        assert_eq!(**dispatcher.published().load(), CommandFrame::safe_default());
        assert_eq!(outputs.write_count(), 0);
    }

    #[test]
    fn test_startup_state_matches_shutdown_center() {
        let (mut dispatcher, outputs, _) = dispatcher();
        dispatcher.apply_startup_state().unwrap();

        let writes = outputs.take_writes();
        assert!(writes.contains(&OutputWrite::TractionDuty(0)));
        assert!(writes.contains(&OutputWrite::SteeringDuty(TPC * 10 / 150)));
        assert!(writes.contains(&OutputWrite::Horn(false)));
        assert!(writes.contains(&OutputWrite::DriveIndicator(Some(DriveIndicator::Brake))));
    }

    #[test]
    fn test_forward_with_horn() {
        let (mut dispatcher, outputs, metrics) = dispatcher();
        let report = dispatcher.dispatch(&frame([0xF1, 80, 150, 0x20]));

        assert_eq!(
            report,
            DispatchReport {
                traction: true,
                steering: false,
                accessories: true,
                shutdown: false
            }
        );
        assert_eq!(
            outputs.take_writes(),
            vec![
                OutputWrite::TractionDuty(TPC * 80 / 255),
                OutputWrite::Direction {
                    forward: true,
                    backward: false
                },
                OutputWrite::DriveIndicator(Some(DriveIndicator::Forward)),
                OutputWrite::Horn(true),
            ]
        );
        assert_eq!(dispatcher.applied(), frame([0xF1, 80, 150, 0x20]));
        assert_eq!(metrics.snapshot().frames_dispatched, 1);
    }

    #[test]
    fn test_same_frame_twice_is_noop() {
        let (mut dispatcher, outputs, _) = dispatcher();
        let f = frame([0xF2, 33, 120, 0x20]);
        dispatcher.dispatch(&f);
        outputs.take_writes();

        let report = dispatcher.dispatch(&f);
        assert!(report.is_noop());
        assert_eq!(outputs.write_count(), 0);
    }

    #[test]
    fn test_accessory_only_change() {
        let (mut dispatcher, outputs, _) = dispatcher();
        let mut f = CommandFrame::safe_default();
        f.accessories = AccessoryMask::from_bits(ACCESSORY_HORN);

        let report = dispatcher.dispatch(&f);
        assert!(report.accessories && !report.traction && !report.steering);

        let writes = outputs.take_writes();
        assert!(writes.iter().all(OutputWrite::is_accessory));
        assert_eq!(writes, vec![OutputWrite::Horn(true)]);
    }

    #[test]
    fn test_steering_only_change() {
        let (mut dispatcher, outputs, _) = dispatcher();
        let report = dispatcher.dispatch(&frame([0xF3, 0, 100, 0]));
        assert!(report.steering && !report.traction && !report.accessories);
        assert!(outputs.take_writes().iter().all(OutputWrite::is_steering));
    }

    #[test]
    fn test_speed_change_redrives_traction() {
        let (mut dispatcher, outputs, _) = dispatcher();
        dispatcher.dispatch(&frame([0xF1, 80, 150, 0]));
        outputs.take_writes();

        let report = dispatcher.dispatch(&frame([0xF1, 81, 150, 0]));
        assert!(report.traction);
        assert!(outputs.take_writes().iter().all(OutputWrite::is_traction));
    }

    #[test]
    fn test_head_command_writes_nothing() {
        let (mut dispatcher, outputs, _) = dispatcher();
        let report = dispatcher.dispatch(&frame([0xF4, 10, 150, 0]));
        assert!(report.is_noop());
        assert_eq!(outputs.write_count(), 0);
        assert_eq!(dispatcher.applied().opcode, Opcode::HeadCommand);
    }

    #[test]
    fn test_shutdown_command_ignores_other_fields() {
        let (mut dispatcher, outputs, _) = dispatcher();
        dispatcher.dispatch(&frame([0xF1, 200, 90, 0x20]));
        outputs.take_writes();

        let report = dispatcher.dispatch(&frame([0xF5, 0, 0, 0]));
        assert!(report.shutdown);
        assert_eq!(outputs.take_writes(), shutdown_writes());
        assert_eq!(dispatcher.applied(), CommandFrame::shutdown_state());

        // 已经关闭，再来一次不写硬件
        let report = dispatcher.dispatch(&frame([0xF5, 7, 9, 0xFF]));
        assert!(report.is_noop());
        assert_eq!(outputs.write_count(), 0);
    }

    #[test]
    fn test_failsafe_resets_applied_state() {
        let (mut dispatcher, outputs, _) = dispatcher();
        let f = frame([0xF1, 80, 150, 0x20]);
        dispatcher.dispatch(&f);
        outputs.take_writes();

        dispatcher.failsafe(FailsafeReason::WatchdogTimeout);
        assert_eq!(outputs.take_writes(), shutdown_writes());
        assert_eq!(**dispatcher.published().load(), CommandFrame::shutdown_state());

        // 链路恢复后同一帧重新生效
        let report = dispatcher.dispatch(&f);
        assert!(report.traction && report.accessories);
    }

    #[test]
    fn test_centered_recovery_frame_keeps_steering_indicator_lit() {
        let (mut dispatcher, outputs, _) = dispatcher();
        dispatcher.failsafe(FailsafeReason::WatchdogTimeout);

        // 居中帧不会再写转向，指示灯必须已由关闭流程点亮为居中
        let report = dispatcher.dispatch(&frame([0xF3, 0, 150, 0]));
        assert!(!report.steering);

        let last_indicator = outputs.writes().into_iter().rev().find_map(|w| match w {
            OutputWrite::SteeringIndicator(indicator) => Some(indicator),
            _ => None,
        });
        assert_eq!(last_indicator, Some(Some(SteeringIndicator::Center)));
    }

    #[test]
    fn test_zero_angle_rejected_and_retried() {
        let (mut dispatcher, outputs, metrics) = dispatcher();
        let report = dispatcher.dispatch(&frame([0xF3, 0, 0, 0]));

        assert!(!report.steering);
        assert_eq!(outputs.write_count(), 0);
        assert_eq!(dispatcher.applied().angle, CENTER_ANGLE);
        assert_eq!(metrics.snapshot().rejected_inputs, 1);
    }

    #[test]
    fn test_failed_write_keeps_previous_field() {
        let (mut dispatcher, outputs, metrics) = dispatcher();
        outputs.set_fail_steering(true);

        let report = dispatcher.dispatch(&frame([0xF3, 0, 100, 0]));
        assert!(!report.steering);
        assert_eq!(dispatcher.applied().angle, CENTER_ANGLE);
        assert_eq!(metrics.snapshot().actuator_errors, 1);

        // 故障恢复后，同一帧会重试转向
        outputs.set_fail_steering(false);
        let report = dispatcher.dispatch(&frame([0xF3, 0, 100, 0]));
        assert!(report.steering);
    }

    #[test]
    fn test_hooks_see_dispatch_and_failsafe() {
        let outputs = RecordingOutputs::new();
        let mut hooks = HookManager::new();
        let (hook, events) = EventRecordingHook::new(8);
        hooks.add_callback(Arc::new(hook));
        let mut dispatcher = Dispatcher::new(outputs, Arc::new(ControllerMetrics::new()), hooks);

        dispatcher.dispatch(&frame([0xF5, 0, 0, 0]));

        let recorded: Vec<_> = events.try_iter().collect();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].failsafe_reason(), Some(FailsafeReason::ShutdownCommand));
        assert!(recorded[1].failsafe_reason().is_none());
    }
}
