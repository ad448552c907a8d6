//! 组帧 + 分发的属性测试
//!
//! 任意不含操作码的前导垃圾字节都不影响随后那一帧的生效结果。

use autorc_sdk::hal::mock::RecordingOutputs;
use autorc_sdk::prelude::*;
use autorc_sdk::protocol::{OPCODE_MAX, OPCODE_MIN};
use proptest::prelude::*;
use std::thread;
use std::time::{Duration, Instant};

fn garbage_byte() -> impl Strategy<Value = u8> {
    any::<u8>().prop_filter("not an opcode", |b| !(OPCODE_MIN..=OPCODE_MAX).contains(b))
}

fn traction_opcode() -> impl Strategy<Value = u8> {
    prop_oneof![Just(0xF1u8), Just(0xF2u8), Just(0xF3u8)]
}

fn feed(isr: &SerialIsr, bytes: &[u8]) {
    let deadline = Instant::now() + Duration::from_secs(3);
    for &b in bytes {
        while isr.on_byte_received(b).is_err() {
            assert!(Instant::now() < deadline, "byte 0x{:02X} was never accepted", b);
            thread::sleep(Duration::from_millis(1));
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn garbage_prefix_never_changes_the_applied_frame(
        prefix in prop::collection::vec(garbage_byte(), 0..12),
        opcode in traction_opcode(),
        speed in any::<u8>(),
        angle in 1u8..=255,
        mask in any::<u8>(),
    ) {
        let mut controller = ControllerBuilder::new()
            .build(RecordingOutputs::new())
            .unwrap();

        let frame = [opcode, speed, angle, mask];
        let mut stream = prefix.clone();
        stream.extend_from_slice(&frame);
        feed(&controller.isr(), &stream);

        let expected = CommandFrame::from_bytes(frame).unwrap();
        let deadline = Instant::now() + Duration::from_secs(3);
        while controller.metrics().frames_dispatched < 1 || controller.last_applied() != expected {
            prop_assert!(Instant::now() < deadline, "frame never dispatched");
            thread::sleep(Duration::from_millis(1));
        }

        prop_assert_eq!(controller.last_applied(), expected);
        prop_assert_eq!(controller.metrics().bytes_discarded, prefix.len() as u64);
        controller.stop().unwrap();
    }
}
