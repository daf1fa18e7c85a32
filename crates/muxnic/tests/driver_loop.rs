//! End-to-end driver tests against an emulated multiplexer proxy.
//!
//! The proxy thread answers control commands the way the real far side
//! would; data-channel traffic is scripted by each test through its own
//! peer handle.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};

use muxnic::{
    ChannelConfig, ChannelDirection, ChannelId, CtrlError, DriverError, LoopbackLink, LoopbackMux,
    LoopbackPeer, NicConfig, NicDriver, RingConsumer, RxNotify,
};
use muxnic_ctrl::proto::{
    CMD_CLOSE, CMD_GET_MAC, CMD_OPEN, CMD_START_READ, CMD_STOP_READ, RSP_CLOSE, RSP_GET_MAC,
    RSP_OPEN, RSP_START_READ, RSP_STOP_READ,
};
use muxnic_frame::encode_frame;

const CTRL: ChannelId = 4;
const DATA: ChannelId = 5;
const MAC: [u8; 6] = [0x02, 0x00, 0x5E, 0x10, 0x20, 0x30];

fn nic_config() -> NicConfig {
    NicConfig {
        ctrl: ChannelConfig::new(CTRL, 64, ChannelDirection::Duplex),
        data: ChannelConfig::new(DATA, 64, ChannelDirection::Duplex),
        ring_slots: 4,
        slot_capacity: 1518,
    }
}

fn link() -> (Arc<LoopbackMux>, LoopbackPeer) {
    let (mux, peer) = LoopbackLink::new(&[nic_config().ctrl, nic_config().data]);
    (Arc::new(mux), peer)
}

/// Answer control commands forever, recording the opcodes seen.
fn spawn_proxy(peer: LoopbackPeer, mac: [u8; 6]) -> Arc<Mutex<Vec<u8>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let record = Arc::clone(&seen);
    thread::spawn(move || loop {
        let Ok(cmd) = peer.pull_exact(CTRL, 2) else {
            return;
        };
        assert_eq!(cmd[1], DATA, "command names the wrong channel");
        record.lock().expect("record lock").push(cmd[0]);
        let confirm = match cmd[0] {
            CMD_OPEN => vec![RSP_OPEN, 0],
            CMD_CLOSE => vec![RSP_CLOSE, 0],
            CMD_GET_MAC => {
                let mut confirm = vec![RSP_GET_MAC, 0];
                confirm.extend_from_slice(&mac);
                confirm
            }
            CMD_STOP_READ => vec![RSP_STOP_READ, 0],
            CMD_START_READ => vec![RSP_START_READ, 0],
            other => panic!("unexpected opcode {other:#04x}"),
        };
        if peer.push(CTRL, &confirm).is_err() {
            return;
        }
    });
    seen
}

fn wire_frame(payload: &[u8]) -> Vec<u8> {
    let mut wire = BytesMut::new();
    encode_frame(payload, &mut wire).expect("encode should succeed");
    wire.to_vec()
}

fn next_frame(consumer: &mut RingConsumer) -> Bytes {
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        if let Some(frame) = consumer.take() {
            return frame;
        }
        assert!(Instant::now() < deadline, "timed out waiting for a frame");
        thread::sleep(Duration::from_millis(1));
    }
}

fn wait_for_commands(seen: &Mutex<Vec<u8>>, what: &str, pred: impl Fn(&[u8]) -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        if pred(&seen.lock().expect("seen lock")) {
            return;
        }
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(1));
    }
}

#[derive(Clone, Default)]
struct TickNotify {
    frames: Arc<AtomicUsize>,
}

impl RxNotify for TickNotify {
    fn frame_ready(&self) {
        self.frames.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn bring_up_opens_data_channel_and_reports_mac() {
    let (mux, peer) = link();
    let seen = spawn_proxy(peer, MAC);

    let driver =
        NicDriver::init(mux, nic_config(), TickNotify::default()).expect("init should succeed");
    assert_eq!(driver.mac().octets(), MAC);
    wait_for_commands(&seen, "bring-up commands", |cmds| {
        cmds == [CMD_OPEN, CMD_GET_MAC]
    });
}

#[test]
fn bring_up_fails_on_all_zero_mac() {
    let (mux, peer) = link();
    spawn_proxy(peer, [0; 6]);

    let err = NicDriver::init(mux, nic_config(), TickNotify::default())
        .expect_err("init should fail");
    assert!(matches!(err, DriverError::Ctrl(CtrlError::NullMac)));
}

#[test]
fn bring_up_fails_when_proxy_confirms_with_wrong_opcode() {
    let (mux, peer) = link();
    thread::spawn(move || {
        let _cmd = peer.pull_exact(CTRL, 2).expect("command should arrive");
        peer.push(CTRL, &[0xFF, 0]).expect("confirm should push");
    });

    let err = NicDriver::init(mux, nic_config(), TickNotify::default())
        .expect_err("init should fail");
    assert!(matches!(
        err,
        DriverError::Ctrl(CtrlError::UnexpectedOpcode { .. })
    ));
}

#[test]
fn received_frames_come_out_in_order() {
    let (mux, peer) = link();
    let seen = spawn_proxy(peer.clone(), MAC);
    let notify = TickNotify::default();

    let mut driver =
        NicDriver::init(mux, nic_config(), notify.clone()).expect("init should succeed");
    let mut consumer = driver.take_consumer().expect("consumer should be available");
    assert!(driver.take_consumer().is_none());
    thread::spawn(move || driver.run());

    wait_for_commands(&seen, "delivery start", |cmds| {
        cmds.contains(&CMD_START_READ)
    });

    // A small frame and one bigger than a single 64-byte channel read.
    let big: Vec<u8> = (0..1500u16).map(|i| (i % 256) as u8).collect();
    let mut stream = wire_frame(b"ABCD");
    stream.extend_from_slice(&wire_frame(&big));
    peer.push(DATA, &stream).expect("push should succeed");

    assert_eq!(&next_frame(&mut consumer)[..], b"ABCD");
    let second = next_frame(&mut consumer);
    assert_eq!(second.len(), 1500);
    assert_eq!(&second[..], &big[..]);

    // The notify hook fires after each publish, from the loop's thread.
    let deadline = Instant::now() + Duration::from_secs(2);
    while notify.frames.load(Ordering::SeqCst) < 2 {
        assert!(Instant::now() < deadline, "timed out waiting for notifies");
        thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(notify.frames.load(Ordering::SeqCst), 2);
}

#[test]
fn frame_split_across_deliveries_is_reassembled() {
    let (mux, peer) = link();
    let seen = spawn_proxy(peer.clone(), MAC);

    let mut driver =
        NicDriver::init(mux, nic_config(), TickNotify::default()).expect("init should succeed");
    let mut consumer = driver.take_consumer().expect("consumer should be available");
    thread::spawn(move || driver.run());

    wait_for_commands(&seen, "delivery start", |cmds| {
        cmds.contains(&CMD_START_READ)
    });

    // Length prefix split across two deliveries.
    peer.push(DATA, &[0x00]).expect("push should succeed");
    thread::sleep(Duration::from_millis(10));
    peer.push(DATA, &[0x04, b'A', b'B', b'C', b'D'])
        .expect("push should succeed");

    assert_eq!(&next_frame(&mut consumer)[..], b"ABCD");
    assert!(consumer.take().is_none());
}

#[test]
fn transmitted_frames_carry_length_prefix_and_chunk_at_capacity() {
    let (mux, peer) = link();
    spawn_proxy(peer.clone(), MAC);

    let driver =
        NicDriver::init(mux, nic_config(), TickNotify::default()).expect("init should succeed");
    let handle = driver.handle();

    let sent = handle.transmit(b"out!").expect("transmit should succeed");
    assert_eq!(sent, 6);
    assert_eq!(
        peer.pull_exact(DATA, 6).expect("wire bytes should arrive"),
        wire_frame(b"out!")
    );

    // Larger than the 64-byte channel capacity; arrives reassembled.
    let big = vec![0x5A; 200];
    let sent = handle.transmit(&big).expect("transmit should succeed");
    assert_eq!(sent, 202);
    assert_eq!(
        peer.pull_exact(DATA, 202).expect("wire bytes should arrive"),
        wire_frame(&big)
    );
}

#[test]
fn overflow_mid_frame_recovers_via_stop_drain_start() {
    let (mux, peer) = link();
    let seen = spawn_proxy(peer.clone(), MAC);

    let mut driver =
        NicDriver::init(mux, nic_config(), TickNotify::default()).expect("init should succeed");
    let mut consumer = driver.take_consumer().expect("consumer should be available");
    thread::spawn(move || driver.run());

    wait_for_commands(&seen, "delivery start", |cmds| {
        cmds.contains(&CMD_START_READ)
    });

    // One whole frame, then a truncated one, then the overflow indication.
    let mut stream = wire_frame(b"intact");
    stream.extend_from_slice(&wire_frame(b"lost-to-overflow")[..7]);
    peer.push(DATA, &stream).expect("push should succeed");
    peer.inject_read_error(DATA, muxnic::TransportError::Overflow { channel: DATA })
        .expect("inject should succeed");

    assert_eq!(&next_frame(&mut consumer)[..], b"intact");

    // The driver must pause delivery, flush and resume on its own.
    wait_for_commands(&seen, "stop/start recovery", |cmds| {
        cmds.iter().filter(|c| **c == CMD_STOP_READ).count() == 1
            && cmds.iter().filter(|c| **c == CMD_START_READ).count() == 2
    });

    peer.push(DATA, &wire_frame(b"fresh")).expect("push should succeed");
    assert_eq!(&next_frame(&mut consumer)[..], b"fresh");
    // Nothing of the truncated frame ever surfaced.
    assert!(consumer.take().is_none());
}

#[test]
fn shutdown_closes_the_data_channel() {
    let (mux, peer) = link();
    let seen = spawn_proxy(peer, MAC);

    let driver =
        NicDriver::init(mux, nic_config(), TickNotify::default()).expect("init should succeed");
    let handle = driver.handle();
    handle.shutdown().expect("shutdown should succeed");

    wait_for_commands(&seen, "close command", |cmds| cmds.contains(&CMD_CLOSE));
}
