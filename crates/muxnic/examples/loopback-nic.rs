//! NIC driver demo over the in-memory loopback link.
//!
//! The far side of the link plays a multiplexer proxy that answers the
//! control protocol and echoes every data-channel byte straight back, so
//! each transmitted frame comes around as a received frame.
//!
//! Run with:
//!   cargo run -p muxnic --example loopback-nic

use std::thread;
use std::time::{Duration, Instant};

use muxnic::{
    ChannelConfig, ChannelId, LoopbackLink, LoopbackPeer, NicConfig, NicDriver, RxNotify,
};
use muxnic_ctrl::proto::{
    CMD_CLOSE, CMD_GET_MAC, CMD_OPEN, CMD_START_READ, CMD_STOP_READ, RSP_CLOSE, RSP_GET_MAC,
    RSP_OPEN, RSP_START_READ, RSP_STOP_READ,
};

const CTRL: ChannelId = 4;
const DATA: ChannelId = 5;

/// The demo polls the ring directly, so frame notifications go nowhere.
struct NullNotify;

impl RxNotify for NullNotify {
    fn frame_ready(&self) {}
}

fn spawn_proxy(peer: LoopbackPeer) {
    let ctrl_peer = peer.clone();
    thread::spawn(move || loop {
        let Ok(cmd) = ctrl_peer.pull_exact(CTRL, 2) else {
            return;
        };
        let confirm = match cmd[0] {
            CMD_OPEN => vec![RSP_OPEN, 0],
            CMD_CLOSE => vec![RSP_CLOSE, 0],
            CMD_GET_MAC => vec![RSP_GET_MAC, 0, 0x02, 0x00, 0x5E, 0x00, 0x00, 0x01],
            CMD_STOP_READ => vec![RSP_STOP_READ, 0],
            CMD_START_READ => vec![RSP_START_READ, 0],
            _ => return,
        };
        if ctrl_peer.push(CTRL, &confirm).is_err() {
            return;
        }
    });

    thread::spawn(move || loop {
        match peer.pull(DATA, 4096) {
            Ok(bytes) if !bytes.is_empty() => {
                if peer.push(DATA, &bytes).is_err() {
                    return;
                }
            }
            Ok(_) => thread::sleep(Duration::from_millis(1)),
            Err(_) => return,
        }
    });
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(tracing::level_filters::LevelFilter::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .try_init();

    let config = NicConfig {
        ctrl: ChannelConfig::duplex(CTRL),
        data: ChannelConfig::duplex(DATA),
        ..NicConfig::default()
    };
    let (mux, peer) = LoopbackLink::new(&[config.ctrl, config.data]);
    spawn_proxy(peer);

    let mut driver = NicDriver::init(std::sync::Arc::new(mux), config, NullNotify)?;
    let mut consumer = driver
        .take_consumer()
        .ok_or("receive ring was already claimed")?;
    let handle = driver.handle();
    eprintln!("NIC up with MAC {}", handle.mac());

    thread::spawn(move || {
        if let Err(err) = driver.run() {
            eprintln!("receive loop ended: {err}");
        }
    });

    for payload in [&b"hello"[..], &b"loopback"[..], &b"world"[..]] {
        let sent = handle.transmit(payload)?;
        eprintln!("sent {} payload bytes as {} wire bytes", payload.len(), sent);
    }

    let deadline = Instant::now() + Duration::from_secs(2);
    let mut received = 0;
    while received < 3 {
        match consumer.take() {
            Some(frame) => {
                eprintln!("received {:?}", String::from_utf8_lossy(&frame));
                received += 1;
            }
            None if Instant::now() < deadline => thread::sleep(Duration::from_millis(1)),
            None => return Err("timed out waiting for echoed frames".into()),
        }
    }

    handle.shutdown()?;
    Ok(())
}
