//! End-to-end tests of the gateway loop against mock collaborators.

use std::time::Duration;

use loraprs::{Gateway, GatewayConfig, GatewayConfigBuilder, RelayState, RetryPolicy};
use loraprs_ax25::Ax25Frame;
use loraprs_core::{OperatingMode, RadioPacket, SignalMetrics};
use loraprs_kiss::{encode_frame, Command, FEND, FESC, TFEND};
use loraprs_test_harness::{MockConnector, MockRadio, MockTransport, MockUplink};
use tokio_util::sync::CancellationToken;

const FREQ: u64 = 433_775_000;
const TEXT: &str = "N0CALL-7>APLRT1,WIDE1-1:!4903.50N/07201.75W-hello";

/// Mocks kept on the test side after the gateway takes its boxed clones.
struct Rig {
    radio: MockRadio,
    terminal: MockTransport,
    uplink: MockUplink,
    connector: MockConnector,
}

fn builder(mode: OperatingMode) -> GatewayConfigBuilder {
    GatewayConfig::builder()
        .mode(mode)
        .frequency(FREQ)
        .callsign("N0GW")
        .passcode("12345")
}

fn gateway(config: GatewayConfig, uplink_up: bool) -> (Gateway, Rig) {
    let rig = Rig {
        radio: MockRadio::new(config.radio().freq_hz),
        terminal: MockTransport::new(),
        uplink: MockUplink::new(uplink_up),
        connector: MockConnector::new(),
    };
    let gw = Gateway::new(
        config,
        Box::new(rig.radio.clone()),
        Box::new(rig.uplink.clone()),
        Box::new(rig.connector.clone()),
    )
    .with_terminal(Box::new(rig.terminal.clone()))
    .with_uplink_retry(RetryPolicy::unbounded(Duration::from_millis(1)))
    .with_poll_interval(Duration::from_millis(1));
    (gw, rig)
}

fn raw_frame(text: &str) -> Vec<u8> {
    Ax25Frame::parse_text(text).unwrap().to_bytes().unwrap()
}

fn packet(text: &str, snr_db: f32, rssi_dbm: f32, freq_error_hz: i64) -> RadioPacket {
    RadioPacket::new(
        raw_frame(text),
        SignalMetrics {
            snr_db,
            rssi_dbm,
            freq_error_hz,
        },
    )
}

fn login() -> String {
    format!("user N0GW pass 12345 vers loraprs {}\n", env!("CARGO_PKG_VERSION"))
}

// ---------------------------------------------------------------------------
// Radio -> relay
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fixed_station_forwards_with_signal_report() {
    let (mut gw, rig) = gateway(builder(OperatingMode::Fixed).build().unwrap(), true);
    rig.radio.push_packet(packet(TEXT, -3.0, -80.0, 150));

    gw.poll_once().await.unwrap();

    let expected = format!("{}{TEXT} rssi: -83.00dBm, snr: -3.00dB, err: 150Hz\n", login());
    assert_eq!(rig.connector.session_texts(), vec![expected]);
    assert_eq!(gw.relay_state(), RelayState::Disconnected);
    assert_eq!(gw.stats().lines_forwarded, 1);
}

#[tokio::test]
async fn signal_report_can_be_disabled() {
    let config = builder(OperatingMode::Fixed)
        .signal_report(false)
        .build()
        .unwrap();
    let (mut gw, rig) = gateway(config, true);
    rig.radio.push_packet(packet(TEXT, 5.0, -80.0, 0));

    gw.poll_once().await.unwrap();

    assert_eq!(rig.connector.session_texts(), vec![format!("{}{TEXT}\n", login())]);
}

#[tokio::test]
async fn persistent_relay_stays_connected_across_packets() {
    let config = builder(OperatingMode::Fixed)
        .signal_report(false)
        .persistent_relay(true)
        .build()
        .unwrap();
    let (mut gw, rig) = gateway(config, true);
    rig.radio.push_packet(packet(TEXT, 5.0, -80.0, 0));
    rig.radio.push_packet(packet("N0CALL>APRS:>second", 5.0, -80.0, 0));

    gw.poll_once().await.unwrap();
    assert_eq!(gw.relay_state(), RelayState::Connected);
    gw.poll_once().await.unwrap();
    assert_eq!(gw.relay_state(), RelayState::Connected);

    assert_eq!(rig.connector.attempts(), 1);
    assert_eq!(
        rig.connector.session_texts(),
        vec![format!("{}{TEXT}\nN0CALL>APRS:>second\n", login())]
    );
}

#[tokio::test]
async fn client_mode_echoes_but_never_forwards() {
    let (mut gw, rig) = gateway(builder(OperatingMode::Client).build().unwrap(), false);
    let pkt = packet(TEXT, 5.0, -80.0, 0);
    let raw = pkt.data.clone();
    rig.radio.push_packet(pkt);

    gw.poll_once().await.unwrap();

    assert_eq!(rig.terminal.sent_data(), vec![encode_frame(Command::Data, &raw)]);
    assert_eq!(rig.connector.attempts(), 0);
    assert_eq!(rig.uplink.attempts(), 0);
    assert_eq!(gw.stats().packets_received, 1);
    assert_eq!(gw.stats().lines_forwarded, 0);
}

#[tokio::test]
async fn non_utf8_info_reaches_relay_unchanged() {
    let config = builder(OperatingMode::Fixed)
        .signal_report(false)
        .build()
        .unwrap();
    let (mut gw, rig) = gateway(config, true);
    let mut raw = raw_frame("N0CALL>APRS:>");
    raw.extend_from_slice(&[0xB0, b'C']);
    rig.radio.push_packet(RadioPacket::new(raw, SignalMetrics::default()));

    gw.poll_once().await.unwrap();

    let sent: Vec<u8> = rig.connector.sessions()[0].sent_data().concat();
    let mut expected = login().into_bytes();
    expected.extend_from_slice(b"N0CALL>APRS:>\xB0C\n");
    assert_eq!(sent, expected);
}

#[tokio::test]
async fn info_is_cut_at_first_line_break() {
    let config = builder(OperatingMode::Fixed)
        .signal_report(false)
        .build()
        .unwrap();
    let (mut gw, rig) = gateway(config, true);
    let mut raw = raw_frame("N0CALL>APRS:>hi");
    raw.extend_from_slice(b"\r\nEVIL>APRS:>forged");
    let echoed = encode_frame(Command::Data, &raw);
    rig.radio.push_packet(RadioPacket::new(raw, SignalMetrics::default()));

    gw.poll_once().await.unwrap();

    assert_eq!(
        rig.connector.session_texts(),
        vec![format!("{}N0CALL>APRS:>hi\n", login())]
    );
    // The terminal still sees the packet exactly as heard.
    assert_eq!(rig.terminal.sent_data(), vec![echoed]);
}

#[tokio::test]
async fn line_break_cut_keeps_signal_report() {
    let (mut gw, rig) = gateway(builder(OperatingMode::Fixed).build().unwrap(), true);
    let mut raw = raw_frame("N0CALL>APRS:>hi");
    raw.extend_from_slice(b"\nEVIL>APRS:>forged\r");
    rig.radio.push_packet(RadioPacket::new(
        raw,
        SignalMetrics {
            snr_db: 5.0,
            rssi_dbm: -80.0,
            freq_error_hz: 0,
        },
    ));

    gw.poll_once().await.unwrap();

    let text = &rig.connector.session_texts()[0];
    assert_eq!(
        text,
        &format!("{}N0CALL>APRS:>hi rssi: -80.00dBm, snr: 5.00dB, err: 0Hz\n", login())
    );
    assert_eq!(text.matches('\n').count(), 2);
}

#[tokio::test]
async fn undecodable_packet_is_echoed_and_dropped() {
    let (mut gw, rig) = gateway(builder(OperatingMode::Fixed).build().unwrap(), true);
    // Framing markers inside the payload must survive the echo escaped.
    let junk = vec![0x01, FEND, 0x02, FESC, 0x03];
    rig.radio
        .push_packet(RadioPacket::new(junk.clone(), SignalMetrics::default()));

    gw.poll_once().await.unwrap();

    assert_eq!(
        rig.terminal.sent_data(),
        vec![vec![FEND, 0x00, 0x01, FESC, TFEND, 0x02, FESC, 0xDD, 0x03, FEND]]
    );
    assert_eq!(rig.connector.attempts(), 0);
    assert_eq!(gw.stats().frames_dropped, 1);
}

#[tokio::test]
async fn relay_failure_loses_line_and_retries_next_time() {
    let config = builder(OperatingMode::Fixed)
        .signal_report(false)
        .build()
        .unwrap();
    let (mut gw, rig) = gateway(config, true);
    rig.connector.refuse_next(1);
    rig.radio.push_packet(packet(TEXT, 5.0, -80.0, 0));
    rig.radio.push_packet(packet("N0CALL>APRS:>second", 5.0, -80.0, 0));

    gw.poll_once().await.unwrap();
    assert_eq!(gw.stats().relay_failures, 1);
    assert!(rig.connector.sessions().is_empty());

    gw.poll_once().await.unwrap();
    assert_eq!(
        rig.connector.session_texts(),
        vec![format!("{}N0CALL>APRS:>second\n", login())]
    );
}

// ---------------------------------------------------------------------------
// Uplink
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fixed_station_reconnects_uplink_before_forwarding() {
    let (mut gw, rig) = gateway(builder(OperatingMode::Fixed).build().unwrap(), false);
    rig.uplink.fail_reconnects(2);
    rig.radio.push_packet(packet(TEXT, 5.0, -80.0, 0));

    gw.poll_once().await.unwrap();

    assert_eq!(rig.uplink.attempts(), 3);
    assert_eq!(gw.stats().lines_forwarded, 1);
}

#[tokio::test]
async fn bounded_uplink_retry_surfaces_error() {
    let (gw, rig) = gateway(builder(OperatingMode::Fixed).build().unwrap(), false);
    let mut gw = gw.with_uplink_retry(RetryPolicy::bounded(2, Duration::from_millis(1)));
    rig.uplink.fail_reconnects(5);
    rig.radio.push_packet(packet(TEXT, 5.0, -80.0, 0));

    assert!(gw.poll_once().await.is_err());
    // Nothing else happened this iteration.
    assert_eq!(rig.radio.pending(), 1);
}

// ---------------------------------------------------------------------------
// Frequency correction
// ---------------------------------------------------------------------------

#[tokio::test]
async fn auto_correction_subtracts_error() {
    let config = builder(OperatingMode::Client)
        .auto_freq_correction(true)
        .build()
        .unwrap();
    let (mut gw, rig) = gateway(config, false);
    rig.radio.push_packet(packet(TEXT, 5.0, -80.0, 150));
    rig.radio.push_packet(packet(TEXT, 5.0, -80.0, -50));

    gw.poll_once().await.unwrap();
    assert_eq!(gw.frequency(), 433_774_850);
    gw.poll_once().await.unwrap();
    assert_eq!(gw.frequency(), 433_774_900);
    assert_eq!(rig.radio.retunes(), vec![433_774_850, 433_774_900]);
}

#[tokio::test]
async fn correction_disabled_leaves_frequency() {
    let (mut gw, rig) = gateway(builder(OperatingMode::Client).build().unwrap(), false);
    rig.radio.push_packet(packet(TEXT, 5.0, -80.0, 150));

    gw.poll_once().await.unwrap();
    assert_eq!(gw.frequency(), FREQ);
    assert!(rig.radio.retunes().is_empty());
}

// ---------------------------------------------------------------------------
// Terminal -> radio
// ---------------------------------------------------------------------------

#[tokio::test]
async fn terminal_frames_are_transmitted_whole() {
    let (mut gw, rig) = gateway(builder(OperatingMode::Client).build().unwrap(), false);
    let first = raw_frame(TEXT);
    let second = vec![0x10, FEND, 0x20];

    let mut wire = encode_frame(Command::Data, &first);
    wire.extend(encode_frame(Command::Data, &second));
    // Split mid-escape to exercise decoding across reads.
    let split = wire.len() - 3;
    rig.terminal.push_inbound(&wire[..split]);
    rig.terminal.push_inbound(&wire[split..]);

    gw.poll_once().await.unwrap();

    assert_eq!(rig.radio.transmitted(), vec![first, second]);
    assert_eq!(rig.terminal.pending_inbound(), 0);
    assert_eq!(gw.stats().frames_transmitted, 2);
}

#[tokio::test]
async fn terminal_recovers_from_bad_escape() {
    let (mut gw, rig) = gateway(builder(OperatingMode::Client).build().unwrap(), false);
    rig.terminal
        .push_inbound(&[FEND, 0x00, 0x41, FESC, 0x99, FEND, 0x00, 0x42, FEND]);

    gw.poll_once().await.unwrap();

    assert_eq!(rig.radio.transmitted(), vec![vec![0x42]]);
}

#[tokio::test]
async fn non_data_commands_are_not_transmitted() {
    let (mut gw, rig) = gateway(builder(OperatingMode::Client).build().unwrap(), false);
    // TX delay (command 1) followed by a data frame.
    rig.terminal.push_inbound(&[FEND, 0x01, 0x32, FEND, FEND, 0x00, 0x43, FEND]);

    gw.poll_once().await.unwrap();

    assert_eq!(rig.radio.transmitted(), vec![vec![0x43]]);
}

#[tokio::test]
async fn lost_terminal_is_detached() {
    let (mut gw, rig) = gateway(builder(OperatingMode::Client).build().unwrap(), false);
    rig.terminal.push_connection_lost();
    rig.radio.push_packet(packet(TEXT, 5.0, -80.0, 0));

    gw.poll_once().await.unwrap();

    assert!(!gw.has_terminal());
    assert!(rig.terminal.sent_data().is_empty());
    assert_eq!(gw.stats().packets_received, 1);

    // The loop keeps running without it.
    rig.radio.push_packet(packet(TEXT, 5.0, -80.0, 0));
    gw.poll_once().await.unwrap();
    assert_eq!(gw.stats().packets_received, 2);
}

#[tokio::test]
async fn gateway_runs_without_terminal() {
    let config = builder(OperatingMode::Fixed).build().unwrap();
    let radio = MockRadio::new(FREQ);
    let connector = MockConnector::new();
    let mut gw = Gateway::new(
        config,
        Box::new(radio.clone()),
        Box::new(MockUplink::new(true)),
        Box::new(connector.clone()),
    );
    radio.push_packet(packet(TEXT, 5.0, -80.0, 0));

    gw.poll_once().await.unwrap();

    assert!(!gw.has_terminal());
    assert_eq!(connector.sessions().len(), 1);
}

// ---------------------------------------------------------------------------
// Run loop
// ---------------------------------------------------------------------------

#[tokio::test]
async fn run_stops_on_cancel_and_closes_links() {
    let config = builder(OperatingMode::Fixed)
        .persistent_relay(true)
        .build()
        .unwrap();
    let (mut gw, rig) = gateway(config, true);
    rig.radio.push_packet(packet(TEXT, 5.0, -80.0, 0));
    rig.terminal.push_inbound(&encode_frame(Command::Data, b"beacon"));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    tokio::time::timeout(Duration::from_secs(5), gw.run(cancel))
        .await
        .expect("gateway did not stop")
        .unwrap();

    assert_eq!(gw.stats().lines_forwarded, 1);
    assert_eq!(rig.radio.transmitted(), vec![b"beacon".to_vec()]);
    assert_eq!(gw.relay_state(), RelayState::Disconnected);
    assert_eq!(rig.connector.sessions()[0].close_count(), 1);
    assert_eq!(rig.terminal.close_count(), 1);
}
