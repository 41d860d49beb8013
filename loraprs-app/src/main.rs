// loraprs -- LoRa APRS gateway and frame tools.
//
// Usage:
//   loraprs run --mode fixed --aprs-login N0CALL-10 --aprs-pass 12345 \
//       --radio-peer 127.0.0.1:7000
//   loraprs run --mode client --terminal /dev/rfcomm0 --aprs-login N0CALL
//   loraprs decode "82 A0 A4 A6 40 40 60 9C 60 86 82 98 98 61 03 F0 3E 68 69"
//   loraprs encode "N0CALL>APRS,WIDE1-1:>hi" --kiss
//   loraprs kiss --decode "C0 00 41 DB DC 42 C0"

use std::net::SocketAddr;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use loraprs::retry::DEFAULT_BACKOFF;
use loraprs::{Gateway, GatewayConfig, RetryPolicy};
use loraprs_ax25::Ax25Frame;
use loraprs_core::transport::Transport;
use loraprs_core::{format_hex, parse_hex, OperatingMode, StaticUplink, Uplink};
use loraprs_kiss::{encode_frame, Command as KissCommand, KissDecoder};
use loraprs_transport::{SerialTransport, TcpConnector, UdpRadio};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// LoRa APRS gateway -- bridges LoRa, a KISS terminal and APRS-IS.
#[derive(Parser)]
#[command(name = "loraprs", version, about)]
struct Cli {
    /// Log filter (e.g. `debug`, `loraprs=trace`). Overrides RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the gateway until interrupted.
    Run(RunArgs),

    /// Decode a hex AX.25 frame to TNC2 text.
    Decode {
        /// Frame bytes as hex (separators and 0x prefixes allowed).
        hex: String,
    },

    /// Encode TNC2 text as an AX.25 UI frame.
    Encode {
        /// Monitor line, e.g. `N0CALL>APRS,WIDE1-1:>hello`.
        text: String,

        /// Wrap the frame in a KISS data frame.
        #[arg(long)]
        kiss: bool,
    },

    /// KISS-encode a payload, or decode a KISS byte stream.
    Kiss {
        /// Bytes as hex.
        hex: String,

        /// Decode `hex` as a KISS stream instead of encoding it.
        #[arg(long)]
        decode: bool,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Operating mode: `client` (KISS terminal) or `fixed` (APRS-IS gateway).
    #[arg(long, default_value = "client")]
    mode: OperatingMode,

    /// Center frequency in Hz.
    #[arg(long, default_value_t = 433_775_000)]
    freq: u64,

    /// Signal bandwidth in Hz.
    #[arg(long, default_value_t = 125_000)]
    bw: u32,

    /// Spreading factor (6-12).
    #[arg(long, default_value_t = 12)]
    sf: u8,

    /// Coding rate denominator, 4/CR (5-8).
    #[arg(long, default_value_t = 7)]
    cr: u8,

    /// Transmit power in dBm.
    #[arg(long, default_value_t = 20)]
    power: u8,

    /// Sync word (hex, e.g. 0x34).
    #[arg(long, default_value = "0x34", value_parser = parse_hex_u8)]
    sync: u8,

    /// APRS-IS server host.
    #[arg(long, default_value = loraprs::config::DEFAULT_RELAY_HOST)]
    aprs_host: String,

    /// APRS-IS server port.
    #[arg(long, default_value_t = loraprs::config::DEFAULT_RELAY_PORT)]
    aprs_port: u16,

    /// APRS-IS login callsign.
    #[arg(long)]
    aprs_login: String,

    /// APRS-IS passcode.
    #[arg(long, default_value = loraprs::config::DEFAULT_PASSCODE, allow_hyphen_values = true)]
    aprs_pass: String,

    /// Correct the center frequency from each packet's measured error.
    #[arg(long)]
    auto_correct: bool,

    /// Do not append the signal report to forwarded lines.
    #[arg(long)]
    no_signal_report: bool,

    /// Keep the APRS-IS session open between packets.
    #[arg(long)]
    persistent: bool,

    /// Forward APRS-IS traffic to the radio (not supported; ignored).
    #[arg(long)]
    is_to_rf: bool,

    /// Digipeat heard frames (not supported; ignored).
    #[arg(long)]
    digipeat: bool,

    /// KISS terminal serial device (e.g. /dev/rfcomm0).
    #[arg(long)]
    terminal: Option<String>,

    /// KISS terminal baud rate.
    #[arg(long, default_value_t = 115_200)]
    terminal_baud: u32,

    /// Local address for the UDP radio bridge.
    #[arg(long, default_value = "127.0.0.1:7001")]
    radio_bind: String,

    /// Address of the LoRa modem process.
    #[arg(long, default_value = "127.0.0.1:7000")]
    radio_peer: SocketAddr,
}

/// Parse a hex string like "0x34" or "34" into a u8.
fn parse_hex_u8(s: &str) -> std::result::Result<u8, String> {
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u8::from_str_radix(s, 16).map_err(|e| format!("invalid hex byte: {e}"))
}

impl RunArgs {
    fn to_config(&self) -> Result<GatewayConfig> {
        GatewayConfig::builder()
            .mode(self.mode)
            .frequency(self.freq)
            .bandwidth(self.bw)
            .spreading_factor(self.sf)
            .coding_rate(self.cr)
            .tx_power(self.power)
            .sync_word(self.sync)
            .relay_host(&self.aprs_host)
            .relay_port(self.aprs_port)
            .callsign(&self.aprs_login)
            .passcode(&self.aprs_pass)
            .auto_freq_correction(self.auto_correct)
            .signal_report(!self.no_signal_report)
            .persistent_relay(self.persistent)
            .relay_to_radio(self.is_to_rf)
            .digipeat(self.digipeat)
            .build()
            .context("invalid configuration")
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

async fn cmd_run(args: RunArgs) -> Result<()> {
    let config = args.to_config()?;
    let tuning = config.radio().clone();

    let bind = args.radio_bind.as_str();
    let peer = args.radio_peer;
    let radio = RetryPolicy::unbounded(DEFAULT_BACKOFF)
        .retry("radio bring-up", move || {
            UdpRadio::bind(bind, peer, tuning.clone())
        })
        .await
        .context("radio bring-up failed")?;

    let uplink: Box<dyn Uplink> = if config.mode().is_client() {
        Box::new(StaticUplink::down())
    } else {
        Box::new(StaticUplink::up())
    };
    let connector = TcpConnector::new(&config.relay().host, config.relay().port);

    let mut gateway = Gateway::new(config, Box::new(radio), uplink, Box::new(connector));

    if let Some(path) = &args.terminal {
        match SerialTransport::open(path, args.terminal_baud).await {
            Ok(terminal) => {
                let terminal: Box<dyn Transport> = Box::new(terminal);
                gateway = gateway.with_terminal(terminal);
            }
            Err(e) => warn!(port = %path, error = %e, "Terminal unavailable, continuing without it"),
        }
    }

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down");
            trigger.cancel();
        }
    });

    gateway.run(cancel).await.context("gateway failed")
}

fn cmd_decode(hex: &str) -> Result<()> {
    let bytes = parse_hex(hex).context("invalid hex input")?;
    let frame = Ax25Frame::decode(&bytes).context("not a decodable AX.25 UI frame")?;

    println!("{}", frame.to_text(""));
    println!("  Source:       {}", frame.source);
    println!("  Destination:  {}", frame.destination);
    if !frame.path.is_empty() {
        let path: Vec<String> = frame.path.iter().map(ToString::to_string).collect();
        println!("  Path:         {}", path.join(","));
    }
    println!("  Info:         {} bytes", frame.info.len());
    Ok(())
}

fn cmd_encode(text: &str, kiss: bool) -> Result<()> {
    let frame = Ax25Frame::parse_text(text).context("invalid TNC2 text")?;
    let bytes = frame.to_bytes().context("frame could not be encoded")?;
    let out = if kiss {
        encode_frame(KissCommand::Data, &bytes)
    } else {
        bytes
    };
    println!("{}", format_hex(&out));
    Ok(())
}

fn cmd_kiss(hex: &str, decode: bool) -> Result<()> {
    let bytes = parse_hex(hex).context("invalid hex input")?;

    if !decode {
        println!("{}", format_hex(&encode_frame(KissCommand::Data, &bytes)));
        return Ok(());
    }

    let mut decoder = KissDecoder::new();
    let frames = decoder.decode(&bytes);
    if frames.is_empty() {
        bail!("no complete KISS data frame in input");
    }
    for (i, frame) in frames.iter().enumerate() {
        println!("frame {}: {}", i + 1, format_hex(&frame.payload));
    }
    if decoder.pending_len() > 0 {
        println!("({} trailing bytes in an unterminated frame)", decoder.pending_len());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => tracing_subscriber::EnvFilter::new(level),
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    match cli.command {
        Command::Run(args) => cmd_run(args).await,
        Command::Decode { hex } => cmd_decode(&hex),
        Command::Encode { text, kiss } => cmd_encode(&text, kiss),
        Command::Kiss { hex, decode } => cmd_kiss(&hex, decode),
    }
}
