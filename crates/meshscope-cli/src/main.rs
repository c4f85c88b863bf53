//! Meshtastic Frame Decoder Command-Line Interface
//!
//! This CLI provides tools for:
//! - Decoding live frames published by an SDR demodulator over ZeroMQ or UDP
//! - Replaying saved captures through the same pipeline
//! - Computing channel hashes for a channel name and key
//!
//! Decoded traffic, raw frame records and the node directory are written to
//! the output directory.

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use meshscope_core::keys::{compute_channel_hash, CandidateKey, KeyRegistry, DEFAULT_PSK_BASE64};
use meshscope_core::pipeline::Pipeline;
use meshscope_core::preset::ModemPreset;
use meshscope_core::sink::{JsonLinesLog, NodeDirectory, RawFrameRecord, TrafficRecord};
use meshscope_core::transport::{CaptureWriter, FrameSource, ReplaySource, UdpFrameSource, ZmqFrameSource};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

const TRAFFIC_FILE: &str = "traffic.jsonl";
const RAW_FILE: &str = "packets_raw.jsonl";
const NODES_FILE: &str = "nodes.json";
const CAPTURE_FILE: &str = "capture.hex";

type FilePipeline = Pipeline<NodeDirectory, JsonLinesLog<TrafficRecord>, JsonLinesLog<RawFrameRecord>>;

#[derive(Parser)]
#[command(name = "meshscope")]
#[command(author, version, about = "Meshtastic frame decoder", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Key file: one base64 key or name:key per line
    #[arg(short, long, default_value = "keys")]
    keys: PathBuf,

    /// Modem preset naming the default channel
    #[arg(short, long, default_value = "LongFast")]
    preset: String,

    /// Save every received frame to capture.hex
    #[arg(short, long)]
    save: bool,

    /// Directory for logs, node directory and captures
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode frames published by the demodulator's ZeroMQ PUB socket
    Listen {
        /// Publisher host
        host: String,

        /// Publisher TCP port
        port: u16,
    },

    /// Decode frames arriving as UDP datagrams
    Udp {
        /// Address to bind
        host: String,

        /// UDP port
        port: u16,
    },

    /// Decode frames from a hex capture file
    Replay {
        /// Capture file (one hex frame per line)
        file: PathBuf,
    },

    /// Compute the channel hash for a name and base64 key
    ChannelHash {
        /// Channel name
        name: String,

        /// Base64 key (1, 16 or 32 bytes once decoded)
        #[arg(default_value = DEFAULT_PSK_BASE64)]
        key: String,
    },

    /// List modem presets and their channel names
    Presets,
}

/// Options shared by the decoding commands
struct RunOptions {
    keys: PathBuf,
    preset: String,
    save: bool,
    out_dir: PathBuf,
}

/// Channel name for a preset argument, falling back to the argument itself
fn default_channel(preset: &str) -> String {
    match preset.parse::<ModemPreset>() {
        Ok(preset) => preset.channel_name().to_string(),
        Err(e) => {
            warn!("{}; using \"{}\" as the channel name", e, preset);
            preset.to_string()
        }
    }
}

fn build_pipeline(opts: &RunOptions) -> Result<FilePipeline> {
    fs::create_dir_all(&opts.out_dir)
        .with_context(|| format!("Failed to create output directory {}", opts.out_dir.display()))?;

    let channel = default_channel(&opts.preset);
    let keys = KeyRegistry::from_key_file(&opts.keys, &channel);

    let nodes = NodeDirectory::open(&opts.out_dir.join(NODES_FILE)).context("Failed to load node directory")?;
    let traffic = open_log(&opts.out_dir, TRAFFIC_FILE)?;
    let raw = open_log(&opts.out_dir, RAW_FILE)?;

    let mut pipeline = Pipeline::new(keys, nodes, traffic, raw);
    if opts.save {
        let capture = CaptureWriter::create(&opts.out_dir.join(CAPTURE_FILE)).context("Failed to open capture file")?;
        pipeline = pipeline.with_capture(capture);
    }
    Ok(pipeline)
}

fn open_log<R: serde::Serialize>(dir: &Path, name: &str) -> Result<JsonLinesLog<R>> {
    let path = dir.join(name);
    JsonLinesLog::create(&path).with_context(|| format!("Failed to open {}", path.display()))
}

fn interrupt_flag() -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;
    Ok(running)
}

fn print_banner(pipeline: &FilePipeline, opts: &RunOptions) {
    println!("Meshtastic Frame Decoder");
    println!("========================");
    println!("Started:      {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
    println!("Channel:      {}", pipeline.keys().default_channel());
    println!("Keys:         {}", pipeline.keys().len());
    println!("Output:       {}", opts.out_dir.display());
    if opts.save {
        println!("Capture:      {}", opts.out_dir.join(CAPTURE_FILE).display());
    }
    println!();
}

fn run_live<S: FrameSource>(mut source: S, label: &str, opts: RunOptions) -> Result<()> {
    let mut pipeline = build_pipeline(&opts)?;
    let running = interrupt_flag()?;

    print_banner(&pipeline, &opts);
    println!("Listening on {}... (Press Ctrl+C to stop)\n", label);

    pipeline.run(&mut source, &running).context("Frame source failed")?;

    println!("\n{}", pipeline.stats());
    Ok(())
}

fn cmd_listen(host: String, port: u16, opts: RunOptions) -> Result<()> {
    let source = ZmqFrameSource::connect(&host, port)
        .with_context(|| format!("Failed to subscribe to tcp://{}:{}", host, port))?;
    let label = source.endpoint().to_string();
    run_live(source, &label, opts)
}

fn cmd_udp(host: String, port: u16, opts: RunOptions) -> Result<()> {
    let source = UdpFrameSource::bind((host.as_str(), port))
        .with_context(|| format!("Failed to bind UDP socket on {}:{}", host, port))?;
    run_live(source, &format!("udp://{}:{}", host, port), opts)
}

fn cmd_replay(file: PathBuf, opts: RunOptions) -> Result<()> {
    let mut pipeline = build_pipeline(&opts)?;
    let mut source =
        ReplaySource::open(&file).with_context(|| format!("Failed to open capture {}", file.display()))?;
    let running = interrupt_flag()?;

    print_banner(&pipeline, &opts);
    pipeline.run(&mut source, &running).context("Replay failed")?;

    println!("{}", pipeline.stats());
    if source.skipped() > 0 {
        println!("{} invalid capture lines skipped", source.skipped());
    }
    info!("replay of {} complete", file.display());
    Ok(())
}

fn cmd_channel_hash(name: String, key: String) -> Result<()> {
    let candidate = CandidateKey::from_base64(&key, Some(&name)).with_context(|| format!("Invalid key: {}", key))?;
    let hash = compute_channel_hash(&name, candidate.as_bytes());

    println!("Channel:  {}", name);
    println!("Key:      AES-{}{}", candidate.bits(), if candidate.is_default() { " (default)" } else { "" });
    println!("Hash:     0x{:02x} ({})", hash, hash);
    Ok(())
}

fn cmd_presets() -> Result<()> {
    println!("=== Modem Presets ===");
    println!();
    println!("  {:<14} {:<14} {:>4} {:>10} {:>5}", "Preset", "Channel", "SF", "BW (kHz)", "CR");
    for preset in ModemPreset::ALL {
        let (sf, bw, cr) = preset.lora_params();
        println!(
            "  {:<14} {:<14} {:>4} {:>10} {:>5}",
            format!("{:?}", preset),
            preset.channel_name(),
            sf,
            f64::from(bw) / 1000.0,
            format!("4/{}", cr)
        );
    }
    println!();
    println!("Examples:");
    println!("  meshscope -p MediumFast listen 127.0.0.1 20004");
    println!("  meshscope --save -o logs listen 192.168.1.20 20004");
    println!("  meshscope udp 0.0.0.0 5005");
    println!("  meshscope replay logs/capture.hex");
    println!("  meshscope channel-hash LongFast AQ==");

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let opts = RunOptions {
        keys: cli.keys,
        preset: cli.preset,
        save: cli.save,
        out_dir: cli.out_dir,
    };

    match cli.command {
        Commands::Listen { host, port } => cmd_listen(host, port, opts),
        Commands::Udp { host, port } => cmd_udp(host, port, opts),
        Commands::Replay { file } => cmd_replay(file, opts),
        Commands::ChannelHash { name, key } => cmd_channel_hash(name, key),
        Commands::Presets => cmd_presets(),
    }
}
