// Pluggit 通风桥接服务主入口
// Polls the unit on a fixed cycle; item changes typed on stdin as
// `<item>=<value>` are applied to the local item store.

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};
use pluggit_bridge::drivers::ModbusClient;
use pluggit_bridge::{BridgeConfig, ItemSink, ItemStore, ItemValue, PluggitBridge};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

/// Caller identity of changes typed on stdin
const CLI_CALLER: &str = "cli";

#[derive(Parser, Debug)]
#[command(
    name = "pluggit-bridge",
    version,
    about = "Modbus TCP bridge for Pluggit ventilation units"
)]
struct Args {
    /// Path to the JSON configuration file
    #[arg(short, long, default_value = "pluggit.json")]
    config: PathBuf,

    /// Override the unit host
    #[arg(long)]
    host: Option<String>,

    /// Override the Modbus TCP port
    #[arg(long)]
    port: Option<u16>,

    /// Override the refresh period in seconds
    #[arg(long)]
    cycle: Option<u64>,

    /// Run a single refresh cycle, print the items and exit
    #[arg(long)]
    once: bool,

    /// Enable verbose logging (debug level)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Disable all logging output
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if args.quiet {
        logger.filter_level(log::LevelFilter::Off);
    } else if args.verbose {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    let mut config = BridgeConfig::from_file(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(cycle) = args.cycle {
        config.cycle = cycle;
    }
    config.validate()?;

    let store = Arc::new(ItemStore::new());
    for item in &config.items {
        if let Some(value) = &item.value {
            store.set_initial(&item.id, value.clone());
        }
    }

    let transport = ModbusClient::with_timeout(&config.host, config.port, config.timeout());
    let sink: Arc<dyn ItemSink> = store.clone();
    let mut bridge = PluggitBridge::new(config, transport, sink)?;
    bridge.register_triggers(&store);

    if !bridge.probe() {
        warn!("Pluggit: unit not reachable yet, will retry every cycle");
    }

    if args.once {
        let report = bridge.run_cycle()?;
        info!("Pluggit: published {} value(s)", report.published);
        for (item, value) in store.snapshot() {
            println!("{} = {}", item, serde_json::to_string(&value)?);
        }
        return Ok(());
    }

    bridge.start()?;
    info!("Pluggit: bridge running, Ctrl-C to stop");

    // Stdin is read on a plain thread; command handling blocks on the unit
    let input_store = store.clone();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    error!("stdin: {}", e);
                    break;
                }
            };
            match line.split_once('=') {
                Some((item, value)) => {
                    input_store.update(item.trim(), ItemValue::parse(value), CLI_CALLER)
                }
                None if line.trim().is_empty() => {}
                None => warn!("expected <item>=<value>, got '{}'", line),
            }
        }
    });

    // The Modbus client drives its own runtime, so tokio only runs here, on the
    // main thread, to wait for the signal
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(tokio::signal::ctrl_c())?;
    info!("Pluggit: shutting down");
    bridge.stop();
    Ok(())
}
