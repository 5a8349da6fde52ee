//! Bridge a simulated fleet of bulbs that keep dropping off the network.
//!
//! Shows the platform keeping one accessory per bulb while the bulbs go
//! offline and come back with new connections, and how characteristic
//! requests behave in each state.
//!
//! Run with: cargo run --example simulated_bridge -- --help

use std::collections::HashMap;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::{Parser, Subcommand};
use futures::channel::mpsc;
use futures::SinkExt;
use lifx_lan_bridge::{
    AccessoryHost, AccessoryInfo, Characteristic, CharacteristicValue, DeviceId, DiscoveryEvent,
    HardwareInfo, Hsbk, LightState, Platform, PlatformConfig, PowerMode, StateReport, Transport,
    runtime,
};

#[derive(Parser)]
#[command(name = "simulated-bridge")]
#[command(about = "Drive the LIFX bridge against simulated bulbs", long_about = None)]
struct Cli {
    /// Platform configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover bulbs, then take them offline and online again
    Run {
        /// Number of simulated bulbs
        #[arg(short, long, default_value = "3")]
        bulbs: u8,

        /// Offline/online cycles per bulb
        #[arg(long, default_value = "2")]
        cycles: u32,

        /// Delay between discovery events in milliseconds
        #[arg(short, long, default_value = "100")]
        interval: u64,
    },

    /// Print the cached devices from the configured cache file
    Cache,
}

/// A connection to one simulated bulb.
#[derive(Debug, Clone)]
struct SimHandle {
    id: DeviceId,
    connection: u32,
}

struct SimBulb {
    report: StateReport,
    model: &'static str,
    online: bool,
}

#[derive(Default)]
struct SimTransport {
    bulbs: Mutex<HashMap<DeviceId, SimBulb>>,
}

impl SimTransport {
    fn add(&self, id: &DeviceId, label: &str, model: &'static str) {
        let bulb = SimBulb {
            report: StateReport::new(Some(label), LightState::default()),
            model,
            online: true,
        };
        self.bulbs.lock().unwrap().insert(id.clone(), bulb);
    }

    fn set_online(&self, id: &DeviceId, online: bool) {
        if let Some(bulb) = self.bulbs.lock().unwrap().get_mut(id) {
            bulb.online = online;
        }
    }

    fn with_bulb<R>(&self, handle: &SimHandle, f: impl FnOnce(&mut SimBulb) -> R) -> io::Result<R> {
        let mut bulbs = self.bulbs.lock().unwrap();
        match bulbs.get_mut(&handle.id) {
            Some(bulb) if bulb.online => Ok(f(bulb)),
            _ => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("no answer on connection {}", handle.connection),
            )),
        }
    }
}

impl Transport for SimTransport {
    type Handle = SimHandle;

    async fn get_state(&self, handle: &SimHandle) -> io::Result<StateReport> {
        runtime::sleep(Duration::from_millis(5)).await;
        self.with_bulb(handle, |bulb| bulb.report.clone())
    }

    async fn get_hardware_info(&self, handle: &SimHandle) -> io::Result<HardwareInfo> {
        self.with_bulb(handle, |bulb| HardwareInfo::from_names("LIFX", bulb.model))
    }

    async fn get_ambient_light(&self, handle: &SimHandle) -> io::Result<f32> {
        self.with_bulb(handle, |_| 42.0)
    }

    async fn set_power(&self, handle: &SimHandle, power: PowerMode, _fade: Duration) -> io::Result<()> {
        self.with_bulb(handle, |bulb| {
            bulb.report.state = LightState::new(power, *bulb.report.state.color());
        })
    }

    async fn set_color(&self, handle: &SimHandle, color: &Hsbk, _fade: Duration) -> io::Result<()> {
        self.with_bulb(handle, |bulb| {
            bulb.report.state = LightState::new(bulb.report.state.power(), *color);
        })
    }
}

/// Host that prints what a bridging framework would be asked to do.
struct PrintingHost;

impl AccessoryHost for PrintingHost {
    fn register_accessory(&self, info: &AccessoryInfo) {
        println!(
            "  + accessory {} ({}) uuid={}",
            info.display_name, info.serial_number, info.uuid
        );
    }

    fn unregister_accessory(&self, id: &DeviceId) {
        println!("  - accessory {id}");
    }

    fn bind(&self, id: &DeviceId, characteristics: &[Characteristic], state: &LightState) {
        let names: Vec<String> = characteristics.iter().map(|c| c.to_string()).collect();
        println!("  ~ {id} bound [{}] power={:?}", names.join(", "), state.power());
    }

    fn unbind(&self, id: &DeviceId) {
        println!("  ~ {id} unbound (No Response)");
    }
}

const MODELS: [&str; 3] = ["LIFX Color 1000", "LIFX White 800", "LIFX Mini Day and Dusk"];

fn load_config(path: Option<&PathBuf>) -> Result<PlatformConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(PlatformConfig::from_json(&std::fs::read_to_string(path)?)?),
        None => Ok(PlatformConfig::default()),
    }
}

async fn run(
    config: PlatformConfig,
    bulbs: u8,
    cycles: u32,
    interval: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let transport = Arc::new(SimTransport::default());
    let platform = Arc::new(Platform::new(
        Arc::clone(&transport),
        Arc::new(PrintingHost),
        config,
    ));

    let restored = platform.load_cache().await?;
    if restored > 0 {
        println!("Restored {restored} device(s) from cache");
    }

    let (mut events, stream) = mpsc::unbounded();
    let pump = Arc::clone(&platform).spawn(stream);

    let ids: Vec<DeviceId> = (1..=bulbs)
        .map(|n| DeviceId::from(format!("d073d50000{n:02x}")))
        .collect();
    let mut connection = 0;
    let mut next_handle = |id: &DeviceId| {
        connection += 1;
        SimHandle {
            id: id.clone(),
            connection,
        }
    };

    println!("Discovering {} bulb(s)...", ids.len());
    for (n, id) in ids.iter().enumerate() {
        transport.add(id, &format!("Bulb {}", n + 1), MODELS[n % MODELS.len()]);
        let address = SocketAddr::from((Ipv4Addr::new(192, 168, 1, 20 + n as u8), 56700));
        events
            .send(DiscoveryEvent::New {
                id: id.clone(),
                address: Some(address),
                handle: next_handle(id),
            })
            .await?;
        runtime::sleep(interval).await;
    }

    for cycle in 1..=cycles {
        println!("\nCycle {cycle}: everything drops off");
        for id in &ids {
            transport.set_online(id, false);
            events.send(DiscoveryEvent::Offline { id: id.clone() }).await?;
        }
        runtime::sleep(interval).await;

        if let Some(id) = ids.first() {
            let dispatch = platform
                .set(id, Characteristic::On, CharacteristicValue::Bool(true))
                .await?;
            let on = platform.get(id, Characteristic::On).await?;
            println!("  set On while offline -> {dispatch:?}; reads {on:?}");
        }

        println!("Cycle {cycle}: everything comes back");
        for id in &ids {
            transport.set_online(id, true);
            events
                .send(DiscoveryEvent::Online {
                    id: id.clone(),
                    address: None,
                    handle: next_handle(id),
                })
                .await?;
        }
        runtime::sleep(interval).await;

        for id in &ids {
            let dispatch = platform
                .set(id, Characteristic::ColorTemperature, CharacteristicValue::Number(250.0))
                .await?;
            let kelvin = platform.get(id, Characteristic::Kelvin).await?;
            println!("  {id}: set 250 mired -> {dispatch:?}; kelvin now {kelvin:?}");
        }
    }

    events.close_channel();
    let seen = pump.await;
    println!("\nPump handled {seen} event(s)");
    platform.save_cache().await?;

    let diagnostics = platform.registry().diagnostics().await;
    println!("\nDiagnostics:\n{}", serde_json::to_string_pretty(&diagnostics)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Run {
            bulbs,
            cycles,
            interval,
        } => run(config, bulbs, cycles, Duration::from_millis(interval)).await?,

        Commands::Cache => {
            let path = config
                .cache_path
                .ok_or("No cachePath in the configuration. Use --config <FILE>")?;
            let cache = lifx_lan_bridge::DeviceCache::load(&path)?;
            if cache.is_empty() {
                println!("No cached devices.");
            }
            for (id, device) in cache.iter() {
                println!(
                    "  {id}: {} {}",
                    device.display_name,
                    device.model.as_deref().unwrap_or("unknown model")
                );
            }
        }
    }

    Ok(())
}
