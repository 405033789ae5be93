//! Desktop simulator for the fieldnode telemetry node.
//!
//! Runs the core scheduler against simulated surroundings: a link with a
//! fixed up/down duty cycle, an in-memory remote store that another client
//! edits now and then, a positioning receiver fed NMEA sentences, synthetic
//! sensors and a button thread that presses (and bounces) at random. The log
//! is written to a host directory standing in for the SD card.
//!
//! ```text
//! RUST_LOG=info cargo run -p fieldnode-simulator -- sim.toml
//! ```

mod config;
mod fs_medium;
mod world;

use std::time::Duration as StdDuration;

use anyhow::Context;
use embassy_futures::block_on;
use embassy_time::Instant;
use log::{debug, info};

use fieldnode_core::counter::{DEFAULT_DEBOUNCE, DebouncedCounter, EdgeDirection};
use fieldnode_core::scheduler::{LOOP_IDLE, Node, NodeHardware, Platform};
use fieldnode_core::sensors::SensorSuite;
use fieldnode_core::status::LogStatusSink;

use config::{ButtonConfig, SimConfig};
use fs_medium::FsMedium;
use world::{
    SharedReceiver, SimAnalog, SimClimate, SimGeolocation, SimLink, SimScanner, SimStore,
    spawn_receiver_feed,
};

/// Reached by the button thread the same way the firmware's edge tasks reach it.
static PEOPLE: DebouncedCounter = DebouncedCounter::new(DEFAULT_DEBOUNCE);

struct Simulated;

impl Platform for Simulated {
    type Link = SimLink;
    type Scanner = SimScanner;
    type Transport = SimGeolocation;
    type Store = SimStore;
    type Sensors = SensorSuite<SimClimate, SimAnalog, SimAnalog, SimAnalog>;
    type Receiver = SharedReceiver;
    type Medium = FsMedium;
    type Delay = embassy_time::Delay;
    type Status = LogStatusSink;
}

/// xorshift32; the simulation only needs varied spacing, not quality.
struct Jitter(u32);

impl Jitter {
    fn next(&mut self) -> u32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        x
    }
}

fn spawn_buttons(config: ButtonConfig) {
    std::thread::spawn(move || {
        let mut jitter = Jitter(0x9e37_79b9);
        loop {
            let wait = config.mean_interval_ms / 2
                + u64::from(jitter.next()) % config.mean_interval_ms.max(1);
            std::thread::sleep(StdDuration::from_millis(wait));

            let direction = if jitter.next() % 100 < u32::from(config.decrement_percent) {
                EdgeDirection::Decrement
            } else {
                EdgeDirection::Increment
            };
            PEOPLE.on_edge(direction, Instant::now());

            // Contact bounce, rejected by the debounce window.
            std::thread::sleep(StdDuration::from_millis(config.bounce_ms));
            if PEOPLE.on_edge(direction, Instant::now()) {
                debug!("Bounce accepted, debounce window shorter than bounce");
            }
        }
    });
}

fn spawn_foreign_editor(store: SimStore, every_secs: u64) {
    if every_secs == 0 {
        return;
    }
    std::thread::spawn(move || {
        loop {
            std::thread::sleep(StdDuration::from_secs(every_secs));
            let value = store.foreign_edit(5);
            info!("Another client set the remote counter to {}", value);
        }
    });
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    info!("Starting fieldnode simulator");
    info!("{:?}", config.node);

    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "Failed to create medium directory {}",
            config.output_dir.display()
        )
    })?;

    let store = SimStore::new();
    let receiver = SharedReceiver::default();
    spawn_receiver_feed(receiver.clone(), config.position.clone());
    spawn_foreign_editor(store.clone(), config.remote.foreign_edit_secs);
    spawn_buttons(config.buttons.clone());

    let sensors = SensorSuite::new(
        SimClimate::new(),
        SimAnalog::new(1800, 900, 600.0),
        SimAnalog::new(900, 600, 45.0),
        SimAnalog::new(2400, 150, 3_600.0),
        config.node.temperature_offset_f,
    );

    let hardware = NodeHardware::<Simulated> {
        link: SimLink::new(config.link.clone()),
        scanner: SimScanner,
        transport: SimGeolocation::new(&config.position),
        store: store.clone(),
        sensors,
        receiver,
        medium: FsMedium::new(&config.output_dir),
        delay: embassy_time::Delay,
        status: LogStatusSink,
    };

    let mut node = Node::new(&config.node, &PEOPLE, hardware);
    node.startup();

    let started = std::time::Instant::now();
    let idle = StdDuration::from_millis(LOOP_IDLE.as_millis());
    loop {
        let report = block_on(node.tick(Instant::now()));
        if report.sync.is_some() || report.log.is_some() {
            debug!("{:?}", report);
        }

        if config.run_for_secs > 0 && started.elapsed().as_secs() >= config.run_for_secs {
            break;
        }
        std::thread::sleep(idle);
    }

    info!(
        "Simulator exiting: local count {}, remote count {:?}",
        PEOPLE.value(),
        store.counter()
    );
    Ok(())
}
