//! Cooperative scheduler
//!
//! One loop drives the whole node. Each iteration reads the clock once,
//! notices button activity first, then runs whichever of the display, sync
//! and logging tasks are due. Nothing runs concurrently with the loop except
//! the button edge handlers, which only touch the [`DebouncedCounter`].

use embassy_time::{Duration, Instant, Timer};
use embedded_hal_async::delay::DelayNs;
use log::{debug, info, warn};

use crate::config::NodeConfig;
use crate::counter::DebouncedCounter;
use crate::link::NetworkLink;
use crate::location::{
    AccessPointScanner, GeolocationTransport, LocationResolver, Position, PositionReceiver,
};
use crate::metrics::BatteryLevel;
use crate::remote::{
    BoundedStore, ReconcileOutcome, RemoteStore, UPDATED_TIME, publish_telemetry, reconcile,
};
use crate::sensors::EnvironmentSource;
use crate::status::{StatusSink, StatusSnapshot};
use crate::storage::{LogMedium, LogOutcome, LogRecord, SampleLogger};
use crate::timestamp::{TimeOfDay, Timestamp, time_string};

/// Pause between two loop iterations.
pub const LOOP_IDLE: Duration = Duration::from_millis(10);

/// Fixed-interval task timer.
///
/// Fires when at least `interval` has passed since it last fired, then
/// restarts from the time it was polled. Missed periods are dropped, not
/// replayed, so a long stall yields a single firing.
#[derive(Debug, Clone, Copy)]
pub struct Periodic {
    interval: Duration,
    last_fired: Instant,
}

impl Periodic {
    /// First firing happens once `interval` has passed since boot.
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_fired: Instant::from_ticks(0),
        }
    }

    pub fn poll(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last_fired) >= self.interval {
            self.last_fired = now;
            true
        } else {
            false
        }
    }
}

/// The peripheral types one build of the node runs on.
pub trait Platform {
    type Link: NetworkLink;
    type Scanner: AccessPointScanner;
    type Transport: GeolocationTransport;
    type Store: RemoteStore;
    type Sensors: EnvironmentSource;
    type Receiver: PositionReceiver;
    type Medium: LogMedium;
    type Delay: DelayNs;
    type Status: StatusSink;
}

/// Everything the node owns besides the shared counter.
pub struct NodeHardware<P: Platform> {
    pub link: P::Link,
    pub scanner: P::Scanner,
    pub transport: P::Transport,
    pub store: P::Store,
    pub sensors: P::Sensors,
    pub receiver: P::Receiver,
    pub medium: P::Medium,
    pub delay: P::Delay,
    pub status: P::Status,
}

/// What a sync tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncReport {
    /// The link was down; a reconnect was requested and the sync waits for it.
    Deferred,
    Completed {
        counter: ReconcileOutcome,
        telemetry_failures: usize,
    },
}

/// What one loop iteration did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// The counter moved since the previous tick.
    pub counter_changed: bool,
    pub display: bool,
    pub sync: Option<SyncReport>,
    pub log: Option<LogOutcome>,
}

/// The telemetry node.
pub struct Node<'a, P: Platform> {
    counter: &'a DebouncedCounter,
    link: P::Link,
    resolver: LocationResolver<P::Scanner, P::Transport>,
    store: P::Store,
    sensors: P::Sensors,
    receiver: P::Receiver,
    logger: SampleLogger<P::Medium>,
    delay: P::Delay,
    status: P::Status,

    display_task: Periodic,
    sync_task: Periodic,
    log_task: Periodic,
    sync_deferred: bool,
    last_count: i32,

    remote_timeout_ms: u32,
    utc_offset_hours: i8,
}

impl<'a, P: Platform> Node<'a, P> {
    pub fn new(config: &NodeConfig, counter: &'a DebouncedCounter, hw: NodeHardware<P>) -> Self {
        counter.set_debounce_window(config.debounce_window());

        Self {
            counter,
            link: hw.link,
            resolver: LocationResolver::new(hw.scanner, hw.transport, config.geolocation_timeout_ms),
            store: hw.store,
            sensors: hw.sensors,
            receiver: hw.receiver,
            logger: SampleLogger::new(hw.medium, config.log_file.clone()),
            delay: hw.delay,
            status: hw.status,
            display_task: Periodic::new(config.display_interval()),
            sync_task: Periodic::new(config.sync_interval()),
            log_task: Periodic::new(config.log_interval()),
            sync_deferred: false,
            last_count: counter.value(),
            remote_timeout_ms: config.remote_timeout_ms,
            utc_offset_hours: config.utc_offset_hours,
        }
    }

    /// Probe the log file name. Failures are logged and retried by the first
    /// logging tick.
    pub fn startup(&mut self) {
        info!("Node starting, people count {}", self.counter.value());
        self.logger.startup();
    }

    /// Run forever.
    pub async fn run(&mut self) -> ! {
        self.startup();
        loop {
            self.tick(Instant::now()).await;
            Timer::after(LOOP_IDLE).await;
        }
    }

    /// One loop iteration at `now`.
    pub async fn tick(&mut self, now: Instant) -> TickReport {
        let mut report = TickReport::default();

        // Edges are applied by the handlers themselves; the loop only has to
        // notice them before anything else runs.
        let people = self.counter.value();
        if people != self.last_count {
            info!("People count: {}", people);
            self.last_count = people;
            report.counter_changed = true;
        }

        let link_up = self.link.is_connected().await;

        if self.display_task.poll(now) {
            self.refresh_status(link_up).await;
            report.display = true;
        }

        if self.sync_task.poll(now) {
            if link_up {
                report.sync = Some(self.sync(link_up).await);
            } else {
                warn!("Sync due with link down, reconnecting");
                self.link.reconnect().await;
                self.sync_deferred = true;
                report.sync = Some(SyncReport::Deferred);
            }
        } else if self.sync_deferred && link_up {
            info!("Link is back, running deferred sync");
            report.sync = Some(self.sync(link_up).await);
        }

        if self.log_task.poll(now) {
            report.log = Some(self.log_sample(link_up).await);
        }

        report
    }

    async fn sync(&mut self, link_up: bool) -> SyncReport {
        self.sync_deferred = false;

        let mut store = BoundedStore::new(&mut self.store, &mut self.delay, self.remote_timeout_ms);
        let counter = reconcile(self.counter, &mut store).await;
        debug!("Counter sync: {:?}", counter);
        if let ReconcileOutcome::AdoptedRemote(value) = counter {
            self.last_count = value;
        }

        let position = self
            .resolver
            .resolve(link_up, &self.receiver, &mut self.delay)
            .await;
        let climate = self.sensors.read_climate().await;

        let mut store = BoundedStore::new(&mut self.store, &mut self.delay, self.remote_timeout_ms);
        let telemetry_failures = publish_telemetry(&mut store, &position, climate).await;

        SyncReport::Completed {
            counter,
            telemetry_failures,
        }
    }

    async fn log_sample(&mut self, link_up: bool) -> LogOutcome {
        let environment = self.sensors.read_environment().await;
        let position: Position = self
            .resolver
            .resolve(link_up, &self.receiver, &mut self.delay)
            .await;
        let timestamp = self.timestamp(link_up).await;

        let record = LogRecord::new(
            &timestamp,
            self.utc_offset_hours,
            &position,
            &environment,
            self.counter.value(),
        );
        self.logger.log(&record)
    }

    async fn refresh_status(&mut self, link_up: bool) {
        let battery_volts = self.sensors.read_battery_volts().await;
        let climate = self.sensors.read_climate().await;
        let timestamp = self.timestamp(link_up).await;

        let snapshot = StatusSnapshot {
            battery_volts,
            battery: BatteryLevel::assess(battery_volts.unwrap_or(f32::NAN)),
            time: timestamp.time_field(self.utc_offset_hours),
            temperature_f: climate.map(|c| c.temperature_f),
            humidity_percent: climate.map(|c| c.humidity_percent),
            people: self.counter.value(),
            link_up,
        };
        self.status.publish(&snapshot);
    }

    /// Remote time when the link is up, else receiver time, else unavailable.
    /// The date always comes from the receiver.
    async fn timestamp(&mut self, link_up: bool) -> Timestamp {
        let date = self.receiver.date();

        if link_up {
            let mut store =
                BoundedStore::new(&mut self.store, &mut self.delay, self.remote_timeout_ms);
            match store.get_string(UPDATED_TIME).await {
                Ok(text) => {
                    return Timestamp {
                        date,
                        time: TimeOfDay::Remote(time_string(&text)),
                    };
                }
                Err(e) => debug!("Remote time unavailable ({}), using receiver", e),
            }
        }

        Timestamp {
            date,
            time: match self.receiver.time() {
                Some(time) => TimeOfDay::Receiver(time),
                None => TimeOfDay::Unavailable,
            },
        }
    }

    pub fn counter(&self) -> &DebouncedCounter {
        self.counter
    }

    pub fn link_mut(&mut self) -> &mut P::Link {
        &mut self.link
    }

    pub fn store_mut(&mut self) -> &mut P::Store {
        &mut self.store
    }

    pub fn receiver_mut(&mut self) -> &mut P::Receiver {
        &mut self.receiver
    }

    pub fn logger_mut(&mut self) -> &mut SampleLogger<P::Medium> {
        &mut self.logger
    }

    pub fn status_mut(&mut self) -> &mut P::Status {
        &mut self.status
    }
}
