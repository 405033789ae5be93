//! Debounced occupancy counter
//!
//! The counter is the only state shared between the button edge context and
//! the main loop. Every access goes through a critical section, so neither
//! side can observe a half-applied update and the main loop's compound
//! read-modify-write sequences cannot interleave with an edge.

use core::cell::Cell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Duration, Instant};

/// Default minimum spacing between two accepted edges.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(50);

/// Which button produced an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeDirection {
    Increment,
    Decrement,
}

#[derive(Debug, Clone, Copy)]
struct CounterState {
    value: i32,
    locally_modified: bool,
    /// Shared by both buttons: an increment followed by a decrement inside
    /// the window is suppressed as well.
    last_accepted: Option<Instant>,
    window: Duration,
    /// Bumped on every accepted edge so a reconciliation pass can tell
    /// whether the counter moved while it was talking to the remote store.
    generation: u32,
}

/// Consistent copy of the counter taken at the start of a reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub value: i32,
    pub locally_modified: bool,
    generation: u32,
}

/// Result of closing a reconciliation pass against the live counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassClose {
    /// No edge landed during the pass; the dirty flag is now clear.
    Closed,
    /// Edges landed during the pass. The counter keeps them and stays dirty
    /// so the next pass pushes them.
    Superseded,
}

/// Occupancy counter fed by button edges and adjusted by remote sync.
///
/// Meant to live in a `static` so the edge handlers can reach it:
///
/// ```rust,ignore
/// static PEOPLE: DebouncedCounter = DebouncedCounter::new(DEFAULT_DEBOUNCE);
///
/// // edge context
/// PEOPLE.on_edge(EdgeDirection::Increment, Instant::now());
/// ```
pub struct DebouncedCounter {
    state: Mutex<CriticalSectionRawMutex, Cell<CounterState>>,
}

impl DebouncedCounter {
    pub const fn new(window: Duration) -> Self {
        Self {
            state: Mutex::new(Cell::new(CounterState {
                value: 0,
                locally_modified: false,
                last_accepted: None,
                window,
                generation: 0,
            })),
        }
    }

    fn update<R>(&self, f: impl FnOnce(&mut CounterState) -> R) -> R {
        self.state.lock(|cell| {
            let mut state = cell.get();
            let out = f(&mut state);
            cell.set(state);
            out
        })
    }

    fn read(&self) -> CounterState {
        self.state.lock(|cell| cell.get())
    }

    /// Change the debounce window. A zero window accepts every edge.
    pub fn set_debounce_window(&self, window: Duration) {
        self.update(|state| state.window = window);
    }

    /// Record a button edge observed at `at`.
    ///
    /// Safe to call from an interrupt or edge-wait task: it never blocks,
    /// never allocates and only holds the critical section for a few loads
    /// and stores. Returns whether the edge was accepted.
    pub fn on_edge(&self, direction: EdgeDirection, at: Instant) -> bool {
        self.update(|state| {
            if let Some(last) = state.last_accepted {
                if at.saturating_duration_since(last) <= state.window {
                    return false;
                }
            }

            state.value = match direction {
                EdgeDirection::Increment => state.value.wrapping_add(1),
                EdgeDirection::Decrement => state.value.wrapping_sub(1),
            };
            state.locally_modified = true;
            state.last_accepted = Some(at);
            state.generation = state.generation.wrapping_add(1);
            true
        })
    }

    pub fn value(&self) -> i32 {
        self.read().value
    }

    pub fn is_locally_modified(&self) -> bool {
        self.read().locally_modified
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        let state = self.read();
        CounterSnapshot {
            value: state.value,
            locally_modified: state.locally_modified,
            generation: state.generation,
        }
    }

    /// Finish a reconciliation pass that started with `snapshot`.
    ///
    /// With `adopt = Some(v)` the counter takes the remote value `v`. The
    /// adoption and the dirty-flag clear happen only if no edge arrived
    /// since the snapshot.
    pub fn close_pass(&self, snapshot: &CounterSnapshot, adopt: Option<i32>) -> PassClose {
        self.update(|state| {
            if state.generation != snapshot.generation {
                return PassClose::Superseded;
            }
            if let Some(remote) = adopt {
                state.value = remote;
            }
            state.locally_modified = false;
            PassClose::Closed
        })
    }

    /// Overwrite the counter without marking it as a local change.
    pub fn restore(&self, value: i32) {
        self.update(|state| {
            state.value = value;
            state.locally_modified = false;
        });
    }
}

impl Default for DebouncedCounter {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}
