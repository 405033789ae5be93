//! Local/remote counter arbitration.
//!
//! Last writer wins by origin: a counter changed by the buttons since the last
//! pass overwrites the remote copy, otherwise the remote copy overwrites the
//! counter. Recency of concurrent changes on both sides is not compared.

use embedded_hal_async::delay::DelayNs;
use log::{debug, info, warn};

use super::{BoundedStore, PEOPLE_COUNTER, RemoteError, RemoteStore};
use crate::counter::{CounterSnapshot, DebouncedCounter, PassClose};

/// What one reconciliation pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Both copies already agreed.
    InSync(i32),
    /// The local value was written to the store.
    PushedLocal(i32),
    /// The store's value replaced the local one.
    AdoptedRemote(i32),
    /// Button edges landed while the pass was waiting on the store. They are
    /// kept and pushed by the next pass.
    Superseded,
    /// The store could not be read or written. The pass counts as matching:
    /// the local value stays and the dirty flag is cleared.
    Skipped(RemoteError),
}

/// Run one reconciliation pass.
///
/// Must only be called while the link is up. Remote failures never retry
/// within the pass; the next sync tick is the retry.
pub async fn reconcile<S, D>(
    counter: &DebouncedCounter,
    store: &mut BoundedStore<'_, S, D>,
) -> ReconcileOutcome
where
    S: RemoteStore,
    D: DelayNs,
{
    let snapshot = counter.snapshot();

    let remote = match store.get_int(PEOPLE_COUNTER).await {
        Ok(value) => value,
        Err(e) => {
            warn!("Counter sync skipped, remote read failed: {}", e);
            return skip(counter, &snapshot, e);
        }
    };

    let outcome = if remote == snapshot.value {
        debug!("Counter in sync at {}", remote);
        ReconcileOutcome::InSync(remote)
    } else if snapshot.locally_modified {
        if let Err(e) = store.set_int(PEOPLE_COUNTER, snapshot.value).await {
            warn!("Counter sync skipped, remote write failed: {}", e);
            return skip(counter, &snapshot, e);
        }
        info!("Pushed local counter {} over remote {}", snapshot.value, remote);
        ReconcileOutcome::PushedLocal(snapshot.value)
    } else {
        ReconcileOutcome::AdoptedRemote(remote)
    };

    let adopt = match outcome {
        ReconcileOutcome::AdoptedRemote(value) => Some(value),
        _ => None,
    };

    match counter.close_pass(&snapshot, adopt) {
        PassClose::Closed => {
            if let Some(value) = adopt {
                info!("Adopted remote counter {} over local {}", value, snapshot.value);
            }
            outcome
        }
        PassClose::Superseded => {
            info!("Counter changed during sync, keeping local value for next pass");
            ReconcileOutcome::Superseded
        }
    }
}

/// A failed pass still closes: the local value stands and the flag clears.
fn skip(
    counter: &DebouncedCounter,
    snapshot: &CounterSnapshot,
    error: RemoteError,
) -> ReconcileOutcome {
    match counter.close_pass(snapshot, None) {
        PassClose::Closed => ReconcileOutcome::Skipped(error),
        PassClose::Superseded => ReconcileOutcome::Superseded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::EdgeDirection;
    use crate::testing::{ImmediateDelay, MemoryStore, NeverDelay};
    use embassy_futures::block_on;
    use embassy_time::Instant;

    fn run(counter: &DebouncedCounter, remote: &mut MemoryStore) -> ReconcileOutcome {
        let mut delay = NeverDelay;
        let mut store = BoundedStore::new(remote, &mut delay, 5_000);
        block_on(reconcile(counter, &mut store))
    }

    fn press(counter: &DebouncedCounter, direction: EdgeDirection, ms: u64) {
        assert!(counter.on_edge(direction, Instant::from_millis(ms)));
    }

    #[test]
    fn test_remote_wins_when_not_locally_modified() {
        let counter = DebouncedCounter::default();
        counter.restore(5);
        let mut remote = MemoryStore::with_counter(9);

        assert_eq!(run(&counter, &mut remote), ReconcileOutcome::AdoptedRemote(9));

        assert_eq!(counter.value(), 9);
        assert_eq!(remote.int(PEOPLE_COUNTER), Some(9));
        assert!(!counter.is_locally_modified());
    }

    #[test]
    fn test_local_wins_when_locally_modified() {
        let counter = DebouncedCounter::default();
        counter.restore(4);
        press(&counter, EdgeDirection::Increment, 0);
        let mut remote = MemoryStore::with_counter(11);

        assert_eq!(run(&counter, &mut remote), ReconcileOutcome::PushedLocal(5));

        assert_eq!(remote.int(PEOPLE_COUNTER), Some(5));
        assert_eq!(counter.value(), 5);
        assert!(!counter.is_locally_modified());
    }

    #[test]
    fn test_equal_values_clear_flag_without_writing() {
        let counter = DebouncedCounter::default();
        press(&counter, EdgeDirection::Increment, 0);
        let mut remote = MemoryStore::with_counter(1);

        assert_eq!(run(&counter, &mut remote), ReconcileOutcome::InSync(1));

        assert_eq!(remote.writes(), 0);
        assert!(!counter.is_locally_modified());
    }

    #[test]
    fn test_second_pass_is_idempotent() {
        let counter = DebouncedCounter::default();
        press(&counter, EdgeDirection::Decrement, 0);
        let mut remote = MemoryStore::with_counter(3);

        run(&counter, &mut remote);
        let local_after_first = counter.value();
        let remote_after_first = remote.int(PEOPLE_COUNTER);
        let writes_after_first = remote.writes();

        assert_eq!(run(&counter, &mut remote), ReconcileOutcome::InSync(-1));
        assert_eq!(counter.value(), local_after_first);
        assert_eq!(remote.int(PEOPLE_COUNTER), remote_after_first);
        assert_eq!(remote.writes(), writes_after_first);
    }

    #[test]
    fn test_read_failure_clears_flag_and_keeps_value() {
        let counter = DebouncedCounter::default();
        press(&counter, EdgeDirection::Increment, 0);
        let mut remote = MemoryStore::with_counter(7);
        remote.fail_all = true;

        assert_eq!(
            run(&counter, &mut remote),
            ReconcileOutcome::Skipped(RemoteError::Unreachable)
        );

        assert_eq!(counter.value(), 1);
        assert!(!counter.is_locally_modified());
        assert_eq!(remote.int(PEOPLE_COUNTER), Some(7));

        remote.fail_all = false;
        assert_eq!(run(&counter, &mut remote), ReconcileOutcome::AdoptedRemote(7));
    }

    #[test]
    fn test_write_failure_clears_flag_and_keeps_value() {
        let counter = DebouncedCounter::default();
        counter.restore(4);
        press(&counter, EdgeDirection::Increment, 0);
        let mut remote = MemoryStore::with_counter(11);
        remote.fail_writes = true;

        assert_eq!(
            run(&counter, &mut remote),
            ReconcileOutcome::Skipped(RemoteError::Unreachable)
        );

        assert_eq!(counter.value(), 5);
        assert!(!counter.is_locally_modified());
        assert_eq!(remote.int(PEOPLE_COUNTER), Some(11));
        assert_eq!(remote.writes(), 0);
    }

    #[test]
    fn test_press_during_failed_write_keeps_flag() {
        static COUNTER: DebouncedCounter = DebouncedCounter::new(crate::counter::DEFAULT_DEBOUNCE);
        COUNTER.restore(2);
        assert!(COUNTER.on_edge(EdgeDirection::Increment, Instant::from_millis(0)));
        let mut remote = MemoryStore::with_counter(8);
        remote.fail_writes = true;
        remote.on_read = Some(|| {
            COUNTER.on_edge(EdgeDirection::Increment, Instant::from_millis(1_000));
        });

        assert_eq!(run(&COUNTER, &mut remote), ReconcileOutcome::Superseded);
        assert_eq!(COUNTER.value(), 4);
        assert!(COUNTER.is_locally_modified());
    }

    #[test]
    fn test_stalled_store_is_skipped() {
        let counter = DebouncedCounter::default();
        counter.restore(2);
        let mut remote = MemoryStore::with_counter(8);
        remote.stall = true;
        let mut delay = ImmediateDelay;
        let mut store = BoundedStore::new(&mut remote, &mut delay, 10);

        assert_eq!(
            block_on(reconcile(&counter, &mut store)),
            ReconcileOutcome::Skipped(RemoteError::Timeout)
        );
        assert_eq!(counter.value(), 2);
        assert!(!counter.is_locally_modified());
    }

    #[test]
    fn test_press_during_read_supersedes_adoption() {
        static COUNTER: DebouncedCounter = DebouncedCounter::new(crate::counter::DEFAULT_DEBOUNCE);
        COUNTER.restore(5);
        let mut remote = MemoryStore::with_counter(9);
        remote.on_read = Some(|| {
            COUNTER.on_edge(EdgeDirection::Increment, Instant::from_millis(0));
        });

        assert_eq!(run(&COUNTER, &mut remote), ReconcileOutcome::Superseded);
        assert_eq!(COUNTER.value(), 6);
        assert!(COUNTER.is_locally_modified());

        remote.on_read = None;
        assert_eq!(run(&COUNTER, &mut remote), ReconcileOutcome::PushedLocal(6));
        assert_eq!(remote.int(PEOPLE_COUNTER), Some(6));
    }
}
