//! Bounded waits for network calls.

use embassy_futures::select::{Either, select};
use embedded_hal_async::delay::DelayNs;

/// Run `fut`, giving up after `timeout_ms`.
///
/// Returns `None` when the delay finished first. The call future is polled
/// before the delay, so a call that is already complete always wins.
pub async fn with_deadline<F, D>(delay: &mut D, timeout_ms: u32, fut: F) -> Option<F::Output>
where
    F: Future,
    D: DelayNs,
{
    match select(fut, delay.delay_ms(timeout_ms)).await {
        Either::First(out) => Some(out),
        Either::Second(()) => None,
    }
}
