/// The wireless link, as seen by the scheduler.
///
/// The connection manager behind it owns association and DHCP; the node only
/// asks whether the link is up and, when a sync is due while it is down,
/// requests a best-effort reconnect.
pub trait NetworkLink {
    fn is_connected(&mut self) -> impl Future<Output = bool>;

    /// Start (or restart) association. Must not wait for it to complete.
    fn reconnect(&mut self) -> impl Future<Output = ()>;
}
