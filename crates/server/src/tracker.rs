// Connection bookkeeping for graceful disposal.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::task::AbortHandle;

/// Live transport connections of one server instance, keyed by the remote
/// peer (address plus port). Entries appear on accept and disappear when the
/// connection task ends; the table is only consulted at shutdown, to tear
/// down whatever still lingers after the grace period.
///
/// Each server owns its own table; there is no process-wide registry.
#[derive(Default, Clone, Debug)]
pub struct ConnectionTable {
    entries: Arc<Mutex<HashMap<SocketAddr, AbortHandle>>>,
}

impl ConnectionTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&self, peer: SocketAddr, handle: AbortHandle) {
        self.entries
            .lock()
            .expect("should acquire connection table lock")
            .insert(peer, handle);
    }

    pub fn release(&self, peer: &SocketAddr) {
        self.entries
            .lock()
            .expect("should acquire connection table lock")
            .remove(peer);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .expect("should acquire connection table lock")
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Force-destroys every connection still present and empties the table.
    /// Returns how many were destroyed.
    pub fn destroy_all(&self) -> usize {
        let mut entries = self
            .entries
            .lock()
            .expect("should acquire connection table lock");
        let count = entries.len();
        for (peer, handle) in entries.drain() {
            perch_logs::warn!("Destroying lingering connection from {}", peer);
            handle.abort();
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::ConnectionTable;
    use std::net::SocketAddr;
    use std::time::Duration;

    fn peer(port: u16) -> SocketAddr {
        format!("127.0.0.1:{port}")
            .parse()
            .expect("should have parsed peer address")
    }

    #[tokio::test]
    async fn should_track_and_release_by_peer() {
        let table = ConnectionTable::new();
        let task = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<(), ()>(())
        });

        table.track(peer(4000), task.abort_handle());
        assert_eq!(table.len(), 1);

        table.release(&peer(4000));
        assert!(table.is_empty());

        task.abort();
    }

    #[tokio::test]
    async fn should_abort_lingering_tasks_on_destroy() {
        let table = ConnectionTable::new();
        let task = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        });

        table.track(peer(4001), task.abort_handle());
        let destroyed = table.destroy_all();

        assert_eq!(destroyed, 1);
        assert!(table.is_empty());
        let joined = task.await;
        assert!(joined.expect_err("should have been aborted").is_cancelled());
    }

    #[tokio::test]
    async fn should_tolerate_destroying_finished_connections() {
        let table = ConnectionTable::new();
        let task = tokio::spawn(async {});
        task.abort_handle().abort();

        table.track(peer(4002), task.abort_handle());

        assert_eq!(table.destroy_all(), 1);
        assert!(table.is_empty());
    }
}
