use chrono::{DateTime, Utc};
use tokio::sync::watch;

use super::sync_model::{CloudSyncState, LocalSyncState, SyncFailure, SyncStatus};

/// Observable holder of the process-wide [`SyncStatus`].
#[derive(Debug)]
pub struct SyncStatusBoard {
    tx: watch::Sender<SyncStatus>,
}

impl Default for SyncStatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncStatusBoard {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SyncStatus::default());
        Self { tx }
    }

    pub fn snapshot(&self) -> SyncStatus {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.tx.subscribe()
    }

    pub fn local_saving(&self) {
        self.tx.send_modify(|status| status.local = LocalSyncState::Saving);
    }

    pub fn local_saved(&self, at: DateTime<Utc>) {
        self.tx.send_modify(|status| {
            status.local = LocalSyncState::Saved;
            status.last_local_save = Some(at);
        });
    }

    pub fn local_failed(&self, operation: &str, message: String) {
        self.tx.send_modify(|status| {
            status.local = LocalSyncState::Error;
            status.last_error = Some(failure(operation, message));
        });
    }

    pub fn cloud_syncing(&self) {
        self.tx.send_modify(|status| status.cloud = CloudSyncState::Syncing);
    }

    pub fn cloud_synced(&self, at: DateTime<Utc>) {
        self.tx.send_modify(|status| {
            status.cloud = CloudSyncState::Synced;
            status.last_cloud_sync = Some(at);
        });
    }

    pub fn cloud_failed(&self, operation: &str, message: String) {
        self.tx.send_modify(|status| {
            status.cloud = CloudSyncState::Error;
            status.last_error = Some(failure(operation, message));
        });
    }
}

fn failure(operation: &str, message: String) -> SyncFailure {
    SyncFailure {
        operation: operation.to_string(),
        message,
        at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_see_transitions() {
        let board = SyncStatusBoard::new();
        let mut rx = board.subscribe();
        assert_eq!(rx.borrow().cloud, CloudSyncState::Idle);

        board.cloud_syncing();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().cloud, CloudSyncState::Syncing);

        let at = Utc::now();
        board.cloud_synced(at);
        rx.changed().await.unwrap();
        let status = rx.borrow_and_update().clone();
        assert_eq!(status.cloud, CloudSyncState::Synced);
        assert_eq!(status.last_cloud_sync, Some(at));
    }

    #[test]
    fn failures_record_operation_and_cause() {
        let board = SyncStatusBoard::new();
        board.local_saving();
        board.local_failed("save_document", "disk full".into());

        let status = board.snapshot();
        assert_eq!(status.local, LocalSyncState::Error);
        let failure = status.last_error.unwrap();
        assert_eq!(failure.operation, "save_document");
        assert_eq!(failure.message, "disk full");
    }
}
