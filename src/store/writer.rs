use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

use crate::remote::{Collection, Record, RemoteBackend};

enum MirrorOp {
    Upsert(Record),
    Delete(Collection, String),
    Flush(oneshot::Sender<()>),
}

/// Handle to the write-behind worker that mirrors local changes to the
/// remote backend. Writes are attempted once, in submission order; failures
/// are logged and dropped.
#[derive(Clone)]
pub(crate) struct Mirror {
    tx: mpsc::UnboundedSender<MirrorOp>,
}

impl Mirror {
    /// Must be called from within a tokio runtime.
    pub(crate) fn spawn(remote: Arc<dyn RemoteBackend>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(remote, rx));
        Self { tx }
    }

    pub(crate) fn upsert(&self, record: Record) {
        self.send(MirrorOp::Upsert(record));
    }

    pub(crate) fn delete(&self, collection: Collection, id: String) {
        self.send(MirrorOp::Delete(collection, id));
    }

    /// Resolves once every write queued before this call was attempted.
    pub(crate) async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        self.send(MirrorOp::Flush(done));
        let _ = wait.await;
    }

    fn send(&self, op: MirrorOp) {
        if self.tx.send(op).is_err() {
            warn!("write-behind worker is gone; change kept locally only");
        }
    }
}

async fn run(remote: Arc<dyn RemoteBackend>, mut rx: mpsc::UnboundedReceiver<MirrorOp>) {
    while let Some(op) = rx.recv().await {
        match op {
            MirrorOp::Upsert(record) => {
                if let Err(e) = remote.upsert(&record).await {
                    error!(
                        table = record.collection().table(),
                        id = %record.id(),
                        error = %e,
                        "remote upsert failed"
                    );
                }
            }
            MirrorOp::Delete(collection, id) => {
                if let Err(e) = remote.delete(collection, &id).await {
                    error!(table = collection.table(), %id, error = %e, "remote delete failed");
                }
            }
            MirrorOp::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("write-behind worker stopped");
}
