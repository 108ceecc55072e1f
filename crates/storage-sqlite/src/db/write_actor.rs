//! Single-connection writer. Every job runs inside its own immediate
//! transaction, in submission order.

use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sqlite::SqliteConnection;
use log::{debug, error};
use tokio::sync::{mpsc, oneshot};

use formdesk_core::errors::{DatabaseError, Error, Result};

use crate::errors::StorageError;

type Job = Box<dyn FnOnce(&mut SqliteConnection) + Send + 'static>;

enum JobError {
    Job(Error),
    Diesel(diesel::result::Error),
}

impl From<diesel::result::Error> for JobError {
    fn from(err: diesel::result::Error) -> Self {
        JobError::Diesel(err)
    }
}

#[derive(Clone)]
pub struct WriteHandle {
    tx: mpsc::UnboundedSender<Job>,
}

impl WriteHandle {
    /// Runs `job` on the writer connection. An `Err` from the job rolls back
    /// everything it wrote.
    pub async fn exec<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let boxed: Job = Box::new(move |conn: &mut SqliteConnection| {
            let result = run_in_transaction(conn, job);
            let _ = reply_tx.send(result);
        });

        self.tx
            .send(boxed)
            .map_err(|_| DatabaseError::Internal("Database writer has stopped".to_string()))?;
        reply_rx.await.map_err(|_| {
            DatabaseError::Internal("Database writer dropped the job".to_string())
        })?
    }
}

fn run_in_transaction<F, T>(conn: &mut SqliteConnection, job: F) -> Result<T>
where
    F: FnOnce(&mut SqliteConnection) -> Result<T>,
{
    conn.immediate_transaction::<T, JobError, _>(|conn| job(conn).map_err(JobError::Job))
        .map_err(|err| match err {
            JobError::Job(e) => e,
            JobError::Diesel(e) => StorageError::from(e).into(),
        })
}

/// Starts the writer thread. It holds one pooled connection for its lifetime
/// and stops when every handle is dropped.
pub fn spawn_writer(pool: Pool<ConnectionManager<SqliteConnection>>) -> WriteHandle {
    let (tx, mut rx) = mpsc::unbounded_channel::<Job>();

    let spawned = std::thread::Builder::new()
        .name("formdesk-db-writer".to_string())
        .spawn(move || {
            let mut conn = match pool.get() {
                Ok(conn) => conn,
                Err(e) => {
                    error!("Database writer could not acquire a connection: {}", e);
                    return;
                }
            };
            while let Some(job) = rx.blocking_recv() {
                job(&mut *conn);
            }
            debug!("Database writer stopped");
        });
    if let Err(e) = spawned {
        error!("Failed to start database writer thread: {}", e);
    }

    WriteHandle { tx }
}
