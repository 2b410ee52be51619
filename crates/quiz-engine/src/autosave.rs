//! Debounced draft persistence.
//!
//! Drafts are handed to a single background task that holds on to the most
//! recent one until the debounce window passes without a newer draft, then
//! writes it. Writes happen one at a time in schedule order, so a slow write
//! can never land after a newer one. `flush` and `shutdown` write whatever is
//! still pending before returning.

use std::sync::Arc;
use std::time::Duration;

use quiz_spec::Draft;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::collab::store::{DocumentStore, WriteMode};
use crate::error::{CollabError, EngineError};

/// Result of one draft write.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveAck {
    pub revision: u64,
    pub result: Result<(), CollabError>,
}

enum Command {
    Schedule(Draft),
    Flush(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

pub struct Autosaver {
    commands: mpsc::UnboundedSender<Command>,
    acks: mpsc::UnboundedReceiver<SaveAck>,
    task: JoinHandle<()>,
}

impl Autosaver {
    /// Starts the writer task. Must be called inside a tokio runtime.
    pub fn spawn(store: Arc<dyn DocumentStore>, path: String, debounce: Duration) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        let (ack_tx, acks) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(store, path, debounce, receiver, ack_tx));
        Self {
            commands,
            acks,
            task,
        }
    }

    /// Replaces any pending draft and restarts the debounce window.
    pub fn schedule(&self, draft: Draft) -> Result<(), EngineError> {
        self.commands
            .send(Command::Schedule(draft))
            .map_err(|_| EngineError::AutosaveStopped)
    }

    /// Writes the pending draft now, if any.
    pub async fn flush(&self) -> Result<(), EngineError> {
        let (reply, done) = oneshot::channel();
        self.commands
            .send(Command::Flush(reply))
            .map_err(|_| EngineError::AutosaveStopped)?;
        done.await.map_err(|_| EngineError::AutosaveStopped)
    }

    /// Flushes, stops the task and returns acknowledgements not yet taken.
    pub async fn shutdown(mut self) -> Result<Vec<SaveAck>, EngineError> {
        let (reply, done) = oneshot::channel();
        self.commands
            .send(Command::Shutdown(reply))
            .map_err(|_| EngineError::AutosaveStopped)?;
        done.await.map_err(|_| EngineError::AutosaveStopped)?;
        if let Err(err) = (&mut self.task).await {
            warn!(error = %err, "autosave task ended abnormally");
        }
        Ok(self.take_acks())
    }

    /// Acknowledgements that arrived since the last call.
    pub fn take_acks(&mut self) -> Vec<SaveAck> {
        let mut acks = Vec::new();
        while let Ok(ack) = self.acks.try_recv() {
            acks.push(ack);
        }
        acks
    }
}

async fn run(
    store: Arc<dyn DocumentStore>,
    path: String,
    debounce: Duration,
    mut commands: mpsc::UnboundedReceiver<Command>,
    acks: mpsc::UnboundedSender<SaveAck>,
) {
    let mut pending: Option<Draft> = None;
    loop {
        let command = if pending.is_some() {
            match tokio::time::timeout(debounce, commands.recv()).await {
                Ok(command) => command,
                Err(_) => {
                    write(store.as_ref(), &path, pending.take(), &acks).await;
                    continue;
                }
            }
        } else {
            commands.recv().await
        };

        match command {
            Some(Command::Schedule(draft)) => pending = Some(draft),
            Some(Command::Flush(reply)) => {
                write(store.as_ref(), &path, pending.take(), &acks).await;
                let _ = reply.send(());
            }
            Some(Command::Shutdown(reply)) => {
                write(store.as_ref(), &path, pending.take(), &acks).await;
                let _ = reply.send(());
                break;
            }
            None => {
                // Every handle dropped without a shutdown.
                write(store.as_ref(), &path, pending.take(), &acks).await;
                break;
            }
        }
    }
    debug!(%path, "autosave stopped");
}

async fn write(
    store: &dyn DocumentStore,
    path: &str,
    draft: Option<Draft>,
    acks: &mpsc::UnboundedSender<SaveAck>,
) {
    let Some(draft) = draft else {
        return;
    };
    let revision = draft.revision;
    let result = match serde_json::to_value(&draft) {
        Ok(value) => store.write(path, value, WriteMode::Replace).await,
        Err(err) => Err(CollabError::Invalid(err.to_string())),
    };
    match &result {
        Ok(()) => debug!(path, revision, "draft saved"),
        Err(err) => warn!(path, revision, error = %err, "draft save failed"),
    }
    let _ = acks.send(SaveAck { revision, result });
}
