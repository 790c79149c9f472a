//! Background transcript persistence.
//!
//! The engine notifies its sink on every delta. Writing the store from the
//! streaming task would block the runtime once per delta, so the sink only
//! publishes the latest snapshot and a writer task saves it with
//! `spawn_blocking`. Snapshots published while a save is running collapse into
//! one write of the newest transcript.

use crate::engine::TranscriptSink;
use codesynth_core::session::{SessionStateRepository, Transcript};
use std::sync::{Arc, OnceLock};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task;

/// A transcript snapshot tagged with a monotonically increasing version.
type Versioned = (u64, Transcript);

pub(crate) struct TranscriptWriter {
    repository: Arc<dyn SessionStateRepository>,
    pending: watch::Sender<Versioned>,
    persisted: Arc<watch::Sender<u64>>,
    started: OnceLock<()>,
}

impl TranscriptWriter {
    pub(crate) fn new(repository: Arc<dyn SessionStateRepository>) -> Self {
        let (pending, _) = watch::channel((0, Transcript::new()));
        let (persisted, _) = watch::channel(0);
        Self {
            repository,
            pending,
            persisted: Arc::new(persisted),
            started: OnceLock::new(),
        }
    }

    /// Waits until the newest published snapshot has been saved.
    pub(crate) async fn flush(&self) {
        let target = self.pending.borrow().0;
        let mut persisted = self.persisted.subscribe();
        // The sender lives in `self`, so this only ends once the version is reached.
        let _ = persisted.wait_for(|version| *version >= target).await;
    }

    /// Starts the writer task on the current runtime, once.
    ///
    /// Returns `false` outside a runtime.
    fn ensure_started(&self) -> bool {
        if self.started.get().is_some() {
            return true;
        }
        let Ok(handle) = Handle::try_current() else {
            return false;
        };
        self.started.get_or_init(|| {
            handle.spawn(run(
                Arc::clone(&self.repository),
                self.pending.subscribe(),
                Arc::clone(&self.persisted),
            ));
        });
        true
    }
}

impl TranscriptSink for TranscriptWriter {
    fn transcript_changed(&self, transcript: &Transcript) {
        let mut version = 0;
        self.pending.send_modify(|(v, snapshot)| {
            *v += 1;
            version = *v;
            *snapshot = transcript.clone();
        });

        if !self.ensure_started() {
            save(self.repository.as_ref(), transcript);
            self.persisted.send_replace(version);
        }
    }
}

async fn run(
    repository: Arc<dyn SessionStateRepository>,
    mut pending: watch::Receiver<Versioned>,
    persisted: Arc<watch::Sender<u64>>,
) {
    loop {
        let (version, transcript) = pending.borrow_and_update().clone();
        if version > *persisted.borrow() {
            let repository = Arc::clone(&repository);
            let saved = task::spawn_blocking(move || save(repository.as_ref(), &transcript)).await;
            if let Err(e) = saved {
                tracing::error!(error = %e, "Transcript writer task failed");
            }
            persisted.send_replace(version);
        }
        if pending.changed().await.is_err() {
            tracing::debug!("Transcript writer stopped");
            return;
        }
    }
}

fn save(repository: &dyn SessionStateRepository, transcript: &Transcript) {
    if let Err(e) = repository.save_transcript(transcript) {
        tracing::warn!(error = %e, "Failed to persist transcript");
    }
}
