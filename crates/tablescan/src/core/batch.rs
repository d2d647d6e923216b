//! Cross-document parallelism.
//!
//! Documents share nothing mutable, so a batch is a plain parallel map over
//! [`Orchestrator::process`]. Results always come back in input order and
//! one document's failure never touches its siblings.

use std::path::PathBuf;

use rayon::prelude::*;

use super::pipeline::Orchestrator;
use crate::types::Outcome;

/// One document of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInput {
    pub bytes: Vec<u8>,
    pub name: String,
}

impl DocumentInput {
    pub fn new(bytes: impl Into<Vec<u8>>, name: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            name: name.into(),
        }
    }
}

impl Orchestrator {
    /// Processes documents on the rayon pool.
    pub fn process_batch(&self, documents: &[DocumentInput]) -> Vec<Outcome> {
        documents
            .par_iter()
            .map(|doc| self.process(&doc.bytes, &doc.name))
            .collect()
    }

    /// Reads and processes files on the rayon pool.
    pub fn process_files_batch(&self, paths: &[PathBuf]) -> Vec<Outcome> {
        paths.par_iter().map(|path| self.process_file(path)).collect()
    }
}

#[cfg(feature = "tokio-runtime")]
pub use self::async_batch::batch_process;

#[cfg(feature = "tokio-runtime")]
mod async_batch {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::sync::Semaphore;
    use tokio::task::JoinSet;

    use super::DocumentInput;
    use crate::core::pipeline::Orchestrator;
    use crate::types::Outcome;

    /// Processes documents on tokio's blocking pool.
    ///
    /// At most `max_concurrent_documents` (default: twice the CPU count) run
    /// at once. With `document_timeout_secs` set, a document that overruns
    /// gets an [`Outcome::Error`]; its worker thread is not interrupted and
    /// finishes in the background.
    pub async fn batch_process(orchestrator: Arc<Orchestrator>, documents: Vec<DocumentInput>) -> Vec<Outcome> {
        if documents.is_empty() {
            return vec![];
        }

        let max_concurrent = orchestrator.config().concurrency_limit();
        let timeout = orchestrator.config().document_timeout_secs.map(Duration::from_secs);
        let semaphore = Arc::new(Semaphore::new(max_concurrent));

        let mut tasks = JoinSet::new();
        let count = documents.len();

        for (index, document) in documents.into_iter().enumerate() {
            let orchestrator = Arc::clone(&orchestrator);
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return (index, Outcome::error("Batch was shut down")),
                };

                let name = document.name.clone();
                let work = tokio::task::spawn_blocking(move || orchestrator.process(&document.bytes, &document.name));

                let outcome = match timeout {
                    Some(limit) => match tokio::time::timeout(limit, work).await {
                        Ok(joined) => joined_outcome(joined),
                        Err(_) => {
                            tracing::warn!(document = %name, timeout_secs = limit.as_secs(), "Document timed out");
                            Outcome::error(format!("Processing timed out after {} seconds", limit.as_secs()))
                        }
                    },
                    None => joined_outcome(work.await),
                };
                (index, outcome)
            });
        }

        let mut results: Vec<Option<Outcome>> = vec![None; count];
        while let Some(task_result) = tasks.join_next().await {
            match task_result {
                Ok((index, outcome)) => results[index] = Some(outcome),
                Err(join_err) => tracing::warn!(error = %join_err, "Batch task failed"),
            }
        }

        results
            .into_iter()
            .map(|slot| slot.unwrap_or_else(|| Outcome::error("Task panicked before producing an outcome")))
            .collect()
    }

    fn joined_outcome(joined: Result<Outcome, tokio::task::JoinError>) -> Outcome {
        joined.unwrap_or_else(|e| Outcome::error(format!("Task panicked: {}", e)))
    }
}
