// THEORY:
// Classification is pure and CPU-bound, so a batch of photos parallelizes
// trivially: no image depends on another and no state is carried between them.
// The `BatchClassifier` is a fixed pool of tokio worker tasks fed by a single
// round-robin dispatcher. Each worker hands the actual pixel crunching to
// `spawn_blocking` so the async executor threads are never stalled, then sends
// the result back over the task's own `oneshot` channel.
//
// Dropping the classifier drops the task sender; the dispatcher then drains and
// exits, which drops every worker sender and lets the workers finish.

use crate::config::ClassifierConfig;
use crate::error::ClassifyError;
use crate::pipeline::{ClassificationResult, LeafClassifier};
use futures::future::join_all;
use image::RgbImage;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

pub struct ClassifyTask {
    pub image: RgbImage,
    pub result_sender: oneshot::Sender<Result<ClassificationResult, ClassifyError>>,
}

pub struct BatchClassifier {
    task_sender: mpsc::UnboundedSender<ClassifyTask>,
    workers: Vec<tokio::task::JoinHandle<()>>,
}

impl BatchClassifier {
    /// Spawns one worker per logical CPU. Must be called inside a tokio runtime.
    pub fn new(config: ClassifierConfig) -> Result<Self, ClassifyError> {
        Self::with_workers(config, num_cpus::get())
    }

    pub fn with_workers(config: ClassifierConfig, worker_count: usize) -> Result<Self, ClassifyError> {
        let classifier = Arc::new(LeafClassifier::new(config)?);
        let worker_count = worker_count.max(1);
        let (task_sender, mut task_receiver) = mpsc::unbounded_channel::<ClassifyTask>();

        let (worker_senders, worker_receivers): (Vec<_>, Vec<_>) = (0..worker_count)
            .map(|_| mpsc::unbounded_channel::<ClassifyTask>())
            .unzip();

        tokio::spawn(async move {
            let mut worker_idx = 0;
            while let Some(task) = task_receiver.recv().await {
                if worker_senders[worker_idx].send(task).is_err() {
                    warn!(worker = worker_idx, "batch worker exited early");
                }
                worker_idx = (worker_idx + 1) % worker_count;
            }
            debug!("batch dispatcher shutting down");
        });

        let workers = worker_receivers
            .into_iter()
            .map(|mut worker_receiver| {
                let classifier = Arc::clone(&classifier);
                tokio::spawn(async move {
                    while let Some(task) = worker_receiver.recv().await {
                        let classifier = Arc::clone(&classifier);
                        let image = task.image;
                        let outcome =
                            tokio::task::spawn_blocking(move || classifier.classify(&image)).await;
                        let result = outcome.unwrap_or_else(|err| {
                            warn!(error = %err, "classification task failed");
                            Err(ClassifyError::WorkerPoolClosed)
                        });
                        // The caller may have given up on the answer.
                        let _ = task.result_sender.send(result);
                    }
                })
            })
            .collect();

        debug!(workers = worker_count, "batch classifier started");
        Ok(Self {
            task_sender,
            workers,
        })
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub async fn classify(&self, image: RgbImage) -> Result<ClassificationResult, ClassifyError> {
        let (result_sender, result_receiver) = oneshot::channel();
        self.task_sender
            .send(ClassifyTask {
                image,
                result_sender,
            })
            .map_err(|_| ClassifyError::WorkerPoolClosed)?;
        result_receiver
            .await
            .map_err(|_| ClassifyError::WorkerPoolClosed)?
    }

    /// Classifies every image concurrently; results keep the input order.
    pub async fn classify_all(
        &self,
        images: Vec<RgbImage>,
    ) -> Vec<Result<ClassificationResult, ClassifyError>> {
        join_all(images.into_iter().map(|image| self.classify(image))).await
    }
}
