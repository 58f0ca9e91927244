use crate::merge::merge_texts;
use crate::{MediaType, OcrBackend, OcrResult};
use futures::future::join_all;
use std::sync::Arc;

/// Outcome of reading every frame of one upload.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameExtraction {
    pub combined_text: String,
    /// Frames actually read, after the per-media-type cap.
    pub frame_count: usize,
    pub processed_segments: usize,
    pub average_confidence: f64,
    pub ocr_provider: String,
}

/// Runs the configured OCR backend over a list of frames.
#[derive(Clone)]
pub struct FrameProcessor {
    backend: Arc<dyn OcrBackend>,
}

impl FrameProcessor {
    pub fn new(backend: Arc<dyn OcrBackend>) -> Self {
        Self { backend }
    }

    pub fn provider_name(&self) -> &str {
        self.backend.name()
    }

    /// Read up to [`MediaType::max_frames`] frames and merge their text.
    ///
    /// Frames are read in batches sized by the backend's [`crate::BatchPolicy`];
    /// frames within a batch run concurrently and batches are separated by
    /// the policy's delay. A frame that fails contributes an empty result.
    pub async fn process_frames(&self, frames: &[String], media_type: MediaType) -> FrameExtraction {
        let frames = &frames[..frames.len().min(media_type.max_frames())];
        let policy = self.backend.batch_policy();
        let batch_size = policy.size.max(1);
        let batch_count = frames.len().div_ceil(batch_size);

        tracing::info!(
            media_type = media_type.as_str(),
            frames = frames.len(),
            provider = self.backend.name(),
            batch_size,
            "ocr.frames.start"
        );

        let mut results = Vec::with_capacity(frames.len());
        for (batch_index, batch) in frames.chunks(batch_size).enumerate() {
            let offset = batch_index * batch_size;
            let reads = batch.iter().enumerate().map(|(i, frame)| {
                let backend = Arc::clone(&self.backend);
                async move {
                    match backend.extract_text(frame).await {
                        Ok(result) => result,
                        Err(err) => {
                            tracing::warn!(
                                frame = offset + i + 1,
                                kind = err.label(),
                                error = %err,
                                "ocr.frame.failed"
                            );
                            OcrResult::empty()
                        }
                    }
                }
            });
            results.extend(join_all(reads).await);
            tracing::debug!(batch = batch_index + 1, of = batch_count, "ocr.batch.done");

            if batch_index + 1 < batch_count {
                tokio::time::sleep(policy.delay).await;
            }
        }

        let merged = merge_texts(&results);
        FrameExtraction {
            combined_text: merged.combined_text,
            frame_count: frames.len(),
            processed_segments: merged.text_segments,
            average_confidence: merged.confidence,
            ocr_provider: self.backend.name().to_string(),
        }
    }
}
