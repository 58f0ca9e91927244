use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use truth_common::{Result, TruthError};
use truth_ocr::{BatchPolicy, FrameProcessor, MediaType, OcrBackend, OcrResult};

/// Treats each frame payload as the text printed on it; "boom" fails.
struct ScriptedBackend {
    policy: BatchPolicy,
    calls: Mutex<Vec<Instant>>,
}

impl ScriptedBackend {
    fn new(size: usize, delay_ms: u64) -> Arc<Self> {
        Arc::new(Self {
            policy: BatchPolicy {
                size,
                delay: Duration::from_millis(delay_ms),
            },
            calls: Mutex::new(Vec::new()),
        })
    }

    fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl OcrBackend for ScriptedBackend {
    async fn extract_text(&self, image_base64: &str) -> Result<OcrResult> {
        self.calls.lock().unwrap().push(Instant::now());
        if image_base64 == "boom" {
            return Err(TruthError::VisionApi("Bad image data".into()));
        }
        Ok(OcrResult {
            full_text: image_base64.to_string(),
            individual_texts: Vec::new(),
            confidence: 0.9,
            bounding_boxes: Vec::new(),
        })
    }

    fn name(&self) -> &str {
        "Scripted"
    }

    fn batch_policy(&self) -> BatchPolicy {
        self.policy
    }
}

fn frames(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("Headline number {} about taxes", words(i))).collect()
}

/// Distinct word per index so merged frames are not near-duplicates.
fn words(i: usize) -> String {
    ["alpha", "bravo", "charlie", "delta", "echo", "foxtrot", "golf"]
        .iter()
        .cycle()
        .skip(i)
        .take(3)
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

#[tokio::test(start_paused = true)]
async fn video_is_capped_at_twenty_five_frames() {
    let backend = ScriptedBackend::new(5, 500);
    let processor = FrameProcessor::new(backend.clone());

    let out = processor.process_frames(&frames(30), MediaType::Video).await;

    assert_eq!(out.frame_count, 25);
    assert_eq!(backend.call_times().len(), 25);
    assert_eq!(out.ocr_provider, "Scripted");
}

#[tokio::test(start_paused = true)]
async fn image_is_capped_at_fifteen_frames() {
    let backend = ScriptedBackend::new(5, 500);
    let processor = FrameProcessor::new(backend.clone());

    let out = processor.process_frames(&frames(20), MediaType::Image).await;

    assert_eq!(out.frame_count, 15);
    assert_eq!(backend.call_times().len(), 15);
}

#[tokio::test(start_paused = true)]
async fn batches_are_spaced_by_the_policy_delay() {
    let backend = ScriptedBackend::new(2, 2000);
    let processor = FrameProcessor::new(backend.clone());
    let start = Instant::now();

    processor.process_frames(&frames(5), MediaType::Image).await;

    let offsets: Vec<u128> = backend
        .call_times()
        .iter()
        .map(|t| t.duration_since(start).as_millis())
        .collect();
    assert_eq!(offsets, vec![0, 0, 2000, 2000, 4000]);
    // no pause after the final batch
    assert_eq!(start.elapsed(), Duration::from_millis(4000));
}

#[tokio::test(start_paused = true)]
async fn failed_frame_degrades_to_empty() {
    let backend = ScriptedBackend::new(5, 500);
    let processor = FrameProcessor::new(backend);
    let input = vec![
        "The senate passed the budget bill today".to_string(),
        "boom".to_string(),
    ];

    let out = processor.process_frames(&input, MediaType::Image).await;

    assert_eq!(out.frame_count, 2);
    assert_eq!(out.combined_text, "The senate passed the budget bill today");
    assert_eq!(out.processed_segments, 1);
    assert_eq!(out.average_confidence, 0.9);
}

#[tokio::test(start_paused = true)]
async fn identical_frames_merge_to_one_segment() {
    let backend = ScriptedBackend::new(5, 500);
    let processor = FrameProcessor::new(backend);
    let input = vec!["Drinking bleach cures the flu".to_string(); 4];

    let out = processor.process_frames(&input, MediaType::Video).await;

    assert_eq!(out.frame_count, 4);
    assert_eq!(out.processed_segments, 1);
    assert_eq!(out.combined_text, "Drinking bleach cures the flu");
}

#[tokio::test(start_paused = true)]
async fn frames_differing_in_case_and_padding_merge() {
    let backend = ScriptedBackend::new(5, 500);
    let processor = FrameProcessor::new(backend);
    let input = vec![
        "Drinking bleach cures the flu  ".to_string(),
        "DRINKING BLEACH CURES THE FLU".to_string(),
    ];

    let out = processor.process_frames(&input, MediaType::Image).await;

    assert_eq!(out.frame_count, 2);
    assert_eq!(out.processed_segments, 1);
    assert_eq!(out.combined_text, "Drinking bleach cures the flu");
}
