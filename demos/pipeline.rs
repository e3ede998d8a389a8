use std::path::PathBuf;
use std::sync::Arc;

use sovits_rs::engine::NativeEngine;
use sovits_rs::{
    AudioHistoryStore, InferenceOrchestrator, PipelineConfig, PipelineEvent, PlaybackController,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let source = PathBuf::from(
        std::env::args()
            .nth(1)
            .unwrap_or_else(|| "models/gpt-sovits".to_string()),
    );
    let cache_dir = std::env::temp_dir().join("sovits-rs-demo");

    let config = PipelineConfig::new(&cache_dir);
    let (mut orchestrator, mut events) =
        InferenceOrchestrator::new(Arc::new(NativeEngine), config);
    let mut history = AudioHistoryStore::scan_dir(&cache_dir);
    let mut playback = PlaybackController::new();

    println!("Loading model bundle from {}", source.display());
    orchestrator.load_model(source);

    while let Some(event) = events.recv().await {
        match event {
            PipelineEvent::LoadProgress(fraction) => {
                println!("Loading model: {:.0}%", fraction * 100.0);
            }
            PipelineEvent::ModelReady => {
                println!("Model ready, synthesizing");
                orchestrator.synthesize("Hello! This is GPT-SoVITS speaking from Rust.");
            }
            PipelineEvent::LoadFailed(err) => {
                eprintln!("Load failed: {err}");
                break;
            }
            PipelineEvent::Synthesized(entry) => {
                println!(
                    "Generated {} in {}ms",
                    entry.audio_path.display(),
                    entry.latency_ms
                );
                if let Err(err) = playback.play(&entry.audio_path) {
                    eprintln!("Playback unavailable: {err}");
                }
                history.record(entry);
                break;
            }
            PipelineEvent::SynthesisFailed(err) => {
                eprintln!("Synthesis failed: {err}");
                break;
            }
        }
    }

    while playback.is_active() {
        if let Some(err) = playback.poll() {
            eprintln!("Playback error: {err}");
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }

    println!("History ({} entries, newest first):", history.len());
    for entry in history.entries() {
        println!("  {:>6}ms  {}", entry.latency_ms, entry.text);
    }

    orchestrator.shutdown();
    Ok(())
}
