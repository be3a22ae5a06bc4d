//! `lectern narrate`: replay a document as a token stream.
//!
//! The input is cut into fixed-size increments and fed to a
//! [`VisualOrchestrator`] exactly as model deltas would be. Each event is
//! printed as one JSON line; audio payloads are replaced by their length.

use std::io::Write;

use lectern_core::{AudioSettings, PipelineEvent, VoiceSettings};
use lectern_pipeline::{PipelineContext, VisualOrchestrator};
use lectern_tts::TtsError;
use serde_json::Value;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

use crate::bootstrap::CliContext;
use crate::commands::NarrateArgs;
use crate::error::CliError;

/// Totals reported once the stream is finalized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NarrationSummary {
    pub block_id: String,
    pub segments: usize,
    pub regions: usize,
    pub visuals: usize,
    pub duration_ms: u64,
}

impl NarrationSummary {
    fn record(&mut self, event: &PipelineEvent) {
        match event {
            PipelineEvent::AudioSegment { .. } => self.segments += 1,
            PipelineEvent::AudioComplete { duration_ms, .. } => {
                self.regions += 1;
                self.duration_ms += duration_ms;
            }
            PipelineEvent::VisualMarker { .. } => self.visuals += 1,
            PipelineEvent::Content { .. } | PipelineEvent::Break => {}
        }
    }
}

/// Execute the narrate command, printing events to stdout.
///
/// Ctrl-C cancels the run: in-flight audio is discarded and nothing more
/// is persisted.
pub async fn execute(ctx: &CliContext, args: &NarrateArgs) -> Result<(), CliError> {
    let text = read_input(&args.input).await?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling narration");
            on_interrupt.cancel();
        }
    });

    let mut out = std::io::BufWriter::new(std::io::stdout());
    let result = narrate(ctx, args, &text, cancel, &mut out).await;
    watcher.abort();
    out.flush()?;

    let summary = result?;
    eprintln!(
        "Block {}: {} segment(s) in {} audio region(s), {} visual(s), {} ms of audio",
        summary.block_id, summary.segments, summary.regions, summary.visuals, summary.duration_ms
    );
    Ok(())
}

/// Resolve the request, stream `text` through the orchestrator and write
/// one JSON line per event to `out`.
pub async fn narrate(
    ctx: &CliContext,
    args: &NarrateArgs,
    text: &str,
    cancel: CancellationToken,
    out: &mut (impl Write + Send),
) -> Result<NarrationSummary, CliError> {
    let (voice, audio, model) = resolve_parameters(ctx, args)?;
    let provider = ctx.registry.prepare(&args.provider, &voice, &audio, &model)?;

    let block_id = args
        .block_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let pipeline = PipelineContext::new(
        block_id.clone(),
        provider,
        ctx.pool.clone(),
        ctx.storage.clone(),
        ctx.records.clone(),
    )
    .with_settings(ctx.settings.clone())
    .with_voice(voice)
    .with_audio(audio)
    .with_model(model)
    .with_cancellation(cancel);
    let mut orchestrator = VisualOrchestrator::new(pipeline)?;

    tracing::info!(
        block_id = %block_id,
        provider = %args.provider,
        chars = text.chars().count(),
        "Starting narration"
    );

    let mut summary = NarrationSummary {
        block_id,
        ..NarrationSummary::default()
    };
    for delta in deltas(text, args.chunk_size as usize) {
        let events = orchestrator.process_chunk(&delta).await?;
        emit(&events, &mut summary, out)?;
    }
    let events = orchestrator.finalize().await?;
    emit(&events, &mut summary, out)?;

    Ok(summary)
}

/// Fill unset parameters from the provider's defaults.
fn resolve_parameters(
    ctx: &CliContext,
    args: &NarrateArgs,
) -> Result<(VoiceSettings, AudioSettings, String), CliError> {
    let provider = ctx
        .registry
        .get(&args.provider)
        .ok_or_else(|| TtsError::UnknownProvider(args.provider.clone()))?;
    let config = provider.config();

    let mut voice = config.default_voice_settings();
    if let Some(voice_id) = &args.voice {
        voice.voice_id.clone_from(voice_id);
    }
    if let Some(speed) = args.speed {
        voice.speed = speed;
    }
    if let Some(pitch) = args.pitch {
        voice.pitch = pitch;
    }
    if let Some(emotion) = &args.emotion {
        voice.emotion = Some(emotion.clone());
    }

    let audio = AudioSettings {
        format: args.format,
        sample_rate: args.sample_rate,
        ..AudioSettings::default()
    };
    let model = args
        .model
        .clone()
        .unwrap_or_else(|| config.default_model.clone());

    Ok((voice, audio, model))
}

fn emit(
    events: &[PipelineEvent],
    summary: &mut NarrationSummary,
    out: &mut impl Write,
) -> Result<(), CliError> {
    for event in events {
        summary.record(event);
        writeln!(out, "{}", event_line(event)?)?;
    }
    Ok(())
}

/// Wire JSON for an event with audio bytes elided to `audioBytes`.
pub fn event_line(event: &PipelineEvent) -> Result<Value, CliError> {
    let mut value = serde_json::to_value(event)?;
    if let (PipelineEvent::AudioSegment { audio_data, .. }, Some(object)) =
        (event, value.as_object_mut())
    {
        object.remove("audioData");
        object.insert("audioBytes".to_string(), Value::from(audio_data.len()));
    }
    Ok(value)
}

/// Split `text` into increments of `size` characters.
pub fn deltas(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

async fn read_input(input: &str) -> Result<String, CliError> {
    if input == "-" {
        let mut text = String::new();
        tokio::io::stdin().read_to_string(&mut text).await?;
        Ok(text)
    } else {
        tokio::fs::read_to_string(input)
            .await
            .map_err(|e| CliError::Io(format!("{input}: {e}")))
    }
}
