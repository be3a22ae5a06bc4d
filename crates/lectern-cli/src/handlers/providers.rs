//! `lectern providers`: what each registered backend accepts.

use std::io::Write;

use lectern_tts::ProviderRegistry;
use serde_json::json;

use crate::error::CliError;

/// Print every registered provider to stdout.
pub fn execute(registry: &ProviderRegistry, as_json: bool) -> Result<(), CliError> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if as_json {
        write_json(registry, &mut out)
    } else {
        write_summary(registry, &mut out)
    }
}

/// One JSON document listing each provider's catalog.
pub fn write_json(registry: &ProviderRegistry, out: &mut impl Write) -> Result<(), CliError> {
    let providers: Vec<_> = registry
        .iter()
        .map(|p| {
            json!({
                "name": p.name(),
                "configured": p.is_configured(),
                "config": p.config(),
            })
        })
        .collect();
    serde_json::to_writer_pretty(&mut *out, &providers)?;
    writeln!(out)?;
    Ok(())
}

/// Human-readable summary, one block per provider.
pub fn write_summary(registry: &ProviderRegistry, out: &mut impl Write) -> Result<(), CliError> {
    if registry.is_empty() {
        writeln!(out, "No speech providers registered.")?;
        return Ok(());
    }

    for provider in registry.iter() {
        let config = provider.config();
        let status = if provider.is_configured() {
            "configured"
        } else {
            "missing credentials"
        };
        writeln!(out, "{} ({status})", provider.name())?;

        let voices: Vec<&str> = config.voices.iter().map(|v| v.id.as_str()).collect();
        writeln!(out, "  voices:       {}", voices.join(", "))?;
        writeln!(out, "  models:       {}", config.models.join(", "))?;
        if config.supports_emotion {
            writeln!(out, "  emotions:     {}", config.emotions.join(", "))?;
        }
        let formats: Vec<&str> = config.formats.iter().map(|f| f.as_str()).collect();
        writeln!(out, "  formats:      {}", formats.join(", "))?;
        let rates: Vec<String> = config.sample_rates.iter().map(u32::to_string).collect();
        writeln!(out, "  sample rates: {}", rates.join(", "))?;
        writeln!(
            out,
            "  speed:        {} to {} (default {})",
            config.speed_range.min, config.speed_range.max, config.speed_range.default
        )?;
        writeln!(
            out,
            "  pitch:        {} to {} (default {})",
            config.pitch_range.min, config.pitch_range.max, config.pitch_range.default
        )?;
        writeln!(
            out,
            "  limits:       {} chars / {} bytes per request",
            config.limits.max_chars, config.limits.max_bytes
        )?;
    }
    Ok(())
}
