use anyhow::{Context, Result};
use clap::Parser;
use libimm_core::{replay, CompositionEvent, ImeConfig, Trace};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Replay a recorded IME message trace and print what the polling loop sees.
#[derive(Parser)]
#[command(name = "imm-replay")]
struct Args {
    /// JSON trace file
    trace: PathBuf,

    /// TOML configuration for the IME session
    #[arg(long)]
    config: Option<PathBuf>,

    /// Start with message interception enabled
    #[arg(long)]
    composing: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ImeConfig::load_toml(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ImeConfig::default(),
    };
    if args.composing {
        config.composing_on_create = true;
    }

    let content = std::fs::read_to_string(&args.trace)
        .with_context(|| format!("reading trace {}", args.trace.display()))?;
    let trace = Trace::from_json_str(&content)
        .with_context(|| format!("parsing trace {}", args.trace.display()))?;
    tracing::debug!(steps = trace.steps.len(), "loaded trace");

    let batches = replay(&trace, &config)?;
    for line in render_batches(&batches)? {
        println!("{}", line);
    }
    Ok(())
}

/// One JSON line per event, tagged with the poll it was delivered in.
fn render_batches(batches: &[Vec<CompositionEvent>]) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    for (poll, batch) in batches.iter().enumerate() {
        for event in batch {
            let mut value = serde_json::to_value(event)?;
            if let Some(obj) = value.as_object_mut() {
                obj.insert("poll".to_string(), poll.into());
            }
            lines.push(serde_json::to_string(&value)?);
        }
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use libimm_core::CompositionState;

    #[test]
    fn test_render_batches() {
        let batches = vec![
            vec![CompositionEvent::with_text(CompositionState::Compose, "ni")],
            vec![],
            vec![CompositionEvent::with_state(CompositionState::End)],
        ];

        let lines = render_batches(&batches).unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(r#""state":"compose""#));
        assert!(lines[0].contains(r#""poll":0"#));
        assert!(lines[1].contains(r#""poll":2"#));
    }
}
