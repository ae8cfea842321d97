//! CLI command implementations

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use trellis_bridge::{Bridge, BroadcastScheduler};
use trellis_core::{parse, Path, PathValue, Resolution};
use trellis_model::{Config, GraphOps, Model};
use trellis_source::CallRequest;

pub async fn get(mut config: Config, keys: Vec<String>, parse_paths: bool) -> anyhow::Result<()> {
    let model = Model::from_config(&mut config);
    if parse_paths {
        let paths = keys.iter().map(|k| parse(k)).collect::<Result<Vec<_>, _>>()?;
        let json = model.get(&paths).await?;
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        let path = Path::from_args(keys);
        let resolution = model.get_value(&path).await?;
        println!("{}", render(&resolution)?);
    }
    Ok(())
}

pub async fn set(mut config: Config, path: String, raw: String) -> anyhow::Result<()> {
    let model = Model::from_config(&mut config);
    let value = PathValue::new(path.as_str(), json_or_string(&raw))?;
    let resolution = model.set(value).await?;
    println!("{}", render(&resolution)?);
    Ok(())
}

pub async fn call(mut config: Config, path: String, args: Option<String>) -> anyhow::Result<()> {
    let model = Model::from_config(&mut config);
    let arguments = match args {
        Some(raw) => match serde_json::from_str::<Value>(&raw)? {
            Value::Array(items) => items,
            single => vec![single],
        },
        None => Vec::new(),
    };
    let json = model.call(CallRequest::new(parse(&path)?, arguments)).await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

pub fn invalidate(mut config: Config, path: String) -> anyhow::Result<()> {
    let model = Model::from_config(&mut config);
    model.invalidate(&[parse(&path)?]);
    println!("{}", serde_json::to_string_pretty(&model.get_cache())?);
    Ok(())
}

pub fn cache(mut config: Config) -> anyhow::Result<()> {
    let model = Model::from_config(&mut config);
    println!("{}", serde_json::to_string_pretty(&model.get_cache())?);
    Ok(())
}

/// Read `paths` through the reactive binding, re-reading on every signal
/// until all of them resolve or `wait` passes without one.
pub async fn watch(config: Config, paths: Vec<String>, wait: Duration) -> anyhow::Result<()> {
    let paths = paths.iter().map(|p| parse(p)).collect::<Result<Vec<_>, _>>()?;
    let scheduler = Arc::new(BroadcastScheduler::default());
    let mut signals = scheduler.subscribe();
    let bridge = Bridge::new(config, scheduler)?;

    loop {
        let mut pending = 0;
        for path in &paths {
            let resolution = bridge.read_path(path);
            if !resolution.is_available() {
                pending += 1;
            }
            println!("{} = {}", path, render(&resolution)?);
        }
        if pending == 0 {
            return Ok(());
        }

        match tokio::time::timeout(wait, signals.recv()).await {
            Ok(Ok(sequence)) => tracing::debug!("Re-evaluating after signal {}", sequence),
            Ok(Err(RecvError::Lagged(skipped))) => tracing::debug!("Skipped {} signals", skipped),
            Ok(Err(RecvError::Closed)) => anyhow::bail!("scheduler closed"),
            Err(_) => {
                tracing::warn!("{} paths still unavailable after {:?}", pending, wait);
                return Ok(());
            }
        }
    }
}

fn render(resolution: &Resolution) -> anyhow::Result<String> {
    Ok(match resolution {
        Resolution::Present(value) => serde_json::to_string_pretty(value)?,
        Resolution::Undefined => "undefined".to_string(),
        Resolution::Unavailable => "unavailable".to_string(),
    })
}

/// Values that are not valid JSON are taken as plain strings.
fn json_or_string(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
