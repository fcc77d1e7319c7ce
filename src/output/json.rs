use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

pub fn render_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Wrapper for outputs that are about a run rather than the run's content.
/// Reports themselves are never stamped, so reruns stay byte-identical.
#[derive(Debug, Serialize)]
pub struct Stamped<'a, T: Serialize + ?Sized> {
    pub generated_at: DateTime<Utc>,
    pub version: &'static str,
    pub data: &'a T,
}

pub fn render_stamped_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    render_json(&Stamped {
        generated_at: Utc::now(),
        version: env!("CARGO_PKG_VERSION"),
        data: value,
    })
}
