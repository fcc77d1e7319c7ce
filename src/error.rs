use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metrics::Window;
use crate::narrative::SectionKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "problem", rename_all = "snake_case")]
pub enum ValidationProblem {
    Missing,
    NonFinite,
    OutOfRange { value: f64, min: f64, max: f64 },
    Inconsistent { detail: String },
}

impl Display for ValidationProblem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "missing required value"),
            Self::NonFinite => write!(f, "value is not a finite number"),
            Self::OutOfRange { value, min, max } => {
                write!(f, "value {value} outside physical range [{min}, {max}]")
            }
            Self::Inconsistent { detail } => write!(f, "{detail}"),
        }
    }
}

/// Malformed, missing or physically implausible input. `window` is `None` for
/// record-level fields such as the location or model metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("invalid input field {} ({}): {problem}", field_id(.window, .field), window_label(.window))]
pub struct DataValidationError {
    pub window: Option<Window>,
    pub field: String,
    pub problem: ValidationProblem,
}

impl DataValidationError {
    pub fn new(window: Option<Window>, field: impl Into<String>, problem: ValidationProblem) -> Self {
        Self {
            window,
            field: field.into(),
            problem,
        }
    }

    pub fn missing(window: Option<Window>, field: impl Into<String>) -> Self {
        Self::new(window, field, ValidationProblem::Missing)
    }

    /// Upper-snake identifier, e.g. `CURRENT_HUMIDITY_MAX`.
    pub fn field_id(&self) -> String {
        field_id(&self.window, &self.field)
    }
}

fn field_id(window: &Option<Window>, field: &str) -> String {
    let field = field.replace('.', "_").to_ascii_uppercase();
    match window {
        Some(window) => format!("{}_{field}", window.as_slug().to_ascii_uppercase()),
        None => field,
    }
}

fn window_label(window: &Option<Window>) -> String {
    match window {
        Some(window) => format!("{window} window"),
        None => "record".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NarrativeError {
    #[error(transparent)]
    DataValidation(#[from] DataValidationError),
    #[error("unsupported claim `{claim}` in section {section}: {rule}")]
    UnsupportedClaim {
        section: SectionKind,
        claim: String,
        rule: String,
    },
    #[error("incomplete output at section {section}: {rule}")]
    IncompleteOutput { section: String, rule: String },
}

impl NarrativeError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DataValidation(_) => "data_validation",
            Self::UnsupportedClaim { .. } => "unsupported_claim",
            Self::IncompleteOutput { .. } => "incomplete_output",
        }
    }

    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::DataValidation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_id_joins_window_and_field() {
        let err = DataValidationError::missing(Some(Window::Current), "humidity_max");
        assert_eq!(err.field_id(), "CURRENT_HUMIDITY_MAX");
        assert!(err.to_string().contains("CURRENT_HUMIDITY_MAX"));
        assert!(err.to_string().contains("current window"));
    }

    #[test]
    fn nested_fields_are_flattened() {
        let err = DataValidationError::missing(
            Some(Window::Future),
            "seasons.summer.temperature_mean",
        );
        assert_eq!(err.field_id(), "FUTURE_SEASONS_SUMMER_TEMPERATURE_MEAN");
    }

    #[test]
    fn record_level_fields_have_no_window_prefix() {
        let err = DataValidationError::missing(None, "metadata.model_agreement");
        assert_eq!(err.field_id(), "METADATA_MODEL_AGREEMENT");
        assert!(err.to_string().contains("record"));
    }

    #[test]
    fn kinds_are_stable() {
        let err: NarrativeError = DataValidationError::missing(None, "x").into();
        assert_eq!(err.kind(), "data_validation");
        assert!(err.is_input_error());
    }
}
