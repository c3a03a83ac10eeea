//! Generation-control parameters.
//!
//! A [`ParameterSet`] holds three independently optional values.  An unset value is left out
//! of the request entirely so the endpoint's default applies; it is never replaced by a local
//! numeric default.

use crate::error::{Error, Result};
use crate::types::ChatCompletionRequest;

/// Display string for a parameter that has not been set.
pub const NOT_SET: &str = "<not set>";

/// Name of the maximum-tokens parameter.
pub const MAX_TOKENS: &str = "max-tokens";

/// Name of the temperature parameter.
pub const TEMPERATURE: &str = "temperature";

/// Name of the nucleus-sampling parameter.
pub const TOP_P: &str = "top-p";

/// Every recognized parameter name, in display order.
pub const PARAMETER_NAMES: [&str; 3] = [MAX_TOKENS, TEMPERATURE, TOP_P];

/// Optional sampling parameters, addressed by name.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ParameterSet {
    max_tokens: Option<u32>,
    temperature: Option<f64>,
    top_p: Option<f64>,
}

impl ParameterSet {
    /// Creates a set with every parameter unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `value` and stores it under `name`.
    ///
    /// Fails without changing anything if the name is unknown or the value does not parse.
    pub fn set_by_name(&mut self, name: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match name {
            MAX_TOKENS => {
                let parsed = value
                    .parse::<u32>()
                    .map_err(|_| malformed(name, value, "a non-negative integer"))?;
                self.max_tokens = Some(parsed);
            }
            TEMPERATURE => self.temperature = Some(parse_float(name, value)?),
            TOP_P => self.top_p = Some(parse_float(name, value)?),
            _ => return Err(unknown(name)),
        }
        Ok(())
    }

    /// Clears the parameter called `name` so the endpoint default applies again.
    pub fn unset_by_name(&mut self, name: &str) -> Result<()> {
        match name {
            MAX_TOKENS => self.max_tokens = None,
            TEMPERATURE => self.temperature = None,
            TOP_P => self.top_p = None,
            _ => return Err(unknown(name)),
        }
        Ok(())
    }

    /// Renders the parameter called `name`, or [`NOT_SET`] if it is unset or unknown.
    pub fn format(&self, name: &str) -> String {
        let formatted = match name {
            MAX_TOKENS => self.max_tokens.map(|v| v.to_string()),
            TEMPERATURE => self.temperature.map(|v| v.to_string()),
            TOP_P => self.top_p.map(|v| v.to_string()),
            _ => None,
        };
        formatted.unwrap_or_else(|| NOT_SET.to_string())
    }

    /// Copies the set parameters onto `request`, leaving the others untouched.
    pub fn apply_to(&self, request: &mut ChatCompletionRequest) {
        if let Some(max_tokens) = self.max_tokens {
            request.max_tokens = Some(max_tokens);
        }
        if let Some(temperature) = self.temperature {
            request.temperature = Some(temperature);
        }
        if let Some(top_p) = self.top_p {
            request.top_p = Some(top_p);
        }
    }

    /// The maximum number of tokens, if set.
    pub fn max_tokens(&self) -> Option<u32> {
        self.max_tokens
    }

    /// The sampling temperature, if set.
    pub fn temperature(&self) -> Option<f64> {
        self.temperature
    }

    /// The nucleus-sampling probability, if set.
    pub fn top_p(&self) -> Option<f64> {
        self.top_p
    }
}

fn parse_float(name: &str, value: &str) -> Result<f64> {
    match value.parse::<f64>() {
        Ok(parsed) if parsed.is_finite() => Ok(parsed),
        _ => Err(malformed(name, value, "a finite number")),
    }
}

fn malformed(name: &str, value: &str, expected: &str) -> Error {
    Error::validation(
        format!("malformed value '{value}' for {name}: expected {expected}"),
        Some(name.to_string()),
    )
}

fn unknown(name: &str) -> Error {
    Error::validation(
        format!(
            "unknown parameter '{name}'. Supported parameters: {}",
            PARAMETER_NAMES.join(", ")
        ),
        Some(name.to_string()),
    )
}
