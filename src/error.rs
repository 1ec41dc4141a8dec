use std::fmt::{self, Display};
use std::io;

/// Provides `CityError` and maps to other errors to
/// convert to a `CityError`
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum CityError {
    IoError(io::Error),
    JsonError(serde_json::Error),
    /// A configuration value is out of range or a distribution is malformed.
    ConfigError(String),
    /// The occupancy API was used inconsistently, e.g. releasing an absent agent.
    LocationError(String),
    CityError(String),
}

impl CityError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        CityError::ConfigError(message.into())
    }

    pub(crate) fn location(message: impl Into<String>) -> Self {
        CityError::LocationError(message.into())
    }
}

impl From<io::Error> for CityError {
    fn from(error: io::Error) -> Self {
        CityError::IoError(error)
    }
}

impl From<serde_json::Error> for CityError {
    fn from(error: serde_json::Error) -> Self {
        CityError::JsonError(error)
    }
}

impl From<String> for CityError {
    fn from(error: String) -> Self {
        CityError::CityError(error)
    }
}

impl From<&str> for CityError {
    fn from(error: &str) -> Self {
        CityError::CityError(error.to_string())
    }
}

impl std::error::Error for CityError {}

impl Display for CityError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Error: {self:?}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_conversions() {
        let error: CityError = "bad".into();
        assert!(matches!(error, CityError::CityError(ref s) if s == "bad"));

        let error: CityError = String::from("worse").into();
        assert!(matches!(error, CityError::CityError(ref s) if s == "worse"));
    }

    #[test]
    fn json_conversion() {
        let parsed: Result<u32, _> = serde_json::from_str("not json");
        let error: CityError = parsed.unwrap_err().into();
        assert!(matches!(error, CityError::JsonError(_)));
        assert!(error.to_string().starts_with("Error: JsonError"));
    }

    #[test]
    fn helper_constructors() {
        assert!(matches!(
            CityError::config("x"),
            CityError::ConfigError(ref s) if s == "x"
        ));
        assert!(matches!(
            CityError::location("y"),
            CityError::LocationError(ref s) if s == "y"
        ));
    }
}
