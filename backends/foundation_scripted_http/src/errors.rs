use derive_more::From;

pub type ScriptResult<T> = std::result::Result<T, ScriptError>;

pub type ServerResult<T> = std::result::Result<T, ServerError>;

/// Failures while loading a script description.
#[derive(Debug, From)]
pub enum ScriptError {
    #[from(ignore)]
    IOError(std::io::Error),

    #[from(ignore)]
    DeserializationFailed(toml::de::Error),

    InvalidPath(std::path::PathBuf),
}

impl From<toml::de::Error> for ScriptError {
    fn from(value: toml::de::Error) -> Self {
        Self::DeserializationFailed(value)
    }
}

impl From<std::io::Error> for ScriptError {
    fn from(value: std::io::Error) -> Self {
        Self::IOError(value)
    }
}

impl std::error::Error for ScriptError {}

impl core::fmt::Display for ScriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Failures while starting a [`crate::http::ScriptedServer`].
#[derive(Debug)]
pub enum ServerError {
    BindFailed(std::io::Error),
    AddressUnavailable(std::io::Error),
    SpawnFailed(std::io::Error),
}

impl std::error::Error for ServerError {}

impl core::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Failures while reading an incoming request head off a connection.
#[derive(Debug, From)]
pub enum RequestHeadError {
    /// The peer closed the connection before sending another request.
    ConnectionClosed,

    #[from(ignore)]
    InvalidRequestLine(String),

    #[from(ignore)]
    InvalidHeaderLine(String),

    #[from(ignore)]
    InvalidContentLength(String),

    #[from(ignore)]
    HeadTooLarge(usize),

    ReadFailed(std::io::Error),
}

impl std::error::Error for RequestHeadError {}

impl core::fmt::Display for RequestHeadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_errors_convert_into_script_errors() {
        let err: ScriptError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, ScriptError::IOError(_)));
    }

    #[test]
    fn test_display_renders_variant() {
        let err = RequestHeadError::HeadTooLarge(42);
        assert_eq!(err.to_string(), "HeadTooLarge(42)");
    }
}
