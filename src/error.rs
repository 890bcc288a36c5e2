use std::error::Error;
use std::fmt;

pub type Result<T> = std::result::Result<T, OrthoplotError>;

#[derive(Debug)]
pub enum OrthoplotError {
    /// A referenced input path does not exist or could not be opened.
    NotFound(String),
    /// A malformed annotation record or table line, naming the offender.
    Parse(String),
    /// The fallback color generator exceeded its retry cap.
    ColorAllocation(String),
    Io(std::io::Error),
    Serde(serde_json::Error),
}

impl Error for OrthoplotError {}

impl fmt::Display for OrthoplotError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OrthoplotError::NotFound(what) => write!(f, "Not found: {what}"),
            OrthoplotError::Parse(what) => write!(f, "Parse error: {what}"),
            OrthoplotError::ColorAllocation(what) => write!(f, "Color allocation failed: {what}"),
            OrthoplotError::Io(err) => write!(f, "{err}"),
            OrthoplotError::Serde(err) => write!(f, "{err}"),
        }
    }
}

impl From<std::io::Error> for OrthoplotError {
    fn from(err: std::io::Error) -> Self {
        OrthoplotError::Io(err)
    }
}

impl From<serde_json::Error> for OrthoplotError {
    fn from(err: serde_json::Error) -> Self {
        OrthoplotError::Serde(err)
    }
}
