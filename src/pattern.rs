use std::fmt;

use crate::Error;

/// Compiled metadata pattern used by the classifier rule table.
#[derive(Debug, Clone)]
pub(crate) struct Pattern {
    source: &'static str,
    backend: fancy_regex::Regex,
}

impl Pattern {
    pub(crate) fn new(source: &'static str) -> Result<Self, PatternError> {
        let backend = fancy_regex::Regex::new(source).map_err(|err| PatternError {
            source,
            message: err.to_string(),
        })?;
        Ok(Self { source, backend })
    }

    pub(crate) fn is_match(&self, input: &str) -> Result<bool, PatternError> {
        self.backend.is_match(input).map_err(|err| PatternError {
            source: self.source,
            message: err.to_string(),
        })
    }

    pub(crate) fn as_str(&self) -> &'static str {
        self.source
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PatternError {
    source: &'static str,
    message: String,
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/: {}", self.source, self.message)
    }
}

impl From<PatternError> for Error {
    fn from(value: PatternError) -> Self {
        Error::Pattern(value.to_string())
    }
}
