use std::fmt;

#[derive(Debug)]
pub enum LinkageError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (duplicate field, bad thresholds, etc.).
    ConfigValidation(String),
    /// `mu` or `lambda` outside `[0, 1]`.
    BoundOutOfRange { name: &'static str, value: f64 },
    /// No training pairs for one of the two labels.
    EmptyTrainingSet { label: &'static str },
    /// The two sources disagree on the number of comparable fields.
    SchemaMismatch { left: usize, right: usize },
    /// Blocking field is not one of the comparable fields.
    UnknownField(String),
    /// Missing required column in input data.
    MissingColumn { source: String, column: String },
    /// Known-links cell is not a record index.
    LinkParse { line: usize, value: String },
    /// Known link points past the end of a source.
    LinkOutOfRange { line: usize, left: usize, right: usize },
    /// IO error (file read, CSV framing, etc.).
    Io(String),
}

impl LinkageError {
    /// True for errors caused by the training corpus rather than the config or IO.
    pub fn is_training(&self) -> bool {
        matches!(
            self,
            Self::EmptyTrainingSet { .. } | Self::LinkParse { .. } | Self::LinkOutOfRange { .. }
        )
    }
}

impl fmt::Display for LinkageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::BoundOutOfRange { name, value } => {
                write!(f, "{name} must be within [0, 1], got {value}")
            }
            Self::EmptyTrainingSet { label } => {
                write!(f, "training corpus has no {label} pairs")
            }
            Self::SchemaMismatch { left, right } => write!(
                f,
                "comparable field mismatch: left source has {left} field(s), right source has {right}"
            ),
            Self::UnknownField(name) => {
                write!(f, "blocking field '{name}' is not a comparable field")
            }
            Self::MissingColumn { source, column } => {
                write!(f, "source '{source}': missing column '{column}'")
            }
            Self::LinkParse { line, value } => {
                write!(f, "known links, line {line}: cannot parse record index '{value}'")
            }
            Self::LinkOutOfRange { line, left, right } => write!(
                f,
                "known links, line {line}: pair ({left}, {right}) is outside the loaded sources"
            ),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for LinkageError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_bound_out_of_range() {
        let err = LinkageError::BoundOutOfRange { name: "mu", value: 1.5 };
        assert_eq!(err.to_string(), "mu must be within [0, 1], got 1.5");
    }

    #[test]
    fn training_errors_flagged() {
        assert!(LinkageError::EmptyTrainingSet { label: "match" }.is_training());
        assert!(LinkageError::LinkOutOfRange { line: 1, left: 9, right: 0 }.is_training());
        assert!(!LinkageError::Io("boom".into()).is_training());
    }
}
