//! Errors raised while loading `kiln.toml`.

/// Why a worker configuration could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read kiln.toml: {0}")]
    IoError(#[from] std::io::Error),

    /// The file is not valid TOML or does not match the schema.
    #[error("invalid kiln.toml: {0}")]
    ParseError(String),

    /// A setting that must not be empty is empty.
    #[error("`{0}` must not be empty")]
    MissingField(String),

    /// A setting is present but unusable.
    #[error("invalid setting: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_setting_names_the_key() {
        let err = ConfigError::MissingField("entry.class".to_string());
        assert_eq!(err.to_string(), "`entry.class` must not be empty");
    }

    #[test]
    fn parse_error_mentions_file() {
        let err = ConfigError::ParseError("unknown field `minfy`".to_string());
        assert_eq!(err.to_string(), "invalid kiln.toml: unknown field `minfy`");
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ConfigError::from(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no such file",
        ));
        assert_eq!(err.to_string(), "cannot read kiln.toml: no such file");
    }
}
