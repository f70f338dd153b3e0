use std::borrow::Cow;

/// Errors raised while interpreting signal/level vocabulary from the outside world.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Numeric level above the most verbose level.
    #[error("Invalid level{}: {value} is above 4", format_context(.context))]
    InvalidLevel { value: i8, context: Option<Cow<'static, str>> },

    /// Name that matches no signal.
    #[error("Unknown signal{}: {message}", format_context(.context))]
    UnknownSignal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

/// Errors raised when building a [`Message`](crate::Message).
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// Placeholder count and argument count differ.
    #[error(
        "Argument mismatch{}: template expects {expected} argument(s), {supplied} supplied",
        format_context(.context)
    )]
    ArgumentMismatch { expected: usize, supplied: usize, context: Option<Cow<'static, str>> },

    /// Unbalanced `{` or `}` in a template.
    #[error("Malformed template{}: {message}", format_context(.context))]
    MalformedTemplate { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

/// Errors raised while loading daemon configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

/// Attaches a human readable context to a failed result.
pub trait ConfigErrorExt<T> {
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T, ConfigError>;
}

impl<T> ConfigErrorExt<T> for Result<T, ConfigError> {
    fn context(self, context: impl Into<Cow<'static, str>>) -> Self {
        self.map_err(|mut e| {
            match &mut e {
                ConfigError::Config { context: c, .. } => *c = Some(context.into()),
            }
            e
        })
    }
}

impl<T> ConfigErrorExt<T> for Result<T, config::ConfigError> {
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T, ConfigError> {
        self.map_err(|source| ConfigError::Config { source, context: Some(context.into()) })
    }
}

impl From<config::ConfigError> for ConfigError {
    fn from(source: config::ConfigError) -> Self {
        Self::Config { source, context: None }
    }
}

/// Attaches context to a failed message construction.
pub trait MessageErrorExt<T> {
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T, MessageError>;
}

impl<T> MessageErrorExt<T> for Result<T, MessageError> {
    fn context(self, context: impl Into<Cow<'static, str>>) -> Self {
        self.map_err(|mut e| {
            match &mut e {
                MessageError::ArgumentMismatch { context: c, .. }
                | MessageError::MalformedTemplate { context: c, .. } => *c = Some(context.into()),
            }
            e
        })
    }
}

fn format_context(context: &Option<Cow<'static, str>>) -> Cow<'static, str> {
    context.as_ref().map_or(Cow::Borrowed(""), |c| Cow::Owned(format!(" ({c})")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_is_rendered() {
        let err: Result<(), MessageError> =
            Err(MessageError::ArgumentMismatch { expected: 2, supplied: 1, context: None });
        let err = err.context("IKE_SA init").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Argument mismatch (IKE_SA init): template expects 2 argument(s), 1 supplied"
        );
    }

    #[test]
    fn test_without_context() {
        let err = ModelError::InvalidLevel { value: 9, context: None };
        assert_eq!(err.to_string(), "Invalid level: 9 is above 4");
    }
}
