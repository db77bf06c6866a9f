use crate::expr::ExprError;

/// Errors raised while compiling template definitions.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// A stanza is missing a field the compiler cannot default.
    #[error("template '{template}': missing required field '{field}'")]
    MissingField {
        template: String,
        field: &'static str,
    },

    /// A `calc`/`warn`/`crit` formula failed to parse.
    #[error("template '{template}': bad {field} formula: {source}")]
    Formula {
        template: String,
        field: &'static str,
        #[source]
        source: ExprError,
    },

    /// A duration value (`every`, lookup window, delay) failed to parse.
    #[error("invalid duration '{0}'")]
    Duration(String),

    /// The `lookup:` line does not follow
    /// `<agg> <window> [unaligned] [match-names|match-ids] of <pattern>`.
    #[error("invalid lookup '{line}': {reason}")]
    Lookup { line: String, reason: String },

    /// The `delay:` line does not follow
    /// `up <dur> down <dur> multiplier <float> max <dur>`.
    #[error("invalid delay '{line}': {reason}")]
    Delay { line: String, reason: String },

    /// Neither `calc` nor `lookup` is present, so nothing supplies `$this`.
    #[error("template '{0}' declares neither calc nor lookup")]
    NoValueSource(String),

    /// A later definition reused an already-loaded template name.
    #[error("duplicate template name '{0}'")]
    Duplicate(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TemplateError>;
