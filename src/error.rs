use thiserror::Error;

pub type StencilResult<T> = std::result::Result<T, StencilError>;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum LexerErrorKind {
    /// A character not usable in parameters appeared where the lexer did not
    /// expect it.
    #[error("invalid parameter token '{token}'")]
    InvalidParameterToken { token: char },
    #[error("invalid operator '{operator}'")]
    InvalidOperator { operator: String },
    /// A string literal was opened but never closed before the end of the line.
    #[error("unterminated string literal")]
    UnterminatedStringLiteral,
    #[error("{0}")]
    Message(String),
}

/// An error raised while lexing template source.
///
/// Lexers are not part of this crate, but the error lives here so that a
/// caller-supplied parser can surface positioned failures through
/// [`StencilError`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
#[error("\"{name}\": {reason} - {line}:{column}")]
pub struct LexerError {
    pub reason: LexerErrorKind,
    /// Name of the template being lexed.
    pub name: String,
    pub line: usize,
    pub column: usize,
    /// Set when the parser may still salvage the offending token as literal
    /// text, e.g. `#anchor` that is not followed by a parameter list.
    pub recoverable: bool,
}

impl LexerError {
    pub fn new<N: Into<String>>(reason: LexerErrorKind, name: N, line: usize, column: usize) -> Self {
        Self {
            reason,
            name: name.into(),
            line,
            column,
            recoverable: false,
        }
    }

    #[must_use]
    pub const fn recoverable(mut self) -> Self {
        self.recoverable = true;
        self
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum ParserErrorKind {
    #[error("No {entity} named `{name}` exists")]
    NoEntity { entity: String, name: String },
    #[error("No exact match for {entity} {name}; {} possible matches", .matches.len())]
    SameName {
        entity: String,
        name: String,
        matches: Vec<String>,
    },
    #[error("{0}")]
    Message(String),
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
#[error("\"{name}\": {reason} - {line}:{column}")]
pub struct ParserError {
    pub reason: ParserErrorKind,
    pub name: String,
    pub line: usize,
    pub column: usize,
}

/// Failure reported by a [`Tag`](crate::Tag) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum TagError {
    #[error("expected {expected} parameter(s), found {found}")]
    ParameterCount { expected: usize, found: usize },
    #[error("unable to {action} unexpected data")]
    UnexpectedData { action: String },
    #[error("tag requires a body")]
    MissingBody,
    #[error("tag does not accept a body")]
    UnexpectedBody,
    #[error("{0}")]
    Message(String),
}

impl TagError {
    pub fn unexpected_data<T: Into<String>>(action: T) -> Self {
        Self::UnexpectedData {
            action: action.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StencilError {
    /// Attempted to access a template blocked for security reasons.
    #[error("Illegal access: {message}")]
    IllegalAccess { message: String },

    #[error("Caching is globally disabled")]
    CachingDisabled,
    /// Insert of a cache entry that already exists without `replace`.
    #[error("Existing entry {template_name}")]
    KeyExists { template_name: String },
    /// Removal of a cache entry that does not exist. Reads never raise this.
    #[error("No cache entry exists for {template_name}")]
    NoValueForKey { template_name: String },

    /// A document could not be made flat.
    #[error("{name} has unresolved dependencies: {missing:?}")]
    UnresolvedAst { name: String, missing: Vec<String> },
    #[error("Missing raw inline file \"{file}\"")]
    MissingRaw { file: String },
    #[error("No template found for {template_name}")]
    NoTemplateExists { template_name: String },
    /// A template reached itself again while resolving; `chain` is the ordered
    /// list of templates being resolved when the cycle closed.
    #[error("{name} cyclically referenced in [{}]", cycle_path(.name, .chain))]
    CyclicalReference { name: String, chain: Vec<String> },

    #[error("Lexing error - {0}")]
    Lexer(#[from] LexerError),
    #[error("Parse error - {0}")]
    Parser(#[from] ParserError),

    #[error("{identifier} is not a valid identifier")]
    InvalidIdentifier { identifier: String },
    #[error("Exceeded timeout at {seconds:.3}s")]
    Timeout { seconds: f64 },

    /// A structurally invalid expression.
    #[error("Evaluation error: {message}")]
    Evaluation { message: String },
    #[error("Tag `{name}` failed: {source}")]
    Tag {
        name: String,
        #[source]
        source: TagError,
    },
    #[error("Rendering {template} failed: {source}")]
    Render {
        template: String,
        #[source]
        source: Box<StencilError>,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
    #[error("{feature} not implemented")]
    UnsupportedFeature { feature: String },
    #[error("{message}")]
    Unknown { message: String },
}

impl StencilError {
    pub(crate) fn evaluation<T: Into<String>>(message: T) -> Self {
        Self::Evaluation {
            message: message.into(),
        }
    }

    /// Qualifies this error with the template it occurred in, unless it
    /// already is.
    #[must_use]
    pub fn in_template<T: Into<String>>(self, template: T) -> Self {
        match self {
            Self::Render { .. } => self,
            other => Self::Render {
                template: template.into(),
                source: Box::new(other),
            },
        }
    }
}

fn cycle_path(name: &str, chain: &[String]) -> String {
    let mut path: Vec<&str> = chain.iter().map(String::as_str).collect();
    let closing = format!("!{name}");
    path.push(&closing);
    path.join(" -> ")
}
