use std::fmt;

use crate::ast::Syntax;

/// A numeric literal, keeping the kind it was written as.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constant {
    Int(i64),
    Double(f64),
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Keyword {
    In,
    True,
    False,
    Yes,
    No,
    Nil,
    /// The whole data environment.
    SelfKeyword,
}

impl Keyword {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::In => "in",
            Self::True => "true",
            Self::False => "false",
            Self::Yes => "yes",
            Self::No => "no",
            Self::Nil => "nil",
            Self::SelfKeyword => "self",
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operator {
    Not,
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanOrEquals,
    LessThan,
    LessThanOrEquals,
    Plus,
    Minus,
    Multiply,
    Divide,
    And,
    Or,
}

impl Operator {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Not => "!",
            Self::Equals => "==",
            Self::NotEquals => "!=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEquals => ">=",
            Self::LessThan => "<",
            Self::LessThanOrEquals => "<=",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::And => "&&",
            Self::Or => "||",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum Parameter {
    Constant(Constant),
    StringLiteral(String),
    /// A dotted variable path, already split into segments.
    Variable(Vec<String>),
    Keyword(Keyword),
    Operator(Operator),
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(Constant::Int(i)) => write!(f, "{i}"),
            Self::Constant(Constant::Double(d)) => write!(f, "{d}"),
            Self::StringLiteral(s) => write!(f, "{s:?}"),
            Self::Variable(path) => f.write_str(&path.join(".")),
            Self::Keyword(k) => write!(f, "{k}"),
            Self::Operator(o) => write!(f, "{o}"),
        }
    }
}

/// An invocation of a named tag, either inline in an expression or as a
/// block in the node list.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct TagCall {
    pub name: String,
    pub params: Vec<ParameterDeclaration>,
    pub body: Option<Vec<Syntax>>,
}

impl TagCall {
    pub fn new<N: Into<String>>(name: N, params: Vec<ParameterDeclaration>) -> Self {
        Self {
            name: name.into(),
            params,
            body: None,
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: Vec<Syntax>) -> Self {
        self.body = Some(body);
        self
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterDeclaration {
    /// An expression, dispatched on its length: one operand, a unary operator
    /// and its operand, or `lhs functor rhs`.
    Expression(Vec<ParameterDeclaration>),
    Parameter(Parameter),
    Tag(TagCall),
}

impl ParameterDeclaration {
    pub const fn int(value: i64) -> Self {
        Self::Parameter(Parameter::Constant(Constant::Int(value)))
    }

    pub const fn double(value: f64) -> Self {
        Self::Parameter(Parameter::Constant(Constant::Double(value)))
    }

    pub fn string<T: Into<String>>(value: T) -> Self {
        Self::Parameter(Parameter::StringLiteral(value.into()))
    }

    /// A variable reference; `path` is split on `.`.
    pub fn variable(path: &str) -> Self {
        Self::Parameter(Parameter::Variable(
            path.split('.').map(str::to_owned).collect(),
        ))
    }

    pub const fn keyword(keyword: Keyword) -> Self {
        Self::Parameter(Parameter::Keyword(keyword))
    }

    pub const fn operator(operator: Operator) -> Self {
        Self::Parameter(Parameter::Operator(operator))
    }

    /// Shorthand for a three element `lhs op rhs` expression.
    pub fn binary(lhs: Self, operator: Operator, rhs: Self) -> Self {
        Self::Expression(vec![lhs, Self::operator(operator), rhs])
    }

    pub(crate) const fn as_operator(&self) -> Option<Operator> {
        match self {
            Self::Parameter(Parameter::Operator(operator)) => Some(*operator),
            Self::Parameter(_) | Self::Expression(_) | Self::Tag(_) => None,
        }
    }
}

impl fmt::Display for ParameterDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expression(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
            Self::Parameter(p) => write!(f, "{p}"),
            Self::Tag(tag) => {
                write!(f, "{}(", tag.name)?;
                for (i, param) in tag.params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{param}")?;
                }
                f.write_str(")")
            }
        }
    }
}
