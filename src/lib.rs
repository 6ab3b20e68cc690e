mod ast;
mod cache;
mod context;
mod document;
mod error;
mod evaluator;
mod parameter;
mod renderer;
mod serializer;
mod source;
mod tag;
mod tags;
mod value;

// Public exports.
pub use ast::{Clause, Conditional, Export, Extend, Import, Loop, Syntax, Variable};
pub use cache::DocumentCache;
pub use context::{Context, UserInfo};
pub use document::{Document, Flatness};
pub use error::{
    LexerError, LexerErrorKind, ParserError, ParserErrorKind, StencilError, StencilResult,
    TagError,
};
pub use evaluator::{ParameterResolver, apply_operator};
pub use parameter::{Constant, Keyword, Operator, Parameter, ParameterDeclaration, TagCall};
pub use renderer::{Parse, Renderer, RendererConfig};
pub use serializer::{Serializer, escape_html};
pub use source::{FileSource, Limits, MemorySource, Source};
pub use tag::{Tag, TagContext, TagRegistry};
pub use tags::{Capitalized, Comment, Contains, Count, Date, Lowercased, UnsafeHtml, Uppercased};
pub use value::{Lazy, Value};
