use std::borrow::Cow;

use crate::{
    ast::{Conditional, Loop, Syntax},
    context::{Context, UserInfo},
    error::{StencilError, StencilResult},
    evaluator::ParameterResolver,
    parameter::TagCall,
    tag::TagRegistry,
    value::Value,
};

/// Walks a flat node list and writes the rendered bytes.
#[derive(Debug, Clone, Copy)]
pub struct Serializer<'a> {
    tags: &'a TagRegistry,
    user_info: &'a UserInfo,
}

impl<'a> Serializer<'a> {
    pub const fn new(tags: &'a TagRegistry, user_info: &'a UserInfo) -> Self {
        Self { tags, user_info }
    }

    /// Renders `nodes` against `data`.
    ///
    /// # Errors
    ///
    /// Fails on any structural evaluation error, on a failing tag, and on
    /// extend or export markers that were never resolved. No partial output is
    /// returned.
    pub fn serialize(&self, nodes: &[Syntax], data: &Context) -> StencilResult<Vec<u8>> {
        let mut output = Vec::new();
        self.render_nodes(nodes, data, &mut output)?;
        Ok(output)
    }

    fn render_nodes(&self, nodes: &[Syntax], data: &Context, output: &mut Vec<u8>) -> StencilResult<()> {
        for node in nodes {
            self.render_node(node, data, output)?;
        }
        Ok(())
    }

    fn render_node(&self, node: &Syntax, data: &Context, output: &mut Vec<u8>) -> StencilResult<()> {
        match node {
            Syntax::Raw(bytes) => output.extend_from_slice(bytes),
            Syntax::Variable(variable) => {
                if let Some(value) = data.get_path(&variable.path) {
                    write_value(value, true, output);
                }
            }
            Syntax::Custom(call) => self.render_tag(call, data, output)?,
            Syntax::Conditional(conditional) => self.render_conditional(conditional, data, output)?,
            Syntax::Loop(l) => self.render_loop(l, data, output)?,
            // An import nothing exported into.
            Syntax::Import(_) => {}
            Syntax::Extend(extend) => {
                return Err(StencilError::Unknown {
                    message: format!(
                        "extend of {} should have been resolved before serialization",
                        extend.key
                    ),
                });
            }
            Syntax::Export(export) => {
                return Err(StencilError::Unknown {
                    message: format!(
                        "export of {} should have been resolved before serialization",
                        export.key
                    ),
                });
            }
        }
        Ok(())
    }

    fn resolver<'d>(&self, data: &'d Context) -> ParameterResolver<'d>
    where
        'a: 'd,
    {
        ParameterResolver::new(data, self.tags, self.user_info)
    }

    fn render_tag(&self, call: &TagCall, data: &Context, output: &mut Vec<u8>) -> StencilResult<()> {
        let value = self.resolver(data).resolve_tag(call)?;
        let escape = !self
            .tags
            .get(&call.name)
            .is_some_and(|tag| tag.is_unescaped());
        write_value(&value, escape, output);
        Ok(())
    }

    fn render_conditional(
        &self,
        conditional: &Conditional,
        data: &Context,
        output: &mut Vec<u8>,
    ) -> StencilResult<()> {
        let resolver = self.resolver(data);
        for clause in &conditional.clauses {
            let taken = match &clause.condition {
                Some(condition) => resolver.resolve(condition)?.truthy(),
                None => true,
            };
            if taken {
                return self.render_nodes(&clause.body, data, output);
            }
        }
        Ok(())
    }

    /// Renders the body once per element, with the element bound to the loop
    /// item alongside `index`, `isFirst` and `isLast`. Anything that is not an
    /// array renders nothing.
    fn render_loop(&self, l: &Loop, data: &Context, output: &mut Vec<u8>) -> StencilResult<()> {
        let array = self.resolver(data).resolve(&l.array)?;
        let Some(items) = array.as_array() else {
            tracing::trace!(item = %l.item, kind = array.kind(), "loop over a non-array renders nothing");
            return Ok(());
        };

        let last = items.len().checked_sub(1);
        for (index, item) in items.iter().enumerate() {
            let mut scope = data.clone();
            scope
                .insert(&l.item, item.clone())
                .insert("index", Value::from(i64::try_from(index).ok()))
                .insert("isFirst", index == 0)
                .insert("isLast", Some(index) == last);
            self.render_nodes(&l.body, &scope, output)?;
        }
        Ok(())
    }
}

/// Writes the output form of `value`: strings and data are written as is
/// (escaped when `escape` is set), numbers and bools in their string form,
/// and anything without a string form writes nothing.
fn write_value(value: &Value, escape: bool, output: &mut Vec<u8>) {
    match value.resolved() {
        Value::Data(bytes) if !escape => output.extend_from_slice(bytes),
        Value::Data(bytes) => match std::str::from_utf8(bytes) {
            Ok(s) => output.extend_from_slice(escape_html(s).as_bytes()),
            Err(_) => output.extend_from_slice(bytes),
        },
        other @ (Value::Bool(_)
        | Value::String(_)
        | Value::Int(_)
        | Value::Double(_)
        | Value::Array(_)
        | Value::Dictionary(_)
        | Value::Lazy(_)
        | Value::Null) => {
            let Some(s) = other.as_string() else {
                return;
            };
            if escape {
                output.extend_from_slice(escape_html(&s).as_bytes());
            } else {
                output.extend_from_slice(s.as_bytes());
            }
        }
    }
}

/// Escapes `&`, `<`, `>`, `"` and `'` for inclusion in HTML text or attribute
/// values. Borrows the input when nothing needs escaping.
pub fn escape_html(input: &str) -> Cow<'_, str> {
    if !input.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(input);
    }

    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    Cow::Owned(escaped)
}
