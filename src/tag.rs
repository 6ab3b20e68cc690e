use std::{collections::HashMap, fmt, sync::Arc};

use crate::{
    ast::Syntax,
    context::{Context, UserInfo},
    error::TagError,
    tags,
    value::Value,
};

/// Everything a tag sees when it is invoked.
#[derive(Debug)]
pub struct TagContext<'a> {
    /// Parameter values, resolved in declaration order.
    pub parameters: Vec<Value>,
    pub data: &'a Context,
    /// The unevaluated body of a block-style tag.
    pub body: Option<&'a [Syntax]>,
    pub user_info: &'a UserInfo,
}

impl TagContext<'_> {
    pub fn require_parameter_count(&self, expected: usize) -> Result<(), TagError> {
        if self.parameters.len() == expected {
            Ok(())
        } else {
            Err(TagError::ParameterCount {
                expected,
                found: self.parameters.len(),
            })
        }
    }

    pub fn require_body(&self) -> Result<&[Syntax], TagError> {
        self.body.ok_or(TagError::MissingBody)
    }

    pub fn require_no_body(&self) -> Result<(), TagError> {
        match self.body {
            Some(_) => Err(TagError::UnexpectedBody),
            None => Ok(()),
        }
    }
}

/// A custom tag callable from templates.
pub trait Tag: Send + Sync {
    fn render(&self, ctx: &TagContext<'_>) -> Result<Value, TagError>;

    /// Whether string output of this tag bypasses HTML escaping.
    fn is_unescaped(&self) -> bool {
        false
    }
}

impl<F> Tag for F
where
    F: Fn(&TagContext<'_>) -> Result<Value, TagError> + Send + Sync,
{
    fn render(&self, ctx: &TagContext<'_>) -> Result<Value, TagError> {
        self(ctx)
    }
}

/// Tags available to a render, by name.
#[derive(Clone)]
pub struct TagRegistry {
    tags: HashMap<String, Arc<dyn Tag>>,
}

impl TagRegistry {
    /// A registry with no tags at all.
    pub fn empty() -> Self {
        Self {
            tags: HashMap::new(),
        }
    }

    pub fn register<N: Into<String>, T: Tag + 'static>(&mut self, name: N, tag: T) -> &mut Self {
        self.tags.insert(name.into(), Arc::new(tag));
        self
    }

    /// Registers a closure as a tag.
    pub fn register_fn<N, F>(&mut self, name: N, tag: F) -> &mut Self
    where
        N: Into<String>,
        F: Fn(&TagContext<'_>) -> Result<Value, TagError> + Send + Sync + 'static,
    {
        self.register(name, tag)
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<dyn Tag>> {
        self.tags.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tag> {
        self.tags.get(name).map(|tag| &**tag)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tags.contains_key(name)
    }
}

impl Default for TagRegistry {
    /// A registry holding the built-in tags.
    fn default() -> Self {
        let mut registry = Self::empty();
        tags::register_defaults(&mut registry);
        registry
    }
}

impl fmt::Debug for TagRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.tags.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("TagRegistry").field("tags", &names).finish()
    }
}
