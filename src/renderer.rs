use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use crate::{
    ast::Syntax,
    cache::DocumentCache,
    context::{Context, UserInfo},
    document::Document,
    error::{StencilError, StencilResult},
    serializer::Serializer,
    source::Source,
    tag::TagRegistry,
};

/// Turns the raw bytes of a template into its node list.
pub trait Parse: Send + Sync {
    fn parse(&self, name: &str, raw: &[u8]) -> StencilResult<Vec<Syntax>>;
}

impl<F> Parse for F
where
    F: Fn(&str, &[u8]) -> StencilResult<Vec<Syntax>> + Send + Sync,
{
    fn parse(&self, name: &str, raw: &[u8]) -> StencilResult<Vec<Syntax>> {
        self(name, raw)
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RendererConfig {
    /// Keep resolved documents between renders.
    pub cache_enabled: bool,
    /// Budget for resolving one template and everything it extends.
    pub timeout: Duration,
}

impl RendererConfig {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// # Errors
    ///
    /// [`StencilError::Configuration`] for a zero timeout.
    pub fn validate(&self) -> StencilResult<()> {
        if self.timeout.is_zero() {
            return Err(StencilError::Configuration {
                message: "timeout must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }
}

/// Loads, resolves, caches and serializes templates.
///
/// # Examples
///
/// ```
/// use stencil::{Context, MemorySource, Renderer, RendererConfig, StencilResult, Syntax};
///
/// let mut source = MemorySource::new();
/// source.insert("greeting", "Hello!");
///
/// let parse = |_name: &str, raw: &[u8]| -> StencilResult<Vec<Syntax>> {
///     Ok(vec![Syntax::raw(raw)])
/// };
/// let renderer = Renderer::new(RendererConfig::default(), source, parse).unwrap();
///
/// let output = renderer.render_string("greeting", &Context::new()).unwrap();
/// assert_eq!(output, "Hello!");
/// ```
#[derive(Debug)]
pub struct Renderer<S, P> {
    config: RendererConfig,
    source: S,
    parser: P,
    cache: DocumentCache,
    tags: TagRegistry,
    user_info: UserInfo,
}

impl<S: Source, P: Parse> Renderer<S, P> {
    /// A renderer with the built-in tags.
    ///
    /// # Errors
    ///
    /// [`StencilError::Configuration`] when `config` is invalid.
    pub fn new(config: RendererConfig, source: S, parser: P) -> StencilResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            source,
            parser,
            cache: DocumentCache::new(config.cache_enabled),
            tags: TagRegistry::default(),
            user_info: UserInfo::new(),
        })
    }

    #[must_use]
    pub fn with_tags(mut self, tags: TagRegistry) -> Self {
        self.tags = tags;
        self
    }

    #[must_use]
    pub fn with_user_info(mut self, user_info: UserInfo) -> Self {
        self.user_info = user_info;
        self
    }

    pub const fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub const fn cache(&self) -> &DocumentCache {
        &self.cache
    }

    pub const fn tags(&self) -> &TagRegistry {
        &self.tags
    }

    pub const fn tags_mut(&mut self) -> &mut TagRegistry {
        &mut self.tags
    }

    /// Renders the template `name` against `data`.
    ///
    /// # Errors
    ///
    /// Any resolution error from [`Self::document`]; serialization errors are
    /// wrapped in [`StencilError::Render`] naming the template.
    pub fn render(&self, name: &str, data: &Context) -> StencilResult<Vec<u8>> {
        let document = self.document(name)?;
        Serializer::new(&self.tags, &self.user_info)
            .serialize(document.nodes(), data)
            .map_err(|err| err.in_template(name))
    }

    /// [`Self::render`], decoded as UTF-8.
    pub fn render_string(&self, name: &str, data: &Context) -> StencilResult<String> {
        let bytes = self.render(name, data)?;
        String::from_utf8(bytes).map_err(|err| StencilError::Unknown {
            message: format!("{name} rendered invalid UTF-8: {err}"),
        })
    }

    /// Loads `name` and everything it extends, resolving it to a flat
    /// document without serializing it.
    ///
    /// # Errors
    ///
    /// - [`StencilError::NoTemplateExists`] or [`StencilError::IllegalAccess`]
    ///   from the source, for `name` or any template it extends.
    /// - Whatever the parser raises.
    /// - [`StencilError::CyclicalReference`] when a template extends itself,
    ///   directly or through others.
    /// - [`StencilError::Timeout`] when resolution exceeds the configured
    ///   budget.
    /// - [`StencilError::UnresolvedAst`] when a resolution pass makes no
    ///   progress.
    pub fn document(&self, name: &str) -> StencilResult<Arc<Document>> {
        let mut chain = Vec::new();
        self.resolve(name, &mut chain, Instant::now())
    }

    fn resolve(&self, name: &str, chain: &mut Vec<String>, started: Instant) -> StencilResult<Arc<Document>> {
        if let Some(document) = self.cache.retrieve(name) {
            tracing::debug!(template = name, "cache hit");
            return Ok(document);
        }
        if chain.iter().any(|entry| entry == name) {
            return Err(StencilError::CyclicalReference {
                name: name.to_string(),
                chain: chain.clone(),
            });
        }
        self.check_timeout(started)?;

        let raw = self.source.file(name, false)?;
        let nodes = self.parser.parse(name, &raw)?;
        tracing::debug!(template = name, nodes = nodes.len(), "loaded template");

        let mut document = Document::new(name, nodes);
        document.refresh();

        chain.push(name.to_string());
        let resolved = self.flatten(&mut document, chain, started);
        chain.pop();
        resolved?;

        if self.cache.is_enabled() {
            self.cache.insert(document, true)
        } else {
            Ok(Arc::new(document))
        }
    }

    /// Fetches and inlines the unresolved references of `document` until it is
    /// flat.
    fn flatten(&self, document: &mut Document, chain: &mut Vec<String>, started: Instant) -> StencilResult<()> {
        while !document.is_flat() {
            self.check_timeout(started)?;

            let missing = document.unresolved_references().clone();
            tracing::debug!(template = document.name(), ?missing, "resolution pass");

            let mut externals = HashMap::with_capacity(missing.len());
            for dependency in &missing {
                let external = self.resolve(dependency, chain, started)?;
                externals.insert(dependency.clone(), external);
            }

            let before = document.nodes().to_vec();
            document.inline(&externals);
            if !document.is_flat() && document.nodes() == before.as_slice() {
                return Err(StencilError::UnresolvedAst {
                    name: document.name().to_string(),
                    missing: missing.into_iter().collect(),
                });
            }
        }
        Ok(())
    }

    fn check_timeout(&self, started: Instant) -> StencilResult<()> {
        let elapsed = started.elapsed();
        if elapsed > self.config.timeout {
            return Err(StencilError::Timeout {
                seconds: elapsed.as_secs_f64(),
            });
        }
        Ok(())
    }
}
