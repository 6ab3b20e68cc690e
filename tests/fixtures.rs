#![allow(dead_code, reason = "Not every test binary uses every fixture.")]

use std::collections::HashMap;

use rand::Rng;
use stencil::{
    MemorySource, ParameterDeclaration, Renderer, RendererConfig, StencilError, StencilResult,
    Syntax,
};

/// A parser that looks templates up by name in a prepared table instead of
/// reading their bytes.
#[derive(Debug, Clone, Default)]
pub struct TableParser {
    nodes: HashMap<String, Vec<Syntax>>,
}

impl TableParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<N: Into<String>>(mut self, name: N, nodes: Vec<Syntax>) -> Self {
        self.nodes.insert(name.into(), nodes);
        self
    }

    /// A source holding a placeholder body for every template in the table.
    pub fn source(&self) -> MemorySource {
        self.nodes.keys().map(|name| (name.clone(), name.clone())).collect()
    }
}

impl stencil::Parse for TableParser {
    fn parse(&self, name: &str, _raw: &[u8]) -> StencilResult<Vec<Syntax>> {
        self.nodes
            .get(name)
            .cloned()
            .ok_or_else(|| StencilError::NoTemplateExists {
                template_name: name.to_string(),
            })
    }
}

pub fn get_renderer(parser: TableParser) -> Renderer<MemorySource, TableParser> {
    get_renderer_with(RendererConfig::default(), parser)
}

pub fn get_renderer_with(
    config: RendererConfig,
    parser: TableParser,
) -> Renderer<MemorySource, TableParser> {
    let source = parser.source();
    Renderer::new(config, source, parser).unwrap()
}

/// A parser for tiny one-line templates: `@base` on its own line extends
/// `base`, `#key` marks an import and `$path` a variable. Everything else is
/// raw text.
pub fn line_parser(_name: &str, raw: &[u8]) -> StencilResult<Vec<Syntax>> {
    let text = std::str::from_utf8(raw).map_err(|err| StencilError::Unknown {
        message: err.to_string(),
    })?;
    Ok(text
        .lines()
        .map(|line| {
            if let Some(base) = line.strip_prefix('@') {
                Syntax::extend(base)
            } else if let Some(key) = line.strip_prefix('#') {
                Syntax::import(key)
            } else if let Some(path) = line.strip_prefix('$') {
                Syntax::variable(path)
            } else {
                Syntax::raw(line)
            }
        })
        .collect())
}

pub fn variable(path: &str) -> ParameterDeclaration {
    ParameterDeclaration::variable(path)
}

/// Installs a test subscriber so resolution logs show up with
/// `--nocapture`. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

pub fn random_names(count: usize) -> Vec<String> {
    let mut rng = rand::rng();
    (0..count)
        .map(|i| format!("template_{i}_{}", rng.random_range(0..1_000_000)))
        .collect()
}
