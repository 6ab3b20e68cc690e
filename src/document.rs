//! Resolution of cross-template references.
//!
//! A [`Document`] wraps the node list of one template. Templates reference
//! each other through extend markers; resolving a document means splicing the
//! node lists of those templates in place until no marker is left, at which
//! point the document is *flat* and can be rendered.
//!
//! Resolution is incremental: a caller supplies whatever external documents
//! are available through [`Document::inline`] and inspects
//! [`Document::unresolved_references`] to decide what to fetch next. Cycle
//! detection and retry budgets are the caller's concern.

use std::{
    borrow::Borrow,
    collections::{BTreeSet, HashMap},
};

use crate::ast::Syntax;

/// Resolution state of a [`Document`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Flatness {
    /// No resolution attempt has run yet.
    #[default]
    Unknown,
    /// Extend markers remain. `pristine` is the node list as it was before the
    /// first resolution attempt.
    NotFlat { pristine: Vec<Syntax> },
    /// No extend markers remain; the document no longer changes.
    Flat,
}

/// A named template AST and its resolution state.
#[derive(Debug, Clone)]
pub struct Document {
    name: String,
    nodes: Vec<Syntax>,
    external_refs: BTreeSet<String>,
    unresolved_refs: BTreeSet<String>,
    flatness: Flatness,
}

impl Document {
    pub fn new<N: Into<String>>(name: N, nodes: Vec<Syntax>) -> Self {
        Self {
            name: name.into(),
            nodes,
            external_refs: BTreeSet::new(),
            unresolved_refs: BTreeSet::new(),
            flatness: Flatness::Unknown,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nodes(&self) -> &[Syntax] {
        &self.nodes
    }

    /// Every template this document has ever referenced, including names that
    /// have since been resolved.
    pub const fn external_references(&self) -> &BTreeSet<String> {
        &self.external_refs
    }

    /// Templates still referenced by the current node list.
    pub const fn unresolved_references(&self) -> &BTreeSet<String> {
        &self.unresolved_refs
    }

    pub const fn flatness(&self) -> &Flatness {
        &self.flatness
    }

    pub const fn is_flat(&self) -> bool {
        matches!(self.flatness, Flatness::Flat)
    }

    /// The node list as it was before the first resolution attempt, while the
    /// document is not flat.
    pub fn pristine(&self) -> Option<&[Syntax]> {
        match &self.flatness {
            Flatness::NotFlat { pristine } => Some(pristine),
            Flatness::Unknown | Flatness::Flat => None,
        }
    }

    /// Recomputes the unresolved reference set from the current node list and
    /// updates flatness accordingly.
    pub fn refresh(&mut self) {
        if self.is_flat() {
            return;
        }

        let mut wanted = BTreeSet::new();
        collect_extends(&self.nodes, &mut wanted);

        let flatness = std::mem::take(&mut self.flatness);
        self.flatness = if wanted.is_empty() {
            Flatness::Flat
        } else {
            match flatness {
                Flatness::Unknown => Flatness::NotFlat {
                    pristine: self.nodes.clone(),
                },
                not_flat @ Flatness::NotFlat { .. } => not_flat,
                Flatness::Flat => Flatness::Flat,
            }
        };

        self.external_refs.extend(wanted.iter().cloned());
        self.unresolved_refs = wanted;

        tracing::trace!(
            document = %self.name,
            flat = self.is_flat(),
            unresolved = ?self.unresolved_refs,
            "refreshed references"
        );
    }

    /// Inlines the supplied external documents in place of the extend markers
    /// referencing them, merges adjacent raw segments, then refreshes.
    ///
    /// Spliced content may itself contain extend markers, so a document can
    /// need several calls before it becomes flat. The supplied documents are
    /// spliced as they are, flat or not.
    pub fn inline<D: Borrow<Self>>(&mut self, externals: &HashMap<String, D>) {
        if externals.is_empty() || self.is_flat() {
            return;
        }
        if matches!(self.flatness, Flatness::Unknown) {
            self.refresh();
            if self.is_flat() {
                return;
            }
        }

        self.unresolved_refs.clear();
        let nodes = std::mem::take(&mut self.nodes);
        self.nodes = inline_nodes(nodes, externals, &mut self.unresolved_refs);
        coalesce(&mut self.nodes);

        tracing::trace!(
            document = %self.name,
            supplied = externals.len(),
            nodes = self.nodes.len(),
            "inlined externals"
        );

        self.refresh();
    }
}

fn collect_extends(nodes: &[Syntax], wanted: &mut BTreeSet<String>) {
    for node in nodes {
        if let Syntax::Extend(extend) = node {
            wanted.insert(extend.key.clone());
        }
        for body in node.bodies() {
            collect_extends(body, wanted);
        }
    }
}

fn inline_nodes<D: Borrow<Document>>(
    nodes: Vec<Syntax>,
    externals: &HashMap<String, D>,
    unresolved: &mut BTreeSet<String>,
) -> Vec<Syntax> {
    let mut output = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Syntax::Extend(extend) => match externals.get(&extend.key) {
                Some(external) => output.extend(extend.extend(external.borrow().nodes())),
                None => {
                    unresolved.insert(extend.key.clone());
                    let mut node = Syntax::Extend(extend);
                    inline_bodies(&mut node, externals, unresolved);
                    output.push(node);
                }
            },
            mut node @ (Syntax::Custom(_)
            | Syntax::Conditional(_)
            | Syntax::Loop(_)
            | Syntax::Export(_)) => {
                inline_bodies(&mut node, externals, unresolved);
                output.push(node);
            }
            node @ (Syntax::Raw(_) | Syntax::Variable(_) | Syntax::Import(_)) => {
                output.push(node);
            }
        }
    }
    output
}

fn inline_bodies<D: Borrow<Document>>(
    node: &mut Syntax,
    externals: &HashMap<String, D>,
    unresolved: &mut BTreeSet<String>,
) {
    for body in node.bodies_mut() {
        let nodes = std::mem::take(body);
        *body = inline_nodes(nodes, externals, unresolved);
    }
}

/// Merges every run of adjacent raw segments, at every nesting level, into a
/// single segment.
fn coalesce(nodes: &mut Vec<Syntax>) {
    let mut output: Vec<Syntax> = Vec::with_capacity(nodes.len());
    for mut node in std::mem::take(nodes) {
        for body in node.bodies_mut() {
            coalesce(body);
        }
        if let (Syntax::Raw(bytes), Some(Syntax::Raw(previous))) = (&node, output.last_mut()) {
            previous.extend_from_slice(bytes);
            continue;
        }
        output.push(node);
    }
    *nodes = output;
}
