use std::collections::BTreeMap;

use crate::parameter::{ParameterDeclaration, TagCall};

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum Syntax {
    /// Literal output bytes; nothing left to evaluate.
    Raw(Vec<u8>),
    /// A variable reference.
    Variable(Variable),
    /// A custom tag call, optionally with a body.
    Custom(TagCall),
    /// An if / else-if / else chain.
    Conditional(Conditional),
    /// A for loop.
    Loop(Loop),
    /// A placeholder filled in by an export of an extending template.
    Import(Import),
    /// A reference to another template, to be inlined in place.
    Extend(Extend),
    /// A named body handed to the template being extended.
    Export(Export),
}

impl Syntax {
    pub fn raw<T: Into<Vec<u8>>>(bytes: T) -> Self {
        Self::Raw(bytes.into())
    }

    pub fn variable(path: &str) -> Self {
        Self::Variable(Variable::new(path))
    }

    pub fn extend<K: Into<String>>(key: K) -> Self {
        Self::Extend(Extend::new(key))
    }

    pub fn import<K: Into<String>>(key: K) -> Self {
        Self::Import(Import { key: key.into() })
    }

    /// Mutable access to every nested node list this node owns.
    pub(crate) fn bodies_mut(&mut self) -> Vec<&mut Vec<Self>> {
        match self {
            Self::Custom(tag) => tag.body.iter_mut().collect(),
            Self::Conditional(conditional) => conditional
                .clauses
                .iter_mut()
                .map(|clause| &mut clause.body)
                .collect(),
            Self::Loop(l) => vec![&mut l.body],
            Self::Extend(extend) => extend
                .exports
                .values_mut()
                .map(|export| &mut export.body)
                .collect(),
            Self::Export(export) => vec![&mut export.body],
            Self::Raw(_) | Self::Variable(_) | Self::Import(_) => Vec::new(),
        }
    }

    pub(crate) fn bodies(&self) -> Vec<&Vec<Self>> {
        match self {
            Self::Custom(tag) => tag.body.iter().collect(),
            Self::Conditional(conditional) => conditional
                .clauses
                .iter()
                .map(|clause| &clause.body)
                .collect(),
            Self::Loop(l) => vec![&l.body],
            Self::Extend(extend) => extend.exports.values().map(|export| &export.body).collect(),
            Self::Export(export) => vec![&export.body],
            Self::Raw(_) | Self::Variable(_) | Self::Import(_) => Vec::new(),
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variable {
    pub path: Vec<String>,
}

impl Variable {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.split('.').map(str::to_owned).collect(),
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    /// `None` for a trailing else.
    pub condition: Option<ParameterDeclaration>,
    pub body: Vec<Syntax>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
    pub clauses: Vec<Clause>,
}

impl Conditional {
    pub fn new(condition: ParameterDeclaration, body: Vec<Syntax>) -> Self {
        Self {
            clauses: vec![Clause {
                condition: Some(condition),
                body,
            }],
        }
    }

    #[must_use]
    pub fn else_if(mut self, condition: ParameterDeclaration, body: Vec<Syntax>) -> Self {
        self.clauses.push(Clause {
            condition: Some(condition),
            body,
        });
        self
    }

    #[must_use]
    pub fn otherwise(mut self, body: Vec<Syntax>) -> Self {
        self.clauses.push(Clause {
            condition: None,
            body,
        });
        self
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Loop {
    /// Name each element is bound to inside the body.
    pub item: String,
    pub array: ParameterDeclaration,
    pub body: Vec<Syntax>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Import {
    pub key: String,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Export {
    pub key: String,
    pub body: Vec<Syntax>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Extend {
    /// Name of the extended template.
    pub key: String,
    pub exports: BTreeMap<String, Export>,
}

impl Extend {
    pub fn new<K: Into<String>>(key: K) -> Self {
        Self {
            key: key.into(),
            exports: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn export<K: Into<String>>(mut self, key: K, body: Vec<Syntax>) -> Self {
        let key = key.into();
        self.exports.insert(key.clone(), Export { key, body });
        self
    }

    /// Splices this extend's exports into `base`, the node list of the
    /// extended template.
    ///
    /// Every import whose key matches an export is replaced by that export's
    /// body; imports without a matching export are kept so a later extend can
    /// still fill them.
    pub fn extend(&self, base: &[Syntax]) -> Vec<Syntax> {
        let mut nodes = Vec::with_capacity(base.len());
        for node in base {
            match node {
                Syntax::Import(import) => match self.exports.get(&import.key) {
                    Some(export) => nodes.extend(export.body.iter().cloned()),
                    None => nodes.push(node.clone()),
                },
                Syntax::Raw(_) | Syntax::Variable(_) => nodes.push(node.clone()),
                Syntax::Custom(_)
                | Syntax::Conditional(_)
                | Syntax::Loop(_)
                | Syntax::Extend(_)
                | Syntax::Export(_) => {
                    let mut node = node.clone();
                    for body in node.bodies_mut() {
                        *body = self.extend(body);
                    }
                    nodes.push(node);
                }
            }
        }
        nodes
    }
}
