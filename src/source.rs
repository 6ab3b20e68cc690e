//! Where raw template bytes come from.

use std::{
    collections::HashMap,
    io,
    path::{Component, Path, PathBuf},
};

use crate::error::{StencilError, StencilResult};

/// Supplies the raw bytes of a template by name.
pub trait Source: Send + Sync {
    /// Returns the raw template called `template`.
    ///
    /// `escape` allows a scoped source to read outside the directory it is
    /// confined to; sources without that concept ignore it.
    ///
    /// # Errors
    ///
    /// [`StencilError::NoTemplateExists`] when there is no such template, and
    /// [`StencilError::IllegalAccess`] when the source refuses to serve it.
    fn file(&self, template: &str, escape: bool) -> StencilResult<Vec<u8>>;
}

/// Templates held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    templates: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<N: Into<String>, B: Into<Vec<u8>>>(&mut self, name: N, bytes: B) -> &mut Self {
        self.templates.insert(name.into(), bytes.into());
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<u8>> {
        self.templates.remove(name)
    }
}

impl<N: Into<String>, B: Into<Vec<u8>>> FromIterator<(N, B)> for MemorySource {
    fn from_iter<I: IntoIterator<Item = (N, B)>>(iter: I) -> Self {
        Self {
            templates: iter
                .into_iter()
                .map(|(name, bytes)| (name.into(), bytes.into()))
                .collect(),
        }
    }
}

impl Source for MemorySource {
    fn file(&self, template: &str, _escape: bool) -> StencilResult<Vec<u8>> {
        self.templates
            .get(template)
            .cloned()
            .ok_or_else(|| StencilError::NoTemplateExists {
                template_name: template.to_string(),
            })
    }
}

/// Access restrictions enforced by [`FileSource`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Refuse paths outside the sandbox directory unless the caller escapes.
    pub to_sandbox: bool,
    /// Refuse any path component starting with a `.`.
    pub to_visible_files: bool,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            to_sandbox: true,
            to_visible_files: true,
        }
    }
}

/// Templates read from the filesystem.
///
/// Relative names resolve against the view directory, and names without an
/// extension get the configured one. Paths are normalized lexically before any
/// check, so `a/../b` is `b`; symlinks are not followed.
#[derive(Debug, Clone)]
pub struct FileSource {
    view_directory: PathBuf,
    sandbox_directory: PathBuf,
    extension: String,
    limits: Limits,
}

impl FileSource {
    pub const DEFAULT_EXTENSION: &'static str = "leaf";

    /// A source whose view directory is also its sandbox.
    pub fn new<P: AsRef<Path>>(view_directory: P) -> StencilResult<Self> {
        let view = view_directory.as_ref();
        Self::with_sandbox(view, view)
    }

    /// # Errors
    ///
    /// [`StencilError::Configuration`] when the view directory lies outside
    /// the sandbox directory.
    pub fn with_sandbox<V: AsRef<Path>, S: AsRef<Path>>(
        view_directory: V,
        sandbox_directory: S,
    ) -> StencilResult<Self> {
        let view_directory = normalize(view_directory.as_ref());
        let sandbox_directory = normalize(sandbox_directory.as_ref());
        if !view_directory.starts_with(&sandbox_directory) {
            return Err(StencilError::Configuration {
                message: format!(
                    "view directory {} must be inside sandbox directory {}",
                    view_directory.display(),
                    sandbox_directory.display()
                ),
            });
        }

        Ok(Self {
            view_directory,
            sandbox_directory,
            extension: Self::DEFAULT_EXTENSION.to_string(),
            limits: Limits::default(),
        })
    }

    /// Sets the extension appended to names that have none. An empty string
    /// disables it.
    #[must_use]
    pub fn with_extension<E: Into<String>>(mut self, extension: E) -> Self {
        self.extension = extension.into();
        self
    }

    #[must_use]
    pub const fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn view_directory(&self) -> &Path {
        &self.view_directory
    }

    pub fn sandbox_directory(&self) -> &Path {
        &self.sandbox_directory
    }

    /// The path `template` resolves to, after the access checks.
    pub fn resolve(&self, template: &str, escape: bool) -> StencilResult<PathBuf> {
        let requested = Path::new(template);
        if self.limits.to_visible_files && requested.components().any(is_hidden) {
            return Err(StencilError::IllegalAccess {
                message: format!("attempted to access hidden file `{template}`"),
            });
        }

        let mut path = normalize(&self.view_directory.join(requested));
        if path.extension().is_none() && !self.extension.is_empty() {
            path.set_extension(&self.extension);
        }

        if self.limits.to_sandbox && !escape && !path.starts_with(&self.sandbox_directory) {
            return Err(StencilError::IllegalAccess {
                message: format!(
                    "attempted to escape sandbox {} with `{template}`",
                    self.sandbox_directory.display()
                ),
            });
        }
        Ok(path)
    }
}

impl Source for FileSource {
    fn file(&self, template: &str, escape: bool) -> StencilResult<Vec<u8>> {
        let path = self.resolve(template, escape)?;
        tracing::debug!(template, path = %path.display(), "reading template");
        std::fs::read(&path).map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                StencilError::NoTemplateExists {
                    template_name: template.to_string(),
                }
            } else {
                StencilError::Unknown {
                    message: format!("unable to read {}: {err}", path.display()),
                }
            }
        })
    }
}

fn is_hidden(component: Component<'_>) -> bool {
    match component {
        Component::Normal(name) => name.to_string_lossy().starts_with('.'),
        Component::Prefix(_) | Component::RootDir | Component::CurDir | Component::ParentDir => {
            false
        }
    }
}

/// Resolves `.` and `..` without touching the filesystem. `..` at the root
/// stays at the root.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            Component::Prefix(_) | Component::RootDir | Component::Normal(_) => {
                normalized.push(component);
            }
        }
    }
    normalized
}
