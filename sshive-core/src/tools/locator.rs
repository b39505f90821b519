//! Executable lookup with a process-lifetime cache.

use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// Resolves executable names to absolute paths
pub trait ToolLocator: Send + Sync {
    /// Returns the path of `name` if it is installed
    fn locate(&self, name: &str) -> Option<PathBuf>;

    /// Returns true if a fixed install location exists
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    /// Returns the first installed tool among `names`, in order
    fn locate_any(&self, names: &[&str]) -> Option<(String, PathBuf)> {
        names
            .iter()
            .find_map(|name| self.locate(name).map(|path| ((*name).to_string(), path)))
    }
}

/// Locator backed by the `which` crate
///
/// Every answer, including "not found", is cached for the lifetime of the
/// locator. Installing a tool while the process runs is not noticed.
#[derive(Debug, Default)]
pub struct SystemToolLocator {
    search_path: Option<OsString>,
    cache: RwLock<HashMap<String, Option<PathBuf>>>,
}

impl SystemToolLocator {
    /// Creates a locator searching the process `PATH`
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a locator searching an explicit path list instead of `PATH`
    #[must_use]
    pub fn with_search_path(search_path: impl Into<OsString>) -> Self {
        Self {
            search_path: Some(search_path.into()),
            cache: RwLock::default(),
        }
    }

    /// Returns the process-wide locator
    #[must_use]
    pub fn shared() -> Arc<Self> {
        static SHARED: OnceLock<Arc<SystemToolLocator>> = OnceLock::new();
        Arc::clone(SHARED.get_or_init(|| Arc::new(Self::new())))
    }

    fn lookup(&self, name: &str) -> Option<PathBuf> {
        let found = match &self.search_path {
            Some(paths) => {
                let cwd = std::env::current_dir().unwrap_or_default();
                which::which_in(name, Some(paths), cwd)
            }
            None => which::which(name),
        };
        found.ok()
    }
}

impl ToolLocator for SystemToolLocator {
    fn locate(&self, name: &str) -> Option<PathBuf> {
        if let Some(cached) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return cached.clone();
        }

        let found = self.lookup(name);
        tracing::debug!(tool = name, path = ?found, "Tool lookup");

        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name.to_string())
            .or_insert(found)
            .clone()
    }
}

/// Fixed tool inventory, e.g. a portable install with known locations
///
/// Only the registered executables and install locations are reported as
/// present.
#[derive(Debug, Clone, Default)]
pub struct ToolSet {
    tools: HashMap<String, PathBuf>,
    locations: HashSet<PathBuf>,
}

impl ToolSet {
    /// Creates an empty inventory
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an executable
    pub fn with_tool(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.tools.insert(name.into(), path.into());
        self
    }

    /// Registers an executable under `/usr/bin/<name>`
    pub fn with_tools(mut self, names: &[&str]) -> Self {
        for name in names {
            self.tools
                .insert((*name).to_string(), Path::new("/usr/bin").join(name));
        }
        self
    }

    /// Registers a fixed install location (e.g. an application bundle)
    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.locations.insert(path.into());
        self
    }
}

impl ToolLocator for ToolSet {
    fn locate(&self, name: &str) -> Option<PathBuf> {
        self.tools.get(name).cloned()
    }

    fn exists(&self, path: &Path) -> bool {
        self.locations.contains(path)
    }
}
