//! Packages, the storage collaborator, and load bookkeeping.

use std::collections::{HashMap, HashSet};

use crate::engine::error::StyleError;
use crate::style::{Declaration, StyleFile};

/// A named bundle of declarations plus the packages it depends on.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PackageBundle {
    pub name: String,
    pub version: Option<String>,
    /// Loaded, in order, before this bundle's own declarations.
    pub uses: Vec<String>,
    pub declarations: Vec<Declaration>,
}

impl PackageBundle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the version (builder).
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Add a dependency (builder).
    pub fn with_use(mut self, package: impl Into<String>) -> Self {
        self.uses.push(package.into());
        self
    }

    /// Append a declaration (builder).
    pub fn with_declaration(mut self, declaration: Declaration) -> Self {
        self.declarations.push(declaration);
        self
    }

    /// Build a bundle from a parsed style file.
    ///
    /// `use-package` records are hoisted into [`uses`](Self::uses) so that
    /// dependencies always load before any of the file's own definitions.
    pub fn from_style_file(name: impl Into<String>, file: &StyleFile) -> Result<Self, StyleError> {
        let mut bundle = PackageBundle::new(name);
        bundle.version = file.title_version();
        for decl in file.declarations()? {
            match decl {
                Declaration::UsePackage(dep) => bundle.uses.push(dep),
                other => bundle.declarations.push(other),
            }
        }
        Ok(bundle)
    }
}

/// Opaque handle to an image asset resolved by the storage collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageHandle {
    pub path: String,
}

/// Storage and lookup of packages and image assets.
///
/// Implemented by the host; file access and packaging live behind this trait.
pub trait PackageStore {
    /// Resolve a package by name, or fail with [`StyleError::PackageNotFound`].
    fn resolve_package(&self, name: &str) -> Result<PackageBundle, StyleError>;

    /// Resolve an image path, or fail with [`StyleError::AssetNotFound`].
    fn resolve_image_asset(&self, path: &str) -> Result<ImageHandle, StyleError>;
}

/// An in-memory [`PackageStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    packages: HashMap<String, PackageBundle>,
    assets: HashSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a bundle under its own name, replacing any previous one.
    pub fn insert(&mut self, bundle: PackageBundle) {
        self.packages.insert(bundle.name.clone(), bundle);
    }

    /// Parse style-file markup and register it as package `name`.
    pub fn insert_source(&mut self, name: &str, source: &str) -> Result<(), StyleError> {
        let file = StyleFile::parse(source)?;
        self.insert(PackageBundle::from_style_file(name, &file)?);
        Ok(())
    }

    /// Register a bundle (builder).
    pub fn with_package(mut self, bundle: PackageBundle) -> Self {
        self.insert(bundle);
        self
    }

    /// Register an image path as available.
    pub fn insert_asset(&mut self, path: impl Into<String>) {
        self.assets.insert(path.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }
}

impl PackageStore for MemoryStore {
    fn resolve_package(&self, name: &str) -> Result<PackageBundle, StyleError> {
        self.packages
            .get(name)
            .cloned()
            .ok_or_else(|| StyleError::PackageNotFound(name.to_string()))
    }

    fn resolve_image_asset(&self, path: &str) -> Result<ImageHandle, StyleError> {
        if self.assets.contains(path) {
            Ok(ImageHandle {
                path: path.to_string(),
            })
        } else {
            Err(StyleError::AssetNotFound(path.to_string()))
        }
    }
}

/// Tracks which packages a session has merged and which are mid-load.
#[derive(Debug, Clone, Default)]
pub struct PackageLoader {
    /// Names in the order they finished loading.
    loaded: Vec<String>,
    loaded_set: HashSet<String>,
    /// Packages currently being loaded, outermost first.
    loading: Vec<String>,
}

impl PackageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded_set.contains(name)
    }

    /// Mark `name` as being loaded.
    ///
    /// Fails with [`StyleError::CyclicDependency`] if it is already on the
    /// loading stack.
    pub fn begin(&mut self, name: &str) -> Result<(), StyleError> {
        if self.loading.iter().any(|n| n == name) {
            let mut chain = self.loading.clone();
            chain.push(name.to_string());
            return Err(StyleError::CyclicDependency {
                name: name.to_string(),
                chain,
            });
        }
        self.loading.push(name.to_string());
        Ok(())
    }

    /// Pop `name` off the loading stack, recording it as loaded on success.
    pub fn finish(&mut self, name: &str, success: bool) {
        if let Some(pos) = self.loading.iter().rposition(|n| n == name) {
            self.loading.truncate(pos);
        }
        if success && self.loaded_set.insert(name.to_string()) {
            self.loaded.push(name.to_string());
        }
    }

    /// Loaded package names, in load order.
    pub fn loaded(&self) -> &[String] {
        &self.loaded
    }
}
