//! Platform Dispatch - Typed Builder/Validator Registry
//!
//! Platforms are resolved through one registered map. Adding a platform
//! means registering a new builder/validator pair; callers never branch
//! on platform strings.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::builders::{GhostBuilder, WordpressBuilder};
use crate::spec::ThemeSpec;
use crate::validate::{resolve_validator, ThemeValidator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ghost,
    Wordpress,
}

impl Platform {
    pub const ALL: &'static [Platform] = &[Platform::Ghost, Platform::Wordpress];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ghost => "ghost",
            Self::Wordpress => "wordpress",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("Unsupported platform: {0}")]
pub struct UnsupportedPlatformError(pub String);

impl FromStr for Platform {
    type Err = UnsupportedPlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ghost" => Ok(Self::Ghost),
            "wordpress" => Ok(Self::Wordpress),
            other => Err(UnsupportedPlatformError(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Template rendering failed: {0}")]
    Render(String),

    #[error("Staging I/O failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GenerationError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Per-platform builder capability: render a validated spec into a staging
/// directory that satisfies the platform's required-file contract.
pub trait ThemeBuilder: Send + Sync {
    fn platform(&self) -> Platform;

    /// The platform's required-file contract, relative to the theme root.
    /// Shared with the fallback validator.
    fn required_files(&self) -> &'static [&'static str];

    fn generate(&self, spec: &ThemeSpec, staging: &Path) -> Result<(), GenerationError>;
}

pub struct PlatformEntry {
    pub builder: Box<dyn ThemeBuilder>,
    pub validator: Box<dyn ThemeValidator>,
}

/// Registry mapping platform identifiers to builder/validator pairs.
pub struct PlatformRegistry {
    entries: HashMap<Platform, PlatformEntry>,
}

impl PlatformRegistry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Registry with every built-in platform. Validators are chosen at
    /// resolution time: the external tool adapter when the tool is on
    /// PATH, the built-in structural checks otherwise.
    pub fn with_builtin_platforms() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(GhostBuilder), resolve_validator(Platform::Ghost));
        registry.register(
            Box::new(WordpressBuilder),
            resolve_validator(Platform::Wordpress),
        );
        registry
    }

    pub fn register(&mut self, builder: Box<dyn ThemeBuilder>, validator: Box<dyn ThemeValidator>) {
        self.entries
            .insert(builder.platform(), PlatformEntry { builder, validator });
    }

    pub fn resolve(&self, platform: Platform) -> Result<&PlatformEntry, UnsupportedPlatformError> {
        self.entries
            .get(&platform)
            .ok_or_else(|| UnsupportedPlatformError(platform.to_string()))
    }

    pub fn platforms(&self) -> Vec<Platform> {
        let mut list: Vec<_> = self.entries.keys().copied().collect();
        list.sort_by_key(|p| p.as_str());
        list
    }
}

impl Default for PlatformRegistry {
    fn default() -> Self {
        Self::with_builtin_platforms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_round_trip() {
        for p in Platform::ALL {
            assert_eq!(Platform::from_str(p.as_str()).unwrap(), *p);
        }
    }

    #[test]
    fn test_unknown_platform_rejected() {
        let err = Platform::from_str("drupal").unwrap_err();
        assert!(err.to_string().contains("drupal"));
    }

    #[test]
    fn test_registry_resolves_builtins() {
        let registry = PlatformRegistry::with_builtin_platforms();
        assert!(registry.resolve(Platform::Ghost).is_ok());
        assert!(registry.resolve(Platform::Wordpress).is_ok());
        assert_eq!(registry.platforms().len(), 2);
    }

    #[test]
    fn test_empty_registry_reports_unregistered() {
        let registry = PlatformRegistry::new();
        assert!(registry.resolve(Platform::Ghost).is_err());
    }
}
