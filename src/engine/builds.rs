//! Engine build table.
//!
//! A build names a flavor of the linked engine. The only capability that
//! matters for startup is whether the build is meant to run with a cipher
//! layer over its storage drivers.

/// One engine build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineBuild {
    pub name: String,
    /// Storage drivers are wrapped in the cipher layer.
    pub cipher: bool,
}

impl EngineBuild {
    pub fn new(name: impl Into<String>, cipher: bool) -> Self {
        Self {
            name: name.into(),
            cipher,
        }
    }
}

/// Ordered table of known builds. The first build is the default.
#[derive(Debug, Clone)]
pub struct BuildRegistry {
    builds: Vec<EngineBuild>,
}

impl BuildRegistry {
    /// Create a registry from builds in priority order.
    pub fn new(builds: Vec<EngineBuild>) -> Self {
        Self { builds }
    }

    /// Look up a build, falling back to the default when `name` is `None`.
    pub fn resolve(&self, name: Option<&str>) -> Option<&EngineBuild> {
        match name {
            Some(name) => self.builds.iter().find(|b| b.name == name),
            None => self.builds.first(),
        }
    }

    /// Names of all builds, default first.
    pub fn names(&self) -> Vec<String> {
        self.builds.iter().map(|b| b.name.clone()).collect()
    }
}

impl Default for BuildRegistry {
    fn default() -> Self {
        Self::new(vec![
            EngineBuild::new("default", false),
            EngineBuild::new("cipher", true),
        ])
    }
}
