//! Client-side modules a mirrored page may load.

use std::collections::HashSet;

/// Style module that mirrored pages always load.
pub const MIRROR_STYLE_MODULE: &str = "ext.SharedHelpPages";

/// Which resource modules exist on this site.
///
/// The authority's render lists modules registered there; a mirror loads
/// only the ones it also has.
pub trait ModuleRegistry: Send + Sync {
    fn is_registered(&self, module: &str) -> bool;
}

/// Registry backed by a fixed set of module names.
#[derive(Debug, Clone, Default)]
pub struct StaticModuleRegistry {
    modules: HashSet<String>,
}

impl StaticModuleRegistry {
    pub fn new<I, S>(modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            modules: modules.into_iter().map(Into::into).collect(),
        }
    }
}

impl ModuleRegistry for StaticModuleRegistry {
    fn is_registered(&self, module: &str) -> bool {
        self.modules.contains(module)
    }
}

/// Registry that accepts every module.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllModules;

impl ModuleRegistry for AllModules {
    fn is_registered(&self, _module: &str) -> bool {
        true
    }
}
