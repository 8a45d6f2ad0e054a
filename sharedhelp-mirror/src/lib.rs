//! SharedHelp Mirror - Serving Help Pages From the Authority
//!
//! The read side of mirroring. A site asks [`MirrorService`] for a help
//! page it does not have; the service checks [`DisplayPolicy`], looks up the
//! authority's revision marker through [`FreshnessOracle`], and reads the
//! render through [`ContentCache`], which fetches on a miss and remembers
//! failures briefly.

pub mod content;
pub mod display;
pub mod freshness;
pub mod modules;
pub mod purge;
pub mod service;
pub mod source;

#[cfg(test)]
mod testing;

pub use content::ContentCache;
pub use display::DisplayPolicy;
pub use freshness::FreshnessOracle;
pub use modules::{AllModules, ModuleRegistry, StaticModuleRegistry, MIRROR_STYLE_MODULE};
pub use purge::PurgeAction;
pub use service::{MirrorService, MirroredPage};
pub use source::RenderSource;
