//! Runtime configuration for docsi components.
//!
//! `Config` is an explicit value handed to every component at
//! construction time. There are no ambient singletons; the only
//! process-wide state in the crate is the event channel owned by the
//! job manager.

mod builder;
mod getters;
mod types;

pub use builder::ConfigBuilder;
pub use types::Config;
