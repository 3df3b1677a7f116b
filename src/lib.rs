//! evodex - PokeAPI evolution charts with regional form handling
//!
//! The library resolves an evolution chain, describes each transition and
//! builds display rows; the binary draws them in the terminal.
//!
//! Every module is public so the integration tests can reach it. `testing`
//! is the in-memory upstream those tests run against; the binary never uses
//! it.

pub mod api;
pub mod config;
pub mod error;
pub mod evolution;
pub mod records;
pub mod render;
pub mod resolver;
pub mod testing;

pub use config::Config;
pub use error::{EvolutionError, OverrideError};
pub use evolution::{DisplayRow, EvolutionChart, OverrideTable};
pub use resolver::Resolver;
