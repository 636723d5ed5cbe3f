//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (INI, sections proxy/redis/common/log/debug)
//!     → source.rs ("section::key" lookups with typed defaults)
//!     → loader.rs (populate ProxyConfig, defaults for missing keys)
//!     → validation.rs (required fields, clamps)
//!     → ProxyConfig (validated, immutable)
//!     → shared via Arc with the rest of the proxy
//! ```
//!
//! # Design Decisions
//! - Config is immutable once applied; changes require a restart
//! - Every field has a default so a minimal file only names the proxy
//! - Out-of-range values are corrected and warned about, not rejected

pub mod loader;
pub mod schema;
pub mod source;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{DebugSettings, LogSettings, ProxyConfig, ProxySettings, RedisSettings, TimeoutSettings};
pub use source::{IniSource, KeyValueSource, MemorySource};
pub use validation::{Adjustment, ValidationError};
