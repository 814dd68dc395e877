//! Typed service settings for Meridian.
//!
//! This crate provides:
//! - [`ServiceSettings`] - a service's identity, logging, HTTP defaults and
//!   the base URLs of the services it calls
//! - [`ConfigLoader`] - layered loading (defaults → file → env)
//! - [`ServiceUrlResolver`] - memoized service name to base URL lookup
//!
//! # Example
//!
//! ```no_run
//! use meridian_config::{ConfigLoader, ServiceUrlResolver};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = ConfigLoader::new()
//!     .with_dotenv()?
//!     .with_optional_file("orders.toml")?
//!     .with_base_url_env()
//!     .with_env_prefix("MERIDIAN")
//!     .load()?;
//!
//! let resolver = ServiceUrlResolver::new(settings);
//! let census = resolver.get_base_url("census")?;
//! # Ok(())
//! # }
//! ```
//!
//! # Environment Variable Overrides
//!
//! - `MERIDIAN__SERVICE_NAME=orders`
//! - `MERIDIAN__ENVIRONMENT=production`
//! - `MERIDIAN__LOGGING__LEVEL=debug`
//! - `MERIDIAN__HTTP__TIMEOUT_SECS=2.5`
//! - `MERIDIAN__SERVICES__CENSUS=http://census:8001`
//! - `CENSUS_BASE_URL=http://census:8001` (with [`ConfigLoader::with_base_url_env`])

#![warn(missing_docs)]

mod error;
mod loader;
mod resolver;
mod settings;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use resolver::ServiceUrlResolver;
pub use settings::{Environment, HttpSettings, LoggingSettings, ServiceSettings};
