//! Router configuration.
//!
//! ```ignore
//! let config = RouterConfig::from_toml_str(r#"
//!     default_outlet = "content"
//!     application_route = "app"
//! "#)?;
//! ```

use serde::Deserialize;

use crate::error::ConfigError;
use crate::types::{APPLICATION_ROUTE, DEFAULT_OUTLET};

/// Names the router falls back to when a route or outlet leaves them out.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouterConfig {
    /// Outlet used when neither the render call nor the outlet names one.
    pub default_outlet: String,
    /// Root route whose attributes are shared with every component.
    pub application_route: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            default_outlet: DEFAULT_OUTLET.to_string(),
            application_route: APPLICATION_ROUTE.to_string(),
        }
    }
}

impl RouterConfig {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: RouterConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_outlet.is_empty() {
            return Err(ConfigError::Empty { field: "default_outlet" });
        }
        if self.application_route.is_empty() {
            return Err(ConfigError::Empty { field: "application_route" });
        }
        Ok(())
    }
}
