// ABOUTME: Immutable sandbox configuration snapshot built from environment variables
// ABOUTME: Read once at startup and threaded explicitly into provisioning code

pub mod constants;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default image a sandbox container is created from.
pub const DEFAULT_IMAGE: &str = "warden/sandbox:latest";

/// Default prefix for generated container names.
pub const DEFAULT_NAME_PREFIX: &str = "sandbox";

/// Default time-to-live in minutes, enforced inside the container.
pub const DEFAULT_TTL_MINUTES: u32 = 30;

/// Configuration captured once at sandbox-provisioning time.
///
/// The snapshot is immutable for the life of a sandbox. Nothing below the
/// provisioning layer reads ambient environment state; components receive
/// this value explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Container image reference
    pub image: String,
    /// Prefix combined with a random suffix to form the container name
    pub name_prefix: String,
    /// Minutes after which the container self-terminates
    pub ttl_minutes: u32,
    /// Docker network the container joins, if any
    pub network: Option<String>,
    /// Extra launch flags for the in-sandbox Chrome process
    pub chrome_args: String,
    /// Proxy settings injected into the container environment
    pub http_proxy: Option<String>,
    pub https_proxy: Option<String>,
    pub no_proxy: Option<String>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            image: DEFAULT_IMAGE.to_string(),
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
            ttl_minutes: DEFAULT_TTL_MINUTES,
            network: None,
            chrome_args: String::new(),
            http_proxy: None,
            https_proxy: None,
            no_proxy: None,
        }
    }
}

impl SandboxConfig {
    /// Build a configuration snapshot from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration snapshot from an arbitrary variable source.
    ///
    /// `from_env` delegates here; tests supply a map instead of mutating
    /// process-global environment state.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let ttl_minutes = match lookup(constants::SANDBOX_TTL_MINUTES) {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!(
                    "Invalid {} value '{}', using default {}",
                    constants::SANDBOX_TTL_MINUTES,
                    raw,
                    DEFAULT_TTL_MINUTES
                );
                DEFAULT_TTL_MINUTES
            }),
            None => DEFAULT_TTL_MINUTES,
        };

        Self {
            image: lookup(constants::SANDBOX_IMAGE).unwrap_or(defaults.image),
            name_prefix: lookup(constants::SANDBOX_NAME_PREFIX).unwrap_or(defaults.name_prefix),
            ttl_minutes,
            network: lookup(constants::SANDBOX_NETWORK).filter(|v| !v.is_empty()),
            chrome_args: lookup(constants::SANDBOX_CHROME_ARGS).unwrap_or_default(),
            http_proxy: lookup(constants::SANDBOX_HTTP_PROXY).filter(|v| !v.is_empty()),
            https_proxy: lookup(constants::SANDBOX_HTTPS_PROXY).filter(|v| !v.is_empty()),
            no_proxy: lookup(constants::SANDBOX_NO_PROXY).filter(|v| !v.is_empty()),
        }
    }

    /// True when any proxy variable is configured.
    pub fn proxy_configured(&self) -> bool {
        self.http_proxy.is_some() || self.https_proxy.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup_from<'a>(map: &'a HashMap<&'a str, &'a str>) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| map.get(name).map(|v| v.to_string())
    }

    #[test]
    fn test_defaults_when_environment_empty() {
        let config = SandboxConfig::from_lookup(|_| None);
        assert_eq!(config, SandboxConfig::default());
        assert!(!config.proxy_configured());
    }

    #[test]
    fn test_full_environment() {
        let map = HashMap::from([
            (constants::SANDBOX_IMAGE, "warden/sandbox:dev"),
            (constants::SANDBOX_NAME_PREFIX, "dev"),
            (constants::SANDBOX_TTL_MINUTES, "45"),
            (constants::SANDBOX_NETWORK, "warden-net"),
            (constants::SANDBOX_CHROME_ARGS, "--disable-gpu"),
            (constants::SANDBOX_HTTP_PROXY, "http://proxy:3128"),
            (constants::SANDBOX_HTTPS_PROXY, "http://proxy:3128"),
            (constants::SANDBOX_NO_PROXY, "localhost,10.0.0.0/8"),
        ]);

        let config = SandboxConfig::from_lookup(lookup_from(&map));

        assert_eq!(config.image, "warden/sandbox:dev");
        assert_eq!(config.name_prefix, "dev");
        assert_eq!(config.ttl_minutes, 45);
        assert_eq!(config.network.as_deref(), Some("warden-net"));
        assert_eq!(config.chrome_args, "--disable-gpu");
        assert!(config.proxy_configured());
        assert_eq!(config.no_proxy.as_deref(), Some("localhost,10.0.0.0/8"));
    }

    #[test]
    fn test_invalid_ttl_falls_back_to_default() {
        let map = HashMap::from([(constants::SANDBOX_TTL_MINUTES, "soon")]);
        let config = SandboxConfig::from_lookup(lookup_from(&map));
        assert_eq!(config.ttl_minutes, DEFAULT_TTL_MINUTES);
    }

    #[test]
    fn test_empty_strings_treated_as_unset() {
        let map = HashMap::from([
            (constants::SANDBOX_NETWORK, ""),
            (constants::SANDBOX_HTTP_PROXY, ""),
        ]);
        let config = SandboxConfig::from_lookup(lookup_from(&map));
        assert_eq!(config.network, None);
        assert!(!config.proxy_configured());
    }
}
