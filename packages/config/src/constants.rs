// ABOUTME: Environment variable name constants
// ABOUTME: Centralized definitions of all environment variable names used across Warden

// Sandbox Image & Naming
pub const SANDBOX_IMAGE: &str = "SANDBOX_IMAGE";
pub const SANDBOX_NAME_PREFIX: &str = "SANDBOX_NAME_PREFIX";

// Sandbox Lifetime
pub const SANDBOX_TTL_MINUTES: &str = "SANDBOX_TTL_MINUTES";

// Sandbox Networking
pub const SANDBOX_NETWORK: &str = "SANDBOX_NETWORK";
pub const SANDBOX_HTTP_PROXY: &str = "SANDBOX_HTTP_PROXY";
pub const SANDBOX_HTTPS_PROXY: &str = "SANDBOX_HTTPS_PROXY";
pub const SANDBOX_NO_PROXY: &str = "SANDBOX_NO_PROXY";

// Sandbox Browser
pub const SANDBOX_CHROME_ARGS: &str = "SANDBOX_CHROME_ARGS";
