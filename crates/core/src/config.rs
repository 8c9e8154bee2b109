//! ComfyUI connection configuration.
//!
//! Credentials are injected configuration, not process-wide state: the
//! host resolves them (from its credential store, environment, etc.)
//! and hands a [`ComfyUiConfig`] to the client.

/// Connection settings for a single ComfyUI server.
#[derive(Debug, Clone)]
pub struct ComfyUiConfig {
    /// Base HTTP URL, e.g. `http://host:8188` (no trailing slash).
    pub base_url: String,
    /// Optional API key, sent as a bearer token on every request.
    pub api_key: Option<String>,
    /// Client-level deadline applied to each HTTP call, in seconds.
    pub request_timeout_secs: u64,
}

/// Default per-call HTTP deadline. Status polls and uploads finish well
/// under this; it exists so a hung connection cannot stall a run.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

impl ComfyUiConfig {
    /// Create a config for the given server, normalizing any trailing
    /// slash on the base URL.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            api_key,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }

    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default                  |
    /// |--------------------------------|--------------------------|
    /// | `COMFYUI_BASE_URL`             | `http://127.0.0.1:8188`  |
    /// | `COMFYUI_API_KEY`              | unset (no auth header)   |
    /// | `COMFYUI_REQUEST_TIMEOUT_SECS` | `120`                    |
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("COMFYUI_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:8188".into());

        let api_key = std::env::var("COMFYUI_API_KEY")
            .ok()
            .filter(|k| !k.is_empty());

        let request_timeout_secs: u64 = std::env::var("COMFYUI_REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_REQUEST_TIMEOUT_SECS.to_string())
            .parse()
            .expect("COMFYUI_REQUEST_TIMEOUT_SECS must be a valid u64");

        let mut config = Self::new(base_url, api_key);
        config.request_timeout_secs = request_timeout_secs;
        config
    }
}
