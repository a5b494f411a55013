/// Engine and server configuration

/// Page size used when a request does not name one
pub const DEFAULT_LIMIT: usize = 50;
/// Hard ceiling on the page size
pub const MAX_LIMIT: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            default_limit: DEFAULT_LIMIT,
            max_limit: MAX_LIMIT,
        }
    }
}

impl EngineConfig {
    /// Resolve a requested page size. Out-of-range values are clamped to
    /// `[1, max_limit]`, never rejected.
    pub fn clamp_limit(&self, requested: Option<usize>) -> usize {
        let max = self.max_limit.max(1);
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, max)
    }

    /// Read overrides from `LIVEGRID_DEFAULT_LIMIT` and `LIVEGRID_MAX_LIMIT`
    pub fn from_env() -> Result<Self, String> {
        let defaults = EngineConfig::default();
        let max_limit = env_usize("LIVEGRID_MAX_LIMIT")?.unwrap_or(defaults.max_limit);
        let default_limit = env_usize("LIVEGRID_DEFAULT_LIMIT")?.unwrap_or(defaults.default_limit);
        if max_limit == 0 {
            return Err("LIVEGRID_MAX_LIMIT must be at least 1".to_string());
        }
        Ok(EngineConfig {
            default_limit: default_limit.clamp(1, max_limit),
            max_limit,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub engine: EngineConfig,
}

impl ServerConfig {
    /// Read `HOST`, `PORT` and the engine overrides from the environment
    pub fn from_env() -> Result<Self, String> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|_| format!("PORT must be a number, got '{}'", raw))?,
            Err(_) => 8080,
        };
        Ok(ServerConfig {
            host,
            port,
            engine: EngineConfig::from_env()?,
        })
    }
}

fn env_usize(name: &str) -> Result<Option<usize>, String> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|_| format!("{} must be a positive integer, got '{}'", name, raw)),
        Err(_) => Ok(None),
    }
}
