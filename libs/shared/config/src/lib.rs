use std::env;
use std::str::FromStr;
use tracing::warn;

/// Where the rotation cursor is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorBackend {
    Supabase,
    Redis,
    Memory,
}

impl FromStr for CursorBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "supabase" => Ok(CursorBackend::Supabase),
            "redis" => Ok(CursorBackend::Redis),
            "memory" => Ok(CursorBackend::Memory),
            other => Err(format!("Unknown cursor backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    /// Key the rotation cursor writes with; the `rotations` table is closed to anon.
    pub supabase_service_role_key: Option<String>,
    pub redis_url: Option<String>,
    pub cursor_backend: CursorBackend,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            supabase_service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY").ok(),
            redis_url: env::var("REDIS_URL").ok(),
            cursor_backend: env::var("ROTATION_CURSOR_BACKEND")
                .ok()
                .and_then(|raw| {
                    raw.parse::<CursorBackend>()
                        .map_err(|e| warn!("{}, falling back to supabase", e))
                        .ok()
                })
                .unwrap_or(CursorBackend::Supabase),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        if config.cursor_backend == CursorBackend::Supabase
            && config.supabase_service_role_key.is_none()
        {
            warn!("SUPABASE_SERVICE_ROLE_KEY not set, rotation cursor requests will use the anon key");
        }

        if config.cursor_backend == CursorBackend::Redis && config.redis_url.is_none() {
            warn!("ROTATION_CURSOR_BACKEND=redis but REDIS_URL not set, using localhost");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }
}
