use anyhow::{bail, Context};

/// Minimum length (in bytes) of the session signing secret.
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub secret: String,
    /// Mark the session cookie `Secure` (production only).
    pub secure_cookie: bool,
}

/// Where the Postgres server lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbTarget {
    Url(String),
    Parts {
        host: String,
        port: u16,
        user: String,
        password: Option<String>,
        database: String,
    },
}

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub target: DbTarget,
    /// `PGSSLMODE=disable` was set explicitly.
    pub ssl_disabled: bool,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DbConfig,
    pub session: SessionConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let production = get("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let secret = get("AUTH_SECRET")
            .or_else(|| get("JWT_SECRET"))
            .context("AUTH_SECRET must be set")?;
        if secret.len() < MIN_SECRET_LEN {
            bail!("AUTH_SECRET must be at least {MIN_SECRET_LEN} bytes long");
        }

        let target = match get("DATABASE_URL")
            .or_else(|| get("NEON_POSTGRES_URL"))
            .or_else(|| get("POSTGRES_URL"))
        {
            Some(url) => DbTarget::Url(url),
            None => DbTarget::Parts {
                host: get("PGHOST")
                    .context("DATABASE_URL (or PGHOST/PGUSER/PGDATABASE) must be set")?,
                port: match get("PGPORT") {
                    Some(p) => p.parse().with_context(|| format!("invalid PGPORT {p:?}"))?,
                    None => 5432,
                },
                user: get("PGUSER").context("PGUSER must be set when DATABASE_URL is not")?,
                password: get("PGPASSWORD"),
                database: get("PGDATABASE")
                    .context("PGDATABASE must be set when DATABASE_URL is not")?,
            },
        };

        let ssl_disabled = get("PGSSLMODE")
            .map(|v| v.eq_ignore_ascii_case("disable"))
            .unwrap_or(false);

        let max_connections = get("DB_MAX_CONNECTIONS")
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);

        Ok(Self {
            database: DbConfig {
                target,
                ssl_disabled,
                max_connections,
            },
            session: SessionConfig {
                secret,
                secure_cookie: production,
            },
        })
    }
}
