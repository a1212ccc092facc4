use std::env;

/// Default lifetime of an issued bearer token (one day).
const DEFAULT_JWT_TTL_SECS: i64 = 60 * 60 * 24;
/// Default cap on a single uploaded file (25 MiB).
const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// AppConfig
///
/// Holds the application's entire configuration state. Loaded once at startup,
/// immutable afterwards, and pulled into handlers via `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Postgres connection string. `None` selects the in-memory repository (local only).
    pub db_url: Option<String>,
    // S3-compatible storage endpoint URL (MinIO in local).
    pub s3_endpoint: String,
    pub s3_region: String,
    pub s3_key: String,
    pub s3_secret: String,
    // The bucket every uploaded resource file is written to.
    pub s3_bucket: String,
    // Runtime environment marker. Controls the `x-user-id` development bypass.
    pub env: Env,
    // HS256 secret used to sign and validate bearer tokens.
    pub jwt_secret: String,
    pub jwt_ttl_secs: i64,
    pub bind_addr: String,
    // Uploads larger than this are rejected as a validation error.
    pub max_upload_bytes: usize,
}

/// Env
///
/// Runtime context: local development (MinIO, optional in-memory store, header
/// bypass) or production (all secrets mandatory).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Safe, non-panicking configuration used for test setup.
    fn default() -> Self {
        Self {
            db_url: None,
            s3_endpoint: "http://localhost:9000".to_string(),
            s3_region: "us-east-1".to_string(),
            s3_key: "admin".to_string(),
            s3_secret: "password".to_string(),
            s3_bucket: "resources-test".to_string(),
            env: Env::Local,
            jwt_secret: "local-development-jwt-secret".to_string(),
            jwt_ttl_secs: DEFAULT_JWT_TTL_SECS,
            bind_addr: "0.0.0.0:3000".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

fn parsed_or<T: std::str::FromStr>(key: &str, fallback: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            panic!("FATAL: {key} must be a valid number, got {raw:?}")
        }),
        Err(_) => fallback,
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables.
    ///
    /// # Panics
    /// Panics if a variable required for the current environment is missing or
    /// malformed, so the process never starts half-configured.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let defaults = Self::default();
        let jwt_ttl_secs = parsed_or("JWT_TTL_SECS", DEFAULT_JWT_TTL_SECS);
        if jwt_ttl_secs <= 0 {
            panic!("FATAL: JWT_TTL_SECS must be positive, got {jwt_ttl_secs}");
        }
        let max_upload_bytes = parsed_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES);
        let bind_addr = env::var("BIND_ADDR").unwrap_or(defaults.bind_addr);

        match env {
            Env::Local => Self {
                env: Env::Local,
                db_url: env::var("DATABASE_URL").ok(),
                s3_endpoint: env::var("S3_ENDPOINT").unwrap_or(defaults.s3_endpoint),
                s3_region: env::var("S3_REGION").unwrap_or(defaults.s3_region),
                s3_key: env::var("S3_ACCESS_KEY").unwrap_or(defaults.s3_key),
                s3_secret: env::var("S3_SECRET_KEY").unwrap_or(defaults.s3_secret),
                s3_bucket: env::var("S3_BUCKET_NAME").unwrap_or_else(|_| "resource-uploads".to_string()),
                jwt_secret: env::var("JWT_SECRET").unwrap_or(defaults.jwt_secret),
                jwt_ttl_secs,
                bind_addr,
                max_upload_bytes,
            },
            Env::Production => Self {
                env: Env::Production,
                db_url: Some(
                    env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in prod"),
                ),
                s3_endpoint: env::var("S3_ENDPOINT").expect("FATAL: S3_ENDPOINT required in prod"),
                s3_region: env::var("S3_REGION").unwrap_or(defaults.s3_region),
                s3_key: env::var("S3_ACCESS_KEY").expect("FATAL: S3_ACCESS_KEY required in prod"),
                s3_secret: env::var("S3_SECRET_KEY")
                    .expect("FATAL: S3_SECRET_KEY required in prod"),
                s3_bucket: env::var("S3_BUCKET_NAME")
                    .unwrap_or_else(|_| "resource-uploads".to_string()),
                jwt_secret: env::var("JWT_SECRET").expect("FATAL: JWT_SECRET must be set in production."),
                jwt_ttl_secs,
                bind_addr,
                max_upload_bytes,
            },
        }
    }
}
