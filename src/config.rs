use clap::{Args, Parser, ValueEnum};

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    #[command(flatten)]
    pub server: ServerConfig,

    #[command(flatten)]
    pub database: DatabaseConfig,

    #[command(flatten)]
    pub storage: StorageConfig,

    #[command(flatten)]
    pub cache: CacheConfig,

    #[command(flatten)]
    pub health: HealthConfig,

    #[command(flatten)]
    pub telemetry: TelemetryConfig,
}

impl Config {
    #[must_use]
    pub fn load() -> Self {
        Self::parse()
    }
}

#[derive(Clone, Debug, Args)]
pub struct ServerConfig {
    /// Host to listen on
    #[arg(long = "host", env = "TAVERN_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port for the public API
    #[arg(long = "port", env = "TAVERN_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Port for the management server (liveness and readiness probes)
    #[arg(long = "mgmt-port", env = "TAVERN_MGMT_PORT", default_value_t = 9090)]
    pub mgmt_port: u16,

    /// How long to wait for in-flight work after a shutdown signal
    #[arg(long = "shutdown-timeout-secs", env = "TAVERN_SHUTDOWN_TIMEOUT_SECS", default_value_t = 5)]
    pub shutdown_timeout_secs: u64,
}

#[derive(Clone, Debug, Args)]
pub struct DatabaseConfig {
    /// Database connection URL
    #[arg(id = "database_url", long = "database-url", env = "TAVERN_DATABASE_URL")]
    pub url: String,

    /// Maximum number of pooled connections
    #[arg(long = "db-max-connections", env = "TAVERN_DB_MAX_CONNECTIONS", default_value_t = 10)]
    pub max_connections: u32,

    /// Minimum number of idle connections kept open
    #[arg(long = "db-min-connections", env = "TAVERN_DB_MIN_CONNECTIONS", default_value_t = 1)]
    pub min_connections: u32,

    /// How long to wait when acquiring a connection from the pool
    #[arg(long = "db-acquire-timeout-secs", env = "TAVERN_DB_ACQUIRE_TIMEOUT_SECS", default_value_t = 3)]
    pub acquire_timeout_secs: u64,

    /// Number of connection attempts at startup before giving up
    #[arg(long = "db-connect-attempts", env = "TAVERN_DB_CONNECT_ATTEMPTS", default_value_t = 5)]
    pub connect_attempts: usize,
}

#[derive(Clone, Debug, Args)]
pub struct StorageConfig {
    /// S3 bucket to probe; the storage probe is disabled when unset
    #[arg(long = "storage-bucket", env = "TAVERN_STORAGE_BUCKET")]
    pub bucket: Option<String>,

    /// S3 region
    #[arg(long = "storage-region", env = "TAVERN_STORAGE_REGION", default_value = "us-east-1")]
    pub region: String,

    /// Custom S3 endpoint (useful for MinIO)
    #[arg(long = "storage-endpoint", env = "TAVERN_STORAGE_ENDPOINT")]
    pub endpoint: Option<String>,

    /// S3 access key
    #[arg(long = "storage-access-key", env = "TAVERN_STORAGE_ACCESS_KEY")]
    pub access_key: Option<String>,

    /// S3 secret key
    #[arg(long = "storage-secret-key", env = "TAVERN_STORAGE_SECRET_KEY")]
    pub secret_key: Option<String>,

    /// Force path style (required for many MinIO setups: http://host/bucket/key)
    #[arg(long = "storage-force-path-style", env = "TAVERN_STORAGE_FORCE_PATH_STYLE", default_value_t = false)]
    pub force_path_style: bool,
}

#[derive(Clone, Debug, Args)]
pub struct CacheConfig {
    /// Redis URL to probe; the cache probe is disabled when unset
    #[arg(id = "cache_url", long = "cache-url", env = "TAVERN_CACHE_URL")]
    pub url: Option<String>,
}

/// How the public health endpoint maps an unhealthy report onto HTTP.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum UnhealthyResponsePolicy {
    /// Always answer 200; callers inspect the `status` field.
    #[default]
    AlwaysOk,
    /// Answer 503 when the report is unhealthy.
    ServiceUnavailable,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ProbeMode {
    #[default]
    Concurrent,
    Sequential,
}

#[derive(Clone, Debug, Args)]
pub struct HealthConfig {
    /// Timeout for the database sentinel lookup
    #[arg(long = "health-db-timeout-ms", env = "TAVERN_HEALTH_DB_TIMEOUT_MS", default_value_t = 2000)]
    pub db_timeout_ms: u64,

    /// Timeout for the storage bucket check
    #[arg(long = "health-storage-timeout-ms", env = "TAVERN_HEALTH_STORAGE_TIMEOUT_MS", default_value_t = 2000)]
    pub storage_timeout_ms: u64,

    /// Timeout for the cache PING
    #[arg(long = "health-cache-timeout-ms", env = "TAVERN_HEALTH_CACHE_TIMEOUT_MS", default_value_t = 1000)]
    pub cache_timeout_ms: u64,

    /// Hard limit the aggregator applies to every probe, including extra ones
    #[arg(long = "health-probe-deadline-ms", env = "TAVERN_HEALTH_PROBE_DEADLINE_MS", default_value_t = 5000)]
    pub probe_deadline_ms: u64,

    /// Identifier of the seeded sentinel row
    #[arg(long = "health-sentinel-id", env = "TAVERN_HEALTH_SENTINEL_ID", default_value = "healthcheck-seed")]
    pub sentinel_id: String,

    /// Whether a storage failure makes the service unhealthy
    #[arg(
        long = "health-storage-critical",
        env = "TAVERN_HEALTH_STORAGE_CRITICAL",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub storage_critical: bool,

    /// Whether a cache failure makes the service unhealthy
    #[arg(
        long = "health-cache-critical",
        env = "TAVERN_HEALTH_CACHE_CRITICAL",
        default_value_t = false,
        action = clap::ArgAction::Set
    )]
    pub cache_critical: bool,

    /// Run probes concurrently or one after another
    #[arg(long = "health-probe-mode", env = "TAVERN_HEALTH_PROBE_MODE", value_enum, default_value_t = ProbeMode::Concurrent)]
    pub probe_mode: ProbeMode,

    /// HTTP status policy for unhealthy reports on /api/health
    #[arg(
        long = "health-unhealthy-response",
        env = "TAVERN_HEALTH_UNHEALTHY_RESPONSE",
        value_enum,
        default_value_t = UnhealthyResponsePolicy::AlwaysOk
    )]
    pub unhealthy_response: UnhealthyResponsePolicy,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, Args)]
pub struct TelemetryConfig {
    /// OTLP collector endpoint; export is disabled when unset
    #[arg(long = "otlp-endpoint", env = "TAVERN_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    /// Log output format
    #[arg(long = "log-format", env = "TAVERN_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// How often metrics are pushed to the collector
    #[arg(long = "metrics-export-interval-secs", env = "TAVERN_METRICS_EXPORT_INTERVAL_SECS", default_value_t = 60)]
    pub metrics_export_interval_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_minimal_args() {
        let config = Config::try_parse_from(["tavern-server", "--database-url", "postgres://localhost/tavern"])
            .expect("minimal args should parse");

        assert_eq!(config.database.url, "postgres://localhost/tavern");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.health.sentinel_id, "healthcheck-seed");
        assert_eq!(config.health.probe_deadline_ms, 5000);
        assert_eq!(config.health.probe_mode, ProbeMode::Concurrent);
        assert_eq!(config.health.unhealthy_response, UnhealthyResponsePolicy::AlwaysOk);
        assert!(config.health.storage_critical);
        assert!(!config.health.cache_critical);
        assert!(config.storage.bucket.is_none());
        assert!(config.cache.url.is_none());
    }

    #[test]
    fn test_policy_and_criticality_overrides() {
        let config = Config::try_parse_from([
            "tavern-server",
            "--database-url",
            "postgres://localhost/tavern",
            "--health-unhealthy-response",
            "service-unavailable",
            "--health-storage-critical",
            "false",
            "--health-probe-mode",
            "sequential",
        ])
        .expect("overrides should parse");

        assert_eq!(config.health.unhealthy_response, UnhealthyResponsePolicy::ServiceUnavailable);
        assert!(!config.health.storage_critical);
        assert_eq!(config.health.probe_mode, ProbeMode::Sequential);
    }

    #[test]
    fn test_database_url_is_required() {
        assert!(Config::try_parse_from(["tavern-server"]).is_err());
    }
}
