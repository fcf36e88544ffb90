/// Configuration management for the document registry
use crate::error::{RegistryError, RegistryResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub resolver: ResolverConfig,
    pub jobs: JobsConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    /// Public base URL used in QR codes (e.g. https://docs.example.com)
    pub public_url: Option<String>,
    pub max_upload_bytes: usize,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    /// Directory holding `{hash}.pdf`, `{hash}.json` and `{alias}.txt`
    pub uploads_directory: PathBuf,
    /// JSON object file mapping aliases to canonical hashes
    pub mapping_file: PathBuf,
}

/// Identity resolution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Write discovered aliases back to the mapping table and proxy records
    pub self_heal: bool,
}

/// Background job and repair configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    /// Rebuild the mapping table from proxies and metadata at startup
    pub repair_on_start: bool,
    /// Rename legacy `0x`/upper-case store keys to canonical form at startup
    pub canonicalize_on_start: bool,
    /// Seconds between periodic mapping rebuilds (0 disables)
    pub repair_interval_secs: u64,
}

/// Filter used when `RUST_LOG` is unset or unparseable
pub const DEFAULT_LOG_FILTER: &str = "doc_registry=debug,tower_http=debug";

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, e.g. `info` or `doc_registry=debug`
    pub level: String,
    /// Emit JSON log lines instead of the human-readable format
    pub json: bool,
}

impl LoggingConfig {
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> RegistryResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("REGISTRY_HOSTNAME").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("REGISTRY_PORT")
            .unwrap_or_else(|_| "3002".to_string())
            .parse()
            .map_err(|_| RegistryError::Validation("Invalid port number".to_string()))?;
        let public_url = env::var("REGISTRY_PUBLIC_URL").ok();
        let max_upload_bytes = env::var("REGISTRY_MAX_UPLOAD_BYTES")
            .unwrap_or_else(|_| "20971520".to_string())
            .parse()
            .unwrap_or(20 * 1024 * 1024);

        let data_directory: PathBuf = env::var("REGISTRY_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let uploads_directory = env::var("REGISTRY_UPLOADS_DIRECTORY")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("uploads"));
        let mapping_file = env::var("REGISTRY_MAPPING_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("hash-mapping.json"));

        let self_heal = parse_bool("REGISTRY_SELF_HEAL", true);
        let repair_on_start = parse_bool("REGISTRY_REPAIR_ON_START", true);
        let canonicalize_on_start = parse_bool("REGISTRY_CANONICALIZE_ON_START", false);
        let repair_interval_secs = env::var("REGISTRY_REPAIR_INTERVAL_SECS")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .unwrap_or(3600);

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());
        let log_json = env::var("REGISTRY_LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                public_url,
                max_upload_bytes,
            },
            storage: StorageConfig {
                data_directory,
                uploads_directory,
                mapping_file,
            },
            resolver: ResolverConfig { self_heal },
            jobs: JobsConfig {
                repair_on_start,
                canonicalize_on_start,
                repair_interval_secs,
            },
            logging: LoggingConfig {
                level: log_level,
                json: log_json,
            },
        })
    }

    /// Configuration rooted in a single directory, used by tests and tooling
    pub fn for_data_directory(data_directory: impl Into<PathBuf>) -> Self {
        let data_directory = data_directory.into();
        ServerConfig {
            service: ServiceConfig {
                hostname: "127.0.0.1".to_string(),
                port: 3002,
                public_url: None,
                max_upload_bytes: 20 * 1024 * 1024,
            },
            storage: StorageConfig {
                uploads_directory: data_directory.join("uploads"),
                mapping_file: data_directory.join("hash-mapping.json"),
                data_directory,
            },
            resolver: ResolverConfig { self_heal: true },
            jobs: JobsConfig {
                repair_on_start: false,
                canonicalize_on_start: false,
                repair_interval_secs: 0,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json: false,
            },
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> RegistryResult<()> {
        if self.service.hostname.is_empty() {
            return Err(RegistryError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.service.max_upload_bytes == 0 {
            return Err(RegistryError::Validation(
                "Upload limit must be greater than zero".to_string(),
            ));
        }

        if self.storage.mapping_file.starts_with(&self.storage.uploads_directory) {
            // Metadata scans treat every *.json in the uploads directory as a record
            return Err(RegistryError::Validation(
                "Mapping file must live outside the uploads directory".to_string(),
            ));
        }

        Ok(())
    }

    /// Base URL used when building absolute links
    pub fn base_url(&self) -> String {
        self.service
            .public_url
            .clone()
            .unwrap_or_else(|| format!("http://{}:{}", self.service.hostname, self.service.port))
    }
}

fn parse_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
