use anyhow::Context;
use rollcall_store::seed::DEFAULT_SEED;
use rollcall_store::{IdentityStore, MemoryBackend, SeedPolicy, SqliteBackend, StoreError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where identities and attendance are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Sqlite,
    Memory,
}

impl Backend {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "sqlite" => Some(Self::Sqlite),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

/// Daemon configuration: optional TOML file, then `ROLLCALL_*` environment overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub backend: Backend,
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// Simulated feature extraction latency.
    pub capture_delay_ms: u64,
    /// Simulated matching latency.
    pub match_delay_ms: u64,
    /// Probability that the simulated extractor finds a face.
    pub detection_rate: f64,
    pub seed_policy: SeedPolicy,
    /// Location stamped on attendance recorded by the daemon.
    pub location: String,
}

/// Shape of the optional TOML config file. Every key may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    backend: Option<Backend>,
    db_path: Option<PathBuf>,
    capture_delay_ms: Option<u64>,
    match_delay_ms: Option<u64>,
    detection_rate: Option<f64>,
    seed_policy: Option<String>,
    seed: Option<u64>,
    location: Option<String>,
}

impl Config {
    /// Load from the file named by `ROLLCALL_CONFIG` (if any) and the environment.
    pub fn load() -> anyhow::Result<Self> {
        let file = match std::env::var("ROLLCALL_CONFIG") {
            Ok(path) => read_file(Path::new(&path))?,
            Err(_) => FileConfig::default(),
        };
        Ok(Self::resolve(file, |key| std::env::var(key).ok()))
    }

    fn resolve(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        let db_path = env("ROLLCALL_DB_PATH")
            .map(PathBuf::from)
            .or(file.db_path)
            .unwrap_or_else(|| default_data_dir(&env).join("rollcall.db"));

        let seed = parsed(&env, "ROLLCALL_SEED").or(file.seed).unwrap_or(DEFAULT_SEED);
        let seed_policy = match env("ROLLCALL_SEED_POLICY").or(file.seed_policy).as_deref() {
            Some("random") | Some("randomized") => SeedPolicy::Randomized,
            _ => SeedPolicy::Deterministic { seed },
        };

        Self {
            backend: env("ROLLCALL_BACKEND")
                .and_then(|v| Backend::parse(&v))
                .or(file.backend)
                .unwrap_or(Backend::Sqlite),
            db_path,
            capture_delay_ms: parsed(&env, "ROLLCALL_CAPTURE_DELAY_MS")
                .or(file.capture_delay_ms)
                .unwrap_or(2000),
            match_delay_ms: parsed(&env, "ROLLCALL_MATCH_DELAY_MS")
                .or(file.match_delay_ms)
                .unwrap_or(1000),
            detection_rate: parsed(&env, "ROLLCALL_DETECTION_RATE")
                .or(file.detection_rate)
                .unwrap_or(0.9f64)
                .clamp(0.0, 1.0),
            seed_policy,
            location: env("ROLLCALL_LOCATION")
                .or(file.location)
                .unwrap_or_else(|| "Main Office".to_string()),
        }
    }

    pub fn capture_delay(&self) -> Duration {
        Duration::from_millis(self.capture_delay_ms)
    }

    pub fn match_delay(&self) -> Duration {
        Duration::from_millis(self.match_delay_ms)
    }

    /// Open the configured backend and wrap it in an identity store.
    pub fn open_store(&self) -> Result<IdentityStore, StoreError> {
        Ok(match self.backend {
            Backend::Sqlite => {
                IdentityStore::new(SqliteBackend::open(&self.db_path)?, self.seed_policy)
            }
            Backend::Memory => IdentityStore::new(MemoryBackend::new(), self.seed_policy),
        })
    }
}

fn read_file(path: &Path) -> anyhow::Result<FileConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    let file = toml::from_str(&contents)
        .with_context(|| format!("parsing config file {}", path.display()))?;
    tracing::info!(path = %path.display(), "loaded config file");
    Ok(file)
}

fn default_data_dir(env: &impl Fn(&str) -> Option<String>) -> PathBuf {
    env("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let home = env("HOME").unwrap_or_else(|| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("rollcall")
}

fn parsed<T: std::str::FromStr>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    env(key).and_then(|v| v.parse().ok())
}
