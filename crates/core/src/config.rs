// Configuration for the store, dispatcher and workers.
//
// File: `~/.inkwell/config.toml`. Every section is optional; missing keys
// fall back to defaults. `INKWELL_DATABASE_URL` and `INKWELL_LOG_FILTER`
// override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use inkwell_common::task::PoolKind;
use serde::{Deserialize, Serialize};

pub const DATABASE_URL_ENV: &str = "INKWELL_DATABASE_URL";
pub const LOG_FILTER_ENV: &str = "INKWELL_LOG_FILTER";

const DEFAULT_IO_CONCURRENCY: usize = 5;
const RUN_TASK_ARG: &str = "run-task";

/// Root directory for Inkwell state: `~/.inkwell/`.
pub fn global_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".inkwell"))
}

/// `~/.inkwell/config.toml`.
pub fn global_config_path() -> Option<PathBuf> {
    global_dir().map(|d| d.join("config.toml"))
}

/// `~/.inkwell/inkwell.db`.
pub fn default_database_path() -> Option<PathBuf> {
    global_dir().map(|d| d.join("inkwell.db"))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InkwellConfig {
    /// `tracing` filter directive, e.g. `info` or `inkwell_core=debug`.
    pub log_filter: String,
    pub database: DatabaseConfig,
    pub dispatch: DispatcherConfig,
    pub workers: WorkerConfig,
}

impl Default for InkwellConfig {
    fn default() -> Self {
        Self {
            log_filter: "info".into(),
            database: DatabaseConfig::default(),
            dispatch: DispatcherConfig::default(),
            workers: WorkerConfig::default(),
        }
    }
}

impl InkwellConfig {
    /// Load `~/.inkwell/config.toml` (defaults if absent) and apply
    /// environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let from_file = match global_config_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        from_file.with_env_overrides()
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        toml::from_str(&contents)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_env_fn(|key| std::env::var(key))
    }

    /// Testable form of [`Self::with_env_overrides`].
    fn with_env_fn<F>(mut self, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        if let Ok(url) = env(DATABASE_URL_ENV) {
            self.database.path = Some(database_path_from_url(&url)?);
        }
        if let Ok(filter) = env(LOG_FILTER_ENV) {
            self.log_filter = filter;
        }
        Ok(self)
    }

    /// Configured database file, or `~/.inkwell/inkwell.db`.
    pub fn database_path(&self) -> Option<PathBuf> {
        match &self.database.path {
            Some(path) => Some(expand_home(path)),
            None => default_database_path(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DispatcherConfig {
    pub io: PoolConfig,
    pub compute: PoolConfig,
}

impl DispatcherConfig {
    pub fn pool(&self, kind: PoolKind) -> &PoolConfig {
        match kind {
            PoolKind::Io => &self.io,
            PoolKind::Compute => &self.compute,
        }
    }

    /// Make default `run-task` children load `config_path` instead of
    /// `~/.inkwell/config.toml`. Pools with explicit `worker_args` are left
    /// alone.
    pub fn with_worker_config_path(mut self, config_path: &Path) -> Self {
        for pool in [&mut self.io, &mut self.compute] {
            if pool.worker_args.is_empty() {
                pool.worker_args = vec![
                    "--config".to_owned(),
                    config_path.to_string_lossy().into_owned(),
                    RUN_TASK_ARG.to_owned(),
                ];
            }
        }
        self
    }
}

/// Settings of one pool. Unset fields resolve per pool kind: the I/O pool
/// runs 5 tasks on threads, the compute pool runs one per available core in
/// child processes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PoolConfig {
    pub concurrency: Option<usize>,
    pub isolation: Option<Isolation>,
    pub queue: QueuePolicy,
    /// Program launched per task under process isolation. Defaults to the
    /// running executable.
    pub worker_program: Option<PathBuf>,
    /// Arguments for `worker_program`. Defaults to `["run-task"]`.
    pub worker_args: Vec<String>,
}

impl PoolConfig {
    pub fn concurrency_for(&self, kind: PoolKind) -> usize {
        match (self.concurrency, kind) {
            (Some(bound), _) if bound > 0 => bound,
            (_, PoolKind::Io) => DEFAULT_IO_CONCURRENCY,
            (_, PoolKind::Compute) => available_parallelism(),
        }
    }

    pub fn isolation_for(&self, kind: PoolKind) -> Isolation {
        self.isolation.unwrap_or(match kind {
            PoolKind::Io => Isolation::Threads,
            PoolKind::Compute => Isolation::Process,
        })
    }

    pub fn worker_args(&self) -> Vec<String> {
        if self.worker_args.is_empty() {
            vec![RUN_TASK_ARG.to_owned()]
        } else {
            self.worker_args.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Isolation {
    /// Blocking worker threads of the shared runtime.
    Threads,
    /// One child process per task; nothing is shared with the caller.
    Process,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum QueuePolicy {
    #[default]
    Unbounded,
    /// At most `capacity` tasks may wait for a slot.
    Bounded { capacity: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WorkerConfig {
    pub notify_delay_ms: u64,
    pub compute_iterations: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { notify_delay_ms: 3_000, compute_iterations: 50_000_000 }
    }
}

impl WorkerConfig {
    pub fn notify_delay(&self) -> Duration {
        Duration::from_millis(self.notify_delay_ms)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config I/O error at `{}`: {source}", path.display())]
    Io { path: PathBuf, source: std::io::Error },
    #[error("config parse error in `{}`: {source}", path.display())]
    Parse { path: PathBuf, source: toml::de::Error },
    #[error("unsupported database url `{0}`: expected a file path or sqlite:// url")]
    UnsupportedDatabaseUrl(String),
    #[error("PostgreSQL is not supported (`{0}`): inkwell only stores documents in SQLite")]
    PostgresUnsupported(String),
}

/// Accepts a plain path, `sqlite:///relative.db`, `sqlite:////abs/path.db`
/// or `sqlite://file.db`.
pub fn database_path_from_url(url: &str) -> Result<PathBuf, ConfigError> {
    let url = url.trim();
    let path = if let Some(rest) = url.strip_prefix("sqlite:///") {
        rest
    } else if let Some(rest) = url.strip_prefix("sqlite://") {
        rest
    } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        return Err(ConfigError::PostgresUnsupported(url.to_owned()));
    } else if url.contains("://") {
        return Err(ConfigError::UnsupportedDatabaseUrl(url.to_owned()));
    } else {
        url
    };

    if path.is_empty() {
        return Err(ConfigError::UnsupportedDatabaseUrl(url.to_owned()));
    }
    Ok(PathBuf::from(path))
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir().map(|home| home.join(rest)).unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}

fn available_parallelism() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tempfile::TempDir;

    use super::*;

    fn env_from_map(
        map: HashMap<&'static str, &'static str>,
    ) -> impl Fn(&str) -> Result<String, std::env::VarError> {
        move |key: &str| map.get(key).map(|v| v.to_string()).ok_or(std::env::VarError::NotPresent)
    }

    #[test]
    fn defaults_match_documented_values() {
        let cfg = InkwellConfig::default();
        assert_eq!(cfg.log_filter, "info");
        assert!(cfg.database.path.is_none());
        assert_eq!(cfg.dispatch.io.concurrency_for(PoolKind::Io), 5);
        assert_eq!(cfg.dispatch.io.isolation_for(PoolKind::Io), Isolation::Threads);
        assert_eq!(cfg.dispatch.compute.isolation_for(PoolKind::Compute), Isolation::Process);
        assert!(cfg.dispatch.compute.concurrency_for(PoolKind::Compute) >= 1);
        assert_eq!(cfg.dispatch.io.queue, QueuePolicy::Unbounded);
        assert_eq!(cfg.workers.notify_delay(), Duration::from_secs(3));
        assert_eq!(cfg.workers.compute_iterations, 50_000_000);
        assert_eq!(cfg.dispatch.compute.worker_args(), vec!["run-task"]);
    }

    #[test]
    fn zero_concurrency_falls_back_to_pool_default() {
        let pool = PoolConfig { concurrency: Some(0), ..PoolConfig::default() };
        assert_eq!(pool.concurrency_for(PoolKind::Io), 5);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let cfg: InkwellConfig = toml::from_str(
            r#"
            [dispatch.compute]
            concurrency = 2
            queue = { policy = "bounded", capacity = 64 }

            [workers]
            notify_delay_ms = 10
            "#,
        )
        .expect("config should parse");

        assert_eq!(cfg.log_filter, "info");
        assert_eq!(cfg.dispatch.compute.concurrency_for(PoolKind::Compute), 2);
        assert_eq!(cfg.dispatch.compute.isolation_for(PoolKind::Compute), Isolation::Process);
        assert_eq!(cfg.dispatch.compute.queue, QueuePolicy::Bounded { capacity: 64 });
        assert_eq!(cfg.dispatch.io, PoolConfig::default());
        assert_eq!(cfg.workers.notify_delay_ms, 10);
        assert_eq!(cfg.workers.compute_iterations, 50_000_000);
    }

    #[test]
    fn full_file_parses() {
        let cfg: InkwellConfig = toml::from_str(
            r#"
            log_filter = "debug"

            [database]
            path = "/var/lib/inkwell/inkwell.db"

            [dispatch.io]
            concurrency = 3
            isolation = "process"
            worker_program = "/usr/local/bin/inkwell"
            worker_args = ["run-task", "--quiet"]
            "#,
        )
        .expect("config should parse");

        assert_eq!(cfg.log_filter, "debug");
        assert_eq!(cfg.database_path(), Some(PathBuf::from("/var/lib/inkwell/inkwell.db")));
        assert_eq!(cfg.dispatch.io.isolation_for(PoolKind::Io), Isolation::Process);
        assert_eq!(cfg.dispatch.io.worker_args(), vec!["run-task", "--quiet"]);
    }

    #[test]
    fn unknown_isolation_is_a_parse_error() {
        let error = toml::from_str::<InkwellConfig>("[dispatch.io]\nisolation = \"fibers\"\n");
        assert!(error.is_err());
    }

    #[test]
    fn load_from_reports_path_on_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "log_filter = [").unwrap();

        let error = InkwellConfig::load_from(&path).unwrap_err();
        assert!(matches!(error, ConfigError::Parse { .. }));
        assert!(error.to_string().contains("config.toml"));
    }

    #[test]
    fn load_from_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let error = InkwellConfig::load_from(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(error, ConfigError::Io { .. }));
    }

    #[test]
    fn env_overrides_database_and_filter() {
        let mut env = HashMap::new();
        env.insert(DATABASE_URL_ENV, "sqlite:///local.db");
        env.insert(LOG_FILTER_ENV, "inkwell_core=debug");

        let cfg = InkwellConfig::default().with_env_fn(env_from_map(env)).unwrap();
        assert_eq!(cfg.database.path, Some(PathBuf::from("local.db")));
        assert_eq!(cfg.log_filter, "inkwell_core=debug");
    }

    #[test]
    fn env_with_foreign_scheme_is_rejected() {
        let mut env = HashMap::new();
        env.insert(DATABASE_URL_ENV, "mysql://localhost/inkwell");

        let error = InkwellConfig::default().with_env_fn(env_from_map(env)).unwrap_err();
        assert!(matches!(error, ConfigError::UnsupportedDatabaseUrl(_)));
    }

    #[test]
    fn postgres_urls_name_the_missing_backend() {
        for url in ["postgres://localhost/inkwell", "postgresql://u:p@db/inkwell"] {
            let error = database_path_from_url(url).unwrap_err();
            assert!(matches!(error, ConfigError::PostgresUnsupported(_)), "{url}");
            assert!(error.to_string().contains("PostgreSQL is not supported"), "{url}");
        }
    }

    #[test]
    fn worker_config_path_fills_default_args_only() {
        let mut dispatch = DispatcherConfig::default();
        dispatch.io.worker_args = vec!["run-task".into(), "--quiet".into()];

        let dispatch = dispatch.with_worker_config_path(Path::new("/etc/inkwell.toml"));
        assert_eq!(
            dispatch.compute.worker_args(),
            vec!["--config", "/etc/inkwell.toml", "run-task"]
        );
        assert_eq!(dispatch.io.worker_args(), vec!["run-task", "--quiet"]);
    }

    #[test]
    fn database_urls_resolve_to_paths() {
        assert_eq!(database_path_from_url("sqlite:///local.db").unwrap(), PathBuf::from("local.db"));
        assert_eq!(
            database_path_from_url("sqlite:////srv/inkwell.db").unwrap(),
            PathBuf::from("/srv/inkwell.db")
        );
        assert_eq!(database_path_from_url("sqlite://data.db").unwrap(), PathBuf::from("data.db"));
        assert_eq!(database_path_from_url("./plain.db").unwrap(), PathBuf::from("./plain.db"));
        assert!(database_path_from_url("sqlite://").is_err());
    }
}
