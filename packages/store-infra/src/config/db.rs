use std::env::{self, VarError};
use std::fmt;
use std::fs::DirBuilder;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use url::Url;

use crate::error::DbInfraError;

pub const DATABASE_URL_VAR: &str = "DATABASE_URL";
pub const STORE_DIR_VAR: &str = "BRIDGE_STORE_DIR";
pub const PROBE_TIMEOUT_VAR: &str = "BRIDGE_PROBE_TIMEOUT_MS";

pub const DEFAULT_STORE_DIR: &str = "store";
pub const SQLITE_FILE_NAME: &str = "whatsmeow.db";
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

const ACCEPTED_SCHEMES: [&str; 2] = ["postgres", "postgresql"];
const REMOTE_MIGRATIONS: &str = "external:postgres (apply before start)";
const LOCAL_MIGRATIONS: &str = "embedded:store-migration";

/// Which of the two supported backends a config points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    /// Networked PostgreSQL reached through `DATABASE_URL`
    Remote,
    /// Embedded SQLite file under the store directory
    Local,
}

impl DriverKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DriverKind::Remote => "remote",
            DriverKind::Local => "local",
        }
    }

    pub fn driver_name(self) -> &'static str {
        match self {
            DriverKind::Remote => "postgres",
            DriverKind::Local => "sqlite",
        }
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One connection attempt. Immutable once built; a Local config is only ever
/// built from a filesystem path, so it never carries credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    driver_kind: DriverKind,
    connection_address: String,
    local_path: Option<PathBuf>,
    migrations_location: String,
}

impl DatabaseConfig {
    /// Validate and wrap a remote connection string.
    pub fn remote(address: &str) -> Result<Self, DbInfraError> {
        // url::ParseError never echoes the input, so the credential stays out of the message
        let parsed = Url::parse(address).map_err(|e| {
            DbInfraError::config(format!("{DATABASE_URL_VAR} is not a valid URL: {e}"))
        })?;

        if !ACCEPTED_SCHEMES.contains(&parsed.scheme()) {
            return Err(DbInfraError::config(format!(
                "{DATABASE_URL_VAR} scheme '{}' is not supported; expected postgres:// or postgresql://",
                parsed.scheme()
            )));
        }

        if parsed.host_str().map_or(true, str::is_empty) {
            return Err(DbInfraError::config(format!(
                "{DATABASE_URL_VAR} does not name a host"
            )));
        }

        Ok(Self {
            driver_kind: DriverKind::Remote,
            connection_address: address.to_string(),
            local_path: None,
            migrations_location: REMOTE_MIGRATIONS.to_string(),
        })
    }

    pub fn local(path: &Path) -> Self {
        Self {
            driver_kind: DriverKind::Local,
            connection_address: path.display().to_string(),
            local_path: Some(path.to_path_buf()),
            migrations_location: LOCAL_MIGRATIONS.to_string(),
        }
    }

    pub fn driver_kind(&self) -> DriverKind {
        self.driver_kind
    }

    pub fn is_remote(&self) -> bool {
        self.driver_kind == DriverKind::Remote
    }

    /// Raw address. Credential-bearing for Remote: never log this, use
    /// `diagnostics::sanitize_db_url` instead.
    pub fn connection_address(&self) -> &str {
        &self.connection_address
    }

    pub fn migrations_location(&self) -> &str {
        &self.migrations_location
    }

    /// The SQLite file, exactly as given. Engines open it by path, never by a
    /// URL built from it.
    pub fn local_path(&self) -> Option<&Path> {
        self.local_path.as_deref()
    }
}

/// Snapshot of the environment the resolver reads. Built once at startup so
/// resolution itself never touches process state.
#[derive(Debug, Clone)]
pub struct DbEnv {
    database_url: Option<String>,
    store_dir: PathBuf,
    probe_timeout: Duration,
}

impl DbEnv {
    pub fn new(store_dir: impl Into<PathBuf>) -> Self {
        Self {
            database_url: None,
            store_dir: store_dir.into(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Read the process environment. A `DATABASE_URL` that is set but not
    /// UTF-8 is a configuration error, not an absent variable.
    pub fn from_env() -> Result<Self, DbInfraError> {
        let database_url = match env::var(DATABASE_URL_VAR) {
            Ok(url) => Some(url),
            Err(VarError::NotPresent) => None,
            Err(VarError::NotUnicode(_)) => {
                return Err(DbInfraError::config(format!(
                    "{DATABASE_URL_VAR} is set but is not valid UTF-8"
                )))
            }
        };
        let store_dir = env::var_os(STORE_DIR_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_DIR));
        let probe_timeout = env::var(PROBE_TIMEOUT_VAR)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_PROBE_TIMEOUT);

        Ok(Self {
            database_url,
            store_dir,
            probe_timeout,
        })
    }

    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// `DATABASE_URL` if set to something other than whitespace.
    pub fn remote_url(&self) -> Option<&str> {
        self.database_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }

    pub fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }
}

/// Pick the backend the environment asks for. A remote signal with a bad
/// scheme is an error, never a silent downgrade to Local.
pub fn resolve(env: &DbEnv) -> Result<DatabaseConfig, DbInfraError> {
    match env.remote_url() {
        Some(url) => DatabaseConfig::remote(url),
        None => resolve_local(env),
    }
}

/// Local config at `<store_dir>/whatsmeow.db`, creating the directory if needed.
/// Ignores `DATABASE_URL` entirely.
pub fn resolve_local(env: &DbEnv) -> Result<DatabaseConfig, DbInfraError> {
    ensure_store_dir(env.store_dir())?;
    Ok(DatabaseConfig::local(&env.store_dir().join(SQLITE_FILE_NAME)))
}

fn ensure_store_dir(dir: &Path) -> Result<(), DbInfraError> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }

    builder.create(dir).map_err(|source| DbInfraError::StoreDir {
        path: dir.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use std::env;

    use serial_test::serial;

    use super::*;

    fn clear_env() {
        env::remove_var(DATABASE_URL_VAR);
        env::remove_var(STORE_DIR_VAR);
        env::remove_var(PROBE_TIMEOUT_VAR);
    }

    #[test]
    fn absent_url_resolves_local_and_creates_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let store = tmp.path().join("nested").join("store");

        let cfg = resolve(&DbEnv::new(&store)).unwrap();

        assert_eq!(cfg.driver_kind(), DriverKind::Local);
        assert!(store.is_dir());
        assert_eq!(cfg.local_path(), Some(store.join(SQLITE_FILE_NAME).as_path()));
    }

    #[test]
    fn blank_url_counts_as_absent() {
        let tmp = tempfile::tempdir().unwrap();

        for blank in ["", "   ", "\n"] {
            let cfg = resolve(&DbEnv::new(tmp.path()).with_database_url(blank)).unwrap();
            assert_eq!(cfg.driver_kind(), DriverKind::Local, "input {blank:?}");
        }
    }

    #[test]
    fn both_postgres_schemes_resolve_remote() {
        let tmp = tempfile::tempdir().unwrap();

        for url in [
            "postgres://u:p@db.internal:5432/bridge",
            "postgresql://u:p@db.internal/bridge?sslmode=require",
        ] {
            let cfg = resolve(&DbEnv::new(tmp.path()).with_database_url(url)).unwrap();
            assert!(cfg.is_remote());
            assert_eq!(cfg.connection_address(), url);
            assert!(cfg.local_path().is_none());
        }
    }

    #[test]
    fn remote_resolution_does_not_touch_the_filesystem() {
        let tmp = tempfile::tempdir().unwrap();
        let store = tmp.path().join("never-created");

        let env = DbEnv::new(&store).with_database_url("postgres://u:p@h/db");
        resolve(&env).unwrap();

        assert!(!store.exists());
    }

    #[test]
    fn unsupported_scheme_is_a_config_error() {
        let tmp = tempfile::tempdir().unwrap();

        for url in ["ftp://host/db", "mysql://u:p@h/db", "sqlite://store/x.db"] {
            let err = resolve(&DbEnv::new(tmp.path()).with_database_url(url)).unwrap_err();
            assert!(err.is_config(), "{url}: {err}");
        }
    }

    #[test]
    fn unparseable_url_is_a_config_error_without_leaking_it() {
        let tmp = tempfile::tempdir().unwrap();

        let err = resolve(&DbEnv::new(tmp.path()).with_database_url("not a url hunter2"))
            .unwrap_err();

        assert!(err.is_config());
        assert!(!err.to_string().contains("hunter2"));
    }

    #[test]
    fn url_without_host_is_rejected() {
        let err = DatabaseConfig::remote("postgres:///bridge").unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn resolve_local_ignores_remote_signal() {
        let tmp = tempfile::tempdir().unwrap();
        let env = DbEnv::new(tmp.path()).with_database_url("postgres://u:p@h/db");

        let cfg = resolve_local(&env).unwrap();

        assert_eq!(cfg.driver_kind(), DriverKind::Local);
        assert!(!cfg.connection_address().contains("u:p"));
    }

    #[test]
    fn store_dir_failure_is_distinct_config_error() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("store");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let err = resolve(&DbEnv::new(&blocker)).unwrap_err();

        assert!(matches!(err, DbInfraError::StoreDir { .. }));
        assert!(err.is_config());
    }

    #[test]
    #[serial]
    fn from_env_reads_variables() {
        clear_env();
        env::set_var(DATABASE_URL_VAR, "postgres://u:p@h/db");
        env::set_var(STORE_DIR_VAR, "/tmp/bridge-store");
        env::set_var(PROBE_TIMEOUT_VAR, "250");

        let db_env = DbEnv::from_env().unwrap();

        assert_eq!(db_env.remote_url(), Some("postgres://u:p@h/db"));
        assert_eq!(db_env.store_dir(), Path::new("/tmp/bridge-store"));
        assert_eq!(db_env.probe_timeout(), Duration::from_millis(250));
        clear_env();
    }

    #[test]
    #[serial]
    fn from_env_defaults() {
        clear_env();
        env::set_var(PROBE_TIMEOUT_VAR, "soon");

        let db_env = DbEnv::from_env().unwrap();

        assert_eq!(db_env.remote_url(), None);
        assert_eq!(db_env.store_dir(), Path::new(DEFAULT_STORE_DIR));
        assert_eq!(db_env.probe_timeout(), DEFAULT_PROBE_TIMEOUT);
        clear_env();
    }

    #[test]
    #[serial]
    #[cfg(unix)]
    fn non_utf8_database_url_is_a_config_error() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        clear_env();
        env::set_var(
            DATABASE_URL_VAR,
            OsStr::from_bytes(b"postgres://u:p@h\xff/db"),
        );

        let err = DbEnv::from_env().unwrap_err();

        assert!(err.is_config(), "{err}");
        assert!(err.to_string().contains(DATABASE_URL_VAR));
        clear_env();
    }

    #[test]
    fn local_path_is_kept_verbatim() {
        let tmp = tempfile::tempdir().unwrap();
        let store = tmp.path().join("odd?name#50%");

        let cfg = resolve(&DbEnv::new(&store)).unwrap();

        assert_eq!(cfg.local_path(), Some(store.join(SQLITE_FILE_NAME).as_path()));
    }
}
