//! Redacted, human-safe view of the active connection.
//!
//! Everything here is a pure function of a `DatabaseConfig`: nothing is
//! cached, so asking again after a fallback describes the new backend.

use std::process;

use percent_encoding::percent_decode_str;
use sea_orm::{ConnectionTrait, DatabaseBackend};
use serde::Serialize;
use url::Url;

use crate::config::db::{DatabaseConfig, DriverKind};

pub const PASSWORD_MASK: &str = "***";
const UNPARSEABLE: &str = "<unparseable connection string>";
const DEFAULT_PG_PORT: u16 = 5432;
const SECRET_PARAMS: [&str; 3] = ["password", "sslpassword", "passfile"];

/// Mask the password (and secret query parameters) in a connection URL while
/// keeping scheme, user, host, port and database readable.
pub fn sanitize_db_url(raw: &str) -> String {
    let mut url = match Url::parse(raw) {
        Ok(url) if !url.cannot_be_a_base() => url,
        _ => return UNPARSEABLE.to_string(),
    };

    if url.password().is_some() && url.set_password(Some(PASSWORD_MASK)).is_err() {
        return UNPARSEABLE.to_string();
    }

    if url
        .query_pairs()
        .any(|(k, _)| SECRET_PARAMS.contains(&k.as_ref()))
    {
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| {
                let v = if SECRET_PARAMS.contains(&k.as_ref()) {
                    PASSWORD_MASK.to_string()
                } else {
                    v.into_owned()
                };
                (k.into_owned(), v)
            })
            .collect();
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }

    url.to_string()
}

/// Strip the config's credential from free-form error text (driver messages
/// occasionally echo parts of the DSN). Only URL-shaped occurrences are
/// touched: the full address and its `user:password@` authority, raw or
/// percent-decoded. A short password elsewhere in the text is left alone.
pub fn scrub_secret(detail: &str, config: &DatabaseConfig) -> String {
    let address = config.connection_address();
    let Ok(url) = Url::parse(address) else {
        return detail.to_string();
    };
    let Some(password) = url.password().filter(|p| !p.is_empty()) else {
        return detail.to_string();
    };

    let user = url.username();
    let masked_authority = format!("{user}:{PASSWORD_MASK}@");
    let authorities = [
        format!("{user}:{password}@"),
        format!(
            "{}:{}@",
            percent_decode_str(user).decode_utf8_lossy(),
            percent_decode_str(password).decode_utf8_lossy()
        ),
    ];

    let mut scrubbed = detail.replace(address, &sanitize_db_url(address));
    for authority in &authorities {
        scrubbed = scrubbed.replace(authority.as_str(), &masked_authority);
    }
    scrubbed
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Remote,
    Local,
    Uninitialized,
}

impl From<DriverKind> for BackendKind {
    fn from(kind: DriverKind) -> Self {
        match kind {
            DriverKind::Remote => BackendKind::Remote,
            DriverKind::Local => BackendKind::Local,
        }
    }
}

/// Status summary handed to the HTTP layer. Never holds the raw credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionInfo {
    #[serde(rename = "type")]
    pub backend_kind: BackendKind,
    pub is_remote: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migrations_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_redacted: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ConnectionInfo {
    pub fn uninitialized() -> Self {
        Self {
            backend_kind: BackendKind::Uninitialized,
            is_remote: false,
            driver: None,
            migrations_path: None,
            host_redacted: None,
            host: None,
            port: None,
            user: None,
            database: None,
            path: None,
        }
    }
}

/// Describe `config`, or the uninitialized state when there is none yet.
pub fn report(config: Option<&DatabaseConfig>) -> ConnectionInfo {
    let Some(config) = config else {
        return ConnectionInfo::uninitialized();
    };

    let kind = config.driver_kind();
    let mut info = ConnectionInfo {
        backend_kind: kind.into(),
        is_remote: config.is_remote(),
        driver: Some(kind.driver_name()),
        migrations_path: Some(config.migrations_location().to_string()),
        ..ConnectionInfo::uninitialized()
    };

    match kind {
        DriverKind::Local => {
            info.path = config.local_path().map(|p| p.display().to_string());
        }
        DriverKind::Remote => {
            info.host_redacted = Some(sanitize_db_url(config.connection_address()));
            if let Ok(url) = Url::parse(config.connection_address()) {
                info.host = url.host_str().map(str::to_string);
                info.port = Some(url.port().unwrap_or(DEFAULT_PG_PORT));
                info.user = Some(url.username())
                    .filter(|u| !u.is_empty())
                    .map(|u| percent_decode_str(u).decode_utf8_lossy().into_owned());
                info.database = Some(url.path().trim_start_matches('/'))
                    .filter(|d| !d.is_empty())
                    .map(|d| percent_decode_str(d).decode_utf8_lossy().into_owned());
            }
        }
    }

    info
}

/// Short identifier for correlating pool log lines: PID + backend + handle address.
pub fn connection_id<C: ConnectionTrait>(conn: &C) -> String {
    let backend = match conn.get_database_backend() {
        DatabaseBackend::Sqlite => "sq",
        DatabaseBackend::Postgres => "pg",
        DatabaseBackend::MySql => "my",
    };
    let conn_ptr = conn as *const _ as usize;
    format!("{}-{}-{:x}", process::id(), backend, conn_ptr % 0xFFFF)
}
