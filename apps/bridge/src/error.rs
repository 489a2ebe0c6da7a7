use actix_web::error::ResponseError;
use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde::Serialize;
use store_infra::DbInfraError;
use thiserror::Error;

#[derive(Serialize)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub type_: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    pub code: String,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {detail}")]
    Config { detail: String },
    #[error("Database unavailable: {detail}")]
    DbUnavailable { detail: String },
}

impl AppError {
    fn code(&self) -> &'static str {
        match self {
            AppError::Config { .. } => "CONFIG_ERROR",
            AppError::DbUnavailable { .. } => "DB_UNAVAILABLE",
        }
    }

    fn detail(&self) -> &str {
        match self {
            AppError::Config { detail } | AppError::DbUnavailable { detail } => detail,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Config { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::DbUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn config(detail: String) -> Self {
        Self::Config { detail }
    }

    pub fn db_unavailable(detail: String) -> Self {
        Self::DbUnavailable { detail }
    }

    fn humanize_code(code: &str) -> String {
        code.split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    None => String::new(),
                    Some(first) => first
                        .to_uppercase()
                        .chain(chars.flat_map(char::to_lowercase))
                        .collect(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl From<DbInfraError> for AppError {
    fn from(e: DbInfraError) -> Self {
        if e.is_config() {
            AppError::config(e.to_string())
        } else {
            AppError::db_unavailable(e.to_string())
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.status()
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status();
        let code = self.code();

        let problem_details = ProblemDetails {
            type_: format!("urn:bridge:error:{}", code.to_lowercase()),
            title: Self::humanize_code(code),
            status: status.as_u16(),
            detail: self.detail().to_string(),
            code: code.to_string(),
        };

        HttpResponse::build(status)
            .content_type("application/problem+json")
            .json(problem_details)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use actix_web::body::to_bytes;

    use super::*;

    #[test]
    fn humanizes_codes() {
        assert_eq!(AppError::humanize_code("DB_UNAVAILABLE"), "Db Unavailable");
        assert_eq!(AppError::humanize_code("CONFIG_ERROR"), "Config Error");
    }

    #[test]
    fn store_errors_map_by_kind() {
        let config: AppError = DbInfraError::config("bad scheme").into();
        assert!(matches!(config, AppError::Config { .. }));

        let dir: AppError = DbInfraError::StoreDir {
            path: PathBuf::from("/nope"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        }
        .into();
        assert!(matches!(dir, AppError::Config { .. }));

        let exhausted: AppError = DbInfraError::FallbackExhausted {
            remote: "refused".into(),
            local: "readonly".into(),
        }
        .into();
        assert_eq!(exhausted.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[actix_web::test]
    async fn renders_problem_json() {
        let resp = AppError::db_unavailable("ping failed".into()).error_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            resp.headers().get("content-type").unwrap(),
            "application/problem+json"
        );

        let body = to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], "DB_UNAVAILABLE");
        assert_eq!(json["status"], 503);
        assert_eq!(json["detail"], "ping failed");
    }
}
