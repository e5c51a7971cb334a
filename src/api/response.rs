//! Response envelope and error mapping.
//!
//! Every endpoint answers `{"success": true, "data": ...}` or
//! `{"success": false, "message": "..."}`.

use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::core::Address;
use crate::error::{DaoError, ErrorKind};

/// Header carrying the address of the acting user on mutating routes.
pub const ACTOR_HEADER: &str = "x-actor-address";

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::ok(data)))
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub retry_after_secs: Option<u64>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            retry_after_secs: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::StateConflict => StatusCode::CONFLICT,
        ErrorKind::Authorization => StatusCode::FORBIDDEN,
        ErrorKind::ResourceExhausted => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<DaoError> for ApiError {
    fn from(err: DaoError) -> Self {
        match err {
            DaoError::RateLimited {
                message,
                retry_after_secs,
            } => Self {
                status: StatusCode::TOO_MANY_REQUESTS,
                message,
                retry_after_secs: Some(retry_after_secs),
            },
            DaoError::Unavailable(message) => Self::new(StatusCode::SERVICE_UNAVAILABLE, message),
            other => {
                let status = status_for(other.kind());
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    error!("Request failed: {}", other);
                }
                Self::new(status, other.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response =
            (self.status, Json(ApiResponse::<()>::error(self.message))).into_response();
        if let Some(secs) = self.retry_after_secs {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

impl IntoResponse for DaoError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

/// The acting address from the request headers.
pub fn caller(headers: &HeaderMap) -> Result<Address, ApiError> {
    let raw = headers
        .get(ACTOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::bad_request(format!("missing {} header", ACTOR_HEADER)))?;
    Ok(Address::parse(raw)?)
}

/// Parse a user supplied address.
pub fn parse_address(raw: &str) -> Result<Address, ApiError> {
    Ok(Address::parse(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let not_found: ApiError = DaoError::not_found("Task", 7).into();
        assert_eq!(not_found.status, StatusCode::NOT_FOUND);

        let conflict: ApiError = DaoError::TaskNotOpen(1).into();
        assert_eq!(conflict.status, StatusCode::CONFLICT);

        let limited: ApiError = DaoError::RateLimited {
            message: "slow down".into(),
            retry_after_secs: 30,
        }
        .into();
        assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(limited.retry_after_secs, Some(30));

        let unauthorized: ApiError = DaoError::Unauthorized("no".into()).into();
        assert_eq!(unauthorized.status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_caller_header() {
        let mut headers = HeaderMap::new();
        assert!(caller(&headers).is_err());

        headers.insert(
            ACTOR_HEADER,
            HeaderValue::from_static("0xAbCdEf0000000000000000000000000000000001"),
        );
        assert_eq!(
            caller(&headers).unwrap().as_str(),
            "0xabcdef0000000000000000000000000000000001"
        );

        headers.insert(ACTOR_HEADER, HeaderValue::from_static("alice"));
        assert_eq!(caller(&headers).unwrap_err().status, StatusCode::BAD_REQUEST);
    }

    fn decode<T: serde::de::DeserializeOwned>(raw: &str) -> ApiResponse<T> {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn test_error_envelope_decodes_for_any_payload() {
        let failed: ApiResponse<Address> = decode(r#"{"success": false, "message": "nope"}"#);
        assert!(!failed.success);
        assert!(failed.data.is_none());
        assert_eq!(failed.message.as_deref(), Some("nope"));
    }

    #[test]
    fn test_envelope_shape() {
        let body = serde_json::to_value(ApiResponse::ok(5)).unwrap();
        assert_eq!(body, serde_json::json!({"success": true, "data": 5}));
        let body = serde_json::to_value(ApiResponse::<()>::error("nope")).unwrap();
        assert_eq!(body, serde_json::json!({"success": false, "message": "nope"}));
    }
}
