//! `{data, meta}` / `{error, meta}` bodies stamped in site-local time.
//!
//! Analytics buckets are cut on the site's UTC offset, so every response
//! carries that offset next to the generation time. Clients can then line
//! up day and hour keys without knowing the monitor's configuration.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analytics::Calendar;

/// API version reported in every response.
pub const API_VERSION: &str = "1";

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    /// RFC 3339 generation time in the site offset.
    pub timestamp: String,
    /// Offset the analytics buckets were cut on.
    pub utc_offset_minutes: i32,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
struct DataBody<T: Serialize> {
    data: T,
    meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
    meta: ResponseMeta,
}

/// Wraps handler output for one site calendar.
#[derive(Debug, Clone, Copy)]
pub struct Envelope {
    calendar: Calendar,
}

impl Envelope {
    pub fn new(calendar: Calendar) -> Self {
        Self { calendar }
    }

    fn meta_at(&self, now: DateTime<Utc>) -> ResponseMeta {
        let local = self.calendar.local(now);
        ResponseMeta {
            timestamp: local.to_rfc3339(),
            utc_offset_minutes: local.offset().local_minus_utc() / 60,
            version: API_VERSION,
        }
    }

    pub fn ok<T: Serialize>(&self, data: T) -> Response {
        let body = DataBody {
            data,
            meta: self.meta_at(Utc::now()),
        };
        (StatusCode::OK, axum::Json(body)).into_response()
    }

    pub fn bad_request(&self, msg: impl Into<String>) -> Response {
        self.error(StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.into())
    }

    pub fn internal(&self, msg: impl Into<String>) -> Response {
        self.error(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg.into())
    }

    fn error(&self, status: StatusCode, code: &'static str, message: String) -> Response {
        let body = ErrorBody {
            error: ErrorDetail { code, message },
            meta: self.meta_at(Utc::now()),
        };
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_meta_uses_site_offset() {
        let envelope = Envelope::new(Calendar::new(330).unwrap());
        let meta = envelope.meta_at(Utc.with_ymd_and_hms(2024, 3, 4, 20, 0, 0).unwrap());

        assert_eq!(meta.utc_offset_minutes, 330);
        assert_eq!(meta.timestamp, "2024-03-05T01:30:00+05:30");
    }

    #[tokio::test]
    async fn test_ok_response_shape() {
        let resp = Envelope::new(Calendar::utc()).ok(serde_json::json!({"hello": "world"}));
        assert_eq!(resp.status(), StatusCode::OK);

        let v = body_json(resp).await;
        assert_eq!(v["data"]["hello"], "world");
        assert_eq!(v["meta"]["version"], API_VERSION);
        assert_eq!(v["meta"]["utc_offset_minutes"], 0);
    }

    #[tokio::test]
    async fn test_error_response_shape() {
        let resp = Envelope::new(Calendar::new(-300).unwrap()).bad_request("step must be hour or minute");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let v = body_json(resp).await;
        assert_eq!(v["error"]["code"], "BAD_REQUEST");
        assert!(v.get("data").is_none());
        assert_eq!(v["meta"]["utc_offset_minutes"], -300);
    }
}
