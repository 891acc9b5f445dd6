use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use validator::Validate;

use crate::error::AppError;

pub fn validate_input<T: Validate>(input: &T) -> Result<(), AppError> {
    input
        .validate()
        .map_err(|errors| AppError::UnprocessableEntity(format!("Validation failed: {errors}")))
}

/// `Query` with its rejection mapped into `AppError`, so a malformed query
/// string (unparseable `limit`, missing `org_id`) produces the same
/// `{"success": false, "error": …}` envelope as every other failure instead
/// of axum's plain-text 400.
pub struct AppQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for AppQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Common query parameters for every `/insights/*` endpoint. Dates are
/// `YYYY-MM-DD`; `limit` applies to the Top-N endpoints only.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct InsightsQuery {
    pub org_id: String,
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
    #[validate(range(min = 1, max = 500))]
    pub limit: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::{AppQuery, InsightsQuery};
    use crate::error::AppError;
    use axum::extract::FromRequestParts;
    use axum::http::Request;

    async fn extract(uri: &str) -> Result<AppQuery<InsightsQuery>, AppError> {
        let (mut parts, _) = Request::builder().uri(uri).body(()).unwrap().into_parts();
        AppQuery::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn unparseable_limit_becomes_bad_request() {
        let result = extract("/insights?org_id=abc&limit=notanumber").await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn missing_org_id_becomes_bad_request() {
        let result = extract("/insights?limit=5").await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn well_formed_query_deserializes() {
        let AppQuery(query) = extract("/insights?org_id=abc&startDate=2026-06-01&limit=5")
            .await
            .unwrap();
        assert_eq!(query.org_id, "abc");
        assert_eq!(query.start_date.as_deref(), Some("2026-06-01"));
        assert_eq!(query.limit, Some(5));
    }
}
