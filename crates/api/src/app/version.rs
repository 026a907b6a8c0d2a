//! API version negotiation.
//!
//! A client names a version through the `version` query parameter or the
//! `X-Version` header. `ApiVersion::camp_view` maps each supported version to
//! the camp representation it serves.

use std::fmt;
use std::str::FromStr;

use axum::async_trait;
use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use serde::Deserialize;
use thiserror::Error;

use crate::app::errors::ApiError;

pub const VERSION_HEADER: &str = "x-version";
pub const SUPPORTED_VERSIONS_HEADER: &str = "api-supported-versions";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVersion {
    V1_0,
    V1_1,
}

impl ApiVersion {
    pub const DEFAULT: ApiVersion = ApiVersion::V1_1;

    /// Every supported version, oldest first.
    pub const ALL: [ApiVersion; 2] = [ApiVersion::V1_0, ApiVersion::V1_1];

    /// Camp representation served for this version.
    pub const fn camp_view(self) -> CampView {
        match self {
            ApiVersion::V1_0 => CampView { include_talks: false },
            ApiVersion::V1_1 => CampView { include_talks: true },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ApiVersion::V1_0 => "1.0",
            ApiVersion::V1_1 => "1.1",
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" | "1.0" => Ok(ApiVersion::V1_0),
            "1.1" => Ok(ApiVersion::V1_1),
            other => Err(VersionError::Unsupported(other.to_string())),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("API version '{0}' is not supported")]
    Unsupported(String),

    #[error("conflicting API versions requested: query '{query}', header '{header}'")]
    Ambiguous { query: String, header: String },
}

impl From<VersionError> for ApiError {
    fn from(err: VersionError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

/// What a camp lookup returns for a given version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CampView {
    pub include_talks: bool,
}

/// Value of the `api-supported-versions` response header, e.g. `1.0, 1.1`.
pub fn supported_versions() -> String {
    ApiVersion::ALL
        .iter()
        .map(|v| v.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Pick the version from the query value and header value.
///
/// Neither present selects `ApiVersion::DEFAULT`. Both present must agree.
pub fn resolve(query: Option<&str>, header: Option<&str>) -> Result<ApiVersion, VersionError> {
    match (query, header) {
        (None, None) => Ok(ApiVersion::DEFAULT),
        (Some(raw), None) | (None, Some(raw)) => raw.parse(),
        (Some(q), Some(h)) => {
            let from_query: ApiVersion = q.parse()?;
            let from_header: ApiVersion = h.parse()?;
            if from_query != from_header {
                return Err(VersionError::Ambiguous {
                    query: q.to_string(),
                    header: h.to_string(),
                });
            }
            Ok(from_query)
        }
    }
}

#[derive(Debug, Deserialize)]
struct VersionQuery {
    version: Option<String>,
}

/// Extractor for the version a request asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestedVersion(pub ApiVersion);

#[async_trait]
impl<S> FromRequestParts<S> for RequestedVersion
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<VersionQuery>::try_from_uri(&parts.uri)
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        let header = match parts.headers.get(VERSION_HEADER) {
            Some(value) => Some(value.to_str().map_err(|_| {
                ApiError::bad_request(format!("{VERSION_HEADER} header is not valid text"))
            })?),
            None => None,
        };

        let version = resolve(query.version.as_deref(), header)?;
        Ok(RequestedVersion(version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_and_long_forms() {
        assert_eq!("1".parse::<ApiVersion>(), Ok(ApiVersion::V1_0));
        assert_eq!("1.0".parse::<ApiVersion>(), Ok(ApiVersion::V1_0));
        assert_eq!("1.1".parse::<ApiVersion>(), Ok(ApiVersion::V1_1));
        assert!(matches!(
            "2.0".parse::<ApiVersion>(),
            Err(VersionError::Unsupported(v)) if v == "2.0"
        ));
    }

    #[test]
    fn defaults_when_nothing_requested() {
        assert_eq!(resolve(None, None), Ok(ApiVersion::V1_1));
    }

    #[test]
    fn query_or_header_alone_selects_version() {
        assert_eq!(resolve(Some("1.0"), None), Ok(ApiVersion::V1_0));
        assert_eq!(resolve(None, Some("1.0")), Ok(ApiVersion::V1_0));
    }

    #[test]
    fn equivalent_query_and_header_agree() {
        assert_eq!(resolve(Some("1"), Some("1.0")), Ok(ApiVersion::V1_0));
    }

    #[test]
    fn conflicting_query_and_header_are_ambiguous() {
        assert!(matches!(
            resolve(Some("1.0"), Some("1.1")),
            Err(VersionError::Ambiguous { .. })
        ));
    }

    #[test]
    fn only_the_newer_version_includes_talks() {
        assert_eq!(ApiVersion::V1_0.camp_view(), CampView { include_talks: false });
        assert_eq!(ApiVersion::V1_1.camp_view(), CampView { include_talks: true });
    }

    #[test]
    fn supported_versions_header_lists_all_rows() {
        assert_eq!(supported_versions(), "1.0, 1.1");
    }
}
