use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use codecamp_infra::StoreError;

use crate::app::dto::{self, CampList, CampModel, CampRequest};
use crate::app::errors::{store_failure, ApiError};
use crate::app::routes::talks;
use crate::app::services::AppServices;
use crate::app::version::{self, ApiVersion, RequestedVersion, SUPPORTED_VERSIONS_HEADER};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_camps).post(create_camp))
        .route("/search", get(search_camps))
        .route("/:moniker", get(get_camp).put(update_camp).delete(delete_camp))
        .nest("/:moniker/talks", talks::router())
}

fn camp_not_found(moniker: &str) -> ApiError {
    ApiError::not_found(format!("Could not find camp with moniker of {moniker}"))
}

pub async fn list_camps(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::ListCampsQuery>,
) -> Result<Json<CampList>, ApiError> {
    let camps = services
        .repository()
        .list_camps(query.include_talks)
        .await
        .map_err(store_failure("list_camps"))?;

    Ok(Json(CampList::from_camps(&camps)))
}

/// Versioned: 1.0 returns the camp alone, 1.1 includes its talks.
///
/// Every response, failures included, reports the supported versions.
pub async fn get_camp(
    Extension(services): Extension<Arc<AppServices>>,
    requested: Result<RequestedVersion, ApiError>,
    Path(moniker): Path<String>,
) -> Response {
    let result = match requested {
        Ok(RequestedVersion(version)) => find_versioned_camp(&services, &moniker, version).await,
        Err(err) => Err(err),
    };

    (
        [(SUPPORTED_VERSIONS_HEADER, version::supported_versions())],
        result,
    )
        .into_response()
}

async fn find_versioned_camp(
    services: &AppServices,
    moniker: &str,
    version: ApiVersion,
) -> Result<Json<CampModel>, ApiError> {
    let view = version.camp_view();
    let camp = services
        .repository()
        .find_camp(moniker, view.include_talks)
        .await
        .map_err(store_failure("get_camp"))?
        .ok_or_else(|| camp_not_found(moniker))?;

    Ok(Json(CampModel::from(&camp)))
}

pub async fn search_camps(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::SearchCampsQuery>,
) -> Result<Json<Vec<CampModel>>, ApiError> {
    let date = query.date()?;
    let camps = services
        .repository()
        .camps_on_date(date, query.include_talks)
        .await
        .map_err(store_failure("search_camps"))?;

    if camps.is_empty() {
        return Err(ApiError::not_found(format!("no camps take place on {date}")));
    }

    Ok(Json(camps.iter().map(CampModel::from).collect()))
}

pub async fn create_camp(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<CampRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let new_camp = body.into_new_camp();
    new_camp.validate()?;

    let repo = services.repository();
    let existing = repo
        .find_camp(&new_camp.moniker, false)
        .await
        .map_err(store_failure("create_camp"))?;
    if existing.is_some() {
        return Err(ApiError::bad_request("Moniker in use"));
    }

    let camp = repo.insert_camp(new_camp).await.map_err(|err| match err {
        // Lost a race with another create for the same moniker.
        StoreError::Duplicate(_) => ApiError::bad_request("Moniker in use"),
        other => store_failure("create_camp")(other),
    })?;

    let location = format!("/api/camps/{}", camp.moniker);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(CampModel::from(&camp)),
    )
        .into_response())
}

pub async fn update_camp(
    Extension(services): Extension<Arc<AppServices>>,
    Path(moniker): Path<String>,
    body: Result<Json<CampRequest>, JsonRejection>,
) -> Result<Json<CampModel>, ApiError> {
    let Json(body) = body?;
    let changes = body.into_new_camp();
    changes.validate()?;
    if changes.moniker != moniker {
        return Err(ApiError::bad_request(format!(
            "Moniker in the body ({}) does not match the requested camp ({moniker})",
            changes.moniker
        )));
    }

    let repo = services.repository();
    let mut camp = repo
        .find_camp(&moniker, false)
        .await
        .map_err(store_failure("update_camp"))?
        .ok_or_else(|| camp_not_found(&moniker))?;

    camp.apply(changes.details);
    repo.update_camp(&camp)
        .await
        .map_err(store_failure("update_camp"))?;

    Ok(Json(CampModel::from(&camp)))
}

pub async fn delete_camp(
    Extension(services): Extension<Arc<AppServices>>,
    Path(moniker): Path<String>,
) -> Result<StatusCode, ApiError> {
    let repo = services.repository();
    let camp = repo
        .find_camp(&moniker, false)
        .await
        .map_err(store_failure("delete_camp"))?
        .ok_or_else(|| camp_not_found(&moniker))?;

    repo.delete_camp(camp.id)
        .await
        .map_err(store_failure("delete_camp"))?;

    Ok(StatusCode::OK)
}
