use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Extension, Path,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use codecamp_core::{NewTalk, Speaker, SpeakerId, TalkId};

use crate::app::dto::{TalkModel, TalkRequest};
use crate::app::errors::{store_failure, ApiError};
use crate::app::services::AppServices;

/// Nested under `/api/camps/:moniker/talks`.
pub fn router() -> Router {
    Router::new()
        .route("/", get(list_talks).post(create_talk))
        .route("/:id", get(get_talk).put(update_talk).delete(delete_talk))
}

fn talk_not_found() -> ApiError {
    ApiError::not_found("Couldn't find the talk")
}

/// A talk id that is not a number names no talk.
fn talk_path(
    path: Result<Path<(String, TalkId)>, PathRejection>,
) -> Result<(String, TalkId), ApiError> {
    path.map(|Path(params)| params).map_err(|rejection| {
        tracing::debug!(error = %rejection.body_text(), "unparseable talk path");
        talk_not_found()
    })
}

async fn resolve_speaker(services: &AppServices, id: SpeakerId) -> Result<Speaker, ApiError> {
    services
        .repository()
        .find_speaker(id)
        .await
        .map_err(store_failure("find_speaker"))?
        .ok_or_else(|| ApiError::bad_request("Speaker could not be found"))
}

pub async fn list_talks(
    Extension(services): Extension<Arc<AppServices>>,
    Path(moniker): Path<String>,
) -> Result<Json<Vec<TalkModel>>, ApiError> {
    let talks = services
        .repository()
        .talks_for_camp(&moniker)
        .await
        .map_err(store_failure("list_talks"))?;

    Ok(Json(talks.iter().map(TalkModel::from).collect()))
}

pub async fn get_talk(
    Extension(services): Extension<Arc<AppServices>>,
    path: Result<Path<(String, TalkId)>, PathRejection>,
) -> Result<Json<TalkModel>, ApiError> {
    let (moniker, id) = talk_path(path)?;
    let talk = services
        .repository()
        .find_talk(&moniker, id)
        .await
        .map_err(store_failure("get_talk"))?
        .ok_or_else(talk_not_found)?;

    Ok(Json(TalkModel::from(&talk)))
}

pub async fn create_talk(
    Extension(services): Extension<Arc<AppServices>>,
    Path(moniker): Path<String>,
    body: Result<Json<TalkRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let details = body.details();
    details.validate()?;

    let repo = services.repository();
    let camp = repo
        .find_camp(&moniker, false)
        .await
        .map_err(store_failure("create_talk"))?
        .ok_or_else(|| ApiError::bad_request("Camp does not exist"))?;

    let speaker_id = body
        .speaker_id()
        .ok_or_else(|| ApiError::bad_request("Speaker ID is required"))?;
    let speaker = resolve_speaker(&services, speaker_id).await?;

    let talk = repo
        .insert_talk(NewTalk {
            camp_id: camp.id,
            speaker_id: speaker.id,
            details,
        })
        .await
        .map_err(store_failure("create_talk"))?;

    let location = format!("/api/camps/{}/talks/{}", camp.moniker, talk.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(TalkModel::from(&talk)),
    )
        .into_response())
}

/// Replaces title, abstract and level; relinks the speaker only when the body names one.
pub async fn update_talk(
    Extension(services): Extension<Arc<AppServices>>,
    path: Result<Path<(String, TalkId)>, PathRejection>,
    body: Result<Json<TalkRequest>, JsonRejection>,
) -> Result<Json<TalkModel>, ApiError> {
    let (moniker, id) = talk_path(path)?;
    let Json(body) = body?;
    let details = body.details();
    details.validate()?;

    let repo = services.repository();
    let mut talk = repo
        .find_talk(&moniker, id)
        .await
        .map_err(store_failure("update_talk"))?
        .ok_or_else(talk_not_found)?;

    if body.talk_id != Some(talk.id) {
        return Err(ApiError::bad_request("Cannot update non-matching talk"));
    }

    // Resolve before touching the record so a bad reference leaves it unchanged.
    let speaker = match body.speaker_id() {
        Some(speaker_id) => Some(resolve_speaker(&services, speaker_id).await?),
        None => None,
    };

    talk.apply(details);
    if speaker.is_some() {
        talk.speaker = speaker;
    }

    repo.update_talk(&talk)
        .await
        .map_err(store_failure("update_talk"))?;

    Ok(Json(TalkModel::from(&talk)))
}

pub async fn delete_talk(
    Extension(services): Extension<Arc<AppServices>>,
    path: Result<Path<(String, TalkId)>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let (moniker, id) = talk_path(path)?;
    let repo = services.repository();
    let talk = repo
        .find_talk(&moniker, id)
        .await
        .map_err(store_failure("delete_talk"))?
        .ok_or_else(talk_not_found)?;

    repo.delete_talk(talk.id)
        .await
        .map_err(store_failure("delete_talk"))?;

    Ok(StatusCode::OK)
}
