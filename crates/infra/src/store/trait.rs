use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use codecamp_core::{Camp, CampId, NewCamp, NewTalk, Speaker, SpeakerId, Talk, TalkId};

/// Result type for repository operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Repository operation error.
///
/// These are **infrastructure errors** as opposed to domain validation errors.
///
/// ## Error Categories
///
/// - **Duplicate**: a unique key (camp moniker) is already taken
/// - **MissingReference**: a referenced row (camp, speaker) does not exist
/// - **NothingSaved**: a write matched zero rows (the record vanished between read and write)
/// - **Backend**: connection, query or decoding failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate record: {0}")]
    Duplicate(String),

    #[error("missing reference: {0}")]
    MissingReference(String),

    #[error("no rows affected by {0}")]
    NothingSaved(String),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Data store gateway for camps, their talks and the speakers talks point at.
///
/// Every write is a single atomic statement; there is no separate commit step.
/// A write that matches no rows returns `StoreError::NothingSaved` instead of
/// silently succeeding.
///
/// Talks returned from any method always have their speaker resolved. Camps
/// carry their talks only when `include_talks` is set.
#[async_trait]
pub trait CampRepository: Send + Sync {
    /// All camps, most recent event first (camps without a date last).
    async fn list_camps(&self, include_talks: bool) -> StoreResult<Vec<Camp>>;

    async fn find_camp(&self, moniker: &str, include_talks: bool) -> StoreResult<Option<Camp>>;

    /// Camps whose event date falls on `date`, most recent first.
    async fn camps_on_date(&self, date: NaiveDate, include_talks: bool) -> StoreResult<Vec<Camp>>;

    /// Insert a camp. Fails with `Duplicate` if the moniker is taken.
    async fn insert_camp(&self, camp: NewCamp) -> StoreResult<Camp>;

    /// Persist the writable fields of an existing camp.
    async fn update_camp(&self, camp: &Camp) -> StoreResult<()>;

    /// Delete a camp together with its talks.
    async fn delete_camp(&self, id: CampId) -> StoreResult<()>;

    /// Talks of the camp with the given moniker (empty if the camp is unknown).
    async fn talks_for_camp(&self, moniker: &str) -> StoreResult<Vec<Talk>>;

    async fn find_talk(&self, moniker: &str, id: TalkId) -> StoreResult<Option<Talk>>;

    /// Insert a talk. Fails with `MissingReference` if the camp or speaker is gone.
    async fn insert_talk(&self, talk: NewTalk) -> StoreResult<Talk>;

    /// Persist title, abstract, level and the speaker link of an existing talk.
    async fn update_talk(&self, talk: &Talk) -> StoreResult<()>;

    async fn delete_talk(&self, id: TalkId) -> StoreResult<()>;

    async fn find_speaker(&self, id: SpeakerId) -> StoreResult<Option<Speaker>>;
}
