//! Talk: a session inside a camp, delivered by one speaker.

use crate::entity::Entity;
use crate::error::DomainResult;
use crate::id::{CampId, SpeakerId, TalkId};
use crate::speaker::Speaker;
use crate::validate;

pub const TITLE_MAX_LEN: usize = 100;
pub const ABSTRACT_MIN_LEN: usize = 20;
pub const ABSTRACT_MAX_LEN: usize = 4000;
pub const MIN_LEVEL: i32 = 100;
pub const MAX_LEVEL: i32 = 500;

/// The writable fields of a talk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TalkDetails {
    pub title: String,
    pub abstract_text: String,
    pub level: i32,
}

impl TalkDetails {
    pub fn validate(&self) -> DomainResult<()> {
        validate::text("title", &self.title, 1, TITLE_MAX_LEN)?;
        validate::text("abstract", &self.abstract_text, ABSTRACT_MIN_LEN, ABSTRACT_MAX_LEN)?;
        validate::range("level", self.level, MIN_LEVEL, MAX_LEVEL)
    }
}

/// A talk that has not been stored yet. Parent camp and speaker must exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTalk {
    pub camp_id: CampId,
    pub speaker_id: SpeakerId,
    pub details: TalkDetails,
}

/// A stored talk with its speaker resolved (if it has one).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Talk {
    pub id: TalkId,
    pub camp_id: CampId,
    pub title: String,
    pub abstract_text: String,
    pub level: i32,
    pub speaker: Option<Speaker>,
}

impl Talk {
    /// Overwrite title, abstract and level. The speaker link is changed separately.
    pub fn apply(&mut self, details: TalkDetails) {
        self.title = details.title;
        self.abstract_text = details.abstract_text;
        self.level = details.level;
    }

    pub fn speaker_id(&self) -> Option<SpeakerId> {
        self.speaker.as_ref().map(|s| s.id)
    }
}

impl Entity for Talk {
    type Id = TalkId;

    fn id(&self) -> TalkId {
        self.id
    }
}
