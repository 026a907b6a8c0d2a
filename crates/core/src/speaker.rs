//! Speakers are managed outside the API; they are only ever looked up.

use crate::entity::Entity;
use crate::id::SpeakerId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Speaker {
    pub id: SpeakerId,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub company: Option<String>,
    pub company_url: Option<String>,
    pub blog_url: Option<String>,
    pub twitter: Option<String>,
    pub github: Option<String>,
}

impl Entity for Speaker {
    type Id = SpeakerId;

    fn id(&self) -> SpeakerId {
        self.id
    }
}
