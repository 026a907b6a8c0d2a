//! `codecamp-core`: domain records for camps, talks and speakers.
//!
//! This crate contains **pure domain** types (no storage or HTTP concerns).

pub mod camp;
pub mod entity;
pub mod error;
pub mod id;
pub mod speaker;
pub mod talk;
mod validate;

pub use camp::{Camp, CampDetails, Location, NewCamp};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{CampId, SpeakerId, TalkId};
pub use speaker::Speaker;
pub use talk::{NewTalk, Talk, TalkDetails};
