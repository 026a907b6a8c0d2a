//! Wire shapes and the conversions between them and the domain records.
//!
//! Responses use the `*Model` types; request bodies use the `*Request` types.
//! Every field is camelCase on the wire.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

use codecamp_core::{
    Camp, CampDetails, Location, NewCamp, Speaker, SpeakerId, Talk, TalkDetails, TalkId,
};

use crate::app::errors::ApiError;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampModel {
    pub name: String,
    pub moniker: String,
    pub event_date: Option<NaiveDateTime>,
    pub length: i32,
    pub venue: Option<String>,
    pub location_address1: Option<String>,
    pub location_address2: Option<String>,
    pub location_address3: Option<String>,
    pub location_city_town: Option<String>,
    pub location_state_province: Option<String>,
    pub location_postal_code: Option<String>,
    pub location_country: Option<String>,
    pub talks: Vec<TalkModel>,
}

impl From<&Camp> for CampModel {
    fn from(camp: &Camp) -> Self {
        let location = &camp.location;
        Self {
            name: camp.name.clone(),
            moniker: camp.moniker.clone(),
            event_date: camp.event_date,
            length: camp.length,
            venue: location.venue_name.clone(),
            location_address1: location.address1.clone(),
            location_address2: location.address2.clone(),
            location_address3: location.address3.clone(),
            location_city_town: location.city_town.clone(),
            location_state_province: location.state_province.clone(),
            location_postal_code: location.postal_code.clone(),
            location_country: location.country.clone(),
            talks: camp.talks.iter().map(TalkModel::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CampList {
    pub count: usize,
    pub items: Vec<CampModel>,
}

impl CampList {
    pub fn from_camps(camps: &[Camp]) -> Self {
        Self {
            count: camps.len(),
            items: camps.iter().map(CampModel::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TalkModel {
    pub talk_id: TalkId,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub level: i32,
    pub speaker: Option<SpeakerModel>,
}

impl From<&Talk> for TalkModel {
    fn from(talk: &Talk) -> Self {
        Self {
            talk_id: talk.id,
            title: talk.title.clone(),
            abstract_text: talk.abstract_text.clone(),
            level: talk.level,
            speaker: talk.speaker.as_ref().map(SpeakerModel::from),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakerModel {
    pub speaker_id: SpeakerId,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub company: Option<String>,
    pub company_url: Option<String>,
    pub blog_url: Option<String>,
    pub twitter: Option<String>,
    pub git_hub: Option<String>,
}

impl From<&Speaker> for SpeakerModel {
    fn from(speaker: &Speaker) -> Self {
        Self {
            speaker_id: speaker.id,
            first_name: speaker.first_name.clone(),
            middle_name: speaker.middle_name.clone(),
            last_name: speaker.last_name.clone(),
            company: speaker.company.clone(),
            company_url: speaker.company_url.clone(),
            blog_url: speaker.blog_url.clone(),
            twitter: speaker.twitter.clone(),
            git_hub: speaker.github.clone(),
        }
    }
}

fn default_length() -> i32 {
    1
}

/// Body of camp create and update. Any `talks` array sent along is ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub moniker: String,
    #[serde(default, deserialize_with = "lenient_event_date")]
    pub event_date: Option<NaiveDateTime>,
    #[serde(default = "default_length")]
    pub length: i32,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub location_address1: Option<String>,
    #[serde(default)]
    pub location_address2: Option<String>,
    #[serde(default)]
    pub location_address3: Option<String>,
    #[serde(default)]
    pub location_city_town: Option<String>,
    #[serde(default)]
    pub location_state_province: Option<String>,
    #[serde(default)]
    pub location_postal_code: Option<String>,
    #[serde(default)]
    pub location_country: Option<String>,
}

impl CampRequest {
    pub fn into_new_camp(self) -> NewCamp {
        let location = Location {
            venue_name: self.venue,
            address1: self.location_address1,
            address2: self.location_address2,
            address3: self.location_address3,
            city_town: self.location_city_town,
            state_province: self.location_state_province,
            postal_code: self.location_postal_code,
            country: self.location_country,
        };
        NewCamp {
            moniker: self.moniker,
            details: CampDetails {
                name: self.name,
                event_date: self.event_date,
                length: self.length,
                location,
            },
        }
    }
}

/// `{"speakerId": n}`; any other speaker fields in the body are ignored.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakerRef {
    pub speaker_id: SpeakerId,
}

/// Body of talk create and update.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TalkRequest {
    #[serde(default)]
    pub talk_id: Option<TalkId>,
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "abstract")]
    pub abstract_text: String,
    #[serde(default)]
    pub level: i32,
    #[serde(default)]
    pub speaker: Option<SpeakerRef>,
}

impl TalkRequest {
    pub fn details(&self) -> TalkDetails {
        TalkDetails {
            title: self.title.clone(),
            abstract_text: self.abstract_text.clone(),
            level: self.level,
        }
    }

    pub fn speaker_id(&self) -> Option<SpeakerId> {
        self.speaker.map(|s| s.speaker_id)
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCampsQuery {
    #[serde(default)]
    pub include_talks: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCampsQuery {
    pub the_date: String,
    #[serde(default)]
    pub include_talks: bool,
}

impl SearchCampsQuery {
    pub fn date(&self) -> Result<NaiveDate, ApiError> {
        parse_event_date(&self.the_date)
    }
}

/// Accepts `YYYY-MM-DD` (midnight) or a full `YYYY-MM-DDTHH:MM:SS` timestamp.
fn parse_date_time(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    raw.parse::<NaiveDateTime>().ok()
}

/// Calendar date of a `theDate` query value.
pub fn parse_event_date(raw: &str) -> Result<NaiveDate, ApiError> {
    parse_date_time(raw)
        .map(|dt| dt.date())
        .ok_or_else(|| ApiError::bad_request(format!("'{}' is not a valid date", raw.trim())))
}

fn lenient_event_date<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) => parse_date_time(&raw).map(Some).ok_or_else(|| {
            serde::de::Error::custom(format!("eventDate '{raw}' is not a valid date"))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codecamp_core::{CampId, TalkId};
    use serde_json::json;

    fn speaker() -> Speaker {
        Speaker {
            id: SpeakerId::new(1),
            first_name: "Shawn".into(),
            middle_name: None,
            last_name: "Wildermuth".into(),
            company: None,
            company_url: None,
            blog_url: None,
            twitter: Some("shawnwildermuth".into()),
            github: Some("shawnwildermuth".into()),
        }
    }

    #[test]
    fn camp_model_flattens_location_and_uses_camel_case() {
        let camp = Camp {
            id: CampId::new(7),
            moniker: "ATL2018".into(),
            name: "Atlanta Code Camp".into(),
            event_date: NaiveDate::from_ymd_opt(2018, 10, 18).and_then(|d| d.and_hms_opt(0, 0, 0)),
            length: 1,
            location: Location {
                venue_name: Some("Atlanta Convention Center".into()),
                city_town: Some("Atlanta".into()),
                ..Location::default()
            },
            talks: vec![Talk {
                id: TalkId::new(3),
                camp_id: CampId::new(7),
                title: "Entity Framework From Scratch".into(),
                abstract_text: "Working with Entity Framework from scratch".into(),
                level: 100,
                speaker: Some(speaker()),
            }],
        };

        let value = serde_json::to_value(CampModel::from(&camp)).unwrap();
        assert_eq!(value["moniker"], "ATL2018");
        assert_eq!(value["eventDate"], "2018-10-18T00:00:00");
        assert_eq!(value["venue"], "Atlanta Convention Center");
        assert_eq!(value["locationCityTown"], "Atlanta");
        assert_eq!(value["talks"][0]["talkId"], 3);
        assert_eq!(value["talks"][0]["abstract"], "Working with Entity Framework from scratch");
        assert_eq!(value["talks"][0]["speaker"]["speakerId"], 1);
        assert_eq!(value["talks"][0]["speaker"]["gitHub"], "shawnwildermuth");
        assert!(value.get("id").is_none());
    }

    #[test]
    fn camp_request_defaults_length_and_ignores_talks() {
        let body = json!({
            "moniker": "SD2021",
            "name": "Code Camp",
            "locationCityTown": "San Diego",
            "talks": [{ "title": "ignored" }]
        });
        let request: CampRequest = serde_json::from_value(body).unwrap();
        let new_camp = request.into_new_camp();
        assert_eq!(new_camp.moniker, "SD2021");
        assert_eq!(new_camp.details.length, 1);
        assert_eq!(new_camp.details.location.city_town.as_deref(), Some("San Diego"));
        assert!(new_camp.validate().is_ok());
    }

    #[test]
    fn camp_request_accepts_date_only_event_dates() {
        let midnight = NaiveDate::from_ymd_opt(2021, 6, 1).and_then(|d| d.and_hms_opt(0, 0, 0));

        let request: CampRequest =
            serde_json::from_value(json!({ "eventDate": "2021-06-01" })).unwrap();
        assert_eq!(request.event_date, midnight);

        let request: CampRequest =
            serde_json::from_value(json!({ "eventDate": "2021-06-01T00:00:00" })).unwrap();
        assert_eq!(request.event_date, midnight);

        let request: CampRequest = serde_json::from_value(json!({ "eventDate": null })).unwrap();
        assert_eq!(request.event_date, None);

        assert!(serde_json::from_value::<CampRequest>(json!({ "eventDate": "June 1st" })).is_err());
    }

    #[test]
    fn talk_request_reads_speaker_reference() {
        let body = json!({
            "talkId": 4,
            "title": "Async Rust",
            "abstract": "Futures, executors and pinning explained",
            "level": 300,
            "speaker": { "speakerId": 2, "firstName": "ignored" }
        });
        let request: TalkRequest = serde_json::from_value(body).unwrap();
        assert_eq!(request.talk_id, Some(TalkId::new(4)));
        assert_eq!(request.speaker_id(), Some(SpeakerId::new(2)));
        assert!(request.details().validate().is_ok());
    }

    #[test]
    fn talk_request_without_speaker_has_no_reference() {
        let request: TalkRequest = serde_json::from_value(json!({ "title": "x" })).unwrap();
        assert_eq!(request.speaker_id(), None);
        assert_eq!(request.talk_id, None);
    }

    #[test]
    fn event_dates_parse_with_or_without_time() {
        let expected = NaiveDate::from_ymd_opt(2018, 10, 18).unwrap();
        assert_eq!(parse_event_date("2018-10-18").unwrap(), expected);
        assert_eq!(parse_event_date("2018-10-18T09:30:00").unwrap(), expected);
        assert!(parse_event_date("18/10/2018").is_err());
        assert!(parse_event_date("").is_err());
    }
}
