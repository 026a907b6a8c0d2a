//! Demo data: two speakers and one camp with two talks.
//!
//! Speakers are managed outside the API, so backends load them directly. The
//! camp and its talks go through the `CampRepository` like any client write.

use chrono::NaiveDate;
use tracing::info;

use codecamp_core::{CampDetails, Location, NewCamp, NewTalk, Speaker, SpeakerId, TalkDetails};

use super::r#trait::{CampRepository, StoreResult};

pub const DEMO_MONIKER: &str = "ATL2018";

pub fn speakers() -> Vec<Speaker> {
    vec![
        Speaker {
            id: SpeakerId::new(1),
            first_name: "Shawn".to_string(),
            middle_name: None,
            last_name: "Wildermuth".to_string(),
            company: Some("Wilder Minds LLC".to_string()),
            company_url: Some("http://wilderminds.com".to_string()),
            blog_url: Some("http://wildermuth.com".to_string()),
            twitter: Some("shawnwildermuth".to_string()),
            github: Some("shawnwildermuth".to_string()),
        },
        Speaker {
            id: SpeakerId::new(2),
            first_name: "Resa".to_string(),
            middle_name: None,
            last_name: "Wildermuth".to_string(),
            company: Some("Wilder Minds LLC".to_string()),
            company_url: Some("http://wilderminds.com".to_string()),
            blog_url: Some("http://shawnandresa.com".to_string()),
            twitter: Some("resawildermuth".to_string()),
            github: Some("resawildermuth".to_string()),
        },
    ]
}

fn demo_camp() -> NewCamp {
    NewCamp {
        moniker: DEMO_MONIKER.to_string(),
        details: CampDetails {
            name: "Atlanta Code Camp".to_string(),
            event_date: NaiveDate::from_ymd_opt(2018, 10, 18).and_then(|d| d.and_hms_opt(0, 0, 0)),
            length: 1,
            location: Location {
                venue_name: Some("Atlanta Convention Center".to_string()),
                address1: Some("123 Main Street".to_string()),
                city_town: Some("Atlanta".to_string()),
                state_province: Some("GA".to_string()),
                postal_code: Some("12345".to_string()),
                country: Some("USA".to_string()),
                ..Location::default()
            },
        },
    }
}

fn demo_talks() -> Vec<(SpeakerId, TalkDetails)> {
    vec![
        (
            SpeakerId::new(1),
            TalkDetails {
                title: "Entity Framework From Scratch".to_string(),
                abstract_text: "Entity Framework from scratch in an hour. Probably cover it all"
                    .to_string(),
                level: 100,
            },
        ),
        (
            SpeakerId::new(2),
            TalkDetails {
                title: "Writing Sample Data Made Easy".to_string(),
                abstract_text: "Thinking of good sample data examples is tiring.".to_string(),
                level: 200,
            },
        ),
    ]
}

/// Insert the demo camp and its talks unless a camp with the demo moniker exists.
///
/// Expects `speakers()` to be loaded already.
pub async fn seed_demo_camp(repo: &dyn CampRepository) -> StoreResult<()> {
    if repo.find_camp(DEMO_MONIKER, false).await?.is_some() {
        return Ok(());
    }

    let camp = repo.insert_camp(demo_camp()).await?;
    for (speaker_id, details) in demo_talks() {
        repo.insert_talk(NewTalk {
            camp_id: camp.id,
            speaker_id,
            details,
        })
        .await?;
    }

    info!(moniker = DEMO_MONIKER, "seeded demo camp");
    Ok(())
}
