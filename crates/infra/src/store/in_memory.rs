use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::NaiveDate;

use codecamp_core::{Camp, CampId, Entity, NewCamp, NewTalk, Speaker, SpeakerId, Talk, TalkId};

use super::r#trait::{CampRepository, StoreError, StoreResult};

/// Rows of one entity type keyed by id, with a serial id allocator.
#[derive(Debug)]
struct Table<E: Entity> {
    rows: BTreeMap<E::Id, E>,
    last_id: i64,
}

impl<E> Table<E>
where
    E: Entity + Clone,
    E::Id: Into<i64>,
{
    fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
            last_id: 0,
        }
    }

    fn allocate_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    /// Insert or overwrite; keeps the allocator ahead of explicitly chosen ids.
    fn put(&mut self, row: E) {
        let id = row.id();
        self.last_id = self.last_id.max(id.into());
        self.rows.insert(id, row);
    }

    /// Overwrite an existing row. Returns false if there was nothing to overwrite.
    fn replace(&mut self, row: E) -> bool {
        match self.rows.get_mut(&row.id()) {
            Some(slot) => {
                *slot = row;
                true
            }
            None => false,
        }
    }

    fn get(&self, id: E::Id) -> Option<&E> {
        self.rows.get(&id)
    }

    fn remove(&mut self, id: E::Id) -> Option<E> {
        self.rows.remove(&id)
    }

    fn values(&self) -> impl Iterator<Item = &E> {
        self.rows.values()
    }
}

#[derive(Debug)]
struct Tables {
    /// Camps are stored without talks; talks are attached on read.
    camps: Table<Camp>,
    talks: Table<Talk>,
    speakers: Table<Speaker>,
}

impl Tables {
    fn camp_by_moniker(&self, moniker: &str) -> Option<&Camp> {
        self.camps.values().find(|c| c.moniker == moniker)
    }

    fn talks_of(&self, camp_id: CampId) -> Vec<Talk> {
        self.talks
            .values()
            .filter(|t| t.camp_id == camp_id)
            .cloned()
            .collect()
    }

    fn hydrate(&self, camp: &Camp, include_talks: bool) -> Camp {
        let mut camp = camp.clone();
        if include_talks {
            camp.talks = self.talks_of(camp.id);
        }
        camp
    }

    fn camps_where(&self, include_talks: bool, keep: impl Fn(&Camp) -> bool) -> Vec<Camp> {
        let mut camps: Vec<Camp> = self
            .camps
            .values()
            .filter(|c| keep(c))
            .map(|c| self.hydrate(c, include_talks))
            .collect();
        // Most recent first; undated camps sort last.
        camps.sort_by_key(|c| (c.event_date.is_none(), Reverse(c.event_date), c.id));
        camps
    }
}

/// In-memory camp repository.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug)]
pub struct InMemoryCampRepository {
    tables: RwLock<Tables>,
}

impl InMemoryCampRepository {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables {
                camps: Table::new(),
                talks: Table::new(),
                speakers: Table::new(),
            }),
        }
    }

    /// Register speakers (they are managed outside the API, so there is no trait method for this).
    pub fn with_speakers(self, speakers: impl IntoIterator<Item = Speaker>) -> Self {
        if let Ok(mut tables) = self.tables.write() {
            for speaker in speakers {
                tables.speakers.put(speaker);
            }
        }
        self
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }
}

impl Default for InMemoryCampRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CampRepository for InMemoryCampRepository {
    async fn list_camps(&self, include_talks: bool) -> StoreResult<Vec<Camp>> {
        Ok(self.read()?.camps_where(include_talks, |_| true))
    }

    async fn find_camp(&self, moniker: &str, include_talks: bool) -> StoreResult<Option<Camp>> {
        let tables = self.read()?;
        Ok(tables
            .camp_by_moniker(moniker)
            .map(|c| tables.hydrate(c, include_talks)))
    }

    async fn camps_on_date(&self, date: NaiveDate, include_talks: bool) -> StoreResult<Vec<Camp>> {
        Ok(self
            .read()?
            .camps_where(include_talks, |c| c.takes_place_on(date)))
    }

    async fn insert_camp(&self, camp: NewCamp) -> StoreResult<Camp> {
        let mut tables = self.write()?;
        if tables.camp_by_moniker(&camp.moniker).is_some() {
            return Err(StoreError::Duplicate(format!(
                "camp moniker '{}' already exists",
                camp.moniker
            )));
        }
        let id = CampId::new(tables.camps.allocate_id());
        let stored = Camp::from_new(id, camp);
        tables.camps.put(stored.clone());
        Ok(stored)
    }

    async fn update_camp(&self, camp: &Camp) -> StoreResult<()> {
        let mut row = camp.clone();
        row.talks.clear();
        if self.write()?.camps.replace(row) {
            Ok(())
        } else {
            Err(StoreError::NothingSaved(format!("update of camp {}", camp.id)))
        }
    }

    async fn delete_camp(&self, id: CampId) -> StoreResult<()> {
        let mut tables = self.write()?;
        if tables.camps.remove(id).is_none() {
            return Err(StoreError::NothingSaved(format!("delete of camp {id}")));
        }
        // Cascade to the camp's talks.
        tables.talks.rows.retain(|_, t| t.camp_id != id);
        Ok(())
    }

    async fn talks_for_camp(&self, moniker: &str) -> StoreResult<Vec<Talk>> {
        let tables = self.read()?;
        Ok(tables
            .camp_by_moniker(moniker)
            .map(|c| tables.talks_of(c.id))
            .unwrap_or_default())
    }

    async fn find_talk(&self, moniker: &str, id: TalkId) -> StoreResult<Option<Talk>> {
        let tables = self.read()?;
        let Some(camp) = tables.camp_by_moniker(moniker) else {
            return Ok(None);
        };
        Ok(tables
            .talks
            .get(id)
            .filter(|t| t.camp_id == camp.id)
            .cloned())
    }

    async fn insert_talk(&self, talk: NewTalk) -> StoreResult<Talk> {
        let mut tables = self.write()?;
        if tables.camps.get(talk.camp_id).is_none() {
            return Err(StoreError::MissingReference(format!("camp {}", talk.camp_id)));
        }
        let speaker = tables
            .speakers
            .get(talk.speaker_id)
            .cloned()
            .ok_or_else(|| StoreError::MissingReference(format!("speaker {}", talk.speaker_id)))?;

        let id = TalkId::new(tables.talks.allocate_id());
        let stored = Talk {
            id,
            camp_id: talk.camp_id,
            title: talk.details.title,
            abstract_text: talk.details.abstract_text,
            level: talk.details.level,
            speaker: Some(speaker),
        };
        tables.talks.put(stored.clone());
        Ok(stored)
    }

    async fn update_talk(&self, talk: &Talk) -> StoreResult<()> {
        let mut tables = self.write()?;
        // Re-resolve the speaker so the stored link never points at a stale copy.
        let speaker = match talk.speaker_id() {
            Some(speaker_id) => Some(tables.speakers.get(speaker_id).cloned().ok_or_else(|| {
                StoreError::MissingReference(format!("speaker {speaker_id}"))
            })?),
            None => None,
        };
        let row = Talk {
            speaker,
            ..talk.clone()
        };
        if tables.talks.replace(row) {
            Ok(())
        } else {
            Err(StoreError::NothingSaved(format!("update of talk {}", talk.id)))
        }
    }

    async fn delete_talk(&self, id: TalkId) -> StoreResult<()> {
        match self.write()?.talks.remove(id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NothingSaved(format!("delete of talk {id}"))),
        }
    }

    async fn find_speaker(&self, id: SpeakerId) -> StoreResult<Option<Speaker>> {
        Ok(self.read()?.speakers.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use codecamp_core::{CampDetails, Location, TalkDetails};

    fn speaker(id: i64, first: &str) -> Speaker {
        Speaker {
            id: SpeakerId::new(id),
            first_name: first.to_string(),
            middle_name: None,
            last_name: "Tester".to_string(),
            company: None,
            company_url: None,
            blog_url: None,
            twitter: None,
            github: None,
        }
    }

    fn repo() -> InMemoryCampRepository {
        InMemoryCampRepository::new().with_speakers([speaker(1, "Ada"), speaker(2, "Grace")])
    }

    fn new_camp(moniker: &str, date: Option<(i32, u32, u32)>) -> NewCamp {
        NewCamp {
            moniker: moniker.to_string(),
            details: CampDetails {
                name: format!("{moniker} camp"),
                event_date: date.and_then(|(y, m, d)| {
                    NaiveDate::from_ymd_opt(y, m, d).and_then(|d| d.and_hms_opt(0, 0, 0))
                }),
                length: 1,
                location: Location::default(),
            },
        }
    }

    fn new_talk(camp_id: CampId, speaker_id: i64) -> NewTalk {
        NewTalk {
            camp_id,
            speaker_id: SpeakerId::new(speaker_id),
            details: TalkDetails {
                title: "Ownership in practice".to_string(),
                abstract_text: "Borrowing rules explained with real code.".to_string(),
                level: 200,
            },
        }
    }

    #[tokio::test]
    async fn insert_camp_rejects_duplicate_moniker() {
        let repo = repo();
        repo.insert_camp(new_camp("SD2021", None)).await.unwrap();

        let err = repo.insert_camp(new_camp("SD2021", None)).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
        assert_eq!(repo.list_camps(false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn list_orders_by_event_date_descending() {
        let repo = repo();
        repo.insert_camp(new_camp("OLD", Some((2018, 1, 1)))).await.unwrap();
        repo.insert_camp(new_camp("NODATE", None)).await.unwrap();
        repo.insert_camp(new_camp("NEW", Some((2021, 6, 1)))).await.unwrap();

        let monikers: Vec<String> = repo
            .list_camps(false)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.moniker)
            .collect();
        assert_eq!(monikers, vec!["NEW", "OLD", "NODATE"]);
    }

    #[tokio::test]
    async fn talks_are_attached_only_when_requested() {
        let repo = repo();
        let camp = repo.insert_camp(new_camp("SD2021", None)).await.unwrap();
        repo.insert_talk(new_talk(camp.id, 1)).await.unwrap();

        let bare = repo.find_camp("SD2021", false).await.unwrap().unwrap();
        assert!(bare.talks.is_empty());

        let full = repo.find_camp("SD2021", true).await.unwrap().unwrap();
        assert_eq!(full.talks.len(), 1);
        assert_eq!(full.talks[0].speaker_id(), Some(SpeakerId::new(1)));
    }

    #[tokio::test]
    async fn camps_on_date_matches_calendar_day() {
        let repo = repo();
        repo.insert_camp(new_camp("A", Some((2018, 10, 18)))).await.unwrap();
        repo.insert_camp(new_camp("B", Some((2018, 10, 19)))).await.unwrap();

        let day = NaiveDate::from_ymd_opt(2018, 10, 18).unwrap();
        let found = repo.camps_on_date(day, false).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].moniker, "A");
    }

    #[tokio::test]
    async fn delete_camp_cascades_to_talks() {
        let repo = repo();
        let camp = repo.insert_camp(new_camp("SD2021", None)).await.unwrap();
        let talk = repo.insert_talk(new_talk(camp.id, 1)).await.unwrap();

        repo.delete_camp(camp.id).await.unwrap();

        assert!(repo.find_camp("SD2021", false).await.unwrap().is_none());
        assert!(repo.tables.read().unwrap().talks.get(talk.id).is_none());
    }

    #[tokio::test]
    async fn writes_to_missing_rows_report_nothing_saved() {
        let repo = repo();
        let camp = repo.insert_camp(new_camp("SD2021", None)).await.unwrap();
        repo.delete_camp(camp.id).await.unwrap();

        assert!(matches!(
            repo.update_camp(&camp).await,
            Err(StoreError::NothingSaved(_))
        ));
        assert!(matches!(
            repo.delete_camp(camp.id).await,
            Err(StoreError::NothingSaved(_))
        ));
        assert!(matches!(
            repo.delete_talk(TalkId::new(99)).await,
            Err(StoreError::NothingSaved(_))
        ));
    }

    #[tokio::test]
    async fn insert_talk_requires_known_speaker() {
        let repo = repo();
        let camp = repo.insert_camp(new_camp("SD2021", None)).await.unwrap();

        let err = repo.insert_talk(new_talk(camp.id, 42)).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingReference(_)));
        assert!(repo.talks_for_camp("SD2021").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn find_talk_is_scoped_to_its_camp() {
        let repo = repo();
        let a = repo.insert_camp(new_camp("A", None)).await.unwrap();
        repo.insert_camp(new_camp("B", None)).await.unwrap();
        let talk = repo.insert_talk(new_talk(a.id, 1)).await.unwrap();

        assert!(repo.find_talk("A", talk.id).await.unwrap().is_some());
        assert!(repo.find_talk("B", talk.id).await.unwrap().is_none());
        assert!(repo.find_talk("missing", talk.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_talk_relinks_speaker() {
        let repo = repo();
        let camp = repo.insert_camp(new_camp("SD2021", None)).await.unwrap();
        let mut talk = repo.insert_talk(new_talk(camp.id, 1)).await.unwrap();

        talk.speaker = repo.find_speaker(SpeakerId::new(2)).await.unwrap();
        repo.update_talk(&talk).await.unwrap();

        let stored = repo.find_talk("SD2021", talk.id).await.unwrap().unwrap();
        assert_eq!(stored.speaker.map(|s| s.first_name), Some("Grace".to_string()));
    }
}
