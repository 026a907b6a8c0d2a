//! Postgres-backed camp repository.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `StoreError` as follows:
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `Duplicate` | Concurrent create with the same moniker |
//! | Database (foreign key violation) | `23503` | `MissingReference` | Camp or speaker removed before the talk insert |
//! | Database (other) | Any other | `Backend` | Constraint/type errors |
//! | Anything else | N/A | `Backend` | Pool closed, network errors, decode failures |
//!
//! Zero affected rows on `UPDATE`/`DELETE` is reported as `NothingSaved`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::postgres::{PgArguments, PgPool, PgRow};
use sqlx::query::Query;
use sqlx::{FromRow, Postgres, Row};
use tracing::instrument;

use codecamp_core::{Camp, CampId, Location, NewCamp, NewTalk, Speaker, SpeakerId, Talk, TalkId};

use super::r#trait::{CampRepository, StoreError, StoreResult};

/// Schema bootstrap, applied statement by statement on startup.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS speakers (
        speaker_id  BIGINT PRIMARY KEY,
        first_name  TEXT NOT NULL,
        middle_name TEXT NULL,
        last_name   TEXT NOT NULL,
        company     TEXT NULL,
        company_url TEXT NULL,
        blog_url    TEXT NULL,
        twitter     TEXT NULL,
        github      TEXT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS camps (
        camp_id        BIGSERIAL PRIMARY KEY,
        moniker        TEXT NOT NULL UNIQUE,
        name           TEXT NOT NULL,
        event_date     TIMESTAMP NULL,
        length         INTEGER NOT NULL DEFAULT 1,
        venue_name     TEXT NULL,
        address1       TEXT NULL,
        address2       TEXT NULL,
        address3       TEXT NULL,
        city_town      TEXT NULL,
        state_province TEXT NULL,
        postal_code    TEXT NULL,
        country        TEXT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS talks (
        talk_id    BIGSERIAL PRIMARY KEY,
        camp_id    BIGINT NOT NULL REFERENCES camps (camp_id) ON DELETE CASCADE,
        speaker_id BIGINT NULL REFERENCES speakers (speaker_id),
        title      TEXT NOT NULL,
        abstract   TEXT NOT NULL,
        level      INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS talks_camp_id_idx ON talks (camp_id)",
];

const CAMP_SELECT: &str = r#"
    SELECT
        camp_id, moniker, name, event_date, length,
        venue_name, address1, address2, address3,
        city_town, state_province, postal_code, country
    FROM camps
"#;

const CAMP_ORDER: &str = "ORDER BY event_date DESC NULLS LAST, camp_id ASC";

const TALK_SELECT: &str = r#"
    SELECT
        t.talk_id, t.camp_id, t.title, t.abstract, t.level,
        s.speaker_id, s.first_name, s.middle_name, s.last_name,
        s.company, s.company_url, s.blog_url, s.twitter, s.github
    FROM talks t
    JOIN camps c ON c.camp_id = t.camp_id
    LEFT JOIN speakers s ON s.speaker_id = t.speaker_id
"#;

/// Postgres-backed camp repository.
///
/// Uses the SQLx connection pool, which is `Send + Sync`. Every operation is a
/// single statement (or a read followed by reads), so no explicit transactions
/// are opened; the talk cascade on camp delete is enforced by the schema.
#[derive(Debug, Clone)]
pub struct PostgresCampRepository {
    pool: Arc<PgPool>,
}

impl PostgresCampRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect and make sure the schema exists.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let repo = Self::new(pool);
        repo.ensure_schema().await?;
        Ok(repo)
    }

    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }

    /// Load externally managed speakers. Existing ids are left untouched.
    #[instrument(skip(self, speakers), fields(count = speakers.len()), err)]
    pub async fn load_speakers(&self, speakers: &[Speaker]) -> StoreResult<()> {
        for s in speakers {
            sqlx::query(
                r#"
                INSERT INTO speakers (
                    speaker_id, first_name, middle_name, last_name,
                    company, company_url, blog_url, twitter, github
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ON CONFLICT (speaker_id) DO NOTHING
                "#,
            )
            .bind(s.id.get())
            .bind(&s.first_name)
            .bind(&s.middle_name)
            .bind(&s.last_name)
            .bind(&s.company)
            .bind(&s.company_url)
            .bind(&s.blog_url)
            .bind(&s.twitter)
            .bind(&s.github)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("load_speakers", e))?;
        }
        Ok(())
    }

    async fn fetch_camps(
        &self,
        operation: &str,
        query: Query<'_, Postgres, PgArguments>,
        include_talks: bool,
    ) -> StoreResult<Vec<Camp>> {
        let rows = query
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;

        let mut camps = Vec::with_capacity(rows.len());
        for row in rows {
            camps.push(Camp::from(CampRow::from_row(&row).map_err(decode_error)?));
        }
        if include_talks {
            self.attach_talks(&mut camps).await?;
        }
        Ok(camps)
    }

    async fn attach_talks(&self, camps: &mut [Camp]) -> StoreResult<()> {
        if camps.is_empty() {
            return Ok(());
        }
        let ids: Vec<i64> = camps.iter().map(|c| c.id.get()).collect();
        let sql = format!("{TALK_SELECT} WHERE t.camp_id = ANY($1) ORDER BY t.talk_id ASC");
        let mut by_camp: HashMap<CampId, Vec<Talk>> = HashMap::new();
        for talk in self.fetch_talks("attach_talks", sqlx::query(&sql).bind(ids)).await? {
            by_camp.entry(talk.camp_id).or_default().push(talk);
        }
        for camp in camps.iter_mut() {
            camp.talks = by_camp.remove(&camp.id).unwrap_or_default();
        }
        Ok(())
    }

    async fn fetch_talks(
        &self,
        operation: &str,
        query: Query<'_, Postgres, PgArguments>,
    ) -> StoreResult<Vec<Talk>> {
        let rows = query
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;

        let mut talks = Vec::with_capacity(rows.len());
        for row in rows {
            talks.push(Talk::from(TalkRow::from_row(&row).map_err(decode_error)?));
        }
        Ok(talks)
    }

    async fn talk_by_id(&self, id: TalkId) -> StoreResult<Option<Talk>> {
        let sql = format!("{TALK_SELECT} WHERE t.talk_id = $1");
        let mut talks = self
            .fetch_talks("talk_by_id", sqlx::query(&sql).bind(id.get()))
            .await?;
        Ok(talks.pop())
    }
}

#[async_trait]
impl CampRepository for PostgresCampRepository {
    #[instrument(skip(self), err)]
    async fn list_camps(&self, include_talks: bool) -> StoreResult<Vec<Camp>> {
        let sql = format!("{CAMP_SELECT} {CAMP_ORDER}");
        self.fetch_camps("list_camps", sqlx::query(&sql), include_talks)
            .await
    }

    #[instrument(skip(self), err)]
    async fn find_camp(&self, moniker: &str, include_talks: bool) -> StoreResult<Option<Camp>> {
        let sql = format!("{CAMP_SELECT} WHERE moniker = $1");
        let mut camps = self
            .fetch_camps("find_camp", sqlx::query(&sql).bind(moniker), include_talks)
            .await?;
        Ok(camps.pop())
    }

    #[instrument(skip(self), err)]
    async fn camps_on_date(&self, date: NaiveDate, include_talks: bool) -> StoreResult<Vec<Camp>> {
        let sql = format!("{CAMP_SELECT} WHERE event_date::date = $1 {CAMP_ORDER}");
        self.fetch_camps("camps_on_date", sqlx::query(&sql).bind(date), include_talks)
            .await
    }

    #[instrument(skip(self, camp), fields(moniker = %camp.moniker), err)]
    async fn insert_camp(&self, camp: NewCamp) -> StoreResult<Camp> {
        let query = sqlx::query(
            r#"
            INSERT INTO camps (
                moniker, name, event_date, length,
                venue_name, address1, address2, address3,
                city_town, state_province, postal_code, country
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING camp_id
            "#,
        )
        .bind(&camp.moniker)
        .bind(&camp.details.name)
        .bind(camp.details.event_date)
        .bind(camp.details.length);

        let row = bind_location(query, &camp.details.location)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_camp", e))?;
        let id: i64 = row.try_get("camp_id").map_err(decode_error)?;

        Ok(Camp::from_new(CampId::new(id), camp))
    }

    #[instrument(skip(self, camp), fields(camp_id = %camp.id), err)]
    async fn update_camp(&self, camp: &Camp) -> StoreResult<()> {
        let query = sqlx::query(
            r#"
            UPDATE camps SET
                name = $2,
                event_date = $3,
                length = $4,
                venue_name = $5,
                address1 = $6,
                address2 = $7,
                address3 = $8,
                city_town = $9,
                state_province = $10,
                postal_code = $11,
                country = $12
            WHERE camp_id = $1
            "#,
        )
        .bind(camp.id.get())
        .bind(&camp.name)
        .bind(camp.event_date)
        .bind(camp.length);

        let result = bind_location(query, &camp.location)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_camp", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NothingSaved(format!("update of camp {}", camp.id)));
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn delete_camp(&self, id: CampId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM camps WHERE camp_id = $1")
            .bind(id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_camp", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NothingSaved(format!("delete of camp {id}")));
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn talks_for_camp(&self, moniker: &str) -> StoreResult<Vec<Talk>> {
        let sql = format!("{TALK_SELECT} WHERE c.moniker = $1 ORDER BY t.talk_id ASC");
        self.fetch_talks("talks_for_camp", sqlx::query(&sql).bind(moniker))
            .await
    }

    #[instrument(skip(self), err)]
    async fn find_talk(&self, moniker: &str, id: TalkId) -> StoreResult<Option<Talk>> {
        let sql = format!("{TALK_SELECT} WHERE c.moniker = $1 AND t.talk_id = $2");
        let mut talks = self
            .fetch_talks("find_talk", sqlx::query(&sql).bind(moniker).bind(id.get()))
            .await?;
        Ok(talks.pop())
    }

    #[instrument(skip(self, talk), fields(camp_id = %talk.camp_id, speaker_id = %talk.speaker_id), err)]
    async fn insert_talk(&self, talk: NewTalk) -> StoreResult<Talk> {
        let row = sqlx::query(
            r#"
            INSERT INTO talks (camp_id, speaker_id, title, abstract, level)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING talk_id
            "#,
        )
        .bind(talk.camp_id.get())
        .bind(talk.speaker_id.get())
        .bind(&talk.details.title)
        .bind(&talk.details.abstract_text)
        .bind(talk.details.level)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_talk", e))?;
        let id = TalkId::new(row.try_get("talk_id").map_err(decode_error)?);

        // Read back so the speaker comes out resolved.
        self.talk_by_id(id)
            .await?
            .ok_or_else(|| StoreError::NothingSaved(format!("insert of talk {id}")))
    }

    #[instrument(skip(self, talk), fields(talk_id = %talk.id), err)]
    async fn update_talk(&self, talk: &Talk) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE talks SET
                title = $2,
                abstract = $3,
                level = $4,
                speaker_id = $5
            WHERE talk_id = $1
            "#,
        )
        .bind(talk.id.get())
        .bind(&talk.title)
        .bind(&talk.abstract_text)
        .bind(talk.level)
        .bind(talk.speaker_id().map(SpeakerId::get))
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_talk", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NothingSaved(format!("update of talk {}", talk.id)));
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn delete_talk(&self, id: TalkId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM talks WHERE talk_id = $1")
            .bind(id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_talk", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NothingSaved(format!("delete of talk {id}")));
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn find_speaker(&self, id: SpeakerId) -> StoreResult<Option<Speaker>> {
        let row = sqlx::query(
            r#"
            SELECT
                speaker_id, first_name, middle_name, last_name,
                company, company_url, blog_url, twitter, github
            FROM speakers
            WHERE speaker_id = $1
            "#,
        )
        .bind(id.get())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_speaker", e))?;

        match row {
            Some(row) => Ok(SpeakerRow::from_row(&row).map_err(decode_error)?.into_speaker()),
            None => Ok(None),
        }
    }
}

fn bind_location<'q>(
    query: Query<'q, Postgres, PgArguments>,
    location: &'q Location,
) -> Query<'q, Postgres, PgArguments> {
    query
        .bind(&location.venue_name)
        .bind(&location.address1)
        .bind(&location.address2)
        .bind(&location.address3)
        .bind(&location.city_town)
        .bind(&location.state_province)
        .bind(&location.postal_code)
        .bind(&location.country)
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Duplicate(msg),
                Some("23503") => StoreError::MissingReference(msg),
                _ => StoreError::Backend(msg),
            }
        }
        other => StoreError::Backend(format!("{operation}: {other}")),
    }
}

fn decode_error(err: sqlx::Error) -> StoreError {
    StoreError::Backend(format!("failed to decode row: {err}"))
}

// SQLx row types

#[derive(Debug)]
struct CampRow {
    camp_id: i64,
    moniker: String,
    name: String,
    event_date: Option<NaiveDateTime>,
    length: i32,
    location: Location,
}

impl<'r> FromRow<'r, PgRow> for CampRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(CampRow {
            camp_id: row.try_get("camp_id")?,
            moniker: row.try_get("moniker")?,
            name: row.try_get("name")?,
            event_date: row.try_get("event_date")?,
            length: row.try_get("length")?,
            location: Location {
                venue_name: row.try_get("venue_name")?,
                address1: row.try_get("address1")?,
                address2: row.try_get("address2")?,
                address3: row.try_get("address3")?,
                city_town: row.try_get("city_town")?,
                state_province: row.try_get("state_province")?,
                postal_code: row.try_get("postal_code")?,
                country: row.try_get("country")?,
            },
        })
    }
}

impl From<CampRow> for Camp {
    fn from(row: CampRow) -> Self {
        Camp {
            id: CampId::new(row.camp_id),
            moniker: row.moniker,
            name: row.name,
            event_date: row.event_date,
            length: row.length,
            location: row.location,
            talks: Vec::new(),
        }
    }
}

/// Speaker columns; all nullable because talks reach them through a LEFT JOIN.
#[derive(Debug)]
struct SpeakerRow {
    speaker_id: Option<i64>,
    first_name: Option<String>,
    middle_name: Option<String>,
    last_name: Option<String>,
    company: Option<String>,
    company_url: Option<String>,
    blog_url: Option<String>,
    twitter: Option<String>,
    github: Option<String>,
}

impl SpeakerRow {
    fn into_speaker(self) -> Option<Speaker> {
        Some(Speaker {
            id: SpeakerId::new(self.speaker_id?),
            first_name: self.first_name.unwrap_or_default(),
            middle_name: self.middle_name,
            last_name: self.last_name.unwrap_or_default(),
            company: self.company,
            company_url: self.company_url,
            blog_url: self.blog_url,
            twitter: self.twitter,
            github: self.github,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for SpeakerRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(SpeakerRow {
            speaker_id: row.try_get("speaker_id")?,
            first_name: row.try_get("first_name")?,
            middle_name: row.try_get("middle_name")?,
            last_name: row.try_get("last_name")?,
            company: row.try_get("company")?,
            company_url: row.try_get("company_url")?,
            blog_url: row.try_get("blog_url")?,
            twitter: row.try_get("twitter")?,
            github: row.try_get("github")?,
        })
    }
}

#[derive(Debug)]
struct TalkRow {
    talk_id: i64,
    camp_id: i64,
    title: String,
    abstract_text: String,
    level: i32,
    speaker: SpeakerRow,
}

impl<'r> FromRow<'r, PgRow> for TalkRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(TalkRow {
            talk_id: row.try_get("talk_id")?,
            camp_id: row.try_get("camp_id")?,
            title: row.try_get("title")?,
            abstract_text: row.try_get("abstract")?,
            level: row.try_get("level")?,
            speaker: SpeakerRow::from_row(row)?,
        })
    }
}

impl From<TalkRow> for Talk {
    fn from(row: TalkRow) -> Self {
        Talk {
            id: TalkId::new(row.talk_id),
            camp_id: CampId::new(row.camp_id),
            title: row.title,
            abstract_text: row.abstract_text,
            level: row.level,
            speaker: row.speaker.into_speaker(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codecamp_core::{CampDetails, TalkDetails};

    fn empty_speaker_row() -> SpeakerRow {
        SpeakerRow {
            speaker_id: None,
            first_name: None,
            middle_name: None,
            last_name: None,
            company: None,
            company_url: None,
            blog_url: None,
            twitter: None,
            github: None,
        }
    }

    #[test]
    fn speaker_row_without_id_is_no_speaker() {
        assert_eq!(empty_speaker_row().into_speaker(), None);
    }

    #[test]
    fn speaker_row_with_id_becomes_speaker() {
        let row = SpeakerRow {
            speaker_id: Some(2),
            first_name: Some("Resa".to_string()),
            last_name: Some("Wildermuth".to_string()),
            twitter: Some("resawildermuth".to_string()),
            ..empty_speaker_row()
        };
        let speaker = row.into_speaker().unwrap();
        assert_eq!(speaker.id, SpeakerId::new(2));
        assert_eq!(speaker.first_name, "Resa");
        assert_eq!(speaker.company, None);
    }

    #[test]
    fn talk_row_keeps_unlinked_speaker_empty() {
        let talk = Talk::from(TalkRow {
            talk_id: 5,
            camp_id: 1,
            title: "Orphaned".to_string(),
            abstract_text: "A talk whose speaker link was cleared".to_string(),
            level: 100,
            speaker: empty_speaker_row(),
        });
        assert_eq!(talk.id, TalkId::new(5));
        assert_eq!(talk.speaker_id(), None);
    }

    #[test]
    fn non_database_errors_are_backend_failures() {
        let err = map_sqlx_error("list_camps", sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Backend(msg) if msg.starts_with("list_camps")));
    }

    async fn connect() -> PostgresCampRepository {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        PostgresCampRepository::connect(&url).await.unwrap()
    }

    fn unique_moniker() -> String {
        let micros = chrono::Utc::now().timestamp_micros();
        format!("PG{}", micros % 1_000_000_000_000)
    }

    fn new_camp(moniker: &str) -> NewCamp {
        NewCamp {
            moniker: moniker.to_string(),
            details: CampDetails {
                name: "Postgres Camp".to_string(),
                event_date: None,
                length: 1,
                location: Location::default(),
            },
        }
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn unique_violation_maps_to_duplicate() {
        let repo = connect().await;
        let moniker = unique_moniker();
        let camp = repo.insert_camp(new_camp(&moniker)).await.unwrap();

        let err = repo.insert_camp(new_camp(&moniker)).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));

        repo.delete_camp(camp.id).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn foreign_key_violation_maps_to_missing_reference() {
        let repo = connect().await;
        let camp = repo.insert_camp(new_camp(&unique_moniker())).await.unwrap();

        let err = repo
            .insert_talk(NewTalk {
                camp_id: camp.id,
                speaker_id: SpeakerId::new(i64::MAX),
                details: TalkDetails {
                    title: "Nobody".to_string(),
                    abstract_text: "A talk pointing at a speaker that does not exist".to_string(),
                    level: 100,
                },
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingReference(_)));

        repo.delete_camp(camp.id).await.unwrap();
        assert!(matches!(
            repo.delete_camp(camp.id).await,
            Err(StoreError::NothingSaved(_))
        ));
    }
}
