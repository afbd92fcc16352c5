//! The `horses` table: stable catalog and race records.

use sqlx::FromRow;

use anketnica_casino::StableStore;
use anketnica_types::{Horse, HorseId, HorseRecord, StoreError};

use crate::codec::{narrow, widen};
use crate::error::DbError;
use crate::sqlite::SqliteStore;

/// Row from `horses`.
#[derive(Debug, FromRow)]
pub(crate) struct HorseRow {
    id: i64,
    name: String,
    base_speed: i64,
    base_stamina: i64,
    base_luck: i64,
    description: String,
    total_races: i64,
    wins: i64,
    second_places: i64,
    third_places: i64,
    total_winnings: i64,
}

const ENTITY: &str = "horses";

impl HorseRow {
    fn horse(&self) -> Result<Horse, DbError> {
        Ok(Horse {
            id: HorseId::new(self.id),
            name: self.name.clone(),
            base_speed: narrow(ENTITY, "base_speed", self.base_speed)?,
            base_stamina: narrow(ENTITY, "base_stamina", self.base_stamina)?,
            base_luck: narrow(ENTITY, "base_luck", self.base_luck)?,
            description: self.description.clone(),
        })
    }

    fn record(&self) -> Result<HorseRecord, DbError> {
        Ok(HorseRecord {
            horse_id: HorseId::new(self.id),
            total_races: narrow(ENTITY, "total_races", self.total_races)?,
            wins: narrow(ENTITY, "wins", self.wins)?,
            second_places: narrow(ENTITY, "second_places", self.second_places)?,
            third_places: narrow(ENTITY, "third_places", self.third_places)?,
            total_winnings: narrow(ENTITY, "total_winnings", self.total_winnings)?,
        })
    }
}

impl SqliteStore {
    /// Every horse, by id.
    pub async fn list_horses(&self) -> Result<Vec<Horse>, DbError> {
        let rows = sqlx::query_as::<_, HorseRow>("SELECT * FROM horses ORDER BY id")
            .fetch_all(self.pool())
            .await?;
        rows.iter().map(HorseRow::horse).collect()
    }

    /// Race record of one horse.
    pub async fn get_horse_record(&self, id: HorseId) -> Result<HorseRecord, DbError> {
        let row = sqlx::query_as::<_, HorseRow>("SELECT * FROM horses WHERE id = ?")
            .bind(id.into_inner())
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DbError::not_found("horse", id))?;
        row.record()
    }

    /// Add race tallies onto the stored records in one transaction.
    pub async fn increment_horse_records(&self, tallies: &[HorseRecord]) -> Result<(), DbError> {
        let mut tx = self.pool().begin().await?;
        for tally in tallies {
            let result = sqlx::query(
                r"UPDATE horses
                  SET total_races = total_races + ?,
                      wins = wins + ?,
                      second_places = second_places + ?,
                      third_places = third_places + ?,
                      total_winnings = total_winnings + ?
                  WHERE id = ?",
            )
            .bind(i64::from(tally.total_races))
            .bind(i64::from(tally.wins))
            .bind(i64::from(tally.second_places))
            .bind(i64::from(tally.third_places))
            .bind(widen(tally.total_winnings))
            .bind(tally.horse_id.into_inner())
            .execute(&mut *tx)
            .await?;
            if result.rows_affected() == 0 {
                return Err(DbError::not_found("horse", tally.horse_id));
            }
        }
        tx.commit().await?;
        Ok(())
    }
}

impl StableStore for SqliteStore {
    async fn horses(&self) -> Result<Vec<Horse>, StoreError> {
        Ok(self.list_horses().await?)
    }

    async fn horse_record(&self, horse: HorseId) -> Result<HorseRecord, StoreError> {
        Ok(self.get_horse_record(horse).await?)
    }

    async fn record_race(&self, tallies: &[HorseRecord]) -> Result<(), StoreError> {
        Ok(self.increment_horse_records(tallies).await?)
    }
}
