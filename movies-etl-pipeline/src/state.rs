//! Persisted pipeline cursor.
//!
//! The cursor is one flat record of string fields kept in a [`StateStorage`].
//! Every write reads the record back first, so a quit flag set by an
//! operator while the pipeline runs is never overwritten.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use movies_etl_repository::{StateError, StateStorage};
use movies_etl_shared::{FamilyKind, Watermark};

/// Run/stop flag: `"0"` runs, `"1"` stops after the current cycle.
pub const QUIT_KEY: &str = "quit";
/// Inclusive watermark of the current cycle.
pub const DATETIME_KEY: &str = "datetime";
/// Pagination offset inside the family being drained.
pub const OFFSET_KEY: &str = "offset";
/// Extraction page size.
pub const BATCH_KEY: &str = "batch";
/// Family being drained, kept for crash-resume.
pub const FAMILY_KEY: &str = "family";
/// Candidate watermark of the current cycle, kept for crash-resume.
pub const CANDIDATE_KEY: &str = "candidate";

const RUN: &str = "0";
const STOP: &str = "1";

/// Where an interrupted cycle left off.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResumePoint {
    pub family: FamilyKind,
    pub candidate: Watermark,
    pub offset: i64,
}

/// Cursor over the persisted state record.
#[derive(Clone)]
pub struct State {
    storage: Arc<dyn StateStorage>,
}

impl State {
    /// Load the cursor record, creating it when absent.
    ///
    /// An existing watermark and resume point are kept. The quit flag is
    /// reset to run and the page size is taken from `batch_size`.
    ///
    /// # Returns
    ///
    /// * `Ok(State)` - The cursor is ready
    /// * `Err(StateError)` - The storage is unreachable or holds an invalid watermark
    pub async fn open(storage: Arc<dyn StateStorage>, batch_size: i64) -> Result<Self, StateError> {
        let existing = storage.retrieve_state().await?;
        let resumed = existing.is_some();
        let mut record = existing.unwrap_or_default();

        record
            .entry(DATETIME_KEY.to_string())
            .or_insert_with(|| Watermark::min().to_string());
        record
            .entry(OFFSET_KEY.to_string())
            .or_insert_with(|| "0".to_string());
        record.insert(QUIT_KEY.to_string(), RUN.to_string());
        record.insert(BATCH_KEY.to_string(), batch_size.to_string());

        storage.save_state(&record).await?;

        let state = Self { storage };
        let watermark = state.watermark().await?;
        info!(watermark = %watermark, batch_size, resumed, "Opened pipeline state");

        Ok(state)
    }

    /// Current value of `key`, or `None` if it is absent or empty.
    pub async fn get(&self, key: &str) -> Result<Option<String>, StateError> {
        let record = self.storage.retrieve_state().await?;
        Ok(record
            .and_then(|mut r| r.remove(key))
            .filter(|value| !value.is_empty()))
    }

    /// Persist a single field.
    pub async fn set(&self, key: &str, value: impl Into<String>) -> Result<(), StateError> {
        self.set_many(&[(key, value.into())]).await
    }

    async fn set_many(&self, fields: &[(&str, String)]) -> Result<(), StateError> {
        let mut record: HashMap<String, String> =
            self.storage.retrieve_state().await?.unwrap_or_default();
        for (key, value) in fields {
            record.insert((*key).to_string(), value.clone());
        }
        self.storage.save_state(&record).await?;
        debug!(fields = ?fields, "Saved pipeline state");
        Ok(())
    }

    async fn parsed<T: std::str::FromStr>(&self, key: &str) -> Result<Option<T>, StateError> {
        match self.get(key).await? {
            Some(value) => value
                .parse::<T>()
                .map(Some)
                .map_err(|_| StateError::invalid_value(key, value)),
            None => Ok(None),
        }
    }

    /// Inclusive watermark of the current cycle.
    pub async fn watermark(&self) -> Result<Watermark, StateError> {
        Ok(self.parsed(DATETIME_KEY).await?.unwrap_or_default())
    }

    /// Pagination offset inside the family being drained.
    pub async fn offset(&self) -> Result<i64, StateError> {
        Ok(self.parsed(OFFSET_KEY).await?.unwrap_or(0))
    }

    /// Persist a new pagination offset.
    pub async fn set_offset(&self, offset: i64) -> Result<(), StateError> {
        self.set(OFFSET_KEY, offset.to_string()).await
    }

    /// Extraction page size.
    pub async fn batch_size(&self) -> Result<i64, StateError> {
        match self.parsed::<i64>(BATCH_KEY).await? {
            Some(size) if size > 0 => Ok(size),
            Some(size) => Err(StateError::invalid_value(BATCH_KEY, size.to_string())),
            None => Err(StateError::invalid_value(BATCH_KEY, "")),
        }
    }

    /// Whether a stop was requested.
    pub async fn quit_requested(&self) -> Result<bool, StateError> {
        Ok(self.get(QUIT_KEY).await?.as_deref() == Some(STOP))
    }

    /// Ask the run loop to stop after the current cycle.
    pub async fn request_quit(&self) -> Result<(), StateError> {
        self.set(QUIT_KEY, STOP).await
    }

    /// Record that `family` is being drained from `offset` in the cycle
    /// targeting `candidate`.
    pub async fn begin_family(
        &self,
        family: FamilyKind,
        candidate: Watermark,
        offset: i64,
    ) -> Result<(), StateError> {
        self.set_many(&[
            (FAMILY_KEY, family.name().to_string()),
            (CANDIDATE_KEY, candidate.to_string()),
            (OFFSET_KEY, offset.to_string()),
        ])
        .await
    }

    /// Where an interrupted cycle left off, if one was interrupted.
    ///
    /// Unknown family names are ignored.
    pub async fn resume_point(&self) -> Result<Option<ResumePoint>, StateError> {
        let Some(name) = self.get(FAMILY_KEY).await? else {
            return Ok(None);
        };
        let Some(family) = FamilyKind::from_name(&name) else {
            return Ok(None);
        };
        let Some(candidate) = self.parsed::<Watermark>(CANDIDATE_KEY).await? else {
            return Ok(None);
        };

        Ok(Some(ResumePoint {
            family,
            candidate,
            offset: self.offset().await?,
        }))
    }

    /// Move the watermark to `candidate` and close the cycle.
    ///
    /// The watermark never moves backwards.
    pub async fn advance_watermark(&self, candidate: Watermark) -> Result<Watermark, StateError> {
        let next = self.watermark().await?.max(candidate);
        self.set_many(&[
            (DATETIME_KEY, next.to_string()),
            (OFFSET_KEY, "0".to_string()),
            (FAMILY_KEY, String::new()),
            (CANDIDATE_KEY, String::new()),
        ])
        .await?;
        info!(watermark = %next, "Advanced watermark");
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use movies_etl_repository::MemoryStorage;

    fn watermark(value: &str) -> Watermark {
        value.parse().unwrap()
    }

    #[tokio::test]
    async fn test_open_initializes_record() {
        let storage = Arc::new(MemoryStorage::new());
        let state = State::open(storage.clone(), 100).await.unwrap();

        assert_eq!(state.watermark().await.unwrap(), Watermark::min());
        assert_eq!(state.offset().await.unwrap(), 0);
        assert_eq!(state.batch_size().await.unwrap(), 100);
        assert!(!state.quit_requested().await.unwrap());

        let record = storage.snapshot().unwrap();
        assert_eq!(record[DATETIME_KEY], "0001-01-01 00:00:00");
        assert_eq!(record[QUIT_KEY], "0");
        assert_eq!(record[BATCH_KEY], "100");
    }

    #[tokio::test]
    async fn test_open_keeps_watermark_and_resets_quit() {
        let mut record = HashMap::new();
        record.insert(DATETIME_KEY.to_string(), "2024-03-01 12:00:00".to_string());
        record.insert(QUIT_KEY.to_string(), "1".to_string());
        record.insert(BATCH_KEY.to_string(), "5".to_string());
        let storage = Arc::new(MemoryStorage::with_state(record));

        let state = State::open(storage, 50).await.unwrap();

        assert_eq!(state.watermark().await.unwrap(), watermark("2024-03-01 12:00:00"));
        assert!(!state.quit_requested().await.unwrap());
        assert_eq!(state.batch_size().await.unwrap(), 50);
    }

    #[tokio::test]
    async fn test_open_rejects_corrupt_watermark() {
        let mut record = HashMap::new();
        record.insert(DATETIME_KEY.to_string(), "yesterday".to_string());
        let storage = Arc::new(MemoryStorage::with_state(record));

        let err = State::open(storage, 100).await.err().unwrap();
        assert!(matches!(err, StateError::InvalidValue { .. }));
    }

    #[tokio::test]
    async fn test_external_quit_flag_is_observed_and_kept() {
        let storage = Arc::new(MemoryStorage::new());
        let state = State::open(storage.clone(), 10).await.unwrap();

        // An operator flips the flag behind the pipeline's back.
        let mut record = storage.snapshot().unwrap();
        record.insert(QUIT_KEY.to_string(), "1".to_string());
        storage.save_state(&record).await.unwrap();

        state.set_offset(30).await.unwrap();

        assert!(state.quit_requested().await.unwrap());
        assert_eq!(state.offset().await.unwrap(), 30);
    }

    #[tokio::test]
    async fn test_resume_point_round_trip_and_clear() {
        let storage = Arc::new(MemoryStorage::new());
        let state = State::open(storage, 10).await.unwrap();
        let candidate = watermark("2024-05-05 10:00:00");

        assert!(state.resume_point().await.unwrap().is_none());

        state.begin_family(FamilyKind::Persons, candidate, 0).await.unwrap();
        state.set_offset(20).await.unwrap();

        assert_eq!(
            state.resume_point().await.unwrap(),
            Some(ResumePoint {
                family: FamilyKind::Persons,
                candidate,
                offset: 20,
            })
        );

        let next = state.advance_watermark(candidate).await.unwrap();
        assert_eq!(next, candidate);
        assert!(state.resume_point().await.unwrap().is_none());
        assert_eq!(state.offset().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_watermark_never_moves_backwards() {
        let storage = Arc::new(MemoryStorage::new());
        let state = State::open(storage, 10).await.unwrap();

        state.advance_watermark(watermark("2024-05-05 10:00:00")).await.unwrap();
        let next = state
            .advance_watermark(watermark("2024-01-01 00:00:00"))
            .await
            .unwrap();

        assert_eq!(next, watermark("2024-05-05 10:00:00"));
    }
}
