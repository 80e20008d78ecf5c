//! DailyDrill repository: `weekDrills`, `drillByDate`, `userActiveDrill`
//! index maintenance (spec §4.1, §4.4).

use chrono::{Datelike, NaiveDate};

use practice_domain::{DailyDrill, DrillId, DrillStatus, SkillId, UserId};

use crate::backend::KvBackend;
use crate::error::StoreError;
use crate::keys;
use crate::store::SecureStore;

fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = date.weekday().num_days_from_monday();
    date - chrono::Duration::days(offset as i64)
}

#[derive(Clone)]
pub struct DrillRepository<B: KvBackend> {
    store: SecureStore<B>,
}

impl<B: KvBackend> DrillRepository<B> {
    pub fn new(store: SecureStore<B>) -> Self {
        Self { store }
    }

    pub async fn insert(&self, drill: &DailyDrill) -> Result<(), StoreError> {
        let key = keys::drill(drill.id);
        self.store.create(&key, drill).await?;
        let backend = self.store.backend();
        let week = week_start(drill.scheduled_date);
        if let Err(e) = backend
            .zadd(
                &keys::week_drills(drill.user_id, week),
                drill.day_number as f64,
                &drill.id.to_string(),
            )
            .await
        {
            self.store.delete(&key).await.ok();
            return Err(e);
        }
        if let Err(e) = backend
            .set(
                &keys::drill_by_date(drill.goal_id, drill.scheduled_date),
                drill.id.to_string().into_bytes(),
            )
            .await
        {
            backend
                .zrem(&keys::week_drills(drill.user_id, week), &drill.id.to_string())
                .await
                .ok();
            self.store.delete(&key).await.ok();
            return Err(e);
        }
        if let Err(e) = backend
            .set_add(&keys::skill_drills(drill.skill_id), &drill.id.to_string())
            .await
        {
            backend.delete(&keys::drill_by_date(drill.goal_id, drill.scheduled_date)).await.ok();
            backend
                .zrem(&keys::week_drills(drill.user_id, week), &drill.id.to_string())
                .await
                .ok();
            self.store.delete(&key).await.ok();
            return Err(e);
        }
        Ok(())
    }

    pub async fn list_for_skill(&self, skill_id: SkillId) -> Result<Vec<DailyDrill>, StoreError> {
        let ids = self.store.backend().set_members(&keys::skill_drills(skill_id)).await?;
        let mut drills = Vec::with_capacity(ids.len());
        for id in ids {
            let drill_id: DrillId = id
                .parse()
                .map_err(|_| StoreError::InvalidData(format!("corrupt drill id in index: {id}")))?;
            if let Some((drill, _)) = self.get(drill_id).await? {
                drills.push(drill);
            }
        }
        Ok(drills)
    }

    pub async fn get(&self, id: DrillId) -> Result<Option<(DailyDrill, u64)>, StoreError> {
        self.store.load(&keys::drill(id)).await
    }

    pub async fn require(&self, id: DrillId) -> Result<(DailyDrill, u64), StoreError> {
        self.get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("drill {id}")))
    }

    /// Updates the drill and keeps `userActiveDrill` pointed at whichever
    /// drill (if any) is currently `active` for this user.
    pub async fn update(&self, drill: &DailyDrill, expected_version: u64) -> Result<u64, StoreError> {
        let new_version = self
            .store
            .save(&keys::drill(drill.id), drill, expected_version)
            .await?;
        let backend = self.store.backend();
        match drill.status {
            DrillStatus::Active => {
                backend
                    .set(&keys::user_active_drill(drill.user_id), drill.id.to_string().into_bytes())
                    .await?;
            }
            _ => {
                if let Some(bytes) = backend.get(&keys::user_active_drill(drill.user_id)).await? {
                    if bytes == drill.id.to_string().into_bytes() {
                        backend.delete(&keys::user_active_drill(drill.user_id)).await?;
                    }
                }
            }
        }
        Ok(new_version)
    }

    pub async fn get_for_date(
        &self,
        goal_id: practice_domain::GoalId,
        date: NaiveDate,
    ) -> Result<Option<DailyDrill>, StoreError> {
        let Some(bytes) = self.store.backend().get(&keys::drill_by_date(goal_id, date)).await? else {
            return Ok(None);
        };
        let id: DrillId = String::from_utf8_lossy(&bytes)
            .parse()
            .map_err(|_| StoreError::InvalidData("corrupt drillByDate entry".to_string()))?;
        Ok(self.get(id).await?.map(|(d, _)| d))
    }

    pub async fn get_active_for_user(&self, user_id: UserId) -> Result<Option<DailyDrill>, StoreError> {
        let Some(bytes) = self.store.backend().get(&keys::user_active_drill(user_id)).await? else {
            return Ok(None);
        };
        let id: DrillId = String::from_utf8_lossy(&bytes)
            .parse()
            .map_err(|_| StoreError::InvalidData("corrupt userActiveDrill entry".to_string()))?;
        Ok(self.get(id).await?.map(|(d, _)| d))
    }

    pub async fn list_for_week(&self, user_id: UserId, any_day_in_week: NaiveDate) -> Result<Vec<DailyDrill>, StoreError> {
        let week = week_start(any_day_in_week);
        let ids = self
            .store
            .backend()
            .zrange_by_score(&keys::week_drills(user_id, week), 0.0, f64::MAX)
            .await?;
        let mut drills = Vec::with_capacity(ids.len());
        for id in ids {
            let drill_id: DrillId = id
                .parse()
                .map_err(|_| StoreError::InvalidData(format!("corrupt drill id in index: {id}")))?;
            if let Some((drill, _)) = self.get(drill_id).await? {
                drills.push(drill);
            }
        }
        Ok(drills)
    }

    /// Expires Scheduled drills whose `scheduled_date` has fully passed, per
    /// the explicit `expire_overdue_drills` operation (SPEC_FULL.md §4.8
    /// supplement) rather than an implicit background sweep.
    pub async fn expire_overdue(&self, user_id: UserId, today: NaiveDate) -> Result<usize, StoreError> {
        let week = week_start(today);
        let prior_week = week - chrono::Duration::days(7);
        let mut candidates = self.list_for_week(user_id, prior_week).await?;
        candidates.extend(self.list_for_week(user_id, week).await?);

        let mut expired = 0;
        for mut drill in candidates {
            if drill.status == DrillStatus::Scheduled && drill.scheduled_date < today {
                let version = self
                    .get(drill.id)
                    .await?
                    .map(|(_, v)| v)
                    .unwrap_or(1);
                drill
                    .apply(practice_domain::DrillEvent::Expire, None)
                    .map_err(|e| StoreError::InvalidData(e.to_string()))?;
                self.update(&drill, version).await?;
                expired += 1;
            }
        }
        Ok(expired)
    }

    pub async fn delete(&self, drill: &DailyDrill) -> Result<(), StoreError> {
        let backend = self.store.backend();
        let week = week_start(drill.scheduled_date);
        backend.zrem(&keys::week_drills(drill.user_id, week), &drill.id.to_string()).await?;
        backend.delete(&keys::drill_by_date(drill.goal_id, drill.scheduled_date)).await?;
        backend.set_remove(&keys::skill_drills(drill.skill_id), &drill.id.to_string()).await?;
        self.store.delete(&keys::drill(drill.id)).await?;
        Ok(())
    }
}
