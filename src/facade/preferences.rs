//! User preferences

use crate::error::{Result, SyncError};
use crate::models::Preferences;
use crate::store::{keys, snapshot::entry, SnapshotStore};
use crate::sync::SyncCoordinator;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

pub const CLOUD_SYNC: &str = "cloudSync";
pub const PRACTICE_SCHEDULE: &str = "practiceSchedule";

/// Weekly practice reminder slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeSchedule {
    /// 0 = Sunday
    pub days: Vec<u8>,
    pub hour: u8,
    pub minute: u8,
}

impl Default for PracticeSchedule {
    fn default() -> Self {
        Self {
            days: vec![1, 2, 3, 4, 5],
            hour: 18,
            minute: 0,
        }
    }
}

impl PracticeSchedule {
    fn validate(&self) -> Result<()> {
        if self.hour > 23 || self.minute > 59 {
            return Err(SyncError::InvalidInput(format!(
                "invalid practice time {:02}:{:02}",
                self.hour, self.minute
            )));
        }
        if let Some(day) = self.days.iter().find(|d| **d > 6) {
            return Err(SyncError::InvalidInput(format!("invalid weekday {}", day)));
        }
        Ok(())
    }
}

pub fn default_preferences() -> Preferences {
    let value = json!({
        "darkMode": true,
        "notificationsEnabled": true,
        "practiceSchedule": PracticeSchedule::default(),
        "cloudSync": true,
        "defaultTuning": "standard",
        "metronomeSettings": {
            "defaultTempo": 100,
            "defaultBeatsPerMeasure": 4,
        },
    });
    match value {
        Value::Object(map) => map,
        _ => Preferences::new(),
    }
}

pub struct PreferencesFacade {
    local: Arc<SnapshotStore>,
    sync: Option<SyncCoordinator>,
}

impl PreferencesFacade {
    /// `sync`, when given, follows the `cloudSync` preference
    pub fn new(local: Arc<SnapshotStore>, sync: Option<SyncCoordinator>) -> Self {
        Self { local, sync }
    }

    /// Stored preferences over the defaults
    pub fn load(&self) -> Result<Preferences> {
        let stored: Preferences = self.local.get(keys::PREFERENCES)?;
        Ok(overlay(default_preferences(), stored))
    }

    /// Shallow-patch preferences and store the result
    pub async fn update(&self, patch: Preferences) -> Result<Preferences> {
        let writer = self.local.write().await;
        let stored: Preferences = writer.get(keys::PREFERENCES)?;
        let updated = overlay(overlay(default_preferences(), stored), patch);
        writer.commit(vec![entry(keys::PREFERENCES, &updated)?])?;
        Ok(updated)
    }

    /// Change some fields of the practice schedule
    pub async fn update_practice_schedule(
        &self,
        days: Option<Vec<u8>>,
        hour: Option<u8>,
        minute: Option<u8>,
    ) -> Result<PracticeSchedule> {
        let current = self.load()?;
        let mut schedule: PracticeSchedule = current
            .get(PRACTICE_SCHEDULE)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();

        if let Some(days) = days {
            schedule.days = days;
        }
        if let Some(hour) = hour {
            schedule.hour = hour;
        }
        if let Some(minute) = minute {
            schedule.minute = minute;
        }
        schedule.validate()?;

        let mut patch = Preferences::new();
        patch.insert(PRACTICE_SCHEDULE.to_string(), serde_json::to_value(&schedule)?);
        self.update(patch).await?;
        Ok(schedule)
    }

    /// Toggle cloud sync and start or stop the automatic timer to match
    pub async fn set_cloud_sync(&self, enabled: bool) -> Result<Preferences> {
        let mut patch = Preferences::new();
        patch.insert(CLOUD_SYNC.to_string(), Value::Bool(enabled));
        let updated = self.update(patch).await?;
        self.apply_sync_preference(&updated);
        Ok(updated)
    }

    /// Restore the defaults
    pub async fn reset(&self) -> Result<Preferences> {
        let defaults = default_preferences();
        {
            let writer = self.local.write().await;
            writer.commit(vec![entry(keys::PREFERENCES, &defaults)?])?;
        }
        if let Some(sync) = &self.sync {
            sync.stop_auto_sync();
        }
        self.apply_sync_preference(&defaults);
        info!("Preferences reset to defaults");
        Ok(defaults)
    }

    /// Start or stop automatic sync according to `cloudSync`
    pub fn apply_sync_preference(&self, preferences: &Preferences) {
        let Some(sync) = &self.sync else { return };

        let enabled = preferences
            .get(CLOUD_SYNC)
            .and_then(Value::as_bool)
            .unwrap_or(false);

        if enabled {
            if let Err(e) = sync.start_auto_sync() {
                warn!("Could not start auto sync: {}", e);
            }
        } else {
            sync.stop_auto_sync();
        }
    }
}

fn overlay(mut base: Preferences, top: Preferences) -> Preferences {
    for (key, value) in top {
        base.insert(key, value);
    }
    base
}
