//! Custom chord library

use crate::error::{Result, SyncError};
use crate::models::CustomChord;
use crate::store::{keys, snapshot::entry, SnapshotStore};
use crate::sync::Clock;
use std::sync::Arc;

const MAX_FRET: i8 = 24;

pub struct ChordFacade {
    local: Arc<SnapshotStore>,
    clock: Arc<dyn Clock>,
}

impl ChordFacade {
    pub fn new(local: Arc<SnapshotStore>, clock: Arc<dyn Clock>) -> Self {
        Self { local, clock }
    }

    pub fn list(&self) -> Result<Vec<CustomChord>> {
        self.local.get(keys::CUSTOM_CHORDS)
    }

    pub fn get(&self, id: &str) -> Result<Option<CustomChord>> {
        Ok(self.list()?.into_iter().find(|c| c.id == id))
    }

    /// Define a new chord with a fresh id
    pub async fn create(
        &self,
        name: &str,
        frets: Vec<i8>,
        fingers: Vec<u8>,
        barred_fret: Option<u8>,
        created_by: &str,
    ) -> Result<CustomChord> {
        let chord = CustomChord {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            frets,
            fingers,
            is_barred: barred_fret.is_some(),
            barred_fret,
            created_by: created_by.to_string(),
            created_at: self.clock.now(),
        };
        self.save(chord.clone()).await?;
        Ok(chord)
    }

    /// Insert a chord, or replace the one with the same id in full
    pub async fn save(&self, chord: CustomChord) -> Result<()> {
        validate(&chord)?;

        let writer = self.local.write().await;
        let mut chords: Vec<CustomChord> = writer.get(keys::CUSTOM_CHORDS)?;

        match chords.iter_mut().find(|c| c.id == chord.id) {
            Some(existing) => *existing = chord,
            None => chords.push(chord),
        }

        writer.commit(vec![entry(keys::CUSTOM_CHORDS, &chords)?])
    }

    /// Remove a chord; returns whether it existed
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let writer = self.local.write().await;
        let mut chords: Vec<CustomChord> = writer.get(keys::CUSTOM_CHORDS)?;

        let before = chords.len();
        chords.retain(|c| c.id != id);
        if chords.len() == before {
            return Ok(false);
        }

        writer.commit(vec![entry(keys::CUSTOM_CHORDS, &chords)?])?;
        Ok(true)
    }
}

fn validate(chord: &CustomChord) -> Result<()> {
    if chord.id.is_empty() {
        return Err(SyncError::InvalidInput("chord id is required".to_string()));
    }
    if chord.name.trim().is_empty() {
        return Err(SyncError::InvalidInput("chord name is required".to_string()));
    }
    if chord.frets.len() != chord.fingers.len() {
        return Err(SyncError::InvalidInput(format!(
            "{} frets but {} fingers",
            chord.frets.len(),
            chord.fingers.len()
        )));
    }
    if let Some(fret) = chord.frets.iter().find(|f| **f < -1 || **f > MAX_FRET) {
        return Err(SyncError::InvalidInput(format!("fret {} out of range", fret)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::sync::ManualClock;

    fn facade() -> ChordFacade {
        let local = Arc::new(SnapshotStore::new(Arc::new(MemoryStore::new())));
        ChordFacade::new(local, Arc::new(ManualClock::new(0)))
    }

    #[tokio::test]
    async fn test_create_then_replace() {
        let facade = facade();
        let chord = facade
            .create("  Cadd9 ", vec![-1, 3, 2, 0, 3, 0], vec![0, 2, 1, 0, 3, 0], None, "user-1")
            .await
            .unwrap();
        assert_eq!(chord.name, "Cadd9");

        let mut edited = chord.clone();
        edited.name = "Cadd9/G".to_string();
        facade.save(edited.clone()).await.unwrap();

        let chords = facade.list().unwrap();
        assert_eq!(chords.len(), 1);
        assert_eq!(chords[0], edited);
    }

    #[tokio::test]
    async fn test_delete() {
        let facade = facade();
        let chord = facade
            .create("F", vec![1, 3, 3, 2, 1, 1], vec![1, 3, 4, 2, 1, 1], Some(1), "user-1")
            .await
            .unwrap();
        assert!(chord.is_barred);

        assert!(facade.delete(&chord.id).await.unwrap());
        assert!(!facade.delete(&chord.id).await.unwrap());
        assert!(facade.get(&chord.id).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rejects_mismatched_shape() {
        let facade = facade();
        let err = facade
            .create("Bad", vec![0, 0, 0], vec![0, 0], None, "user-1")
            .await
            .err()
            .unwrap();
        assert!(matches!(err, SyncError::InvalidInput(_)));
        assert!(facade.list().unwrap().is_empty());
    }
}
