//! JSON fixture holding provider schedules and existing reservations.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use slot_engine::{
    BookingEngine, EngineConfig, InMemoryLedger, InMemoryScheduleStore, ProviderId, Reservation,
    ScheduleConfig,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    pub providers: BTreeMap<ProviderId, ScheduleConfig>,
    #[serde(default)]
    pub reservations: Vec<Reservation>,
}

impl Fixture {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read fixture {}", path.display()))?;
        let fixture: Fixture = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse fixture {}", path.display()))?;
        for (id, schedule) in &fixture.providers {
            schedule
                .validate()
                .with_context(|| format!("provider '{id}' has an invalid schedule"))?;
        }
        Ok(fixture)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json + "\n")
            .with_context(|| format!("failed to write fixture {}", path.display()))
    }

    pub fn into_engine(
        self,
        config: EngineConfig,
    ) -> Result<BookingEngine<InMemoryScheduleStore, InMemoryLedger>> {
        let schedules = InMemoryScheduleStore::new();
        for (id, schedule) in self.providers {
            schedules.upsert(id, schedule);
        }
        let ledger = InMemoryLedger::new();
        ledger
            .seed(self.reservations)
            .context("failed to load reservations")?;
        Ok(BookingEngine::new(config, schedules, ledger))
    }
}
