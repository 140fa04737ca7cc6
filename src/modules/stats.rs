use std::fs;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::modules::types::CatchStatus;

/// Running totals of what the bot did since `start`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionTally {
    pub throws: u64,
    pub catches: u64,
    pub misses: u64,
    pub escapes: u64,
    pub other_outcomes: u64,
    pub berries: u64,
    pub evolutions: u64,
    pub transfers: u64,
    pub recycled: u64,
    pub checkpoints: u64,
    pub experience: u64,
}

impl ActionTally {
    pub fn record_throw(&mut self, status: CatchStatus) {
        self.throws = self.throws.saturating_add(1);
        let bucket = match status {
            CatchStatus::Success => &mut self.catches,
            CatchStatus::Missed => &mut self.misses,
            CatchStatus::Escaped => &mut self.escapes,
            CatchStatus::Other => &mut self.other_outcomes,
        };
        *bucket = bucket.saturating_add(1);
    }

    pub fn record_berry(&mut self) {
        self.berries = self.berries.saturating_add(1);
    }

    pub fn record_evolution(&mut self, experience: u32) {
        self.evolutions = self.evolutions.saturating_add(1);
        self.experience = self.experience.saturating_add(experience as u64);
    }

    pub fn record_transfer(&mut self) {
        self.transfers = self.transfers.saturating_add(1);
    }

    pub fn record_recycle(&mut self, count: u32) {
        self.recycled = self.recycled.saturating_add(count as u64);
    }

    pub fn record_checkpoint(&mut self, experience: u32) {
        self.checkpoints = self.checkpoints.saturating_add(1);
        self.experience = self.experience.saturating_add(experience as u64);
    }

    pub fn summary(&self) -> String {
        format!(
            "throws={} caught={} missed={} escaped={} other={} berries={} evolved={} transferred={} recycled={} checkpoints={} xp={}",
            self.throws,
            self.catches,
            self.misses,
            self.escapes,
            self.other_outcomes,
            self.berries,
            self.evolutions,
            self.transfers,
            self.recycled,
            self.checkpoints,
            self.experience
        )
    }
}

fn tally_dir() -> PathBuf {
    PathBuf::from(".fieldrunner")
}

fn tally_path() -> PathBuf {
    tally_dir().join("tally.json")
}

pub fn reset_tally() -> io::Result<()> {
    save_tally(&ActionTally::default())
}

pub fn load_tally() -> io::Result<ActionTally> {
    let path = tally_path();
    if !path.exists() {
        return Ok(ActionTally::default());
    }

    let bytes = fs::read(&path)?;
    if bytes.is_empty() {
        return Ok(ActionTally::default());
    }

    let tally: ActionTally = serde_json::from_slice(&bytes)?;
    Ok(tally)
}

pub fn save_tally(tally: &ActionTally) -> io::Result<()> {
    fs::create_dir_all(tally_dir())?;
    let json = serde_json::to_vec_pretty(tally)?;
    fs::write(tally_path(), json)?;
    Ok(())
}
