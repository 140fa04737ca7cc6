use std::fmt;

use serde::{Deserialize, Serialize};

pub type CreatureId = u64;
pub type EncounterId = u64;

/// Highest value any single individual stat can take.
pub const MAX_INDIVIDUAL_STAT: u32 = 15;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn in_range(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.lat, self.lng)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    PokeBall,
    GreatBall,
    UltraBall,
    MasterBall,
    Potion,
    SuperPotion,
    HyperPotion,
    MaxPotion,
    Revive,
    MaxRevive,
    RazzBerry,
    #[serde(other)]
    Unknown,
}

impl ItemKind {
    pub const fn label(self) -> &'static str {
        match self {
            ItemKind::PokeBall => "poke_ball",
            ItemKind::GreatBall => "great_ball",
            ItemKind::UltraBall => "ultra_ball",
            ItemKind::MasterBall => "master_ball",
            ItemKind::Potion => "potion",
            ItemKind::SuperPotion => "super_potion",
            ItemKind::HyperPotion => "hyper_potion",
            ItemKind::MaxPotion => "max_potion",
            ItemKind::Revive => "revive",
            ItemKind::MaxRevive => "max_revive",
            ItemKind::RazzBerry => "razz_berry",
            ItemKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatchStatus {
    Success,
    Missed,
    Escaped,
    #[serde(other)]
    Other,
}

impl CatchStatus {
    /// Missed and escaped throws leave the creature in play.
    pub const fn should_retry(self) -> bool {
        match self {
            CatchStatus::Missed | CatchStatus::Escaped => true,
            CatchStatus::Success | CatchStatus::Other => false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncounterStatus {
    Success,
    NotFound,
    Closed,
    NotInRange,
    AlreadyHappened,
    InventoryFull,
    #[serde(other)]
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvolveStatus {
    Success,
    InsufficientResources,
    NotEvolvable,
    #[serde(other)]
    Failed,
}

/// Values above [`MAX_INDIVIDUAL_STAT`] are refused while decoding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireStats")]
pub struct IndividualStats {
    pub attack: u32,
    pub defense: u32,
    pub stamina: u32,
}

#[derive(Deserialize)]
struct WireStats {
    attack: u32,
    defense: u32,
    stamina: u32,
}

impl TryFrom<WireStats> for IndividualStats {
    type Error = String;

    fn try_from(wire: WireStats) -> Result<Self, Self::Error> {
        for (name, value) in [
            ("attack", wire.attack),
            ("defense", wire.defense),
            ("stamina", wire.stamina),
        ] {
            if value > MAX_INDIVIDUAL_STAT {
                return Err(format!("{name} stat {value} exceeds {MAX_INDIVIDUAL_STAT}"));
            }
        }
        Ok(Self {
            attack: wire.attack,
            defense: wire.defense,
            stamina: wire.stamina,
        })
    }
}

impl IndividualStats {
    /// Attack counts double: `(2a + d + s) / 60 * 100`.
    pub fn perfection(&self) -> f64 {
        let weighted =
            u64::from(self.attack) * 2 + u64::from(self.defense) + u64::from(self.stamina);
        weighted as f64 / f64::from(4 * MAX_INDIVIDUAL_STAT) * 100.0
    }
}

/// A catchable creature seen in the latest map snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WildSighting {
    pub encounter_id: EncounterId,
    pub spawn_point: String,
    pub species: String,
    pub location: Location,
}

/// The creature's details as revealed once an encounter is opened.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Encounter {
    pub status: EncounterStatus,
    #[serde(default)]
    pub cp: Option<u32>,
    #[serde(default)]
    pub stats: Option<IndividualStats>,
    #[serde(default)]
    pub capture_probability: Option<f64>,
}

impl Encounter {
    pub fn perfection(&self) -> f64 {
        self.stats.map(|s| s.perfection()).unwrap_or(0.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FortKind {
    Checkpoint,
    Gym,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: String,
    pub kind: FortKind,
    pub location: Location,
    #[serde(default)]
    pub cooldown_expires_ms: i64,
}

impl Checkpoint {
    pub fn ready(&self, now_ms: i64) -> bool {
        self.kind == FortKind::Checkpoint && self.cooldown_expires_ms < now_ms
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CheckpointInfo {
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckpointReward {
    #[serde(default)]
    pub experience: u32,
    #[serde(default)]
    pub gems: u32,
    #[serde(default)]
    pub egg: bool,
    #[serde(default)]
    pub items: Vec<ItemStack>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MapSnapshot {
    #[serde(default)]
    pub sightings: Vec<WildSighting>,
    #[serde(default)]
    pub checkpoints: Vec<Checkpoint>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OwnedCreature {
    pub id: CreatureId,
    pub species: String,
    pub cp: u32,
    #[serde(flatten)]
    pub stats: IndividualStats,
    /// Candy held for this creature's family.
    #[serde(default)]
    pub candy: u32,
    /// Candy needed to evolve; absent for final forms.
    #[serde(default)]
    pub candy_to_evolve: Option<u32>,
}

impl OwnedCreature {
    pub fn perfection(&self) -> f64 {
        self.stats.perfection()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub kind: ItemKind,
    pub count: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub level: u32,
    pub experience: u64,
    pub prev_level_xp: u64,
    pub next_level_xp: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    #[serde(default)]
    pub player: Option<PlayerStats>,
    #[serde(default)]
    pub items: Vec<ItemStack>,
    #[serde(default)]
    pub creatures: Vec<OwnedCreature>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvolveOutcome {
    pub status: EvolveStatus,
    #[serde(default)]
    pub experience: u32,
}
