pub mod modules;

#[cfg(test)]
pub(crate) mod test_support;

pub use modules::capture::{BallCounts, CaptureAttempt, choose_ball, wants_capture_aid};
pub use modules::config::{self, AuthMode, CycleConfig};
pub use modules::context::Context;
pub use modules::cycle::{CycleOutcome, run_cycle};
pub use modules::encounter::{PassReport, encounter_pass};
pub use modules::error::{BotError, BotResult, ErrorClass};
pub use modules::farming::{FarmReport, farm_checkpoints};
pub use modules::gateway::{GatewayConnector, HttpGateway};
pub use modules::inventory::{Inventory, InventoryLedger};
pub use modules::movement::{Navigator, StraightLineWalker, TravelProgress, distance_meters};
pub use modules::pacing::{Pace, Pacer, PacingSchedule, SleepPacer};
pub use modules::progress::{LevelProgress, xp_diff};
pub use modules::session::{Credentials, Remote, Session};
pub use modules::state::{self, RuntimeState, StateRecorder, Status};
pub use modules::stats::{ActionTally, load_tally, reset_tally, save_tally};
pub use modules::supervisor::{
    Collaborators, Connector, NoopObserver, RunLimits, RunObserver, RunSummary, Supervisor,
};
pub use modules::sweeps::{evolve_all, recycle_excess, release_duplicates, should_retain};
pub use modules::types::{
    CatchStatus, Checkpoint, EncounterStatus, ItemKind, Location, OwnedCreature, WildSighting,
};
