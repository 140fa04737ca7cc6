use crate::modules::config::AuthMode;
use crate::modules::error::BotResult;
use crate::modules::types::{
    CatchStatus, Checkpoint, CheckpointInfo, CheckpointReward, CreatureId, Encounter,
    EvolveOutcome, InventorySnapshot, ItemKind, Location, MapSnapshot, WildSighting,
};

#[derive(Clone, Debug)]
pub struct Credentials {
    pub auth: AuthMode,
    pub username: String,
    /// Password for ptc, refresh token for google.
    pub secret: String,
}

/// Remote calls the decision core issues. One call in flight at a time.
pub trait Remote {
    fn login(&mut self, credentials: &Credentials) -> BotResult<()>;
    /// Ask the login server which endpoint serves this account.
    fn resolve_server(&mut self) -> BotResult<String>;
    fn report_position(&mut self, at: Location) -> BotResult<()>;
    fn map_snapshot(&mut self, at: Location) -> BotResult<MapSnapshot>;
    fn encounter(&mut self, sighting: &WildSighting) -> BotResult<Encounter>;
    fn throw_ball(&mut self, sighting: &WildSighting, ball: ItemKind) -> BotResult<CatchStatus>;
    fn use_capture_aid(&mut self, sighting: &WildSighting, item: ItemKind) -> BotResult<()>;
    fn evolve(&mut self, creature: CreatureId) -> BotResult<EvolveOutcome>;
    fn transfer(&mut self, creature: CreatureId) -> BotResult<()>;
    fn recycle(&mut self, item: ItemKind, count: u32) -> BotResult<()>;
    fn checkpoint_info(&mut self, checkpoint: &Checkpoint) -> BotResult<CheckpointInfo>;
    fn interact_checkpoint(&mut self, checkpoint: &Checkpoint) -> BotResult<CheckpointReward>;
    fn inventory(&mut self) -> BotResult<InventorySnapshot>;
}

/// One authenticated session: where we are and the handle we talk through.
pub struct Session {
    pub position: Location,
    pub auth: AuthMode,
    pub endpoint: Option<String>,
    remote: Box<dyn Remote>,
}

impl Session {
    pub fn new(remote: Box<dyn Remote>, auth: AuthMode, start: Location) -> Self {
        Self {
            position: start,
            auth,
            endpoint: None,
            remote,
        }
    }

    /// Log in and resolve the serving endpoint.
    pub fn open(&mut self, credentials: &Credentials) -> BotResult<()> {
        self.remote.login(credentials)?;
        let endpoint = self.remote.resolve_server()?;
        self.endpoint = Some(endpoint);
        self.remote.report_position(self.position)
    }

    pub fn remote(&mut self) -> &mut dyn Remote {
        self.remote.as_mut()
    }

    /// Move to `to` and tell the server.
    pub fn relocate(&mut self, to: Location) -> BotResult<()> {
        self.position = to;
        self.remote.report_position(to)
    }

    pub fn map_snapshot(&mut self) -> BotResult<MapSnapshot> {
        let at = self.position;
        self.remote.map_snapshot(at)
    }
}
