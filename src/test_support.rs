//! Scripted collaborators shared by the unit tests.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use crate::modules::config::{AuthMode, CycleConfig};
use crate::modules::context::Context;
use crate::modules::error::{BotError, BotResult};
use crate::modules::inventory::InventoryLedger;
use crate::modules::movement::{Navigator, TravelProgress, distance_meters};
use crate::modules::pacing::{Pace, Pacer};
use crate::modules::session::{Credentials, Remote, Session};
use crate::modules::stats::ActionTally;
use crate::modules::types::{
    CatchStatus, Checkpoint, CheckpointInfo, CheckpointReward, CreatureId, Encounter,
    EncounterId, EncounterStatus, EvolveOutcome, EvolveStatus, FortKind, IndividualStats,
    InventorySnapshot, ItemKind, ItemStack, Location, MapSnapshot, OwnedCreature, PlayerStats,
    WildSighting,
};

pub(crate) fn sighting(id: EncounterId, species: &str, lat: f64, lng: f64) -> WildSighting {
    WildSighting {
        encounter_id: id,
        spawn_point: format!("spawn-{id}"),
        species: species.into(),
        location: Location::new(lat, lng),
    }
}

pub(crate) fn checkpoint(id: &str, lat: f64, lng: f64, cooldown_expires_ms: i64) -> Checkpoint {
    Checkpoint {
        id: id.into(),
        kind: FortKind::Checkpoint,
        location: Location::new(lat, lng),
        cooldown_expires_ms,
    }
}

pub(crate) fn creature(id: CreatureId, species: &str, cp: u32, iv: (u32, u32, u32)) -> OwnedCreature {
    OwnedCreature {
        id,
        species: species.into(),
        cp,
        stats: IndividualStats {
            attack: iv.0,
            defense: iv.1,
            stamina: iv.2,
        },
        candy: 0,
        candy_to_evolve: None,
    }
}

#[derive(Default)]
struct FakeState {
    items: BTreeMap<ItemKind, u32>,
    creatures: Vec<OwnedCreature>,
    player: Option<PlayerStats>,
    map: MapSnapshot,
    encounters: HashMap<EncounterId, Encounter>,
    throw_script: VecDeque<CatchStatus>,
    evolve_script: VecDeque<EvolveStatus>,
    failures: HashMap<&'static str, VecDeque<Option<BotError>>>,
    calls: Vec<&'static str>,
    logins: usize,
    positions: Vec<Location>,
    encountered: Vec<EncounterId>,
    throws: Vec<(EncounterId, ItemKind)>,
    berries_used: usize,
    evolved: Vec<CreatureId>,
    transferred: Vec<CreatureId>,
    recycled: Vec<(ItemKind, u32)>,
    visited: Vec<String>,
    /// Rewards handed out per checkpoint id; others get the stock reward.
    rewards: HashMap<String, CheckpointReward>,
}

/// In-memory remote. Clones share state, so tests keep a handle after boxing one.
#[derive(Clone, Default)]
pub(crate) struct FakeRemote {
    state: Rc<RefCell<FakeState>>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stock(&self, kind: ItemKind, count: u32) {
        self.state.borrow_mut().items.insert(kind, count);
    }

    pub fn own(&self, creature: OwnedCreature) {
        self.state.borrow_mut().creatures.push(creature);
    }

    pub fn set_player(&self, player: PlayerStats) {
        self.state.borrow_mut().player = Some(player);
    }

    pub fn set_map(&self, map: MapSnapshot) {
        self.state.borrow_mut().map = map;
    }

    pub fn set_reward(&self, checkpoint: &str, reward: CheckpointReward) {
        self.state
            .borrow_mut()
            .rewards
            .insert(checkpoint.to_string(), reward);
    }

    pub fn set_encounter(&self, id: EncounterId, encounter: Encounter) {
        self.state.borrow_mut().encounters.insert(id, encounter);
    }

    pub fn script_throws(&self, statuses: &[CatchStatus]) {
        self.state
            .borrow_mut()
            .throw_script
            .extend(statuses.iter().copied());
    }

    pub fn script_evolutions(&self, statuses: &[EvolveStatus]) {
        self.state
            .borrow_mut()
            .evolve_script
            .extend(statuses.iter().copied());
    }

    /// Queue an error for the next call to `method`.
    pub fn fail_next(&self, method: &'static str, err: BotError) {
        self.state
            .borrow_mut()
            .failures
            .entry(method)
            .or_default()
            .push_back(Some(err));
    }

    /// Let the next call to `method` through; orders a later `fail_next`.
    pub fn pass_next(&self, method: &'static str) {
        self.state
            .borrow_mut()
            .failures
            .entry(method)
            .or_default()
            .push_back(None);
    }

    pub fn logins(&self) -> usize {
        self.state.borrow().logins
    }

    pub fn calls(&self, method: &str) -> usize {
        self.state.borrow().calls.iter().filter(|c| **c == method).count()
    }

    pub fn positions_reported(&self) -> usize {
        self.state.borrow().positions.len()
    }

    pub fn encountered(&self) -> Vec<EncounterId> {
        self.state.borrow().encountered.clone()
    }

    pub fn throws(&self) -> Vec<(EncounterId, ItemKind)> {
        self.state.borrow().throws.clone()
    }

    pub fn berries_used(&self) -> usize {
        self.state.borrow().berries_used
    }

    pub fn evolved(&self) -> Vec<CreatureId> {
        self.state.borrow().evolved.clone()
    }

    pub fn transferred(&self) -> Vec<CreatureId> {
        self.state.borrow().transferred.clone()
    }

    pub fn recycled(&self) -> Vec<(ItemKind, u32)> {
        self.state.borrow().recycled.clone()
    }

    pub fn visited(&self) -> Vec<String> {
        self.state.borrow().visited.clone()
    }

    fn enter(&self, method: &'static str) -> BotResult<()> {
        let mut state = self.state.borrow_mut();
        state.calls.push(method);
        match state.failures.get_mut(method).and_then(|q| q.pop_front()) {
            Some(Some(err)) => Err(err),
            _ => Ok(()),
        }
    }

    fn take_item(&self, kind: ItemKind, count: u32) {
        let mut state = self.state.borrow_mut();
        if let Some(held) = state.items.get_mut(&kind) {
            *held = held.saturating_sub(count);
        }
    }
}

impl Remote for FakeRemote {
    fn login(&mut self, _credentials: &Credentials) -> BotResult<()> {
        self.enter("login")?;
        self.state.borrow_mut().logins += 1;
        Ok(())
    }

    fn resolve_server(&mut self) -> BotResult<String> {
        self.enter("resolve_server")?;
        Ok("https://fake.example/rpc".into())
    }

    fn report_position(&mut self, at: Location) -> BotResult<()> {
        self.enter("report_position")?;
        self.state.borrow_mut().positions.push(at);
        Ok(())
    }

    fn map_snapshot(&mut self, _at: Location) -> BotResult<MapSnapshot> {
        self.enter("map_snapshot")?;
        Ok(self.state.borrow().map.clone())
    }

    fn encounter(&mut self, sighting: &WildSighting) -> BotResult<Encounter> {
        self.enter("encounter")?;
        let mut state = self.state.borrow_mut();
        state.encountered.push(sighting.encounter_id);
        Ok(state
            .encounters
            .get(&sighting.encounter_id)
            .cloned()
            .unwrap_or(Encounter {
                status: EncounterStatus::Success,
                cp: Some(100),
                stats: None,
                capture_probability: Some(0.9),
            }))
    }

    fn throw_ball(&mut self, sighting: &WildSighting, ball: ItemKind) -> BotResult<CatchStatus> {
        self.enter("throw_ball")?;
        self.take_item(ball, 1);
        let mut state = self.state.borrow_mut();
        state.throws.push((sighting.encounter_id, ball));
        Ok(state.throw_script.pop_front().unwrap_or(CatchStatus::Success))
    }

    fn use_capture_aid(&mut self, _sighting: &WildSighting, item: ItemKind) -> BotResult<()> {
        self.enter("use_capture_aid")?;
        self.take_item(item, 1);
        self.state.borrow_mut().berries_used += 1;
        Ok(())
    }

    fn evolve(&mut self, creature: CreatureId) -> BotResult<EvolveOutcome> {
        self.enter("evolve")?;
        let mut state = self.state.borrow_mut();
        let status = state.evolve_script.pop_front().unwrap_or(EvolveStatus::Success);
        if status == EvolveStatus::Success {
            state.evolved.push(creature);
        }
        Ok(EvolveOutcome {
            status,
            experience: if status == EvolveStatus::Success { 500 } else { 0 },
        })
    }

    fn transfer(&mut self, creature: CreatureId) -> BotResult<()> {
        self.enter("transfer")?;
        let mut state = self.state.borrow_mut();
        state.creatures.retain(|c| c.id != creature);
        state.transferred.push(creature);
        Ok(())
    }

    fn recycle(&mut self, item: ItemKind, count: u32) -> BotResult<()> {
        self.enter("recycle")?;
        self.take_item(item, count);
        self.state.borrow_mut().recycled.push((item, count));
        Ok(())
    }

    fn checkpoint_info(&mut self, checkpoint: &Checkpoint) -> BotResult<CheckpointInfo> {
        self.enter("checkpoint_info")?;
        Ok(CheckpointInfo {
            name: format!("Stop {}", checkpoint.id),
        })
    }

    fn interact_checkpoint(&mut self, checkpoint: &Checkpoint) -> BotResult<CheckpointReward> {
        self.enter("interact_checkpoint")?;
        let mut state = self.state.borrow_mut();
        state.visited.push(checkpoint.id.clone());
        if let Some(reward) = state.rewards.get(&checkpoint.id) {
            return Ok(reward.clone());
        }
        Ok(CheckpointReward {
            experience: 50,
            gems: 0,
            egg: false,
            items: vec![ItemStack {
                kind: ItemKind::PokeBall,
                count: 3,
            }],
        })
    }

    fn inventory(&mut self) -> BotResult<InventorySnapshot> {
        self.enter("inventory")?;
        let state = self.state.borrow();
        Ok(InventorySnapshot {
            player: state.player,
            items: state
                .items
                .iter()
                .map(|(kind, count)| ItemStack {
                    kind: *kind,
                    count: *count,
                })
                .collect(),
            creatures: state.creatures.clone(),
        })
    }
}

#[derive(Debug, Default)]
pub(crate) struct RecordingPacer {
    pub waits: Vec<(Pace, Duration)>,
}

impl RecordingPacer {
    pub fn count(&self, pace: Pace) -> usize {
        self.waits.iter().filter(|(p, _)| *p == pace).count()
    }
}

impl Pacer for RecordingPacer {
    fn pause(&mut self, pace: Pace, wait: Duration) {
        self.waits.push((pace, wait));
    }
}

/// Arrives after `steps_per_leg` polls, flagging a scan on the chosen step.
#[derive(Debug)]
pub(crate) struct ScriptedNavigator {
    pub steps_per_leg: u32,
    pub scan_on_step: Option<u32>,
    pub legs: Vec<Location>,
    target: Option<Location>,
    step: u32,
}

impl Default for ScriptedNavigator {
    fn default() -> Self {
        Self {
            steps_per_leg: 1,
            scan_on_step: None,
            legs: Vec::new(),
            target: None,
            step: 0,
        }
    }
}

impl Navigator for ScriptedNavigator {
    fn begin(&mut self, target: Location, _speed_kmh: f64) {
        self.legs.push(target);
        self.target = Some(target);
        self.step = 0;
    }

    fn advance(&mut self, session: &mut Session, _pacer: &mut dyn Pacer) -> BotResult<TravelProgress> {
        let Some(target) = self.target else {
            return Ok(TravelProgress::Arrived);
        };
        self.step += 1;
        if self.step >= self.steps_per_leg {
            session.relocate(target)?;
            self.target = None;
            return Ok(TravelProgress::Arrived);
        }
        Ok(TravelProgress::EnRoute {
            remaining_m: distance_meters(session.position, target),
            scan_due: self.scan_on_step == Some(self.step),
        })
    }
}

/// Owns one of every collaborator and lends them out as a [`Context`].
pub(crate) struct Harness {
    pub remote: FakeRemote,
    pub session: Session,
    pub navigator: ScriptedNavigator,
    pub pacer: RecordingPacer,
    pub config: CycleConfig,
    pub tally: ActionTally,
    inventory: InventoryLedger,
}

impl Harness {
    pub fn new() -> Self {
        let remote = FakeRemote::new();
        let session = Session::new(
            Box::new(remote.clone()),
            AuthMode::Ptc,
            Location::new(0.0, 0.0),
        );
        Self {
            remote,
            session,
            navigator: ScriptedNavigator::default(),
            pacer: RecordingPacer::default(),
            config: CycleConfig {
                username: "tester".into(),
                ..CycleConfig::default()
            },
            tally: ActionTally::default(),
            inventory: InventoryLedger,
        }
    }

    pub fn run<T>(&mut self, f: impl FnOnce(&mut Context<'_>) -> T) -> T {
        let mut ctx = Context {
            session: &mut self.session,
            inventory: &self.inventory,
            navigator: &mut self.navigator,
            pacer: &mut self.pacer,
            config: &self.config,
            tally: &mut self.tally,
        };
        f(&mut ctx)
    }
}
