//! Checkpoint farming: walk to every ready checkpoint, nearest first.

use std::cmp::Ordering;

use chrono::Utc;
use tracing::{debug, info};

use crate::modules::context::Context;
use crate::modules::encounter::encounter_pass;
use crate::modules::error::BotResult;
use crate::modules::movement::{TravelProgress, distance_meters};
use crate::modules::pacing::Pace;
use crate::modules::sweeps::{recycle_excess, release_duplicates};
use crate::modules::types::{Checkpoint, CheckpointReward, Location};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FarmReport {
    pub ready: usize,
    pub visited: usize,
    pub scans: usize,
}

/// Checkpoints off cooldown, ordered once by distance from `origin`.
pub fn route(origin: Location, checkpoints: Vec<Checkpoint>, now_ms: i64) -> Vec<Checkpoint> {
    let mut ready: Vec<Checkpoint> = checkpoints
        .into_iter()
        .filter(|c| c.ready(now_ms))
        .collect();
    ready.sort_by(|a, b| {
        distance_meters(origin, a.location)
            .partial_cmp(&distance_meters(origin, b.location))
            .unwrap_or(Ordering::Equal)
    });
    ready
}

pub fn farm_checkpoints(ctx: &mut Context<'_>) -> BotResult<FarmReport> {
    farm_checkpoints_at(ctx, Utc::now().timestamp_millis())
}

/// One farming pass against a single map snapshot.
///
/// The route is fixed when the pass starts; moving along it never reorders
/// what is left, and cooldowns are not re-read mid-pass.
pub fn farm_checkpoints_at(ctx: &mut Context<'_>, now_ms: i64) -> BotResult<FarmReport> {
    let origin = ctx.session.position;
    let snapshot = ctx.session.map_snapshot()?;
    let stops = route(origin, snapshot.checkpoints, now_ms);
    let mut report = FarmReport {
        ready: stops.len(),
        ..FarmReport::default()
    };
    debug!(target: "checkpoint", ready = report.ready, "farming pass");

    for stop in &stops {
        let distance = distance_meters(ctx.session.position, stop.location);
        report.scans += walk_to(ctx, stop.location)?;

        let details = ctx.session.remote().checkpoint_info(stop)?;
        let reward = ctx.session.remote().interact_checkpoint(stop)?;
        report.visited += 1;
        ctx.tally.record_checkpoint(reward.experience);
        info!(
            target: "checkpoint",
            name = %details.name,
            distance_m = distance.round(),
            "visited"
        );
        if let Some(items) = reward_summary(&reward) {
            info!(
                target: "checkpoint",
                name = %details.name,
                xp = reward.experience,
                gems = reward.gems,
                egg = reward.egg,
                items = %items,
                "rewarded"
            );
        }
        ctx.pace(Pace::CheckpointSettle);

        recycle_excess(ctx)?;
        encounter_pass(ctx)?;
        if ctx.config.transfer_duplicates {
            release_duplicates(ctx)?;
        }
    }

    Ok(report)
}

/// Item line for a rewarded visit; `None` when the visit earned no XP.
fn reward_summary(reward: &CheckpointReward) -> Option<String> {
    if reward.experience == 0 {
        return None;
    }
    let items = reward
        .items
        .iter()
        .map(|stack| format!("{} x{}", stack.kind, stack.count))
        .collect::<Vec<_>>()
        .join(", ");
    Some(items)
}

/// Poll the navigator until arrival, sweeping for sightings when a scan is due.
fn walk_to(ctx: &mut Context<'_>, target: Location) -> BotResult<usize> {
    ctx.navigator.begin(target, ctx.config.walking_speed_kmh);
    let mut scans = 0;
    loop {
        match ctx.navigator.advance(ctx.session, ctx.pacer)? {
            TravelProgress::Arrived => return Ok(scans),
            TravelProgress::EnRoute { scan_due: true, .. } => {
                encounter_pass(ctx)?;
                scans += 1;
            }
            TravelProgress::EnRoute { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::types::{FortKind, ItemKind, ItemStack, MapSnapshot};
    use crate::test_support::{Harness, checkpoint, creature};

    const NOW: i64 = 1_700_000_000_000;

    fn map(checkpoints: Vec<Checkpoint>) -> MapSnapshot {
        MapSnapshot {
            sightings: Vec::new(),
            checkpoints,
        }
    }

    #[test]
    fn route_skips_cooldowns_and_gyms() {
        let mut gym = checkpoint("gym", 0.0002, 0.0, 0);
        gym.kind = FortKind::Gym;
        let stops = route(
            Location::new(0.0, 0.0),
            vec![
                checkpoint("hot", 0.0001, 0.0, NOW + 60_000),
                gym,
                checkpoint("ok", 0.0003, 0.0, NOW - 1),
            ],
            NOW,
        );
        let ids: Vec<_> = stops.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["ok"]);
    }

    #[test]
    fn visits_follow_the_order_fixed_at_pass_start() {
        let mut h = Harness::new();
        // From the origin: b, c, a. Standing at b, a would be closer than c.
        h.remote.set_map(map(vec![
            checkpoint("a", 0.003, 0.0, 0),
            checkpoint("b", 0.001, 0.0, 0),
            checkpoint("c", -0.0015, 0.0, 0),
        ]));

        let report = h.run(|ctx| farm_checkpoints_at(ctx, NOW)).unwrap();

        assert_eq!(h.remote.visited(), vec!["b", "c", "a"]);
        assert_eq!(report.visited, 3);
        assert_eq!(h.navigator.legs.len(), 3);
        assert_eq!(h.tally.checkpoints, 3);
        assert_eq!(h.pacer.count(Pace::CheckpointSettle), 3);
    }

    #[test]
    fn scans_run_while_walking_and_after_each_stop() {
        let mut h = Harness::new();
        h.navigator.steps_per_leg = 4;
        h.navigator.scan_on_step = Some(2);
        h.remote
            .set_map(map(vec![checkpoint("a", 0.001, 0.0, 0), checkpoint("b", 0.002, 0.0, 0)]));

        let report = h.run(|ctx| farm_checkpoints_at(ctx, NOW)).unwrap();

        assert_eq!(report.scans, 2);
        // Route snapshot, then one scan en route and one after arrival per stop.
        assert_eq!(h.remote.calls("map_snapshot"), 5);
        assert_eq!(h.pacer.count(Pace::EncounterPassEnd), 4);
    }

    #[test]
    fn housekeeping_follows_each_visit() {
        let mut h = Harness::new();
        h.config.transfer_duplicates = true;
        h.config.recycle_caps = [(ItemKind::Potion, 1)].into();
        h.remote.stock(ItemKind::Potion, 4);
        h.remote.own(creature(1, "Rattata", 200, (0, 0, 0)));
        h.remote.own(creature(2, "Rattata", 90, (0, 0, 0)));
        h.remote.set_map(map(vec![checkpoint("a", 0.001, 0.0, 0)]));

        h.run(|ctx| farm_checkpoints_at(ctx, NOW)).unwrap();

        assert_eq!(h.remote.recycled(), vec![(ItemKind::Potion, 3)]);
        assert_eq!(h.remote.transferred(), vec![2]);
    }

    #[test]
    fn zero_xp_visits_still_count() {
        let mut h = Harness::new();
        h.remote.set_map(map(vec![
            checkpoint("dry", 0.001, 0.0, 0),
            checkpoint("wet", 0.002, 0.0, 0),
        ]));
        h.remote.set_reward("dry", CheckpointReward::default());

        let report = h.run(|ctx| farm_checkpoints_at(ctx, NOW)).unwrap();

        assert_eq!(report.visited, 2);
        assert_eq!(h.tally.checkpoints, 2);
        assert_eq!(h.tally.experience, 50);
    }

    #[test]
    fn rewards_are_summarised_only_when_xp_was_earned() {
        let empty = CheckpointReward {
            items: vec![ItemStack {
                kind: ItemKind::PokeBall,
                count: 1,
            }],
            ..CheckpointReward::default()
        };
        assert_eq!(reward_summary(&empty), None);

        let earned = CheckpointReward {
            experience: 50,
            items: vec![
                ItemStack {
                    kind: ItemKind::PokeBall,
                    count: 3,
                },
                ItemStack {
                    kind: ItemKind::RazzBerry,
                    count: 1,
                },
            ],
            ..CheckpointReward::default()
        };
        assert_eq!(
            reward_summary(&earned).as_deref(),
            Some("poke_ball x3, razz_berry x1")
        );
    }

    #[test]
    fn duplicates_stay_when_transfers_are_off() {
        let mut h = Harness::new();
        h.remote.own(creature(1, "Rattata", 200, (0, 0, 0)));
        h.remote.own(creature(2, "Rattata", 90, (0, 0, 0)));
        h.remote.set_map(map(vec![checkpoint("a", 0.001, 0.0, 0)]));

        h.run(|ctx| farm_checkpoints_at(ctx, NOW)).unwrap();

        assert!(h.remote.transferred().is_empty());
        assert_eq!(h.remote.calls("transfer"), 0);
    }
}
