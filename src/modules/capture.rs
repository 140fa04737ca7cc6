//! Ball choice and the per-encounter throw loop.

use tracing::info;

use crate::modules::context::Context;
use crate::modules::error::BotResult;
use crate::modules::movement::distance_meters;
use crate::modules::pacing::Pace;
use crate::modules::types::{CatchStatus, Encounter, EncounterId, ItemKind, WildSighting};

/// Below this catch chance a berry is fed first.
pub const CAPTURE_AID_MAX_PROBABILITY: f64 = 0.35;
/// Berries are only spent on creatures stronger than this.
pub const CAPTURE_AID_MIN_CP: u32 = 400;
pub const CAPTURE_AID_ITEM: ItemKind = ItemKind::RazzBerry;

const ELITE_CP: u32 = 1500;
const STRONG_CP: u32 = 1000;
const NOTABLE_CP: u32 = 600;

/// Ball stock, read fresh before every throw.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BallCounts {
    pub poke: u32,
    pub great: u32,
    pub ultra: u32,
    pub master: u32,
}

/// First matching rule wins. A missing CP never clears a threshold.
pub fn choose_ball(cp: Option<u32>, counts: BallCounts) -> ItemKind {
    let cp = cp.unwrap_or(0);

    if cp >= ELITE_CP {
        if counts.master > 0 {
            return ItemKind::MasterBall;
        }
        if counts.ultra > 0 {
            return ItemKind::UltraBall;
        }
        if counts.great > 0 {
            return ItemKind::GreatBall;
        }
    }

    if cp >= STRONG_CP {
        if counts.ultra > 0 {
            return ItemKind::UltraBall;
        }
        if counts.great > 0 {
            return ItemKind::GreatBall;
        }
    }

    if cp >= NOTABLE_CP && counts.great > 0 {
        return ItemKind::GreatBall;
    }

    if counts.poke > 0 {
        ItemKind::PokeBall
    } else if counts.great > 0 {
        ItemKind::GreatBall
    } else if counts.ultra > 0 {
        ItemKind::UltraBall
    } else if counts.master > 0 {
        ItemKind::MasterBall
    } else {
        // Out of stock; the throw is still attempted and the server decides.
        ItemKind::PokeBall
    }
}

/// Whether this encounter warrants feeding a berry before the next throw.
pub fn wants_capture_aid(encounter: &Encounter) -> bool {
    let hard_to_catch = encounter
        .capture_probability
        .is_some_and(|p| p < CAPTURE_AID_MAX_PROBABILITY);
    let strong = encounter.cp.is_some_and(|cp| cp > CAPTURE_AID_MIN_CP);
    hard_to_catch && strong
}

#[derive(Clone, Debug, PartialEq)]
pub struct CaptureAttempt {
    pub encounter_id: EncounterId,
    pub ball: ItemKind,
    pub status: CatchStatus,
    pub throws: u32,
}

fn ball_counts(ctx: &mut Context<'_>) -> BotResult<BallCounts> {
    let inventory = ctx.inventory;
    let remote = ctx.session.remote();
    Ok(BallCounts {
        poke: inventory.item_count(remote, ItemKind::PokeBall)?,
        great: inventory.item_count(remote, ItemKind::GreatBall)?,
        ultra: inventory.item_count(remote, ItemKind::UltraBall)?,
        master: inventory.item_count(remote, ItemKind::MasterBall)?,
    })
}

/// Throw until the creature is caught or the encounter ends some other way.
///
/// Missed and escaped throws loop back; the berry check and ball choice are
/// redone on every pass, so a long fight can consume several berries.
pub fn catch_encounter(
    ctx: &mut Context<'_>,
    sighting: &WildSighting,
    encounter: &Encounter,
) -> BotResult<CaptureAttempt> {
    let mut throws = 0u32;
    loop {
        if wants_capture_aid(encounter) {
            use_capture_aid(ctx, sighting)?;
        }

        let ball = choose_ball(encounter.cp, ball_counts(ctx)?);
        let distance = distance_meters(ctx.session.position, sighting.location);
        let status = ctx.session.remote().throw_ball(sighting, ball)?;
        throws += 1;
        ctx.tally.record_throw(status);

        let cp = encounter.cp.unwrap_or(0);
        let iv = format!("{:.2}", encounter.perfection());
        let chance = encounter.capture_probability.unwrap_or(0.0);
        if status == CatchStatus::Success {
            info!(
                target: "catch",
                species = %sighting.species,
                cp,
                iv = %iv,
                chance,
                distance_m = distance.round(),
                ball = %ball,
                "caught"
            );
        } else {
            info!(
                target: "catch",
                species = %sighting.species,
                cp,
                iv = %iv,
                chance,
                distance_m = distance.round(),
                status = ?status,
                ball = %ball,
                "throw did not catch"
            );
        }
        ctx.pace(Pace::AfterThrow);

        if !status.should_retry() {
            return Ok(CaptureAttempt {
                encounter_id: sighting.encounter_id,
                ball,
                status,
                throws,
            });
        }
    }
}

/// Feed one berry if any are held. Returns whether one was used.
pub fn use_capture_aid(ctx: &mut Context<'_>, sighting: &WildSighting) -> BotResult<bool> {
    let held = ctx
        .inventory
        .all_items(ctx.session.remote())?
        .into_iter()
        .find(|stack| stack.kind == CAPTURE_AID_ITEM && stack.count > 0);
    let Some(stack) = held else {
        return Ok(false);
    };

    ctx.session
        .remote()
        .use_capture_aid(sighting, CAPTURE_AID_ITEM)?;
    ctx.tally.record_berry();
    info!(
        target: "berry",
        item = %CAPTURE_AID_ITEM,
        remaining = stack.count - 1,
        "used"
    );
    ctx.pace(Pace::AfterCaptureAid);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::types::{EncounterStatus, IndividualStats};
    use crate::test_support::{Harness, sighting};

    fn counts(poke: u32, great: u32, ultra: u32, master: u32) -> BallCounts {
        BallCounts {
            poke,
            great,
            ultra,
            master,
        }
    }

    fn encounter(cp: u32, probability: f64) -> Encounter {
        Encounter {
            status: EncounterStatus::Success,
            cp: Some(cp),
            stats: Some(IndividualStats {
                attack: 10,
                defense: 10,
                stamina: 10,
            }),
            capture_probability: Some(probability),
        }
    }

    #[test]
    fn elite_targets_get_the_rarest_ball() {
        assert_eq!(choose_ball(Some(1600), counts(5, 3, 0, 1)), ItemKind::MasterBall);
        assert_eq!(choose_ball(Some(1600), counts(5, 3, 0, 0)), ItemKind::GreatBall);
        assert_eq!(choose_ball(Some(1500), counts(5, 3, 2, 0)), ItemKind::UltraBall);
        assert_eq!(choose_ball(Some(1600), counts(5, 0, 0, 0)), ItemKind::PokeBall);
    }

    #[test]
    fn strong_targets_never_get_the_master_ball_first() {
        assert_eq!(choose_ball(Some(1200), counts(5, 3, 2, 9)), ItemKind::UltraBall);
        assert_eq!(choose_ball(Some(1000), counts(5, 3, 0, 9)), ItemKind::GreatBall);
        assert_eq!(choose_ball(Some(1000), counts(5, 0, 0, 9)), ItemKind::PokeBall);
        assert_eq!(choose_ball(Some(999), counts(5, 0, 2, 9)), ItemKind::PokeBall);
    }

    #[test]
    fn notable_targets_use_great_balls_when_held() {
        assert_eq!(choose_ball(Some(600), counts(5, 1, 1, 1)), ItemKind::GreatBall);
        assert_eq!(choose_ball(Some(650), counts(5, 0, 1, 1)), ItemKind::PokeBall);
        assert_eq!(choose_ball(Some(599), counts(5, 1, 1, 1)), ItemKind::PokeBall);
    }

    #[test]
    fn weak_targets_walk_the_fallback_chain() {
        assert_eq!(choose_ball(Some(50), counts(0, 0, 0, 0)), ItemKind::PokeBall);
        assert_eq!(choose_ball(Some(50), counts(0, 2, 1, 1)), ItemKind::GreatBall);
        assert_eq!(choose_ball(Some(50), counts(0, 0, 1, 1)), ItemKind::UltraBall);
        assert_eq!(choose_ball(Some(50), counts(0, 0, 0, 1)), ItemKind::MasterBall);
        assert_eq!(choose_ball(None, counts(0, 4, 4, 4)), ItemKind::GreatBall);
        assert_eq!(choose_ball(None, counts(1, 4, 4, 4)), ItemKind::PokeBall);
    }

    #[test]
    fn capture_aid_needs_low_chance_and_high_cp() {
        assert!(wants_capture_aid(&encounter(401, 0.2)));
        assert!(!wants_capture_aid(&encounter(400, 0.2)));
        assert!(!wants_capture_aid(&encounter(900, 0.35)));
        let mut unknown = encounter(900, 0.1);
        unknown.capture_probability = None;
        assert!(!wants_capture_aid(&unknown));
    }

    #[test]
    fn throws_repeat_until_a_terminal_status() {
        let mut h = Harness::new();
        h.remote.stock(ItemKind::PokeBall, 10);
        h.remote.script_throws(&[
            CatchStatus::Missed,
            CatchStatus::Escaped,
            CatchStatus::Missed,
            CatchStatus::Success,
        ]);
        let target = sighting(1, "Pidgey", 0.0001, 0.0);

        let attempt = h.run(|ctx| catch_encounter(ctx, &target, &encounter(100, 0.8)));
        let attempt = attempt.unwrap();

        assert_eq!(attempt.status, CatchStatus::Success);
        assert_eq!(attempt.throws, 4);
        assert_eq!(h.remote.throws().len(), 4);
        assert_eq!(h.tally.catches, 1);
        assert_eq!(h.pacer.count(Pace::AfterThrow), 4);
    }

    #[test]
    fn flee_ends_the_loop_without_retry() {
        let mut h = Harness::new();
        h.remote.stock(ItemKind::PokeBall, 10);
        h.remote.script_throws(&[CatchStatus::Other, CatchStatus::Success]);
        let target = sighting(1, "Abra", 0.0, 0.0);

        let attempt = h
            .run(|ctx| catch_encounter(ctx, &target, &encounter(100, 0.8)))
            .unwrap();

        assert_eq!(attempt.status, CatchStatus::Other);
        assert_eq!(attempt.throws, 1);
    }

    #[test]
    fn berry_is_rechecked_on_every_retry() {
        let mut h = Harness::new();
        h.remote.stock(ItemKind::UltraBall, 3);
        h.remote.stock(ItemKind::RazzBerry, 5);
        h.remote.script_throws(&[CatchStatus::Escaped, CatchStatus::Escaped, CatchStatus::Success]);
        let target = sighting(9, "Snorlax", 0.0, 0.0);

        let attempt = h
            .run(|ctx| catch_encounter(ctx, &target, &encounter(1200, 0.1)))
            .unwrap();

        assert_eq!(attempt.ball, ItemKind::UltraBall);
        assert_eq!(h.remote.berries_used(), 3);
        assert_eq!(h.tally.berries, 3);
        assert_eq!(h.pacer.count(Pace::AfterCaptureAid), 3);
    }

    #[test]
    fn ball_choice_follows_stock_between_throws() {
        let mut h = Harness::new();
        h.remote.stock(ItemKind::GreatBall, 1);
        h.remote.stock(ItemKind::PokeBall, 5);
        h.remote.script_throws(&[CatchStatus::Missed, CatchStatus::Success]);
        let target = sighting(4, "Gyarados", 0.0, 0.0);

        h.run(|ctx| catch_encounter(ctx, &target, &encounter(1700, 0.9)))
            .unwrap();

        let balls: Vec<_> = h.remote.throws().into_iter().map(|(_, ball)| ball).collect();
        assert_eq!(balls, vec![ItemKind::GreatBall, ItemKind::PokeBall]);
    }

    #[test]
    fn no_berry_held_is_a_silent_no_op() {
        let mut h = Harness::new();
        let target = sighting(2, "Onix", 0.0, 0.0);
        let used = h.run(|ctx| use_capture_aid(ctx, &target)).unwrap();
        assert!(!used);
        assert_eq!(h.remote.berries_used(), 0);
        assert!(h.pacer.waits.is_empty());
    }
}
