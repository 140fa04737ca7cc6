//! Per-cycle housekeeping: evolve, release duplicates, discard excess items.

use tracing::{info, warn};

use crate::modules::config::CycleConfig;
use crate::modules::context::Context;
use crate::modules::error::BotResult;
use crate::modules::pacing::Pace;
use crate::modules::types::{EvolveStatus, OwnedCreature};

/// Worth keeping regardless of duplication. Both thresholds are inclusive.
pub fn should_retain(creature: &OwnedCreature, config: &CycleConfig) -> bool {
    creature.perfection() >= config.keep_min_iv_percentage || creature.cp >= config.keep_min_cp
}

/// Release every duplicate that clears neither keep threshold. Returns how many went.
pub fn release_duplicates(ctx: &mut Context<'_>) -> BotResult<usize> {
    let inventory = ctx.inventory;
    let candidates = inventory.duplicates(
        ctx.session.remote(),
        ctx.config.keep_evolvable_duplicates,
        &ctx.config.keep_species,
    )?;

    let mut released = 0;
    for creature in candidates {
        if should_retain(&creature, ctx.config) {
            continue;
        }

        ctx.session.remote().transfer(creature.id)?;
        released += 1;
        ctx.tally.record_transfer();

        let best = inventory.best_cp_of_species(ctx.session.remote(), &creature.species)?;
        info!(
            target: "transfer",
            species = %creature.species,
            cp = creature.cp,
            iv = %format!("{:.2}", creature.perfection()),
            best_cp = best,
            "released"
        );
        ctx.pace(Pace::AfterTransfer);
    }
    Ok(released)
}

/// Evolve everything the candy pays for, within the species allow-list.
pub fn evolve_all(ctx: &mut Context<'_>) -> BotResult<usize> {
    let inventory = ctx.inventory;
    let candidates = inventory.evolvable(ctx.session.remote(), &ctx.config.evolve_species)?;

    let mut evolved = 0;
    for creature in candidates {
        if !ctx.config.may_evolve(&creature.species) {
            continue;
        }
        let outcome = ctx.session.remote().evolve(creature.id)?;
        match outcome.status {
            EvolveStatus::Success => {
                evolved += 1;
                ctx.tally.record_evolution(outcome.experience);
                info!(
                    target: "evolve",
                    species = %creature.species,
                    cp = creature.cp,
                    xp = outcome.experience,
                    "evolved"
                );
            }
            status => {
                warn!(
                    target: "evolve",
                    species = %creature.species,
                    cp = creature.cp,
                    status = ?status,
                    "evolution failed"
                );
            }
        }
        ctx.pace(Pace::AfterEvolve);
    }
    Ok(evolved)
}

/// Discard whatever is held beyond its configured cap.
pub fn recycle_excess(ctx: &mut Context<'_>) -> BotResult<u32> {
    let inventory = ctx.inventory;
    let excess = inventory.recyclable(ctx.session.remote(), &ctx.config.recycle_caps)?;

    let mut discarded = 0u32;
    for stack in excess {
        ctx.session.remote().recycle(stack.kind, stack.count)?;
        discarded = discarded.saturating_add(stack.count);
        ctx.tally.record_recycle(stack.count);
        info!(target: "recycle", item = %stack.kind, count = stack.count, "recycled");
        ctx.pace(Pace::AfterRecycle);
    }
    Ok(discarded)
}
