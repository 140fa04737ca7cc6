//! The fixed per-cycle task order and its error boundary.

use tracing::{error, info};

use crate::modules::context::Context;
use crate::modules::error::BotResult;
use crate::modules::farming::farm_checkpoints;
use crate::modules::pacing::Pace;
use crate::modules::progress::LevelProgress;
use crate::modules::sweeps::{evolve_all, recycle_excess, release_duplicates};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed,
    /// A task failed with a cycle-local error; the rest of the cycle was skipped.
    Faulted,
}

/// Log the player's level progress, if the server reports one.
pub fn display_status(ctx: &mut Context<'_>) -> BotResult<()> {
    let inventory = ctx.inventory;
    if let Some(stats) = inventory.player_stats(ctx.session.remote())? {
        let progress = LevelProgress::from_stats(&stats);
        info!(
            target: "level",
            level = progress.level,
            earned = progress.earned,
            needed = progress.needed,
            "{progress}"
        );
    }
    ctx.pace(Pace::StatusDisplay);
    Ok(())
}

fn cycle_tasks(ctx: &mut Context<'_>) -> BotResult<()> {
    display_status(ctx)?;
    if ctx.config.evolve_with_enough_candy {
        evolve_all(ctx)?;
    }
    if ctx.config.transfer_duplicates {
        release_duplicates(ctx)?;
    }
    recycle_excess(ctx)?;
    farm_checkpoints(ctx)?;
    Ok(())
}

/// Run one cycle.
///
/// Transient errors leave immediately so the session can be rebuilt. Any
/// other failure is logged, ends the cycle early, and still pays the
/// trailing pause.
pub fn run_cycle(ctx: &mut Context<'_>) -> BotResult<CycleOutcome> {
    let outcome = match cycle_tasks(ctx) {
        Ok(()) => CycleOutcome::Completed,
        Err(err) if err.is_transient() => return Err(err),
        Err(err) => {
            error!(target: "session", error = %err, "cycle task failed; continuing");
            CycleOutcome::Faulted
        }
    };
    ctx.pace(Pace::CycleEnd);
    Ok(outcome)
}
