//! One sweep over the wild creatures visible from the current position.

use std::cmp::Ordering;

use tracing::{debug, info};

use crate::modules::capture::catch_encounter;
use crate::modules::context::Context;
use crate::modules::error::BotResult;
use crate::modules::movement::distance_meters;
use crate::modules::pacing::Pace;
use crate::modules::types::{CatchStatus, EncounterStatus, Location, WildSighting};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PassReport {
    pub sightings: usize,
    pub engaged: usize,
    pub caught: usize,
}

/// Sightings ordered nearest-first from `origin`. Ties keep their server order.
pub fn by_distance(origin: Location, mut sightings: Vec<WildSighting>) -> Vec<WildSighting> {
    sightings.sort_by(|a, b| {
        distance_meters(origin, a.location)
            .partial_cmp(&distance_meters(origin, b.location))
            .unwrap_or(Ordering::Equal)
    });
    sightings
}

/// Engage every visible sighting once, nearest first.
///
/// A failed encounter request is logged and skipped, never retried. The pass
/// always ends with the trailing pause, even when nothing was in sight.
pub fn encounter_pass(ctx: &mut Context<'_>) -> BotResult<PassReport> {
    let origin = ctx.session.position;
    let snapshot = ctx.session.map_snapshot()?;
    let queue = by_distance(origin, snapshot.sightings);
    let mut report = PassReport {
        sightings: queue.len(),
        ..PassReport::default()
    };
    debug!(target: "catch", visible = report.sightings, "encounter pass");

    for sighting in &queue {
        let distance = distance_meters(ctx.session.position, sighting.location);
        let approach = ctx.config.pacing.approach(distance);
        ctx.pace(approach);

        let encounter = ctx.session.remote().encounter(sighting)?;
        if encounter.status != EncounterStatus::Success {
            info!(
                target: "catch",
                species = %sighting.species,
                distance_m = distance.round(),
                status = ?encounter.status,
                "encounter refused"
            );
            continue;
        }

        report.engaged += 1;
        let attempt = catch_encounter(ctx, sighting, &encounter)?;
        if attempt.status == CatchStatus::Success {
            report.caught += 1;
        }
    }

    ctx.pace(Pace::EncounterPassEnd);
    Ok(report)
}
