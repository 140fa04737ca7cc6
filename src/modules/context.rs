use crate::modules::config::CycleConfig;
use crate::modules::inventory::Inventory;
use crate::modules::movement::Navigator;
use crate::modules::pacing::{Pace, Pacer};
use crate::modules::session::Session;
use crate::modules::stats::ActionTally;

/// Everything a cycle task needs, passed down explicitly.
pub struct Context<'a> {
    pub session: &'a mut Session,
    pub inventory: &'a dyn Inventory,
    pub navigator: &'a mut dyn Navigator,
    pub pacer: &'a mut dyn Pacer,
    pub config: &'a CycleConfig,
    pub tally: &'a mut ActionTally,
}

impl Context<'_> {
    pub fn pace(&mut self, pace: Pace) {
        let wait = self.config.pacing.duration(pace);
        self.pacer.pause(pace, wait);
    }
}
