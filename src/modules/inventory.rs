use std::collections::BTreeMap;

use crate::modules::error::BotResult;
use crate::modules::session::Remote;
use crate::modules::types::{InventorySnapshot, ItemKind, ItemStack, OwnedCreature, PlayerStats};

/// Inventory queries the decision core consumes. Every call reads fresh state.
pub trait Inventory {
    fn player_stats(&self, remote: &mut dyn Remote) -> BotResult<Option<PlayerStats>>;
    fn evolvable(&self, remote: &mut dyn Remote, allow: &[String]) -> BotResult<Vec<OwnedCreature>>;
    fn duplicates(
        &self,
        remote: &mut dyn Remote,
        keep_evolvable: bool,
        exclude: &[String],
    ) -> BotResult<Vec<OwnedCreature>>;
    fn recyclable(
        &self,
        remote: &mut dyn Remote,
        caps: &BTreeMap<ItemKind, u32>,
    ) -> BotResult<Vec<ItemStack>>;
    fn item_count(&self, remote: &mut dyn Remote, kind: ItemKind) -> BotResult<u32>;
    fn all_items(&self, remote: &mut dyn Remote) -> BotResult<Vec<ItemStack>>;
    fn best_cp_of_species(&self, remote: &mut dyn Remote, species: &str) -> BotResult<u32>;
}

/// Derives every answer from a freshly fetched [`InventorySnapshot`].
#[derive(Debug, Default, Clone, Copy)]
pub struct InventoryLedger;

impl Inventory for InventoryLedger {
    fn player_stats(&self, remote: &mut dyn Remote) -> BotResult<Option<PlayerStats>> {
        Ok(remote.inventory()?.player)
    }

    fn evolvable(&self, remote: &mut dyn Remote, allow: &[String]) -> BotResult<Vec<OwnedCreature>> {
        Ok(evolvable_creatures(&remote.inventory()?, allow))
    }

    fn duplicates(
        &self,
        remote: &mut dyn Remote,
        keep_evolvable: bool,
        exclude: &[String],
    ) -> BotResult<Vec<OwnedCreature>> {
        Ok(duplicate_creatures(
            &remote.inventory()?,
            keep_evolvable,
            exclude,
        ))
    }

    fn recyclable(
        &self,
        remote: &mut dyn Remote,
        caps: &BTreeMap<ItemKind, u32>,
    ) -> BotResult<Vec<ItemStack>> {
        Ok(excess_items(&remote.inventory()?, caps))
    }

    fn item_count(&self, remote: &mut dyn Remote, kind: ItemKind) -> BotResult<u32> {
        Ok(count_of(&remote.inventory()?.items, kind))
    }

    fn all_items(&self, remote: &mut dyn Remote) -> BotResult<Vec<ItemStack>> {
        Ok(merged_items(&remote.inventory()?.items))
    }

    fn best_cp_of_species(&self, remote: &mut dyn Remote, species: &str) -> BotResult<u32> {
        Ok(remote
            .inventory()?
            .creatures
            .iter()
            .filter(|c| c.species.eq_ignore_ascii_case(species))
            .map(|c| c.cp)
            .max()
            .unwrap_or(0))
    }
}

fn listed(list: &[String], species: &str) -> bool {
    list.iter().any(|s| s.eq_ignore_ascii_case(species))
}

fn count_of(items: &[ItemStack], kind: ItemKind) -> u32 {
    items
        .iter()
        .filter(|i| i.kind == kind)
        .fold(0u32, |acc, i| acc.saturating_add(i.count))
}

fn merged_items(items: &[ItemStack]) -> Vec<ItemStack> {
    let mut totals: BTreeMap<ItemKind, u32> = BTreeMap::new();
    for item in items {
        let entry = totals.entry(item.kind).or_default();
        *entry = entry.saturating_add(item.count);
    }
    totals
        .into_iter()
        .map(|(kind, count)| ItemStack { kind, count })
        .collect()
}

/// Creatures grouped by species, strongest first within each group.
fn by_species(creatures: &[OwnedCreature]) -> BTreeMap<String, Vec<OwnedCreature>> {
    let mut groups: BTreeMap<String, Vec<OwnedCreature>> = BTreeMap::new();
    for creature in creatures {
        groups
            .entry(creature.species.clone())
            .or_default()
            .push(creature.clone());
    }
    for group in groups.values_mut() {
        group.sort_by(|a, b| b.cp.cmp(&a.cp).then(a.id.cmp(&b.id)));
    }
    groups
}

/// How many evolutions the family candy pays for.
fn affordable_evolutions(group: &[OwnedCreature]) -> usize {
    group
        .first()
        .and_then(|c| match c.candy_to_evolve {
            Some(cost) if cost > 0 => Some((c.candy / cost) as usize),
            _ => None,
        })
        .unwrap_or(0)
}

pub fn evolvable_creatures(snapshot: &InventorySnapshot, allow: &[String]) -> Vec<OwnedCreature> {
    by_species(&snapshot.creatures)
        .into_iter()
        .filter(|(species, _)| allow.is_empty() || listed(allow, species))
        .flat_map(|(_, group)| {
            let take = affordable_evolutions(&group);
            group.into_iter().take(take)
        })
        .collect()
}

/// Everything but the best of each species, weakest first. Excluded species never appear.
pub fn duplicate_creatures(
    snapshot: &InventorySnapshot,
    keep_evolvable: bool,
    exclude: &[String],
) -> Vec<OwnedCreature> {
    let mut duplicates: Vec<OwnedCreature> = by_species(&snapshot.creatures)
        .into_iter()
        .filter(|(species, _)| !listed(exclude, species))
        .flat_map(|(_, group)| {
            let mut keep = 1;
            if keep_evolvable {
                keep += affordable_evolutions(&group);
            }
            group.into_iter().skip(keep)
        })
        .collect();
    duplicates.sort_by(|a, b| a.cp.cmp(&b.cp).then(a.id.cmp(&b.id)));
    duplicates
}

/// Items held beyond their cap, with the surplus as the count. Uncapped kinds are kept.
pub fn excess_items(snapshot: &InventorySnapshot, caps: &BTreeMap<ItemKind, u32>) -> Vec<ItemStack> {
    merged_items(&snapshot.items)
        .into_iter()
        .filter_map(|stack| {
            let cap = *caps.get(&stack.kind)?;
            (stack.count > cap).then(|| ItemStack {
                kind: stack.kind,
                count: stack.count - cap,
            })
        })
        .collect()
}
