//! Zone (supercluster) analysis.
//!
//! For each [`ZoneCategory`], operating buildings of that category together
//! with wildcards (universities and hubs) form connected components. A
//! component earns a bonus once it is both large and diverse enough; every
//! member keeps the best result over all categories it takes part in.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::catalog::{BuildingDef, Catalog, ZoneCategory};
use crate::config::ZoneConfig;
use crate::fixed::Fixed64;
use crate::grid::Grid;
use crate::hex::HexCoord;
use crate::id::BuildingTypeId;

/// Per-cell zone result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZoneInfo {
    pub category: Option<ZoneCategory>,
    /// Linear bonus in `[0, 1]`.
    pub bonus: Fixed64,
    /// Universities in the component, capped.
    pub universities: u32,
    /// Non-wildcard members of the component.
    pub size: u32,
}

impl ZoneInfo {
    /// Bonus amplified by the component's universities.
    pub fn strength(&self, cfg: &ZoneConfig) -> Fixed64 {
        self.bonus * (Fixed64::ONE + cfg.university_amplification * Fixed64::from_num(self.universities))
    }

    pub fn output_bonus(&self, cfg: &ZoneConfig) -> Fixed64 {
        self.strength(cfg) * cfg.output_scale
    }

    pub fn input_reduction(&self, cfg: &ZoneConfig) -> Fixed64 {
        (self.strength(cfg) * cfg.input_scale).min(cfg.max_input_reduction)
    }

    fn beats(&self, other: &ZoneInfo) -> bool {
        self.bonus > other.bonus || (self.bonus == other.bonus && self.size > other.size)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ZoneAnalysis {
    pub cells: BTreeMap<HexCoord, ZoneInfo>,
}

impl ZoneAnalysis {
    pub fn get(&self, coord: HexCoord) -> ZoneInfo {
        self.cells.get(&coord).copied().unwrap_or_default()
    }
}

enum Role {
    Member(BuildingTypeId),
    Wildcard { university: bool },
}

fn role(def: &BuildingDef, building: BuildingTypeId, category: ZoneCategory) -> Option<Role> {
    if def.is_zone_wildcard() {
        Some(Role::Wildcard {
            university: def.university,
        })
    } else if def.zone == Some(category) {
        Some(Role::Member(building))
    } else {
        None
    }
}

/// Linear ramp from `min_members` (0.0) to `full_members` (1.0).
fn component_bonus(members: u32, distinct: usize, cfg: &ZoneConfig) -> Fixed64 {
    if members < cfg.min_members || (distinct as u32) < cfg.min_distinct_types {
        return Fixed64::ZERO;
    }
    let span = cfg.full_members.saturating_sub(cfg.min_members);
    if span == 0 {
        return Fixed64::ONE;
    }
    let progress = Fixed64::from_num(members - cfg.min_members) / Fixed64::from_num(span);
    progress.min(Fixed64::ONE)
}

/// Zone bonus, university count and size for every operating building.
pub fn analyze_zones(grid: &Grid, catalog: &Catalog, cfg: &ZoneConfig) -> ZoneAnalysis {
    let mut analysis = ZoneAnalysis::default();

    for category in ZoneCategory::ALL {
        let roles: BTreeMap<HexCoord, Role> = grid
            .iter()
            .filter_map(|(coord, cell)| {
                let building = cell.operating()?;
                let def = catalog.building(building)?;
                role(def, building, category).map(|r| (coord, r))
            })
            .collect();

        let mut visited = BTreeSet::new();
        for &seed in roles.keys() {
            if !visited.insert(seed) {
                continue;
            }
            let mut component = vec![seed];
            let mut queue = VecDeque::from([seed]);
            while let Some(current) = queue.pop_front() {
                for next in current.neighbors() {
                    if roles.contains_key(&next) && visited.insert(next) {
                        component.push(next);
                        queue.push_back(next);
                    }
                }
            }

            let mut members = 0u32;
            let mut universities = 0u32;
            let mut types = BTreeSet::new();
            for coord in &component {
                match roles.get(coord) {
                    Some(Role::Member(ty)) => {
                        members += 1;
                        types.insert(*ty);
                    }
                    Some(Role::Wildcard { university: true }) => universities += 1,
                    _ => {}
                }
            }
            if members == 0 {
                continue;
            }

            let info = ZoneInfo {
                category: Some(category),
                bonus: component_bonus(members, types.len(), cfg),
                universities: universities.min(cfg.university_cap),
                size: members,
            };
            for coord in component {
                let slot = analysis.cells.entry(coord).or_default();
                if slot.category.is_none() || info.beats(slot) {
                    *slot = info;
                }
            }
        }
    }
    analysis
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::{fixed64_to_f64, ratio};
    use crate::test_utils::*;

    /// Fill the first `n` cells of a radius-5 hexagon with alternating
    /// farms and woodcutters. Cells are taken column by column, so the
    /// result is connected.
    fn farm_district(n: usize) -> (Grid, Vec<HexCoord>) {
        let catalog = sample_catalog();
        let mut grid = Grid::hexagon(5);
        let coords: Vec<HexCoord> = grid.coords().take(n).collect();
        for (i, &c) in coords.iter().enumerate() {
            let name = if i % 2 == 0 { "farm" } else { "woodcutter" };
            grid.place(c, id(&catalog, name));
        }
        (grid, coords)
    }

    #[test]
    fn small_district_has_no_bonus() {
        let catalog = sample_catalog();
        let (grid, coords) = farm_district(20);
        let zones = analyze_zones(&grid, &catalog, &ZoneConfig::default());
        let info = zones.get(coords[0]);
        assert_eq!(info.bonus, Fixed64::ZERO);
        assert_eq!(info.size, 20);
    }

    #[test]
    fn bonus_ramps_linearly() {
        let catalog = sample_catalog();
        let cfg = ZoneConfig::default();

        let (grid, coords) = farm_district(21);
        assert_eq!(analyze_zones(&grid, &catalog, &cfg).get(coords[0]).bonus, Fixed64::ZERO);

        let (grid, coords) = farm_district(42);
        assert_eq!(analyze_zones(&grid, &catalog, &cfg).get(coords[0]).bonus, Fixed64::ONE);

        let (grid, coords) = farm_district(31);
        let b = fixed64_to_f64(analyze_zones(&grid, &catalog, &cfg).get(coords[5]).bonus);
        assert!((b - 10.0 / 21.0).abs() < 1e-6);
    }

    #[test]
    fn single_type_district_does_not_qualify() {
        let catalog = sample_catalog();
        let mut grid = Grid::hexagon(5);
        let farm = id(&catalog, "farm");
        let coords: Vec<HexCoord> = grid.coords().take(42).collect();
        for &c in &coords {
            grid.place(c, farm);
        }
        let info = analyze_zones(&grid, &catalog, &ZoneConfig::default()).get(coords[0]);
        assert_eq!(info.bonus, Fixed64::ZERO);
        assert_eq!(info.size, 42);
    }

    #[test]
    fn paused_members_are_excluded() {
        let catalog = sample_catalog();
        let (mut grid, coords) = farm_district(42);
        grid.get_mut(coords[41]).unwrap().paused = true;
        let zones = analyze_zones(&grid, &catalog, &ZoneConfig::default());
        assert_eq!(zones.get(coords[0]).size, 41);
        assert!(!zones.cells.contains_key(&coords[41]));
    }

    #[test]
    fn universities_amplify_and_are_capped() {
        let catalog = sample_catalog();
        let cfg = ZoneConfig::default();
        let (mut grid, coords) = farm_district(42);
        let uni = id(&catalog, "university");
        let extra: Vec<HexCoord> = grid.coords().skip(42).take(6).collect();
        for &c in &extra {
            grid.place(c, uni);
        }
        let zones = analyze_zones(&grid, &catalog, &cfg);
        let info = zones.get(coords[0]);
        assert_eq!(info.universities, cfg.university_cap);
        assert_eq!(info.size, 42);
        // 1.0 * (1 + 0.25 * 4) = 2.0
        assert_eq!(info.strength(&cfg), Fixed64::from_num(2));
        assert_eq!(info.output_bonus(&cfg), Fixed64::ONE);
        assert_eq!(info.input_reduction(&cfg), ratio(1, 2));
        // Wildcards record the zone too.
        assert_eq!(zones.get(extra[0]).category, Some(ZoneCategory::Agricultural));
    }
}
