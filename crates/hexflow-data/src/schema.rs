//! Serde data file structs for game content definitions.
//!
//! These structs define the on-disk format for resources, buildings,
//! infrastructure and tuning. They are deserialized from RON, JSON, or TOML
//! data files and then resolved into engine types by the loader. Amounts are
//! plain decimals on disk and become fixed-point during resolution.

use hexflow_core::catalog::{HubKind, ZoneCategory};
use hexflow_core::terrain::Terrain;
use serde::Deserialize;

/// A `("resource_name", amount)` pair.
pub type AmountData = (String, f64);

// ===========================================================================
// Resources
// ===========================================================================

/// A resource entry. Resources with a `base_value` are exportable.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceData {
    pub name: String,
    #[serde(default)]
    pub base_value: Option<f64>,
}

// ===========================================================================
// Buildings
// ===========================================================================

/// A building definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildingData {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<AmountData>,
    #[serde(default)]
    pub outputs: Vec<AmountData>,
    #[serde(default)]
    pub era: u32,
    /// Any-of terrain tags the cell must carry.
    #[serde(default)]
    pub requires: Vec<Terrain>,
    #[serde(default)]
    pub upgrades_to: Option<String>,
    #[serde(default)]
    pub cost: Vec<AmountData>,
    #[serde(default)]
    pub zone: Option<ZoneCategory>,
    #[serde(default)]
    pub hub: Option<HubData>,
    #[serde(default)]
    pub exports: bool,
    #[serde(default)]
    pub absorbs_surplus: bool,
    #[serde(default)]
    pub university: bool,
}

/// Hub role of a building.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct HubData {
    pub kind: HubKind,
    pub radius: u32,
}

// ===========================================================================
// Infrastructure
// ===========================================================================

/// Overrides for one infrastructure type, named like `"road"` or `"hv_line"`.
#[derive(Debug, Clone, Deserialize)]
pub struct InfraData {
    pub kind: String,
    pub step_cost: f64,
    #[serde(default)]
    pub money_cost: u32,
    #[serde(default)]
    pub cost: Vec<AmountData>,
    #[serde(default)]
    pub upgrades_to: Option<String>,
}

// ===========================================================================
// Tuning
// ===========================================================================

/// Balance overrides. Every field is optional; absent fields keep defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TuningData {
    pub processor_decay: Option<f64>,
    pub construction_decay: Option<f64>,
    pub export_decay: Option<f64>,
    pub construction_reserve: Option<f64>,
    pub hub_hop_cost: Option<f64>,
    pub max_route_cost: Option<f64>,
    pub market_saturation: Option<f64>,
    pub zone: Option<ZoneTuningData>,
    pub base_population: Option<BasePopulationData>,
    /// Drop the base population pseudo-producer entirely.
    pub no_base_population: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ZoneTuningData {
    pub min_members: Option<u32>,
    pub full_members: Option<u32>,
    pub min_distinct_types: Option<u32>,
    pub university_cap: Option<u32>,
    pub university_amplification: Option<f64>,
    pub output_scale: Option<f64>,
    pub input_scale: Option<f64>,
    pub max_input_reduction: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BasePopulationData {
    pub anchor: (i32, i32),
    pub outputs: Vec<AmountData>,
}

// ===========================================================================
// TOML wrappers
// ===========================================================================

/// TOML has no top-level arrays; list files wrap them in a table.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlResources {
    pub resources: Vec<ResourceData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlBuildings {
    pub buildings: Vec<BuildingData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlInfrastructure {
    pub infrastructure: Vec<InfraData>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn building_data_from_ron() {
        let ron_str = r#"(
            name: "sawmill",
            inputs: [("wood", 1.0)],
            outputs: [("goods", 0.5)],
            cost: [("stone", 5.0)],
            zone: Some(industry),
        )"#;
        let b: BuildingData = ron::from_str(ron_str).unwrap();
        assert_eq!(b.name, "sawmill");
        assert_eq!(b.inputs, vec![("wood".to_string(), 1.0)]);
        assert_eq!(b.zone, Some(ZoneCategory::Industry));
        assert!(b.hub.is_none());
        assert!(!b.exports);
    }

    #[test]
    fn building_defaults_from_ron() {
        let b: BuildingData = ron::from_str(r#"(name: "shed")"#).unwrap();
        assert!(b.inputs.is_empty());
        assert!(b.outputs.is_empty());
        assert_eq!(b.era, 0);
        assert!(b.requires.is_empty());
        assert!(b.upgrades_to.is_none());
    }

    #[test]
    fn hub_building_from_json() {
        let json = r#"{
            "name": "depot",
            "hub": {"kind": "depot", "radius": 2},
            "absorbs_surplus": true,
            "requires": ["plains", "hills"]
        }"#;
        let b: BuildingData = serde_json::from_str(json).unwrap();
        let hub = b.hub.unwrap();
        assert_eq!(hub.kind, HubKind::Depot);
        assert_eq!(hub.radius, 2);
        assert!(b.absorbs_surplus);
        assert_eq!(b.requires, vec![Terrain::Plains, Terrain::Hills]);
    }

    #[test]
    fn buildings_from_toml() {
        let toml_str = r#"
[[buildings]]
name = "woodcutter"
outputs = [["wood", 1.0]]
upgrades_to = "lumber_camp"
zone = "agricultural"

[[buildings]]
name = "lumber_camp"
outputs = [["wood", 2.0]]
"#;
        let w: TomlBuildings = toml::from_str(toml_str).unwrap();
        assert_eq!(w.buildings.len(), 2);
        assert_eq!(w.buildings[0].upgrades_to.as_deref(), Some("lumber_camp"));
        assert_eq!(w.buildings[1].outputs[0].1, 2.0);
    }

    #[test]
    fn resources_from_json() {
        let json = r#"[{"name": "goods", "base_value": 4.0}, {"name": "labor"}]"#;
        let r: Vec<ResourceData> = serde_json::from_str(json).unwrap();
        assert_eq!(r[0].base_value, Some(4.0));
        assert_eq!(r[1].base_value, None);
    }

    #[test]
    fn infrastructure_from_ron() {
        let ron_str = r#"[
            (kind: "road", step_cost: 0.5, money_cost: 10, cost: [("stone", 2.0)], upgrades_to: Some("rail")),
            (kind: "canal", step_cost: 0.3),
        ]"#;
        let i: Vec<InfraData> = ron::from_str(ron_str).unwrap();
        assert_eq!(i.len(), 2);
        assert_eq!(i[0].upgrades_to.as_deref(), Some("rail"));
        assert_eq!(i[1].money_cost, 0);
        assert!(i[1].cost.is_empty());
    }

    #[test]
    fn tuning_is_all_optional() {
        let t: TuningData = toml::from_str("").unwrap();
        assert!(t.processor_decay.is_none());
        assert!(!t.no_base_population);

        let t: TuningData = toml::from_str(
            r#"
processor_decay = 0.2
market_saturation = 50.0

[zone]
min_members = 10

[base_population]
anchor = [1, -1]
outputs = [["labor", 2.0]]
"#,
        )
        .unwrap();
        assert_eq!(t.processor_decay, Some(0.2));
        assert_eq!(t.zone.unwrap().min_members, Some(10));
        assert_eq!(t.base_population.unwrap().anchor, (1, -1));
    }
}
