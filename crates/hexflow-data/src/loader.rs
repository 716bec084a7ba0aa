//! Resolution pipeline: reads data files, resolves cross-references, builds
//! the catalog and tuning.
//!
//! Provides format detection (RON/JSON/TOML), file discovery, deserialization
//! helpers, and [`load_game_data`], which ties them together.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use hexflow_core::catalog::{BuildingDef, Catalog, CatalogBuilder, CatalogError, HubSpec, InfraSpec, InfraType};
use hexflow_core::config::{BasePopulation, EngineConfig, ZoneConfig};
use hexflow_core::fixed::f64_to_fixed64;
use hexflow_core::hex::HexCoord;
use hexflow_core::resource::{Resource, ResourceMap};
use hexflow_market::MarketConfig;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::schema::{AmountData, BuildingData, InfraData, ResourceData, TuningData, ZoneTuningData};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A name reference could not be resolved.
    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// The resolved definitions failed catalog validation.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

const EXTENSIONS: [(&str, Format); 3] = [("ron", Format::Ron), ("toml", Format::Toml), ("json", Format::Json)];

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    let ext = path.extension().and_then(|e| e.to_str());
    EXTENSIONS
        .iter()
        .find(|(name, _)| Some(*name) == ext)
        .map(|(_, format)| *format)
        .ok_or_else(|| DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        })
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Find `{base_name}.ron`, `.toml` or `.json` in `dir`.
///
/// Returns `Ok(None)` if none exists, or `Err(ConflictingFormats)` if more
/// than one does.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;
    for (ext, _) in EXTENSIONS {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if !candidate.exists() {
            continue;
        }
        if let Some(existing) = found {
            return Err(DataLoadError::ConflictingFormats {
                a: existing,
                b: candidate,
            });
        }
        found = Some(candidate);
    }
    Ok(found)
}

/// Like [`find_data_file`], but a missing file is an error.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, detail: impl ToString) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: detail.to_string(),
    }
}

/// Read a file and deserialize it according to its format.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(path, e)),
    }
}

/// Deserialize a list. TOML files hold it under `toml_key` in a top-level
/// table; RON and JSON files hold a bare list.
pub fn deserialize_list<T: DeserializeOwned>(path: &Path, toml_key: &str) -> Result<Vec<T>, DataLoadError> {
    if detect_format(path)? != Format::Toml {
        return deserialize_file(path);
    }
    let content = std::fs::read_to_string(path)?;
    let table: toml::Table = toml::from_str(&content).map_err(|e| parse_error(path, e))?;
    let array = table
        .get(toml_key)
        .ok_or_else(|| parse_error(path, format!("missing key '{toml_key}' in TOML file")))?
        .clone();
    array
        .try_into()
        .map_err(|e: toml::de::Error| parse_error(path, e))
}

// ===========================================================================
// Name resolution helpers
// ===========================================================================

/// Look up a name, returning an `UnresolvedRef` error if not found.
pub fn resolve_name<'a, V>(
    map: &'a HashMap<String, V>,
    name: &str,
    file: &Path,
    expected_kind: &'static str,
) -> Result<&'a V, DataLoadError> {
    map.get(name).ok_or_else(|| DataLoadError::UnresolvedRef {
        file: file.to_path_buf(),
        name: name.to_string(),
        expected_kind,
    })
}

/// Fail with `DuplicateName` if `name` is already in `map`.
pub fn check_duplicate<V>(map: &HashMap<String, V>, name: &str, file: &Path) -> Result<(), DataLoadError> {
    if map.contains_key(name) {
        return Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Record `name` in `seen`, failing with `DuplicateName` if it was already there.
fn claim_name(seen: &mut HashSet<String>, name: &str, file: &Path) -> Result<(), DataLoadError> {
    if seen.insert(name.to_string()) {
        Ok(())
    } else {
        Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name: name.to_string(),
        })
    }
}

fn resolve_amounts(
    list: &[AmountData],
    resources: &HashMap<String, Resource>,
    file: &Path,
) -> Result<ResourceMap, DataLoadError> {
    let mut map = ResourceMap::new();
    for (name, amount) in list {
        let resource = *resolve_name(resources, name, file, "resource")?;
        map.add(resource, f64_to_fixed64(*amount));
    }
    Ok(map)
}

// ===========================================================================
// Loading pipeline
// ===========================================================================

/// Everything a host needs to run the engine and the market.
#[derive(Debug, Clone)]
pub struct GameData {
    pub catalog: Catalog,
    pub config: EngineConfig,
    pub market: MarketConfig,
}

/// Load `resources`, `buildings` and `infrastructure` (required) and
/// `tuning` (optional) from `dir`, each as `.ron`, `.toml` or `.json`.
pub fn load_game_data(dir: &Path) -> Result<GameData, DataLoadError> {
    let resources_path = require_data_file(dir, "resources")?;
    let buildings_path = require_data_file(dir, "buildings")?;
    let infra_path = require_data_file(dir, "infrastructure")?;
    let tuning_path = find_data_file(dir, "tuning")?;

    let resource_data: Vec<ResourceData> = deserialize_list(&resources_path, "resources")?;
    let building_data: Vec<BuildingData> = deserialize_list(&buildings_path, "buildings")?;
    let infra_data: Vec<InfraData> = deserialize_list(&infra_path, "infrastructure")?;

    let mut builder = CatalogBuilder::new();
    let resources = load_resources(&mut builder, &resource_data, &resources_path)?;
    load_buildings(&mut builder, &building_data, &resources, &buildings_path)?;
    load_infrastructure(&mut builder, &infra_data, &resources, &infra_path)?;
    builder.with_default_infrastructure();
    let catalog = builder.build()?;

    let mut config = EngineConfig::default();
    let mut market = MarketConfig::default();
    if let Some(path) = &tuning_path {
        let tuning: TuningData = deserialize_file(path)?;
        apply_tuning(&mut config, &mut market, &tuning, &resources, path)?;
    }

    debug!(
        resources = resources.len(),
        buildings = catalog.building_count(),
        tuned = tuning_path.is_some(),
        "game data loaded"
    );
    Ok(GameData {
        catalog,
        config,
        market,
    })
}

fn load_resources(
    builder: &mut CatalogBuilder,
    data: &[ResourceData],
    file: &Path,
) -> Result<HashMap<String, Resource>, DataLoadError> {
    let mut resources = HashMap::new();
    for entry in data {
        check_duplicate(&resources, &entry.name, file)?;
        let resource = Resource::from_name(&entry.name).ok_or_else(|| DataLoadError::UnresolvedRef {
            file: file.to_path_buf(),
            name: entry.name.clone(),
            expected_kind: "resource",
        })?;
        if let Some(value) = entry.base_value {
            builder.set_base_value(resource, f64_to_fixed64(value));
        }
        resources.insert(entry.name.clone(), resource);
    }
    Ok(resources)
}

fn load_buildings(
    builder: &mut CatalogBuilder,
    data: &[BuildingData],
    resources: &HashMap<String, Resource>,
    file: &Path,
) -> Result<(), DataLoadError> {
    let mut names = HashSet::new();
    for entry in data {
        claim_name(&mut names, &entry.name, file)?;
        let mut def = BuildingDef::new(&entry.name);
        def.inputs = resolve_amounts(&entry.inputs, resources, file)?;
        def.outputs = resolve_amounts(&entry.outputs, resources, file)?;
        def.construction_cost = resolve_amounts(&entry.cost, resources, file)?;
        def.era = entry.era;
        def.required_terrain = entry.requires.clone();
        def.zone = entry.zone;
        def.hub = entry.hub.map(|h| HubSpec {
            kind: h.kind,
            radius: h.radius,
        });
        def.exports = entry.exports;
        def.absorbs_surplus = entry.absorbs_surplus;
        def.university = entry.university;
        builder.register_building(def)?;
    }

    // Upgrades may point forward in the file, so resolve them after every
    // building is registered.
    for entry in data {
        if let Some(target) = &entry.upgrades_to {
            if !names.contains(target) {
                return Err(DataLoadError::UnresolvedRef {
                    file: file.to_path_buf(),
                    name: target.clone(),
                    expected_kind: "building",
                });
            }
            builder.set_upgrade(&entry.name, target)?;
        }
    }
    Ok(())
}

fn infra_type(name: &str, file: &Path) -> Result<InfraType, DataLoadError> {
    InfraType::from_name(name).ok_or_else(|| DataLoadError::UnresolvedRef {
        file: file.to_path_buf(),
        name: name.to_string(),
        expected_kind: "infrastructure",
    })
}

fn load_infrastructure(
    builder: &mut CatalogBuilder,
    data: &[InfraData],
    resources: &HashMap<String, Resource>,
    file: &Path,
) -> Result<(), DataLoadError> {
    let mut seen = HashSet::new();
    for entry in data {
        claim_name(&mut seen, &entry.kind, file)?;
        let kind = infra_type(&entry.kind, file)?;
        let upgrades_to = entry
            .upgrades_to
            .as_deref()
            .map(|name| infra_type(name, file))
            .transpose()?;
        builder.set_infrastructure(
            kind,
            InfraSpec {
                step_cost: f64_to_fixed64(entry.step_cost),
                money_cost: entry.money_cost,
                construction_cost: resolve_amounts(&entry.cost, resources, file)?,
                upgrades_to,
            },
        );
    }
    Ok(())
}

fn apply_zone_tuning(zone: &mut ZoneConfig, t: &ZoneTuningData) {
    if let Some(v) = t.min_members {
        zone.min_members = v;
    }
    if let Some(v) = t.full_members {
        zone.full_members = v;
    }
    if let Some(v) = t.min_distinct_types {
        zone.min_distinct_types = v;
    }
    if let Some(v) = t.university_cap {
        zone.university_cap = v;
    }
    let fixed_fields = [
        (&mut zone.university_amplification, t.university_amplification),
        (&mut zone.output_scale, t.output_scale),
        (&mut zone.input_scale, t.input_scale),
        (&mut zone.max_input_reduction, t.max_input_reduction),
    ];
    for (slot, value) in fixed_fields {
        if let Some(v) = value {
            *slot = f64_to_fixed64(v);
        }
    }
}

fn apply_tuning(
    config: &mut EngineConfig,
    market: &mut MarketConfig,
    t: &TuningData,
    resources: &HashMap<String, Resource>,
    file: &Path,
) -> Result<(), DataLoadError> {
    let fixed_fields = [
        (&mut config.processor_decay, t.processor_decay),
        (&mut config.construction_decay, t.construction_decay),
        (&mut config.export_decay, t.export_decay),
        (&mut config.construction_reserve, t.construction_reserve),
        (&mut config.hub_hop_cost, t.hub_hop_cost),
        (&mut config.max_route_cost, t.max_route_cost),
        (&mut market.saturation, t.market_saturation),
    ];
    for (slot, value) in fixed_fields {
        if let Some(v) = value {
            *slot = f64_to_fixed64(v);
        }
    }
    if let Some(zone) = &t.zone {
        apply_zone_tuning(&mut config.zone, zone);
    }
    if let Some(base) = &t.base_population {
        config.base_population = Some(BasePopulation {
            anchor: HexCoord::new(base.anchor.0, base.anchor.1),
            outputs: resolve_amounts(&base.outputs, resources, file)?,
        });
    }
    if t.no_base_population {
        config.base_population = None;
    }
    Ok(())
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use hexflow_core::catalog::HubKind;
    use hexflow_core::fixed::{Fixed64, ratio};
    use std::fs;

    /// Create a temporary directory with a unique name for test isolation.
    fn make_test_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("hexflow_data_test_{suffix}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn cleanup(dir: &Path) {
        let _ = fs::remove_dir_all(dir);
    }

    const RESOURCES_RON: &str = r#"[
        (name: "wood", base_value: Some(1.0)),
        (name: "stone"),
        (name: "goods", base_value: Some(4.0)),
        (name: "labor"),
    ]"#;

    const BUILDINGS_RON: &str = r#"[
        (name: "woodcutter", outputs: [("wood", 1.0)], upgrades_to: Some("lumber_camp"), zone: Some(agricultural)),
        (name: "lumber_camp", outputs: [("wood", 2.0)], cost: [("wood", 4.0), ("stone", 2.0)]),
        (name: "sawmill", inputs: [("wood", 1.0)], outputs: [("goods", 0.5)]),
        (name: "depot", hub: Some((kind: depot, radius: 2)), absorbs_surplus: true),
    ]"#;

    const INFRA_RON: &str = r#"[
        (kind: "road", step_cost: 0.4, money_cost: 12, cost: [("stone", 1.0)], upgrades_to: Some("rail")),
    ]"#;

    fn write_ron_set(dir: &Path) {
        fs::write(dir.join("resources.ron"), RESOURCES_RON).unwrap();
        fs::write(dir.join("buildings.ron"), BUILDINGS_RON).unwrap();
        fs::write(dir.join("infrastructure.ron"), INFRA_RON).unwrap();
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    #[test]
    fn detect_format_by_extension() {
        assert_eq!(detect_format(Path::new("a.ron")).unwrap(), Format::Ron);
        assert_eq!(detect_format(Path::new("a.toml")).unwrap(), Format::Toml);
        assert_eq!(detect_format(Path::new("a.json")).unwrap(), Format::Json);
        assert!(matches!(
            detect_format(Path::new("a.yaml")),
            Err(DataLoadError::UnsupportedFormat { .. })
        ));
        assert!(matches!(
            detect_format(Path::new("a")),
            Err(DataLoadError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn find_data_file_conflict() {
        let dir = make_test_dir("find_conflict");
        fs::write(dir.join("buildings.ron"), "[]").unwrap();
        fs::write(dir.join("buildings.json"), "[]").unwrap();
        assert!(matches!(
            find_data_file(&dir, "buildings"),
            Err(DataLoadError::ConflictingFormats { .. })
        ));
        assert_eq!(find_data_file(&dir, "tuning").unwrap(), None);
        cleanup(&dir);
    }

    #[test]
    fn deserialize_list_toml_missing_key() {
        let dir = make_test_dir("list_toml_missing");
        let path = dir.join("resources.toml");
        fs::write(&path, r#"foo = "bar""#).unwrap();
        let result: Result<Vec<ResourceData>, _> = deserialize_list(&path, "resources");
        assert!(matches!(result, Err(DataLoadError::Parse { .. })));
        cleanup(&dir);
    }

    #[test]
    fn deserialize_file_parse_error() {
        let dir = make_test_dir("parse_err");
        let path = dir.join("resources.ron");
        fs::write(&path, "this is not valid RON {{{").unwrap();
        let result: Result<Vec<ResourceData>, _> = deserialize_file(&path);
        assert!(matches!(result, Err(DataLoadError::Parse { .. })));
        cleanup(&dir);
    }

    #[test]
    fn resolve_and_duplicate_helpers() {
        let mut map = HashMap::new();
        map.insert("wood".to_string(), Resource::Wood);
        assert_eq!(*resolve_name(&map, "wood", Path::new("x.ron"), "resource").unwrap(), Resource::Wood);
        assert!(matches!(
            resolve_name(&map, "ore", Path::new("x.ron"), "resource"),
            Err(DataLoadError::UnresolvedRef { ref name, expected_kind: "resource", .. }) if name == "ore"
        ));
        assert!(check_duplicate(&map, "stone", Path::new("x.ron")).is_ok());
        assert!(matches!(
            check_duplicate(&map, "wood", Path::new("x.ron")),
            Err(DataLoadError::DuplicateName { .. })
        ));
    }

    // -----------------------------------------------------------------------
    // load_game_data
    // -----------------------------------------------------------------------

    #[test]
    fn load_ron_set() {
        let dir = make_test_dir("load_ron");
        write_ron_set(&dir);
        let data = load_game_data(&dir).unwrap();
        let catalog = &data.catalog;

        assert_eq!(catalog.building_count(), 4);
        let wc = catalog.building_id("woodcutter").unwrap();
        let camp = catalog.building_id("lumber_camp").unwrap();
        assert_eq!(catalog.building(wc).unwrap().upgrades_to, Some(camp));
        assert!(catalog.cluster_compatible(wc, camp));
        assert_eq!(
            catalog.building(camp).unwrap().construction_cost.get(Resource::Stone),
            Fixed64::from_num(2)
        );
        let depot = catalog.building(catalog.building_id("depot").unwrap()).unwrap();
        assert!(depot.is_hub());
        assert_eq!(depot.hub.unwrap().kind, HubKind::Depot);

        assert!(catalog.is_exportable(Resource::Goods));
        assert!(!catalog.is_exportable(Resource::Labor));
        assert_eq!(catalog.step_cost(InfraType::Road), f64_to_fixed64(0.4));
        // Types not in the file keep their stock numbers.
        assert_eq!(catalog.step_cost(InfraType::Rail), ratio(1, 4));

        assert_eq!(data.config, EngineConfig::default());
        assert_eq!(data.market.saturation, Fixed64::from_num(100));
        cleanup(&dir);
    }

    #[test]
    fn load_toml_and_json_sets() {
        let dir = make_test_dir("load_mixed");
        fs::write(
            dir.join("resources.toml"),
            r#"
[[resources]]
name = "wood"
base_value = 1.0

[[resources]]
name = "goods"
"#,
        )
        .unwrap();
        fs::write(
            dir.join("buildings.json"),
            r#"[{"name": "woodcutter", "outputs": [["wood", 1.0]]},
                {"name": "export_port", "inputs": [["goods", 1.0]], "exports": true}]"#,
        )
        .unwrap();
        fs::write(dir.join("infrastructure.toml"), "infrastructure = []\n").unwrap();

        let data = load_game_data(&dir).unwrap();
        let port = data
            .catalog
            .building(data.catalog.building_id("export_port").unwrap())
            .unwrap();
        assert!(port.exports);
        assert!(!data.catalog.is_exportable(Resource::Goods));
        cleanup(&dir);
    }

    #[test]
    fn tuning_overrides_defaults() {
        let dir = make_test_dir("tuning");
        write_ron_set(&dir);
        fs::write(
            dir.join("tuning.toml"),
            r#"
processor_decay = 0.2
max_route_cost = 8.0
market_saturation = 50.0

[zone]
min_members = 10
output_scale = 1.0

[base_population]
anchor = [2, -1]
outputs = [["labor", 3.0]]
"#,
        )
        .unwrap();

        let data = load_game_data(&dir).unwrap();
        assert_eq!(data.config.processor_decay, f64_to_fixed64(0.2));
        assert_eq!(data.config.max_route_cost, Fixed64::from_num(8));
        assert_eq!(data.config.construction_decay, ratio(1, 10));
        assert_eq!(data.config.zone.min_members, 10);
        assert_eq!(data.config.zone.full_members, 42);
        assert_eq!(data.config.zone.output_scale, Fixed64::ONE);
        let base = data.config.base_population.unwrap();
        assert_eq!(base.anchor, HexCoord::new(2, -1));
        assert_eq!(base.outputs.get(Resource::Labor), Fixed64::from_num(3));
        assert_eq!(data.market.saturation, Fixed64::from_num(50));
        cleanup(&dir);
    }

    #[test]
    fn tuning_can_drop_base_population() {
        let dir = make_test_dir("no_base");
        write_ron_set(&dir);
        fs::write(dir.join("tuning.json"), r#"{"no_base_population": true}"#).unwrap();
        let data = load_game_data(&dir).unwrap();
        assert!(data.config.base_population.is_none());
        cleanup(&dir);
    }

    #[test]
    fn missing_required_file() {
        let dir = make_test_dir("missing");
        fs::write(dir.join("resources.ron"), RESOURCES_RON).unwrap();
        let err = load_game_data(&dir).unwrap_err();
        assert!(matches!(err, DataLoadError::MissingRequired { ref file, .. } if file == "buildings"));
        cleanup(&dir);
    }

    #[test]
    fn unknown_resource_in_building() {
        let dir = make_test_dir("bad_resource");
        write_ron_set(&dir);
        fs::write(dir.join("buildings.ron"), r#"[(name: "mine", outputs: [("ore", 1.0)])]"#).unwrap();
        let err = load_game_data(&dir).unwrap_err();
        assert!(matches!(
            err,
            DataLoadError::UnresolvedRef { ref name, expected_kind: "resource", .. } if name == "ore"
        ));
        cleanup(&dir);
    }

    #[test]
    fn unknown_resource_name() {
        let dir = make_test_dir("bad_resource_name");
        write_ron_set(&dir);
        fs::write(dir.join("resources.ron"), r#"[(name: "unobtainium")]"#).unwrap();
        assert!(matches!(
            load_game_data(&dir),
            Err(DataLoadError::UnresolvedRef { expected_kind: "resource", .. })
        ));
        cleanup(&dir);
    }

    #[test]
    fn unknown_upgrade_target() {
        let dir = make_test_dir("bad_upgrade");
        write_ron_set(&dir);
        fs::write(
            dir.join("buildings.ron"),
            r#"[(name: "woodcutter", upgrades_to: Some("sawmill"))]"#,
        )
        .unwrap();
        assert!(matches!(
            load_game_data(&dir),
            Err(DataLoadError::UnresolvedRef { expected_kind: "building", .. })
        ));
        cleanup(&dir);
    }

    #[test]
    fn duplicate_building_name() {
        let dir = make_test_dir("dup_building");
        write_ron_set(&dir);
        fs::write(
            dir.join("buildings.ron"),
            r#"[(name: "farm"), (name: "farm")]"#,
        )
        .unwrap();
        assert!(matches!(
            load_game_data(&dir),
            Err(DataLoadError::DuplicateName { ref name, .. }) if name == "farm"
        ));
        cleanup(&dir);
    }

    #[test]
    fn claim_name_rejects_repeats() {
        let mut seen = HashSet::new();
        assert!(claim_name(&mut seen, "road", Path::new("x.ron")).is_ok());
        assert!(claim_name(&mut seen, "rail", Path::new("x.ron")).is_ok());
        assert!(matches!(
            claim_name(&mut seen, "road", Path::new("x.ron")),
            Err(DataLoadError::DuplicateName { ref name, .. }) if name == "road"
        ));
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn duplicate_infrastructure_kind() {
        let dir = make_test_dir("dup_infra");
        write_ron_set(&dir);
        fs::write(
            dir.join("infrastructure.ron"),
            r#"[(kind: "road", step_cost: 0.4), (kind: "road", step_cost: 0.5)]"#,
        )
        .unwrap();
        assert!(matches!(
            load_game_data(&dir),
            Err(DataLoadError::DuplicateName { ref name, .. }) if name == "road"
        ));
        cleanup(&dir);
    }

    #[test]
    fn unknown_infrastructure_kind() {
        let dir = make_test_dir("bad_infra");
        write_ron_set(&dir);
        fs::write(dir.join("infrastructure.ron"), r#"[(kind: "monorail", step_cost: 0.1)]"#).unwrap();
        assert!(matches!(
            load_game_data(&dir),
            Err(DataLoadError::UnresolvedRef { expected_kind: "infrastructure", .. })
        ));
        cleanup(&dir);
    }

    #[test]
    fn catalog_validation_surfaces() {
        let dir = make_test_dir("bad_catalog");
        write_ron_set(&dir);
        fs::write(
            dir.join("buildings.ron"),
            r#"[(name: "depot", hub: Some((kind: depot, radius: 0)))]"#,
        )
        .unwrap();
        assert!(matches!(
            load_game_data(&dir),
            Err(DataLoadError::Catalog(CatalogError::ZeroHubRadius(_)))
        ));
        cleanup(&dir);
    }

    #[test]
    fn error_display_messages() {
        let e = DataLoadError::MissingRequired {
            file: "buildings".to_string(),
            dir: PathBuf::from("/data"),
        };
        assert!(e.to_string().contains("buildings"));
        assert!(e.to_string().contains("/data"));

        let e = DataLoadError::UnresolvedRef {
            file: PathBuf::from("buildings.ron"),
            name: "ore".to_string(),
            expected_kind: "resource",
        };
        assert!(e.to_string().contains("ore"));
        assert!(e.to_string().contains("resource"));

        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let e: DataLoadError = io_err.into();
        assert!(matches!(e, DataLoadError::Io(_)));
    }
}
