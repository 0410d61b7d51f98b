#![forbid(unsafe_code)]

//! Versioned persistence of grids, activity layouts and layouts.
//!
//! Every persisted entity travels in a `base64url(<json>//<version>)`
//! envelope. Decoding upgrades stale payloads through the entity's
//! migration chain before parsing, then rebuilds parent links, recomputes
//! visibility and validates the grid. Payloads from a newer version are
//! rejected rather than guessed at.
//!
//! Grids are written through the path-glob stringifier so that transient
//! fields (`visible`, `activationInstant`, `markedForRemoval`) never reach
//! storage. The canonical form additionally drops generated ids and sorts
//! keys; two layouts with equal canonical forms look the same to the user.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use workbench_core::codec;
use workbench_core::{Exclusion, GlobError, MigrationChain, StringifyOptions, stringify};

use crate::activity::ActivityLayout;
use crate::error::LayoutError;
use crate::layout::{GridName, Layout};
use crate::migrations::{activity_layout_migrations, grid_migrations, layout_migrations};
use crate::model::{
    Direction, ElementId, ElementKind, GridElement, Navigation, Part, PartGrid, TreeNode, View,
    ViewId,
};
use crate::outlets::Outlets;

pub const GRID_VERSION: u32 = 7;
pub const LAYOUT_VERSION: u32 = 6;
pub const ACTIVITY_LAYOUT_VERSION: u32 = 1;

const TREE_NODE_TAG: &str = "MTreeNode";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MPartGrid {
    #[serde(default)]
    root: Option<MElement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    active_part_id: Option<ElementId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reference_part_id: Option<ElementId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
enum MElement {
    MTreeNode(MTreeNode),
    MPart(MPart),
}

impl MElement {
    fn id(&self) -> &ElementId {
        match self {
            Self::MTreeNode(node) => &node.id,
            Self::MPart(part) => &part.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MTreeNode {
    id: ElementId,
    child1: Box<MElement>,
    child2: Box<MElement>,
    direction: Direction,
    ratio: f64,
    #[serde(default)]
    visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MPart {
    id: ElementId,
    structural: bool,
    #[serde(default)]
    views: Vec<View>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    active_view_id: Option<ViewId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    navigation: Option<Navigation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    css_class: Vec<String>,
    #[serde(default)]
    visible: bool,
    #[serde(default)]
    activation_instant: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MLayout {
    grids: BTreeMap<String, String>,
    activity_layout: String,
    #[serde(default)]
    outlets: Outlets,
}

// ---- Stringifier options ----

fn glob_error(error: GlobError) -> LayoutError {
    LayoutError::Serialize {
        reason: error.to_string(),
    }
}

/// Drops derived and session-only fields. Each exclusion also checks the
/// value type so that user data keys spelled like a transient field survive.
fn transient_options() -> Result<StringifyOptions, LayoutError> {
    Ok(StringifyOptions::new()
        .exclude(Exclusion::new("**/visible").map_err(glob_error)?.when(|ctx| ctx.value().is_boolean()))
        .exclude(
            Exclusion::new("**/activationInstant")
                .map_err(glob_error)?
                .when(|ctx| ctx.value().is_number()),
        )
        .exclude(
            Exclusion::new("**/markedForRemoval")
                .map_err(glob_error)?
                .when(|ctx| ctx.value().is_boolean()),
        ))
}

fn canonical_options() -> Result<StringifyOptions, LayoutError> {
    Ok(transient_options()?
        .exclude(Exclusion::new("**/id").map_err(glob_error)?.when(|ctx| {
            ctx.parent()
                .and_then(|parent| parent.get("type"))
                .and_then(Value::as_str)
                == Some(TREE_NODE_TAG)
        }))
        .exclude(Exclusion::new("**/navigation/id").map_err(glob_error)?)
        .sorted())
}

// ---- Envelopes ----

/// Decode an envelope and migrate its payload to the chain's current version.
fn open_envelope(chain: &MigrationChain, encoded: &str) -> Result<String, LayoutError> {
    let envelope = codec::decode(encoded).inspect_err(|error| {
        tracing::warn!(target: "workbench.serializer", chain = chain.name(), %error, "cannot decode envelope");
    })?;
    if envelope.version > chain.current_version() {
        tracing::warn!(
            target: "workbench.serializer",
            chain = chain.name(),
            version = envelope.version,
            current = chain.current_version(),
            "envelope is newer than supported"
        );
        return Err(LayoutError::deserialize(format!(
            "{} version {} is newer than supported version {}",
            chain.name(),
            envelope.version,
            chain.current_version()
        )));
    }
    Ok(chain.migrate(&envelope.json, envelope.version)?)
}

fn parse<T: DeserializeOwned>(json: &str, what: &str) -> Result<T, LayoutError> {
    serde_json::from_str(json).map_err(|error| {
        tracing::warn!(target: "workbench.serializer", what, %error, "cannot parse payload");
        LayoutError::deserialize(format!("malformed {what}: {error}"))
    })
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, LayoutError> {
    serde_json::to_value(value).map_err(|error| LayoutError::Serialize {
        reason: error.to_string(),
    })
}

// ---- Grid ----

fn grid_to_wire(grid: &PartGrid) -> Result<MPartGrid, LayoutError> {
    Ok(MPartGrid {
        root: grid
            .root()
            .map(|root| element_to_wire(grid, root))
            .transpose()?,
        active_part_id: grid.active_part_id().cloned(),
        reference_part_id: grid.reference_part_id().cloned(),
    })
}

fn element_to_wire(grid: &PartGrid, id: &ElementId) -> Result<MElement, LayoutError> {
    let element = grid
        .element(id.as_str())
        .ok_or_else(|| LayoutError::not_found(id))?;
    Ok(match &element.kind {
        ElementKind::Node(node) => MElement::MTreeNode(MTreeNode {
            id: id.clone(),
            child1: Box::new(element_to_wire(grid, &node.child1)?),
            child2: Box::new(element_to_wire(grid, &node.child2)?),
            direction: node.direction,
            ratio: node.ratio,
            visible: element.visible,
        }),
        ElementKind::Part(part) => MElement::MPart(MPart {
            id: id.clone(),
            structural: part.structural,
            views: part.views.clone(),
            active_view_id: part.active_view_id.clone(),
            navigation: part.navigation.clone(),
            css_class: part.css_class.clone(),
            visible: element.visible,
            activation_instant: part.activation_instant,
        }),
    })
}

fn grid_from_wire(wire: MPartGrid) -> Result<PartGrid, LayoutError> {
    let mut grid = PartGrid::empty();
    let mut pending = Vec::new();
    if let Some(root) = wire.root {
        grid.root = Some(root.id().clone());
        pending.push(root);
    }

    while let Some(element) = pending.pop() {
        let (id, kind) = match element {
            MElement::MTreeNode(node) => {
                let MTreeNode {
                    id,
                    child1,
                    child2,
                    direction,
                    ratio,
                    ..
                } = node;
                let tree_node = TreeNode {
                    child1: child1.id().clone(),
                    child2: child2.id().clone(),
                    direction,
                    ratio,
                };
                pending.push(*child2);
                pending.push(*child1);
                (id, ElementKind::Node(tree_node))
            }
            MElement::MPart(part) => (
                part.id,
                ElementKind::Part(Part {
                    views: part.views,
                    active_view_id: part.active_view_id,
                    navigation: part.navigation,
                    structural: part.structural,
                    css_class: part.css_class,
                    activation_instant: part.activation_instant,
                }),
            ),
        };
        if grid.elements.contains_key(&id) {
            return Err(LayoutError::deserialize(format!(
                "element {id} occurs more than once"
            )));
        }
        let _ = grid.elements.insert(
            id.clone(),
            GridElement {
                id,
                parent: None,
                visible: false,
                kind,
            },
        );
    }

    if let Some(reference) = &wire.reference_part_id
        && grid.part(reference.as_str()).is_none()
    {
        return Err(LayoutError::deserialize(format!(
            "reference part {reference} is not a part of the grid"
        )));
    }
    grid.active_part_id = wire.active_part_id;
    grid.reference_part_id = wire.reference_part_id;
    grid.rebuild_parents();
    grid.normalize();
    grid.validate().map_err(LayoutError::deserialize)?;
    Ok(grid)
}

/// Encode a grid at [`GRID_VERSION`].
pub fn serialize_grid(grid: &PartGrid) -> Result<String, LayoutError> {
    let json = stringify(&to_value(&grid_to_wire(grid)?)?, &transient_options()?);
    Ok(codec::encode(&json, GRID_VERSION))
}

/// Decode and migrate a grid envelope.
pub fn deserialize_grid(encoded: &str) -> Result<PartGrid, LayoutError> {
    let json = open_envelope(&grid_migrations()?, encoded)?;
    grid_from_wire(parse(&json, "grid")?)
}

/// Sorted JSON of a grid without transient fields or generated ids.
pub fn canonical_grid(grid: &PartGrid) -> Result<String, LayoutError> {
    Ok(stringify(&to_value(&grid_to_wire(grid)?)?, &canonical_options()?))
}

// ---- Activity layout ----

pub fn serialize_activity_layout(layout: &ActivityLayout) -> Result<String, LayoutError> {
    let json = stringify(&to_value(layout)?, &StringifyOptions::new());
    Ok(codec::encode(&json, ACTIVITY_LAYOUT_VERSION))
}

pub fn deserialize_activity_layout(encoded: &str) -> Result<ActivityLayout, LayoutError> {
    let json = open_envelope(&activity_layout_migrations()?, encoded)?;
    parse(&json, "activity layout")
}

// ---- Layout ----

/// Encode a layout at [`LAYOUT_VERSION`]; each grid and the activity layout
/// are nested as envelopes of their own version.
pub fn serialize_layout(layout: &Layout) -> Result<String, LayoutError> {
    let grids = layout
        .grids()
        .map(|(name, grid)| Ok((name.key().to_owned(), serialize_grid(grid)?)))
        .collect::<Result<BTreeMap<_, _>, LayoutError>>()?;
    let wire = MLayout {
        grids,
        activity_layout: serialize_activity_layout(layout.activity_layout())?,
        outlets: layout.outlets().clone(),
    };
    let json = stringify(&to_value(&wire)?, &StringifyOptions::new());
    Ok(codec::encode(&json, LAYOUT_VERSION))
}

pub fn deserialize_layout(encoded: &str) -> Result<Layout, LayoutError> {
    let json = open_envelope(&layout_migrations()?, encoded)?;
    let wire: MLayout = parse(&json, "layout")?;
    let grids = wire
        .grids
        .iter()
        .map(|(key, envelope)| Ok((GridName::from_key(key), deserialize_grid(envelope)?)))
        .collect::<Result<BTreeMap<_, _>, LayoutError>>()?;
    let activity_layout = deserialize_activity_layout(&wire.activity_layout)?;
    let layout = Layout::from_parts(grids, activity_layout, wire.outlets)?;
    tracing::debug!(target: "workbench.serializer", grids = wire.grids.len(), "deserialized layout");
    Ok(layout)
}

/// Sorted JSON of a whole layout without transient fields or generated ids.
pub fn canonical_layout(layout: &Layout) -> Result<String, LayoutError> {
    let mut grids = Map::new();
    for (name, grid) in layout.grids() {
        let _ = grids.insert(name.key().to_owned(), to_value(&grid_to_wire(grid)?)?);
    }
    let mut document = Map::new();
    let _ = document.insert("grids".to_owned(), Value::Object(grids));
    let _ = document.insert("activityLayout".to_owned(), to_value(layout.activity_layout())?);
    let _ = document.insert("outlets".to_owned(), to_value(layout.outlets())?);
    Ok(stringify(&Value::Object(document), &canonical_options()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{NavigateOptions, ViewOptions};
    use crate::model::{ActivationClock, Align, MAIN_AREA_INITIAL_PART};
    use crate::mutation::PartSpec;
    use tracing_test::traced_test;

    fn split_grid() -> PartGrid {
        let mut clock = ActivationClock::default();
        PartGrid::with_root_part("part.a", true)
            .add_part("part.b", &PartSpec::new(Align::Right).relative_to("part.a").ratio(0.3), true)
            .and_then(|grid| grid.add_view("part.b", "view.1", None, true, &mut clock))
            .expect("grid built")
    }

    fn decoded_json(encoded: &str) -> Value {
        let envelope = codec::decode(encoded).expect("decodable");
        serde_json::from_str(&envelope.json).expect("json")
    }

    #[test]
    fn grid_envelope_carries_current_version() {
        let encoded = serialize_grid(&split_grid()).expect("serialized");
        assert_eq!(codec::decode(&encoded).expect("decodable").version, GRID_VERSION);
    }

    #[test]
    fn transient_fields_are_not_persisted() {
        let encoded = serialize_grid(&split_grid()).expect("serialized");
        let text = codec::decode(&encoded).expect("decodable").json;
        assert!(!text.contains("visible"));
        assert!(!text.contains("activationInstant"));
        assert!(!text.contains("markedForRemoval"));
        let json = decoded_json(&encoded);
        assert_eq!(json["root"]["type"], TREE_NODE_TAG);
        assert_eq!(json["root"]["child2"]["type"], "MPart");
        assert_eq!(json["root"]["direction"], "row");
    }

    #[test]
    fn grid_survives_serialization() {
        let grid = split_grid();
        let restored = deserialize_grid(&serialize_grid(&grid).expect("serialized"))
            .expect("deserialized");
        assert_eq!(restored.root(), grid.root());
        assert_eq!(restored.active_part_id(), grid.active_part_id());
        assert_eq!(
            serialize_grid(&restored).expect("serialized"),
            serialize_grid(&grid).expect("serialized")
        );
        assert!(restored.is_visible("part.b"));
        assert_eq!(
            restored.element("part.b").and_then(|e| e.parent.clone()),
            grid.element("part.b").and_then(|e| e.parent.clone())
        );
    }

    #[test]
    fn user_data_named_like_transient_fields_survives() {
        let mut data = BTreeMap::new();
        let _ = data.insert("visible".to_owned(), "yes".to_owned());
        let layout = Layout::new()
            .add_view("view.1", MAIN_AREA_INITIAL_PART, &ViewOptions::default())
            .and_then(|layout| {
                layout.navigate_view("view.1", "a", &NavigateOptions { hint: None, data })
            })
            .expect("navigated");
        let restored = deserialize_layout(&serialize_layout(&layout).expect("serialized"))
            .expect("deserialized");
        let navigation = restored
            .view("view.1")
            .and_then(|view| view.navigation.clone())
            .expect("navigation");
        assert_eq!(navigation.data.get("visible").map(String::as_str), Some("yes"));
    }

    #[test]
    fn canonical_form_ignores_generated_ids() {
        let first = split_grid();
        let second = split_grid();
        assert_ne!(first.root(), second.root());
        assert_eq!(
            canonical_grid(&first).expect("canonical"),
            canonical_grid(&second).expect("canonical")
        );
    }

    #[test]
    fn canonical_form_keeps_part_ids() {
        let canonical = canonical_grid(&split_grid()).expect("canonical");
        assert!(canonical.contains("\"id\":\"part.b\""));
        assert!(!canonical.contains("node."));
    }

    #[test]
    #[traced_test]
    fn newer_version_is_rejected() {
        let encoded = codec::encode(r#"{"root":null}"#, GRID_VERSION + 1);
        assert!(matches!(
            deserialize_grid(&encoded),
            Err(LayoutError::GridDeserialize { .. })
        ));
        assert!(logs_contain("envelope is newer than supported"));
    }

    #[test]
    #[traced_test]
    fn garbage_is_a_deserialize_error() {
        assert!(matches!(
            deserialize_grid("%%%"),
            Err(LayoutError::GridDeserialize { .. })
        ));
        assert!(logs_contain("cannot decode envelope"));
    }

    #[test]
    fn duplicate_element_ids_are_rejected() {
        let json = r#"{"root":{"type":"MTreeNode","id":"x","direction":"row","ratio":0.5,
            "child1":{"type":"MPart","id":"a","structural":true},
            "child2":{"type":"MPart","id":"a","structural":true}},"activePartId":"a"}"#;
        assert!(matches!(
            deserialize_grid(&codec::encode(json, GRID_VERSION)),
            Err(LayoutError::GridDeserialize { .. })
        ));
    }

    #[test]
    fn out_of_range_ratio_is_rejected() {
        let json = r#"{"root":{"type":"MTreeNode","id":"x","direction":"row","ratio":1.5,
            "child1":{"type":"MPart","id":"a","structural":true},
            "child2":{"type":"MPart","id":"b","structural":true}},"activePartId":"a"}"#;
        assert!(matches!(
            deserialize_grid(&codec::encode(json, GRID_VERSION)),
            Err(LayoutError::GridDeserialize { .. })
        ));
    }

    #[test]
    fn missing_active_part_is_repaired() {
        let json = r#"{"root":{"type":"MPart","id":"a","structural":true}}"#;
        let grid = deserialize_grid(&codec::encode(json, GRID_VERSION)).expect("deserialized");
        assert_eq!(grid.active_part_id().map(ElementId::as_str), Some("a"));
    }

    #[test]
    fn layout_nests_envelopes_per_grid() {
        let encoded = serialize_layout(&Layout::new()).expect("serialized");
        let json = decoded_json(&encoded);
        let main = json["grids"]["main"].as_str().expect("main envelope");
        assert_eq!(codec::decode(main).expect("decodable").version, GRID_VERSION);
        let activity = json["activityLayout"].as_str().expect("activity envelope");
        assert_eq!(
            codec::decode(activity).expect("decodable").version,
            ACTIVITY_LAYOUT_VERSION
        );
    }

    #[test]
    fn layout_without_main_grid_is_rejected() {
        let json = serde_json::json!({
            "grids": {"mainArea": serialize_grid(&PartGrid::with_root_part("part.initial", true)).expect("grid")},
            "activityLayout": serialize_activity_layout(&ActivityLayout::default()).expect("activity"),
            "outlets": {}
        });
        let encoded = codec::encode(&json.to_string(), LAYOUT_VERSION);
        assert!(matches!(
            deserialize_layout(&encoded),
            Err(LayoutError::GridDeserialize { .. })
        ));
    }
}
