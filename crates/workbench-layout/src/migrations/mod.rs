//! Migrators of the persisted workbench model.
//!
//! Each persisted entity has its own chain: grids, layouts and activity
//! layouts are versioned independently because a layout nests grid and
//! activity-layout envelopes of their own versions.

mod grid;
mod layout;

use serde_json::{Map, Value};
use workbench_core::{MigrationChain, MigrationError, StepError};

use crate::serializer::{ACTIVITY_LAYOUT_VERSION, GRID_VERSION, LAYOUT_VERSION};

pub const GRID_CHAIN: &str = "grid";
pub const LAYOUT_CHAIN: &str = "layout";
pub const ACTIVITY_LAYOUT_CHAIN: &str = "activity-layout";

pub fn grid_migrations() -> Result<MigrationChain, MigrationError> {
    MigrationChain::new(GRID_CHAIN, GRID_VERSION, grid::MIGRATORS)
}

pub fn layout_migrations() -> Result<MigrationChain, MigrationError> {
    MigrationChain::new(LAYOUT_CHAIN, LAYOUT_VERSION, layout::MIGRATORS)
}

/// No migrators yet; payloads still pass through the chain so that the
/// first version bump only has to register a step.
pub fn activity_layout_migrations() -> Result<MigrationChain, MigrationError> {
    MigrationChain::new(ACTIVITY_LAYOUT_CHAIN, ACTIVITY_LAYOUT_VERSION, [])
}

/// Visit every element object of a grid document, parents before children.
pub(crate) fn for_each_element(
    grid: &mut Value,
    mut visit: impl FnMut(&mut Map<String, Value>) -> Result<(), StepError>,
) -> Result<(), StepError> {
    let mut pending = match grid.get_mut("root") {
        None | Some(Value::Null) => return Ok(()),
        Some(root) => vec![root],
    };
    while let Some(element) = pending.pop() {
        let Value::Object(object) = element else {
            return Err(StepError::new("grid element is not an object"));
        };
        visit(object)?;
        for (key, child) in object.iter_mut() {
            if key == "child1" || key == "child2" {
                pending.push(child);
            }
        }
    }
    Ok(())
}

pub(crate) fn element_type(object: &Map<String, Value>) -> Option<&str> {
    object.get("type").and_then(Value::as_str)
}

pub(crate) fn is_tree_node(object: &Map<String, Value>) -> bool {
    element_type(object) == Some("MTreeNode")
}

pub(crate) fn is_part(object: &Map<String, Value>) -> bool {
    element_type(object) == Some("MPart")
}

/// View objects of a part element.
pub(crate) fn views_mut(
    part: &mut Map<String, Value>,
) -> impl Iterator<Item = &mut Map<String, Value>> + '_ {
    part.get_mut("views")
        .and_then(Value::as_array_mut)
        .into_iter()
        .flat_map(|views| views.iter_mut().filter_map(Value::as_object_mut))
}
