//! Grid data model: identifiers, views, parts, tree nodes and the arena
//! holding them.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Anchor part in the main grid that hosts the main-area grid.
pub const MAIN_AREA: &str = "part.main-area";

/// Part the main-area grid starts with.
pub const MAIN_AREA_INITIAL_PART: &str = "part.initial";

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

string_id!(
    /// Id of a part or tree node.
    ElementId
);
string_id!(
    /// Id of a view, unique across every grid of a layout.
    ViewId
);
string_id!(
    /// Id of an activity.
    ActivityId
);
string_id!(
    /// Id distinguishing one navigation from the next.
    NavigationId
);

impl ElementId {
    /// Fresh tree-node id.
    #[must_use]
    pub fn generate_node() -> Self {
        Self(format!("node.{}", uuid::Uuid::new_v4().simple()))
    }

    /// Fresh part id for parts created by drag and drop.
    #[must_use]
    pub fn generate_part() -> Self {
        Self(format!("part.{}", uuid::Uuid::new_v4().simple()))
    }

    #[must_use]
    pub fn is_main_area(&self) -> bool {
        self.0 == MAIN_AREA
    }
}

impl NavigationId {
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// Parse the `<n>` of `<prefix><n>`.
pub(crate) fn numeric_suffix(id: &str, prefix: &str) -> Option<u64> {
    id.strip_prefix(prefix)?.parse().ok()
}

/// Split orientation of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Children side by side.
    Row,
    /// Children stacked.
    Column,
}

/// Side on which a new part is placed relative to an existing element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Left,
    Right,
    Top,
    Bottom,
}

impl Align {
    #[must_use]
    pub fn direction(self) -> Direction {
        match self {
            Self::Left | Self::Right => Direction::Row,
            Self::Top | Self::Bottom => Direction::Column,
        }
    }

    /// Whether the new part becomes `child1` of the inserted tree node.
    #[must_use]
    pub fn places_first(self) -> bool {
        matches!(self, Self::Left | Self::Top)
    }
}

/// Drop region of a drag-and-drop target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    #[default]
    Center,
    North,
    South,
    East,
    West,
}

impl Region {
    /// Placement of the new part for edge regions; `None` for the center.
    #[must_use]
    pub fn align(self) -> Option<Align> {
        match self {
            Self::Center => None,
            Self::North => Some(Align::Top),
            Self::South => Some(Align::Bottom),
            Self::East => Some(Align::Right),
            Self::West => Some(Align::Left),
        }
    }
}

/// Route binding of a part or view. The route path itself lives in the
/// layout's outlet map, keyed by the part or view id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Navigation {
    pub id: NavigationId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,
}

impl Navigation {
    #[must_use]
    pub fn new(hint: Option<String>, data: BTreeMap<String, String>) -> Self {
        Self {
            id: NavigationId::generate(),
            hint,
            data,
        }
    }
}

/// A tab hosted in a part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    pub id: ViewId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigation: Option<Navigation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub css_class: Vec<String>,
    /// Kept alive during a replace-navigation, removed once it settles.
    #[serde(default)]
    pub marked_for_removal: bool,
    /// Most-recently-used order; higher is more recent.
    #[serde(default)]
    pub activation_instant: u64,
}

impl View {
    pub fn new(id: impl Into<ViewId>) -> Self {
        Self {
            id: id.into(),
            alternative_id: None,
            navigation: None,
            css_class: Vec::new(),
            marked_for_removal: false,
            activation_instant: 0,
        }
    }
}

/// Leaf container of a grid.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Part {
    pub views: Vec<View>,
    pub active_view_id: Option<ViewId>,
    pub navigation: Option<Navigation>,
    /// Created by layout construction rather than by a drop; survives
    /// becoming empty.
    pub structural: bool,
    pub css_class: Vec<String>,
    pub activation_instant: u64,
}

impl Part {
    #[must_use]
    pub fn new(structural: bool) -> Self {
        Self {
            structural,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn view(&self, id: &str) -> Option<&View> {
        self.views.iter().find(|view| view.id == id)
    }

    #[must_use]
    pub fn view_index(&self, id: &str) -> Option<usize> {
        self.views.iter().position(|view| view.id == id)
    }

    /// Most recently activated view; ties go to the earliest in tab order.
    #[must_use]
    pub fn most_recent_view(&self) -> Option<&View> {
        self.views.iter().fold(None, |best: Option<&View>, view| match best {
            Some(current) if current.activation_instant >= view.activation_instant => Some(current),
            _ => Some(view),
        })
    }

    pub(crate) fn is_prunable(&self, id: &ElementId) -> bool {
        self.views.is_empty() && self.navigation.is_none() && !self.structural && !id.is_main_area()
    }
}

/// Binary split of a grid.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub child1: ElementId,
    pub child2: ElementId,
    pub direction: Direction,
    /// Fraction of space given to `child1`, strictly between 0 and 1.
    pub ratio: f64,
}

/// Tagged union over the two element kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    Node(TreeNode),
    Part(Part),
}

/// Arena entry of a grid.
#[derive(Debug, Clone, PartialEq)]
pub struct GridElement {
    pub id: ElementId,
    /// Back-reference recomputed on every structural change; never persisted.
    pub parent: Option<ElementId>,
    /// Derived from content, see [`PartGrid::normalize`](crate::PartGrid).
    pub visible: bool,
    pub kind: ElementKind,
}

impl GridElement {
    #[must_use]
    pub fn part(id: ElementId, parent: Option<ElementId>, part: Part) -> Self {
        Self {
            id,
            parent,
            visible: false,
            kind: ElementKind::Part(part),
        }
    }

    #[must_use]
    pub fn node(id: ElementId, parent: Option<ElementId>, node: TreeNode) -> Self {
        Self {
            id,
            parent,
            visible: false,
            kind: ElementKind::Node(node),
        }
    }

    #[must_use]
    pub fn as_part(&self) -> Option<&Part> {
        match &self.kind {
            ElementKind::Part(part) => Some(part),
            ElementKind::Node(_) => None,
        }
    }

    #[must_use]
    pub fn as_node(&self) -> Option<&TreeNode> {
        match &self.kind {
            ElementKind::Node(node) => Some(node),
            ElementKind::Part(_) => None,
        }
    }

    pub(crate) fn as_part_mut(&mut self) -> Option<&mut Part> {
        match &mut self.kind {
            ElementKind::Part(part) => Some(part),
            ElementKind::Node(_) => None,
        }
    }
}

/// One binary split tree: the main grid, the main-area grid, or an
/// activity's grid.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PartGrid {
    pub(crate) root: Option<ElementId>,
    pub(crate) elements: BTreeMap<ElementId, GridElement>,
    pub(crate) active_part_id: Option<ElementId>,
    pub(crate) reference_part_id: Option<ElementId>,
}

/// Source of activation instants establishing most-recently-used order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActivationClock {
    last: u64,
}

impl ActivationClock {
    #[must_use]
    pub fn starting_after(last: u64) -> Self {
        Self { last }
    }

    pub fn tick(&mut self) -> u64 {
        self.last = self.last.saturating_add(1);
        self.last
    }

    #[must_use]
    pub fn last(&self) -> u64 {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_maps_to_direction_and_order() {
        assert_eq!(Align::Left.direction(), Direction::Row);
        assert_eq!(Align::Bottom.direction(), Direction::Column);
        assert!(Align::Top.places_first());
        assert!(!Align::Right.places_first());
    }

    #[test]
    fn most_recent_view_prefers_earliest_on_ties() {
        let mut part = Part::new(true);
        for (id, instant) in [("view.1", 3), ("view.2", 5), ("view.3", 5)] {
            let mut view = View::new(id);
            view.activation_instant = instant;
            part.views.push(view);
        }
        assert_eq!(
            part.most_recent_view().map(|view| view.id.as_str()),
            Some("view.2")
        );
    }

    #[test]
    fn generated_ids_carry_prefixes() {
        assert!(ElementId::generate_node().as_str().starts_with("node."));
        assert!(ElementId::generate_part().as_str().starts_with("part."));
        assert_ne!(NavigationId::generate(), NavigationId::generate());
    }

    #[test]
    fn view_serializes_camel_case_and_skips_empty_fields() {
        let json = serde_json::to_value(View::new("view.1")).expect("serializable");
        assert_eq!(
            json,
            serde_json::json!({"id": "view.1", "markedForRemoval": false, "activationInstant": 0})
        );
    }

    #[test]
    fn numeric_suffix_parses_only_matching_prefix() {
        assert_eq!(numeric_suffix("view.12", "view."), Some(12));
        assert_eq!(numeric_suffix("view.x", "view."), None);
        assert_eq!(numeric_suffix("part.3", "view."), None);
    }

    #[test]
    fn clock_is_monotonic() {
        let mut clock = ActivationClock::starting_after(4);
        assert_eq!(clock.tick(), 5);
        assert_eq!(clock.tick(), 6);
        assert_eq!(clock.last(), 6);
    }
}
