#![forbid(unsafe_code)]

//! Docking workbench layout model.
//!
//! A workbench is a set of binary split trees ([`PartGrid`]s) whose leaves
//! are parts hosting views. [`Layout`] aggregates the grids with the
//! activity dock layout and the outlet map and exposes an immutable,
//! chainable mutation API. [`serializer`] persists layouts in versioned
//! envelopes, upgrading stale payloads through the chains in
//! [`migrations`].

pub mod activity;
pub mod dnd;
pub mod error;
pub mod grid;
pub mod layout;
pub mod migrations;
pub mod model;
pub mod mutation;
pub mod outlets;
pub mod serializer;

pub use activity::{
    Activity, ActivityLayout, ActivityStack, DockingArea, Panel, PanelSide, Panels,
};
pub use dnd::{DragNavigation, DragSource, DropTarget, ViewDragEvent};
pub use error::{GridModelError, LayoutError};
pub use layout::{
    GridName, Layout, NavigateOptions, PartOptions, PartPlacement, ViewOptions,
};
pub use model::{
    ActivationClock, ActivityId, Align, Direction, ElementId, ElementKind, GridElement,
    MAIN_AREA, MAIN_AREA_INITIAL_PART, Navigation, NavigationId, Part, PartGrid, Region, TreeNode,
    View, ViewId,
};
pub use mutation::{DEFAULT_RATIO, NewPart, PartSpec};
pub use outlets::{Outlets, UrlSegment, format_path, parse_path};
pub use serializer::{
    ACTIVITY_LAYOUT_VERSION, GRID_VERSION, LAYOUT_VERSION, canonical_grid, canonical_layout,
    deserialize_activity_layout, deserialize_grid, deserialize_layout, serialize_activity_layout,
    serialize_grid, serialize_layout,
};
