//! Layout facade.
//!
//! A [`Layout`] aggregates every grid of the workbench (the main grid, the
//! main-area grid and one grid per activity), the activity dock layout and
//! the outlet map. It is immutable: each mutation returns a new `Layout`
//! and leaves the receiver untouched. Grids sit behind `Arc`s, so a
//! mutation clones only the grid it touches and the new layout shares every
//! other grid with the old one.
//!
//! Ids are resolved across all grids. Part and view ids are unique in the
//! whole layout, so callers never need to say which grid they address.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::activity::{Activity, ActivityLayout, DockingArea, PanelSide, Panels};
use crate::error::LayoutError;
use crate::model::{
    ActivationClock, ActivityId, ElementId, MAIN_AREA, MAIN_AREA_INITIAL_PART, Navigation, Part,
    PartGrid, Region, View, ViewId, numeric_suffix,
};
use crate::mutation::{NewPart, PartSpec, checked_ratio};
use crate::outlets::{Outlets, UrlSegment, parse_path};

const VIEW_ID_PREFIX: &str = "view.";
const ACTIVITY_ID_PREFIX: &str = "activity.";

/// Name of a grid within a layout.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GridName {
    /// Outer grid of the workbench; contains the main-area anchor part.
    Main,
    /// Grid embedded in the main-area anchor part.
    MainArea,
    Activity(ActivityId),
}

impl GridName {
    /// Key used when persisting the grid.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Main => "main",
            Self::MainArea => "mainArea",
            Self::Activity(id) => id.as_str(),
        }
    }

    #[must_use]
    pub fn from_key(key: &str) -> Self {
        match key {
            "main" => Self::Main,
            "mainArea" => Self::MainArea,
            other => Self::Activity(other.into()),
        }
    }
}

impl fmt::Display for GridName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Where [`Layout::add_part`] places a new part.
#[derive(Debug, Clone, PartialEq)]
pub enum PartPlacement {
    /// Split an existing element. Without `relative_to` the part is placed
    /// next to the root of the main grid.
    Relative(PartSpec),
    /// Create a new activity rooted at the part.
    Docked { dock_to: DockingArea },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PartOptions {
    pub structural: bool,
    pub activate: bool,
    pub css_class: Vec<String>,
}

impl Default for PartOptions {
    fn default() -> Self {
        Self {
            structural: true,
            activate: false,
            css_class: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewOptions {
    pub position: Option<usize>,
    pub activate: bool,
    pub css_class: Vec<String>,
    pub alternative_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NavigateOptions {
    pub hint: Option<String>,
    pub data: BTreeMap<String, String>,
}

/// Immutable aggregate of grids, activity layout and outlets.
#[derive(Debug, Clone)]
pub struct Layout {
    grids: BTreeMap<GridName, Arc<PartGrid>>,
    activity_layout: Arc<ActivityLayout>,
    outlets: Arc<Outlets>,
    clock: ActivationClock,
}

impl PartialEq for Layout {
    fn eq(&self, other: &Self) -> bool {
        self.grids == other.grids
            && self.activity_layout == other.activity_layout
            && self.outlets == other.outlets
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::new()
    }
}

impl Layout {
    /// Main grid rooted at the main-area anchor and a main-area grid rooted
    /// at [`MAIN_AREA_INITIAL_PART`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_initial_part(MAIN_AREA_INITIAL_PART)
    }

    #[must_use]
    pub fn with_initial_part(initial_part_id: impl Into<ElementId>) -> Self {
        let mut grids = BTreeMap::new();
        let _ = grids.insert(
            GridName::Main,
            Arc::new(PartGrid::with_root_part(MAIN_AREA, true)),
        );
        let _ = grids.insert(
            GridName::MainArea,
            Arc::new(PartGrid::with_root_part(initial_part_id, true)),
        );
        Self {
            grids,
            activity_layout: Arc::new(ActivityLayout::default()),
            outlets: Arc::new(Outlets::new()),
            clock: ActivationClock::default(),
        }
    }

    #[must_use]
    pub fn with_panels(mut self, panels: Panels) -> Self {
        Arc::make_mut(&mut self.activity_layout).panels = panels;
        self
    }

    /// Assemble a layout from deserialized parts, checking the invariants
    /// that span grids.
    pub(crate) fn from_parts(
        grids: BTreeMap<GridName, PartGrid>,
        activity_layout: ActivityLayout,
        outlets: Outlets,
    ) -> Result<Self, LayoutError> {
        if !grids.contains_key(&GridName::Main) {
            return Err(LayoutError::deserialize("layout has no main grid"));
        }

        let mut elements = BTreeMap::new();
        let mut views = BTreeMap::new();
        for (name, grid) in &grids {
            grid.validate()?;
            for id in grid.depth_first() {
                if let Some(other) = elements.insert(id.clone(), name) {
                    return Err(LayoutError::deserialize(format!(
                        "element {id} occurs in grids {other} and {name}"
                    )));
                }
            }
            for view in grid.views() {
                if let Some(other) = views.insert(view.id.clone(), name) {
                    return Err(LayoutError::deserialize(format!(
                        "view {} occurs in grids {other} and {name}",
                        view.id
                    )));
                }
            }
        }

        for (area, stack) in &activity_layout.toolbars {
            let stacked = |id: &ActivityId| stack.activities.iter().any(|activity| activity.id == *id);
            for (role, id) in [
                ("active", &stack.active_activity_id),
                ("minimized", &stack.minimized_activity_id),
            ] {
                if let Some(id) = id
                    && !stacked(id)
                {
                    return Err(LayoutError::deserialize(format!(
                        "{role} activity {id} is not stacked in {area:?}"
                    )));
                }
            }
        }
        for side in [PanelSide::Left, PanelSide::Right, PanelSide::Bottom] {
            let ratio = activity_layout.panels.get(side).ratio;
            if checked_ratio(ratio).is_err() {
                return Err(LayoutError::deserialize(format!(
                    "{side:?} panel ratio {ratio} must lie strictly between 0 and 1"
                )));
            }
        }

        for (_, activity) in activity_layout.activities() {
            if !grids.contains_key(&GridName::Activity(activity.id.clone())) {
                return Err(LayoutError::deserialize(format!(
                    "activity {} has no grid",
                    activity.id
                )));
            }
        }
        for name in grids.keys() {
            if let GridName::Activity(id) = name
                && activity_layout.find(id.as_str()).is_none()
            {
                return Err(LayoutError::deserialize(format!(
                    "grid {id} belongs to no activity"
                )));
            }
        }

        let last_instant = grids
            .values()
            .map(PartGrid::max_activation_instant)
            .max()
            .unwrap_or(0);
        Ok(Self {
            grids: grids
                .into_iter()
                .map(|(name, grid)| (name, Arc::new(grid)))
                .collect(),
            activity_layout: Arc::new(activity_layout),
            outlets: Arc::new(outlets),
            clock: ActivationClock::starting_after(last_instant),
        })
    }

    // ---- Queries ----

    #[must_use]
    pub fn grid(&self, name: &GridName) -> Option<&PartGrid> {
        self.grids.get(name).map(Arc::as_ref)
    }

    /// Shared handle of a grid; unchanged grids are pointer-equal across
    /// layouts derived from one another.
    #[must_use]
    pub fn grid_arc(&self, name: &GridName) -> Option<&Arc<PartGrid>> {
        self.grids.get(name)
    }

    pub fn grids(&self) -> impl Iterator<Item = (&GridName, &PartGrid)> + '_ {
        self.grids.iter().map(|(name, grid)| (name, grid.as_ref()))
    }

    /// Grid containing the part, tree node or view `id`.
    #[must_use]
    pub fn grid_of(&self, id: &str) -> Option<&GridName> {
        self.grids
            .iter()
            .find(|(_, grid)| grid.contains(id) || grid.contains_view(id))
            .map(|(name, _)| name)
    }

    #[must_use]
    pub fn part(&self, id: &str) -> Option<&Part> {
        self.grids.values().find_map(|grid| grid.part(id))
    }

    /// Every part with its grid, grids in name order and parts depth-first.
    pub fn parts(&self) -> impl Iterator<Item = (&GridName, &ElementId, &Part)> + '_ {
        self.grids
            .iter()
            .flat_map(|(name, grid)| grid.parts().map(move |(id, part)| (name, id, part)))
    }

    #[must_use]
    pub fn view(&self, id: &str) -> Option<&View> {
        self.grids.values().find_map(|grid| grid.view(id))
    }

    pub fn views(&self) -> impl Iterator<Item = &View> + '_ {
        self.grids.values().flat_map(|grid| grid.views())
    }

    #[must_use]
    pub fn active_part(&self, grid: &GridName) -> Option<&ElementId> {
        self.grids.get(grid).and_then(|grid| grid.active_part_id())
    }

    #[must_use]
    pub fn outlets(&self) -> &Outlets {
        &self.outlets
    }

    #[must_use]
    pub fn outlet(&self, id: &str) -> Option<&[UrlSegment]> {
        self.outlets.get(id).map(Vec::as_slice)
    }

    #[must_use]
    pub fn activity_layout(&self) -> &ActivityLayout {
        &self.activity_layout
    }

    #[must_use]
    pub fn clock(&self) -> ActivationClock {
        self.clock
    }

    /// `view.<n>` with `n` one past the largest `view.<n>` in any grid.
    #[must_use]
    pub fn compute_next_view_id(&self) -> ViewId {
        let next = self
            .views()
            .filter_map(|view| numeric_suffix(view.id.as_str(), VIEW_ID_PREFIX))
            .max()
            .map_or(1, |max| max + 1);
        ViewId::new(format!("{VIEW_ID_PREFIX}{next}"))
    }

    fn compute_next_activity_id(&self) -> ActivityId {
        let from_grids = self.grids.keys().filter_map(|name| match name {
            GridName::Activity(id) => numeric_suffix(id.as_str(), ACTIVITY_ID_PREFIX),
            _ => None,
        });
        let next = self
            .activity_layout
            .activities()
            .filter_map(|(_, activity)| numeric_suffix(activity.id.as_str(), ACTIVITY_ID_PREFIX))
            .chain(from_grids)
            .max()
            .map_or(1, |max| max + 1);
        ActivityId::new(format!("{ACTIVITY_ID_PREFIX}{next}"))
    }

    fn contains_element(&self, id: &str) -> bool {
        self.grids.values().any(|grid| grid.contains(id))
    }

    fn contains_view(&self, id: &str) -> bool {
        self.grids.values().any(|grid| grid.contains_view(id))
    }

    fn locate_element(&self, id: &str) -> Result<GridName, LayoutError> {
        self.grids
            .iter()
            .find(|(_, grid)| grid.contains(id))
            .map(|(name, _)| name.clone())
            .ok_or_else(|| LayoutError::not_found(id))
    }

    fn locate_view(&self, id: &str) -> Result<GridName, LayoutError> {
        self.grids
            .iter()
            .find(|(_, grid)| grid.contains_view(id))
            .map(|(name, _)| name.clone())
            .ok_or_else(|| LayoutError::not_found(id))
    }

    fn grid_checked(&self, name: &GridName) -> Result<&PartGrid, LayoutError> {
        self.grid(name).ok_or_else(|| LayoutError::not_found(name))
    }

    // ---- Mutation plumbing ----

    /// Replace one grid by the result of `op`, sharing every other grid.
    fn with_grid(
        &self,
        name: &GridName,
        op: impl FnOnce(&PartGrid, &mut ActivationClock) -> Result<PartGrid, LayoutError>,
    ) -> Result<Self, LayoutError> {
        let mut next = self.clone();
        let updated = op(self.grid_checked(name)?, &mut next.clock)?;
        let _ = next.grids.insert(name.clone(), Arc::new(updated));
        Ok(next)
    }

    fn open_activity_of(mut self, name: &GridName) -> Self {
        if let GridName::Activity(id) = name
            && !self.activity_layout.is_open(id.as_str())
        {
            let _ = Arc::make_mut(&mut self.activity_layout).open(id.as_str());
        }
        self
    }

    /// Retire activities whose grid became empty and drop outlets whose
    /// part or view is gone.
    fn settle(mut self) -> Self {
        let emptied = self
            .grids
            .iter()
            .filter_map(|(name, grid)| match name {
                GridName::Activity(id) if grid.is_empty() => Some(id.clone()),
                _ => None,
            })
            .collect::<Vec<_>>();
        for activity in emptied {
            let _ = self.grids.remove(&GridName::Activity(activity.clone()));
            let _ = Arc::make_mut(&mut self.activity_layout).remove(activity.as_str());
            tracing::debug!(target: "workbench.layout", activity_id = %activity, "removed emptied activity");
        }

        let orphaned = self
            .outlets
            .keys()
            .filter(|key| !self.contains_element(key) && !self.contains_view(key))
            .cloned()
            .collect::<Vec<_>>();
        if !orphaned.is_empty() {
            let outlets = Arc::make_mut(&mut self.outlets);
            for key in orphaned {
                let _ = outlets.remove(&key);
            }
        }
        self
    }

    fn set_outlet(&mut self, id: &str, segments: Vec<UrlSegment>) {
        let outlets = Arc::make_mut(&mut self.outlets);
        if segments.is_empty() {
            let _ = outlets.remove(id);
        } else {
            let _ = outlets.insert(id.to_owned(), segments);
        }
    }

    // ---- Parts ----

    /// Add a part, either by splitting an existing element or by docking it
    /// as the root of a new activity.
    pub fn add_part(
        &self,
        id: impl Into<ElementId>,
        placement: &PartPlacement,
        options: &PartOptions,
    ) -> Result<Self, LayoutError> {
        let id = id.into();
        if self.contains_element(id.as_str()) {
            return Err(LayoutError::duplicate(&id));
        }

        let (name, mut next) = match placement {
            PartPlacement::Relative(spec) => {
                let name = match &spec.relative_to {
                    Some(target) => self.locate_element(target.as_str())?,
                    None => GridName::Main,
                };
                let next = self.with_grid(&name, |grid, _| {
                    grid.add_part(id.clone(), spec, options.structural)
                })?;
                (name, next)
            }
            PartPlacement::Docked { dock_to } => {
                let activity_id = self.compute_next_activity_id();
                let name = GridName::Activity(activity_id.clone());
                let mut next = self.clone();
                let _ = next.grids.insert(
                    name.clone(),
                    Arc::new(PartGrid::with_root_part(id.clone(), options.structural)),
                );
                Arc::make_mut(&mut next.activity_layout).add(
                    *dock_to,
                    Activity {
                        id: activity_id,
                        reference_part_id: id.clone(),
                    },
                );
                (name, next)
            }
        };

        if !options.css_class.is_empty() {
            next = next.with_grid(&name, |grid, _| {
                grid.set_part_css_class(id.as_str(), options.css_class.clone())
            })?;
        }
        if options.activate {
            next = next
                .with_grid(&name, |grid, clock| grid.activate_part(id.as_str(), clock))?
                .open_activity_of(&name);
        }
        tracing::debug!(target: "workbench.layout", part_id = %id, grid = %name, "added part");
        Ok(next)
    }

    /// Remove a part and its views. Removing the root part of an activity
    /// removes the activity.
    pub fn remove_part(&self, id: &str) -> Result<Self, LayoutError> {
        let name = self.locate_element(id)?;
        let next = self.with_grid(&name, |grid, _| grid.remove_part(id))?.settle();
        tracing::debug!(target: "workbench.layout", part_id = id, grid = %name, "removed part");
        Ok(next)
    }

    pub fn activate_part(&self, id: &str) -> Result<Self, LayoutError> {
        let name = self.locate_element(id)?;
        Ok(self
            .with_grid(&name, |grid, clock| grid.activate_part(id, clock))?
            .open_activity_of(&name))
    }

    /// Navigate a part. An empty path without hint clears the navigation.
    pub fn navigate_part(
        &self,
        id: &str,
        path: &str,
        options: &NavigateOptions,
    ) -> Result<Self, LayoutError> {
        let name = self.locate_element(id)?;
        let segments = parse_path(path);
        let navigation = navigation_for(&segments, options);
        let mut next = self.with_grid(&name, |grid, _| grid.set_part_navigation(id, navigation))?;
        next.set_outlet(id, segments);
        tracing::debug!(target: "workbench.layout", part_id = id, path, "navigated part");
        Ok(next.settle())
    }

    pub fn set_split_ratio(&self, node_id: &str, ratio: f64) -> Result<Self, LayoutError> {
        let name = self.locate_element(node_id)?;
        self.with_grid(&name, |grid, _| grid.set_split_ratio(node_id, ratio))
    }

    // ---- Views ----

    pub fn add_view(
        &self,
        id: impl Into<ViewId>,
        part_id: &str,
        options: &ViewOptions,
    ) -> Result<Self, LayoutError> {
        let id = id.into();
        if self.contains_view(id.as_str()) {
            return Err(LayoutError::duplicate(&id));
        }
        let name = self.locate_element(part_id)?;
        let mut view = View::new(id.clone());
        view.css_class = options.css_class.clone();
        view.alternative_id = options.alternative_id.clone();

        let mut next = self.with_grid(&name, |grid, clock| {
            grid.attach_view(part_id, view, options.position, options.activate, clock)
        })?;
        if options.activate {
            next = next.open_activity_of(&name);
        }
        tracing::debug!(target: "workbench.layout", view_id = %id, part_id, "added view");
        Ok(next)
    }

    pub fn remove_view(&self, id: &str) -> Result<Self, LayoutError> {
        let name = self.locate_view(id)?;
        let next = self.with_grid(&name, |grid, _| grid.remove_view(id))?.settle();
        tracing::debug!(target: "workbench.layout", view_id = id, grid = %name, "removed view");
        Ok(next)
    }

    /// Move a view to a part, possibly in another grid.
    pub fn move_view(
        &self,
        id: &str,
        target_part_id: &str,
        position: Option<usize>,
        activate: bool,
    ) -> Result<Self, LayoutError> {
        let source = self.locate_view(id)?;
        let target = self.locate_element(target_part_id)?;
        let next = if source == target {
            self.with_grid(&source, |grid, clock| {
                grid.move_view(id, target_part_id, position, activate, clock)
            })?
        } else {
            let (detached, view) = self.grid_checked(&source)?.detach_view(id)?;
            let mut next = self.clone();
            let _ = next.grids.insert(source.clone(), Arc::new(detached));
            next.with_grid(&target, |grid, clock| {
                grid.attach_view(target_part_id, view, position, activate, clock)
            })?
        };
        tracing::debug!(
            target: "workbench.layout",
            view_id = id,
            part_id = target_part_id,
            from = %source,
            to = %target,
            "moved view"
        );
        let next = next.settle();
        Ok(if activate { next.open_activity_of(&target) } else { next })
    }

    /// Drag-and-drop move into a region of `target_id`, which may live in
    /// another grid than the view.
    pub fn move_view_to_region(
        &self,
        id: &str,
        target_id: &str,
        region: Region,
        new_part: Option<&NewPart>,
        position: Option<usize>,
    ) -> Result<Self, LayoutError> {
        let source = self.locate_view(id)?;
        let target = self.locate_element(target_id)?;
        // Re-dropping into the part that already hosts the view is resolved
        // by the grid, which treats a repeat of the same edge drop as a no-op.
        let host = self.grid(&source).and_then(|grid| grid.part_of_view(id));
        if let Some(new_id) = new_part.and_then(|spec| spec.id.as_ref())
            && self.contains_element(new_id.as_str())
            && !(source == target && host == Some(new_id))
        {
            return Err(LayoutError::duplicate(new_id));
        }

        if source == target {
            let next = self.with_grid(&source, |grid, clock| {
                grid.move_view_to_region(id, target_id, region, new_part, position, clock)
            })?;
            if next.grid(&source) == self.grid(&source) {
                return Ok(self.clone());
            }
            tracing::debug!(target: "workbench.layout", view_id = id, target_id, ?region, "dropped view");
            return Ok(next.settle().open_activity_of(&target));
        }

        let Some(align) = region.align() else {
            if new_part.is_some() {
                return Err(LayoutError::invalid(
                    "a center drop merges into the target part and cannot create a new part",
                ));
            }
            return self.move_view(id, target_id, position, true);
        };

        let new_id = new_part
            .and_then(|spec| spec.id.clone())
            .unwrap_or_else(ElementId::generate_part);
        let spec = PartSpec {
            relative_to: Some(target_id.into()),
            align,
            ratio: new_part.and_then(|spec| spec.ratio),
        };
        let (detached, view) = self.grid_checked(&source)?.detach_view(id)?;
        let mut next = self.clone();
        let _ = next.grids.insert(source, Arc::new(detached));
        let next = next.with_grid(&target, |grid, clock| {
            grid.add_part(new_id.clone(), &spec, false)?
                .attach_view(new_id.as_str(), view, None, true, clock)
        })?;
        tracing::debug!(target: "workbench.layout", view_id = id, target_id, ?region, "dropped view");
        Ok(next.settle().open_activity_of(&target))
    }

    /// Navigate a view. An empty path without hint clears the navigation.
    pub fn navigate_view(
        &self,
        id: &str,
        path: &str,
        options: &NavigateOptions,
    ) -> Result<Self, LayoutError> {
        let name = self.locate_view(id)?;
        let segments = parse_path(path);
        let navigation = navigation_for(&segments, options);
        let mut next = self.with_grid(&name, |grid, _| grid.set_view_navigation(id, navigation))?;
        next.set_outlet(id, segments);
        tracing::debug!(target: "workbench.layout", view_id = id, path, "navigated view");
        Ok(next)
    }

    /// Activate a view and its part; activating inside an activity grid
    /// opens the activity.
    pub fn activate_view(&self, id: &str) -> Result<Self, LayoutError> {
        let name = self.locate_view(id)?;
        Ok(self
            .with_grid(&name, |grid, clock| grid.activate_view(id, clock))?
            .open_activity_of(&name))
    }

    /// Rename a view, re-keying its outlet.
    pub fn rename_view(&self, id: &str, new_id: impl Into<ViewId>) -> Result<Self, LayoutError> {
        let new_id = new_id.into();
        if self.contains_view(new_id.as_str()) || self.contains_element(new_id.as_str()) {
            return Err(LayoutError::duplicate(&new_id));
        }
        let name = self.locate_view(id)?;
        let mut next = self.with_grid(&name, |grid, _| grid.rename_view(id, new_id.clone()))?;
        if let Some(segments) = next.outlets.get(id).cloned() {
            let outlets = Arc::make_mut(&mut next.outlets);
            let _ = outlets.remove(id);
            let _ = outlets.insert(new_id.to_string(), segments);
        }
        tracing::debug!(target: "workbench.layout", view_id = id, renamed_to = %new_id, "renamed view");
        Ok(next)
    }

    pub fn mark_view_for_removal(&self, id: &str) -> Result<Self, LayoutError> {
        let name = self.locate_view(id)?;
        self.with_grid(&name, |grid, _| grid.mark_view_for_removal(id))
    }

    pub fn remove_views_marked_for_removal(&self) -> Result<Self, LayoutError> {
        let affected = self
            .grids
            .iter()
            .filter(|(_, grid)| grid.views().any(|view| view.marked_for_removal))
            .map(|(name, _)| name.clone())
            .collect::<Vec<_>>();
        let mut next = self.clone();
        for name in &affected {
            next = next.with_grid(name, |grid, _| grid.remove_views_marked_for_removal())?;
        }
        Ok(next.settle())
    }

    // ---- Activities ----

    pub fn toggle_activity(&self, id: &str) -> Result<Self, LayoutError> {
        let mut next = self.clone();
        if !Arc::make_mut(&mut next.activity_layout).toggle(id) {
            return Err(LayoutError::not_found(id));
        }
        tracing::debug!(target: "workbench.layout", activity_id = id, "toggled activity");
        Ok(next)
    }

    /// Minimize every open activity, or restore the minimized ones.
    #[must_use]
    pub fn toggle_maximized(&self) -> Self {
        let mut next = self.clone();
        Arc::make_mut(&mut next.activity_layout).toggle_maximized();
        next
    }

    pub fn set_panel_size(
        &self,
        side: PanelSide,
        size: u32,
        ratio: Option<f64>,
    ) -> Result<Self, LayoutError> {
        let ratio = ratio.map(checked_ratio).transpose()?;
        let mut next = self.clone();
        let panel = Arc::make_mut(&mut next.activity_layout).panels.get_mut(side);
        panel.size = size;
        if let Some(ratio) = ratio {
            panel.ratio = ratio;
        }
        Ok(next)
    }
}

fn navigation_for(segments: &[UrlSegment], options: &NavigateOptions) -> Option<Navigation> {
    if segments.is_empty() && options.hint.is_none() {
        None
    } else {
        Some(Navigation::new(options.hint.clone(), options.data.clone()))
    }
}
