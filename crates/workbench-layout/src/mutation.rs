#![forbid(unsafe_code)]

//! Grid mutation engine.
//!
//! Every operation is pure: it clones the grid, applies the change to the
//! working copy, normalizes derived state (active ids, visibility) and
//! validates the result before handing it back. The receiver is never
//! modified, so a failed operation leaves no trace.
//!
//! Removing the last view of a non-structural part prunes that part and
//! collapses its parent tree node, promoting the sibling into the parent's
//! position. This is the only place where the engine restructures the tree
//! on its own.

use serde::{Deserialize, Serialize};

use crate::error::{GridModelError, LayoutError};
use crate::model::{
    ActivationClock, Align, ElementId, ElementKind, GridElement, Navigation, Part, PartGrid,
    Region, TreeNode, View, ViewId,
};

/// Ratio used when a placement does not specify one.
pub const DEFAULT_RATIO: f64 = 0.5;

/// Placement of a new part relative to an existing element of the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct PartSpec {
    /// Part or tree node to split; the grid root when `None`.
    pub relative_to: Option<ElementId>,
    pub align: Align,
    /// Share of the split given to the new part.
    pub ratio: Option<f64>,
}

impl PartSpec {
    #[must_use]
    pub fn new(align: Align) -> Self {
        Self {
            relative_to: None,
            align,
            ratio: None,
        }
    }

    #[must_use]
    pub fn relative_to(mut self, element: impl Into<ElementId>) -> Self {
        self.relative_to = Some(element.into());
        self
    }

    #[must_use]
    pub fn ratio(mut self, ratio: f64) -> Self {
        self.ratio = Some(ratio);
        self
    }
}

/// Part to create when a view is dropped onto an edge region.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ElementId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratio: Option<f64>,
}

/// Accepts ratios whose complement is also representable strictly inside
/// (0, 1), since right and bottom placements store `1.0 - ratio`.
pub(crate) fn checked_ratio(ratio: f64) -> Result<f64, LayoutError> {
    if ratio > 0.0 && ratio < 1.0 && 1.0 - ratio < 1.0 {
        Ok(ratio)
    } else {
        Err(LayoutError::invalid(format!(
            "ratio {ratio} must lie strictly between 0 and 1"
        )))
    }
}

impl PartGrid {
    fn transform(
        &self,
        op: impl FnOnce(&mut Self) -> Result<(), LayoutError>,
    ) -> Result<Self, LayoutError> {
        self.transform_with(op).map(|(grid, ())| grid)
    }

    fn transform_with<T>(
        &self,
        op: impl FnOnce(&mut Self) -> Result<T, LayoutError>,
    ) -> Result<(Self, T), LayoutError> {
        let mut working = self.clone();
        let value = op(&mut working)?;
        working.normalize();
        working.validate()?;
        Ok((working, value))
    }

    /// Add an empty part. Without `relative_to` the part becomes the root of
    /// an empty grid, or is placed next to the current root.
    pub fn add_part(
        &self,
        id: impl Into<ElementId>,
        spec: &PartSpec,
        structural: bool,
    ) -> Result<Self, LayoutError> {
        let id = id.into();
        self.transform(|grid| grid.insert_part(id, spec, Part::new(structural)))
    }

    /// Remove a part. Removing the root empties the grid; otherwise the
    /// part's sibling takes the place of their parent tree node.
    pub fn remove_part(&self, id: &str) -> Result<Self, LayoutError> {
        self.transform(|grid| grid.remove_part_inner(id))
    }

    /// Add a new, un-navigated view to a part.
    pub fn add_view(
        &self,
        part_id: &str,
        view_id: impl Into<ViewId>,
        position: Option<usize>,
        activate: bool,
        clock: &mut ActivationClock,
    ) -> Result<Self, LayoutError> {
        self.attach_view(part_id, View::new(view_id), position, activate, clock)
    }

    /// Insert an existing view into a part.
    pub fn attach_view(
        &self,
        part_id: &str,
        view: View,
        position: Option<usize>,
        activate: bool,
        clock: &mut ActivationClock,
    ) -> Result<Self, LayoutError> {
        self.transform(|grid| grid.put_view(part_id, view, position, activate, clock))
    }

    /// Remove a view and return it, pruning its part if that leaves it empty.
    pub fn detach_view(&self, view_id: &str) -> Result<(Self, View), LayoutError> {
        self.transform_with(|grid| grid.take_view(view_id).map(|(_, view)| view))
    }

    pub fn remove_view(&self, view_id: &str) -> Result<Self, LayoutError> {
        self.detach_view(view_id).map(|(grid, _)| grid)
    }

    /// Move a view to `position` of `target_part_id`. Within the same part a
    /// missing position keeps the view where it is.
    pub fn move_view(
        &self,
        view_id: &str,
        target_part_id: &str,
        position: Option<usize>,
        activate: bool,
        clock: &mut ActivationClock,
    ) -> Result<Self, LayoutError> {
        self.transform(|grid| grid.relocate_view(view_id, target_part_id, position, activate, clock))
    }

    /// Drag-and-drop entry point.
    ///
    /// `Center` merges the view into the target part. Edge regions split the
    /// target with a new non-structural part hosting the view. Dropping a view
    /// where it already is returns an equal grid.
    pub fn move_view_to_region(
        &self,
        view_id: &str,
        target_id: &str,
        region: Region,
        new_part: Option<&NewPart>,
        position: Option<usize>,
        clock: &mut ActivationClock,
    ) -> Result<Self, LayoutError> {
        let source_id = self
            .part_of_view(view_id)
            .ok_or_else(|| LayoutError::not_found(view_id))?;
        let source = self
            .part(source_id.as_str())
            .ok_or_else(|| LayoutError::not_found(source_id))?;
        let target = self
            .element(target_id)
            .ok_or_else(|| LayoutError::not_found(target_id))?;
        let same_part = source_id == target_id;

        let Some(align) = region.align() else {
            if new_part.is_some() {
                return Err(LayoutError::invalid(
                    "a center drop merges into the target part and cannot create a new part",
                ));
            }
            if target.as_part().is_none() {
                return Err(LayoutError::invalid(format!(
                    "center drop target {target_id} is not a part"
                )));
            }
            if same_part {
                let current = source.view_index(view_id).unwrap_or_default();
                let last = source.views.len().saturating_sub(1);
                if position.is_none_or(|position| position.min(last) == current) {
                    return Ok(self.clone());
                }
            }
            return self.move_view(view_id, target_id, position, true, clock);
        };

        if same_part && source.views.len() == 1 {
            return Ok(self.clone());
        }

        let new_id = new_part
            .and_then(|spec| spec.id.clone())
            .unwrap_or_else(ElementId::generate_part);
        if source_id.as_str() == new_id.as_str()
            && self.is_edge_of(new_id.as_str(), target_id, align)
        {
            return Ok(self.clone());
        }
        let spec = PartSpec {
            relative_to: Some(target_id.into()),
            align,
            ratio: new_part.and_then(|spec| spec.ratio),
        };
        self.transform(|grid| {
            grid.insert_part(new_id.clone(), &spec, Part::new(false))?;
            let (_, view) = grid.take_view(view_id)?;
            grid.put_view(new_id.as_str(), view, None, true, clock)
        })
    }

    /// Whether `part_id` already sits on the `align` side of `target_id`
    /// under a split of the matching direction.
    fn is_edge_of(&self, part_id: &str, target_id: &str, align: Align) -> bool {
        let Some(parent) = self.element(part_id).and_then(|element| element.parent.as_ref()) else {
            return false;
        };
        let Some(node) = self.node(parent.as_str()) else {
            return false;
        };
        let (first, second) = if align.places_first() {
            (part_id, target_id)
        } else {
            (target_id, part_id)
        };
        node.direction == align.direction()
            && node.child1.as_str() == first
            && node.child2.as_str() == second
    }

    pub fn activate_part(&self, part_id: &str, clock: &mut ActivationClock) -> Result<Self, LayoutError> {
        self.transform(|grid| grid.activate_part_inner(part_id, clock.tick()))
    }

    /// Activate a view and the part hosting it.
    pub fn activate_view(&self, view_id: &str, clock: &mut ActivationClock) -> Result<Self, LayoutError> {
        self.transform(|grid| grid.activate_view_inner(view_id, clock.tick()))
    }

    /// Bind or clear a part's navigation. Clearing the navigation of an
    /// empty non-structural part prunes it.
    pub fn set_part_navigation(
        &self,
        part_id: &str,
        navigation: Option<Navigation>,
    ) -> Result<Self, LayoutError> {
        self.transform(|grid| {
            let part = grid.part_mut(part_id)?;
            part.navigation = navigation;
            grid.prune_if_empty(part_id)
        })
    }

    pub fn set_part_css_class(&self, part_id: &str, css_class: Vec<String>) -> Result<Self, LayoutError> {
        self.transform(|grid| {
            grid.part_mut(part_id)?.css_class = css_class;
            Ok(())
        })
    }

    pub fn set_view_navigation(
        &self,
        view_id: &str,
        navigation: Option<Navigation>,
    ) -> Result<Self, LayoutError> {
        self.transform(|grid| {
            grid.view_mut(view_id)?.navigation = navigation;
            Ok(())
        })
    }

    pub fn rename_view(&self, view_id: &str, new_id: impl Into<ViewId>) -> Result<Self, LayoutError> {
        let new_id = new_id.into();
        if self.contains_view(new_id.as_str()) {
            return Err(LayoutError::duplicate(new_id));
        }
        self.transform(|grid| {
            let part_id = grid
                .part_of_view(view_id)
                .cloned()
                .ok_or_else(|| LayoutError::not_found(view_id))?;
            let part = grid.part_mut(part_id.as_str())?;
            if part.active_view_id.as_ref().is_some_and(|active| active == view_id) {
                part.active_view_id = Some(new_id.clone());
            }
            if let Some(view) = part.views.iter_mut().find(|view| view.id == view_id) {
                view.id = new_id;
            }
            Ok(())
        })
    }

    /// Resize the sash of a tree node.
    pub fn set_split_ratio(&self, node_id: &str, ratio: f64) -> Result<Self, LayoutError> {
        let ratio = checked_ratio(ratio)?;
        self.transform(|grid| {
            let element = grid
                .elements
                .get_mut(node_id)
                .ok_or_else(|| LayoutError::not_found(node_id))?;
            match &mut element.kind {
                ElementKind::Node(node) => {
                    node.ratio = ratio;
                    Ok(())
                }
                ElementKind::Part(_) => Err(LayoutError::invalid(format!(
                    "{node_id} is a part, not a tree node"
                ))),
            }
        })
    }

    pub fn mark_view_for_removal(&self, view_id: &str) -> Result<Self, LayoutError> {
        self.transform(|grid| {
            grid.view_mut(view_id)?.marked_for_removal = true;
            Ok(())
        })
    }

    pub fn remove_views_marked_for_removal(&self) -> Result<Self, LayoutError> {
        let marked = self
            .views()
            .filter(|view| view.marked_for_removal)
            .map(|view| view.id.clone())
            .collect::<Vec<_>>();
        if marked.is_empty() {
            return Ok(self.clone());
        }
        self.transform(|grid| {
            for view_id in &marked {
                let _ = grid.take_view(view_id.as_str())?;
            }
            Ok(())
        })
    }

    fn part_mut(&mut self, id: &str) -> Result<&mut Part, LayoutError> {
        let element = self
            .elements
            .get_mut(id)
            .ok_or_else(|| LayoutError::not_found(id))?;
        match &mut element.kind {
            ElementKind::Part(part) => Ok(part),
            ElementKind::Node(_) => Err(LayoutError::invalid(format!(
                "{id} is a tree node, not a part"
            ))),
        }
    }

    fn view_mut(&mut self, view_id: &str) -> Result<&mut View, LayoutError> {
        self.elements
            .values_mut()
            .filter_map(GridElement::as_part_mut)
            .find_map(|part| part.views.iter_mut().find(|view| view.id == view_id))
            .ok_or_else(|| LayoutError::not_found(view_id))
    }

    fn insert_part(&mut self, id: ElementId, spec: &PartSpec, part: Part) -> Result<(), LayoutError> {
        if self.elements.contains_key(&id) {
            return Err(LayoutError::duplicate(id));
        }
        let ratio = checked_ratio(spec.ratio.unwrap_or(DEFAULT_RATIO))?;

        let target = match (&spec.relative_to, &self.root) {
            (Some(target), _) => target.clone(),
            (None, Some(root)) => root.clone(),
            (None, None) => {
                let _ = self
                    .elements
                    .insert(id.clone(), GridElement::part(id.clone(), None, part));
                self.root = Some(id);
                return Ok(());
            }
        };
        let target_parent = self
            .elements
            .get(&target)
            .ok_or_else(|| LayoutError::not_found(&target))?
            .parent
            .clone();

        let node_id = ElementId::generate_node();
        let node = if spec.align.places_first() {
            TreeNode {
                child1: id.clone(),
                child2: target.clone(),
                direction: spec.align.direction(),
                ratio,
            }
        } else {
            TreeNode {
                child1: target.clone(),
                child2: id.clone(),
                direction: spec.align.direction(),
                ratio: 1.0 - ratio,
            }
        };

        if let Some(target_element) = self.elements.get_mut(&target) {
            target_element.parent = Some(node_id.clone());
        }
        let _ = self
            .elements
            .insert(id.clone(), GridElement::part(id, Some(node_id.clone()), part));
        let _ = self.elements.insert(
            node_id.clone(),
            GridElement::node(node_id.clone(), target_parent.clone(), node),
        );
        match target_parent {
            Some(parent) => self.replace_child(&parent, &target, node_id)?,
            None => self.root = Some(node_id),
        }
        Ok(())
    }

    fn remove_part_inner(&mut self, id: &str) -> Result<(), LayoutError> {
        let element = self
            .elements
            .get(id)
            .ok_or_else(|| LayoutError::not_found(id))?;
        if element.as_part().is_none() {
            return Err(LayoutError::invalid(format!(
                "{id} is a tree node, not a part"
            )));
        }
        if element.id.is_main_area() {
            return Err(LayoutError::invalid("the main area part cannot be removed"));
        }

        match element.parent.clone() {
            None => {
                self.root = None;
                self.elements.clear();
            }
            Some(parent) => {
                self.promote_sibling(id, &parent)?;
                let _ = self.elements.remove(id);
            }
        }
        Ok(())
    }

    /// Replace `parent` by the sibling of `detached`.
    fn promote_sibling(&mut self, detached: &str, parent_id: &ElementId) -> Result<(), LayoutError> {
        let parent = self
            .elements
            .get(parent_id)
            .ok_or_else(|| GridModelError::MissingParent {
                element: detached.into(),
                parent: parent_id.clone(),
            })?;
        let Some(node) = parent.as_node() else {
            return Err(LayoutError::invalid(format!(
                "parent {parent_id} of {detached} is not a tree node"
            )));
        };
        let sibling = if node.child1 == detached {
            node.child2.clone()
        } else {
            node.child1.clone()
        };
        let grandparent = parent.parent.clone();

        match &grandparent {
            Some(grandparent) => self.replace_child(grandparent, parent_id, sibling.clone())?,
            None => self.root = Some(sibling.clone()),
        }
        if let Some(sibling) = self.elements.get_mut(&sibling) {
            sibling.parent = grandparent;
        }
        let _ = self.elements.remove(parent_id);
        tracing::debug!(
            target: "workbench.grid",
            node_id = %parent_id,
            promoted = %sibling,
            "collapsed tree node"
        );
        Ok(())
    }

    fn replace_child(
        &mut self,
        parent_id: &ElementId,
        old_child: &ElementId,
        new_child: ElementId,
    ) -> Result<(), LayoutError> {
        let parent = self
            .elements
            .get_mut(parent_id)
            .ok_or_else(|| LayoutError::not_found(parent_id))?;
        let ElementKind::Node(node) = &mut parent.kind else {
            return Err(LayoutError::invalid(format!("{parent_id} is not a tree node")));
        };
        if node.child1 == *old_child {
            node.child1 = new_child;
        } else if node.child2 == *old_child {
            node.child2 = new_child;
        } else {
            return Err(GridModelError::ParentMismatch {
                element: old_child.clone(),
                expected: Some(parent_id.clone()),
                actual: None,
            }
            .into());
        }
        Ok(())
    }

    fn prune_if_empty(&mut self, part_id: &str) -> Result<(), LayoutError> {
        let prunable = self
            .elements
            .get_key_value(part_id)
            .and_then(|(id, element)| element.as_part().map(|part| part.is_prunable(id)))
            .unwrap_or(false);
        if prunable {
            tracing::debug!(target: "workbench.grid", part_id, "pruning empty part");
            self.remove_part_inner(part_id)?;
        }
        Ok(())
    }

    /// Remove a view from its part, re-activating the most recently used
    /// remaining view and pruning the part if it is left empty.
    fn take_view(&mut self, view_id: &str) -> Result<(ElementId, View), LayoutError> {
        let part_id = self
            .part_of_view(view_id)
            .cloned()
            .ok_or_else(|| LayoutError::not_found(view_id))?;
        let part = self.part_mut(part_id.as_str())?;
        let index = part
            .view_index(view_id)
            .ok_or_else(|| LayoutError::not_found(view_id))?;
        let view = part.views.remove(index);
        if part.active_view_id.as_ref() == Some(&view.id) {
            part.active_view_id = part.most_recent_view().map(|next| next.id.clone());
        }
        self.prune_if_empty(part_id.as_str())?;
        Ok((part_id, view))
    }

    fn put_view(
        &mut self,
        part_id: &str,
        mut view: View,
        position: Option<usize>,
        activate: bool,
        clock: &mut ActivationClock,
    ) -> Result<(), LayoutError> {
        if self.contains_view(view.id.as_str()) {
            return Err(LayoutError::duplicate(&view.id));
        }
        let part = self.part_mut(part_id)?;
        let view_id = view.id.clone();
        let becomes_active = activate || part.views.is_empty();
        if becomes_active {
            view.activation_instant = clock.tick();
            part.active_view_id = Some(view_id);
        }
        let index = position.unwrap_or(part.views.len()).min(part.views.len());
        part.views.insert(index, view);
        if activate {
            part.activation_instant = clock.tick();
            self.active_part_id = Some(part_id.into());
        }
        Ok(())
    }

    fn relocate_view(
        &mut self,
        view_id: &str,
        target_part_id: &str,
        position: Option<usize>,
        activate: bool,
        clock: &mut ActivationClock,
    ) -> Result<(), LayoutError> {
        let source_id = self
            .part_of_view(view_id)
            .cloned()
            .ok_or_else(|| LayoutError::not_found(view_id))?;
        let _ = self.part_mut(target_part_id)?;

        if source_id == target_part_id {
            let part = self.part_mut(target_part_id)?;
            let current = part
                .view_index(view_id)
                .ok_or_else(|| LayoutError::not_found(view_id))?;
            let last = part.views.len().saturating_sub(1);
            let destination = position.map_or(current, |position| position.min(last));
            if destination != current {
                let view = part.views.remove(current);
                part.views.insert(destination, view);
            }
            if activate {
                self.activate_view_inner(view_id, clock.tick())?;
            }
            return Ok(());
        }

        let (_, view) = self.take_view(view_id)?;
        self.put_view(target_part_id, view, position, activate, clock)
    }

    fn activate_part_inner(&mut self, part_id: &str, instant: u64) -> Result<(), LayoutError> {
        self.part_mut(part_id)?.activation_instant = instant;
        self.active_part_id = Some(part_id.into());
        Ok(())
    }

    fn activate_view_inner(&mut self, view_id: &str, instant: u64) -> Result<(), LayoutError> {
        let part_id = self
            .part_of_view(view_id)
            .cloned()
            .ok_or_else(|| LayoutError::not_found(view_id))?;
        let part = self.part_mut(part_id.as_str())?;
        part.active_view_id = Some(view_id.into());
        if let Some(view) = part.views.iter_mut().find(|view| view.id == view_id) {
            view.activation_instant = instant;
        }
        self.activate_part_inner(part_id.as_str(), instant)
    }
}
