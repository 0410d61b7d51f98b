#![forbid(unsafe_code)]

//! Part grid queries, normalization and structural validation.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::GridModelError;
use crate::model::{ElementId, ElementKind, GridElement, Part, PartGrid, TreeNode, View, ViewId};

impl PartGrid {
    /// Grid without any element.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Grid consisting of a single active part.
    #[must_use]
    pub fn with_root_part(id: impl Into<ElementId>, structural: bool) -> Self {
        let id = id.into();
        let mut elements = BTreeMap::new();
        let _ = elements.insert(id.clone(), GridElement::part(id.clone(), None, Part::new(structural)));
        let mut grid = Self {
            root: Some(id.clone()),
            elements,
            active_part_id: Some(id.clone()),
            reference_part_id: Some(id),
        };
        grid.normalize();
        grid
    }

    #[must_use]
    pub fn root(&self) -> Option<&ElementId> {
        self.root.as_ref()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    #[must_use]
    pub fn active_part_id(&self) -> Option<&ElementId> {
        self.active_part_id.as_ref()
    }

    #[must_use]
    pub fn reference_part_id(&self) -> Option<&ElementId> {
        self.reference_part_id.as_ref()
    }

    #[must_use]
    pub fn element(&self, id: &str) -> Option<&GridElement> {
        self.elements.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.elements.contains_key(id)
    }

    #[must_use]
    pub fn part(&self, id: &str) -> Option<&Part> {
        self.elements.get(id).and_then(GridElement::as_part)
    }

    #[must_use]
    pub fn node(&self, id: &str) -> Option<&TreeNode> {
        self.elements.get(id).and_then(GridElement::as_node)
    }

    #[must_use]
    pub fn is_visible(&self, id: &str) -> bool {
        self.elements.get(id).is_some_and(|element| element.visible)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Element ids in depth-first order, `child1` before `child2`.
    #[must_use]
    pub fn depth_first(&self) -> Vec<ElementId> {
        let mut out = Vec::with_capacity(self.elements.len());
        let mut stack = self.root.iter().cloned().collect::<Vec<_>>();
        while let Some(id) = stack.pop() {
            if let Some(ElementKind::Node(node)) = self.elements.get(&id).map(|e| &e.kind) {
                stack.push(node.child2.clone());
                stack.push(node.child1.clone());
            }
            out.push(id);
        }
        out
    }

    /// Parts in depth-first order.
    pub fn parts(&self) -> impl Iterator<Item = (&ElementId, &Part)> + '_ {
        self.depth_first().into_iter().filter_map(move |id| {
            self.elements
                .get_key_value(&id)
                .and_then(|(key, element)| element.as_part().map(|part| (key, part)))
        })
    }

    /// Views of every part in depth-first order.
    pub fn views(&self) -> impl Iterator<Item = &View> + '_ {
        self.parts().flat_map(|(_, part)| part.views.iter())
    }

    /// Part hosting `view_id`.
    #[must_use]
    pub fn part_of_view(&self, view_id: &str) -> Option<&ElementId> {
        self.elements.values().find_map(|element| {
            element
                .as_part()
                .filter(|part| part.view(view_id).is_some())
                .map(|_| &element.id)
        })
    }

    #[must_use]
    pub fn view(&self, view_id: &str) -> Option<&View> {
        self.elements
            .values()
            .filter_map(GridElement::as_part)
            .find_map(|part| part.view(view_id))
    }

    #[must_use]
    pub fn contains_view(&self, view_id: &str) -> bool {
        self.view(view_id).is_some()
    }

    /// Largest activation instant recorded in this grid.
    #[must_use]
    pub fn max_activation_instant(&self) -> u64 {
        self.elements
            .values()
            .filter_map(GridElement::as_part)
            .flat_map(|part| {
                std::iter::once(part.activation_instant)
                    .chain(part.views.iter().map(|view| view.activation_instant))
            })
            .max()
            .unwrap_or(0)
    }

    /// Recompute every parent back-reference from the child links.
    pub(crate) fn rebuild_parents(&mut self) {
        let mut parents = BTreeMap::new();
        for element in self.elements.values() {
            if let ElementKind::Node(node) = &element.kind {
                let _ = parents.insert(node.child1.clone(), element.id.clone());
                let _ = parents.insert(node.child2.clone(), element.id.clone());
            }
        }
        for (id, element) in &mut self.elements {
            element.parent = parents.get(id).cloned();
        }
    }

    /// Repair derived state after a structural change: active ids and
    /// visibility.
    pub(crate) fn normalize(&mut self) {
        if self.root.is_none() {
            self.elements.clear();
            self.active_part_id = None;
            self.reference_part_id = None;
            return;
        }

        for element in self.elements.values_mut() {
            if let Some(part) = element.as_part_mut() {
                let dangling = part
                    .active_view_id
                    .as_ref()
                    .is_some_and(|active| part.view(active.as_str()).is_none());
                if dangling || (part.active_view_id.is_none() && !part.views.is_empty()) {
                    part.active_view_id = part.most_recent_view().map(|view| view.id.clone());
                }
            }
        }

        if self
            .reference_part_id
            .as_ref()
            .is_some_and(|id| self.part(id.as_str()).is_none())
        {
            self.reference_part_id = None;
        }

        if self
            .active_part_id
            .as_ref()
            .is_none_or(|id| self.part(id.as_str()).is_none())
        {
            let replacement = self
                .parts()
                .fold(None, |best: Option<(&ElementId, u64)>, (id, part)| match best {
                    Some((_, instant)) if instant >= part.activation_instant => best,
                    _ => Some((id, part.activation_instant)),
                })
                .map(|(id, _)| id.clone());
            tracing::trace!(
                target: "workbench.grid",
                part_id = ?replacement,
                "repaired active part"
            );
            self.active_part_id = replacement;
        }

        self.compute_visibility();
    }

    fn compute_visibility(&mut self) {
        // Children precede parents in reversed depth-first order.
        for id in self.depth_first().into_iter().rev() {
            let visible = match self.elements.get(&id).map(|element| &element.kind) {
                Some(ElementKind::Part(part)) => {
                    !part.views.is_empty() || part.navigation.is_some() || id.is_main_area()
                }
                Some(ElementKind::Node(node)) => {
                    self.is_visible(node.child1.as_str()) || self.is_visible(node.child2.as_str())
                }
                None => false,
            };
            if let Some(element) = self.elements.get_mut(&id) {
                element.visible = visible;
            }
        }

        let root_visible = self
            .root
            .as_ref()
            .is_some_and(|root| self.is_visible(root.as_str()));
        if !root_visible {
            let mut cursor = self.reference_part_id.clone();
            while let Some(id) = cursor {
                cursor = match self.elements.get_mut(&id) {
                    Some(element) => {
                        element.visible = true;
                        element.parent.clone()
                    }
                    None => None,
                };
            }
        }
    }

    /// Check every structural invariant of the grid.
    pub fn validate(&self) -> Result<(), GridModelError> {
        let Some(root) = self.root.as_ref() else {
            if !self.elements.is_empty() {
                return Err(GridModelError::MissingRoot);
            }
            if let Some(part) = &self.active_part_id {
                return Err(GridModelError::ActivePartInEmptyGrid { part: part.clone() });
            }
            return Ok(());
        };
        let Some(root_element) = self.elements.get(root) else {
            return Err(GridModelError::RootNotFound { root: root.clone() });
        };
        if let Some(parent) = &root_element.parent {
            return Err(GridModelError::RootHasParent {
                root: root.clone(),
                parent: parent.clone(),
            });
        }

        let mut expected_parents: BTreeMap<&ElementId, &ElementId> = BTreeMap::new();
        let mut seen_views: BTreeSet<&ViewId> = BTreeSet::new();

        for (key, element) in &self.elements {
            if *key != element.id {
                return Err(GridModelError::IdMismatch {
                    key: key.clone(),
                    id: element.id.clone(),
                });
            }
            if let Some(parent) = &element.parent
                && !self.elements.contains_key(parent)
            {
                return Err(GridModelError::MissingParent {
                    element: key.clone(),
                    parent: parent.clone(),
                });
            }

            match &element.kind {
                ElementKind::Node(node) => {
                    if !(node.ratio > 0.0 && node.ratio < 1.0) {
                        return Err(GridModelError::InvalidRatio {
                            node: key.clone(),
                            ratio: node.ratio,
                        });
                    }
                    if node.child1 == *key || node.child2 == *key {
                        return Err(GridModelError::SelfReferentialNode { node: key.clone() });
                    }
                    if node.child1 == node.child2 {
                        return Err(GridModelError::DuplicateChildren {
                            node: key.clone(),
                            child: node.child1.clone(),
                        });
                    }
                    for child in [&node.child1, &node.child2] {
                        if !self.elements.contains_key(child) {
                            return Err(GridModelError::MissingChild {
                                node: key.clone(),
                                child: child.clone(),
                            });
                        }
                        if let Some(first_parent) = expected_parents.insert(child, key)
                            && first_parent != key
                        {
                            return Err(GridModelError::MultipleParents {
                                child: child.clone(),
                                first_parent: first_parent.clone(),
                                second_parent: key.clone(),
                            });
                        }
                    }
                }
                ElementKind::Part(part) => {
                    for view in &part.views {
                        if !seen_views.insert(&view.id) {
                            return Err(GridModelError::DuplicateViewId {
                                view: view.id.to_string(),
                            });
                        }
                    }
                    if let Some(active) = &part.active_view_id
                        && part.view(active.as_str()).is_none()
                    {
                        return Err(GridModelError::DanglingActiveView {
                            part: key.clone(),
                            view: active.to_string(),
                        });
                    }
                }
            }
        }

        for (key, element) in &self.elements {
            let expected = if key == root {
                None
            } else {
                expected_parents.get(key).map(|parent| (*parent).clone())
            };
            if element.parent != expected {
                return Err(GridModelError::ParentMismatch {
                    element: key.clone(),
                    expected,
                    actual: element.parent.clone(),
                });
            }
        }

        let mut visiting = BTreeSet::new();
        let mut visited = BTreeSet::new();
        self.dfs_validate(root, &mut visiting, &mut visited)?;
        if visited.len() != self.elements.len()
            && let Some(element) = self.elements.keys().find(|id| !visited.contains(*id))
        {
            return Err(GridModelError::UnreachableElement {
                element: element.clone(),
            });
        }

        match &self.active_part_id {
            None => return Err(GridModelError::NoActivePart),
            Some(part) if self.part(part.as_str()).is_none() => {
                return Err(GridModelError::InvalidActivePart { part: part.clone() });
            }
            Some(_) => {}
        }
        if let Some(part) = &self.reference_part_id
            && self.part(part.as_str()).is_none()
        {
            return Err(GridModelError::InvalidReferencePart { part: part.clone() });
        }

        Ok(())
    }

    fn dfs_validate<'a>(
        &'a self,
        id: &'a ElementId,
        visiting: &mut BTreeSet<&'a ElementId>,
        visited: &mut BTreeSet<&'a ElementId>,
    ) -> Result<(), GridModelError> {
        if visiting.contains(id) {
            return Err(GridModelError::CycleDetected {
                element: id.clone(),
            });
        }
        if !visited.insert(id) {
            return Ok(());
        }

        let _ = visiting.insert(id);
        if let Some(ElementKind::Node(node)) = self.elements.get(id).map(|element| &element.kind) {
            self.dfs_validate(&node.child1, visiting, visited)?;
            self.dfs_validate(&node.child2, visiting, visited)?;
        }
        let _ = visiting.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Direction, MAIN_AREA, Navigation};

    fn split(root: &str, first: &str, second: &str) -> PartGrid {
        let mut grid = PartGrid::empty();
        let node = TreeNode {
            child1: first.into(),
            child2: second.into(),
            direction: Direction::Row,
            ratio: 0.5,
        };
        let _ = grid
            .elements
            .insert(root.into(), GridElement::node(root.into(), None, node));
        for id in [first, second] {
            let _ = grid.elements.insert(
                id.into(),
                GridElement::part(id.into(), Some(root.into()), Part::new(true)),
            );
        }
        grid.root = Some(root.into());
        grid.active_part_id = Some(first.into());
        grid.normalize();
        grid
    }

    #[test]
    fn single_part_grid_is_valid_and_active() {
        let grid = PartGrid::with_root_part("part.a", true);
        assert!(grid.validate().is_ok());
        assert_eq!(grid.active_part_id().map(ElementId::as_str), Some("part.a"));
    }

    #[test]
    fn empty_grid_is_valid() {
        assert!(PartGrid::empty().validate().is_ok());
    }

    #[test]
    fn depth_first_visits_child1_before_child2() {
        let grid = split("node.1", "part.a", "part.b");
        let order = grid.depth_first();
        assert_eq!(order, ["node.1", "part.a", "part.b"].map(ElementId::from));
    }

    #[test]
    fn visibility_is_or_of_children() {
        let mut grid = split("node.1", "part.a", "part.b");
        if let Some(part) = grid.elements.get_mut("part.b").and_then(GridElement::as_part_mut) {
            part.views.push(View::new("view.1"));
        }
        grid.reference_part_id = None;
        grid.normalize();
        assert!(!grid.is_visible("part.a"));
        assert!(grid.is_visible("part.b"));
        assert!(grid.is_visible("node.1"));
    }

    #[test]
    fn invisible_root_forces_reference_chain_visible() {
        let mut grid = split("node.1", "part.a", "part.b");
        grid.reference_part_id = Some("part.b".into());
        grid.normalize();
        assert!(grid.is_visible("part.b"));
        assert!(grid.is_visible("node.1"));
        assert!(!grid.is_visible("part.a"));
    }

    #[test]
    fn main_area_and_navigated_parts_are_visible() {
        let mut grid = split("node.1", MAIN_AREA, "part.b");
        if let Some(part) = grid.elements.get_mut("part.b").and_then(GridElement::as_part_mut) {
            part.navigation = Some(Navigation::new(None, BTreeMap::new()));
        }
        grid.normalize();
        assert!(grid.is_visible(MAIN_AREA));
        assert!(grid.is_visible("part.b"));
    }

    #[test]
    fn normalize_repairs_missing_active_part_by_recency() {
        let mut grid = split("node.1", "part.a", "part.b");
        if let Some(part) = grid.elements.get_mut("part.b").and_then(GridElement::as_part_mut) {
            part.activation_instant = 9;
        }
        grid.active_part_id = Some("part.gone".into());
        grid.normalize();
        assert_eq!(grid.active_part_id().map(ElementId::as_str), Some("part.b"));
    }

    #[test]
    fn validate_rejects_out_of_range_ratio() {
        let mut grid = split("node.1", "part.a", "part.b");
        if let Some(ElementKind::Node(node)) = grid.elements.get_mut("node.1").map(|e| &mut e.kind) {
            node.ratio = 1.0;
        }
        assert!(matches!(
            grid.validate(),
            Err(GridModelError::InvalidRatio { .. })
        ));
    }

    #[test]
    fn validate_rejects_parent_mismatch() {
        let mut grid = split("node.1", "part.a", "part.b");
        if let Some(element) = grid.elements.get_mut("part.b") {
            element.parent = Some("part.a".into());
        }
        assert!(matches!(
            grid.validate(),
            Err(GridModelError::ParentMismatch { .. })
        ));
        grid.rebuild_parents();
        assert!(grid.validate().is_ok());
    }

    #[test]
    fn validate_rejects_unreachable_elements() {
        let mut grid = split("node.1", "part.a", "part.b");
        let _ = grid.elements.insert(
            "part.orphan".into(),
            GridElement::part("part.orphan".into(), None, Part::new(true)),
        );
        assert!(matches!(
            grid.validate(),
            Err(GridModelError::ParentMismatch { .. } | GridModelError::UnreachableElement { .. })
        ));
    }

    #[test]
    fn validate_rejects_duplicate_view_ids() {
        let mut grid = split("node.1", "part.a", "part.b");
        for id in ["part.a", "part.b"] {
            if let Some(part) = grid.elements.get_mut(id).and_then(GridElement::as_part_mut) {
                part.views.push(View::new("view.1"));
            }
        }
        grid.normalize();
        assert!(matches!(
            grid.validate(),
            Err(GridModelError::DuplicateViewId { .. })
        ));
    }

    #[test]
    fn validate_rejects_dangling_active_view() {
        let mut grid = PartGrid::with_root_part("part.a", true);
        if let Some(part) = grid.elements.get_mut("part.a").and_then(GridElement::as_part_mut) {
            part.active_view_id = Some("view.9".into());
        }
        assert!(matches!(
            grid.validate(),
            Err(GridModelError::DanglingActiveView { .. })
        ));
    }
}
