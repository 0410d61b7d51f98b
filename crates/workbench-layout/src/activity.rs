//! Activity dock layout: stacks of activities per docking area and the
//! sizes of the left, right and bottom panels hosting them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{ActivityId, ElementId};

pub const DEFAULT_PANEL_WIDTH: u32 = 300;
pub const DEFAULT_PANEL_HEIGHT: u32 = 250;
pub const DEFAULT_PANEL_RATIO: f64 = 0.5;

/// Docking slot of an activity stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DockingArea {
    LeftTop,
    LeftBottom,
    RightTop,
    RightBottom,
    BottomLeft,
    BottomRight,
}

impl DockingArea {
    pub const ALL: [Self; 6] = [
        Self::LeftTop,
        Self::LeftBottom,
        Self::RightTop,
        Self::RightBottom,
        Self::BottomLeft,
        Self::BottomRight,
    ];

    #[must_use]
    pub fn panel(self) -> PanelSide {
        match self {
            Self::LeftTop | Self::LeftBottom => PanelSide::Left,
            Self::RightTop | Self::RightBottom => PanelSide::Right,
            Self::BottomLeft | Self::BottomRight => PanelSide::Bottom,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelSide {
    Left,
    Right,
    Bottom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: ActivityId,
    /// Root part of the activity's grid.
    pub reference_part_id: ElementId,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityStack {
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_activity_id: Option<ActivityId>,
    /// Activity to reopen when the workbench leaves maximized mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimized_activity_id: Option<ActivityId>,
}

/// Size of a panel and the split between its two stacks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Panel {
    pub size: u32,
    pub ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Panels {
    pub left: Panel,
    pub right: Panel,
    pub bottom: Panel,
}

impl Default for Panels {
    fn default() -> Self {
        Self {
            left: Panel {
                size: DEFAULT_PANEL_WIDTH,
                ratio: DEFAULT_PANEL_RATIO,
            },
            right: Panel {
                size: DEFAULT_PANEL_WIDTH,
                ratio: DEFAULT_PANEL_RATIO,
            },
            bottom: Panel {
                size: DEFAULT_PANEL_HEIGHT,
                ratio: DEFAULT_PANEL_RATIO,
            },
        }
    }
}

impl Panels {
    #[must_use]
    pub fn get(&self, side: PanelSide) -> &Panel {
        match side {
            PanelSide::Left => &self.left,
            PanelSide::Right => &self.right,
            PanelSide::Bottom => &self.bottom,
        }
    }

    pub fn get_mut(&mut self, side: PanelSide) -> &mut Panel {
        match side {
            PanelSide::Left => &mut self.left,
            PanelSide::Right => &mut self.right,
            PanelSide::Bottom => &mut self.bottom,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ActivityLayout {
    #[serde(default)]
    pub toolbars: BTreeMap<DockingArea, ActivityStack>,
    #[serde(default)]
    pub panels: Panels,
}

impl ActivityLayout {
    #[must_use]
    pub fn with_panels(panels: Panels) -> Self {
        Self {
            toolbars: BTreeMap::new(),
            panels,
        }
    }

    #[must_use]
    pub fn stack(&self, area: DockingArea) -> Option<&ActivityStack> {
        self.toolbars.get(&area)
    }

    /// Every activity with its docking area, in docking-area order.
    pub fn activities(&self) -> impl Iterator<Item = (DockingArea, &Activity)> + '_ {
        self.toolbars
            .iter()
            .flat_map(|(area, stack)| stack.activities.iter().map(move |activity| (*area, activity)))
    }

    #[must_use]
    pub fn find(&self, id: &str) -> Option<(DockingArea, &Activity)> {
        self.activities().find(|(_, activity)| activity.id == id)
    }

    #[must_use]
    pub fn is_open(&self, id: &str) -> bool {
        self.find(id).is_some_and(|(area, _)| {
            self.toolbars
                .get(&area)
                .and_then(|stack| stack.active_activity_id.as_ref())
                .is_some_and(|active| active == id)
        })
    }

    pub(crate) fn add(&mut self, area: DockingArea, activity: Activity) {
        self.toolbars.entry(area).or_default().activities.push(activity);
    }

    /// Remove an activity, returning whether it existed.
    pub(crate) fn remove(&mut self, id: &str) -> bool {
        let mut removed = false;
        for stack in self.toolbars.values_mut() {
            let before = stack.activities.len();
            stack.activities.retain(|activity| activity.id != id);
            removed |= stack.activities.len() != before;
            if stack.active_activity_id.as_ref().is_some_and(|active| active == id) {
                stack.active_activity_id = None;
            }
            if stack.minimized_activity_id.as_ref().is_some_and(|minimized| minimized == id) {
                stack.minimized_activity_id = None;
            }
        }
        self.toolbars.retain(|_, stack| !stack.activities.is_empty());
        removed
    }

    /// Make `id` the open activity of its stack. Returns `false` if unknown.
    pub(crate) fn open(&mut self, id: &str) -> bool {
        let Some((area, activity)) = self.find(id) else {
            return false;
        };
        let activity_id = activity.id.clone();
        if let Some(stack) = self.toolbars.get_mut(&area) {
            stack.active_activity_id = Some(activity_id);
            stack.minimized_activity_id = None;
        }
        true
    }

    /// Open `id`, or close it when it is already open.
    pub(crate) fn toggle(&mut self, id: &str) -> bool {
        if self.is_open(id) {
            if let Some(area) = self.find(id).map(|(area, _)| area)
                && let Some(stack) = self.toolbars.get_mut(&area)
            {
                stack.active_activity_id = None;
            }
            true
        } else {
            self.open(id)
        }
    }

    /// Minimize every open activity, or restore the minimized ones when
    /// none is open.
    pub(crate) fn toggle_maximized(&mut self) {
        let any_open = self
            .toolbars
            .values()
            .any(|stack| stack.active_activity_id.is_some());
        for stack in self.toolbars.values_mut() {
            if any_open {
                if let Some(active) = stack.active_activity_id.take() {
                    stack.minimized_activity_id = Some(active);
                }
            } else if let Some(minimized) = stack.minimized_activity_id.take() {
                stack.active_activity_id = Some(minimized);
            }
        }
    }
}
