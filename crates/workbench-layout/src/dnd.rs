//! Drag-and-drop contract between the rendering layer and the layout.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::LayoutError;
use crate::layout::{Layout, NavigateOptions, PartOptions, PartPlacement, ViewOptions};
use crate::model::{ElementId, Region, ViewId};
use crate::mutation::{NewPart, PartSpec};
use crate::outlets::{UrlSegment, format_path};

/// A view dropped onto a region of a grid element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewDragEvent {
    pub source: DragSource,
    pub target: DropTarget,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragSource {
    pub part_id: ElementId,
    pub view_id: ViewId,
    /// Carried so the view can be recreated when dropped into another
    /// workbench window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigation: Option<DragNavigation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragNavigation {
    #[serde(default)]
    pub path: Vec<UrlSegment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropTarget {
    pub element_id: ElementId,
    /// `None` drops into the center.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<Region>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_part: Option<NewPart>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
}

impl Layout {
    /// Apply a drop. A view unknown to this layout is recreated from the
    /// navigation it carries under a fresh `view.<n>` id.
    pub fn apply_view_drop(&self, event: &ViewDragEvent) -> Result<Self, LayoutError> {
        let region = event.target.region.unwrap_or_default();
        let target_id = event.target.element_id.as_str();
        if self.view(event.source.view_id.as_str()).is_some() {
            return self.move_view_to_region(
                event.source.view_id.as_str(),
                target_id,
                region,
                event.target.new_part.as_ref(),
                event.target.position,
            );
        }

        let Some(navigation) = &event.source.navigation else {
            return Err(LayoutError::not_found(&event.source.view_id));
        };
        let view_id = self.compute_next_view_id();
        let view_options = ViewOptions {
            position: event.target.position,
            activate: true,
            ..ViewOptions::default()
        };
        let placed = match region.align() {
            None => {
                if event.target.new_part.is_some() {
                    return Err(LayoutError::invalid(
                        "a center drop merges into the target part and cannot create a new part",
                    ));
                }
                self.add_view(view_id.clone(), target_id, &view_options)?
            }
            Some(align) => {
                let new_part = event.target.new_part.clone().unwrap_or_default();
                let part_id = new_part.id.unwrap_or_else(ElementId::generate_part);
                let mut spec = PartSpec::new(align).relative_to(target_id);
                spec.ratio = new_part.ratio;
                let options = PartOptions {
                    structural: false,
                    ..PartOptions::default()
                };
                self.add_part(part_id.clone(), &PartPlacement::Relative(spec), &options)?
                    .add_view(view_id.clone(), part_id.as_str(), &view_options)?
            }
        };

        tracing::debug!(
            target: "workbench.layout",
            view_id = %view_id,
            source_view_id = %event.source.view_id,
            "recreated dropped view"
        );
        placed.navigate_view(
            view_id.as_str(),
            &format_path(&navigation.path),
            &NavigateOptions {
                hint: navigation.hint.clone(),
                data: navigation.data.clone(),
            },
        )
    }
}
