use eframe::egui::{Pos2, Vec2, vec2};

use crate::projection::{HOVER_RADIUS_DELTA, POINT_RADIUS, RenderDescriptor, RenderedPoint};

pub const TOOLTIP_OFFSET: Vec2 = vec2(10.0, -28.0);

/// Ask the host to open a document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavigationIntent {
    pub doc_id: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Tooltip {
    pub anchor: Pos2,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq)]
struct Hover {
    index: usize,
    pointer: Pos2,
}

/// Hover and click handling over one [`RenderDescriptor`]. Never touches the cluster store.
#[derive(Debug, Default)]
pub struct InteractionController {
    hover: Option<Hover>,
}

impl InteractionController {
    pub fn reset(&mut self) {
        self.hover = None;
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hover.as_ref().map(|hover| hover.index)
    }

    pub fn pointer_enter(&mut self, index: usize, pointer: Pos2) {
        self.hover = Some(Hover { index, pointer });
    }

    /// Only the point that is currently hovered can end the hover.
    pub fn pointer_leave(&mut self, index: usize) {
        if self.hovered() == Some(index) {
            self.hover = None;
        }
    }

    pub fn click(&self, descriptor: &RenderDescriptor, index: usize) -> Option<NavigationIntent> {
        descriptor.points.get(index).map(|point| NavigationIntent {
            doc_id: point.id.clone(),
        })
    }

    pub fn radius(&self, index: usize) -> f32 {
        if self.hovered() == Some(index) {
            POINT_RADIUS + HOVER_RADIUS_DELTA
        } else {
            POINT_RADIUS
        }
    }

    pub fn tooltip(&self, descriptor: &RenderDescriptor) -> Option<Tooltip> {
        let hover = self.hover.as_ref()?;
        let point = descriptor.points.get(hover.index)?;
        Some(Tooltip {
            anchor: hover.pointer + TOOLTIP_OFFSET,
            text: tooltip_text(point),
        })
    }

    /// Closest point whose current radius contains `pointer`.
    pub fn hit_test(&self, descriptor: &RenderDescriptor, pointer: Pos2) -> Option<usize> {
        descriptor
            .points
            .iter()
            .enumerate()
            .filter_map(|(index, point)| {
                let distance = point.center.distance(pointer);
                (distance <= self.radius(index)).then_some((index, distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)
    }

    /// Turns one frame of pointer state into enter/leave/click transitions.
    pub fn track(
        &mut self,
        descriptor: &RenderDescriptor,
        pointer: Option<Pos2>,
        clicked: bool,
    ) -> Option<NavigationIntent> {
        let target = pointer.and_then(|pointer| self.hit_test(descriptor, pointer));

        if let Some(previous) = self.hovered()
            && target != Some(previous)
        {
            self.pointer_leave(previous);
        }

        match (target, pointer) {
            (Some(index), Some(pointer)) => {
                self.pointer_enter(index, pointer);
                if clicked {
                    return self.click(descriptor, index);
                }
                None
            }
            _ => None,
        }
    }
}

fn tooltip_text(point: &RenderedPoint) -> String {
    format!("📄 {}\nCluster: {}", point.id, point.cluster)
}
