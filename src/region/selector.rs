use serde::{Deserialize, Serialize};
use sitecraft_common::SelectionRegion;

use crate::errors::RegionError;

/// Drags smaller than this (in either dimension, after clamping) are discarded.
pub const MIN_SELECTION_PX: f64 = 5.0;

/// Displayed image rectangle, relative to its container, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ImageBox {
    /// Box of an image of natural size `natural_w` x `natural_h` drawn with
    /// `object-fit: contain` inside a `container_w` x `container_h` container.
    pub fn contain(container_w: f64, container_h: f64, natural_w: f64, natural_h: f64) -> Self {
        if natural_w <= 0.0 || natural_h <= 0.0 {
            return Self {
                left: 0.0,
                top: 0.0,
                width: container_w,
                height: container_h,
            };
        }
        let scale = (container_w / natural_w).min(container_h / natural_h);
        let width = natural_w * scale;
        let height = natural_h * scale;
        Self {
            left: (container_w - width) / 2.0,
            top: (container_h - height) / 2.0,
            width,
            height,
        }
    }

    fn clamp_point(&self, x: f64, y: f64) -> (f64, f64) {
        (
            x.clamp(self.left, self.left + self.width),
            y.clamp(self.top, self.top + self.height),
        )
    }
}

/// Convert a drag between two container points into a normalized region.
pub fn region_from_drag(
    image_box: &ImageBox,
    start: (f64, f64),
    end: (f64, f64),
) -> Result<SelectionRegion, RegionError> {
    let (x1, y1) = image_box.clamp_point(start.0, start.1);
    let (x2, y2) = image_box.clamp_point(end.0, end.1);
    let width = (x2 - x1).abs();
    let height = (y2 - y1).abs();
    if width < MIN_SELECTION_PX || height < MIN_SELECTION_PX {
        return Err(RegionError::Degenerate { width, height });
    }
    let region = SelectionRegion::new(
        (x1.min(x2) - image_box.left) / image_box.width,
        (y1.min(y2) - image_box.top) / image_box.height,
        width / image_box.width,
        height / image_box.height,
    )?;
    Ok(region)
}

#[derive(Debug, Clone, Copy)]
struct Drag {
    start: (f64, f64),
    current: (f64, f64),
}

/// Pointer-driven selection state for one displayed image.
#[derive(Debug, Clone)]
pub struct RegionSelector {
    image_box: ImageBox,
    drag: Option<Drag>,
    selection: Option<SelectionRegion>,
}

impl RegionSelector {
    pub fn new(image_box: ImageBox) -> Self {
        Self {
            image_box,
            drag: None,
            selection: None,
        }
    }

    /// Update the displayed box after a resize. The committed region is
    /// fractional and survives.
    pub fn set_image_box(&mut self, image_box: ImageBox) {
        self.image_box = image_box;
    }

    pub fn image_box(&self) -> &ImageBox {
        &self.image_box
    }

    /// Start a new drag. Any committed selection is cleared.
    pub fn pointer_down(&mut self, x: f64, y: f64) {
        self.selection = None;
        self.drag = Some(Drag {
            start: (x, y),
            current: (x, y),
        });
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) {
        if let Some(drag) = self.drag.as_mut() {
            drag.current = (x, y);
        }
    }

    /// Finish the drag and commit it, unless it is degenerate.
    pub fn pointer_up(&mut self, x: f64, y: f64) -> Option<SelectionRegion> {
        let drag = self.drag.take()?;
        match region_from_drag(&self.image_box, drag.start, (x, y)) {
            Ok(region) => {
                self.selection = Some(region);
                Some(region)
            }
            Err(e) => {
                tracing::debug!(error = %e, "discarding selection");
                None
            }
        }
    }

    /// Rectangle being dragged, in container pixels: `(left, top, width, height)`.
    pub fn drag_rect(&self) -> Option<(f64, f64, f64, f64)> {
        let drag = self.drag?;
        let (x1, y1) = self.image_box.clamp_point(drag.start.0, drag.start.1);
        let (x2, y2) = self.image_box.clamp_point(drag.current.0, drag.current.1);
        Some((x1.min(x2), y1.min(y2), (x2 - x1).abs(), (y2 - y1).abs()))
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn selection(&self) -> Option<&SelectionRegion> {
        self.selection.as_ref()
    }

    pub fn clear(&mut self) {
        self.drag = None;
        self.selection = None;
    }
}
