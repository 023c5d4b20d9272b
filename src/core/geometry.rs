use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in image pixel space.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        (self.x1 - self.x0).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y1 - self.y0).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Intersection over union of two boxes.
    ///
    /// Disjoint boxes yield exactly 0.0, as does a pair of zero-area boxes
    /// (no division by zero). Symmetric in its arguments.
    pub fn overlap_ratio(&self, other: &Self) -> f32 {
        let x0 = self.x0.max(other.x0);
        let y0 = self.y0.max(other.y0);
        let x1 = self.x1.min(other.x1);
        let y1 = self.y1.min(other.y1);

        let inter = BBox::new(x0, y0, x1, y1);
        let inter_area = inter.area();
        let union = self.area() + other.area() - inter_area;
        if union <= 0.0 {
            0.0
        } else {
            inter_area / union
        }
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.x0, self.y0, self.x1, self.y1]
    }
}
