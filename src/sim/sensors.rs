//! Sensor geometry for the simulated arena

use nalgebra::Vector2;

use crate::common::types::Point2D;

/// What a simulated object turns out to be when classified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// Collectible block
    Block,
    /// Anything else
    Obstacle,
}

/// Disc-shaped object on the arena floor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimObject {
    pub center: Point2D,
    pub radius: f64,
    pub kind: ObjectKind,
}

impl SimObject {
    pub fn block(x: f64, y: f64, radius: f64) -> Self {
        SimObject {
            center: Point2D::new(x, y),
            radius,
            kind: ObjectKind::Block,
        }
    }

    pub fn obstacle(x: f64, y: f64, radius: f64) -> Self {
        SimObject {
            center: Point2D::new(x, y),
            radius,
            kind: ObjectKind::Obstacle,
        }
    }

    pub fn contains(&self, point: &Point2D) -> bool {
        self.center.distance_to(point) <= self.radius
    }

    /// Distance along a ray to the object's surface, if the ray hits it
    pub fn ray_hit(&self, origin: &Point2D, bearing: f64) -> Option<f64> {
        let (sin, cos) = bearing.to_radians().sin_cos();
        let direction = Vector2::new(cos, sin);
        let to_center = Vector2::new(self.center.x - origin.x, self.center.y - origin.y);

        let along = to_center.dot(&direction);
        let across_sq = to_center.norm_squared() - along * along;
        let radius_sq = self.radius * self.radius;
        if across_sq > radius_sq {
            return None;
        }

        let half_chord = (radius_sq - across_sq).sqrt();
        let entry = along - half_chord;
        if entry >= 0.0 {
            Some(entry)
        } else if along + half_chord >= 0.0 {
            // Origin inside the disc
            Some(0.0)
        } else {
            None
        }
    }
}

/// Square grid of floor lines at multiples of `spacing` on both axes
#[derive(Debug, Clone, Copy)]
pub struct FloorGrid {
    pub spacing: f64,
    /// Half the painted line width
    pub half_width: f64,
}

impl FloorGrid {
    pub fn on_line(&self, point: &Point2D) -> bool {
        self.off_line(point.x) <= self.half_width || self.off_line(point.y) <= self.half_width
    }

    fn off_line(&self, coordinate: f64) -> f64 {
        let offset = coordinate.rem_euclid(self.spacing);
        offset.min(self.spacing - offset)
    }
}
