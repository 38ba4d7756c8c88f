//! The curved surface service consumed by the kinematics step.
//!
//! A surface is a tile grid wrapped around a disc. It is locally flat: at any
//! position it exposes a scale (tile size relative to the outer surface), an
//! outward normal ("up") and a tangent ("right"). Normal and tangent depend
//! only on the direction from the disc centre, never on the distance to it.

use glam::Vec2;

/// Direction of an axis-aligned cast, relative to the local frame at the
/// cast origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileDirection {
    /// Along `+normal`.
    Up,
    /// Along `-normal`.
    Down,
    /// Along `-tangent`.
    Left,
    /// Along `+tangent`.
    Right,
}

impl TileDirection {
    /// World-space direction at a point whose frame is `normal`/`tangent`.
    pub fn vector(self, normal: Vec2, tangent: Vec2) -> Vec2 {
        match self {
            Self::Up => normal,
            Self::Down => -normal,
            Self::Left => -tangent,
            Self::Right => tangent,
        }
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Self::Up | Self::Down)
    }
}

/// What a successful cast struck.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileHitInfo {
    pub hit_tile_x: i32,
    pub hit_tile_y: i32,
    /// Distance from the cast origin to the struck tile boundary.
    pub hit_distance: f32,
    /// Outward normal of the struck tile face.
    pub hit_normal: Vec2,
    pub hit_position: Vec2,
}

/// Position-dependent frame plus tile queries of a curved tile grid.
///
/// Queries that fall outside the grid are not errors: casts report no hit
/// (the path is unobstructed) and coordinate lookups report `None`.
pub trait CurvedSurface {
    /// Local size multiplier: 1.0 at the outer surface, smaller toward the
    /// centre.
    fn scale_at(&self, position: Vec2) -> f32;

    /// Unit outward direction ("up") at `position`.
    fn normal_at(&self, position: Vec2) -> Vec2;

    /// Unit "right" direction at `position`, perpendicular to the normal.
    fn tangent_at(&self, position: Vec2) -> Vec2 {
        let normal = self.normal_at(position);
        Vec2::new(normal.y, -normal.x)
    }

    /// Angle of `position` around the centre in degrees, clockwise from +Y.
    fn angle_at(&self, position: Vec2) -> f32;

    /// Cast a segment of width `breadth` (centred on `origin`, perpendicular
    /// to `direction`) up to `max_distance` and report the nearest solid
    /// tile boundary.
    fn raycast(
        &self,
        origin: Vec2,
        breadth: f32,
        direction: TileDirection,
        max_distance: f32,
    ) -> Option<TileHitInfo>;

    fn tile_coordinates(&self, position: Vec2) -> Option<(i32, i32)>;

    /// Tile id at the given coordinates; 0 is empty.
    fn tile(&self, tile_x: i32, tile_y: i32) -> u8;

    fn set_tile(&mut self, tile_x: i32, tile_y: i32, tile: u8);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_vectors_follow_local_frame() {
        let normal = Vec2::new(1.0, 0.0);
        let tangent = Vec2::new(0.0, -1.0);
        assert_eq!(TileDirection::Up.vector(normal, tangent), normal);
        assert_eq!(TileDirection::Down.vector(normal, tangent), -normal);
        assert_eq!(TileDirection::Right.vector(normal, tangent), tangent);
        assert_eq!(TileDirection::Left.vector(normal, tangent), -tangent);
        assert!(TileDirection::Down.is_vertical());
        assert!(!TileDirection::Left.is_vertical());
    }
}
