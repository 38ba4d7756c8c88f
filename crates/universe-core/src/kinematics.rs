//! Movement of tile-bound bodies on a curved surface.
//!
//! One [`step`] integrates gravity and velocity, then resolves collisions one
//! axis at a time: first along the local normal, then along the local
//! tangent. Displacements are scaled by the surface scale at the body, so a
//! body crossing one tile per second does so at any depth.
//!
//! Positions are the body's feet. Casts start from the body centre, half a
//! height above the feet along the normal.

use std::ops::{BitOr, BitOrAssign};

use glam::Vec2;

use crate::surface::{CurvedSurface, TileDirection};

/// Directions in which the last step struck solid tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TileHitFlags(u8);

impl TileHitFlags {
    pub const NONE: Self = Self(0);
    pub const UP: Self = Self(1 << 0);
    pub const DOWN: Self = Self(1 << 1);
    pub const LEFT: Self = Self(1 << 2);
    pub const RIGHT: Self = Self(1 << 3);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0b1111)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    fn for_direction(direction: TileDirection) -> Self {
        match direction {
            TileDirection::Up => Self::UP,
            TileDirection::Down => Self::DOWN,
            TileDirection::Left => Self::LEFT,
            TileDirection::Right => Self::RIGHT,
        }
    }
}

impl BitOr for TileHitFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for TileHitFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// How a body's rotation follows the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrientationMode {
    /// Up is the surface normal at the final position (the avatar).
    #[default]
    AlignToNormal,
    /// Rotation is derived from the angle of the position around the
    /// surface centre (generic objects).
    SurfaceAngle,
}

/// Fixed physical parameters of a body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KinematicBody {
    pub half_extents: Vec2,
    pub gravity: f32,
    pub orientation: OrientationMode,
}

impl KinematicBody {
    pub fn new(half_extents: Vec2, gravity: f32) -> Self {
        Self {
            half_extents,
            gravity,
            orientation: OrientationMode::AlignToNormal,
        }
    }

    pub fn with_orientation(mut self, orientation: OrientationMode) -> Self {
        self.orientation = orientation;
        self
    }
}

/// Per-body state carried between steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KinematicState {
    /// Feet, in the surface frame.
    pub position: Vec2,
    /// `x` along the tangent, `y` along the normal, in tiles per second.
    pub velocity: Vec2,
    pub up: Vec2,
    /// Counter-clockwise radians taking +Y onto `up`.
    pub rotation: f32,
    pub scale: f32,
    pub hit_flags: TileHitFlags,
}

impl KinematicState {
    /// At rest at `position`, framed by the surface there.
    pub fn at(surface: &(impl CurvedSurface + ?Sized), position: Vec2) -> Self {
        let up = surface.normal_at(position);
        Self {
            position,
            velocity: Vec2::ZERO,
            up,
            rotation: rotation_of(up),
            scale: surface.scale_at(position),
            hit_flags: TileHitFlags::NONE,
        }
    }

    /// Right-hand direction of the body's current frame.
    pub fn right(&self) -> Vec2 {
        Vec2::new(self.up.y, -self.up.x)
    }
}

fn rotation_of(up: Vec2) -> f32 {
    (-up.x).atan2(up.y)
}

/// Resolve one movement along `direction`. Returns the clamped displacement
/// and whether something was struck. A body already overlapping the struck
/// tile gets a displacement that pushes it back out.
fn resolve_axis(
    surface: &(impl CurvedSurface + ?Sized),
    center: Vec2,
    breadth: f32,
    half_length: f32,
    delta: f32,
    positive: TileDirection,
    negative: TileDirection,
) -> (f32, Option<TileDirection>) {
    let direction = if delta > 0.0 { positive } else { negative };
    match surface.raycast(center, breadth, direction, delta.abs() + half_length) {
        Some(hit) => {
            let clamped = hit.hit_distance - half_length;
            let signed = if delta > 0.0 { clamped } else { -clamped };
            (signed, Some(direction))
        }
        None => (delta, None),
    }
}

/// Advance a body by `dt` seconds.
///
/// `jump` carries the jump speed when a jump was requested this tick; it is
/// applied only if the body lands during the step. Contact flags are rebuilt
/// from scratch every call.
pub fn step(
    surface: &(impl CurvedSurface + ?Sized),
    state: &mut KinematicState,
    body: &KinematicBody,
    jump: Option<f32>,
    dt: f32,
) {
    state.hit_flags = TileHitFlags::NONE;

    let mut scale = surface.scale_at(state.position);
    let mut normal = surface.normal_at(state.position);
    let tangent = surface.tangent_at(state.position);

    state.velocity.y -= body.gravity * dt;
    let mut delta = state.velocity * dt * scale;

    // Vertical.
    if delta.y != 0.0 {
        let half_height = body.half_extents.y * scale;
        let center = state.position + normal * half_height;
        let breadth = body.half_extents.x * 2.0 * scale;
        let (clamped, hit) = resolve_axis(
            surface,
            center,
            breadth,
            half_height,
            delta.y,
            TileDirection::Up,
            TileDirection::Down,
        );
        delta.y = clamped;
        if let Some(direction) = hit {
            state.velocity.y = 0.0;
            state.hit_flags |= TileHitFlags::for_direction(direction);
            if direction == TileDirection::Down
                && let Some(jump_speed) = jump
            {
                state.velocity.y = jump_speed;
            }
        }
        if delta.y != 0.0 {
            state.position += normal * delta.y;
            scale = surface.scale_at(state.position);
        }
    }

    // Horizontal. Extents follow the post-vertical scale; the tentative
    // displacement keeps the scale it was computed with.
    if delta.x != 0.0 {
        let half_width = body.half_extents.x * scale;
        let center = state.position + normal * body.half_extents.y * scale;
        let breadth = body.half_extents.y * 2.0 * scale;
        let (clamped, hit) = resolve_axis(
            surface,
            center,
            breadth,
            half_width,
            delta.x,
            TileDirection::Right,
            TileDirection::Left,
        );
        delta.x = clamped;
        if let Some(direction) = hit {
            state.velocity.x = 0.0;
            state.hit_flags |= TileHitFlags::for_direction(direction);
        }
        if delta.x != 0.0 {
            state.position += tangent * delta.x;
            normal = surface.normal_at(state.position);
        }
    }

    state.scale = scale;
    state.up = normal;
    state.rotation = match body.orientation {
        OrientationMode::AlignToNormal => rotation_of(normal),
        OrientationMode::SurfaceAngle => -surface.angle_at(state.position).to_radians(),
    };
}

/// Standing on something and not moving away from it.
pub fn is_grounded(state: &KinematicState) -> bool {
    state.hit_flags.contains(TileHitFlags::DOWN) && state.velocity.y <= 0.0
}

/// Whether the body would fit at `target` without overlapping a solid tile.
///
/// Samples a 3×3 pattern spanning the body, oriented by the body's current
/// frame and sized by the scale at `target`. Samples off the grid count as
/// free.
pub fn can_move_to(
    surface: &(impl CurvedSurface + ?Sized),
    state: &KinematicState,
    body: &KinematicBody,
    target: Vec2,
    placement_epsilon: f32,
) -> bool {
    let scale = surface.scale_at(target);
    let up = state.up;
    let right = state.right();
    let base = target + up * placement_epsilon;
    let width = body.half_extents.x * 2.0;
    let height = body.half_extents.y * 2.0;

    for x in -1..=1 {
        for y in 0..=2 {
            let sample = base
                + right * (width * 0.9 * x as f32 * 0.5 * scale)
                + up * (height * 0.9 / 2.0 * y as f32 * scale);
            if let Some((tile_x, tile_y)) = surface.tile_coordinates(sample)
                && surface.tile(tile_x, tile_y) != 0
            {
                return false;
            }
        }
    }
    true
}

/// Teleport to `target` if the body fits there. Velocity is cleared on a
/// successful move.
pub fn move_to(
    surface: &(impl CurvedSurface + ?Sized),
    state: &mut KinematicState,
    body: &KinematicBody,
    target: Vec2,
    placement_epsilon: f32,
) -> bool {
    if !can_move_to(surface, state, body, target, placement_epsilon) {
        return false;
    }
    *state = KinematicState::at(surface, target);
    true
}

/// Drop the body straight down onto the first solid tile within
/// `max_distance`. Leaves it in place if there is none.
pub fn snap_to_floor(
    surface: &(impl CurvedSurface + ?Sized),
    state: &mut KinematicState,
    body: &KinematicBody,
    max_distance: f32,
) -> bool {
    let normal = surface.normal_at(state.position);
    let scale = surface.scale_at(state.position);
    let half_height = body.half_extents.y * scale;
    let center = state.position + normal * half_height;
    let breadth = body.half_extents.x * 2.0 * scale;

    let Some(hit) = surface.raycast(center, breadth, TileDirection::Down, max_distance) else {
        return false;
    };
    let feet = center - normal * hit.hit_distance;
    *state = KinematicState::at(surface, feet);
    state.hit_flags = TileHitFlags::DOWN;
    true
}
