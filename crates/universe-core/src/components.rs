//! ECS components of tile-bound entities.
//!
//! Spatial components are expressed in the local frame of the planet the
//! entity stands on ([`OnSurface`]). Components are plain data.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use crate::kinematics::{KinematicBody, TileHitFlags};

/// Feet position in the planet frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct Position(pub Vec2);

/// `x` along the local tangent, `y` along the local normal.
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct Velocity(pub Vec2);

/// Unit "up" of the entity.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Up(pub Vec2);

/// Counter-clockwise radians in the planet frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct Rotation(pub f32);

/// Uniform scale taken from the surface under the entity.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Scale(pub f32);

/// Contact flags of the last kinematics step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Contacts(pub TileHitFlags);

/// Extents, gravity and orientation mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body(pub KinematicBody);

/// Thing index of the planet or moon the entity lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OnSurface(pub u16);

/// Marker: the player-controlled entity.
#[derive(Debug, Clone, Copy)]
pub struct Avatar;

/// Latest player input. `jump` is an edge: consumed by the next step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AvatarInput {
    /// In `[-1, 1]`, positive is "right".
    pub horizontal: f32,
    pub jump: bool,
}

/// Computed 4x4 universe-space model matrix, updated by the transform
/// system.
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct ModelMatrix(pub [f32; 16]);

/// Marker: entity is simulated and rendered.
#[derive(Debug, Clone, Copy)]
pub struct Active;

impl Default for Up {
    fn default() -> Self {
        Self(Vec2::Y)
    }
}

impl Default for Scale {
    fn default() -> Self {
        Self(1.0)
    }
}

impl Default for ModelMatrix {
    fn default() -> Self {
        Self(glam::Mat4::IDENTITY.to_cols_array())
    }
}
