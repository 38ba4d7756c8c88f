//! Per-frame snapshot handed to the presentation layer.
//!
//! Filled once at the end of every update, after orbits and entities are
//! final, so a reader between updates always sees one complete frame.

use hecs::World;

use crate::components::{Active, ModelMatrix};
use crate::thing::{ThingPosition, ThingStore};

/// Number of texture layers body sprites are picked from.
pub const TEXTURE_LAYERS: u32 = 16;

/// Contiguous buffers of render data for bodies and tile-bound entities.
#[derive(Debug, Default)]
pub struct RenderState {
    /// One entry per render-eligible body, in render-list order.
    bodies: Vec<ThingPosition>,
    /// Texture layer of each body (`seed % TEXTURE_LAYERS`).
    tex_indices: Vec<u32>,
    /// `ThingType` discriminant of each body.
    kinds: Vec<u32>,
    /// Column-major model matrix of each active entity.
    pub matrices: Vec<[f32; 16]>,
}

impl RenderState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the previous frame with the current one.
    pub fn collect(&mut self, store: &ThingStore, positions: &[ThingPosition], render_list: &[u16], world: &World) {
        self.bodies.clear();
        self.tex_indices.clear();
        self.kinds.clear();
        self.bodies.reserve(render_list.len());

        for &index in render_list {
            let thing = store.thing(index);
            self.bodies.push(positions[index as usize]);
            self.tex_indices.push(thing.seed % TEXTURE_LAYERS);
            self.kinds.push(thing.kind as u32);
        }

        self.matrices.clear();
        for (matrix, _active) in world.query::<(&ModelMatrix, &Active)>().iter() {
            self.matrices.push(matrix.0);
        }
    }

    /// Number of bodies in the snapshot.
    pub fn body_count(&self) -> u32 {
        self.bodies.len() as u32
    }

    /// Number of entities in the snapshot.
    pub fn entity_count(&self) -> u32 {
        self.matrices.len() as u32
    }

    pub fn bodies(&self) -> &[ThingPosition] {
        &self.bodies
    }

    /// Bodies as `x, y, rotation, radius` quadruples.
    pub fn bounds(&self) -> &[f32] {
        bytemuck::cast_slice(&self.bodies)
    }

    /// Raw pointer to the bounds data, for WASM memory export.
    /// Returns null if empty.
    pub fn bounds_ptr(&self) -> *const f32 {
        if self.bodies.is_empty() {
            std::ptr::null()
        } else {
            self.bounds().as_ptr()
        }
    }

    pub fn tex_indices(&self) -> &[u32] {
        &self.tex_indices
    }

    pub fn tex_indices_ptr(&self) -> *const u32 {
        if self.tex_indices.is_empty() {
            std::ptr::null()
        } else {
            self.tex_indices.as_ptr()
        }
    }

    pub fn kinds(&self) -> &[u32] {
        &self.kinds
    }

    /// Raw pointer to the matrix data. Returns null if empty.
    pub fn matrices_ptr(&self) -> *const f32 {
        if self.matrices.is_empty() {
            std::ptr::null()
        } else {
            self.matrices.as_ptr() as *const f32
        }
    }

    /// Total number of f32 values in the matrix buffer (count * 16).
    pub fn matrices_f32_len(&self) -> u32 {
        (self.matrices.len() * 16) as u32
    }
}
