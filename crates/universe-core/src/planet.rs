//! Per-planet sub-simulation: a tilemap plus its placement in the universe.
//!
//! Tile-bound entities live in the planet's local frame (tile units, centred
//! on the planet, unrotated). The planet maps that frame onto the body's
//! orbital position, spin and radius every tick.

use glam::{Mat4, Quat, Vec2, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::surface::CurvedSurface;
use crate::thing::{Thing, ThingPosition};
use crate::tilemap::TilemapCircle;

/// Tile id found below the main layer of every planet.
pub const BEDROCK_TILE: u8 = 4;

/// Rings of main tile above the bedrock.
const MAIN_LAYER_DEPTH: i32 = 3;

/// Ground cover of a planet, picked from the body's seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum PlanetType {
    #[default]
    Grass = 0,
    Sand = 1,
    Snow = 2,
    Stone = 3,
}

impl PlanetType {
    pub const ALL: [Self; 4] = [Self::Grass, Self::Sand, Self::Snow, Self::Stone];

    pub fn from_seed(seed: u32) -> Self {
        Self::ALL[(seed % Self::ALL.len() as u32) as usize]
    }

    /// Tile id of the surface layer.
    pub fn main_tile(self) -> u8 {
        self as u8 + 1
    }
}

/// Ring count of the tilemap used for a body of `radius` universe units.
///
/// Rounded to a multiple of 8 so bodies of similar size share pooled
/// tilemaps.
pub fn planet_height_with_radius(radius: u16) -> u32 {
    let rings = radius as f32 * TilemapCircle::CORE_RATIO.ln() / 8.0;
    ((rings.round() as u32) * 8).clamp(8, 256)
}

#[derive(Debug, Clone)]
pub struct Planet {
    thing_index: u16,
    planet_type: PlanetType,
    tilemap: TilemapCircle,
    /// Universe units per tile.
    world_scale: f32,
    world_position: Vec2,
    world_rotation: f32,
}

impl Planet {
    /// Blank planet of the given ring count, not yet bound to a thing.
    pub fn new(height: u32) -> Self {
        Self {
            thing_index: 0,
            planet_type: PlanetType::default(),
            tilemap: TilemapCircle::new(height),
            world_scale: 1.0,
            world_position: Vec2::ZERO,
            world_rotation: 0.0,
        }
    }

    /// Bind to `thing` and regenerate the terrain from its seed.
    pub fn init(&mut self, thing_index: u16, thing: &Thing) {
        self.thing_index = thing_index;
        self.planet_type = PlanetType::from_seed(thing.seed);
        self.world_scale = thing.radius as f32 / self.tilemap.surface_radius();
        self.fill_terrain(thing.seed);
    }

    fn fill_terrain(&mut self, seed: u32) {
        let mut rng = StdRng::seed_from_u64(seed as u64);
        let height = self.tilemap.height() as i32;
        let main = self.planet_type.main_tile();
        let lowest = (height - 5).max(1);
        let mut ground = (height - 3).max(lowest);

        self.tilemap.fill(0);
        for x in 0..self.tilemap.width() as i32 {
            if rng.gen_bool(0.3) {
                ground = (ground + rng.gen_range(-1..=1)).clamp(lowest, height - 1);
            }
            for y in 0..ground {
                let tile = if y >= ground - MAIN_LAYER_DEPTH { main } else { BEDROCK_TILE };
                self.tilemap.set_tile(x, y, tile);
            }
        }
        self.tilemap.clear_dirty();
    }

    /// Follow the body's orbital position and spin.
    pub fn update(&mut self, position: &ThingPosition) {
        self.world_position = Vec2::new(position.x, position.y);
        self.world_rotation = position.rotation;
    }

    pub fn thing_index(&self) -> u16 {
        self.thing_index
    }

    pub fn planet_type(&self) -> PlanetType {
        self.planet_type
    }

    pub fn height(&self) -> u32 {
        self.tilemap.height()
    }

    pub fn tilemap(&self) -> &TilemapCircle {
        &self.tilemap
    }

    pub fn tilemap_mut(&mut self) -> &mut TilemapCircle {
        &mut self.tilemap
    }

    pub fn world_position(&self) -> Vec2 {
        self.world_position
    }

    pub fn world_rotation(&self) -> f32 {
        self.world_rotation
    }

    pub fn world_scale(&self) -> f32 {
        self.world_scale
    }

    /// Local position of the floor of tile `(x, y)`.
    pub fn position_from_tile(&self, tile_x: i32, tile_y: u32) -> Vec2 {
        self.tilemap.position_from_tile(tile_x, tile_y)
    }

    pub fn local_to_world(&self, local: Vec2) -> Vec2 {
        self.world_position + Vec2::from_angle(self.world_rotation).rotate(local * self.world_scale)
    }

    pub fn world_to_local(&self, world: Vec2) -> Vec2 {
        Vec2::from_angle(-self.world_rotation).rotate(world - self.world_position) / self.world_scale
    }

    /// Tile under a universe-space point, if it lies on the grid.
    pub fn tile_at_world(&self, world: Vec2) -> Option<(i32, i32)> {
        self.tilemap.tile_coordinates(self.world_to_local(world))
    }

    /// Local-to-universe transform for presentation.
    pub fn world_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::splat(self.world_scale),
            Quat::from_rotation_z(self.world_rotation),
            self.world_position.extend(0.0),
        )
    }
}
