//! Tile grid wrapped around a disc.
//!
//! Rings are stacked outward from an empty core. Every ring holds `width`
//! tiles and ring boundaries grow geometrically, so tiles stay square at any
//! depth: a tile near the core is just a smaller copy of a surface tile. The
//! grid is expressed in its own frame, centred on the origin and unrotated;
//! the owning planet places it in the universe.

use std::f32::consts::TAU;

use glam::Vec2;

use crate::surface::{CurvedSurface, TileDirection, TileHitInfo};

/// Lateral inset of the outer cast lines, so a body flush against a wall
/// does not snag on it when moving vertically.
const CAST_INSET: f32 = 0.9;

/// Compact bitset, one bit per tile.
#[derive(Debug, Clone, Default)]
pub struct BitSet {
    bits: Vec<u64>,
    count: usize,
}

impl BitSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            bits: vec![0u64; capacity.div_ceil(64)],
            count: 0,
        }
    }

    /// Idempotent: only counts a bit the first time it is set.
    pub fn set(&mut self, index: usize) {
        let words_needed = (index + 1).div_ceil(64);
        if words_needed > self.bits.len() {
            self.bits.resize(words_needed, 0);
        }
        let mask = 1u64 << (index % 64);
        let word = &mut self.bits[index / 64];
        if *word & mask == 0 {
            *word |= mask;
            self.count += 1;
        }
    }

    pub fn get(&self, index: usize) -> bool {
        self.bits
            .get(index / 64)
            .is_some_and(|word| word & (1u64 << (index % 64)) != 0)
    }

    pub fn clear(&mut self) {
        self.bits.fill(0);
        self.count = 0;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Indices of set bits in increasing order.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits.iter().enumerate().flat_map(|(w, &word)| {
            (0..64usize).filter(move |b| word & (1u64 << b) != 0).map(move |b| w * 64 + b)
        })
    }
}

/// Curved tile grid of `height` rings by `width` columns.
#[derive(Debug, Clone)]
pub struct TilemapCircle {
    width: u32,
    height: u32,
    tiles: Vec<u8>,
    /// `height + 1` ring boundaries, innermost first. The last one is the
    /// outer surface.
    ring_radii: Vec<f32>,
    ln_growth: f32,
    dirty: BitSet,
}

impl TilemapCircle {
    /// Ratio between the outer surface radius and the core radius.
    pub const CORE_RATIO: f32 = 4.0;

    /// Empty grid with `height` rings. The width is derived so that tiles are
    /// square and the outer ring is `CORE_RATIO` times the core radius.
    pub fn new(height: u32) -> Self {
        let height = height.max(1);
        let growth = Self::CORE_RATIO.powf(1.0 / height as f32);
        let width = ((TAU / (growth - 1.0)).round() as u32).max(4);
        Self::with_dimensions(width, height)
    }

    pub fn with_dimensions(width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let growth = 1.0 + TAU / width as f32;
        let outer = width as f32 / TAU;
        let ring_radii = (0..=height)
            .map(|k| outer / growth.powi((height - k) as i32))
            .collect();
        let tile_count = (width * height) as usize;
        Self {
            width,
            height,
            tiles: vec![0; tile_count],
            ring_radii,
            ln_growth: growth.ln(),
            dirty: BitSet::new(tile_count),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Radius of the outer surface, where the scale is 1.
    pub fn surface_radius(&self) -> f32 {
        self.ring_radii[self.height as usize]
    }

    /// Inner boundary of ring `y`; `ring_radius(height)` is the surface.
    pub fn ring_radius(&self, y: u32) -> f32 {
        self.ring_radii[y.min(self.height) as usize]
    }

    /// Angular size of one column in radians.
    pub fn column_angle(&self) -> f32 {
        TAU / self.width as f32
    }

    /// Point on the floor of tile `(x, y)`, centred in its column.
    pub fn position_from_tile(&self, tile_x: i32, tile_y: u32) -> Vec2 {
        let angle = (tile_x as f32 + 0.5) * self.column_angle();
        point_at(angle, self.ring_radius(tile_y))
    }

    /// Set every tile to `tile`.
    pub fn fill(&mut self, tile: u8) {
        self.tiles.fill(tile);
        self.dirty.clear();
    }

    /// Tiles changed through [`set_tile`](CurvedSurface::set_tile) since the
    /// last [`clear_dirty`](Self::clear_dirty).
    pub fn dirty_tiles(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        let width = self.width as usize;
        self.dirty
            .iter_ones()
            .map(move |i| ((i % width) as i32, (i / width) as i32))
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty.count()
    }

    pub fn clear_dirty(&mut self) {
        self.dirty.clear();
    }

    fn index(&self, tile_x: i32, tile_y: i32) -> Option<usize> {
        if tile_y < 0 || tile_y >= self.height as i32 {
            return None;
        }
        let x = tile_x.rem_euclid(self.width as i32);
        Some(tile_y as usize * self.width as usize + x as usize)
    }

    fn ring_of(&self, radius: f32) -> Option<i32> {
        let inner = self.ring_radii[0];
        if radius < inner || radius >= self.surface_radius() {
            return None;
        }
        let last = self.height as i32 - 1;
        let mut y = (((radius / inner).ln() / self.ln_growth).floor() as i32).clamp(0, last);
        if radius < self.ring_radii[y as usize] && y > 0 {
            y -= 1;
        } else if radius >= self.ring_radii[y as usize + 1] && y < last {
            y += 1;
        }
        Some(y)
    }

    fn column_of(&self, angle: f32) -> i32 {
        ((angle / self.column_angle()).floor() as i32).rem_euclid(self.width as i32)
    }

    fn solid(&self, tile_x: i32, tile_y: i32) -> bool {
        self.tile(tile_x, tile_y) != 0
    }

    /// Single radial or circumferential line cast from `origin`.
    fn cast_line(&self, origin: Vec2, direction: TileDirection, max_distance: f32) -> Option<TileHitInfo> {
        let radius = origin.length();
        let normal = self.normal_at(origin);
        let angle = clockwise_angle(origin);

        match direction {
            TileDirection::Down => {
                let column = self.column_of(angle);
                let (mut ring, mut boundary) = match self.ring_of(radius) {
                    Some(y) => (y - 1, self.ring_radii[y as usize]),
                    None if radius >= self.surface_radius() => (self.height as i32 - 1, self.surface_radius()),
                    None => return None,
                };
                while ring >= 0 {
                    let distance = radius - boundary;
                    if distance > max_distance {
                        return None;
                    }
                    if self.solid(column, ring) {
                        return Some(TileHitInfo {
                            hit_tile_x: column,
                            hit_tile_y: ring,
                            hit_distance: distance,
                            hit_normal: normal,
                            hit_position: origin - normal * distance,
                        });
                    }
                    boundary = self.ring_radii[ring as usize];
                    ring -= 1;
                }
                None
            }
            TileDirection::Up => {
                let column = self.column_of(angle);
                let (mut ring, mut boundary) = match self.ring_of(radius) {
                    Some(y) => (y + 1, self.ring_radii[y as usize + 1]),
                    None if radius < self.ring_radii[0] => (0, self.ring_radii[0]),
                    None => return None,
                };
                while ring < self.height as i32 {
                    let distance = boundary - radius;
                    if distance > max_distance {
                        return None;
                    }
                    if self.solid(column, ring) {
                        return Some(TileHitInfo {
                            hit_tile_x: column,
                            hit_tile_y: ring,
                            hit_distance: distance,
                            hit_normal: -normal,
                            hit_position: origin + normal * distance,
                        });
                    }
                    ring += 1;
                    boundary = self.ring_radii[ring as usize];
                }
                None
            }
            TileDirection::Left | TileDirection::Right => {
                let ring = self.ring_of(radius)?;
                let step = self.column_angle();
                let sign = if direction == TileDirection::Right { 1 } else { -1 };
                let mut column = self.column_of(angle);
                // Unwrapped angle of the next column boundary in the cast direction.
                let base = (angle / step).floor();
                let mut boundary = if sign > 0 { (base + 1.0) * step } else { base * step };

                for _ in 0..self.width {
                    let distance = radius * (boundary - angle).abs();
                    if distance > max_distance {
                        return None;
                    }
                    column += sign;
                    if self.solid(column, ring) {
                        let tangent = Vec2::new(normal.y, -normal.x);
                        let facing = if sign > 0 { -tangent } else { tangent };
                        return Some(TileHitInfo {
                            hit_tile_x: column.rem_euclid(self.width as i32),
                            hit_tile_y: ring,
                            hit_distance: distance,
                            hit_normal: facing,
                            hit_position: point_at(boundary, radius),
                        });
                    }
                    boundary += sign as f32 * step;
                }
                None
            }
        }
    }
}

/// Angle around the origin in radians, clockwise from +Y, in `[0, 2π)`.
fn clockwise_angle(position: Vec2) -> f32 {
    position.x.atan2(position.y).rem_euclid(TAU)
}

fn point_at(angle: f32, radius: f32) -> Vec2 {
    let (sin, cos) = angle.sin_cos();
    Vec2::new(sin, cos) * radius
}

impl CurvedSurface for TilemapCircle {
    fn scale_at(&self, position: Vec2) -> f32 {
        position.length().max(self.ring_radii[0]) / self.surface_radius()
    }

    fn normal_at(&self, position: Vec2) -> Vec2 {
        position.try_normalize().unwrap_or(Vec2::Y)
    }

    fn angle_at(&self, position: Vec2) -> f32 {
        clockwise_angle(position).to_degrees()
    }

    fn raycast(
        &self,
        origin: Vec2,
        breadth: f32,
        direction: TileDirection,
        max_distance: f32,
    ) -> Option<TileHitInfo> {
        let normal = self.normal_at(origin);
        let tangent = self.tangent_at(origin);
        let across = if direction.is_vertical() { tangent } else { normal };
        let half = breadth * 0.5 * CAST_INSET;

        [0.0, -half, half]
            .into_iter()
            .filter_map(|offset| self.cast_line(origin + across * offset, direction, max_distance))
            .min_by(|a, b| a.hit_distance.total_cmp(&b.hit_distance))
    }

    fn tile_coordinates(&self, position: Vec2) -> Option<(i32, i32)> {
        let ring = self.ring_of(position.length())?;
        Some((self.column_of(clockwise_angle(position)), ring))
    }

    fn tile(&self, tile_x: i32, tile_y: i32) -> u8 {
        self.index(tile_x, tile_y).map_or(0, |i| self.tiles[i])
    }

    fn set_tile(&mut self, tile_x: i32, tile_y: i32, tile: u8) {
        if let Some(i) = self.index(tile_x, tile_y)
            && self.tiles[i] != tile
        {
            self.tiles[i] = tile;
            self.dirty.set(i);
        }
    }
}
