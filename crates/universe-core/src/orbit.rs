//! Per-frame orbital solve.
//!
//! Positions are derived from scratch every tick from the polar parameters of
//! each [`Thing`] and the elapsed time. Only the fractional part of each
//! phase is used, so the result is periodic and does not drift no matter how
//! long the clock runs.

use std::f32::consts::{FRAC_PI_2, TAU};

use crate::thing::{Thing, ThingPosition, ThingStore};

/// Angle-to-Cartesian step of the solver.
pub trait SinCos {
    /// `(sin(angle), cos(angle))` for any finite angle in radians.
    fn sin_cos(&self, angle: f32) -> (f32, f32);
}

/// `f32::sin_cos`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactTrig;

impl SinCos for ExactTrig {
    #[inline]
    fn sin_cos(&self, angle: f32) -> (f32, f32) {
        angle.sin_cos()
    }
}

const SIN_TABLE_LEN: usize = 1024;

/// Precomputed sine table with linear interpolation between entries.
#[derive(Debug, Clone)]
pub struct SinTable {
    table: Box<[f32]>,
}

impl Default for SinTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SinTable {
    pub fn new() -> Self {
        // One extra entry so interpolation never wraps.
        let table = (0..=SIN_TABLE_LEN)
            .map(|i| (i as f32 * TAU / SIN_TABLE_LEN as f32).sin())
            .collect();
        Self { table }
    }

    #[inline]
    fn sin(&self, angle: f32) -> f32 {
        let turns = (angle / TAU).rem_euclid(1.0);
        let scaled = turns * SIN_TABLE_LEN as f32;
        let index = (scaled as usize).min(SIN_TABLE_LEN - 1);
        let frac = scaled - index as f32;
        let a = self.table[index];
        let b = self.table[index + 1];
        a + (b - a) * frac
    }
}

impl SinCos for SinTable {
    #[inline]
    fn sin_cos(&self, angle: f32) -> (f32, f32) {
        (self.sin(angle), self.sin(angle + FRAC_PI_2))
    }
}

/// Trig strategy used by [`Universe`](crate::universe::Universe).
#[cfg(feature = "sin-table")]
pub type DefaultTrig = SinTable;

/// Trig strategy used by [`Universe`](crate::universe::Universe).
#[cfg(not(feature = "sin-table"))]
pub type DefaultTrig = ExactTrig;

/// Fractional part of `time * period_inv`, truncated toward zero like the
/// phase of a signed period.
#[inline]
pub fn phase(time: f64, period_inv: f32) -> f32 {
    let cycles = time * period_inv as f64;
    (cycles - cycles.trunc()) as f32
}

/// Position of `thing` relative to its parent at `time`.
#[inline]
pub fn local_position(thing: &Thing, time: f64, trig: &impl SinCos) -> (f32, f32) {
    let angle = thing.angle_radians() + TAU * phase(time, thing.orbital_period_inv);
    let (sin, cos) = trig.sin_cos(angle);
    let distance = thing.distance as f32;
    (cos * distance, sin * distance)
}

/// Recompute every position of `store` at `time`.
///
/// Walks indices in increasing order; parents precede children in the store
/// so each parent position is final before it is read.
///
/// # Panics
/// If `positions` is shorter than the store.
pub fn update_positions(
    store: &ThingStore,
    positions: &mut [ThingPosition],
    time: f64,
    trig: &impl SinCos,
) {
    let things = store.as_slice();
    assert!(positions.len() >= things.len(), "position buffer too small");

    if let Some(root) = things.first() {
        positions[0] = ThingPosition {
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            radius: root.radius as f32,
        };
    }

    for (index, thing) in things.iter().enumerate().skip(1) {
        let parent = positions[thing.parent as usize];
        let (dx, dy) = local_position(thing, time, trig);

        positions[index] = ThingPosition {
            x: parent.x + dx,
            y: parent.y + dy,
            rotation: phase(time, thing.rotation_period_inv) * TAU,
            radius: thing.radius as f32,
        };
    }
}
