//! Pool of planets, keyed by tilemap height.
//!
//! Allocating a tilemap is the expensive part of bringing a planet to life,
//! and many bodies share a height bucket, so released planets are kept and
//! handed out again.

use std::collections::HashMap;

use crate::planet::Planet;

#[derive(Debug, Default)]
pub struct UniverseFactory {
    pool: HashMap<u32, Vec<Planet>>,
    created: usize,
}

impl UniverseFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A planet with `height` rings, reused when one is available.
    pub fn get_planet(&mut self, height: u32) -> Planet {
        if let Some(planet) = self.pool.get_mut(&height).and_then(Vec::pop) {
            log::debug!("reusing pooled planet of height {height}");
            return planet;
        }
        self.created += 1;
        log::debug!("allocating planet of height {height} ({} total)", self.created);
        Planet::new(height)
    }

    pub fn return_planet(&mut self, planet: Planet) {
        self.pool.entry(planet.height()).or_default().push(planet);
    }

    /// Planets waiting for reuse at `height`.
    pub fn pooled(&self, height: u32) -> usize {
        self.pool.get(&height).map_or(0, Vec::len)
    }

    /// Planets ever allocated by this factory.
    pub fn created(&self) -> usize {
        self.created
    }
}
