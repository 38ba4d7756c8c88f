//! Procedural construction of the thing tree.
//!
//! [`generate`] seeds a random stream, writes the root galaxy and hands a
//! [`UniverseGenerator`] to a [`GenerationPolicy`]. The policy places bodies
//! with [`push_thing`](UniverseGenerator::push_thing) (descend into the new
//! body) and [`pop_thing`](UniverseGenerator::pop_thing) (ascend back to its
//! parent). Because children are written right after their parent and a
//! subtree is finished before its next sibling starts, the store ends up in
//! preorder with every sibling range contiguous, which is what
//! `update_brothers` relies on to link the sibling chains afterwards.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::GeneratorConfig;
use crate::error::{Result, UniverseError};
use crate::thing::{period_inv, Thing, ThingStore, ThingType};

/// Parameters of one body to place under the generator's cursor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThingSpec {
    pub kind: ThingType,
    /// Hundredths of a degree.
    pub angle: u16,
    pub distance: u16,
    pub rotation_period: i16,
    pub orbital_period: i16,
    pub radius: u16,
    pub safe_radius: u16,
    pub seed: u32,
}

/// Strategy that fills the galaxy below the root.
///
/// Implementations must leave the cursor where they found it: every
/// `push_thing` is matched by exactly one `pop_thing`.
pub trait GenerationPolicy {
    fn populate(&mut self, generator: &mut UniverseGenerator) -> Result<()>;
}

/// Cursor-based writer over a [`ThingStore`].
pub struct UniverseGenerator {
    store: ThingStore,
    rng: StdRng,
    current: u16,
}

impl UniverseGenerator {
    fn new(seed: u64, capacity: usize) -> Result<Self> {
        let mut store = ThingStore::with_capacity(capacity)?;
        let mut rng = StdRng::seed_from_u64(seed);
        store.push(Thing {
            kind: ThingType::Galaxy,
            safe_radius: u16::MAX,
            seed: rng.gen_range(0..=u32::MAX),
            ..Default::default()
        })?;
        Ok(Self {
            store,
            rng,
            current: 0,
        })
    }

    /// Random stream shared by every placement of this generation.
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Index of the thing new bodies are placed under.
    pub fn current(&self) -> u16 {
        self.current
    }

    pub fn current_thing(&self) -> &Thing {
        self.store.thing(self.current)
    }

    /// Things written so far, root included.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Write a new child of the current thing and descend into it.
    ///
    /// Fails with [`UniverseError::CapacityExceeded`] without touching the
    /// store when every slot is taken.
    pub fn push_thing(&mut self, spec: ThingSpec) -> Result<u16> {
        let index = self.store.push(Thing {
            kind: spec.kind,
            parent: self.current,
            childs: 0,
            next_brother: 0,
            angle: spec.angle,
            distance: spec.distance,
            rotation_period: spec.rotation_period,
            orbital_period: spec.orbital_period,
            radius: spec.radius,
            safe_radius: spec.safe_radius,
            seed: spec.seed,
            rotation_period_inv: period_inv(spec.rotation_period),
            orbital_period_inv: period_inv(spec.orbital_period),
        })?;
        self.store.thing_mut(self.current).childs += 1;
        self.current = index;
        Ok(index)
    }

    /// Ascend to the parent of the current thing.
    pub fn pop_thing(&mut self) {
        self.current = self.store.thing(self.current).parent;
    }

    /// Push `spec`, let `fill` place its children, then pop.
    pub fn with_child<F>(&mut self, spec: ThingSpec, fill: F) -> Result<u16>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        let index = self.push_thing(spec)?;
        let filled = fill(self);
        self.pop_thing();
        filled.map(|()| index)
    }

    /// Push and immediately pop a body that has no children.
    pub fn add_leaf(&mut self, spec: ThingSpec) -> Result<u16> {
        let index = self.push_thing(spec)?;
        self.pop_thing();
        Ok(index)
    }

    /// Fresh per-body seed.
    pub fn next_seed(&mut self) -> u32 {
        self.rng.gen_range(0..=u32::MAX)
    }
}

/// Build a universe of at most `capacity` things from `seed`.
///
/// The same seed, capacity and policy always produce the same store.
pub fn generate(
    seed: u64,
    capacity: usize,
    policy: &mut dyn GenerationPolicy,
) -> Result<ThingStore> {
    let mut generator = UniverseGenerator::new(seed, capacity)?;

    if let Err(err) = policy.populate(&mut generator) {
        log::warn!("universe generation from seed {seed} failed: {err}");
        return Err(err);
    }

    if generator.current != 0 {
        return Err(UniverseError::UnbalancedCursor {
            cursor: generator.current,
        });
    }

    let mut store = generator.store;
    update_brothers(&mut store, 0);

    log::info!(
        "generated {} things from seed {seed} (capacity {capacity})",
        store.len()
    );
    Ok(store)
}

/// Link each child to its next sibling. Returns the index just past the
/// subtree rooted at `index`.
fn update_brothers(store: &mut ThingStore, index: usize) -> usize {
    let childs = store.thing(index as u16).childs;
    let mut next = index + 1;

    for i in 0..childs {
        let child = next;
        next = update_brothers(store, child);
        store.thing_mut(child as u16).next_brother = if i + 1 < childs { next as u16 } else { 0 };
    }

    next
}

/// Galaxy of solar systems laid out on concentric rings; each system holds
/// one or two suns, planets on non-overlapping orbits and their moons.
pub struct DefaultPolicy {
    config: GeneratorConfig,
}

impl DefaultPolicy {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    fn add_galaxy(&self, generator: &mut UniverseGenerator) -> Result<()> {
        let cfg = &self.config;
        let target = generator
            .rng()
            .gen_range(cfg.min_solar_systems..=cfg.max_solar_systems.max(cfg.min_solar_systems));

        let max_radius = cfg.max_solar_system_radius.max(cfg.min_solar_system_radius) as u32;
        let ring_width = 2 * max_radius + cfg.solar_system_spacing as u32;
        let limit = generator.current_thing().safe_radius as u32;

        let mut placed = 0u16;
        let mut ring_distance = max_radius + cfg.solar_system_spacing as u32;

        while placed < target && ring_distance + max_radius <= limit {
            // Slots are spaced so neighbouring systems on a ring never overlap.
            let circumference = std::f32::consts::TAU * ring_distance as f32;
            let slots = ((circumference / (ring_width as f32 * 1.25)) as u32).max(1);
            let ring_offset = generator.rng().gen_range(0..36000u32);

            for slot in 0..slots {
                if placed >= target {
                    break;
                }
                let safe_radius = generator.rng().gen_range(
                    cfg.min_solar_system_radius..=cfg.max_solar_system_radius.max(cfg.min_solar_system_radius),
                );
                let seed = generator.next_seed();
                let spec = ThingSpec {
                    kind: ThingType::SolarSystem,
                    angle: ((ring_offset + slot * 36000 / slots) % 36000) as u16,
                    distance: ring_distance as u16,
                    rotation_period: 0,
                    orbital_period: 0,
                    radius: 0,
                    safe_radius,
                    seed,
                };
                generator.with_child(spec, |g| self.add_solar_system(g))?;
                placed += 1;
            }

            ring_distance += ring_width;
        }

        Ok(())
    }

    fn add_solar_system(&self, generator: &mut UniverseGenerator) -> Result<()> {
        let cfg = &self.config;
        let safe_radius = generator.current_thing().safe_radius as u32;

        let binary = generator.rng().gen_bool(cfg.binary_sun_chance.clamp(0.0, 1.0) as f64);
        let sun_radius = generator.rng().gen_range(cfg.min_sun_radius..=cfg.max_sun_radius.max(cfg.min_sun_radius));

        let sun_extent = if binary {
            let distance = sun_radius as u32 + cfg.planet_spacing as u32 / 2;
            let angle = generator.rng().gen_range(0..18000u16);
            let orbital_period = self.random_period(generator, cfg.min_orbital_period, cfg.max_orbital_period);
            for half in [0u16, 18000] {
                let spec = ThingSpec {
                    kind: ThingType::Sun,
                    angle: angle + half,
                    distance: distance as u16,
                    rotation_period: self.random_period(
                        generator,
                        cfg.min_rotation_period,
                        cfg.max_rotation_period,
                    ),
                    orbital_period,
                    radius: sun_radius,
                    safe_radius: sun_radius,
                    seed: generator.next_seed(),
                };
                generator.add_leaf(spec)?;
            }
            distance + sun_radius as u32
        } else {
            let spec = ThingSpec {
                kind: ThingType::Sun,
                angle: 0,
                distance: 0,
                rotation_period: self.random_period(generator, cfg.min_rotation_period, cfg.max_rotation_period),
                orbital_period: 0,
                radius: sun_radius,
                safe_radius: sun_radius,
                seed: generator.next_seed(),
            };
            generator.add_leaf(spec)?;
            sun_radius as u32
        };

        let planets = generator.rng().gen_range(cfg.min_planets..=cfg.max_planets.max(cfg.min_planets));
        let mut orbit = sun_extent + cfg.planet_spacing as u32;

        for _ in 0..planets {
            let radius = generator
                .rng()
                .gen_range(cfg.min_planet_radius..=cfg.max_planet_radius.max(cfg.min_planet_radius));
            let moons = self.plan_moons(generator, radius);
            let planet_safe = moons
                .last()
                .map(|moon| moon.distance as u32 + moon.safe_radius as u32)
                .unwrap_or(radius as u32)
                + cfg.planet_spacing as u32 / 2;

            let distance = orbit + planet_safe;
            if distance + planet_safe > safe_radius {
                break;
            }
            orbit = distance + planet_safe + cfg.planet_spacing as u32;

            let spec = ThingSpec {
                kind: ThingType::Planet,
                angle: generator.rng().gen_range(0..36000u16),
                distance: distance as u16,
                rotation_period: self.random_period(generator, cfg.min_rotation_period, cfg.max_rotation_period),
                orbital_period: self.random_period(generator, cfg.min_orbital_period, cfg.max_orbital_period),
                radius,
                safe_radius: planet_safe as u16,
                seed: generator.next_seed(),
            };
            generator.with_child(spec, |g| {
                for moon in &moons {
                    g.add_leaf(*moon)?;
                }
                Ok(())
            })?;
        }

        Ok(())
    }

    /// Moons are planned before their planet is written so the planet's safe
    /// radius can cover the outermost moon orbit. Planning stops at the first
    /// moon whose orbit would not fit `u16`.
    fn plan_moons(&self, generator: &mut UniverseGenerator, planet_radius: u16) -> Vec<ThingSpec> {
        let cfg = &self.config;
        let count = generator.rng().gen_range(cfg.min_moons..=cfg.max_moons.max(cfg.min_moons));
        let spacing = (cfg.planet_spacing as u32 / 4).max(1);
        let mut orbit = planet_radius as u32 + spacing;
        let mut moons = Vec::with_capacity(count as usize);

        for _ in 0..count {
            let radius = generator
                .rng()
                .gen_range(cfg.min_moon_radius..=cfg.max_moon_radius.max(cfg.min_moon_radius));
            let distance = orbit + radius as u32;
            // Orbit and clearance must both fit u16.
            if distance + radius as u32 > u16::MAX as u32 {
                break;
            }
            orbit = distance + radius as u32 + spacing;
            moons.push(ThingSpec {
                kind: ThingType::Moon,
                angle: generator.rng().gen_range(0..36000u16),
                distance: distance as u16,
                rotation_period: self.random_period(generator, cfg.min_rotation_period, cfg.max_rotation_period),
                orbital_period: self.random_period(
                    generator,
                    (cfg.min_orbital_period / 4).max(1),
                    (cfg.max_orbital_period / 4).max(1),
                ),
                radius,
                safe_radius: radius,
                seed: generator.next_seed(),
            });
        }

        moons
    }

    fn random_period(&self, generator: &mut UniverseGenerator, min: i16, max: i16) -> i16 {
        let rng = generator.rng();
        let magnitude = rng.gen_range(min..=max.max(min));
        if rng.gen_bool(0.5) { magnitude } else { -magnitude }
    }
}

impl GenerationPolicy for DefaultPolicy {
    fn populate(&mut self, generator: &mut UniverseGenerator) -> Result<()> {
        self.add_galaxy(generator)
    }
}
