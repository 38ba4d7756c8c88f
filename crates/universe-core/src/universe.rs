//! The universe directory: owns the generated hierarchy, the orbital state,
//! loaded planets and every tile-bound entity, and advances them in a fixed
//! order once per frame.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use glam::Vec2;
use hecs::{Entity, EntityBuilder, World};

use crate::components::{
    Active, Avatar, AvatarInput, Body, Contacts, ModelMatrix, OnSurface, Position, Rotation, Scale, Up, Velocity,
};
use crate::config::UniverseConfig;
use crate::error::{Result, UniverseError};
use crate::factory::UniverseFactory;
use crate::generator::{generate, DefaultPolicy};
use crate::kinematics::{self, KinematicBody, KinematicState, OrientationMode, TileHitFlags};
use crate::orbit::{self, DefaultTrig};
use crate::planet::{planet_height_with_radius, Planet};
use crate::render_state::RenderState;
use crate::surface::CurvedSurface;
use crate::systems::{avatar_input_system, kinematics_system, transform_system};
use crate::thing::{Thing, ThingPosition, ThingStore, ThingType};

/// Observer of directory events, for the presentation layer.
pub trait UniverseListener {
    fn on_universe_object_added(&mut self, _entity: Entity) {}

    /// `thing_index` no longer has a loaded planet.
    fn on_planet_returned(&mut self, _thing_index: u16) {}
}

pub struct Universe {
    config: UniverseConfig,
    store: ThingStore,
    positions: Vec<ThingPosition>,
    things_to_render: Vec<u16>,
    time: f64,
    trig: DefaultTrig,

    planets: HashMap<u16, Planet>,
    factory: UniverseFactory,

    world: World,
    avatar: Option<Entity>,
    starting_planet: Option<u16>,

    listener: Option<Box<dyn UniverseListener>>,
    render_state: RenderState,
}

impl Default for Universe {
    fn default() -> Self {
        Self::new(UniverseConfig::default())
    }
}

impl Universe {
    /// An empty directory. Nothing exists until [`init`](Self::init).
    pub fn new(config: UniverseConfig) -> Self {
        Self {
            config,
            store: ThingStore::default(),
            positions: Vec::new(),
            things_to_render: Vec::new(),
            time: 0.0,
            trig: DefaultTrig::default(),
            planets: HashMap::new(),
            factory: UniverseFactory::new(),
            world: World::new(),
            avatar: None,
            starting_planet: None,
            listener: None,
            render_state: RenderState::new(),
        }
    }

    /// Generate the universe for `seed`, solve orbits at time 0 and place the
    /// avatar on the starting planet. Anything from a previous `init` is
    /// discarded.
    pub fn init(&mut self, seed: u64, listener: Option<Box<dyn UniverseListener>>) -> Result<()> {
        self.reset();
        self.listener = listener;

        let mut policy = DefaultPolicy::new(self.config.generator.clone());
        self.store = generate(seed, self.config.capacity, &mut policy)?;
        self.positions = vec![ThingPosition::default(); self.store.len()];
        self.things_to_render = (0..self.store.len() as u16)
            .filter(|&i| self.store.thing(i).kind.is_rendered())
            .collect();
        self.starting_planet = self
            .things_to_render
            .iter()
            .copied()
            .find(|&i| self.store.thing(i).kind == ThingType::Planet);

        self.update_universe(0.0);

        match self.starting_planet {
            Some(planet) => {
                let avatar = self.add_avatar(planet)?;
                self.avatar = Some(avatar);
            }
            None => log::warn!("universe from seed {seed} has no planet; avatar not spawned"),
        }
        self.collect_frame();

        log::info!(
            "universe ready: {} things, {} rendered, starting planet {:?}",
            self.store.len(),
            self.things_to_render.len(),
            self.starting_planet
        );
        Ok(())
    }

    fn reset(&mut self) {
        for (_, planet) in self.planets.drain() {
            self.factory.return_planet(planet);
        }
        self.world.clear();
        self.avatar = None;
        self.starting_planet = None;
        self.time = 0.0;
        self.store = ThingStore::default();
        self.positions.clear();
        self.things_to_render.clear();
        self.render_state = RenderState::new();
    }

    /// Advance the simulation by `dt` seconds: orbits, then loaded planets,
    /// then tile-bound entities, then the presentation snapshot.
    pub fn update_universe(&mut self, dt: f32) {
        self.time += dt as f64;
        orbit::update_positions(&self.store, &mut self.positions, self.time, &self.trig);

        for (&index, planet) in &mut self.planets {
            planet.update(&self.positions[index as usize]);
        }

        let step = dt.clamp(0.0, self.config.max_step_dt);
        if step > 0.0 {
            avatar_input_system(&mut self.world, self.config.avatar.speed);
            kinematics_system(&mut self.world, &self.planets, self.config.avatar.jump_speed, step);
        }
        self.collect_frame();
    }

    fn collect_frame(&mut self) {
        transform_system(&mut self.world, &self.planets);
        self.render_state
            .collect(&self.store, &self.positions, &self.things_to_render, &self.world);
    }

    // ── Hierarchy ────────────────────────────────────────────────────

    /// # Panics
    /// If `index` is past the generated things.
    pub fn thing(&self, index: u16) -> &Thing {
        self.store.thing(index)
    }

    pub fn try_thing(&self, index: u16) -> Result<&Thing> {
        self.store.try_thing(index)
    }

    /// Absolute position of `index` at the current time.
    ///
    /// # Panics
    /// If `index` is past the generated things.
    pub fn thing_position(&self, index: u16) -> &ThingPosition {
        assert!(
            (index as usize) < self.positions.len(),
            "thing index {index} out of range (universe holds {} things)",
            self.positions.len()
        );
        &self.positions[index as usize]
    }

    pub fn thing_count(&self) -> usize {
        self.store.len()
    }

    pub fn store(&self) -> &ThingStore {
        &self.store
    }

    /// Indices of suns, planets and moons.
    pub fn things_to_render(&self) -> &[u16] {
        &self.things_to_render
    }

    pub fn starting_planet(&self) -> Option<u16> {
        self.starting_planet
    }

    /// Seconds of simulated time.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn config(&self) -> &UniverseConfig {
        &self.config
    }

    pub fn render_state(&self) -> &RenderState {
        &self.render_state
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    // ── Planets ──────────────────────────────────────────────────────

    /// Loaded planet for `index`, built on first access.
    pub fn get_planet(&mut self, index: u16) -> Result<&mut Planet> {
        let thing = *self.store.try_thing(index)?;
        if !thing.kind.has_surface() {
            return Err(UniverseError::NotASurface { index });
        }

        match self.planets.entry(index) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let mut planet = self.factory.get_planet(planet_height_with_radius(thing.radius));
                planet.init(index, &thing);
                planet.update(&self.positions[index as usize]);
                log::debug!("loaded {:?} {index} ({:?})", thing.kind, planet.planet_type());
                Ok(entry.insert(planet))
            }
        }
    }

    /// Loaded planet for `index`, if any.
    pub fn planet(&self, index: u16) -> Option<&Planet> {
        self.planets.get(&index)
    }

    pub fn loaded_planets(&self) -> usize {
        self.planets.len()
    }

    /// Unload the planet of `index` and keep it for reuse. Entities standing
    /// on it stay frozen until it is loaded again. Returns `false` if it was
    /// not loaded.
    pub fn return_planet(&mut self, index: u16) -> bool {
        let Some(planet) = self.planets.remove(&index) else {
            return false;
        };
        if let Some(listener) = self.listener.as_mut() {
            listener.on_planet_returned(index);
        }
        self.factory.return_planet(planet);
        log::debug!("returned planet {index}");
        true
    }

    /// Return every loaded planet no entity stands on. Returns how many were
    /// unloaded.
    pub fn evict_idle_planets(&mut self) -> usize {
        let occupied: HashSet<u16> = self.world.query::<&OnSurface>().iter().map(|surface| surface.0).collect();
        let idle: Vec<u16> = self
            .planets
            .keys()
            .copied()
            .filter(|index| !occupied.contains(index))
            .collect();
        for &index in &idle {
            self.return_planet(index);
        }
        idle.len()
    }

    pub fn factory(&self) -> &UniverseFactory {
        &self.factory
    }

    /// Clear the tile under a universe-space point on `index`. Returns
    /// `false` if the point is off the grid or the tile is already empty.
    pub fn dig_tile(&mut self, index: u16, world_position: Vec2) -> Result<bool> {
        let planet = self.get_planet(index)?;
        let Some((x, y)) = planet.tile_at_world(world_position) else {
            return Ok(false);
        };
        if planet.tilemap().tile(x, y) == 0 {
            return Ok(false);
        }
        planet.tilemap_mut().set_tile(x, y, 0);
        log::debug!("dug tile ({x}, {y}) on planet {index}");
        Ok(true)
    }

    // ── Entities ─────────────────────────────────────────────────────

    fn object_builder(surface: u16, state: &KinematicState, body: KinematicBody) -> EntityBuilder {
        let mut builder = EntityBuilder::new();
        builder
            .add(Position(state.position))
            .add(Velocity(state.velocity))
            .add(Up(state.up))
            .add(Rotation(state.rotation))
            .add(Scale(state.scale))
            .add(Contacts(state.hit_flags))
            .add(Body(body))
            .add(OnSurface(surface))
            .add(ModelMatrix::default())
            .add(Active);
        builder
    }

    fn notify_added(&mut self, entity: Entity) {
        if let Some(listener) = self.listener.as_mut() {
            listener.on_universe_object_added(entity);
        }
    }

    /// Spawn a generic tile-bound object at a planet-local position.
    pub fn add_universe_object(
        &mut self,
        surface: u16,
        position: Vec2,
        half_extents: Vec2,
        gravity: f32,
    ) -> Result<Entity> {
        let body = KinematicBody::new(half_extents, gravity).with_orientation(OrientationMode::SurfaceAngle);
        let planet = self.get_planet(surface)?;
        let state = KinematicState::at(planet.tilemap(), position);

        let entity = self.world.spawn(Self::object_builder(surface, &state, body).build());
        self.notify_added(entity);
        Ok(entity)
    }

    /// Spawn the avatar above tile column 0 of `surface` and drop it onto the
    /// ground.
    fn add_avatar(&mut self, surface: u16) -> Result<Entity> {
        let avatar = &self.config.avatar;
        let body = KinematicBody::new(avatar.half_extents, avatar.gravity);
        let snap_distance = self.config.kinematics.snap_distance;

        let planet = self.get_planet(surface)?;
        let spawn = planet.position_from_tile(0, planet.height());
        let mut state = KinematicState::at(planet.tilemap(), spawn);
        if !kinematics::snap_to_floor(planet.tilemap(), &mut state, &body, snap_distance) {
            log::warn!("no floor below the avatar spawn point on planet {surface}");
        }

        let mut builder = Self::object_builder(surface, &state, body);
        builder.add(Avatar).add(AvatarInput::default());
        let entity = self.world.spawn(builder.build());
        self.notify_added(entity);
        Ok(entity)
    }

    pub fn avatar(&self) -> Option<Entity> {
        self.avatar
    }

    /// Remove a tile-bound entity. Returns `false` if it did not exist.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        if self.avatar == Some(entity) {
            self.avatar = None;
        }
        self.world.despawn(entity).is_ok()
    }

    /// Latch the avatar's input for the next update. A jump request stays
    /// pending until a step consumes it.
    pub fn set_avatar_input(&mut self, horizontal: f32, jump: bool) {
        let Some(avatar) = self.avatar else {
            return;
        };
        if let Ok(mut input) = self.world.get::<&mut AvatarInput>(avatar) {
            input.horizontal = horizontal;
            input.jump |= jump;
        }
    }

    fn entity_snapshot(&mut self, entity: Entity) -> Result<(KinematicState, KinematicBody, u16)> {
        let (position, velocity, up, rotation, scale, contacts, body, surface) = self
            .world
            .query_one_mut::<(&Position, &Velocity, &Up, &Rotation, &Scale, &Contacts, &Body, &OnSurface)>(entity)
            .map_err(|_| UniverseError::UnknownEntity)?;
        let state = KinematicState {
            position: position.0,
            velocity: velocity.0,
            up: up.0,
            rotation: rotation.0,
            scale: scale.0,
            hit_flags: contacts.0,
        };
        Ok((state, body.0, surface.0))
    }

    fn store_state(&mut self, entity: Entity, state: &KinematicState) -> Result<()> {
        let (position, velocity, up, rotation, scale, contacts) = self
            .world
            .query_one_mut::<(&mut Position, &mut Velocity, &mut Up, &mut Rotation, &mut Scale, &mut Contacts)>(
                entity,
            )
            .map_err(|_| UniverseError::UnknownEntity)?;
        position.0 = state.position;
        velocity.0 = state.velocity;
        up.0 = state.up;
        rotation.0 = state.rotation;
        scale.0 = state.scale;
        contacts.0 = state.hit_flags;
        Ok(())
    }

    /// Whether `entity` would fit at the planet-local `target`.
    pub fn can_move_to(&mut self, entity: Entity, target: Vec2) -> Result<bool> {
        let (state, body, surface) = self.entity_snapshot(entity)?;
        let epsilon = self.config.kinematics.placement_epsilon;
        let planet = self.get_planet(surface)?;
        Ok(kinematics::can_move_to(planet.tilemap(), &state, &body, target, epsilon))
    }

    /// Teleport `entity` to the planet-local `target` if it fits there.
    pub fn move_to(&mut self, entity: Entity, target: Vec2) -> Result<bool> {
        let (mut state, body, surface) = self.entity_snapshot(entity)?;
        let epsilon = self.config.kinematics.placement_epsilon;
        let planet = self.get_planet(surface)?;
        let moved = kinematics::move_to(planet.tilemap(), &mut state, &body, target, epsilon);
        if moved {
            self.store_state(entity, &state)?;
        }
        Ok(moved)
    }

    /// Contacts of the entity's last kinematics step.
    pub fn contact_flags(&self, entity: Entity) -> Result<TileHitFlags> {
        self.world
            .get::<&Contacts>(entity)
            .map(|contacts| contacts.0)
            .map_err(|_| UniverseError::UnknownEntity)
    }

    /// Full kinematic state of a tile-bound entity.
    pub fn entity_state(&mut self, entity: Entity) -> Result<KinematicState> {
        self.entity_snapshot(entity).map(|(state, _, _)| state)
    }

    /// Thing index of the planet the entity lives on.
    pub fn entity_surface(&self, entity: Entity) -> Result<u16> {
        self.world
            .get::<&OnSurface>(entity)
            .map(|surface| surface.0)
            .map_err(|_| UniverseError::UnknownEntity)
    }

    /// Feet of the entity in universe space. Falls back to the local
    /// position while its planet is not loaded.
    pub fn entity_world_position(&self, entity: Entity) -> Result<Vec2> {
        let surface = self.entity_surface(entity)?;
        let local = self
            .world
            .get::<&Position>(entity)
            .map(|position| position.0)
            .map_err(|_| UniverseError::UnknownEntity)?;
        Ok(match self.planets.get(&surface) {
            Some(planet) => planet.local_to_world(local),
            None => local,
        })
    }
}

// ── Dev-tools debug methods ──────────────────────────────────────
#[cfg(feature = "dev-tools")]
impl Universe {
    /// Jump the clock to `time` and re-solve orbits without stepping
    /// entities.
    pub fn debug_set_time(&mut self, time: f64) {
        self.time = time;
        self.update_universe(0.0);
    }

    /// Thing indices of loaded planets, sorted.
    pub fn debug_loaded_planets(&self) -> Vec<u16> {
        let mut loaded: Vec<u16> = self.planets.keys().copied().collect();
        loaded.sort_unstable();
        loaded
    }

    /// Returns the number of active entities in the ECS world.
    pub fn debug_entity_count(&self) -> u32 {
        crate::systems::count_active(&self.world) as u32
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::kinematics::is_grounded;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Added(Entity),
        Returned(u16),
    }

    struct Recorder(Rc<RefCell<Vec<Event>>>);

    impl UniverseListener for Recorder {
        fn on_universe_object_added(&mut self, entity: Entity) {
            self.0.borrow_mut().push(Event::Added(entity));
        }

        fn on_planet_returned(&mut self, thing_index: u16) {
            self.0.borrow_mut().push(Event::Returned(thing_index));
        }
    }

    fn small_universe(seed: u64) -> Universe {
        let mut universe = Universe::new(UniverseConfig::small());
        universe.init(seed, None).unwrap();
        universe
    }

    fn run(universe: &mut Universe, seconds: f32) {
        let ticks = (seconds * 60.0).round() as usize;
        for _ in 0..ticks {
            universe.update_universe(1.0 / 60.0);
        }
    }

    fn first_of_kind(universe: &Universe, kind: ThingType) -> Option<u16> {
        (0..universe.thing_count() as u16).find(|&i| universe.thing(i).kind == kind)
    }

    #[test]
    fn init_builds_hierarchy_and_render_list() {
        let universe = small_universe(7);
        assert_eq!(universe.thing(0).kind, ThingType::Galaxy);
        assert!(universe.thing_count() > 1);
        assert!(!universe.things_to_render().is_empty());
        for &index in universe.things_to_render() {
            assert!(universe.thing(index).kind.is_rendered());
        }
        let start = universe.starting_planet().unwrap();
        assert_eq!(universe.thing(start).kind, ThingType::Planet);
        assert_eq!(universe.render_state().body_count() as usize, universe.things_to_render().len());
    }

    #[test]
    fn avatar_spawns_on_the_ground_of_the_starting_planet() {
        let mut universe = small_universe(11);
        let avatar = universe.avatar().unwrap();
        let start = universe.starting_planet().unwrap();
        assert_eq!(universe.entity_surface(avatar).unwrap(), start);
        assert!(universe.contact_flags(avatar).unwrap().contains(TileHitFlags::DOWN));

        run(&mut universe, 1.0);
        let state = universe.entity_state(avatar).unwrap();
        assert!(is_grounded(&state));
        let surface = universe.planet(start).unwrap().tilemap().surface_radius();
        assert!(state.position.length() < surface);

        run(&mut universe, 5.0);
        let rested = universe.entity_state(avatar).unwrap();
        assert!(is_grounded(&rested));
        assert!((rested.position - state.position).length() < 1e-3);
    }

    #[test]
    fn init_reports_listener_events() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let mut universe = Universe::new(UniverseConfig::small());
        universe.init(3, Some(Box::new(Recorder(events.clone())))).unwrap();
        let avatar = universe.avatar().unwrap();
        assert_eq!(events.borrow().as_slice(), &[Event::Added(avatar)]);
    }

    #[test]
    fn thing_access_is_bounds_checked() {
        let universe = small_universe(1);
        let len = universe.thing_count() as u16;
        assert!(matches!(
            universe.try_thing(len),
            Err(UniverseError::InvalidIndex { .. })
        ));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn thing_position_panics_past_len() {
        let universe = small_universe(1);
        let _ = universe.thing_position(universe.thing_count() as u16);
    }

    #[test]
    fn capacity_overflow_fails_init() {
        let config = UniverseConfig {
            capacity: 4,
            ..UniverseConfig::small()
        };
        let mut universe = Universe::new(config);
        let err = universe.init(5, None).unwrap_err();
        assert!(matches!(err, UniverseError::CapacityExceeded { capacity: 4 }));
        assert_eq!(universe.thing_count(), 0);
        assert!(universe.avatar().is_none());
    }

    #[test]
    fn get_planet_caches_and_rejects_non_surfaces() {
        let mut universe = small_universe(2);
        let sun = first_of_kind(&universe, ThingType::Sun).unwrap();
        assert!(matches!(
            universe.get_planet(sun),
            Err(UniverseError::NotASurface { .. })
        ));
        assert!(matches!(universe.get_planet(0), Err(UniverseError::NotASurface { index: 0 })));

        let loaded = universe.loaded_planets();
        let start = universe.starting_planet().unwrap();
        universe.get_planet(start).unwrap();
        assert_eq!(universe.loaded_planets(), loaded);
    }

    #[test]
    fn returned_planets_go_back_to_the_pool() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let mut universe = Universe::new(UniverseConfig::small());
        universe.init(4, Some(Box::new(Recorder(events.clone())))).unwrap();

        let start = universe.starting_planet().unwrap();
        let height = universe.get_planet(start).unwrap().height();
        let created = universe.factory().created();

        assert!(universe.return_planet(start));
        assert!(!universe.return_planet(start));
        assert_eq!(universe.factory().pooled(height), 1);
        assert_eq!(events.borrow().last(), Some(&Event::Returned(start)));

        universe.get_planet(start).unwrap();
        assert_eq!(universe.factory().created(), created);
        assert_eq!(universe.factory().pooled(height), 0);
    }

    #[test]
    fn idle_planets_are_evicted_but_occupied_ones_stay() {
        let mut universe = small_universe(6);
        let start = universe.starting_planet().unwrap();
        let other = universe
            .things_to_render()
            .iter()
            .copied()
            .find(|&i| i != start && universe.thing(i).kind.has_surface())
            .unwrap();
        universe.get_planet(other).unwrap();
        assert_eq!(universe.loaded_planets(), 2);

        assert_eq!(universe.evict_idle_planets(), 1);
        assert!(universe.planet(start).is_some());
        assert!(universe.planet(other).is_none());
    }

    #[test]
    fn move_to_validates_target() {
        let mut universe = small_universe(8);
        let avatar = universe.avatar().unwrap();
        let start = universe.starting_planet().unwrap();
        let planet = universe.planet(start).unwrap();
        let surface = planet.tilemap().surface_radius();
        let buried = planet.position_from_tile(0, 1);
        let sky = Vec2::new(0.0, surface + 4.0);

        assert!(!universe.can_move_to(avatar, buried).unwrap());
        assert!(!universe.move_to(avatar, buried).unwrap());
        assert!(universe.can_move_to(avatar, sky).unwrap());
        assert!(universe.move_to(avatar, sky).unwrap());
        assert_eq!(universe.entity_state(avatar).unwrap().position, sky);
    }

    #[test]
    fn unknown_entities_are_reported() {
        let mut universe = small_universe(8);
        let ghost = universe.world.spawn((Position::default(),));
        assert!(matches!(universe.contact_flags(ghost), Err(UniverseError::UnknownEntity)));
        assert!(matches!(universe.move_to(ghost, Vec2::ZERO), Err(UniverseError::UnknownEntity)));
    }

    #[test]
    fn generic_objects_fall_and_report_contacts() {
        let mut universe = small_universe(9);
        let start = universe.starting_planet().unwrap();
        let drop = {
            let planet = universe.get_planet(start).unwrap();
            planet.position_from_tile(5, planet.height())
        };
        let object = universe
            .add_universe_object(start, drop, Vec2::splat(0.3), 10.0)
            .unwrap();
        assert!(universe.contact_flags(object).unwrap().is_empty());

        run(&mut universe, 2.0);
        assert!(universe.contact_flags(object).unwrap().contains(TileHitFlags::DOWN));
        assert_eq!(universe.render_state().entity_count(), 2);
    }

    #[test]
    fn avatar_walks_and_jumps() {
        let mut universe = small_universe(10);
        let avatar = universe.avatar().unwrap();
        run(&mut universe, 0.5);
        let before = universe.entity_state(avatar).unwrap();

        universe.set_avatar_input(0.0, true);
        universe.update_universe(1.0 / 60.0);
        let jumped = universe.entity_state(avatar).unwrap();
        assert_eq!(jumped.velocity.y, universe.config().avatar.jump_speed);

        universe.set_avatar_input(1.0, false);
        universe.update_universe(1.0 / 60.0);
        let moving = universe.entity_state(avatar).unwrap();
        assert_eq!(moving.velocity.x, universe.config().avatar.speed);
        assert!(moving.position.length() > before.position.length());
    }

    #[test]
    fn digging_under_the_avatar_makes_it_fall() {
        let mut universe = small_universe(12);
        let avatar = universe.avatar().unwrap();
        let start = universe.starting_planet().unwrap();
        run(&mut universe, 0.5);
        let before = universe.entity_state(avatar).unwrap();

        let targets: Vec<Vec2> = {
            let planet = universe.planet(start).unwrap();
            [-0.5, -0.34, 0.0, 0.34, 0.5]
                .into_iter()
                .map(|offset| {
                    let local = before.position - before.up * 0.1 + before.right() * offset * before.scale;
                    planet.local_to_world(local)
                })
                .collect()
        };
        let mut dug = 0;
        for target in targets {
            if universe.dig_tile(start, target).unwrap() {
                dug += 1;
            }
        }
        assert!(dug > 0);

        run(&mut universe, 1.0);
        let after = universe.entity_state(avatar).unwrap();
        assert!(after.position.length() < before.position.length() - 0.1);
    }

    #[test]
    fn update_advances_time_and_orbits() {
        let mut universe = small_universe(13);
        let moving = (1..universe.thing_count() as u16)
            .find(|&i| universe.thing(i).orbital_period != 0)
            .unwrap();
        let before = *universe.thing_position(moving);
        universe.update_universe(0.05);
        assert!((universe.time() - 0.05).abs() < 1e-9);
        let after = *universe.thing_position(moving);
        assert_ne!(before, after);
    }

    #[test]
    fn reinit_discards_previous_universe() {
        let mut universe = small_universe(14);
        run(&mut universe, 0.2);
        universe.init(15, None).unwrap();
        assert_eq!(universe.time(), 0.0);
        assert_eq!(universe.loaded_planets(), 1);
        assert_eq!(universe.render_state().entity_count(), 1);
    }
}
