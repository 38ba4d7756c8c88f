//! Host commands applied to the universe between updates.

use glam::Vec2;

use crate::universe::Universe;

/// Maps external entity IDs (from the host) to internal hecs entities.
pub struct EntityMap {
    /// Sparse map: external ID -> hecs Entity.
    map: Vec<Option<hecs::Entity>>,
    /// Free list for ID recycling.
    free_list: Vec<u32>,
    next_id: u32,
}

impl Default for EntityMap {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityMap {
    pub fn new() -> Self {
        Self {
            map: Vec::new(),
            free_list: Vec::new(),
            next_id: 0,
        }
    }

    /// Allocate a new external ID (or recycle one).
    pub fn allocate(&mut self) -> u32 {
        if let Some(id) = self.free_list.pop() {
            id
        } else {
            let id = self.next_id;
            self.next_id += 1;
            id
        }
    }

    pub fn insert(&mut self, external_id: u32, entity: hecs::Entity) {
        let idx = external_id as usize;
        if idx >= self.map.len() {
            self.map.resize(idx + 1, None);
        }
        self.map[idx] = Some(entity);
        if external_id >= self.next_id {
            self.next_id = external_id + 1;
        }
    }

    pub fn get(&self, external_id: u32) -> Option<hecs::Entity> {
        self.map.get(external_id as usize).copied().flatten()
    }

    /// Remove a mapping and make the ID available again.
    pub fn remove(&mut self, external_id: u32) {
        let idx = external_id as usize;
        if idx < self.map.len() {
            self.map[idx] = None;
        }
        if external_id < self.next_id && !self.free_list.contains(&external_id) {
            self.free_list.push(external_id);
        }
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.free_list.clear();
        self.next_id = 0;
    }
}

/// One host request. Positions of `Spawn` and `Teleport` are planet-local;
/// `Dig` takes a universe-space point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Spawn {
        entity_id: u32,
        surface: u16,
        position: Vec2,
        half_extents: Vec2,
    },
    Despawn {
        entity_id: u32,
    },
    AvatarInput {
        horizontal: f32,
        jump: bool,
    },
    Dig {
        surface: u16,
        world_position: Vec2,
    },
    Teleport {
        entity_id: u32,
        position: Vec2,
    },
}

/// Commands accumulated by the host until the next update.
#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: Vec<Command>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: Command) {
        self.pending.push(command);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Take every pending command in submission order.
    pub fn drain(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.pending)
    }
}

/// Apply a batch of commands. Rejected commands are logged and skipped.
pub fn process_commands(commands: &[Command], universe: &mut Universe, entity_map: &mut EntityMap) {
    for command in commands {
        match *command {
            Command::Spawn {
                entity_id,
                surface,
                position,
                half_extents,
            } => {
                let gravity = universe.config().kinematics.gravity;
                match universe.add_universe_object(surface, position, half_extents, gravity) {
                    Ok(entity) => entity_map.insert(entity_id, entity),
                    Err(err) => {
                        log::warn!("spawn of entity {entity_id} rejected: {err}");
                        entity_map.remove(entity_id);
                    }
                }
            }

            Command::Despawn { entity_id } => {
                if let Some(entity) = entity_map.get(entity_id) {
                    universe.despawn(entity);
                    entity_map.remove(entity_id);
                }
            }

            Command::AvatarInput { horizontal, jump } => universe.set_avatar_input(horizontal, jump),

            Command::Dig {
                surface,
                world_position,
            } => {
                if let Err(err) = universe.dig_tile(surface, world_position) {
                    log::warn!("dig on thing {surface} rejected: {err}");
                }
            }

            Command::Teleport { entity_id, position } => {
                let Some(entity) = entity_map.get(entity_id) else {
                    continue;
                };
                match universe.move_to(entity, position) {
                    Ok(true) => {}
                    Ok(false) => log::debug!("teleport of entity {entity_id} blocked"),
                    Err(err) => log::warn!("teleport of entity {entity_id} rejected: {err}"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UniverseConfig;
    use crate::kinematics::TileHitFlags;

    fn universe() -> Universe {
        let mut universe = Universe::new(UniverseConfig::small());
        universe.init(21, None).unwrap();
        universe
    }

    fn spawn_cmd(universe: &mut Universe, id: u32) -> Command {
        let surface = universe.starting_planet().unwrap();
        let planet = universe.get_planet(surface).unwrap();
        Command::Spawn {
            entity_id: id,
            surface,
            position: planet.position_from_tile(3, planet.height()),
            half_extents: Vec2::splat(0.3),
        }
    }

    #[test]
    fn spawn_creates_entity() {
        let mut universe = universe();
        let mut map = EntityMap::new();
        let spawn = spawn_cmd(&mut universe, 0);

        process_commands(&[spawn], &mut universe, &mut map);

        let entity = map.get(0).unwrap();
        assert!(universe.contact_flags(entity).is_ok());
    }

    #[test]
    fn spawn_on_a_sun_is_rejected() {
        let mut universe = universe();
        let mut map = EntityMap::new();
        let sun = universe.things_to_render()[0];
        assert!(!universe.thing(sun).kind.has_surface());

        process_commands(
            &[Command::Spawn {
                entity_id: 0,
                surface: sun,
                position: Vec2::ZERO,
                half_extents: Vec2::splat(0.3),
            }],
            &mut universe,
            &mut map,
        );

        assert!(map.get(0).is_none());
    }

    #[test]
    fn despawn_removes_entity() {
        let mut universe = universe();
        let mut map = EntityMap::new();
        let spawn = spawn_cmd(&mut universe, 0);
        process_commands(&[spawn], &mut universe, &mut map);
        let entity = map.get(0).unwrap();

        process_commands(&[Command::Despawn { entity_id: 0 }], &mut universe, &mut map);

        assert!(map.get(0).is_none());
        assert!(universe.contact_flags(entity).is_err());
    }

    #[test]
    fn teleport_moves_entity_when_free() {
        let mut universe = universe();
        let mut map = EntityMap::new();
        let spawn = spawn_cmd(&mut universe, 0);
        process_commands(&[spawn], &mut universe, &mut map);
        let entity = map.get(0).unwrap();
        let surface = universe.starting_planet().unwrap();
        let sky = {
            let planet = universe.get_planet(surface).unwrap();
            planet.position_from_tile(10, planet.height()) * 1.5
        };

        process_commands(&[Command::Teleport { entity_id: 0, position: sky }], &mut universe, &mut map);

        assert_eq!(universe.entity_state(entity).unwrap().position, sky);
    }

    #[test]
    fn avatar_input_and_dig_reach_the_universe() {
        let mut universe = universe();
        let mut map = EntityMap::new();
        for _ in 0..30 {
            universe.update_universe(1.0 / 60.0);
        }
        let avatar = universe.avatar().unwrap();
        assert!(universe.contact_flags(avatar).unwrap().contains(TileHitFlags::DOWN));

        process_commands(
            &[Command::AvatarInput {
                horizontal: 0.0,
                jump: true,
            }],
            &mut universe,
            &mut map,
        );
        universe.update_universe(1.0 / 60.0);
        let state = universe.entity_state(avatar).unwrap();
        assert_eq!(state.velocity.y, universe.config().avatar.jump_speed);

        let surface = universe.starting_planet().unwrap();
        let world_position = {
            let planet = universe.get_planet(surface).unwrap();
            planet.local_to_world(planet.position_from_tile(0, 1) * 1.01)
        };
        process_commands(&[Command::Dig { surface, world_position }], &mut universe, &mut map);
        let planet = universe.planet(surface).unwrap();
        assert_eq!(planet.tilemap().dirty_count(), 1);
    }

    #[test]
    fn entity_id_recycling() {
        let mut map = EntityMap::new();
        let id1 = map.allocate();
        let id2 = map.allocate();
        assert_eq!(id1, 0);
        assert_eq!(id2, 1);

        map.remove(id1);
        let id3 = map.allocate();
        assert_eq!(id3, 0); // recycled
    }

    #[test]
    fn queue_drains_in_order() {
        let mut queue = CommandQueue::new();
        queue.push(Command::Despawn { entity_id: 1 });
        queue.push(Command::Despawn { entity_id: 2 });
        assert_eq!(queue.len(), 2);
        assert_eq!(
            queue.drain(),
            vec![Command::Despawn { entity_id: 1 }, Command::Despawn { entity_id: 2 }]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn commands_on_nonexistent_entity_are_ignored() {
        let mut universe = universe();
        let mut map = EntityMap::new();
        process_commands(
            &[
                Command::Teleport {
                    entity_id: 99,
                    position: Vec2::ZERO,
                },
                Command::Despawn { entity_id: 99 },
            ],
            &mut universe,
            &mut map,
        );
    }
}
