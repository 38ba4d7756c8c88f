use std::ptr::addr_of_mut;

use wasm_bindgen::prelude::*;

pub mod command_processor;
pub mod components;
pub mod config;
pub mod error;
pub mod factory;
pub mod generator;
pub mod kinematics;
pub mod orbit;
pub mod planet;
pub mod render_state;
pub mod surface;
pub mod systems;
pub mod thing;
pub mod tilemap;
pub mod universe;

use command_processor::{process_commands, Command, CommandQueue, EntityMap};
use config::UniverseConfig;
use glam::Vec2;
use universe::Universe;

pub use error::{Result, UniverseError};

struct Host {
    universe: Universe,
    commands: CommandQueue,
    entity_map: EntityMap,
}

static mut HOST: Option<Host> = None;

/// Generate a universe from `seed`. `config_json` may be empty for the
/// defaults. Returns `false` and logs the reason on failure.
#[wasm_bindgen]
pub fn universe_init(seed: u64, config_json: &str) -> bool {
    let config = if config_json.trim().is_empty() {
        UniverseConfig::default()
    } else {
        match UniverseConfig::from_json(config_json) {
            Ok(config) => config,
            Err(err) => {
                log::error!("{err}");
                return false;
            }
        }
    };

    let mut universe = Universe::new(config);
    if let Err(err) = universe.init(seed, None) {
        log::error!("universe init failed: {err}");
        return false;
    }

    // SAFETY: wasm32 is single-threaded; no concurrent access.
    unsafe {
        *addr_of_mut!(HOST) = Some(Host {
            universe,
            commands: CommandQueue::new(),
            entity_map: EntityMap::new(),
        });
    }
    true
}

fn with_host<T>(default: T, f: impl FnOnce(&mut Host) -> T) -> T {
    // SAFETY: wasm32 is single-threaded; no concurrent access to the host.
    unsafe {
        match &mut *addr_of_mut!(HOST) {
            Some(host) => f(host),
            None => default,
        }
    }
}

/// Run one frame. `dt` is seconds since the last frame. Pending commands
/// are applied first.
#[wasm_bindgen]
pub fn universe_update(dt: f32) {
    with_host((), |host| {
        let commands = host.commands.drain();
        process_commands(&commands, &mut host.universe, &mut host.entity_map);
        host.universe.update_universe(dt);
    });
}

#[wasm_bindgen]
pub fn universe_thing_count() -> u32 {
    with_host(0, |host| host.universe.thing_count() as u32)
}

/// Bodies in the render snapshot.
#[wasm_bindgen]
pub fn universe_render_count() -> u32 {
    with_host(0, |host| host.universe.render_state().body_count())
}

/// Pointer to `x, y, rotation, radius` per rendered body, valid until the
/// next update.
#[wasm_bindgen]
pub fn universe_render_bounds_ptr() -> *const f32 {
    with_host(std::ptr::null(), |host| host.universe.render_state().bounds_ptr())
}

/// Texture layer per rendered body, valid until the next update.
#[wasm_bindgen]
pub fn universe_render_tex_indices_ptr() -> *const u32 {
    with_host(std::ptr::null(), |host| host.universe.render_state().tex_indices_ptr())
}

#[wasm_bindgen]
pub fn universe_entity_count() -> u32 {
    with_host(0, |host| host.universe.render_state().entity_count())
}

/// Column-major model matrices of active entities, valid until the next
/// update.
#[wasm_bindgen]
pub fn universe_entity_matrices_ptr() -> *const f32 {
    with_host(std::ptr::null(), |host| host.universe.render_state().matrices_ptr())
}

#[wasm_bindgen]
pub fn universe_set_avatar_input(horizontal: f32, jump: bool) {
    with_host((), |host| host.commands.push(Command::AvatarInput { horizontal, jump }));
}

/// Queue digging the tile under a universe-space point of `surface`.
#[wasm_bindgen]
pub fn universe_dig(surface: u16, x: f32, y: f32) {
    with_host((), |host| {
        host.commands.push(Command::Dig {
            surface,
            world_position: Vec2::new(x, y),
        })
    });
}

/// Queue spawning a generic object; returns its external ID.
#[wasm_bindgen]
pub fn universe_spawn_object(surface: u16, x: f32, y: f32, half_width: f32, half_height: f32) -> u32 {
    with_host(u32::MAX, |host| {
        let entity_id = host.entity_map.allocate();
        host.commands.push(Command::Spawn {
            entity_id,
            surface,
            position: Vec2::new(x, y),
            half_extents: Vec2::new(half_width, half_height),
        });
        entity_id
    })
}
