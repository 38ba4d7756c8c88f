//! ECS systems for tile-bound entities.

use std::collections::HashMap;

use glam::{Mat4, Quat, Vec3};
use hecs::World;

use crate::components::{
    Active, Avatar, AvatarInput, Body, Contacts, ModelMatrix, OnSurface, Position, Rotation, Scale, Up, Velocity,
};
use crate::kinematics::{self, KinematicState};
use crate::planet::Planet;

/// Turn the avatar's horizontal input into tangential velocity.
pub fn avatar_input_system(world: &mut World, speed: f32) {
    for (velocity, input) in world.query_mut::<(&mut Velocity, &AvatarInput)>().with::<&Avatar>() {
        velocity.0.x = input.horizontal.clamp(-1.0, 1.0) * speed;
    }
}

/// Step every active entity against the planet it stands on. Entities whose
/// planet is not loaded are frozen.
pub fn kinematics_system(world: &mut World, planets: &HashMap<u16, Planet>, jump_speed: f32, dt: f32) {
    for (position, velocity, up, rotation, scale, contacts, body, surface, input) in world
        .query_mut::<(
            &mut Position,
            &mut Velocity,
            &mut Up,
            &mut Rotation,
            &mut Scale,
            &mut Contacts,
            &Body,
            &OnSurface,
            Option<&mut AvatarInput>,
        )>()
        .with::<&Active>()
    {
        let Some(planet) = planets.get(&surface.0) else {
            continue;
        };

        let mut state = KinematicState {
            position: position.0,
            velocity: velocity.0,
            up: up.0,
            rotation: rotation.0,
            scale: scale.0,
            hit_flags: contacts.0,
        };
        let jump = match input {
            Some(input) if input.jump => {
                input.jump = false;
                Some(jump_speed)
            }
            _ => None,
        };

        kinematics::step(planet.tilemap(), &mut state, &body.0, jump, dt);

        position.0 = state.position;
        velocity.0 = state.velocity;
        up.0 = state.up;
        rotation.0 = state.rotation;
        scale.0 = state.scale;
        contacts.0 = state.hit_flags;
    }
}

/// Recompute universe-space model matrices from the planet transform and the
/// entity's local placement. Runs after all spatial mutations of the tick.
pub fn transform_system(world: &mut World, planets: &HashMap<u16, Planet>) {
    for (position, rotation, scale, surface, matrix) in
        world.query_mut::<(&Position, &Rotation, &Scale, &OnSurface, &mut ModelMatrix)>()
    {
        let local = Mat4::from_scale_rotation_translation(
            Vec3::splat(scale.0),
            Quat::from_rotation_z(rotation.0),
            position.0.extend(0.0),
        );
        let world_matrix = match planets.get(&surface.0) {
            Some(planet) => planet.world_matrix() * local,
            None => local,
        };
        matrix.0 = world_matrix.to_cols_array();
    }
}

/// Count active entities. Useful for debug overlay.
pub fn count_active(world: &World) -> usize {
    world.query::<&Active>().iter().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinematics::{KinematicBody, TileHitFlags};
    use crate::thing::{Thing, ThingPosition, ThingType};
    use glam::Vec2;

    fn planet_at(index: u16, x: f32) -> Planet {
        let thing = Thing {
            kind: ThingType::Planet,
            radius: 20,
            seed: 4,
            ..Default::default()
        };
        let mut planet = Planet::new(16);
        planet.init(index, &thing);
        planet.update(&ThingPosition {
            x,
            y: 0.0,
            rotation: 0.0,
            radius: 20.0,
        });
        planet
    }

    fn spawn_on(world: &mut World, planet: &Planet, avatar: bool) -> hecs::Entity {
        let position = Vec2::new(0.0, planet.tilemap().surface_radius() + 0.5);
        let entity = world.spawn((
            Position(position),
            Velocity::default(),
            Up::default(),
            Rotation::default(),
            Scale::default(),
            Contacts::default(),
            Body(KinematicBody::new(Vec2::new(0.375, 0.525), 10.0)),
            OnSurface(planet.thing_index()),
            ModelMatrix::default(),
            Active,
        ));
        if avatar {
            world
                .insert(entity, (Avatar, AvatarInput::default()))
                .unwrap();
        }
        entity
    }

    fn settle(world: &mut World, planets: &HashMap<u16, Planet>) {
        for _ in 0..120 {
            kinematics_system(world, planets, 7.0, 1.0 / 60.0);
        }
    }

    #[test]
    fn input_sets_tangential_velocity() {
        let mut world = World::new();
        let planet = planet_at(1, 0.0);
        let e = spawn_on(&mut world, &planet, true);
        world.get::<&mut AvatarInput>(e).unwrap().horizontal = -2.0;

        avatar_input_system(&mut world, 3.0);

        assert_eq!(world.get::<&Velocity>(e).unwrap().0.x, -3.0);
    }

    #[test]
    fn input_ignores_non_avatars() {
        let mut world = World::new();
        let planet = planet_at(1, 0.0);
        let e = spawn_on(&mut world, &planet, false);
        world.insert_one(e, AvatarInput { horizontal: 1.0, jump: false }).unwrap();

        avatar_input_system(&mut world, 3.0);

        assert_eq!(world.get::<&Velocity>(e).unwrap().0.x, 0.0);
    }

    #[test]
    fn entities_fall_onto_their_planet() {
        let mut world = World::new();
        let planets = HashMap::from([(1, planet_at(1, 0.0))]);
        let e = spawn_on(&mut world, &planets[&1], false);

        settle(&mut world, &planets);

        let contacts = world.get::<&Contacts>(e).unwrap().0;
        assert!(contacts.contains(TileHitFlags::DOWN));
        let landed = world.get::<&Position>(e).unwrap().0;
        assert!(landed.length() < planets[&1].tilemap().surface_radius());

        // Resting bodies stay put instead of drifting into the ground.
        for _ in 0..5 {
            settle(&mut world, &planets);
        }
        let rested = world.get::<&Position>(e).unwrap().0;
        assert!((rested - landed).length() < 1e-3, "{landed} -> {rested}");
        assert!(world.get::<&Contacts>(e).unwrap().0.contains(TileHitFlags::DOWN));
    }

    #[test]
    fn jump_edge_is_consumed_on_landing() {
        let mut world = World::new();
        let planets = HashMap::from([(1, planet_at(1, 0.0))]);
        let e = spawn_on(&mut world, &planets[&1], true);
        settle(&mut world, &planets);

        world.get::<&mut AvatarInput>(e).unwrap().jump = true;
        kinematics_system(&mut world, &planets, 7.0, 1.0 / 60.0);

        assert_eq!(world.get::<&Velocity>(e).unwrap().0.y, 7.0);
        assert!(!world.get::<&AvatarInput>(e).unwrap().jump);
    }

    #[test]
    fn entities_without_loaded_planet_are_frozen() {
        let mut world = World::new();
        let planet = planet_at(1, 0.0);
        let e = spawn_on(&mut world, &planet, false);
        let before = world.get::<&Position>(e).unwrap().0;

        kinematics_system(&mut world, &HashMap::new(), 7.0, 0.1);

        assert_eq!(world.get::<&Position>(e).unwrap().0, before);
    }

    #[test]
    fn transform_places_entity_in_universe() {
        let mut world = World::new();
        let planets = HashMap::from([(1, planet_at(1, 100.0))]);
        let e = world.spawn((
            Position(Vec2::ZERO),
            Rotation(0.0),
            Scale(1.0),
            OnSurface(1),
            ModelMatrix::default(),
        ));

        transform_system(&mut world, &planets);

        let matrix = world.get::<&ModelMatrix>(e).unwrap();
        // Translation lives in columns 12, 13, 14 of a column-major 4x4.
        assert!((matrix.0[12] - 100.0).abs() < 1e-4);
        assert!(matrix.0[13].abs() < 1e-4);
    }

    #[test]
    fn count_active_entities() {
        let mut world = World::new();
        world.spawn((Position::default(), Active));
        world.spawn((Position::default(), Active));
        world.spawn((Position::default(),)); // no Active marker
        assert_eq!(count_active(&world), 2);
    }
}
