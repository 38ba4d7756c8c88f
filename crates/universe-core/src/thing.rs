//! The flat celestial hierarchy.
//!
//! Every body of a universe is a [`Thing`] in one fixed-size array. The tree
//! is implicit: each thing records its `parent`, how many direct children it
//! has and the index of its next sibling. Things are stored in preorder, so a
//! parent always sits at a lower index than any of its descendants.

use bytemuck::{NoUninit, Pod, Zeroable};

use crate::error::{Result, UniverseError};

/// Hard capacity of a universe.
pub const MAX_THINGS: usize = 8192;

/// Degrees-to-radians divided by 100; `Thing::angle` is stored in hundredths
/// of a degree.
pub const DEG_TO_RAD_OVER_100: f32 = std::f32::consts::PI / 18000.0;

/// Kind of celestial body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, NoUninit)]
#[repr(u16)]
pub enum ThingType {
    #[default]
    Galaxy = 0,
    SolarSystem = 1,
    Sun = 2,
    Planet = 3,
    Moon = 4,
}

impl ThingType {
    /// Suns, planets and moons are drawn; galaxies and solar systems are only
    /// grouping nodes.
    pub fn is_rendered(self) -> bool {
        matches!(self, Self::Sun | Self::Planet | Self::Moon)
    }

    /// Bodies with a walkable tile surface.
    pub fn has_surface(self) -> bool {
        matches!(self, Self::Planet | Self::Moon)
    }
}

/// Static orbital parameters and tree links of one body.
#[derive(Debug, Clone, Copy, PartialEq, Default, NoUninit)]
#[repr(C)]
pub struct Thing {
    pub kind: ThingType,
    /// Index of the enclosing body. The root is its own parent.
    pub parent: u16,
    /// Number of direct children.
    pub childs: u16,
    /// Next sibling at the same level, 0 if this is the last one.
    pub next_brother: u16,
    /// Orbital angle at time 0, in hundredths of a degree.
    pub angle: u16,
    pub distance: u16,
    pub rotation_period: i16,
    pub orbital_period: i16,
    pub radius: u16,
    /// Clearance the generator keeps free around this body and its children.
    pub safe_radius: u16,
    pub seed: u32,
    pub rotation_period_inv: f32,
    pub orbital_period_inv: f32,
}

impl Thing {
    /// Orbital angle at time 0 in radians.
    #[inline]
    pub fn angle_radians(&self) -> f32 {
        self.angle as f32 * DEG_TO_RAD_OVER_100
    }
}

/// Reciprocal of a period, or 0.0 for bodies that never move.
#[inline]
pub fn period_inv(period: i16) -> f32 {
    if period == 0 { 0.0 } else { 1.0 / period as f32 }
}

/// Absolute placement of a body, recomputed every tick by the orbital solver.
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct ThingPosition {
    pub x: f32,
    pub y: f32,
    /// Spin in radians, in `[0, 2π)` for positive periods.
    pub rotation: f32,
    pub radius: f32,
}

/// Fixed-capacity arena of things addressed by `u16` index.
///
/// The default store has no slots; it stands in for a universe that has not
/// been generated yet.
#[derive(Debug, Clone, Default)]
pub struct ThingStore {
    things: Box<[Thing]>,
    len: usize,
}

impl ThingStore {
    /// Allocate every slot up front. Capacity must fit `u16` indices.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        if capacity == 0 || capacity > u16::MAX as usize + 1 {
            return Err(UniverseError::InvalidCapacity { requested: capacity });
        }
        Ok(Self {
            things: vec![Thing::default(); capacity].into_boxed_slice(),
            len: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.things.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.things.len()
    }

    /// The populated prefix of the store.
    pub fn as_slice(&self) -> &[Thing] {
        &self.things[..self.len]
    }

    /// Raw bytes of the populated prefix. Two stores generated from the same
    /// seed compare equal byte for byte.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.as_slice())
    }

    pub fn get(&self, index: u16) -> Option<&Thing> {
        self.as_slice().get(index as usize)
    }

    /// Thing at `index`.
    ///
    /// # Panics
    /// If `index` is not below [`len`](Self::len).
    pub fn thing(&self, index: u16) -> &Thing {
        assert!(
            (index as usize) < self.len,
            "thing index {index} out of range (universe holds {} things)",
            self.len
        );
        &self.things[index as usize]
    }

    pub fn try_thing(&self, index: u16) -> Result<&Thing> {
        self.get(index).ok_or(UniverseError::InvalidIndex {
            index,
            len: self.len,
        })
    }

    pub(crate) fn thing_mut(&mut self, index: u16) -> &mut Thing {
        assert!((index as usize) < self.len, "thing index {index} out of range");
        &mut self.things[index as usize]
    }

    /// Append a thing, failing instead of overwriting when full.
    pub(crate) fn push(&mut self, thing: Thing) -> Result<u16> {
        if self.is_full() {
            return Err(UniverseError::CapacityExceeded {
                capacity: self.capacity(),
            });
        }
        let index = self.len as u16;
        self.things[self.len] = thing;
        self.len += 1;
        Ok(index)
    }

    /// Direct children of `index`, walked through the sibling chain.
    pub fn children(&self, index: u16) -> Children<'_> {
        let thing = self.thing(index);
        Children {
            store: self,
            next: index.wrapping_add(1),
            remaining: thing.childs,
        }
    }
}

/// Iterator over the direct children of a thing.
pub struct Children<'a> {
    store: &'a ThingStore,
    next: u16,
    remaining: u16,
}

impl Iterator for Children<'_> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        if self.remaining == 0 {
            return None;
        }
        let current = self.next;
        self.remaining -= 1;
        self.next = self.store.thing(current).next_brother;
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining as usize, Some(self.remaining as usize))
    }
}
