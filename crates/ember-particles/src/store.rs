//! Fixed-capacity particle ring buffer

use crate::particle::Particle;

/// Ring buffer of particle slots with oldest-slot-first recycling.
///
/// Every slot is written in turn by [`ParticleStore::emit`]; once the ring is
/// full the next emit overwrites the oldest emitted particle regardless of its
/// remaining lifetime. Slot order starting at the cursor is therefore
/// emission order, oldest first.
pub struct ParticleStore {
    slots: Vec<Particle>,
    next_slot: usize,
    count: usize,
}

impl ParticleStore {
    /// Create a store of `capacity` dead slots. `capacity` must be non-zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "particle store needs at least one slot");
        Self {
            slots: vec![Particle::dead(); capacity],
            next_slot: 0,
            count: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of live slots
    pub fn live_count(&self) -> usize {
        self.count
    }

    /// Slot the next emit writes to
    pub fn next_slot(&self) -> usize {
        self.next_slot
    }

    pub fn get(&self, slot: usize) -> Option<&Particle> {
        self.slots.get(slot)
    }

    /// Write `particle` into the cursor slot and advance the cursor.
    /// Returns true if a live particle was evicted to make room.
    ///
    /// A particle that is already dead on arrival is stored as a tombstone.
    pub fn emit(&mut self, mut particle: Particle) -> bool {
        particle.settle_liveness();

        let slot = &mut self.slots[self.next_slot];
        let evicted = slot.is_alive();
        if evicted {
            self.count -= 1;
        }
        if particle.is_alive() {
            self.count += 1;
        }
        *slot = particle;

        self.next_slot = (self.next_slot + 1) % self.slots.len();
        evicted
    }

    /// Advance every live particle by `dt`. Dead slots are skipped.
    pub fn update_all(&mut self, dt: f32, gravity: f32) {
        if self.count == 0 {
            return;
        }
        for particle in self.slots.iter_mut() {
            if particle.is_alive() {
                particle.advance(dt, gravity);
                if !particle.is_alive() {
                    self.count -= 1;
                }
            }
        }
    }

    /// Slots in emission order: `[next_slot, end)` then `[0, next_slot)`.
    /// Both halves still contain dead slots.
    pub fn segments(&self) -> (&[Particle], &[Particle]) {
        let (head, tail) = self.slots.split_at(self.next_slot);
        (tail, head)
    }

    /// Live particles, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        let (older, newer) = self.segments();
        older.iter().chain(newer).filter(|p| p.is_alive())
    }

    /// Tombstone every slot and reset the cursor
    pub fn clear(&mut self) {
        for particle in self.slots.iter_mut() {
            particle.time_to_live = 0.0;
        }
        self.next_slot = 0;
        self.count = 0;
    }
}
