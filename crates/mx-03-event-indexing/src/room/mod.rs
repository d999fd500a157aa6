//! # Room Views
//!
//! Read-side projections over one room's committed indices. A [`Room`] is a
//! borrowed handle; the views it hands out read straight from the engine.

mod events;
mod power;
mod state;

pub use events::{Horizon, Missing, RoomEvents};
pub use state::{RoomHead, RoomJoined, RoomState};

use mx_06_room_power::RoomPower;

use crate::domain::errors::StorageError;
use crate::ports::outbound::KvEngine;
use crate::service::StorageContext;

pub struct Room<'a, K: KvEngine> {
    ctx: &'a StorageContext<K>,
    room_id: &'a str,
}

impl<K: KvEngine> Clone for Room<'_, K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K: KvEngine> Copy for Room<'_, K> {}

impl<'a, K: KvEngine> Room<'a, K> {
    pub(crate) fn new(ctx: &'a StorageContext<K>, room_id: &'a str) -> Self {
        Self { ctx, room_id }
    }

    pub fn room_id(&self) -> &'a str {
        self.room_id
    }

    pub fn events(&self) -> RoomEvents<'a, K> {
        RoomEvents::new(*self)
    }

    pub fn missing(&self) -> Missing<'a, K> {
        Missing::new(*self)
    }

    pub fn horizon(&self) -> Horizon<'a, K> {
        Horizon::new(*self)
    }

    pub fn state(&self) -> RoomState<'a, K> {
        RoomState::new(*self)
    }

    pub fn head(&self) -> RoomHead<'a, K> {
        RoomHead::new(*self)
    }

    pub fn joined(&self) -> RoomJoined<'a, K> {
        RoomJoined::new(*self)
    }

    /// Power levels as of the current room state.
    pub fn power(&self) -> Result<RoomPower, StorageError> {
        RoomPower::load(self.ctx, self.room_id)
    }
}
