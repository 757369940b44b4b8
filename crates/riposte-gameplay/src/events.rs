//! Event bus for outward gameplay notifications.

use crossbeam_channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use tracing::debug;

use riposte_common::EntityId;

use crate::targeting::ReleaseReason;

/// Notifications published by characters and enemies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Weapon finished drawing
    WeaponDrawn {
        /// Entity ID
        entity_id: EntityId,
    },
    /// Attack started or chained
    AttackStarted {
        /// Attacker
        entity_id: EntityId,
        /// Step in the combo
        combo_index: usize,
    },
    /// Damage dispatched to a struck entity
    HitLanded {
        /// Attacker
        attacker: EntityId,
        /// Struck entity
        target: EntityId,
        /// Damage amount
        damage: i32,
    },
    /// Chain ended and the attacker is idle again
    ComboFinished {
        /// Entity ID
        entity_id: EntityId,
    },
    /// Lock-on acquired
    TargetLocked {
        /// Locking entity
        entity_id: EntityId,
        /// Target
        target: EntityId,
    },
    /// Lock moved to a different target
    TargetSwitched {
        /// Locking entity
        entity_id: EntityId,
        /// Previous target
        from: EntityId,
        /// New target
        to: EntityId,
    },
    /// Lock-on released
    TargetReleased {
        /// Locking entity
        entity_id: EntityId,
        /// Target that was held
        target: EntityId,
        /// Why it ended
        reason: ReleaseReason,
    },
    /// Health went up or down
    HealthChanged {
        /// Entity ID
        entity_id: EntityId,
        /// New value
        current: i32,
        /// Maximum
        max: i32,
    },
    /// A healing charge was spent
    HealStarted {
        /// Entity ID
        entity_id: EntityId,
        /// Charges left
        charges_left: u32,
    },
    /// Heal cancelled before completion
    HealInterrupted {
        /// Entity ID
        entity_id: EntityId,
    },
    /// Dash started
    DodgeStarted {
        /// Entity ID
        entity_id: EntityId,
    },
    /// Health reached zero
    EntityDied {
        /// Entity ID
        entity_id: EntityId,
    },
}

impl GameEvent {
    /// Entity the event is about.
    #[must_use]
    pub fn subject(&self) -> EntityId {
        match self {
            Self::HitLanded { attacker, .. } => *attacker,
            Self::WeaponDrawn { entity_id }
            | Self::AttackStarted { entity_id, .. }
            | Self::ComboFinished { entity_id }
            | Self::TargetLocked { entity_id, .. }
            | Self::TargetSwitched { entity_id, .. }
            | Self::TargetReleased { entity_id, .. }
            | Self::HealthChanged { entity_id, .. }
            | Self::HealStarted { entity_id, .. }
            | Self::HealInterrupted { entity_id }
            | Self::DodgeStarted { entity_id }
            | Self::EntityDied { entity_id } => *entity_id,
        }
    }
}

/// Event bus for broadcasting events to subscribers.
#[derive(Debug)]
pub struct EventBus {
    /// Sender for broadcasting events
    sender: Sender<GameEvent>,
    /// Receiver for collecting events
    receiver: Receiver<GameEvent>,
    /// Channel capacity
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl Clone for EventBus {
    /// Clones share the same channel.
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            receiver: self.receiver.clone(),
            capacity: self.capacity,
        }
    }
}

impl EventBus {
    /// Creates a new event bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity.max(1));
        Self {
            sender,
            receiver,
            capacity: capacity.max(1),
        }
    }

    /// Publishes an event. Returns `false` if the bus was full and the
    /// event was dropped.
    pub fn publish(&self, event: GameEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(err) => {
                debug!("Event bus full, dropped {:?}", err.into_inner());
                false
            },
        }
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<GameEvent> {
        self.receiver.try_iter().collect()
    }

    /// Drains pending events into every handler, in publish order.
    pub fn dispatch(&self, handlers: &[&dyn EventHandler]) -> usize {
        let mut count = 0;
        for event in self.receiver.try_iter() {
            for handler in handlers {
                handler.handle(&event);
            }
            count += 1;
        }
        count
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Creates a new sender handle for publishing events.
    #[must_use]
    pub fn sender(&self) -> Sender<GameEvent> {
        self.sender.clone()
    }
}

/// Typed event handler trait.
pub trait EventHandler: Send + Sync {
    /// Handles an event.
    fn handle(&self, event: &GameEvent);
}
