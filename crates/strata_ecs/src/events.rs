//! # World Lifecycle Events
//!
//! Worlds built with [`World::with_events`](crate::World::with_events) report
//! their creation and disposal on a `crossbeam_channel` sender, for an event
//! bus that lives outside this crate.

use crossbeam_channel::Sender;

use crate::config::WorldConfiguration;

/// Lifecycle notification emitted by a world.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorldEvent {
    /// A world was constructed.
    Created {
        /// Process-unique id of the world.
        world_id: u32,
        /// The configuration it was sized with.
        config: WorldConfiguration,
    },
    /// A world was disposed.
    Disposed {
        /// Process-unique id of the world.
        world_id: u32,
    },
}

impl WorldEvent {
    /// Id of the world that emitted the event.
    #[inline]
    #[must_use]
    pub const fn world_id(&self) -> u32 {
        match self {
            Self::Created { world_id, .. } | Self::Disposed { world_id } => *world_id,
        }
    }
}

/// Sends an event if a sender is attached. A dropped receiver is logged and
/// otherwise ignored.
pub(crate) fn emit(sender: Option<&Sender<WorldEvent>>, event: WorldEvent) {
    let Some(sender) = sender else {
        return;
    };
    if let Err(error) = sender.send(event) {
        tracing::warn!(
            world_id = error.0.world_id(),
            "world event receiver dropped"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_delivers() {
        let (tx, rx) = crossbeam_channel::unbounded();
        emit(Some(&tx), WorldEvent::Disposed { world_id: 7 });
        assert_eq!(rx.try_recv(), Ok(WorldEvent::Disposed { world_id: 7 }));
    }

    #[test]
    fn test_emit_without_receiver_is_silent() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        drop(rx);
        emit(Some(&tx), WorldEvent::Disposed { world_id: 1 });
        emit(None, WorldEvent::Disposed { world_id: 2 });
    }
}
