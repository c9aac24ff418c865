//! Event system
//!
//! Key principles:
//! - Handler returns bool (true = consumed, stops forwarding)
//! - Registration system (only notify interested handlers)
//! - Queuing: events are sent into a queue and delivered on `dispatch`
//!
//! The scene graph dispatches right after every attach or detach, so handlers
//! observe hierarchy changes synchronously.

use std::collections::HashMap;

use crate::assets::ResourceKey;
use crate::scene::NodeId;

/// Event type identification, used for handler registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// A node was attached to a parent
    Added,
    /// A node was detached from its parent
    Removed,
    /// A parent gained a child
    ChildAdded,
    /// A parent lost a child
    ChildRemoved,
    /// A resource was disposed
    Disposed,
}

/// Hierarchy changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneEvent {
    /// `node` now has `parent`
    Added {
        /// Child that moved
        node: NodeId,
        /// New parent
        parent: NodeId,
    },
    /// `node` no longer has `parent`
    Removed {
        /// Child that moved
        node: NodeId,
        /// Former parent
        parent: NodeId,
    },
    /// `parent` gained `child`
    ChildAdded {
        /// Receiving parent
        parent: NodeId,
        /// New child
        child: NodeId,
    },
    /// `parent` lost `child`
    ChildRemoved {
        /// Former parent
        parent: NodeId,
        /// Removed child
        child: NodeId,
    },
}

/// Resource lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceEvent {
    /// Device objects for the resource should be released
    Disposed(ResourceKey),
}

/// Engine event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Scene hierarchy change
    Scene(SceneEvent),
    /// Resource lifecycle change
    Resource(ResourceEvent),
}

impl Event {
    /// Registration key for this event
    pub const fn event_type(&self) -> EventType {
        match self {
            Self::Scene(SceneEvent::Added { .. }) => EventType::Added,
            Self::Scene(SceneEvent::Removed { .. }) => EventType::Removed,
            Self::Scene(SceneEvent::ChildAdded { .. }) => EventType::ChildAdded,
            Self::Scene(SceneEvent::ChildRemoved { .. }) => EventType::ChildRemoved,
            Self::Resource(ResourceEvent::Disposed(_)) => EventType::Disposed,
        }
    }
}

impl From<SceneEvent> for Event {
    fn from(event: SceneEvent) -> Self {
        Self::Scene(event)
    }
}

impl From<ResourceEvent> for Event {
    fn from(event: ResourceEvent) -> Self {
        Self::Resource(event)
    }
}

/// Event handler trait
/// Returns true if event was consumed (stops forwarding)
/// Returns false to allow forwarding to other handlers
pub trait EventHandler {
    /// Handle an event, return true if consumed
    fn on_event(&mut self, event: &Event) -> bool;
}

impl<F> EventHandler for F
where
    F: FnMut(&Event) -> bool,
{
    fn on_event(&mut self, event: &Event) -> bool {
        self(event)
    }
}

/// Event system with registration and queuing
/// Follows chain of responsibility pattern
pub struct EventSystem {
    queue: Vec<Event>,
    handlers: HashMap<EventType, Vec<Box<dyn EventHandler>>>,
}

impl std::fmt::Debug for EventSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSystem")
            .field("queued", &self.queue.len())
            .field("handler_types", &self.handlers.len())
            .finish()
    }
}

impl EventSystem {
    /// Create a new empty event system
    pub fn new() -> Self {
        Self {
            queue: Vec::new(),
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for a specific event type
    /// Only handlers registered for this type will be notified
    pub fn register_handler(&mut self, event_type: EventType, handler: Box<dyn EventHandler>) {
        self.handlers.entry(event_type).or_default().push(handler);
    }

    /// Number of handlers registered for `event_type`
    pub fn handler_count(&self, event_type: EventType) -> usize {
        self.handlers.get(&event_type).map_or(0, Vec::len)
    }

    /// Queue an event for the next dispatch
    pub fn send(&mut self, event: impl Into<Event>) {
        self.queue.push(event.into());
    }

    /// Events waiting for dispatch
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Deliver all queued events in send order
    pub fn dispatch(&mut self) {
        let queued = std::mem::take(&mut self.queue);
        for event in queued {
            self.dispatch_event(&event);
        }
    }

    /// Dispatch single event to registered handlers
    /// Stops on first handler that returns true (consumed)
    fn dispatch_event(&mut self, event: &Event) {
        if let Some(handlers) = self.handlers.get_mut(&event.event_type()) {
            for handler in handlers.iter_mut() {
                if handler.on_event(event) {
                    break;
                }
            }
        }
    }

    /// Drop all queued events
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

impl Default for EventSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn two_ids() -> (NodeId, NodeId) {
        let mut map: SlotMap<NodeId, ()> = SlotMap::with_key();
        (map.insert(()), map.insert(()))
    }

    fn recorder(log: &Rc<RefCell<Vec<Event>>>, consume: bool) -> Box<dyn EventHandler> {
        let log = Rc::clone(log);
        Box::new(move |event: &Event| {
            log.borrow_mut().push(*event);
            consume
        })
    }

    #[test]
    fn test_immediate_dispatch() {
        let (node, parent) = two_ids();
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut system = EventSystem::new();
        system.register_handler(EventType::Added, recorder(&log, false));

        system.send(SceneEvent::Added { node, parent });
        assert_eq!(system.pending(), 1);
        system.dispatch();
        assert_eq!(system.pending(), 0);
        assert_eq!(log.borrow().as_slice(), &[Event::Scene(SceneEvent::Added { node, parent })]);
    }

    #[test]
    fn test_only_registered_types_are_notified() {
        let (node, parent) = two_ids();
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut system = EventSystem::new();
        system.register_handler(EventType::ChildAdded, recorder(&log, false));

        system.send(SceneEvent::Removed { node, parent });
        system.dispatch();
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_event_consumption() {
        let (node, parent) = two_ids();
        let first = Rc::new(RefCell::new(Vec::new()));
        let second = Rc::new(RefCell::new(Vec::new()));
        let mut system = EventSystem::new();
        system.register_handler(EventType::Removed, recorder(&first, true));
        system.register_handler(EventType::Removed, recorder(&second, false));
        assert_eq!(system.handler_count(EventType::Removed), 2);

        system.send(SceneEvent::Removed { node, parent });
        system.dispatch();
        assert_eq!(first.borrow().len(), 1);
        assert!(second.borrow().is_empty());
    }

    #[test]
    fn test_clear_drops_queue() {
        let (node, parent) = two_ids();
        let mut system = EventSystem::new();
        system.send(SceneEvent::ChildAdded { parent, child: node });
        system.clear();
        assert_eq!(system.pending(), 0);
    }
}
