//! Publish/subscribe registry for level signals.

use std::{
    cell::RefCell,
    collections::VecDeque,
    rc::{Rc, Weak},
};

use ledge_runner_core::LevelSignal;

type Mailbox = Rc<RefCell<VecDeque<LevelSignal>>>;

#[derive(Debug, Default)]
struct Registry {
    next_id: u64,
    mailboxes: Vec<(u64, Mailbox)>,
}

/// Registry that fans level signals out to every live subscription.
///
/// Clones share the same registry.
#[derive(Clone, Debug, Default)]
pub struct LevelBus {
    registry: Rc<RefCell<Registry>>,
}

impl LevelBus {
    /// Registers a new subscriber. Signals published afterwards queue in the
    /// returned handle until drained.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        let mut registry = self.registry.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        let mailbox = Mailbox::default();
        registry.mailboxes.push((id, Rc::clone(&mailbox)));
        Subscription {
            id,
            mailbox,
            registry: Rc::downgrade(&self.registry),
        }
    }

    /// Queues the signal for every registered subscriber.
    pub fn publish(&self, signal: LevelSignal) {
        for (_, mailbox) in &self.registry.borrow().mailboxes {
            mailbox.borrow_mut().push_back(signal);
        }
    }

    /// Number of subscriptions still registered.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.registry.borrow().mailboxes.len()
    }
}

/// Scoped registration on a [`LevelBus`]. Dropping the handle deregisters it.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    mailbox: Mailbox,
    registry: Weak<RefCell<Registry>>,
}

impl Subscription {
    /// Takes every signal queued since the previous drain, oldest first.
    #[must_use]
    pub fn drain(&self) -> Vec<LevelSignal> {
        self.mailbox.borrow_mut().drain(..).collect()
    }

    /// Whether the bus this handle registered with still exists.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.registry.strong_count() > 0
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry
                .borrow_mut()
                .mailboxes
                .retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_subscriber_receives_signals_in_order() {
        let bus = LevelBus::default();
        let first = bus.subscribe();
        let second = bus.subscribe();
        bus.publish(LevelSignal::LevelChanged);
        bus.publish(LevelSignal::Reset);

        let expected = vec![LevelSignal::LevelChanged, LevelSignal::Reset];
        assert_eq!(first.drain(), expected);
        assert_eq!(second.drain(), expected);
        assert!(first.drain().is_empty());
    }

    #[test]
    fn dropping_subscription_deregisters_it() {
        let bus = LevelBus::default();
        let kept = bus.subscribe();
        {
            let _scoped = bus.subscribe();
            assert_eq!(bus.subscriber_count(), 2);
        }
        assert_eq!(bus.subscriber_count(), 1);
        bus.publish(LevelSignal::Reset);
        assert_eq!(kept.drain(), vec![LevelSignal::Reset]);
    }

    #[test]
    fn subscription_outliving_bus_is_inert() {
        let bus = LevelBus::default();
        let subscription = bus.subscribe();
        drop(bus);
        assert!(!subscription.is_connected());
        assert!(subscription.drain().is_empty());
    }

    #[test]
    fn signals_before_subscribing_are_not_delivered() {
        let bus = LevelBus::default();
        bus.publish(LevelSignal::Reset);
        let late = bus.subscribe();
        assert!(late.drain().is_empty());
    }
}
