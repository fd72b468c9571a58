//! Process-wide signal bus for operator overrides and run notifications.
//!
//! A single broadcast channel carries "force next phase" overrides,
//! participant input, and trial/phase start notices. The bus is an explicit
//! service injected into whichever components need to publish or observe
//! signals — there is no hidden global. Its lifetime is the experiment run.

use tokio::sync::broadcast;

/// Default capacity of the broadcast channel.
///
/// Signals are low-rate (operator keypresses, stage boundaries); a small
/// ring is plenty, and laggy subscribers only lose their own backlog.
const DEFAULT_CAPACITY: usize = 64;

/// A signal broadcast during an experiment run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// Operator override: the currently active phase should complete now.
    NextPhase,
    /// A participant response, forwarded to input-driven phases.
    Input {
        /// Raw response payload (keypress, button id, free text).
        value: String,
    },
    /// A trial was started.
    TrialStarted {
        /// Owning block name.
        block: String,
        /// Trial name.
        trial: String,
    },
    /// A phase was entered.
    PhaseStarted {
        /// Owning trial name.
        trial: String,
        /// Phase name.
        phase: String,
    },
}

/// Clonable publish/subscribe handle for run signals.
///
/// Publishing never blocks; subscribers poll their receivers inside their
/// own tick, so delivery is cooperative and within-tick ordered. A send
/// with no live subscribers is not an error.
#[derive(Debug, Clone)]
pub struct SignalBus {
    tx: broadcast::Sender<Signal>,
}

impl SignalBus {
    /// Creates a bus with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a bus with an explicit channel capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Opens a new subscription.
    ///
    /// Only signals published after this call are observed — phases
    /// resubscribe on entry so stale overrides from before the phase
    /// became current are never consumed.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Signal> {
        self.tx.subscribe()
    }

    /// Publishes a signal, returning the number of subscribers that
    /// received it.
    pub fn publish(&self, signal: Signal) -> usize {
        self.tx.send(signal).unwrap_or(0)
    }

    /// Broadcasts the operator "force next phase" override.
    pub fn force_next_phase(&self) -> usize {
        self.publish(Signal::NextPhase)
    }

    /// Broadcasts a participant input value.
    pub fn input(&self, value: impl Into<String>) -> usize {
        self.publish(Signal::Input {
            value: value.into(),
        })
    }

    /// Returns the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_without_subscribers_is_ok() {
        let bus = SignalBus::new();
        assert_eq!(bus.force_next_phase(), 0);
    }

    #[test]
    fn test_subscriber_receives_signal() {
        let bus = SignalBus::new();
        let mut rx = bus.subscribe();
        assert_eq!(bus.force_next_phase(), 1);
        assert_eq!(rx.try_recv().unwrap(), Signal::NextPhase);
    }

    #[test]
    fn test_subscription_does_not_see_prior_signals() {
        let bus = SignalBus::new();
        bus.force_next_phase();
        let mut rx = bus.subscribe();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_all_subscribers_notified() {
        let bus = SignalBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        assert_eq!(bus.input("space"), 2);
        let expected = Signal::Input {
            value: "space".to_string(),
        };
        assert_eq!(a.try_recv().unwrap(), expected);
        assert_eq!(b.try_recv().unwrap(), expected);
    }

    #[test]
    fn test_subscriber_count() {
        let bus = SignalBus::new();
        assert_eq!(bus.subscriber_count(), 0);
        let rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        drop(rx);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_signals_delivered_in_order() {
        let bus = SignalBus::new();
        let mut rx = bus.subscribe();
        bus.input("a");
        bus.force_next_phase();
        bus.input("b");
        assert_eq!(rx.try_recv().unwrap(), Signal::Input { value: "a".into() });
        assert_eq!(rx.try_recv().unwrap(), Signal::NextPhase);
        assert_eq!(rx.try_recv().unwrap(), Signal::Input { value: "b".into() });
    }
}
