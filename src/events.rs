//! Notifications raised by the simulation toward a presentation layer.

use std::sync::mpsc::Sender;

use serde::{Deserialize, Serialize};

use crate::snake::Segment;

/// Receives engine notifications.
///
/// Callbacks run synchronously on the thread that advanced the simulation.
/// Slices are only valid for the duration of the call; copy them to keep them.
pub trait Observer: Send {
    fn snake_updated(&mut self, _snake: &[Segment]) {}

    fn fruit_updated(&mut self, _fruit: Option<&Segment>) {}

    fn game_started(&mut self) {}

    fn game_over(&mut self) {}
}

/// Owned form of a notification, used by poll-based consumers.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    SnakeUpdated { snake: Vec<Segment> },
    FruitUpdated { fruit: Option<Segment> },
    GameStarted,
    GameOver,
}

/// Forwards every notification as an [`EngineEvent`] into a channel.
///
/// Events are dropped once the receiving side has hung up.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: Sender<EngineEvent>,
}

impl ChannelObserver {
    #[must_use]
    pub fn new(sender: Sender<EngineEvent>) -> Self {
        Self { sender }
    }

    fn send(&self, event: EngineEvent) {
        if self.sender.send(event).is_err() {
            log::debug!("event receiver disconnected, dropping notification");
        }
    }
}

impl Observer for ChannelObserver {
    fn snake_updated(&mut self, snake: &[Segment]) {
        self.send(EngineEvent::SnakeUpdated {
            snake: snake.to_vec(),
        });
    }

    fn fruit_updated(&mut self, fruit: Option<&Segment>) {
        self.send(EngineEvent::FruitUpdated {
            fruit: fruit.copied(),
        });
    }

    fn game_started(&mut self) {
        self.send(EngineEvent::GameStarted);
    }

    fn game_over(&mut self) {
        self.send(EngineEvent::GameOver);
    }
}

/// Dispatches notifications to the registered observer, if any.
///
/// With no observer registered every notification is a no-op.
#[derive(Default)]
pub struct Notifier {
    observer: Option<Box<dyn Observer>>,
}

impl Notifier {
    pub fn set_observer(&mut self, observer: Box<dyn Observer>) {
        self.observer = Some(observer);
    }

    #[must_use]
    pub fn has_observer(&self) -> bool {
        self.observer.is_some()
    }

    /// Delivers an owned event through the matching callback.
    pub fn dispatch(&mut self, event: &EngineEvent) {
        match event {
            EngineEvent::SnakeUpdated { snake } => self.snake_updated(snake),
            EngineEvent::FruitUpdated { fruit } => self.fruit_updated(fruit.as_ref()),
            EngineEvent::GameStarted => self.game_started(),
            EngineEvent::GameOver => self.game_over(),
        }
    }

    pub fn snake_updated(&mut self, snake: &[Segment]) {
        if let Some(observer) = self.observer.as_mut() {
            observer.snake_updated(snake);
        }
    }

    pub fn fruit_updated(&mut self, fruit: Option<&Segment>) {
        if let Some(observer) = self.observer.as_mut() {
            observer.fruit_updated(fruit);
        }
    }

    pub fn game_started(&mut self) {
        if let Some(observer) = self.observer.as_mut() {
            observer.game_started();
        }
    }

    pub fn game_over(&mut self) {
        if let Some(observer) = self.observer.as_mut() {
            observer.game_over();
        }
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("has_observer", &self.has_observer())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use crate::config::Color;
    use crate::snake::{Position, Segment};

    use super::{ChannelObserver, EngineEvent, Notifier};

    #[test]
    fn notifier_without_observer_is_noop() {
        let mut notifier = Notifier::default();

        notifier.snake_updated(&[]);
        notifier.fruit_updated(None);
        notifier.game_started();
        notifier.game_over();

        assert!(!notifier.has_observer());
    }

    #[test]
    fn channel_observer_forwards_owned_copies() {
        let (tx, rx) = mpsc::channel();
        let mut notifier = Notifier::default();
        notifier.set_observer(Box::new(ChannelObserver::new(tx)));

        let mut snake = vec![Segment::head(Position::new(40, 40), 30, Color::Red)];
        notifier.snake_updated(&snake);
        snake[0].position = Position::new(70, 40);
        notifier.game_over();

        let events: Vec<EngineEvent> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                EngineEvent::SnakeUpdated {
                    snake: vec![Segment::head(Position::new(40, 40), 30, Color::Red)],
                },
                EngineEvent::GameOver,
            ]
        );
    }

    #[test]
    fn channel_observer_survives_dropped_receiver() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let mut notifier = Notifier::default();
        notifier.set_observer(Box::new(ChannelObserver::new(tx)));

        notifier.game_started();
        notifier.fruit_updated(None);
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_string(&EngineEvent::GameStarted).expect("event serializes");
        assert_eq!(json, r#"{"type":"game_started"}"#);
    }
}
