//! Grid snake simulation engine.
//!
//! [`game::Simulation`] is the deterministic state machine; [`engine::Engine`]
//! drives it from an instance-owned ticker thread and forwards notifications
//! to a registered [`events::Observer`].

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod fruit;
pub mod game;
pub mod input;
pub mod snake;
