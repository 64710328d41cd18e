//! Client core of the profile queue: the swipe queue controller, gesture
//! mapping and the Profile Service client it talks to.

pub mod config;
pub mod error;
pub mod gesture;
pub mod profiles;
pub mod queue;
pub mod service;

pub use config::{load_settings, QueueSettings};
pub use error::{ConfigError, ServiceError};
pub use gesture::{CardVisuals, GestureConfig, ReleaseAction};
pub use queue::{
    AdvanceOutcome, LoadOutcome, QueueController, QueueEvent, QueueOptions, QueuePhase,
    QueueSnapshot, ReleaseOutcome,
};
pub use service::{HttpProfileService, ProfileService};
