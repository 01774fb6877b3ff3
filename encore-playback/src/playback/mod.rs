//! Playback queue and state orchestration

pub mod command;
pub mod engine;
pub mod events;
pub mod holder;
pub mod manager;
pub mod progression;
pub mod queue;
pub mod state;
pub mod types;

pub use command::{CommandFactory, PlaybackCommand, ShuffleMode};
pub use engine::{AudioEngine, EngineEvent, EngineStateHolder, SimulatedEngine};
pub use events::{EventBus, PlaybackEvent, QueueChange, QueueInstructions};
pub use holder::PlaybackStateHolder;
pub use manager::{HolderHandle, PlaybackStateManager};
pub use progression::Progression;
pub use queue::{ChangeKind, Queue, QueueError, RawQueue};
pub use state::{PlaybackPhase, PlaybackSnapshot, StateReader};
pub use types::{DeferredOutcome, DeferredPlayback, RepeatMode, StateAck};
