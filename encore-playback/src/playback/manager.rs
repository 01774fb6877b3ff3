//! Playback state manager
//!
//! The single writer of playback state. Every intent is funneled through one
//! async lock to the attached [`PlaybackStateHolder`], so at most one mutation
//! is in flight at a time. The ack each call returns is mirrored into a
//! [`PlaybackSnapshot`], published for readers, turned into a fine-grained
//! [`PlaybackEvent`] and scheduled for saving.
//!
//! Phases:
//! - `NoHolder`: intents are rejected; deferred actions accumulate
//! - `Idle`: holder attached, queue empty
//! - `Active`: holder attached, queue non-empty
//!
//! Detaching a holder keeps the mirrored state so the next holder to attach
//! can be asked to adopt it.

use crate::db::{PersistenceRepository, SavedState, StateSaver};
use crate::error::{Error, Result};
use crate::playback::command::PlaybackCommand;
use crate::playback::engine::EngineEvent;
use crate::playback::events::{EventBus, PlaybackEvent, QueueChange, QueueInstructions};
use crate::playback::holder::PlaybackStateHolder;
use crate::playback::progression::Progression;
use crate::playback::queue::{ChangeKind, RawQueue};
use crate::playback::state::{PlaybackPhase, PlaybackSnapshot, StateReader};
use crate::playback::types::{DeferredOutcome, DeferredPlayback, RepeatMode, StateAck};
use encore_common::time::{millis_to_duration, now};
use encore_common::{MusicParent, PlaybackSettings, Song};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex};
use tracing::{debug, error, info, warn};

/// Identifies an attached holder
///
/// Calls carrying the handle of a holder that has since been detached are
/// discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HolderHandle {
    id: u64,
}

impl HolderHandle {
    pub fn id(&self) -> u64 {
        self.id
    }
}

struct AttachedHolder {
    id: u64,
    holder: Box<dyn PlaybackStateHolder>,
}

struct ManagerInner {
    holder: Option<AttachedHolder>,
    pending: VecDeque<DeferredPlayback>,
    next_id: u64,
    mirror: PlaybackSnapshot,
}

impl ManagerInner {
    fn is_current(&self, handle: HolderHandle) -> bool {
        self.holder.as_ref().is_some_and(|h| h.id == handle.id)
    }

    fn require_holder(&self, intent: &str) -> Result<()> {
        if self.holder.is_none() {
            debug!(intent, "Rejecting intent with no holder attached");
            return Err(Error::NoHolder(intent.to_string()));
        }
        Ok(())
    }
}

/// Stored session read ahead of a restore, outside the manager lock
enum SavedLoad {
    /// No restore was pending when the drain started
    NotRead,
    Read(Option<SavedState>),
    Failed(String),
}

/// A single call into the holder
enum Intent {
    NewPlayback(PlaybackCommand),
    Playing(bool),
    SeekTo(u64),
    RepeatMode(RepeatMode),
    Next,
    Prev,
    Goto(usize),
    PlayNext(Vec<Arc<Song>>),
    AddToQueue(Vec<Arc<Song>>),
    Move { from: usize, to: usize },
    Remove(usize),
    Shuffled(bool),
    EndSession,
    Reset,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intent::NewPlayback(command) => {
                write!(f, "new_playback({} songs)", command.queue().len())
            }
            Intent::Playing(playing) => write!(f, "playing({})", playing),
            Intent::SeekTo(position_ms) => write!(f, "seek_to({}ms)", position_ms),
            Intent::RepeatMode(mode) => write!(f, "repeat_mode({})", mode),
            Intent::Next => write!(f, "next"),
            Intent::Prev => write!(f, "prev"),
            Intent::Goto(index) => write!(f, "goto({})", index),
            Intent::PlayNext(songs) => write!(f, "play_next({} songs)", songs.len()),
            Intent::AddToQueue(songs) => write!(f, "add_to_queue({} songs)", songs.len()),
            Intent::Move { from, to } => write!(f, "move({}, {})", from, to),
            Intent::Remove(at) => write!(f, "remove({})", at),
            Intent::Shuffled(shuffled) => write!(f, "shuffled({})", shuffled),
            Intent::EndSession => write!(f, "end_session"),
            Intent::Reset => write!(f, "reset"),
        }
    }
}

async fn dispatch(
    holder: &mut dyn PlaybackStateHolder,
    intent: Intent,
) -> Result<Option<StateAck>> {
    match intent {
        Intent::NewPlayback(command) => holder.new_playback(command).await,
        Intent::Playing(playing) => holder.playing(playing).await,
        Intent::SeekTo(position_ms) => holder.seek_to(position_ms).await,
        Intent::RepeatMode(mode) => holder.set_repeat_mode(mode).await,
        Intent::Next => holder.next().await,
        Intent::Prev => holder.prev().await,
        Intent::Goto(index) => holder.goto(index).await,
        Intent::PlayNext(songs) => holder.play_next(songs).await,
        Intent::AddToQueue(songs) => holder.add_to_queue(songs).await,
        Intent::Move { from, to } => holder.move_song(from, to).await,
        Intent::Remove(at) => holder.remove(at).await,
        Intent::Shuffled(shuffled) => holder.shuffled(shuffled).await,
        Intent::EndSession => holder.end_session().await,
        Intent::Reset => holder.reset().await,
    }
}

/// Classify a queue ack by comparing the mirror before and after it
fn queue_change(
    old: &PlaybackSnapshot,
    new: &PlaybackSnapshot,
    instructions: QueueInstructions,
) -> QueueChange {
    let kind = if old.current_song() != new.current_song() {
        ChangeKind::Song
    } else if old.queue.index != new.queue.index {
        ChangeKind::Index
    } else {
        ChangeKind::Mapping
    };
    QueueChange { kind, instructions }
}

/// Whether an ack's positions are consistent with the queue it produced
fn instructions_in_bounds(
    instructions: &QueueInstructions,
    old_len: usize,
    new_len: usize,
) -> bool {
    match *instructions {
        QueueInstructions::Insert { at, size } => at + size <= new_len,
        QueueInstructions::Move { from, to } => from < new_len && to < new_len,
        QueueInstructions::Remove { at, size } => {
            at + size <= old_len && old_len - size == new_len
        }
        QueueInstructions::Replace { .. } => true,
    }
}

pub struct PlaybackStateManager {
    inner: Mutex<ManagerInner>,
    state_tx: watch::Sender<Arc<PlaybackSnapshot>>,
    events: EventBus,
    saver: Option<StateSaver>,
    pause_on_repeat: bool,
}

impl PlaybackStateManager {
    /// Manager without persistence
    pub fn new(settings: &PlaybackSettings) -> Self {
        let (state_tx, _) = watch::channel(Arc::new(PlaybackSnapshot::empty()));
        Self {
            inner: Mutex::new(ManagerInner {
                holder: None,
                pending: VecDeque::new(),
                next_id: 0,
                mirror: PlaybackSnapshot::empty(),
            }),
            state_tx,
            events: EventBus::new(settings.event_capacity),
            saver: None,
            pause_on_repeat: settings.pause_on_repeat,
        }
    }

    /// Manager that saves its state after every change
    pub fn with_persistence(
        settings: &PlaybackSettings,
        repository: Arc<dyn PersistenceRepository>,
    ) -> Self {
        let mut manager = Self::new(settings);
        let debounce = millis_to_duration(settings.save_debounce_ms);
        manager.saver = Some(StateSaver::new(repository, debounce));
        manager
    }

    // ---- Readers ----

    pub fn reader(&self) -> StateReader {
        StateReader::new(self.state_tx.subscribe())
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.events.subscribe()
    }

    /// Last published state
    pub fn snapshot(&self) -> Arc<PlaybackSnapshot> {
        self.state_tx.borrow().clone()
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.state_tx.borrow().phase
    }

    pub fn current_song(&self) -> Option<Arc<Song>> {
        self.state_tx.borrow().current_song()
    }

    pub fn resolve_queue(&self) -> Vec<Arc<Song>> {
        self.state_tx.borrow().queue.resolve()
    }

    pub fn raw_queue(&self) -> RawQueue {
        self.state_tx.borrow().queue.clone()
    }

    pub fn parent(&self) -> Option<MusicParent> {
        self.state_tx.borrow().parent.clone()
    }

    pub fn progression(&self) -> Progression {
        self.state_tx.borrow().progression
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.state_tx.borrow().repeat_mode
    }

    pub fn is_shuffled(&self) -> bool {
        self.state_tx.borrow().is_shuffled()
    }

    /// Deferred actions still waiting, in drain order
    pub async fn pending_actions(&self) -> Vec<DeferredPlayback> {
        self.inner.lock().await.pending.iter().cloned().collect()
    }

    /// Serializable form of the last published state
    pub fn to_saved_state(&self) -> Option<SavedState> {
        SavedState::from_snapshot(&self.snapshot())
    }

    // ---- Holder lifecycle ----

    /// Attach a holder
    ///
    /// If a previous session is mirrored, the holder is first asked to adopt
    /// it. Pending deferred actions are then drained.
    pub async fn register_holder(
        &self,
        holder: Box<dyn PlaybackStateHolder>,
    ) -> Result<HolderHandle> {
        let saved = self.read_ahead(None, true).await;
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        if let Some(attached) = &inner.holder {
            return Err(Error::InvalidState(format!("Holder {} is already attached", attached.id)));
        }

        inner.next_id += 1;
        let handle = HolderHandle { id: inner.next_id };
        inner.holder = Some(AttachedHolder {
            id: handle.id,
            holder,
        });
        info!(handle = handle.id, "Playback state holder attached");
        self.events.emit_lossy(PlaybackEvent::HolderAttached {
            handle: handle.id,
            timestamp: now(),
        });

        if inner.mirror.queue.is_empty() {
            inner.mirror.phase = PlaybackPhase::Idle;
            self.publish(inner);
        } else {
            self.replay_mirror(inner).await;
        }

        self.drain_deferred(inner, saved).await;
        Ok(handle)
    }

    /// Detach a holder, keeping the mirrored state
    pub async fn unregister_holder(&self, handle: HolderHandle) -> Result<()> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        if !inner.is_current(handle) {
            warn!(handle = handle.id, "Ignoring detach of a holder that is not attached");
            return Err(Error::StaleHolder(handle.id));
        }

        inner.holder = None;
        let position_ms = inner.mirror.progression.elapsed_position_ms();
        inner.mirror.progression = Progression::new(false, false, position_ms);
        inner.mirror.phase = PlaybackPhase::NoHolder;
        self.publish(inner);
        info!(handle = handle.id, "Playback state holder detached");
        self.events.emit_lossy(PlaybackEvent::HolderDetached {
            handle: handle.id,
            timestamp: now(),
        });
        Ok(())
    }

    /// Ask the holder to drain deferred actions again, e.g. once the library loads
    pub async fn request_action(&self, handle: HolderHandle) -> Result<()> {
        let saved = self.read_ahead(None, false).await;
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        if !inner.is_current(handle) {
            warn!(handle = handle.id, "Discarding action request from stale holder");
            return Err(Error::StaleHolder(handle.id));
        }
        self.drain_deferred(inner, saved).await;
        Ok(())
    }

    // ---- Intents ----

    /// Start a new session; supersedes pending deferred actions
    pub async fn new_playback(&self, command: PlaybackCommand) -> Result<()> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        inner.require_holder("new_playback")?;
        Self::supersede_pending(inner, "new playback");
        self.submit(inner, Intent::NewPlayback(command)).await
    }

    pub async fn playing(&self, playing: bool) -> Result<()> {
        self.submit_one(Intent::Playing(playing)).await
    }

    pub async fn seek_to(&self, position_ms: u64) -> Result<()> {
        self.submit_one(Intent::SeekTo(position_ms)).await
    }

    pub async fn set_repeat_mode(&self, repeat_mode: RepeatMode) -> Result<()> {
        self.submit_one(Intent::RepeatMode(repeat_mode)).await
    }

    pub async fn next(&self) -> Result<()> {
        self.submit_one(Intent::Next).await
    }

    pub async fn prev(&self) -> Result<()> {
        self.submit_one(Intent::Prev).await
    }

    pub async fn goto(&self, index: usize) -> Result<()> {
        self.submit_one(Intent::Goto(index)).await
    }

    pub async fn play_next(&self, songs: Vec<Arc<Song>>) -> Result<()> {
        self.submit_one(Intent::PlayNext(songs)).await
    }

    pub async fn add_to_queue(&self, songs: Vec<Arc<Song>>) -> Result<()> {
        self.submit_one(Intent::AddToQueue(songs)).await
    }

    pub async fn move_song(&self, from: usize, to: usize) -> Result<()> {
        self.submit_one(Intent::Move { from, to }).await
    }

    pub async fn remove(&self, at: usize) -> Result<()> {
        self.submit_one(Intent::Remove(at)).await
    }

    pub async fn shuffled(&self, shuffled: bool) -> Result<()> {
        self.submit_one(Intent::Shuffled(shuffled)).await
    }

    /// Queue a deferred action and drain if a holder is attached
    ///
    /// A pending action of the same kind is replaced.
    pub async fn play_deferred(&self, action: DeferredPlayback) {
        let saved = self.read_ahead(Some(&action), false).await;
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        let before = inner.pending.len();
        inner.pending.retain(|pending| !pending.same_kind(&action));
        if inner.pending.len() != before {
            debug!(action = %action, "Superseded pending action of the same kind");
        }
        debug!(action = %action, "Queued deferred action");
        inner.pending.push_back(action);

        if inner.holder.is_some() {
            self.drain_deferred(inner, saved).await;
        }
    }

    /// Save immediately, then discard the session
    pub async fn end_session(&self) -> Result<()> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        inner.require_holder("end_session")?;
        Self::supersede_pending(inner, "session end");

        if let Some(saver) = &self.saver {
            let snapshot = inner.mirror.clone();
            if let Err(e) = saver.save_now(&snapshot).await {
                error!("Failed to save playback state at session end: {}", e);
            }
        }
        self.submit(inner, Intent::EndSession).await
    }

    /// Discard the session without saving it
    pub async fn reset(&self) -> Result<()> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        inner.require_holder("reset")?;
        Self::supersede_pending(inner, "reset");
        self.submit(inner, Intent::Reset).await
    }

    /// Save the mirrored state now, bypassing the debounce
    pub async fn save_now(&self) -> Result<()> {
        let Some(saver) = &self.saver else {
            return Ok(());
        };
        let snapshot = self.snapshot();
        saver.save_now(&snapshot).await
    }

    /// Translate an engine notification into holder calls or acks
    pub async fn on_engine_event(&self, handle: HolderHandle, event: EngineEvent) -> Result<()> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        if !inner.is_current(handle) {
            warn!(handle = handle.id, ?event, "Discarding engine event from stale holder");
            return Ok(());
        }

        match event {
            EngineEvent::TrackEnded => {
                if inner.mirror.repeat_mode == RepeatMode::Track {
                    self.submit(inner, Intent::SeekTo(0)).await?;
                    if self.pause_on_repeat {
                        self.submit(inner, Intent::Playing(false)).await?;
                    }
                    Ok(())
                } else {
                    self.submit(inner, Intent::Next).await
                }
            }
            EngineEvent::PlayingChanged(_)
            | EngineEvent::BufferingChanged(_)
            | EngineEvent::PositionDiscontinuity => {
                self.apply_ack(inner, StateAck::ProgressionChanged);
                Ok(())
            }
            EngineEvent::Failed { reason } => {
                self.fail_engine(inner, &reason).await;
                Ok(())
            }
        }
    }

    // ---- Internals ----

    async fn submit_one(&self, intent: Intent) -> Result<()> {
        let mut guard = self.inner.lock().await;
        self.submit(&mut guard, intent).await
    }

    async fn submit(&self, inner: &mut ManagerInner, intent: Intent) -> Result<()> {
        let label = intent.to_string();
        let Some(attached) = inner.holder.as_mut() else {
            debug!(intent = %label, "Rejecting intent with no holder attached");
            return Err(Error::NoHolder(label));
        };
        debug!(intent = %label, "Playback intent");

        match dispatch(attached.holder.as_mut(), intent).await {
            Ok(Some(ack)) => {
                self.apply_ack(inner, ack);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(Error::Engine(reason)) => {
                self.fail_engine(inner, &reason).await;
                Err(Error::Engine(reason))
            }
            Err(e) => {
                debug!(intent = %label, "Intent rejected: {}", e);
                Err(e)
            }
        }
    }

    fn supersede_pending(inner: &mut ManagerInner, reason: &str) {
        if !inner.pending.is_empty() {
            debug!(count = inner.pending.len(), "Dropping pending deferred actions for {}", reason);
            inner.pending.clear();
        }
    }

    /// Ask a freshly attached holder to adopt the mirrored session
    async fn replay_mirror(&self, inner: &mut ManagerInner) {
        let mirror = inner.mirror.clone();
        let Some(attached) = inner.holder.as_mut() else {
            return;
        };
        debug!(songs = mirror.queue.len(), "Replaying mirrored state into new holder");

        let result = attached
            .holder
            .apply_saved_state(
                mirror.parent.clone(),
                mirror.queue.clone(),
                mirror.progression.elapsed_position_ms(),
                mirror.repeat_mode,
            )
            .await;

        match result {
            Ok(Some(ack)) => self.apply_ack(inner, ack),
            Ok(None) => {
                inner.mirror.phase = PlaybackPhase::Active;
                self.publish(inner);
            }
            Err(Error::Engine(reason)) => self.fail_engine(inner, &reason).await,
            Err(e) => {
                warn!("Holder could not adopt mirrored state: {}", e);
                self.reset_holder(inner).await;
            }
        }
    }

    /// Read the stored session if a restore is about to be drained
    ///
    /// Runs before the manager lock is taken so slow storage never blocks
    /// other intents.
    async fn read_ahead(&self, incoming: Option<&DeferredPlayback>, attaching: bool) -> SavedLoad {
        let wanted = {
            let inner = self.inner.lock().await;
            (attaching || inner.holder.is_some())
                && incoming
                    .into_iter()
                    .chain(inner.pending.iter())
                    .any(|action| matches!(action, DeferredPlayback::RestoreSavedState { .. }))
        };
        if !wanted {
            return SavedLoad::NotRead;
        }

        let Some(saver) = &self.saver else {
            return SavedLoad::Read(None);
        };
        match saver.repository().load().await {
            Ok(saved) => SavedLoad::Read(saved),
            Err(e) => SavedLoad::Failed(format!("Failed to read saved state: {}", e)),
        }
    }

    async fn drain_deferred(&self, inner: &mut ManagerInner, mut saved: SavedLoad) {
        while let Some(action) = inner.pending.pop_front() {
            if inner.holder.is_none() {
                inner.pending.push_front(action);
                return;
            }

            let stored = match &action {
                DeferredPlayback::RestoreSavedState { .. } => {
                    match std::mem::replace(&mut saved, SavedLoad::NotRead) {
                        SavedLoad::Read(stored) => stored,
                        SavedLoad::Failed(reason) => {
                            self.deferred_failed(action, reason);
                            continue;
                        }
                        SavedLoad::NotRead => {
                            debug!(action = %action, "Saved state not read yet, keeping it queued");
                            inner.pending.push_front(action);
                            return;
                        }
                    }
                }
                _ => None,
            };

            let Some(attached) = inner.holder.as_mut() else {
                inner.pending.push_front(action);
                return;
            };
            debug!(action = %action, "Handling deferred action");

            match attached.holder.handle_deferred(&action, stored.as_ref()).await {
                Ok(DeferredOutcome::Retry) => {
                    debug!(action = %action, "Deferred action not ready, keeping it queued");
                    inner.pending.push_front(action);
                    return;
                }
                Ok(DeferredOutcome::Handled(ack)) => {
                    if let Some(ack) = ack {
                        self.apply_ack(inner, ack);
                    }
                }
                Ok(DeferredOutcome::Failed(reason)) => self.deferred_failed(action, reason),
                Err(Error::Engine(reason)) => {
                    self.deferred_failed(action, reason.clone());
                    self.fail_engine(inner, &reason).await;
                }
                Err(e) => self.deferred_failed(action, e.to_string()),
            }
        }
    }

    fn deferred_failed(&self, action: DeferredPlayback, reason: String) {
        warn!(action = %action, "Deferred action failed: {}", reason);
        self.events.emit_lossy(PlaybackEvent::DeferredFailed {
            action,
            reason,
            timestamp: now(),
        });
    }

    /// Report an engine failure and fall back to an idle session
    async fn fail_engine(&self, inner: &mut ManagerInner, reason: &str) {
        error!("Engine failure: {}", reason);
        self.events.emit_lossy(PlaybackEvent::EngineFailed {
            reason: reason.to_string(),
            timestamp: now(),
        });
        self.reset_holder(inner).await;
    }

    async fn reset_holder(&self, inner: &mut ManagerInner) {
        let Some(attached) = inner.holder.as_mut() else {
            return;
        };
        match attached.holder.reset().await {
            Ok(Some(ack)) => self.apply_ack(inner, ack),
            Ok(None) => {}
            Err(e) => error!("Failed to reset holder: {}", e),
        }
    }

    /// Mirror the holder's state after `ack` and notify observers
    fn apply_ack(&self, inner: &mut ManagerInner, ack: StateAck) {
        let Some(attached) = inner.holder.as_ref() else {
            warn!(?ack, "Discarding ack with no holder attached");
            return;
        };
        debug!(?ack, "Applying ack");

        let holder = &attached.holder;
        let queue = holder.resolve_queue();
        let phase = if queue.is_empty() { PlaybackPhase::Idle } else { PlaybackPhase::Active };
        let updated = PlaybackSnapshot {
            phase,
            queue,
            parent: holder.parent(),
            progression: holder.progression(),
            repeat_mode: holder.repeat_mode(),
        };
        let old = std::mem::replace(&mut inner.mirror, updated);
        let new = &inner.mirror;

        let timestamp = now();
        let event = match ack {
            StateAck::IndexMoved => PlaybackEvent::IndexMoved {
                index: new.queue.index,
                song_id: new.current_song().map(|s| s.id),
                timestamp,
            },
            StateAck::PlayNext { at, size } | StateAck::AddToQueue { at, size } => {
                self.queue_changed(&old, new, QueueInstructions::Insert { at, size }, timestamp)
            }
            StateAck::Move { from, to } => {
                self.queue_changed(&old, new, QueueInstructions::Move { from, to }, timestamp)
            }
            StateAck::Remove { index } => {
                let instructions = QueueInstructions::Remove {
                    at: index,
                    size: 1,
                };
                self.queue_changed(&old, new, instructions, timestamp)
            }
            StateAck::QueueReordered => PlaybackEvent::QueueReordered {
                shuffled: new.is_shuffled(),
                index: new.queue.index,
                timestamp,
            },
            StateAck::NewPlayback => PlaybackEvent::NewPlayback {
                parent: new.parent.as_ref().map(MusicParent::id),
                song_id: new.current_song().map(|s| s.id),
                queue_len: new.queue.len(),
                shuffled: new.is_shuffled(),
                timestamp,
            },
            StateAck::ProgressionChanged => PlaybackEvent::ProgressionChanged {
                is_playing: new.progression.is_playing(),
                is_advancing: new.progression.is_advancing(),
                position_ms: new.progression.init_position_ms(),
                timestamp,
            },
            StateAck::RepeatModeChanged => PlaybackEvent::RepeatModeChanged {
                repeat_mode: new.repeat_mode,
                timestamp,
            },
            StateAck::SessionEnded => PlaybackEvent::SessionEnded { timestamp },
        };

        let snapshot = self.publish(inner);
        if let Some(saver) = &self.saver {
            match ack {
                // Saved right before the session ended; keep it
                StateAck::SessionEnded => saver.cancel(),
                _ => saver.schedule(snapshot),
            }
        }
        self.events.emit_lossy(event);
    }

    fn queue_changed(
        &self,
        old: &PlaybackSnapshot,
        new: &PlaybackSnapshot,
        instructions: QueueInstructions,
        timestamp: chrono::DateTime<chrono::Utc>,
    ) -> PlaybackEvent {
        let in_bounds = instructions_in_bounds(&instructions, old.queue.len(), new.queue.len());
        let instructions = if in_bounds {
            instructions
        } else {
            warn!(?instructions, "Ack does not match queue shape, asking observers to reload");
            QueueInstructions::Replace { from: 0 }
        };
        PlaybackEvent::QueueChanged {
            change: queue_change(old, new, instructions),
            index: new.queue.index,
            timestamp,
        }
    }

    fn publish(&self, inner: &ManagerInner) -> Arc<PlaybackSnapshot> {
        let snapshot = Arc::new(inner.mirror.clone());
        self.state_tx.send_replace(snapshot.clone());
        snapshot
    }
}
