//! Play queue
//!
//! Songs live in an append-mostly heap. Queue order is an ordered mapping of
//! heap indices plus, while shuffled, a second shuffled mapping over the same
//! indices. The current index always points into whichever mapping is active
//! (shuffled if present, else ordered).
//!
//! Heap slots are never deleted during a session. Removing a song only drops
//! its mapping entries, so heap indices stay stable. A slot referenced by
//! neither mapping is orphaned and may be reused by a later insert of an
//! equal song, which bounds heap growth under add/remove churn.

use encore_common::Song;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Contract violations raised by [`Queue`]
///
/// These indicate a bug in the caller; the queue is left unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// Position outside the active mapping
    #[error("Index {index} out of bounds for queue of length {len}")]
    InvalidIndex { index: usize, len: usize },

    /// Request that cannot be applied as given
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// Raw state that breaks the heap/mapping invariants
    #[error("Corrupt queue state: {0}")]
    Corrupt(String),
}

/// Classification of what a queue mutation changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Only the mapping changed; the current song and index are untouched
    Mapping,
    /// The current song is the same but its index moved
    Index,
    /// The current song changed
    Song,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Mapping => write!(f, "mapping"),
            ChangeKind::Index => write!(f, "index"),
            ChangeKind::Song => write!(f, "song"),
        }
    }
}

/// Immutable copy of a queue's internal state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawQueue {
    pub heap: Vec<Arc<Song>>,
    pub ordered_mapping: Vec<usize>,
    pub shuffled_mapping: Vec<usize>,
    pub index: usize,
}

impl RawQueue {
    pub fn is_shuffled(&self) -> bool {
        !self.shuffled_mapping.is_empty()
    }

    pub fn active_mapping(&self) -> &[usize] {
        if self.is_shuffled() {
            &self.shuffled_mapping
        } else {
            &self.ordered_mapping
        }
    }

    pub fn len(&self) -> usize {
        self.active_mapping().len()
    }

    pub fn is_empty(&self) -> bool {
        self.active_mapping().is_empty()
    }

    /// Songs in active order
    pub fn resolve(&self) -> Vec<Arc<Song>> {
        self.active_mapping()
            .iter()
            .filter_map(|&i| self.heap.get(i).cloned())
            .collect()
    }

    pub fn current_song(&self) -> Option<Arc<Song>> {
        self.active_mapping()
            .get(self.index)
            .and_then(|&i| self.heap.get(i).cloned())
    }

    /// Check the heap/mapping invariants
    pub fn validate(&self) -> Result<(), QueueError> {
        let heap_len = self.heap.len();
        if let Some(&bad) = self.ordered_mapping.iter().find(|&&i| i >= heap_len) {
            return Err(QueueError::Corrupt(format!(
                "ordered mapping references heap slot {} of {}",
                bad, heap_len
            )));
        }

        let mut seen = HashSet::with_capacity(self.ordered_mapping.len());
        if !self.ordered_mapping.iter().all(|i| seen.insert(*i)) {
            return Err(QueueError::Corrupt("ordered mapping repeats a heap slot".to_string()));
        }

        if self.is_shuffled() {
            let mut ordered = self.ordered_mapping.clone();
            let mut shuffled = self.shuffled_mapping.clone();
            ordered.sort_unstable();
            shuffled.sort_unstable();
            if ordered != shuffled {
                return Err(QueueError::Corrupt(
                    "shuffled mapping is not a permutation of the ordered mapping".to_string(),
                ));
            }
        }

        let len = self.len();
        if len == 0 {
            if self.index != 0 {
                return Err(QueueError::Corrupt(format!("index {} in empty queue", self.index)));
            }
        } else if self.index >= len {
            return Err(QueueError::Corrupt(format!(
                "index {} out of bounds for queue of length {}",
                self.index, len
            )));
        }
        Ok(())
    }
}

/// Heap-backed queue with stable shuffle semantics
pub struct Queue {
    heap: Vec<Arc<Song>>,
    ordered_mapping: Vec<usize>,
    shuffled_mapping: Vec<usize>,
    index: usize,
    rng: StdRng,
}

impl fmt::Debug for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("heap_len", &self.heap.len())
            .field("ordered_mapping", &self.ordered_mapping)
            .field("shuffled_mapping", &self.shuffled_mapping)
            .field("index", &self.index)
            .finish()
    }
}

impl Default for Queue {
    fn default() -> Self {
        Self::new()
    }
}

impl Queue {
    /// Empty queue with an entropy-seeded shuffle source
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Empty queue with a deterministic shuffle source
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            heap: Vec::new(),
            ordered_mapping: Vec::new(),
            shuffled_mapping: Vec::new(),
            index: 0,
            rng,
        }
    }

    pub fn is_shuffled(&self) -> bool {
        !self.shuffled_mapping.is_empty()
    }

    fn active_mapping(&self) -> &[usize] {
        if self.is_shuffled() {
            &self.shuffled_mapping
        } else {
            &self.ordered_mapping
        }
    }

    fn active_mapping_mut(&mut self) -> &mut Vec<usize> {
        if self.is_shuffled() {
            &mut self.shuffled_mapping
        } else {
            &mut self.ordered_mapping
        }
    }

    pub fn len(&self) -> usize {
        self.active_mapping().len()
    }

    pub fn is_empty(&self) -> bool {
        self.active_mapping().is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of heap slots ever allocated this session
    pub fn heap_len(&self) -> usize {
        self.heap.len()
    }

    pub fn current_song(&self) -> Option<Arc<Song>> {
        self.active_mapping()
            .get(self.index)
            .map(|&i| self.heap[i].clone())
    }

    /// Songs in active order
    pub fn resolve(&self) -> Vec<Arc<Song>> {
        self.active_mapping()
            .iter()
            .map(|&i| self.heap[i].clone())
            .collect()
    }

    /// Snapshot the internal state
    pub fn to_raw(&self) -> RawQueue {
        RawQueue {
            heap: self.heap.clone(),
            ordered_mapping: self.ordered_mapping.clone(),
            shuffled_mapping: self.shuffled_mapping.clone(),
            index: self.index,
        }
    }

    /// Replace the internal state with a previously captured one
    pub fn apply_raw(&mut self, raw: RawQueue) -> Result<(), QueueError> {
        raw.validate()?;
        self.heap = raw.heap;
        self.ordered_mapping = raw.ordered_mapping;
        self.shuffled_mapping = raw.shuffled_mapping;
        self.index = raw.index;
        Ok(())
    }

    /// Start a new session over `songs`
    ///
    /// The heap is replaced and the ordered mapping becomes the identity. The
    /// current index starts at `target` if given, at a random song if
    /// shuffled, else at 0.
    pub fn start(
        &mut self,
        target: Option<Arc<Song>>,
        songs: Vec<Arc<Song>>,
        shuffled: bool,
    ) -> Result<(), QueueError> {
        let index = match &target {
            Some(target) => songs.iter().position(|s| s == target).ok_or_else(|| {
                QueueError::InvalidCommand(format!("Target song {} is not in the queue", target.id))
            })?,
            None if shuffled && !songs.is_empty() => self.rng.gen_range(0..songs.len()),
            None => 0,
        };

        self.ordered_mapping = (0..songs.len()).collect();
        self.shuffled_mapping.clear();
        self.heap = songs;
        self.index = index;
        self.reorder(shuffled);
        Ok(())
    }

    /// Enable or disable shuffle without changing the current song
    ///
    /// Enabling always draws a fresh permutation with the current song at
    /// position 0, even if the queue is already shuffled.
    pub fn reorder(&mut self, shuffled: bool) {
        let Some(&current) = self.active_mapping().get(self.index) else {
            self.shuffled_mapping.clear();
            self.index = 0;
            return;
        };

        if shuffled {
            let mut permutation = self.active_mapping().to_vec();
            permutation.shuffle(&mut self.rng);
            if let Some(position) = permutation.iter().position(|&i| i == current) {
                permutation.rotate_left(position);
            }
            self.shuffled_mapping = permutation;
            self.index = 0;
        } else {
            self.index = self
                .ordered_mapping
                .iter()
                .position(|&i| i == current)
                .unwrap_or(0);
            self.shuffled_mapping.clear();
        }
    }

    /// Insert `songs` immediately after the current song
    pub fn play_next(&mut self, songs: Vec<Arc<Song>>) -> Result<ChangeKind, QueueError> {
        if songs.is_empty() {
            return Err(QueueError::InvalidCommand("No songs to play next".to_string()));
        }
        if self.is_empty() {
            let target = songs[0].clone();
            self.start(Some(target), songs, false)?;
            return Ok(ChangeKind::Song);
        }

        let indices = self.add_to_heap(songs);
        if self.is_shuffled() {
            let current = self.shuffled_mapping[self.index];
            let ordered_at = self
                .ordered_mapping
                .iter()
                .position(|&i| i == current)
                .map_or(self.ordered_mapping.len(), |p| p + 1);
            self.ordered_mapping
                .splice(ordered_at..ordered_at, indices.iter().copied());
        }
        let at = self.index + 1;
        self.active_mapping_mut().splice(at..at, indices);
        Ok(ChangeKind::Mapping)
    }

    /// Append `songs` to the end of the queue
    pub fn add_to_queue(&mut self, songs: Vec<Arc<Song>>) -> Result<ChangeKind, QueueError> {
        if songs.is_empty() {
            return Err(QueueError::InvalidCommand("No songs to add".to_string()));
        }
        if self.is_empty() {
            let target = songs[0].clone();
            self.start(Some(target), songs, false)?;
            return Ok(ChangeKind::Song);
        }

        let indices = self.add_to_heap(songs);
        if self.is_shuffled() {
            self.shuffled_mapping.extend_from_slice(&indices);
        }
        self.ordered_mapping.extend(indices);
        Ok(ChangeKind::Mapping)
    }

    /// Move the song at `src` to `dst` in the active mapping
    ///
    /// The inactive ordered mapping is left as-is while shuffled. The current
    /// index follows the current song; `Index` is reported whenever it moves.
    pub fn move_song(&mut self, src: usize, dst: usize) -> Result<ChangeKind, QueueError> {
        let len = self.len();
        for position in [src, dst] {
            if position >= len {
                return Err(QueueError::InvalidIndex {
                    index: position,
                    len,
                });
            }
        }

        let index = self.index;
        let mapping = self.active_mapping_mut();
        let moved = mapping.remove(src);
        mapping.insert(dst, moved);

        let new_index = if src == index {
            dst
        } else if src < index && index <= dst {
            index - 1
        } else if dst <= index && index < src {
            index + 1
        } else {
            index
        };

        if new_index != index {
            self.index = new_index;
            Ok(ChangeKind::Index)
        } else {
            Ok(ChangeKind::Mapping)
        }
    }

    /// Remove the song at `at` from the queue
    ///
    /// Removing the current song makes the next song current, wrapping to the
    /// first song if the last one was removed.
    pub fn remove(&mut self, at: usize) -> Result<ChangeKind, QueueError> {
        let len = self.len();
        if at >= len {
            return Err(QueueError::InvalidIndex { index: at, len });
        }

        if self.is_shuffled() {
            let heap_index = self.shuffled_mapping.remove(at);
            if let Some(position) = self.ordered_mapping.iter().position(|&i| i == heap_index) {
                self.ordered_mapping.remove(position);
            }
        } else {
            self.ordered_mapping.remove(at);
        }

        if at == self.index {
            if self.index >= self.len() {
                self.index = 0;
            }
            Ok(ChangeKind::Song)
        } else if at < self.index {
            self.index -= 1;
            Ok(ChangeKind::Index)
        } else {
            Ok(ChangeKind::Mapping)
        }
    }

    /// Jump to `to`; returns false if out of bounds
    pub fn goto(&mut self, to: usize) -> bool {
        if to >= self.len() {
            return false;
        }
        self.index = to;
        true
    }

    /// Clear the session entirely
    pub fn clear(&mut self) {
        self.heap.clear();
        self.ordered_mapping.clear();
        self.shuffled_mapping.clear();
        self.index = 0;
    }

    /// Place songs in the heap, reusing orphaned slots holding equal songs
    fn add_to_heap(&mut self, songs: Vec<Arc<Song>>) -> Vec<usize> {
        let mut claimed: HashSet<usize> = self
            .ordered_mapping
            .iter()
            .chain(self.shuffled_mapping.iter())
            .copied()
            .collect();

        songs
            .into_iter()
            .map(|song| {
                let orphan = self
                    .heap
                    .iter()
                    .enumerate()
                    .position(|(i, existing)| *existing == song && !claimed.contains(&i));
                let index = match orphan {
                    Some(i) => i,
                    None => {
                        self.heap.push(song);
                        self.heap.len() - 1
                    }
                };
                claimed.insert(index);
                index
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encore_common::{AlbumId, SongId};

    fn song(title: &str) -> Arc<Song> {
        Arc::new(Song {
            id: SongId::new_v4(),
            title: title.to_string(),
            uri: format!("file:///music/{}.flac", title),
            duration_ms: 180_000,
            album: AlbumId::new_v4(),
            artists: Vec::new(),
            genres: Vec::new(),
            disc: None,
            track: None,
            year: None,
        })
    }

    fn songs(titles: &[&str]) -> Vec<Arc<Song>> {
        titles.iter().map(|t| song(t)).collect()
    }

    fn titles(queue: &Queue) -> Vec<String> {
        queue.resolve().iter().map(|s| s.title.clone()).collect()
    }

    fn current_title(queue: &Queue) -> Option<String> {
        queue.current_song().map(|s| s.title.clone())
    }

    #[test]
    fn test_start_with_target() {
        let list = songs(&["a", "b", "c"]);
        let mut queue = Queue::with_seed(1);
        queue.start(Some(list[1].clone()), list, false).unwrap();

        assert_eq!(titles(&queue), vec!["a", "b", "c"]);
        assert_eq!(queue.index(), 1);
        assert!(!queue.is_shuffled());
    }

    #[test]
    fn test_start_rejects_foreign_target() {
        let list = songs(&["a", "b"]);
        let mut queue = Queue::with_seed(1);
        let result = queue.start(Some(song("x")), list, false);
        assert!(matches!(result, Err(QueueError::InvalidCommand(_))));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_start_shuffled_puts_target_first() {
        let list = songs(&["a", "b", "c", "d", "e"]);
        let mut queue = Queue::with_seed(7);
        queue.start(Some(list[3].clone()), list, true).unwrap();

        assert!(queue.is_shuffled());
        assert_eq!(queue.index(), 0);
        assert_eq!(current_title(&queue).as_deref(), Some("d"));
    }

    #[test]
    fn test_reorder_off_restores_ordered_position() {
        let list = songs(&["a", "b", "c", "d", "e"]);
        let mut queue = Queue::with_seed(3);
        queue.start(Some(list[2].clone()), list, true).unwrap();
        queue.goto(3);
        let playing = queue.current_song();

        queue.reorder(false);
        assert!(!queue.is_shuffled());
        assert_eq!(queue.current_song(), playing);
        assert_eq!(titles(&queue), vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_play_next_on_empty_starts_queue() {
        let mut queue = Queue::with_seed(1);
        let change = queue.play_next(songs(&["a", "b"])).unwrap();
        assert_eq!(change, ChangeKind::Song);
        assert_eq!(titles(&queue), vec!["a", "b"]);
        assert_eq!(queue.index(), 0);
    }

    #[test]
    fn test_play_next_splices_after_current() {
        let list = songs(&["a", "b", "c"]);
        let mut queue = Queue::with_seed(1);
        queue.start(Some(list[1].clone()), list, false).unwrap();

        let change = queue.play_next(songs(&["x", "y"])).unwrap();
        assert_eq!(change, ChangeKind::Mapping);
        assert_eq!(titles(&queue), vec!["a", "b", "x", "y", "c"]);
        assert_eq!(current_title(&queue).as_deref(), Some("b"));
    }

    #[test]
    fn test_play_next_while_shuffled_updates_both_mappings() {
        let list = songs(&["a", "b", "c", "d"]);
        let mut queue = Queue::with_seed(11);
        queue.start(Some(list[2].clone()), list, true).unwrap();
        queue.play_next(songs(&["x"])).unwrap();

        assert_eq!(queue.resolve()[1].title, "x");
        queue.reorder(false);
        assert_eq!(titles(&queue), vec!["a", "b", "c", "x", "d"]);
        assert_eq!(current_title(&queue).as_deref(), Some("c"));
    }

    #[test]
    fn test_add_to_queue_appends() {
        let list = songs(&["a", "b"]);
        let mut queue = Queue::with_seed(1);
        queue.start(None, list, false).unwrap();
        assert_eq!(queue.add_to_queue(songs(&["c"])).unwrap(), ChangeKind::Mapping);
        assert_eq!(titles(&queue), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_move_tracks_current_song() {
        let list = songs(&["a", "b", "c", "d", "e"]);
        let mut queue = Queue::with_seed(1);
        queue.start(Some(list[2].clone()), list, false).unwrap();

        // Current song moved
        assert_eq!(queue.move_song(2, 4).unwrap(), ChangeKind::Index);
        assert_eq!(queue.index(), 4);
        assert_eq!(current_title(&queue).as_deref(), Some("c"));

        // Song moved from before current to after it
        queue.goto(2);
        assert_eq!(current_title(&queue).as_deref(), Some("d"));
        assert_eq!(queue.move_song(0, 3).unwrap(), ChangeKind::Index);
        assert_eq!(current_title(&queue).as_deref(), Some("d"));

        // Both ends after current
        let index = queue.index();
        assert_eq!(queue.move_song(3, 4).unwrap(), ChangeKind::Mapping);
        assert_eq!(queue.index(), index);
    }

    #[test]
    fn test_move_out_of_bounds() {
        let mut queue = Queue::with_seed(1);
        queue.start(None, songs(&["a", "b"]), false).unwrap();
        assert_eq!(
            queue.move_song(0, 2),
            Err(QueueError::InvalidIndex { index: 2, len: 2 })
        );
    }

    #[test]
    fn test_remove_classification() {
        let list = songs(&["a", "b", "c", "d"]);
        let mut queue = Queue::with_seed(1);
        queue.start(Some(list[1].clone()), list, false).unwrap();

        assert_eq!(queue.remove(3).unwrap(), ChangeKind::Mapping);
        assert_eq!(queue.remove(0).unwrap(), ChangeKind::Index);
        assert_eq!(queue.index(), 0);
        assert_eq!(current_title(&queue).as_deref(), Some("b"));
        assert_eq!(queue.remove(0).unwrap(), ChangeKind::Song);
        assert_eq!(current_title(&queue).as_deref(), Some("c"));
    }

    #[test]
    fn test_remove_last_current_wraps_to_start() {
        let list = songs(&["a", "b", "c"]);
        let mut queue = Queue::with_seed(1);
        queue.start(Some(list[2].clone()), list, false).unwrap();

        assert_eq!(queue.remove(2).unwrap(), ChangeKind::Song);
        assert_eq!(queue.index(), 0);
        assert_eq!(current_title(&queue).as_deref(), Some("a"));
    }

    #[test]
    fn test_remove_only_song_empties_queue() {
        let mut queue = Queue::with_seed(1);
        queue.start(None, songs(&["a"]), false).unwrap();
        assert_eq!(queue.remove(0).unwrap(), ChangeKind::Song);
        assert!(queue.is_empty());
        assert_eq!(queue.index(), 0);
        assert!(queue.current_song().is_none());
    }

    #[test]
    fn test_goto_bounds() {
        let mut queue = Queue::with_seed(1);
        queue.start(None, songs(&["a", "b"]), false).unwrap();
        assert!(queue.goto(1));
        assert!(!queue.goto(2));
        assert_eq!(queue.index(), 1);
    }

    #[test]
    fn test_orphan_reuse_within_one_batch() {
        let list = songs(&["a", "b"]);
        let a = list[0].clone();
        let mut queue = Queue::with_seed(1);
        queue.start(None, list, false).unwrap();
        queue.add_to_queue(vec![a.clone()]).unwrap();
        queue.remove(2).unwrap();
        assert_eq!(queue.heap_len(), 3);

        // One orphan for `a` exists; the second copy needs a fresh slot
        queue.add_to_queue(vec![a.clone(), a.clone()]).unwrap();
        assert_eq!(queue.heap_len(), 4);
        queue.to_raw().validate().unwrap();
    }

    #[test]
    fn test_apply_raw_rejects_corrupt_state() {
        let list = songs(&["a", "b"]);
        let mut queue = Queue::with_seed(1);
        let raw = RawQueue {
            heap: list,
            ordered_mapping: vec![0, 1],
            shuffled_mapping: vec![0],
            index: 0,
        };
        assert!(matches!(queue.apply_raw(raw), Err(QueueError::Corrupt(_))));

        let raw = RawQueue {
            heap: songs(&["a"]),
            ordered_mapping: vec![0, 3],
            shuffled_mapping: Vec::new(),
            index: 0,
        };
        assert!(matches!(queue.apply_raw(raw), Err(QueueError::Corrupt(_))));
    }
}
