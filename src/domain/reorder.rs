//! Deferred sibling reordering.
//!
//! A reorder request first tags the node and the sibling it will swap with
//! for animation, and only splices the list once its delay has elapsed (or
//! the queue is flushed). Time is passed in by the caller so the queue stays
//! deterministic.
//!
//! At most one move is pending per node; a new request for the same node
//! replaces the pending one.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::domain::error::DomainResult;
use crate::domain::mutator::{Direction, TreeMutator};
use crate::domain::node::{MoveAnimation, NodeId};
use crate::domain::store::NodeStore;

/// A queued move waiting for its commit time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingMove {
    pub node: NodeId,
    pub direction: Direction,
    pub partner: NodeId,
    pub due: Instant,
}

#[derive(Debug, Clone)]
pub struct ReorderQueue {
    delay: Duration,
    pending: Vec<PendingMove>,
}

impl ReorderQueue {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Vec::new(),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn pending_for(&self, id: NodeId) -> Option<&PendingMove> {
        self.pending.iter().find(|m| m.node == id)
    }

    /// Earliest commit time, if anything is queued.
    pub fn next_due(&self) -> Option<Instant> {
        self.pending.iter().map(|m| m.due).min()
    }

    /// Queue a move of `id`, replacing any move already pending for it.
    ///
    /// Returns false (and queues nothing) if `id` is already at the edge in
    /// that direction.
    pub fn request(
        &mut self,
        store: &mut NodeStore,
        id: NodeId,
        direction: Direction,
        now: Instant,
    ) -> DomainResult<bool> {
        let siblings = store.siblings(id).unwrap_or(&[]).to_vec();
        store.node(id)?;

        if let Some(old) = self.take(id) {
            debug!("reorder: {} replaces pending {:?}", id, old.direction);
            self.retag(store, &[old]);
        }

        let Some(pos) = siblings.iter().position(|&s| s == id) else {
            return Ok(false);
        };
        let partner = match direction {
            Direction::Up if pos > 0 => siblings[pos - 1],
            Direction::Down if pos + 1 < siblings.len() => siblings[pos + 1],
            _ => return Ok(false),
        };

        let queued = PendingMove {
            node: id,
            direction,
            partner,
            due: now + self.delay,
        };
        self.pending.push(queued);
        self.retag(store, &[]);
        debug!("reorder: queued {} {:?}", id, direction);
        Ok(true)
    }

    /// Commit every move due at `now`, in request order. Returns moved ids.
    pub fn poll(&mut self, store: &mut NodeStore, now: Instant) -> DomainResult<Vec<NodeId>> {
        let (due, waiting): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|m| m.due <= now);
        self.pending = waiting;
        self.commit(store, due)
    }

    /// Commit everything immediately.
    pub fn flush(&mut self, store: &mut NodeStore) -> DomainResult<Vec<NodeId>> {
        let all = std::mem::take(&mut self.pending);
        self.commit(store, all)
    }

    /// Drop all pending moves and clear their tags (editor teardown).
    pub fn cancel_all(&mut self, store: &mut NodeStore) {
        let dropped = std::mem::take(&mut self.pending);
        if !dropped.is_empty() {
            debug!("reorder: cancelled {} pending moves", dropped.len());
        }
        self.retag(store, &dropped);
    }

    fn commit(
        &mut self,
        store: &mut NodeStore,
        moves: Vec<PendingMove>,
    ) -> DomainResult<Vec<NodeId>> {
        self.retag(store, &moves);
        let mut moved = Vec::new();
        for m in moves {
            // The node may have been deleted since the request.
            if !store.contains(m.node) {
                continue;
            }
            if TreeMutator::new(store).shift(m.node, m.direction)? {
                moved.push(m.node);
            }
        }
        Ok(moved)
    }

    fn take(&mut self, id: NodeId) -> Option<PendingMove> {
        let pos = self.pending.iter().position(|m| m.node == id)?;
        Some(self.pending.remove(pos))
    }

    /// Clear tags of `released` moves, then re-apply tags of pending ones.
    fn retag(&self, store: &mut NodeStore, released: &[PendingMove]) {
        for m in released {
            for id in [m.node, m.partner] {
                if let Some(node) = store.get_mut(id) {
                    node.ui.animation = None;
                }
            }
        }
        for m in &self.pending {
            let (own, other) = match m.direction {
                Direction::Up => (MoveAnimation::Up, MoveAnimation::Down),
                Direction::Down => (MoveAnimation::Down, MoveAnimation::Up),
            };
            if let Some(node) = store.get_mut(m.node) {
                node.ui.animation = Some(own);
            }
            if let Some(node) = store.get_mut(m.partner) {
                node.ui.animation = Some(other);
            }
        }
    }
}
