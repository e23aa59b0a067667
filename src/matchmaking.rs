//! Waiting queue for challenges aimed at busy players.
//!
//! When a session finishes, each freed player is offered to the oldest entry
//! waiting on them. Entries whose waiting player went offline or started
//! another game in the meantime are discarded on the way.

use tracing::{debug, info};

use crate::coordinator::{self, ChallengeOutcome};
use crate::ids::{self, IdKind};
use crate::state::{Challenge, Document, WaitingQueueEntry};

/// Queue `waiting` behind `target`.
///
/// Idempotent: if the ordered pair is already queued, the existing entry is
/// returned with `false`.
pub fn enqueue(doc: &mut Document, waiting: &str, target: &str, now: u64) -> (WaitingQueueEntry, bool) {
    if let Some(existing) = doc.waiting_queue.iter().find(|e| e.matches(waiting, target)) {
        return (existing.clone(), false);
    }
    let entry = WaitingQueueEntry {
        id: ids::generate(IdKind::Queue, now, |id| doc.id_taken(id)),
        waiting_player: waiting.to_string(),
        target_player: target.to_string(),
        created_at: now,
    };
    doc.waiting_queue.push(entry.clone());
    (entry, true)
}

/// Remove every entry with `player` on either side. Returns how many.
pub fn dequeue_all_for(doc: &mut Document, player: &str) -> usize {
    let before = doc.waiting_queue.len();
    doc.waiting_queue.retain(|e| !e.involves(player));
    before - doc.waiting_queue.len()
}

/// Remove the entry for the ordered pair. Returns whether one existed.
pub fn dequeue_entry(doc: &mut Document, waiting: &str, target: &str) -> bool {
    let before = doc.waiting_queue.len();
    doc.waiting_queue.retain(|e| !e.matches(waiting, target));
    before != doc.waiting_queue.len()
}

/// Entries waiting on `target`, oldest first.
#[must_use]
pub fn waiting_on<'a>(doc: &'a Document, target: &str) -> Vec<&'a WaitingQueueEntry> {
    let mut entries: Vec<&WaitingQueueEntry> = doc
        .waiting_queue
        .iter()
        .filter(|e| e.target_player == target)
        .collect();
    entries.sort_by_key(|e| e.created_at);
    entries
}

fn take_oldest_for(doc: &mut Document, target: &str) -> Option<WaitingQueueEntry> {
    let index = doc
        .waiting_queue
        .iter()
        .enumerate()
        .filter(|(_, e)| e.target_player == target)
        .min_by_key(|(i, e)| (e.created_at, *i))
        .map(|(i, _)| i)?;
    Some(doc.waiting_queue.remove(index))
}

/// Deliver the oldest deliverable queued challenge aimed at `freed`.
///
/// Returns the challenge issued, or `None` if no entry could be delivered.
pub fn try_deliver_for(doc: &mut Document, freed: &str, now: u64, ttl_ms: u64) -> Option<Challenge> {
    while let Some(entry) = take_oldest_for(doc, freed) {
        let waiting = entry.waiting_player.as_str();
        let available = doc.players.get(waiting).is_some_and(|p| p.is_online)
            && !doc.is_in_active_session(waiting);
        if !available {
            debug!(waiting, target = freed, "discarding stale queue entry");
            continue;
        }

        return match coordinator::create(doc, waiting, freed, now, ttl_ms) {
            Ok(ChallengeOutcome::Issued(challenge)) => {
                info!(challenge = %challenge.id, waiting, target = freed, "queued challenge delivered");
                Some(challenge)
            }
            Ok(ChallengeOutcome::Queued { .. }) => None,
            Err(e) => {
                debug!(waiting, target = freed, error = %e, "queued challenge not deliverable");
                None
            }
        };
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoringRules;
    use crate::registry;
    use crate::session;

    const TTL: u64 = 120_000;

    fn lobby(names: &[&str]) -> Document {
        let mut doc = Document::default();
        for name in names {
            registry::register(&mut doc, name, "i", 0, &ScoringRules::default()).unwrap();
        }
        doc
    }

    #[test]
    fn test_enqueue_is_idempotent_per_ordered_pair() {
        let mut doc = Document::default();
        let (first, inserted) = enqueue(&mut doc, "alice", "bob", 1);
        assert!(inserted);
        let (again, inserted) = enqueue(&mut doc, "alice", "bob", 2);
        assert!(!inserted);
        assert_eq!(first, again);
        let (_, inserted) = enqueue(&mut doc, "bob", "alice", 3);
        assert!(inserted);
        assert_eq!(doc.waiting_queue.len(), 2);
    }

    #[test]
    fn test_dequeue_primitives() {
        let mut doc = Document::default();
        enqueue(&mut doc, "alice", "bob", 1);
        enqueue(&mut doc, "carol", "bob", 2);
        enqueue(&mut doc, "bob", "dave", 3);
        assert!(dequeue_entry(&mut doc, "carol", "bob"));
        assert!(!dequeue_entry(&mut doc, "carol", "bob"));
        assert_eq!(dequeue_all_for(&mut doc, "bob"), 2);
        assert!(doc.waiting_queue.is_empty());
    }

    #[test]
    fn test_delivers_oldest_first() {
        let mut doc = lobby(&["alice", "bob", "carol"]);
        enqueue(&mut doc, "carol", "bob", 5);
        enqueue(&mut doc, "alice", "bob", 1);
        let challenge = try_deliver_for(&mut doc, "bob", 10, TTL).unwrap();
        assert_eq!(challenge.challenger, "alice");
        assert_eq!(challenge.challenged, "bob");
        assert_eq!(waiting_on(&doc, "bob").len(), 1);
    }

    #[test]
    fn test_skips_unavailable_waiters() {
        let mut doc = lobby(&["alice", "bob", "carol", "dave", "erin"]);
        doc.players.get_mut("alice").unwrap().is_online = false;
        session::create_session(&mut doc, "carol", "dave", 0);
        enqueue(&mut doc, "alice", "bob", 1);
        enqueue(&mut doc, "carol", "bob", 2);
        enqueue(&mut doc, "ghost", "bob", 3);
        enqueue(&mut doc, "erin", "bob", 4);

        let challenge = try_deliver_for(&mut doc, "bob", 10, TTL).unwrap();
        assert_eq!(challenge.challenger, "erin");
        assert!(doc.waiting_queue.is_empty());
    }

    #[test]
    fn test_nothing_to_deliver() {
        let mut doc = lobby(&["alice", "bob"]);
        assert!(try_deliver_for(&mut doc, "bob", 0, TTL).is_none());
    }

    #[test]
    fn test_existing_pending_blocks_delivery() {
        let mut doc = lobby(&["alice", "bob"]);
        coordinator::create(&mut doc, "bob", "alice", 0, TTL).unwrap();
        enqueue(&mut doc, "alice", "bob", 1);
        assert!(try_deliver_for(&mut doc, "bob", 2, TTL).is_none());
        assert!(doc.waiting_queue.is_empty());
    }
}
