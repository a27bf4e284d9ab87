use crate::error::JppError;
use serde::{Deserialize, Serialize};
use serenity::all::UserId;

/// A queued player with the MMR they had when they joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueEntry {
    pub user: UserId,
    pub mmr: i64,
}

/// The lobby players wait in until there are enough of them for a match.
#[derive(Debug, Clone)]
pub struct MatchQueue {
    entries: Vec<QueueEntry>,
    capacity: usize,
    forced_map: Option<String>,
}

impl MatchQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
            forced_map: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn contains(&self, user: UserId) -> bool {
        self.entries.iter().any(|e| e.user == user)
    }

    pub fn join(&mut self, user: UserId, mmr: i64) -> Result<QueueEntry, JppError> {
        if self.contains(user) {
            return Err(JppError::PlayerAlreadyQueued(user));
        }
        let entry = QueueEntry { user, mmr };
        self.entries.push(entry);
        Ok(entry)
    }

    /// Removes a player. An emptied queue forgets its forced map.
    pub fn leave(&mut self, user: UserId) -> Result<QueueEntry, JppError> {
        let index = self
            .entries
            .iter()
            .position(|e| e.user == user)
            .ok_or(JppError::PlayerNotQueued(user))?;
        let entry = self.entries.remove(index);
        if self.entries.is_empty() {
            self.forced_map = None;
        }
        Ok(entry)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.forced_map = None;
    }

    /// Hands every entry over to a starting match, along with any forced map.
    pub fn take(&mut self) -> (Vec<QueueEntry>, Option<String>) {
        (std::mem::take(&mut self.entries), self.forced_map.take())
    }

    pub fn forced_map(&self) -> Option<&str> {
        self.forced_map.as_deref()
    }

    pub fn force_map(&mut self, map: String) {
        self.forced_map = Some(map);
    }

    /// Which of `users` are not in the queue.
    pub fn missing(&self, users: impl IntoIterator<Item = UserId>) -> Vec<UserId> {
        users.into_iter().filter(|u| !self.contains(*u)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(n: u64) -> UserId {
        UserId::new(n)
    }

    #[test]
    fn join_and_leave() {
        let mut queue = MatchQueue::new(2);
        queue.join(uid(1), 100).unwrap();
        assert_eq!(
            queue.join(uid(1), 100).unwrap_err(),
            JppError::PlayerAlreadyQueued(uid(1))
        );
        assert!(!queue.is_full());
        queue.join(uid(2), 50).unwrap();
        assert!(queue.is_full());

        assert_eq!(queue.leave(uid(1)).unwrap().mmr, 100);
        assert_eq!(
            queue.leave(uid(1)).unwrap_err(),
            JppError::PlayerNotQueued(uid(1))
        );
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn emptied_queue_forgets_forced_map() {
        let mut queue = MatchQueue::new(10);
        queue.join(uid(1), 0).unwrap();
        queue.force_map("Villa".into());
        queue.leave(uid(1)).unwrap();
        assert_eq!(queue.forced_map(), None);

        queue.join(uid(1), 0).unwrap();
        queue.force_map("Villa".into());
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.forced_map(), None);
    }

    #[test]
    fn take_consumes_everything() {
        let mut queue = MatchQueue::new(10);
        queue.join(uid(1), 0).unwrap();
        queue.join(uid(2), 0).unwrap();
        queue.force_map("Bank".into());
        let (players, map) = queue.take();
        assert_eq!(players.len(), 2);
        assert_eq!(map.as_deref(), Some("Bank"));
        assert!(queue.is_empty());
        assert_eq!(queue.forced_map(), None);
    }

    #[test]
    fn missing_lists_unqueued_users() {
        let mut queue = MatchQueue::new(10);
        queue.join(uid(1), 0).unwrap();
        assert_eq!(queue.missing([uid(1), uid(2), uid(3)]), vec![uid(2), uid(3)]);
    }
}
