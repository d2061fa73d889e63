//! Round-robin rotation over the healthy subset of a pool.

/// Ordered healthy members plus the rotation cursor.
///
/// Invariant: `cursor < members.len()` when non-empty, `0` when empty.
/// Every mutation re-establishes it.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RoundRobin {
    members: Vec<u16>,
    cursor: usize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a new member list, keeping the cursor position modulo its length.
    pub fn replace(&mut self, members: Vec<u16>) {
        self.members = members;
        self.cursor = if self.members.is_empty() {
            0
        } else {
            self.cursor % self.members.len()
        };
    }

    /// Member at the cursor; advances the cursor circularly.
    pub fn next(&mut self) -> Option<u16> {
        let port = *self.members.get(self.cursor)?;
        self.cursor = (self.cursor + 1) % self.members.len();
        Some(port)
    }

    /// Drop `port` from rotation. Returns whether it was present.
    pub fn remove(&mut self, port: u16) -> bool {
        let Some(idx) = self.members.iter().position(|&p| p == port) else {
            return false;
        };
        self.members.remove(idx);
        if self.cursor > idx {
            self.cursor -= 1;
        }
        if self.cursor >= self.members.len() {
            self.cursor = 0;
        }
        true
    }

    pub fn members(&self) -> &[u16] {
        &self.members
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
