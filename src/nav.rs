use tracing::warn;

/// Monotonic navigation counter. Every navigation event and every reset
/// bumps it; asynchronous completions carry the epoch they were issued
/// under so the engine can recognize work that predates a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Epoch(u64);

impl Epoch {
    pub const ZERO: Self = Self(0);

    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Back,
}

/// Positions reachable while offline: the sorted cache snapshot taken at
/// entry plus a cursor into it. Not re-derived while offline, so loads that
/// complete after entry never extend it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfflineBrowse {
    sequence: Vec<usize>,
    position: usize,
}

impl OfflineBrowse {
    /// Freeze `sequence` and place the cursor on the current position. When
    /// the current position is not itself cached, the cursor pins to the
    /// first snapshot entry; an empty snapshot forces position 0 even
    /// though nothing was ever fetched there.
    fn at(sequence: Vec<usize>, current: &mut usize) -> Self {
        let position = match sequence.iter().position(|&p| p == *current) {
            Some(position) => position,
            None => {
                if sequence.is_empty() {
                    warn!("offline entry with an empty cache snapshot; pinning to position 0");
                }
                *current = sequence.first().copied().unwrap_or(0);
                0
            }
        };
        Self { sequence, position }
    }

    fn step(&mut self, direction: Direction) -> usize {
        let len = self.sequence.len();
        if len == 0 {
            return 0;
        }
        self.position = match direction {
            Direction::Forward => (self.position + 1) % len,
            Direction::Back => (self.position + len - 1) % len,
        };
        self.sequence[self.position]
    }

    pub fn sequence(&self) -> &[usize] {
        &self.sequence
    }
}

/// Tagged navigation mode. The offline variants carry the browse snapshot
/// so the online variant has no vestigial fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Online,
    OfflineAuto(OfflineBrowse),
    OfflineManual(OfflineBrowse),
}

/// Owns the current position, the mode, and the navigation epoch.
#[derive(Debug)]
pub struct Navigation {
    current: usize,
    mode: Mode,
    epoch: Epoch,
}

impl Navigation {
    pub fn new() -> Self {
        Self {
            current: 0,
            mode: Mode::Online,
            epoch: Epoch::ZERO,
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn is_offline(&self) -> bool {
        !matches!(self.mode, Mode::Online)
    }

    pub fn is_manual_offline(&self) -> bool {
        matches!(self.mode, Mode::OfflineManual(_))
    }

    /// Step to the adjacent position, wrapping in both directions. While
    /// offline the step moves through the entry snapshot instead of the
    /// catalog. Returns the new current position.
    pub fn step(&mut self, direction: Direction, catalog_len: usize) -> usize {
        self.epoch = self.epoch.next();
        match &mut self.mode {
            Mode::Online => {
                if catalog_len > 0 {
                    self.current = match direction {
                        Direction::Forward => (self.current + 1) % catalog_len,
                        Direction::Back => (self.current + catalog_len - 1) % catalog_len,
                    };
                }
            }
            Mode::OfflineAuto(browse) | Mode::OfflineManual(browse) => {
                self.current = browse.step(direction);
            }
        }
        self.current
    }

    /// Direct jump, online only. Returns whether the jump was taken.
    pub fn jump(&mut self, index: usize, catalog_len: usize) -> bool {
        if self.is_offline() || index >= catalog_len {
            return false;
        }
        self.epoch = self.epoch.next();
        self.current = index;
        true
    }

    /// Enter offline browsing over `snapshot`. A no-op when already
    /// offline; repeated probe failures must not re-snapshot.
    pub fn enter_offline(&mut self, manual: bool, snapshot: Vec<usize>) {
        if self.is_offline() {
            return;
        }
        let browse = OfflineBrowse::at(snapshot, &mut self.current);
        self.mode = if manual {
            Mode::OfflineManual(browse)
        } else {
            Mode::OfflineAuto(browse)
        };
    }

    /// Drop the snapshot and resume catalog addressing at the current
    /// position.
    pub fn exit_offline(&mut self) {
        self.mode = Mode::Online;
    }

    /// Back to the startup state (online, position 0) with a fresh epoch.
    /// Returns the new epoch, which the engine records as the staleness
    /// floor for in-flight completions.
    pub fn reset(&mut self) -> Epoch {
        self.current = 0;
        self.mode = Mode::Online;
        self.epoch = self.epoch.next();
        self.epoch
    }
}

impl Default for Navigation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn online_steps_wrap_both_directions() {
        let mut nav = Navigation::new();
        assert_eq!(nav.step(Direction::Back, 5), 4);
        assert_eq!(nav.step(Direction::Forward, 5), 0);
        for expected in 1..5 {
            assert_eq!(nav.step(Direction::Forward, 5), expected);
        }
        assert_eq!(nav.step(Direction::Forward, 5), 0);
    }

    #[test]
    fn every_step_bumps_the_epoch() {
        let mut nav = Navigation::new();
        let before = nav.epoch();
        nav.step(Direction::Forward, 5);
        nav.step(Direction::Back, 5);
        assert_eq!(nav.epoch(), before.next().next());
    }

    #[test]
    fn offline_steps_cycle_the_snapshot() {
        let mut nav = Navigation::new();
        nav.jump(5, 10);
        nav.enter_offline(true, vec![5, 6, 7]);
        assert_eq!(nav.current(), 5);
        assert_eq!(nav.step(Direction::Forward, 10), 6);
        assert_eq!(nav.step(Direction::Forward, 10), 7);
        assert_eq!(nav.step(Direction::Forward, 10), 5);
        assert_eq!(nav.step(Direction::Back, 10), 7);
    }

    #[test]
    fn offline_entry_pins_to_first_cached_when_current_is_uncached() {
        let mut nav = Navigation::new();
        nav.jump(4, 10);
        nav.enter_offline(false, vec![6, 8]);
        assert_eq!(nav.current(), 6);
        assert_eq!(nav.step(Direction::Forward, 10), 8);
    }

    #[test]
    fn offline_entry_with_empty_snapshot_forces_position_zero() {
        let mut nav = Navigation::new();
        nav.jump(4, 10);
        nav.enter_offline(false, Vec::new());
        assert_eq!(nav.current(), 0);
        assert_eq!(nav.step(Direction::Forward, 10), 0);
        assert_eq!(nav.step(Direction::Back, 10), 0);
    }

    #[test]
    fn reentry_does_not_replace_the_snapshot() {
        let mut nav = Navigation::new();
        nav.jump(5, 10);
        nav.enter_offline(false, vec![5, 6]);
        nav.enter_offline(false, vec![1, 2, 3]);
        match nav.mode() {
            Mode::OfflineAuto(browse) => assert_eq!(browse.sequence(), &[5, 6]),
            other => panic!("unexpected mode: {other:?}"),
        }
    }

    #[test]
    fn manual_and_auto_entries_are_distinguished() {
        let mut nav = Navigation::new();
        nav.enter_offline(true, vec![0]);
        assert!(nav.is_manual_offline());
        nav.exit_offline();
        nav.enter_offline(false, vec![0]);
        assert!(nav.is_offline());
        assert!(!nav.is_manual_offline());
    }

    #[test]
    fn exit_keeps_the_current_position() {
        let mut nav = Navigation::new();
        nav.jump(5, 10);
        nav.enter_offline(true, vec![5, 6, 7]);
        nav.step(Direction::Forward, 10);
        nav.exit_offline();
        assert_eq!(nav.current(), 6);
        assert!(!nav.is_offline());
    }

    #[test]
    fn jump_is_rejected_offline_and_out_of_range() {
        let mut nav = Navigation::new();
        assert!(!nav.jump(10, 10));
        nav.enter_offline(true, vec![0]);
        assert!(!nav.jump(3, 10));
    }

    #[test]
    fn reset_returns_to_online_zero_with_a_fresh_epoch() {
        let mut nav = Navigation::new();
        nav.jump(7, 10);
        nav.enter_offline(true, vec![7]);
        let before = nav.epoch();
        let floor = nav.reset();
        assert_eq!(nav.current(), 0);
        assert!(!nav.is_offline());
        assert!(floor > before);
        assert_eq!(nav.epoch(), floor);
    }
}
