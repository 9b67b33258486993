//! Lumi-section boundary tracking
//!
//! Segment id 0 means "not yet known" and never opens or closes a segment.

use std::collections::HashSet;

pub type SegmentId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentState {
    Uninitialized,
    Active(SegmentId),
}

/// Outcome of observing one event's segment id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentTransition {
    /// No boundary; keep accumulating
    Unchanged,
    /// First real segment id seen; nothing to flush
    Started(SegmentId),
    /// `closed` ended; the table must be flushed before `opened` accumulates.
    /// `recurring` is set if `opened` was already closed earlier in the run.
    Boundary {
        closed: SegmentId,
        opened: SegmentId,
        recurring: bool,
    },
}

#[derive(Debug, Clone)]
pub struct SegmentFlushController {
    enabled: bool,
    state: SegmentState,
    seen: HashSet<SegmentId>,
}

impl SegmentFlushController {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            state: SegmentState::Uninitialized,
            seen: HashSet::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn state(&self) -> SegmentState {
        self.state
    }

    /// The segment currently being accumulated, if any
    pub fn current(&self) -> Option<SegmentId> {
        match self.state {
            SegmentState::Active(id) => Some(id),
            SegmentState::Uninitialized => None,
        }
    }

    pub fn observe(&mut self, segment: SegmentId) -> SegmentTransition {
        if !self.enabled || segment == 0 {
            return SegmentTransition::Unchanged;
        }

        match self.state {
            SegmentState::Active(id) if id == segment => SegmentTransition::Unchanged,
            SegmentState::Active(id) => {
                let recurring = !self.seen.insert(segment);
                self.state = SegmentState::Active(segment);
                SegmentTransition::Boundary {
                    closed: id,
                    opened: segment,
                    recurring,
                }
            }
            SegmentState::Uninitialized => {
                self.seen.insert(segment);
                self.state = SegmentState::Active(segment);
                SegmentTransition::Started(segment)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_never_transitions() {
        let mut ctrl = SegmentFlushController::new(false);
        for s in [0, 5, 7, 5] {
            assert_eq!(ctrl.observe(s), SegmentTransition::Unchanged);
        }
        assert_eq!(ctrl.current(), None);
    }

    #[test]
    fn test_zero_keeps_uninitialized() {
        let mut ctrl = SegmentFlushController::new(true);
        assert_eq!(ctrl.observe(0), SegmentTransition::Unchanged);
        assert_eq!(ctrl.state(), SegmentState::Uninitialized);
    }

    #[test]
    fn test_zero_after_start_is_ignored() {
        let mut ctrl = SegmentFlushController::new(true);
        ctrl.observe(3);
        assert_eq!(ctrl.observe(0), SegmentTransition::Unchanged);
        assert_eq!(ctrl.current(), Some(3));
    }

    #[test]
    fn test_sequence_with_recurrence() {
        let mut ctrl = SegmentFlushController::new(true);
        let transitions: Vec<SegmentTransition> =
            [0, 0, 5, 5, 7, 5].iter().map(|&s| ctrl.observe(s)).collect();

        assert_eq!(
            transitions,
            vec![
                SegmentTransition::Unchanged,
                SegmentTransition::Unchanged,
                SegmentTransition::Started(5),
                SegmentTransition::Unchanged,
                SegmentTransition::Boundary {
                    closed: 5,
                    opened: 7,
                    recurring: false
                },
                SegmentTransition::Boundary {
                    closed: 7,
                    opened: 5,
                    recurring: true
                },
            ]
        );
        assert_eq!(ctrl.current(), Some(5));
    }
}
