//! Waypoint Sequencer
//!
//! Per-vehicle cursor over an assigned waypoint sequence. The sequencer does
//! not own the waypoints; callers pass the current assigned sequence on every
//! call (see [`super::assigned_to`]) so external edits are picked up on the
//! next tick.
//!
//! # Cursor rules
//!
//! - The cursor only moves forward while the assignment is unchanged.
//! - Any prefix of already-passed waypoints is skipped before a target is
//!   returned, so a passed waypoint is never handed out again.
//! - When the assignment changes (waypoint added, removed, unassigned or
//!   reordered) the old index is meaningless; the cursor is rebuilt from the
//!   `is_passed` flags instead.

use alloc::vec::Vec;

use super::{Waypoint, WaypointId};

/// Waypoint sequencer for a single vehicle
#[derive(Debug, Clone, Default)]
pub struct WaypointSequencer {
    /// Index of the current target in the assigned sequence
    cursor: usize,
    /// Waypoint ids seen on the last call, used to detect assignment changes
    assignment: Vec<WaypointId>,
}

impl WaypointSequencer {
    pub const fn new() -> Self {
        Self {
            cursor: 0,
            assignment: Vec::new(),
        }
    }

    /// Resolve the current target
    ///
    /// # Returns
    ///
    /// Index into `assigned` of the first unpassed waypoint at or after the
    /// cursor, or `None` once the sequence is exhausted.
    pub fn current(&mut self, assigned: &[&Waypoint]) -> Option<usize> {
        self.sync_assignment(assigned);

        while self.cursor < assigned.len() && assigned[self.cursor].is_passed {
            self.cursor += 1;
        }

        (self.cursor < assigned.len()).then_some(self.cursor)
    }

    /// Record arrival at the current target and move past it
    pub fn advance(&mut self) {
        self.cursor += 1;
    }

    /// Waypoints from the cursor onward
    pub fn remaining<'a, 'w>(&self, assigned: &'a [&'w Waypoint]) -> &'a [&'w Waypoint] {
        &assigned[self.cursor.min(assigned.len())..]
    }

    /// Progress as (passed, total)
    ///
    /// Counted from the flags, so it is correct for vehicles that have not
    /// been stepped yet.
    pub fn progress(assigned: &[&Waypoint]) -> (usize, usize) {
        let passed = assigned.iter().filter(|wp| wp.is_passed).count();
        (passed, assigned.len())
    }

    fn sync_assignment(&mut self, assigned: &[&Waypoint]) {
        let unchanged = self.assignment.len() == assigned.len()
            && self
                .assignment
                .iter()
                .zip(assigned.iter())
                .all(|(seen, wp)| *seen == wp.id);
        if unchanged {
            return;
        }

        self.assignment.clear();
        self.assignment
            .extend(assigned.iter().map(|wp| wp.id.clone()));
        self.cursor = assigned.iter().take_while(|wp| wp.is_passed).count();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoPosition;
    use alloc::vec;

    fn route(ids: &[&str]) -> Vec<Waypoint> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| Waypoint::new(*id, GeoPosition::new(i as f64, 0.0)).assigned("v1"))
            .collect()
    }

    fn refs(list: &[Waypoint]) -> Vec<&Waypoint> {
        list.iter().collect()
    }

    #[test]
    fn test_empty_sequence_has_no_target() {
        let mut seq = WaypointSequencer::new();
        assert_eq!(seq.current(&[]), None);
    }

    #[test]
    fn test_skips_passed_prefix() {
        let mut list = route(&["a", "b", "c"]);
        list[0].is_passed = true;
        list[1].is_passed = true;

        let mut seq = WaypointSequencer::new();
        assert_eq!(seq.current(&refs(&list)), Some(2));
    }

    #[test]
    fn test_passed_waypoint_never_returned_again() {
        let mut list = route(&["a", "b"]);
        let mut seq = WaypointSequencer::new();

        assert_eq!(seq.current(&refs(&list)), Some(0));
        list[0].is_passed = true;
        seq.advance();

        for _ in 0..5 {
            let idx = seq.current(&refs(&list));
            assert_eq!(idx, Some(1));
        }

        list[1].is_passed = true;
        seq.advance();
        assert_eq!(seq.current(&refs(&list)), None);
    }

    #[test]
    fn test_cursor_monotonic_while_assignment_unchanged() {
        let list = route(&["a", "b", "c"]);
        let mut seq = WaypointSequencer::new();
        seq.current(&refs(&list));
        seq.advance();
        seq.advance();
        // Flags say nothing is passed, but the assignment did not change
        assert_eq!(seq.current(&refs(&list)), Some(2));
    }

    #[test]
    fn test_assignment_change_rebuilds_cursor_from_flags() {
        let mut list = route(&["a", "b", "c"]);
        let mut seq = WaypointSequencer::new();
        seq.current(&refs(&list));
        list[0].is_passed = true;
        seq.advance();
        assert_eq!(seq.current(&refs(&list)), Some(1));

        // Remove "a": the old index 1 would now skip "b"
        list.remove(0);
        assert_eq!(seq.current(&refs(&list)), Some(0));
        assert_eq!(list[0].id.as_str(), "b");
    }

    #[test]
    fn test_appended_waypoint_extends_route() {
        let mut list = route(&["a"]);
        let mut seq = WaypointSequencer::new();
        seq.current(&refs(&list));
        list[0].is_passed = true;
        seq.advance();
        assert_eq!(seq.current(&refs(&list)), None);

        list.push(Waypoint::new("b", GeoPosition::new(5.0, 5.0)).assigned("v1"));
        assert_eq!(seq.current(&refs(&list)), Some(1));
    }

    #[test]
    fn test_remaining_and_progress() {
        let mut list = route(&["a", "b", "c"]);
        let mut seq = WaypointSequencer::new();
        seq.current(&refs(&list));
        list[0].is_passed = true;
        seq.advance();

        let assigned = refs(&list);
        let remaining: Vec<&str> = seq
            .remaining(&assigned)
            .iter()
            .map(|wp| wp.id.as_str())
            .collect();
        assert_eq!(remaining, vec!["b", "c"]);
        assert_eq!(WaypointSequencer::progress(&assigned), (1, 3));
    }
}
