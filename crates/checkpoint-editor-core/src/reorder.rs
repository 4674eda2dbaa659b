//! Drag-reorder of steps.

use crate::model::Step;

/// Outcome of a drag gesture: where it started and where it was dropped.
///
/// `destination` is `None` when the drag was cancelled or dropped outside a
/// valid target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DragResult {
    pub source: usize,
    pub destination: Option<usize>,
}

impl DragResult {
    pub fn new(source: usize, destination: Option<usize>) -> Self {
        Self {
            source,
            destination,
        }
    }
}

/// Move the step at `from` so that it ends up at index `to` of the result.
///
/// Returns `None` when the move would not change anything: no destination,
/// either index out of range, or `from == to`. Completion flags travel with
/// their steps; the prefix invariant is not re-derived.
pub fn move_step(steps: &[Step], from: usize, to: Option<usize>) -> Option<Vec<Step>> {
    let to = to?;
    if from >= steps.len() || to >= steps.len() || from == to {
        return None;
    }

    let mut items = steps.to_vec();
    let moved = items.remove(from);
    items.insert(to, moved);
    Some(items)
}

#[cfg(test)]
mod tests {
    use quickcheck::{TestResult, quickcheck};

    use super::*;

    fn steps(names: &[&str]) -> Vec<Step> {
        names.iter().map(|n| Step::new(*n)).collect()
    }

    fn texts(steps: &[Step]) -> Vec<&str> {
        steps.iter().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn test_move_forward() {
        let out = move_step(&steps(&["a", "b", "c", "d"]), 0, Some(2)).unwrap();
        assert_eq!(texts(&out), ["b", "c", "a", "d"]);
    }

    #[test]
    fn test_move_backward() {
        let out = move_step(&steps(&["a", "b", "c", "d"]), 3, Some(1)).unwrap();
        assert_eq!(texts(&out), ["a", "d", "b", "c"]);
    }

    #[test]
    fn test_no_destination_is_noop() {
        assert_eq!(move_step(&steps(&["a", "b"]), 0, None), None);
    }

    #[test]
    fn test_same_position_and_out_of_range_are_noops() {
        let list = steps(&["a", "b"]);
        assert_eq!(move_step(&list, 1, Some(1)), None);
        assert_eq!(move_step(&list, 2, Some(0)), None);
        assert_eq!(move_step(&list, 0, Some(2)), None);
    }

    #[test]
    fn test_completion_travels_with_step() {
        let list = vec![Step::with_completed("a", true), Step::new("b")];
        let out = move_step(&list, 0, Some(1)).unwrap();
        assert_eq!(out[1], Step::with_completed("a", true));
        assert!(!out[0].completed);
    }

    quickcheck! {
        fn prop_move_preserves_multiset(flags: Vec<bool>, from: usize, to: usize) -> TestResult {
            if flags.len() < 2 {
                return TestResult::discard();
            }
            let from = from % flags.len();
            let to = to % flags.len();
            let list: Vec<Step> = flags
                .iter()
                .enumerate()
                .map(|(i, &done)| Step::with_completed(format!("s{i}"), done))
                .collect();

            let Some(out) = move_step(&list, from, Some(to)) else {
                return TestResult::from_bool(from == to);
            };

            let mut before = list.clone();
            let mut after = out.clone();
            before.sort_by(|a, b| a.text.cmp(&b.text));
            after.sort_by(|a, b| a.text.cmp(&b.text));
            TestResult::from_bool(out.len() == list.len() && before == after && out[to] == list[from])
        }
    }
}
