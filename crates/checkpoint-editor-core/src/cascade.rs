//! Completion cascade: marking a step complete completes everything before it.

use crate::error::EditError;
use crate::model::Step;

/// Produce a new list where `completed == (position <= index)`.
///
/// The previous completion pattern is overwritten entirely; step text is
/// carried over unchanged.
pub fn cascade(steps: &[Step], index: usize) -> Result<Vec<Step>, EditError> {
    if index >= steps.len() {
        return Err(EditError::IndexOutOfBounds {
            index,
            len: steps.len(),
        });
    }

    Ok(steps
        .iter()
        .enumerate()
        .map(|(position, step)| Step {
            text: step.text.clone(),
            completed: position <= index,
        })
        .collect())
}

/// Whether `completed` forms an exact prefix of the list.
///
/// Holds after every cascade; reorders may break it.
pub fn is_completion_prefix(steps: &[Step]) -> bool {
    let done = steps.iter().take_while(|s| s.completed).count();
    steps[done..].iter().all(|s| !s.completed)
}
