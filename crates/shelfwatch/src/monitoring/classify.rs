use super::types::{ChangeDescriptor, ResultStatus};

/// Map a change list to a result status.
///
/// A lone first-observation sentinel is not a change. Any list with more than
/// one entry, or with a single real field change, is.
pub fn classify(changes: &[ChangeDescriptor]) -> ResultStatus {
    match changes {
        [] => ResultStatus::Success,
        [only] if only.is_sentinel() => ResultStatus::Success,
        _ => ResultStatus::Changed,
    }
}
