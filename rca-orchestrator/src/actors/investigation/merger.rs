//! Result merger
//!
//! Folds a batch of worker results into the accumulated map keyed by task
//! priority. Arrival order never matters: a result is inserted when its
//! priority is new, and replaces an existing entry only when it carries a
//! resolved diagnosis and the existing one does not.

use shared_types::WorkerResult;

use super::state::ResultMap;

pub fn merge_results(existing: &ResultMap, batch: &[WorkerResult]) -> ResultMap {
    let mut merged = existing.clone();
    for result in batch {
        match merged.get(&result.task_priority) {
            None => {
                merged.insert(result.task_priority, result.clone());
            }
            Some(current)
                if result.has_resolved_diagnosis() && !current.has_resolved_diagnosis() =>
            {
                tracing::debug!(
                    priority = result.task_priority,
                    "Replacing unresolved result with resolved diagnosis"
                );
                merged.insert(result.task_priority, result.clone());
            }
            Some(_) => {
                tracing::debug!(
                    priority = result.task_priority,
                    "Keeping existing result for priority"
                );
            }
        }
    }
    merged
}
