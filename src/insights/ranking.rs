//! Deterministic Top-N selection: descending by metric, ties broken by
//! ascending id so repeated queries return identical orderings.

use uuid::Uuid;

pub fn top_n<T, M, FM, FI>(mut items: Vec<T>, limit: usize, metric: FM, id: FI) -> Vec<T>
where
    M: Ord,
    FM: Fn(&T) -> M,
    FI: Fn(&T) -> Uuid,
{
    items.sort_by(|left, right| {
        metric(right)
            .cmp(&metric(left))
            .then_with(|| id(left).cmp(&id(right)))
    });
    items.truncate(limit);
    items
}
