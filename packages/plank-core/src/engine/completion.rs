/// Position rules for completion toggles under the `Start` and `End` policies.
///
/// The completed items of a container form one contiguous run: a prefix for
/// `Start`, a suffix for `End`. Completing an item moves it to the outer edge
/// of the run and records its slot among the incomplete items; un-completing
/// puts it back at that slot inside the incomplete region.
use crate::stores::ItemStore;
use crate::types::CompletedItemOrder;

fn is_completed(items: &ItemStore, id: &str) -> bool {
    items.get(id).is_some_and(|item| item.completed)
}

/// True when the completed items of `seq` already form the run `policy` wants.
pub fn is_contiguous(seq: &[String], items: &ItemStore, policy: CompletedItemOrder) -> bool {
    let flags: Vec<bool> = seq.iter().map(|id| is_completed(items, id)).collect();
    match policy {
        // once an incomplete item is seen, no completed item may follow
        CompletedItemOrder::Start => !flags.windows(2).any(|w| !w[0] && w[1]),
        CompletedItemOrder::End => !flags.windows(2).any(|w| w[0] && !w[1]),
        CompletedItemOrder::NoChange | CompletedItemOrder::Remove => true,
    }
}

/// Stable partition of `seq` into the run layout of `policy`.
/// Relative order inside each group is kept. No-op for other policies.
pub fn regroup(seq: &mut Vec<String>, items: &ItemStore, policy: CompletedItemOrder) {
    if is_contiguous(seq, items, policy) {
        return;
    }
    let (done, open): (Vec<String>, Vec<String>) =
        seq.drain(..).partition(|id| is_completed(items, id));
    match policy {
        CompletedItemOrder::Start => {
            seq.extend(done);
            seq.extend(open);
        }
        _ => {
            seq.extend(open);
            seq.extend(done);
        }
    }
}

/// Move `item_id` (currently incomplete) to the edge of the completed run.
/// Returns the slot it held among the incomplete items.
pub fn complete(
    seq: &mut Vec<String>,
    items: &ItemStore,
    item_id: &str,
    policy: CompletedItemOrder,
) -> Option<usize> {
    let from = seq.iter().position(|id| id == item_id)?;
    let slot = seq[..from]
        .iter()
        .filter(|id| !is_completed(items, id))
        .count();
    let moved = seq.remove(from);
    match policy {
        CompletedItemOrder::Start => seq.insert(0, moved),
        _ => seq.push(moved),
    }
    Some(slot)
}

/// Move `item_id` (currently completed) out of the completed run into the
/// incomplete region. `return_slot` is the slot recorded by `complete`.
/// Returns the item's new index.
pub fn reopen(
    seq: &mut Vec<String>,
    items: &ItemStore,
    item_id: &str,
    return_slot: Option<usize>,
    policy: CompletedItemOrder,
) -> Option<usize> {
    let from = seq.iter().position(|id| id == item_id)?;
    let moved = seq.remove(from);
    let run = seq.iter().filter(|id| is_completed(items, id)).count();
    let open_len = seq.len() - run;
    let to = match policy {
        CompletedItemOrder::Start => run + return_slot.unwrap_or(0).min(open_len),
        _ => return_slot.unwrap_or(open_len).min(open_len),
    };
    seq.insert(to, moved);
    Some(to)
}
