use crate::snapshot::{FieldValue, IN_STOCK, NAME, PRICE, Snapshot};

use super::types::{ChangeDescriptor, MonitoringResult};

/// Compare a fresh snapshot with the previous recorded result for the same
/// target.
///
/// Without a usable baseline the only entry is the first-observation
/// sentinel. Otherwise `price`, `in_stock` and `name` are compared in that
/// order; a field missing on either side counts as unchanged and any other
/// field is ignored.
pub fn compare(current: &Snapshot, previous: Option<&MonitoringResult>) -> Vec<ChangeDescriptor> {
    let Some(baseline) = previous.and_then(|result| result.snapshot.as_ref()) else {
        return vec![ChangeDescriptor::first_observation()];
    };

    let mut changes = Vec::new();

    if let Some((old, new)) = changed_field(baseline, current, PRICE) {
        changes.push(ChangeDescriptor::new(
            PRICE,
            Some(old.clone()),
            new.clone(),
            describe_price(old, new),
        ));
    }

    if let Some((old, new)) = changed_field(baseline, current, IN_STOCK) {
        let status = if new.as_bool().unwrap_or_default() { "IN STOCK" } else { "OUT OF STOCK" };
        changes.push(ChangeDescriptor::new(
            IN_STOCK,
            Some(old.clone()),
            new.clone(),
            format!("Stock status changed to: {status}"),
        ));
    }

    if let Some((old, new)) = changed_field(baseline, current, NAME) {
        changes.push(ChangeDescriptor::new(
            NAME,
            Some(old.clone()),
            new.clone(),
            format!("Product name changed from '{old}' to '{new}'"),
        ));
    }

    changes
}

fn changed_field<'a>(
    previous: &'a Snapshot,
    current: &'a Snapshot,
    field: &str,
) -> Option<(&'a FieldValue, &'a FieldValue)> {
    match (previous.get(field), current.get(field)) {
        (Some(old), Some(new)) if old != new => Some((old, new)),
        _ => None,
    }
}

fn describe_price(old: &FieldValue, new: &FieldValue) -> String {
    match (old.as_f64(), new.as_f64()) {
        (Some(old), Some(new)) => {
            let diff = new - old;
            let direction = if diff > 0.0 { "increased" } else { "decreased" };
            format!("Price {direction} from ${old:.2} to ${new:.2} (${:.2})", diff.abs())
        }
        _ => format!("Price changed from {old} to {new}"),
    }
}
