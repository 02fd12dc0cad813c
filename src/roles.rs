use tracing::debug;

use crate::database::ActivityStore;
use crate::error::TrackerResult;
use crate::parsing::{decode_role_value, RoleValue};
use crate::types::CapabilityRow;

/// Looks up users holding any of `allowed_roles`.
///
/// A user listed in several qualifying rows appears once per row; the result
/// is only used as an `IN` filter.
pub async fn resolve_privileged_users(
    store: &mut dyn ActivityStore,
    usermeta_table: &str,
    allowed_roles: &[String],
) -> TrackerResult<Vec<u64>> {
    let rows = store.capability_rows(usermeta_table).await?;
    debug!(rows = rows.len(), table = usermeta_table, "Fetched capability rows");
    Ok(qualifying_users(&rows, allowed_roles))
}

pub fn qualifying_users(rows: &[CapabilityRow], allowed_roles: &[String]) -> Vec<u64> {
    rows.iter()
        .filter(|row| {
            let raw = row.meta_value.as_deref().unwrap_or_default();
            match decode_role_value(raw) {
                RoleValue::Malformed(_) => {
                    debug!(user_id = row.user_id, "Ignoring malformed capability value");
                    false
                }
                value => value.intersects(allowed_roles),
            }
        })
        .map(|row| row.user_id)
        .collect()
}
