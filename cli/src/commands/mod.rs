//! Command implementations

pub mod config;
pub mod start;
pub mod status;
pub mod stop;
pub mod version;

use tilewall_common::ComponentKind;

use crate::app::AppContext;

/// Listed kinds in fleet order without repeats.
pub(crate) fn fleet_order(kinds: &[ComponentKind]) -> Vec<ComponentKind> {
    ComponentKind::ALL
        .into_iter()
        .filter(|k| kinds.contains(k))
        .collect()
}

/// Tell the operator which persisted PIDs were dropped as stale.
pub(crate) fn report_stale(app: &AppContext, cleared: &[(ComponentKind, u32)]) {
    for (kind, pid) in cleared {
        app.output.warn(&format!(
            "{} was recorded as pid {pid}, which is no longer running",
            kind.label()
        ));
    }
}
