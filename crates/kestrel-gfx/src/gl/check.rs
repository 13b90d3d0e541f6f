use std::panic::Location;

use super::native::NativeGl;

/// Upper bound on errors drained per check; some drivers report the same
/// error forever after a context loss.
const MAX_DRAINED: usize = 8;

/// Drains the native error queue after `call` and logs each error with the
/// caller's location. Returns how many errors were seen.
///
/// Compiled to a no-op in release builds.
#[track_caller]
pub(crate) fn check_errors<N: NativeGl>(native: &mut N, enabled: bool, call: &str) -> usize {
    if !cfg!(debug_assertions) || !enabled {
        return 0;
    }

    let loc = Location::caller();
    let mut seen = 0;
    while seen < MAX_DRAINED {
        let Some(err) = native.get_error() else { break };
        log::error!("{call} failed with {err} at {}:{}", loc.file(), loc.line());
        seen += 1;
    }
    seen
}
