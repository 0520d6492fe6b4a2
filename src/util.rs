//! Internal helpers shared by the primitive modules.

use std::sync::LockResult;

// Recover the guard from a possibly-poisoned lock.
//
// The primitives in this crate keep their bookkeeping consistent at every
// wait point, so a panic inside a caller's critical section leaves the
// internal state usable. Propagating the poison flag would instead wedge
// every other thread that shares the primitive.
pub(crate) fn unpoison<T>(result: LockResult<T>) -> T {
    match result {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
