//! Debug-only reentrancy check.
//!
//! Every public table operation may call back into user policy code (hash,
//! equals, copy, destroy) while its chains are half-relinked. A policy that
//! reaches back into the same table from such a callback would observe that
//! state, so in debug builds a nested entry panics. Release builds compile
//! the check away.

#[cfg(debug_assertions)]
use core::cell::Cell;
use core::marker::PhantomData;

/// Per-table tracker. Guard an operation with
/// `let _g = self.reentrancy.enter("get");`.
#[derive(Debug, Default)]
pub(crate) struct ReentrancyCheck {
    #[cfg(debug_assertions)]
    active: Cell<Option<&'static str>>,
}

impl ReentrancyCheck {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            active: Cell::new(None),
        }
    }

    /// Marks `op` as running until the returned guard drops.
    #[inline]
    pub(crate) fn enter(&self, op: &'static str) -> OpGuard<'_> {
        #[cfg(debug_assertions)]
        {
            if let Some(outer) = self.active.get() {
                panic!("reentrancy detected: `{op}` called from a policy callback inside `{outer}`");
            }
            self.active.set(Some(op));
            OpGuard {
                owner: self,
                _lt: PhantomData,
            }
        }

        #[cfg(not(debug_assertions))]
        {
            let _ = op;
            OpGuard { _lt: PhantomData }
        }
    }
}

/// RAII guard returned by [`ReentrancyCheck::enter`].
pub(crate) struct OpGuard<'a> {
    #[cfg(debug_assertions)]
    owner: &'a ReentrancyCheck,
    _lt: PhantomData<&'a ()>,
}

impl Drop for OpGuard<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        self.owner.active.set(None);
    }
}

#[cfg(test)]
mod tests {
    use super::ReentrancyCheck;

    #[test]
    fn sequential_operations_are_fine() {
        let r = ReentrancyCheck::new();
        {
            let _g = r.enter("add");
        }
        let _g = r.enter("remove");
    }

    #[cfg(debug_assertions)]
    #[test]
    fn nested_entry_panics_and_names_both_operations() {
        let r = ReentrancyCheck::new();
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _outer = r.enter("add");
            let _inner = r.enter("get");
        }));
        let payload = res.expect_err("nested entry must panic in debug builds");
        let msg = payload
            .downcast_ref::<String>()
            .map(String::as_str)
            .unwrap_or_default();
        assert!(msg.contains("`get`") && msg.contains("`add`"), "{msg}");
        // The unwound guard released the tracker.
        let _g = r.enter("get");
    }

    #[cfg(not(debug_assertions))]
    #[test]
    fn nesting_is_unchecked_in_release() {
        let r = ReentrancyCheck::new();
        let _g1 = r.enter("add");
        let _g2 = r.enter("get");
    }
}
