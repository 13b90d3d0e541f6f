//! Per-thread default context.
//!
//! Graphics contexts are bound to the thread that created them, so the
//! singleton is thread-local rather than process-wide.

use std::any::Any;
use std::cell::RefCell;

use super::context::{GlConfig, GlContext};
use super::native::NativeGl;

thread_local! {
    static INSTANCE: RefCell<Option<Box<dyn Any>>> = const { RefCell::new(None) };
}

/// Installs the thread's context. Returns `false` if one already exists.
pub fn create_singleton<N: NativeGl + 'static>(native: N, config: GlConfig) -> bool {
    INSTANCE.with(|cell| {
        let mut slot = cell.borrow_mut();
        if slot.is_some() {
            log::warn!("graphics context singleton already exists on this thread");
            return false;
        }
        *slot = Some(Box::new(GlContext::new(native, config)));
        true
    })
}

/// Runs `f` on the thread's context.
///
/// `None` when no context of type `N` exists, or when called re-entrantly
/// from inside another `with_instance`.
pub fn with_instance<N: NativeGl + 'static, R>(f: impl FnOnce(&mut GlContext<N>) -> R) -> Option<R> {
    INSTANCE.with(|cell| {
        let Ok(mut slot) = cell.try_borrow_mut() else {
            log::error!("graphics context accessed re-entrantly");
            return None;
        };
        let ctx = slot.as_mut()?.downcast_mut::<GlContext<N>>()?;
        Some(f(ctx))
    })
}

pub fn exists() -> bool {
    INSTANCE.with(|cell| cell.try_borrow().map(|s| s.is_some()).unwrap_or(true))
}

/// Drops the thread's context. Returns `false` if there was none.
pub fn destroy_singleton() -> bool {
    INSTANCE.with(|cell| match cell.try_borrow_mut() {
        Ok(mut slot) => slot.take().is_some(),
        Err(_) => {
            log::error!("cannot destroy the graphics context while it is in use");
            false
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessGl;

    #[test]
    fn singleton_lifecycle() {
        assert!(!exists());
        assert!(create_singleton(HeadlessGl::legacy(4, 4), GlConfig::default()));
        assert!(!create_singleton(HeadlessGl::legacy(4, 4), GlConfig::default()));
        assert!(exists());

        let depth = with_instance::<HeadlessGl, _>(|gl| gl.clip_depth());
        assert_eq!(depth, Some(0));

        assert!(destroy_singleton());
        assert!(!destroy_singleton());
        assert_eq!(with_instance::<HeadlessGl, _>(|gl| gl.clip_depth()), None);
    }

    #[test]
    fn nested_access_is_rejected() {
        create_singleton(HeadlessGl::core(4, 4), GlConfig::default());
        let inner = with_instance::<HeadlessGl, _>(|_| with_instance::<HeadlessGl, _>(|_| ()));
        assert_eq!(inner, Some(None));
        destroy_singleton();
    }
}
