//! # Ambient Randomness Provider
//!
//! The process-wide secure-random interface. Anything in SeedKey that needs
//! "just some random bytes" (local seeds, the Dilithium2 native key
//! generator) calls [`fill_bytes`], which reads from the OS CSPRNG.
//!
//! ## Overrides
//!
//! Some generators accept no seed at all; the only way to make them
//! deterministic is to change what the ambient provider returns while they
//! run. [`override_with`] does that, scoped:
//!
//! 1. it takes a process-wide re-entrant lock and keeps it for the lifetime
//!    of the returned [`ProviderOverride`] guard;
//! 2. it installs the replacement source;
//! 3. dropping the guard puts the previous provider back and releases the
//!    lock. Drop runs on unwind too, so a panicking generator can't leave the
//!    override behind.
//!
//! While a guard is alive, `fill_bytes` calls from *other* threads block
//! until it drops: nobody outside the scope can observe substituted bytes.
//! The owning thread re-enters the lock freely, which is what lets the
//! wrapped generator call back into `fill_bytes`.
//!
//! This is a workaround for APIs without a seeded entry point, not a
//! cryptographic construction. Keep override scopes tiny.

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use rand::rngs::OsRng;
use rand_core::RngCore;
use std::cell::RefCell;
use std::sync::OnceLock;

type Source = Box<dyn RngCore + Send>;

#[derive(Default)]
struct AmbientState {
    active: Option<Source>,
    intercepted: usize,
}

type Slot = ReentrantMutex<RefCell<AmbientState>>;

static AMBIENT: OnceLock<Slot> = OnceLock::new();

fn slot() -> &'static Slot {
    AMBIENT.get_or_init(|| ReentrantMutex::new(RefCell::new(AmbientState::default())))
}

/// Fill `dest` from the ambient provider.
///
/// OS randomness unless an override is active on this thread; blocks while
/// another thread holds an override.
pub fn fill_bytes(dest: &mut [u8]) {
    let guard = slot().lock();
    let mut state = guard.borrow_mut();
    match state.active.as_mut() {
        Some(source) => {
            source.fill_bytes(dest);
            state.intercepted += 1;
        }
        None => OsRng.fill_bytes(dest),
    }
}

/// Whether an override is installed (from this thread's point of view).
pub fn is_overridden() -> bool {
    let guard = slot().lock();
    let active = guard.borrow().active.is_some();
    active
}

/// Install `source` as the ambient provider until the guard drops.
pub fn override_with<R>(source: R) -> ProviderOverride
where
    R: RngCore + Send + 'static,
{
    let guard = slot().lock();
    let previous = std::mem::replace(
        &mut *guard.borrow_mut(),
        AmbientState {
            active: Some(Box::new(source)),
            intercepted: 0,
        },
    );
    ProviderOverride { guard, previous }
}

/// Run `f` with `source` installed as the ambient provider.
///
/// Returns `f`'s result together with the number of ambient calls the
/// override served.
pub fn with_override<R, T>(source: R, f: impl FnOnce() -> T) -> (T, usize)
where
    R: RngCore + Send + 'static,
{
    let scope = override_with(source);
    let out = f();
    let intercepted = scope.intercepted();
    drop(scope);
    (out, intercepted)
}

/// Scope guard for an ambient override. Restores the previous provider on drop.
pub struct ProviderOverride {
    guard: ReentrantMutexGuard<'static, RefCell<AmbientState>>,
    previous: AmbientState,
}

impl ProviderOverride {
    /// Ambient calls served by this override so far.
    pub fn intercepted(&self) -> usize {
        self.guard.borrow().intercepted
    }
}

impl Drop for ProviderOverride {
    fn drop(&mut self) {
        let previous = std::mem::take(&mut self.previous);
        *self.guard.borrow_mut() = previous;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::kdf::DeterministicRandomSource;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{mpsc, Arc};
    use std::time::Duration;

    fn det(domain: &str) -> DeterministicRandomSource {
        DeterministicRandomSource::new(&[3u8; 32], domain).unwrap()
    }

    #[test]
    fn default_provider_is_random() {
        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        fill_bytes(&mut a);
        fill_bytes(&mut b);
        assert_ne!(a, b);
    }

    #[test]
    fn override_serves_deterministic_bytes() {
        let mut expected = det("T");
        let mut got = [0u8; 48];
        let (_, calls) = with_override(det("T"), || fill_bytes(&mut got));
        assert_eq!(got.to_vec(), expected.take(48));
        assert_eq!(calls, 1);
    }

    #[test]
    fn override_restored_after_scope() {
        {
            let _scope = override_with(det("R"));
            assert!(is_overridden());
        }
        assert!(!is_overridden());
    }

    #[test]
    fn override_restored_after_panic() {
        let result = std::panic::catch_unwind(|| {
            let _scope = override_with(det("P"));
            panic!("generator blew up");
        });
        assert!(result.is_err());
        assert!(!is_overridden());
    }

    #[test]
    fn nested_override_restores_outer() {
        let mut outer_expected = det("OUTER");
        let _outer = override_with(det("OUTER"));
        {
            let _inner = override_with(det("INNER"));
            let mut buf = [0u8; 8];
            fill_bytes(&mut buf);
        }
        let mut buf = [0u8; 8];
        fill_bytes(&mut buf);
        assert_eq!(buf.to_vec(), outer_expected.take(8));
    }

    #[test]
    fn other_threads_wait_for_override_to_end() {
        let released = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel();

        let scope = override_with(det("LOCK"));
        let flag = Arc::clone(&released);
        let handle = std::thread::spawn(move || {
            let mut buf = [0u8; 4];
            fill_bytes(&mut buf);
            tx.send(flag.load(Ordering::SeqCst)).unwrap();
        });

        // The other thread must still be blocked.
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        released.store(true, Ordering::SeqCst);
        drop(scope);

        let saw_release = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(saw_release, "fill_bytes ran while the override was active");
        handle.join().unwrap();
    }
}
