use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

/// Run `f` over `items` on at most `workers` scoped threads.
///
/// Results keep input order. Once `should_stop` returns true no new item is
/// started; items never started come back as `None`.
pub fn map_bounded<T, R, F, S>(workers: usize, items: &[T], should_stop: S, f: F) -> Vec<Option<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
    S: Fn() -> bool + Sync,
{
    let workers = workers.clamp(1, items.len().max(1));
    let next = AtomicUsize::new(0);
    let results: Mutex<Vec<Option<R>>> = Mutex::new(items.iter().map(|_| None).collect());

    let work = || {
        loop {
            if should_stop() {
                break;
            }
            let idx = next.fetch_add(1, Ordering::Relaxed);
            let Some(item) = items.get(idx) else {
                break;
            };
            let out = f(item);
            results.lock()[idx] = Some(out);
        }
    };

    if workers == 1 {
        work();
    } else {
        thread::scope(|s| {
            for _ in 0..workers {
                s.spawn(&work);
            }
        });
    }

    results.into_inner()
}
