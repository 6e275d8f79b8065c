//! Lazy handle registry
//!
//! Each domain kind keeps one registry per device. The handle list is built
//! on the first query, exactly once, and served unchanged afterwards.

use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Handle list for one (device, kind) pair
pub struct DomainRegistry<T> {
    handles: OnceCell<Vec<Arc<T>>>,
    builds: AtomicUsize,
}

impl<T> DomainRegistry<T> {
    /// Create an empty, unbuilt registry
    pub fn new() -> Self {
        Self {
            handles: OnceCell::new(),
            builds: AtomicUsize::new(0),
        }
    }

    /// Handle list, building it with `build` on first use
    ///
    /// Concurrent first callers block until the single build finishes.
    pub fn handles<F>(&self, build: F) -> &[Arc<T>]
    where
        F: FnOnce() -> Vec<T>,
    {
        self.handles.get_or_init(|| {
            self.builds.fetch_add(1, Ordering::SeqCst);
            build().into_iter().map(Arc::new).collect()
        })
    }

    /// Two-call enumeration over the handle list
    ///
    /// See [`copy_page`] for the count and buffer contract.
    pub fn enumerate<F>(&self, count: &mut u32, out: Option<&mut Vec<Arc<T>>>, build: F)
    where
        F: FnOnce() -> Vec<T>,
    {
        copy_page(self.handles(build), count, out);
    }

    /// Whether the handle list has been built
    pub fn is_built(&self) -> bool {
        self.handles.get().is_some()
    }

    /// Number of times the handle list was built (0 or 1)
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

impl<T> Default for DomainRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy a page of `items` into `out`
///
/// When `*count` is zero or larger than `items.len()` it is replaced by the
/// true length. `out`, if given, receives exactly `min(count_in, len)`
/// items, where a zero `count_in` means "all of them".
pub fn copy_page<T: Clone>(items: &[T], count: &mut u32, out: Option<&mut Vec<T>>) {
    let len = items.len() as u32;
    let requested = *count;
    if requested == 0 || requested > len {
        *count = len;
    }

    if let Some(out) = out {
        let n = if requested == 0 { len } else { requested.min(len) };
        out.clear();
        out.extend_from_slice(&items[..n as usize]);
    }
}

/// Subdevice ids to build instances for
///
/// A device without subdevices is its own sole instance.
pub fn subdevice_ids(count: u32) -> Vec<Option<u32>> {
    if count == 0 {
        vec![None]
    } else {
        (0..count).map(Some).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::thread;

    #[test]
    fn test_count_only_query() {
        let registry = DomainRegistry::new();
        let mut count = 0;
        registry.enumerate(&mut count, None, || vec![1, 2, 3]);
        assert_eq!(count, 3);
    }

    #[test]
    fn test_two_call_protocol_builds_once() {
        let registry = DomainRegistry::new();
        let build = || vec!["gpu", "media"];

        let mut count = 0;
        registry.enumerate(&mut count, None, build);
        let mut out = Vec::new();
        registry.enumerate(&mut count, Some(&mut out), || panic!("rebuilt"));

        assert_eq!(count, 2);
        assert_eq!(out.iter().map(|h| **h).collect::<Vec<_>>(), vec!["gpu", "media"]);
        assert_eq!(registry.build_count(), 1);
        assert!(registry.is_built());
    }

    #[test]
    fn test_partial_request_keeps_count() {
        let items = vec![10, 20, 30];

        let mut count = 2;
        let mut out = Vec::new();
        copy_page(&items, &mut count, Some(&mut out));
        assert_eq!(count, 2);
        assert_eq!(out, vec![10, 20]);

        let mut count = 7;
        copy_page(&items, &mut count, Some(&mut out));
        assert_eq!(count, 3);
        assert_eq!(out, vec![10, 20, 30]);

        let mut count = 2;
        copy_page(&items, &mut count, None);
        assert_eq!(count, 2);
    }

    #[test]
    fn test_empty_list_is_success() {
        let registry: DomainRegistry<u32> = DomainRegistry::new();
        let mut count = 5;
        let mut out = vec![Arc::new(9)];
        registry.enumerate(&mut count, Some(&mut out), Vec::new);
        assert_eq!(count, 0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_concurrent_first_queries_converge() {
        let registry = Arc::new(DomainRegistry::new());
        let calls = Arc::new(AtomicU32::new(0));

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let calls = Arc::clone(&calls);
                thread::spawn(move || {
                    let handles = registry.handles(|| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(std::time::Duration::from_millis(10));
                        vec![1u32, 2]
                    });
                    handles.iter().map(|h| Arc::as_ptr(h) as usize).collect::<Vec<_>>()
                })
            })
            .collect();

        let results: Vec<_> = workers.into_iter().map(|w| w.join().unwrap()).collect();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(registry.build_count(), 1);
    }

    #[test]
    fn test_subdevice_ids() {
        assert_eq!(subdevice_ids(0), vec![None]);
        assert_eq!(subdevice_ids(2), vec![Some(0), Some(1)]);
    }
}
