/// Helper macro for locking items
///
/// Lock poisoning means a listener or conversion panicked while holding the
/// lock; there is no meaningful way to continue with that node.
///
/// ```rust, ignore
///  let mut cache = lock!(self.cache);
///  cache.invalidate();
/// ```
macro_rules! lock {
    ($lock:expr) => {
        $lock.lock().expect("Failed to acquire lock")
    };
}
