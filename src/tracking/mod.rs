pub mod analytics;
pub mod classifier;
pub mod log;
pub mod settings;
pub mod stats;
pub mod summary;
pub mod types;

/// Drop entries from the front until at most `cap` remain.
pub(crate) fn keep_most_recent<T>(items: &mut Vec<T>, cap: usize) {
    if items.len() > cap {
        let excess = items.len() - cap;
        items.drain(..excess);
    }
}
