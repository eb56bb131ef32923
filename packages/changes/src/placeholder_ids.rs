use std::sync::atomic::{AtomicI64, Ordering};

/// Sequential placeholder id generator for objects created in a session.
///
/// Ids count down from the seed (`-1`, `-2`, ...) so they never collide with
/// server ids, and no value is handed out twice.
#[derive(Debug)]
pub struct PlaceholderIds {
    next: AtomicI64,
}

impl PlaceholderIds {
    pub fn new() -> Self {
        Self::starting_at(-1)
    }

    /// Seeds above `-1` are clamped to `-1`.
    pub fn starting_at(first: i64) -> Self {
        Self {
            next: AtomicI64::new(first.min(-1)),
        }
    }

    /// Generate next placeholder id
    pub fn new_id(&self) -> i64 {
        self.next.fetch_sub(1, Ordering::SeqCst)
    }

    /// The id the next call to `new_id` returns
    pub fn peek(&self) -> i64 {
        self.next.load(Ordering::SeqCst)
    }
}

impl Default for PlaceholderIds {
    fn default() -> Self {
        Self::new()
    }
}
