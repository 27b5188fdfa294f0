use std::iter;

use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use uuid::Uuid;

/// Length of a regular slug.
pub const SLUG_LEN: usize = 7;

/// How many short slugs to try before falling back to long ones.
const SHORT_ATTEMPTS: usize = 5;

/// How many long slugs to try before giving up entirely.
const FALLBACK_ATTEMPTS: usize = 3;

/// Draw a short random slug over `[A-Za-z0-9]`.
pub fn generate() -> String {
    thread_rng()
        .sample_iter(Alphanumeric)
        .take(SLUG_LEN)
        .map(char::from)
        .collect()
}

/// Derive a long collision-resistant slug from a fresh UUID. At 32 hex
/// characters it can never collide with a regular slug, which keeps the
/// fallback path safe against every previously issued short slug.
pub fn fallback() -> String {
    Uuid::new_v4().simple().to_string()
}

/// The bounded candidate sequence used for one create attempt: a handful of
/// short slugs, then a handful of fallback slugs. Insertion is guarded by
/// the slug uniqueness constraint either way, so this only bounds latency.
pub fn candidates() -> impl Iterator<Item = String> {
    iter::repeat_with(generate)
        .take(SHORT_ATTEMPTS)
        .chain(iter::repeat_with(fallback).take(FALLBACK_ATTEMPTS))
}
