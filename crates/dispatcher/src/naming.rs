//! Output name resolution.
//!
//! Every binding gets a unique human-readable name. Collisions are resolved
//! by bumping a trailing numeric token, so repeated registrations of "depth"
//! become "depth", "depth 2", "depth 3", ...

use std::collections::HashSet;

/// Resolve `requested` against the set of names already in use.
///
/// Pure function: no state beyond the passed-in set. Returns `requested`
/// unchanged when free; otherwise increments a trailing numeric token (or
/// appends one) until the name is free.
pub fn resolve_name(requested: &str, taken: &HashSet<String>) -> String {
    let mut candidate = requested.to_string();
    while taken.contains(&candidate) {
        candidate = bump(&candidate);
    }
    candidate
}

/// "depth" -> "depth 2", "depth 2" -> "depth 3", "nn 9" -> "nn 10".
fn bump(name: &str) -> String {
    match name.rsplit_once(' ') {
        Some((head, tail)) => match tail.parse::<u64>() {
            Ok(n) => format!("{head} {}", n + 1),
            Err(_) => format!("{name} 2"),
        },
        None => match name.parse::<u64>() {
            Ok(n) => (n + 1).to_string(),
            Err(_) => format!("{name} 2"),
        },
    }
}
