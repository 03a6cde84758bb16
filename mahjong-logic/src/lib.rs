//! Winning-hand recognition for the mahjong ruleset.
//!
//! Tables are built once behind a `OnceLock`, not regenerated per hand:
//! `recognizer()` returns the process-wide singleton used by both the
//! engine's self-mo check and opponents' reaction-window (`HuChi`) checks.

mod recognizer;
mod table;
pub mod tile;

use std::sync::OnceLock;

pub use recognizer::Recognizer;

static RECOGNIZER: OnceLock<Recognizer> = OnceLock::new();

pub fn recognizer() -> &'static Recognizer {
    RECOGNIZER.get_or_init(Recognizer::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singleton_is_stable_across_calls() {
        let a = recognizer() as *const Recognizer;
        let b = recognizer() as *const Recognizer;
        assert_eq!(a, b);
    }
}
