//! Identifier generation.
//!
//! Ids have the form `<kind>_<epoch-ms>_<suffix>` where the suffix is nine
//! random base36 characters. The timestamp prefix keeps ids roughly ordered by
//! creation; the caller passes a `taken` predicate so an id that already exists
//! in the document is never handed out twice.

use rand::Rng;

const SUFFIX_LEN: usize = 9;
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// What an identifier names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    /// A challenge.
    Challenge,
    /// A game session.
    Game,
    /// A waiting-queue entry.
    Queue,
    /// An execution context.
    Instance,
}

impl IdKind {
    /// Prefix used in generated ids.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            IdKind::Challenge => "challenge",
            IdKind::Game => "game",
            IdKind::Queue => "queue",
            IdKind::Instance => "instance",
        }
    }
}

fn random_suffix<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..SUFFIX_LEN)
        .map(|_| char::from(BASE36[rng.gen_range(0..BASE36.len())]))
        .collect()
}

/// Generate a fresh id that `taken` does not reject.
pub fn generate_with<R, F>(rng: &mut R, kind: IdKind, now_ms: u64, taken: F) -> String
where
    R: Rng + ?Sized,
    F: Fn(&str) -> bool,
{
    loop {
        let id = format!("{}_{now_ms}_{}", kind.prefix(), random_suffix(rng));
        if !taken(&id) {
            return id;
        }
    }
}

/// Generate a fresh id using the thread-local RNG.
pub fn generate<F>(kind: IdKind, now_ms: u64, taken: F) -> String
where
    F: Fn(&str) -> bool,
{
    generate_with(&mut rand::thread_rng(), kind, now_ms, taken)
}
