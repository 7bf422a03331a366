//! Instance naming policy.
//!
//! An explicit name is used verbatim only for a single instance whose name is
//! not already taken; everything else gets a randomized suffix.

use rand::Rng;

/// Basename used when no name is requested.
pub const DEFAULT_BASENAME: &str = "flotilla";

/// Separator between the basename and the random suffix.
pub const NAME_SEPARATOR: char = '-';

/// Length of the random lowercase suffix.
pub const SUFFIX_LEN: usize = 5;

/// How names are produced for one provisioning run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamePolicy {
    /// Use the requested name as-is.
    Verbatim(String),
    /// Generate `basename-xxxxx` for every instance.
    Randomized(String),
}

impl NamePolicy {
    /// Pick the policy for a run.
    ///
    /// `taken` reports whether an instance with the requested name already
    /// exists; callers only need to compute it when `count == 1`.
    #[must_use]
    pub fn for_request(name: Option<&str>, count: u32, taken: bool) -> Self {
        match name.filter(|n| !n.is_empty()) {
            Some(n) if count == 1 && !taken => Self::Verbatim(n.to_owned()),
            Some(n) => Self::Randomized(n.to_owned()),
            None => Self::Randomized(DEFAULT_BASENAME.to_owned()),
        }
    }

    /// Produce the name for the next instance.
    #[must_use]
    pub fn next_name(&self) -> String {
        match self {
            Self::Verbatim(n) => n.clone(),
            Self::Randomized(base) => random_name(base),
        }
    }
}

/// `basename` plus a separator and five random lowercase letters.
///
/// For a dotted hostname only the leading label is randomized:
/// `test.acme.com` becomes `test-abcde.acme.com`.
#[must_use]
pub fn random_name(basename: &str) -> String {
    random_name_with(basename, &mut rand::thread_rng())
}

/// [`random_name`] with an explicit random source.
pub fn random_name_with(basename: &str, rng: &mut impl Rng) -> String {
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| char::from(rng.gen_range(b'a'..=b'z')))
        .collect();
    match basename.split_once('.') {
        Some((host, domain)) => format!("{host}{NAME_SEPARATOR}{suffix}.{domain}"),
        None => format!("{basename}{NAME_SEPARATOR}{suffix}"),
    }
}
