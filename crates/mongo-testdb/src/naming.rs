//! Random collection names.

use rand::Rng;

/// Every generated collection name starts with this.
pub const COLLECTION_PREFIX: &str = "test_";

/// Number of random letters appended to [`COLLECTION_PREFIX`].
pub const COLLECTION_SUFFIX_LEN: usize = 8;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Generate a fresh collection name such as `test_qWzKbTne`.
#[must_use]
pub fn random_collection_name() -> String {
    format!("{COLLECTION_PREFIX}{}", random_letters(COLLECTION_SUFFIX_LEN))
}

/// Generate `len` letters drawn uniformly from `a-z` and `A-Z`.
#[must_use]
pub fn random_letters(len: usize) -> String {
    let mut rng = rand::rng();
    std::iter::repeat_with(|| char::from(LETTERS[rng.random_range(0..LETTERS.len())]))
        .take(len)
        .collect()
}
