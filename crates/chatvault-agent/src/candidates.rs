//! Candidate extraction for breach screening.

/// Words of a message that could be a stored secret.
///
/// The message is split on whitespace and only words strictly longer than
/// `min_len` characters are kept. Duplicates are preserved; the vault
/// dedupes them when matching.
pub fn extract_candidates(message: &str, min_len: usize) -> Vec<String> {
    message
        .split_whitespace()
        .filter(|word| word.chars().count() > min_len)
        .map(str::to_string)
        .collect()
}
