// String similarity primitives shared by the duplicate detector and the
// merchant normalizer. Same algorithm, different cutoffs at the call sites.

// ============================================================================
// NORMALIZATION
// ============================================================================

/// Normalize a string for comparison:
/// - lowercase
/// - strip everything that is not alphanumeric or a space
/// - collapse runs of whitespace into a single space
pub fn normalize(s: &str) -> String {
    let lowered = s.to_lowercase();
    let cleaned: String = lowered
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ============================================================================
// EDIT DISTANCE
// ============================================================================

/// Classic Levenshtein distance (insertions, deletions, substitutions),
/// computed over chars with a two-row matrix.
pub fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let a: Vec<char> = s1.chars().collect();
    let b: Vec<char> = s2.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            curr[j] = std::cmp::min(
                std::cmp::min(
                    prev[j] + 1,     // deletion
                    curr[j - 1] + 1, // insertion
                ),
                prev[j - 1] + cost, // substitution
            );
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

// ============================================================================
// NORMALIZED SIMILARITY
// ============================================================================

/// Similarity score in [0, 1]:
///
///   1 - levenshtein(normalize(a), normalize(b)) / max(len_a, len_b)
///
/// Exact matches short-circuit to 1.0 without normalizing. Two strings that
/// both normalize to empty also score 1.0. Pairs whose lengths are wildly
/// different (ratio < 0.5 and absolute difference > 5) score 0.0 without
/// running the distance matrix, which keeps long free-text fields cheap.
pub fn normalized_edit_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }

    let na = normalize(a);
    let nb = normalize(b);

    if na == nb {
        return 1.0;
    }

    let len_a = na.chars().count();
    let len_b = nb.chars().count();
    let longer = len_a.max(len_b);
    let shorter = len_a.min(len_b);

    // longer > 0 here: both empty was caught by na == nb above
    let ratio = shorter as f64 / longer as f64;
    if ratio < 0.5 && longer - shorter > 5 {
        return 0.0;
    }

    let distance = levenshtein_distance(&na, &nb);
    1.0 - distance as f64 / longer as f64
}

// ============================================================================
// TESTS
// ============================================================================
