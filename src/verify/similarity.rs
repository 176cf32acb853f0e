//! Normalized Levenshtein similarity between package names.

/// Returns a score in `[0, 1]`, where `1.0` means the names are identical.
///
/// The score is `(longest - distance) / longest`, with `distance` the
/// Levenshtein edit distance counted in characters. Two empty names are
/// considered identical.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let longest = a.len().max(b.len());
    if longest == 0 {
        return 1.0;
    }

    let distance = edit_distance(&a, &b);
    (longest - distance) as f64 / longest as f64
}

/// Levenshtein distance with unit cost for insert, delete and substitute.
fn edit_distance(a: &[char], b: &[char]) -> usize {
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitute = previous[j] + usize::from(ca != cb);
            let delete = previous[j + 1] + 1;
            let insert = current[j] + 1;
            current[j + 1] = substitute.min(delete).min(insert);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}
