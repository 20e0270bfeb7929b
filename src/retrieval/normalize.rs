//! Min-max score normalization

use super::types::SearchResult;

/// Map scores onto `[0, 1]`. Empty input stays empty; when every score is
/// equal (or the range is not finite) every score becomes 1.
pub fn normalize(scores: &[f32]) -> Vec<f32> {
    let Some(min) = scores.iter().copied().reduce(f32::min) else {
        return Vec::new();
    };
    let max = scores.iter().copied().fold(min, f32::max);
    let range = max - min;

    if range == 0.0 || !range.is_finite() {
        return vec![1.0; scores.len()];
    }

    scores
        .iter()
        .map(|s| ((s - min) / range).clamp(0.0, 1.0))
        .collect()
}

/// Replace each result's score with its normalized value, keeping order
pub fn normalize_scores(mut results: Vec<SearchResult>) -> Vec<SearchResult> {
    let scores: Vec<f32> = results.iter().map(|r| r.score).collect();
    for (result, score) in results.iter_mut().zip(normalize(&scores)) {
        result.score = score;
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_maps_to_unit_interval() {
        assert_eq!(normalize(&[2.0, 4.0, 3.0]), vec![0.0, 1.0, 0.5]);
    }

    #[test]
    fn test_equal_scores_become_one() {
        assert_eq!(normalize(&[0.3, 0.3]), vec![1.0, 1.0]);
        assert_eq!(normalize(&[5.0]), vec![1.0]);
    }

    #[test]
    fn test_empty() {
        assert!(normalize(&[]).is_empty());
    }

    #[test]
    fn test_negative_scores() {
        let n = normalize(&[-1.0, 1.0, 0.0]);
        assert_eq!(n, vec![0.0, 1.0, 0.5]);
        assert!(n.iter().all(|s| (0.0..=1.0).contains(s)));
    }
}
