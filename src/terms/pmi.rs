//! Pointwise mutual information for bigrams and trigrams
//!
//! Probabilities are relative frequencies over the total unigram count. The
//! numerator and denominator are smoothed with different epsilons so that an
//! unseen n-gram gets a large negative score instead of `-inf`.

const EPS_JOINT: f64 = 1e-9;
const EPS_MARGINAL: f64 = 1e-12;

fn prob(count: u32, total: u64) -> f64 {
    count as f64 / total.max(1) as f64
}

/// `ln((p12 + ε) / (p1·p2 + ε'))`
pub fn bigram_pmi(c12: u32, c1: u32, c2: u32, total: u64) -> f64 {
    let p12 = prob(c12, total);
    let p1 = prob(c1, total);
    let p2 = prob(c2, total);
    ((p12 + EPS_JOINT) / (p1 * p2 + EPS_MARGINAL)).ln()
}

/// Joint trigram association plus the log of both overlapping bigram
/// probabilities.
///
/// Arguments: trigram count, the two bigram counts (w1 w2, w2 w3), the three
/// unigram counts and the total unigram count.
#[allow(clippy::too_many_arguments)]
pub fn trigram_pmi(c123: u32, c12: u32, c23: u32, c1: u32, c2: u32, c3: u32, total: u64) -> f64 {
    let p123 = prob(c123, total);
    let p12 = prob(c12, total);
    let p23 = prob(c23, total);
    let marginal = prob(c1, total) * prob(c2, total) * prob(c3, total);

    ((p123 + EPS_JOINT) / (marginal + EPS_MARGINAL)).ln()
        + ((p12 + EPS_JOINT) * (p23 + EPS_JOINT) + EPS_MARGINAL).ln()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bigram_pmi_swap_invariant() {
        for (c1, c2) in [(3, 7), (1, 10), (5, 5), (12, 2)] {
            let a = bigram_pmi(2, c1, c2, 50);
            let b = bigram_pmi(2, c2, c1, 50);
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_bigram_pmi_monotone_in_joint_count() {
        let mut last = f64::NEG_INFINITY;
        for c12 in 0..10 {
            let pmi = bigram_pmi(c12, 10, 10, 100);
            assert!(pmi > last);
            last = pmi;
        }
    }

    #[test]
    fn test_independent_words_near_zero() {
        // p12 == p1 * p2
        let pmi = bigram_pmi(1, 10, 10, 100);
        assert!(pmi.abs() < 1e-6);
    }

    #[test]
    fn test_unseen_bigram_is_strongly_negative() {
        assert!(bigram_pmi(0, 10, 10, 100) < -10.0);
    }

    #[test]
    fn test_trigram_pmi_grows_with_joint_count() {
        let low = trigram_pmi(1, 2, 2, 4, 4, 4, 100);
        let high = trigram_pmi(2, 2, 2, 4, 4, 4, 100);
        assert!(high > low);
    }

    #[test]
    fn test_zero_total_is_safe() {
        assert!(bigram_pmi(0, 0, 0, 0).is_finite());
        assert!(trigram_pmi(0, 0, 0, 0, 0, 0, 0).is_finite());
    }
}
