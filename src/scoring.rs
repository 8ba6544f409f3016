//! Static scoring tables for Thai numerological pricing.
//!
//! Every table lives in one immutable [`ScoringTables`] value that is
//! passed by reference into the feature library. Alternate schemes can be
//! constructed for testing without touching any global state; `Default`
//! yields the production Thai tables.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Scores assigned per digit-variety bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComplexityScores {
    pub very_simple: f32,
    pub simple: f32,
    pub moderate: f32,
    pub complex: f32,
    pub very_complex: f32,
}

/// Immutable scoring configuration consumed by [`crate::features`].
///
/// Digit-indexed arrays use the digit value as index; pair/sequence tables
/// are keyed by the literal digit substring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringTables {
    /// Auspicious digits.
    pub good_digits: [bool; 10],
    /// Inauspicious digits.
    pub bad_digits: [bool; 10],
    /// Per-digit "power" weight, indexed by digit value.
    pub power_weights: [f32; 10],
    /// Popular auspicious two-digit pairs.
    pub premium_pairs: BTreeSet<String>,
    /// Two-digit pairs with a cultural meaning score (can be negative).
    pub special_lucky_pairs: BTreeMap<String, f32>,
    /// Mystical pair scores; deliberately overlaps `special_lucky_pairs`
    /// with different signs for some pairs, kept as a separate heuristic.
    pub mystical_pairs: BTreeMap<String, f32>,
    /// Pairs considered unlucky.
    pub negative_pairs: BTreeSet<String>,
    /// Pairs that strongly depress value.
    pub forbidden_pairs: BTreeSet<String>,
    /// Double/triple/quad repeated-run scores keyed by the run substring.
    pub double_scores: BTreeMap<String, f32>,
    pub triple_scores: BTreeMap<String, f32>,
    pub quad_scores: BTreeMap<String, f32>,
    /// Consecutive/lucky sequences anywhere in the number.
    pub lucky_sequences: BTreeMap<String, f32>,
    /// Famous sequences with position-dependent multipliers applied by the
    /// feature library.
    pub famous_sequences: BTreeMap<String, f32>,
    /// Premium endings, keys of length 2-5, looked up longest-first.
    pub ending_premium: BTreeMap<String, f32>,
    /// Premium middle ("abc", positions 3..6) blocks.
    pub abc_premium: BTreeMap<String, f32>,
    /// Digit-sum scores keyed by the total.
    pub sum_scores: BTreeMap<u32, f32>,
    /// Scores per digit-variety bucket.
    pub complexity: ComplexityScores,
    /// Positional weight per index 0..10 (tail positions weigh most).
    pub position_weights: [f32; 10],
    /// Positional weight per digit value, used by the position-weighted score.
    pub digit_value_weights: [f32; 10],
    /// Market-demand patterns with their base demand scores.
    pub popular_patterns: BTreeMap<String, f32>,
    /// Special operator prefixes (first three digits) with fixed scores.
    pub special_prefixes: BTreeMap<String, f32>,
    /// Market tier thresholds for the tier-classification feature, highest
    /// first, paired with the awarded score.
    pub market_tiers: Vec<(f32, f32)>,
}

fn map(entries: &[(&str, f32)]) -> BTreeMap<String, f32> {
    entries
        .iter()
        .map(|(k, v)| ((*k).to_string(), *v))
        .collect()
}

fn set(entries: &[&str]) -> BTreeSet<String> {
    entries.iter().map(|s| (*s).to_string()).collect()
}

impl Default for ScoringTables {
    fn default() -> Self {
        let mut good_digits = [false; 10];
        for d in [1, 3, 4, 5, 6, 8, 9] {
            good_digits[d] = true;
        }
        let mut bad_digits = [false; 10];
        for d in [0, 2, 7] {
            bad_digits[d] = true;
        }

        Self {
            good_digits,
            bad_digits,
            // indexed 0..=9
            power_weights: [-5.0, 5.0, -1.0, 4.0, 6.0, 10.0, 8.0, -2.0, 6.0, 8.0],
            premium_pairs: set(&[
                "45", "54", "59", "95", "15", "51", "14", "41", "98", "89", "78", "87", "88",
                "66", "99", "65", "56", "24", "42", "35", "53", "63", "36",
            ]),
            special_lucky_pairs: map(&[
                ("15", 10.0),
                ("51", 10.0),
                ("24", 8.0),
                ("42", 8.0),
                ("36", 9.0),
                ("63", 9.0),
                ("45", 12.0),
                ("54", 12.0),
                ("56", 15.0),
                ("65", 15.0),
                ("69", 10.0),
                ("96", 10.0),
                ("78", 12.0),
                ("87", 12.0),
                ("28", 8.0),
                ("82", 8.0),
                ("38", 7.0),
                ("83", 7.0),
                ("19", 9.0),
                ("91", 9.0),
                ("89", 11.0),
                ("98", 11.0),
                ("14", 10.0),
                ("41", 10.0),
                ("59", 13.0),
                ("95", 13.0),
                ("88", 14.0),
                ("99", 16.0),
                ("66", 12.0),
                ("55", 14.0),
                ("32", -5.0),
                ("23", -5.0),
                ("35", 9.0),
                ("53", 9.0),
            ]),
            mystical_pairs: map(&[
                ("13", -10.0),
                ("31", -8.0),
                ("17", -5.0),
                ("71", -5.0),
                ("04", -8.0),
                ("40", -8.0),
                ("20", -6.0),
                ("02", -6.0),
                ("27", -7.0),
                ("72", -7.0),
                ("70", -9.0),
                ("07", -9.0),
                ("08", -3.0),
                ("80", -3.0),
                ("48", -4.0),
                ("84", -4.0),
                ("21", -3.0),
                ("12", -3.0),
                ("37", -5.0),
                ("73", -5.0),
                ("29", -4.0),
                ("92", -4.0),
                ("18", 5.0),
                ("81", 5.0),
                ("16", 6.0),
                ("61", 6.0),
                ("22", -8.0),
                ("77", -10.0),
                ("00", -15.0),
                ("44", 8.0),
                ("33", -5.0),
                ("11", 3.0),
            ]),
            negative_pairs: set(&[
                "10", "01", "12", "21", "13", "31", "17", "71", "18", "81", "20", "02", "27",
                "72", "30", "03", "34", "43", "37", "73", "38", "83", "48", "84", "67", "76",
                "68", "86", "70", "07", "80", "08", "32", "23",
            ]),
            forbidden_pairs: set(&["00", "04", "40", "13", "17", "44", "70", "22"]),
            double_scores: map(&[
                ("00", 2.0),
                ("11", 6.0),
                ("22", 3.0),
                ("33", 5.0),
                ("44", 6.0),
                ("55", 10.0),
                ("66", 9.0),
                ("77", 4.0),
                ("88", 12.0),
                ("99", 14.0),
            ]),
            triple_scores: map(&[
                ("000", 3.0),
                ("111", 8.0),
                ("222", 4.0),
                ("333", 7.0),
                ("444", 8.0),
                ("555", 15.0),
                ("666", 12.0),
                ("777", 6.0),
                ("888", 20.0),
                ("999", 20.0),
            ]),
            quad_scores: map(&[
                ("0000", 5.0),
                ("1111", 15.0),
                ("2222", 6.0),
                ("3333", 10.0),
                ("4444", 12.0),
                ("5555", 20.0),
                ("6666", 18.0),
                ("7777", 14.0),
                ("8888", 30.0),
                ("9999", 30.0),
            ]),
            lucky_sequences: map(&[
                ("111", 30.0),
                ("222", -20.0),
                ("333", 25.0),
                ("444", 40.0),
                ("555", 50.0),
                ("666", 60.0),
                ("777", -30.0),
                ("888", 80.0),
                ("999", 100.0),
                ("000", -50.0),
                ("123", 35.0),
                ("234", 30.0),
                ("345", 30.0),
                ("456", 40.0),
                ("567", 45.0),
                ("678", 50.0),
                ("789", 55.0),
                ("890", 25.0),
                ("321", 20.0),
                ("432", 15.0),
                ("543", 15.0),
                ("654", 20.0),
                ("765", 25.0),
                ("876", 30.0),
                ("987", 35.0),
                ("098", 10.0),
                ("1234", 45.0),
                ("2345", 40.0),
                ("3456", 50.0),
                ("4567", 55.0),
                ("5678", 60.0),
                ("6789", 65.0),
                ("7890", 30.0),
                ("4321", 25.0),
                ("5432", 20.0),
                ("6543", 25.0),
                ("7654", 30.0),
                ("8765", 35.0),
                ("9876", 40.0),
                ("0987", 15.0),
            ]),
            famous_sequences: map(&[
                ("007", 20.0),
                ("911", 15.0),
                ("888", 80.0),
                ("999", 100.0),
                ("555", 50.0),
                ("168", 25.0),
                ("1688", 35.0),
                ("8888", 150.0),
                ("9999", 200.0),
                ("5555", 100.0),
                ("6666", 120.0),
                ("1357", 30.0),
                ("2468", 25.0),
                ("1248", 22.0),
                ("369", 18.0),
                ("147", 15.0),
                ("258", 13.0),
                ("159", 20.0),
                ("753", 18.0),
                ("246", 12.0),
                ("135", 15.0),
                ("579", 22.0),
                ("468", 18.0),
                ("789", 30.0),
                ("289", 15.0),
                ("639", 24.0),
                ("519", 16.0),
                ("919", 14.0),
                ("4289", 25.0),
                ("6395", 30.0),
                ("7895", 30.0),
                ("915", 15.0),
            ]),
            ending_premium: map(&[
                ("9999", 200.0),
                ("8888", 150.0),
                ("6666", 120.0),
                ("5555", 100.0),
                ("999", 100.0),
                ("888", 80.0),
                ("666", 60.0),
                ("555", 50.0),
                ("99", 40.0),
                ("88", 30.0),
                ("66", 20.0),
                ("55", 15.0),
                ("89", 25.0),
                ("98", 25.0),
                ("56", 20.0),
                ("65", 20.0),
                ("789", 30.0),
                ("456", 25.0),
                ("123", 35.0),
                ("678", 35.0),
                ("5678", 60.0),
                ("6789", 65.0),
                ("4567", 55.0),
                ("3456", 50.0),
                ("1234", 45.0),
                ("2345", 40.0),
                ("639", 25.0),
                ("6395", 35.0),
                ("63915", 40.0),
                ("6365", 35.0),
                ("6595", 25.0),
                ("6515", 25.0),
                ("5195", 25.0),
                ("5915", 25.0),
                ("4159", 20.0),
                ("4156", 25.0),
                ("4165", 20.0),
                ("2456", 30.0),
                ("2465", 25.0),
                ("4265", 25.0),
                ("4256", 20.0),
                ("1456", 30.0),
                ("1465", 25.0),
                ("1965", 22.0),
                ("1956", 25.0),
                ("3656", 30.0),
                ("6356", 25.0),
                ("3665", 20.0),
                ("9156", 25.0),
                ("63965", 40.0),
                ("6465", 20.0),
                ("465", 20.0),
                ("956", 25.0),
                ("965", 20.0),
                ("5456", 30.0),
                ("4556", 22.0),
                ("5156", 25.0),
                ("6456", 20.0),
                ("9456", 25.0),
            ]),
            abc_premium: map(&[
                ("789", 100.0),
                ("289", 45.0),
                ("639", 65.0),
                ("519", 30.0),
                ("919", 25.0),
                ("888", 30.0),
                ("999", 35.0),
                ("666", 25.0),
                ("555", 28.0),
                ("456", 50.0),
                ("567", 30.0),
                ("678", 30.0),
            ]),
            sum_scores: [
                (55, 20.0),
                (65, 18.0),
                (59, 23.0),
                (45, 30.0),
                (54, 25.0),
                (56, 19.0),
                (41, 15.0),
                (36, 10.0),
                (42, 10.0),
                (51, 15.0),
                (46, 8.0),
                (47, 5.0),
                (30, 5.0),
                (31, 5.0),
                (32, 4.0),
                (33, 4.0),
                (34, 4.0),
                (35, 6.0),
                (37, 5.0),
                (38, 5.0),
                (39, 6.0),
                (40, 5.0),
                (43, 5.0),
                (44, 6.0),
                (48, 6.0),
                (49, 7.0),
                (50, 7.0),
                (52, 7.0),
                (53, 7.0),
                (57, 7.0),
                (58, 8.0),
                (60, 6.0),
                (61, 6.0),
                (62, 6.0),
                (63, 7.0),
                (64, 7.0),
            ]
            .into_iter()
            .collect(),
            complexity: ComplexityScores {
                very_simple: -2.0,
                simple: 0.0,
                moderate: 2.0,
                complex: 5.0,
                very_complex: 10.0,
            },
            position_weights: [0.5, 0.6, 0.7, 0.8, 0.9, 1.0, 1.2, 1.5, 1.8, 2.0],
            digit_value_weights: [0.3, 0.4, 0.5, 0.8, 0.9, 1.0, 1.5, 2.0, 2.5, 3.0],
            popular_patterns: map(&[
                ("88", 30.0),
                ("99", 30.0),
                ("888", 50.0),
                ("999", 50.0),
                ("8888", 100.0),
                ("9999", 100.0),
                ("168", 40.0),
                ("268", 40.0),
                ("1234", 35.0),
                ("5678", 35.0),
                ("6789", 40.0),
            ]),
            special_prefixes: map(&[
                ("088", 50.0),
                ("089", 45.0),
                ("081", 40.0),
                ("086", 35.0),
                ("095", 30.0),
                ("096", 28.0),
                ("097", 26.0),
                ("098", 24.0),
            ]),
            market_tiers: vec![
                (1000.0, 1000.0),
                (800.0, 800.0),
                (600.0, 600.0),
                (400.0, 400.0),
                (200.0, 200.0),
                (0.0, 100.0),
            ],
        }
    }
}

impl ScoringTables {
    /// Power weight for a digit value.
    #[must_use]
    pub fn power(&self, digit: u8) -> f32 {
        self.power_weights[digit as usize]
    }

    /// Whether a digit is in the auspicious set.
    #[must_use]
    pub fn is_good(&self, digit: u8) -> bool {
        self.good_digits[digit as usize]
    }

    /// Whether a digit is in the inauspicious set.
    #[must_use]
    pub fn is_bad(&self, digit: u8) -> bool {
        self.bad_digits[digit as usize]
    }

    /// Longest-match ending premium for a canonical number: tries the last
    /// 5, 4, 3, then 2 digits and returns the first table hit.
    #[must_use]
    pub fn ending_score(&self, canonical: &str) -> f32 {
        for len in [5usize, 4, 3, 2] {
            let suffix = &canonical[canonical.len() - len..];
            if let Some(&score) = self.ending_premium.get(suffix) {
                return score;
            }
        }
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_digit_sets() {
        let t = ScoringTables::default();
        assert!(t.is_good(8));
        assert!(t.is_good(9));
        assert!(!t.is_good(0));
        assert!(t.is_bad(7));
        assert!(!t.is_bad(5));
    }

    #[test]
    fn test_power_weights() {
        let t = ScoringTables::default();
        assert_eq!(t.power(5), 10.0);
        assert_eq!(t.power(0), -5.0);
        assert_eq!(t.power(7), -2.0);
    }

    #[test]
    fn test_ending_score_longest_match_first() {
        let t = ScoringTables::default();
        // quad match wins over the shorter "99"
        assert_eq!(t.ending_score("0899999999"), 200.0);
        // only a pair match
        assert_eq!(t.ending_score("0812345688"), 30.0);
        // nothing premium
        assert_eq!(t.ending_score("0810101010"), 0.0);
    }

    #[test]
    fn test_overlapping_tables_stay_separate() {
        let t = ScoringTables::default();
        // "44" reads positive from the mystical table but sits in the
        // forbidden set; both readings must survive.
        assert_eq!(t.mystical_pairs["44"], 8.0);
        assert!(t.forbidden_pairs.contains("44"));
    }

    #[test]
    fn test_custom_tables_injectable() {
        let mut t = ScoringTables::default();
        t.power_weights = [1.0; 10];
        assert_eq!(t.power(0), 1.0);
        // Default stays untouched elsewhere
        let fresh = ScoringTables::default();
        assert_eq!(fresh.power(0), -5.0);
    }

    #[test]
    fn test_encoding_stable_across_round_trip() {
        // ordered maps keep the binary encoding reproducible, which the
        // artifact bit-identity guarantee depends on
        let t = ScoringTables::default();
        let bytes = bincode::serialize(&t).expect("serialize");
        let back: ScoringTables = bincode::deserialize(&bytes).expect("deserialize");
        let again = bincode::serialize(&back).expect("serialize");
        assert_eq!(bytes, again);
    }

    #[test]
    fn test_famous_and_lucky_disagree_on_triple_seven() {
        let t = ScoringTables::default();
        // lucky table penalizes 777, famous table does not list it
        assert_eq!(t.lucky_sequences["777"], -30.0);
        assert!(!t.famous_sequences.contains_key("777"));
    }
}
