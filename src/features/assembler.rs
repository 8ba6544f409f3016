//! Assembles the full feature table for a batch of phone numbers.
//!
//! The assembler runs every pattern scorer, joins frozen market statistics,
//! and derives interaction / ratio / squared / log columns, producing a
//! [`FeatureFrame`] whose column order is stable for a given configuration.
//! That recorded order is what the model artifact later aligns against.

use crate::error::{MongkolError, Result};
use crate::features::patterns;
use crate::market::MarketStatistics;
use crate::phone::PhoneNumber;
use crate::primitives::Matrix;
use crate::scoring::ScoringTables;
use tracing::{debug, warn};

/// Column names that must never enter the feature table. Price-derived
/// columns would leak the target; identifiers are not features.
const FORBIDDEN_COLUMNS: [&str; 4] = ["price", "log_price", "sample_weight", "phone_number"];

/// A named, row-major table of finite `f32` features.
#[derive(Debug, Clone)]
pub struct FeatureFrame {
    names: Vec<String>,
    rows: Vec<Vec<f32>>,
}

impl FeatureFrame {
    fn new(names: Vec<String>, rows: Vec<Vec<f32>>) -> Self {
        Self { names, rows }
    }

    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.names.len()
    }

    /// Column names in recorded order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Appends an externally computed column.
    ///
    /// Price-derived and identifier columns are refused with a warning
    /// rather than an error so callers can pass metadata tables through
    /// without pre-filtering.
    ///
    /// # Errors
    ///
    /// Returns [`MongkolError::DimensionMismatch`] when the column length
    /// does not match the frame's row count.
    pub fn push_column(&mut self, name: &str, values: &[f32]) -> Result<()> {
        if FORBIDDEN_COLUMNS.contains(&name) {
            warn!(column = name, "refusing target-derived or identifier column");
            return Ok(());
        }
        if values.len() != self.rows.len() {
            return Err(MongkolError::DimensionMismatch {
                expected: format!("{} rows", self.rows.len()),
                actual: format!("{} values for column {name}", values.len()),
            });
        }
        self.names.push(name.to_string());
        for (row, &v) in self.rows.iter_mut().zip(values) {
            row.push(sanitize(v));
        }
        Ok(())
    }

    /// The values of one column, or `None` if absent.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<Vec<f32>> {
        let idx = self.names.iter().position(|n| n == name)?;
        Some(self.rows.iter().map(|r| r[idx]).collect())
    }

    /// Converts the frame to a dense matrix in recorded column order.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty frame.
    pub fn to_matrix(&self) -> Result<Matrix<f32>> {
        if self.rows.is_empty() || self.names.is_empty() {
            return Err(MongkolError::empty_input("feature frame"));
        }
        let flat: Vec<f32> = self.rows.iter().flatten().copied().collect();
        Matrix::from_vec(self.rows.len(), self.names.len(), flat)
            .map_err(|e| MongkolError::ValidationError {
                message: e.to_string(),
            })
    }

    /// Reorders columns to match a trained model's expected feature names.
    ///
    /// Expected columns absent from this frame are zero-filled; extra
    /// columns are dropped. Both cases are logged, since a large overlap
    /// gap usually means the caller assembled features with different
    /// scoring tables or market statistics than the model was trained on.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty frame or empty expectation list.
    pub fn align_to(&self, expected: &[String]) -> Result<Matrix<f32>> {
        if expected.is_empty() {
            return Err(MongkolError::empty_input("expected feature names"));
        }
        if self.rows.is_empty() {
            return Err(MongkolError::empty_input("feature frame"));
        }
        let mut missing = 0usize;
        let indices: Vec<Option<usize>> = expected
            .iter()
            .map(|name| {
                let idx = self.names.iter().position(|n| n == name);
                if idx.is_none() {
                    missing += 1;
                }
                idx
            })
            .collect();
        if missing > 0 {
            warn!(
                missing,
                expected = expected.len(),
                "zero-filling feature columns absent from assembled frame"
            );
        }
        let dropped = self.names.len() + missing - expected.len();
        if dropped > 0 {
            debug!(dropped, "dropping assembled columns the model does not use");
        }

        let mut flat = Vec::with_capacity(self.rows.len() * expected.len());
        for row in &self.rows {
            for idx in &indices {
                flat.push(idx.map_or(0.0, |i| row[i]));
            }
        }
        Matrix::from_vec(self.rows.len(), expected.len(), flat)
            .map_err(|e| MongkolError::ValidationError {
                message: e.to_string(),
            })
    }
}

fn sanitize(v: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// Runs the pattern library plus market joins and derived columns.
#[derive(Debug, Clone, Default)]
pub struct FeatureAssembler {
    tables: ScoringTables,
    market: Option<MarketStatistics>,
}

impl FeatureAssembler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: ScoringTables::default(),
            market: None,
        }
    }

    /// Replaces the scoring tables (all table-driven features change with
    /// them, so the recorded column values are a function of this choice).
    #[must_use]
    pub fn with_tables(mut self, tables: ScoringTables) -> Self {
        self.tables = tables;
        self
    }

    /// Attaches frozen training-partition market statistics; enables the
    /// `market_*` column block.
    #[must_use]
    pub fn with_market_stats(mut self, market: MarketStatistics) -> Self {
        self.market = Some(market);
        self
    }

    #[must_use]
    pub fn market_stats(&self) -> Option<&MarketStatistics> {
        self.market.as_ref()
    }

    /// Assembles the feature table for a batch of numbers.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty batch.
    pub fn assemble(&self, phones: &[PhoneNumber]) -> Result<FeatureFrame> {
        if phones.is_empty() {
            return Err(MongkolError::empty_input("phone batch"));
        }
        let first = self.feature_row(&phones[0]);
        let names: Vec<String> = first.iter().map(|(n, _)| n.clone()).collect();
        let mut rows = Vec::with_capacity(phones.len());
        rows.push(first.into_iter().map(|(_, v)| sanitize(v)).collect());
        for phone in &phones[1..] {
            let row = self.feature_row(phone);
            debug_assert_eq!(row.len(), names.len());
            rows.push(row.into_iter().map(|(_, v)| sanitize(v)).collect());
        }
        debug!(
            n_rows = rows.len(),
            n_cols = names.len(),
            with_market = self.market.is_some(),
            "assembled feature frame"
        );
        Ok(FeatureFrame::new(names, rows))
    }

    fn feature_row(&self, p: &PhoneNumber) -> Vec<(String, f32)> {
        let t = &self.tables;
        let mut out: Vec<(String, f32)> = Vec::with_capacity(160);
        let mut push = |name: &str, value: f32| out.push((name.to_string(), value));

        // basic digit statistics
        push("digit_sum", patterns::digit_sum(p));
        push("unique_digit_count", patterns::unique_digit_count(p));
        push("unique_ratio", patterns::unique_ratio(p));
        push("good_digit_count", patterns::good_digit_count(p, t));
        push("bad_digit_count", patterns::bad_digit_count(p, t));
        push("digit_variance", patterns::digit_variance(p));
        push("shannon_entropy", patterns::shannon_entropy(p));
        push("rle_size", patterns::rle_size(p));
        push("digit_distance_sum", patterns::digit_distance_sum(p));
        for d in 0u8..10 {
            push(&format!("count_digit_{d}"), patterns::digit_count(p, d));
        }

        // repetition
        push("max_consecutive_run", patterns::max_consecutive_run(p));
        push("max_digit_repeat", patterns::max_digit_repeat(p));
        push("has_repeating_pair", patterns::has_repeating_pair(p));
        push("has_repeating_triplet", patterns::has_repeating_triplet(p));
        push("double_score", patterns::double_score(p, t));
        push("triple_score", patterns::triple_score(p, t));
        push("quad_score", patterns::quad_score(p, t));
        push("triple_repeat_flag", patterns::triple_repeat_flag(p));
        push("quad_repeat_flag", patterns::quad_repeat_flag(p));
        push("unique_pair_count", patterns::unique_pair_count(p));
        push("unique_triplet_count", patterns::unique_triplet_count(p));
        push("alternating_pattern", patterns::alternating_pattern(p));

        // sequences
        push("sequence_score", patterns::sequence_score(p, t));
        push("famous_sequence_score", patterns::famous_sequence_score(p, t));
        push(
            "famous_sequence_advanced",
            patterns::famous_sequence_advanced(p, t),
        );
        push("ascending_count", patterns::ascending_count(p));
        push("descending_count", patterns::descending_count(p));
        push(
            "arithmetic_sequence_flag",
            patterns::arithmetic_sequence_flag(p),
        );
        push(
            "longest_increasing_subsequence",
            patterns::longest_increasing_subsequence(p),
        );
        push("lucky_combo_count", patterns::lucky_combo_count(p));

        // positional power
        push("power_sum", patterns::power_sum(p, t));
        for pos in 0..10 {
            push(
                &format!("position_power_{pos}"),
                patterns::position_power(p, t, pos),
            );
        }
        push(
            "position_weighted_score",
            patterns::position_weighted_score(p, t),
        );
        push("abc_position_score", patterns::abc_position_score(p, t));
        push("prefix_score", patterns::prefix_score(p, t));
        push("middle_section_power", patterns::middle_section_power(p, t));
        push("middle_pattern_score", patterns::middle_pattern_score(p));

        // section sums
        push("first_four_sum", patterns::first_four_sum(p));
        push("middle_two_sum", patterns::middle_two_sum(p));
        push("last_four_sum", patterns::last_four_sum(p));
        push("sum_diff_halves", patterns::sum_diff_halves(p));
        push("weighted_sum_score", patterns::weighted_sum_score(p, t));
        push("peak_count", patterns::peak_count(p));
        push("valley_count", patterns::valley_count(p));

        // pair semantics
        push("premium_pair_count", patterns::premium_pair_count(p, t));
        push("special_lucky_score", patterns::special_lucky_score(p, t));
        push(
            "special_lucky_advanced",
            patterns::special_lucky_advanced(p, t),
        );
        push("mystical_pair_score", patterns::mystical_pair_score(p, t));
        push("has_forbidden_pair", patterns::has_forbidden_pair(p, t));
        push("negative_pair_count", patterns::negative_pair_count(p, t));
        push("complexity_score", patterns::complexity_score(p, t));

        // ending analysis
        push("ending_score", patterns::ending_score(p, t));
        push("ending_pattern_type", patterns::ending_pattern_type(p));
        push("ending_pattern_score", patterns::ending_pattern_score(p));
        push("ending_power_score", patterns::ending_power_score(p, t));
        push(
            "ending_power_concentration",
            patterns::ending_power_concentration(p, t),
        );

        // symmetry and aesthetics
        push("mirror_flag", patterns::mirror_flag(p));
        push("mirror_score", patterns::mirror_score(p));
        push("symmetry_score", patterns::symmetry_score(p));
        push("wave_pattern_score", patterns::wave_pattern_score(p));
        push("number_balance", patterns::number_balance(p));
        push("math_beauty_score", patterns::math_beauty_score(p));
        push("rarity_score", patterns::rarity_score(p));

        // market-facing composites
        push("investment_grade", patterns::investment_grade(p));
        push("market_demand_score", patterns::market_demand_score(p, t));
        push("market_tier_score", patterns::market_tier_score(p, t));
        push(
            "special_to_normal_ratio",
            patterns::special_to_normal_ratio(p),
        );
        push("power_to_sum_ratio", patterns::power_to_sum_ratio(p, t));
        push("final_premium_score", patterns::final_premium_score(p, t));

        // market statistics joins
        if let Some(market) = &self.market {
            push("market_avg_price_4", market.suffix_price(p, 4));
            push("market_avg_price_3", market.suffix_price(p, 3));
            push("market_avg_price_2", market.suffix_price(p, 2));
            push("pattern_popularity", market.popularity_score(p));
        }

        // derived columns reuse already-pushed values by name
        let get = |out: &[(String, f32)], name: &str| -> f32 {
            out.iter()
                .find(|(n, _)| n == name)
                .map_or(0.0, |(_, v)| *v)
        };
        let power_sum = get(&out, "power_sum");
        let digit_sum = get(&out, "digit_sum");
        let unique = get(&out, "unique_digit_count");
        let ending = get(&out, "ending_power_score");
        let lucky = get(&out, "special_lucky_advanced");
        let complexity = get(&out, "complexity_score");
        let rarity = get(&out, "rarity_score");
        let demand = get(&out, "market_demand_score");
        let beauty = get(&out, "math_beauty_score");
        let balance = get(&out, "number_balance");
        let good = get(&out, "good_digit_count");
        let bad = get(&out, "bad_digit_count");
        let special = get(&out, "special_lucky_score");
        let ending_base = get(&out, "ending_score");
        let final_premium = get(&out, "final_premium_score");

        let mut push = |name: &str, value: f32| out.push((name.to_string(), value));
        push("power_x_sum", power_sum * digit_sum);
        push("power_x_unique", power_sum * unique);
        push("power_x_ending", power_sum * ending);
        push("lucky_x_ending", lucky * ending);
        push("complexity_x_power", complexity * power_sum);
        push("rarity_x_demand", rarity * demand);
        push("beauty_x_balance", beauty * balance);

        push("good_to_bad_ratio", good / (bad + 1.0));
        push("special_to_total", special / (digit_sum + 1.0));
        push("ending_to_total", ending_base / (digit_sum + 1.0));

        push("ending_power_score_sq", ending * ending);
        push("power_sum_sq", power_sum * power_sum);
        push("special_lucky_advanced_sq", lucky * lucky);
        push("rarity_score_sq", rarity * rarity);

        push("log_ending_power", ending.max(0.0).ln_1p());
        push("log_final_premium", final_premium.max(0.0).ln_1p());
        push("log_special_lucky", lucky.max(0.0).ln_1p());

        out
    }
}
