//! Pure per-number feature functions.
//!
//! Every function here maps a canonical 10-digit number (plus the immutable
//! scoring tables where needed) to one scalar. All functions are
//! deterministic and total over valid [`PhoneNumber`]s; validation happens
//! upstream, never here.

use crate::phone::PhoneNumber;
use crate::scoring::ScoringTables;

// Digits whose repetition carries the strongest market premium.
const POWER_DIGITS: [u8; 4] = [5, 6, 8, 9];

fn is_power_digit(d: u8) -> bool {
    POWER_DIGITS.contains(&d)
}

// ---------------------------------------------------------------------------
// digit statistics
// ---------------------------------------------------------------------------

/// Sum of all ten digit values.
#[must_use]
pub fn digit_sum(p: &PhoneNumber) -> f32 {
    p.digits().iter().map(|&d| f32::from(d)).sum()
}

/// Number of distinct digit values present.
#[must_use]
pub fn unique_digit_count(p: &PhoneNumber) -> f32 {
    let mut seen = [false; 10];
    for d in p.digits() {
        seen[d as usize] = true;
    }
    seen.iter().filter(|&&s| s).count() as f32
}

/// Distinct digits divided by length.
#[must_use]
pub fn unique_ratio(p: &PhoneNumber) -> f32 {
    unique_digit_count(p) / 10.0
}

/// Count of digits in the auspicious set.
#[must_use]
pub fn good_digit_count(p: &PhoneNumber, t: &ScoringTables) -> f32 {
    p.digits().iter().filter(|&&d| t.is_good(d)).count() as f32
}

/// Count of digits in the inauspicious set.
#[must_use]
pub fn bad_digit_count(p: &PhoneNumber, t: &ScoringTables) -> f32 {
    p.digits().iter().filter(|&&d| t.is_bad(d)).count() as f32
}

/// Population variance of the digit values.
#[must_use]
pub fn digit_variance(p: &PhoneNumber) -> f32 {
    let d = p.digits();
    let mean = d.iter().map(|&x| f32::from(x)).sum::<f32>() / 10.0;
    d.iter()
        .map(|&x| {
            let diff = f32::from(x) - mean;
            diff * diff
        })
        .sum::<f32>()
        / 10.0
}

/// Shannon entropy (bits) of the digit multiset.
#[must_use]
pub fn shannon_entropy(p: &PhoneNumber) -> f32 {
    let mut counts = [0u32; 10];
    for d in p.digits() {
        counts[d as usize] += 1;
    }
    let mut entropy = 0.0;
    for &c in &counts {
        if c > 0 {
            let prob = c as f32 / 10.0;
            entropy -= prob * prob.log2();
        }
    }
    entropy
}

/// Number of runs in a run-length encoding of the digits.
#[must_use]
pub fn rle_size(p: &PhoneNumber) -> f32 {
    let d = p.digits();
    let mut runs = 1;
    for i in 1..10 {
        if d[i] != d[i - 1] {
            runs += 1;
        }
    }
    runs as f32
}

/// Sum of absolute differences between adjacent digits.
#[must_use]
pub fn digit_distance_sum(p: &PhoneNumber) -> f32 {
    let d = p.digits();
    (1..10)
        .map(|i| (i16::from(d[i]) - i16::from(d[i - 1])).unsigned_abs() as f32)
        .sum()
}

/// Occurrence count of one digit value.
#[must_use]
pub fn digit_count(p: &PhoneNumber, digit: u8) -> f32 {
    p.digits().iter().filter(|&&d| d == digit).count() as f32
}

// ---------------------------------------------------------------------------
// repetition and runs
// ---------------------------------------------------------------------------

/// Length of the longest run of one identical digit.
#[must_use]
pub fn max_consecutive_run(p: &PhoneNumber) -> f32 {
    let d = p.digits();
    let mut best = 1;
    let mut current = 1;
    for i in 1..10 {
        if d[i] == d[i - 1] {
            current += 1;
            best = best.max(current);
        } else {
            current = 1;
        }
    }
    best as f32
}

/// Highest occurrence count of any single digit.
#[must_use]
pub fn max_digit_repeat(p: &PhoneNumber) -> f32 {
    let mut counts = [0u32; 10];
    for d in p.digits() {
        counts[d as usize] += 1;
    }
    counts.iter().copied().max().unwrap_or(0) as f32
}

/// 1.0 when some length-2 block occurs at least twice.
#[must_use]
pub fn has_repeating_pair(p: &PhoneNumber) -> f32 {
    has_repeating_block(p.as_str(), 2)
}

/// 1.0 when some length-3 block occurs at least twice.
#[must_use]
pub fn has_repeating_triplet(p: &PhoneNumber) -> f32 {
    has_repeating_block(p.as_str(), 3)
}

fn has_repeating_block(s: &str, len: usize) -> f32 {
    for i in 0..=(s.len() - len) {
        let block = &s[i..i + len];
        if s[i + len..].contains(block) {
            return 1.0;
        }
    }
    0.0
}

/// Sum of table scores over every double (AA) window, with a bonus for
/// power-digit doubles.
#[must_use]
pub fn double_score(p: &PhoneNumber, t: &ScoringTables) -> f32 {
    let s = p.as_str();
    let d = p.digits();
    let mut score = 0.0;
    for i in 0..9 {
        if d[i] == d[i + 1] {
            score += t.double_scores.get(&s[i..i + 2]).copied().unwrap_or(5.0);
            if is_power_digit(d[i]) {
                score += 5.0;
            }
        }
    }
    score
}

/// Sum of table scores over every triple (AAA) window, with power bonus.
#[must_use]
pub fn triple_score(p: &PhoneNumber, t: &ScoringTables) -> f32 {
    let s = p.as_str();
    let d = p.digits();
    let mut score = 0.0;
    for i in 0..8 {
        if d[i] == d[i + 1] && d[i + 1] == d[i + 2] {
            score += t.triple_scores.get(&s[i..i + 3]).copied().unwrap_or(20.0);
            if is_power_digit(d[i]) {
                score += 10.0;
            }
        }
    }
    score
}

/// Sum of table scores over every quad (AAAA) window, with power bonus.
#[must_use]
pub fn quad_score(p: &PhoneNumber, t: &ScoringTables) -> f32 {
    let s = p.as_str();
    let d = p.digits();
    let mut score = 0.0;
    for i in 0..7 {
        if d[i] == d[i + 1] && d[i + 1] == d[i + 2] && d[i + 2] == d[i + 3] {
            score += t.quad_scores.get(&s[i..i + 4]).copied().unwrap_or(50.0);
            if is_power_digit(d[i]) {
                score += 25.0;
            }
        }
    }
    score
}

/// 1.0 when any digit occurs at least three times in a row.
#[must_use]
pub fn triple_repeat_flag(p: &PhoneNumber) -> f32 {
    if max_consecutive_run(p) >= 3.0 {
        1.0
    } else {
        0.0
    }
}

/// 1.0 when any digit occurs at least four times in a row.
#[must_use]
pub fn quad_repeat_flag(p: &PhoneNumber) -> f32 {
    if max_consecutive_run(p) >= 4.0 {
        1.0
    } else {
        0.0
    }
}

/// Number of distinct adjacent pairs.
#[must_use]
pub fn unique_pair_count(p: &PhoneNumber) -> f32 {
    let s = p.as_str();
    let mut pairs: Vec<&str> = (0..9).map(|i| &s[i..i + 2]).collect();
    pairs.sort_unstable();
    pairs.dedup();
    pairs.len() as f32
}

/// Number of distinct adjacent triplets.
#[must_use]
pub fn unique_triplet_count(p: &PhoneNumber) -> f32 {
    let s = p.as_str();
    let mut triplets: Vec<&str> = (0..8).map(|i| &s[i..i + 3]).collect();
    triplets.sort_unstable();
    triplets.dedup();
    triplets.len() as f32
}

/// 1.0 when the tail contains an ABAB alternation over four digits.
#[must_use]
pub fn alternating_pattern(p: &PhoneNumber) -> f32 {
    let d = p.digits();
    for i in 0..7 {
        if d[i] == d[i + 2] && d[i + 1] == d[i + 3] && d[i] != d[i + 1] {
            return 1.0;
        }
    }
    0.0
}

// ---------------------------------------------------------------------------
// sequences
// ---------------------------------------------------------------------------

/// Sum of lucky-sequence table hits over all 3- and 4-digit windows.
#[must_use]
pub fn sequence_score(p: &PhoneNumber, t: &ScoringTables) -> f32 {
    let s = p.as_str();
    let mut score = 0.0;
    for len in [3usize, 4] {
        for i in 0..=(10 - len) {
            if let Some(&v) = t.lucky_sequences.get(&s[i..i + len]) {
                score += v;
            }
        }
    }
    score
}

/// Famous-sequence score: each contained key scores once, half again when
/// the number ends with it.
#[must_use]
pub fn famous_sequence_score(p: &PhoneNumber, t: &ScoringTables) -> f32 {
    let s = p.as_str();
    let mut score = 0.0;
    for (key, &v) in &t.famous_sequences {
        if s.contains(key.as_str()) {
            score += if s.ends_with(key.as_str()) { v * 1.5 } else { v };
        }
    }
    score
}

/// Position-sensitive famous-sequence score: the tail multiplies hardest.
#[must_use]
pub fn famous_sequence_advanced(p: &PhoneNumber, t: &ScoringTables) -> f32 {
    let s = p.as_str();
    let last4 = &s[6..];
    let first3 = &s[..3];
    let mut score = 0.0;
    for (key, &v) in &t.famous_sequences {
        if !s.contains(key.as_str()) {
            continue;
        }
        let mult = if s.ends_with(key.as_str()) {
            2.5
        } else if last4.contains(key.as_str()) {
            1.8
        } else if first3.contains(key.as_str()) {
            1.3
        } else {
            1.0
        };
        score += v * mult;
    }
    score
}

/// Count of adjacent positions where the next digit is exactly one higher.
#[must_use]
pub fn ascending_count(p: &PhoneNumber) -> f32 {
    let d = p.digits();
    (1..10).filter(|&i| d[i] == d[i - 1] + 1).count() as f32
}

/// Count of adjacent positions where the next digit is exactly one lower.
#[must_use]
pub fn descending_count(p: &PhoneNumber) -> f32 {
    let d = p.digits();
    (1..10).filter(|&i| d[i] + 1 == d[i - 1]).count() as f32
}

/// 1.0 when all adjacent differences are equal and nonzero.
#[must_use]
pub fn arithmetic_sequence_flag(p: &PhoneNumber) -> f32 {
    let d = p.digits();
    let diff = i16::from(d[1]) - i16::from(d[0]);
    if diff == 0 {
        return 0.0;
    }
    for i in 2..10 {
        if i16::from(d[i]) - i16::from(d[i - 1]) != diff {
            return 0.0;
        }
    }
    1.0
}

/// Length of the longest strictly increasing (not necessarily adjacent)
/// digit subsequence.
#[must_use]
pub fn longest_increasing_subsequence(p: &PhoneNumber) -> f32 {
    let d = p.digits();
    let mut lengths = [1usize; 10];
    for i in 1..10 {
        for j in 0..i {
            if d[j] < d[i] {
                lengths[i] = lengths[i].max(lengths[j] + 1);
            }
        }
    }
    lengths.iter().copied().max().unwrap_or(1) as f32
}

/// Count of contained lucky three-digit combos.
#[must_use]
pub fn lucky_combo_count(p: &PhoneNumber) -> f32 {
    const COMBOS: [&str; 7] = ["168", "268", "369", "888", "999", "789", "456"];
    let s = p.as_str();
    COMBOS.iter().filter(|c| s.contains(**c)).count() as f32
}

// ---------------------------------------------------------------------------
// positional scores
// ---------------------------------------------------------------------------

/// Sum of per-digit power weights over the whole number.
#[must_use]
pub fn power_sum(p: &PhoneNumber, t: &ScoringTables) -> f32 {
    p.digits().iter().map(|&d| t.power(d)).sum()
}

/// Power weight of the digit at one position, scaled by ten.
#[must_use]
pub fn position_power(p: &PhoneNumber, t: &ScoringTables, pos: usize) -> f32 {
    t.power(p.digits()[pos]) * 10.0
}

/// Position-weighted value score: tail positions and high-value digits
/// dominate.
#[must_use]
pub fn position_weighted_score(p: &PhoneNumber, t: &ScoringTables) -> f32 {
    let d = p.digits();
    (0..10)
        .map(|i| t.position_weights[i] * t.digit_value_weights[d[i] as usize] * 10.0)
        .sum()
}

/// ABC position score: weights positions by their market salience class
/// (tail and first digit highest), with a bonus when a power digit sits in
/// an A position and a table bonus for premium middle ("abc") blocks.
#[must_use]
pub fn abc_position_score(p: &PhoneNumber, t: &ScoringTables) -> f32 {
    const A_POSITIONS: [usize; 5] = [0, 6, 7, 8, 9];
    const B_POSITIONS: [usize; 3] = [1, 2, 5];
    const C_POSITIONS: [usize; 2] = [3, 4];
    let d = p.digits();
    let mut score = 0.0;
    for &i in &A_POSITIONS {
        score += t.power(d[i]) * 3.0;
        if is_power_digit(d[i]) {
            score += 10.0;
        }
    }
    for &i in &B_POSITIONS {
        score += t.power(d[i]) * 2.0;
    }
    for &i in &C_POSITIONS {
        score += t.power(d[i]);
    }
    score += t.abc_premium.get(&p.as_str()[3..6]).copied().unwrap_or(0.0);
    score
}

/// Prefix score: a fixed score for known operator prefixes, otherwise the
/// power sum of the first three digits.
#[must_use]
pub fn prefix_score(p: &PhoneNumber, t: &ScoringTables) -> f32 {
    let prefix = &p.as_str()[..3];
    t.special_prefixes
        .get(prefix)
        .copied()
        .unwrap_or_else(|| p.digits()[..3].iter().map(|&d| t.power(d)).sum())
}

/// Power sum of the middle section (positions 3..7).
#[must_use]
pub fn middle_section_power(p: &PhoneNumber, t: &ScoringTables) -> f32 {
    p.digits()[3..7].iter().map(|&d| t.power(d)).sum()
}

/// Structural bonus on the middle section (positions 3..7): all-same
/// beats a repeated two-block beats an ascending run; at most one fires.
#[must_use]
pub fn middle_pattern_score(p: &PhoneNumber) -> f32 {
    let d = &p.digits()[3..7];
    if d.iter().all(|&x| x == d[0]) {
        40.0
    } else if d[0] == d[2] && d[1] == d[3] {
        20.0
    } else if d.windows(2).all(|w| w[1] == w[0] + 1) {
        30.0
    } else {
        0.0
    }
}

/// Digit sum of positions 0..4.
#[must_use]
pub fn first_four_sum(p: &PhoneNumber) -> f32 {
    p.digits()[..4].iter().map(|&d| f32::from(d)).sum()
}

/// Digit sum of positions 4..6.
#[must_use]
pub fn middle_two_sum(p: &PhoneNumber) -> f32 {
    p.digits()[4..6].iter().map(|&d| f32::from(d)).sum()
}

/// Digit sum of positions 6..10.
#[must_use]
pub fn last_four_sum(p: &PhoneNumber) -> f32 {
    p.digits()[6..].iter().map(|&d| f32::from(d)).sum()
}

/// Absolute difference between the digit sums of the two halves.
#[must_use]
pub fn sum_diff_halves(p: &PhoneNumber) -> f32 {
    let d = p.digits();
    let first: f32 = d[..5].iter().map(|&x| f32::from(x)).sum();
    let last: f32 = d[5..].iter().map(|&x| f32::from(x)).sum();
    (first - last).abs()
}

/// Lookup score for the total digit sum.
#[must_use]
pub fn weighted_sum_score(p: &PhoneNumber, t: &ScoringTables) -> f32 {
    let total = p.digits().iter().map(|&d| u32::from(d)).sum::<u32>();
    t.sum_scores.get(&total).copied().unwrap_or(0.0)
}

/// Number of local maxima in the digit profile.
#[must_use]
pub fn peak_count(p: &PhoneNumber) -> f32 {
    let d = p.digits();
    (1..9)
        .filter(|&i| d[i] > d[i - 1] && d[i] > d[i + 1])
        .count() as f32
}

/// Number of local minima in the digit profile.
#[must_use]
pub fn valley_count(p: &PhoneNumber) -> f32 {
    let d = p.digits();
    (1..9)
        .filter(|&i| d[i] < d[i - 1] && d[i] < d[i + 1])
        .count() as f32
}

// ---------------------------------------------------------------------------
// cultural scores
// ---------------------------------------------------------------------------

/// Count of adjacent pairs from the premium set.
#[must_use]
pub fn premium_pair_count(p: &PhoneNumber, t: &ScoringTables) -> f32 {
    let s = p.as_str();
    (0..9)
        .filter(|&i| t.premium_pairs.contains(&s[i..i + 2]))
        .count() as f32
}

/// Sum of meaning scores for adjacent pairs.
#[must_use]
pub fn special_lucky_score(p: &PhoneNumber, t: &ScoringTables) -> f32 {
    let s = p.as_str();
    (0..9)
        .filter_map(|i| t.special_lucky_pairs.get(&s[i..i + 2]))
        .sum()
}

/// Position-amplified pair meaning score plus block and repetition bonuses.
#[must_use]
pub fn special_lucky_advanced(p: &PhoneNumber, t: &ScoringTables) -> f32 {
    let s = p.as_str();
    let mut score = 0.0;
    for i in 0..9 {
        if let Some(&v) = t.special_lucky_pairs.get(&s[i..i + 2]) {
            let mult = if i >= 6 {
                2.5
            } else if i >= 3 {
                1.5
            } else {
                1.0
            };
            score += v * mult;
        }
    }
    const BLESSED_TRIPLES: [&str; 6] = ["888", "999", "666", "168", "268", "369"];
    for triple in BLESSED_TRIPLES {
        if s.contains(triple) {
            score += 50.0;
        }
    }
    if digit_count(p, 8) >= 4.0 {
        score += 100.0;
    }
    if digit_count(p, 9) >= 3.0 {
        score += 80.0;
    }
    score
}

/// Sum of mystical pair scores (its table deliberately disagrees with the
/// lucky table on some pairs).
#[must_use]
pub fn mystical_pair_score(p: &PhoneNumber, t: &ScoringTables) -> f32 {
    let s = p.as_str();
    (0..9)
        .filter_map(|i| t.mystical_pairs.get(&s[i..i + 2]))
        .sum()
}

/// 1.0 when any adjacent pair is in the forbidden set.
#[must_use]
pub fn has_forbidden_pair(p: &PhoneNumber, t: &ScoringTables) -> f32 {
    let s = p.as_str();
    if (0..9).any(|i| t.forbidden_pairs.contains(&s[i..i + 2])) {
        1.0
    } else {
        0.0
    }
}

/// Count of adjacent pairs from the unlucky set.
#[must_use]
pub fn negative_pair_count(p: &PhoneNumber, t: &ScoringTables) -> f32 {
    let s = p.as_str();
    (0..9)
        .filter(|&i| t.negative_pairs.contains(&s[i..i + 2]))
        .count() as f32
}

/// Complexity score based on digit variety.
#[must_use]
pub fn complexity_score(p: &PhoneNumber, t: &ScoringTables) -> f32 {
    match unique_digit_count(p) as u32 {
        0..=2 => t.complexity.very_simple,
        3..=4 => t.complexity.simple,
        5..=6 => t.complexity.moderate,
        7..=8 => t.complexity.complex,
        _ => t.complexity.very_complex,
    }
}

// ---------------------------------------------------------------------------
// ending analysis
// ---------------------------------------------------------------------------

/// Longest-match premium score for the ending.
#[must_use]
pub fn ending_score(p: &PhoneNumber, t: &ScoringTables) -> f32 {
    t.ending_score(p.as_str())
}

/// Structure code of the last four digits:
/// 4 = AAAA, 3 = AAAB, 2 = AABB, 1 = ascending run, 0 = other.
#[must_use]
pub fn ending_pattern_type(p: &PhoneNumber) -> f32 {
    let d = &p.digits()[6..];
    if d[0] == d[1] && d[1] == d[2] && d[2] == d[3] {
        4.0
    } else if d[0] == d[1] && d[1] == d[2] {
        3.0
    } else if d[0] == d[1] && d[2] == d[3] {
        2.0
    } else if d[1] == d[0] + 1 && d[2] == d[1] + 1 && d[3] == d[2] + 1 {
        1.0
    } else {
        0.0
    }
}

/// Score for the structure of the last four digits, with perfect endings
/// scored highest.
#[must_use]
pub fn ending_pattern_score(p: &PhoneNumber) -> f32 {
    const PERFECT_ENDINGS: [&str; 6] = ["8888", "9999", "6666", "5555", "1688", "2688"];
    let last4 = p.suffix(4);
    if PERFECT_ENDINGS.contains(&last4) {
        return 200.0;
    }
    match ending_pattern_type(p) as u32 {
        4 => 150.0,
        3 => 100.0,
        2 => 80.0,
        1 => 60.0,
        _ => 20.0,
    }
}

/// Ending premium amplified by run structure and power-digit density in
/// the tail.
#[must_use]
pub fn ending_power_score(p: &PhoneNumber, t: &ScoringTables) -> f32 {
    let d = &p.digits()[6..];
    let base = t.ending_score(p.as_str());
    let power_count = d.iter().filter(|&&x| is_power_digit(x)).count() as f32;
    let mut score = base * 2.0 + power_count * 10.0;

    let mut unique = d.to_vec();
    unique.sort_unstable();
    unique.dedup();
    if unique.len() == 1 {
        score *= 3.0;
    } else if unique.len() == 2 {
        score *= 1.5;
    }
    score
}

/// How concentrated the number's digit power is in its tail.
#[must_use]
pub fn ending_power_concentration(p: &PhoneNumber, t: &ScoringTables) -> f32 {
    let d = p.digits();
    let tail_power: f32 = d[7..].iter().map(|&x| t.power(x)).sum();
    let total: f32 = d.iter().map(|&x| t.power(x).abs()).sum();
    let mut conc = tail_power / (total + 1.0) * 100.0;
    if tail_power > 15.0 {
        conc *= 1.5;
    }
    conc
}

// ---------------------------------------------------------------------------
// symmetry and shape
// ---------------------------------------------------------------------------

/// 2.0 for a full palindrome, 1.0 for a palindromic half, 0.0 otherwise.
#[must_use]
pub fn mirror_flag(p: &PhoneNumber) -> f32 {
    let d = p.digits();
    if (0..5).all(|i| d[i] == d[9 - i]) {
        return 2.0;
    }
    let front_half = d[0] == d[4] && d[1] == d[3];
    let back_half = d[5] == d[9] && d[6] == d[8];
    if front_half || back_half {
        return 1.0;
    }
    0.0
}

/// Graded mirror score: full palindromes highest, then palindromic blocks
/// and mirrored tails.
#[must_use]
pub fn mirror_score(p: &PhoneNumber) -> f32 {
    let d = p.digits();
    if (0..5).all(|i| d[i] == d[9 - i]) {
        return 100.0;
    }
    let mut score = 0.0;
    // palindromic interior blocks of length >= 4
    for len in (4..=8).rev() {
        for start in 0..=(10 - len) {
            let block = &d[start..start + len];
            if block.iter().eq(block.iter().rev()) {
                score += len as f32 * 10.0;
            }
        }
    }
    // mirrored tails read well on a handset display
    if d[6] == d[9] && d[7] == d[8] {
        score += 30.0;
    }
    if d[5] == d[9] && d[6] == d[8] {
        score += 50.0;
    }
    score
}

/// Fraction of mirrored position pairs, 0..=1.
#[must_use]
pub fn symmetry_score(p: &PhoneNumber) -> f32 {
    let d = p.digits();
    (0..5).filter(|&i| d[i] == d[9 - i]).count() as f32 / 5.0
}

/// Direction-change score; an oscillating profile reads as a "wave".
#[must_use]
pub fn wave_pattern_score(p: &PhoneNumber) -> f32 {
    let d = p.digits();
    let mut changes = 0;
    let mut prev_dir = 0i8;
    for i in 1..10 {
        let dir = match d[i].cmp(&d[i - 1]) {
            std::cmp::Ordering::Greater => 1i8,
            std::cmp::Ordering::Less => -1i8,
            std::cmp::Ordering::Equal => 0i8,
        };
        if dir != 0 && prev_dir != 0 && dir != prev_dir {
            changes += 1;
        }
        if dir != 0 {
            prev_dir = dir;
        }
    }
    if changes >= 3 {
        changes as f32 * 10.0
    } else {
        0.0
    }
}

/// Balance score from the half-sum difference: perfectly balanced halves
/// score highest.
#[must_use]
pub fn number_balance(p: &PhoneNumber) -> f32 {
    let diff = sum_diff_halves(p);
    if diff == 0.0 {
        50.0
    } else if diff <= 5.0 {
        30.0
    } else if diff <= 10.0 {
        15.0
    } else {
        0.0
    }
}

// ---------------------------------------------------------------------------
// beauty, rarity, demand
// ---------------------------------------------------------------------------

/// Mathematical-beauty score: Fibonacci pairs, square pairs, constant
/// difference, alternation.
#[must_use]
pub fn math_beauty_score(p: &PhoneNumber) -> f32 {
    const FIBONACCI: [u32; 12] = [0, 1, 1, 2, 3, 5, 8, 13, 21, 34, 55, 89];
    const SQUARES: [u32; 10] = [0, 1, 4, 9, 16, 25, 36, 49, 64, 81];
    let d = p.digits();
    let mut score = 0.0;
    for i in 0..9 {
        let pair = u32::from(d[i]) * 10 + u32::from(d[i + 1]);
        if FIBONACCI.contains(&pair) {
            score += 20.0;
        }
        if SQUARES.contains(&pair) {
            score += 15.0;
        }
    }
    if arithmetic_sequence_flag(p) == 1.0 {
        score += 40.0;
    }
    if alternating_pattern(p) == 1.0 {
        score += 30.0;
    }
    score
}

/// Rarity score from digit variety and repetition extremes.
#[must_use]
pub fn rarity_score(p: &PhoneNumber) -> f32 {
    let unique = unique_digit_count(p);
    let max_repeat = max_digit_repeat(p);
    let mut score = 0.0;
    if unique <= 2.0 {
        score += 100.0;
    } else if unique <= 3.0 {
        score += 60.0;
    }
    if max_repeat >= 5.0 {
        score += 80.0;
    } else if max_repeat >= 4.0 {
        score += 50.0;
    }
    if max_consecutive_run(p) >= 4.0 {
        score += 70.0;
    }
    score
}

/// Investment-grade score from the ending and scarcity.
#[must_use]
pub fn investment_grade(p: &PhoneNumber) -> f32 {
    const TOP_ENDINGS: [&str; 4] = ["8888", "9999", "6666", "5555"];
    const GOOD_ENDINGS: [&str; 3] = ["8899", "6688", "5566"];
    let last4 = p.suffix(4);
    let last3 = p.suffix(3);
    let mut score = 0.0;
    if TOP_ENDINGS.contains(&last4) {
        score += 100.0;
    } else if GOOD_ENDINGS.contains(&last4) {
        score += 80.0;
    } else if ending_pattern_type(p) == 4.0 {
        score += 60.0;
    }
    if last3 == "888" || last3 == "999" {
        score += 40.0;
    }
    if last3 == "168" || last3 == "268" {
        score += 30.0;
    }
    let ratio = unique_ratio(p);
    if ratio < 0.3 {
        score += 50.0;
    } else if ratio < 0.5 {
        score += 30.0;
    }
    score
}

/// Market-demand score from popular-pattern containment plus tail and
/// scarcity bonuses.
#[must_use]
pub fn market_demand_score(p: &PhoneNumber, t: &ScoringTables) -> f32 {
    let s = p.as_str();
    let mut score = 0.0;
    for (pattern, &v) in &t.popular_patterns {
        if s.contains(pattern.as_str()) {
            score += if s.ends_with(pattern.as_str()) { v * 1.5 } else { v };
        }
    }
    let d = p.digits();
    if d[6] == d[7] && d[7] == d[8] && d[8] == d[9] {
        score += 150.0;
    } else if d[7] == d[8] && d[8] == d[9] {
        score += 80.0;
    }
    if unique_digit_count(p) <= 4.0 {
        score += 60.0;
    }
    score
}

/// Coarse market-tier score from the combined premium signals.
#[must_use]
pub fn market_tier_score(p: &PhoneNumber, t: &ScoringTables) -> f32 {
    let combined = ending_power_score(p, t) + famous_sequence_advanced(p, t);
    for &(threshold, tier_score) in &t.market_tiers {
        if combined >= threshold {
            return tier_score;
        }
    }
    100.0
}

// ---------------------------------------------------------------------------
// composites
// ---------------------------------------------------------------------------

/// Ratio of power digits to the rest; numbers made entirely of power
/// digits saturate at 10.
#[must_use]
pub fn special_to_normal_ratio(p: &PhoneNumber) -> f32 {
    let special = p.digits().iter().filter(|&&d| is_power_digit(d)).count() as f32;
    if special >= 10.0 {
        return 10.0;
    }
    special / (10.0 - special)
}

/// Power sum normalized by the digit sum.
#[must_use]
pub fn power_to_sum_ratio(p: &PhoneNumber, t: &ScoringTables) -> f32 {
    power_sum(p, t) / (digit_sum(p) + 1.0)
}

/// The final composite premium score: a fixed blend of the strongest
/// sub-scores. Used as a feature and as the sanity-ranking signal.
#[must_use]
pub fn final_premium_score(p: &PhoneNumber, t: &ScoringTables) -> f32 {
    ending_power_score(p, t) * 3.0
        + famous_sequence_advanced(p, t) * 2.5
        + special_lucky_advanced(p, t) * 2.0
        + rarity_score(p) * 2.0
        + math_beauty_score(p) * 1.5
        + market_demand_score(p, t) * 1.5
        + position_weighted_score(p, t)
        + abc_position_score(p, t) * 0.8
        + wave_pattern_score(p) * 0.5
        + number_balance(p) * 0.3
}
