//! Reduction of a problem's votes to one concluded result.
//!
//! Votes are passed in cast order; relative majority ties are broken by
//! whichever value was cast first.

use crate::types::{AggregationMode, ConcludedResult, VoteValue};

pub fn aggregate(mode: AggregationMode, votes: &[VoteValue]) -> ConcludedResult {
    if votes.is_empty() {
        return ConcludedResult::NoVotes;
    }

    match mode {
        AggregationMode::Unanimous => unanimous(votes),
        AggregationMode::Average => average(votes),
        AggregationMode::Median => median(votes),
        AggregationMode::AbsoluteMajority => absolute_majority(votes),
        AggregationMode::RelativeMajority => relative_majority(votes),
    }
}

/// Distinct values with their counts, in order of first appearance
fn tally(votes: &[VoteValue]) -> Vec<(&VoteValue, usize)> {
    let mut counts: Vec<(String, &VoteValue, usize)> = Vec::new();
    for vote in votes {
        let key = vote.canonical();
        match counts.iter_mut().find(|(k, _, _)| *k == key) {
            Some(entry) => entry.2 += 1,
            None => counts.push((key, vote, 1)),
        }
    }
    counts.into_iter().map(|(_, v, c)| (v, c)).collect()
}

/// Numeric votes plus the number of votes that were not numeric
fn numeric(votes: &[VoteValue]) -> (Vec<f64>, usize) {
    let numbers: Vec<f64> = votes.iter().filter_map(VoteValue::as_number).collect();
    let excluded = votes.len() - numbers.len();
    (numbers, excluded)
}

fn concluded(value: VoteValue, excluded: usize) -> ConcludedResult {
    ConcludedResult::Value { value, excluded }
}

fn unanimous(votes: &[VoteValue]) -> ConcludedResult {
    match tally(votes).as_slice() {
        [(value, _)] => concluded((*value).clone(), 0),
        _ => ConcludedResult::NoConsensus,
    }
}

fn average(votes: &[VoteValue]) -> ConcludedResult {
    let (numbers, excluded) = numeric(votes);
    if numbers.is_empty() {
        return ConcludedResult::NoNumericVotes { excluded };
    }
    let mean = numbers.iter().sum::<f64>() / numbers.len() as f64;
    concluded(VoteValue::Number(mean), excluded)
}

fn median(votes: &[VoteValue]) -> ConcludedResult {
    let (mut numbers, excluded) = numeric(votes);
    if numbers.is_empty() {
        return ConcludedResult::NoNumericVotes { excluded };
    }
    numbers.sort_by(f64::total_cmp);
    let n = numbers.len();
    let middle = if n % 2 == 1 {
        numbers[n / 2]
    } else {
        (numbers[n / 2 - 1] + numbers[n / 2]) / 2.0
    };
    concluded(VoteValue::Number(middle), excluded)
}

fn absolute_majority(votes: &[VoteValue]) -> ConcludedResult {
    tally(votes)
        .into_iter()
        .find(|(_, count)| count * 2 > votes.len())
        .map(|(value, _)| concluded(value.clone(), 0))
        .unwrap_or(ConcludedResult::NoMajority)
}

fn relative_majority(votes: &[VoteValue]) -> ConcludedResult {
    let mut best: Option<(&VoteValue, usize)> = None;
    for (value, count) in tally(votes) {
        // Strictly greater keeps the earliest value on ties
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((value, count));
        }
    }
    match best {
        Some((value, _)) => concluded(value.clone(), 0),
        None => ConcludedResult::NoVotes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nums(values: &[f64]) -> Vec<VoteValue> {
        values.iter().map(|n| VoteValue::Number(*n)).collect()
    }

    fn value_of(result: &ConcludedResult) -> String {
        result
            .value()
            .map(|v| v.to_string())
            .unwrap_or_else(|| result.to_string())
    }

    #[test]
    fn test_average() {
        let result = aggregate(AggregationMode::Average, &nums(&[1.0, 2.0, 3.0, 4.0]));
        assert_eq!(result.value(), Some(&VoteValue::Number(2.5)));
    }

    #[test]
    fn test_average_excludes_tokens() {
        let mut votes = nums(&[2.0, 4.0]);
        votes.push(VoteValue::from("pass"));
        votes.push(VoteValue::from("?"));

        let result = aggregate(AggregationMode::Average, &votes);
        assert_eq!(
            result,
            ConcludedResult::Value {
                value: VoteValue::Number(3.0),
                excluded: 2
            }
        );
    }

    #[test]
    fn test_average_only_tokens() {
        let votes = vec![VoteValue::from("pass"), VoteValue::from("coffee")];
        let result = aggregate(AggregationMode::Average, &votes);
        assert_eq!(result, ConcludedResult::NoNumericVotes { excluded: 2 });
    }

    #[test]
    fn test_numeric_strings_count_as_numbers() {
        let votes = vec![VoteValue::from("3"), VoteValue::Number(5.0)];
        let result = aggregate(AggregationMode::Average, &votes);
        assert_eq!(result.value(), Some(&VoteValue::Number(4.0)));
    }

    #[test]
    fn test_median_odd_and_even() {
        let result = aggregate(AggregationMode::Median, &nums(&[5.0, 1.0, 3.0]));
        assert_eq!(result.value(), Some(&VoteValue::Number(3.0)));

        let result = aggregate(AggregationMode::Median, &nums(&[8.0, 1.0, 3.0, 5.0]));
        assert_eq!(result.value(), Some(&VoteValue::Number(4.0)));
    }

    #[test]
    fn test_unanimous() {
        let result = aggregate(AggregationMode::Unanimous, &nums(&[2.0, 2.0, 2.0]));
        assert_eq!(value_of(&result), "2");

        let result = aggregate(AggregationMode::Unanimous, &nums(&[2.0, 3.0]));
        assert_eq!(result, ConcludedResult::NoConsensus);
        assert_eq!(result.to_string(), "no consensus");
    }

    #[test]
    fn test_unanimous_compares_canonically() {
        let votes = vec![VoteValue::Number(2.0), VoteValue::from("2"), VoteValue::from(" 2.0 ")];
        let result = aggregate(AggregationMode::Unanimous, &votes);
        assert_eq!(value_of(&result), "2");
    }

    #[test]
    fn test_negative_zero_equals_zero() {
        let result = aggregate(AggregationMode::Unanimous, &nums(&[0.0, -0.0]));
        assert!(result.value().is_some());
        assert_eq!(VoteValue::Number(-0.0).canonical(), "0");
    }

    #[test]
    fn test_absolute_majority() {
        let result = aggregate(
            AggregationMode::AbsoluteMajority,
            &nums(&[5.0, 5.0, 5.0, 8.0]),
        );
        assert_eq!(result.value(), Some(&VoteValue::Number(5.0)));

        // Exactly half is not a majority
        let result = aggregate(AggregationMode::AbsoluteMajority, &nums(&[5.0, 5.0, 8.0, 3.0]));
        assert_eq!(result, ConcludedResult::NoMajority);
    }

    #[test]
    fn test_relative_majority_tie_goes_to_first_cast() {
        let result = aggregate(
            AggregationMode::RelativeMajority,
            &nums(&[1.0, 1.0, 2.0, 2.0, 3.0]),
        );
        assert_eq!(result.value(), Some(&VoteValue::Number(1.0)));

        let result = aggregate(
            AggregationMode::RelativeMajority,
            &nums(&[2.0, 1.0, 1.0, 2.0, 3.0]),
        );
        assert_eq!(result.value(), Some(&VoteValue::Number(2.0)));
    }

    #[test]
    fn test_relative_majority_with_tokens() {
        let votes = vec![
            VoteValue::from("pass"),
            VoteValue::Number(3.0),
            VoteValue::from("pass"),
        ];
        let result = aggregate(AggregationMode::RelativeMajority, &votes);
        assert_eq!(value_of(&result), "pass");
    }

    #[test]
    fn test_no_votes() {
        for mode in [
            AggregationMode::Unanimous,
            AggregationMode::Average,
            AggregationMode::Median,
            AggregationMode::AbsoluteMajority,
            AggregationMode::RelativeMajority,
        ] {
            assert_eq!(aggregate(mode, &[]), ConcludedResult::NoVotes);
        }
    }
}
