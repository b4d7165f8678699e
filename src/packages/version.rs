//! Dotted version normalization and ordering.
//!
//! Plain string comparison puts "1.9" after "1.10", so version strings are
//! normalized first: each dot-separated part is parsed as a number and
//! zero-padded to a fixed width, making lexicographic order agree with
//! numeric order. This holds for parts up to five digits; wider parts such
//! as embedded dates (`7.0.15.20240503`) fall back to string order and are
//! not supported.

use std::cmp::Ordering;

use tracing::warn;

/// Width each numeric part is padded to.
const PART_WIDTH: usize = 5;

/// Part counts beyond this are accepted but logged; nothing upstream uses
/// more.
const EXPECTED_MAX_PARTS: usize = 5;

/// Normalizes a dotted version string into its fixed-width form, e.g.
/// `1.22.3` becomes `00001.00022.00003`. Parts that do not parse as
/// numbers count as zero.
pub fn normalize(version: &str) -> String {
    let parts: Vec<u64> = version
        .split('.')
        .map(|part| part.parse().unwrap_or(0))
        .collect();

    if parts.len() > EXPECTED_MAX_PARTS {
        warn!(
            "version string '{}' has more than {} parts",
            version, EXPECTED_MAX_PARTS
        );
    }

    parts
        .iter()
        .map(|part| format!("{:0width$}", part, width = PART_WIDTH))
        .collect::<Vec<_>>()
        .join(".")
}

/// Orders two version strings by numeric magnitude of their parts.
pub fn compare(a: &str, b: &str) -> Ordering {
    normalize(a).cmp(&normalize(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1.22.3", "00001.00022.00003")]
    #[case("1.9", "00001.00009")]
    #[case("502.0.0", "00502.00000.00000")]
    #[case("7", "00007")]
    #[case("1.x.3", "00001.00000.00003")]
    fn normalize_pads_each_part(#[case] version: &str, #[case] expected: &str) {
        assert_eq!(normalize(version), expected);
    }

    #[rstest]
    #[case("1.9", "1.10", Ordering::Less)]
    #[case("1.2.3", "1.2.10", Ordering::Less)]
    #[case("1.22", "1.22.1", Ordering::Less)]
    #[case("1.22.3", "1.22.3", Ordering::Equal)]
    #[case("1.22.10", "1.22.9", Ordering::Greater)]
    #[case("2.0", "1.99.99", Ordering::Greater)]
    fn compare_orders_by_numeric_parts(
        #[case] a: &str,
        #[case] b: &str,
        #[case] expected: Ordering,
    ) {
        assert_eq!(compare(a, b), expected);
    }

    #[test]
    fn sorting_with_compare_yields_numeric_order() {
        let mut versions = vec!["1.10", "1.9", "1.21.3", "1.2", "1.21"];
        versions.sort_by(|a, b| compare(a, b));

        assert_eq!(versions, vec!["1.2", "1.9", "1.10", "1.21", "1.21.3"]);
    }

    #[test]
    fn versions_with_many_parts_still_compare() {
        assert_eq!(compare("1.2.3.4.5.6", "1.2.3.4.5.7"), Ordering::Less);
    }
}
