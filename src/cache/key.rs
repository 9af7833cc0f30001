//! Cache key derivation: canonical category token plus a coarse budget bucket.

/// Budget bands, as `(exclusive upper bound, label)`.
const BUDGET_BUCKETS: [(u64, &str); 5] = [
    (100_000, "0-100k"),
    (500_000, "100k-500k"),
    (1_000_000, "500k-1m"),
    (5_000_000, "1m-5m"),
    (10_000_000, "5m-10m"),
];
const TOP_BUCKET: &str = "10m+";

/// Label of the fixed range containing `budget`.
pub fn budget_bucket(budget: u64) -> &'static str {
    BUDGET_BUCKETS
        .iter()
        .find(|(upper, _)| budget < *upper)
        .map(|(_, label)| *label)
        .unwrap_or(TOP_BUCKET)
}

/// Trim, lowercase, and join whitespace-separated words with `-`.
pub fn normalize_category(category: &str) -> String {
    category
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// Cache key `"<normalized-category>:<bucket>"`.
pub fn normalize(category: &str, budget: u64) -> String {
    format!("{}:{}", normalize_category(category), budget_bucket(budget))
}
