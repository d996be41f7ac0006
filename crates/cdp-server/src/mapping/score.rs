//! Heuristic suggestion scoring
//!
//! Base score = Jaccard similarity over lower-cased, delimiter-split name
//! tokens, combined multiplicatively with the data-type compatibility
//! factor. Levenshtein distance breaks ranking ties between equal scores.

use std::collections::HashSet;

use cdp_common::types::DataType;

/// The column part of a possibly `table.column`-qualified name.
pub fn column_part(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// Lower-cased tokens split on delimiters (`_`, `-`, `.`, whitespace).
pub fn tokenize(name: &str) -> HashSet<String> {
    name.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Jaccard similarity of two token sets. Empty sets score 0.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}

/// Classic dynamic-programming Levenshtein distance.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(prev[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut prev, &mut current);
    }

    prev[b.len()]
}

/// Base confidence for mapping a source attribute onto a target attribute.
pub fn base_score(
    source_name: &str,
    source_type: DataType,
    target_name: &str,
    target_type: DataType,
) -> f64 {
    let name_similarity = jaccard(&tokenize(column_part(source_name)), &tokenize(target_name));
    name_similarity * source_type.compatibility_factor(target_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_part() {
        assert_eq!(column_part("customers.cust_id"), "cust_id");
        assert_eq!(column_part("cust_id"), "cust_id");
    }

    #[test]
    fn test_tokenize_splits_delimiters() {
        let tokens = tokenize("Cust_ID");
        assert!(tokens.contains("cust"));
        assert!(tokens.contains("id"));
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn test_jaccard() {
        let a = tokenize("cust_id");
        let b = tokenize("customer_id");
        // shared token "id" out of {cust, customer, id}
        assert!((jaccard(&a, &b) - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(jaccard(&a, &a), 1.0);
        assert_eq!(jaccard(&a, &HashSet::new()), 0.0);
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("same", "same"), 0);
    }

    #[test]
    fn test_identifier_beats_unrelated_name() {
        // cust_id -> customer_id must outrank cust_id -> full_name
        let id_score = base_score(
            "customers.cust_id",
            DataType::Text,
            "customer_id",
            DataType::Text,
        );
        let name_score = base_score(
            "customers.cust_id",
            DataType::Text,
            "full_name",
            DataType::Text,
        );
        assert!(id_score > name_score);
    }

    #[test]
    fn test_type_mismatch_dampens_score() {
        let matching = base_score("score_value", DataType::Integer, "credit_score", DataType::Integer);
        let clashing = base_score("score_value", DataType::Date, "credit_score", DataType::Integer);
        assert!(matching > clashing);
    }
}
