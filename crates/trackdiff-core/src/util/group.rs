use std::ops::Range;

/// Splits `items` into maximal runs of equal keys, returned as
/// `(key, range)` pairs into `items`.
pub fn group_adjacent_ranges<T, K, F>(items: &[T], mut key_selector: F) -> Vec<(K, Range<usize>)>
where
    K: Eq,
    F: FnMut(&T) -> K,
{
    let mut groups: Vec<(K, Range<usize>)> = Vec::new();
    for (idx, item) in items.iter().enumerate() {
        let key = key_selector(item);
        match groups.last_mut() {
            Some((current_key, range)) if *current_key == key => range.end = idx + 1,
            _ => groups.push((key, idx..idx + 1)),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consecutive_equal_keys_share_a_group() {
        let items = [1, 1, 2, 2, 2, 1, 3, 3];
        let groups = group_adjacent_ranges(&items, |&x| x);
        assert_eq!(groups, vec![(1, 0..2), (2, 2..5), (1, 5..6), (3, 6..8)]);
    }

    #[test]
    fn empty_input_has_no_groups() {
        assert!(group_adjacent_ranges(&Vec::<i32>::new(), |&x| x).is_empty());
    }

    #[test]
    fn ranges_do_not_merge_separated_keys() {
        let words = ["a", "a", "b", "a"];
        let groups = group_adjacent_ranges(&words, |w| *w);
        assert_eq!(groups, vec![("a", 0..2), ("b", 2..3), ("a", 3..4)]);
    }
}
