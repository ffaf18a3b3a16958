//! String edit distance lower bound. The edit distance between the label
//! strings of equally-ordered traversals lower-bounds the tree edit
//! distance; both the preorder and the postorder strings are valid, so the
//! larger of the two distances is reported.

use crate::indexing::SEDIndex;
use crate::parsing::LabelId;

pub fn sed(t1: &SEDIndex, t2: &SEDIndex) -> usize {
    let (mut t1, mut t2) = (t1, t2);
    if t1.preorder.len() > t2.preorder.len() {
        (t1, t2) = (t2, t1);
    }

    let pre_dist = string_edit_distance(&t2.preorder, &t1.preorder);
    let post_dist = string_edit_distance(&t2.postorder, &t1.postorder);

    std::cmp::max(pre_dist, post_dist)
}

/// Two-row dynamic program over interned label strings; the cache row keeps
/// the previous DP row, so memory stays linear in the shorter string.
fn string_edit_distance(s1: &[LabelId], s2: &[LabelId]) -> usize {
    use std::cmp::min;
    // assumes size of s2 is smaller or equal than s1
    let s2len = s2.len();
    let mut cache: Vec<usize> = (1..s2len + 1).collect();
    let mut result = s2len;
    for (i, ca) in s1.iter().enumerate() {
        result = i + 1;
        let mut dist_b = i;

        for (j, cb) in s2.iter().enumerate() {
            let dist_a = dist_b + usize::from(ca != cb);
            unsafe {
                dist_b = *cache.get_unchecked(j);
                result = min(result + 1, min(dist_a, dist_b + 1));
                *cache.get_unchecked_mut(j) = result;
            }
        }
    }

    result
}

/// Thresholded variant: exact while the bound stays within `k`, anything
/// larger comes back as `k + 1`.
pub fn sed_k(t1: &SEDIndex, t2: &SEDIndex, k: usize) -> usize {
    let (mut t1, mut t2) = (t1, t2);
    if t1.preorder.len() > t2.preorder.len() {
        (t1, t2) = (t2, t1);
    }
    let k = k + 1;
    let pre_dist = bounded_string_edit_distance(&t1.preorder, &t2.preorder, k);

    if pre_dist > k {
        return pre_dist;
    }

    let post_dist = bounded_string_edit_distance(&t1.postorder, &t2.postorder, k);

    std::cmp::max(pre_dist, post_dist)
}

/// Banded string edit distance by Hal Berghel and David Roach: only the
/// diagonals reachable within `k` errors are expanded, with prefix and
/// suffix trimming up front.
pub fn bounded_string_edit_distance(s1: &[LabelId], s2: &[LabelId], k: usize) -> usize {
    use std::cmp::{max, min};
    // assumes size of s2 is smaller or equal than s1
    let mut s1len = s1.len();
    let mut s2len = s2.len();
    // perform suffix trimming
    for _ in s1
        .iter()
        .rev()
        .zip(s2.iter().rev())
        .take_while(|(s1c, s2c)| s1c == s2c)
    {
        s1len -= 1;
        s2len -= 1;
        if s1len == 0 {
            break;
        }
    }

    let mut common_prefix = 0;

    // now prefix trimming
    for _ in s1.iter().zip(s2.iter()).take_while(|(s1c, s2c)| s1c == s2c) {
        common_prefix += 1;
        if common_prefix >= s1len {
            break;
        }
    }

    if s1len == 0 {
        return s2len;
    }

    // prefix trimming done
    let s1 = &s1[common_prefix..s1len];
    let s2 = &s2[common_prefix..s2len];

    s1len -= common_prefix;
    s2len -= common_prefix;
    // one string is gone by suffix and prefix trimming, so just return the remaining size
    if s1len == 0 {
        return s2len;
    }
    let s1len = s1len as i64;
    let s2len = s2len as i64;

    let threshold = min(s2len, k as i64);
    let size_diff = s2len - s1len;

    if threshold < size_diff {
        return threshold as usize;
    }

    let zero_k: i64 = ((if s1len < threshold { s1len } else { threshold }) >> 1) + 2;

    let arr_len = size_diff + (zero_k) * 2 + 2;

    let mut current_row = vec![-1i64; arr_len as usize];
    let mut next_row = vec![-1i64; arr_len as usize];
    let mut i = 0;
    let condition_row = size_diff + zero_k;
    let end_max = condition_row << 1;

    loop {
        i += 1;
        std::mem::swap(&mut next_row, &mut current_row);

        let start: i64;
        let mut next_cell: i64;
        let mut previous_cell: i64;
        let mut current_cell: i64 = -1;

        if i <= zero_k {
            start = -i + 1;
            next_cell = i - 2i64;
        } else {
            start = i - (zero_k << 1) + 1;
            unsafe {
                next_cell = *current_row.get_unchecked((zero_k + start) as usize);
            }
        }

        let end: i64;
        if i <= condition_row {
            end = i;
            unsafe {
                *next_row.get_unchecked_mut((zero_k + i) as usize) = -1;
            }
        } else {
            end = end_max - i;
        }

        let mut row_index = (start + zero_k) as usize;

        let mut t;

        for q in start..end {
            previous_cell = current_cell;
            current_cell = next_cell;
            unsafe {
                next_cell = *current_row.get_unchecked(row_index + 1);
            }

            // max()
            t = max(max(current_cell + 1, previous_cell), next_cell + 1);

            unsafe {
                while t < s1len
                    && (t + q) < s2len
                    && s1.get_unchecked(t as usize) == s2.get_unchecked((t + q) as usize)
                {
                    t += 1;
                }
            }

            unsafe {
                *next_row.get_unchecked_mut(row_index) = t;
            }
            row_index += 1;
        }

        unsafe {
            if !(*next_row.get_unchecked(condition_row as usize) < s1len && i <= threshold) {
                break (i - 1) as usize;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexing::Indexer;
    use crate::parsing::{parse_single, LabelDict};

    #[test]
    fn test_sed() {
        let v1 = vec![1, 2, 3, 4, 5, 5, 6];
        let v2 = vec![1, 2, 3, 5, 6, 7, 6];

        let result = string_edit_distance(&v1, &v2);
        assert_eq!(result, 3);
    }

    #[test]
    fn test_sed_k() {
        let v1 = vec![1, 2, 3, 4, 5, 5, 6];
        let v2 = vec![1, 2, 3, 5, 6, 7, 6];

        let result = bounded_string_edit_distance(&v1, &v2, 2);
        assert_eq!(result, 2);

        let result = bounded_string_edit_distance(&v1, &v2, 4);
        assert_eq!(result, 3);
    }

    #[test]
    fn test_sed_lower_bounds_ted() {
        use crate::cost::UnitCostModel;
        use crate::indexing::TreeIndex;
        use crate::ted::zhang_shasha::ZhangShasha;
        use crate::ted::TedEngine;

        let pairs = [
            ("{a{b}{c}}", "{a{c}{b}}"),
            ("{a{b{c{d}}}}", "{a{b}}"),
            ("{f{d{a}{c{b}}}{e}}", "{f{c{d{a}{b}}}{e}}"),
        ];
        for (s1, s2) in pairs {
            let mut ld = LabelDict::new();
            let t1 = parse_single(s1.to_owned(), &mut ld).unwrap();
            let t2 = parse_single(s2.to_owned(), &mut ld).unwrap();
            let s1i = SEDIndex::index_tree(&t1, &ld);
            let s2i = SEDIndex::index_tree(&t2, &ld);
            let i1 = TreeIndex::index_tree(&t1, &ld);
            let i2 = TreeIndex::index_tree(&t2, &ld);
            let mut zs = ZhangShasha::new(UnitCostModel);
            let exact = zs.ted(&i1, &i2);
            assert!(sed(&s1i, &s2i) as f64 <= exact, "{s1} vs {s2}");
        }
    }

    #[test]
    fn test_sed_identity() {
        let mut ld = LabelDict::new();
        let t = parse_single("{a{b}{c{d}}}".to_owned(), &mut ld).unwrap();
        let i = SEDIndex::index_tree(&t, &ld);
        assert_eq!(sed(&i, &i), 0);
        assert_eq!(sed_k(&i, &i, 3), 0);
    }
}
