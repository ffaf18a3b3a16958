//! Label multiset intersection lower bound. Every node that cannot be
//! matched to an equally-labelled node must be touched by an edit operation,
//! so `max(|T1|, |T2|)` minus the multiset intersection of the label sets is
//! a valid lower bound under unit costs.

use crate::indexing::InvertedListLabelPostorderIndex;

pub fn label_intersection(
    t1: &InvertedListLabelPostorderIndex,
    t2: &InvertedListLabelPostorderIndex,
) -> usize {
    use std::cmp::{max, min};
    let mut intersection_size = 0;
    for (label, postings) in t1.inverted_list.iter() {
        if let Some(t2postings) = t2.inverted_list.get(label) {
            intersection_size += min(t2postings.len(), postings.len());
        }
    }

    max(t1.c.tree_size, t2.c.tree_size) - intersection_size
}

/// Thresholded variant: bails out with `k + 1` on the size difference alone
/// and stops counting as soon as the bound can no longer exceed `k`.
pub fn label_intersection_k(
    t1: &InvertedListLabelPostorderIndex,
    t2: &InvertedListLabelPostorderIndex,
    k: usize,
) -> usize {
    use std::cmp::{max, min};
    let mut intersection_size = 0;
    let bigger_tree = max(t1.c.tree_size, t2.c.tree_size);

    if t1.c.tree_size.abs_diff(t2.c.tree_size) > k {
        return k + 1;
    }

    for (label, postings) in t1.inverted_list.iter() {
        let Some(t2postings) = t2.inverted_list.get(label) else {
            continue;
        };
        intersection_size += min(t2postings.len(), postings.len());

        if bigger_tree - intersection_size < k {
            return bigger_tree - intersection_size;
        }
    }

    bigger_tree - intersection_size
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexing::Indexer;
    use crate::parsing::{parse_single, LabelDict};

    #[test]
    fn test_label_intersection() {
        let mut ld = LabelDict::new();

        let t2 = parse_single("{b{e}{d{a}}}".to_owned(), &mut ld).unwrap();
        let t3 = parse_single("{d{c}{b{a}{d{a}}}}".to_owned(), &mut ld).unwrap();
        let t5 = parse_single("{a{b{a}{c{d}}}{d}}".to_owned(), &mut ld).unwrap();

        let t2i = InvertedListLabelPostorderIndex::index_tree(&t2, &ld);
        let t3i = InvertedListLabelPostorderIndex::index_tree(&t3, &ld);
        let t5i = InvertedListLabelPostorderIndex::index_tree(&t5, &ld);

        let t2t3_lb = label_intersection(&t2i, &t3i);
        let t3t5_lb = label_intersection(&t3i, &t5i);

        assert_eq!(3, t2t3_lb, "Label diff between t2 and t3 should be 3!");
        assert_eq!(0, t3t5_lb, "Label diff between t3 and t5 should be 0!");
    }

    #[test]
    fn test_missing_label_lb() {
        let i1 = "{pietro gobetti str.{8}{10}}".to_owned();
        let i2 = "{wendelsteinstrasse{1{{1}{2}{3}{4}{5}{6}{7}{14}}}}".to_owned();
        let mut ld = LabelDict::new();
        let t1 = parse_single(i1, &mut ld).unwrap();
        let t2 = parse_single(i2, &mut ld).unwrap();

        let t1i = InvertedListLabelPostorderIndex::index_tree(&t1, &ld);
        let t2i = InvertedListLabelPostorderIndex::index_tree(&t2, &ld);

        let lb = label_intersection(&t1i, &t2i);

        assert_eq!(lb, 11, "Lower bound is 11");
    }

    #[test]
    fn test_identity_is_zero() {
        let mut ld = LabelDict::new();
        let t = parse_single("{a{b}{c{d}}}".to_owned(), &mut ld).unwrap();
        let ti = InvertedListLabelPostorderIndex::index_tree(&t, &ld);
        assert_eq!(label_intersection(&ti, &ti), 0);
        assert_eq!(label_intersection_k(&ti, &ti, 2), 0);
    }

    #[test]
    fn test_threshold_variant_cuts_off_on_size() {
        let mut ld = LabelDict::new();
        let t1 = parse_single("{a}".to_owned(), &mut ld).unwrap();
        let t2 = parse_single("{a{b}{c}{d}{e}}".to_owned(), &mut ld).unwrap();
        let t1i = InvertedListLabelPostorderIndex::index_tree(&t1, &ld);
        let t2i = InvertedListLabelPostorderIndex::index_tree(&t2, &ld);
        assert_eq!(label_intersection_k(&t1i, &t2i, 2), 3);
    }
}
