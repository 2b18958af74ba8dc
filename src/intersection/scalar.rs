use crate::topology::VertexId;

/// Two-pointer merge over ascending lists.
///
/// Stops as soon as the remaining ranges cannot overlap, which on sparse graphs
/// is where most of the time is saved.
pub fn intersection(a: &[VertexId], b: &[VertexId]) -> usize {
    let (a_last, b_last) = match (a.last(), b.last()) {
        (Some(&a_last), Some(&b_last)) => (a_last, b_last),
        _ => return 0,
    };
    if a_last < b[0] || b_last < a[0] {
        return 0;
    }

    let (mut i, mut j) = (0usize, 0usize);
    let mut count = 0usize;
    while i < a.len() && j < b.len() {
        let (x, y) = (a[i], b[j]);
        if x == y {
            count += 1;
            i += 1;
            j += 1;
        } else if x < y {
            if a_last < y {
                break;
            }
            i += 1;
        } else {
            if b_last < x {
                break;
            }
            j += 1;
        }
    }
    count
}

/// Calls `f` with every element present in both lists, in ascending order.
pub fn for_each_common<F: FnMut(VertexId)>(a: &[VertexId], b: &[VertexId], mut f: F) {
    let (mut i, mut j) = (0usize, 0usize);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                f(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_overlap() {
        assert_eq!(intersection(&[1, 3, 5, 7], &[2, 3, 4, 7, 9]), 2);
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(intersection(&[], &[1, 2]), 0);
        assert_eq!(intersection(&[1, 2], &[]), 0);
        assert_eq!(intersection(&[], &[]), 0);
    }

    #[test]
    fn test_disjoint_ranges_short_circuit() {
        assert_eq!(intersection(&[1, 2, 3], &[10, 11]), 0);
        assert_eq!(intersection(&[10, 11], &[1, 2, 3]), 0);
    }

    #[test]
    fn test_identical_lists() {
        let list: Vec<u32> = (0..50).map(|x| x * 3).collect();
        assert_eq!(intersection(&list, &list), 50);
    }

    #[test]
    fn test_for_each_common() {
        let mut common = Vec::new();
        for_each_common(&[1, 3, 5, 7], &[3, 4, 5, 8], |x| common.push(x));
        assert_eq!(common, vec![3, 5]);
    }
}
