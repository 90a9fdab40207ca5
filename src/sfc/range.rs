use std::cmp;

use crate::sfc::morton;
use crate::sfc::morton::SplitLengths;
use crate::sfc::KeyT;
use crate::sfc::QuantizedBox;


/* Prefix range derivation on the curve */

#[derive(Clone, Debug, Default, PartialEq)]
pub struct HeadRanges {
  pub ranges: Vec<(KeyT, KeyT)>,  // inclusive, sorted, disjoint
  pub overlaps: Vec<KeyT>,
}

// A node is the set of keys sharing a prefix, [prefix << bits_left,
// (prefix + 1) << bits_left). Descending one key bit per level keeps
// the walk aligned even when the tail length is odd.
struct Node {
  prefix: KeyT,
  bits_left: u32,
}

// Rectangle covered by a node, inclusive. The minimum corner is the
// decode of the smallest key; x owns the even free bit positions and y
// the odd ones.
fn node_cell(prefix: KeyT, bits_left: u32) -> (i64, i64, i64, i64) {
  let (x0, y0) = morton::decode(prefix << bits_left);
  let x1 = x0 + (1i64 << ((bits_left + 1) / 2)) - 1;
  let y1 = y0 + (1i64 << (bits_left / 2)) - 1;
  (x0, x1, y0, y1)
}

fn disjoint(qbox: &QuantizedBox, cell: (i64, i64, i64, i64)) -> bool {
  let (x0, x1, y0, y1) = cell;
  x1 < qbox.x_min || x0 > qbox.x_max || y1 < qbox.y_min || y0 > qbox.y_max
}

fn contained(qbox: &QuantizedBox, cell: (i64, i64, i64, i64)) -> bool {
  let (x0, x1, y0, y1) = cell;
  qbox.x_min <= x0 && x1 <= qbox.x_max && qbox.y_min <= y0 && y1 <= qbox.y_max
}

fn merge_ranges(mut ranges: Vec<(KeyT, KeyT)>) -> Vec<(KeyT, KeyT)> {
  ranges.sort_unstable();
  let mut merged: Vec<(KeyT, KeyT)> = Vec::with_capacity(ranges.len());
  for (lo, hi) in ranges {
    match merged.last_mut() {
      Some((_, last_hi)) if lo <= *last_hi + 1 => *last_hi = cmp::max(*last_hi, hi),
      _ => merged.push((lo, hi)),
    }
  }
  merged
}

// Enumerates the heads whose cells intersect the box: `ranges` of heads
// fully inside and individual `overlaps` that cross the boundary.
pub fn derive(qbox: &QuantizedBox, split: SplitLengths) -> HeadRanges {
  let qbox = qbox.clamp_to_plane();
  let mut out = HeadRanges::default();
  if qbox.is_empty() {
    return out;
  }

  let mut stack = vec![Node { prefix: 0, bits_left: split.total() }];
  while let Some(Node { prefix, bits_left }) = stack.pop() {
    let cell = node_cell(prefix, bits_left);
    if disjoint(&qbox, cell) {
      continue;
    }
    if contained(&qbox, cell) {
      if bits_left == split.tail_len {
        out.ranges.push((prefix, prefix));
      } else {
        let shift = bits_left - split.tail_len;
        out.ranges.push((prefix << shift, ((prefix + 1) << shift) - 1));
      }
    } else if bits_left == split.tail_len {
      out.overlaps.push(prefix);
    } else {
      stack.push(Node { prefix: (prefix << 1) | 1, bits_left: bits_left - 1 });
      stack.push(Node { prefix: prefix << 1, bits_left: bits_left - 1 });
    }
  }

  out.ranges = merge_ranges(out.ranges);
  out.overlaps.sort_unstable();
  out
}

// Enumerates the tail ranges of one overlapping head whose cells lie
// inside the box. At the deepest level a cell is a single quantized
// point, so it is either disjoint or contained; no finer refinement
// exists.
pub fn derive_tails(qbox: &QuantizedBox, head: KeyT, split: SplitLengths) -> Vec<(KeyT, KeyT)> {
  let qbox = qbox.clamp_to_plane();
  if qbox.is_empty() {
    return Vec::new();
  }

  let base = head << split.tail_len;
  let mut ranges = Vec::new();
  let mut stack = vec![Node { prefix: head, bits_left: split.tail_len }];
  while let Some(Node { prefix, bits_left }) = stack.pop() {
    let cell = node_cell(prefix, bits_left);
    if disjoint(&qbox, cell) {
      continue;
    }
    if contained(&qbox, cell) {
      let lo = prefix << bits_left;
      let hi = ((prefix + 1) << bits_left) - 1;
      ranges.push((lo - base, hi - base));
    } else if bits_left > 0 {
      stack.push(Node { prefix: (prefix << 1) | 1, bits_left: bits_left - 1 });
      stack.push(Node { prefix: prefix << 1, bits_left: bits_left - 1 });
    }
  }

  merge_ranges(ranges)
}

pub fn covers(ranges: &[(KeyT, KeyT)], key: KeyT) -> bool {
  ranges.iter().any(|(lo, hi)| *lo <= key && key <= *hi)
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::sfc::MAX_COORD;

  const SPLIT_0_2: SplitLengths = SplitLengths { head_len: 0, tail_len: 2 };
  const SPLIT_2_2: SplitLengths = SplitLengths { head_len: 2, tail_len: 2 };
  const SPLIT_4_2: SplitLengths = SplitLengths { head_len: 4, tail_len: 2 };

  #[test]
  fn contained_unit_square_test() {
    // the whole two-bit key space is inside the box, as a single head
    let derived = derive(&QuantizedBox::new(0, 1, 0, 1), SPLIT_0_2);
    assert_eq!(derived.ranges, vec![(0, 0)]);
    assert!(derived.overlaps.is_empty(), "Fully contained space has no overlaps");
  }

  #[test]
  fn overlapping_row_test() {
    // bottom-left quarter of a 4x4 grid, lower row only
    let qbox = QuantizedBox::new(0, 1, 0, 0);
    let derived = derive(&qbox, SPLIT_2_2);
    assert!(derived.ranges.is_empty(), "A half-cell box contains no full head cell");
    assert_eq!(derived.overlaps, vec![0]);

    // within head 0, exactly the tails of (0,0) and (1,0) survive
    let tails = derive_tails(&qbox, 0, SPLIT_2_2);
    assert_eq!(tails, vec![(0, 1)]);
    assert!(covers(&tails, 0) && covers(&tails, 1), "Tails 0 and 1 lie inside");
    assert!(!covers(&tails, 2) && !covers(&tails, 3), "Tails 2 and 3 lie outside");
  }

  #[test]
  fn empty_box_test() {
    let derived = derive(&QuantizedBox::new(3, 2, 0, 1), SPLIT_2_2);
    assert_eq!(derived, HeadRanges::default());
    assert!(derive_tails(&QuantizedBox::new(3, 2, 0, 1), 0, SPLIT_2_2).is_empty());
  }

  #[test]
  fn oversized_box_test() {
    // a box past the plane boundary clamps and covers every head
    let derived = derive(&QuantizedBox::new(-10, MAX_COORD + 10, -10, MAX_COORD + 10), SPLIT_4_2);
    assert_eq!(derived.ranges, vec![(0, 15)]);
    assert!(derived.overlaps.is_empty());
  }

  #[test]
  fn point_box_test() {
    // zero-area box behaves as a single point membership
    let qbox = QuantizedBox::new(2, 2, 3, 3);
    let derived = derive(&qbox, SPLIT_4_2);
    assert!(derived.ranges.is_empty());
    assert_eq!(derived.overlaps.len(), 1);
    let head = derived.overlaps[0];
    let tails = derive_tails(&qbox, head, SPLIT_4_2);
    let key = morton::encode(2, 3).unwrap();
    let (expect_head, expect_tail) = morton::split(key, 2);
    assert_eq!(head, expect_head);
    assert_eq!(tails, vec![(expect_tail, expect_tail)]);
  }

  // Every point inside the box must be reachable through a contained
  // range or an overlapping head, and contained ranges must not leak
  // any point outside the box.
  #[test]
  fn cover_and_exclusion_test() {
    let split = SPLIT_4_2;
    let boxes = [
      QuantizedBox::new(0, 7, 0, 7),
      QuantizedBox::new(1, 6, 2, 5),
      QuantizedBox::new(3, 3, 0, 7),
      QuantizedBox::new(5, 7, 5, 7),
      QuantizedBox::new(0, 0, 0, 0),
    ];
    for qbox in &boxes {
      let derived = derive(qbox, split);
      let mut tail_cache: Vec<(KeyT, Vec<(KeyT, KeyT)>)> = derived
        .overlaps
        .iter()
        .map(|head| (*head, derive_tails(qbox, *head, split)))
        .collect();
      tail_cache.sort_unstable_by_key(|(head, _)| *head);

      for x in 0..8 {
        for y in 0..8 {
          let key = morton::encode(x, y).unwrap();
          let (head, tail) = morton::split(key, split.tail_len);
          let in_ranges = covers(&derived.ranges, head);
          let in_tails = tail_cache
            .iter()
            .find(|(h, _)| *h == head)
            .map(|(_, tails)| covers(tails, tail))
            .unwrap_or(false);
          if qbox.contains(x, y) {
            assert!(in_ranges || in_tails, "Point ({}, {}) missed by {:?}", x, y, qbox);
          } else {
            assert!(!in_ranges, "Contained range leaks ({}, {}) outside {:?}", x, y, qbox);
            assert!(!in_tails, "Tail range leaks ({}, {}) outside {:?}", x, y, qbox);
          }
        }
      }
    }
  }

  #[test]
  fn merged_ranges_are_disjoint_test() {
    let derived = derive(&QuantizedBox::new(0, 5, 0, 5), SPLIT_4_2);
    for window in derived.ranges.windows(2) {
      assert!(window[0].1 + 1 < window[1].0, "Adjacent ranges must have been merged");
    }
  }
}
