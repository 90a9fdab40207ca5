use itertools::Itertools;

use crate::sfc::KeyT;


/* Head-grouped point blocks */

#[derive(Clone, Debug, PartialEq)]
pub struct PointBlock {
  pub head: KeyT,
  pub tails: Vec<KeyT>,
  pub zs: Vec<f64>,
}

#[derive(Debug, Default)]
pub struct BlockBuilder {
  triples: Vec<(KeyT, KeyT, f64)>,
}

impl BlockBuilder {
  pub fn new() -> BlockBuilder {
    BlockBuilder { triples: Vec::new() }
  }

  pub fn push(&mut self, head: KeyT, tail: KeyT, z: f64) {
    self.triples.push((head, tail, z));
  }

  pub fn len(&self) -> usize {
    self.triples.len()
  }

  pub fn is_empty(&self) -> bool {
    self.triples.is_empty()
  }

  // Sorts by (head, tail) and groups consecutive equal heads into one
  // block. The sort is stable, so points sharing a full key keep their
  // arrival order and the tail-z pairing stays unambiguous.
  pub fn into_blocks(mut self) -> Vec<PointBlock> {
    self.triples.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

    let mut blocks = Vec::new();
    for (head, group) in &self.triples.into_iter().group_by(|(head, _, _)| *head) {
      let mut tails = Vec::new();
      let mut zs = Vec::new();
      for (_, tail, z) in group {
        tails.push(tail);
        zs.push(z);
      }
      blocks.push(PointBlock { head, tails, zs });
    }
    blocks
  }
}
