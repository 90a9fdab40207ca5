use itertools::Itertools;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use crate::common::error::GResult;
use crate::sfc::KeyT;
use crate::store::block::PointBlock;


/* Bulk-load spill files
 *
 * One CSV per ingested file: header `sfc_head,sfc_tail,z`, array cells
 * as brace literals, z with two fractional digits. Spills live under a
 * cache directory and are overwritten by the next ingest of the same
 * dataset.
 */

pub struct SpillDir {
  dir: PathBuf,
}

impl SpillDir {
  pub fn new(dir: &Path) -> GResult<SpillDir> {
    fs::create_dir_all(dir)?;
    Ok(SpillDir { dir: dir.to_path_buf() })
  }

  pub fn csv_path(&self, name: &str) -> PathBuf {
    self.dir.join(format!("{}.csv", name))
  }
}

// Streams blocks into the CSV spill, one row per block, returning the
// row count.
pub fn write_blocks_csv(path: &Path, blocks: &[PointBlock]) -> GResult<usize> {
  let mut writer = csv::Writer::from_path(path)?;
  writer.write_record(["sfc_head", "sfc_tail", "z"])?;
  for block in blocks {
    writer.write_record([
      block.head.to_string(),
      int_array_literal(&block.tails),
      decimal_array_literal(&block.zs),
    ])?;
  }
  writer.flush()?;
  Ok(blocks.len())
}

fn int_array_literal(values: &[KeyT]) -> String {
  format!("{{{}}}", values.iter().join(","))
}

fn decimal_array_literal(values: &[f64]) -> String {
  format!("{{{}}}", values.iter().map(|z| format!("{:.2}", z)).join(","))
}
