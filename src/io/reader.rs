use las::Reader;
use std::path::Path;

use crate::common::error::GResult;


/* LiDAR point sources */

pub const DEFAULT_CHUNK_POINTS: usize = 500_000_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoordSource {
  // Georeferenced coordinates, file transform applied.
  Scaled,
  // Integer storage coordinates, file transform inverted; the file's
  // own scale and offset then act as the quantization parameters.
  Raw,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SourceSummary {
  pub point_count: u64,
  pub bbox: [f64; 6],  // x_min, x_max, y_min, y_max, z_min, z_max
  pub scales: [f64; 3],
  pub offsets: [f64; 3],
}

pub type PointChunk = Vec<(f64, f64, f64)>;

pub trait PointSource {
  fn summary(&self) -> &SourceSummary;
  fn chunks(
    &mut self,
    coords: CoordSource,
    chunk_size: usize,
  ) -> Box<dyn Iterator<Item = GResult<PointChunk>> + '_>;
}


/* LAS/LAZ file source */

pub struct LasSource {
  reader: Reader,
  summary: SourceSummary,
}

impl LasSource {
  // Opens a LAS file and captures its header summary without touching
  // any point record.
  pub fn open(path: &Path) -> GResult<LasSource> {
    let reader = Reader::from_path(path)?;
    let header = reader.header();
    let bounds = header.bounds();
    let transforms = header.transforms();
    let summary = SourceSummary {
      point_count: header.number_of_points(),
      bbox: [
        bounds.min.x,
        bounds.max.x,
        bounds.min.y,
        bounds.max.y,
        bounds.min.z,
        bounds.max.z,
      ],
      scales: [transforms.x.scale, transforms.y.scale, transforms.z.scale],
      offsets: [transforms.x.offset, transforms.y.offset, transforms.z.offset],
    };
    Ok(LasSource { reader, summary })
  }
}

impl PointSource for LasSource {
  fn summary(&self) -> &SourceSummary {
    &self.summary
  }

  fn chunks(
    &mut self,
    coords: CoordSource,
    chunk_size: usize,
  ) -> Box<dyn Iterator<Item = GResult<PointChunk>> + '_> {
    let scales = self.summary.scales;
    let offsets = self.summary.offsets;
    let mut points = self.reader.points();
    Box::new(std::iter::from_fn(move || {
      let mut chunk = PointChunk::new();
      while chunk.len() < chunk_size {
        match points.next() {
          Some(Ok(point)) => chunk.push(match coords {
            CoordSource::Scaled => (point.x, point.y, point.z),
            CoordSource::Raw => (
              ((point.x - offsets[0]) / scales[0]).round(),
              ((point.y - offsets[1]) / scales[1]).round(),
              point.z,
            ),
          }),
          Some(Err(e)) => return Some(Err(e.into())),
          None => break,
        }
      }
      if chunk.is_empty() {
        None
      } else {
        Some(Ok(chunk))
      }
    }))
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use las::{Builder, Point, Writer};
  use tempfile::TempDir;

  fn write_sample_las(path: &Path) {
    let mut builder = Builder::default();
    builder.transforms.x.scale = 0.01;
    builder.transforms.y.scale = 0.01;
    builder.transforms.z.scale = 0.01;
    let header = builder.into_header().unwrap();
    let mut writer = Writer::from_path(path, header).unwrap();
    for (x, y, z) in [(0.0, 0.0, 1.0), (1.0, 0.0, 2.0), (0.0, 1.0, 3.0), (1.0, 1.0, 4.0)] {
      writer.write_point(Point { x, y, z, ..Default::default() }).unwrap();
    }
  }

  #[test]
  fn open_reads_header_only_summary_test() {
    let temp_dir = TempDir::new().unwrap();
    let las_path = temp_dir.path().join("sample.las");
    write_sample_las(&las_path);

    let source = LasSource::open(&las_path).unwrap();
    let summary = source.summary();
    assert_eq!(summary.point_count, 4);
    assert_eq!(summary.bbox, [0.0, 1.0, 0.0, 1.0, 1.0, 4.0]);
    assert_eq!(summary.scales, [0.01, 0.01, 0.01]);
  }

  #[test]
  fn scaled_chunks_test() {
    let temp_dir = TempDir::new().unwrap();
    let las_path = temp_dir.path().join("sample.las");
    write_sample_las(&las_path);

    let mut source = LasSource::open(&las_path).unwrap();
    let chunks: Vec<PointChunk> = source
      .chunks(CoordSource::Scaled, 3)
      .map(|chunk| chunk.unwrap())
      .collect();
    assert_eq!(chunks.len(), 2, "Four points at chunk size three make two chunks");
    assert_eq!(chunks[0].len(), 3);
    assert_eq!(chunks[1].len(), 1);
    assert_eq!(chunks[0][0], (0.0, 0.0, 1.0));
    assert_eq!(chunks[1][0], (1.0, 1.0, 4.0));
  }

  #[test]
  fn raw_chunks_invert_transform_test() {
    let temp_dir = TempDir::new().unwrap();
    let las_path = temp_dir.path().join("sample.las");
    write_sample_las(&las_path);

    let mut source = LasSource::open(&las_path).unwrap();
    let chunk = source
      .chunks(CoordSource::Raw, usize::MAX)
      .next()
      .unwrap()
      .unwrap();
    // with a 0.01 scale, world coordinate 1.0 is storage integer 100
    assert_eq!(chunk[1].0, 100.0);
    assert_eq!(chunk[3], (100.0, 100.0, 4.0));
  }
}
