use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Instant;

use crate::common::error::GResult;
use crate::common::error::InvalidJobError;
use crate::db::load::PointCloudLoader;
use crate::io::reader::CoordSource;
use crate::io::reader::LasSource;
use crate::io::reader::PointSource;
use crate::io::reader::DEFAULT_CHUNK_POINTS;
use crate::io::spill;
use crate::io::spill::SpillDir;
use crate::meta::DatasetMeta;
use crate::meta::DbConfig;
use crate::meta::ImportJob;
use crate::sfc::morton;
use crate::sfc::morton::SplitLengths;
use crate::store::block::BlockBuilder;
use crate::store::quantize::Quantizer;


/* Ingest pipeline: read, quantize, encode, group, spill, load
 *
 * One pipeline per import job. Directory mode shares a single split and
 * metadata row across all files; a file that fails to read is logged
 * and skipped so one bad tile does not sink the job. Heads repeated
 * across files stay as separate rows; the query path tolerates them
 * and merging is left as a future extension.
 */

pub struct IngestPipeline {
  name: String,
  srid: i32,
  ratio: f64,
  coords: CoordSource,
  dir_mode: bool,
  paths: Vec<PathBuf>,
  job_scales: [f64; 3],
  job_offsets: [f64; 3],
  cache_dir: PathBuf,
  chunk_points: usize,
}

struct CollectedMeta {
  meta: DatasetMeta,
  split: SplitLengths,
  readable: Vec<PathBuf>,
}

impl IngestPipeline {
  pub fn from_job(name: &str, job: &ImportJob, cache_dir: &Path) -> GResult<IngestPipeline> {
    let (coords, dir_mode) = match job.mode.as_str() {
      "file" => (CoordSource::Scaled, false),
      "full" => (CoordSource::Raw, false),
      "dir" => (CoordSource::Scaled, true),
      other => return Err(InvalidJobError::boxed(&format!("unknown import mode \"{}\"", other))),
    };
    let paths = if dir_mode {
      regular_files_in(&job.path)?
    } else {
      vec![job.path.clone()]
    };
    if paths.is_empty() {
      return Err(InvalidJobError::boxed(&format!("no regular files under {}", job.path.display())));
    }
    Ok(IngestPipeline {
      name: name.to_string(),
      srid: job.srid,
      ratio: job.ratio,
      coords,
      dir_mode,
      paths,
      job_scales: job.scales,
      job_offsets: job.offsets,
      cache_dir: cache_dir.to_path_buf(),
      chunk_points: DEFAULT_CHUNK_POINTS,
    })
  }

  pub fn run(&self, conf: &DbConfig) -> GResult<()> {
    let start = Instant::now();
    let collected = self.collect_metadata()?;
    log::info!("{:?}", collected.meta);

    let quantizer = self.ingest_quantizer()?;
    let spills = self.prepare_spills(&collected.readable, &quantizer, collected.split)?;

    let mut loader = PointCloudLoader::connect(conf, &self.name)?;
    loader.load(&collected.meta, &spills)?;
    log::info!("Ingested {} in {:.2?}", self.name, start.elapsed());
    Ok(())
  }

  // Header pass: aggregate counts and bounds without touching points,
  // and fix the head/tail boundary for the whole dataset.
  fn collect_metadata(&self) -> GResult<CollectedMeta> {
    let mut readable = Vec::new();
    let mut point_count: u64 = 0;
    let mut bbox: Option<[f64; 6]> = None;
    let mut file_transform: Option<([f64; 3], [f64; 3])> = None;

    for path in &self.paths {
      match LasSource::open(path) {
        Ok(source) => {
          let summary = source.summary();
          point_count += summary.point_count;
          bbox = Some(match bbox {
            Some(bound) => merge_bbox(bound, summary.bbox),
            None => summary.bbox,
          });
          if file_transform.is_none() {
            file_transform = Some((summary.scales, summary.offsets));
          }
          readable.push(path.clone());
        }
        Err(e) if self.dir_mode => {
          log::warn!("Skipping unreadable file {}: {}", path.display(), e);
        }
        Err(e) => return Err(e),
      }
    }
    let bbox = match bbox {
      Some(bbox) => bbox,
      None => return Err(InvalidJobError::boxed("no readable input files")),
    };

    // in raw mode the file transform is the quantization
    let (scales, offsets) = match self.coords {
      CoordSource::Scaled => (self.job_scales, self.job_offsets),
      CoordSource::Raw => file_transform.unwrap(),
    };
    let meta = DatasetMeta {
      name: self.name.clone(),
      srid: self.srid,
      point_count: point_count as i64,
      ratio: self.ratio,
      scales,
      offsets,
      bbox,
    };
    let split = meta.split_lengths()?;
    Ok(CollectedMeta { meta, split, readable })
  }

  fn ingest_quantizer(&self) -> GResult<Quantizer> {
    match self.coords {
      // raw chunks already carry curve-space integers
      CoordSource::Raw => Quantizer::new([1.0, 1.0, 1.0], [0.0, 0.0, 0.0]),
      CoordSource::Scaled => Quantizer::new(self.job_scales, self.job_offsets),
    }
  }

  fn prepare_spills(
    &self,
    readable: &[PathBuf],
    quantizer: &Quantizer,
    split: SplitLengths,
  ) -> GResult<Vec<PathBuf>> {
    let spill_dir = SpillDir::new(&self.cache_dir)?;
    let mut spills = Vec::new();
    for (idx, path) in readable.iter().enumerate() {
      let csv_path = if self.dir_mode {
        spill_dir.csv_path(&format!("{}_{}", self.name, idx))
      } else {
        spill_dir.csv_path(&self.name)
      };
      match self.spill_one(path, &csv_path, quantizer, split) {
        Ok(blocks) => {
          log::info!("{} blocks spilled to {}", blocks, csv_path.display());
          spills.push(csv_path);
        }
        Err(e) if self.dir_mode => {
          log::warn!("Skipping file {}: {}", path.display(), e);
        }
        Err(e) => return Err(e),
      }
    }
    if spills.is_empty() {
      return Err(InvalidJobError::boxed("every input file failed to spill"));
    }
    Ok(spills)
  }

  fn spill_one(
    &self,
    path: &Path,
    csv_path: &Path,
    quantizer: &Quantizer,
    split: SplitLengths,
  ) -> GResult<usize> {
    let mut source = LasSource::open(path)?;
    let mut builder = BlockBuilder::new();
    let mut rejects: u64 = 0;

    for chunk in source.chunks(self.coords, self.chunk_points) {
      for (x, y, z) in chunk? {
        let point = match quantizer.quantize(x, y, z) {
          Ok(point) => point,
          Err(_) => {
            rejects += 1;
            continue;
          }
        };
        let key = match morton::encode(point.x, point.y) {
          Ok(key) => key,
          Err(_) => {
            rejects += 1;
            continue;
          }
        };
        let (head, tail) = morton::split(key, split.tail_len);
        builder.push(head, tail, point.z);
      }
    }
    if rejects > 0 {
      log::warn!("Rejected {} points outside the curve domain in {}", rejects, path.display());
    }

    let blocks = builder.into_blocks();
    spill::write_blocks_csv(csv_path, &blocks)
  }
}

fn merge_bbox(a: [f64; 6], b: [f64; 6]) -> [f64; 6] {
  [
    a[0].min(b[0]),
    a[1].max(b[1]),
    a[2].min(b[2]),
    a[3].max(b[3]),
    a[4].min(b[4]),
    a[5].max(b[5]),
  ]
}

fn regular_files_in(dir: &Path) -> GResult<Vec<PathBuf>> {
  let mut paths = Vec::new();
  for entry in fs::read_dir(dir)? {
    let path = entry?.path();
    if path.is_file() {
      paths.push(path);
    }
  }
  paths.sort();
  Ok(paths)
}
