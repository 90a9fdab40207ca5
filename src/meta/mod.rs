use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::path::PathBuf;

use crate::common::error::GResult;
use crate::common::error::InvalidJobError;
use crate::common::error::UnsupportedQueryMode;
use crate::common::FloatBox;
use crate::sfc::morton;
use crate::sfc::morton::SplitLengths;


/* Dataset metadata, one row per dataset */

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DatasetMeta {
  pub name: String,
  pub srid: i32,
  pub point_count: i64,
  pub ratio: f64,
  pub scales: [f64; 3],
  pub offsets: [f64; 3],
  pub bbox: [f64; 6],  // x_min, x_max, y_min, y_max, z_min, z_max
}

impl DatasetMeta {
  // The head/tail boundary is a function of the stored parameters, so
  // readers recover it from the metadata row instead of trusting a
  // side channel.
  pub fn split_lengths(&self) -> GResult<SplitLengths> {
    let x_rep = ((self.bbox[1] - self.offsets[0]) / self.scales[0]).round() as i64;
    let y_rep = ((self.bbox[3] - self.offsets[1]) / self.scales[1]).round() as i64;
    morton::split_lengths(x_rep, y_rep, self.ratio)
  }
}


/* Job descriptions */

#[derive(Deserialize, Clone, Debug)]
pub struct DbConfig {
  pub dbname: String,
  pub user: String,
  pub password: String,
  pub host: String,
  pub port: u16,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ImportJob {
  pub mode: String,  // "file" | "dir" | "full"
  pub path: PathBuf,
  pub srid: i32,
  pub ratio: f64,
  pub scales: [f64; 3],
  pub offsets: [f64; 3],
}

#[derive(Deserialize, Clone, Debug)]
pub struct QueryJob {
  pub source_dataset: String,
  pub mode: String,  // "bbox" | "circle" | "polygon" | "nn"
  pub geometry: serde_json::Value,
  #[serde(default)]
  pub maxz: Option<f64>,
  #[serde(default)]
  pub minz: Option<f64>,
}

#[derive(Deserialize, Debug)]
pub struct JobFile {
  pub config: DbConfig,
  #[serde(default)]
  pub imports: BTreeMap<String, ImportJob>,
  #[serde(default)]
  pub queries: BTreeMap<String, QueryJob>,
}

impl JobFile {
  pub fn load(path: &Path) -> GResult<JobFile> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
  }
}


/* Query geometry payloads, shaped per mode */

#[derive(Clone, Debug, PartialEq)]
pub enum QueryGeometry {
  Window(FloatBox),
  Circle { center: (f64, f64), radius: f64 },
  Polygon(Vec<(f64, f64)>),
}

impl QueryGeometry {
  pub fn parse(mode: &str, geometry: &serde_json::Value) -> GResult<QueryGeometry> {
    match mode {
      "bbox" => {
        let bounds: [f64; 4] = serde_json::from_value(geometry.clone())?;
        Ok(QueryGeometry::Window(FloatBox::new(bounds[0], bounds[1], bounds[2], bounds[3])))
      }
      "circle" => {
        let (center, radius): ((f64, f64), f64) = serde_json::from_value(geometry.clone())?;
        Ok(QueryGeometry::Circle { center, radius })
      }
      "polygon" => {
        let vertices: Vec<(f64, f64)> = serde_json::from_value(geometry.clone())?;
        if vertices.len() < 3 {
          return Err(InvalidJobError::boxed("a polygon needs at least three vertices"));
        }
        Ok(QueryGeometry::Polygon(vertices))
      }
      "nn" => Err(UnsupportedQueryMode::boxed(mode)),
      other => Err(InvalidJobError::boxed(&format!("unknown query mode \"{}\"", other))),
    }
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use std::io::Write;
  use tempfile::NamedTempFile;

  fn sample_meta() -> DatasetMeta {
    DatasetMeta {
      name: "tile".to_string(),
      srid: 28992,
      point_count: 4,
      ratio: 0.5,
      scales: [1.0, 1.0, 1.0],
      offsets: [0.0, 0.0, 0.0],
      bbox: [0.0, 1.0, 0.0, 1.0, 1.0, 4.0],
    }
  }

  #[test]
  fn split_from_metadata_test() {
    // unit-square maximum gives a two-bit key, all of it tail
    let split = sample_meta().split_lengths().unwrap();
    assert_eq!(split, SplitLengths { head_len: 0, tail_len: 2 });
  }

  #[test]
  fn job_file_load_test() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
      file,
      r#"{{
        "config": {{"dbname": "pc", "user": "u", "password": "p", "host": "localhost", "port": 5432}},
        "imports": {{
          "tile": {{"mode": "file", "path": "/data/tile.las", "srid": 28992,
                    "ratio": 0.5, "scales": [1, 1, 1], "offsets": [0, 0, 0]}}
        }},
        "queries": {{
          "window": {{"source_dataset": "tile", "mode": "bbox",
                      "geometry": [0.0, 1.0, 0.0, 1.0], "maxz": 10.0}}
        }}
      }}"#
    )
    .unwrap();

    let jobs = JobFile::load(file.path()).unwrap();
    assert_eq!(jobs.config.port, 5432);
    assert_eq!(jobs.imports["tile"].mode, "file");
    assert_eq!(jobs.imports["tile"].scales, [1.0, 1.0, 1.0]);
    assert_eq!(jobs.queries["window"].maxz, Some(10.0));
    assert_eq!(jobs.queries["window"].minz, None);
  }

  #[test]
  fn parse_bbox_geometry_test() {
    let geometry = QueryGeometry::parse("bbox", &json!([1.0, 2.0, 3.0, 4.0])).unwrap();
    assert_eq!(geometry, QueryGeometry::Window(FloatBox::new(1.0, 2.0, 3.0, 4.0)));
  }

  #[test]
  fn parse_circle_geometry_test() {
    let geometry = QueryGeometry::parse("circle", &json!([[0.5, 0.5], 0.25])).unwrap();
    assert_eq!(geometry, QueryGeometry::Circle { center: (0.5, 0.5), radius: 0.25 });
  }

  #[test]
  fn parse_polygon_geometry_test() {
    let geometry =
      QueryGeometry::parse("polygon", &json!([[0.0, 0.0], [2.0, 0.0], [1.0, 2.0]])).unwrap();
    assert_eq!(
      geometry,
      QueryGeometry::Polygon(vec![(0.0, 0.0), (2.0, 0.0), (1.0, 2.0)])
    );
    assert!(
      QueryGeometry::parse("polygon", &json!([[0.0, 0.0], [2.0, 0.0]])).is_err(),
      "Two vertices do not make a polygon"
    );
  }

  #[test]
  fn parse_rejects_nn_test() {
    assert!(QueryGeometry::parse("nn", &json!([0.0, 0.0])).is_err());
    assert!(QueryGeometry::parse("voronoi", &json!(null)).is_err());
  }
}
