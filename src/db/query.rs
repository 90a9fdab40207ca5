use itertools::Itertools;
use postgres::Client;

use crate::common::error::DatasetNotFound;
use crate::common::error::GResult;
use crate::common::error::MalformedMetadata;
use crate::common::FloatBox;
use crate::db::DatasetTables;
use crate::meta::DatasetMeta;
use crate::meta::DbConfig;
use crate::meta::QueryGeometry;
use crate::sfc::morton;
use crate::sfc::morton::SplitLengths;
use crate::sfc::range;
use crate::sfc::KeyT;
use crate::sfc::QuantizedBox;
use crate::store::quantize::Quantizer;


/* Geometry queries over one ingested dataset
 *
 * The curve layer restricts the scan to head ranges; PostGIS predicates
 * on the result table do the exact refinement. Each querier owns one
 * connection for its lifetime.
 */

pub struct Querier {
  client: Client,
  tables: DatasetTables,
  result_table: String,
  quantizer: Quantizer,
  split: SplitLengths,
}

impl Querier {
  pub fn connect(conf: &DbConfig, source_dataset: &str, result_table: &str) -> GResult<Querier> {
    let mut client = crate::db::connect(conf)?;
    let tables = DatasetTables::of(source_dataset);
    let meta = load_metadata(&mut client, &tables, source_dataset)?;
    let split = meta.split_lengths()?;
    let quantizer = Quantizer::new(meta.scales, meta.offsets)?;
    log::info!(
      "Dataset {} holds {} points, head/tail lengths {}/{}",
      source_dataset, meta.point_count, split.head_len, split.tail_len
    );
    Ok(Querier {
      client,
      tables,
      result_table: result_table.to_string(),
      quantizer,
      split,
    })
  }

  pub fn geometry_query(&mut self, geometry: &QueryGeometry) -> GResult<usize> {
    match geometry {
      QueryGeometry::Window(window) => self.box_query(window),
      QueryGeometry::Circle { center, radius } => self.circle_query(*center, *radius),
      QueryGeometry::Polygon(vertices) => self.polygon_query(vertices),
    }
  }

  // Populates the result table with every point whose quantized
  // coordinates fall inside the window.
  pub fn box_query(&mut self, window: &FloatBox) -> GResult<usize> {
    let points = self.range_scan(window)?;
    self.create_result_table()?;
    self.insert_points(&points)?;
    log::info!("{} points inserted into {}", points.len(), self.result_table);
    Ok(points.len())
  }

  pub fn circle_query(&mut self, center: (f64, f64), radius: f64) -> GResult<usize> {
    let kept = self.box_query(&FloatBox::around_circle(center, radius))?;
    let sql = circle_delete_sql(&self.result_table);
    let mut tx = self.client.transaction()?;
    let removed = tx.execute(sql.as_str(), &[&center.0, &center.1, &radius])?;
    tx.commit()?;
    log::info!("Circle refinement removed {} points from {}", removed, self.result_table);
    Ok(kept - removed as usize)
  }

  pub fn polygon_query(&mut self, vertices: &[(f64, f64)]) -> GResult<usize> {
    let kept = self.box_query(&FloatBox::around_vertices(vertices))?;
    let wkt = polygon_wkt(vertices);
    let sql = polygon_delete_sql(&self.result_table);
    let mut tx = self.client.transaction()?;
    let removed = tx.execute(sql.as_str(), &[&wkt])?;
    tx.commit()?;
    log::info!("Polygon refinement removed {} points from {}", removed, self.result_table);
    Ok(kept - removed as usize)
  }

  pub fn maxz_query(&mut self, maxz: f64) -> GResult<u64> {
    let sql = zmax_delete_sql(&self.result_table);
    let mut tx = self.client.transaction()?;
    let removed = tx.execute(sql.as_str(), &[&maxz])?;
    tx.commit()?;
    log::info!("Height cap {} removed {} points from {}", maxz, removed, self.result_table);
    Ok(removed)
  }

  pub fn minz_query(&mut self, minz: f64) -> GResult<u64> {
    let sql = zmin_delete_sql(&self.result_table);
    let mut tx = self.client.transaction()?;
    let removed = tx.execute(sql.as_str(), &[&minz])?;
    tx.commit()?;
    log::info!("Height floor {} removed {} points from {}", minz, removed, self.result_table);
    Ok(removed)
  }

  fn range_scan(&mut self, window: &FloatBox) -> GResult<Vec<(f64, f64, f64)>> {
    let qbox = self.quantizer.curve_box(window);
    let derived = range::derive(&qbox, self.split);
    log::debug!(
      "Derived {} contained ranges and {} overlapping heads",
      derived.ranges.len(),
      derived.overlaps.len()
    );

    let quantizer = &self.quantizer;
    let split = self.split;
    let mut points = Vec::new();
    let mut tx = self.client.transaction()?;

    // contained heads keep every tail unconditionally
    tx.batch_execute(
      "DROP TABLE IF EXISTS head_ranges;\n\
       CREATE TEMP TABLE head_ranges (range_start INT, range_end INT)",
    )?;
    let insert_range = tx.prepare("INSERT INTO head_ranges (range_start, range_end) VALUES ($1, $2)")?;
    for (lo, hi) in &derived.ranges {
      tx.execute(&insert_range, &[&(*lo as i32), &(*hi as i32)])?;
    }
    let contained_sql = contained_select_sql(&self.tables.record_table);
    for row in tx.query(contained_sql.as_str(), &[])? {
      let head: i32 = row.try_get(0)?;
      let tails: Vec<i32> = row.try_get(1)?;
      let zs: Vec<f64> = row.try_get(2)?;
      for (tail, z) in tails.iter().zip(zs) {
        points.push(world_point(quantizer, split, head as KeyT, *tail as KeyT, z));
      }
    }

    // overlapping heads are unpacked and filtered tail by tail; rows
    // repeating a head (directory ingests) pass through independently
    let overlaps: Vec<i32> = derived.overlaps.iter().map(|head| *head as i32).collect();
    let overlap_sql = overlap_select_sql(&self.tables.record_table);
    for row in tx.query(overlap_sql.as_str(), &[&overlaps])? {
      let head: i32 = row.try_get(0)?;
      let tails: Vec<i32> = row.try_get(1)?;
      let zs: Vec<f64> = row.try_get(2)?;
      for (tail, z) in filter_block_tails(&qbox, split, head as KeyT, &tails, &zs) {
        points.push(world_point(quantizer, split, head as KeyT, tail, z));
      }
    }

    tx.commit()?;
    Ok(points)
  }

  fn create_result_table(&mut self) -> GResult<()> {
    let sql = format!("CREATE TABLE {} (point geometry(PointZ))", self.result_table);
    let mut tx = self.client.transaction()?;
    tx.batch_execute(sql.as_str())?;
    tx.commit()?;
    Ok(())
  }

  fn insert_points(&mut self, points: &[(f64, f64, f64)]) -> GResult<()> {
    let sql = format!("INSERT INTO {} VALUES (ST_MakePoint($1, $2, $3))", self.result_table);
    let mut tx = self.client.transaction()?;
    let insert = tx.prepare(sql.as_str())?;
    for (x, y, z) in points {
      tx.execute(&insert, &[x, y, z])?;
    }
    tx.commit()?;
    Ok(())
  }
}

// Keeps the tails of one overlapping block that fall inside the box.
pub fn filter_block_tails(
  qbox: &QuantizedBox,
  split: SplitLengths,
  head: KeyT,
  tails: &[i32],
  zs: &[f64],
) -> Vec<(KeyT, f64)> {
  let tail_ranges = range::derive_tails(qbox, head, split);
  tails
    .iter()
    .zip(zs)
    .filter(|(tail, _)| range::covers(&tail_ranges, **tail as KeyT))
    .map(|(tail, z)| (*tail as KeyT, *z))
    .collect()
}

fn world_point(
  quantizer: &Quantizer,
  split: SplitLengths,
  head: KeyT,
  tail: KeyT,
  z: f64,
) -> (f64, f64, f64) {
  let key = morton::join(head, tail, split.tail_len);
  let (qx, qy) = morton::decode(key);
  let (x, y) = quantizer.dequantize(qx, qy);
  (x, y, z)
}

fn load_metadata(client: &mut Client, tables: &DatasetTables, dataset: &str) -> GResult<DatasetMeta> {
  let sql = format!(
    "SELECT name, srid, point_count, ratio, scales, offsets, bbox FROM {} LIMIT 1",
    tables.meta_table
  );
  let rows = client.query(sql.as_str(), &[])?;
  let row = match rows.first() {
    Some(row) => row,
    None => return Err(DatasetNotFound::boxed(dataset)),
  };
  Ok(DatasetMeta {
    name: row.try_get(0)?,
    srid: row.try_get(1)?,
    point_count: row.try_get(2)?,
    ratio: row.try_get(3)?,
    scales: fixed_triple(row.try_get(4)?, "scales")?,
    offsets: fixed_triple(row.try_get(5)?, "offsets")?,
    bbox: fixed_bbox(row.try_get(6)?)?,
  })
}

fn fixed_triple(values: Vec<f64>, what: &str) -> GResult<[f64; 3]> {
  values.try_into().map_err(|values: Vec<f64>| {
    MalformedMetadata::boxed(&format!("{} must hold 3 values, found {}", what, values.len()))
  })
}

fn fixed_bbox(values: Vec<f64>) -> GResult<[f64; 6]> {
  values.try_into().map_err(|values: Vec<f64>| {
    MalformedMetadata::boxed(&format!("bbox must hold 6 values, found {}", values.len()))
  })
}


/* SQL text */

fn contained_select_sql(record_table: &str) -> String {
  format!(
    "SELECT sfc_head, sfc_tail, z FROM {} r WHERE EXISTS (\
       SELECT 1 FROM head_ranges \
       WHERE r.sfc_head BETWEEN head_ranges.range_start AND head_ranges.range_end)",
    record_table
  )
}

fn overlap_select_sql(record_table: &str) -> String {
  format!("SELECT sfc_head, sfc_tail, z FROM {} WHERE sfc_head = ANY($1)", record_table)
}

fn circle_delete_sql(result_table: &str) -> String {
  format!(
    "DELETE FROM {} WHERE NOT ST_DWithin(point, ST_MakePoint($1, $2), $3)",
    result_table
  )
}

fn polygon_delete_sql(result_table: &str) -> String {
  format!("DELETE FROM {} WHERE NOT ST_Within(point, ST_GeomFromText($1))", result_table)
}

fn zmax_delete_sql(result_table: &str) -> String {
  format!("DELETE FROM {} WHERE ST_Z(point) > $1", result_table)
}

fn zmin_delete_sql(result_table: &str) -> String {
  format!("DELETE FROM {} WHERE ST_Z(point) < $1", result_table)
}

fn polygon_wkt(vertices: &[(f64, f64)]) -> String {
  let mut ring = vertices.to_vec();
  if ring.first() != ring.last() {
    ring.push(ring[0]);  // WKT rings are closed
  }
  let coords = ring.iter().map(|(x, y)| format!("{} {}", x, y)).join(",");
  format!("POLYGON(({}))", coords)
}
