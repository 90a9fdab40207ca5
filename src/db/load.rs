use postgres::Client;
use std::fs::File;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::time::Instant;

use crate::common::error::GResult;
use crate::db::DatasetTables;
use crate::meta::DatasetMeta;
use crate::meta::DbConfig;


/* Bulk loader: schema, metadata row, COPY, head index
 *
 * Each step runs in its own transaction; a failed step rolls back and
 * surfaces, leaving earlier steps in place for the operator to inspect.
 * The head index is built only after every spill file is copied in, so
 * readers must not assume its presence until the job reports success.
 */

pub struct PointCloudLoader {
  client: Client,
  tables: DatasetTables,
}

impl PointCloudLoader {
  pub fn connect(conf: &DbConfig, dataset: &str) -> GResult<PointCloudLoader> {
    Ok(PointCloudLoader {
      client: crate::db::connect(conf)?,
      tables: DatasetTables::of(dataset),
    })
  }

  pub fn load(&mut self, meta: &DatasetMeta, spills: &[PathBuf]) -> GResult<()> {
    let start = Instant::now();
    self.create_tables()?;
    self.insert_metadata(meta)?;
    for spill in spills {
      self.copy_records(spill)?;
    }
    let copied = Instant::now();
    log::info!("Loaded {} spill file(s) in {:.2?}", spills.len(), copied - start);

    self.create_head_index()?;
    log::info!("Built {} in {:.2?}", self.tables.head_index, copied.elapsed());
    Ok(())
  }

  fn create_tables(&mut self) -> GResult<()> {
    let mut tx = self.client.transaction()?;
    tx.batch_execute(&create_tables_sql(&self.tables))?;
    tx.commit()?;
    Ok(())
  }

  fn insert_metadata(&mut self, meta: &DatasetMeta) -> GResult<()> {
    let sql = format!(
      "INSERT INTO {} VALUES ($1, $2, $3, $4, $5, $6, $7)",
      self.tables.meta_table
    );
    let scales = meta.scales.to_vec();
    let offsets = meta.offsets.to_vec();
    let bbox = meta.bbox.to_vec();
    let mut tx = self.client.transaction()?;
    tx.execute(
      sql.as_str(),
      &[&meta.name, &meta.srid, &meta.point_count, &meta.ratio, &scales, &offsets, &bbox],
    )?;
    tx.commit()?;
    Ok(())
  }

  fn copy_records(&mut self, spill: &Path) -> GResult<()> {
    let sql = format!("COPY {} FROM STDIN WITH CSV HEADER", self.tables.record_table);
    let mut file = File::open(spill)?;
    let mut tx = self.client.transaction()?;
    let mut writer = tx.copy_in(sql.as_str())?;
    io::copy(&mut file, &mut writer)?;
    writer.finish()?;
    tx.commit()?;
    log::debug!("Copied {} into {}", spill.display(), self.tables.record_table);
    Ok(())
  }

  fn create_head_index(&mut self) -> GResult<()> {
    let sql = format!(
      "CREATE INDEX {} ON {} USING btree (sfc_head)",
      self.tables.head_index, self.tables.record_table
    );
    let mut tx = self.client.transaction()?;
    tx.execute(sql.as_str(), &[])?;
    tx.commit()?;
    Ok(())
  }
}

fn create_tables_sql(tables: &DatasetTables) -> String {
  format!(
    "CREATE EXTENSION IF NOT EXISTS postgis;\n\
     CREATE TABLE IF NOT EXISTS {} (\n\
       name TEXT,\n\
       srid INT,\n\
       point_count BIGINT,\n\
       ratio DOUBLE PRECISION,\n\
       scales DOUBLE PRECISION[],\n\
       offsets DOUBLE PRECISION[],\n\
       bbox DOUBLE PRECISION[]\n\
     );\n\
     CREATE TABLE IF NOT EXISTS {} (\n\
       sfc_head INT,\n\
       sfc_tail INT[],\n\
       z DOUBLE PRECISION[]\n\
     );",
    tables.meta_table, tables.record_table
  )
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn create_tables_sql_test() {
    let sql = create_tables_sql(&DatasetTables::of("tile"));
    assert!(sql.contains("CREATE EXTENSION IF NOT EXISTS postgis"));
    assert!(sql.contains("CREATE TABLE IF NOT EXISTS pc_metadata_tile"));
    assert!(sql.contains("CREATE TABLE IF NOT EXISTS pc_record_tile"));
    assert!(sql.contains("sfc_head INT"));
    assert!(sql.contains("sfc_tail INT[]"));
    assert!(sql.contains("z DOUBLE PRECISION[]"));
  }
}
