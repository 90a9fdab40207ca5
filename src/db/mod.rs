use postgres::Client;
use postgres::NoTls;

use crate::common::error::GResult;
use crate::meta::DbConfig;

pub mod load;
pub mod query;


/* Connection and per-dataset object names */

pub fn connect(conf: &DbConfig) -> GResult<Client> {
  let mut config = postgres::Config::new();
  config
    .host(&conf.host)
    .port(conf.port)
    .user(&conf.user)
    .password(&conf.password)
    .dbname(&conf.dbname);
  Ok(config.connect(NoTls)?)
}

#[derive(Clone, Debug, PartialEq)]
pub struct DatasetTables {
  pub meta_table: String,
  pub record_table: String,
  pub head_index: String,
}

impl DatasetTables {
  pub fn of(dataset: &str) -> DatasetTables {
    DatasetTables {
      meta_table: format!("pc_metadata_{}", dataset),
      record_table: format!("pc_record_{}", dataset),
      head_index: format!("btree_{}", dataset),
    }
  }
}
