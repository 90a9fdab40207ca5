use std::path::PathBuf;
use std::process;
use std::time::Instant;
use structopt::StructOpt;

use lascurve::common::error::GResult;
use lascurve::db::query::Querier;
use lascurve::meta::JobFile;
use lascurve::meta::QueryGeometry;
use lascurve::meta::QueryJob;
use lascurve::meta::DbConfig;


/* Parsed arguments */

#[derive(Debug, StructOpt)]
pub struct Cli {
  /// path to the JSON job description
  #[structopt(long, default_value = "./scripts/query.json")]
  input: PathBuf,

  /// database password, overriding the job description
  #[structopt(long)]
  password: Option<String>,
}

fn run_query(conf: &DbConfig, name: &str, job: &QueryJob) -> GResult<()> {
  let geometry = QueryGeometry::parse(&job.mode, &job.geometry)?;
  let mut querier = Querier::connect(conf, &job.source_dataset, name)?;
  querier.geometry_query(&geometry)?;
  if let Some(maxz) = job.maxz {
    querier.maxz_query(maxz)?;
  }
  if let Some(minz) = job.minz {
    querier.minz_query(minz)?;
  }
  Ok(())
}

fn main_guarded() -> GResult<usize> {
  // execution init
  env_logger::Builder::from_default_env()
    .format_timestamp_micros()
    .init();

  // parse args and job description
  let args = Cli::from_args();
  log::info!("{:?}", args);
  let mut jobs = JobFile::load(&args.input)?;
  if let Some(password) = &args.password {
    jobs.config.password = password.clone();
  }

  // one failed query must not sink the ones after it
  let mut failures = 0;
  for (name, job) in &jobs.queries {
    println!("=== Query {} from {} ===", name, job.source_dataset);
    let start = Instant::now();
    match run_query(&jobs.config, name, job) {
      Ok(()) => println!("--> {:.2?}", start.elapsed()),
      Err(e) => {
        failures += 1;
        eprintln!("Query {} failed: {}", name, e);
      }
    }
  }
  Ok(failures)
}

fn main() {
  let failures = main_guarded().expect("Error occurred before any query job could run");
  if failures > 0 {
    process::exit(1);
  }
}
