use std::path::PathBuf;
use std::process;
use std::time::Instant;
use structopt::StructOpt;

use lascurve::common::error::GResult;
use lascurve::meta::JobFile;
use lascurve::pipeline::IngestPipeline;


/* Parsed arguments */

#[derive(Debug, StructOpt)]
pub struct Cli {
  /// path to the JSON job description
  #[structopt(long, default_value = "./scripts/import.json")]
  input: PathBuf,

  /// database password, overriding the job description
  #[structopt(long)]
  password: Option<String>,

  /// directory for bulk-load spill files
  #[structopt(long, default_value = "./cache")]
  cache_dir: PathBuf,
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

  // one failed import must not sink the ones after it
  let mut failures = 0;
  for (name, job) in &jobs.imports {
    println!("=== Import {} ===", name);
    let start = Instant::now();
    let outcome = IngestPipeline::from_job(name, job, &args.cache_dir)
      .and_then(|pipeline| pipeline.run(&jobs.config));
    match outcome {
      Ok(()) => println!("--> {:.2?}", start.elapsed()),
      Err(e) => {
        failures += 1;
        eprintln!("Import {} failed: {}", name, e);
      }
    }
  }
  Ok(failures)
}

fn main() {
  let failures = main_guarded().expect("Error occurred before any import job could run");
  if failures > 0 {
    process::exit(1);
  }
}
