use derive_more::Display;
use std::error::Error;

pub type GenericError = Box<dyn Error + Send + Sync>;
pub type GResult<T> = Result<T, GenericError>;


/* Curve encoding errors */

#[derive(Display, Debug, Clone)]
#[display(fmt = "Coordinate {} outside the non-negative 31-bit curve domain", value)]
pub struct CoordinateOutOfDomain {
  value: i64,
}
impl CoordinateOutOfDomain {
  pub fn boxed(value: i64) -> GenericError {
    Box::new(CoordinateOutOfDomain { value })
  }
}
impl Error for CoordinateOutOfDomain {}
unsafe impl Send for CoordinateOutOfDomain {}
unsafe impl Sync for CoordinateOutOfDomain {}


#[derive(Display, Debug, Clone)]
#[display(fmt = "Key split head={}, tail={} does not fit 32-bit record columns", head_len, tail_len)]
pub struct SplitTooWide {
  head_len: u32,
  tail_len: u32,
}
impl SplitTooWide {
  pub fn boxed(head_len: u32, tail_len: u32) -> GenericError {
    Box::new(SplitTooWide { head_len, tail_len })
  }
}
impl Error for SplitTooWide {}
unsafe impl Send for SplitTooWide {}
unsafe impl Sync for SplitTooWide {}


/* Quantization errors */

#[derive(Display, Debug, Clone)]
#[display(fmt = "Quantized {} coordinate {} is negative", axis, value)]
pub struct NegativeQuantizedCoordinate {
  axis: &'static str,
  value: i64,
}
impl NegativeQuantizedCoordinate {
  pub fn boxed(axis: &'static str, value: i64) -> GenericError {
    Box::new(NegativeQuantizedCoordinate { axis, value })
  }
}
impl Error for NegativeQuantizedCoordinate {}
unsafe impl Send for NegativeQuantizedCoordinate {}
unsafe impl Sync for NegativeQuantizedCoordinate {}


/* Job description errors */

#[derive(Display, Debug, Clone)]
#[display(fmt = "Invalid job: {}", reason)]
pub struct InvalidJobError {
  reason: String,
}
impl InvalidJobError {
  pub fn boxed(reason: &str) -> GenericError {
    Box::new(InvalidJobError { reason: reason.to_string() })
  }
}
impl Error for InvalidJobError {}
unsafe impl Send for InvalidJobError {}
unsafe impl Sync for InvalidJobError {}


#[derive(Display, Debug, Clone)]
#[display(fmt = "Query mode \"{}\" is not supported", mode)]
pub struct UnsupportedQueryMode {
  mode: String,
}
impl UnsupportedQueryMode {
  pub fn boxed(mode: &str) -> GenericError {
    Box::new(UnsupportedQueryMode { mode: mode.to_string() })
  }
}
impl Error for UnsupportedQueryMode {}
unsafe impl Send for UnsupportedQueryMode {}
unsafe impl Sync for UnsupportedQueryMode {}


/* Dataset errors */

#[derive(Display, Debug, Clone)]
#[display(fmt = "Malformed metadata row: {}", reason)]
pub struct MalformedMetadata {
  reason: String,
}
impl MalformedMetadata {
  pub fn boxed(reason: &str) -> GenericError {
    Box::new(MalformedMetadata { reason: reason.to_string() })
  }
}
impl Error for MalformedMetadata {}
unsafe impl Send for MalformedMetadata {}
unsafe impl Sync for MalformedMetadata {}


#[derive(Display, Debug, Clone)]
#[display(fmt = "No metadata found for dataset \"{}\"", name)]
pub struct DatasetNotFound {
  name: String,
}
impl DatasetNotFound {
  pub fn boxed(name: &str) -> GenericError {
    Box::new(DatasetNotFound { name: name.to_string() })
  }
}
impl Error for DatasetNotFound {}
unsafe impl Send for DatasetNotFound {}
unsafe impl Sync for DatasetNotFound {}
