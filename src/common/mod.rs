pub mod timeout;
pub mod utils;

pub use timeout::{Timeout, TimeoutParseError};
