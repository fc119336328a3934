mod constants;
mod executor;
mod processor;
pub mod util;
mod value;

pub use constants::*;
pub(crate) use executor::*;
pub use processor::*;
pub use value::*;
