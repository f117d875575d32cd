#![forbid(unsafe_code)]

//! Small ambient utilities shared by every epunfold crate: the catch-all
//! error type, a tagged index wrapper, timing, and test helpers.

mod error;
mod permutation;
mod random_test;
mod tagged_index;
mod test_logger;
mod timing;

pub use error::*;
pub use permutation::*;
pub use random_test::*;
pub use tagged_index::*;
pub use test_logger::*;
pub use timing::*;
