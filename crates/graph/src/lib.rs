#![forbid(unsafe_code)]
#![doc = "A small in-house undirected graph kernel, specialized to self-loops and dense `usize` vertex labels — used throughout epunfold in place of a general-purpose graph library."]

mod graph;
mod mapping;

pub use graph::*;
pub use mapping::*;
