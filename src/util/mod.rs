mod array_map;
pub use array_map::{ArrayMap, AsUsize};
