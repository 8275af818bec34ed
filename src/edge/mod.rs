pub mod meta;
pub mod query;

pub use meta::*;
pub use query::*;
