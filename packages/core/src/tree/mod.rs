//! Materialized path encoding
//!
//! Pure, side-effect free helpers used by the path maintainer, the deletion
//! cascade, and the query service.

mod path_codec;

pub use path_codec::{PathCodec, DEFAULT_PATH_SEPARATOR};
