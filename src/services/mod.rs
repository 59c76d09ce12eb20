pub mod chunked_index;
pub mod source;
#[cfg(feature = "runtime")]
pub mod tracing_setup;

pub use chunked_index::ChunkedIndex;
