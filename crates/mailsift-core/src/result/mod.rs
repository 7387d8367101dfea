//! Search results and their projection from fetched messages.

mod builder;
mod model;

pub use builder::{MessageContent, ResultBuilder};
pub use model::{Attachment, DATE_FORMAT, SearchResult};
