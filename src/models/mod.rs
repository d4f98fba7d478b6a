mod document;
mod post;

pub use document::*;
pub use post::*;
