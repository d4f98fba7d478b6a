pub mod comments;
pub mod dates;
pub mod detail;
pub mod listing;
pub mod richtext;
