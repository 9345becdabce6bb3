//! Feed-format parsers shared by the feed-backed sources.

pub mod ical;
pub mod rss;
