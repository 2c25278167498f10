//! Crawl engine
//!
//! Crawl jobs are started per task and can be cancelled by task id.
//! Fetching and parsing pages is left to a pluggable [`CrawlRunner`].

pub mod engine;

pub use engine::{
    CrawlEngine, CrawlError, CrawlJobInfo, CrawlJobRegistry, CrawlReport, CrawlRunner,
    LoggingRunner,
};
