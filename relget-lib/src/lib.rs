pub mod asset_filter;
pub mod cache;
pub mod config;
pub mod downloader;
pub mod error;
pub mod github;
pub mod logging;
pub mod release_source;
pub mod repo;
pub mod updater;
pub mod version_matcher;

#[cfg(test)]
pub mod test_helpers;
