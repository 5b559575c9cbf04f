//! Page discovery module.
//!
//! This module handles discovering in-scope page URLs from:
//! - robots.txt `Sitemap:` directives plus well-known fallback paths
//! - recursive sitemap / sitemap-index expansion

pub mod robots;
pub mod sitemap;

pub use robots::discover_sitemap_urls;
pub use sitemap::{load_sitemap_pages, SitemapPages};
