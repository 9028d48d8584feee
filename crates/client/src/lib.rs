//! Client code for fbfeed.
//!
//! This crate provides the browser seam, the authenticated fetch pipeline,
//! post extraction and page/group listings.

pub mod extract;
pub mod fetch;
pub mod listing;
pub mod render;

pub use extract::{ExtractConfig, FeedItem, ItemExtractor, MAX_EXPANSIONS, PostFragment, RouteParams};
pub use fetch::{AuthenticatedFetcher, FetcherConfig};
pub use listing::{Listing, ListingKind, ListingPipeline};
pub use render::{Browser, BrowserPage, RenderError, RequestFilter, ResourceKind};

#[cfg(feature = "render")]
pub use render::{HeadlessBrowser, LaunchOptions};
