//! Feature announcements from the third-party content source.
//!
//! Fetching is retried with a fixed delay and never fails outright: once the
//! attempts are used up the fetcher logs the last error and yields nothing.

mod fetcher;
mod mapping;
mod models;
mod render;
mod retry;

pub use fetcher::{
    AnnouncementFetchError, AnnouncementSource, FeatureAnnouncementFetcher,
    DEFAULT_CONTENT_BASE_URL, DEFAULT_ENVIRONMENT,
};
pub use mapping::map_to_notifications;
pub use models::{
    AnnouncementAction, AnnouncementFields, AnnouncementImage, AnnouncementLink, ContentIncludes,
    ContentItem, ContentLink, ContentPayload, ContentSys, FeatureAnnouncementData, IncludedItem,
    RawAnnouncement,
};
pub use render::{render, HtmlRenderer, RichTextRenderer};
pub use retry::{RetryOutcome, RetryPolicy};
