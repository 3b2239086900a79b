//! Reference resolution from the content payload into announcements.

use serde::de::DeserializeOwned;
use tracing::debug;

use super::models::{AnnouncementImage, ContentIncludes, ContentLink, ContentPayload, RawAnnouncement};

/// Resolve every item of `payload` into a [`RawAnnouncement`].
///
/// References missing from `includes`, or whose fields do not match the
/// expected shape, resolve to `None` for that sub-field only.
pub fn map_to_notifications(payload: Option<&ContentPayload>) -> Vec<RawAnnouncement> {
    let Some(payload) = payload else {
        return Vec::new();
    };
    let empty = ContentIncludes::default();
    let includes = payload.includes.as_ref().unwrap_or(&empty);

    payload
        .items
        .iter()
        .map(|item| {
            let fields = &item.fields;
            RawAnnouncement {
                id: fields.id.clone(),
                created_at: item.sys.created_at.unwrap_or_default(),
                category: fields.category.clone(),
                title: fields.title.clone(),
                short_description: fields.short_description.clone(),
                long_description: fields.long_description.clone(),
                image: resolve_image(includes, fields.image.as_ref()),
                extension_link: resolve(includes, fields.extension_link.as_ref()),
                link: resolve(includes, fields.link.as_ref()),
            }
        })
        .collect()
}

fn resolve<T: DeserializeOwned>(includes: &ContentIncludes, link: Option<&ContentLink>) -> Option<T> {
    let id = &link?.sys.id;
    let fields = includes.find(id);
    if fields.is_none() {
        debug!(id = %id, "Unresolved content reference");
    }
    serde_json::from_value(fields?.clone()).ok()
}

fn resolve_image(includes: &ContentIncludes, link: Option<&ContentLink>) -> Option<AnnouncementImage> {
    let fields = includes.find(&link?.sys.id)?;
    let url = fields.get("file")?.get("url")?.as_str()?;
    let url = match url.strip_prefix("//") {
        Some(rest) => format!("https://{}", rest),
        None => url.to_string(),
    };
    let text = |key: &str| fields.get(key).and_then(|v| v.as_str()).map(str::to_string);

    Some(AnnouncementImage {
        title: text("title"),
        description: text("description"),
        url,
    })
}
