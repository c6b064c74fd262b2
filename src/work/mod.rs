//! Work records: job fields, the deterministic event slug, and the
//! coworker tagger that orchestrates record creation and invite acceptance.

pub mod slug;
pub mod tagger;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::invites::WorkSnapshot;

pub use slug::event_slug;
pub use tagger::CoworkerTagger;

/// Job fields supplied by the owner when logging a work record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkFields {
    pub title: String,
    pub role: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default)]
    pub pin_to_profile: bool,
}

impl WorkFields {
    /// The deterministic event slug for these fields
    pub fn slug(&self) -> String {
        event_slug(&self.title, self.from, self.to)
    }

    /// Clone the fields into a capability-token payload
    pub fn snapshot(&self, slug: &str) -> WorkSnapshot {
        WorkSnapshot {
            title: self.title.clone(),
            role: self.role.clone(),
            from: self.from,
            to: self.to,
            caption: self.caption.clone(),
            photos: self.photos.clone(),
            pin_to_profile: self.pin_to_profile,
            slug: slug.to_string(),
        }
    }
}

impl From<WorkSnapshot> for WorkFields {
    fn from(snapshot: WorkSnapshot) -> Self {
        Self {
            title: snapshot.title,
            role: snapshot.role,
            from: snapshot.from,
            to: snapshot.to,
            caption: snapshot.caption,
            photos: snapshot.photos,
            pin_to_profile: snapshot.pin_to_profile,
        }
    }
}
