//! The records of the CFP API and the schedule document built from them.
//!
//! Only the fields the schedule needs are typed. Everything else the API
//! returns is kept verbatim in `fields` so that templates can use it.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type RoomId = u64;
pub type Minutes = u32;

/// Talks of one bucket, keyed by room.
pub type Bucket = BTreeMap<RoomId, Talk>;
/// Buckets of one day, keyed by their first minute of day.
pub type DayGrid = BTreeMap<Minutes, Bucket>;
/// Days of a day-set.
pub type Grid = BTreeMap<NaiveDate, DayGrid>;
pub type Extra = BTreeMap<NaiveDate, BTreeMap<Minutes, ExtraBlock>>;
pub type Speakers = BTreeMap<String, Speaker>;

/// Keys of a talk that must not be published.
pub static INTERNAL_FIELDS: [&str; 8] = [
    "do_not_record",
    "notes",
    "internal_notes",
    "review_code",
    "invitation_token",
    "reviews",
    "median_score",
    "mean_score",
];

/// Text that is either plain or translated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocalizedText {
    Plain(String),
    Localized(BTreeMap<String, String>),
}

impl LocalizedText {
    /// The text in `lang`, falling back to English and then to any translation.
    pub fn get(&self, lang: &str) -> Option<&str> {
        match self {
            LocalizedText::Plain(text) => Some(text),
            LocalizedText::Localized(texts) => texts
                .get(lang)
                .or_else(|| texts.get("en"))
                .or_else(|| texts.values().next())
                .map(String::as_str),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Talk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub slots: Vec<Slot>,
    #[serde(default)]
    pub speakers: Vec<Speaker>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_type: Option<SubmissionType>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Talk {
    /// Remove the non-public fields.
    pub fn scrub(&mut self) {
        for key in INTERNAL_FIELDS {
            self.fields.remove(key);
        }
    }

    pub fn is_scheduled(&self) -> bool {
        !self.slots.is_empty()
    }

    pub fn text_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub room: Option<SlotRoom>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotRoom {
    pub id: RoomId,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Speaker {
    pub code: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionType {
    pub name: LocalizedText,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<LocalizedText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_conferences: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_sprints: Option<bool>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraBlock {
    pub id: String,
    pub title: BTreeMap<String, String>,
}

/// One page of a paginated API listing.
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub next: Option<String>,
    pub results: Vec<T>,
}

/// The single file shared by the fetcher and the site.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleDocument {
    pub schedule: Grid,
    pub sprints: Grid,
    pub rooms: Vec<Room>,
    pub extra: Extra,
    pub speakers: Speakers,
}

impl ScheduleDocument {
    /// Every placed talk of the conference days then of the sprint days, with its day and room.
    pub fn talks(&self) -> impl Iterator<Item = (&NaiveDate, &Minutes, &RoomId, &Talk)> {
        self.schedule
            .iter()
            .chain(self.sprints.iter())
            .flat_map(|(day, hours)| {
                hours.iter().flat_map(move |(minutes, rooms)| {
                    rooms
                        .iter()
                        .map(move |(room, talk)| (day, minutes, room, talk))
                })
            })
    }

    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.iter().find(|room| room.id == id)
    }
}
