//! Placement of the talks on the schedule grid.
//!
//! Both day-sets get a dense grid: every day holds every bucket of the daily
//! window, even the empty ones, so that pages can draw a full table.

use std::collections::HashMap;

use bitmask_enum::bitmask;
use chrono::{DateTime, NaiveDate, Timelike};
use log::{debug, warn};

use crate::{
    config::{DaySet, EventConfig},
    error::{Error, Result},
    model::{DayGrid, Grid, Minutes, Room, RoomId, Speakers, Talk},
};

/// The day-sets a room hosts talks in.
#[bitmask(u8)]
pub enum RoomUsage {
    Conferences,
    Sprints,
}

impl From<DaySet> for RoomUsage {
    fn from(value: DaySet) -> Self {
        match value {
            DaySet::Conference => RoomUsage::Conferences,
            DaySet::Sprint => RoomUsage::Sprints,
        }
    }
}

/// The result of placing every talk.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub schedule: Grid,
    pub sprints: Grid,
    pub rooms: Vec<Room>,
    pub speakers: Speakers,
}

/// Build a grid with an empty bucket for every bucket start of every day.
pub fn empty_grid(days: &[NaiveDate], event: &EventConfig) -> Grid {
    days.iter()
        .map(|day| {
            let hours: DayGrid = event
                .bucket_starts()
                .map(|minutes| (minutes, Default::default()))
                .collect();
            (*day, hours)
        })
        .collect()
}

/// Floor a minute of day to the start of its bucket.
pub fn bucket_of(minutes: Minutes, slot_minutes: Minutes) -> Minutes {
    minutes / slot_minutes * slot_minutes
}

/// Place the talks on the conference and sprint grids.
///
/// Slots without start are skipped. Slots on an unknown day, outside the
/// daily window or in an unknown room are logged and dropped. When two talks
/// share a bucket and a room, the last one wins.
pub fn normalize(talks: Vec<Talk>, rooms: Vec<Room>, event: &EventConfig) -> Result<Normalized> {
    let mut schedule = empty_grid(&event.conference_days, event);
    let mut sprints = empty_grid(&event.sprint_days, event);
    let mut usage: HashMap<RoomId, RoomUsage> = rooms
        .iter()
        .map(|room| (room.id, RoomUsage::none()))
        .collect();
    for mut talk in talks {
        talk.scrub();
        for slot in &talk.slots {
            let Some(start) = slot.start.as_deref().filter(|start| !start.is_empty()) else {
                continue;
            };
            // Talks and schedule are assumed to share the same timezone.
            let start = DateTime::parse_from_rfc3339(start).map_err(|source| Error::InvalidSlot {
                value: start.to_string(),
                source,
            })?;
            let date = start.date_naive();
            let Some(day_set) = event.day_set(&date) else {
                warn!("wrong date for talk {:?}: {date}", talk.title);
                continue;
            };
            let Some(room) = slot.room.as_ref().map(|room| room.id) else {
                warn!("no room for talk {:?} on {date}", talk.title);
                continue;
            };
            let Some(room_usage) = usage.get_mut(&room) else {
                warn!("unknown room {room} for talk {:?}", talk.title);
                continue;
            };
            let minutes = bucket_of(start.hour() * 60 + start.minute(), event.slot_minutes);
            let grid = match day_set {
                DaySet::Conference => &mut schedule,
                DaySet::Sprint => &mut sprints,
            };
            let Some(bucket) = grid
                .get_mut(&date)
                .and_then(|hours| hours.get_mut(&minutes))
            else {
                warn!(
                    "talk {:?} starts outside of the schedule window: {start}",
                    talk.title
                );
                continue;
            };
            if let Some(previous) = bucket.insert(room, talk.clone()) {
                debug!(
                    "talk {:?} replaces {:?} in room {room} on {date} at minute {minutes}",
                    talk.title, previous.title
                );
            }
            *room_usage |= RoomUsage::from(day_set);
        }
    }
    let rooms = rooms
        .into_iter()
        .map(|mut room| {
            let room_usage = usage.get(&room.id).copied().unwrap_or_else(RoomUsage::none);
            if room_usage.contains(RoomUsage::Conferences) {
                room.in_conferences = Some(true);
            }
            if room_usage.contains(RoomUsage::Sprints) {
                room.in_sprints = Some(true);
            }
            room
        })
        .collect();
    let speakers = speaker_index([&schedule, &sprints]);
    Ok(Normalized {
        schedule,
        sprints,
        rooms,
        speakers,
    })
}

/// Collect the speakers of every placed talk, keyed by speaker code.
///
/// A speaker listed on several talks keeps the record seen last.
pub fn speaker_index<'a>(grids: impl IntoIterator<Item = &'a Grid>) -> Speakers {
    let mut speakers = Speakers::new();
    for grid in grids {
        for talk in grid
            .values()
            .flat_map(|hours| hours.values())
            .flat_map(|rooms| rooms.values())
        {
            for speaker in &talk.speakers {
                speakers.insert(speaker.code.clone(), speaker.clone());
            }
        }
    }
    speakers
}
