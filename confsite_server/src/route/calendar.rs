//! iCalendar export of the schedule.

use std::collections::BTreeSet;

use confsite_core::model::{RoomId, Slot, Talk};
use ical::{
    generator::{Emitter, IcalCalendar, IcalCalendarBuilder, IcalEvent, IcalEventBuilder, Property},
    ical_property,
};

use crate::{filters::ical_datetime, site::Site};

/// Build the calendar of every placed talk, in the given language.
pub fn get_calendar(site: &Site, lang: &str) -> IcalCalendar {
    let changed = chrono::Local::now().format("%Y%m%dT%H%M%S").to_string();
    let mut calendar = IcalCalendarBuilder::version("2.0")
        .gregorian()
        .prodid(site.config.prod_id.clone())
        .build();
    let mut uids = BTreeSet::new();
    for (day, _, room, talk) in site.document.talks() {
        for slot in talk.slots.iter().filter(|slot| {
            slot.room.as_ref().is_some_and(|slot_room| slot_room.id == *room)
                && slot
                    .start
                    .as_deref()
                    .is_some_and(|start| start.starts_with(&day.to_string()))
        }) {
            let Some(event) = get_event(site, lang, talk, slot, *room, &changed) else {
                continue;
            };
            if uids.insert(uid(site.year, talk, slot)) {
                calendar.events.push(event);
            }
        }
    }
    calendar
}

pub fn generate(site: &Site, lang: &str) -> String {
    get_calendar(site, lang).generate()
}

/// Build the event of one slot of a talk.
fn get_event(
    site: &Site,
    lang: &str,
    talk: &Talk,
    slot: &Slot,
    room: RoomId,
    changed: &str,
) -> Option<IcalEvent> {
    let start = ical_datetime(slot.start.as_deref()?);
    let end = ical_datetime(slot.end.as_deref().unwrap_or_default());
    let location = site
        .document
        .room(room)
        .and_then(|room| room.name.as_ref())
        .and_then(|name| name.get(lang))
        .unwrap_or_default();
    let builder = IcalEventBuilder::tzid(site.config.timezone.clone())
        .uid(uid(site.year, talk, slot))
        .changed(changed.to_string())
        .start(start.clone());
    let builder = if end.is_empty() {
        builder.end(start)
    } else {
        builder.end(end)
    };
    let mut builder = builder
        .set(ical_property!("SUMMARY", escape_text(&talk.title)))
        .set(ical_property!("LOCATION", escape_text(location)));
    if let Some(description) = talk.text_field("abstract") {
        builder = builder.set(ical_property!("DESCRIPTION", escape_text(description)));
    }
    Some(builder.build())
}

/// Escape a text value as required by RFC 5545.
fn escape_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace('\n', "\\n")
}

/// Get a unique id for one slot of a talk.
///
/// Changing this function is a breaking change!
fn uid(year: i32, talk: &Talk, slot: &Slot) -> String {
    let code = talk.code.as_deref().unwrap_or(&talk.title);
    let start = ical_datetime(slot.start.as_deref().unwrap_or_default());
    format!("{code}-{start}@pyconfr-{year}")
}
