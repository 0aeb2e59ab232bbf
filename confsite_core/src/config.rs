//! Configuration of one conference edition.
//!
//! Everything that changes from one year to the next lives here: the days,
//! the daily window of the schedule grid, the meal blocks, the CFP endpoints
//! and the paths used by the site. A missing configuration file falls back to
//! the built-in defaults.

use std::{
    collections::BTreeMap,
    fs::read_to_string,
    io::ErrorKind,
    net::SocketAddr,
    path::{Path, PathBuf},
};

use chrono::{NaiveDate, NaiveTime, Timelike};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    model::{Extra, ExtraBlock, Minutes},
};

static TALKS_PATH: &str =
    "submissions/?expand=slots,slots.room,speakers,answers.options,submission_type";
static ROOMS_PATH: &str = "rooms/";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub event: EventConfig,
    pub fetch: FetchConfig,
    pub site: SiteConfig,
}

impl Config {
    /// Load the configuration from a TOML file.
    ///
    /// A missing file yields the defaults, an unreadable or invalid one is an error.
    pub fn load(path: &Path) -> Result<Config> {
        let text = match read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                warn!(
                    "configuration file {} not found, using defaults",
                    path.display()
                );
                return Ok(Config::default());
            }
            Err(err) => return Err(err.into()),
        };
        Config::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Config> {
        let config: Config = toml::from_str(text)?;
        config.event.validate()?;
        Ok(config)
    }
}

/// The days and the grid of the schedule.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    pub year: i32,
    pub conference_days: Vec<NaiveDate>,
    pub sprint_days: Vec<NaiveDate>,
    #[serde(with = "hour_minute")]
    pub day_start: NaiveTime,
    #[serde(with = "hour_minute")]
    pub day_stop: NaiveTime,
    pub slot_minutes: Minutes,
    pub extra: Vec<ExtraEntry>,
}

impl Default for EventConfig {
    fn default() -> Self {
        let day = |month, day| NaiveDate::from_ymd_opt(2025, month, day).unwrap_or_default();
        let time = |hour, minute| NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default();
        let meal = |date: NaiveDate, at: NaiveTime, id: &str, en: &str, fr: &str| ExtraEntry {
            day: date,
            time: at,
            id: id.to_string(),
            title: BTreeMap::from([
                ("en".to_string(), en.to_string()),
                ("fr".to_string(), fr.to_string()),
            ]),
        };
        let saturday = day(11, 1);
        let sunday = day(11, 2);
        EventConfig {
            year: 2025,
            conference_days: vec![saturday, sunday],
            sprint_days: vec![day(10, 30), day(10, 31)],
            day_start: time(8, 30),
            day_stop: time(18, 0),
            slot_minutes: 10,
            extra: vec![
                meal(saturday, time(8, 30), "saturday-breakfast", "Breakfast", "Petit-déjeuner"),
                meal(saturday, time(12, 30), "saturday-lunch", "Lunch", "Déjeuner"),
                meal(saturday, time(16, 0), "saturday-snack", "Snack Time", "Goûter"),
                meal(sunday, time(8, 30), "sunday-breakfast", "Breakfast", "Petit-déjeuner"),
                meal(sunday, time(13, 0), "sunday-lunch", "Lunch", "Déjeuner"),
            ],
        }
    }
}

/// Which group of days a date belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaySet {
    Conference,
    Sprint,
}

impl EventConfig {
    /// Check the consistency of the grid settings.
    pub fn validate(&self) -> Result<()> {
        if self.slot_minutes == 0 {
            return Err(Error::Config("slot_minutes must be positive".into()));
        }
        if self.day_start >= self.day_stop {
            return Err(Error::Config("day_start must be before day_stop".into()));
        }
        for (name, time) in [("day_start", self.day_start), ("day_stop", self.day_stop)] {
            if minutes_of(time) % self.slot_minutes != 0 {
                return Err(Error::Config(format!(
                    "{name} must be a multiple of {} minutes",
                    self.slot_minutes
                )));
            }
        }
        if let Some(day) = self
            .conference_days
            .iter()
            .find(|day| self.sprint_days.contains(day))
        {
            return Err(Error::Config(format!(
                "{day} is both a conference and a sprint day"
            )));
        }
        Ok(())
    }

    /// Every bucket start of a day, from `day_start` included to `day_stop` excluded.
    pub fn bucket_starts(&self) -> impl Iterator<Item = Minutes> {
        (minutes_of(self.day_start)..minutes_of(self.day_stop)).step_by(self.slot_minutes as usize)
    }

    pub fn day_set(&self, date: &NaiveDate) -> Option<DaySet> {
        if self.conference_days.contains(date) {
            Some(DaySet::Conference)
        } else if self.sprint_days.contains(date) {
            Some(DaySet::Sprint)
        } else {
            None
        }
    }

    /// The meal blocks keyed by day and minute of day.
    pub fn extra(&self) -> Extra {
        let mut extra = Extra::new();
        for entry in &self.extra {
            extra.entry(entry.day).or_default().insert(
                minutes_of(entry.time),
                ExtraBlock {
                    id: entry.id.clone(),
                    title: entry.title.clone(),
                },
            );
        }
        extra
    }
}

/// A non-talk block of the schedule, such as a meal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtraEntry {
    pub day: NaiveDate,
    #[serde(with = "hour_minute")]
    pub time: NaiveTime,
    pub id: String,
    pub title: BTreeMap<String, String>,
}

/// Where and how the schedule is downloaded.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub api_base: String,
    pub token_file: PathBuf,
    pub output: PathBuf,
    pub max_pages: usize,
    pub insecure_prefix: String,
    pub secure_prefix: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            api_base: "https://cfp.pycon.fr/api/events/pyconfr-2025/".to_string(),
            token_file: PathBuf::from("token.key"),
            output: PathBuf::from("schedule.json"),
            max_pages: 100,
            insecure_prefix: "http://cfp.pycon.fr/".to_string(),
            secure_prefix: "https://cfp.pycon.fr/".to_string(),
        }
    }
}

impl FetchConfig {
    pub fn talks_url(&self) -> String {
        format!("{}{TALKS_PATH}", self.api_base)
    }

    pub fn rooms_url(&self) -> String {
        format!("{}{ROOMS_PATH}", self.api_base)
    }
}

/// Paths and settings of the rendered site.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub schedule: PathBuf,
    pub templates: PathBuf,
    pub static_dir: PathBuf,
    pub output_dir: PathBuf,
    pub git_ref: PathBuf,
    pub languages: Vec<String>,
    pub default_language: String,
    pub bind: SocketAddr,
    pub timezone: String,
    pub prod_id: String,
    pub pdf_command: Vec<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        SiteConfig {
            schedule: PathBuf::from("schedule.json"),
            templates: PathBuf::from("templates"),
            static_dir: PathBuf::from("static"),
            output_dir: PathBuf::from("build"),
            git_ref: PathBuf::from(".git/refs/heads/main"),
            languages: vec!["fr".to_string(), "en".to_string()],
            default_language: "fr".to_string(),
            bind: SocketAddr::from(([127, 0, 0, 1], 5000)),
            timezone: "Europe/Paris".to_string(),
            prod_id: "-//PyConFR//Schedule//EN".to_string(),
            pdf_command: vec!["weasyprint".to_string(), "-".to_string(), "-".to_string()],
        }
    }
}

pub fn minutes_of(time: NaiveTime) -> Minutes {
    time.hour() * 60 + time.minute()
}

/// `HH:MM` times in TOML.
mod hour_minute {
    use chrono::NaiveTime;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    static FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let text = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&text, FORMAT).map_err(D::Error::custom)
    }
}
