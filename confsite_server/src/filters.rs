//! Template filters.
//!
//! Each filter is a pure function of its arguments, except `version` which
//! closes over the revision read at startup.

use chrono::{Locale, NaiveDate, NaiveTime, TimeZone, Utc};
use minijinja::{Environment, Error, ErrorKind, Value};
use pulldown_cmark::{html, Options, Parser};

/// Longest slug, in characters.
pub static SLUG_MAX_LENGTH: usize = 30;

/// Register every filter on the template environment.
pub fn register(env: &mut Environment<'_>, revision: String) {
    env.add_filter("slug", slug);
    env.add_filter("format_duration", format_duration);
    env.add_filter("format_day", format_day_filter);
    env.add_filter("format_minutes", format_minutes_filter);
    env.add_filter("markdown", markdown_filter);
    env.add_filter("ical_datetime", ical_datetime);
    env.add_filter("ical_text", ical_text);
    env.add_filter("version", move |url: &str| {
        Value::from_safe_string(version(url, &revision))
    });
}

fn format_day_filter(day: &str, lang: &str) -> Result<String, Error> {
    let date = NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|err| {
        Error::new(ErrorKind::InvalidOperation, format!("invalid day {day:?}: {err}"))
    })?;
    Ok(format_day(date, lang))
}

fn format_minutes_filter(minutes: Value, lang: &str) -> Result<String, Error> {
    Ok(format_minutes(minutes_of_value(&minutes)?, lang))
}

fn markdown_filter(text: &str) -> Value {
    Value::from_safe_string(markdown(text))
}

/// Lowercase ASCII identifier of at most [`SLUG_MAX_LENGTH`] characters.
pub fn slug(text: &str) -> String {
    slug::slugify(text)
        .chars()
        .take(SLUG_MAX_LENGTH)
        .collect::<String>()
        .trim_end_matches('-')
        .to_string()
}

/// Short duration: `45 min`, `2h`, `1h 30`.
pub fn format_duration(minutes: i64) -> String {
    let (hours, minutes) = (minutes / 60, minutes % 60);
    match (hours, minutes) {
        (0, minutes) => format!("{minutes} min"),
        (hours, 0) => format!("{hours}h"),
        (hours, minutes) => format!("{hours}h {minutes:02}"),
    }
}

/// Long localized date, such as `samedi 1 novembre 2025`.
pub fn format_day(date: NaiveDate, lang: &str) -> String {
    let (locale, pattern) = match lang {
        "en" => (Locale::en_US, "%A, %B %-d, %Y"),
        "fr" => (Locale::fr_FR, "%A %-d %B %Y"),
        "de" => (Locale::de_DE, "%A, %-d. %B %Y"),
        "es" => (Locale::es_ES, "%A, %-d de %B de %Y"),
        "it" => (Locale::it_IT, "%A %-d %B %Y"),
        _ => (Locale::POSIX, "%A, %B %-d, %Y"),
    };
    let datetime = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
    datetime.format_localized(pattern, locale).to_string()
}

/// Short localized time of a minute of day, such as `09:00` or `9:00 AM`.
pub fn format_minutes(minutes: u32, lang: &str) -> String {
    let time = NaiveTime::from_hms_opt(minutes / 60 % 24, minutes % 60, 0).unwrap_or(NaiveTime::MIN);
    match lang {
        "en" => time.format("%-I:%M %p").to_string(),
        _ => time.format("%H:%M").to_string(),
    }
}

/// Minutes of day given as a number or, from JSON object keys, as a string.
fn minutes_of_value(value: &Value) -> Result<u32, Error> {
    if let Some(minutes) = value.as_i64() {
        return u32::try_from(minutes).map_err(|err| {
            Error::new(ErrorKind::InvalidOperation, format!("invalid minutes {minutes}: {err}"))
        });
    }
    value
        .as_str()
        .and_then(|text| text.trim().parse().ok())
        .ok_or_else(|| Error::new(ErrorKind::InvalidOperation, format!("invalid minutes {value}")))
}

pub fn markdown(text: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let mut output = String::new();
    html::push_html(&mut output, Parser::new_ext(text, options));
    output
}

/// `2025-11-01T09:00:00+01:00` becomes `20251101T090000`.
pub fn ical_datetime(text: &str) -> String {
    let compact = text.replace(['-', ':'], "");
    compact.split('+').next().unwrap_or_default().to_string()
}

/// Continue multi-line text on folded lines.
pub fn ical_text(text: &str) -> String {
    text.replace('\n', "\n\t")
}

pub fn version(url: &str, revision: &str) -> String {
    format!("{url}?{revision}")
}

#[cfg(test)]
mod tests {
    use minijinja::context;

    use super::*;

    #[test]
    fn test_slug() {
        assert_eq!(slug("Conférence longue"), "conference-longue");
        assert_eq!(slug("  Atelier / Workshop !"), "atelier-workshop");
        assert_eq!(slug("Talk"), slug("Talk"));
        let long = slug("A very long submission type name that keeps going on and on");
        assert!(long.chars().count() <= SLUG_MAX_LENGTH);
        assert!(!long.ends_with('-'));
        assert_eq!(long, "a-very-long-submission-type-na");
        assert_eq!(slug("abcdefghij abcdefghij abcdefg hi"), "abcdefghij-abcdefghij-abcdefg");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(45), "45 min");
        assert_eq!(format_duration(60), "1h");
        assert_eq!(format_duration(90), "1h 30");
        assert_eq!(format_duration(125), "2h 05");
    }

    #[test]
    fn test_format_day() {
        let date = NaiveDate::from_ymd_opt(2025, 11, 1).unwrap();
        assert_eq!(format_day(date, "fr"), "samedi 1 novembre 2025");
        assert_eq!(format_day(date, "en"), "Saturday, November 1, 2025");
    }

    #[test]
    fn test_format_minutes() {
        assert_eq!(format_minutes(540, "fr"), "09:00");
        assert_eq!(format_minutes(540, "en"), "9:00 AM");
        assert_eq!(format_minutes(810, "en"), "1:30 PM");
    }

    #[test]
    fn test_ical_filters() {
        assert_eq!(ical_datetime("2025-11-01T09:07:00+01:00"), "20251101T090700");
        assert_eq!(ical_datetime("2025-11-01T09:07:00"), "20251101T090700");
        assert_eq!(ical_text("one\ntwo"), "one\n\ttwo");
    }

    #[test]
    fn test_markdown() {
        assert_eq!(markdown("Hello *world*"), "<p>Hello <em>world</em></p>\n");
    }

    #[test]
    fn test_registered_filters() {
        let mut env = Environment::new();
        register(&mut env, "abc1234".to_string());
        env.add_template(
            "test.txt",
            "{{ '/static/style.css' | version }} {{ minutes | format_minutes('fr') }} \
             {{ 540 | format_minutes('en') }} {{ day | format_day('fr') }} \
             {{ 90 | format_duration }} {{ text | markdown }} {{ 'Lightning Talk' | slug }}",
        )
        .unwrap();
        let output = env
            .get_template("test.txt")
            .unwrap()
            .render(context! { minutes => "570", day => "2025-11-02", text => "**bold**" })
            .unwrap();
        assert_eq!(
            output,
            "/static/style.css?abc1234 09:30 9:00 AM dimanche 2 novembre 2025 1h 30 \
             <p><strong>bold</strong></p>\n lightning-talk"
        );
    }
}
