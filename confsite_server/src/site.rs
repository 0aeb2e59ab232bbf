//! The rendered site.
//!
//! A [`Site`] is built once at startup from the schedule document and shared
//! read-only by every request handler and by the static export.

use std::{collections::BTreeMap, fs::read_dir, fs::read_to_string, path::Path};

use anyhow::{anyhow, Context, Result};
use confsite_core::{
    config::{Config, SiteConfig},
    document::ScheduleDocument,
    model::SubmissionType,
};
use log::{info, warn};
use minijinja::{context, path_loader, Environment, Value};

use crate::{filters, pdf, route::calendar};

static TEMPLATE_SUFFIX: &str = ".jinja2.html";
static REVISION_LENGTH: usize = 7;

/// Talk categories keyed by the slug of their English name.
pub type Categories = BTreeMap<String, SubmissionType>;

/// Something the site can render, for a given language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Page {
    /// `{lang}/{name}.jinja2.html`
    Named(String),
    /// The talks of one category.
    Talks(String),
    Schedule,
    SchedulePdf,
    Calendar,
}

impl Page {
    /// Resolve the last segment of a localized URL.
    pub fn from_file(file: &str) -> Option<Page> {
        match file {
            "full-schedule.html" => Some(Page::Schedule),
            "full-schedule.pdf" => Some(Page::SchedulePdf),
            "calendar.ics" => Some(Page::Calendar),
            _ => file
                .strip_suffix(".html")
                .filter(|name| !name.is_empty())
                .map(|name| Page::Named(name.to_string())),
        }
    }

    /// The URL path of the page.
    pub fn path(&self, year: i32, lang: &str) -> String {
        match self {
            Page::Named(name) if name == "index" => format!("/{year}/{lang}/"),
            Page::Named(name) => format!("/{year}/{lang}/{name}.html"),
            Page::Talks(category) => format!("/{year}/{lang}/talks/{category}.html"),
            Page::Schedule => format!("/{year}/{lang}/full-schedule.html"),
            Page::SchedulePdf => format!("/{year}/{lang}/full-schedule.pdf"),
            Page::Calendar => format!("/{year}/{lang}/calendar.ics"),
        }
    }
}

/// A rendered page and its content type.
#[derive(Debug)]
pub struct Rendered {
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

pub struct Site {
    pub year: i32,
    pub config: SiteConfig,
    pub document: ScheduleDocument,
    pub categories: Categories,
    env: Environment<'static>,
    schedule: Value,
    categories_value: Value,
}

impl Site {
    /// Load the schedule document and prepare the templates.
    pub fn new(config: &Config) -> Result<Site> {
        let path = &config.site.schedule;
        let document = ScheduleDocument::load(path)
            .with_context(|| format!("cannot load the schedule from {}", path.display()))?;
        let revision = revision(&config.site.git_ref);
        info!(
            "loaded {} talks from {}, revision {revision}",
            document.talks().count(),
            path.display()
        );
        Ok(Site::from_document(config, document, revision))
    }

    pub fn from_document(config: &Config, document: ScheduleDocument, revision: String) -> Site {
        let mut env = Environment::new();
        env.set_loader(path_loader(config.site.templates.clone()));
        filters::register(&mut env, revision);
        let categories = categories(&document);
        Site {
            year: config.event.year,
            config: config.site.clone(),
            schedule: Value::from_serialize(&document),
            categories_value: Value::from_serialize(&categories),
            categories,
            document,
            env,
        }
    }

    fn render_template(&self, name: &str, ctx: Value) -> Result<String> {
        Ok(self.env.get_template(name)?.render(ctx)?)
    }

    pub fn page(&self, lang: &str, name: &str) -> Result<String> {
        self.render_template(
            &format!("{lang}/{name}{TEMPLATE_SUFFIX}"),
            context! {
                page_name => name,
                lang => lang,
                year => self.year,
                schedule => self.schedule.clone(),
                categories => self.categories_value.clone(),
            },
        )
    }

    pub fn talks(&self, lang: &str, category: &str) -> Result<String> {
        let title = self
            .categories
            .get(category)
            .ok_or_else(|| anyhow!("unknown talk category {category:?}"))?
            .name
            .get(lang)
            .unwrap_or(category);
        self.render_template(
            &format!("{lang}/talks{TEMPLATE_SUFFIX}"),
            context! {
                page_name => "talks",
                lang => lang,
                year => self.year,
                category => category,
                title => title,
                schedule => self.schedule.clone(),
                categories => self.categories_value.clone(),
            },
        )
    }

    pub fn schedule(&self, lang: &str) -> Result<String> {
        self.render_template(
            &format!("schedule{TEMPLATE_SUFFIX}"),
            context! {
                page_name => "full-schedule",
                lang => lang,
                year => self.year,
                schedule => self.schedule.clone(),
            },
        )
    }

    /// Render the full schedule, then convert it to PDF.
    pub async fn schedule_pdf(&self, lang: &str) -> Result<Vec<u8>> {
        let html = self.schedule(lang)?;
        pdf::html_to_pdf(&self.config.pdf_command, &html).await
    }

    pub fn calendar(&self, lang: &str) -> Result<String> {
        if !self.config.languages.iter().any(|known| known == lang) {
            return Err(anyhow!("unknown language {lang:?}"));
        }
        Ok(calendar::generate(self, lang))
    }

    pub async fn render(&self, lang: &str, page: &Page) -> Result<Rendered> {
        let rendered = match page {
            Page::Named(name) => html(self.page(lang, name)?),
            Page::Talks(category) => html(self.talks(lang, category)?),
            Page::Schedule => html(self.schedule(lang)?),
            Page::SchedulePdf => Rendered {
                content_type: "application/pdf",
                body: self.schedule_pdf(lang).await?,
            },
            Page::Calendar => Rendered {
                content_type: "text/calendar",
                body: self.calendar(lang)?.into_bytes(),
            },
        };
        Ok(rendered)
    }

    /// Names of the simple pages found in the templates of a language.
    pub fn page_names(&self, lang: &str) -> Result<Vec<String>> {
        let dir = self.config.templates.join(lang);
        let mut names = vec![];
        for entry in read_dir(&dir).with_context(|| format!("cannot list {}", dir.display()))? {
            let file_name = entry?.file_name();
            let Some(name) = file_name
                .to_str()
                .and_then(|file_name| file_name.strip_suffix(TEMPLATE_SUFFIX))
            else {
                continue;
            };
            if name != "talks" {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

fn html(body: String) -> Rendered {
    Rendered {
        content_type: "text/html; charset=utf-8",
        body: body.into_bytes(),
    }
}

/// Index the submission types of every placed talk by slug.
///
/// When two types share a slug, the one seen last wins.
pub fn categories(document: &ScheduleDocument) -> Categories {
    let mut categories = Categories::new();
    for (_, _, _, talk) in document.talks() {
        let Some(submission_type) = &talk.submission_type else {
            continue;
        };
        let Some(name) = submission_type.name.get("en") else {
            continue;
        };
        categories.insert(filters::slug(name), submission_type.clone());
    }
    categories
}

/// Short hash of the deployed revision, used to bust caches.
pub fn revision(git_ref: &Path) -> String {
    match read_to_string(git_ref) {
        Ok(text) => text.trim().chars().take(REVISION_LENGTH).collect(),
        Err(err) => {
            warn!(
                "cannot read revision from {}: {err}, using the package version",
                git_ref.display()
            );
            env!("CARGO_PKG_VERSION").to_string()
        }
    }
}

#[cfg(test)]
pub mod tests {
    use std::path::PathBuf;

    use confsite_core::{config::EventConfig, model::Talk, schedule::normalize};
    use serde_json::json;

    use super::*;

    fn talk(code: &str, (start, end): (&str, &str), room: u64, kind: (&str, &str), speaker: &str) -> Talk {
        serde_json::from_value(json!({
            "code": code,
            "title": format!("Talk {code}"),
            "abstract": format!("About *{code}*\nand more"),
            "duration": 30,
            "slots": [{"start": start, "end": end, "room": {"id": room}}],
            "speakers": [{"code": speaker, "name": format!("Speaker {speaker}"), "biography": "Bio"}],
            "submission_type": {"id": 1, "name": {"en": kind.0, "fr": kind.1}},
        }))
        .unwrap()
    }

    pub fn document() -> ScheduleDocument {
        let event = EventConfig::default();
        let talks = vec![
            talk("AAA", ("2025-11-01T09:07:00+01:00", "2025-11-01T09:30:00+01:00"), 3, ("Talk", "Conférence"), "abc"),
            talk("BBB", ("2025-11-02T14:00:00+01:00", "2025-11-02T16:00:00+01:00"), 4, ("Workshop", "Atelier"), "def"),
            talk("CCC", ("2025-10-30T10:00:00+01:00", "2025-10-30T18:00:00+01:00"), 4, ("Sprint", "Sprint"), "ghi"),
        ];
        let rooms = serde_json::from_value(json!([
            {"id": 3, "name": {"en": "Room A", "fr": "Salle A"}},
            {"id": 4, "name": {"en": "Room B", "fr": "Salle B"}},
        ]))
        .unwrap();
        let normalized = normalize(talks, rooms, &event).unwrap();
        ScheduleDocument::new(normalized, event.extra())
    }

    pub fn config() -> Config {
        let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        let mut config = Config::default();
        config.site.templates = root.join("templates");
        config.site.static_dir = root.join("static");
        config.site.pdf_command = vec!["cat".to_string()];
        config
    }

    pub fn site() -> Site {
        Site::from_document(&config(), document(), "abc1234".to_string())
    }

    #[test]
    fn test_page_from_file() {
        assert_eq!(Page::from_file("full-schedule.html"), Some(Page::Schedule));
        assert_eq!(Page::from_file("full-schedule.pdf"), Some(Page::SchedulePdf));
        assert_eq!(Page::from_file("calendar.ics"), Some(Page::Calendar));
        assert_eq!(Page::from_file("venue.html"), Some(Page::Named("venue".into())));
        assert_eq!(Page::from_file("venue.php"), None);
        assert_eq!(Page::from_file(".html"), None);
    }

    #[test]
    fn test_page_path() {
        assert_eq!(Page::Named("index".into()).path(2025, "fr"), "/2025/fr/");
        assert_eq!(Page::Talks("talk".into()).path(2025, "en"), "/2025/en/talks/talk.html");
        assert_eq!(Page::Calendar.path(2025, "en"), "/2025/en/calendar.ics");
    }

    #[test]
    fn test_categories_cover_schedule_and_sprints() {
        let categories = categories(&document());
        assert_eq!(
            categories.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["sprint", "talk", "workshop"]
        );
    }

    #[test]
    fn test_categories_last_write_wins() {
        let mut document = document();
        let saturday = chrono::NaiveDate::from_ymd_opt(2025, 11, 1).unwrap();
        let mut other = document.schedule[&saturday][&540][&3].clone();
        other.submission_type = Some(
            serde_json::from_value(json!({"id": 2, "name": {"en": "TALK", "fr": "Exposé"}})).unwrap(),
        );
        document.schedule.get_mut(&saturday).unwrap().get_mut(&600).unwrap().insert(3, other);
        let categories = categories(&document);
        assert_eq!(categories["talk"].name.get("fr"), Some("Exposé"));
    }

    #[test]
    fn test_page_renders() {
        let site = site();
        let html = site.page("fr", "index").unwrap();
        assert!(html.contains("samedi 1 novembre 2025"));
        assert!(html.contains("Talk AAA"));
        assert!(html.contains("/2025/static/style.css?abc1234"));
        let html = site.page("en", "index").unwrap();
        assert!(html.contains("Saturday, November 1, 2025"));
        assert!(html.contains("9:00 AM"));
    }

    #[test]
    fn test_talks_renders_category() {
        let site = site();
        let html = site.talks("fr", "workshop").unwrap();
        assert!(html.contains("Atelier"));
        assert!(html.contains("Talk BBB"));
        assert!(!html.contains("Talk AAA"));
        assert!(html.contains("<em>BBB</em>"));
    }

    #[test]
    fn test_unknown_lookups_fail() {
        let site = site();
        assert!(site.talks("fr", "keynote").is_err());
        assert!(site.page("fr", "missing").is_err());
        assert!(site.page("xx", "index").is_err());
        assert!(site.calendar("xx").is_err());
    }

    #[test]
    fn test_schedule_renders_every_room() {
        let html = site().schedule("fr").unwrap();
        assert!(html.contains("Salle A"));
        assert!(html.contains("Salle B"));
        assert!(html.contains("Petit-déjeuner"));
        assert!(html.contains("Talk BBB"));
    }

    #[tokio::test]
    async fn test_render_content_types() {
        let site = site();
        let rendered = site.render("en", &Page::Calendar).await.unwrap();
        assert_eq!(rendered.content_type, "text/calendar");
        let rendered = site.render("en", &Page::Named("index".into())).await.unwrap();
        assert_eq!(rendered.content_type, "text/html; charset=utf-8");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_schedule_pdf_pipes_html_through_converter() {
        let site = site();
        let rendered = site.render("fr", &Page::SchedulePdf).await.unwrap();
        assert_eq!(rendered.content_type, "application/pdf");
        assert_eq!(rendered.body, site.schedule("fr").unwrap().into_bytes());
    }

    #[test]
    fn test_page_names() {
        let names = site().page_names("fr").unwrap();
        assert!(names.contains(&"index".to_string()));
        assert!(!names.contains(&"talks".to_string()));
    }

    #[test]
    fn test_revision() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main");
        std::fs::write(&path, "0123456789abcdef\n").unwrap();
        assert_eq!(revision(&path), "0123456");
        assert_eq!(revision(&dir.path().join("missing")), env!("CARGO_PKG_VERSION"));
    }
}
