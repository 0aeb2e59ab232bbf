//! This client fetches talks and rooms from the Pretalx API and builds the schedule document.

use std::{fs::read_to_string, path::Path};

use log::{info, warn};
use reqwest::{header::AUTHORIZATION, Client};
use serde::de::DeserializeOwned;

use crate::{
    config::Config,
    document::ScheduleDocument,
    error::{Error, Result},
    model::{Page, Room, Talk},
    schedule,
};

/// Read the API token, failing before any request when the file is missing.
pub fn read_token(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(Error::MissingToken(path.to_path_buf()));
    }
    Ok(read_to_string(path)?.trim().to_string())
}

/// Get the schedule document of the configured event.
pub async fn get(config: &Config, token: &str) -> Result<ScheduleDocument> {
    let client = PretalxClient::new(token, config.fetch.max_pages);
    let talks = client.fetch_talks(&config.fetch.talks_url()).await?;
    let rooms = client.fetch_rooms(&config.fetch.rooms_url()).await?;
    info!("Generating schedule");
    let normalized = schedule::normalize(talks, rooms, &config.event)?;
    Ok(ScheduleDocument::new(normalized, config.event.extra()))
}

/// Sequential, authenticated access to the paginated listings.
pub struct PretalxClient {
    client: Client,
    token: String,
    max_pages: usize,
}

impl PretalxClient {
    pub fn new(token: &str, max_pages: usize) -> Self {
        PretalxClient {
            client: Client::new(),
            token: token.to_string(),
            max_pages,
        }
    }

    /// Get the scheduled talks, without their internal fields.
    pub async fn fetch_talks(&self, url: &str) -> Result<Vec<Talk>> {
        let talks = self
            .paginated::<Talk>(url, "talks")
            .await?
            .into_iter()
            .filter(Talk::is_scheduled)
            .map(|mut talk| {
                talk.scrub();
                talk
            })
            .collect();
        Ok(talks)
    }

    pub async fn fetch_rooms(&self, url: &str) -> Result<Vec<Room>> {
        self.paginated(url, "rooms").await
    }

    /// Follow the `next` links, one page after the other, up to `max_pages` pages.
    async fn paginated<T: DeserializeOwned>(&self, url: &str, label: &str) -> Result<Vec<T>> {
        let mut results = vec![];
        let mut next = Some(url.to_string());
        for page in 0..self.max_pages {
            let Some(url) = next.take() else {
                break;
            };
            info!("Downloading {label} (page #{page})");
            let data: Page<T> = self
                .client
                .get(&url)
                .header(AUTHORIZATION, format!("Token {}", self.token))
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            results.extend(data.results);
            next = data.next.filter(|next| !next.is_empty());
        }
        if let Some(url) = next {
            warn!(
                "stopped downloading {label} after {} pages, {url} was not fetched",
                self.max_pages
            );
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use std::net::{SocketAddr, TcpListener};

    use axum::{
        extract::State,
        http::{HeaderMap, StatusCode},
        routing::get,
        Json, Router,
    };
    use serde_json::{json, Value};

    use super::*;

    fn check_token(headers: &HeaderMap) -> std::result::Result<(), StatusCode> {
        match headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok()) {
            Some("Token secret") => Ok(()),
            _ => Err(StatusCode::UNAUTHORIZED),
        }
    }

    async fn first_page(
        State(base): State<String>,
        headers: HeaderMap,
    ) -> std::result::Result<Json<Value>, StatusCode> {
        check_token(&headers)?;
        Ok(Json(json!({
            "next": format!("{base}/submissions/2"),
            "results": [
                {
                    "code": "A",
                    "title": "Scheduled",
                    "notes": "internal",
                    "reviews": [],
                    "slots": [{"start": "2025-11-01T09:07:00+01:00", "end": "2025-11-01T09:30:00+01:00", "room": {"id": 3}}],
                    "speakers": [{"code": "abc"}],
                },
                {"code": "B", "title": "Rejected", "slots": [], "speakers": []},
            ],
        })))
    }

    async fn second_page(headers: HeaderMap) -> std::result::Result<Json<Value>, StatusCode> {
        check_token(&headers)?;
        Ok(Json(json!({
            "next": null,
            "results": [
                {
                    "code": "C",
                    "title": "Sprint",
                    "slots": [{"start": "2025-10-30T14:00:00+01:00", "end": "2025-10-30T18:00:00+01:00", "room": {"id": 4}}],
                    "speakers": [{"code": "def"}],
                },
            ],
        })))
    }

    async fn rooms(headers: HeaderMap) -> std::result::Result<Json<Value>, StatusCode> {
        check_token(&headers)?;
        Ok(Json(json!({
            "next": null,
            "results": [
                {"id": 3, "name": {"en": "Room A"}},
                {"id": 4, "name": {"en": "Room B"}},
            ],
        })))
    }

    async fn endless(State(base): State<String>) -> Json<Value> {
        Json(json!({
            "next": format!("{base}/endless"),
            "results": [{"id": 1}],
        }))
    }

    /// Serve a fake API on a random local port and return its base URL.
    fn serve() -> String {
        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let app = Router::new()
            .route("/submissions/", get(first_page))
            .route("/submissions/2", get(second_page))
            .route("/rooms/", get(rooms))
            .route("/endless", get(endless))
            .with_state(base.clone());
        let server = axum::Server::from_tcp(listener)
            .unwrap()
            .serve(app.into_make_service());
        tokio::spawn(server);
        base
    }

    fn config(base: &str) -> Config {
        let mut config = Config::default();
        config.fetch.api_base = format!("{base}/");
        config
    }

    #[tokio::test]
    async fn test_talks_follows_pages_and_filters() {
        let base = serve();
        let client = PretalxClient::new("secret", 100);
        let talks = client.fetch_talks(&format!("{base}/submissions/")).await.unwrap();
        let codes: Vec<_> = talks.iter().filter_map(|talk| talk.code.as_deref()).collect();
        assert_eq!(codes, vec!["A", "C"]);
        assert!(!talks[0].fields.contains_key("notes"));
        assert!(!talks[0].fields.contains_key("reviews"));
    }

    #[tokio::test]
    async fn test_pagination_is_capped() {
        let base = serve();
        let client = PretalxClient::new("secret", 3);
        let rooms = client.fetch_rooms(&format!("{base}/endless")).await.unwrap();
        assert_eq!(rooms.len(), 3);
    }

    #[tokio::test]
    async fn test_http_errors_propagate() {
        let base = serve();
        let client = PretalxClient::new("wrong", 100);
        let err = client.fetch_rooms(&format!("{base}/rooms/")).await.unwrap_err();
        assert!(matches!(err, Error::Http(_)));
    }

    #[tokio::test]
    async fn test_get_builds_document() {
        let base = serve();
        let document = super::get(&config(&base), "secret").await.unwrap();
        let saturday = chrono::NaiveDate::from_ymd_opt(2025, 11, 1).unwrap();
        let thursday = chrono::NaiveDate::from_ymd_opt(2025, 10, 30).unwrap();
        assert_eq!(document.schedule[&saturday][&540][&3].title, "Scheduled");
        assert_eq!(document.sprints[&thursday][&840][&4].title, "Sprint");
        assert_eq!(
            document.speakers.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["abc", "def"]
        );
        assert_eq!(document.rooms[0].in_conferences, Some(true));
        assert_eq!(document.rooms[1].in_sprints, Some(true));
        assert_eq!(document.extra[&saturday][&510].id, "saturday-breakfast");
    }

    #[test]
    fn test_read_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.key");
        let err = read_token(&path).unwrap_err();
        assert!(matches!(err, Error::MissingToken(_)));
        assert!(err.to_string().contains("token.key"));
        std::fs::write(&path, "secret\n").unwrap();
        assert_eq!(read_token(&path).unwrap(), "secret");
    }
}
