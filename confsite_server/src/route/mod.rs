pub mod calendar;

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use log::error;
use tower_http::services::ServeDir;

use crate::site::{Page, Rendered, Site};

/// Build the routes of the site.
pub fn router(site: Arc<Site>) -> Router {
    let year = site.year;
    let static_files = ServeDir::new(&site.config.static_dir);
    Router::new()
        .route("/", get(index))
        .route(&format!("/{year}/"), get(index))
        .route(&format!("/{year}/:lang/"), get(localized_index))
        .route(&format!("/{year}/:lang/:file"), get(page))
        .route(&format!("/{year}/:lang/talks/:file"), get(talks))
        .nest_service(&format!("/{year}/static"), static_files)
        .with_state(site)
}

impl IntoResponse for Rendered {
    fn into_response(self) -> Response {
        ([(CONTENT_TYPE, self.content_type)], self.body).into_response()
    }
}

async fn handle(site: &Site, lang: &str, page: &Page) -> Result<Response, (StatusCode, String)> {
    let rendered = site.render(lang, page).await.map_err(|err| {
        error!("cannot render {}: {err:#}", page.path(site.year, lang));
        (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    })?;
    Ok(rendered.into_response())
}

/// Handle the root URLs, in the default language.
pub async fn index(State(site): State<Arc<Site>>) -> Result<Response, (StatusCode, String)> {
    let lang = site.config.default_language.clone();
    handle(&site, &lang, &Page::Named("index".to_string())).await
}

pub async fn localized_index(
    State(site): State<Arc<Site>>,
    Path(lang): Path<String>,
) -> Result<Response, (StatusCode, String)> {
    handle(&site, &lang, &Page::Named("index".to_string())).await
}

/// Handle `/{year}/{lang}/{file}`: simple pages, full schedule, PDF and calendar.
pub async fn page(
    State(site): State<Arc<Site>>,
    Path((lang, file)): Path<(String, String)>,
) -> Result<Response, (StatusCode, String)> {
    let page = Page::from_file(&file).ok_or_else(|| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("unknown page {file:?}"),
        )
    })?;
    handle(&site, &lang, &page).await
}

pub async fn talks(
    State(site): State<Arc<Site>>,
    Path((lang, file)): Path<(String, String)>,
) -> Result<Response, (StatusCode, String)> {
    let category = file.strip_suffix(".html").unwrap_or(&file).to_string();
    handle(&site, &lang, &Page::Talks(category)).await
}
