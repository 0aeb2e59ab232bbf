//! Static export of every route of the site.

use std::{
    fs::{copy, create_dir_all, read_dir, write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::{info, warn};

use crate::site::{Page, Site};

/// One URL of the site and what it renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub path: String,
    pub lang: String,
    pub page: Page,
}

/// List every URL the site serves, static files excluded.
pub fn targets(site: &Site) -> Result<Vec<Target>> {
    let default = &site.config.default_language;
    let index = Page::Named("index".to_string());
    let mut targets = vec![
        Target {
            path: "/".to_string(),
            lang: default.clone(),
            page: index.clone(),
        },
        Target {
            path: format!("/{}/", site.year),
            lang: default.clone(),
            page: index,
        },
    ];
    for lang in &site.config.languages {
        let mut pages: Vec<Page> = site
            .page_names(lang)?
            .into_iter()
            .map(Page::Named)
            .collect();
        pages.extend(site.categories.keys().cloned().map(Page::Talks));
        pages.extend([Page::Schedule, Page::Calendar]);
        if site.config.pdf_command.is_empty() {
            warn!("no PDF converter configured, skipping the PDF schedule");
        } else {
            pages.push(Page::SchedulePdf);
        }
        targets.extend(pages.into_iter().map(|page| Target {
            path: page.path(site.year, lang),
            lang: lang.clone(),
            page,
        }));
    }
    Ok(targets)
}

/// The file a URL path is written to.
pub fn file_path(output: &Path, path: &str) -> PathBuf {
    let mut file = output.join(path.trim_start_matches('/'));
    if path.ends_with('/') {
        file.push("index.html");
    }
    file
}

/// Render every route and copy the static files into `output`.
///
/// Returns the number of written pages. The first failure aborts the export.
pub async fn freeze(site: &Site, output: &Path) -> Result<usize> {
    let targets = targets(site)?;
    for target in &targets {
        let rendered = site
            .render(&target.lang, &target.page)
            .await
            .with_context(|| format!("cannot render {}", target.path))?;
        let file = file_path(output, &target.path);
        if let Some(parent) = file.parent() {
            create_dir_all(parent)?;
        }
        write(&file, rendered.body)?;
        info!("{} -> {}", target.path, file.display());
    }
    let static_output = output.join(site.year.to_string()).join("static");
    copy_dir(&site.config.static_dir, &static_output)
        .with_context(|| format!("cannot copy {}", site.config.static_dir.display()))?;
    Ok(targets.len())
}

fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    create_dir_all(to)?;
    for entry in read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else {
            copy(entry.path(), target)?;
        }
    }
    Ok(())
}
