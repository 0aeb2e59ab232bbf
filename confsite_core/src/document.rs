//! Writing and reading the schedule document.

use std::{
    fs::{read_to_string, write},
    path::Path,
};

use serde_json::{Map, Value};

use crate::{error::Result, model::Extra, schedule::Normalized};

pub use crate::model::ScheduleDocument;

/// Replace a URL prefix in every string of a JSON document.
#[derive(Debug, Clone)]
pub struct UrlRewrite {
    from: String,
    to: String,
}

impl UrlRewrite {
    pub fn new(from: &str, to: &str) -> Self {
        UrlRewrite {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Rewrite string values and object keys, at any depth.
    pub fn apply(&self, value: &mut Value) {
        if self.from.is_empty() {
            return;
        }
        match value {
            Value::String(text) => {
                if text.contains(&self.from) {
                    *text = text.replace(&self.from, &self.to);
                }
            }
            Value::Array(values) => values.iter_mut().for_each(|value| self.apply(value)),
            Value::Object(map) => {
                let rewritten: Map<String, Value> = std::mem::take(map)
                    .into_iter()
                    .map(|(key, mut value)| {
                        self.apply(&mut value);
                        (key.replace(&self.from, &self.to), value)
                    })
                    .collect();
                *map = rewritten;
            }
            Value::Null | Value::Bool(_) | Value::Number(_) => {}
        }
    }
}

impl ScheduleDocument {
    pub fn new(normalized: Normalized, extra: Extra) -> Self {
        ScheduleDocument {
            schedule: normalized.schedule,
            sprints: normalized.sprints,
            rooms: normalized.rooms,
            extra,
            speakers: normalized.speakers,
        }
    }

    /// Serialize the document with the URL rewrite applied everywhere, free text included.
    pub fn to_json(&self, rewrite: &UrlRewrite) -> Result<String> {
        let mut value = serde_json::to_value(self)?;
        rewrite.apply(&mut value);
        Ok(serde_json::to_string(&value)?)
    }

    /// Write the whole document in a single call.
    pub fn write(&self, path: &Path, rewrite: &UrlRewrite) -> Result<()> {
        write(path, self.to_json(rewrite)?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<ScheduleDocument> {
        Ok(serde_json::from_str(&read_to_string(path)?)?)
    }
}
