//! Transfer sizes from Resource Timing entries, per resource category.
//!
//! See <https://www.w3.org/TR/resource-timing-2/>.

use super::{Metric, Report};
use crate::analysis::stats::{diff_stdev, stats};
use crate::models::{CombinedSeries, Stats};
use anyhow::Context;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Html,
    Css,
    Js,
    Img,
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Entry {
    name: String,
    #[serde(default)]
    initiator_type: String,
    #[serde(default)]
    transfer_size: f64,
}

/// Path component of an entry URL. Unparseable names are used as-is.
fn pathname(name: &str) -> String {
    match url::Url::parse(name) {
        Ok(url) => url.path().to_string(),
        Err(_) => name.split(['?', '#']).next().unwrap_or_default().to_string(),
    }
}

/// Sorts resource entries into categories.
pub struct Classifier {
    image: Regex,
    font: Regex,
}

impl Classifier {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            image: Regex::new(r"\.(?:jpeg|jpg|gif|png|svg)$")?,
            font: Regex::new(r"\.(?:woff2|woff|ttf)$")?,
        })
    }

    /// Category of a resource, from what requested it and its path.
    pub fn classify(&self, initiator_type: &str, url: &str) -> Category {
        let path = pathname(url);
        match initiator_type {
            "navigation" => Category::Html,
            // A <link> element or Link header: stylesheet, or preloaded image.
            "link" if self.image.is_match(&path) => Category::Img,
            "link" => Category::Css,
            "script" => Category::Js,
            "img" => Category::Img,
            // Requested by a stylesheet: import, background image or font.
            "css" if self.image.is_match(&path) => Category::Img,
            "css" if self.font.is_match(&path) => Category::Other,
            "css" => Category::Css,
            _ => Category::Other,
        }
    }

    /// Sum of transfer sizes in one run, optionally limited to a category.
    fn run_size(&self, entries: &Value, category: Option<Category>) -> anyhow::Result<f64> {
        let entries: Vec<Entry> =
            serde_json::from_value(entries.clone()).context("Malformed transfer entries")?;
        Ok(entries
            .iter()
            .filter(|entry| {
                category.map_or(true, |c| self.classify(&entry.initiator_type, &entry.name) == c)
            })
            .map(|entry| entry.transfer_size)
            .sum())
    }
}

fn sizes(series: &CombinedSeries, category: Option<Category>) -> anyhow::Result<Stats> {
    let classifier = Classifier::new()?;
    let sizes = series
        .values("transfer", "entries")?
        .iter()
        .map(|entries| classifier.run_size(entries, category))
        .collect::<anyhow::Result<Vec<f64>>>()?;
    Ok(stats(&sizes))
}

fn size_metric(caption: &str, category: Option<Category>) -> Metric {
    Metric::new(caption, "B")
        .analyse(move |series| sizes(series, category))
        .compare(diff_stdev)
}

pub fn report() -> Report {
    Report::new(["transfer"])
        .metric(
            "pageWeight",
            size_metric("Total size of all transfers during page load", None).threshold(1.0),
        )
        .metric(
            "html",
            size_metric("Transfer size of HTML document", Some(Category::Html)),
        )
        .metric(
            "css",
            size_metric("Transfer size of CSS resources", Some(Category::Css)).threshold(1.0),
        )
        .metric(
            "js",
            size_metric("Transfer size of JavaScript resources", Some(Category::Js)),
        )
        .metric(
            "img",
            size_metric("Transfer size of images", Some(Category::Img)),
        )
        .metric(
            "other",
            size_metric("Transfer size of other resources", Some(Category::Other)),
        )
}
