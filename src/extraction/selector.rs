//! Selector-driven extraction adapter
//!
//! Every built-in site is described by a `SiteSelectors` table of CSS
//! selectors; `SelectorAdapter` compiles the table once and applies it to
//! rendered pages. Custom sites supply their own table.

use std::sync::{Arc, LazyLock};

use chrono::{DateTime, NaiveDate, Utc};
use ego_tree::NodeId;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::utils::resolve_href;

use super::{CandidatePosting, ExtractionAdapter, JobDetail, PageContent};

static TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("title").expect("BUG: hardcoded CSS selector 'title' is invalid")
});

/// CSS selectors describing one job board's markup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSelectors {
    /// Container of the result list. When set and missing from a page that
    /// is not blocked, the page is reported as an extraction anomaly.
    pub results: Option<String>,
    /// One element per posting
    pub posting: String,
    /// Within a posting
    pub title: String,
    /// Within a posting: the anchor pointing at the job
    pub link: String,
    /// Attribute carrying the site's job id, read from the link element and
    /// then from the posting element
    pub external_id_attr: Option<String>,
    /// Regex with one capture group applied to the job URL when no attribute
    /// id is present
    pub external_id_pattern: Option<String>,
    pub company: Option<String>,
    /// `img` element; `src` or `data-delayed-url` is used
    pub company_logo: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub job_type: Option<String>,
    /// Element with a `datetime` attribute or an ISO date as text
    pub listed_at: Option<String>,
    pub next_page: Option<String>,
    /// Presence of any of these marks an anti-bot interstitial
    pub blocked: Vec<String>,
    /// Case-insensitive substrings of `<title>` that mark an interstitial
    pub blocked_title_markers: Vec<String>,
    pub detail_title: Option<String>,
    pub detail_company: Option<String>,
    pub detail_location: Option<String>,
    pub detail_salary: Option<String>,
    pub detail_job_type: Option<String>,
    pub detail_description: Option<String>,
}

/// `SiteSelectors` with every selector parsed
#[derive(Debug)]
pub(crate) struct CompiledSelectors {
    results: Option<Selector>,
    posting: Selector,
    title: Selector,
    link: Selector,
    external_id_attr: Option<String>,
    external_id_pattern: Option<Regex>,
    company: Option<Selector>,
    company_logo: Option<Selector>,
    location: Option<Selector>,
    salary: Option<Selector>,
    job_type: Option<Selector>,
    listed_at: Option<Selector>,
    next_page: Option<Selector>,
    blocked: Vec<Selector>,
    blocked_title_markers: Vec<String>,
    detail_title: Option<Selector>,
    detail_company: Option<Selector>,
    detail_location: Option<Selector>,
    detail_salary: Option<Selector>,
    detail_job_type: Option<Selector>,
    detail_description: Option<Selector>,
}

fn parse_selector(field: &'static str, raw: &str) -> Result<Selector, ConfigError> {
    Selector::parse(raw).map_err(|e| ConfigError::Invalid {
        field,
        reason: format!("invalid CSS selector '{raw}': {e}"),
    })
}

fn parse_optional(field: &'static str, raw: Option<&String>) -> Result<Option<Selector>, ConfigError> {
    raw.map(|s| parse_selector(field, s)).transpose()
}

impl SiteSelectors {
    pub(crate) fn compile(&self) -> Result<CompiledSelectors, ConfigError> {
        let external_id_pattern = self
            .external_id_pattern
            .as_deref()
            .map(|p| {
                Regex::new(p).map_err(|e| ConfigError::Invalid {
                    field: "external_id_pattern",
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        Ok(CompiledSelectors {
            results: parse_optional("results", self.results.as_ref())?,
            posting: parse_selector("posting", &self.posting)?,
            title: parse_selector("title", &self.title)?,
            link: parse_selector("link", &self.link)?,
            external_id_attr: self.external_id_attr.clone(),
            external_id_pattern,
            company: parse_optional("company", self.company.as_ref())?,
            company_logo: parse_optional("company_logo", self.company_logo.as_ref())?,
            location: parse_optional("location", self.location.as_ref())?,
            salary: parse_optional("salary", self.salary.as_ref())?,
            job_type: parse_optional("job_type", self.job_type.as_ref())?,
            listed_at: parse_optional("listed_at", self.listed_at.as_ref())?,
            next_page: parse_optional("next_page", self.next_page.as_ref())?,
            blocked: self
                .blocked
                .iter()
                .map(|s| parse_selector("blocked", s))
                .collect::<Result<_, _>>()?,
            blocked_title_markers: self
                .blocked_title_markers
                .iter()
                .map(|m| m.to_lowercase())
                .collect(),
            detail_title: parse_optional("detail_title", self.detail_title.as_ref())?,
            detail_company: parse_optional("detail_company", self.detail_company.as_ref())?,
            detail_location: parse_optional("detail_location", self.detail_location.as_ref())?,
            detail_salary: parse_optional("detail_salary", self.detail_salary.as_ref())?,
            detail_job_type: parse_optional("detail_job_type", self.detail_job_type.as_ref())?,
            detail_description: parse_optional(
                "detail_description",
                self.detail_description.as_ref(),
            )?,
        })
    }
}

/// Collapse runs of whitespace; empty text becomes `None`
fn normalized_text(el: ElementRef<'_>) -> Option<String> {
    let text = el.text().collect::<Vec<_>>().join(" ");
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() { None } else { Some(text) }
}

fn first_text(scope: ElementRef<'_>, sel: Option<&Selector>) -> Option<String> {
    scope.select(sel?).find_map(normalized_text)
}

fn first_doc_text(doc: &Html, sel: Option<&Selector>) -> Option<String> {
    doc.select(sel?).find_map(normalized_text)
}

/// Absolute dates only: RFC 3339 timestamps or `YYYY-MM-DD`
fn parse_listed_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Job URL without query or fragment, used as id of last resort
fn canonical_url(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_query(None);
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => url.to_string(),
    }
}

impl CompiledSelectors {
    fn read_posting(&self, el: ElementRef<'_>, base_url: &str) -> Option<CandidatePosting> {
        let title = first_text(el, Some(&self.title))?;
        let link = el.select(&self.link).next()?;
        let external_url = resolve_href(base_url, link.value().attr("href")?)?;

        let external_id = self
            .external_id_attr
            .as_deref()
            .and_then(|attr| {
                link.value()
                    .attr(attr)
                    .or_else(|| el.value().attr(attr))
            })
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .or_else(|| {
                self.external_id_pattern
                    .as_ref()
                    .and_then(|re| re.captures(&external_url))
                    .and_then(|caps| caps.get(1))
                    .map(|m| m.as_str().to_string())
            })
            .unwrap_or_else(|| canonical_url(&external_url));

        let company_logo = self
            .company_logo
            .as_ref()
            .and_then(|sel| el.select(sel).next())
            .and_then(|img| {
                img.value()
                    .attr("src")
                    .or_else(|| img.value().attr("data-delayed-url"))
            })
            .and_then(|src| resolve_href(base_url, src));

        let listed_at = self
            .listed_at
            .as_ref()
            .and_then(|sel| el.select(sel).next())
            .and_then(|t| {
                t.value()
                    .attr("datetime")
                    .map(str::to_string)
                    .or_else(|| normalized_text(t))
            })
            .and_then(|raw| parse_listed_date(&raw));

        Some(CandidatePosting {
            external_id,
            title,
            company_name: first_text(el, self.company.as_ref()),
            company_logo,
            location: first_text(el, self.location.as_ref()),
            salary: first_text(el, self.salary.as_ref()),
            job_type: first_text(el, self.job_type.as_ref()),
            external_url,
            listed_at,
            source_updated_at: None,
            description: None,
        })
    }
}

/// Lazy, one-pass sequence of postings on a results page
///
/// Owns the parsed document, so it is not `Send`; drain it before awaiting.
pub struct Postings {
    cursor: Option<Cursor>,
    anomaly: Option<String>,
    skipped: usize,
}

struct Cursor {
    doc: Html,
    nodes: std::vec::IntoIter<NodeId>,
    rules: Arc<CompiledSelectors>,
    base_url: String,
}

impl Postings {
    /// Empty sequence for a page whose structure was not recognized
    #[must_use]
    pub fn anomalous(detail: impl Into<String>) -> Self {
        Self {
            cursor: None,
            anomaly: Some(detail.into()),
            skipped: 0,
        }
    }

    /// What was unexpected about the page, if anything
    #[must_use]
    pub fn anomaly(&self) -> Option<&str> {
        self.anomaly.as_deref()
    }

    /// Posting elements seen so far that lacked a title or link
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl Iterator for Postings {
    type Item = CandidatePosting;

    fn next(&mut self) -> Option<Self::Item> {
        let cursor = self.cursor.as_mut()?;
        loop {
            let id = cursor.nodes.next()?;
            let Some(el) = cursor.doc.tree.get(id).and_then(ElementRef::wrap) else {
                continue;
            };
            match cursor.rules.read_posting(el, &cursor.base_url) {
                Some(posting) => return Some(posting),
                None => self.skipped += 1,
            }
        }
    }
}

/// Adapter driven entirely by a `SiteSelectors` table
#[derive(Debug, Clone)]
pub struct SelectorAdapter {
    name: String,
    rules: Arc<CompiledSelectors>,
}

impl SelectorAdapter {
    /// # Errors
    ///
    /// `ConfigError::Invalid` when a selector or the id pattern does not parse.
    pub fn new(name: impl Into<String>, selectors: &SiteSelectors) -> Result<Self, ConfigError> {
        Ok(Self {
            name: name.into(),
            rules: Arc::new(selectors.compile()?),
        })
    }

    fn blocked_in(&self, doc: &Html) -> bool {
        if self.rules.blocked.iter().any(|sel| doc.select(sel).next().is_some()) {
            return true;
        }
        if self.rules.blocked_title_markers.is_empty() {
            return false;
        }
        let Some(title) = first_doc_text(doc, Some(&TITLE_SELECTOR)) else {
            return false;
        };
        let title = title.to_lowercase();
        self.rules
            .blocked_title_markers
            .iter()
            .any(|marker| title.contains(marker))
    }
}

impl ExtractionAdapter for SelectorAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_blocked(&self, page: &PageContent) -> bool {
        let doc = Html::parse_document(&page.html);
        self.blocked_in(&doc)
    }

    fn extract(&self, page: &PageContent) -> Postings {
        let doc = Html::parse_document(&page.html);

        if let Some(results) = &self.rules.results
            && doc.select(results).next().is_none()
        {
            let detail = format!("{}: result list not found", self.name);
            log::debug!("Extraction anomaly on {}: {detail}", page.url);
            return Postings::anomalous(detail);
        }

        let nodes: Vec<NodeId> = doc.select(&self.rules.posting).map(|el| el.id()).collect();
        if nodes.is_empty() && self.rules.results.is_none() {
            let detail = format!("{}: no posting elements", self.name);
            log::debug!("Extraction anomaly on {}: {detail}", page.url);
            return Postings::anomalous(detail);
        }

        Postings {
            cursor: Some(Cursor {
                doc,
                nodes: nodes.into_iter(),
                rules: Arc::clone(&self.rules),
                base_url: page.url.clone(),
            }),
            anomaly: None,
            skipped: 0,
        }
    }

    fn next_page_url(&self, page: &PageContent) -> Option<String> {
        let sel = self.rules.next_page.as_ref()?;
        let doc = Html::parse_document(&page.html);
        let href = doc.select(sel).find_map(|a| a.value().attr("href"))?;
        let next = resolve_href(&page.url, href)?;
        // a "next" link pointing back at the current page ends pagination
        (next != page.url).then_some(next)
    }

    fn extract_detail(&self, page: &PageContent) -> Option<JobDetail> {
        let doc = Html::parse_document(&page.html);
        let rules = &self.rules;
        let detail = JobDetail {
            title: first_doc_text(&doc, rules.detail_title.as_ref()),
            company_name: first_doc_text(&doc, rules.detail_company.as_ref()),
            location: first_doc_text(&doc, rules.detail_location.as_ref()),
            salary: first_doc_text(&doc, rules.detail_salary.as_ref()),
            job_type: first_doc_text(&doc, rules.detail_job_type.as_ref()),
            description: first_doc_text(&doc, rules.detail_description.as_ref()),
        };
        if detail.is_empty() {
            log::debug!("No job detail recognized on {}", page.url);
            None
        } else {
            Some(detail)
        }
    }
}
