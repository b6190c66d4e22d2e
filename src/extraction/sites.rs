//! Built-in job boards and the adapter registry
//!
//! A `Site` names its adapter through `AdapterKind`. The registry resolves
//! that binding once per site and hands out shared adapters.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalog::{Site, SiteId};
use crate::error::ConfigError;

use super::{ExtractionAdapter, SelectorAdapter, SiteSelectors};

/// Which extraction adapter a site uses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdapterKind {
    Linkedin,
    Indeed,
    RemoteOk,
    WeWorkRemotely,
    /// Any other board, described by the user's own selectors
    Custom { selectors: SiteSelectors },
}

impl AdapterKind {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Linkedin => "linkedin",
            Self::Indeed => "indeed",
            Self::RemoteOk => "remote_ok",
            Self::WeWorkRemotely => "we_work_remotely",
            Self::Custom { .. } => "custom",
        }
    }

    /// The selector table for this kind
    #[must_use]
    pub fn selectors(&self) -> SiteSelectors {
        match self {
            Self::Linkedin => linkedin(),
            Self::Indeed => indeed(),
            Self::RemoteOk => remote_ok(),
            Self::WeWorkRemotely => we_work_remotely(),
            Self::Custom { selectors } => selectors.clone(),
        }
    }

    /// # Errors
    ///
    /// `ConfigError::Invalid` if the selector table does not compile.
    pub fn build(&self) -> Result<Arc<dyn ExtractionAdapter>, ConfigError> {
        Ok(Arc::new(SelectorAdapter::new(self.label(), &self.selectors())?))
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

const CHALLENGE_SELECTORS: &[&str] = &[
    "#challenge-form",
    "#challenge-running",
    "div.cf-turnstile",
    "iframe[src*='hcaptcha.com']",
    "iframe[src*='recaptcha']",
];

const CHALLENGE_TITLES: &[&str] = &["just a moment", "attention required", "security check"];

fn linkedin() -> SiteSelectors {
    let mut blocked = strings(CHALLENGE_SELECTORS);
    blocked.push("form#captcha-internal".into());
    blocked.push("main.authwall-join-form".into());
    SiteSelectors {
        results: Some("ul.jobs-search__results-list".into()),
        posting: "ul.jobs-search__results-list > li".into(),
        title: "h3.base-search-card__title".into(),
        link: "a.base-card__full-link".into(),
        external_id_attr: None,
        external_id_pattern: Some(r"/jobs/view/(?:[^/?#]*-)?(\d+)".into()),
        company: Some("h4.base-search-card__subtitle".into()),
        company_logo: Some("img.artdeco-entity-image".into()),
        location: Some("span.job-search-card__location".into()),
        salary: Some("span.job-search-card__salary-info".into()),
        job_type: None,
        listed_at: Some("time".into()),
        // results load by infinite scroll
        next_page: None,
        blocked,
        blocked_title_markers: strings(&["security verification", "just a moment"]),
        detail_title: Some("h1.top-card-layout__title".into()),
        detail_company: Some("a.topcard__org-name-link".into()),
        detail_location: Some("span.topcard__flavor--bullet".into()),
        detail_salary: Some("div.salary.compensation__salary".into()),
        detail_job_type: Some("ul.description__job-criteria-list li:nth-child(2) span".into()),
        detail_description: Some("div.show-more-less-html__markup".into()),
    }
}

fn indeed() -> SiteSelectors {
    SiteSelectors {
        results: Some("#mosaic-provider-jobcards".into()),
        posting: "div.job_seen_beacon".into(),
        title: "h2.jobTitle span[title], h2.jobTitle span".into(),
        link: "h2.jobTitle a".into(),
        external_id_attr: Some("data-jk".into()),
        external_id_pattern: Some(r"[?&]jk=([0-9a-f]+)".into()),
        company: Some("[data-testid='company-name']".into()),
        company_logo: None,
        location: Some("[data-testid='text-location']".into()),
        salary: Some("div.salary-snippet-container".into()),
        job_type: Some("[data-testid='attribute_snippet_testid']".into()),
        listed_at: None,
        next_page: Some("a[data-testid='pagination-page-next']".into()),
        blocked: strings(CHALLENGE_SELECTORS),
        blocked_title_markers: strings(CHALLENGE_TITLES),
        detail_title: Some("h1.jobsearch-JobInfoHeader-title".into()),
        detail_company: Some("[data-testid='inlineHeader-companyName']".into()),
        detail_location: Some("[data-testid='inlineHeader-companyLocation']".into()),
        detail_salary: Some("#salaryInfoAndJobType span:first-child".into()),
        detail_job_type: Some("#salaryInfoAndJobType span:last-child".into()),
        detail_description: Some("#jobDescriptionText".into()),
    }
}

fn remote_ok() -> SiteSelectors {
    SiteSelectors {
        results: Some("table#jobsboard".into()),
        posting: "table#jobsboard tr.job".into(),
        title: "h2[itemprop='title']".into(),
        link: "a.preventLink[itemprop='url'], a.preventLink".into(),
        external_id_attr: Some("data-id".into()),
        external_id_pattern: Some(r"-(\d+)(?:[?#]|$)".into()),
        company: Some("h3[itemprop='name']".into()),
        company_logo: Some("img.logo".into()),
        location: Some("div.location".into()),
        salary: None,
        job_type: None,
        listed_at: Some("time".into()),
        next_page: None,
        blocked: strings(CHALLENGE_SELECTORS),
        blocked_title_markers: strings(CHALLENGE_TITLES),
        detail_title: Some("h1".into()),
        detail_company: Some("div.company_profile h2".into()),
        detail_location: None,
        detail_salary: None,
        detail_job_type: None,
        detail_description: Some("div.description div.markdown, div.description".into()),
    }
}

fn we_work_remotely() -> SiteSelectors {
    SiteSelectors {
        results: Some("section.jobs".into()),
        posting: "section.jobs li.new-listing-container, section.jobs li.feature".into(),
        title: "h4.new-listing__header__title, span.title".into(),
        link: "a[href^='/remote-jobs/']".into(),
        external_id_attr: None,
        external_id_pattern: Some(r"/remote-jobs/([^/?#]+)".into()),
        company: Some("p.new-listing__company-name, span.company".into()),
        company_logo: None,
        location: Some("p.new-listing__company-headquarters, span.region".into()),
        salary: None,
        job_type: Some("p.new-listing__categories__category, span.company:nth-of-type(2)".into()),
        listed_at: Some("time".into()),
        next_page: None,
        blocked: strings(CHALLENGE_SELECTORS),
        blocked_title_markers: strings(CHALLENGE_TITLES),
        detail_title: Some("div.lis-container__header__hero__company-info h1, div.listing-header-container h1".into()),
        detail_company: Some("div.lis-container__job__sidebar__companyDetails__info__title h3".into()),
        detail_location: None,
        detail_salary: None,
        detail_job_type: None,
        detail_description: Some("div.lis-container__job__content__description, div.listing-container".into()),
    }
}

/// Adapters keyed by site id
#[derive(Default, Clone)]
pub struct AdapterRegistry {
    adapters: HashMap<SiteId, Arc<dyn ExtractionAdapter>>,
}

impl AdapterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an adapter for every site. A site whose custom selectors fail to
    /// compile is left out and logged; its sources will report an error.
    #[must_use]
    pub fn from_sites(sites: &[Site]) -> Self {
        let mut registry = Self::new();
        for site in sites {
            match site.adapter.build() {
                Ok(adapter) => {
                    registry.adapters.insert(site.id, adapter);
                }
                Err(e) => {
                    log::warn!("No adapter for site {} ({}): {e}", site.id, site.name);
                }
            }
        }
        registry
    }

    /// Register or replace the adapter for a site
    pub fn register(&mut self, site_id: SiteId, adapter: Arc<dyn ExtractionAdapter>) {
        self.adapters.insert(site_id, adapter);
    }

    /// Copy every adapter of `other` over this registry's entries
    pub fn extend_from(&mut self, other: &AdapterRegistry) {
        for (site_id, adapter) in &other.adapters {
            self.adapters.insert(*site_id, Arc::clone(adapter));
        }
    }

    #[must_use]
    pub fn get(&self, site_id: SiteId) -> Option<Arc<dyn ExtractionAdapter>> {
        self.adapters.get(&site_id).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("sites", &self.adapters.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::PageContent;

    #[test]
    fn test_builtin_selectors_compile() {
        for kind in [
            AdapterKind::Linkedin,
            AdapterKind::Indeed,
            AdapterKind::RemoteOk,
            AdapterKind::WeWorkRemotely,
        ] {
            assert!(kind.build().is_ok(), "{} selectors must compile", kind.label());
        }
    }

    #[test]
    fn test_linkedin_ids_from_url() {
        let adapter = AdapterKind::Linkedin.build().unwrap();
        let html = r#"
            <ul class="jobs-search__results-list">
              <li><div class="base-card">
                <a class="base-card__full-link" href="https://www.linkedin.com/jobs/view/rust-engineer-at-acme-3812345678?refId=x"></a>
                <h3 class="base-search-card__title">Rust Engineer</h3>
                <h4 class="base-search-card__subtitle">Acme</h4>
                <span class="job-search-card__location">Berlin</span>
                <time datetime="2024-04-30">1 day ago</time>
              </div></li>
            </ul>"#;
        let page = PageContent::new("https://www.linkedin.com/jobs/search?keywords=rust", html);
        let postings: Vec<_> = adapter.extract(&page).collect();
        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].external_id, "3812345678");
        assert_eq!(postings[0].location.as_deref(), Some("Berlin"));
    }

    #[test]
    fn test_adapter_kind_wire_format() {
        let json = serde_json::to_value(&AdapterKind::RemoteOk).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "remote_ok"}));
    }

    #[test]
    fn test_registry_skips_broken_custom_site() {
        let broken = Site {
            id: 9,
            name: "Broken".into(),
            logo_url: None,
            adapter: AdapterKind::Custom {
                selectors: SiteSelectors {
                    posting: ":::".into(),
                    ..SiteSelectors::default()
                },
            },
        };
        let ok = Site {
            id: 1,
            name: "Indeed".into(),
            logo_url: None,
            adapter: AdapterKind::Indeed,
        };
        let registry = AdapterRegistry::from_sites(&[broken, ok]);
        assert_eq!(registry.len(), 1);
        assert!(registry.get(1).is_some());
        assert!(registry.get(9).is_none());
    }
}
