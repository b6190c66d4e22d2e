//! Field-level comparison between stored jobs and fresh observations
//!
//! An absent incoming value never counts as a change: a results page that
//! omits the salary must not erase the salary read from the detail page.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::catalog::{Job, JobStatus};
use crate::extraction::{CandidatePosting, JobDetail};

use super::LinkContext;

fn merge_field<T: PartialEq + Clone>(slot: &mut Option<T>, incoming: Option<&T>) -> bool {
    match incoming {
        Some(value) if slot.as_ref() != Some(value) => {
            *slot = Some(value.clone());
            true
        }
        _ => false,
    }
}

fn merge_title(slot: &mut String, incoming: Option<&String>) -> bool {
    match incoming {
        Some(title) if !title.is_empty() && slot != title => {
            slot.clone_from(title);
            true
        }
        _ => false,
    }
}

/// A brand new job for an unseen candidate
pub(crate) fn new_job(candidate: &CandidatePosting, ctx: &LinkContext, now: DateTime<Utc>) -> Job {
    Job {
        id: Uuid::new_v4(),
        link_id: ctx.link_id,
        site_id: ctx.site_id,
        external_id: candidate.external_id.clone(),
        external_url: candidate.external_url.clone(),
        title: candidate.title.clone(),
        company_name: candidate.company_name.clone(),
        company_logo: candidate.company_logo.clone(),
        location: candidate.location.clone(),
        salary: candidate.salary.clone(),
        job_type: candidate.job_type.clone(),
        status: JobStatus::New,
        labels: Vec::new(),
        listed_at: candidate.listed_at,
        source_updated_at: candidate.source_updated_at,
        description: candidate.description.clone(),
        created_at: now,
        updated_at: now,
    }
}

/// The updated job if `candidate` changes any mutable field, else `None`.
/// Status and labels are never touched.
pub(crate) fn apply_candidate(
    existing: &Job,
    candidate: &CandidatePosting,
    now: DateTime<Utc>,
) -> Option<Job> {
    let mut next = existing.clone();
    let mut changed = merge_title(&mut next.title, Some(&candidate.title));
    changed |= merge_field(&mut next.company_name, candidate.company_name.as_ref());
    changed |= merge_field(&mut next.location, candidate.location.as_ref());
    changed |= merge_field(&mut next.salary, candidate.salary.as_ref());
    changed |= merge_field(&mut next.job_type, candidate.job_type.as_ref());
    changed |= merge_field(&mut next.description, candidate.description.as_ref());
    changed |= merge_field(&mut next.listed_at, candidate.listed_at.as_ref());
    changed |= merge_field(&mut next.source_updated_at, candidate.source_updated_at.as_ref());
    // logo URLs are often signed per request; only fill a missing one
    if next.company_logo.is_none() {
        changed |= merge_field(&mut next.company_logo, candidate.company_logo.as_ref());
    }

    if changed {
        next.updated_at = now;
        Some(next)
    } else {
        None
    }
}

/// Fold a second copy of the same posting from one batch into the first,
/// with the same precedence a later scan would get
pub(crate) fn absorb_duplicate(first: &mut CandidatePosting, later: &CandidatePosting) {
    merge_title(&mut first.title, Some(&later.title));
    merge_field(&mut first.company_name, later.company_name.as_ref());
    merge_field(&mut first.location, later.location.as_ref());
    merge_field(&mut first.salary, later.salary.as_ref());
    merge_field(&mut first.job_type, later.job_type.as_ref());
    merge_field(&mut first.description, later.description.as_ref());
    merge_field(&mut first.listed_at, later.listed_at.as_ref());
    merge_field(&mut first.source_updated_at, later.source_updated_at.as_ref());
    if first.company_logo.is_none() {
        merge_field(&mut first.company_logo, later.company_logo.as_ref());
    }
}

/// The updated job if the detail page adds or changes anything
pub(crate) fn apply_detail(existing: &Job, detail: &JobDetail, now: DateTime<Utc>) -> Option<Job> {
    let mut next = existing.clone();
    let mut changed = merge_title(&mut next.title, detail.title.as_ref());
    changed |= merge_field(&mut next.company_name, detail.company_name.as_ref());
    changed |= merge_field(&mut next.location, detail.location.as_ref());
    changed |= merge_field(&mut next.salary, detail.salary.as_ref());
    changed |= merge_field(&mut next.job_type, detail.job_type.as_ref());
    changed |= merge_field(&mut next.description, detail.description.as_ref());

    if changed {
        next.updated_at = now;
        Some(next)
    } else {
        None
    }
}
