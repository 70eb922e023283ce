//! Dashboard figures derived from the requirement list

use crate::models::{Requirement, RequirementStatus};

/// Number of requirements in each status, in workflow order
pub fn status_counts(requirements: &[Requirement]) -> Vec<(RequirementStatus, usize)> {
    RequirementStatus::ALL
        .into_iter()
        .map(|status| {
            let count = requirements.iter().filter(|r| r.status == status).count();
            (status, count)
        })
        .collect()
}

/// Requirements waiting for a reviewer
pub fn pending_review(requirements: &[Requirement]) -> usize {
    requirements
        .iter()
        .filter(|r| r.status == RequirementStatus::Review)
        .count()
}
