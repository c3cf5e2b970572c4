//! Which policies the policy list may offer.

use std::collections::HashSet;

use crate::iam::PolicyRef;

/// Computes the offerable policies for a principal.
///
/// `all_policies` is every known managed policy, account-local entries
/// first. For attach, policies already attached (by name) are removed. For
/// detach, only attached policies remain and the principal's inline policies
/// are listed ahead of them. Duplicate names keep their first occurrence, so
/// the output order follows the input order.
pub fn offerable(
    all_policies: &[PolicyRef],
    attached_names: &[String],
    inline_names: &[String],
    for_attach: bool,
) -> Vec<PolicyRef> {
    let attached: HashSet<&str> = attached_names.iter().map(String::as_str).collect();
    let mut seen: HashSet<String> = HashSet::new();
    let mut offered = Vec::new();

    if !for_attach {
        for name in inline_names {
            if seen.insert(name.clone()) {
                offered.push(PolicyRef::inline(name.clone()));
            }
        }
    }

    for policy in all_policies {
        if attached.contains(policy.name.as_str()) == for_attach {
            continue;
        }
        if seen.insert(policy.name.clone()) {
            offered.push(policy.clone());
        }
    }

    offered
}
