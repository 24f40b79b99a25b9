//! Grid planning.
//!
//! Turns the candidate weapon list into an ordered per-weapon plan, using a
//! prior result table to tell satisfied (weapon, refine) pairs from missing
//! ones. Planning is a pure function of its inputs.

use tracing::debug;

use crate::catalog::WeaponCatalog;
use crate::eligibility::SourcePolicy;
use crate::error::DataError;
use crate::result::{ResultKey, ResultTable};
use crate::selection::WeaponSelection;
use crate::sources::AcquisitionSources;

/// Refines to run for one weapon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeaponPlan {
    pub weapon: String,
    /// Unsatisfied refines first (ascending), then satisfied ones.
    pub refines: Vec<u8>,
    /// At least one refine lacks a result in some variant.
    pub missing: bool,
}

/// Static inputs shared by every planning call.
#[derive(Debug, Clone, Copy)]
pub struct PlanContext<'a> {
    pub catalog: &'a WeaponCatalog,
    pub sources: &'a AcquisitionSources,
    pub policy: &'a SourcePolicy,
    pub selection: &'a WeaponSelection,
}

/// A (weapon, refine) is satisfied only if every variant has a base result.
#[must_use]
pub fn is_satisfied(base: Option<&ResultTable>, key: &ResultKey, variant_order: &[String]) -> bool {
    base.is_some_and(|b| b.has_all_variants(key, variant_order))
}

/// Builds the ordered plan.
///
/// With `skip_existing` only unsatisfied refines are kept; otherwise
/// satisfied refines are re-run after the unsatisfied ones. Weapons left
/// with nothing to run are dropped. Weapons with missing refines move ahead
/// of fully satisfied ones; relative order is otherwise preserved.
pub fn build_plan(
    ctx: &PlanContext<'_>,
    variant_order: &[String],
    base: Option<&ResultTable>,
    skip_existing: bool,
) -> Result<Vec<WeaponPlan>, DataError> {
    let mut missing_plans = Vec::new();
    let mut complete_plans = Vec::new();

    for key in &ctx.selection.weapons {
        let weapon = ctx.catalog.get(key).ok_or_else(|| DataError::WeaponNotInCatalog {
            weapon: key.clone(),
        })?;
        let refines = ctx
            .selection
            .refines_for(weapon, ctx.sources.get(key), ctx.policy);

        let (satisfied, unsatisfied): (Vec<u8>, Vec<u8>) = refines
            .iter()
            .partition(|r| is_satisfied(base, &ResultKey::new(key.as_str(), **r), variant_order));

        let missing = !unsatisfied.is_empty();
        let mut to_run = unsatisfied;
        if !skip_existing {
            to_run.extend(satisfied);
        }
        if to_run.is_empty() {
            continue;
        }

        let plan = WeaponPlan {
            weapon: key.clone(),
            refines: to_run,
            missing,
        };
        if missing {
            missing_plans.push(plan);
        } else {
            complete_plans.push(plan);
        }
    }

    debug!(
        missing = missing_plans.len(),
        complete = complete_plans.len(),
        skip_existing,
        "plan built"
    );
    missing_plans.extend(complete_plans);
    Ok(missing_plans)
}

/// Simulations the plan will perform.
#[must_use]
pub fn plan_cell_count(plan: &[WeaponPlan], combo_count: usize, variant_count: usize) -> usize {
    plan.iter().map(|p| p.refines.len()).sum::<usize>() * combo_count * variant_count.max(1)
}
