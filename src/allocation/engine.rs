use tracing::{debug, warn};

use crate::{
    errors::{PlannerError, Result},
    planner::{
        find_overruns, label_after, round2, MonthCalendar, PlanDocument, ScopeItem, Settings,
        Toggles, MAX_PROJECT_WEEKS,
    },
};

use super::types::{
    AllocationReport, CashFlowTotals, Confirmation, DepositPosition, MonthCashRow, Outcome,
    RowKind, WeekMismatch, HOLDBACK_RELEASE_DELAY_MONTHS, HOLDBACK_RELEASE_LABEL,
};

/// Share of a month's pre-tax amount below which the remaining credit headroom
/// counts as nearing the deposit floor.
const NEARING_FLOOR_RATIO: f64 = 0.1;
const DRIFT_THRESHOLD: f64 = 0.01;

pub struct AllocationEngine;

impl AllocationEngine {
    /// Computes the weekly allocation and the monthly cash-flow table.
    ///
    /// Overruns and a calendar/project week mismatch are reported on the result,
    /// never corrected here.
    pub fn allocate(
        settings: &Settings,
        months: &MonthCalendar,
        scope: &[ScopeItem],
        toggles: &Toggles,
    ) -> Result<AllocationReport> {
        if settings.project_weeks < 1 {
            return Err(PlannerError::InvalidInput(
                "project length must be at least one week".into(),
            ));
        }
        if settings.project_weeks > MAX_PROJECT_WEEKS {
            return Err(PlannerError::InvalidInput(format!(
                "project length must not exceed {MAX_PROJECT_WEEKS} weeks"
            )));
        }
        let project_weeks = settings.project_weeks;

        let overruns = find_overruns(scope, project_weeks);
        if !overruns.is_empty() {
            warn!(
                count = overruns.len(),
                project_weeks, "scope items run past the end of the project"
            );
        }

        let calendar_weeks = months.total_weeks();
        let week_mismatch = (calendar_weeks != project_weeks).then_some(WeekMismatch {
            calendar_weeks,
            project_weeks,
        });
        if let Some(mismatch) = &week_mismatch {
            warn!(
                calendar_weeks = mismatch.calendar_weeks,
                project_weeks, "month weeks do not match project length"
            );
        }

        let base_total: f64 = scope.iter().map(|item| item.base).sum();
        let contract_total = base_total * settings.markup_factor();
        let deposit_pre = contract_total * settings.deposit_pct;
        // Tied to the holdback percentage, not to the holdback accrued.
        let deposit_floor = contract_total * settings.holdback_pct;

        let (week_allocation, drift) = Self::spread_weeks(settings, scope, contract_total);

        let mut deposit = DepositPosition {
            deposit_pre,
            deposit_floor,
            remaining: deposit_pre,
            nearing_floor: false,
        };
        let mut totals = CashFlowTotals {
            base_total,
            markup_amount: contract_total - base_total,
            contract_total,
            ..CashFlowTotals::default()
        };
        let month_rows =
            Self::roll_up_months(settings, months, toggles, &week_allocation, &mut deposit);
        for row in &month_rows {
            totals.pre_tax += row.pretax;
            totals.deposit_credit += row.deposit_credit_applied;
            totals.holdback += row.holdback;
            totals.subtotal += row.subtotal;
            totals.hst += row.hst;
            totals.amount_due += row.amount_due;
        }
        if deposit.nearing_floor {
            warn!(
                remaining = deposit.remaining,
                floor = deposit.deposit_floor,
                "deposit credit is nearing the floor"
            );
        }

        let last_label = months.active().last().map(|month| month.label.as_str());
        let holdback_release_row = Self::holdback_release(
            settings,
            toggles,
            totals.holdback,
            deposit.remaining,
            last_label,
        );

        debug!(
            contract_total,
            drift,
            months = month_rows.len(),
            amount_due = totals.amount_due,
            "allocation computed"
        );

        Ok(AllocationReport {
            week_allocation,
            month_rows,
            holdback_release_row,
            totals,
            deposit,
            drift,
            overruns,
            week_mismatch,
        })
    }

    /// Allocates a whole document and decides whether the caller must confirm.
    ///
    /// `accept_mismatch` lets a caller that already acknowledged a calendar
    /// mismatch get a `Ready` outcome; overruns always need confirmation since
    /// resolving them changes the scope ledger.
    pub fn evaluate(document: &PlanDocument, accept_mismatch: bool) -> Result<Outcome> {
        let report = Self::allocate(
            &document.settings,
            &document.months,
            &document.scope,
            &document.toggles,
        )?;
        if !report.requires_confirmation(accept_mismatch) {
            return Ok(Outcome::Ready(report));
        }
        Ok(Outcome::RequiresConfirmation(Confirmation {
            overruns: report.overruns.clone(),
            week_mismatch: report.week_mismatch.filter(|_| !accept_mismatch),
            preview: report,
        }))
    }

    /// Distributes every item over its weeks and corrects rounding drift.
    ///
    /// Returns the weekly amounts (index 0 is week 1) and the drift applied.
    pub fn spread_weeks(
        settings: &Settings,
        scope: &[ScopeItem],
        contract_total: f64,
    ) -> (Vec<f64>, f64) {
        let project_weeks = settings.project_weeks.max(1);
        let factor = settings.markup_factor();
        let mut weeks = vec![0.0_f64; project_weeks as usize];

        for item in scope {
            let amount = item.marked_up(factor);
            let fraction = item.deposit_fraction();
            let deposit = if fraction > 0.0 {
                amount * fraction
            } else {
                0.0
            };
            let remainder = amount - deposit;

            if let Some((start, end)) = item.active_range(project_weeks) {
                let span = (end - start + 1).max(1);
                let share = remainder / f64::from(span);
                for slot in &mut weeks[(start - 1) as usize..end as usize] {
                    *slot += share;
                }
            }
            if deposit > 0.0 {
                weeks[(item.deposit_week(project_weeks) - 1) as usize] += deposit;
            }
        }

        let allocated: f64 = weeks.iter().sum();
        let drift = round2(contract_total - allocated);
        if drift.abs() < DRIFT_THRESHOLD {
            return (weeks, 0.0);
        }
        // Falls back to the final week when nothing was funded at all.
        let target = weeks
            .iter()
            .rposition(|amount| *amount != 0.0)
            .unwrap_or(weeks.len() - 1);
        weeks[target] += drift;
        debug!(drift, week = target + 1, "applied rounding drift");
        (weeks, drift)
    }

    fn roll_up_months(
        settings: &Settings,
        months: &MonthCalendar,
        toggles: &Toggles,
        weeks: &[f64],
        deposit: &mut DepositPosition,
    ) -> Vec<MonthCashRow> {
        let mut rows = Vec::new();
        for month in months.active() {
            let first = month.start.max(1) as usize;
            let last = (month.end as usize).min(weeks.len());
            let pretax: f64 = if first <= last {
                weeks[first - 1..last].iter().sum()
            } else {
                0.0
            };

            let desired = if toggles.deposit_credit {
                settings.deposit_credit_pct * pretax
            } else {
                0.0
            };
            let max_credit = (deposit.remaining - deposit.deposit_floor).max(0.0);
            let applied = max_credit.min(desired);
            deposit.remaining -= applied;
            if (max_credit - desired) < pretax * NEARING_FLOOR_RATIO {
                deposit.nearing_floor = true;
            }

            let holdback = if toggles.holdback {
                settings.holdback_pct * pretax
            } else {
                0.0
            };
            let subtotal = pretax - applied - holdback;
            let hst = if toggles.hst {
                settings.hst_pct * subtotal
            } else {
                0.0
            };

            rows.push(MonthCashRow {
                kind: RowKind::Month,
                label: month.label.clone(),
                pretax,
                deposit_credit_applied: applied,
                holdback,
                subtotal,
                hst,
                amount_due: subtotal + hst,
                deposit_remaining: deposit.remaining,
            });
        }
        rows
    }

    fn holdback_release(
        settings: &Settings,
        toggles: &Toggles,
        release: f64,
        deposit_remaining: f64,
        last_label: Option<&str>,
    ) -> MonthCashRow {
        let hst = if toggles.hst {
            settings.hst_pct * release
        } else {
            0.0
        };
        let label = last_label
            .and_then(|label| label_after(label, HOLDBACK_RELEASE_DELAY_MONTHS))
            .map(|when| format!("{HOLDBACK_RELEASE_LABEL} ({when})"))
            .unwrap_or_else(|| HOLDBACK_RELEASE_LABEL.to_string());
        MonthCashRow {
            kind: RowKind::HoldbackRelease,
            label,
            pretax: 0.0,
            deposit_credit_applied: 0.0,
            holdback: release,
            subtotal: release,
            hst,
            amount_due: release + hst,
            deposit_remaining,
        }
    }
}

/// Convenience wrapper over [`AllocationEngine::allocate`].
pub fn allocate(
    settings: &Settings,
    months: &MonthCalendar,
    scope: &[ScopeItem],
    toggles: &Toggles,
) -> Result<AllocationReport> {
    AllocationEngine::allocate(settings, months, scope, toggles)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn rejects_zero_week_project() {
        let mut settings = Settings::flat(1);
        settings.project_weeks = 0;
        let err = allocate(&settings, &MonthCalendar::default(), &[], &Toggles::none())
            .expect_err("zero weeks must be rejected");
        assert!(matches!(err, PlannerError::InvalidInput(_)));
    }

    #[test]
    fn rejects_project_longer_than_maximum() {
        let mut settings = Settings::flat(1);
        settings.project_weeks = MAX_PROJECT_WEEKS + 1;
        let err = allocate(&settings, &MonthCalendar::default(), &[], &Toggles::none())
            .expect_err("oversized project must be rejected");
        assert!(matches!(err, PlannerError::InvalidInput(_)));
    }

    #[test]
    fn single_week_item_takes_full_amount() {
        let settings = Settings::flat(3);
        let scope = [ScopeItem::new("01", "Demo", 300.0).timed(2, 1)];
        let (weeks, drift) = AllocationEngine::spread_weeks(&settings, &scope, 300.0);
        assert_eq!(weeks, vec![0.0, 300.0, 0.0]);
        assert_eq!(drift, 0.0);
    }

    #[test]
    fn markup_is_applied_before_spreading() {
        let mut settings = Settings::flat(2);
        settings.markup_pct = 0.25;
        let scope = [ScopeItem::new("01", "Demo", 400.0).timed(1, 2)];
        let (weeks, _) = AllocationEngine::spread_weeks(&settings, &scope, 500.0);
        assert!(close(weeks[0], 250.0) && close(weeks[1], 250.0));
    }

    #[test]
    fn drift_lands_on_last_funded_week() {
        let settings = Settings::flat(4);
        // The zero-length item's 0.01 has no week; the drift step restores it.
        let scope = [
            ScopeItem::new("01", "Main", 999.99).timed(1, 3),
            ScopeItem::new("02", "Stub", 0.01).timed(2, 0),
        ];
        let (weeks, drift) = AllocationEngine::spread_weeks(&settings, &scope, 1000.0);
        assert!(close(drift, 0.01));
        assert!(close(weeks[2], 333.33 + 0.01));
        assert_eq!(weeks[3], 0.0);
    }

    #[test]
    fn drift_without_funded_weeks_goes_to_final_week() {
        let settings = Settings::flat(3);
        let scope = [ScopeItem::new("01", "Stub", 10.0).timed(1, 0)];
        let (weeks, drift) = AllocationEngine::spread_weeks(&settings, &scope, 10.0);
        assert!(close(drift, 10.0));
        assert!(close(weeks[2], 10.0));
    }

    #[test]
    fn release_label_follows_last_month() {
        let settings = Settings::flat(4);
        let months = MonthCalendar::from_weeks([("Nov 2025", 4)]);
        let scope = [ScopeItem::new("01", "Demo", 100.0).timed(1, 4)];
        let report = allocate(&settings, &months, &scope, &Toggles::default()).unwrap();
        assert_eq!(
            report.holdback_release_row.label,
            "Holdback Release (Jan 2026)"
        );
        assert_eq!(report.holdback_release_row.kind, RowKind::HoldbackRelease);
    }

    #[test]
    fn evaluate_accepts_mismatch_when_told() {
        let document = PlanDocument::new(
            Settings::flat(4),
            MonthCalendar::from_weeks([("A", 3)]),
            vec![ScopeItem::new("01", "Demo", 100.0).timed(1, 4)],
        );
        let blocked = AllocationEngine::evaluate(&document, false).unwrap();
        assert!(!blocked.is_ready());
        let accepted = AllocationEngine::evaluate(&document, true).unwrap();
        assert!(accepted.is_ready());
        assert!(accepted.report().week_mismatch.is_some());
    }

    #[test]
    fn overruns_block_even_with_accepted_mismatch() {
        let settings = Settings::flat(4);
        let months = MonthCalendar::from_weeks([("A", 3)]);
        let scope = [ScopeItem::new("01", "Demo", 100.0).timed(3, 4)];
        let report = allocate(&settings, &months, &scope, &Toggles::none()).unwrap();
        assert!(report.requires_confirmation(true));

        let capped = [ScopeItem::new("01", "Demo", 100.0).timed(1, 4)];
        let report = allocate(&settings, &months, &capped, &Toggles::none()).unwrap();
        assert!(report.requires_confirmation(false));
        assert!(!report.requires_confirmation(true));
    }
}
