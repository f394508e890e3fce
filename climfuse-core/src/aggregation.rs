//! Reduction of monthly series to annual means

use crate::errors::FusionResult;
use crate::spatial::Field;
use crate::timeseries::{MonthlySeries, MONTHS_PER_YEAR};
use log::warn;
use serde::Serialize;
use std::collections::BTreeMap;

/// A trailing year that was dropped because it had fewer than 12 monthly entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IncompleteYear {
    pub year: i32,
    pub months: usize,
}

/// Mean of the monthly fields falling in `year`
///
/// Returns `None` when the series has no entries for that year; callers leave the
/// corresponding output untouched.
pub fn annual_mean(series: &MonthlySeries, year: i32) -> Option<Field> {
    series.mean_of(&series.indices_in_year(year))
}

/// Number of monthly entries per calendar year
pub fn months_per_year(series: &MonthlySeries) -> BTreeMap<i32, usize> {
    let mut counts = BTreeMap::new();
    for t in series.times() {
        *counts.entry(t.year).or_insert(0) += 1;
    }
    counts
}

/// Years with a full set of monthly entries
pub fn complete_years(series: &MonthlySeries) -> Vec<i32> {
    months_per_year(series)
        .into_iter()
        .filter(|(_, n)| *n == MONTHS_PER_YEAR)
        .map(|(year, _)| year)
        .collect()
}

/// Remove the most recent year if it has fewer than 12 months
///
/// Observational products are updated monthly, so their final year is usually partial.
/// Averaging it would bias the annual mean towards the months published so far.
pub fn drop_incomplete_trailing_year(
    series: &MonthlySeries,
) -> FusionResult<(MonthlySeries, Option<IncompleteYear>)> {
    let Some(last) = series.times().last() else {
        return Ok((series.clone(), None));
    };

    let trailing = series.indices_in_year(last.year);
    if trailing.len() >= MONTHS_PER_YEAR {
        return Ok((series.clone(), None));
    }

    warn!(
        "Most recent year ({}) has {} of {} months; dropping it",
        last.year,
        trailing.len(),
        MONTHS_PER_YEAR
    );
    let keep: Vec<usize> = (0..series.len())
        .filter(|i| series.times()[*i].year != last.year)
        .collect();
    Ok((
        series.retain_indices(&keep)?,
        Some(IncompleteYear {
            year: last.year,
            months: trailing.len(),
        }),
    ))
}
