//! Threshold filtering of mask records.
//!
//! A record is kept when every configured bound is satisfied. Bounds are
//! inclusive. A bound on a field the record does not carry (its statistic
//! was never computed) is not satisfied.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::mask::{MaskField, MaskRecord};

/// Inclusive range on one field. Either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bound {
    /// Smallest accepted value.
    pub min: Option<f64>,
    /// Largest accepted value.
    pub max: Option<f64>,
}

impl Bound {
    /// Whether `value` lies inside the bound.
    #[must_use]
    pub fn accepts(&self, value: f64) -> bool {
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }
}

/// The full set of filter thresholds, keyed by field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterThresholds {
    bounds: BTreeMap<MaskField, Bound>,
}

impl FilterThresholds {
    /// No thresholds: every record passes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the lower bound for `field`.
    #[must_use]
    pub fn with_min(mut self, field: MaskField, min: f64) -> Self {
        self.bounds.entry(field).or_default().min = Some(min);
        self
    }

    /// Set the upper bound for `field`.
    #[must_use]
    pub fn with_max(mut self, field: MaskField, max: f64) -> Self {
        self.bounds.entry(field).or_default().max = Some(max);
        self
    }

    /// Whether no bound is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    /// The configured bound for `field`, if any.
    #[must_use]
    pub fn bound(&self, field: MaskField) -> Option<Bound> {
        self.bounds.get(&field).copied()
    }

    /// Iterate configured bounds in field order.
    pub fn iter(&self) -> impl Iterator<Item = (MaskField, Bound)> + '_ {
        self.bounds.iter().map(|(f, b)| (*f, *b))
    }

    /// Whether `record` satisfies every bound.
    #[must_use]
    pub fn accepts(&self, record: &MaskRecord) -> bool {
        self.bounds
            .iter()
            .all(|(field, bound)| record.field(*field).is_some_and(|v| bound.accepts(v)))
    }
}

/// Keep the records that satisfy every threshold, preserving order.
///
/// An empty result is a normal outcome; callers decide what "nothing
/// survived" means for persistence.
#[must_use]
pub fn filter_masks(collection: Vec<MaskRecord>, thresholds: &FilterThresholds) -> Vec<MaskRecord> {
    let before = collection.len();
    let kept: Vec<MaskRecord> = collection
        .into_iter()
        .filter(|record| thresholds.accepts(record))
        .collect();
    log::debug!("filter kept {} of {before} masks", kept.len());
    kept
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mask::disc_mask;
    use crate::stats::{MaskStatistic, StatisticContext, StatisticKind};
    use crate::types::{GrayImage, PixelScale};

    fn fitted_disc(radius: f64, scale: PixelScale) -> MaskRecord {
        let size = 160;
        let image = GrayImage::new(size, size);
        let mut record =
            MaskRecord::from_segmentation(disc_mask(size, size, 80.0, 80.0, radius), 0.9, 0.8)
                .unwrap();
        StatisticKind::FitEllipse.compute(
            &mut record,
            &StatisticContext {
                image: &image,
                scale,
            },
        );
        record
    }

    #[test]
    fn bound_is_inclusive() {
        let bound = Bound {
            min: Some(1.0),
            max: Some(2.0),
        };
        assert!(bound.accepts(1.0));
        assert!(bound.accepts(2.0));
        assert!(!bound.accepts(2.000_001));
        assert!(Bound::default().accepts(f64::MAX));
    }

    #[test]
    fn radius_scenario() {
        let scale = PixelScale::new(1.0, 4).unwrap();
        let record = fitted_disc(50.0, scale);

        let keep = FilterThresholds::new()
            .with_min(MaskField::AverageRadiusA, 100.0)
            .with_max(MaskField::AverageRadiusA, 300.0);
        assert_eq!(filter_masks(vec![record.clone()], &keep).len(), 1);

        let drop = FilterThresholds::new()
            .with_min(MaskField::AverageRadiusA, 100.0)
            .with_max(MaskField::AverageRadiusA, 150.0);
        assert!(filter_masks(vec![record], &drop).is_empty());
    }

    #[test]
    fn all_thresholds_must_pass() {
        let scale = PixelScale::new(1.0, 1).unwrap();
        let record = fitted_disc(20.0, scale);
        let thresholds = FilterThresholds::new()
            .with_min(MaskField::AverageRadius, 10.0)
            .with_min(MaskField::StabilityScore, 0.95);
        assert!(filter_masks(vec![record], &thresholds).is_empty());
    }

    #[test]
    fn missing_statistic_fails_threshold() {
        let record =
            MaskRecord::from_segmentation(disc_mask(50, 50, 25.0, 25.0, 10.0), 1.0, 1.0).unwrap();
        let thresholds = FilterThresholds::new().with_max(MaskField::Circularity, 10.0);
        assert!(filter_masks(vec![record], &thresholds).is_empty());
    }

    #[test]
    fn filtering_is_idempotent() {
        let scale = PixelScale::new(2.0, 2).unwrap();
        let collection: Vec<MaskRecord> = [8.0, 15.0, 25.0, 40.0]
            .into_iter()
            .map(|r| fitted_disc(r, scale))
            .collect();
        let thresholds = FilterThresholds::new()
            .with_min(MaskField::AverageRadiusA, 50.0)
            .with_max(MaskField::AverageRadiusA, 120.0);

        let once = filter_masks(collection, &thresholds);
        let twice = filter_masks(once.clone(), &thresholds);
        assert_eq!(once.len(), 2);
        assert_eq!(once, twice);
    }

    #[test]
    fn no_thresholds_keep_everything() {
        let scale = PixelScale::new(1.0, 1).unwrap();
        let thresholds = FilterThresholds::new();
        assert!(thresholds.is_empty());
        let out = filter_masks(vec![fitted_disc(5.0, scale)], &thresholds);
        assert_eq!(out.len(), 1);
    }
}
