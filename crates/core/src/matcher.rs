//! Bed recommendation.
//!
//! The matcher is a pure function over a snapshot of the bed pool. It walks an ordered list of
//! `(scope, equipment)` filters and returns the first available bed that passes, scanning beds in
//! ascending bed-number order so that the same snapshot always yields the same answer.
//!
//! Hinted search ([`BedMatcher::recommend`]):
//!
//! 1. requested ward, all required tags
//! 2. requested ward, any required tag (only when tags were requested)
//! 3. requested ward, ignoring equipment
//! 4. steps 1-3 in the overflow ward, unless that was the requested ward
//! 5. any ward, all required tags
//! 6. any ward, ignoring equipment
//!
//! Global search ([`BedMatcher::recommend_global`]) replaces steps 1-4 with steps 1-3 applied to
//! each ward of the configured priority list in turn.

use crate::bed::Bed;
use crate::config::CoreConfig;
use bedflow_types::{EquipmentTag, WardName};
use std::collections::HashSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Scope<'w> {
    Ward(&'w WardName),
    Anywhere,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EquipmentMode {
    All,
    Any,
    Ignore,
}

type Filter<'w> = (Scope<'w>, EquipmentMode);

/// Drops the legacy `standard` tag and duplicates, keeping first-seen order.
pub fn required_equipment(tags: &[EquipmentTag]) -> Vec<EquipmentTag> {
    let mut seen = HashSet::new();
    tags.iter()
        .filter(|t| !t.is_standard())
        .filter(|t| seen.insert((*t).clone()))
        .cloned()
        .collect()
}

/// Read-only view over a bed pool snapshot.
pub struct BedMatcher<'a> {
    beds: Vec<&'a Bed>,
    cfg: &'a CoreConfig,
}

impl<'a> BedMatcher<'a> {
    /// Builds a matcher over `pool`. The pool order does not matter; beds are scanned by number.
    pub fn new(pool: &'a [Bed], cfg: &'a CoreConfig) -> Self {
        let mut beds: Vec<&Bed> = pool.iter().collect();
        beds.sort_by(|a, b| a.number.cmp(&b.number));
        Self { beds, cfg }
    }

    /// Best bed for `ward` using the full hinted cascade, or `None` when no bed is available.
    pub fn recommend(&self, ward: &WardName, tags: &[EquipmentTag]) -> Option<&'a Bed> {
        let required = required_equipment(tags);
        let mut filters = ward_filters(ward, &required);
        let overflow = self.cfg.overflow_ward();
        if !ward.matches(overflow) {
            filters.extend(ward_filters(overflow, &required));
        }
        filters.extend(anywhere_filters());
        self.first_match(&filters, &required)
    }

    /// Best bed inside `ward` only (cascade steps 1-3).
    pub fn recommend_in_ward(&self, ward: &WardName, tags: &[EquipmentTag]) -> Option<&'a Bed> {
        let required = required_equipment(tags);
        self.first_match(&ward_filters(ward, &required), &required)
    }

    /// Best bed walking the configured ward priority list, then any ward.
    pub fn recommend_global(&self, tags: &[EquipmentTag]) -> Option<&'a Bed> {
        let required = required_equipment(tags);
        let mut filters: Vec<Filter> = self
            .cfg
            .ward_priority()
            .iter()
            .flat_map(|ward| ward_filters(ward, &required))
            .collect();
        filters.extend(anywhere_filters());
        self.first_match(&filters, &required)
    }

    /// The hinted recommendation followed by further available beds of the requested ward, up to
    /// `limit` entries.
    pub fn rank(&self, ward: &WardName, tags: &[EquipmentTag], limit: usize) -> Vec<&'a Bed> {
        let best = self.recommend(ward, tags);
        self.extend_ranking(best, |bed| bed.in_ward(ward), limit)
    }

    /// The global recommendation followed by further available beds of the same ward.
    pub fn rank_global(&self, tags: &[EquipmentTag], limit: usize) -> Vec<&'a Bed> {
        let best = self.recommend_global(tags);
        let ward = best.map(|b| &b.ward);
        self.extend_ranking(best, |bed| ward.is_some_and(|w| bed.in_ward(w)), limit)
    }

    /// Available beds in any of `wards`, in bed-number order. An empty slice means every ward.
    pub fn available_in(&self, wards: &[&WardName]) -> Vec<&'a Bed> {
        self.beds
            .iter()
            .copied()
            .filter(|bed| bed.is_available())
            .filter(|bed| wards.is_empty() || wards.iter().any(|w| bed.in_ward(w)))
            .collect()
    }

    fn extend_ranking(
        &self,
        best: Option<&'a Bed>,
        same_ward: impl Fn(&Bed) -> bool,
        limit: usize,
    ) -> Vec<&'a Bed> {
        let Some(best) = best else {
            return Vec::new();
        };
        let mut ranked = vec![best];
        ranked.extend(
            self.beds
                .iter()
                .copied()
                .filter(|bed| bed.is_available() && bed.number != best.number && same_ward(bed))
                .take(limit.saturating_sub(1)),
        );
        ranked.truncate(limit);
        ranked
    }

    fn first_match(&self, filters: &[Filter], required: &[EquipmentTag]) -> Option<&'a Bed> {
        for (level, (scope, mode)) in filters.iter().enumerate() {
            let found = self.beds.iter().copied().find(|bed| {
                bed.is_available()
                    && match scope {
                        Scope::Ward(ward) => bed.in_ward(ward),
                        Scope::Anywhere => true,
                    }
                    && match mode {
                        EquipmentMode::All => bed.has_all(required),
                        EquipmentMode::Any => bed.has_any(required),
                        EquipmentMode::Ignore => true,
                    }
            });
            if let Some(bed) = found {
                tracing::debug!(bed = %bed.number, level, ?scope, ?mode, "bed matched");
                return Some(bed);
            }
        }
        tracing::debug!(levels = filters.len(), "no available bed matched");
        None
    }
}

fn ward_filters<'w>(ward: &'w WardName, required: &[EquipmentTag]) -> Vec<Filter<'w>> {
    let mut filters = vec![(Scope::Ward(ward), EquipmentMode::All)];
    if !required.is_empty() {
        filters.push((Scope::Ward(ward), EquipmentMode::Any));
    }
    filters.push((Scope::Ward(ward), EquipmentMode::Ignore));
    filters
}

fn anywhere_filters() -> [Filter<'static>; 2] {
    [
        (Scope::Anywhere, EquipmentMode::All),
        (Scope::Anywhere, EquipmentMode::Ignore),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bed::BedStatus;
    use bedflow_types::BedNumber;
    use chrono::Utc;

    fn bed(number: &str, ward: &str, status: BedStatus, equipment: &[&str]) -> Bed {
        let now = Utc::now();
        let mut bed = Bed::new(
            BedNumber::new(number).unwrap(),
            WardName::new(ward).unwrap(),
            1,
            tags(equipment),
            now,
        );
        bed.status = status;
        bed
    }

    fn tags(list: &[&str]) -> Vec<EquipmentTag> {
        list.iter().map(|t| EquipmentTag::new(t).unwrap()).collect()
    }

    fn ward(name: &str) -> WardName {
        WardName::new(name).unwrap()
    }

    fn number(bed: Option<&Bed>) -> Option<&str> {
        bed.map(|b| b.number.as_str())
    }

    #[test]
    fn test_all_tags_beat_no_tags_in_ward() {
        let cfg = CoreConfig::default();
        let pool = vec![
            bed("ICU-001", "ICU", BedStatus::Available, &[]),
            bed("ICU-002", "ICU", BedStatus::Available, &["Ventilator"]),
        ];
        let matcher = BedMatcher::new(&pool, &cfg);

        assert_eq!(
            number(matcher.recommend(&ward("ICU"), &tags(&["Ventilator"]))),
            Some("ICU-002"),
            "bed with every required tag should win over an untagged bed"
        );
    }

    #[test]
    fn test_any_tag_match_before_untagged() {
        let cfg = CoreConfig::default();
        let pool = vec![
            bed("ICU-001", "ICU", BedStatus::Available, &[]),
            bed("ICU-002", "ICU", BedStatus::Available, &["Dialysis"]),
        ];
        let matcher = BedMatcher::new(&pool, &cfg);

        assert_eq!(
            number(matcher.recommend(&ward("ICU"), &tags(&["Ventilator", "Dialysis"]))),
            Some("ICU-002")
        );
    }

    #[test]
    fn test_ties_break_by_bed_number_regardless_of_pool_order() {
        let cfg = CoreConfig::default();
        let pool = vec![
            bed("ICU-010", "ICU", BedStatus::Available, &[]),
            bed("ICU-003", "ICU", BedStatus::Available, &[]),
            bed("ICU-007", "ICU", BedStatus::Available, &[]),
        ];
        let matcher = BedMatcher::new(&pool, &cfg);

        let first = matcher.recommend(&ward("ICU"), &[]);
        let second = matcher.recommend(&ward("ICU"), &[]);
        assert_eq!(number(first), Some("ICU-003"));
        assert_eq!(number(first), number(second), "matcher must be deterministic");
    }

    #[test]
    fn test_ward_only_query_does_not_fall_back() {
        let cfg = CoreConfig::default();
        let pool = vec![
            bed("ICU-001", "ICU", BedStatus::Occupied, &[]),
            bed("ER-001", "Emergency", BedStatus::Available, &[]),
        ];
        let matcher = BedMatcher::new(&pool, &cfg);

        assert_eq!(matcher.recommend_in_ward(&ward("ICU"), &[]), None);
        assert_eq!(number(matcher.recommend_global(&[])), Some("ER-001"));
        assert_eq!(
            number(matcher.recommend(&ward("ICU"), &[])),
            Some("ER-001"),
            "hinted search should overflow to the emergency ward"
        );
    }

    #[test]
    fn test_overflow_ward_before_other_wards() {
        let cfg = CoreConfig::default();
        let pool = vec![
            bed("CARD-001", "Cardiology", BedStatus::Available, &["Ventilator"]),
            bed("ER-001", "Emergency", BedStatus::Available, &[]),
        ];
        let matcher = BedMatcher::new(&pool, &cfg);

        assert_eq!(
            number(matcher.recommend(&ward("ICU"), &tags(&["Ventilator"]))),
            Some("ER-001"),
            "overflow ward is tried before the all-tags search anywhere"
        );
    }

    #[test]
    fn test_anywhere_fallbacks() {
        let cfg = CoreConfig::default();
        let pool = vec![
            bed("CARD-001", "Cardiology", BedStatus::Available, &[]),
            bed("CARD-002", "Cardiology", BedStatus::Available, &["Ventilator"]),
        ];
        let matcher = BedMatcher::new(&pool, &cfg);

        assert_eq!(
            number(matcher.recommend(&ward("ICU"), &tags(&["Ventilator"]))),
            Some("CARD-002")
        );
        assert_eq!(
            number(matcher.recommend(&ward("ICU"), &tags(&["Dialysis"]))),
            Some("CARD-001")
        );
    }

    #[test]
    fn test_no_available_bed_returns_none() {
        let cfg = CoreConfig::default();
        let pool = vec![
            bed("ICU-001", "ICU", BedStatus::Occupied, &[]),
            bed("ICU-002", "ICU", BedStatus::Cleaning, &[]),
            bed("ER-001", "Emergency", BedStatus::Reserved, &[]),
        ];
        let matcher = BedMatcher::new(&pool, &cfg);

        assert_eq!(matcher.recommend(&ward("ICU"), &[]), None);
        assert_eq!(matcher.recommend_global(&[]), None);
        assert!(matcher.rank(&ward("ICU"), &[], 3).is_empty());
    }

    #[test]
    fn test_global_follows_ward_priority() {
        let cfg = CoreConfig::default();
        let pool = vec![
            bed("GW-001", "General Ward", BedStatus::Available, &[]),
            bed("ICU-001", "ICU", BedStatus::Available, &[]),
        ];
        let matcher = BedMatcher::new(&pool, &cfg);

        assert_eq!(number(matcher.recommend_global(&[])), Some("ICU-001"));
    }

    #[test]
    fn test_standard_tag_means_no_requirement() {
        let cfg = CoreConfig::default();
        let pool = vec![
            bed("ICU-001", "ICU", BedStatus::Available, &[]),
            bed("ICU-002", "ICU", BedStatus::Available, &["Ventilator"]),
        ];
        let matcher = BedMatcher::new(&pool, &cfg);

        assert_eq!(
            number(matcher.recommend(&ward("ICU"), &tags(&["standard"]))),
            Some("ICU-001")
        );
        assert!(required_equipment(&tags(&["Standard", "Ventilator", "ventilator"])).len() == 1);
    }

    #[test]
    fn test_rank_lists_best_then_ward_beds() {
        let cfg = CoreConfig::default();
        let pool = vec![
            bed("ICU-001", "ICU", BedStatus::Available, &[]),
            bed("ICU-002", "ICU", BedStatus::Available, &[]),
            bed("ICU-003", "ICU", BedStatus::Available, &["Ventilator"]),
            bed("ICU-004", "ICU", BedStatus::Available, &[]),
            bed("ICU-005", "ICU", BedStatus::Occupied, &[]),
        ];
        let matcher = BedMatcher::new(&pool, &cfg);

        let ranked: Vec<&str> = matcher
            .rank(&ward("ICU"), &tags(&["Ventilator"]), 3)
            .iter()
            .map(|b| b.number.as_str())
            .collect();
        assert_eq!(ranked, ["ICU-003", "ICU-001", "ICU-002"]);
    }

    #[test]
    fn test_ward_hint_ignores_case() {
        let cfg = CoreConfig::default();
        let pool = vec![bed("ICU-001", "ICU", BedStatus::Available, &[])];
        let matcher = BedMatcher::new(&pool, &cfg);

        assert_eq!(number(matcher.recommend_in_ward(&ward("icu"), &[])), Some("ICU-001"));
    }
}
