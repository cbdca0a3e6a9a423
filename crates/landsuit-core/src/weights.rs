use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SuitabilityError};
use crate::factor::Factor;

/// Caller-supplied factor weights, keyed by factor identifier.
///
/// Identifiers that name no known factor are kept: they take part in
/// renormalization but are never loaded. Known factors without an entry are
/// not scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightSet(BTreeMap<String, f64>);

impl WeightSet {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    pub fn insert(&mut self, id: impl Into<String>, weight: f64) {
        self.0.insert(id.into(), weight);
    }

    pub fn with(mut self, factor: Factor, weight: f64) -> Self {
        self.insert(factor.id(), weight);
        self
    }

    pub fn get(&self, factor: Factor) -> Option<f64> {
        self.0.get(factor.id()).copied()
    }

    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, &v)| (k.as_str(), v))
    }

    /// Known factors that have no entry.
    pub fn missing_factors(&self) -> Vec<Factor> {
        Factor::ALL.into_iter().filter(|f| self.get(*f).is_none()).collect()
    }

    /// Identifiers that name no known factor.
    pub fn unknown_ids(&self) -> Vec<&str> {
        self.0
            .keys()
            .map(String::as_str)
            .filter(|id| id.parse::<Factor>().is_err())
            .collect()
    }

    /// Rescale proportionally so the weights sum to 100. A set that already
    /// sums to exactly 100 is returned unchanged.
    pub fn normalized(&self) -> Result<WeightSet> {
        if let Some((id, w)) = self.iter().find(|(_, w)| !w.is_finite() || *w < 0.0) {
            return Err(SuitabilityError::InvalidWeights(format!(
                "weight for {id} must be a non-negative number, got {w}"
            )));
        }
        let total = self.total();
        if total <= 0.0 {
            return Err(SuitabilityError::InvalidWeights(format!(
                "weights must have a positive total, got {total}"
            )));
        }
        if total == 100.0 {
            return Ok(self.clone());
        }
        Ok(WeightSet(
            self.0.iter().map(|(k, &v)| (k.clone(), v / total * 100.0)).collect(),
        ))
    }
}

impl Default for WeightSet {
    fn default() -> Self {
        Factor::ALL
            .into_iter()
            .fold(WeightSet::new(), |set, f| set.with(f, f.default_weight()))
    }
}

impl FromIterator<(String, f64)> for WeightSet {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        WeightSet(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn default_set_covers_every_factor() {
        let w = WeightSet::default();
        assert!(w.missing_factors().is_empty());
        assert_eq!(w.get(Factor::Fertility), Some(30.0));
        assert_eq!(w.total(), 110.0);
    }

    #[test]
    fn default_set_renormalizes_to_100() {
        let n = WeightSet::default().normalized().unwrap();
        assert_relative_eq!(n.total(), 100.0, epsilon = 1e-9);
        assert_relative_eq!(n.get(Factor::Fertility).unwrap(), 30.0 / 110.0 * 100.0, epsilon = 1e-9);
        assert_relative_eq!(n.get(Factor::Sulphur).unwrap(), 100.0 / 110.0, epsilon = 1e-9);
    }

    #[test]
    fn renormalization_sums_to_100() {
        let sets = [
            vec![("ph", 1.0)],
            vec![("fertility", 3.0), ("moisture", 7.0), ("soc", 0.5)],
            vec![("ndvi", 1e-3), ("sulphur", 2e6)],
            vec![("texture", 33.3), ("nitrogen", 0.0), ("custom", 12.0)],
        ];
        for pairs in sets {
            let w: WeightSet = pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
            let n = w.normalized().unwrap();
            assert_relative_eq!(n.total(), 100.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn renormalization_keeps_proportions() {
        let w = WeightSet::new().with(Factor::Fertility, 1.0).with(Factor::Moisture, 3.0);
        let n = w.normalized().unwrap();
        assert_relative_eq!(n.get(Factor::Fertility).unwrap(), 25.0, epsilon = 1e-9);
        assert_relative_eq!(n.get(Factor::Moisture).unwrap(), 75.0, epsilon = 1e-9);
    }

    #[test]
    fn invalid_totals_are_rejected() {
        assert!(WeightSet::new().normalized().is_err());
        assert!(WeightSet::new().with(Factor::Ph, 0.0).normalized().is_err());
        assert!(WeightSet::new().with(Factor::Ph, -5.0).with(Factor::Soc, 10.0).normalized().is_err());
        assert!(WeightSet::new().with(Factor::Ph, f64::NAN).normalized().is_err());
    }

    #[test]
    fn json_keys_pass_through() {
        let w = WeightSet::from_json(r#"{"fertility": 20, "moisture": 15, "elevation": 5}"#).unwrap();
        assert_eq!(w.get(Factor::Moisture), Some(15.0));
        assert_eq!(w.unknown_ids(), vec!["elevation"]);
        assert_eq!(w.missing_factors().len(), 8);
    }
}
