//! Factor normalization: raw measurement → suitability sub-score.
//!
//! Every factor carries a [`Rule`]. Step curves are checked band by band in
//! declaration order and the first matching band wins; lookup tables match
//! exact raw values and fall back to a default. NaN cells stay NaN under
//! every rule.
//!
//! All rules score on [0, 1] except NDVI, whose table scores on [0, 100].

use crate::factor::Factor;
use crate::grid::RasterGrid;

/// Condition selecting one band of a step curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    Exactly(f32),
    Below(f32),
    AtMost(f32),
}

impl Bound {
    #[inline]
    fn matches(self, v: f32) -> bool {
        match self {
            Bound::Exactly(x) => v == x,
            Bound::Below(x) => v < x,
            Bound::AtMost(x) => v <= x,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rule {
    /// Ordered bands; `above` scores anything no band matched.
    Steps { bands: &'static [(Bound, f32)], above: f32 },
    /// Exact raw value → score; `default` for unmatched values.
    Lookup { table: &'static [(f32, f32)], default: f32 },
    /// Raw value clamped to [0, 1]; used for identifiers with no known rule.
    Clamp,
}

// ── Rule tables ──────────────────────────────────────────────────────────────

/// Agricultural optimum 6.0–7.5.
const PH: &[(Bound, f32)] = &[
    (Bound::Below(4.5), 0.1),
    (Bound::Below(5.5), 0.3),
    (Bound::Below(6.0), 0.6),
    (Bound::AtMost(7.5), 1.0),
    (Bound::AtMost(8.5), 0.7),
    (Bound::AtMost(9.0), 0.4),
];

/// Fertility class codes: lower is better.
const FERTILITY: &[(Bound, f32)] = &[
    (Bound::Exactly(0.0), 1.0),
    (Bound::AtMost(4.0), 0.8),
    (Bound::AtMost(8.0), 0.6),
    (Bound::AtMost(12.0), 0.4),
    (Bound::AtMost(36.0), 0.2),
];

/// Soil organic carbon (%): higher is better.
const SOC: &[(Bound, f32)] = &[
    (Bound::Below(1.0), 0.2),
    (Bound::Below(1.5), 0.4),
    (Bound::Below(2.0), 0.6),
    (Bound::Below(2.5), 0.8),
];

const SULPHUR: &[(Bound, f32)] = &[
    (Bound::Below(2.5), 0.0),
    (Bound::Below(3.5), 0.33),
    (Bound::Below(4.5), 0.66),
];

/// 1/2 sparse, 3 optimal, 4 good, 5 forest.
const NDVI: &[(f32, f32)] = &[(1.0, 10.0), (2.0, 40.0), (3.0, 100.0), (4.0, 80.0), (5.0, 20.0)];

const SINGLE_OPTIMUM: &[(f32, f32)] = &[(5.0, 1.0)];

const PHOSPHORUS: &[(f32, f32)] = &[(2.0, 0.0), (3.0, 0.33), (4.0, 0.66), (5.0, 1.0)];

const TEXTURE: &[(f32, f32)] = &[(0.0, 0.0), (1.0, 0.2), (2.0, 0.33), (4.0, 0.66), (5.0, 1.0)];

const MOISTURE: &[(f32, f32)] = &[
    (0.0, 0.0),
    (3.0, 0.5),
    (4.0, 0.7),
    (5.0, 1.0),
    (6.0, 0.7),
    (7.0, 0.5),
    (8.0, 0.3),
    (9.0, 0.1),
    (10.0, 0.0),
];

impl Rule {
    pub fn for_factor(factor: Factor) -> Rule {
        match factor {
            Factor::Ph => Rule::Steps { bands: PH, above: 0.1 },
            Factor::Fertility => Rule::Steps { bands: FERTILITY, above: 0.0 },
            Factor::Soc => Rule::Steps { bands: SOC, above: 1.0 },
            Factor::Sulphur => Rule::Steps { bands: SULPHUR, above: 1.0 },
            Factor::Ndvi => Rule::Lookup { table: NDVI, default: 0.0 },
            Factor::Nitrogen | Factor::Potassium => {
                Rule::Lookup { table: SINGLE_OPTIMUM, default: 0.0 }
            }
            Factor::Phosphorus => Rule::Lookup { table: PHOSPHORUS, default: 0.0 },
            Factor::Texture => Rule::Lookup { table: TEXTURE, default: 0.0 },
            Factor::Moisture => Rule::Lookup { table: MOISTURE, default: 0.0 },
        }
    }

    /// Rule for a factor identifier; unknown identifiers clamp to [0, 1].
    pub fn for_identifier(id: &str) -> Rule {
        id.parse::<Factor>().map(Rule::for_factor).unwrap_or(Rule::Clamp)
    }

    /// Score a single raw value. NaN in, NaN out.
    pub fn apply(self, v: f32) -> f32 {
        if v.is_nan() {
            return f32::NAN;
        }
        match self {
            Rule::Steps { bands, above } => bands
                .iter()
                .find(|(bound, _)| bound.matches(v))
                .map_or(above, |&(_, score)| score),
            Rule::Lookup { table, default } => table
                .iter()
                .find(|&&(raw, _)| raw == v)
                .map_or(default, |&(_, score)| score),
            Rule::Clamp => v.clamp(0.0, 1.0),
        }
    }
}

/// Normalize a raw grid in place with the rule for factor identifier `id`.
pub fn normalize_grid(grid: &mut RasterGrid, id: &str) {
    let rule = Rule::for_identifier(id);
    for v in grid.data.iter_mut() {
        *v = rule.apply(*v);
    }
}
