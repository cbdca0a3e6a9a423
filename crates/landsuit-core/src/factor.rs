//! The fixed catalogue of environmental factors.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::normalize::Rule;

/// How a factor's raw cell values are to be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Continuous,
    Categorical,
}

/// One environmental input layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    Fertility,
    Moisture,
    Soc,
    Ndvi,
    Nitrogen,
    Phosphorus,
    Potassium,
    Ph,
    Texture,
    Sulphur,
}

impl Factor {
    /// Every factor, in the order used for reference-grid selection and
    /// aggregation. Results depend on this order; do not reorder.
    pub const ALL: [Factor; 10] = [
        Factor::Fertility,
        Factor::Moisture,
        Factor::Soc,
        Factor::Ndvi,
        Factor::Nitrogen,
        Factor::Phosphorus,
        Factor::Potassium,
        Factor::Ph,
        Factor::Texture,
        Factor::Sulphur,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Factor::Fertility => "fertility",
            Factor::Moisture => "moisture",
            Factor::Soc => "soc",
            Factor::Ndvi => "ndvi",
            Factor::Nitrogen => "nitrogen",
            Factor::Phosphorus => "phosphorus",
            Factor::Potassium => "potassium",
            Factor::Ph => "ph",
            Factor::Texture => "texture",
            Factor::Sulphur => "sulphur",
        }
    }

    /// Source filename inside the data folder.
    pub fn filename(self) -> &'static str {
        match self {
            Factor::Fertility => "Fertility.tif",
            Factor::Moisture => "SoilMoisture.tif",
            Factor::Soc => "SOC.tif",
            Factor::Ndvi => "NDVI.tif",
            Factor::Nitrogen => "Nitrogen.tif",
            Factor::Phosphorus => "Phosphorus.tif",
            Factor::Potassium => "Potassium.tif",
            Factor::Ph => "PH.tif",
            Factor::Texture => "SoilTexture.tif",
            Factor::Sulphur => "Sulphur.tif",
        }
    }

    pub fn kind(self) -> ValueKind {
        match self {
            Factor::Ph | Factor::Soc | Factor::Sulphur => ValueKind::Continuous,
            _ => ValueKind::Categorical,
        }
    }

    pub fn rule(self) -> Rule {
        Rule::for_factor(self)
    }

    /// Weight used when the caller supplies none. The set totals 110 and is
    /// brought to 100 by [`WeightSet::normalized`](crate::weights::WeightSet::normalized).
    pub fn default_weight(self) -> f64 {
        match self {
            Factor::Fertility => 30.0,
            Factor::Moisture => 25.0,
            Factor::Soc => 12.0,
            Factor::Ndvi => 12.0,
            Factor::Nitrogen => 8.0,
            Factor::Phosphorus => 7.0,
            Factor::Potassium => 6.0,
            Factor::Ph => 6.0,
            Factor::Texture => 3.0,
            Factor::Sulphur => 1.0,
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Factor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Factor::ALL
            .into_iter()
            .find(|f| f.id() == s)
            .ok_or_else(|| format!("unknown factor: {s}"))
    }
}
