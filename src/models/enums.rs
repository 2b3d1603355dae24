use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {field} value: {value}")]
pub struct ParseEnumError {
    pub field: String,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ParseEnumError {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(Sex {
    Male => "male",
    Female => "female",
});

str_enum!(
    /// ACC/AHA heart failure stage.
    HfStage {
        A => "A",
        B => "B",
        C => "C",
        D => "D",
    }
);

str_enum!(
    /// Heart failure phenotype by ejection fraction.
    HfType {
        Reduced => "HFrEF",
        Preserved => "HFpEF",
        MildlyReduced => "HFmrEF",
        Improved => "HFimpEF",
    }
);

str_enum!(
    /// Guideline pathway a profile is classified into.
    Pathway {
        Reduced => "HFrEF",
        Preserved => "HFpEF",
        Indeterminate => "indeterminate",
    }
);

str_enum!(
    /// Therapy buckets, in the priority order medications are matched against.
    DrugClass {
        AceArb => "ace_arb",
        BetaBlocker => "beta_blocker",
        Mra => "mra",
        Diuretic => "diuretic",
        Sglt2 => "sglt2",
        Other => "other",
    }
);

str_enum!(
    /// How a profile was produced.
    ExtractionMethod {
        Regex => "regex",
        Remote => "remote",
        RegexFallback => "regex_fallback",
    }
);

impl Default for ExtractionMethod {
    fn default() -> Self {
        Self::Regex
    }
}

impl DrugClass {
    /// Classes the reduced-EF pathway requires.
    pub const MANDATED: [DrugClass; 4] = [
        DrugClass::AceArb,
        DrugClass::BetaBlocker,
        DrugClass::Mra,
        DrugClass::Sglt2,
    ];
}
