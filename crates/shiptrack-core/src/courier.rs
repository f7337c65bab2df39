//! Supported courier backends
//!
//! Each courier has its own raw status vocabulary and record layout, so the
//! identifier selects which extraction and normalization rules apply.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the supported shipment carriers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Courier {
    /// InPost parcel lockers and courier
    Inpost,
    /// DPD Polska
    Dpd,
    /// DHL Parcel Polska
    Dhl,
    /// Pocztex (Poczta Polska)
    Pocztex,
}

impl Courier {
    /// All supported couriers
    pub const ALL: [Courier; 4] = [Courier::Inpost, Courier::Dpd, Courier::Dhl, Courier::Pocztex];

    /// Wire name of this courier, as used in entity keys and configuration
    pub fn as_str(self) -> &'static str {
        match self {
            Courier::Inpost => "inpost",
            Courier::Dpd => "dpd",
            Courier::Dhl => "dhl",
            Courier::Pocztex => "pocztex",
        }
    }
}

impl fmt::Display for Courier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Courier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inpost" => Ok(Courier::Inpost),
            "dpd" => Ok(Courier::Dpd),
            "dhl" => Ok(Courier::Dhl),
            "pocztex" => Ok(Courier::Pocztex),
            other => Err(Error::config(format!("unknown courier type: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_round_trip() {
        for courier in Courier::ALL {
            assert_eq!(courier.as_str().parse::<Courier>().unwrap(), courier);
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        assert!("hermes".parse::<Courier>().is_err());
        assert!("".parse::<Courier>().is_err());
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("InPost".parse::<Courier>().unwrap(), Courier::Inpost);
        assert_eq!(" DPD ".parse::<Courier>().unwrap(), Courier::Dpd);
    }
}
