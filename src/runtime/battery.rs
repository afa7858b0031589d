//! Battery probe.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ProbeError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatteryState {
    Charging,
    Discharging,
    Full,
    NotCharging,
    #[default]
    Unknown,
}

impl BatteryState {
    /// Parse the `status` attribute of a Linux power supply.
    pub fn parse(status: &str) -> Self {
        match status.trim() {
            "Charging" => Self::Charging,
            "Discharging" => Self::Discharging,
            "Full" => Self::Full,
            "Not charging" => Self::NotCharging,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for BatteryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Charging => "Charging",
            Self::Discharging => "Discharging",
            Self::Full => "Full",
            Self::NotCharging => "Not Charging",
            Self::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatteryInfo {
    pub percentage: u8,
    pub state: BatteryState,
}

impl BatteryInfo {
    /// Build from the `capacity` and `status` attributes of a power supply.
    pub fn parse(capacity: &str, status: &str) -> Result<Self, ProbeError> {
        let percentage: u8 = capacity.trim().parse().map_err(|e| ProbeError::Parse {
            what: "battery capacity",
            message: format!("{e}"),
        })?;

        Ok(Self {
            percentage: percentage.min(100),
            state: BatteryState::parse(status),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_battery() {
        let info = BatteryInfo::parse("87\n", "Discharging\n").unwrap();
        assert_eq!(info.percentage, 87);
        assert_eq!(info.state, BatteryState::Discharging);
        assert_eq!(info.state.to_string(), "Discharging");
    }

    #[test]
    fn test_bad_capacity() {
        assert!(BatteryInfo::parse("lots", "Full").is_err());
    }

    #[test]
    fn test_unknown_status() {
        assert_eq!(BatteryState::parse("Exploding"), BatteryState::Unknown);
        assert_eq!(BatteryState::parse("Not charging"), BatteryState::NotCharging);
    }
}
