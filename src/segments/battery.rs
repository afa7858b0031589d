use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::{Base, Segment, SegmentType};
use crate::runtime::{BatteryInfo, BatteryState};

const DEFAULT_TEMPLATE: &str = " {{ .Percentage }}% ";

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
struct BatteryData {
    #[serde(flatten)]
    info: BatteryInfo,
    /// Display form of the state, e.g. `Not Charging`.
    status: String,
}

pub struct Battery {
    base: Base,
    data: BatteryData,
}

impl Battery {
    /// Option: hide the segment at or above this percentage when not discharging.
    pub const HIDE_ABOVE: &'static str = "hide_above";

    pub fn new(base: Base) -> Self {
        Self {
            base,
            data: BatteryData::default(),
        }
    }
}

impl Segment for Battery {
    fn kind(&self) -> SegmentType {
        SegmentType::Battery
    }

    fn enabled(&mut self) -> bool {
        let info = match self.base.env.battery_state() {
            Ok(info) => info,
            Err(e) => {
                debug!("Battery unavailable: {}", e);
                return false;
            }
        };

        let hide_above = self.base.options.int(Self::HIDE_ABOVE, 101);
        if i64::from(info.percentage) >= hide_above && info.state != BatteryState::Discharging {
            return false;
        }

        self.data = BatteryData {
            status: info.state.to_string(),
            info,
        };
        true
    }

    fn template(&self) -> &str {
        self.base.template(DEFAULT_TEMPLATE)
    }

    fn data(&self) -> Value {
        serde_json::to_value(&self.data).unwrap_or_default()
    }
}
