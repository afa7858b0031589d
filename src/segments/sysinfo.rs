use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::{Base, Segment, SegmentType};
use crate::runtime::SystemInfo;

/// Option: decimals shown by the default template.
pub const PRECISION: &str = "precision";

const DEFAULT_PRECISION: i64 = 2;
const DEFAULT_TEMPLATE: &str = " {{ round .PhysicalPercentUsed .Precision }} ";

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
struct SysInfoData {
    #[serde(flatten)]
    info: SystemInfo,
    precision: i64,
}

/// Memory usage and load.
pub struct SysInfo {
    base: Base,
    data: SysInfoData,
}

impl SysInfo {
    pub fn new(base: Base) -> Self {
        Self {
            base,
            data: SysInfoData::default(),
        }
    }
}

impl Segment for SysInfo {
    fn kind(&self) -> SegmentType {
        SegmentType::SysInfo
    }

    fn enabled(&mut self) -> bool {
        let info = match self.base.env.system_info() {
            Ok(info) => info,
            Err(e) => {
                debug!("System info unavailable: {}", e);
                return false;
            }
        };

        // A probe that read nothing useful.
        if info.physical_percent_used == 0.0 && info.swap_percent_used == 0.0 {
            return false;
        }

        self.data = SysInfoData {
            info,
            precision: self.base.options.int(PRECISION, DEFAULT_PRECISION),
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

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::runtime::mock::MockEnvironment;
    use crate::segments::Options;

    fn sysinfo(info: Option<SystemInfo>, options: Options) -> SysInfo {
        let mut env = MockEnvironment::new("bash", "/");
        env.system_info = info;
        SysInfo::new(Base::new(options, Arc::new(env)))
    }

    #[test]
    fn test_enabled_with_usage() {
        let info = SystemInfo {
            physical_percent_used: 45.678,
            swap_percent_used: 1.0,
            ..Default::default()
        };
        let mut segment = sysinfo(Some(info), Options::new());
        assert!(segment.enabled());

        let data = segment.data();
        assert_eq!(data["Precision"], 2);
        assert_eq!(data["PhysicalPercentUsed"], 45.678);
        assert_eq!(segment.template(), DEFAULT_TEMPLATE);
    }

    #[test]
    fn test_precision_option() {
        let info = SystemInfo {
            physical_percent_used: 10.0,
            ..Default::default()
        };
        let mut segment = sysinfo(Some(info), Options::new().with(PRECISION, 0));
        assert!(segment.enabled());
        assert_eq!(segment.data()["Precision"], 0);
    }

    #[test]
    fn test_disabled_when_nothing_used() {
        let mut segment = sysinfo(Some(SystemInfo::default()), Options::new());
        assert!(!segment.enabled());
    }

    #[test]
    fn test_disabled_when_probe_fails() {
        assert!(!sysinfo(None, Options::new()).enabled());
    }
}
