//! Memory and load probes.

use serde::{Deserialize, Serialize};

use crate::error::ProbeError;

/// Memory usage and load averages. Memory figures are in bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SystemInfo {
    pub physical_total_memory: u64,
    pub physical_available_memory: u64,
    pub physical_free_memory: u64,
    pub physical_percent_used: f64,
    pub swap_total_memory: u64,
    pub swap_free_memory: u64,
    pub swap_percent_used: f64,
    pub load1: f64,
    pub load5: f64,
    pub load15: f64,
}

impl SystemInfo {
    /// Build from the contents of `/proc/meminfo` and, optionally, `/proc/loadavg`.
    pub fn parse(meminfo: &str, loadavg: Option<&str>) -> Result<Self, ProbeError> {
        let mut info = Self::default();

        for line in meminfo.lines() {
            let Some((key, rest)) = line.split_once(':') else {
                continue;
            };
            let kib: u64 = match rest.trim().trim_end_matches("kB").trim().parse() {
                Ok(kib) => kib,
                Err(_) => continue,
            };
            let bytes = kib * 1024;

            match key {
                "MemTotal" => info.physical_total_memory = bytes,
                "MemAvailable" => info.physical_available_memory = bytes,
                "MemFree" => info.physical_free_memory = bytes,
                "SwapTotal" => info.swap_total_memory = bytes,
                "SwapFree" => info.swap_free_memory = bytes,
                _ => {}
            }
        }

        if info.physical_total_memory == 0 {
            return Err(ProbeError::Parse {
                what: "meminfo",
                message: "MemTotal missing".to_string(),
            });
        }

        // Older kernels have no MemAvailable.
        if info.physical_available_memory == 0 {
            info.physical_available_memory = info.physical_free_memory;
        }

        info.physical_percent_used = percent_used(
            info.physical_total_memory,
            info.physical_available_memory,
        );
        info.swap_percent_used = percent_used(info.swap_total_memory, info.swap_free_memory);

        if let Some(loadavg) = loadavg {
            let mut loads = loadavg
                .split_whitespace()
                .take(3)
                .map(|value| value.parse::<f64>().unwrap_or_default());
            info.load1 = loads.next().unwrap_or_default();
            info.load5 = loads.next().unwrap_or_default();
            info.load15 = loads.next().unwrap_or_default();
        }

        Ok(info)
    }
}

fn percent_used(total: u64, free: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (total.saturating_sub(free)) as f64 / total as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEMINFO: &str = "MemTotal:       16000000 kB\n\
                           MemFree:         2000000 kB\n\
                           MemAvailable:    4000000 kB\n\
                           SwapTotal:       2000000 kB\n\
                           SwapFree:        1500000 kB\n";

    #[test]
    fn test_parse_meminfo() {
        let info = SystemInfo::parse(MEMINFO, Some("0.52 0.58 0.59 1/389 12345")).unwrap();

        assert_eq!(info.physical_total_memory, 16_000_000 * 1024);
        assert_eq!(info.physical_percent_used, 75.0);
        assert_eq!(info.swap_percent_used, 25.0);
        assert_eq!(info.load1, 0.52);
        assert_eq!(info.load15, 0.59);
    }

    #[test]
    fn test_missing_total_is_an_error() {
        assert!(SystemInfo::parse("SwapTotal: 0 kB\n", None).is_err());
    }

    #[test]
    fn test_no_swap() {
        let info = SystemInfo::parse("MemTotal: 100 kB\nMemAvailable: 50 kB\n", None).unwrap();
        assert_eq!(info.swap_percent_used, 0.0);
        assert_eq!(info.physical_percent_used, 50.0);
    }
}
