//! Device emulation catalog
//!
//! A fixed set of named viewport + user-agent profiles used for session
//! device emulation.

use crate::{Error, Result};

/// Immutable device emulation profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceProfile {
    pub name: &'static str,
    /// Viewport width in CSS pixels
    pub width: u32,
    /// Viewport height in CSS pixels
    pub height: u32,
    pub user_agent: &'static str,
}

impl DeviceProfile {
    /// iPhone 15 Pro Max size
    pub const MOBILE: Self = Self {
        name: "mobile",
        width: 430,
        height: 932,
        user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) \
                     AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1",
    };

    /// iPad Pro 12.9" size
    pub const IPAD: Self = Self {
        name: "ipad",
        width: 1024,
        height: 1366,
        user_agent: "Mozilla/5.0 (iPad; CPU OS 17_0 like Mac OS X) \
                     AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1",
    };

    /// Default desktop profile (1920x1080)
    pub const DESKTOP: Self = Self {
        name: "desktop",
        width: 1920,
        height: 1080,
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    };
}

/// Look up a device profile by name
///
/// Names are case-insensitive; `tablet` is accepted as an alias for `ipad`
/// and an empty name falls back to `desktop`. An unknown name is a fatal
/// configuration error at session-creation time.
pub fn lookup(name: &str) -> Result<DeviceProfile> {
    let normalized = name.trim().to_lowercase();
    let key = if normalized.is_empty() {
        "desktop"
    } else {
        normalized.as_str()
    };

    match key {
        "mobile" => Ok(DeviceProfile::MOBILE),
        "ipad" | "tablet" => Ok(DeviceProfile::IPAD),
        "desktop" => Ok(DeviceProfile::DESKTOP),
        _ => Err(Error::configuration(format!(
            "Unsupported device type: {}. Supported types: mobile, ipad, tablet, desktop",
            name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        for name in ["mobile", "MOBILE", "Mobile", " mobile "] {
            let profile = lookup(name).unwrap();
            assert_eq!(profile, DeviceProfile::MOBILE);
        }

        assert_eq!(lookup("DESKTOP").unwrap(), DeviceProfile::DESKTOP);
        assert_eq!(lookup("iPad").unwrap(), DeviceProfile::IPAD);
    }

    #[test]
    fn test_tablet_is_ipad_alias() {
        assert_eq!(lookup("tablet").unwrap(), lookup("ipad").unwrap());
        assert_eq!(lookup("Tablet").unwrap().name, "ipad");
    }

    #[test]
    fn test_catalog_viewports() {
        let mobile = lookup("mobile").unwrap();
        assert_eq!((mobile.width, mobile.height), (430, 932));

        let ipad = lookup("ipad").unwrap();
        assert_eq!((ipad.width, ipad.height), (1024, 1366));

        let desktop = lookup("desktop").unwrap();
        assert_eq!((desktop.width, desktop.height), (1920, 1080));
    }

    #[test]
    fn test_empty_name_defaults_to_desktop() {
        assert_eq!(lookup("").unwrap(), DeviceProfile::DESKTOP);
        assert_eq!(lookup("  ").unwrap(), DeviceProfile::DESKTOP);
    }

    #[test]
    fn test_unknown_device_rejected() {
        let err = lookup("smartwatch").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("Unsupported device type: smartwatch"));
    }

    #[test]
    fn test_user_agents_match_device_class() {
        assert!(DeviceProfile::MOBILE.user_agent.contains("iPhone"));
        assert!(DeviceProfile::IPAD.user_agent.contains("iPad"));
        assert!(DeviceProfile::DESKTOP.user_agent.contains("Windows NT"));
    }
}
