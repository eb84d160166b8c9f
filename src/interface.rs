//! Network interface checks
//!
//! Injection only makes sense on an interface in monitor mode, whose link
//! type is 802.11 + radiotap. The loopback interface is accepted as-is so a
//! replay can be dry-run without a radio.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::{ReplayError, Result};

/// Where the kernel lists network interfaces.
pub const SYSFS_NET: &str = "/sys/class/net";

/// ARP hardware type of an 802.11 interface delivering radiotap headers.
pub const ARPHRD_IEEE80211_RADIOTAP: u32 = 803;

/// Interface accepted without a link-type check.
pub const LOOPBACK: &str = "lo";

/// Longest interface name the kernel accepts (IFNAMSIZ minus the NUL).
pub const MAX_INTERFACE_NAME: usize = 15;

/// Reject names the kernel would refuse or that could smuggle extra
/// arguments into the channel command.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ReplayError::interface(name, "name is empty"));
    }
    if name.len() > MAX_INTERFACE_NAME {
        return Err(ReplayError::interface(
            name,
            format!("name longer than {} bytes", MAX_INTERFACE_NAME),
        ));
    }
    if let Some(bad) = name.chars().find(|c| c.is_whitespace() || matches!(c, ';' | '/' | '\0')) {
        return Err(ReplayError::interface(name, format!("name contains {:?}", bad)));
    }
    Ok(())
}

/// What sysfs reports about an interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceInfo {
    pub name: String,
    pub arp_type: u32,
}

impl InterfaceInfo {
    pub fn is_monitor(&self) -> bool {
        self.arp_type == ARPHRD_IEEE80211_RADIOTAP
    }

    pub fn is_loopback(&self) -> bool {
        self.name == LOOPBACK
    }
}

/// Look up `name` under `sysfs_root` and check that it can take injected
/// radiotap frames.
pub fn check_interface_at(sysfs_root: &Path, name: &str) -> Result<InterfaceInfo> {
    validate_name(name)?;

    let dir: PathBuf = sysfs_root.join(name);
    if !dir.is_dir() {
        let available = list_interfaces_at(sysfs_root)
            .map(|names| names.join(", "))
            .unwrap_or_else(|_| "none readable".to_string());
        return Err(ReplayError::interface(
            name,
            format!("not found under {} (available: {})", sysfs_root.display(), available),
        ));
    }

    let raw = std::fs::read_to_string(dir.join("type"))
        .map_err(|e| ReplayError::interface(name, format!("cannot read link type: {}", e)))?;
    let arp_type = raw
        .trim()
        .parse::<u32>()
        .map_err(|_| ReplayError::interface(name, format!("unexpected link type {:?}", raw.trim())))?;

    let info = InterfaceInfo { name: name.to_string(), arp_type };
    debug!("Interface {} has ARP type {}", name, arp_type);

    if !info.is_loopback() && !info.is_monitor() {
        return Err(ReplayError::interface(
            name,
            format!("link type {} is not 802.11 + radiotap, is it in monitor mode?", arp_type),
        ));
    }

    Ok(info)
}

/// [`check_interface_at`] against the live system.
pub fn check_interface(name: &str) -> Result<InterfaceInfo> {
    check_interface_at(Path::new(SYSFS_NET), name)
}

/// Names of all interfaces listed under `sysfs_root`, sorted.
pub fn list_interfaces_at(sysfs_root: &Path) -> Result<Vec<String>> {
    let entries = std::fs::read_dir(sysfs_root)
        .map_err(|e| ReplayError::interface(sysfs_root.display().to_string(), e.to_string()))?;

    let mut names: Vec<String> =
        entries.flatten().filter_map(|entry| entry.file_name().into_string().ok()).collect();
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fake_sysfs(entries: &[(&str, &str)]) -> TempDir {
        let root = TempDir::new().unwrap();
        for (name, arp_type) in entries {
            let dir = root.path().join(name);
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(dir.join("type"), format!("{}\n", arp_type)).unwrap();
        }
        root
    }

    #[test]
    fn names_are_validated() {
        assert!(validate_name("wlan0").is_ok());
        assert!(validate_name("wlxec086b1e3d7c").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("wlan0; reboot").is_err());
        assert!(validate_name("wlan 0").is_err());
        assert!(validate_name("../eth0").is_err());
        assert!(validate_name("averyveryverylongname").is_err());
    }

    #[test]
    fn monitor_interface_passes() {
        let sysfs = fake_sysfs(&[("wlan0mon", "803"), ("eth0", "1")]);
        let info = check_interface_at(sysfs.path(), "wlan0mon").unwrap();
        assert!(info.is_monitor());
    }

    #[test]
    fn managed_interface_is_rejected() {
        let sysfs = fake_sysfs(&[("eth0", "1")]);
        let result = check_interface_at(sysfs.path(), "eth0");
        assert!(matches!(result, Err(ReplayError::Interface { reason, .. }) if reason.contains("monitor")));
    }

    #[test]
    fn loopback_skips_the_link_type_check() {
        let sysfs = fake_sysfs(&[("lo", "772")]);
        let info = check_interface_at(sysfs.path(), "lo").unwrap();
        assert!(info.is_loopback());
    }

    #[test]
    fn missing_interface_is_reported() {
        let sysfs = fake_sysfs(&[("wlan0mon", "803"), ("eth0", "1")]);
        let result = check_interface_at(sysfs.path(), "wlan1");
        assert!(matches!(
            result,
            Err(ReplayError::Interface { reason, .. }) if reason.contains("available: eth0, wlan0mon")
        ));
        assert_eq!(list_interfaces_at(sysfs.path()).unwrap(), vec!["eth0", "wlan0mon"]);
    }
}
