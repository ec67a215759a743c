//! Device details appended to request messages

use serde::{Deserialize, Serialize};

/// OS and hardware description of the requesting device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// OS release string (e.g. "14")
    pub os_release: String,
    /// Android API level, when known
    pub sdk_int: Option<u32>,
    pub manufacturer: String,
    pub model: String,
    pub product: String,
}

impl DeviceInfo {
    /// Describe the host this process runs on
    pub fn current() -> Self {
        Self {
            os_release: std::env::consts::OS.to_string(),
            sdk_int: None,
            manufacturer: "unknown".to_string(),
            model: std::env::consts::ARCH.to_string(),
            product: std::env::consts::FAMILY.to_string(),
        }
    }

    /// Release codename for the API level, empty when unknown
    pub fn os_name(&self) -> &'static str {
        self.sdk_int.map(os_version_name).unwrap_or("")
    }
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self::current()
    }
}

/// Android release codename for an API level
pub fn os_version_name(sdk_int: u32) -> &'static str {
    match sdk_int {
        1 | 2 => "Base",
        3 => "Cupcake",
        4 => "Donut",
        5..=7 => "Eclair",
        8 => "Froyo",
        9 | 10 => "Gingerbread",
        11..=13 => "Honeycomb",
        14 | 15 => "Ice Cream Sandwich",
        16..=18 => "Jelly Bean",
        19 | 20 => "KitKat",
        21 | 22 => "Lollipop",
        23 => "Marshmallow",
        24 | 25 => "Nougat",
        26 | 27 => "Oreo",
        28 => "Pie",
        29 => "Android 10",
        30 => "Android 11",
        31 | 32 => "Android 12",
        33 => "Android 13",
        34 => "Android 14",
        35 => "Android 15",
        36 => "Android 16",
        _ => "",
    }
}
