// SPDX-License-Identifier: GPL-3.0-only

//! Well-known directory categories below a storage root

use serde::{Deserialize, Serialize};

/// Directory category
///
/// Every category except [`DirectoryCategory::SystemRingtones`] is a fixed
/// subdirectory of the storage root. System ringtones live wherever the
/// current ringtone setting points and only exist on internal storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectoryCategory {
    Images,
    Sounds,
    Videos,
    Camera,
    Downloads,
    Music,
    Documents,
    Others,
    SystemRingtones,
}

impl DirectoryCategory {
    pub const ALL: [DirectoryCategory; 9] = [
        DirectoryCategory::Images,
        DirectoryCategory::Sounds,
        DirectoryCategory::Videos,
        DirectoryCategory::Camera,
        DirectoryCategory::Downloads,
        DirectoryCategory::Music,
        DirectoryCategory::Documents,
        DirectoryCategory::Others,
        DirectoryCategory::SystemRingtones,
    ];

    /// Subdirectory below the storage root, `None` for categories resolved
    /// through user settings
    pub fn subpath(self) -> Option<&'static str> {
        match self {
            DirectoryCategory::Images => Some("Images"),
            DirectoryCategory::Sounds => Some("Sounds"),
            DirectoryCategory::Videos => Some("Videos"),
            DirectoryCategory::Camera => Some("DCIM"),
            DirectoryCategory::Downloads => Some("Downloads"),
            DirectoryCategory::Music => Some("Music"),
            DirectoryCategory::Documents => Some("Documents"),
            DirectoryCategory::Others => Some("Others"),
            DirectoryCategory::SystemRingtones => None,
        }
    }
}

impl TryFrom<i32> for DirectoryCategory {
    /// The rejected raw value
    type Error = i32;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        usize::try_from(raw)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
            .ok_or(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_maps_to_dcim() {
        assert_eq!(DirectoryCategory::Camera.subpath(), Some("DCIM"));
        assert_eq!(DirectoryCategory::SystemRingtones.subpath(), None);
    }

    #[test]
    fn raw_values_follow_declaration_order() {
        assert_eq!(DirectoryCategory::try_from(0), Ok(DirectoryCategory::Images));
        assert_eq!(
            DirectoryCategory::try_from(8),
            Ok(DirectoryCategory::SystemRingtones)
        );
        assert_eq!(DirectoryCategory::try_from(9), Err(9));
        assert_eq!(DirectoryCategory::try_from(-1), Err(-1));
    }
}
