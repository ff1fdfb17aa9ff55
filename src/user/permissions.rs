use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    ViewStats,
    RecordEvents,
    SubmitRatings,
    ViewLabelAnalytics,
}

impl Permission {
    pub fn as_int(self) -> i32 {
        match self {
            Permission::ViewStats => 1,
            Permission::RecordEvents => 2,
            Permission::SubmitRatings => 3,
            Permission::ViewLabelAnalytics => 4,
        }
    }

    pub fn from_int(value: i32) -> Option<Self> {
        match value {
            1 => Some(Permission::ViewStats),
            2 => Some(Permission::RecordEvents),
            3 => Some(Permission::SubmitRatings),
            4 => Some(Permission::ViewLabelAnalytics),
            _ => None,
        }
    }
}

const ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::ViewStats,
    Permission::RecordEvents,
    Permission::SubmitRatings,
    Permission::ViewLabelAnalytics,
];
const LABEL_PERMISSIONS: &[Permission] = &[
    Permission::ViewStats,
    Permission::RecordEvents,
    Permission::SubmitRatings,
    Permission::ViewLabelAnalytics,
];
const REGULAR_PERMISSIONS: &[Permission] = &[
    Permission::ViewStats,
    Permission::RecordEvents,
    Permission::SubmitRatings,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRole {
    Admin,
    Label,
    Regular,
}

impl UserRole {
    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            UserRole::Admin => ADMIN_PERMISSIONS,
            UserRole::Label => LABEL_PERMISSIONS,
            UserRole::Regular => REGULAR_PERMISSIONS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Admin => "Admin",
            UserRole::Label => "Label",
            UserRole::Regular => "Regular",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "admin" => Some(UserRole::Admin),
            "label" => Some(UserRole::Label),
            "regular" => Some(UserRole::Regular),
            _ => None,
        }
    }
}
