//! Pages of the application shell and their navigation entries.

use serde::Serialize;
use std::str::FromStr;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// A page the shell can mount. Exactly one is mounted at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "kebab-case")]
pub enum Page {
    Dashboard,
    Scanner,
    History,
    Reports,
    EditProfile,
}

impl Page {
    /// Navigation order.
    pub const ALL: [Page; 5] = [
        Page::Dashboard,
        Page::Scanner,
        Page::History,
        Page::Reports,
        Page::EditProfile,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Page::Dashboard => "dashboard",
            Page::Scanner => "scanner",
            Page::History => "history",
            Page::Reports => "reports",
            Page::EditProfile => "edit-profile",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Page::Dashboard => "Dashboard",
            Page::Scanner => "Scanner",
            Page::History => "History",
            Page::Reports => "Reports",
            Page::EditProfile => "Edit Profile",
        }
    }

    /// Resolve a page id, falling back to the dashboard for unknown ids.
    pub fn from_id(id: &str) -> Self {
        id.parse().unwrap_or(Page::Dashboard)
    }
}

impl FromStr for Page {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Page::ALL.into_iter().find(|p| p.id() == s).ok_or(())
    }
}

/// One navigation entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct NavItem {
    pub id: &'static str,
    pub label: &'static str,
    pub active: bool,
}

/// Navigation entries with `current` marked active.
pub fn nav_items(current: Page) -> Vec<NavItem> {
    Page::ALL
        .into_iter()
        .map(|page| NavItem {
            id: page.id(),
            label: page.label(),
            active: page == current,
        })
        .collect()
}
