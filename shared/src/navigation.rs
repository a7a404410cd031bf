use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    #[default]
    Home,
    Map,
    #[serde(rename = "ai")]
    Assistant,
    Tracking,
    Resources,
    Profile,
}

impl Screen {
    pub const ALL: [Screen; 6] = [
        Screen::Home,
        Screen::Map,
        Screen::Assistant,
        Screen::Tracking,
        Screen::Resources,
        Screen::Profile,
    ];

    pub const fn id(self) -> &'static str {
        match self {
            Screen::Home => "home",
            Screen::Map => "map",
            Screen::Assistant => "ai",
            Screen::Tracking => "tracking",
            Screen::Resources => "resources",
            Screen::Profile => "profile",
        }
    }

    /// Bottom navigation label.
    pub const fn label(self) -> &'static str {
        match self {
            Screen::Home => "Home",
            Screen::Map => "Map",
            Screen::Assistant => "Assistant",
            Screen::Tracking => "Tracking",
            Screen::Resources => "Resources",
            Screen::Profile => "Profile",
        }
    }

    /// Header title. Home shows the user's name instead.
    pub const fn title(self) -> Option<&'static str> {
        match self {
            Screen::Home => None,
            Screen::Map => Some("Community Safety Map"),
            Screen::Assistant => Some("AI Safety Assistant"),
            Screen::Tracking => Some("Guardian Live Tracking"),
            Screen::Resources => Some("Safety Resources"),
            Screen::Profile => Some("My Profile"),
        }
    }

    pub const fn description(self) -> Option<&'static str> {
        match self {
            Screen::Map => Some("Explore safe routes and view crime hotspots."),
            Screen::Assistant => Some("Your personal guide for staying safe."),
            Screen::Tracking => Some("Share your location with trusted contacts."),
            Screen::Resources => Some("Empower yourself with knowledge."),
            Screen::Home | Screen::Profile => None,
        }
    }

    /// Profile is reached from its own button, not the tab row.
    pub const fn in_tab_bar(self) -> bool {
        !matches!(self, Screen::Profile)
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown screen '{0}'")]
pub struct UnknownScreen(pub String);

impl FromStr for Screen {
    type Err = UnknownScreen;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "home" => Ok(Screen::Home),
            "map" => Ok(Screen::Map),
            "ai" | "assistant" => Ok(Screen::Assistant),
            "tracking" => Ok(Screen::Tracking),
            "resources" => Ok(Screen::Resources),
            "profile" => Ok(Screen::Profile),
            other => Err(UnknownScreen(other.to_string())),
        }
    }
}

/// What the shell should show right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visible {
    Screen(Screen),
    FakeCall,
}

/// Outcome of a navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    /// The previous screen's local state must be torn down.
    Left { from: Screen, to: Screen },
    /// Ignored while the call overlay is up.
    Suppressed,
}

/// Top-level screen selection. The only cross-screen state in the app.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Navigator {
    active: Screen,
    fake_call: bool,
}

impl Navigator {
    pub fn active(&self) -> Screen {
        self.active
    }

    pub fn fake_call_shown(&self) -> bool {
        self.fake_call
    }

    pub fn visible(&self) -> Visible {
        if self.fake_call {
            Visible::FakeCall
        } else {
            Visible::Screen(self.active)
        }
    }

    pub fn navigate(&mut self, screen: Screen) -> Transition {
        if self.fake_call {
            return Transition::Suppressed;
        }
        if self.active == screen {
            return Transition::Unchanged;
        }
        let from = std::mem::replace(&mut self.active, screen);
        Transition::Left { from, to: screen }
    }

    pub fn back(&mut self) -> Transition {
        self.navigate(Screen::Home)
    }

    /// Returns false when the overlay was already up.
    pub fn show_fake_call(&mut self) -> bool {
        !std::mem::replace(&mut self.fake_call, true)
    }

    /// Restores whatever screen was active before the overlay.
    pub fn dismiss_fake_call(&mut self) -> bool {
        std::mem::replace(&mut self.fake_call, false)
    }

    /// Home has no back affordance.
    pub fn show_back(&self) -> bool {
        !self.fake_call && self.active != Screen::Home
    }
}
