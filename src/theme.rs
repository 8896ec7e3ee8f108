use std::str::FromStr;

use tuirealm::ratatui::style::Color;

use crate::types::UrgencyBand;

/// Named list colours offered by the settings overlay, in cycle order.
pub const LIST_COLOR_NAMES: [&str; 8] = [
    "blue", "green", "yellow", "red", "cyan", "magenta", "white", "gray",
];

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum ThemePreset {
    #[default]
    Default,
    Light,
    Mono,
}

impl ThemePreset {
    pub const ALL: [Self; 3] = [Self::Default, Self::Light, Self::Mono];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Light => "light",
            Self::Mono => "mono",
        }
    }
}

impl FromStr for ThemePreset {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "default" | "dark" => Ok(Self::Default),
            "light" | "day" => Ok(Self::Light),
            "mono" | "monochrome" => Ok(Self::Mono),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub base: BasePalette,
    pub interactive: InteractivePalette,
    pub urgency: UrgencyPalette,
    pub lists: ListPalette,
    pub dialog: DialogPalette,
}

#[derive(Debug, Clone, Copy)]
pub struct BasePalette {
    pub text: Color,
    pub text_muted: Color,
    pub header: Color,
    pub accent: Color,
    pub danger: Color,
    pub highlight: Color,
}

#[derive(Debug, Clone, Copy)]
pub struct InteractivePalette {
    pub focus: Color,
    pub selected_bg: Color,
    pub border: Color,
}

#[derive(Debug, Clone, Copy)]
pub struct UrgencyPalette {
    pub overdue: Color,
    pub today: Color,
    pub soon: Color,
    pub week: Color,
    pub later: Color,
    pub undated: Color,
}

#[derive(Debug, Clone, Copy)]
pub struct ListPalette {
    pub colors: [Color; 8],
}

#[derive(Debug, Clone, Copy)]
pub struct DialogPalette {
    pub surface: Color,
    pub input_bg: Color,
    pub error: Color,
}

impl Theme {
    pub fn from_preset(preset: ThemePreset) -> Self {
        match preset {
            ThemePreset::Default => Self {
                base: BasePalette {
                    text: Color::White,
                    text_muted: Color::DarkGray,
                    header: Color::Cyan,
                    accent: Color::Magenta,
                    danger: Color::Red,
                    highlight: Color::Yellow,
                },
                interactive: InteractivePalette {
                    focus: Color::Cyan,
                    selected_bg: Color::Rgb(54, 48, 72),
                    border: Color::DarkGray,
                },
                urgency: UrgencyPalette {
                    overdue: Color::Red,
                    today: Color::LightRed,
                    soon: Color::Rgb(255, 165, 0),
                    week: Color::Yellow,
                    later: Color::Gray,
                    undated: Color::DarkGray,
                },
                lists: ListPalette {
                    colors: [
                        Color::Blue,
                        Color::Green,
                        Color::Yellow,
                        Color::Red,
                        Color::Cyan,
                        Color::Magenta,
                        Color::White,
                        Color::Gray,
                    ],
                },
                dialog: DialogPalette {
                    surface: Color::Rgb(36, 40, 56),
                    input_bg: Color::Rgb(48, 52, 70),
                    error: Color::LightRed,
                },
            },
            ThemePreset::Light => Self {
                base: BasePalette {
                    text: Color::Rgb(32, 38, 51),
                    text_muted: Color::Rgb(95, 105, 122),
                    header: Color::Rgb(37, 99, 235),
                    accent: Color::Rgb(2, 132, 199),
                    danger: Color::Rgb(185, 28, 28),
                    highlight: Color::Rgb(194, 65, 12),
                },
                interactive: InteractivePalette {
                    focus: Color::Rgb(37, 99, 235),
                    selected_bg: Color::Rgb(227, 237, 255),
                    border: Color::Rgb(196, 208, 224),
                },
                urgency: UrgencyPalette {
                    overdue: Color::Rgb(185, 28, 28),
                    today: Color::Rgb(220, 38, 38),
                    soon: Color::Rgb(234, 88, 12),
                    week: Color::Rgb(202, 138, 4),
                    later: Color::Rgb(71, 85, 105),
                    undated: Color::Rgb(148, 163, 184),
                },
                lists: ListPalette {
                    colors: [
                        Color::Rgb(37, 99, 235),
                        Color::Rgb(22, 163, 74),
                        Color::Rgb(202, 138, 4),
                        Color::Rgb(185, 28, 28),
                        Color::Rgb(14, 116, 144),
                        Color::Rgb(124, 58, 237),
                        Color::Rgb(32, 38, 51),
                        Color::Rgb(95, 105, 122),
                    ],
                },
                dialog: DialogPalette {
                    surface: Color::Rgb(255, 255, 255),
                    input_bg: Color::Rgb(241, 245, 249),
                    error: Color::Rgb(185, 28, 28),
                },
            },
            ThemePreset::Mono => Self {
                base: BasePalette {
                    text: Color::White,
                    text_muted: Color::Gray,
                    header: Color::White,
                    accent: Color::Gray,
                    danger: Color::White,
                    highlight: Color::White,
                },
                interactive: InteractivePalette {
                    focus: Color::White,
                    selected_bg: Color::Rgb(35, 35, 35),
                    border: Color::Gray,
                },
                urgency: UrgencyPalette {
                    overdue: Color::White,
                    today: Color::White,
                    soon: Color::Gray,
                    week: Color::Gray,
                    later: Color::DarkGray,
                    undated: Color::DarkGray,
                },
                lists: ListPalette {
                    colors: [Color::White; 8],
                },
                dialog: DialogPalette {
                    surface: Color::Rgb(26, 26, 26),
                    input_bg: Color::Rgb(40, 40, 40),
                    error: Color::White,
                },
            },
        }
    }

    pub fn urgency_color(&self, band: UrgencyBand) -> Color {
        match band {
            UrgencyBand::Overdue => self.urgency.overdue,
            UrgencyBand::DueToday => self.urgency.today,
            UrgencyBand::DueSoon => self.urgency.soon,
            UrgencyBand::DueThisWeek => self.urgency.week,
            UrgencyBand::Later => self.urgency.later,
            UrgencyBand::NoDueDate => self.urgency.undated,
        }
    }

    /// Resolves a configured colour name, falling back to the accent colour.
    pub fn list_color(&self, name: &str) -> Color {
        LIST_COLOR_NAMES
            .iter()
            .position(|candidate| candidate.eq_ignore_ascii_case(name.trim()))
            .map(|index| self.lists.colors[index])
            .unwrap_or(self.base.accent)
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::from_preset(ThemePreset::Default)
    }
}

/// Colour name used for a list that has none configured.
pub fn default_list_color(category_index: usize) -> &'static str {
    LIST_COLOR_NAMES[category_index % LIST_COLOR_NAMES.len()]
}

/// The colour after `current` in [`LIST_COLOR_NAMES`].
pub fn next_list_color(current: &str) -> &'static str {
    let index = LIST_COLOR_NAMES
        .iter()
        .position(|name| name.eq_ignore_ascii_case(current.trim()))
        .map(|index| index + 1)
        .unwrap_or(0);
    LIST_COLOR_NAMES[index % LIST_COLOR_NAMES.len()]
}
