use serde::{Deserialize, Serialize};

/// Sample rates offered by the sound settings.
pub const SAMPLE_RATES: [u32; 5] = [22050, 44100, 48000, 88200, 96000];

/// Label style for hierarchical numbering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberingStyle {
    /// `1.2.`
    #[default]
    Dotted,
    /// `1-2)`
    Dashed,
    /// `I.II.`
    Roman,
    /// `•`
    Bullet,
    Off,
}

impl NumberingStyle {
    /// Index used by the plan file (`NumberingSequence`).
    pub fn index(self) -> i64 {
        match self {
            NumberingStyle::Dotted => 0,
            NumberingStyle::Dashed => 1,
            NumberingStyle::Roman => 2,
            NumberingStyle::Bullet => 3,
            NumberingStyle::Off => 4,
        }
    }

    pub fn from_index(index: i64) -> Option<NumberingStyle> {
        match index {
            0 => Some(NumberingStyle::Dotted),
            1 => Some(NumberingStyle::Dashed),
            2 => Some(NumberingStyle::Roman),
            3 => Some(NumberingStyle::Bullet),
            4 => Some(NumberingStyle::Off),
            _ => None,
        }
    }

    /// Render a numbering prefix such as `[1, 2]` into label text.
    ///
    /// With `ignore_top_level`, depth-0 cards get no label and the first
    /// component is dropped from every deeper label.
    pub fn format(self, prefix: &[usize], ignore_top_level: bool) -> String {
        let parts = if ignore_top_level {
            if prefix.len() <= 1 {
                return String::new();
            }
            &prefix[1..]
        } else {
            prefix
        };
        if parts.is_empty() {
            return String::new();
        }

        match self {
            NumberingStyle::Dotted => parts.iter().map(|n| format!("{}.", n)).collect(),
            NumberingStyle::Dashed => {
                let joined: Vec<String> = parts.iter().map(|n| n.to_string()).collect();
                format!("{})", joined.join("-"))
            }
            NumberingStyle::Roman => parts.iter().map(|n| format!("{}.", to_roman(*n))).collect(),
            NumberingStyle::Bullet => "•".to_string(),
            NumberingStyle::Off => String::new(),
        }
    }
}

fn to_roman(mut n: usize) -> String {
    const TABLE: [(usize, &str); 13] = [
        (1000, "M"),
        (900, "CM"),
        (500, "D"),
        (400, "CD"),
        (100, "C"),
        (90, "XC"),
        (50, "L"),
        (40, "XL"),
        (10, "X"),
        (9, "IX"),
        (5, "V"),
        (4, "IV"),
        (1, "I"),
    ];
    let mut out = String::new();
    for (value, glyph) in TABLE {
        while n >= value {
            out.push_str(glyph);
            n -= value;
        }
    }
    out
}

/// Per-plan settings, persisted inside the plan file.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectSettings {
    pub numbering: NumberingStyle,
    pub numbering_ignore_top_level: bool,
    /// Save on every significant change instead of only flagging the plan as modified.
    pub auto_save: bool,
    pub grid_visible: bool,
    pub theme: String,
    sample_rate: u32,
    pub sample_buffer: u32,
    task_shadow: u8,
    pub outline_cards: bool,
    pub show_icons: bool,
    pub pulsing_selection: bool,
    pub auto_reload_themes: bool,
    /// Persist the playing state of sound cards.
    pub save_sounds_playing: bool,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        ProjectSettings {
            numbering: NumberingStyle::Dotted,
            numbering_ignore_top_level: false,
            auto_save: false,
            grid_visible: true,
            theme: DEFAULT_THEME.to_string(),
            sample_rate: 44100,
            sample_buffer: 512,
            task_shadow: 2,
            outline_cards: true,
            show_icons: true,
            pulsing_selection: true,
            auto_reload_themes: false,
            save_sounds_playing: false,
        }
    }
}

impl ProjectSettings {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Accepts only the rates in [`SAMPLE_RATES`]; returns false otherwise.
    pub fn set_sample_rate(&mut self, rate: u32) -> bool {
        if SAMPLE_RATES.contains(&rate) {
            self.sample_rate = rate;
            true
        } else {
            false
        }
    }

    pub fn task_shadow(&self) -> u8 {
        self.task_shadow
    }

    /// 0 = off, 1 = flat, 2 = smooth, 3 = 3D.
    pub fn set_task_shadow(&mut self, shadow: i64) {
        self.task_shadow = shadow.clamp(0, 3) as u8;
    }
}

/// Theme used for new plans and when a named theme is unknown.
pub const DEFAULT_THEME: &str = "Sunlight";

/// Program-wide settings (settings.toml), shared by every plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Most recently opened plans, most recent first.
    #[serde(default)]
    pub recent_plans: Vec<String>,
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
    #[serde(default)]
    pub auto_load_last_plan: bool,
    #[serde(default = "default_theme")]
    pub theme: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        AppSettings {
            recent_plans: Vec::new(),
            recent_limit: default_recent_limit(),
            auto_load_last_plan: false,
            theme: default_theme(),
        }
    }
}

fn default_recent_limit() -> usize {
    10
}

fn default_theme() -> String {
    DEFAULT_THEME.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_and_dashed_labels() {
        assert_eq!(NumberingStyle::Dotted.format(&[1, 2, 3], false), "1.2.3.");
        assert_eq!(NumberingStyle::Dashed.format(&[1, 2], false), "1-2)");
        assert_eq!(NumberingStyle::Dashed.format(&[4], false), "4)");
    }

    #[test]
    fn roman_labels() {
        assert_eq!(NumberingStyle::Roman.format(&[1, 2], false), "I.II.");
        assert_eq!(NumberingStyle::Roman.format(&[14], false), "XIV.");
        assert_eq!(to_roman(1994), "MCMXCIV");
    }

    #[test]
    fn bullet_and_off() {
        assert_eq!(NumberingStyle::Bullet.format(&[3, 1], false), "•");
        assert_eq!(NumberingStyle::Off.format(&[3, 1], false), "");
    }

    #[test]
    fn ignore_top_level_drops_first_component() {
        assert_eq!(NumberingStyle::Dotted.format(&[2], true), "");
        assert_eq!(NumberingStyle::Dotted.format(&[2, 1], true), "1.");
        assert_eq!(NumberingStyle::Bullet.format(&[2], true), "");
    }

    #[test]
    fn style_index_round_trips() {
        for i in 0..5 {
            assert_eq!(NumberingStyle::from_index(i).unwrap().index(), i);
        }
        assert!(NumberingStyle::from_index(9).is_none());
    }

    #[test]
    fn sample_rate_rejects_unknown_values() {
        let mut s = ProjectSettings::default();
        assert!(s.set_sample_rate(48000));
        assert!(!s.set_sample_rate(12345));
        assert_eq!(s.sample_rate(), 48000);
    }

    #[test]
    fn app_settings_defaults_from_empty_toml() {
        let s: AppSettings = toml::from_str("").unwrap();
        assert_eq!(s, AppSettings::default());
        assert_eq!(s.recent_limit, 10);
    }
}
