use serde::{Deserialize, Serialize};
use std::fmt;

/// Окно из снимка оконного менеджера.
///
/// Весь набор окон заменяется целиком при каждом обновлении; окно исчезает,
/// как только его нет в следующем снимке.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WindowEntity {
    pub id: u64,
    #[serde(rename = "app")]
    pub owner: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "display", default)]
    pub display_index: Option<u32>,
    #[serde(rename = "space", default)]
    pub space_index: u32,
    #[serde(rename = "has-focus", default)]
    pub focused: bool,
    #[serde(rename = "is-native-fullscreen", default)]
    pub native_fullscreen: bool,
}

impl WindowEntity {
    pub fn new(id: u64, owner: impl Into<String>) -> Self {
        Self {
            id,
            owner: owner.into(),
            title: String::new(),
            display_index: None,
            space_index: 0,
            focused: false,
            native_fullscreen: false,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_display(mut self, display: u32) -> Self {
        self.display_index = Some(display);
        self
    }

    pub fn with_space(mut self, space: u32) -> Self {
        self.space_index = space;
        self
    }

    pub fn focused(mut self) -> Self {
        self.focused = true;
        self
    }
}

impl fmt::Display for WindowEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.title.is_empty() {
            write!(f, "#{} {}", self.id, self.owner)
        } else {
            write!(f, "#{} {} \"{}\"", self.id, self.owner, self.title)
        }
    }
}

/// Рабочий стол (space)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SpaceInfo {
    pub index: u32,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub display: u32,
    #[serde(default)]
    pub windows: Vec<u64>,
    #[serde(default)]
    pub has_focus: bool,
}

/// Физический дисплей
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DisplayInfo {
    pub id: u64,
    pub index: u32,
    #[serde(default)]
    pub spaces: Vec<u32>,
    #[serde(default)]
    pub has_focus: bool,
}

/// Вид запроса к оконному менеджеру; у каждого свой слот кэша.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    Windows,
    Spaces,
    Displays,
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::Windows => "windows",
            QueryKind::Spaces => "spaces",
            QueryKind::Displays => "displays",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
