/// Colour role of a stat card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accent {
    Primary,
    Success,
    Info,
    Warning,
    Neutral,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatCard {
    pub title: String,
    pub value: String,
    pub caption: Option<String>,
    pub accent: Accent,
}

impl StatCard {
    pub fn new(title: &str, value: String, accent: Accent) -> Self {
        Self {
            title: title.to_string(),
            value,
            caption: None,
            accent,
        }
    }

    pub fn with_caption(mut self, caption: String) -> Self {
        self.caption = Some(caption);
        self
    }
}

/// One bar of the mode-split chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ModeShare {
    pub mode: String,
    pub count: u64,
    pub percentage: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableView {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemporalPoint {
    pub label: String,
    pub trips: u64,
}

/// Titled block of label/value lines.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: String,
    pub lines: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Badge {
    pub label: String,
    pub live: bool,
}
