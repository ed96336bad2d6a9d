use crate::api::models::{DashboardWidget, Trend};

impl Trend {
    /// Symbolic icon drawn next to the change value.
    pub fn icon_name(self) -> &'static str {
        match self {
            Self::Up => "go-up-symbolic",
            Self::Down => "go-down-symbolic",
            Self::Neutral => "list-remove-symbolic",
        }
    }

    /// libadwaita style class giving the indicator its color.
    pub fn css_class(self) -> &'static str {
        match self {
            Self::Up => "success",
            Self::Down => "error",
            Self::Neutral => "dim-label",
        }
    }

    fn from_sign(change: f64) -> Self {
        if change > 0.0 {
            Self::Up
        } else if change < 0.0 {
            Self::Down
        } else {
            Self::Neutral
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendIndicator {
    pub trend: Trend,
    pub magnitude: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricCardView {
    pub title: String,
    pub value: String,
    pub subtitle: Option<String>,
    pub indicator: Option<TrendIndicator>,
}

impl MetricCardView {
    /// The indicator appears only when a change is present. An explicit
    /// `trend` picks the styling as given; without one the sign decides.
    /// Sign and trend are not cross-checked.
    pub fn new(widget: &DashboardWidget) -> Self {
        let indicator = widget.change.map(|change| {
            let trend = widget.trend.unwrap_or_else(|| Trend::from_sign(change));
            let magnitude = change.abs();
            TrendIndicator {
                trend,
                magnitude,
                label: format!("{magnitude}%"),
            }
        });
        Self {
            title: widget.title.clone(),
            value: widget.value.clone(),
            subtitle: widget.subtitle.clone(),
            indicator,
        }
    }
}
