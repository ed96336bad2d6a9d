use crate::api::models::{DashboardWidget, RoutineBlock, RoutineStatus, Trend};

fn completed(blocks: &[RoutineBlock]) -> usize {
    blocks
        .iter()
        .filter(|r| r.status == RoutineStatus::Completed)
        .count()
}

/// Inputs for the dashboard's metric row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DashboardCounts {
    pub conversations: usize,
    pub unread: u64,
    pub routines_today: usize,
    pub completed_today: usize,
    pub completed_yesterday: Option<usize>,
}

impl DashboardCounts {
    /// `yesterday` is `None` when the previous day could not be loaded; the
    /// Completed card then shows no change.
    pub fn from_routines(
        conversations: usize,
        unread: u64,
        today: &[RoutineBlock],
        yesterday: Option<&[RoutineBlock]>,
    ) -> Self {
        Self {
            conversations,
            unread,
            routines_today: today.len(),
            completed_today: completed(today),
            completed_yesterday: yesterday.map(completed),
        }
    }
}

pub fn widgets(counts: &DashboardCounts) -> Vec<DashboardWidget> {
    let completion = if counts.routines_today == 0 {
        None
    } else {
        Some(format!(
            "{}% of today's plan",
            counts.completed_today * 100 / counts.routines_today
        ))
    };
    let completed_change = counts
        .completed_yesterday
        .map(|prev| counts.completed_today as f64 - prev as f64);

    vec![
        DashboardWidget {
            title: "Conversations".into(),
            value: counts.conversations.to_string(),
            ..DashboardWidget::default()
        },
        DashboardWidget {
            title: "Unread messages".into(),
            value: counts.unread.to_string(),
            subtitle: (counts.unread > 0).then(|| "waiting for a reply".to_string()),
            ..DashboardWidget::default()
        },
        DashboardWidget {
            title: "Routines today".into(),
            value: counts.routines_today.to_string(),
            ..DashboardWidget::default()
        },
        DashboardWidget {
            title: "Completed".into(),
            value: counts.completed_today.to_string(),
            subtitle: completion,
            change: completed_change,
            trend: completed_change.map(|c| {
                if c > 0.0 {
                    Trend::Up
                } else if c < 0.0 {
                    Trend::Down
                } else {
                    Trend::Neutral
                }
            }),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::EffortLevel;

    fn block(id: &str, status: RoutineStatus) -> RoutineBlock {
        RoutineBlock {
            id: id.into(),
            coach_id: "coach-1".into(),
            client_id: None,
            title: "Intervals".into(),
            block_type: "cardio".into(),
            effort_level: EffortLevel::Medium,
            status,
            start_time: "2025-01-31T07:00:00Z".parse().unwrap(),
            end_time: "2025-01-31T07:30:00Z".parse().unwrap(),
            location: None,
            notes: None,
        }
    }

    #[test]
    fn builds_four_cards() {
        let counts = DashboardCounts {
            conversations: 12,
            unread: 3,
            routines_today: 4,
            completed_today: 1,
            completed_yesterday: Some(3),
        };
        let cards = widgets(&counts);
        assert_eq!(cards.len(), 4);
        assert_eq!(cards[1].value, "3");
        assert_eq!(cards[1].subtitle.as_deref(), Some("waiting for a reply"));
        assert_eq!(cards[3].subtitle.as_deref(), Some("25% of today's plan"));
        assert_eq!(cards[3].change, Some(-2.0));
        assert_eq!(cards[3].trend, Some(Trend::Down));
    }

    #[test]
    fn empty_day_has_no_completion_subtitle() {
        let counts = DashboardCounts::from_routines(0, 0, &[], None);
        let cards = widgets(&counts);
        assert_eq!(cards[3].subtitle, None);
        assert_eq!(cards[3].change, None);
        assert_eq!(cards[1].subtitle, None);
    }

    #[test]
    fn completed_card_trends_against_the_previous_day() {
        let today = [
            block("r1", RoutineStatus::Completed),
            block("r2", RoutineStatus::Completed),
            block("r3", RoutineStatus::Pending),
        ];
        let yesterday = [block("r0", RoutineStatus::Completed), block("r9", RoutineStatus::Skipped)];
        let counts = DashboardCounts::from_routines(5, 0, &today, Some(&yesterday[..]));
        assert_eq!(counts.completed_today, 2);
        assert_eq!(counts.completed_yesterday, Some(1));

        let cards = widgets(&counts);
        assert_eq!(cards[3].value, "2");
        assert_eq!(cards[3].subtitle.as_deref(), Some("66% of today's plan"));
        assert_eq!(cards[3].change, Some(1.0));
        assert_eq!(cards[3].trend, Some(Trend::Up));

        let flat = widgets(&DashboardCounts::from_routines(5, 0, &today[2..], Some(&[][..])));
        assert_eq!(flat[3].change, Some(0.0));
        assert_eq!(flat[3].trend, Some(Trend::Neutral));
    }
}
