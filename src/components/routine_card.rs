use crate::api::models::{EffortLevel, RoutineBlock, RoutineStatus};
use chrono::TimeZone;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeVariant {
    Default,
    Secondary,
    Destructive,
    Outline,
}

impl BadgeVariant {
    /// libadwaita style class used to tint the badge.
    pub fn css_class(self) -> &'static str {
        match self {
            Self::Default => "accent",
            Self::Secondary => "dim-label",
            Self::Destructive => "error",
            Self::Outline => "badge-outline",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Badge {
    pub label: &'static str,
    pub variant: BadgeVariant,
}

pub fn effort_badge(level: EffortLevel) -> Badge {
    let variant = match level {
        EffortLevel::Low => BadgeVariant::Secondary,
        EffortLevel::Medium => BadgeVariant::Default,
        EffortLevel::High => BadgeVariant::Destructive,
    };
    Badge {
        label: level.label(),
        variant,
    }
}

pub fn status_badge(status: RoutineStatus) -> Badge {
    let variant = match status {
        RoutineStatus::Completed => BadgeVariant::Default,
        RoutineStatus::Skipped => BadgeVariant::Destructive,
        RoutineStatus::Pending | RoutineStatus::Other => BadgeVariant::Outline,
    };
    Badge {
        label: status.label(),
        variant,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutineCardView {
    pub title: String,
    pub block_type: String,
    pub time_range: String,
    pub duration: String,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub effort: Badge,
    pub status: Badge,
}

impl RoutineCardView {
    pub fn new<Tz: TimeZone>(routine: &RoutineBlock, tz: &Tz) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        let start = routine.start_time.with_timezone(tz);
        let end = routine.end_time.with_timezone(tz);
        let minutes = (routine.end_time - routine.start_time).num_minutes().max(0);
        let duration = match (minutes / 60, minutes % 60) {
            (0, m) => format!("{m} min"),
            (h, 0) => format!("{h} h"),
            (h, m) => format!("{h} h {m} min"),
        };
        Self {
            title: routine.title.clone(),
            block_type: routine.block_type.clone(),
            time_range: format!("{} - {}", start.format("%H:%M"), end.format("%H:%M")),
            duration,
            location: routine.location.clone().filter(|l| !l.trim().is_empty()),
            notes: routine.notes.clone().filter(|n| !n.trim().is_empty()),
            effort: effort_badge(routine.effort_level),
            status: status_badge(routine.status),
        }
    }
}

/// One routine plus the parent's edit/delete handlers. The card never
/// changes the routine; it only forwards intents.
pub struct RoutineCard<E, D>
where
    E: Fn(&RoutineBlock),
    D: Fn(&str),
{
    routine: RoutineBlock,
    on_edit: E,
    on_delete: D,
}

impl<E, D> RoutineCard<E, D>
where
    E: Fn(&RoutineBlock),
    D: Fn(&str),
{
    pub fn new(routine: RoutineBlock, on_edit: E, on_delete: D) -> Self {
        Self {
            routine,
            on_edit,
            on_delete,
        }
    }

    pub fn routine(&self) -> &RoutineBlock {
        &self.routine
    }

    pub fn view<Tz: TimeZone>(&self, tz: &Tz) -> RoutineCardView
    where
        Tz::Offset: std::fmt::Display,
    {
        RoutineCardView::new(&self.routine, tz)
    }

    pub fn edit(&self) {
        (self.on_edit)(&self.routine);
    }

    pub fn delete(&self) {
        (self.on_delete)(&self.routine.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::cell::RefCell;

    fn routine(effort: EffortLevel, status: RoutineStatus) -> RoutineBlock {
        RoutineBlock {
            id: "r1".into(),
            coach_id: "coach-1".into(),
            client_id: Some("client-9".into()),
            title: "Long run".into(),
            block_type: "cardio".into(),
            effort_level: effort,
            status,
            start_time: "2025-01-31T07:00:00Z".parse().unwrap(),
            end_time: "2025-01-31T08:30:00Z".parse().unwrap(),
            location: Some("Riverside".into()),
            notes: Some("  ".into()),
        }
    }

    #[test]
    fn badge_variants_for_every_combination() {
        let efforts = [
            (EffortLevel::Low, BadgeVariant::Secondary),
            (EffortLevel::Medium, BadgeVariant::Default),
            (EffortLevel::High, BadgeVariant::Destructive),
        ];
        let statuses = [
            (RoutineStatus::Completed, BadgeVariant::Default),
            (RoutineStatus::Skipped, BadgeVariant::Destructive),
            (RoutineStatus::Pending, BadgeVariant::Outline),
            (RoutineStatus::Other, BadgeVariant::Outline),
        ];
        for (effort, effort_variant) in efforts {
            for (status, status_variant) in statuses {
                let view = RoutineCardView::new(&routine(effort, status), &Utc);
                assert_eq!(view.effort.variant, effort_variant, "{effort:?}/{status:?}");
                assert_eq!(view.status.variant, status_variant, "{effort:?}/{status:?}");
            }
        }
    }

    #[test]
    fn view_formats_time_and_drops_blank_notes() {
        let view = RoutineCardView::new(&routine(EffortLevel::High, RoutineStatus::Pending), &Utc);
        assert_eq!(view.time_range, "07:00 - 08:30");
        assert_eq!(view.duration, "1 h 30 min");
        assert_eq!(view.location.as_deref(), Some("Riverside"));
        assert_eq!(view.notes, None);
        assert_eq!(view.effort.label, "High");
        assert_eq!(view.status.label, "Pending");
    }

    #[test]
    fn intents_are_forwarded_without_touching_the_routine() {
        let block = routine(EffortLevel::Low, RoutineStatus::Completed);
        let edited = RefCell::new(None);
        let deleted = RefCell::new(None);
        let card = RoutineCard::new(
            block.clone(),
            |r: &RoutineBlock| *edited.borrow_mut() = Some(r.title.clone()),
            |id: &str| *deleted.borrow_mut() = Some(id.to_string()),
        );
        card.edit();
        card.delete();
        assert_eq!(edited.borrow().as_deref(), Some("Long run"));
        assert_eq!(deleted.borrow().as_deref(), Some("r1"));
        assert_eq!(card.routine(), &block);
    }
}
