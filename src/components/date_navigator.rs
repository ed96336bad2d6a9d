//! Day picker with previous/next/today controls and a calendar popover.
//!
//! Holds no date of its own: every interaction computes the new date from
//! the one the parent passed in and hands it to the single callback.

use chrono::{Datelike, Days, Local, NaiveDate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateAction {
    PreviousDay,
    NextDay,
    Today,
    Pick(NaiveDate),
}

/// The date `action` leads to from `current`. Stepping past the calendar's
/// range leaves the date unchanged.
pub fn navigate(current: NaiveDate, action: DateAction, today: NaiveDate) -> NaiveDate {
    match action {
        DateAction::PreviousDay => current.checked_sub_days(Days::new(1)).unwrap_or(current),
        DateAction::NextDay => current.checked_add_days(Days::new(1)).unwrap_or(current),
        DateAction::Today => today,
        DateAction::Pick(date) => date,
    }
}

/// e.g. "Friday, January 31, 2025"
pub fn heading(date: NaiveDate) -> String {
    date.format("%A, %B %-d, %Y").to_string()
}

pub struct DateNavigator<F: Fn(NaiveDate)> {
    date: NaiveDate,
    on_change: F,
}

impl<F: Fn(NaiveDate)> DateNavigator<F> {
    pub fn new(date: NaiveDate, on_change: F) -> Self {
        Self { date, on_change }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn heading(&self) -> String {
        heading(self.date)
    }

    pub fn is_today(&self, today: NaiveDate) -> bool {
        self.date == today
    }

    /// Month/year shown when the calendar popover opens.
    pub fn calendar_month(&self) -> (i32, u32) {
        (self.date.year(), self.date.month())
    }

    pub fn handle(&self, action: DateAction) {
        self.handle_at(action, Local::now().date_naive());
    }

    pub fn handle_at(&self, action: DateAction, today: NaiveDate) {
        (self.on_change)(navigate(self.date, action, today));
    }
}
