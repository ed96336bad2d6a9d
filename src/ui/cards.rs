use crate::api::models::{DashboardWidget, RoutineBlock};
use crate::components::date_navigator::{DateAction, DateNavigator};
use crate::components::metric_card::MetricCardView;
use crate::components::routine_card::{Badge, RoutineCard};
use chrono::{Datelike, Local, NaiveDate};
use gtk4 as gtk;
use gtk4::prelude::*;
use std::rc::Rc;

fn card_box(spacing: i32) -> gtk::Box {
    let root = gtk::Box::new(gtk::Orientation::Vertical, spacing);
    root.add_css_class("card");
    root.set_margin_top(6);
    root.set_margin_bottom(6);
    root.set_margin_start(6);
    root.set_margin_end(6);
    root
}

fn badge_label(badge: &Badge) -> gtk::Label {
    let label = gtk::Label::new(Some(badge.label));
    label.add_css_class("caption");
    label.add_css_class(badge.variant.css_class());
    label
}

/// Heading, prev/today/next buttons and a calendar popover. Rebuilt by the
/// parent whenever its date changes.
pub fn date_navigator<F: Fn(NaiveDate) + 'static>(date: NaiveDate, on_change: F) -> gtk::Widget {
    let nav = Rc::new(DateNavigator::new(date, on_change));
    let row = gtk::Box::new(gtk::Orientation::Horizontal, 6);

    let prev = gtk::Button::from_icon_name("go-previous-symbolic");
    let today = gtk::Button::with_label("Today");
    let next = gtk::Button::from_icon_name("go-next-symbolic");
    let heading = gtk::Label::new(Some(&nav.heading()));
    heading.add_css_class("title-4");
    heading.set_hexpand(true);
    heading.set_halign(gtk::Align::Start);
    today.set_sensitive(!nav.is_today(Local::now().date_naive()));

    let calendar = gtk::Calendar::new();
    if let Ok(selected) = glib::DateTime::from_local(date.year(), date.month() as i32, date.day() as i32, 0, 0, 0.0) {
        calendar.select_day(&selected);
    }
    let popover = gtk::Popover::new();
    popover.set_child(Some(&calendar));
    let pick = gtk::MenuButton::builder()
        .icon_name("x-office-calendar-symbolic")
        .popover(&popover)
        .build();

    for (button, action) in [
        (&prev, DateAction::PreviousDay),
        (&today, DateAction::Today),
        (&next, DateAction::NextDay),
    ] {
        let nav = nav.clone();
        button.connect_clicked(move |_| nav.handle(action));
    }
    {
        let nav = nav.clone();
        let popover = popover.clone();
        calendar.connect_day_selected(move |cal| {
            let dt = cal.date();
            let picked = u32::try_from(dt.month())
                .ok()
                .zip(u32::try_from(dt.day_of_month()).ok())
                .and_then(|(m, d)| NaiveDate::from_ymd_opt(dt.year(), m, d));
            if let Some(picked) = picked {
                popover.popdown();
                nav.handle(DateAction::Pick(picked));
            }
        });
    }

    row.append(&heading);
    row.append(&prev);
    row.append(&today);
    row.append(&next);
    row.append(&pick);
    row.upcast()
}

pub fn metric_card(widget: &DashboardWidget) -> gtk::Widget {
    let view = MetricCardView::new(widget);
    let root = card_box(4);
    root.set_width_request(180);

    let title = gtk::Label::new(Some(&view.title));
    title.add_css_class("dim-label");
    title.set_halign(gtk::Align::Start);
    let value = gtk::Label::new(Some(&view.value));
    value.add_css_class("title-1");
    value.set_halign(gtk::Align::Start);
    root.append(&title);
    root.append(&value);

    let footer = gtk::Box::new(gtk::Orientation::Horizontal, 4);
    if let Some(indicator) = &view.indicator {
        let icon = gtk::Image::from_icon_name(indicator.trend.icon_name());
        icon.add_css_class(indicator.trend.css_class());
        let change = gtk::Label::new(Some(&indicator.label));
        change.add_css_class(indicator.trend.css_class());
        footer.append(&icon);
        footer.append(&change);
    }
    if let Some(subtitle) = &view.subtitle {
        let sub = gtk::Label::new(Some(subtitle));
        sub.add_css_class("caption");
        sub.add_css_class("dim-label");
        footer.append(&sub);
    }
    root.append(&footer);
    root.upcast()
}

pub fn routine_card<E, D>(routine: &RoutineBlock, on_edit: E, on_delete: D) -> gtk::Widget
where
    E: Fn(&RoutineBlock) + 'static,
    D: Fn(&str) + 'static,
{
    let card = Rc::new(RoutineCard::new(routine.clone(), on_edit, on_delete));
    let view = card.view(&Local);
    let root = card_box(4);

    let header = gtk::Box::new(gtk::Orientation::Horizontal, 6);
    let title = gtk::Label::new(Some(&view.title));
    title.add_css_class("heading");
    title.set_hexpand(true);
    title.set_halign(gtk::Align::Start);
    header.append(&title);
    header.append(&badge_label(&view.effort));
    header.append(&badge_label(&view.status));
    root.append(&header);

    let meta = format!("{} · {} · {}", view.block_type, view.time_range, view.duration);
    let meta = gtk::Label::new(Some(&meta));
    meta.add_css_class("dim-label");
    meta.set_halign(gtk::Align::Start);
    root.append(&meta);

    for extra in [&view.location, &view.notes].into_iter().flatten() {
        let label = gtk::Label::new(Some(extra));
        label.set_wrap(true);
        label.set_halign(gtk::Align::Start);
        root.append(&label);
    }

    let actions = gtk::Box::new(gtk::Orientation::Horizontal, 6);
    actions.set_halign(gtk::Align::End);
    let edit_btn = gtk::Button::with_label("Edit");
    let delete_btn = gtk::Button::with_label("Delete");
    delete_btn.add_css_class("destructive-action");
    actions.append(&edit_btn);
    actions.append(&delete_btn);
    root.append(&actions);

    {
        let card = card.clone();
        edit_btn.connect_clicked(move |_| card.edit());
    }
    delete_btn.connect_clicked(move |_| card.delete());
    root.upcast()
}
