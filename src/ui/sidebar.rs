use crate::components::messages_page::ConversationRow;
use adw::prelude::*;
use chrono::Local;
use gtk4 as gtk;
use std::cell::RefCell;
use std::rc::Rc;

pub(crate) fn padded(widget: &impl IsA<gtk::Widget>, margin: i32) {
    widget.set_margin_top(margin);
    widget.set_margin_bottom(margin);
    widget.set_margin_start(margin);
    widget.set_margin_end(margin);
}

/// Conversation list for the messages page. Row order matches the slice
/// last passed to `set_items`.
pub struct Sidebar {
    column: gtk::Box,
    rows: gtk::ListBox,
    ids: Rc<RefCell<Vec<String>>>,
}

impl Sidebar {
    pub fn new() -> Self {
        let column = gtk::Box::new(gtk::Orientation::Vertical, 4);
        padded(&column, 6);
        column.set_width_request(260);

        let heading = gtk::Label::builder()
            .label("Conversations")
            .xalign(0.0)
            .css_classes(["title-4"])
            .build();
        column.append(&heading);

        let rows = gtk::ListBox::builder()
            .selection_mode(gtk::SelectionMode::Single)
            .css_classes(["navigation-sidebar"])
            .build();
        let placeholder = gtk::Label::new(Some("No conversations yet"));
        placeholder.add_css_class("dim-label");
        padded(&placeholder, 12);
        rows.set_placeholder(Some(&placeholder));
        column.append(
            &gtk::ScrolledWindow::builder()
                .vexpand(true)
                .hscrollbar_policy(gtk::PolicyType::Never)
                .child(&rows)
                .build(),
        );

        Self {
            column,
            rows,
            ids: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn widget(&self) -> gtk::Widget {
        self.column.clone().upcast()
    }

    /// Calls `on_select` with the conversation id of an activated row.
    pub fn connect_select<F: Fn(String) + 'static>(&self, on_select: F) {
        let ids = self.ids.clone();
        self.rows.connect_row_activated(move |_, row| {
            let id = usize::try_from(row.index())
                .ok()
                .and_then(|i| ids.borrow().get(i).cloned());
            if let Some(id) = id {
                on_select(id);
            }
        });
    }

    pub fn set_items(&self, items: Vec<ConversationRow>) {
        while let Some(row) = self.rows.row_at_index(0) {
            self.rows.remove(&row);
        }
        let mut ids = self.ids.borrow_mut();
        ids.clear();
        for item in items {
            let row = adw::ActionRow::builder()
                .title(item.label.as_str())
                .subtitle(
                    item.last_activity
                        .with_timezone(&Local)
                        .format("%b %-d, %H:%M")
                        .to_string(),
                )
                .activatable(true)
                .build();
            self.rows.append(&row);
            if item.selected {
                self.rows.select_row(Some(&row));
            }
            ids.push(item.id);
        }
    }
}
