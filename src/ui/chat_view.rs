use crate::components::chat_window::{ChatBubble, compose};
use crate::ui::sidebar::padded;
use adw::prelude::*;
use gtk4 as gtk;
use std::rc::Rc;

/// Chat pane: header with a back button, the message column and a composer.
pub struct ChatView {
    pane: gtk::Box,
    heading: gtk::Label,
    back: gtk::Button,
    column: gtk::Box,
    scroll: gtk::ScrolledWindow,
    composer: gtk::Entry,
    send: gtk::Button,
}

impl ChatView {
    pub fn new() -> Self {
        let pane = gtk::Box::new(gtk::Orientation::Vertical, 4);
        padded(&pane, 6);

        let back = gtk::Button::builder()
            .icon_name("go-previous-symbolic")
            .tooltip_text("Back to conversations")
            .css_classes(["flat"])
            .build();
        let heading = gtk::Label::builder()
            .label("Select a conversation")
            .xalign(0.0)
            .hexpand(true)
            .css_classes(["title-4"])
            .build();
        let bar = gtk::CenterBox::new();
        bar.set_start_widget(Some(&back));
        bar.set_center_widget(Some(&heading));
        pane.append(&bar);

        let column = gtk::Box::new(gtk::Orientation::Vertical, 8);
        padded(&column, 4);
        let scroll = gtk::ScrolledWindow::builder()
            .vexpand(true)
            .hscrollbar_policy(gtk::PolicyType::Never)
            .child(&column)
            .build();
        pane.append(&scroll);

        let composer = gtk::Entry::builder()
            .hexpand(true)
            .placeholder_text("Write to your client…")
            .build();
        let send = gtk::Button::builder()
            .icon_name("mail-send-symbolic")
            .tooltip_text("Send")
            .css_classes(["suggested-action"])
            .build();
        let compose_row = gtk::Box::new(gtk::Orientation::Horizontal, 4);
        compose_row.add_css_class("linked");
        compose_row.append(&composer);
        compose_row.append(&send);
        pane.append(&compose_row);

        let view = Self {
            pane,
            heading,
            back,
            column,
            scroll,
            composer,
            send,
        };
        view.set_enabled(false);
        view
    }

    pub fn widget(&self) -> gtk::Widget {
        self.pane.clone().upcast()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.composer.set_sensitive(enabled);
        self.send.set_sensitive(enabled);
    }

    pub fn set_title(&self, title: &str) {
        self.heading.set_label(title);
    }

    pub fn set_back_visible(&self, visible: bool) {
        self.back.set_visible(visible);
    }

    pub fn connect_back<F: Fn() + 'static>(&self, on_back: F) {
        self.back.connect_clicked(move |_| on_back());
    }

    /// `on_send` receives the trimmed text; blank input is ignored.
    pub fn connect_send<F: Fn(String) + 'static>(&self, on_send: F) {
        let composer = self.composer.clone();
        let submit = Rc::new(move || {
            if let Some(text) = compose(&composer.text()) {
                composer.set_text("");
                on_send(text);
            }
        });
        let on_click = submit.clone();
        self.send.connect_clicked(move |_| on_click());
        self.composer.connect_activate(move |_| submit());
    }

    pub fn set_messages(&self, bubbles: &[ChatBubble]) {
        while let Some(child) = self.column.first_child() {
            self.column.remove(&child);
        }
        for bubble in bubbles {
            let body = gtk::Label::builder()
                .label(bubble.text.as_str())
                .wrap(true)
                .selectable(true)
                .xalign(0.0)
                .css_classes(["card"])
                .build();
            padded(&body, 2);
            if !bubble.outgoing && !bubble.read {
                body.add_css_class("accent");
            }
            let stamp = gtk::Label::builder()
                .label(bubble.time.as_str())
                .css_classes(["caption", "dim-label"])
                .build();
            let side = if bubble.outgoing {
                gtk::Align::End
            } else {
                gtk::Align::Start
            };
            stamp.set_halign(side);
            let entry = gtk::Box::new(gtk::Orientation::Vertical, 2);
            entry.set_halign(side);
            entry.append(&body);
            entry.append(&stamp);
            self.column.append(&entry);
        }
        let adj = self.scroll.vadjustment();
        glib::idle_add_local_once(move || adj.set_value(adj.upper() - adj.page_size()));
    }
}
