use crate::api::client::BackendClient;
use crate::api::models::{Conversation, MessageType, RoutineBlock, RoutineStatus, SenderType};
use crate::api::realtime::SubscriptionHandle;
use crate::app::{AppConfig, Session};
use crate::cache::ConversationCache;
use crate::components::chat_window::{bubbles, has_unread_incoming};
use crate::components::dashboard::{DashboardCounts, widgets};
use crate::components::messages_page::{MessagesPage, conversation_rows};
use crate::error::ApiError;
use crate::services::{MessageService, RoutineService};
use crate::ui::chat_view::ChatView;
use crate::ui::sidebar::Sidebar;
use crate::unread::UnreadTracker;
use crate::utils::{RUNTIME, run_async_to_main};
use adw::prelude::*;
use chrono::{Local, NaiveDate};
use gtk4 as gtk;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

type Messages = MessageService<BackendClient>;

struct Ctx {
    session: Session,
    messages: Messages,
    routines: RoutineService<BackendClient>,
    overlay: adw::ToastOverlay,
    unread: Cell<u64>,
    conversations: RefCell<Vec<Conversation>>,
    day_routines: RefCell<Vec<RoutineBlock>>,
    prev_routines: RefCell<Option<Vec<RoutineBlock>>>,
    page: RefCell<MessagesPage>,
    live: RefCell<Option<SubscriptionHandle>>,
    day: Cell<NaiveDate>,
}

impl Ctx {
    fn toast(&self, text: &str) {
        self.overlay.add_toast(adw::Toast::new(text));
    }
}

pub fn show_main_window(app: &adw::Application, config: AppConfig) {
    let window = adw::ApplicationWindow::builder()
        .application(app)
        .title("Coachdesk")
        .default_width(1080)
        .default_height(720)
        .build();

    let overlay = adw::ToastOverlay::new();
    let container = gtk::Box::new(gtk::Orientation::Vertical, 0);
    let header = adw::HeaderBar::new();
    container.append(&header);
    container.append(&overlay);
    window.set_content(Some(&container));

    let backend = match BackendClient::from_config(&config) {
        Ok(client) => Arc::new(client),
        Err(err) => {
            overlay.set_child(Some(&unavailable(&format!(
                "Set base_url and api_key in {}. ({err})",
                AppConfig::config_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "coachdesk.toml".into())
            ))));
            window.present();
            return;
        }
    };
    let Some(session) = config.session() else {
        overlay.set_child(Some(&unavailable("Set user_id in coachdesk.toml to sign in.")));
        window.present();
        return;
    };

    let mut messages = MessageService::new(backend.clone());
    match ConversationCache::open_default() {
        Ok(cache) => messages = messages.with_cache(Arc::new(cache)),
        Err(err) => log::warn!("Conversation cache unavailable: {err}"),
    }

    let ctx = Rc::new(Ctx {
        session,
        messages,
        routines: RoutineService::new(backend),
        overlay: overlay.clone(),
        unread: Cell::new(0),
        conversations: RefCell::new(Vec::new()),
        day_routines: RefCell::new(Vec::new()),
        prev_routines: RefCell::new(None),
        page: RefCell::new(MessagesPage::new()),
        live: RefCell::new(None),
        day: Cell::new(Local::now().date_naive()),
    });

    let stack = adw::ViewStack::new();
    let switcher = adw::ViewSwitcher::builder()
        .stack(&stack)
        .policy(adw::ViewSwitcherPolicy::Wide)
        .build();
    header.set_title_widget(Some(&switcher));
    let unread_label = gtk::Label::new(Some("…"));
    unread_label.add_css_class("accent");
    unread_label.set_tooltip_text(Some("Unread messages"));
    header.pack_end(&unread_label);
    overlay.set_child(Some(&stack));

    // Dashboard
    let dashboard = gtk::Box::new(gtk::Orientation::Vertical, 12);
    dashboard.set_margin_top(12);
    dashboard.set_margin_bottom(12);
    dashboard.set_margin_start(12);
    dashboard.set_margin_end(12);
    let nav_slot = gtk::Box::new(gtk::Orientation::Vertical, 0);
    let metrics = gtk::FlowBox::new();
    metrics.set_selection_mode(gtk::SelectionMode::None);
    let routines_box = gtk::Box::new(gtk::Orientation::Vertical, 6);
    let routines_scroller = gtk::ScrolledWindow::builder()
        .vexpand(true)
        .child(&routines_box)
        .build();
    dashboard.append(&nav_slot);
    dashboard.append(&metrics);
    dashboard.append(&routines_scroller);
    let dash_page = stack.add_titled(&dashboard, Some("dashboard"), "Dashboard");
    dash_page.set_icon_name(Some("view-grid-symbolic"));

    // Messages
    let flap = adw::Flap::builder()
        .reveal_flap(true)
        .modal(false)
        .build();
    let sidebar = Rc::new(Sidebar::new());
    flap.set_flap(Some(&sidebar.widget()));
    let chat = Rc::new(ChatView::new());
    flap.set_content(Some(&chat.widget()));
    let msg_page = stack.add_titled(&flap, Some("messages"), "Messages");
    msg_page.set_icon_name(Some("mail-unread-symbolic"));

    window.present();

    let dash = Rc::new(Dashboard {
        nav_slot,
        metrics,
        routines_box,
    });

    // Unread badge fed by the tracker.
    let tracker = {
        let _guard = RUNTIME.enter();
        let mut tracker = UnreadTracker::new(Arc::new(ctx.messages.clone()));
        tracker.set_user(Some(&ctx.session.user_id));
        Rc::new(RefCell::new(tracker))
    };
    {
        let mut rx = tracker.borrow().watch();
        let ctx = ctx.clone();
        let dash = dash.clone();
        glib::spawn_future_local(async move {
            while rx.changed().await.is_ok() {
                let state = *rx.borrow_and_update();
                if state.loading {
                    continue;
                }
                unread_label.set_label(&state.unread_count.to_string());
                ctx.unread.set(state.unread_count);
                render_metrics(&ctx, &dash);
            }
        });
    }
    {
        let tracker = tracker.clone();
        window.connect_close_request(move |_| {
            tracker.borrow_mut().shutdown();
            glib::Propagation::Proceed
        });
    }

    // Conversation list: cached rows first, then the backend's answer.
    let cached = ctx.messages.cached_conversations(&ctx.session.user_id, 200);
    if !cached.is_empty() {
        *ctx.conversations.borrow_mut() = cached;
        refresh_sidebar(&ctx, &sidebar);
    }
    {
        let ctx2 = ctx.clone();
        let sidebar = sidebar.clone();
        let messages = ctx.messages.clone();
        let user_id = ctx.session.user_id.clone();
        run_async_to_main(
            async move { messages.get_conversations(&user_id).await },
            move |res| match res {
                Ok(items) => {
                    *ctx2.conversations.borrow_mut() = items;
                    refresh_sidebar(&ctx2, &sidebar);
                }
                Err(err) => ctx2.toast(&format!("Failed to load conversations: {}", err)),
            },
        );
    }

    {
        let ctx = ctx.clone();
        let chat2 = chat.clone();
        let sidebar2 = sidebar.clone();
        let flap2 = flap.clone();
        sidebar.connect_select(move |id| {
            ctx.page.borrow_mut().select(&id);
            apply_layout(&ctx, &flap2, &chat2);
            refresh_sidebar(&ctx, &sidebar2);
            open_conversation(&ctx, &chat2, id);
        });
    }
    {
        let ctx = ctx.clone();
        let chat2 = chat.clone();
        let flap2 = flap.clone();
        chat.connect_back(move || {
            ctx.page.borrow_mut().back();
            apply_layout(&ctx, &flap2, &chat2);
        });
    }
    {
        let ctx = ctx.clone();
        let chat2 = chat.clone();
        chat.connect_send(move |text| send(&ctx, &chat2, text));
    }
    {
        let ctx = ctx.clone();
        let chat2 = chat.clone();
        flap.connect_folded_notify(move |flap| apply_layout(&ctx, flap, &chat2));
    }
    apply_layout(&ctx, &flap, &chat);

    load_day(&ctx, &dash);
}

fn unavailable(description: &str) -> adw::StatusPage {
    adw::StatusPage::builder()
        .icon_name("network-offline-symbolic")
        .title("Backend not configured")
        .description(description)
        .build()
}

fn refresh_sidebar(ctx: &Ctx, sidebar: &Sidebar) {
    let rows = conversation_rows(&ctx.conversations.borrow(), &ctx.session.user_id, &ctx.page.borrow());
    sidebar.set_items(rows);
}

fn apply_layout(ctx: &Ctx, flap: &adw::Flap, chat: &ChatView) {
    let narrow = flap.is_folded();
    let layout = ctx.page.borrow().layout(narrow);
    flap.set_reveal_flap(layout.show_list);
    chat.set_back_visible(narrow && layout.show_chat);
}

fn open_conversation(ctx: &Rc<Ctx>, chat: &Rc<ChatView>, conversation_id: String) {
    let title = ctx
        .conversations
        .borrow()
        .iter()
        .find(|c| c.id == conversation_id)
        .map(|c| c.display_name(&ctx.session.user_id))
        .unwrap_or_else(|| conversation_id.clone());
    chat.set_title(&title);
    chat.set_enabled(true);

    if let Some(old) = ctx.live.borrow_mut().take() {
        ctx.messages.unsubscribe(&old);
    }
    let mut subscription = {
        let _guard = RUNTIME.enter();
        ctx.messages.subscribe_to_conversation(&conversation_id)
    };
    *ctx.live.borrow_mut() = Some(subscription.handle());

    load_messages(ctx, chat, conversation_id.clone());
    let ctx = ctx.clone();
    let chat = chat.clone();
    glib::spawn_future_local(async move {
        while subscription.next().await.is_some() {
            load_messages(&ctx, &chat, conversation_id.clone());
        }
    });
}

fn load_messages(ctx: &Rc<Ctx>, chat: &Rc<ChatView>, conversation_id: String) {
    let messages = ctx.messages.clone();
    let viewer = ctx.session.user_id.clone();
    let ctx = ctx.clone();
    let chat = chat.clone();
    run_async_to_main(
        async move {
            let list = messages.get_messages(&conversation_id).await?;
            if has_unread_incoming(&list, &viewer) {
                if let Err(err) = messages.mark_as_read(&conversation_id, &viewer).await {
                    log::warn!("Could not mark {conversation_id} read: {err}");
                }
            }
            Ok::<_, ApiError>((conversation_id, list))
        },
        move |res| match res {
            Ok((conversation_id, list)) => {
                if ctx.page.borrow().selected() == Some(conversation_id.as_str()) {
                    chat.set_messages(&bubbles(&list, &ctx.session.user_id, &Local));
                }
            }
            Err(err) => ctx.toast(&format!("Failed to load messages: {}", err)),
        },
    );
}

fn send(ctx: &Rc<Ctx>, chat: &Rc<ChatView>, text: String) {
    let Some(conversation_id) = ctx.page.borrow().selected().map(str::to_string) else {
        return;
    };
    let messages = ctx.messages.clone();
    let sender = ctx.session.user_id.clone();
    let target = conversation_id.clone();
    let ctx = ctx.clone();
    let chat = chat.clone();
    run_async_to_main(
        async move {
            messages
                .send_message(&target, &sender, SenderType::Coach, &text, MessageType::Text)
                .await
        },
        move |res| match res {
            Ok(_) => load_messages(&ctx, &chat, conversation_id),
            Err(err) => ctx.toast(&format!("Message not sent: {}", err)),
        },
    );
}

struct Dashboard {
    nav_slot: gtk::Box,
    metrics: gtk::FlowBox,
    routines_box: gtk::Box,
}

fn render_metrics(ctx: &Ctx, dash: &Dashboard) {
    let counts = DashboardCounts::from_routines(
        ctx.conversations.borrow().len(),
        ctx.unread.get(),
        &ctx.day_routines.borrow(),
        ctx.prev_routines.borrow().as_deref(),
    );
    while let Some(child) = dash.metrics.first_child() {
        dash.metrics.remove(&child);
    }
    for widget in widgets(&counts) {
        dash.metrics.insert(&crate::ui::cards::metric_card(&widget), -1);
    }
}

fn load_day(ctx: &Rc<Ctx>, dash: &Rc<Dashboard>) {
    let day = ctx.day.get();

    while let Some(child) = dash.nav_slot.first_child() {
        dash.nav_slot.remove(&child);
    }
    {
        let ctx = ctx.clone();
        let dash2 = dash.clone();
        let nav = crate::ui::cards::date_navigator(day, move |date| {
            ctx.day.set(date);
            // Rebuilding removes the widget that emitted this callback.
            let ctx = ctx.clone();
            let dash = dash2.clone();
            glib::idle_add_local_once(move || load_day(&ctx, &dash));
        });
        dash.nav_slot.append(&nav);
    }

    let routines = ctx.routines.clone();
    let coach_id = ctx.session.user_id.clone();
    let ctx = ctx.clone();
    let dash = dash.clone();
    run_async_to_main(
        async move {
            let list = routines.list_for_day(&coach_id, day, &Local).await?;
            let previous = match day.pred_opt() {
                Some(prev) => routines
                    .list_for_day(&coach_id, prev, &Local)
                    .await
                    .inspect_err(|err| log::warn!("Could not load routines for {prev}: {err}"))
                    .ok(),
                None => None,
            };
            Ok::<_, ApiError>((list, previous))
        },
        move |res| {
            if ctx.day.get() != day {
                return;
            }
            match res {
                Ok((list, previous)) => {
                    render_routines(&ctx, &dash, &list);
                    *ctx.day_routines.borrow_mut() = list;
                    *ctx.prev_routines.borrow_mut() = previous;
                    render_metrics(&ctx, &dash);
                }
                Err(err) => ctx.toast(&format!("Failed to load routines: {}", err)),
            }
        },
    );
}

fn render_routines(ctx: &Rc<Ctx>, dash: &Rc<Dashboard>, list: &[RoutineBlock]) {
    while let Some(child) = dash.routines_box.first_child() {
        dash.routines_box.remove(&child);
    }
    if list.is_empty() {
        let empty = gtk::Label::new(Some("Nothing scheduled for this day."));
        empty.add_css_class("dim-label");
        dash.routines_box.append(&empty);
        return;
    }
    for routine in list {
        let on_edit = {
            let ctx = ctx.clone();
            let dash = dash.clone();
            move |r: &RoutineBlock| {
                let next = match r.status {
                    RoutineStatus::Pending => RoutineStatus::Completed,
                    RoutineStatus::Completed => RoutineStatus::Skipped,
                    RoutineStatus::Skipped | RoutineStatus::Other => RoutineStatus::Pending,
                };
                let routines = ctx.routines.clone();
                let id = r.id.clone();
                let ctx = ctx.clone();
                let dash = dash.clone();
                run_async_to_main(
                    async move { routines.set_status(&id, next).await },
                    move |res| match res {
                        Ok(_) => load_day(&ctx, &dash),
                        Err(err) => ctx.toast(&format!("Could not update routine: {}", err)),
                    },
                );
            }
        };
        let on_delete = {
            let ctx = ctx.clone();
            let dash = dash.clone();
            move |id: &str| {
                let routines = ctx.routines.clone();
                let id = id.to_string();
                let ctx = ctx.clone();
                let dash = dash.clone();
                run_async_to_main(
                    async move { routines.delete(&id).await },
                    move |res| match res {
                        Ok(()) => load_day(&ctx, &dash),
                        Err(err) => ctx.toast(&format!("Could not delete routine: {}", err)),
                    },
                );
            }
        };
        dash.routines_box
            .append(&crate::ui::cards::routine_card(routine, on_edit, on_delete));
    }
}
