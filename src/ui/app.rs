use eframe::egui;
use tokio::sync::mpsc;

use crate::common::{ChatEvent, Identity, UiCommand};
use crate::store::{self, SharedStore};

use super::components::{
    chat_area, debug_panel, input_bar,
    sidebar::{self, SidebarActions},
};
use super::state::AppState;

pub struct ChatApp {
    state: AppState,
    me: Identity,
    store: SharedStore,
    command_sender: mpsc::Sender<UiCommand>,
    event_receiver: mpsc::Receiver<ChatEvent>,
}

impl ChatApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        me: Identity,
        store: SharedStore,
        command_sender: mpsc::Sender<UiCommand>,
        event_receiver: mpsc::Receiver<ChatEvent>,
    ) -> Self {
        Self {
            state: AppState::new(),
            me,
            store,
            command_sender,
            event_receiver,
        }
    }

    fn handle_chat_events(&mut self) {
        while let Ok(event) = self.event_receiver.try_recv() {
            self.state.apply(event);
        }
    }

    fn send_command(&mut self, command: UiCommand) {
        if let Err(err) = self.command_sender.try_send(command) {
            log::warn!("Failed to send command to controller: {err}");
        }
    }
}

impl eframe::App for ChatApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_chat_events();

        let (conversations, active_chat_id, counterpart, messages) = {
            let store = store::lock(&self.store);
            (
                store.conversations().to_vec(),
                store.active_chat_id().map(str::to_string),
                store
                    .active_conversation()
                    .and_then(|chat| chat.counterpart(&self.me))
                    .cloned(),
                store.active_log().to_vec(),
            )
        };

        egui::SidePanel::left("conversation_sidebar")
            .resizable(true)
            .default_width(220.0)
            .show(ctx, |ui| {
                let actions: SidebarActions =
                    sidebar::render(ui, &conversations, active_chat_id.as_deref(), &self.me);
                if actions.refresh {
                    self.send_command(UiCommand::RefreshConversations);
                }
                if let Some(chat) = actions.selected {
                    self.send_command(UiCommand::SelectConversation(chat));
                }
            });

        egui::SidePanel::right("debug_panel")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| {
                debug_panel::render(ui, &self.state);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            let title = match (&active_chat_id, &counterpart) {
                (Some(_), Some(other)) => format!("Chat with {other}"),
                (Some(chat_id), None) => format!("Chat {chat_id}"),
                (None, _) => "Select a chat".to_string(),
            };
            ui.heading(title);
            if let Some(status) = &self.state.status {
                ui.colored_label(egui::Color32::RED, status);
            }
            ui.separator();

            let input_height = 36.0;
            ui.allocate_ui(
                egui::vec2(
                    ui.available_width(),
                    (ui.available_height() - input_height).max(0.0),
                ),
                |ui| chat_area::render(ui, &messages, &self.me),
            );

            ui.separator();
            let enabled = active_chat_id.is_some();
            if let Some(content) = input_bar::render(ui, &mut self.state.input_text, enabled) {
                self.send_command(UiCommand::SendMessage(content));
            }
        });

        ctx.request_repaint();
    }
}
