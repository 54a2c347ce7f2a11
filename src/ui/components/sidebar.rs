use eframe::egui;

use crate::common::{Conversation, Identity};

#[derive(Default)]
pub struct SidebarActions {
    pub selected: Option<Conversation>,
    pub refresh: bool,
}

pub fn render(
    ui: &mut egui::Ui,
    conversations: &[Conversation],
    active_chat_id: Option<&str>,
    me: &Identity,
) -> SidebarActions {
    let mut actions = SidebarActions::default();

    ui.horizontal(|ui| {
        ui.heading("Chats");
        if ui.small_button("Refresh").clicked() {
            actions.refresh = true;
        }
    });
    ui.separator();

    if conversations.is_empty() {
        ui.label("No conversations yet");
        return actions;
    }

    egui::ScrollArea::vertical().show(ui, |ui| {
        for chat in conversations {
            let title = chat
                .counterpart(me)
                .map(Identity::to_string)
                .unwrap_or_else(|| chat.id.clone());
            let is_active = active_chat_id == Some(chat.id.as_str());

            if ui.selectable_label(is_active, title).clicked() {
                actions.selected = Some(chat.clone());
            }
        }
    });

    actions
}
