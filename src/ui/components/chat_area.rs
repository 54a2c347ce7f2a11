use eframe::egui;

use crate::common::{ChatMessage, Identity};

pub fn render(ui: &mut egui::Ui, messages: &[ChatMessage], me: &Identity) {
    egui::ScrollArea::vertical()
        .stick_to_bottom(true)
        .auto_shrink([false, false])
        .show(ui, |ui| {
            for message in messages {
                let mine = &message.sender_id == me;
                ui.horizontal_wrapped(|ui| {
                    if let Some(time) = message.display_time() {
                        ui.label(egui::RichText::new(time).weak());
                    }
                    if mine {
                        ui.colored_label(egui::Color32::LIGHT_BLUE, "You:");
                    } else {
                        ui.strong(format!("{}:", message.sender_id));
                    }
                    ui.label(&message.content);
                });
            }
        });
}
