use eframe::egui;

use crate::network::ChannelState;
use crate::ui::state::AppState;

pub fn render(ui: &mut egui::Ui, state: &AppState) {
    ui.heading("Debug Info");
    ui.separator();

    ui.horizontal(|ui| {
        ui.label("Live channel:");
        match state.live_state {
            Some(ChannelState::Open) => ui.colored_label(egui::Color32::GREEN, "open"),
            Some(ChannelState::Connecting) => ui.colored_label(egui::Color32::YELLOW, "connecting"),
            Some(ChannelState::Closed) => ui.colored_label(egui::Color32::RED, "closed"),
            Some(ChannelState::Idle) | None => ui.label("not connected"),
        };
    });

    if let Some(reason) = &state.live_error {
        ui.colored_label(egui::Color32::RED, format!("History only: {reason}"));
    }

    ui.separator();

    ui.label("Recent Events:");
    egui::ScrollArea::vertical()
        .max_height(300.0)
        .show(ui, |ui| {
            for event in state.debug_events.iter().rev().take(20) {
                let time_str = event.timestamp.format("%H:%M:%S");
                let color = match event.event_type {
                    "MESSAGE_RECEIVED" | "CHAT_OPENED" => egui::Color32::GREEN,
                    "ERROR" | "LIVE_UNAVAILABLE" => egui::Color32::RED,
                    "LIVE_CHANNEL" => egui::Color32::YELLOW,
                    _ => egui::Color32::WHITE,
                };

                ui.horizontal(|ui| {
                    ui.colored_label(color, format!("[{}]", time_str));
                    ui.label(&event.message);
                });
            }
        });
}
