//! StyleSense Desktop — egui app state and UI.
//!
//! Sidebar collects body shape and skin tone. The chat session lives on the UI thread; each
//! flow request runs on a background thread and comes back over an mpsc channel.

use eframe::egui;
use lib::chat::{ChatSession, TurnSettings};
use lib::config::Config;
use lib::flow::{FlowClient, FlowError, RunRequest};
use lib::session::{Role, TranscriptMessage};
use lib::tweaks::StyleProfile;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::mpsc;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

const CHAT_INPUT_HEIGHT: f32 = 72.0;
const LOG_BUFFER_MAX_LINES: usize = 2000;

/// Ring buffer of log lines for the Logs screen. Written by DesktopLogger.
static LOG_LINES: OnceLock<Mutex<VecDeque<String>>> = OnceLock::new();

fn log_buffer() -> &'static Mutex<VecDeque<String>> {
    LOG_LINES.get_or_init(|| Mutex::new(VecDeque::new()))
}

fn push_log_line(line: String) {
    if let Ok(mut buf) = log_buffer().lock() {
        buf.push_back(line);
        while buf.len() > LOG_BUFFER_MAX_LINES {
            buf.pop_front();
        }
    }
}

/// Logger that appends to LOG_LINES for display in the Logs screen.
struct DesktopLogger;

impl log::Log for DesktopLogger {
    fn enabled(&self, _: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        let line = format!(
            "{} [{}] {}",
            chrono::Local::now().format("%H:%M:%S%.3f"),
            record.level(),
            record.args()
        );
        push_log_line(line);
    }

    fn flush(&self) {}
}

static LOGGER: DesktopLogger = DesktopLogger;

#[derive(Clone, Copy, PartialEq, Eq, Default)]
enum Screen {
    #[default]
    Chat,
    Logs,
}

fn load_chat() -> anyhow::Result<ChatSession<FlowClient>> {
    let (config, path) = lib::config::load_config(None)?;
    log::info!("loaded config from {}", path.display());
    chat_session(&config)
}

fn chat_session(config: &Config) -> anyhow::Result<ChatSession<FlowClient>> {
    let client = FlowClient::from_config(&config.flow)?;
    Ok(ChatSession::new(client, TurnSettings::from_config(config)))
}

/// Send one request on the current thread with a dedicated runtime.
/// None when the runtime could not be built.
fn run_flow_request(client: FlowClient, request: RunRequest) -> Option<Result<Value, FlowError>> {
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            log::error!("failed to start chat runtime: {}", e);
            return None;
        }
    };
    Some(rt.block_on(client.run(&request)))
}

pub struct StyleSenseApp {
    /// None when config or client setup failed; `setup_error` says why.
    chat: Option<ChatSession<FlowClient>>,
    setup_error: Option<String>,
    /// Sidebar inputs; read fresh for every turn.
    body_shape: String,
    skin_tone: String,
    /// Current input text for the chat box.
    chat_input: String,
    /// Last error from a chat turn, if any.
    chat_error: Option<String>,
    /// When Some, a chat turn is in flight; we read the result here.
    chat_turn_receiver: Option<mpsc::Receiver<Result<Value, FlowError>>>,
    current_screen: Screen,
}

impl StyleSenseApp {
    const SCREEN_TITLE_BOTTOM_SPACING: f32 = 18.0;

    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let _ = log_buffer();
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(log::LevelFilter::Info);
        log::info!("desktop started");
        let (chat, setup_error) = match load_chat() {
            Ok(c) => (Some(c), None),
            Err(e) => {
                log::error!("flow setup failed: {:#}", e);
                (None, Some(format!("{:#}", e)))
            }
        };
        Self {
            chat,
            setup_error,
            body_shape: String::new(),
            skin_tone: String::new(),
            chat_input: String::new(),
            chat_error: None,
            chat_turn_receiver: None,
            current_screen: Screen::default(),
        }
    }

    fn profile(&self) -> StyleProfile {
        StyleProfile::new(self.body_shape.clone(), self.skin_tone.clone())
    }

    fn turn_in_flight(&self) -> bool {
        self.chat_turn_receiver.is_some()
    }

    /// Start a chat turn in a background thread if possible.
    fn start_chat_turn(&mut self) {
        if self.turn_in_flight() {
            return;
        }
        let profile = self.profile();
        let Some(chat) = self.chat.as_mut() else {
            return;
        };
        let message = self.chat_input.trim().to_string();
        if message.is_empty() {
            return;
        }
        self.chat_error = None;
        self.chat_input.clear();

        if message.eq_ignore_ascii_case("/clear") {
            chat.clear_transcript();
            return;
        }

        let request = chat.begin_turn(&message, &profile);
        let client = chat.runner().clone();
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            if let Some(result) = run_flow_request(client, request) {
                let _ = tx.send(result);
            }
        });
        self.chat_turn_receiver = Some(rx);
    }

    /// Poll for chat turn result and clear receiver when done. Call each frame.
    fn poll_chat_turn(&mut self) {
        if let Some(rx) = &self.chat_turn_receiver {
            match rx.try_recv() {
                Ok(result) => {
                    self.chat_turn_receiver = None;
                    let Some(chat) = self.chat.as_mut() else {
                        return;
                    };
                    if let Err(e) = chat.finish_turn(result) {
                        log::error!("chat turn failed: {}", e);
                        self.chat_error = Some(e.to_string());
                    }
                }
                Err(mpsc::TryRecvError::Empty) => {}
                Err(mpsc::TryRecvError::Disconnected) => {
                    self.chat_turn_receiver = None;
                    self.chat_error = Some("chat turn ended without a reply".to_string());
                }
            }
        }
    }

    fn render_chat_message(ui: &mut egui::Ui, m: &TranscriptMessage) {
        let is_user = m.role == Role::User;
        let frame = egui::Frame::none()
            .fill(if is_user {
                ui.style().visuals.extreme_bg_color
            } else {
                ui.style().visuals.panel_fill
            })
            .stroke(egui::Stroke::new(
                1.0,
                ui.style().visuals.widgets.noninteractive.bg_stroke.color,
            ))
            .rounding(egui::Rounding::same(8.0))
            .inner_margin(egui::Margin::same(8.0));

        frame.show(ui, |ui| {
            ui.horizontal_top(|ui| {
                ui.label(egui::RichText::new(m.role.avatar()).size(18.0));
                if is_user {
                    ui.label(egui::RichText::new(&m.content).strong());
                } else {
                    ui.label(&m.content);
                }
            });
        });
    }

    fn ui_sidebar(&mut self, ui: &mut egui::Ui) {
        ui.add_space(24.0);
        ui.heading("Fashion style helper chatbot");
        ui.add_space(8.0);
        ui.label("You don't know what to wear for your occasion? Please provide information.");
        ui.add_space(16.0);

        ui.label("Body shape:");
        ui.add(
            egui::TextEdit::singleline(&mut self.body_shape)
                .hint_text("Please provide your body shape here."),
        );
        ui.add_space(8.0);
        ui.label("Skin tone:");
        ui.add(
            egui::TextEdit::singleline(&mut self.skin_tone)
                .hint_text("Please provide your skin tone here."),
        );
        ui.add_space(8.0);
        if !self.profile().is_empty() {
            ui.colored_label(egui::Color32::from_rgb(60, 160, 90), "Parameters updated");
        }

        ui.add_space(24.0);
        ui.separator();
        ui.add_space(12.0);
        if ui
            .selectable_label(self.current_screen == Screen::Chat, "Chat")
            .clicked()
        {
            self.current_screen = Screen::Chat;
        }
        ui.add_space(8.0);
        if ui
            .selectable_label(self.current_screen == Screen::Logs, "Logs")
            .clicked()
        {
            self.current_screen = Screen::Logs;
        }

        ui.add_space(24.0);
        if let Some(chat) = &self.chat {
            ui.small(format!("Flow: {}", chat.settings().endpoint));
            ui.small(format!("Service: {}", chat.runner().base_url()));
        }
    }

    fn ui_chat(&mut self, ui: &mut egui::Ui) {
        ui.add_space(24.0);
        ui.heading("StyleSense Chatbot");
        ui.add_space(Self::SCREEN_TITLE_BOTTOM_SPACING);

        if let Some(ref e) = self.setup_error {
            ui.colored_label(egui::Color32::RED, format!("Flow not available: {}", e));
            ui.add_space(8.0);
        }

        let reserved = CHAT_INPUT_HEIGHT + 64.0;
        let messages_height = (ui.available_height() - reserved).max(80.0);
        egui::ScrollArea::vertical()
            .max_height(messages_height)
            .stick_to_bottom(true)
            .auto_shrink([false, false])
            .show(ui, |ui| {
                if let Some(chat) = &self.chat {
                    for m in chat.transcript().messages() {
                        Self::render_chat_message(ui, m);
                        ui.add_space(8.0);
                    }
                }
                if self.turn_in_flight() {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("Thinking...");
                    });
                }
            });

        if let Some(ref e) = self.chat_error {
            ui.colored_label(egui::Color32::RED, format!("chat error: {}", e));
        }
        ui.add_space(8.0);

        let can_send = self.chat.is_some() && !self.turn_in_flight();
        let response = ui
            .add_enabled_ui(can_send, |ui| {
                ui.add_sized(
                    [ui.available_width(), CHAT_INPUT_HEIGHT],
                    egui::TextEdit::multiline(&mut self.chat_input)
                        .hint_text("Please describe your occasion here (Ctrl+Enter to send)"),
                )
            })
            .inner;
        let submitted = response.has_focus()
            && ui.input(|i| i.key_pressed(egui::Key::Enter) && i.modifiers.command);
        ui.add_space(8.0);
        ui.horizontal(|ui| {
            let send = ui.add_enabled(can_send, egui::Button::new("Send")).clicked();
            if ui.button("Clear").clicked() {
                if let Some(chat) = self.chat.as_mut() {
                    chat.clear_transcript();
                }
                self.chat_error = None;
            }
            if send || submitted {
                self.start_chat_turn();
            }
        });
    }

    fn ui_logs_screen(&self, ui: &mut egui::Ui) {
        ui.add_space(24.0);
        ui.heading("Logs");
        ui.add_space(Self::SCREEN_TITLE_BOTTOM_SPACING);
        let lines: Vec<String> = log_buffer()
            .lock()
            .map(|buf| buf.iter().cloned().collect())
            .unwrap_or_default();
        egui::ScrollArea::vertical()
            .stick_to_bottom(true)
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for line in &lines {
                    ui.monospace(line);
                }
            });
    }
}

impl eframe::App for StyleSenseApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_chat_turn();
        if self.turn_in_flight() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        egui::SidePanel::left("sidebar")
            .resizable(false)
            .exact_width(260.0)
            .show(ctx, |ui| {
                egui::Frame::none()
                    .inner_margin(egui::Margin::symmetric(16.0, 0.0))
                    .show(ui, |ui| self.ui_sidebar(ui));
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::Frame::none()
                .inner_margin(egui::Margin::symmetric(24.0, 0.0))
                .show(ui, |ui| match self.current_screen {
                    Screen::Chat => self.ui_chat(ui),
                    Screen::Logs => self.ui_logs_screen(ui),
                });
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_buffer_is_bounded() {
        for i in 0..(LOG_BUFFER_MAX_LINES + 10) {
            push_log_line(format!("line {}", i));
        }
        let buf = log_buffer().lock().unwrap();
        assert_eq!(buf.len(), LOG_BUFFER_MAX_LINES);
        assert_eq!(buf.back().map(String::as_str), Some("line 2009"));
    }

    #[test]
    fn chat_session_uses_config_endpoint() {
        let mut config = Config::default();
        config.flow.endpoint = "style".to_string();
        config.flow.base_url = "http://127.0.0.1:7861/".to_string();
        let chat = chat_session(&config).unwrap();
        assert_eq!(chat.settings().endpoint, "style");
        assert_eq!(chat.runner().base_url(), "http://127.0.0.1:7861");
        assert!(chat.transcript().is_empty());
    }

    #[test]
    fn unreachable_flow_keeps_user_message_only() {
        let mut config = Config::default();
        config.flow.base_url = "http://127.0.0.1:1".to_string();
        config.flow.timeout_secs = 2;
        let mut chat = chat_session(&config).unwrap();
        let request = chat.begin_turn("hi", &StyleProfile::default());
        let result = run_flow_request(chat.runner().clone(), request).unwrap();
        let err = chat.finish_turn(result).unwrap_err();
        assert!(matches!(err, FlowError::Transport(_)));
        assert!(err.to_string().contains("flow request failed"));
        assert_eq!(chat.transcript().len(), 1);
        assert_eq!(chat.transcript().messages()[0].role, Role::User);
    }
}
