//! Interview coach window (egui/eframe).
//!
//! # Architecture
//!
//! [`InterviewApp`] is the top-level [`eframe::App`].  It owns only form
//! state (setup choices, the resume text, the [`Composer`]); everything
//! about the interview itself lives in the shared [`SessionOrchestrator`].
//! Each frame the app pumps provider events, takes a [`SessionSnapshot`]
//! and renders the screen matching its state.  Operations that talk to the
//! agent are spawned on the tokio runtime and report back through the
//! orchestrator's state.
//!
//! # Screens
//!
//! | State | Screen |
//! |-------|--------|
//! | `Setup` | Interview type cards, duration, resume loader, Start |
//! | `InProgress` | Chat log, thinking indicator, composer, microphone |
//! | `Finished` | Feedback with bold spans, "Start a new interview" |

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use eframe::egui;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::config::AppConfig;
use crate::resume::{self, FileFormatError};
use crate::session::{
    InterviewDuration, InterviewSetup, InterviewType, SessionOrchestrator, SessionSnapshot,
    SessionState, Speaker,
};
use crate::speech::Composer;

const ACCENT: egui::Color32 = egui::Color32::from_rgb(68, 136, 255);
const DANGER: egui::Color32 = egui::Color32::from_rgb(220, 60, 60);
const ERROR_TEXT: egui::Color32 = egui::Color32::from_rgb(255, 136, 120);
const MUTED: egui::Color32 = egui::Color32::from_rgb(150, 150, 150);
const USER_BUBBLE: egui::Color32 = egui::Color32::from_rgb(37, 99, 235);
const AGENT_BUBBLE: egui::Color32 = egui::Color32::from_rgb(55, 65, 81);

// ---------------------------------------------------------------------------
// Setup form
// ---------------------------------------------------------------------------

/// Choices made on the setup screen before a session exists.
struct SetupForm {
    interview_type: InterviewType,
    duration: Option<InterviewDuration>,
    resume_path: String,
    resume_text: String,
    /// Inline error from the last load attempt.
    resume_error: Option<String>,
    /// Set while `resume::load_resume` runs.
    loading: Option<oneshot::Receiver<Result<String, FileFormatError>>>,
}

impl SetupForm {
    fn from_config(config: &AppConfig) -> Self {
        Self {
            interview_type: config.interview.interview_type,
            duration: config.interview.duration(),
            resume_path: String::new(),
            resume_text: String::new(),
            resume_error: None,
            loading: None,
        }
    }

    fn is_loading(&self) -> bool {
        self.loading.is_some()
    }

    fn can_start(&self) -> bool {
        !self.is_loading() && !self.resume_text.trim().is_empty()
    }

    fn setup(&self) -> InterviewSetup {
        let setup = InterviewSetup::new(self.resume_text.clone(), self.interview_type);
        match self.duration {
            Some(d) => setup.with_duration(d),
            None => setup,
        }
    }

    /// Pick up a finished load, if any.
    fn poll_loading(&mut self) {
        let Some(rx) = self.loading.as_mut() else {
            return;
        };
        match rx.try_recv() {
            Ok(Ok(text)) => {
                self.resume_text = text;
                self.resume_error = None;
                self.loading = None;
            }
            Ok(Err(e)) => {
                self.resume_error = Some(e.to_string());
                self.loading = None;
            }
            Err(oneshot::error::TryRecvError::Empty) => {}
            Err(oneshot::error::TryRecvError::Closed) => {
                self.resume_error = Some("Failed to read the file.".into());
                self.loading = None;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// InterviewApp
// ---------------------------------------------------------------------------

/// The interview coach window.
pub struct InterviewApp {
    orchestrator: Arc<SessionOrchestrator>,
    runtime: Handle,
    form: SetupForm,
    composer: Composer,
    /// Taken at the start of every frame.
    snapshot: SessionSnapshot,
    /// Log length at the last frame; a change scrolls the chat to the end.
    seen_turns: usize,
    /// Spinner animation phase (increases each frame).
    spinner_phase: f32,
}

impl InterviewApp {
    pub fn new(orchestrator: Arc<SessionOrchestrator>, runtime: Handle, config: &AppConfig) -> Self {
        let snapshot = orchestrator.snapshot();
        Self {
            orchestrator,
            runtime,
            form: SetupForm::from_config(config),
            composer: Composer::new().with_auto_submit(config.interview.auto_submit),
            snapshot,
            seen_turns: 0,
            spinner_phase: 0.0,
        }
    }

    fn name(&self) -> &str {
        self.orchestrator.interviewer_name()
    }

    // ── Actions ──────────────────────────────────────────────────────────

    fn load_resume(&mut self) {
        let path = PathBuf::from(self.form.resume_path.trim());
        let (tx, rx) = oneshot::channel();
        self.runtime.spawn(async move {
            let _ = tx.send(resume::load_resume(path).await);
        });
        self.form.resume_error = None;
        self.form.loading = Some(rx);
    }

    fn start_interview(&mut self) {
        let setup = self.form.setup();
        let orchestrator = Arc::clone(&self.orchestrator);
        self.runtime.spawn(async move {
            if let Err(e) = orchestrator.start(setup).await {
                log::warn!("app: start: {e}");
            }
        });
    }

    fn send_answer(&mut self) {
        if let Some(text) = self.composer.submit() {
            self.submit_text(text);
        }
    }

    fn submit_text(&mut self, text: String) {
        let orchestrator = Arc::clone(&self.orchestrator);
        self.runtime.spawn(async move {
            if let Err(e) = orchestrator.submit(&text).await {
                log::warn!("app: submit: {e}");
            }
        });
    }

    fn end_interview(&mut self) {
        let orchestrator = Arc::clone(&self.orchestrator);
        self.runtime.spawn(async move {
            if let Err(e) = orchestrator.end().await {
                log::warn!("app: end: {e}");
            }
        });
    }

    fn toggle_listening(&mut self) {
        // Opening the microphone blocks briefly.
        let orchestrator = Arc::clone(&self.orchestrator);
        self.runtime.spawn_blocking(move || {
            if let Err(e) = orchestrator.toggle_listening() {
                log::warn!("app: dictation: {e}");
            }
        });
    }

    fn new_interview(&mut self) {
        self.composer.clear();
        self.seen_turns = 0;
        let orchestrator = Arc::clone(&self.orchestrator);
        self.runtime.spawn(async move { orchestrator.reset().await });
    }

    // ── Setup screen ─────────────────────────────────────────────────────

    fn draw_setup(&mut self, ui: &mut egui::Ui) {
        let starting = self.snapshot.pending_reply;

        ui.vertical_centered(|ui| {
            ui.add_space(12.0);
            ui.heading(egui::RichText::new("AI Tech Interviewer").size(30.0).color(ACCENT));
            ui.label(
                egui::RichText::new("Prepare for your next senior SDE interview.").color(MUTED),
            );
        });
        ui.add_space(12.0);

        if let Some(err) = &self.snapshot.last_error {
            error_banner(ui, err);
            ui.add_space(8.0);
        }

        ui.add_enabled_ui(!starting && !self.form.is_loading(), |ui| {
            ui.strong("1. Select Interview Type");
            ui.add_space(4.0);
            egui::Grid::new("interview-types")
                .num_columns(2)
                .spacing([12.0, 12.0])
                .show(ui, |ui| {
                    for (i, kind) in InterviewType::ALL.iter().enumerate() {
                        self.draw_type_card(ui, *kind);
                        if i % 2 == 1 {
                            ui.end_row();
                        }
                    }
                });

            ui.add_space(12.0);
            ui.strong("2. Interview Length");
            ui.horizontal(|ui| {
                ui.selectable_value(&mut self.form.duration, None, "No limit");
                for preset in InterviewDuration::PRESETS {
                    ui.selectable_value(&mut self.form.duration, Some(preset), preset.to_string());
                }
            });

            ui.add_space(12.0);
            ui.strong("3. Resume");
            ui.horizontal(|ui| {
                ui.add(
                    egui::TextEdit::singleline(&mut self.form.resume_path)
                        .hint_text("Path to your resume (.pdf, .txt, .md)")
                        .desired_width(ui.available_width() - 80.0),
                );
                let can_load = !self.form.resume_path.trim().is_empty();
                if ui.add_enabled(can_load, egui::Button::new("Load")).clicked() {
                    self.load_resume();
                }
            });
        });

        if self.form.is_loading() {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label(egui::RichText::new("Reading resume...").color(MUTED));
            });
        }
        if let Some(err) = &self.form.resume_error {
            ui.label(egui::RichText::new(err).color(ERROR_TEXT).size(12.0));
        }

        ui.add_space(4.0);
        egui::ScrollArea::vertical()
            .id_salt("resume-text")
            .max_height(200.0)
            .show(ui, |ui| {
                ui.add_enabled(
                    !starting && !self.form.is_loading(),
                    egui::TextEdit::multiline(&mut self.form.resume_text)
                        .hint_text("...or paste it here")
                        .desired_rows(8)
                        .desired_width(f32::INFINITY),
                );
            });

        ui.add_space(12.0);
        let label = if starting {
            format!("{} Initializing...", self.spinner_char())
        } else {
            "Start Interview".to_string()
        };
        let start = egui::Button::new(egui::RichText::new(label).size(16.0))
            .min_size(egui::vec2(ui.available_width(), 40.0));
        if ui.add_enabled(!starting && self.form.can_start(), start).clicked() {
            self.start_interview();
        }

        ui.add_space(6.0);
        ui.vertical_centered(|ui| {
            ui.label(
                egui::RichText::new(
                    "Your resume is only used for this interview session and is not stored.",
                )
                .color(MUTED)
                .size(11.0),
            );
        });
    }

    fn draw_type_card(&mut self, ui: &mut egui::Ui, kind: InterviewType) {
        let selected = self.form.interview_type == kind;
        let stroke = if selected {
            egui::Stroke::new(2.0, ACCENT)
        } else {
            egui::Stroke::new(1.0, egui::Color32::from_gray(80))
        };

        let response = egui::Frame::new()
            .stroke(stroke)
            .corner_radius(egui::CornerRadius::same(8))
            .inner_margin(egui::Margin::same(10))
            .show(ui, |ui| {
                ui.set_width(360.0);
                ui.strong(kind.title());
                ui.label(egui::RichText::new(kind.description()).color(MUTED).size(12.0));
            })
            .response
            .interact(egui::Sense::click());

        if response.clicked() {
            self.form.interview_type = kind;
        }
    }

    // ── Interview screen ─────────────────────────────────────────────────

    fn draw_interview_header(&mut self, ui: &mut egui::Ui) {
        let waiting = self.snapshot.pending_reply;
        ui.horizontal(|ui| {
            let title = match &self.snapshot.setup {
                Some(setup) => format!("{} Interview", setup.interview_type.title()),
                None => "Technical Interview".to_string(),
            };
            ui.heading(egui::RichText::new(title).color(ACCENT));

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let end = egui::Button::new(
                    egui::RichText::new("End Interview").color(egui::Color32::WHITE),
                )
                .fill(DANGER);
                if ui.add_enabled(!waiting, end).clicked() {
                    self.end_interview();
                }
                if let Some(d) = self.snapshot.setup.as_ref().and_then(|s| s.duration) {
                    ui.label(egui::RichText::new(d.to_string()).color(MUTED));
                }
            });
        });
    }

    fn draw_chat(&mut self, ui: &mut egui::Ui) {
        let scroll_to_end = self.snapshot.log.len() != self.seen_turns;
        self.seen_turns = self.snapshot.log.len();
        let name = self.name().to_string();

        egui::ScrollArea::vertical()
            .id_salt("chat")
            .auto_shrink([false, false])
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for turn in &self.snapshot.log {
                    chat_bubble(ui, turn.speaker(), turn.text());
                    ui.add_space(6.0);
                }
                if self.snapshot.pending_reply && !self.snapshot.log.is_empty() {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label(
                            egui::RichText::new(format!("{name} is thinking..."))
                                .italics()
                                .color(MUTED),
                        );
                    });
                }
                if scroll_to_end {
                    ui.scroll_to_cursor(Some(egui::Align::BOTTOM));
                }
            });
    }

    fn draw_composer(&mut self, ui: &mut egui::Ui) {
        let waiting = self.snapshot.pending_reply;
        let listening = self.snapshot.listening;

        if let Some(err) = &self.snapshot.last_error {
            ui.label(egui::RichText::new(err).color(ERROR_TEXT).size(12.0));
        }
        let status = status_line(&self.snapshot, self.name()).unwrap_or_default();
        ui.vertical_centered(|ui| {
            ui.label(egui::RichText::new(status).italics().color(MUTED));
        });

        ui.horizontal(|ui| {
            let buttons_width = 110.0;
            let input_id = egui::Id::new("composer-input");

            // Enter sends; Shift+Enter reaches the text edit as a newline.
            // Consumed before the edit runs so no newline is inserted.
            let enter = ui.memory(|m| m.has_focus(input_id))
                && ui.input_mut(|i| i.consume_key(egui::Modifiers::NONE, egui::Key::Enter));

            ui.add_enabled(
                !waiting && !listening,
                egui::TextEdit::multiline(self.composer.text_mut())
                    .id(input_id)
                    .hint_text(
                        "Type your answer or code here... (Enter to send, Shift+Enter for new line)",
                    )
                    .code_editor()
                    .desired_rows(2)
                    .desired_width(ui.available_width() - buttons_width),
            );

            let can_send = !waiting && !listening && !self.composer.text().trim().is_empty();
            let send = ui.add_enabled(can_send, egui::Button::new("Send")).clicked();
            if can_send && (send || enter) {
                self.send_answer();
            }

            let (mic_label, mic_fill) = if listening {
                ("Stop", DANGER)
            } else {
                ("Mic", ACCENT)
            };
            let mic = egui::Button::new(egui::RichText::new(mic_label).color(egui::Color32::WHITE))
                .fill(mic_fill);
            if ui.add_enabled(!waiting, mic).clicked() {
                self.toggle_listening();
            }
        });
    }

    // ── Feedback screen ──────────────────────────────────────────────────

    fn draw_feedback(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(12.0);
            ui.heading(egui::RichText::new("Interview Feedback").size(28.0).color(ACCENT));
            ui.label(
                egui::RichText::new(format!(
                    "Here is a summary of your performance from {}.",
                    self.name()
                ))
                .color(MUTED),
            );
        });
        ui.add_space(12.0);

        let feedback = self.snapshot.feedback.clone().unwrap_or_default();
        egui::Frame::new()
            .fill(egui::Color32::from_gray(24))
            .corner_radius(egui::CornerRadius::same(8))
            .inner_margin(egui::Margin::same(14))
            .show(ui, |ui| {
                egui::ScrollArea::vertical()
                    .id_salt("feedback")
                    .max_height(ui.available_height() - 80.0)
                    .show(ui, |ui| {
                        for line in feedback.lines() {
                            formatted_line(ui, line);
                        }
                    });
            });

        ui.add_space(12.0);
        let again = egui::Button::new(egui::RichText::new("Start a new interview").size(16.0))
            .min_size(egui::vec2(ui.available_width(), 40.0));
        if ui.add(again).clicked() {
            self.new_interview();
        }
    }

    // ── Helpers ───────────────────────────────────────────────────────────

    /// A simple rotating ASCII spinner character driven by `spinner_phase`.
    fn spinner_char(&self) -> char {
        let chars = ['|', '/', '-', '\\'];
        let idx = (self.spinner_phase as usize) % chars.len();
        chars[idx]
    }
}

fn error_banner(ui: &mut egui::Ui, message: &str) {
    egui::Frame::new()
        .fill(egui::Color32::from_rgb(80, 20, 20))
        .stroke(egui::Stroke::new(1.0, DANGER))
        .corner_radius(egui::CornerRadius::same(6))
        .inner_margin(egui::Margin::same(8))
        .show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.label(egui::RichText::new(message).color(ERROR_TEXT));
        });
}

fn chat_bubble(ui: &mut egui::Ui, speaker: Speaker, text: &str) {
    let (layout, fill) = match speaker {
        Speaker::User => (egui::Layout::right_to_left(egui::Align::TOP), USER_BUBBLE),
        Speaker::Agent => (egui::Layout::left_to_right(egui::Align::TOP), AGENT_BUBBLE),
    };
    let max_width = ui.available_width() * 0.75;
    ui.with_layout(layout, |ui| {
        egui::Frame::new()
            .fill(fill)
            .corner_radius(egui::CornerRadius::same(12))
            .inner_margin(egui::Margin::symmetric(14, 10))
            .show(ui, |ui| {
                ui.set_max_width(max_width);
                ui.label(egui::RichText::new(text).color(egui::Color32::from_gray(235)));
            });
    });
}

/// Render one feedback line with `**bold**` spans as strong text.
fn formatted_line(ui: &mut egui::Ui, line: &str) {
    if line.trim().is_empty() {
        ui.add_space(6.0);
        return;
    }
    let mut job = egui::text::LayoutJob::default();
    let body = egui::FontId::proportional(14.0);
    for (text, bold) in bold_spans(line) {
        let format = egui::TextFormat {
            font_id: body.clone(),
            color: if bold {
                egui::Color32::WHITE
            } else {
                egui::Color32::from_gray(200)
            },
            ..Default::default()
        };
        job.append(&text, 0.0, format);
    }
    job.wrap.max_width = ui.available_width();
    ui.label(job);
}

/// Split a line into `(text, bold)` spans on `**` markers.  An unmatched
/// `**` is kept as literal text.
fn bold_spans(line: &str) -> Vec<(String, bool)> {
    let mut spans = Vec::new();
    let mut rest = line;
    while let Some(open) = rest.find("**") {
        let after = &rest[open + 2..];
        let Some(close) = after.find("**") else {
            break;
        };
        if open > 0 {
            spans.push((rest[..open].to_string(), false));
        }
        if close > 0 {
            spans.push((after[..close].to_string(), true));
        }
        rest = &after[close + 2..];
    }
    if !rest.is_empty() {
        spans.push((rest.to_string(), false));
    }
    spans
}

/// Footer status: dictation wins over playback.
fn status_line(snapshot: &SessionSnapshot, name: &str) -> Option<String> {
    if snapshot.listening {
        Some("Listening...".into())
    } else if snapshot.speaking {
        Some(format!("{name} is speaking..."))
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// eframe::App impl
// ---------------------------------------------------------------------------

impl eframe::App for InterviewApp {
    /// Called every frame by eframe.  Pumps provider events, refreshes the
    /// snapshot, then renders the screen for the current state.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // --- Poll ---------------------------------------------------------
        self.orchestrator.pump_events();
        self.snapshot = self.orchestrator.snapshot();
        self.form.poll_loading();
        let dictated = self
            .composer
            .sync(self.snapshot.listening, &self.snapshot.transcript);
        if let Some(text) = dictated {
            if self.snapshot.state == SessionState::InProgress {
                self.submit_text(text);
            }
        }

        // --- Advance spinner animation -------------------------------------
        self.spinner_phase += 0.08;
        if self.spinner_phase >= 4.0 {
            self.spinner_phase = 0.0;
        }

        // --- Schedule repaints while background work can change state ------
        let busy = self.snapshot.pending_reply
            || self.snapshot.listening
            || self.snapshot.speaking
            || self.form.is_loading();
        if busy {
            ctx.request_repaint_after(Duration::from_millis(66));
        } else if self.snapshot.state == SessionState::InProgress {
            ctx.request_repaint_after(Duration::from_millis(250));
        }

        match self.snapshot.state {
            SessionState::Setup => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    egui::ScrollArea::vertical()
                        .id_salt("setup")
                        .show(ui, |ui| self.draw_setup(ui));
                });
            }
            SessionState::InProgress => {
                egui::TopBottomPanel::top("header")
                    .show(ctx, |ui| self.draw_interview_header(ui));
                egui::TopBottomPanel::bottom("composer")
                    .min_height(90.0)
                    .show(ctx, |ui| self.draw_composer(ui));
                egui::CentralPanel::default().show(ctx, |ui| self.draw_chat(ui));
            }
            SessionState::Finished => {
                egui::CentralPanel::default().show(ctx, |ui| self.draw_feedback(ui));
            }
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        log::info!("interview coach closing");
        self.orchestrator.stop_listening();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
