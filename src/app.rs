use crate::ui_theme::StudioTheme;
use eframe::egui;
use outpaint_studio::aspect_ratio::ASPECT_RATIOS;
use outpaint_studio::config::AppConfig;
use outpaint_studio::fill_service::{FillOrchestrator, FillResult};
use outpaint_studio::gemini_client::GeminiClient;
use outpaint_studio::session::{Session, SessionState};
use outpaint_studio::transport;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

const PROMPT_PLACEHOLDER: &str = "Example: add a starry sky in the empty area";
const MAX_LOGS: usize = 1000;

pub struct OutpaintApp {
    session: Session,
    config: AppConfig,
    prompt: String,

    // Core components
    orchestrator: Option<Arc<FillOrchestrator<GeminiClient>>>,
    runtime: tokio::runtime::Runtime,

    // Fill results come back from the runtime through this channel
    result_sender: mpsc::UnboundedSender<(Uuid, FillResult)>,
    result_receiver: mpsc::UnboundedReceiver<(Uuid, FillResult)>,

    // UI state
    logs: Vec<String>,
    canvas_texture: Option<egui::TextureHandle>,
    result_texture: Option<Result<egui::TextureHandle, String>>,
    show_preview: bool,

    theme: StudioTheme,
}

impl OutpaintApp {
    pub fn new() -> Result<Self, std::io::Error> {
        let runtime = tokio::runtime::Runtime::new()?;
        let (result_sender, result_receiver) = mpsc::unbounded_channel();

        let config_path = AppConfig::default_path();
        let config = AppConfig::load_or_default(&config_path).with_env_overrides();
        let mut logs = Vec::new();

        if !config_path.exists() {
            match config.save(&config_path) {
                Ok(()) => logs.push(format!("💾 Wrote default settings to {}", config_path.display())),
                Err(e) => logs.push(format!("❌ Failed to save config: {}", e)),
            }
        }

        let orchestrator = match AppConfig::api_key_from_env() {
            Ok(api_key) => {
                logs.push(format!("✅ Using model {}", config.model));
                Some(Arc::new(config.orchestrator(api_key)))
            }
            Err(e) => {
                logs.push(format!("⚠️ {}. AI fill is disabled.", e));
                None
            }
        };

        Ok(Self {
            session: Session::new(config.max_canvas_dimension),
            config,
            prompt: String::new(),
            orchestrator,
            runtime,
            result_sender,
            result_receiver,
            logs,
            canvas_texture: None,
            result_texture: None,
            show_preview: false,
            theme: StudioTheme::default(),
        })
    }

    fn log(&mut self, message: String) {
        log::info!("{}", message);
        self.logs.push(message);
        if self.logs.len() > MAX_LOGS {
            let remove_count = self.logs.len() - MAX_LOGS;
            self.logs.drain(0..remove_count);
        }
    }

    fn pick_image(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Images", &["png", "jpg", "jpeg", "webp"])
            .pick_file()
        else {
            return;
        };
        self.load_image(path);
    }

    fn load_image(&mut self, path: PathBuf) {
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.log(format!("❌ Failed to read {}: {}", path.display(), e));
                return;
            }
        };
        let file_name = path.file_name().and_then(|n| n.to_str());
        match self.session.upload(&bytes, file_name) {
            Ok(()) => {
                self.invalidate_textures();
                self.log(format!("📥 Loaded {}", path.display()));
            }
            Err(e) => self.log(format!("❌ {}", e)),
        }
    }

    fn submit(&mut self, ctx: &egui::Context) {
        let Some(orchestrator) = self.orchestrator.clone() else {
            self.log("❌ Set the API_KEY environment variable to enable AI fill".to_string());
            return;
        };

        self.session.set_prompt(self.prompt.clone());
        let ticket = match self.session.submit() {
            Ok(ticket) => ticket,
            Err(e) => {
                self.log(format!("❌ {}", e));
                return;
            }
        };
        self.result_texture = None;
        self.log(format!(
            "⬆ Sending {}x{} canvas to {}",
            self.session.canvas_size().width,
            self.session.canvas_size().height,
            self.config.model
        ));

        let sender = self.result_sender.clone();
        let ctx = ctx.clone();
        self.runtime.spawn(async move {
            let result = orchestrator.fill(&ticket.request).await;
            let _ = sender.send((ticket.id, result));
            ctx.request_repaint();
        });
    }

    fn download(&mut self) {
        let (Some(encoded), Some(file_name)) = (
            self.session.result_image().map(str::to_string),
            self.session.download_file_name(),
        ) else {
            return;
        };

        let data = match transport::parse_data_uri(&encoded) {
            Ok(data) => data,
            Err(e) => {
                self.log(format!("❌ Cannot save result: {}", e));
                return;
            }
        };
        let Some(path) = rfd::FileDialog::new().set_file_name(&file_name).save_file() else {
            return;
        };
        match std::fs::write(&path, &data.bytes) {
            Ok(()) => self.log(format!("💾 Saved {}", path.display())),
            Err(e) => self.log(format!("❌ Failed to save {}: {}", path.display(), e)),
        }
    }

    fn reset(&mut self) {
        match self.session.reset() {
            Ok(()) => {
                self.prompt.clear();
                self.invalidate_textures();
                self.show_preview = false;
                self.log("🔄 Started over".to_string());
            }
            Err(e) => self.log(format!("❌ {}", e)),
        }
    }

    fn invalidate_textures(&mut self) {
        self.canvas_texture = None;
        self.result_texture = None;
    }

    fn poll_results(&mut self) {
        while let Ok((ticket, result)) = self.result_receiver.try_recv() {
            if !self.session.complete(ticket, result) {
                continue;
            }
            self.result_texture = None;
            let line = match self.session.state() {
                SessionState::Filled { .. } => "🎉 Image extended by AI!".to_string(),
                SessionState::Errored { message, .. } => format!("❌ {}", message),
                _ => continue,
            };
            self.log(line);
        }
    }

    fn canvas_texture(&mut self, ctx: &egui::Context) -> Option<egui::TextureHandle> {
        if self.canvas_texture.is_none() {
            let canvas = self.session.canvas()?;
            let pixels = canvas.pixels();
            let image = egui::ColorImage::from_rgba_unmultiplied(
                [pixels.width() as usize, pixels.height() as usize],
                pixels.as_raw(),
            );
            self.canvas_texture = Some(ctx.load_texture("canvas", image, egui::TextureOptions::LINEAR));
        }
        self.canvas_texture.clone()
    }

    fn result_texture(&mut self, ctx: &egui::Context) -> Option<Result<egui::TextureHandle, String>> {
        if self.result_texture.is_none() {
            let encoded = self.session.result_image()?;
            let decoded = transport::parse_data_uri(encoded)
                .map_err(|e| e.to_string())
                .and_then(|data| image::load_from_memory(&data.bytes).map_err(|e| e.to_string()))
                .map(|img| {
                    let rgba = img.to_rgba8();
                    let image = egui::ColorImage::from_rgba_unmultiplied(
                        [rgba.width() as usize, rgba.height() as usize],
                        rgba.as_raw(),
                    );
                    ctx.load_texture("result", image, egui::TextureOptions::LINEAR)
                });
            if let Err(e) = &decoded {
                log::error!("❌ Could not decode AI result: {}", e);
            }
            self.result_texture = Some(decoded);
        }
        self.result_texture.clone()
    }
}

/// Largest size with the texture's aspect ratio inside `bounds`.
fn fit_size(texture: &egui::TextureHandle, bounds: egui::Vec2) -> egui::Vec2 {
    let size = texture.size_vec2();
    let scale = (bounds.x / size.x).min(bounds.y / size.y).max(0.0);
    size * scale
}

impl eframe::App for OutpaintApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.theme.apply_to_ctx(ctx);
        self.poll_results();

        if self.show_preview && ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.show_preview = false;
        }

        egui::TopBottomPanel::bottom("logs_panel")
            .resizable(true)
            .default_height(120.0)
            .show(ctx, |ui| self.show_logs_panel(ui));

        egui::SidePanel::right("controls_panel")
            .resizable(false)
            .exact_width(300.0)
            .show(ctx, |ui| self.show_controls(ui, ctx));

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(self.theme.spacing_medium);
            ui.heading(
                egui::RichText::new("Outpaint Studio")
                    .strong()
                    .color(self.theme.text_primary),
            );
            ui.add_space(self.theme.spacing_medium);
            self.show_previews(ui, ctx);
        });

        self.show_preview_window(ctx);
    }
}

impl OutpaintApp {
    fn show_previews(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        let available = ui.available_size();
        let column_width = (available.x - self.theme.spacing_large) / 2.0;
        let bounds = egui::vec2(column_width - 2.0 * self.theme.padding_medium, available.y - 80.0);

        ui.horizontal_top(|ui| {
            // Composited canvas
            ui.allocate_ui(egui::vec2(column_width, available.y), |ui| {
                self.theme.card_frame().show(ui, |ui| {
                    ui.set_width(column_width - 2.0 * self.theme.padding_medium);
                    ui.label(egui::RichText::new("Preview").strong().color(self.theme.text_primary));
                    ui.add_space(self.theme.spacing_small);

                    match self.canvas_texture(ctx) {
                        Some(texture) => {
                            let size = fit_size(&texture, bounds);
                            let response = self
                                .theme
                                .canvas_frame()
                                .show(ui, |ui| {
                                    ui.add(
                                        egui::Image::from_texture(egui::load::SizedTexture::new(
                                            texture.id(),
                                            size,
                                        ))
                                        .sense(egui::Sense::click()),
                                    )
                                })
                                .inner
                                .on_hover_text("Click to replace the image");
                            if response.clicked() && self.session.can_upload() {
                                self.pick_image();
                            }
                            let dims = self.session.canvas_size();
                            ui.label(
                                egui::RichText::new(format!(
                                    "{} · {}x{}",
                                    self.session.ratio().name(),
                                    dims.width,
                                    dims.height
                                ))
                                .size(12.0)
                                .color(self.theme.text_muted),
                            );
                        }
                        None => {
                            ui.allocate_ui(bounds, |ui| {
                                ui.centered_and_justified(|ui| {
                                    if ui
                                        .button(
                                            egui::RichText::new("📂 Click to choose an image (PNG, JPG, WEBP)")
                                                .color(self.theme.text_secondary),
                                        )
                                        .clicked()
                                    {
                                        self.pick_image();
                                    }
                                });
                            });
                        }
                    }
                });
            });

            ui.add_space(self.theme.spacing_large);

            // AI result
            ui.allocate_ui(egui::vec2(column_width, available.y), |ui| {
                self.theme.card_frame().show(ui, |ui| {
                    ui.set_width(column_width - 2.0 * self.theme.padding_medium);
                    ui.label(egui::RichText::new("AI Result").strong().color(self.theme.text_primary));
                    ui.add_space(self.theme.spacing_small);

                    if self.session.is_filling() {
                        ui.horizontal(|ui| {
                            ui.spinner();
                            ui.label(
                                egui::RichText::new("AI is extending your image...")
                                    .color(self.theme.text_secondary),
                            );
                        });
                        return;
                    }

                    match self.result_texture(ctx) {
                        Some(Ok(texture)) => {
                            let size = fit_size(&texture, bounds);
                            let response = ui
                                .add(
                                    egui::Image::from_texture(egui::load::SizedTexture::new(
                                        texture.id(),
                                        size,
                                    ))
                                    .rounding(self.theme.radius_small)
                                    .sense(egui::Sense::click()),
                                )
                                .on_hover_text("Click to view full size");
                            if response.clicked() {
                                self.show_preview = true;
                            }
                        }
                        Some(Err(e)) => {
                            ui.label(
                                egui::RichText::new(format!("❌ Result could not be displayed: {}", e))
                                    .color(self.theme.error),
                            );
                        }
                        None => {
                            ui.label(
                                egui::RichText::new("The AI result will appear here")
                                    .color(self.theme.text_muted),
                            );
                        }
                    }
                });
            });
        });
    }

    fn show_controls(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui.add_space(self.theme.spacing_large);

        // Aspect ratio
        ui.label(
            egui::RichText::new("1. Choose an aspect ratio")
                .strong()
                .color(self.theme.text_primary),
        );
        ui.add_space(self.theme.spacing_small);
        ui.horizontal_wrapped(|ui| {
            for ratio in ASPECT_RATIOS.iter() {
                let selected = self.session.ratio() == *ratio;
                let clicked = ui
                    .add_enabled(
                        self.session.can_change_ratio(),
                        egui::SelectableLabel::new(selected, ratio.name()),
                    )
                    .clicked();
                if clicked && !selected {
                    match self.session.change_ratio(*ratio) {
                        Ok(()) => self.invalidate_textures(),
                        Err(e) => self.log(format!("❌ {}", e)),
                    }
                }
            }
        });

        ui.add_space(self.theme.spacing_large);

        // Prompt
        ui.label(
            egui::RichText::new("2. Extra instructions (optional)")
                .strong()
                .color(self.theme.text_primary),
        );
        ui.add_space(self.theme.spacing_small);
        ui.add(
            egui::TextEdit::multiline(&mut self.prompt)
                .hint_text(PROMPT_PLACEHOLDER)
                .desired_rows(4)
                .desired_width(f32::INFINITY),
        );

        ui.add_space(self.theme.spacing_large);

        let fill_enabled = self.session.can_submit() && self.orchestrator.is_some();
        let fill_label = if self.session.is_filling() {
            "⏳ Processing..."
        } else {
            "✨ Convert & Fill with AI"
        };
        let fill_button = egui::Button::new(
            egui::RichText::new(fill_label)
                .strong()
                .color(egui::Color32::WHITE),
        )
        .fill(self.theme.accent)
        .rounding(self.theme.radius_medium)
        .min_size(egui::vec2(ui.available_width(), 36.0));
        if ui.add_enabled(fill_enabled, fill_button).clicked() {
            self.submit(ctx);
        }

        ui.add_space(self.theme.spacing_small);
        ui.horizontal(|ui| {
            if ui
                .add_enabled(self.session.can_upload(), egui::Button::new("📂 Open image"))
                .clicked()
            {
                self.pick_image();
            }
            if ui
                .add_enabled(self.session.can_download(), egui::Button::new("💾 Download"))
                .clicked()
            {
                self.download();
            }
            if ui
                .add_enabled(self.session.can_reset(), egui::Button::new("🔄 Start over"))
                .clicked()
            {
                self.reset();
            }
        });

        ui.add_space(self.theme.spacing_large);

        // Status
        match self.session.state() {
            SessionState::Filled { completed_at, .. } => {
                ui.label(
                    egui::RichText::new(format!(
                        "✅ Image extended by AI ({})",
                        completed_at.format("%H:%M:%S")
                    ))
                    .color(self.theme.success),
                );
            }
            SessionState::Errored { message, .. } => {
                ui.label(egui::RichText::new(format!("❌ {}", message)).color(self.theme.error));
            }
            _ => {}
        }
        if self.orchestrator.is_none() {
            ui.label(
                egui::RichText::new("API_KEY is not set, AI fill is disabled")
                    .size(12.0)
                    .color(self.theme.text_muted),
            );
        }
    }

    fn show_preview_window(&mut self, ctx: &egui::Context) {
        if !self.show_preview {
            return;
        }
        let Some(Ok(texture)) = self.result_texture.clone() else {
            self.show_preview = false;
            return;
        };

        let mut open = true;
        let mut download_clicked = false;
        let screen = ctx.screen_rect().size();
        egui::Window::new("AI result preview")
            .open(&mut open)
            .collapsible(false)
            .resizable(true)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                let size = fit_size(&texture, screen * 0.75);
                ui.add(egui::Image::from_texture(egui::load::SizedTexture::new(texture.id(), size)));
                ui.add_space(self.theme.spacing_medium);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    download_clicked = ui.button("💾 Download image").clicked();
                });
            });

        if download_clicked {
            self.download();
        }
        self.show_preview = open;
    }

    fn show_logs_panel(&mut self, ui: &mut egui::Ui) {
        ui.add_space(self.theme.spacing_small);
        ui.label(egui::RichText::new("Logs").strong().color(self.theme.text_primary));
        egui::ScrollArea::vertical()
            .id_salt("logs_scroll")
            .stick_to_bottom(true)
            .auto_shrink([false; 2])
            .show(ui, |ui| {
                if self.logs.is_empty() {
                    ui.label(egui::RichText::new("No logs yet").color(self.theme.text_muted));
                }
                for (i, line) in self.logs.iter().enumerate() {
                    ui.horizontal_wrapped(|ui| {
                        ui.label(
                            egui::RichText::new(format!("{:>3}", i + 1))
                                .size(10.0)
                                .color(self.theme.text_muted),
                        );
                        ui.add_space(self.theme.spacing_small);
                        ui.label(
                            egui::RichText::new(line)
                                .size(12.0)
                                .color(self.theme.text_secondary),
                        );
                    });
                }
            });
    }
}
