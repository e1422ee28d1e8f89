use std::path::PathBuf;

use eframe::egui;
use image::DynamicImage;
use log::{info, warn};

use pinmap::config::{MapConfig, OverlayLayer};
use pinmap::mode::InteractionMode;
use pinmap::normalize::{format_hex_color, parse_hex_color, DEFAULT_PIN_COLOR};
use pinmap::persistence::EXPORT_FILE_NAME;
use pinmap::workflow::{DeleteStep, DialogView};
use pinmap::{Editor, MapPoint, MarkerSurface, Pin, PinId, ScreenAnchor, SurfaceEvent};

const MARKER_RADIUS: f32 = 9.0;
// pin head sits above the tip, which marks the exact map coordinate
const MARKER_LIFT: f32 = 14.0;

// ── Marker layer (the surface the editor drives) ────────────────────────────

struct Marker {
    pin: Pin,
    draggable: bool,
}

#[derive(Default)]
struct MarkerLayer {
    markers: Vec<Marker>,
    create_armed: bool,
}

impl MarkerLayer {
    fn get(&self, id: PinId) -> Option<&Marker> {
        self.markers.iter().find(|m| m.pin.id() == id)
    }
}

impl MarkerSurface for MarkerLayer {
    fn draw_marker(&mut self, pin: &Pin) {
        self.markers.push(Marker {
            pin: pin.clone(),
            draggable: false,
        });
    }

    fn update_marker(&mut self, pin: &Pin) {
        if let Some(marker) = self.markers.iter_mut().find(|m| m.pin.id() == pin.id()) {
            marker.pin = pin.clone();
        }
    }

    fn remove_marker(&mut self, id: PinId) {
        self.markers.retain(|m| m.pin.id() != id);
    }

    fn set_draggable(&mut self, id: PinId, draggable: bool) {
        if let Some(marker) = self.markers.iter_mut().find(|m| m.pin.id() == id) {
            marker.draggable = draggable;
        }
    }

    fn set_create_armed(&mut self, armed: bool) {
        self.create_armed = armed;
    }
}

fn marker_color(color: &str) -> egui::Color32 {
    let [r, g, b] = parse_hex_color(color)
        .or_else(|| parse_hex_color(DEFAULT_PIN_COLOR))
        .unwrap_or([0xe7, 0x4c, 0x3c]);
    egui::Color32::from_rgb(r, g, b)
}

// ── Overlays ────────────────────────────────────────────────────────────────

struct OverlayView {
    layer: OverlayLayer,
    texture: Option<egui::TextureHandle>,
    failed: bool,
}

impl OverlayView {
    fn ensure_texture(&mut self, ctx: &egui::Context) {
        if self.texture.is_some() || self.failed || !self.layer.visible {
            return;
        }
        match image::open(&self.layer.file) {
            Ok(img) => {
                let name = self.layer.display_name();
                self.texture = Some(upload_texture(ctx, &name, &img));
            }
            Err(err) => {
                warn!("overlay {} could not be loaded: {err}", self.layer.file.display());
                self.failed = true;
            }
        }
    }
}

fn upload_texture(ctx: &egui::Context, name: &str, img: &DynamicImage) -> egui::TextureHandle {
    let rgba = img.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    let pixels = rgba.as_flat_samples();
    let color_image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());
    ctx.load_texture(name, color_image, egui::TextureOptions::LINEAR)
}

// ── App ─────────────────────────────────────────────────────────────────────

pub struct MapApp {
    editor: Editor,
    markers: MarkerLayer,
    pins_path: PathBuf,

    image_path: PathBuf,
    texture: Option<egui::TextureHandle>,
    raw_image: Option<DynamicImage>,
    image_size: (f32, f32),
    map_size: (f64, f64),
    overlays: Vec<OverlayView>,

    // pan & zoom
    pan: egui::Vec2,
    zoom: f32,
    panning: bool,

    toolbar_collapsed: bool,
    popup: Option<PinId>,
    dragging: Option<(PinId, egui::Pos2)>,
    dialog_just_opened: bool,
    status: Option<String>,
}

impl MapApp {
    pub fn new(config: MapConfig) -> Self {
        let raw_image = match image::open(&config.image) {
            Ok(img) => Some(img),
            Err(err) => {
                warn!("map image {} could not be loaded: {err}", config.image.display());
                None
            }
        };
        let pixel_size = raw_image
            .as_ref()
            .map(|img| (f64::from(img.width()), f64::from(img.height())));
        let map_size = config.map_size(pixel_size);
        let image_size = pixel_size
            .map(|(w, h)| (w as f32, h as f32))
            .unwrap_or((map_size.0 as f32, map_size.1 as f32));

        let mut editor = Editor::new();
        let mut markers = MarkerLayer::default();
        let status = match editor.load_file(&config.pins, &mut markers) {
            Ok(count) => Some(format!("Loaded {count} pins")),
            Err(err) => {
                warn!("starting without pins: {err}");
                Some(format!("No pins loaded: {err}"))
            }
        };

        let overlays = config
            .layers
            .iter()
            .cloned()
            .map(|layer| OverlayView {
                layer,
                texture: None,
                failed: false,
            })
            .collect();

        Self {
            editor,
            markers,
            pins_path: config.pins,
            image_path: config.image,
            texture: None,
            raw_image,
            image_size,
            map_size,
            overlays,
            pan: egui::Vec2::ZERO,
            zoom: 1.0,
            panning: false,
            toolbar_collapsed: true,
            popup: None,
            dragging: None,
            dialog_just_opened: false,
            status,
        }
    }

    pub fn title(&self) -> String {
        format!(
            "pinmap - {}",
            self.image_path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("")
        )
    }

    /// Map coordinates have their origin at the image's bottom-left corner.
    fn map_to_image(&self, p: MapPoint) -> egui::Pos2 {
        let sx = self.image_size.0 as f64 / self.map_size.0;
        let sy = self.image_size.1 as f64 / self.map_size.1;
        egui::pos2((p.x * sx) as f32, ((self.map_size.1 - p.y) * sy) as f32)
    }

    fn image_to_map(&self, p: egui::Pos2) -> MapPoint {
        let sx = self.map_size.0 / self.image_size.0 as f64;
        let sy = self.map_size.1 / self.image_size.1 as f64;
        MapPoint::new(f64::from(p.x) * sx, self.map_size.1 - f64::from(p.y) * sy)
    }

    fn image_to_screen(&self, canvas_rect: egui::Rect, img_pos: egui::Pos2) -> egui::Pos2 {
        let center = canvas_rect.center();
        center
            + self.pan
            + (img_pos.to_vec2() - egui::vec2(self.image_size.0, self.image_size.1) * 0.5)
                * self.zoom
    }

    fn screen_to_image(&self, canvas_rect: egui::Rect, screen_pos: egui::Pos2) -> egui::Pos2 {
        let center = canvas_rect.center();
        let rel = screen_pos - center - self.pan;
        egui::pos2(
            rel.x / self.zoom + self.image_size.0 * 0.5,
            rel.y / self.zoom + self.image_size.1 * 0.5,
        )
    }

    fn image_rect_on_screen(&self, canvas_rect: egui::Rect) -> egui::Rect {
        let top_left = self.image_to_screen(canvas_rect, egui::Pos2::ZERO);
        let bot_right =
            self.image_to_screen(canvas_rect, egui::pos2(self.image_size.0, self.image_size.1));
        egui::Rect::from_min_max(top_left, bot_right)
    }

    fn marker_tip(&self, canvas_rect: egui::Rect, marker: &Marker) -> egui::Pos2 {
        if let Some((id, img_pos)) = self.dragging {
            if id == marker.pin.id() {
                return self.image_to_screen(canvas_rect, img_pos);
            }
        }
        self.image_to_screen(canvas_rect, self.map_to_image(marker.pin.position))
    }

    fn ensure_texture(&mut self, ctx: &egui::Context) {
        if self.texture.is_none() {
            if let Some(ref img) = self.raw_image {
                self.texture = Some(upload_texture(ctx, "map", img));
            }
        }
        for overlay in &mut self.overlays {
            overlay.ensure_texture(ctx);
        }
    }

    fn hit_test(&self, canvas_rect: egui::Rect, screen_pos: egui::Pos2) -> Option<PinId> {
        self.markers
            .markers
            .iter()
            .rev()
            .find(|m| {
                let head = self.marker_tip(canvas_rect, m) - egui::vec2(0.0, MARKER_LIFT);
                (head - screen_pos).length() <= MARKER_RADIUS + 3.0
            })
            .map(|m| m.pin.id())
    }

    fn draw_markers(&self, painter: &egui::Painter, canvas_rect: egui::Rect) {
        for marker in &self.markers.markers {
            let tip = self.marker_tip(canvas_rect, marker);
            let head = tip - egui::vec2(0.0, MARKER_LIFT);
            let fill = marker_color(marker.pin.color());
            let outline = if marker.draggable {
                egui::Stroke::new(2.0, egui::Color32::from_rgb(0, 120, 255))
            } else {
                egui::Stroke::new(1.5, egui::Color32::WHITE)
            };
            painter.line_segment([head, tip], egui::Stroke::new(2.0, fill));
            painter.circle(head, MARKER_RADIUS, fill, outline);
        }
    }

    fn save(&mut self) {
        let mut dialog = rfd::FileDialog::new()
            .set_file_name(EXPORT_FILE_NAME)
            .add_filter("JSON", &["json"]);
        if let Some(dir) = self.pins_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            dialog = dialog.set_directory(dir);
        }
        let Some(path) = dialog.save_file() else {
            info!("export cancelled");
            return;
        };
        self.status = Some(match self.editor.save_file(&path) {
            Ok(()) => format!("Saved {} pins to {}", self.editor.store().len(), path.display()),
            Err(err) => {
                warn!("{err}");
                format!("Save failed: {err}")
            }
        });
    }

    fn dispatch(&mut self, events: Vec<SurfaceEvent>) {
        for event in events {
            let opens_dialog = !matches!(event, SurfaceEvent::DragEnded { .. });
            match self.editor.handle_event(event, &mut self.markers) {
                Ok(()) => {
                    if opens_dialog && !matches!(self.editor.dialog(), DialogView::Closed) {
                        self.dialog_just_opened = true;
                        self.popup = None;
                    }
                }
                Err(err) => warn!("{err}"),
            }
        }
    }

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let arrow = if self.toolbar_collapsed { "▸" } else { "▾" };
            if ui.button(arrow).on_hover_text("Show or hide tools").clicked() {
                self.toolbar_collapsed = !self.toolbar_collapsed;
            }
            if self.toolbar_collapsed {
                return;
            }
            let add_active = self.editor.mode() == InteractionMode::AddActive;
            let move_active = self.editor.mode() == InteractionMode::MoveActive;
            if ui.selectable_label(add_active, "Add pin").clicked() {
                self.editor.toggle_add(&mut self.markers);
            }
            if ui.selectable_label(move_active, "Move pins").clicked() {
                self.editor.toggle_move(&mut self.markers);
            }
            if ui.button("Save").clicked() {
                self.save();
            }
            ui.separator();
            ui.label(format!("Zoom: {:.0}%", self.zoom * 100.0));
            if let Some(status) = &self.status {
                ui.separator();
                ui.label(status);
            }
        });
    }

    fn layers_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Layers");
        for overlay in &mut self.overlays {
            ui.horizontal(|ui| {
                let name = overlay.layer.display_name();
                ui.checkbox(&mut overlay.layer.visible, name);
                let mut percent = overlay.layer.opacity_percent();
                if ui
                    .add(egui::Slider::new(&mut percent, 0..=100).suffix("%"))
                    .on_hover_text("Opacity")
                    .changed()
                {
                    overlay.layer.set_opacity_percent(percent);
                }
            });
        }
    }

    fn pin_dialog(&mut self, ctx: &egui::Context) {
        let (anchor, title, confirming_delete, editing) = match self.editor.dialog() {
            DialogView::Closed => return,
            DialogView::Edit {
                anchor,
                confirming_delete,
                ..
            } => (anchor, "Edit pin", confirming_delete, true),
            DialogView::Create { anchor, .. } => (anchor, "New pin", false, false),
        };

        let mut submit = ctx.input(|i| i.key_pressed(egui::Key::Enter));
        let mut dismiss = ctx.input(|i| i.key_pressed(egui::Key::Escape));
        let mut delete = false;
        let mut delete_answer = None;

        let window = egui::Window::new(title)
            .id(egui::Id::new("pin_dialog"))
            .collapsible(false)
            .resizable(false)
            .fixed_pos(egui::pos2(anchor.x + 8.0, anchor.y + 8.0))
            .show(ctx, |ui| {
                let form = self.editor.form_mut();
                egui::Grid::new("pin_form").num_columns(2).show(ui, |ui| {
                    ui.label("Name");
                    ui.text_edit_singleline(&mut form.name);
                    ui.end_row();
                    ui.label("Description");
                    ui.text_edit_singleline(&mut form.description);
                    ui.end_row();
                    ui.label("Link");
                    ui.text_edit_singleline(&mut form.link);
                    ui.end_row();
                    ui.label("Color");
                    ui.horizontal(|ui| {
                        let mut rgb = parse_hex_color(&form.color)
                            .or_else(|| parse_hex_color(DEFAULT_PIN_COLOR))
                            .unwrap_or_default();
                        if ui.color_edit_button_srgb(&mut rgb).changed() {
                            form.color = format_hex_color(rgb);
                        }
                        ui.text_edit_singleline(&mut form.color);
                    });
                    ui.end_row();
                });
                ui.separator();
                if confirming_delete {
                    ui.label("Delete this pin?");
                    ui.horizontal(|ui| {
                        if ui.button("Delete").clicked() {
                            delete_answer = Some(true);
                        }
                        if ui.button("Keep").clicked() {
                            delete_answer = Some(false);
                        }
                    });
                } else {
                    ui.horizontal(|ui| {
                        if ui.button("Save").clicked() {
                            submit = true;
                        }
                        let delete_label = if editing { "Delete" } else { "Discard" };
                        if ui.button(delete_label).clicked() {
                            delete = true;
                        }
                        if ui.button("Cancel").clicked() {
                            dismiss = true;
                        }
                    });
                }
            });

        let pressed_at = ctx.input(|i| {
            if i.pointer.any_pressed() {
                i.pointer.interact_pos()
            } else {
                None
            }
        });
        if let (Some(window), Some(pos)) = (&window, pressed_at) {
            if !self.dialog_just_opened && !window.response.rect.contains(pos) {
                dismiss = true;
            }
        }
        self.dialog_just_opened = false;

        let result = if let Some(approved) = delete_answer {
            self.editor
                .resolve_delete(&mut self.markers, approved)
                .map(|step| {
                    if let DeleteStep::Deleted(pin) = step {
                        self.status = Some(format!("Deleted {}", pin.name()));
                    }
                })
        } else if delete {
            self.editor.delete_in_dialog(&mut self.markers).map(|_| ())
        } else if dismiss {
            self.editor.dismiss_dialog(&mut self.markers);
            Ok(())
        } else if submit && !confirming_delete {
            self.editor.confirm_dialog(&mut self.markers).map(|_| ())
        } else {
            Ok(())
        };
        if let Err(err) = result {
            warn!("{err}");
        }
    }

    fn pin_popup(&mut self, ctx: &egui::Context, canvas_rect: egui::Rect) {
        let Some(id) = self.popup else {
            return;
        };
        let shown = self
            .markers
            .get(id)
            .map(|m| (self.marker_tip(canvas_rect, m), m.pin.clone()));
        let Some((tip, pin)) = shown else {
            self.popup = None;
            return;
        };
        let anchor = tip - egui::vec2(0.0, MARKER_LIFT * 2.0);
        egui::Area::new(egui::Id::new("pin_popup"))
            .fixed_pos(anchor)
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.set_max_width(260.0);
                    if pin.link().is_empty() {
                        ui.strong(pin.name());
                    } else {
                        ui.hyperlink_to(pin.name(), pin.link());
                    }
                    if !pin.description().is_empty() {
                        ui.label(pin.description());
                    }
                });
            });
    }
}

// ── eframe App impl ────────────────────────────────────────────────────────

impl eframe::App for MapApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.ensure_texture(ctx);

        if ctx.input(|i| i.modifiers.command && i.key_pressed(egui::Key::S)) {
            self.save();
        }

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| self.toolbar(ui));

        if !self.overlays.is_empty() {
            egui::SidePanel::right("layers")
                .resizable(false)
                .show(ctx, |ui| self.layers_panel(ui));
        }

        let mut events = Vec::new();
        let mut canvas = egui::Rect::NOTHING;

        egui::CentralPanel::default().show(ctx, |ui| {
            let (response, painter) =
                ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
            let canvas_rect = response.rect;
            canvas = canvas_rect;

            painter.rect_filled(canvas_rect, 0.0, egui::Color32::from_gray(40));

            let img_rect = self.image_rect_on_screen(canvas_rect);
            let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
            if let Some(ref tex) = self.texture {
                painter.image(tex.id(), img_rect, uv, egui::Color32::WHITE);
            }
            for overlay in &self.overlays {
                if let (true, Some(tex)) = (overlay.layer.visible, &overlay.texture) {
                    let alpha = (overlay.layer.opacity * 255.0).round() as u8;
                    painter.image(tex.id(), img_rect, uv, egui::Color32::from_white_alpha(alpha));
                }
            }

            self.draw_markers(&painter, canvas_rect);

            // Handle pan (middle mouse button)
            let middle_down = ctx.input(|i| i.pointer.middle_down());
            if middle_down {
                let delta = ctx.input(|i| i.pointer.delta());
                self.pan += delta;
                self.panning = true;
            } else {
                self.panning = false;
            }

            // Handle zoom (scroll wheel)
            let scroll_delta = ctx.input(|i| i.smooth_scroll_delta.y);
            if scroll_delta != 0.0 && response.hovered() {
                let zoom_factor = 1.0 + scroll_delta * 0.002;
                let new_zoom = (self.zoom * zoom_factor).clamp(0.02, 10.0);
                if let Some(cursor) = response.hover_pos() {
                    let center = canvas_rect.center();
                    let cursor_rel = cursor - center - self.pan;
                    self.pan -= cursor_rel * (new_zoom / self.zoom - 1.0);
                }
                self.zoom = new_zoom;
            }

            if self.panning {
                return;
            }

            if response.secondary_clicked() {
                if let Some(pos) = response.interact_pointer_pos() {
                    if let Some(id) = self.hit_test(canvas_rect, pos) {
                        events.push(SurfaceEvent::RequestEditOf {
                            id,
                            anchor: ScreenAnchor::new(pos.x, pos.y),
                        });
                    }
                }
            }

            if response.clicked() {
                if let Some(pos) = response.interact_pointer_pos() {
                    match self.hit_test(canvas_rect, pos) {
                        Some(id) => self.popup = Some(id),
                        None if self.markers.create_armed => {
                            let img_pos = self.screen_to_image(canvas_rect, pos);
                            events.push(SurfaceEvent::RequestCreateAt {
                                position: self.image_to_map(img_pos),
                                anchor: ScreenAnchor::new(pos.x, pos.y),
                            });
                        }
                        None => self.popup = None,
                    }
                }
            }

            if response.drag_started_by(egui::PointerButton::Primary) {
                if let Some(pos) = response.interact_pointer_pos() {
                    let grabbed = self
                        .hit_test(canvas_rect, pos)
                        .and_then(|id| self.markers.get(id))
                        .filter(|m| m.draggable)
                        .map(|m| (m.pin.id(), self.map_to_image(m.pin.position)));
                    if grabbed.is_some() {
                        self.dragging = grabbed;
                    }
                }
            }

            if response.dragged_by(egui::PointerButton::Primary) {
                let delta_img = response.drag_delta() / self.zoom;
                if let Some((_, img_pos)) = &mut self.dragging {
                    *img_pos += delta_img;
                }
            }

            if response.drag_stopped_by(egui::PointerButton::Primary) {
                if let Some((id, img_pos)) = self.dragging.take() {
                    events.push(SurfaceEvent::DragEnded {
                        id,
                        position: self.image_to_map(img_pos),
                    });
                }
            }
        });

        self.dispatch(events);
        self.pin_popup(ctx, canvas);
        self.pin_dialog(ctx);
    }
}
