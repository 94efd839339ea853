use iced::widget::image::Handle;
use iced::widget::{button, column, container, horizontal_space, row, scrollable, text, text_editor};
use iced::{Alignment, Element, Event, Length, Subscription, Task, Theme};
use rfd::{FileDialog, MessageButtons, MessageDialog, MessageDialogResult, MessageLevel};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use chrono::{Local, Utc};

// Declare the application modules
mod api;
mod download;
mod media;
mod state;
mod ui;

use api::client::{ApiError, EditOutcome};
use api::request::EditRequest;
use download::DownloadState;
use media::ImageSource;
use state::history::{dimension_label, HistoryEntry, HistoryRecord};
use state::input::{InputMode, InputSelection};
use state::progress::Progress;
use state::store::{Settings, Store};

/// How long the 100% progress state stays visible before the result
/// replaces it
const COMPLETION_HOLD: Duration = Duration::from_millis(500);

/// Quiet period after the last URL keystroke before the list is re-parsed
const URL_DEBOUNCE: Duration = Duration::from_millis(500);

/// Which top-level screen is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Main,
    History,
}

/// A finished render, ready for display and download
#[derive(Debug, Clone)]
pub struct RenderedResult {
    pub handle: Handle,
    /// Final image URL: the resized data URL, or the backend's URL verbatim
    pub image_url: String,
    pub width: u32,
    pub height: u32,
    /// The dimensions come from resize metadata and belong in filenames
    pub dims_from_resize: bool,
    pub processing_ms: i64,
    pub model: String,
}

/// Result area presentation state
#[derive(Debug, Clone)]
pub enum ResultState {
    Idle,
    Ready(RenderedResult),
    Failed { message: String, rate_limited: bool },
}

/// Output of the background render task
#[derive(Debug, Clone)]
pub struct RenderedImage {
    handle: Handle,
    image_url: String,
    width: u32,
    height: u32,
    dims_from_resize: bool,
}

/// Immutable snapshot of a submission, taken when the user clicks generate
#[derive(Debug)]
struct PendingJob {
    prompt: String,
    model: String,
    original: (u32, u32),
    started: Instant,
}

/// Main application state
pub struct RetouchStudio {
    /// Settings and history database
    store: Store,
    pub(crate) settings: Settings,
    pub(crate) input: InputSelection,
    pub(crate) url_text: text_editor::Content,
    pub(crate) prompt: String,
    pub(crate) progress: Progress,
    pub(crate) result: ResultState,
    pub(crate) download: DownloadState,
    pub(crate) history: Vec<HistoryRecord>,
    pub(crate) history_previews: HashMap<i64, Handle>,
    screen: Screen,
    /// An edit request is in flight
    pub(crate) busy: bool,
    pending_job: Option<PendingJob>,
    // Sequence numbers guarding each class of async completion. A completion
    // carrying a stale number is discarded, so superseded work can never
    // overwrite fresh state.
    job_seq: u64,
    probe_seq: u64,
    url_debounce_seq: u64,
    url_preview_seq: u64,
}

/// Application messages (events)
#[derive(Debug, Clone)]
pub enum Message {
    // Input collection
    SwitchMode(InputMode),
    PickFiles,
    FileDropped(PathBuf),
    RemoveFile(String),
    FilePreviewLoaded(String, Option<Handle>),
    UrlTextEdited(text_editor::Action),
    UrlDebounceElapsed(u64),
    RemoveUrl(usize),
    UrlPreviewLoaded(u64, usize, Option<Handle>),
    DimensionsProbed(u64, Result<(u32, u32), String>),
    // Settings and prompt
    ApiKeyChanged(String),
    ModelChanged(String),
    ApiBaseUrlChanged(String),
    EndpointChanged(String),
    PromptChanged(String),
    // Edit pipeline
    Generate,
    ImagesPrepared(u64, Result<Vec<String>, String>),
    EditCompleted(u64, Result<EditOutcome, ApiError>),
    ResultRendered(u64, Result<RenderedImage, String>),
    // Downloads
    DownloadCurrent,
    DownloadHistory(i64),
    DownloadFinished(Result<PathBuf, String>),
    DownloadReset,
    // History screen
    OpenHistory,
    CloseHistory,
    HistoryPreviewLoaded(i64, Option<Handle>),
    DeleteHistory(i64),
    ClearHistory,
}

impl RetouchStudio {
    /// Create a new instance of the application
    fn new() -> (Self, Task<Message>) {
        // If this fails, we panic because the app cannot function without its database
        let store = Store::new()
            .expect("Failed to initialize database. Check permissions and disk space.");

        let settings = match store.settings() {
            Ok(settings) => settings,
            Err(error) => {
                log::warn!("⚠️  Failed to load settings, using defaults: {}", error);
                Settings::default()
            }
        };
        let history = match store.history() {
            Ok(history) => history,
            Err(error) => {
                log::warn!("⚠️  Failed to load history: {}", error);
                Vec::new()
            }
        };

        log::info!(
            "🎨 Retouch Studio initialized with {} history records",
            history.len()
        );

        (
            RetouchStudio {
                store,
                settings,
                input: InputSelection::new(),
                url_text: text_editor::Content::new(),
                prompt: String::new(),
                progress: Progress::idle(),
                result: ResultState::Idle,
                download: DownloadState::Idle,
                history,
                history_previews: HashMap::new(),
                screen: Screen::Main,
                busy: false,
                pending_job: None,
                job_seq: 0,
                probe_seq: 0,
                url_debounce_seq: 0,
                url_preview_seq: 0,
            },
            Task::none(),
        )
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::SwitchMode(mode) => {
                if self.input.switch_mode(mode) {
                    self.url_text = text_editor::Content::new();
                    self.result = ResultState::Idle;
                    self.download = DownloadState::Idle;
                    self.progress.reset();
                    // Invalidate anything still in flight for the old mode
                    self.probe_seq += 1;
                    self.url_preview_seq += 1;
                }
                Task::none()
            }
            Message::PickFiles => {
                let files = FileDialog::new()
                    .set_title("选择图片")
                    .add_filter("图片", &["png", "jpg", "jpeg", "webp", "bmp", "gif", "tif", "tiff"])
                    .pick_files();

                match files {
                    Some(paths) => self.add_files(paths),
                    None => Task::none(),
                }
            }
            Message::FileDropped(path) => {
                if self.screen == Screen::Main && self.input.mode == InputMode::Upload {
                    self.add_files(vec![path])
                } else {
                    Task::none()
                }
            }
            Message::RemoveFile(name) => {
                self.input.remove_file(&name);
                self.refresh_dimensions()
            }
            Message::FilePreviewLoaded(name, preview) => {
                if let Some(handle) = preview {
                    self.input.set_file_preview(&name, handle);
                }
                Task::none()
            }
            Message::UrlTextEdited(action) => {
                let is_edit = action.is_edit();
                self.url_text.perform(action);
                if is_edit && self.input.mode == InputMode::Url {
                    self.url_debounce_seq += 1;
                    let seq = self.url_debounce_seq;
                    return Task::perform(tokio::time::sleep(URL_DEBOUNCE), move |_| {
                        Message::UrlDebounceElapsed(seq)
                    });
                }
                Task::none()
            }
            Message::UrlDebounceElapsed(seq) => {
                if seq != self.url_debounce_seq {
                    return Task::none();
                }
                if !self.input.set_urls(&self.url_text.text()) {
                    return Task::none();
                }
                if self.input.urls.is_empty() {
                    return self.refresh_dimensions();
                }

                self.progress.set(0, "URL图片加载成功", 25.0);
                self.url_preview_seq += 1;
                let preview_seq = self.url_preview_seq;

                let mut tasks = vec![self.refresh_dimensions()];
                for (index, url) in self.input.urls.iter().cloned().enumerate() {
                    tasks.push(Task::perform(
                        load_preview(ImageSource::Url(url)),
                        move |preview| Message::UrlPreviewLoaded(preview_seq, index, preview),
                    ));
                }
                Task::batch(tasks)
            }
            Message::RemoveUrl(index) => {
                let remaining = self.input.remove_url(index);
                self.url_text = text_editor::Content::with_text(&remaining);

                // Indices shifted; restart any loads that were still pending
                self.url_preview_seq += 1;
                let preview_seq = self.url_preview_seq;
                let mut tasks = vec![self.refresh_dimensions()];
                for (index, url) in self.input.urls.iter().cloned().enumerate() {
                    if matches!(
                        self.input.url_previews.get(index),
                        Some(state::input::UrlPreview::Loading)
                    ) {
                        tasks.push(Task::perform(
                            load_preview(ImageSource::Url(url)),
                            move |preview| Message::UrlPreviewLoaded(preview_seq, index, preview),
                        ));
                    }
                }
                Task::batch(tasks)
            }
            Message::UrlPreviewLoaded(seq, index, preview) => {
                if seq == self.url_preview_seq {
                    self.input.set_url_preview(index, preview);
                }
                Task::none()
            }
            Message::DimensionsProbed(seq, result) => {
                if seq != self.probe_seq {
                    return Task::none();
                }
                match result {
                    Ok((width, height)) => {
                        self.input.original_dimensions = Some((width, height));
                        self.input.probe_failed = false;
                        log::info!("📐 Original image size: {}x{}", width, height);
                    }
                    Err(error) => {
                        self.input.probe_failed = true;
                        log::warn!("⚠️  Dimension probe failed: {}", error);
                    }
                }
                Task::none()
            }
            Message::ApiKeyChanged(value) => {
                self.settings.api_key = value;
                Task::none()
            }
            Message::ModelChanged(value) => {
                self.settings.model = value;
                Task::none()
            }
            Message::ApiBaseUrlChanged(value) => {
                self.settings.api_base_url = value;
                Task::none()
            }
            Message::EndpointChanged(value) => {
                self.settings.endpoint = value;
                Task::none()
            }
            Message::PromptChanged(value) => {
                self.prompt = value;
                Task::none()
            }
            Message::Generate => self.generate(),
            Message::ImagesPrepared(seq, result) => {
                if seq != self.job_seq {
                    return Task::none();
                }
                match result {
                    Ok(images) => {
                        let Some(job) = &self.pending_job else {
                            return Task::none();
                        };
                        self.progress.set(2, "生成图片中...", 75.0);

                        let trimmed = self.settings.api_base_url.trim();
                        let api_base_url = (!trimmed.is_empty()).then(|| trimmed.to_string());
                        let request = EditRequest {
                            images,
                            prompt: job.prompt.clone(),
                            original_width: job.original.0,
                            original_height: job.original.1,
                            apikey: self.settings.api_key.clone(),
                            api_base_url,
                            model: job.model.clone(),
                        };

                        Task::perform(
                            api::client::edit_image(self.settings.endpoint.clone(), request),
                            move |result| Message::EditCompleted(seq, result),
                        )
                    }
                    Err(message) => self.fail_job(message, false),
                }
            }
            Message::EditCompleted(seq, result) => {
                if seq != self.job_seq {
                    return Task::none();
                }
                match result {
                    Ok(outcome) => {
                        self.progress.set(3, "处理完成", 100.0);
                        Task::perform(render_result(outcome), move |result| {
                            Message::ResultRendered(seq, result)
                        })
                    }
                    Err(error) => {
                        let rate_limited = error.is_rate_limited();
                        self.fail_job(error.to_string(), rate_limited)
                    }
                }
            }
            Message::ResultRendered(seq, result) => {
                if seq != self.job_seq {
                    return Task::none();
                }
                match result {
                    Ok(rendered) => self.finish_job(rendered),
                    Err(message) => self.fail_job(message, false),
                }
            }
            Message::DownloadCurrent => self.download_current(),
            Message::DownloadHistory(id) => self.download_history(id),
            Message::DownloadFinished(result) => match result {
                Ok(_) => {
                    if self.download == DownloadState::Downloading {
                        self.download = DownloadState::Success;
                        return Task::perform(
                            tokio::time::sleep(download::SUCCESS_RESET_DELAY),
                            |_| Message::DownloadReset,
                        );
                    }
                    Task::none()
                }
                Err(message) => {
                    if self.download == DownloadState::Downloading {
                        self.download = DownloadState::Idle;
                    }
                    log::error!("❌ Download failed: {}", message);
                    alert(&format!("下载失败: {}", message));
                    Task::none()
                }
            },
            Message::DownloadReset => {
                if self.download == DownloadState::Success {
                    self.download = DownloadState::Idle;
                }
                Task::none()
            }
            Message::OpenHistory => {
                self.screen = Screen::History;

                let mut tasks = Vec::new();
                for record in &self.history {
                    if self.history_previews.contains_key(&record.id)
                        || record.image_url.is_empty()
                    {
                        continue;
                    }
                    let id = record.id;
                    let url = record.image_url.clone();
                    tasks.push(Task::perform(
                        load_preview(ImageSource::Url(url)),
                        move |preview| Message::HistoryPreviewLoaded(id, preview),
                    ));
                }
                Task::batch(tasks)
            }
            Message::CloseHistory => {
                self.screen = Screen::Main;
                Task::none()
            }
            Message::HistoryPreviewLoaded(id, preview) => {
                if let Some(handle) = preview {
                    if self.history.iter().any(|record| record.id == id) {
                        self.history_previews.insert(id, handle);
                    }
                }
                Task::none()
            }
            Message::DeleteHistory(id) => {
                if confirm("确定要删除这条历史记录吗？") {
                    match self.store.delete_history(id) {
                        Ok(true) => {
                            self.history_previews.remove(&id);
                            self.reload_history();
                        }
                        Ok(false) => {}
                        Err(error) => log::error!("Failed to delete history record: {}", error),
                    }
                }
                Task::none()
            }
            Message::ClearHistory => {
                if confirm("确定要清空所有历史记录吗？") {
                    match self.store.clear_history() {
                        Ok(count) => {
                            log::info!("🗑️  Cleared {} history records", count);
                            self.history_previews.clear();
                            self.reload_history();
                        }
                        Err(error) => log::error!("Failed to clear history: {}", error),
                    }
                }
                Task::none()
            }
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<'_, Message> {
        match self.screen {
            Screen::Main => {
                let header = row![
                    text("修图工作室").size(34),
                    horizontal_space(),
                    button(text("历史记录")).padding(8).on_press(Message::OpenHistory),
                ]
                .align_y(Alignment::Center);

                let content = column![header, ui::input::view(self), ui::result::view(self)]
                    .spacing(20)
                    .padding(25)
                    .max_width(900);

                scrollable(container(content).center_x(Length::Fill)).into()
            }
            Screen::History => ui::history::view(self),
        }
    }

    /// Listen for files dragged onto the window
    fn subscription(&self) -> Subscription<Message> {
        iced::event::listen_with(handle_event)
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }

    /// Add local files to the selection and kick off preview and dimension
    /// loading for the new entries
    fn add_files(&mut self, paths: Vec<PathBuf>) -> Task<Message> {
        let added = self.input.add_files(paths);
        if added.is_empty() {
            return Task::none();
        }

        self.progress.set(0, "图片上传成功", 25.0);

        let mut tasks = vec![self.refresh_dimensions()];
        for (name, path) in added {
            tasks.push(Task::perform(
                load_preview(ImageSource::File(path)),
                move |preview| Message::FilePreviewLoaded(name.clone(), preview),
            ));
        }
        Task::batch(tasks)
    }

    /// Probe the first selected image for its pixel dimensions. Bumping the
    /// sequence number first makes any in-flight probe stale.
    fn refresh_dimensions(&mut self) -> Task<Message> {
        self.input.original_dimensions = None;
        self.input.probe_failed = false;
        self.probe_seq += 1;
        let seq = self.probe_seq;

        match self.input.first_source() {
            Some(source) => Task::perform(
                media::loader::probe_dimensions(source),
                move |result| Message::DimensionsProbed(seq, result),
            ),
            None => Task::none(),
        }
    }

    /// Validate and launch an edit request
    fn generate(&mut self) -> Task<Message> {
        if self.busy {
            return Task::none();
        }
        if let Err(error) = api::request::validate(&self.input, &self.prompt, &self.settings.api_key)
        {
            alert(&error.to_string());
            return Task::none();
        }
        // validate() guarantees the dimensions are resolved
        let Some(original) = self.input.original_dimensions else {
            return Task::none();
        };

        if let Err(error) = self.store.save_settings(&self.settings) {
            log::error!("Failed to persist settings: {}", error);
        }

        self.busy = true;
        self.pending_job = Some(PendingJob {
            prompt: self.prompt.clone(),
            model: self.settings.model.clone(),
            original,
            started: Instant::now(),
        });
        self.progress.set(1, "AI处理中...", 50.0);

        self.job_seq += 1;
        let seq = self.job_seq;
        let files = self
            .input
            .files
            .iter()
            .map(|file| (file.name.clone(), file.path.clone()))
            .collect();
        let urls = self.input.urls.clone();

        Task::perform(
            api::request::prepare_images(self.input.mode, files, urls),
            move |result| Message::ImagesPrepared(seq, result),
        )
    }

    /// Record the rendered result and return the UI to idle
    fn finish_job(&mut self, rendered: RenderedImage) -> Task<Message> {
        let Some(job) = self.pending_job.take() else {
            return Task::none();
        };
        self.busy = false;
        self.progress.reset();

        let processing_ms = job.started.elapsed().as_millis() as i64;
        let entry = HistoryEntry {
            timestamp_ms: Utc::now().timestamp_millis(),
            prompt: job.prompt,
            model: job.model.clone(),
            processing_time_ms: processing_ms,
            output_dimensions: dimension_label(rendered.width, rendered.height),
            image_url: rendered.image_url.clone(),
            original_width: Some(job.original.0),
            original_height: Some(job.original.1),
        };
        match self.store.append_history(&entry) {
            Ok(id) => {
                self.history_previews.insert(id, rendered.handle.clone());
                self.reload_history();
            }
            Err(error) => log::error!("Failed to record history: {}", error),
        }

        log::info!(
            "✅ Edit finished in {}ms ({} × {})",
            processing_ms,
            rendered.width,
            rendered.height
        );

        self.result = ResultState::Ready(RenderedResult {
            handle: rendered.handle,
            image_url: rendered.image_url,
            width: rendered.width,
            height: rendered.height,
            dims_from_resize: rendered.dims_from_resize,
            processing_ms,
            model: job.model,
        });
        self.download = DownloadState::Idle;
        Task::none()
    }

    /// Abort the in-flight job and surface the failure
    fn fail_job(&mut self, message: String, rate_limited: bool) -> Task<Message> {
        log::error!("❌ Edit failed: {}", message);
        self.busy = false;
        self.pending_job = None;
        self.progress.reset();
        if !rate_limited {
            alert(&format!("Error: {}", message));
        }
        self.result = ResultState::Failed {
            message,
            rate_limited,
        };
        Task::none()
    }

    /// Save the currently displayed result
    fn download_current(&mut self) -> Task<Message> {
        let ResultState::Ready(result) = &self.result else {
            return Task::none();
        };
        if self.download != DownloadState::Idle {
            return Task::none();
        }

        let dimensions = result
            .dims_from_resize
            .then_some((result.width, result.height));
        let filename = download::suggested_filename("image", dimensions, Local::now());

        let Some(path) = FileDialog::new()
            .set_title("保存图片")
            .set_file_name(filename.as_str())
            .add_filter("PNG 图片", &["png"])
            .save_file()
        else {
            // Cancelling the dialog is not an error
            return Task::none();
        };

        self.download = DownloadState::Downloading;
        Task::perform(
            download::save_image(result.image_url.clone(), path),
            Message::DownloadFinished,
        )
    }

    /// Save a history record's image
    fn download_history(&mut self, id: i64) -> Task<Message> {
        let Some(record) = self.history.iter().find(|record| record.id == id) else {
            return Task::none();
        };
        if record.image_url.is_empty() {
            alert("图片链接已失效");
            return Task::none();
        }

        let filename =
            download::suggested_filename("photo", record.original_dimensions(), Local::now());

        let Some(path) = FileDialog::new()
            .set_title("保存图片")
            .set_file_name(filename.as_str())
            .add_filter("PNG 图片", &["png"])
            .save_file()
        else {
            return Task::none();
        };

        Task::perform(
            download::save_image(record.image_url.clone(), path),
            Message::DownloadFinished,
        )
    }

    /// Re-read the history list from the store
    fn reload_history(&mut self) {
        match self.store.history() {
            Ok(records) => {
                self.history_previews
                    .retain(|id, _| records.iter().any(|record| record.id == *id));
                self.history = records;
            }
            Err(error) => log::error!("Failed to load history: {}", error),
        }
    }
}

fn main() -> iced::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    iced::application("Retouch Studio", RetouchStudio::update, RetouchStudio::view)
        .subscription(RetouchStudio::subscription)
        .theme(RetouchStudio::theme)
        .centered()
        .run_with(RetouchStudio::new)
}

/// Map window events to messages (drag-dropped files)
fn handle_event(
    event: Event,
    _status: iced::event::Status,
    _window: iced::window::Id,
) -> Option<Message> {
    match event {
        Event::Window(iced::window::Event::FileDropped(path)) => Some(Message::FileDropped(path)),
        _ => None,
    }
}

/// Load an image source into a widget handle, dropping failures to None
async fn load_preview(source: ImageSource) -> Option<Handle> {
    match media::loader::load_bytes(source).await {
        Ok(bytes) => Some(Handle::from_bytes(bytes)),
        Err(error) => {
            log::warn!("⚠️  Preview load failed: {}", error);
            None
        }
    }
}

/// Finish a successful edit response in the background: hold the completed
/// progress state briefly, load the output image and apply the client-side
/// resize when the backend asked for one it did not perform itself.
async fn render_result(outcome: EditOutcome) -> Result<RenderedImage, String> {
    tokio::time::sleep(COMPLETION_HOLD).await;

    let bytes = media::loader::load_image_url(&outcome.image_url).await?;

    if outcome.needs_resize {
        if let Some(target) = outcome.target_dimensions {
            if outcome.backend_resized {
                return Ok(RenderedImage {
                    handle: Handle::from_bytes(bytes),
                    image_url: outcome.image_url,
                    width: target.width,
                    height: target.height,
                    dims_from_resize: true,
                });
            }

            return match media::resize::resize_exact_png(&bytes, target.width, target.height) {
                Ok(Some(png)) => {
                    let image_url = media::data_url::encode(&png).map_err(|e| e.to_string())?;
                    Ok(RenderedImage {
                        handle: Handle::from_bytes(png),
                        image_url,
                        width: target.width,
                        height: target.height,
                        dims_from_resize: true,
                    })
                }
                Ok(None) => Ok(RenderedImage {
                    handle: Handle::from_bytes(bytes),
                    image_url: outcome.image_url,
                    width: target.width,
                    height: target.height,
                    dims_from_resize: true,
                }),
                Err(error) => {
                    // Resize failures downgrade to serving the original image
                    log::warn!("⚠️  Resize failed, serving the original image: {}", error);
                    let (width, height) = media::loader::dimensions_of(&bytes)?;
                    Ok(RenderedImage {
                        handle: Handle::from_bytes(bytes),
                        image_url: outcome.image_url,
                        width,
                        height,
                        dims_from_resize: false,
                    })
                }
            };
        }
    }

    let (width, height) = media::loader::dimensions_of(&bytes)?;
    Ok(RenderedImage {
        handle: Handle::from_bytes(bytes),
        image_url: outcome.image_url,
        width,
        height,
        dims_from_resize: false,
    })
}

/// Show a blocking alert dialog
fn alert(description: &str) {
    MessageDialog::new()
        .set_level(MessageLevel::Error)
        .set_title("修图工作室")
        .set_description(description)
        .set_buttons(MessageButtons::Ok)
        .show();
}

/// Show a blocking confirmation dialog; true when the user accepts
fn confirm(description: &str) -> bool {
    let result = MessageDialog::new()
        .set_level(MessageLevel::Warning)
        .set_title("修图工作室")
        .set_description(description)
        .set_buttons(MessageButtons::OkCancel)
        .show();
    matches!(result, MessageDialogResult::Ok)
}
