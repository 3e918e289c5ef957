use iced::widget::{button, column, container, image, row, text};
use iced::{keyboard, window, Alignment, ContentFit, Element, Length, Size, Subscription, Task, Theme};
use log::{error, info, warn};
use rfd::FileDialog;
use std::path::PathBuf;

// Declare the state and ui modules
mod state;
mod ui;

use state::annotation::{AnnotationController, RotateOutcome};
use state::catalog::{folder_key, Catalog};
use state::data::DeleteAction;
use state::discard::{DiscardExecutor, DiscardOutcome, SidecarPolicy};
use state::navigator::Navigator;
use state::settings::Settings;
use state::store::RecordStore;
use ui::preview::{load_preview, Preview};

/// Main application state
struct PhotoTriage {
    settings: Settings,
    /// The annotation database
    store: RecordStore,
    catalog: Catalog,
    sidecars: SidecarPolicy,
    navigator: Navigator,
    annotation: AnnotationController,
    /// Number of pages in the open folder
    page_count: usize,
    /// Decoded copy of the active picture
    preview: Option<Preview>,
    /// What is actually shown: `preview` turned by the pending rotation
    display: Option<image::Handle>,
    /// Set while the discard confirmation is showing (number of marked files)
    confirm_discard: Option<usize>,
    /// Status message to display to the user
    status: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    /// User clicked "Browse"
    BrowseFolder,
    Next,
    Previous,
    /// Rotate by the given signed quarter turn (counter-clockwise degrees)
    Rotate(i32),
    /// The settle window armed for this generation elapsed
    RotationSettled(u64),
    SetAction(DeleteAction),
    /// User clicked a file in the listing
    Select(String),
    /// Decoding finished for the picture at this path
    PreviewLoaded(PathBuf, Result<Preview, String>),
    RequestDiscard,
    ConfirmDiscard,
    CancelDiscard,
    CloseRequested(window::Id),
}

impl PhotoTriage {
    /// Create a new instance of the application
    fn new(settings: Settings, store: RecordStore) -> (Self, Task<Message>) {
        let catalog = Catalog::from_settings(&settings);
        let sidecars = SidecarPolicy::from_settings(&settings);

        (
            PhotoTriage {
                settings,
                store,
                catalog,
                sidecars,
                navigator: Navigator::new(),
                annotation: AnnotationController::new(),
                page_count: 0,
                preview: None,
                display: None,
                confirm_discard: None,
                status: "Ready. Browse to a folder of photos.".to_string(),
            },
            Task::none(),
        )
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::BrowseFolder => {
                // Show the native folder picker dialog
                let Some(folder) = FileDialog::new()
                    .set_title("Select Folder with Photos")
                    .pick_folder()
                else {
                    return Task::none();
                };

                let folder = std::fs::canonicalize(&folder).unwrap_or(folder);
                self.confirm_discard = None;
                match self.navigator.open(folder, &self.catalog, &self.store, &mut self.annotation) {
                    Ok(()) => self.after_move(),
                    Err(e) => self.fail(e),
                }
            }
            Message::Next => {
                self.confirm_discard = None;
                let result = self.navigator.next(&self.catalog, &self.store, &mut self.annotation);
                self.after_navigation(result)
            }
            Message::Previous => {
                self.confirm_discard = None;
                let result = self
                    .navigator
                    .previous(&self.catalog, &self.store, &mut self.annotation);
                self.after_navigation(result)
            }
            Message::Select(filename) => {
                self.confirm_discard = None;
                let result = self.navigator.jump(&filename, &self.store, &mut self.annotation);
                self.after_navigation(result)
            }
            Message::Rotate(delta) => match self.annotation.rotate(delta) {
                RotateOutcome::Applied(generation) => {
                    self.redraw();
                    let (task, handle) = Task::perform(
                        tokio::time::sleep(self.settings.rotation_settle()),
                        move |_| Message::RotationSettled(generation),
                    )
                    .abortable();
                    self.annotation.attach_timer(generation, handle);
                    task
                }
                RotateOutcome::Ignored => Task::none(),
            },
            Message::RotationSettled(generation) => {
                self.annotation.settle(generation);
                Task::none()
            }
            Message::SetAction(action) => {
                self.confirm_discard = None;
                self.annotation.set_delete_action(action);
                Task::none()
            }
            Message::PreviewLoaded(path, result) => {
                // Ignore pictures that finished loading after the user moved on
                if self.navigator.active().map(|entry| &entry.path) != Some(&path) {
                    return Task::none();
                }
                match result {
                    Ok(preview) => {
                        self.preview = Some(preview);
                        self.redraw();
                    }
                    Err(e) => {
                        warn!("⚠️  {}", e);
                        self.status = e;
                    }
                }
                Task::none()
            }
            Message::RequestDiscard => {
                if let Err(e) = self.navigator.save(&self.store, &self.annotation) {
                    return self.fail(e);
                }

                let folder = self.navigator.folder().map(folder_key).unwrap_or_default();
                match self.store.count_marked(self.settings.discard_scope, &folder) {
                    Ok(0) => self.status = "Nothing is marked for deletion.".to_string(),
                    Ok(count) => self.confirm_discard = Some(count),
                    Err(e) => return self.fail(e),
                }
                Task::none()
            }
            Message::CancelDiscard => {
                self.confirm_discard = None;
                Task::none()
            }
            Message::ConfirmDiscard => match self.confirm_discard.take() {
                Some(confirmed) => self.discard(confirmed),
                None => Task::none(),
            },
            Message::CloseRequested(id) => {
                if let Err(e) = self.navigator.save(&self.store, &self.annotation) {
                    error!("❌ Could not save before exit: {}", e);
                }
                window::close(id)
            }
        }
    }

    /// Save the active record, then delete everything marked within the configured
    /// scope, provided that is still the `confirmed` number of files
    fn discard(&mut self, confirmed: usize) -> Task<Message> {
        if let Err(e) = self.navigator.save(&self.store, &self.annotation) {
            return self.fail(e);
        }

        let folder = self.navigator.folder().map(folder_key).unwrap_or_default();
        let executor = DiscardExecutor::new(&self.store, &self.sidecars);
        let report = match executor.run_confirmed(self.settings.discard_scope, &folder, confirmed) {
            Ok(DiscardOutcome::Done(report)) => report,
            Ok(DiscardOutcome::Changed(0)) => {
                self.status = "Nothing is marked for deletion.".to_string();
                return Task::none();
            }
            Ok(DiscardOutcome::Changed(count)) => {
                self.confirm_discard = Some(count);
                self.status = format!("Marks changed: {} files are now marked. Confirm again.", count);
                return Task::none();
            }
            Err(e) => return self.fail(e),
        };

        if let Err(e) = self
            .navigator
            .reload(&self.catalog, &self.store, &mut self.annotation)
        {
            return self.fail(e);
        }
        let task = self.after_move();

        self.status = format!(
            "🗑️ Cleared {} records: {} files deleted ({} raw), {} already gone, {} failed.",
            report.records(),
            report.deleted,
            report.sidecars,
            report.skipped,
            report.failed
        );
        task
    }

    fn after_navigation(&mut self, result: state::error::Result<bool>) -> Task<Message> {
        match result {
            Ok(true) => self.after_move(),
            Ok(false) => Task::none(),
            Err(e) => self.fail(e),
        }
    }

    /// Refresh the page count and status, and load the newly active picture
    fn after_move(&mut self) -> Task<Message> {
        self.page_count = self
            .navigator
            .folder()
            .map(|folder| self.catalog.page_count(&self.store, folder))
            .transpose()
            .unwrap_or_else(|e| {
                warn!("⚠️  Could not count pages: {}", e);
                None
            })
            .unwrap_or(0);

        let Some(entry) = self.navigator.active() else {
            self.preview = None;
            self.display = None;
            self.status = "No photos in this folder.".to_string();
            return Task::none();
        };

        self.status = entry.filename.clone();
        if self.preview.as_ref().map(|preview| &preview.path) == Some(&entry.path) {
            self.redraw();
            return Task::none();
        }

        self.preview = None;
        self.display = None;
        let path = entry.path.clone();
        Task::perform(
            load_preview(path.clone(), self.settings.preview_height),
            move |result| Message::PreviewLoaded(path.clone(), result),
        )
    }

    /// Rebuild the shown picture from the preview and the pending rotation
    fn redraw(&mut self) {
        self.display = self
            .preview
            .as_ref()
            .map(|preview| preview.handle(self.annotation.rotation()));
    }

    fn fail(&mut self, e: state::error::Error) -> Task<Message> {
        error!("❌ {}", e);
        self.status = format!("Error: {}", e);
        Task::none()
    }

    fn subscription(&self) -> Subscription<Message> {
        Subscription::batch([
            keyboard::on_key_press(handle_key),
            window::close_requests().map(Message::CloseRequested),
        ])
    }

    /// Build the user interface
    fn view(&self) -> Element<'_, Message> {
        let pending = self.annotation.delete_action();
        let action_button = |label: &'static str, action: DeleteAction| {
            let style = if pending == action {
                button::primary
            } else {
                button::secondary
            };
            button(text(label))
                .on_press_maybe(self.annotation.is_loaded().then_some(Message::SetAction(action)))
                .style(style)
                .width(Length::Fill)
        };

        let discard_controls = match self.confirm_discard {
            Some(count) => row![
                button(text(format!("Delete {} files", count)))
                    .on_press(Message::ConfirmDiscard)
                    .style(button::danger),
                button("Cancel")
                    .on_press(Message::CancelDiscard)
                    .style(button::secondary),
            ],
            None => row![button("Discard marked").on_press(Message::RequestDiscard)],
        }
        .spacing(10);

        let folder_label = match self.navigator.folder() {
            Some(folder) => folder.display().to_string(),
            None => "No folder".to_string(),
        };

        let sidebar = column![
            button("Browse").on_press(Message::BrowseFolder).padding(8),
            text(folder_label).size(12),
            row![
                action_button("Keep (d)", DeleteAction::Keep),
                action_button("Delete (f)", DeleteAction::Delete),
            ]
            .spacing(6),
            ui::file_list::page_label(self.navigator.page(), self.page_count),
            ui::file_list::view(self.navigator.items(), self.navigator.active_index()),
            discard_controls,
            text(&self.status).size(14),
        ]
        .spacing(10)
        .padding(10)
        .width(Length::Fixed(320.0));

        let picture: Element<Message> = match &self.display {
            Some(handle) => image(handle.clone())
                .content_fit(ContentFit::Contain)
                .width(Length::Fill)
                .height(Length::Fill)
                .into(),
            None => text("").into(),
        };

        row![
            sidebar,
            container(picture)
                .width(Length::Fill)
                .height(Length::Fill)
                .padding(5)
                .center_x(Length::Fill)
                .center_y(Length::Fill),
        ]
        .align_y(Alignment::Center)
        .into()
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

/// Key bindings: arrows navigate, q/e rotate, d/f mark keep/delete
fn handle_key(key: keyboard::Key, _modifiers: keyboard::Modifiers) -> Option<Message> {
    use keyboard::key::Named;
    use keyboard::Key;

    match key.as_ref() {
        Key::Named(Named::ArrowLeft) => Some(Message::Previous),
        Key::Named(Named::ArrowRight) => Some(Message::Next),
        Key::Character("q") => Some(Message::Rotate(90)),
        Key::Character("e") => Some(Message::Rotate(-90)),
        Key::Character("d") => Some(Message::SetAction(DeleteAction::Keep)),
        Key::Character("f") => Some(Message::SetAction(DeleteAction::Delete)),
        _ => None,
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::load().unwrap_or_else(|e| {
        error!("❌ Could not read settings, using defaults: {}", e);
        Settings::default()
    });

    let db_path: PathBuf = settings
        .database_path()
        .ok_or("Could not determine user data directory")?;
    // The app cannot function without its database
    let store = RecordStore::open(&db_path)?;
    info!("🎨 Photo triage ready, database at {}", db_path.display());

    iced::application("Photo Triage", PhotoTriage::update, PhotoTriage::view)
        .theme(PhotoTriage::theme)
        .subscription(PhotoTriage::subscription)
        .window(window::Settings {
            size: Size::new(1280.0, 760.0),
            exit_on_close_request: false,
            ..window::Settings::default()
        })
        .centered()
        .run_with(move || PhotoTriage::new(settings, store))?;

    Ok(())
}
