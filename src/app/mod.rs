//! # Demo App
//!
//! A small notes manager that wires the whole stack together: scenes go
//! through the [`SceneCoordinator`], records live in the [`Datastore`],
//! and the timestamp preference flows through a [`PreferenceRelay`].
//!
//! Units never touch the window directly. Key handlers either act on
//! their own state or post an [`AppAction`]; the event loop drains the
//! action channel after key dispatch, once the window borrow is released,
//! and performs transitions from there.

use std::cell::RefCell;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::{Arc, mpsc};
use std::time::{Duration, Instant};

use chrono::Utc;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use log::{info, warn};
use ratatui::DefaultTerminal;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::widgets::{Block, List, ListItem, ListState, Paragraph, StatefulWidget, Widget};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

use rudder::completion::Completion;
use rudder::coordinator::{NavigationAction, SceneCoordinator, SceneCreator, TransitionError};
use rudder::defaults::{DefaultsStore, PreferenceRelay};
use rudder::host::{Unit, ViewHandle, Window};
use rudder::store::{Datastore, LiveResults, Record, StoreConfig, StoreError};

// =============================================================================
// Scenes and records
// =============================================================================

#[derive(Clone)]
enum Scene {
    Notes,
    Note(NoteRecord),
    Settings,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct NoteRecord {
    id: Uuid,
    body: String,
    created_at: i64,
}

impl Record for NoteRecord {
    const KIND: &'static str = "notes";

    fn id(&self) -> Uuid {
        self.id
    }
}

/// Requests posted by units and handled by the event loop.
enum AppAction {
    OpenNote(NoteRecord),
    NewNote,
    CloseNote,
    OpenSettings,
    CloseSettings,
    Quit,
}

// =============================================================================
// Units
// =============================================================================

struct DemoCreator {
    store: Rc<Datastore>,
    timestamps: Arc<PreferenceRelay<bool>>,
    actions: mpsc::Sender<AppAction>,
}

impl SceneCreator<Scene> for DemoCreator {
    fn create_unit(&self, scene: &Scene, _coordinator: &Rc<SceneCoordinator<Scene>>) -> Box<dyn Unit> {
        match scene {
            Scene::Notes => Box::new(NotesUnit::new(
                &self.store,
                self.timestamps.subscribe(),
                self.actions.clone(),
            )),
            Scene::Note(note) => Box::new(NoteUnit {
                note: note.clone(),
                actions: self.actions.clone(),
            }),
            Scene::Settings => Box::new(SettingsUnit {
                timestamps: self.timestamps.clone(),
                actions: self.actions.clone(),
            }),
        }
    }
}

/// The root list of notes with a movable selection.
struct NotesUnit {
    results: Option<LiveResults<NoteRecord>>,
    timestamps: watch::Receiver<bool>,
    actions: mpsc::Sender<AppAction>,
    selected: usize,
}

impl NotesUnit {
    fn new(
        store: &Rc<Datastore>,
        timestamps: watch::Receiver<bool>,
        actions: mpsc::Sender<AppAction>,
    ) -> Self {
        let results = match store.read_all::<NoteRecord>() {
            Ok(results) => Some(results),
            Err(e) => {
                warn!("notes unavailable: {e}");
                None
            }
        };
        Self {
            results,
            timestamps,
            actions,
            selected: 0,
        }
    }

    fn notes(&mut self) -> &[NoteRecord] {
        match &mut self.results {
            Some(results) => results.items(),
            None => &[],
        }
    }
}

impl Unit for NotesUnit {
    fn render(&mut self, area: Rect, buf: &mut Buffer) {
        let show_timestamps = *self.timestamps.borrow();
        let selected = self.selected;
        let notes = self.notes();
        let items: Vec<ListItem> = notes
            .iter()
            .map(|note| {
                let line = if show_timestamps {
                    format!("{}  {}", stamp(note.created_at), note.body)
                } else {
                    note.body.clone()
                };
                ListItem::new(line)
            })
            .collect();
        let mut state = ListState::default();
        if !notes.is_empty() {
            state.select(Some(selected.min(notes.len() - 1)));
        }
        let list = List::new(items)
            .block(Block::bordered().title(" notes  [n]ew [enter] open [s]ettings [q]uit "))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
        StatefulWidget::render(list, area, buf, &mut state);
    }

    fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down => {
                let last = self.notes().len().saturating_sub(1);
                self.selected = (self.selected + 1).min(last);
            }
            KeyCode::Enter => {
                let index = self.selected;
                if let Some(note) = self.notes().get(index).cloned() {
                    let _ = self.actions.send(AppAction::OpenNote(note));
                }
            }
            KeyCode::Char('n') => {
                let _ = self.actions.send(AppAction::NewNote);
            }
            KeyCode::Char('s') => {
                let _ = self.actions.send(AppAction::OpenSettings);
            }
            KeyCode::Char('q') => {
                let _ = self.actions.send(AppAction::Quit);
            }
            _ => {}
        }
    }
}

/// A single note, pushed onto the stack.
struct NoteUnit {
    note: NoteRecord,
    actions: mpsc::Sender<AppAction>,
}

impl Unit for NoteUnit {
    fn render(&mut self, area: Rect, buf: &mut Buffer) {
        let text = format!("{}\n\ncreated {}", self.note.body, stamp(self.note.created_at));
        Paragraph::new(text)
            .block(Block::bordered().title(" note  [esc] back "))
            .render(area, buf);
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Esc {
            let _ = self.actions.send(AppAction::CloseNote);
        }
    }
}

/// Modal settings: a single toggle, applied straight to the relay.
struct SettingsUnit {
    timestamps: Arc<PreferenceRelay<bool>>,
    actions: mpsc::Sender<AppAction>,
}

impl Unit for SettingsUnit {
    fn render(&mut self, area: Rect, buf: &mut Buffer) {
        let state = if self.timestamps.value() { "on" } else { "off" };
        Paragraph::new(format!("show timestamps: {state}\n\n[t] toggle  [esc] close"))
            .block(Block::bordered().title(" settings "))
            .render(area, buf);
    }

    fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('t') => {
                let current = self.timestamps.value();
                self.timestamps.accept(Some(!current));
            }
            KeyCode::Esc => {
                let _ = self.actions.send(AppAction::CloseSettings);
            }
            _ => {}
        }
    }
}

fn stamp(timestamp: i64) -> String {
    chrono::DateTime::from_timestamp(timestamp, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "?".to_string())
}

// =============================================================================
// Event loop
// =============================================================================

pub fn run(data_dir: Option<PathBuf>) -> io::Result<()> {
    let (store_config, defaults) = match data_dir {
        Some(dir) => (
            StoreConfig::new(dir.join("store")),
            DefaultsStore::open(dir.join("defaults.toml")),
        ),
        None => {
            let config = StoreConfig::standard().ok_or_else(no_home)?;
            let defaults = DefaultsStore::standard().ok_or_else(no_home)?;
            (config, defaults)
        }
    };
    let store = Rc::new(Datastore::open(store_config));
    let timestamps = Arc::new(PreferenceRelay::new(
        Arc::new(defaults),
        "show_timestamps",
        true,
    ));

    let (actions_tx, actions_rx) = mpsc::channel();
    let window = Rc::new(RefCell::new(Window::new()));
    let creator = DemoCreator {
        store: store.clone(),
        timestamps,
        actions: actions_tx,
    };
    let coordinator = SceneCoordinator::new(window.clone(), &Scene::Notes, Box::new(creator));

    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, &window, &coordinator, &store, &actions_rx);
    ratatui::restore();
    info!("Rudder demo shut down");
    result
}

fn no_home() -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, "no home directory for app data")
}

fn event_loop(
    terminal: &mut DefaultTerminal,
    window: &Rc<RefCell<Window>>,
    coordinator: &Rc<SceneCoordinator<Scene>>,
    store: &Rc<Datastore>,
    actions: &mpsc::Receiver<AppAction>,
) -> io::Result<()> {
    let mut pending_writes: Vec<Completion<StoreError>> = Vec::new();
    loop {
        terminal.draw(|frame| window.borrow_mut().render(frame.area(), frame.buffer_mut()))?;
        window.borrow_mut().tick(Instant::now());

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if key.code == KeyCode::Char('c') && key.modifiers == KeyModifiers::CONTROL {
                        return Ok(());
                    }
                    window.borrow_mut().dispatch_key(key);
                }
            }
        }

        pending_writes.retain_mut(|write| match write.try_wait() {
            Some(Err(e)) => {
                warn!("note write failed: {e}");
                false
            }
            Some(Ok(())) => false,
            None => true,
        });

        while let Ok(action) = actions.try_recv() {
            match action {
                AppAction::Quit => return Ok(()),
                AppAction::NewNote => {
                    let note = NoteRecord {
                        id: Uuid::new_v4(),
                        body: format!("note from {}", stamp(Utc::now().timestamp())),
                        created_at: Utc::now().timestamp(),
                    };
                    pending_writes.push(store.write(move |txn| txn.put(&note)));
                }
                AppAction::OpenNote(note) => {
                    if let Some(from) = active_view(window) {
                        finish(coordinator.perform(
                            NavigationAction::Push(Scene::Note(note)),
                            &from,
                            true,
                        ));
                    }
                }
                AppAction::CloseNote => {
                    if let Some(from) = active_view(window) {
                        finish(coordinator.perform(NavigationAction::Pop, &from, true));
                    }
                }
                AppAction::OpenSettings => {
                    if let Some(from) = active_view(window) {
                        finish(coordinator.perform(
                            NavigationAction::Present(Scene::Settings),
                            &from,
                            true,
                        ));
                    }
                }
                AppAction::CloseSettings => {
                    if let Some(from) = presenting_view(window) {
                        finish(coordinator.perform(NavigationAction::Dismiss, &from, true));
                    }
                }
            }
        }
    }
}

/// Log and forget a transition outcome. Every transition the demo uses
/// resolves synchronously, so one poll is enough.
fn finish(mut completion: Completion<TransitionError>) {
    if let Some(Err(e)) = completion.try_wait() {
        warn!("transition failed: {e}");
    }
}

/// The view the user is looking at: deepest presented view, then the
/// visible stack top.
fn active_view(window: &Rc<RefCell<Window>>) -> Option<ViewHandle> {
    let mut current = window.borrow().root()?;
    loop {
        if let Some(presented) = current.presented() {
            current = presented;
            continue;
        }
        if let Some(top) = current.top() {
            current = top;
            continue;
        }
        return Some(current);
    }
}

/// The view currently presenting a modal, if any. Dismissal goes through
/// the presenter, not the modal itself.
fn presenting_view(window: &Rc<RefCell<Window>>) -> Option<ViewHandle> {
    let mut current = window.borrow().root()?;
    loop {
        if current.presented().is_some() {
            return Some(current);
        }
        if let Some(top) = current.top() {
            current = top;
            continue;
        }
        return None;
    }
}
