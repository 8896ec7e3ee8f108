use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use crossterm::event::{
    KeyCode as CrosstermKeyCode, KeyEvent as CrosstermKeyEvent,
    KeyModifiers as CrosstermKeyModifiers,
};
use tuirealm::{
    Application, AttrValue, Attribute, Component, Event, EventListenerCfg, Frame, MockComponent,
    NoUserEvent, Props, State,
    command::{Cmd, CmdResult},
    event::{Key as RealmKey, KeyEvent as RealmKeyEvent, KeyModifiers as RealmKeyModifiers},
    ratatui::layout::Rect,
};

use crate::{
    app::{App, Job, Message},
    ui,
};

const TICK_INTERVAL: Duration = Duration::from_millis(250);

pub type SharedApp = Arc<Mutex<App>>;

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum RootId {
    Dashboard,
}

pub fn init_application(app: SharedApp) -> Result<Application<RootId, Message, NoUserEvent>> {
    let mut application: Application<RootId, Message, NoUserEvent> = Application::init(
        EventListenerCfg::default()
            .crossterm_input_listener(Duration::from_millis(20), 3)
            .poll_timeout(Duration::from_millis(10))
            .tick_interval(TICK_INTERVAL),
    );

    application
        .mount(
            RootId::Dashboard,
            Box::new(DashboardComponent::new(app)),
            Vec::new(),
        )
        .context("failed to mount dashboard component")?;

    application
        .active(&RootId::Dashboard)
        .context("failed to activate dashboard component")?;

    Ok(application)
}

pub fn apply_message(shared_app: &SharedApp, message: Message) -> Result<()> {
    let mut app = lock_app(shared_app)?;
    app.update(message)
}

/// Provider work the controller asked for since the last call.
pub fn take_jobs(shared_app: &SharedApp) -> Result<Vec<Job>> {
    let mut app = lock_app(shared_app)?;
    Ok(app.take_jobs())
}

pub fn should_quit(shared_app: &SharedApp) -> Result<bool> {
    let app = lock_app(shared_app)?;
    Ok(app.should_quit)
}

fn lock_app(shared_app: &SharedApp) -> Result<MutexGuard<'_, App>> {
    shared_app
        .lock()
        .map_err(|_| anyhow!("failed to lock dashboard state"))
}

struct DashboardComponent {
    props: Props,
    app: SharedApp,
}

impl DashboardComponent {
    fn new(app: SharedApp) -> Self {
        Self {
            props: Props::default(),
            app,
        }
    }
}

impl MockComponent for DashboardComponent {
    fn view(&mut self, frame: &mut Frame, _area: Rect) {
        if let Ok(app) = self.app.lock() {
            ui::render(frame, &app);
        }
    }

    fn query(&self, attr: Attribute) -> Option<AttrValue> {
        self.props.get(attr)
    }

    fn attr(&mut self, attr: Attribute, value: AttrValue) {
        self.props.set(attr, value);
    }

    fn state(&self) -> State {
        State::None
    }

    fn perform(&mut self, _cmd: Cmd) -> CmdResult {
        CmdResult::None
    }
}

impl Component<Message, NoUserEvent> for DashboardComponent {
    fn on(&mut self, ev: Event<NoUserEvent>) -> Option<Message> {
        convert_event(ev)
    }
}

fn convert_event(ev: Event<NoUserEvent>) -> Option<Message> {
    match ev {
        Event::Keyboard(key) => Some(Message::Key(convert_key_event(key))),
        Event::Paste(text) => Some(Message::Paste(text)),
        Event::WindowResize(width, height) => Some(Message::Resize(width, height)),
        Event::Tick => Some(Message::Tick),
        _ => None,
    }
}

fn convert_key_event(key: RealmKeyEvent) -> CrosstermKeyEvent {
    CrosstermKeyEvent::new(
        convert_key_code(key.code),
        convert_key_modifiers(key.modifiers),
    )
}

fn convert_key_code(key: RealmKey) -> CrosstermKeyCode {
    match key {
        RealmKey::Backspace => CrosstermKeyCode::Backspace,
        RealmKey::Enter => CrosstermKeyCode::Enter,
        RealmKey::Left => CrosstermKeyCode::Left,
        RealmKey::Right => CrosstermKeyCode::Right,
        RealmKey::Up => CrosstermKeyCode::Up,
        RealmKey::Down => CrosstermKeyCode::Down,
        RealmKey::Home => CrosstermKeyCode::Home,
        RealmKey::End => CrosstermKeyCode::End,
        RealmKey::PageUp => CrosstermKeyCode::PageUp,
        RealmKey::PageDown => CrosstermKeyCode::PageDown,
        RealmKey::Tab => CrosstermKeyCode::Tab,
        RealmKey::BackTab => CrosstermKeyCode::BackTab,
        RealmKey::Delete => CrosstermKeyCode::Delete,
        RealmKey::Function(index) => CrosstermKeyCode::F(index),
        RealmKey::Char(ch) => CrosstermKeyCode::Char(ch),
        RealmKey::Esc => CrosstermKeyCode::Esc,
        _ => CrosstermKeyCode::Null,
    }
}

fn convert_key_modifiers(modifiers: RealmKeyModifiers) -> CrosstermKeyModifiers {
    [
        (RealmKeyModifiers::SHIFT, CrosstermKeyModifiers::SHIFT),
        (RealmKeyModifiers::CONTROL, CrosstermKeyModifiers::CONTROL),
        (RealmKeyModifiers::ALT, CrosstermKeyModifiers::ALT),
    ]
    .into_iter()
    .filter(|(realm, _)| modifiers.contains(*realm))
    .fold(CrosstermKeyModifiers::empty(), |acc, (_, crossterm)| {
        acc | crossterm
    })
}
