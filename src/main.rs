pub mod config;
pub mod phrase;
pub mod render;
pub mod runtime;
pub mod session;
pub mod stats;
pub mod supplier;
pub mod ui;
pub mod util;

use crate::{
    config::{Config, ConfigStore, FileConfigStore},
    phrase::{LocalGenerator, PhraseSet},
    runtime::{AppEvent, CrosstermEventSource, FixedTicker, Runner},
    session::{Phase, Session},
    stats::LiveStats,
    supplier::build_supplier,
};
use clap::{error::ErrorKind, CommandFactory, Parser, ValueEnum};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    time::{Duration, Instant},
};

const TICK_RATE_MS: u64 = 100;

/// sentence typing practice tui with ai-generated prompts
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Typing practice on short generated sentences. Prompts come from a local phrase generator, or from a remote text-generation api with automatic fallback to the local one."
)]
pub struct Cli {
    /// fetch prompts from a remote text-generation api, falling back to local phrases
    #[clap(short = 'r', long)]
    remote: bool,

    /// responses-style endpoint url for remote generation
    #[clap(long)]
    endpoint: Option<String>,

    /// model identifier sent with remote requests
    #[clap(short = 'm', long)]
    model: Option<String>,

    /// bearer credential for remote generation; RENSHU_API_KEY or OPENAI_API_KEY work too. Never persisted.
    #[clap(long)]
    api_key: Option<String>,

    /// phrase set used for local generation and remote instructions
    #[clap(short = 'l', long, value_enum)]
    language: Option<SupportedPhrases>,

    /// custom prompt to practice instead of generated sentences
    #[clap(short = 'p', long)]
    prompt: Option<String>,
}

#[derive(Debug, Copy, Clone, PartialEq, ValueEnum, strum_macros::Display)]
pub enum SupportedPhrases {
    English,
    Japanese,
}

impl SupportedPhrases {
    fn as_set(&self) -> PhraseSet {
        PhraseSet::new(self.to_string().to_lowercase())
    }

    fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "japanese" => SupportedPhrases::Japanese,
            _ => SupportedPhrases::English,
        }
    }
}

/// Effective settings for this run: stored config overlaid with CLI flags,
/// credential resolved from flag or environment.
#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub use_remote: bool,
    pub endpoint: String,
    pub model: String,
    pub language: SupportedPhrases,
    pub api_key: Option<String>,
}

impl RuntimeSettings {
    fn resolve(cli: &Cli, cfg: &Config) -> Self {
        let api_key = cli
            .api_key
            .clone()
            .or_else(|| std::env::var("RENSHU_API_KEY").ok())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|k| !k.is_empty());

        Self {
            use_remote: cli.remote || cfg.use_remote,
            endpoint: cli.endpoint.clone().unwrap_or_else(|| cfg.endpoint.clone()),
            model: cli.model.clone().unwrap_or_else(|| cfg.model.clone()),
            language: cli
                .language
                .unwrap_or_else(|| SupportedPhrases::from_name(&cfg.language)),
            api_key,
        }
    }

    fn to_config(&self) -> Config {
        Config {
            use_remote: self.use_remote,
            endpoint: self.endpoint.clone(),
            model: self.model.clone(),
            language: self.language.to_string().to_lowercase(),
        }
    }
}

#[derive(Debug)]
pub struct App {
    pub cli: Option<Cli>,
    pub session: Session,
    pub stats: LiveStats,
    pub settings: RuntimeSettings,
    pub notice: Option<String>,
    credential_notice_shown: bool,
}

impl App {
    pub fn new(cli: Cli, settings: RuntimeSettings) -> Self {
        let mut app = Self {
            cli: Some(cli),
            session: Session::new(),
            stats: LiveStats::default(),
            settings,
            notice: None,
            credential_notice_shown: false,
        };
        app.request_prompt();
        app
    }

    /// Resolve and install the next target sentence, resetting the current
    /// round first. Runs synchronously, so a second request cannot overlap
    /// an outstanding one.
    pub fn request_prompt(&mut self) {
        self.session.reset();
        self.stats = LiveStats::default();
        self.notice = None;

        if let Some(custom) = self.cli.as_ref().and_then(|c| c.prompt.clone()) {
            self.session.set_prompt(&custom);
            return;
        }

        if self.settings.use_remote
            && self.settings.api_key.is_none()
            && !self.credential_notice_shown
        {
            self.notice = Some("no credential set; using local phrases for this prompt".into());
            self.credential_notice_shown = true;
        }

        let local = LocalGenerator::new(self.settings.language.as_set());
        let supplier = build_supplier(
            self.settings.use_remote,
            self.settings.api_key.as_deref(),
            &self.settings.endpoint,
            &self.settings.model,
            local,
        );
        let sentence = supplier.next_prompt();
        self.session.set_prompt(&sentence);
    }

    /// Unlock the typing surface. Refused with a notice when no prompt is
    /// set; the round itself only becomes active on the first keystroke.
    pub fn begin(&mut self) {
        if self.session.begin() {
            self.notice = None;
        } else if !self.session.has_prompt() {
            self.notice = Some("request a (n)ew prompt before starting".into());
        }
    }

    pub fn reset(&mut self) {
        self.session.reset();
        self.stats = LiveStats::default();
        self.notice = None;
    }

    pub fn toggle_remote(&mut self) {
        self.settings.use_remote = !self.settings.use_remote;
        if let Err(err) = FileConfigStore::new().save(&self.settings.to_config()) {
            log::warn!("could not persist config: {err}");
        }
    }

    pub fn refresh_stats(&mut self) {
        self.stats = LiveStats::compute(&self.session, Instant::now());
    }

    pub fn write(&mut self, c: char) {
        if self.session.write(c) {
            self.refresh_stats();
        }
    }

    pub fn erase(&mut self) {
        if self.session.erase() {
            self.refresh_stats();
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let store = FileConfigStore::new();
    let settings = RuntimeSettings::resolve(&cli, &store.load());

    // The first prompt may hit the network; fetch it before touching the
    // terminal so a slow call cannot stall a half-initialized screen.
    let mut app = App::new(cli, settings);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );

    terminal.draw(|f| ui(app, f))?;

    loop {
        match runner.step() {
            AppEvent::Tick => {
                // Keep the clock and speed advancing between keystrokes
                if app.session.phase() == Phase::Active {
                    app.refresh_stats();
                    terminal.draw(|f| ui(app, f))?;
                }
            }
            AppEvent::Resize => {
                terminal.draw(|f| ui(app, f))?;
            }
            AppEvent::Key(key) => {
                if handle_key(app, key) {
                    break;
                }
                terminal.draw(|f| ui(app, f))?;
            }
        }
    }

    Ok(())
}

/// Apply one key event; true means quit. While the typing surface is
/// unlocked, printable keys feed the session and commands need a modifier;
/// otherwise plain letters act as commands.
fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    if key.code == KeyCode::Esc {
        return true;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => return true,
            KeyCode::Char('n') => app.request_prompt(),
            KeyCode::Char('r') => app.reset(),
            _ => {}
        }
        return false;
    }

    let typing = app.session.is_accepting() && !app.session.is_finished();
    if typing {
        match key.code {
            KeyCode::Char(c) => app.write(c),
            KeyCode::Backspace => app.erase(),
            _ => {}
        }
    } else {
        match key.code {
            KeyCode::Char('n') => app.request_prompt(),
            KeyCode::Char('s') | KeyCode::Enter => app.begin(),
            KeyCode::Char('r') => app.reset(),
            KeyCode::Char('a') => app.toggle_remote(),
            KeyCode::Char('q') => return true,
            _ => {}
        }
    }
    false
}

fn ui(app: &mut App, f: &mut Frame) {
    f.render_widget(&*app, f.area());
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn offline_settings() -> RuntimeSettings {
        RuntimeSettings {
            use_remote: false,
            endpoint: supplier::DEFAULT_RESPONSES_ENDPOINT.to_string(),
            model: supplier::DEFAULT_MODEL.to_string(),
            language: SupportedPhrases::English,
            api_key: None,
        }
    }

    fn offline_app(prompt: &str) -> App {
        let cli = Cli::parse_from(["renshu", "-p", prompt]);
        App::new(cli, offline_settings())
    }

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["renshu"]);

        assert!(!cli.remote);
        assert_eq!(cli.endpoint, None);
        assert_eq!(cli.model, None);
        assert_eq!(cli.api_key, None);
        assert_eq!(cli.language, None);
        assert_eq!(cli.prompt, None);
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from([
            "renshu",
            "-r",
            "--endpoint",
            "https://example.test/v1/responses",
            "-m",
            "tiny-model",
            "--api-key",
            "sk-test",
            "-l",
            "japanese",
            "-p",
            "hello",
        ]);

        assert!(cli.remote);
        assert_eq!(
            cli.endpoint.as_deref(),
            Some("https://example.test/v1/responses")
        );
        assert_eq!(cli.model.as_deref(), Some("tiny-model"));
        assert_eq!(cli.api_key.as_deref(), Some("sk-test"));
        assert_eq!(cli.language, Some(SupportedPhrases::Japanese));
        assert_eq!(cli.prompt.as_deref(), Some("hello"));
    }

    #[test]
    fn test_supported_phrases_as_set() {
        assert_eq!(SupportedPhrases::English.as_set().name, "english");
        assert_eq!(SupportedPhrases::Japanese.as_set().name, "japanese");
    }

    #[test]
    fn test_supported_phrases_from_name() {
        assert_eq!(
            SupportedPhrases::from_name("japanese"),
            SupportedPhrases::Japanese
        );
        assert_eq!(
            SupportedPhrases::from_name("english"),
            SupportedPhrases::English
        );
        // Unknown names fall back to the default set
        assert_eq!(
            SupportedPhrases::from_name("klingon"),
            SupportedPhrases::English
        );
    }

    #[test]
    fn test_runtime_settings_cli_overrides_config() {
        let cli = Cli::parse_from(["renshu", "-r", "-m", "cli-model", "--api-key", "sk-cli"]);
        let cfg = Config {
            use_remote: false,
            endpoint: "https://config.test/v1/responses".into(),
            model: "config-model".into(),
            language: "japanese".into(),
        };

        let settings = RuntimeSettings::resolve(&cli, &cfg);

        assert!(settings.use_remote);
        assert_eq!(settings.model, "cli-model");
        // Flags not given fall back to the stored config
        assert_eq!(settings.endpoint, "https://config.test/v1/responses");
        assert_eq!(settings.language, SupportedPhrases::Japanese);
        assert_eq!(settings.api_key.as_deref(), Some("sk-cli"));
    }

    #[test]
    fn test_runtime_settings_roundtrip_to_config() {
        let settings = RuntimeSettings {
            use_remote: true,
            endpoint: "https://example.test/v1/responses".into(),
            model: "tiny-model".into(),
            language: SupportedPhrases::Japanese,
            api_key: Some("sk-test".into()),
        };

        let cfg = settings.to_config();
        assert!(cfg.use_remote);
        assert_eq!(cfg.language, "japanese");
        // The credential never reaches the persisted form
        assert_eq!(
            serde_json::to_string(&cfg).unwrap().contains("sk-test"),
            false
        );
    }

    #[test]
    fn test_app_new_with_custom_prompt() {
        let app = offline_app("custom test prompt");

        assert_eq!(
            app.session.prompt_chars().iter().collect::<String>(),
            "custom test prompt"
        );
        assert_eq!(app.session.phase(), Phase::Idle);
        assert!(!app.session.is_accepting());
    }

    #[test]
    fn test_app_new_generates_local_prompt() {
        let cli = Cli::parse_from(["renshu"]);
        let app = App::new(cli, offline_settings());

        assert!(app.session.has_prompt());
        assert!(app.session.prompt_len() >= phrase::MIN_SENTENCE_CHARS);
        assert!(app.session.prompt_len() <= phrase::MAX_SENTENCE_CHARS);
    }

    #[test]
    fn test_missing_credential_notice_shown_once() {
        let cli = Cli::parse_from(["renshu", "-r"]);
        let mut settings = offline_settings();
        settings.use_remote = true;

        let mut app = App::new(cli, settings);
        assert!(app.notice.is_some());
        // Local generation still produced a prompt, without any network source
        assert!(app.session.has_prompt());

        app.request_prompt();
        assert!(app.notice.is_none());
    }

    #[test]
    fn test_begin_without_prompt_sets_notice() {
        let mut app = offline_app("hello");
        app.reset();

        app.begin();
        assert!(app.notice.is_some());
        assert!(!app.session.is_accepting());
    }

    #[test]
    fn test_full_round_through_app() {
        let mut app = offline_app("hi");
        app.begin();
        app.write('h');
        app.write('x');

        assert!(app.session.is_finished());
        assert_eq!(app.stats.errors, 1);
        assert!(app.stats.wpm > 0.0);
        assert_eq!(app.stats.accuracy, 50.0);
    }

    #[test]
    fn test_reset_restores_display_defaults() {
        let mut app = offline_app("hi");
        app.begin();
        app.write('h');
        app.write('x');

        app.reset();

        assert_eq!(app.stats.wpm_display(), "0.0");
        assert_eq!(app.stats.accuracy_display(), "100%");
        assert_eq!(app.stats.time_display(), "00:00");
        assert_eq!(app.stats.errors_display(), "0");
        assert!(!app.session.has_prompt());
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_handle_key_escape_quits() {
        let mut app = offline_app("hi");
        assert!(handle_key(&mut app, key(KeyCode::Esc)));
    }

    #[test]
    fn test_handle_key_enter_begins_then_chars_feed_session() {
        let mut app = offline_app("hi");

        assert!(!handle_key(&mut app, key(KeyCode::Enter)));
        assert!(app.session.is_accepting());

        handle_key(&mut app, key(KeyCode::Char('h')));
        handle_key(&mut app, key(KeyCode::Char('i')));
        assert!(app.session.is_finished());
    }

    #[test]
    fn test_handle_key_commands_inactive_while_typing() {
        let mut app = offline_app("no reset");
        app.begin();
        handle_key(&mut app, key(KeyCode::Char('n')));
        handle_key(&mut app, key(KeyCode::Char('r')));

        // 'n' and 'r' were typed into the session, not run as commands
        assert_eq!(app.session.counts().typed, 2);
        assert!(app.session.has_prompt());
    }

    #[test]
    fn test_handle_key_ctrl_r_resets_while_typing() {
        let mut app = offline_app("hello");
        app.begin();
        app.write('h');

        let ctrl_r = KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL);
        assert!(!handle_key(&mut app, ctrl_r));
        assert_eq!(app.session.counts().typed, 0);
        assert!(!app.session.has_prompt());
    }

    #[test]
    fn test_handle_key_backspace_erases() {
        let mut app = offline_app("hello");
        app.begin();
        app.write('h');
        app.write('x');

        handle_key(&mut app, key(KeyCode::Backspace));
        assert_eq!(app.session.counts().typed, 1);
        assert_eq!(app.session.counts().errors, 0);
    }

    #[test]
    fn test_handle_key_plain_commands_after_finish() {
        let mut app = offline_app("hi");
        app.begin();
        app.write('h');
        app.write('i');
        assert!(app.session.is_finished());

        // 'n' now acts as a command again and installs a fresh round
        handle_key(&mut app, key(KeyCode::Char('n')));
        assert_eq!(app.session.phase(), Phase::Idle);
        assert_eq!(app.session.counts().typed, 0);
    }

    #[test]
    fn test_tick_rate_constant() {
        assert_eq!(TICK_RATE_MS, 100);
        const _: () = assert!(TICK_RATE_MS > 0);
        const _: () = assert!(TICK_RATE_MS <= 1000);
    }

    #[test]
    fn test_ui_function_renders_practice_state() {
        use ratatui::{backend::TestBackend, Terminal};

        let mut app = offline_app("test");

        let backend = TestBackend::new(80, 24);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| ui(&mut app, f)).unwrap();

        let buffer = terminal.backend().buffer();
        let content: String = buffer.content().iter().map(|c| c.symbol()).collect();
        assert!(content.contains("test"));
    }

    #[test]
    fn test_ui_function_renders_finished_state() {
        use ratatui::{backend::TestBackend, Terminal};

        let mut app = offline_app("hi");
        app.begin();
        app.write('h');
        app.write('i');

        let backend = TestBackend::new(80, 24);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| ui(&mut app, f)).unwrap();
    }
}
