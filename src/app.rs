use crate::api::BackendClient;
use crate::config::Config;
use crate::logging;
use crate::prefs::Preferences;
use crate::session::{BroadcastTabChannel, PollGates, Poller, SessionArbiter, SessionController};
use crate::terminal;
use crate::types::ModelInfo;
use crate::ui::layout::split_chat_layout;
use crate::ui::render::{
    render_input, render_status_line, render_suspended_modal, render_transcript, transcript_lines,
};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::path::Path;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

const FRAME_INTERVAL: Duration = Duration::from_millis(33);

pub struct App {
    controller: SessionController,
    arbiter: SessionArbiter,
    gates: PollGates,
    models: Vec<ModelInfo>,
    input: String,
    cursor: usize,
    scroll: usize,
    follow: bool,
    quit: bool,
}

impl App {
    pub fn new(config: &Config, prefs: Preferences) -> Result<Self> {
        let client = BackendClient::new(config)?;
        let controller = SessionController::new(client, prefs);
        let arbiter = SessionArbiter::new(Box::new(BroadcastTabChannel::new()));

        Ok(Self {
            controller,
            arbiter,
            gates: PollGates::new(),
            models: Vec::new(),
            input: String::new(),
            cursor: 0,
            scroll: 0,
            follow: true,
            quit: false,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        match self.controller.fetch_models().await {
            Ok(models) => self.models = models,
            Err(error) => logging::log_error("models", &error),
        }

        let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel();
        let poller = Poller::spawn(
            self.controller.client().clone(),
            self.gates.clone(),
            outcome_tx,
        );

        let mut term = terminal::setup()?;
        let mut ticker = tokio::time::interval(FRAME_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while !self.quit {
            self.draw(&mut term)?;

            tokio::select! {
                outcome = outcome_rx.recv() => {
                    if let Some(outcome) = outcome {
                        self.controller.apply_poll(outcome).await;
                    }
                }
                _ = ticker.tick() => {
                    self.pump_terminal_events().await?;
                }
            }

            if self.arbiter.pump() {
                self.gates
                    .active
                    .store(self.arbiter.is_active(), Ordering::Relaxed);
            }
        }

        poller.stop();
        terminal::restore()?;
        Ok(())
    }

    fn draw(&mut self, term: &mut terminal::TerminalType) -> Result<()> {
        let lines = transcript_lines(self.controller.messages());
        let prefs = self.controller.prefs();
        let status = format!(
            " {} | model: {}{}",
            self.controller.status().label(),
            prefs.model,
            if prefs.show_code { " | show-code" } else { "" },
        );
        let suspended = !self.arbiter.is_active();
        let input = self.input.clone();
        let cursor = self.cursor;
        let follow = self.follow;
        let requested_scroll = self.scroll;
        let mut applied_scroll = requested_scroll;

        term.draw(|frame| {
            let area = frame.area();
            let panes = split_chat_layout(area, 1);
            let viewport = panes.transcript.height as usize;
            let max_scroll = lines.len().saturating_sub(viewport);
            applied_scroll = if follow {
                max_scroll
            } else {
                requested_scroll.min(max_scroll)
            };

            render_status_line(frame, panes.status, &status);
            render_transcript(frame, panes.transcript, &lines, applied_scroll);
            render_input(frame, panes.input, &input, cursor);

            if suspended {
                render_suspended_modal(frame);
            }
        })?;

        self.scroll = applied_scroll;
        Ok(())
    }

    async fn pump_terminal_events(&mut self) -> Result<()> {
        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Key(key) => self.handle_key(key).await,
                Event::Paste(text) => self.insert_str(&text),
                Event::FocusGained => self.gates.visible.store(true, Ordering::Relaxed),
                Event::FocusLost => self.gates.visible.store(false, Ordering::Relaxed),
                _ => {}
            }
        }
        Ok(())
    }

    async fn handle_key(&mut self, key: KeyEvent) {
        if key.kind == KeyEventKind::Release {
            return;
        }

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.quit = true;
            return;
        }

        if !self.arbiter.is_active() {
            if matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C')) {
                self.arbiter.claim();
                self.gates.active.store(true, Ordering::Relaxed);
            }
            return;
        }

        match key.code {
            KeyCode::Enter => {
                let line = std::mem::take(&mut self.input);
                self.cursor = 0;
                self.follow = true;
                let line = line.trim().to_string();
                if !line.is_empty() {
                    self.submit(line).await;
                }
            }
            KeyCode::Backspace => self.backspace(),
            KeyCode::Left => self.cursor = self.prev_boundary(self.cursor),
            KeyCode::Right => self.cursor = self.next_boundary(self.cursor),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.input.len(),
            KeyCode::Esc => {
                self.input.clear();
                self.cursor = 0;
            }
            KeyCode::Up => {
                self.follow = false;
                self.scroll = self.scroll.saturating_sub(1);
            }
            KeyCode::Down => self.scroll = self.scroll.saturating_add(1),
            KeyCode::PageUp => {
                self.follow = false;
                self.scroll = self.scroll.saturating_sub(10);
            }
            KeyCode::PageDown => self.scroll = self.scroll.saturating_add(10),
            KeyCode::Char(ch)
                if !key.modifiers.contains(KeyModifiers::CONTROL)
                    && !key.modifiers.contains(KeyModifiers::ALT) =>
            {
                self.insert_str(&ch.to_string());
            }
            _ => {}
        }
    }

    async fn submit(&mut self, line: String) {
        if let Some(rest) = line.strip_prefix('/') {
            self.run_local_command(rest.trim()).await;
            return;
        }
        self.controller.handle_input(&line).await;
    }

    /// Slash commands cover the affordances the browser original exposed as
    /// buttons and menus; they never reach the chat dispatcher.
    async fn run_local_command(&mut self, command: &str) {
        let (name, argument) = match command.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (command, ""),
        };

        match name {
            "model" if !argument.is_empty() => {
                self.controller.set_model(argument);
                self.controller.prefs().save();
                self.controller
                    .append_notice(format!("Model set to {argument}."));
            }
            "models" => {
                if self.models.is_empty() {
                    self.controller
                        .append_notice("No models reported by the backend.");
                } else {
                    let listing = self
                        .models
                        .iter()
                        .map(|model| format!("{} ({})", model.display_name, model.name))
                        .collect::<Vec<_>>()
                        .join("\n");
                    self.controller
                        .append_notice(format!("Available models:\n{listing}"));
                }
            }
            "showcode" => {
                let enabled = match argument {
                    "on" => true,
                    "off" => false,
                    _ => !self.controller.prefs().show_code,
                };
                self.controller.set_show_code(enabled);
                self.controller.prefs().save();
                self.controller.append_notice(if enabled {
                    "Generated code will be shown in the transcript."
                } else {
                    "Generated code will be hidden."
                });
            }
            "autofix" => {
                if argument == "off" {
                    let attempts = self.controller.prefs().auto_fix_attempts;
                    self.controller.configure_auto_fix(false, attempts);
                    self.controller.append_notice("Auto-fix disabled.");
                } else if let Ok(attempts) = argument.parse::<u32>() {
                    self.controller.configure_auto_fix(true, attempts);
                    self.controller.append_notice(format!(
                        "Auto-fix enabled with {attempts} attempts per prompt."
                    ));
                } else {
                    self.controller
                        .append_notice("Usage: /autofix off | /autofix <attempts>");
                }
                self.controller.prefs().save();
            }
            "option" if !argument.is_empty() => {
                let enabled = self.controller.toggle_option(argument);
                self.controller.prefs().save();
                self.controller.append_notice(format!(
                    "Execution option '{argument}' {}.",
                    if enabled { "enabled" } else { "disabled" }
                ));
            }
            "upload" if !argument.is_empty() => {
                self.controller.upload_file(Path::new(argument)).await;
            }
            "datasets" => {
                if !argument.is_empty() {
                    self.controller.set_foundry_folder(Some(argument.to_string()));
                }
                match self.controller.refresh_datasets().await {
                    Some(listing) if !listing.datasets.is_empty() => {
                        let rows = listing
                            .datasets
                            .iter()
                            .map(|dataset| format!("{} - {}", dataset.name, dataset.dataset_rid))
                            .collect::<Vec<_>>()
                            .join("\n");
                        self.controller
                            .append_notice(format!("Available datasets:\n{rows}"));
                    }
                    Some(_) => self
                        .controller
                        .append_notice("No datasets found in the configured folder."),
                    None => self
                        .controller
                        .append_notice("Could not list datasets; see the diagnostic log."),
                }
                self.controller.prefs().save();
            }
            "dataset" if !argument.is_empty() => {
                self.controller.load_dataset(argument).await;
            }
            "quit" | "exit" => self.quit = true,
            _ => self.controller.append_notice(format!(
                "Unknown command '/{command}'. Available: /model, /models, /showcode, \
                 /autofix, /option, /upload, /datasets, /dataset, /quit."
            )),
        }
    }

    fn insert_str(&mut self, value: &str) {
        let cursor = self.clamp_boundary(self.cursor);
        self.input.insert_str(cursor, value);
        self.cursor = cursor + value.len();
    }

    fn backspace(&mut self) {
        let end = self.clamp_boundary(self.cursor);
        if end == 0 {
            return;
        }
        let start = self.prev_boundary(end);
        self.input.replace_range(start..end, "");
        self.cursor = start;
    }

    fn clamp_boundary(&self, mut index: usize) -> usize {
        index = index.min(self.input.len());
        while index > 0 && !self.input.is_char_boundary(index) {
            index -= 1;
        }
        index
    }

    fn prev_boundary(&self, index: usize) -> usize {
        let clamped = self.clamp_boundary(index);
        if clamped == 0 {
            return 0;
        }
        let mut previous = clamped - 1;
        while previous > 0 && !self.input.is_char_boundary(previous) {
            previous -= 1;
        }
        previous
    }

    fn next_boundary(&self, index: usize) -> usize {
        let clamped = self.clamp_boundary(index);
        match self.input[clamped..].chars().next() {
            Some(ch) => clamped + ch.len_utf8(),
            None => self.input.len(),
        }
    }
}
