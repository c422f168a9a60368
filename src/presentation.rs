use std::{
    fmt,
    sync::{Arc, Mutex},
    time::Duration,
};

use chrono::{DateTime, Local};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::display::{alternate_rows, display_name};
use crate::draw::DrawEngine;
use crate::reveal::RevealScheduler;
use crate::roster::Roster;
use crate::source::{load_roster, EntrySource, LoadedRoster};
use crate::types::*;

// ── Views and actions ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum View {
    Intro,
    Loading,
    Results,
    Alternates,
    Finale,
    NotFound,
}

impl View {
    pub fn from_route(route: &str) -> View {
        match route.trim().trim_end_matches('/') {
            "" | "/index.html" => View::Intro,
            _ => View::NotFound,
        }
    }

    /// Transition table. `None` means the action does nothing in this view.
    pub fn apply(self, action: Action) -> Option<View> {
        match (self, action) {
            (View::Intro, Action::Start) => Some(View::Loading),
            (View::Loading, Action::LoadingElapsed) => Some(View::Results),
            (View::Results, Action::ShowAlternates) => Some(View::Alternates),
            (View::Results, Action::Finalize) => Some(View::Finale),
            (View::Alternates, Action::Back) => Some(View::Results),
            (View::Finale, Action::Back) => Some(View::Alternates),
            _ => None,
        }
    }

    pub fn shows_winners(self) -> bool {
        matches!(self, View::Results | View::Finale)
    }

    pub fn shows_alternates(self) -> bool {
        self == View::Alternates
    }

    pub fn name(self) -> &'static str {
        match self {
            View::Intro => "intro",
            View::Loading => "loading",
            View::Results => "results",
            View::Alternates => "alternates",
            View::Finale => "finale",
            View::NotFound => "notFound",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start,
    ShowAlternates,
    Back,
    Finalize,
    /// Fired by the loading timer, never by the audience-facing controls.
    LoadingElapsed,
}

impl Action {
    pub fn from_name(name: &str) -> Option<Action> {
        match name.trim().to_ascii_lowercase().as_str() {
            "start" => Some(Action::Start),
            "alternates" | "show-alternates" => Some(Action::ShowAlternates),
            "back" => Some(Action::Back),
            "finalize" | "finish" => Some(Action::Finalize),
            _ => None,
        }
    }

    pub fn is_user(self) -> bool {
        self != Action::LoadingElapsed
    }
}

// ── Settings ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct StageSettings {
    pub source: EntrySource,
    pub fields: EntryFields,
    pub counts: DrawCounts,
    pub winner_stagger: Duration,
    pub alternate_stagger: Duration,
    pub loading_timeout: Duration,
    pub loading_policy: LoadingPolicy,
    pub fetch_timeout: Duration,
    pub draw_seed: Option<u64>,
}

impl StageSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        StageSettings {
            source: EntrySource::parse(&config.entry_source),
            fields: config.entry_fields(),
            counts: config.draw_counts(),
            winner_stagger: Duration::from_millis(config.winner_stagger_ms),
            alternate_stagger: Duration::from_millis(config.alternate_stagger_ms),
            loading_timeout: Duration::from_millis(config.loading_timeout_ms),
            loading_policy: config.loading_policy,
            fetch_timeout: Duration::from_millis(config.fetch_timeout_ms),
            draw_seed: config.draw_seed,
        }
    }
}

// ── Stage state ────────────────────────────────────────────────────────

struct Stage {
    view: View,
    /// Bumped whenever a new draw cycle starts or the show is reset, so
    /// late loads and timers from an older cycle can be recognised.
    cycle: u64,
    engine: DrawEngine,
    roster: Roster,
    dropped: usize,
    draw: DrawResult,
    draw_ready: bool,
    drawn_at: Option<DateTime<Local>>,
    last_error: Option<String>,
    timeout_elapsed: bool,
    winner_reveal: RevealScheduler,
    alternate_reveal: RevealScheduler,
    loading_timer: Option<JoinHandle<()>>,
    load_task: Option<JoinHandle<()>>,
    hovered_alternate: Option<usize>,
    table_open: bool,
}

impl Stage {
    fn new(engine: DrawEngine) -> Self {
        Stage {
            view: View::Intro,
            cycle: 0,
            engine,
            roster: Roster::new(),
            dropped: 0,
            draw: DrawResult::default(),
            draw_ready: false,
            drawn_at: None,
            last_error: None,
            timeout_elapsed: false,
            winner_reveal: RevealScheduler::new(),
            alternate_reveal: RevealScheduler::new(),
            loading_timer: None,
            load_task: None,
            hovered_alternate: None,
            table_open: false,
        }
    }

    fn cancel_load(&mut self) {
        if let Some(handle) = self.load_task.take() {
            handle.abort();
        }
    }
}

/// Owns the current view and everything scoped to it: the draw for the
/// current cycle, the reveal timers and the overlay state (hovered alternate,
/// participant table). Cheap to clone; clones share the same stage.
#[derive(Clone)]
pub struct Presentation {
    inner: Arc<Mutex<Stage>>,
    settings: Arc<StageSettings>,
}

impl Presentation {
    pub fn new(settings: StageSettings) -> Self {
        let engine = DrawEngine::from_seed_option(settings.draw_seed);
        Presentation {
            inner: Arc::new(Mutex::new(Stage::new(engine))),
            settings: Arc::new(settings),
        }
    }

    pub fn view(&self) -> View {
        self.lock().view
    }

    /// Apply an audience-facing action. Must be called from within a tokio
    /// runtime since entering a view schedules its timers.
    pub fn dispatch(&self, action: Action) -> Result<View, String> {
        if !action.is_user() {
            return Err(format!("{action:?} is not a user action"));
        }
        let mut stage = self.lock();
        let next = stage
            .view
            .apply(action)
            .ok_or_else(|| format!("{action:?} is not available in {}", stage.view))?;
        self.enter(&mut stage, next);
        Ok(next)
    }

    /// Route-based navigation. `/` starts the show over from the intro;
    /// anything else lands on the not-found view.
    pub fn navigate(&self, route: &str) -> View {
        let target = View::from_route(route);
        let mut stage = self.lock();
        if target == View::Intro {
            stage.cycle += 1;
            stage.cancel_load();
        }
        self.enter(&mut stage, target);
        target
    }

    pub fn hover_alternate(&self, index: Option<usize>) -> Result<(), String> {
        let mut stage = self.lock();
        if let Some(idx) = index {
            if !stage.view.shows_alternates() {
                return Err(format!("no alternates shown in {}", stage.view));
            }
            if idx >= stage.draw.alternates.len() {
                return Err(format!("alternate {idx} out of range"));
            }
        }
        stage.hovered_alternate = index;
        Ok(())
    }

    pub fn set_table_open(&self, open: bool) -> Result<(), String> {
        let mut stage = self.lock();
        if open {
            if stage.view != View::Results {
                return Err(format!("participant table not available in {}", stage.view));
            }
            if stage.roster.is_empty() {
                return Err("no participants loaded".to_string());
            }
        }
        stage.table_open = open;
        Ok(())
    }

    pub fn participants(&self) -> Vec<Participant> {
        self.lock().roster.participants().to_vec()
    }

    pub fn draw_result(&self) -> DrawResult {
        self.lock().draw.clone()
    }

    pub fn snapshot(&self) -> StageSnapshot {
        let stage = self.lock();

        let winner_flags = stage.winner_reveal.visibility();
        let winners = stage
            .draw
            .winners
            .iter()
            .enumerate()
            .map(|(idx, p)| {
                let visible = stage.view.shows_winners() && winner_flags.get(idx).copied().unwrap_or(false);
                reveal_item(idx, p, visible)
            })
            .collect::<Vec<_>>();

        let alternate_flags = stage.alternate_reveal.visibility();
        let alternates = stage
            .draw
            .alternates
            .iter()
            .enumerate()
            .map(|(idx, p)| {
                let visible =
                    stage.view.shows_alternates() && alternate_flags.get(idx).copied().unwrap_or(false);
                reveal_item(idx, p, visible)
            })
            .collect::<Vec<_>>();

        StageSnapshot {
            view: stage.view.name().to_string(),
            winners,
            alternate_rows: alternate_rows(&alternates),
            hovered_alternate: stage.hovered_alternate,
            table_open: stage.table_open,
            draw_ready: stage.draw_ready,
            drawn_at: stage
                .drawn_at
                .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string()),
            roster: RosterStats {
                participants: stage.roster.len(),
                total_entries: stage.roster.total_entries(),
                dropped_rows: stage.dropped,
                code_conflicts: stage.roster.code_conflicts(),
            },
            last_error: stage.last_error.clone(),
        }
    }

    /// Cancel every timer and in-flight load. Used on shutdown.
    pub fn shutdown(&self) {
        let mut stage = self.lock();
        stage.cycle += 1;
        stage.cancel_load();
        if let Some(timer) = stage.loading_timer.take() {
            timer.abort();
        }
        stage.winner_reveal.cancel();
        stage.alternate_reveal.cancel();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Stage> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ── Transitions ────────────────────────────────────────────────────

    fn enter(&self, stage: &mut Stage, next: View) {
        let previous = stage.view;
        self.exit_actions(stage, previous);
        stage.view = next;
        info!(from = %previous, to = %next, "view change");
        self.entry_actions(stage, next);
    }

    fn exit_actions(&self, stage: &mut Stage, view: View) {
        stage.hovered_alternate = None;
        stage.table_open = false;
        match view {
            View::Loading => {
                if let Some(timer) = stage.loading_timer.take() {
                    timer.abort();
                }
            }
            View::Results | View::Finale => stage.winner_reveal.cancel(),
            View::Alternates => stage.alternate_reveal.cancel(),
            View::Intro | View::NotFound => {}
        }
    }

    fn entry_actions(&self, stage: &mut Stage, view: View) {
        match view {
            View::Loading => self.begin_cycle(stage),
            View::Results | View::Finale => {
                stage
                    .winner_reveal
                    .activate(stage.draw.winners.len(), self.settings.winner_stagger);
            }
            View::Alternates => {
                stage
                    .alternate_reveal
                    .activate(stage.draw.alternates.len(), self.settings.alternate_stagger);
            }
            View::Intro | View::NotFound => {}
        }
    }

    /// Start a fresh draw cycle: clear the previous draw, kick off the load
    /// and arm the loading timer. The two run independently.
    fn begin_cycle(&self, stage: &mut Stage) {
        stage.cycle += 1;
        stage.cancel_load();
        stage.roster = Roster::new();
        stage.dropped = 0;
        stage.draw = DrawResult::default();
        stage.draw_ready = false;
        stage.drawn_at = None;
        stage.last_error = None;
        stage.timeout_elapsed = false;

        let cycle = stage.cycle;
        let loader = self.clone();
        stage.load_task = Some(tokio::spawn(async move {
            let result = load_roster(
                &loader.settings.source,
                &loader.settings.fields,
                loader.settings.fetch_timeout,
            )
            .await;
            loader.finish_load(cycle, result);
        }));

        let timer_owner = self.clone();
        let timeout = self.settings.loading_timeout;
        stage.loading_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            timer_owner.loading_elapsed(cycle);
        }));
        debug!(cycle, timeout_ms = timeout.as_millis() as u64, "draw cycle started");
    }

    fn finish_load(&self, cycle: u64, result: Result<LoadedRoster, String>) {
        let mut stage = self.lock();
        if stage.cycle != cycle {
            debug!(cycle, current = stage.cycle, "discarding load from an old cycle");
            return;
        }
        stage.load_task = None;

        let loaded = match result {
            Ok(loaded) => loaded,
            Err(err) => {
                error!("entry source unavailable: {err}");
                stage.last_error = Some(err);
                LoadedRoster::default()
            }
        };
        if loaded.roster.is_empty() {
            warn!("drawing from an empty roster");
        }

        let counts = self.settings.counts;
        let draw = stage
            .engine
            .draw(&loaded.roster, counts.winners, counts.alternates);
        stage.roster = loaded.roster;
        stage.dropped = loaded.dropped;
        stage.draw = draw;
        stage.draw_ready = true;
        stage.drawn_at = Some(Local::now());

        let view = stage.view;
        match view {
            View::Loading => {
                if stage.timeout_elapsed {
                    self.leave_loading(&mut stage);
                }
            }
            // The loader lost the race: show the real draw from the top.
            View::Results | View::Finale => {
                info!(view = %view, "draw arrived after loading; restarting reveal");
                let count = stage.draw.winners.len();
                stage.winner_reveal.activate(count, self.settings.winner_stagger);
            }
            View::Alternates => {
                info!("draw arrived after loading; restarting reveal");
                stage.hovered_alternate = None;
                let count = stage.draw.alternates.len();
                stage.alternate_reveal.activate(count, self.settings.alternate_stagger);
            }
            View::Intro | View::NotFound => {}
        }
    }

    fn loading_elapsed(&self, cycle: u64) {
        let mut stage = self.lock();
        if stage.cycle != cycle || stage.view != View::Loading {
            return;
        }
        stage.loading_timer = None;
        stage.timeout_elapsed = true;
        match self.settings.loading_policy {
            LoadingPolicy::Race => self.leave_loading(&mut stage),
            LoadingPolicy::Join if stage.draw_ready => self.leave_loading(&mut stage),
            LoadingPolicy::Join => debug!(cycle, "loading timeout elapsed; waiting for draw"),
        }
    }

    fn leave_loading(&self, stage: &mut Stage) {
        if let Some(next) = stage.view.apply(Action::LoadingElapsed) {
            if !stage.draw_ready {
                warn!("loading timeout before draw finished; showing empty results");
            }
            self.enter(stage, next);
        }
    }
}

fn reveal_item(idx: usize, participant: &Participant, visible: bool) -> RevealItem {
    RevealItem {
        rank: idx + 1,
        username: participant.username.clone(),
        display_name: display_name(&participant.username),
        code: participant.code.clone(),
        visible,
    }
}
