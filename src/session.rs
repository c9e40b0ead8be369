//! The game session: the only place round state changes.
//!
//! Every operation takes `now` in milliseconds from the caller's clock. The
//! shell calls [`GameSession::tick`] at a fixed cadence; that call alone moves
//! time forward for the round and detects expiry.

use rand::{rngs::StdRng, SeedableRng};
use tracing::{debug, info, warn};

use crate::audio::{AudioEvent, AudioSink};
use crate::catalog::{self, CatalogProvider, MenuItem, Order, DEFAULT_DEALS_COUNT};
use crate::code::Code;
use crate::error::{GameError, Result};
use crate::evaluator::{refresh_after_correct, AnswerEvaluator, Feedback, Outcome, Phase, Refresh};
use crate::highscore::HighscoreStore;
use crate::mode::GameMode;
use crate::scene::{Frame, RoundView, Scene, SceneController};
use crate::timer::{CountdownTimer, Millis};

/// Result of a submission attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The round was decided by this call
    Resolved(Outcome),
    /// Nothing to evaluate: no round awaiting, or the round is paused
    Ignored,
}

#[derive(Debug, Clone, Default)]
pub struct RoundState {
    timer: CountdownTimer,
    remaining_ms: Millis,
    paused: bool,
    had_active_order: bool,
    game_ended: bool,
}

impl RoundState {
    pub fn remaining_ms(&self) -> Millis {
        self.remaining_ms
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn had_active_order(&self) -> bool {
        self.had_active_order
    }

    pub fn game_ended(&self) -> bool {
        self.game_ended
    }
}

pub struct GameSession {
    score: u32,
    mode: GameMode,
    round: RoundState,
    order: Option<Order>,
    deals: Vec<MenuItem>,
    deals_count: usize,
    scenes: SceneController,
    evaluator: AnswerEvaluator,
    feedback: Option<Feedback>,
    new_highscore: bool,
    pending_refresh: Option<Refresh>,
    music_playing: bool,
    catalog: Box<dyn CatalogProvider>,
    audio: Box<dyn AudioSink>,
    highscores: Box<dyn HighscoreStore>,
    rng: StdRng,
}

impl GameSession {
    pub fn new(
        mode: GameMode,
        catalog: Box<dyn CatalogProvider>,
        audio: Box<dyn AudioSink>,
        highscores: Box<dyn HighscoreStore>,
    ) -> Self {
        Self {
            score: 0,
            mode,
            round: RoundState::default(),
            order: None,
            deals: Vec::new(),
            deals_count: DEFAULT_DEALS_COUNT,
            scenes: SceneController::new(),
            evaluator: AnswerEvaluator::new(),
            feedback: None,
            new_highscore: false,
            pending_refresh: None,
            music_playing: false,
            catalog,
            audio,
            highscores,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic order selection
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn with_deals_count(mut self, count: usize) -> Self {
        self.deals_count = count.max(1);
        self
    }

    // ── Operations ──

    /// Draw fresh deals and an order for `mode` and start its timer.
    ///
    /// After a lost game this is a full reset: the score starts over.
    pub fn start_round(&mut self, mode: GameMode, now: Millis) -> Result<()> {
        let (deals, order) = self.draw(mode, Refresh::Catalog)?;
        if self.round.game_ended {
            info!(score = self.score, %mode, "starting over");
            self.score = 0;
            self.stop_music();
        }
        self.mode = mode;
        self.deals = deals;
        self.order = Some(order);
        self.evaluator.finish();
        self.scenes.show(Scene::Order);
        self.begin_round(now);
        Ok(())
    }

    /// Advance the round to `now`; returns the outcome if time ran out.
    pub fn tick(&mut self, now: Millis) -> Option<Outcome> {
        if !self.evaluator.is_awaiting() {
            return None;
        }
        self.scenes.advance();

        self.round.remaining_ms = self.round.timer.tick(now);
        if self.round.paused {
            return None;
        }

        if self.round.remaining_ms > 0 {
            self.round.had_active_order = true;
            None
        } else if self.round.had_active_order {
            self.expire(now)
        } else {
            None
        }
    }

    /// Evaluate the pattern currently shown by the player.
    ///
    /// Expiry is checked first: a submission that lands on or after the
    /// deadline loses to the timer.
    pub fn submit(&mut self, shown: &str, now: Millis) -> Result<Verdict> {
        if !self.evaluator.is_awaiting() || self.round.paused {
            debug!("submission ignored in phase {:?}", self.evaluator.phase());
            return Ok(Verdict::Ignored);
        }

        self.round.remaining_ms = self.round.timer.tick(now);
        if self.round.remaining_ms == 0 {
            return Ok(self
                .expire(now)
                .map_or(Verdict::Ignored, Verdict::Resolved));
        }

        let shown = Code::parse_shown(shown)?;
        let Some(expected) = self.order.as_ref().map(|o| o.code) else {
            return Ok(Verdict::Ignored);
        };

        match self
            .evaluator
            .evaluate(self.mode, expected, shown, self.round.remaining_ms)
        {
            Some(feedback) => {
                let outcome = feedback.outcome;
                self.resolve(feedback, now);
                Ok(Verdict::Resolved(outcome))
            }
            None => Ok(Verdict::Ignored),
        }
    }

    /// Automatic validation: only modes whose trigger is a gesture honour it.
    pub fn confirm_gesture(&mut self, shown: &str, now: Millis) -> Result<Verdict> {
        if !self.mode.is_automatic() {
            return Ok(Verdict::Ignored);
        }
        self.submit(shown, now)
    }

    pub fn toggle_scene(&mut self, now: Millis) -> Scene {
        if self.round.paused {
            return self.scenes.active_scene();
        }

        let scene = self.scenes.toggle_scene();
        if !self.evaluator.is_awaiting() {
            return scene;
        }

        self.round.remaining_ms = self.round.timer.tick(now);
        match scene {
            Scene::Prep => {
                if self.round.remaining_ms > 0 {
                    self.round.had_active_order = true;
                }
            }
            Scene::Order => {
                if self.round.remaining_ms == 0 && self.round.had_active_order {
                    self.expire(now);
                }
            }
        }
        debug!(?scene, remaining_ms = self.round.remaining_ms, "scene toggled");
        scene
    }

    /// Pause or resume the running round; returns whether it is now paused.
    pub fn toggle_pause(&mut self, now: Millis) -> bool {
        if !self.evaluator.is_awaiting() {
            return self.round.paused;
        }

        if self.round.paused {
            self.round.timer.resume(now);
            self.set_paused(false);
            info!(remaining_ms = self.round.remaining_ms, "resumed");
        } else {
            self.round.timer.pause(now);
            self.round.remaining_ms = self.round.timer.tick(now);
            self.set_paused(true);
            info!(remaining_ms = self.round.remaining_ms, "paused");
        }
        self.round.paused
    }

    /// Switch modes. The current round is replaced; the score survives
    /// unless the game had already ended.
    pub fn change_mode(&mut self, mode: GameMode, now: Millis) -> Result<()> {
        info!(from = %self.mode, to = %mode, "mode changed");
        self.start_round(mode, now)
    }

    /// Next round after a correct answer. Returns false if not applicable.
    pub fn continue_round(&mut self, now: Millis) -> Result<bool> {
        if self.evaluator.outcome() != Some(Outcome::Correct) {
            return Ok(false);
        }

        let refresh = self.pending_refresh.unwrap_or(Refresh::OrderOnly);
        let (deals, order) = self.draw(self.mode, refresh)?;
        debug!(?refresh, score = self.score, "continuing");
        self.deals = deals;
        self.order = Some(order);
        self.evaluator.finish();
        self.scenes.show(Scene::Order);
        self.begin_round(now);
        Ok(true)
    }

    /// Full reset after a lost round. Returns false if not applicable.
    pub fn retry(&mut self, now: Millis) -> Result<bool> {
        if !self.round.game_ended {
            return Ok(false);
        }

        self.start_round(self.mode, now)?;
        Ok(true)
    }

    /// Same as [`GameSession::retry`]; offered after the timer ran out.
    pub fn play_again(&mut self, now: Millis) -> Result<bool> {
        self.retry(now)
    }

    /// Abandon the game and return to the idle state.
    pub fn back_to_menu(&mut self) {
        self.stop_music();
        self.score = 0;
        self.round = RoundState::default();
        self.order = None;
        self.feedback = None;
        self.pending_refresh = None;
        self.new_highscore = false;
        self.evaluator.finish();
        self.scenes.show(Scene::Order);
        self.scenes.set_paused(false);
    }

    // ── Readouts ──

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn remaining_ms(&self) -> Millis {
        self.round.remaining_ms
    }

    pub fn round(&self) -> &RoundState {
        &self.round
    }

    pub fn phase(&self) -> Phase {
        self.evaluator.phase()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.evaluator.outcome()
    }

    pub fn is_paused(&self) -> bool {
        self.round.paused
    }

    pub fn game_ended(&self) -> bool {
        self.round.game_ended
    }

    pub fn active_scene(&self) -> Scene {
        self.scenes.active_scene()
    }

    pub fn order(&self) -> Option<&Order> {
        self.order.as_ref()
    }

    pub fn deals(&self) -> &[MenuItem] {
        &self.deals
    }

    pub fn feedback(&self) -> Option<&Feedback> {
        self.feedback.as_ref()
    }

    pub fn is_new_highscore(&self) -> bool {
        self.new_highscore
    }

    pub fn highscore(&self) -> u32 {
        self.best_score(self.mode)
    }

    pub fn best_score(&self, mode: GameMode) -> u32 {
        self.highscores.get_highscore(mode).unwrap_or_else(|e| {
            warn!("failed to read highscore: {}", e);
            0
        })
    }

    pub fn games_played(&self, mode: GameMode) -> u32 {
        self.highscores.games_played(mode).unwrap_or_else(|e| {
            warn!("failed to read game history: {}", e);
            0
        })
    }

    pub fn pending_refresh(&self) -> Option<Refresh> {
        self.pending_refresh
    }

    /// Whether the kitchen shows a validate button right now
    pub fn validate_affordance_visible(&self) -> bool {
        self.scenes.active_scene() == Scene::Prep
            && self.order_active()
            && !self.mode.is_automatic()
    }

    pub fn frame(&self, scene: Scene) -> Frame {
        let view = RoundView {
            remaining_ms: self.round.remaining_ms,
            order_active: self.order_active(),
            show_validate: self.order_active() && !self.mode.is_automatic(),
        };
        self.scenes.render(scene, view)
    }

    pub fn active_frame(&self) -> Frame {
        self.frame(self.scenes.active_scene())
    }

    // ── Internals ──

    fn order_active(&self) -> bool {
        self.evaluator.is_awaiting() && !self.round.paused && self.round.remaining_ms > 0
    }

    fn set_paused(&mut self, paused: bool) {
        self.round.paused = paused;
        self.scenes.set_paused(paused);
    }

    /// New deals and order without touching session state
    fn draw(&mut self, mode: GameMode, refresh: Refresh) -> Result<(Vec<MenuItem>, Order)> {
        let deals = match refresh {
            Refresh::Catalog => {
                let items = self.catalog.fetch();
                if items.is_empty() {
                    warn!("catalog provider returned no items");
                    return Err(GameError::CatalogUnavailable);
                }
                catalog::draw_deals(&items, self.deals_count, &mut self.rng)
            }
            Refresh::OrderOnly => self.deals.clone(),
        };
        let order = catalog::generate(mode, &deals, &mut self.rng)?;
        Ok((deals, order))
    }

    fn begin_round(&mut self, now: Millis) {
        let duration = self.mode.policy().duration_ms;
        self.round.timer.start(duration, now);
        self.round.remaining_ms = duration;
        self.round.had_active_order = duration > 0;
        self.round.game_ended = false;
        self.set_paused(false);
        self.scenes.restart_order();
        self.evaluator.begin();
        self.feedback = None;
        self.pending_refresh = None;
        self.new_highscore = false;

        if !self.music_playing {
            self.audio.notify(AudioEvent::MusicStartInRound);
            self.music_playing = true;
        }
        self.audio.notify(AudioEvent::RoundStart);

        if let Some(order) = &self.order {
            info!(
                mode = %self.mode,
                item = %order.item.id,
                code = order.code.decimal(),
                duration_ms = duration,
                "round started"
            );
        }
    }

    fn expire(&mut self, now: Millis) -> Option<Outcome> {
        let expected = self.order.as_ref()?.code;
        let feedback = self.evaluator.expire(self.mode, expected)?;
        let outcome = feedback.outcome;
        self.resolve(feedback, now);
        Some(outcome)
    }

    fn resolve(&mut self, feedback: Feedback, now: Millis) {
        self.round.had_active_order = false;
        self.round.timer.pause(now);
        self.set_paused(true);

        let outcome = feedback.outcome;
        if !outcome.ends_game() {
            self.score += 1;
            self.round.timer.reset();
            self.pending_refresh = Some(refresh_after_correct(self.score));
            self.audio.notify(AudioEvent::Correct);
            info!(score = self.score, "correct");
        } else {
            self.round.game_ended = true;
            self.new_highscore = match self.highscores.report_score(self.mode, self.score) {
                Ok(is_new) => is_new,
                Err(e) => {
                    warn!("failed to report score: {}", e);
                    false
                }
            };

            self.stop_music();
            self.audio.notify(match outcome {
                Outcome::TimeExpired => AudioEvent::TimeExpired,
                _ => AudioEvent::Incorrect,
            });
            self.audio.notify(AudioEvent::MusicGameEnd);
            if self.new_highscore {
                self.audio.notify(AudioEvent::NewHighscore);
            }
            info!(
                ?outcome,
                score = self.score,
                new_highscore = self.new_highscore,
                "game over"
            );
        }

        self.feedback = Some(feedback);
    }

    fn stop_music(&mut self) {
        self.audio.notify(AudioEvent::MusicStop);
        self.music_playing = false;
    }
}
