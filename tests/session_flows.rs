use std::cell::{Cell, RefCell};
use std::rc::Rc;

use assert_matches::assert_matches;
use drivethru::{
    audio::{AudioEvent, RecordingAudio, Silence},
    catalog::{BuiltinMenu, CatalogProvider, ExposedCode, FixedMenu, MenuItem},
    error::{GameError, Result},
    evaluator::{Outcome, Phase, Refresh},
    highscore::{HighscoreStore, MemoryHighscoreStore, SqliteHighscoreStore},
    mode::GameMode,
    scene::Scene,
    session::{GameSession, Verdict},
};

/// Counts wholesale catalog fetches
#[derive(Clone, Default)]
struct CountingMenu {
    fetches: Rc<Cell<usize>>,
}

impl CatalogProvider for CountingMenu {
    fn fetch(&self) -> Vec<MenuItem> {
        self.fetches.set(self.fetches.get() + 1);
        vec![MenuItem::new("nuggets", "Nuggets", 9).unwrap()]
    }
}

/// Serves the menu only while `open` is set
#[derive(Clone)]
struct SwitchableMenu {
    open: Rc<Cell<bool>>,
}

impl CatalogProvider for SwitchableMenu {
    fn fetch(&self) -> Vec<MenuItem> {
        if self.open.get() {
            vec![MenuItem::new("nuggets", "Nuggets", 9).unwrap()]
        } else {
            Vec::new()
        }
    }
}

/// Records every report and optionally fails
#[derive(Clone, Default)]
struct SpyStore {
    reports: Rc<RefCell<Vec<(GameMode, u32)>>>,
    fail: bool,
}

impl HighscoreStore for SpyStore {
    fn get_highscore(&self, _mode: GameMode) -> Result<u32> {
        Ok(0)
    }

    fn report_score(&mut self, mode: GameMode, score: u32) -> Result<bool> {
        self.reports.borrow_mut().push((mode, score));
        if self.fail {
            return Err(GameError::Io(std::io::Error::other("disk full")));
        }
        Ok(score > 0)
    }

    fn games_played(&self, mode: GameMode) -> Result<u32> {
        let played = self.reports.borrow().iter().filter(|(m, _)| *m == mode).count();
        Ok(played as u32)
    }
}

fn nuggets() -> Box<FixedMenu> {
    Box::new(FixedMenu::new(vec![
        MenuItem::new("nuggets", "Nuggets", 9).unwrap()
    ]))
}

fn session(mode: GameMode) -> GameSession {
    GameSession::new(
        mode,
        nuggets(),
        Box::new(Silence),
        Box::new(MemoryHighscoreStore::new()),
    )
    .with_seed(7)
}

/// Plays `n` correct rounds starting at `now`, returning the time after
fn win_rounds(s: &mut GameSession, n: u32, mut now: u64) -> u64 {
    for _ in 0..n {
        now += 1_000;
        assert_eq!(
            s.submit("01001", now).unwrap(),
            Verdict::Resolved(Outcome::Correct)
        );
        assert!(s.continue_round(now).unwrap());
    }
    now
}

#[test]
fn pause_preserves_remaining_time() {
    let mut s = session(GameMode::Default);
    s.start_round(GameMode::Default, 0).unwrap();

    s.tick(5_000);
    assert_eq!(s.remaining_ms(), 15_000);
    assert!(s.toggle_pause(5_000));

    // wall time passes with no ticks
    assert!(!s.toggle_pause(15_000));
    s.tick(15_000);
    assert_eq!(s.remaining_ms(), 15_000);
}

#[test]
fn ticks_while_paused_do_not_advance() {
    let mut s = session(GameMode::Speedrun);
    s.start_round(GameMode::Speedrun, 0).unwrap();
    s.toggle_pause(2_000);
    for t in (2_100..60_000).step_by(100) {
        assert_eq!(s.tick(t), None);
    }
    assert_eq!(s.remaining_ms(), 8_000);
    assert_eq!(s.phase(), Phase::Awaiting);
}

#[test]
fn car_stays_put_without_a_running_round() {
    let mut s = session(GameMode::Default);
    for t in 1..=10 {
        assert_eq!(s.tick(t * 100), None);
    }
    assert_eq!(s.frame(Scene::Order).car_position, 0);

    s.start_round(GameMode::Default, 2_000).unwrap();
    s.tick(2_100);
    s.submit("00000", 2_200).unwrap();
    let car = s.frame(Scene::Order).car_position;
    for t in 1..=10 {
        s.tick(2_200 + t * 100);
    }
    assert_eq!(s.frame(Scene::Order).car_position, car);
}

#[test]
fn paused_ticks_do_not_move_the_car_from_the_kitchen() {
    let mut s = session(GameMode::Default);
    s.start_round(GameMode::Default, 0).unwrap();
    s.tick(100);
    s.tick(200);

    assert_eq!(s.toggle_scene(300), Scene::Prep);
    assert!(s.toggle_pause(400));
    let car = s.frame(Scene::Order).car_position;
    for t in 5..15 {
        assert_eq!(s.tick(t * 100), None);
    }
    assert!(!s.toggle_pause(1_500));
    assert_eq!(s.frame(Scene::Order).car_position, car);

    s.tick(1_600);
    assert!(s.frame(Scene::Order).car_position > car);
}

#[test]
fn expiry_floors_at_zero() {
    let mut s = session(GameMode::Speedrun);
    s.start_round(GameMode::Speedrun, 0).unwrap();
    s.tick(100);
    assert_eq!(s.tick(50_000), Some(Outcome::TimeExpired));
    assert_eq!(s.remaining_ms(), 0);
    assert_eq!(s.tick(60_000), None);
}

#[test]
fn fifth_correct_answer_refreshes_catalog() {
    let menu = CountingMenu::default();
    let mut s = GameSession::new(
        GameMode::Default,
        Box::new(menu.clone()),
        Box::new(Silence),
        Box::new(MemoryHighscoreStore::new()),
    );
    s.start_round(GameMode::Default, 0).unwrap();
    let now = win_rounds(&mut s, 4, 0);
    assert_eq!(s.score(), 4);
    assert_eq!(menu.fetches.get(), 1);

    let now = now + 1_000;
    assert_eq!(
        s.submit("01001", now).unwrap(),
        Verdict::Resolved(Outcome::Correct)
    );
    assert_eq!(s.score(), 5);
    assert_eq!(s.pending_refresh(), Some(Refresh::Catalog));
    assert_eq!(menu.fetches.get(), 1);

    s.continue_round(now).unwrap();
    assert_eq!(menu.fetches.get(), 2);
    assert_eq!(s.mode(), GameMode::Default);
}

#[test]
fn correct_resets_timer_to_full_duration() {
    let mut s = session(GameMode::Default);
    s.start_round(GameMode::Default, 0).unwrap();
    s.tick(12_000);
    s.submit("01001", 12_000).unwrap();
    s.continue_round(13_000).unwrap();
    assert_eq!(s.remaining_ms(), 20_000);
    s.tick(14_000);
    assert_eq!(s.remaining_ms(), 19_000);
}

#[test]
fn incorrect_freezes_score_until_retry() {
    let mut s = session(GameMode::Default);
    s.start_round(GameMode::Default, 0).unwrap();
    let now = win_rounds(&mut s, 3, 0);

    assert_eq!(
        s.submit("01010", now + 500).unwrap(),
        Verdict::Resolved(Outcome::Incorrect)
    );
    assert_eq!(s.score(), 3);
    assert!(s.game_ended());
    assert!(!s.continue_round(now + 600).unwrap());
    assert_eq!(s.score(), 3);

    assert!(s.retry(now + 1_000).unwrap());
    assert_eq!(s.score(), 0);
    assert!(!s.game_ended());
    assert!(!s.is_paused());
    assert_eq!(s.active_scene(), Scene::Order);
    assert_eq!(s.remaining_ms(), 20_000);
}

#[test]
fn start_round_after_loss_resets_score() {
    let mut s = session(GameMode::Default);
    s.start_round(GameMode::Default, 0).unwrap();
    let now = win_rounds(&mut s, 3, 0);
    s.submit("01010", now + 500).unwrap();
    assert_eq!(s.score(), 3);

    s.start_round(GameMode::Default, now + 1_000).unwrap();
    assert_eq!(s.score(), 0);
    assert!(!s.game_ended());

    assert_eq!(
        s.submit("01001", now + 2_000).unwrap(),
        Verdict::Resolved(Outcome::Correct)
    );
    assert_eq!(s.score(), 1);
}

#[test]
fn start_round_mid_game_keeps_score() {
    let mut s = session(GameMode::Default);
    s.start_round(GameMode::Default, 0).unwrap();
    let now = win_rounds(&mut s, 2, 0);

    s.start_round(GameMode::Speedrun, now + 100).unwrap();
    assert_eq!(s.score(), 2);
    assert_eq!(s.remaining_ms(), 10_000);
}

#[test]
fn repeated_submit_scores_once() {
    let mut s = session(GameMode::Default);
    s.start_round(GameMode::Default, 0).unwrap();

    assert_eq!(
        s.submit("01001", 100).unwrap(),
        Verdict::Resolved(Outcome::Correct)
    );
    assert_eq!(s.submit("01001", 101).unwrap(), Verdict::Ignored);
    assert_eq!(s.score(), 1);
}

#[test]
fn reverse_mode_compares_decimal_values() {
    let mut s = session(GameMode::Reverse);
    s.start_round(GameMode::Reverse, 0).unwrap();
    assert_eq!(s.order().unwrap().exposed, ExposedCode::Decimal(9));
    assert_eq!(
        s.submit("01001", 1_000).unwrap(),
        Verdict::Resolved(Outcome::Correct)
    );

    let mut s = session(GameMode::Reverse);
    s.start_round(GameMode::Reverse, 0).unwrap();
    assert_eq!(
        s.submit("01010", 1_000).unwrap(),
        Verdict::Resolved(Outcome::Incorrect)
    );
    let feedback = s.feedback().unwrap();
    assert_eq!(feedback.true_line(), "01001(2) -> 9(10)");
    assert_eq!(feedback.current_line().unwrap(), "01001(2) != 10(10)");
}

#[test]
fn expiry_beats_submission_in_same_tick() {
    let mut s = session(GameMode::Default);
    s.start_round(GameMode::Default, 0).unwrap();
    s.tick(19_900);

    assert_eq!(
        s.submit("01001", 20_000).unwrap(),
        Verdict::Resolved(Outcome::TimeExpired)
    );
    assert_eq!(s.score(), 0);
    assert_eq!(s.tick(20_100), None);
}

#[test]
fn malformed_submission_at_deadline_still_expires() {
    let mut s = session(GameMode::Default);
    s.start_round(GameMode::Default, 0).unwrap();
    assert_eq!(
        s.submit("nope", 20_000).unwrap(),
        Verdict::Resolved(Outcome::TimeExpired)
    );
}

#[test]
fn malformed_submission_is_rejected_without_transition() {
    let mut s = session(GameMode::Default);
    s.start_round(GameMode::Default, 0).unwrap();
    assert_matches!(
        s.submit("1101", 1_000),
        Err(GameError::InvalidSubmission(_))
    );
    assert_matches!(
        s.submit("11021", 1_000),
        Err(GameError::InvalidSubmission(_))
    );
    assert_eq!(s.phase(), Phase::Awaiting);
    assert_eq!(
        s.submit("01001", 1_100).unwrap(),
        Verdict::Resolved(Outcome::Correct)
    );
}

#[test]
fn expiry_while_in_kitchen_resolves_on_return() {
    let store = SpyStore::default();
    let mut s = GameSession::new(
        GameMode::Default,
        nuggets(),
        Box::new(Silence),
        Box::new(store.clone()),
    );
    s.start_round(GameMode::Default, 0).unwrap();
    assert_eq!(s.toggle_scene(1_000), Scene::Prep);
    assert!(s.round().had_active_order());

    assert_eq!(s.toggle_scene(25_000), Scene::Order);
    assert_eq!(s.outcome(), Some(Outcome::TimeExpired));

    s.tick(25_100);
    assert_eq!(store.reports.borrow().len(), 1);
}

#[test]
fn timer_keeps_running_across_scene_toggles() {
    let mut s = session(GameMode::Default);
    s.start_round(GameMode::Default, 0).unwrap();
    s.toggle_scene(1_000);
    s.tick(3_000);
    s.toggle_scene(4_000);
    s.tick(6_000);
    assert_eq!(s.remaining_ms(), 14_000);
}

#[test]
fn highscore_reported_once_per_loss() {
    let store = SpyStore::default();
    let mut s = GameSession::new(
        GameMode::Speedrun,
        nuggets(),
        Box::new(Silence),
        Box::new(store.clone()),
    );
    s.start_round(GameMode::Speedrun, 0).unwrap();
    let now = win_rounds(&mut s, 2, 0);
    s.submit("00000", now + 100).unwrap();
    s.submit("00000", now + 200).unwrap();
    s.tick(now + 60_000);

    assert_eq!(*store.reports.borrow(), vec![(GameMode::Speedrun, 2)]);
    assert!(s.is_new_highscore());
}

#[test]
fn failing_store_does_not_block_reset() {
    let store = SpyStore {
        fail: true,
        ..Default::default()
    };
    let mut s = GameSession::new(
        GameMode::Default,
        nuggets(),
        Box::new(Silence),
        Box::new(store.clone()),
    );
    s.start_round(GameMode::Default, 0).unwrap();
    s.submit("00001", 100).unwrap();

    assert_eq!(s.outcome(), Some(Outcome::Incorrect));
    assert!(!s.is_new_highscore());
    assert!(s.play_again(200).unwrap());
    assert_eq!(s.phase(), Phase::Awaiting);
}

#[test]
fn sqlite_store_tracks_best_per_mode() {
    let mut s = GameSession::new(
        GameMode::Default,
        nuggets(),
        Box::new(Silence),
        Box::new(SqliteHighscoreStore::open_in_memory().unwrap()),
    );
    s.start_round(GameMode::Default, 0).unwrap();
    let now = win_rounds(&mut s, 2, 0);
    s.submit("00000", now + 10).unwrap();
    assert!(s.is_new_highscore());
    assert_eq!(s.highscore(), 2);

    s.retry(now + 20).unwrap();
    s.submit("00000", now + 30).unwrap();
    assert!(!s.is_new_highscore());
    assert_eq!(s.best_score(GameMode::Default), 2);
    assert_eq!(s.best_score(GameMode::Reverse), 0);
}

#[test]
fn audio_events_for_a_lost_game() {
    let audio = RecordingAudio::new();
    let mut s = GameSession::new(
        GameMode::Default,
        nuggets(),
        Box::new(audio.clone()),
        Box::new(MemoryHighscoreStore::new()),
    );
    s.start_round(GameMode::Default, 0).unwrap();
    win_rounds(&mut s, 1, 0);
    audio.clear();

    s.tick(30_000);
    assert_eq!(
        audio.events(),
        vec![
            AudioEvent::MusicStop,
            AudioEvent::TimeExpired,
            AudioEvent::MusicGameEnd,
            AudioEvent::NewHighscore,
        ]
    );

    audio.clear();
    s.retry(31_000).unwrap();
    assert_eq!(
        audio.events(),
        vec![
            AudioEvent::MusicStop,
            AudioEvent::MusicStartInRound,
            AudioEvent::RoundStart,
        ]
    );
}

#[test]
fn change_mode_keeps_score_and_restarts_round() {
    let mut s = session(GameMode::Default);
    s.start_round(GameMode::Default, 0).unwrap();
    let now = win_rounds(&mut s, 2, 0);

    s.change_mode(GameMode::DoubleTrouble, now + 100).unwrap();
    assert_eq!(s.mode(), GameMode::DoubleTrouble);
    assert_eq!(s.score(), 2);
    assert_eq!(s.remaining_ms(), 60_000);
    assert_eq!(s.phase(), Phase::Awaiting);
}

#[test]
fn change_mode_after_loss_starts_over() {
    let mut s = session(GameMode::Default);
    s.start_round(GameMode::Default, 0).unwrap();
    let now = win_rounds(&mut s, 2, 0);
    s.submit("00000", now + 100).unwrap();

    s.change_mode(GameMode::Reverse, now + 200).unwrap();
    assert_eq!(s.mode(), GameMode::Reverse);
    assert_eq!(s.score(), 0);
    assert!(!s.game_ended());
    assert_matches!(s.order().unwrap().exposed, ExposedCode::Decimal(_));
}

#[test]
fn failed_change_mode_after_loss_keeps_mode() {
    let open = Rc::new(Cell::new(true));
    let mut s = GameSession::new(
        GameMode::Default,
        Box::new(SwitchableMenu { open: open.clone() }),
        Box::new(Silence),
        Box::new(MemoryHighscoreStore::new()),
    )
    .with_seed(7);
    s.start_round(GameMode::Default, 0).unwrap();
    let now = win_rounds(&mut s, 2, 0);
    s.submit("00000", now + 100).unwrap();

    open.set(false);
    assert_matches!(
        s.change_mode(GameMode::Reverse, now + 200),
        Err(GameError::CatalogUnavailable)
    );
    assert_eq!(s.mode(), GameMode::Default);
    assert_eq!(s.score(), 2);
    assert!(s.game_ended());
    assert_eq!(s.outcome(), Some(Outcome::Incorrect));

    open.set(true);
    assert!(s.retry(now + 300).unwrap());
    assert_eq!(s.mode(), GameMode::Default);
    assert_eq!(s.score(), 0);
}

#[test]
fn empty_catalog_refuses_every_start() {
    let mut s = GameSession::new(
        GameMode::Default,
        Box::new(FixedMenu::default()),
        Box::new(Silence),
        Box::new(MemoryHighscoreStore::new()),
    );
    assert_matches!(
        s.start_round(GameMode::Default, 0),
        Err(GameError::CatalogUnavailable)
    );
    assert_matches!(
        s.change_mode(GameMode::Speedrun, 0),
        Err(GameError::CatalogUnavailable)
    );
    assert_eq!(s.phase(), Phase::Idle);
    assert_eq!(s.submit("01001", 10).unwrap(), Verdict::Ignored);
}

#[test]
fn deals_come_from_builtin_menu() {
    let mut s = GameSession::new(
        GameMode::Default,
        Box::new(BuiltinMenu),
        Box::new(Silence),
        Box::new(MemoryHighscoreStore::new()),
    )
    .with_seed(3)
    .with_deals_count(3);
    s.start_round(GameMode::Default, 0).unwrap();

    assert_eq!(s.deals().len(), 3);
    let order = s.order().unwrap();
    assert!(s.deals().contains(&order.item));
    assert_eq!(order.exposed, ExposedCode::Bits(order.code));
}

#[test]
fn order_only_refresh_keeps_deals() {
    let mut s = GameSession::new(
        GameMode::Default,
        Box::new(BuiltinMenu),
        Box::new(Silence),
        Box::new(MemoryHighscoreStore::new()),
    )
    .with_seed(11);
    s.start_round(GameMode::Default, 0).unwrap();
    let deals = s.deals().to_vec();
    let shown = s.order().unwrap().code.binary_string();

    s.submit(&shown, 1_000).unwrap();
    assert_eq!(s.pending_refresh(), Some(Refresh::OrderOnly));
    s.continue_round(1_000).unwrap();
    assert_eq!(s.deals(), deals.as_slice());
}
