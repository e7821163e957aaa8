//! One play session: a run in progress plus the score table it feeds
//!
//! The session owns the simulation, the high score tracker, and the worker
//! that writes the score file. Runs can be restarted without reloading
//! scores; finished runs are recorded and saved in the background.

use crate::error::Result;
use crate::highscores::TopKTracker;
use crate::jobs::BackgroundJobQueue;
use crate::persistence::ScoreFile;
use crate::settings::Settings;
use crate::sim::{
    EventScheduler, GameEvent, GamePhase, GameState, SpatialIndex, TickInput, TickScratch,
    WORLD_BOUNDS, schedule_spawners, tick,
};

pub struct Session {
    pub state: GameState,
    scheduler: EventScheduler<GameState>,
    scratch: TickScratch,
    scores: TopKTracker,
    score_file: ScoreFile,
    jobs: BackgroundJobQueue,
    /// Set once the current run's score has been recorded
    recorded: bool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("tick", &self.state.tick)
            .field("phase", &self.state.phase)
            .field("scores", &self.scores)
            .field("score_file", &self.score_file)
            .finish()
    }
}

impl Session {
    /// Load the score table and start the first run
    pub fn new(settings: &Settings) -> Result<Self> {
        let score_file = ScoreFile::new(&settings.score_file, settings.top_k);
        let scores = score_file.load();
        let index = SpatialIndex::with_capacity(WORLD_BOUNDS, settings.quadtree_capacity);

        let mut session = Self {
            state: GameState::new(0),
            scheduler: EventScheduler::new(),
            scratch: TickScratch::new(index),
            scores,
            score_file,
            jobs: BackgroundJobQueue::new()?,
            recorded: false,
        };
        session.reset(settings.effective_seed());
        Ok(session)
    }

    /// Start a new run; pending timers from the old run are dropped
    pub fn reset(&mut self, seed: u64) {
        let dropped = self.scheduler.clear();
        log::info!("New run with seed {seed} ({dropped} pending timers dropped)");
        self.state.reset(seed);
        self.scratch.index.clear();
        schedule_spawners(&self.scheduler, self.state.tick);
        self.recorded = false;
    }

    /// Advance one tick and return what happened
    ///
    /// When the run ends, its score is recorded and a save is queued.
    pub fn step(&mut self, input: &TickInput) -> Vec<GameEvent> {
        tick(&mut self.state, &self.scheduler, &mut self.scratch, input);
        if self.state.phase == GamePhase::GameOver {
            self.record_run();
        }
        self.state.drain_events()
    }

    pub fn is_over(&self) -> bool {
        self.state.phase == GamePhase::GameOver
    }

    pub fn scores(&self) -> &TopKTracker {
        &self.scores
    }

    pub fn score_file(&self) -> &ScoreFile {
        &self.score_file
    }

    /// Record the current score once per run and queue a save if it placed
    fn record_run(&mut self) {
        if self.recorded {
            return;
        }
        self.recorded = true;
        let score = self.state.score.current;
        if self.scores.record(score) {
            log::info!("Score {score} made the table (best {})", self.scores.best());
            if !self.score_file.save_async(&self.scores, &self.jobs) {
                log::warn!("Job queue stopped; score {score} not saved");
            }
        }
    }

    /// Record an unfinished run, write scores synchronously, stop the worker
    pub fn shutdown(mut self) -> Result<TopKTracker> {
        if !self.is_over() && self.state.score.current > 0 {
            self.record_run();
        }
        self.jobs.shutdown();
        self.score_file.save(&self.scores)?;
        log::info!("Session closed, {} high scores kept", self.scores.len());
        Ok(self.scores.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_settings(dir: &std::path::Path) -> Settings {
        Settings {
            score_file: dir.join("scores.dat").to_string_lossy().into_owned(),
            seed: Some(11),
            ..Settings::default()
        }
    }

    #[test]
    fn test_quit_records_score_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::new(&test_settings(dir.path())).unwrap();
        for _ in 0..100 {
            session.step(&TickInput::default());
        }
        let score = session.state.score.current;
        assert!(score > 0);

        let quit = TickInput {
            quit: true,
            ..Default::default()
        };
        let events = session.step(&quit);
        assert!(matches!(events.last(), Some(GameEvent::GameOver { .. })));
        session.step(&quit);
        session.step(&TickInput::default());
        assert_eq!(session.scores().top_k(), vec![score]);

        let scores = session.shutdown().unwrap();
        assert_eq!(scores.top_k(), vec![score]);
    }

    #[test]
    fn test_reset_restarts_timers() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::new(&test_settings(dir.path())).unwrap();
        for _ in 0..200 {
            session.step(&TickInput::default());
        }
        session.reset(12);
        assert_eq!(session.scratch.index.bounds(), WORLD_BOUNDS);
        assert_eq!(session.state.tick, 0);
        assert!(session.state.enemies.is_empty());
        assert_eq!(session.scheduler.len(), 2);
        session.shutdown().unwrap();
    }
}
