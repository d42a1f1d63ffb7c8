use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use crate::engine::notice::{Notice, NoticeKind, NoticeToken};
use crate::engine::{GameEngine, SubmissionTicket, SubmitOutcome, TickOutcome};
use crate::judge::{JudgeError, MatchJudge, Verdict};
use crate::scores::HighScoreStore;
use crate::vocabulary::Vocabulary;
use crate::websocket::messages::{ClientMessage, ServerMessage};

/// Internal events delivered back into the session loop: judge
/// verdicts for in-flight submissions and notice expiry timers
enum SessionEvent {
    Verdict {
        ticket: SubmissionTicket,
        result: Result<Verdict, JudgeError>,
    },
    NoticeExpired {
        token: NoticeToken,
    },
}

/// One connected player's game. The session task is the single writer
/// of its engine: grid growth, skips, restarts and judge verdicts all
/// pass through one select loop, so transitions never interleave. Only
/// the judge call itself runs concurrently, and its result re-enters
/// the loop as an event carrying the submission ticket.
pub struct GameSession {
    engine: GameEngine,
    vocabulary: Arc<Vocabulary>,
    judge: Arc<dyn MatchJudge>,
    scores: Arc<dyn HighScoreStore>,
    high_score: i64,
    tick_period: Duration,
    out: mpsc::Sender<ServerMessage>,
    events_tx: mpsc::Sender<SessionEvent>,
    events_rx: mpsc::Receiver<SessionEvent>,
}

impl GameSession {
    pub fn new(
        engine: GameEngine,
        vocabulary: Arc<Vocabulary>,
        judge: Arc<dyn MatchJudge>,
        scores: Arc<dyn HighScoreStore>,
        tick_period: Duration,
        out: mpsc::Sender<ServerMessage>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(64);
        Self {
            engine,
            vocabulary,
            judge,
            scores,
            high_score: 0,
            tick_period,
            out,
            events_tx,
            events_rx,
        }
    }

    /// Drive the session until the client disconnects
    pub async fn run(mut self, mut commands: mpsc::Receiver<ClientMessage>) {
        self.high_score = self.scores.load().await;
        if !self.send_state().await {
            return;
        }

        let mut ticker = interval_at(Instant::now() + self.tick_period, self.tick_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                // The growth timer is parked while the round is over
                // and re-armed by restart
                _ = ticker.tick(), if !self.engine.is_game_over() => {
                    if !self.on_tick().await {
                        break;
                    }
                }
                cmd = commands.recv() => match cmd {
                    Some(cmd) => {
                        if !self.on_command(cmd, &mut ticker).await {
                            break;
                        }
                    }
                    None => break,
                },
                Some(event) = self.events_rx.recv() => {
                    if !self.on_event(event).await {
                        break;
                    }
                }
            }
        }
    }

    async fn on_tick(&mut self) -> bool {
        let outcome = self.engine.tick(&self.vocabulary, &mut rand::rng());
        match outcome {
            TickOutcome::Placed => self.send_state().await,
            TickOutcome::RoundOver { final_score } => {
                tracing::info!("Round over with final score {}", final_score);
                self.settle_high_score(final_score);
                self.send(ServerMessage::GameOver {
                    final_score,
                    high_score: self.high_score,
                })
                .await
                    && self.send_state().await
            }
            TickOutcome::Ignored => true,
        }
    }

    async fn on_command(&mut self, cmd: ClientMessage, ticker: &mut Interval) -> bool {
        match cmd {
            ClientMessage::Restart => {
                self.engine.restart(&self.vocabulary, &mut rand::rng());
                ticker.reset();
                self.send_state().await
            }
            ClientMessage::Skip => {
                let skipped = self.engine.skip(&mut rand::rng());
                match skipped {
                    Some(notice) => {
                        self.schedule_notice_expiry(&notice);
                        self.send(ServerMessage::Feedback { text: notice.text }).await
                            && self.send_state().await
                    }
                    None => true,
                }
            }
            ClientMessage::Submit { input } => {
                // Invalid submissions yield no ticket and are silently
                // ignored
                if let Some(ticket) = self.engine.begin_submit(&input) {
                    self.dispatch_judgment(ticket);
                }
                true
            }
        }
    }

    /// Run the judge call off the loop; the verdict comes back as an
    /// event while ticks and skips stay live
    fn dispatch_judgment(&self, ticket: SubmissionTicket) {
        let judge = self.judge.clone();
        let events = self.events_tx.clone();
        let total_score = self.engine.score();
        tokio::spawn(async move {
            let result = judge
                .evaluate(ticket.target(), ticket.input(), total_score)
                .await;
            let _ = events.send(SessionEvent::Verdict { ticket, result }).await;
        });
    }

    async fn on_event(&mut self, event: SessionEvent) -> bool {
        match event {
            SessionEvent::Verdict { ticket, result } => {
                let (matched, similarity) = match result {
                    Ok(verdict) => (verdict.matched, verdict.score),
                    Err(e) => {
                        // Same "try again" as a genuine mismatch for
                        // gameplay, but distinguishable here
                        tracing::warn!("Match judge unavailable, treating as non-match: {}", e);
                        (false, 0.0)
                    }
                };
                let outcome = self
                    .engine
                    .resolve_submission(ticket, matched, similarity, &mut rand::rng());
                match outcome {
                    SubmitOutcome::Scored { awarded, notice } => {
                        tracing::debug!("Submission matched, awarded {} points", awarded);
                        self.schedule_notice_expiry(&notice);
                        self.send(ServerMessage::ScorePopup { text: notice.text }).await
                            && self.send_state().await
                    }
                    SubmitOutcome::Rejected { notice } => {
                        self.schedule_notice_expiry(&notice);
                        self.send(ServerMessage::Feedback { text: notice.text }).await
                    }
                    SubmitOutcome::Stale => {
                        tracing::debug!("Discarding stale judge verdict");
                        true
                    }
                }
            }
            SessionEvent::NoticeExpired { token } => {
                // A newer notice of the same kind keeps its own timer;
                // this one only clears what it was scheduled for
                if self.engine.notices_mut().clear_if_current(token) {
                    let msg = match token.kind {
                        NoticeKind::Feedback => ServerMessage::FeedbackCleared,
                        NoticeKind::ScorePopup => ServerMessage::ScorePopupCleared,
                    };
                    self.send(msg).await
                } else {
                    true
                }
            }
        }
    }

    fn schedule_notice_expiry(&self, notice: &Notice) {
        let events = self.events_tx.clone();
        let token = notice.token;
        let ttl = notice.ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let _ = events.send(SessionEvent::NoticeExpired { token }).await;
        });
    }

    /// Update the remembered high score and write it through,
    /// fire-and-forget. Write failures are logged by the store and
    /// never block the round.
    fn settle_high_score(&mut self, final_score: u32) {
        let final_score = i64::from(final_score);
        if final_score > self.high_score {
            self.high_score = final_score;
            let scores = self.scores.clone();
            tokio::spawn(async move {
                scores.save(final_score).await;
            });
        }
    }

    async fn send_state(&self) -> bool {
        self.send(ServerMessage::GameState {
            grid: self.engine.grid().clone(),
            pointer: self.engine.pointer(),
            score: self.engine.score(),
            skips_left: self.engine.skips_left(),
            game_over: self.engine.is_game_over(),
            high_score: self.high_score,
        })
        .await
    }

    async fn send(&self, msg: ServerMessage) -> bool {
        self.out.send(msg).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scores::MemoryHighScoreStore;
    use async_trait::async_trait;

    struct ScriptedJudge {
        matched: bool,
        score: f64,
        fail: bool,
    }

    #[async_trait]
    impl MatchJudge for ScriptedJudge {
        async fn evaluate(
            &self,
            _target: &str,
            _input: &str,
            _total_score: u32,
        ) -> Result<Verdict, JudgeError> {
            if self.fail {
                return Err(JudgeError::Status(
                    reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                ));
            }
            Ok(Verdict {
                matched: self.matched,
                score: self.score,
            })
        }
    }

    struct Harness {
        commands: mpsc::Sender<ClientMessage>,
        out: mpsc::Receiver<ServerMessage>,
        store: Arc<MemoryHighScoreStore>,
    }

    fn spawn_session(judge: ScriptedJudge, initial_high_score: i64, tick_period: Duration) -> Harness {
        let vocabulary = Arc::new(Vocabulary::builtin());
        let mut rng = rand::rng();
        let engine = GameEngine::new(&vocabulary, &mut rng);
        let store = Arc::new(MemoryHighScoreStore::new(initial_high_score));
        let scores: Arc<dyn HighScoreStore> = store.clone();

        let (out_tx, out_rx) = mpsc::channel(256);
        let (cmd_tx, cmd_rx) = mpsc::channel(16);

        let session = GameSession::new(
            engine,
            vocabulary,
            Arc::new(judge),
            scores,
            tick_period,
            out_tx,
        );
        tokio::spawn(session.run(cmd_rx));

        Harness {
            commands: cmd_tx,
            out: out_rx,
            store,
        }
    }

    /// Receive messages until one satisfies the predicate
    async fn recv_until<F>(out: &mut mpsc::Receiver<ServerMessage>, mut pred: F) -> ServerMessage
    where
        F: FnMut(&ServerMessage) -> bool,
    {
        loop {
            let msg = out.recv().await.expect("Session closed unexpectedly");
            if pred(&msg) {
                return msg;
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_matched_submission_scores_and_pops_up() {
        let mut harness = spawn_session(
            ScriptedJudge {
                matched: true,
                score: 0.8,
                fail: false,
            },
            0,
            Duration::from_secs(3600),
        );

        harness
            .commands
            .send(ClientMessage::Submit {
                input: "stream".to_string(),
            })
            .await
            .unwrap();

        let popup = recv_until(&mut harness.out, |m| {
            matches!(m, ServerMessage::ScorePopup { .. })
        })
        .await;
        assert!(matches!(popup, ServerMessage::ScorePopup { text } if text == "+80"));

        let state = recv_until(&mut harness.out, |m| {
            matches!(m, ServerMessage::GameState { .. })
        })
        .await;
        match state {
            ServerMessage::GameState { score, grid, .. } => {
                assert_eq!(score, 80);
                let words: usize = grid.iter().map(|r| r.len()).sum();
                assert_eq!(words, 4, "Matched target was removed from the grid");
            }
            _ => unreachable!(),
        }

        // The popup expires on its own after its TTL
        recv_until(&mut harness.out, |m| {
            matches!(m, ServerMessage::ScorePopupCleared)
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_mismatch_leaves_state_and_shows_feedback() {
        let mut harness = spawn_session(
            ScriptedJudge {
                matched: false,
                score: 0.1,
                fail: false,
            },
            0,
            Duration::from_secs(3600),
        );

        harness
            .commands
            .send(ClientMessage::Submit {
                input: "banana".to_string(),
            })
            .await
            .unwrap();

        let feedback = recv_until(&mut harness.out, |m| {
            matches!(m, ServerMessage::Feedback { .. })
        })
        .await;
        assert!(matches!(feedback, ServerMessage::Feedback { text } if text == "Try again!"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_judge_failure_degrades_to_try_again() {
        let mut harness = spawn_session(
            ScriptedJudge {
                matched: true,
                score: 0.9,
                fail: true,
            },
            0,
            Duration::from_secs(3600),
        );

        harness
            .commands
            .send(ClientMessage::Submit {
                input: "stream".to_string(),
            })
            .await
            .unwrap();

        let feedback = recv_until(&mut harness.out, |m| {
            matches!(m, ServerMessage::Feedback { .. })
        })
        .await;
        assert!(
            matches!(feedback, ServerMessage::Feedback { text } if text == "Try again!"),
            "A failed judge call plays like a mismatch"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_feedback_and_state_update() {
        let mut harness = spawn_session(
            ScriptedJudge {
                matched: false,
                score: 0.0,
                fail: false,
            },
            0,
            Duration::from_secs(3600),
        );

        harness.commands.send(ClientMessage::Skip).await.unwrap();

        let feedback = recv_until(&mut harness.out, |m| {
            matches!(m, ServerMessage::Feedback { .. })
        })
        .await;
        assert!(matches!(feedback, ServerMessage::Feedback { text } if text == "Skipped!"));

        let state = recv_until(&mut harness.out, |m| {
            matches!(m, ServerMessage::GameState { .. })
        })
        .await;
        match state {
            ServerMessage::GameState {
                skips_left, grid, ..
            } => {
                assert_eq!(skips_left, 1);
                let words: usize = grid.iter().map(|r| r.len()).sum();
                assert_eq!(words, 4);
            }
            _ => unreachable!(),
        }

        recv_until(&mut harness.out, |m| {
            matches!(m, ServerMessage::FeedbackCleared)
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_grow_grid_until_game_over_and_high_score_persists() {
        // Starts at 5 words; 45 ticks of 3s (virtual time) reach the
        // 50-word limit. No skips used, so the final score is the
        // 2 x 50 bonus, beating the stored 50.
        let mut harness = spawn_session(
            ScriptedJudge {
                matched: false,
                score: 0.0,
                fail: false,
            },
            50,
            Duration::from_secs(3),
        );

        let game_over = recv_until(&mut harness.out, |m| {
            matches!(m, ServerMessage::GameOver { .. })
        })
        .await;
        match game_over {
            ServerMessage::GameOver {
                final_score,
                high_score,
            } => {
                assert_eq!(final_score, 100, "0 + 2 unused skips x 50");
                assert_eq!(high_score, 100, "New high score beats the stored 50");
            }
            _ => unreachable!(),
        }

        let state = recv_until(&mut harness.out, |m| {
            matches!(m, ServerMessage::GameState { .. })
        })
        .await;
        match state {
            ServerMessage::GameState {
                game_over, grid, ..
            } => {
                assert!(game_over);
                let words: usize = grid.iter().map(|r| r.len()).sum();
                assert_eq!(words, 50);
            }
            _ => unreachable!(),
        }

        // Let the fire-and-forget save task run
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(harness.store.load().await, 100);

        // Restart returns to a fresh playing state, high score kept
        harness.commands.send(ClientMessage::Restart).await.unwrap();
        let state = recv_until(&mut harness.out, |m| {
            matches!(m, ServerMessage::GameState { .. })
        })
        .await;
        match state {
            ServerMessage::GameState {
                game_over,
                score,
                skips_left,
                high_score,
                grid,
                ..
            } => {
                assert!(!game_over);
                assert_eq!(score, 0);
                assert_eq!(skips_left, 2);
                assert_eq!(high_score, 100);
                assert_eq!(grid.len(), 1);
                assert_eq!(grid[0].len(), 5);
            }
            _ => unreachable!(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_lower_final_score_does_not_touch_high_score() {
        let mut harness = spawn_session(
            ScriptedJudge {
                matched: false,
                score: 0.0,
                fail: false,
            },
            350,
            Duration::from_secs(3),
        );

        let game_over = recv_until(&mut harness.out, |m| {
            matches!(m, ServerMessage::GameOver { .. })
        })
        .await;
        match game_over {
            ServerMessage::GameOver {
                final_score,
                high_score,
            } => {
                assert_eq!(final_score, 100);
                assert_eq!(high_score, 350, "Stored high score stays");
            }
            _ => unreachable!(),
        }

        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(harness.store.load().await, 350);
    }
}
