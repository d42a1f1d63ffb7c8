pub mod notice;

use rand::Rng;

use crate::models::{Grid, Pointer};
use crate::vocabulary::Vocabulary;
use notice::{
    Notice, NoticeBoard, NoticeKind, RETRY_FEEDBACK_TTL, SCORE_POPUP_TTL, SKIP_FEEDBACK_TTL,
};

/// Maximum words per row before growth spills into the next row
pub const ROW_CAPACITY: usize = 5;
/// Words in the single starting row
pub const INITIAL_ROW_WORDS: usize = 5;
/// Total word count that ends the round
pub const WORD_LIMIT: usize = 50;
/// Skips available per round, never replenished mid-round
pub const INITIAL_SKIPS: u8 = 2;
/// Bonus points per unused skip at game over
pub const SKIP_BONUS_POINTS: u32 = 50;

/// Result of one growth tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Round already over, nothing changed
    Ignored,
    /// A word was placed and the round continues
    Placed,
    /// The placement hit the word limit; bonus applied, round over
    RoundOver { final_score: u32 },
}

/// Target captured when a submission is sent to the judge. The grid
/// may change while the judge call is in flight, so the ticket is
/// re-validated against the grid before the verdict is applied.
#[derive(Debug, Clone)]
pub struct SubmissionTicket {
    round: u64,
    pointer: Pointer,
    target: String,
    input: String,
}

impl SubmissionTicket {
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn input(&self) -> &str {
        &self.input
    }
}

/// Result of applying a judge verdict
#[derive(Debug)]
pub enum SubmitOutcome {
    /// Match: target removed, points awarded, popup notice raised
    Scored { awarded: u32, notice: Notice },
    /// No match: "try again" feedback raised, state untouched
    Rejected { notice: Notice },
    /// The grid changed under the submission (or the round ended or
    /// restarted); the verdict is discarded without effect
    Stale,
}

/// The whole game state machine. Owns grid, pointer, score, skip
/// counter and the game-over flag; all transitions are synchronous
/// methods, the async judge gap is bridged by [`SubmissionTicket`].
pub struct GameEngine {
    grid: Grid,
    pointer: Option<Pointer>,
    score: u32,
    skips_left: u8,
    game_over: bool,
    bonus_applied: bool,
    /// Bumped on every restart so in-flight tickets from a previous
    /// round can never apply to the fresh grid
    round: u64,
    notices: NoticeBoard,
}

impl GameEngine {
    /// Fresh round: one row of drawn words, pointer on a random cell
    pub fn new(vocabulary: &Vocabulary, rng: &mut impl Rng) -> Self {
        let grid: Grid = vec![(0..INITIAL_ROW_WORDS).map(|_| vocabulary.draw(rng)).collect()];
        let pointer = select_pointer(&grid, rng);

        Self {
            grid,
            pointer,
            score: 0,
            skips_left: INITIAL_SKIPS,
            game_over: false,
            bonus_applied: false,
            round: 0,
            notices: NoticeBoard::default(),
        }
    }

    /// Discard the current round and start over. Always succeeds.
    pub fn restart(&mut self, vocabulary: &Vocabulary, rng: &mut impl Rng) {
        self.grid = vec![(0..INITIAL_ROW_WORDS).map(|_| vocabulary.draw(rng)).collect()];
        self.pointer = select_pointer(&self.grid, rng);
        self.score = 0;
        self.skips_left = INITIAL_SKIPS;
        self.game_over = false;
        self.bonus_applied = false;
        self.round += 1;
        self.notices.reset();
    }

    /// Periodic growth: append a drawn word to the first row with
    /// room, or open a new trailing row. Ends the round when the word
    /// limit is reached.
    pub fn tick(&mut self, vocabulary: &Vocabulary, rng: &mut impl Rng) -> TickOutcome {
        if self.game_over {
            return TickOutcome::Ignored;
        }

        let word = vocabulary.draw(rng);
        match self.grid.iter_mut().find(|row| row.len() < ROW_CAPACITY) {
            Some(row) => row.push(word),
            None => self.grid.push(vec![word]),
        }

        // A tick never moves the pointer, but if the grid had emptied
        // out entirely it must land on the word just placed
        if self.pointer.is_none() {
            self.pointer = select_pointer(&self.grid, rng);
        }

        if self.word_count() >= WORD_LIMIT {
            self.game_over = true;
            self.apply_round_bonus();
            return TickOutcome::RoundOver {
                final_score: self.score,
            };
        }

        TickOutcome::Placed
    }

    /// Remove the pointed word and spend a skip. No-op without skips
    /// left, after game over, or on an empty grid.
    pub fn skip(&mut self, rng: &mut impl Rng) -> Option<Notice> {
        if self.game_over || self.skips_left == 0 {
            return None;
        }
        let pointer = self.pointer?;

        self.remove_word(pointer);
        self.skips_left -= 1;
        self.pointer = select_pointer(&self.grid, rng);

        Some(self.notices.set(
            NoticeKind::Feedback,
            "Skipped!".to_string(),
            SKIP_FEEDBACK_TTL,
        ))
    }

    /// Validate a submission and capture its target. Returns None for
    /// invalid submissions (round over, blank input, no target), which
    /// are silently ignored.
    pub fn begin_submit(&self, input: &str) -> Option<SubmissionTicket> {
        if self.game_over {
            return None;
        }
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        let pointer = self.pointer?;
        let target = self.grid.get(pointer.row)?.get(pointer.col)?.clone();

        Some(SubmissionTicket {
            round: self.round,
            pointer,
            target,
            input: input.to_string(),
        })
    }

    /// Apply the judge's verdict for a captured submission. The ticket
    /// must still describe the live target exactly (same round, same
    /// pointer, same word at that cell); otherwise the verdict is
    /// stale and dropped.
    pub fn resolve_submission(
        &mut self,
        ticket: SubmissionTicket,
        matched: bool,
        similarity: f64,
        rng: &mut impl Rng,
    ) -> SubmitOutcome {
        if self.game_over || ticket.round != self.round || self.pointer != Some(ticket.pointer) {
            return SubmitOutcome::Stale;
        }
        let current = self
            .grid
            .get(ticket.pointer.row)
            .and_then(|row| row.get(ticket.pointer.col));
        if current != Some(&ticket.target) {
            return SubmitOutcome::Stale;
        }

        if !matched {
            let notice = self.notices.set(
                NoticeKind::Feedback,
                "Try again!".to_string(),
                RETRY_FEEDBACK_TTL,
            );
            return SubmitOutcome::Rejected { notice };
        }

        self.remove_word(ticket.pointer);
        self.pointer = select_pointer(&self.grid, rng);

        let awarded = (similarity.max(0.0) * 100.0).round() as u32;
        self.score += awarded;

        let notice = self.notices.set(
            NoticeKind::ScorePopup,
            format!("+{}", awarded),
            SCORE_POPUP_TTL,
        );
        SubmitOutcome::Scored { awarded, notice }
    }

    fn remove_word(&mut self, at: Pointer) {
        self.grid[at.row].remove(at.col);
        self.grid.retain(|row| !row.is_empty());
    }

    /// Add skips_left * 50 to the score, exactly once per round
    fn apply_round_bonus(&mut self) {
        if self.bonus_applied {
            return;
        }
        self.score += u32::from(self.skips_left) * SKIP_BONUS_POINTS;
        self.bonus_applied = true;
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn pointer(&self) -> Option<Pointer> {
        self.pointer
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn skips_left(&self) -> u8 {
        self.skips_left
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn word_count(&self) -> usize {
        self.grid.iter().map(|row| row.len()).sum()
    }

    pub fn notices_mut(&mut self) -> &mut NoticeBoard {
        &mut self.notices
    }
}

/// Pick the target: one row uniformly among non-empty rows, then one
/// column uniformly within that row, resolved back to the row's true
/// grid index. Deliberately row-uniform rather than word-uniform; a
/// short row is as likely to be chosen as a full one, and that bias is
/// an observable property of the game.
fn select_pointer(grid: &Grid, rng: &mut impl Rng) -> Option<Pointer> {
    let non_empty: Vec<usize> = grid
        .iter()
        .enumerate()
        .filter(|(_, row)| !row.is_empty())
        .map(|(index, _)| index)
        .collect();
    if non_empty.is_empty() {
        return None;
    }

    let row = non_empty[rng.random_range(0..non_empty.len())];
    let col = rng.random_range(0..grid[row].len());
    Some(Pointer { row, col })
}
