//! Board rules: move validation, win and draw detection
//!
//! All functions operate on a [`GameState`] in place and enforce the status
//! ordering ReadyToStart -> InProgress -> Finished.

use crate::error::HubError;
use crate::types::{Board, Cell, GameResult, GameState, GameStatus, BOARD_SIZE};

const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// The mark holding a full line, if any
pub fn winner(board: &Board) -> Option<Cell> {
    LINES.iter().find_map(|&[a, b, c]| {
        let cell = board[a];
        (cell.is_mark() && cell == board[b] && cell == board[c]).then_some(cell)
    })
}

pub fn is_full(board: &Board) -> bool {
    board.iter().all(|cell| cell.is_mark())
}

/// Move a ready session into play. No effect once started.
pub fn start(state: &mut GameState) {
    if state.status == GameStatus::ReadyToStart {
        state.status = GameStatus::InProgress;
    }
}

/// Place `mark` at `position` and advance the turn.
///
/// Returns the game result when this move ends the game.
pub fn apply_move(
    state: &mut GameState,
    mark: Cell,
    position: u8,
) -> Result<Option<GameResult>, HubError> {
    if state.is_finished() {
        return Err(invalid("game is already finished"));
    }
    if !mark.is_mark() {
        return Err(invalid("an empty cell is not a mark"));
    }
    if mark != state.current_move {
        return Err(invalid(format!("it is not {}'s turn", mark)));
    }
    let index = position as usize;
    if index >= BOARD_SIZE {
        return Err(invalid(format!("position {} is off the board", position)));
    }
    if state.board[index].is_mark() {
        return Err(invalid(format!("cell {} is already taken", position + 1)));
    }

    start(state);
    state.board[index] = mark;
    state.current_move = mark.opponent();

    let result = match winner(&state.board) {
        Some(mark) => GameResult::win_for(mark),
        None if is_full(&state.board) => Some(GameResult::Draw),
        None => None,
    };

    if let Some(result) = result {
        state.status = GameStatus::Finished;
        state.result = Some(result);
    }

    Ok(result)
}

/// End an unfinished game because a player left
pub fn finish_by_walkover(state: &mut GameState) -> bool {
    if state.is_finished() {
        return false;
    }
    state.status = GameStatus::Finished;
    state.result = Some(GameResult::Walkover);
    true
}

fn invalid(reason: impl Into<String>) -> HubError {
    HubError::InvalidMove {
        reason: reason.into(),
    }
}
