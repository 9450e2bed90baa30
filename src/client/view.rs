//! Rendering and input for the playing client

use crate::error::Result;
use crate::types::{Board, Cell, GameResult};
use async_trait::async_trait;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

/// What the client shows to, and reads from, the person playing
#[async_trait]
pub trait ClientView: Send {
    /// Render the board after it changed
    fn show_board(&mut self, board: &Board, mark: Cell);

    /// Announce how the game ended
    fn show_result(&mut self, result: GameResult);

    /// Report input that was not a cell number
    fn show_invalid_input(&mut self, input: &str);

    /// Prompt for and read one line, `None` once input is exhausted
    async fn read_move(&mut self) -> Result<Option<String>>;
}

/// Lay the board out as three rows of `X | O |  ` separated by rules
pub fn render_board(board: &Board) -> String {
    let rows: Vec<String> = board
        .chunks(3)
        .map(|row| {
            row.iter()
                .map(|cell| cell.symbol().to_string())
                .collect::<Vec<_>>()
                .join(" | ")
        })
        .collect();
    rows.join("\n——|———|——\n")
}

/// Interactive view on stdin/stdout
pub struct TerminalView {
    lines: Lines<BufReader<Stdin>>,
}

impl TerminalView {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for TerminalView {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClientView for TerminalView {
    fn show_board(&mut self, board: &Board, mark: Cell) {
        // Clear the screen and redraw from the top left corner
        print!("\x1b[H\x1b[J");
        println!("{}", render_board(board));
        println!("You play {}", mark);
    }

    fn show_result(&mut self, result: GameResult) {
        println!("{}", result);
    }

    fn show_invalid_input(&mut self, input: &str) {
        println!("'{}' is not a cell, pick 1-9", input.trim());
    }

    async fn read_move(&mut self) -> Result<Option<String>> {
        print!("Your move: ");
        std::io::stdout().flush()?;
        Ok(self.lines.next_line().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BOARD_SIZE;

    #[test]
    fn test_render_board() {
        let mut board = [Cell::Empty; BOARD_SIZE];
        board[0] = Cell::X;
        board[4] = Cell::O;
        board[8] = Cell::X;

        assert_eq!(
            render_board(&board),
            "X |   |  \n——|———|——\n  | O |  \n——|———|——\n  |   | X"
        );
    }
}
