//! Utility functions for the hub and the client

use crate::types::{ClientId, SessionId, BOARD_SIZE};
use uuid::Uuid;

/// Generate a new unique session ID
pub fn generate_session_id() -> SessionId {
    Uuid::new_v4().to_string()
}

/// Generate a new unique client ID
pub fn generate_client_id() -> ClientId {
    Uuid::new_v4().to_string()
}

/// Parse a human cell selection ("1".."9") into a zero-based board position
pub fn parse_cell_selection(input: &str) -> Option<u8> {
    let selection: usize = input.trim().parse().ok()?;
    if (1..=BOARD_SIZE).contains(&selection) {
        Some((selection - 1) as u8)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_unique_ids() {
        let id1 = generate_session_id();
        let id2 = generate_session_id();
        assert_ne!(id1, id2);

        let client1 = generate_client_id();
        let client2 = generate_client_id();
        assert_ne!(client1, client2);
    }

    #[test]
    fn test_parse_cell_selection() {
        assert_eq!(parse_cell_selection("1"), Some(0));
        assert_eq!(parse_cell_selection("5"), Some(4));
        assert_eq!(parse_cell_selection(" 9\n"), Some(8));
    }

    #[test]
    fn test_parse_cell_selection_rejects_out_of_range() {
        assert_eq!(parse_cell_selection("0"), None);
        assert_eq!(parse_cell_selection("10"), None);
        assert_eq!(parse_cell_selection("-3"), None);
        assert_eq!(parse_cell_selection("abc"), None);
        assert_eq!(parse_cell_selection(""), None);
    }
}
