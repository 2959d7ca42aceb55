//! Legality edge cases: pins, en passant discoveries, castling paths,
//! double check.

use crate::board::{GenType, MoveList, Position};

fn has_move(board: &Position, uci: &str) -> bool {
    board.parse_move(uci).is_ok()
}

#[test]
fn test_en_passant_discovered_check_is_illegal() {
    // Capturing en passant would expose the white king to the rook on h5
    let board =
        Position::from_fen("8/8/8/K2pP2r/8/8/8/4k3 w - d6 0 2").unwrap();
    assert!(!has_move(&board, "e5d6"));
}

#[test]
fn test_en_passant_resolves_check_by_capturing_checker() {
    // The double-pushed pawn gives check; taking it en passant is legal
    let board = Position::from_fen("8/8/8/2k5/3Pp3/8/8/4K3 b - d3 0 1").unwrap();
    assert!(has_move(&board, "e4d3"));
}

#[test]
fn test_pinned_piece_may_only_slide_on_pin_line() {
    // The bishop on d2 is pinned by the rook on d8 against the king on d1
    let board = Position::from_fen("3r2k1/8/8/8/8/8/3B4/3K4 w - - 0 1").unwrap();
    assert!(!has_move(&board, "d2e3"));
    assert!(!has_move(&board, "d2c3"));
}

#[test]
fn test_pinned_rook_moves_along_pin_ray() {
    // A rook pinned on a file still slides along that file
    let board = Position::from_fen("3r2k1/8/8/8/8/8/3R4/3K4 w - - 0 1").unwrap();
    assert!(has_move(&board, "d2d5"));
    assert!(has_move(&board, "d2d8"));
    assert!(!has_move(&board, "d2e2"));
}

#[test]
fn test_castling_through_attacked_square_rejected() {
    // Black rook on f8 covers f1: kingside castling is illegal,
    // queenside stays available
    let board = Position::from_fen("5rk1/8/8/8/8/8/8/R3K2R w KQ - 0 1").unwrap();
    assert!(!has_move(&board, "e1g1"));
    assert!(has_move(&board, "e1c1"));
}

#[test]
fn test_castling_out_of_check_rejected() {
    let board = Position::from_fen("4r1k1/8/8/8/8/8/8/R3K2R w KQ - 0 1").unwrap();
    assert!(board.in_check());
    assert!(!has_move(&board, "e1g1"));
    assert!(!has_move(&board, "e1c1"));
}

#[test]
fn test_castling_blocked_path_not_generated() {
    let board = Position::from_fen("4k3/8/8/8/8/8/8/R2QK2R w KQ - 0 1").unwrap();
    // Queenside path is blocked by the queen on d1
    assert!(!has_move(&board, "e1c1"));
    assert!(has_move(&board, "e1g1"));
}

#[test]
fn test_double_check_only_king_moves() {
    // Knight on d4 and rook on e8 both give check
    let board = Position::from_fen("4r1k1/8/8/8/3n4/8/4K3/8 w - - 0 1").unwrap();
    assert!(board.checkers().more_than_one());
    let moves = board.legal_moves();
    assert!(!moves.is_empty());
    for &mv in &moves {
        assert_eq!(board.piece_on(mv.from()), Some(crate::board::Piece::King));
    }
}

#[test]
fn test_king_cannot_retreat_along_check_ray() {
    // Sliding straight back stays on the rook's ray: the attacker sees
    // through the departing king
    let board = Position::from_fen("4r3/8/8/8/4K3/8/8/6k1 w - - 0 1").unwrap();
    assert!(board.in_check());
    assert!(!has_move(&board, "e4e3"));
    assert!(!has_move(&board, "e4e5"));
    assert!(has_move(&board, "e4d3"));
}

#[test]
fn test_stalemate_has_no_legal_moves() {
    // Classic queen stalemate
    let board = Position::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
    assert!(!board.in_check());
    assert!(board.legal_moves().is_empty());
}

#[test]
fn test_checkmate_has_no_legal_moves() {
    // Back-rank mate
    let board = Position::from_fen("R5k1/5ppp/8/8/8/8/8/4K3 b - - 0 1").unwrap();
    assert!(board.in_check());
    assert!(board.legal_moves().is_empty());
}

#[test]
fn test_generation_stages_partition_moves() {
    // Loud + Quiets together cover exactly the NonEvasions set
    let board =
        Position::from_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1")
            .unwrap();
    assert!(!board.in_check());

    let mut all = MoveList::new();
    board.generate(GenType::NonEvasions, &mut all);
    let mut staged = MoveList::new();
    board.generate(GenType::Loud, &mut staged);
    board.generate(GenType::Quiets, &mut staged);

    let mut all_set: Vec<u16> = all.iter().map(|m| m.as_u16()).collect();
    let mut staged_set: Vec<u16> = staged.iter().map(|m| m.as_u16()).collect();
    all_set.sort_unstable();
    staged_set.sort_unstable();
    assert_eq!(all_set, staged_set);
}

#[test]
fn test_quiet_checks_all_give_check() {
    let board =
        Position::from_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1")
            .unwrap();
    let mut checks = MoveList::new();
    board.generate(GenType::QuietChecks, &mut checks);

    let mut probe = board.clone();
    for &mv in &checks {
        if !probe.is_legal(mv) {
            continue;
        }
        probe.make_move(mv);
        assert!(probe.in_check(), "{mv} generated as a quiet check but gives none");
        probe.unmake_move(mv);
    }
}

#[test]
fn test_evasions_resolve_check() {
    let board = Position::from_fen("4r1k1/8/8/8/8/8/3P4/4K3 w - - 0 1").unwrap();
    assert!(board.in_check());
    let mut probe = board.clone();
    for &mv in &board.legal_moves() {
        let mover = probe.side_to_move();
        probe.make_move(mv);
        let king = probe.king_square(mover);
        assert!(!probe.attacked_by(king, probe.side_to_move(), probe.occupied()));
        probe.unmake_move(mv);
    }
}
