//! Make/unmake round-trip tests.

use crate::board::{Move, Piece, Position, Square};
use rand::prelude::*;

fn find_move(board: &Position, from: Square, to: Square, promotion: Option<Piece>) -> Move {
    for &m in &board.legal_moves() {
        if m.from() == from && m.to() == to && m.promotion_piece() == promotion {
            return m;
        }
    }
    panic!("expected move {from}{to} not found");
}

#[test]
fn test_en_passant_make_unmake() {
    let mut board =
        Position::from_fen("rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3")
            .unwrap();
    let original_hash = board.hash();
    let original_ep = board.en_passant_square();
    let mv = find_move(&board, Square::new(4, 4), Square::new(5, 5), None);
    assert!(mv.is_en_passant());

    board.make_move(mv);
    assert_eq!(board.piece_on(Square::new(4, 5)), None, "captured pawn gone");
    board.unmake_move(mv);

    assert_eq!(board.hash(), original_hash);
    assert_eq!(board.en_passant_square(), original_ep);
    assert_eq!(board.piece_on(Square::new(4, 5)), Some(Piece::Pawn));
}

#[test]
fn test_promotion_make_unmake() {
    let mut board = Position::from_fen("8/P7/8/8/8/8/8/K1k5 w - - 0 1").unwrap();
    let original_hash = board.hash();
    let mv = find_move(
        &board,
        Square::new(6, 0),
        Square::new(7, 0),
        Some(Piece::Queen),
    );
    board.make_move(mv);
    assert_eq!(board.piece_on(Square::new(7, 0)), Some(Piece::Queen));
    board.unmake_move(mv);
    assert_eq!(board.hash(), original_hash);
    assert_eq!(board.piece_on(Square::new(6, 0)), Some(Piece::Pawn));
}

#[test]
fn test_castle_make_unmake() {
    let mut board = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
    let original_fen = board.to_fen();
    let original_hash = board.hash();

    let mv = find_move(&board, Square::E1, Square::H1, None);
    assert!(mv.is_castle());
    board.make_move(mv);
    assert_eq!(board.piece_on(Square::new(0, 6)), Some(Piece::King));
    assert_eq!(board.piece_on(Square::new(0, 5)), Some(Piece::Rook));
    assert!(!board.castling_rights().has_any(crate::board::Color::White));

    board.unmake_move(mv);
    assert_eq!(board.to_fen(), original_fen);
    assert_eq!(board.hash(), original_hash);
}

#[test]
fn test_null_move_make_unmake_restores_hash_and_ep() {
    let mut board =
        Position::from_fen("rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3")
            .unwrap();
    let original_hash = board.hash();
    let original_ep = board.en_passant_square();
    let original_side = board.side_to_move();

    board.make_null_move();
    assert_eq!(board.en_passant_square(), None);
    assert_ne!(board.hash(), original_hash);
    assert_ne!(board.side_to_move(), original_side);

    board.unmake_null_move();
    assert_eq!(board.hash(), original_hash);
    assert_eq!(board.en_passant_square(), original_ep);
    assert_eq!(board.side_to_move(), original_side);
}

#[test]
fn test_capturing_rook_clears_castling_right() {
    let mut board = Position::from_fen("r3k2r/8/8/8/8/8/6b1/R3K2R b KQkq - 0 1").unwrap();
    let mv = find_move(&board, Square::new(1, 6), Square::new(0, 7), None);
    board.make_move(mv);
    assert!(!board
        .castling_rights()
        .has(crate::board::Color::White, crate::board::CastlingSide::King));
    assert_eq!(board.hash(), board.compute_hash());
}

#[test]
fn test_ep_square_only_set_when_capturable() {
    // A double push with no enemy pawn adjacent leaves no EP square
    let mut board = Position::new();
    let mv = find_move(&board, Square::new(1, 4), Square::new(3, 4), None);
    board.make_move(mv);
    assert_eq!(board.en_passant_square(), None);

    // With a black pawn on d4, e2e4 is capturable en passant
    let mut board =
        Position::from_fen("rnbqkbnr/ppp1pppp/8/8/3p4/8/PPPPPPPP/RNBQKBNR w KQkq - 0 3").unwrap();
    let mv = find_move(&board, Square::new(1, 4), Square::new(3, 4), None);
    board.make_move(mv);
    assert_eq!(board.en_passant_square(), Some(Square::new(2, 4)));
}

#[test]
fn test_legal_moves_stable_after_make_unmake() {
    let mut board = Position::new();
    let initial_moves = board.legal_moves();
    let mut initial_list: Vec<String> = initial_moves.iter().map(|m| m.to_string()).collect();
    initial_list.sort();

    for &mv in &initial_moves {
        board.make_move(mv);
        board.unmake_move(mv);
    }

    let after_moves = board.legal_moves();
    let mut after_list: Vec<String> = after_moves.iter().map(|m| m.to_string()).collect();
    after_list.sort();

    assert_eq!(initial_list, after_list);
}

#[test]
fn test_hash_matches_recompute_after_random_moves() {
    let mut board = Position::new();
    let mut rng = StdRng::seed_from_u64(0xC0FFEE);
    let mut history: Vec<Move> = Vec::new();

    for _ in 0..60 {
        let moves = board.legal_moves();
        if moves.is_empty() {
            break;
        }
        let mv = moves[rng.gen_range(0..moves.len())];
        board.make_move(mv);
        history.push(mv);
        assert_eq!(board.hash(), board.compute_hash());
    }

    while let Some(mv) = history.pop() {
        board.unmake_move(mv);
        assert_eq!(board.hash(), board.compute_hash());
    }
}

#[test]
fn test_random_playout_round_trip_state() {
    let mut board = Position::new();
    let initial_fen = board.to_fen();
    let initial_hash = board.hash();
    let initial_material = board.material_balance();

    let mut rng = StdRng::seed_from_u64(0x5EED);
    let mut history: Vec<Move> = Vec::new();

    for _ in 0..200 {
        let moves = board.legal_moves();
        if moves.is_empty() {
            break;
        }
        let mv = moves[rng.gen_range(0..moves.len())];
        board.make_move(mv);
        history.push(mv);
    }

    while let Some(mv) = history.pop() {
        board.unmake_move(mv);
    }

    assert_eq!(board.to_fen(), initial_fen);
    assert_eq!(board.hash(), initial_hash);
    assert_eq!(board.material_balance(), initial_material);
    assert_eq!(board.game_ply(), 0);
}

#[test]
fn test_side_not_to_move_never_in_check() {
    let mut board = Position::new();
    let mut rng = StdRng::seed_from_u64(0xFACADE);

    for _ in 0..100 {
        let moves = board.legal_moves();
        if moves.is_empty() {
            break;
        }
        let mover = board.side_to_move();
        let mv = moves[rng.gen_range(0..moves.len())];
        board.make_move(mv);
        // The side that just moved may not be left in check
        let king = board.king_square(mover);
        assert!(
            !board.attacked_by(king, board.side_to_move(), board.occupied()),
            "move {mv} left its own king attacked"
        );
    }
}
