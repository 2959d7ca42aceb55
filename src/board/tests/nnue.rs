//! NNUE accumulator round-trip tests against a synthetic network.

use std::sync::Arc;

use rand::prelude::*;

use crate::board::{Color, Position};
use crate::nnue::network::encode_network;
use crate::nnue::NnueNetwork;

/// Four-bucket left-half king map: quadrants of the collapsed half board.
fn bucket_table() -> [u8; 64] {
    let mut table = [0u8; 64];
    for (sq, slot) in table.iter_mut().enumerate() {
        let rank = sq / 8;
        let file = sq % 8;
        *slot = (u8::from(rank >= 4) << 1) | u8::from(file >= 2);
    }
    table
}

fn test_network(seed: u64) -> Arc<NnueNetwork> {
    let bytes = encode_network(4, 8, &bucket_table(), seed);
    Arc::new(NnueNetwork::from_bytes(&bytes).unwrap())
}

/// Evaluate `pos` from scratch on a fresh clone, bypassing every
/// incremental update.
fn full_refresh_eval(pos: &Position, net: &Arc<NnueNetwork>) -> i32 {
    let mut fresh = Position::from_fen(&pos.to_fen()).unwrap();
    fresh.set_network(Some(Arc::clone(net)));
    fresh.evaluate()
}

#[test]
fn test_incremental_matches_refresh_over_random_game() {
    let net = test_network(11);
    let mut pos = Position::new();
    pos.set_network(Some(Arc::clone(&net)));

    let mut rng = StdRng::seed_from_u64(0xACC);
    for _ in 0..120 {
        let moves = pos.legal_moves();
        if moves.is_empty() {
            break;
        }
        let mv = moves[rng.gen_range(0..moves.len())];
        pos.make_move(mv);

        let incremental = pos.evaluate();
        let refreshed = full_refresh_eval(&pos, &net);
        assert_eq!(
            incremental, refreshed,
            "incremental eval diverged after {mv} at ply {}",
            pos.game_ply()
        );
    }
}

#[test]
fn test_unmake_restores_accumulator_exactly() {
    let net = test_network(13);
    let mut pos = Position::new();
    pos.set_network(Some(Arc::clone(&net)));
    let baseline = pos.evaluate();

    let mut rng = StdRng::seed_from_u64(0xDEC0DE);
    let mut history = Vec::new();
    for _ in 0..40 {
        let moves = pos.legal_moves();
        if moves.is_empty() {
            break;
        }
        let mv = moves[rng.gen_range(0..moves.len())];
        pos.make_move(mv);
        history.push(mv);
        pos.evaluate();
    }
    while let Some(mv) = history.pop() {
        pos.unmake_move(mv);
    }
    assert_eq!(pos.evaluate(), baseline);
}

#[test]
fn test_king_bucket_crossing_refreshes_to_identical_score() {
    let net = test_network(17);
    // Both kings walk along their back ranks, crossing the mirror
    // boundary (e/d files) and a bucket boundary of the quadrant table
    // (c/b files)
    let mut pos =
        Position::from_fen("4k3/pppppppp/8/8/8/8/PPPPPPPP/4K3 w - - 0 1").unwrap();
    pos.set_network(Some(Arc::clone(&net)));
    pos.evaluate();

    for uci in ["e1d1", "e8d8", "d1c1", "d8c8", "c1b1", "c8b8", "b1a1", "b8a8"] {
        let mv = pos.parse_move(uci).unwrap();
        pos.make_move(mv);
        let incremental = pos.evaluate();
        let refreshed = full_refresh_eval(&pos, &net);
        assert_eq!(incremental, refreshed, "diverged after king walk move {uci}");
    }
}

#[test]
fn test_castling_updates_both_feature_sets() {
    let net = test_network(19);
    let mut pos = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
    pos.set_network(Some(Arc::clone(&net)));
    pos.evaluate();

    for uci in ["e1g1", "e8c8"] {
        let mv = pos.parse_move(uci).unwrap();
        pos.make_move(mv);
        assert_eq!(pos.evaluate(), full_refresh_eval(&pos, &net));
    }
}

#[test]
fn test_en_passant_and_promotion_deltas() {
    let net = test_network(23);
    let mut pos =
        Position::from_fen("rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3")
            .unwrap();
    pos.set_network(Some(Arc::clone(&net)));
    pos.evaluate();

    let ep = pos.parse_move("e5f6").unwrap();
    pos.make_move(ep);
    assert_eq!(pos.evaluate(), full_refresh_eval(&pos, &net));

    let mut promo_pos = Position::from_fen("8/P4k2/8/8/8/8/8/K7 w - - 0 1").unwrap();
    promo_pos.set_network(Some(Arc::clone(&net)));
    promo_pos.evaluate();
    let promo = promo_pos.parse_move("a7a8q").unwrap();
    promo_pos.make_move(promo);
    assert_eq!(promo_pos.evaluate(), full_refresh_eval(&promo_pos, &net));
}

#[test]
fn test_material_fallback_without_network() {
    let mut pos = Position::from_fen("7k/8/6K1/8/8/8/8/8 w - - 0 1").unwrap();
    assert_eq!(pos.evaluate(), 0);

    let mut pos = Position::from_fen("7k/8/6K1/8/8/8/8/6R1 w - - 0 1").unwrap();
    assert_eq!(pos.evaluate(), crate::board::Piece::Rook.value());
    // From black's side the same material reads negative
    let mut flipped = Position::from_fen("7k/8/6K1/8/8/8/8/6R1 b - - 0 1");
    if let Ok(ref mut pos) = flipped {
        assert_eq!(pos.evaluate(), -crate::board::Piece::Rook.value());
    }
}

#[test]
fn test_perspective_symmetry_of_fallback() {
    // A mirrored position evaluates identically for the side to move
    let mut white_view =
        Position::from_fen("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1").unwrap();
    let mut black_view =
        Position::from_fen("4k3/4p3/8/8/8/8/8/4K3 b - - 0 1").unwrap();
    assert_eq!(white_view.evaluate(), black_view.evaluate());
    assert_eq!(white_view.side_to_move(), Color::White);
    assert_eq!(black_view.side_to_move(), Color::Black);
}
