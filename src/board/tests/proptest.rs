//! Property-based tests using proptest.

use crate::board::{Move, Position};
use crate::tt::{Bound, TranspositionTable};
use proptest::prelude::*;

fn seed_strategy() -> impl Strategy<Value = u64> {
    any::<u64>()
}

fn move_count_strategy() -> impl Strategy<Value = usize> {
    1..=24usize
}

proptest! {
    /// make_move followed by unmake_move restores the position exactly
    #[test]
    fn prop_make_unmake_restores_state(seed in seed_strategy(), num_moves in move_count_strategy()) {
        use rand::prelude::*;

        let mut board = Position::new();
        let mut rng = StdRng::seed_from_u64(seed);

        let initial_hash = board.hash();
        let initial_fen = board.to_fen();

        let mut history: Vec<Move> = Vec::new();
        for _ in 0..num_moves {
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

        prop_assert_eq!(board.hash(), initial_hash);
        prop_assert_eq!(board.to_fen(), initial_fen);
    }

    /// The incrementally maintained hash always equals the recomputed one
    #[test]
    fn prop_hash_consistency(seed in seed_strategy(), num_moves in move_count_strategy()) {
        use rand::prelude::*;

        let mut board = Position::new();
        let mut rng = StdRng::seed_from_u64(seed);

        for _ in 0..num_moves {
            let moves = board.legal_moves();
            if moves.is_empty() {
                break;
            }
            let mv = moves[rng.gen_range(0..moves.len())];
            board.make_move(mv);
            prop_assert_eq!(board.hash(), board.compute_hash());
        }
    }

    /// FEN round-trip preserves the position
    #[test]
    fn prop_fen_roundtrip(seed in seed_strategy(), num_moves in move_count_strategy()) {
        use rand::prelude::*;

        let mut board = Position::new();
        let mut rng = StdRng::seed_from_u64(seed);

        for _ in 0..num_moves {
            let moves = board.legal_moves();
            if moves.is_empty() {
                break;
            }
            let mv = moves[rng.gen_range(0..moves.len())];
            board.make_move(mv);
        }

        let fen = board.to_fen();
        let restored = Position::from_fen(&fen).unwrap();
        prop_assert_eq!(board.hash(), restored.hash());
        prop_assert_eq!(board.side_to_move(), restored.side_to_move());
        prop_assert_eq!(board.castling_rights(), restored.castling_rights());
        prop_assert_eq!(board.en_passant_square(), restored.en_passant_square());
    }

    /// Legal moves never leave the mover's king attacked
    #[test]
    fn prop_legal_moves_are_legal(seed in seed_strategy()) {
        use rand::prelude::*;

        let mut board = Position::new();
        let mut rng = StdRng::seed_from_u64(seed);

        for _ in 0..10 {
            let moves = board.legal_moves();
            if moves.is_empty() {
                break;
            }

            let mover = board.side_to_move();
            for &mv in &moves {
                board.make_move(mv);
                let king = board.king_square(mover);
                prop_assert!(!board.attacked_by(king, board.side_to_move(), board.occupied()),
                    "legal move left king in check: {:?}", mv);
                board.unmake_move(mv);
            }

            let mv = moves[rng.gen_range(0..moves.len())];
            board.make_move(mv);
        }
    }

    /// SEE never credits more than the victim on the target square
    #[test]
    fn prop_see_bounded_by_victim(seed in seed_strategy(), num_moves in 0..16usize) {
        use rand::prelude::*;

        let mut board = Position::new();
        let mut rng = StdRng::seed_from_u64(seed);

        for _ in 0..num_moves {
            let moves = board.legal_moves();
            if moves.is_empty() {
                break;
            }
            let mv = moves[rng.gen_range(0..moves.len())];
            board.make_move(mv);
        }

        for &mv in &board.legal_moves() {
            if let Some(victim) = board.piece_on(mv.to()) {
                prop_assert!(board.see(mv) <= victim.value(),
                    "SEE exceeds victim value for {:?}", mv);
            }
        }
    }

    /// A stored entry is found again with the written payload
    #[test]
    fn prop_tt_store_retrieve(
        hash in any::<u64>(),
        depth in 0..128u32,
        score in -20000..20000i32
    ) {
        let tt = TranspositionTable::new(1);
        let probe = tt.probe(hash, 0);
        tt.store(&probe, hash, Move::NONE, score, 0, depth, Bound::Exact, false, 0);

        let probe = tt.probe(hash, 0);
        prop_assert!(probe.hit);
        prop_assert_eq!(probe.depth, depth.min(255));
        prop_assert_eq!(probe.score, score);
        prop_assert_eq!(probe.bound, Bound::Exact);
    }
}
