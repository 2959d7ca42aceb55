//! Per-move perft breakdown for move generation debugging.
//!
//! Usage: `perft_divide <depth> [fen]`

use basalt::board::Position;

fn main() {
    let mut args = std::env::args().skip(1);
    let depth: usize = args
        .next()
        .and_then(|d| d.parse().ok())
        .unwrap_or(4);
    let fen = args.collect::<Vec<_>>().join(" ");

    let mut position = if fen.is_empty() {
        Position::new()
    } else {
        match Position::from_fen(&fen) {
            Ok(position) => position,
            Err(e) => {
                eprintln!("invalid fen: {e}");
                std::process::exit(1);
            }
        }
    };

    let start = std::time::Instant::now();
    let mut total = 0u64;
    for &mv in &position.legal_moves() {
        position.make_move(mv);
        let nodes = position.perft(depth - 1);
        position.unmake_move(mv);
        total += nodes;
        println!("{mv}: {nodes}");
    }
    let elapsed = start.elapsed();
    println!();
    println!("total {total} nodes in {elapsed:?}");
}
