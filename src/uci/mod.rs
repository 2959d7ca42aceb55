//! Universal Chess Interface front end.
//!
//! A line loop over stdin: commands mutate a single engine state, `go`
//! hands a position clone to a background search thread, and `stop` joins
//! it. Everything GUI-driven that fails to parse is reported with an
//! `info string` line and changes nothing.

pub mod command;
pub mod options;

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::board::Position;
use crate::nnue::NnueNetwork;
use crate::search::{self, InfoCallback, SearchInfo, SearchLimits, SearchSettings};
use crate::tt::TranspositionTable;

use command::UciCommand;
use options::{OptionAction, UciOptions};

struct Engine {
    position: Position,
    tt: Arc<TranspositionTable>,
    stop: Arc<AtomicBool>,
    options: UciOptions,
    network: Option<Arc<NnueNetwork>>,
    search_thread: Option<JoinHandle<()>>,
}

impl Engine {
    fn new() -> Self {
        let options = UciOptions::default();
        Engine {
            position: Position::new(),
            tt: Arc::new(TranspositionTable::new(options.hash_mb)),
            stop: Arc::new(AtomicBool::new(false)),
            options,
            network: None,
            search_thread: None,
        }
    }

    /// Raise the stop flag and wait for a running search to emit its
    /// bestmove and exit.
    fn halt_search(&mut self) {
        if let Some(handle) = self.search_thread.take() {
            self.stop.store(true, Ordering::Relaxed);
            let _ = handle.join();
        }
    }

    fn searching(&mut self) -> bool {
        let finished = self
            .search_thread
            .as_ref()
            .is_some_and(JoinHandle::is_finished);
        if finished {
            if let Some(handle) = self.search_thread.take() {
                let _ = handle.join();
            }
            return false;
        }
        self.search_thread.is_some()
    }

    fn install_position(&mut self, mut position: Position) {
        position.set_chess960(self.options.chess960);
        position.set_network(self.network.clone());
        self.position = position;
    }

    fn handle_position(&mut self, parts: &[String]) {
        let mut i = 1;
        if i >= parts.len() {
            println!("info string position: missing arguments");
            return;
        }

        let parsed = if parts[i] == "startpos" {
            i += 1;
            Ok(Position::new())
        } else if parts[i] == "fen" {
            i += 1;
            let mut fen_parts = Vec::new();
            while i < parts.len() && parts[i] != "moves" {
                fen_parts.push(parts[i].clone());
                i += 1;
            }
            Position::from_fen(&fen_parts.join(" "))
        } else {
            println!("info string position: expected startpos or fen");
            return;
        };

        let position = match parsed {
            Ok(position) => position,
            Err(e) => {
                println!("info string invalid fen: {e}");
                return;
            }
        };
        self.install_position(position);

        if i < parts.len() && parts[i] == "moves" {
            for move_str in &parts[i + 1..] {
                match self.position.parse_move(move_str) {
                    Ok(mv) => self.position.make_move(mv),
                    Err(e) => {
                        println!("info string {e}");
                        break;
                    }
                }
            }
        }
    }

    fn handle_go(&mut self, limits: SearchLimits) {
        if self.searching() {
            println!("info string search already running");
            return;
        }

        self.stop.store(false, Ordering::Relaxed);
        let position = self.position.clone();
        let tt = Arc::clone(&self.tt);
        let stop = Arc::clone(&self.stop);
        let settings = SearchSettings {
            threads: self.options.threads,
            multi_pv: self.options.multi_pv,
            move_overhead_ms: self.options.move_overhead_ms,
            ..Default::default()
        };
        let chess960 = self.options.chess960;
        let info: InfoCallback = Arc::new(move |info: &SearchInfo| {
            print_info(info, chess960);
        });

        let handle = std::thread::Builder::new()
            .name("search-main".to_string())
            .stack_size(32 * 1024 * 1024)
            .spawn(move || {
                let result = search::search(&position, &tt, &limits, &settings, &stop, Some(info));
                match result.best_move {
                    Some(mv) => match result.ponder {
                        Some(ponder) => println!(
                            "bestmove {} ponder {}",
                            mv.uci(chess960),
                            ponder.uci(chess960)
                        ),
                        None => println!("bestmove {}", mv.uci(chess960)),
                    },
                    None => println!("bestmove 0000"),
                }
            })
            .expect("failed to spawn search thread");
        self.search_thread = Some(handle);
    }

    fn handle_setoption(&mut self, name: &str, value: Option<&str>) {
        self.halt_search();
        match self.options.apply(name, value) {
            OptionAction::ResizeHash(mb) => {
                self.tt = Arc::new(TranspositionTable::new(mb));
            }
            OptionAction::SetChess960(enabled) => {
                self.position.set_chess960(enabled);
            }
            OptionAction::LoadEvalFile(path) => match NnueNetwork::load(&path) {
                Ok(net) => {
                    #[cfg(feature = "logging")]
                    log::info!("loaded evaluation network from {path}");
                    self.network = Some(Arc::new(net));
                    self.position.set_network(self.network.clone());
                    println!("info string loaded network {path}");
                }
                Err(e) => {
                    #[cfg(feature = "logging")]
                    log::warn!("failed to load evaluation network from {path}: {e}");
                    println!("info string failed to load network {path}: {e}");
                }
            },
            OptionAction::None => {}
        }
    }

    /// Returns false when the loop should exit.
    fn handle_line(&mut self, line: &str) -> bool {
        let Some(cmd) = command::parse_uci_command(line) else {
            return true;
        };

        match cmd {
            UciCommand::Uci => self.options.print(),
            UciCommand::IsReady => println!("readyok"),
            UciCommand::UciNewGame => {
                self.halt_search();
                self.tt.new_search();
            }
            UciCommand::Position(parts) => {
                self.halt_search();
                self.handle_position(&parts);
            }
            UciCommand::Go(limits) => self.handle_go(limits),
            UciCommand::SetOption { name, value } => {
                self.handle_setoption(&name, value.as_deref());
            }
            UciCommand::Stop => self.halt_search(),
            UciCommand::Display => println!("{}", self.position),
            UciCommand::Eval => {
                let eval = self.position.evaluate();
                println!("info string static eval {eval} cp (side to move)");
            }
            UciCommand::Perft(depth) => {
                self.halt_search();
                let start = std::time::Instant::now();
                let nodes = self.position.perft(depth);
                let elapsed = start.elapsed();
                println!("info string perft {depth}: {nodes} nodes in {elapsed:?}");
            }
            UciCommand::BareFen(fen) => {
                self.halt_search();
                match Position::from_fen(&fen) {
                    Ok(position) => self.install_position(position),
                    Err(e) => println!("info string invalid fen: {e}"),
                }
            }
            UciCommand::Unknown(cmd) => println!("info string unknown command: {cmd}"),
            UciCommand::Quit => {
                self.halt_search();
                return false;
            }
        }
        true
    }
}

fn print_info(info: &SearchInfo, chess960: bool) {
    let score = match info.mate_in {
        Some(mate) => format!("mate {mate}"),
        None => format!("cp {}", info.score),
    };
    let pv = info
        .pv
        .iter()
        .map(|m| m.uci(chess960))
        .collect::<Vec<_>>()
        .join(" ");
    println!(
        "info depth {} seldepth {} multipv {} score {} nodes {} nps {} hashfull {} time {} pv {}",
        info.depth,
        info.seldepth,
        info.multipv,
        score,
        info.nodes,
        info.nps,
        info.hashfull,
        info.time_ms,
        pv
    );
}

/// Read commands from stdin until `quit` or end of input.
pub fn run_loop() {
    let mut engine = Engine::new();
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        if !engine.handle_line(&line) {
            break;
        }
    }
    engine.halt_search();
}
