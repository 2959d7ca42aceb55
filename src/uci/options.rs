//! UCI option registry.

/// Current option values.
pub struct UciOptions {
    pub hash_mb: usize,
    pub threads: usize,
    pub multi_pv: u32,
    pub move_overhead_ms: u64,
    pub chess960: bool,
    pub eval_file: Option<String>,
}

/// Action the engine must take after an option changes.
pub enum OptionAction {
    ResizeHash(usize),
    SetChess960(bool),
    LoadEvalFile(String),
    None,
}

impl Default for UciOptions {
    fn default() -> Self {
        UciOptions {
            hash_mb: 64,
            threads: 1,
            multi_pv: 1,
            move_overhead_ms: 50,
            chess960: false,
            eval_file: None,
        }
    }
}

fn print_spin(name: &str, default: impl std::fmt::Display, min: usize, max: usize) {
    println!("option name {name} type spin default {default} min {min} max {max}");
}

impl UciOptions {
    /// Emit the `id` and `option` lines of the `uci` handshake.
    pub fn print(&self) {
        println!("id name Basalt");
        println!("id author Basalt authors");
        print_spin("Hash", self.hash_mb, 1, 65536);
        print_spin("Threads", self.threads, 1, 256);
        print_spin("MultiPV", self.multi_pv, 1, 64);
        print_spin("Move Overhead", self.move_overhead_ms, 0, 5000);
        println!(
            "option name UCI_Chess960 type check default {}",
            self.chess960
        );
        println!(
            "option name EvalFile type string default {}",
            self.eval_file.as_deref().unwrap_or("<empty>")
        );
        println!("uciok");
    }

    /// Apply a `setoption`; the returned action tells the engine what
    /// needs rebuilding.
    pub fn apply(&mut self, name: &str, value: Option<&str>) -> OptionAction {
        match name.trim().to_ascii_lowercase().as_str() {
            "hash" => {
                let mb = value
                    .and_then(|v| v.parse::<usize>().ok())
                    .unwrap_or(self.hash_mb)
                    .clamp(1, 65536);
                if mb != self.hash_mb {
                    self.hash_mb = mb;
                    return OptionAction::ResizeHash(mb);
                }
            }
            "threads" => {
                self.threads = value
                    .and_then(|v| v.parse::<usize>().ok())
                    .unwrap_or(self.threads)
                    .clamp(1, 256);
            }
            "multipv" => {
                self.multi_pv = value
                    .and_then(|v| v.parse::<u32>().ok())
                    .unwrap_or(self.multi_pv)
                    .clamp(1, 64);
            }
            "move overhead" => {
                if let Some(v) = value.and_then(|v| v.parse::<u64>().ok()) {
                    self.move_overhead_ms = v.min(5000);
                }
            }
            "uci_chess960" => {
                let enabled = matches!(
                    value.map(str::trim).map(str::to_ascii_lowercase).as_deref(),
                    Some("true" | "1")
                );
                self.chess960 = enabled;
                return OptionAction::SetChess960(enabled);
            }
            "evalfile" => {
                if let Some(path) = value {
                    self.eval_file = Some(path.to_string());
                    return OptionAction::LoadEvalFile(path.to_string());
                }
            }
            _ => {}
        }
        OptionAction::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_resize_action() {
        let mut options = UciOptions::default();
        assert!(matches!(
            options.apply("Hash", Some("256")),
            OptionAction::ResizeHash(256)
        ));
        // Unchanged value does not reallocate
        assert!(matches!(options.apply("Hash", Some("256")), OptionAction::None));
    }

    #[test]
    fn test_names_are_case_insensitive() {
        let mut options = UciOptions::default();
        options.apply("threads", Some("8"));
        assert_eq!(options.threads, 8);
        options.apply("MULTIPV", Some("3"));
        assert_eq!(options.multi_pv, 3);
    }

    #[test]
    fn test_chess960_toggle() {
        let mut options = UciOptions::default();
        assert!(matches!(
            options.apply("UCI_Chess960", Some("true")),
            OptionAction::SetChess960(true)
        ));
        assert!(matches!(
            options.apply("UCI_Chess960", Some("false")),
            OptionAction::SetChess960(false)
        ));
    }

    #[test]
    fn test_clamping() {
        let mut options = UciOptions::default();
        options.apply("Threads", Some("100000"));
        assert_eq!(options.threads, 256);
        options.apply("MultiPV", Some("0"));
        assert_eq!(options.multi_pv, 1);
    }
}
