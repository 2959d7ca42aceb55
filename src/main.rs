use basalt::uci;

fn main() {
    uci::run_loop();
}
