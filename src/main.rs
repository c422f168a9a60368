fn main() {
    raffle_stage_lib::run()
}
