use four_env_folktables::apps::run_prepare;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    run_prepare(std::env::args().skip(1))
}
