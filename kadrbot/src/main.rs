use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = kadrbot::Cli::parse();
    if let Err(err) = kadrbot::run(cli).await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
