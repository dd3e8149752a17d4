// Ghostline CLI entry point

use ghostline_cli::router::CommandRouter;

#[tokio::main]
async fn main() {
    if let Err(e) = CommandRouter::route().await {
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }
}
