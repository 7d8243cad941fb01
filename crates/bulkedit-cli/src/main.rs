// BulkEdit CLI Entry Point

use bulkedit_cli::router::CommandRouter;

#[tokio::main]
async fn main() {
    match CommandRouter::route().await {
        Ok(output) => {
            println!("{}", output.text);
            if !output.success {
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("{}", e.user_message());
            std::process::exit(1);
        }
    }
}
