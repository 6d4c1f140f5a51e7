use colored::Colorize;

pub fn handle_error(err: anyhow::Error) -> ! {
    eprintln!("{} {:#}", "Error:".red().bold(), err);

    let msg = err.to_string().to_lowercase();

    if msg.contains("discord_token") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Export the bot token or add it to .env:");
        eprintln!("  {} export DISCORD_TOKEN=<token>", "$".dimmed());
    }

    if msg.contains("trigger") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Validate the trigger file with:");
        eprintln!("  {} hogbot --check --triggers <path>", "$".dimmed());
    }

    if msg.contains("address in use") || msg.contains("bind") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Choose another health check port with PORT=<port>.");
    }

    std::process::exit(1);
}
