//! Nadiya Simulator, headless runner.
//!
//! Plays scripted days through the sim-core engine and prints the
//! transcript. There is no interactive display; this binary exists for
//! soak-testing balance files and for watching a run go by.
//!
//! ```bash
//! cargo run -p nadiya -- --headless --days 3 --save run.json
//! cargo run -p nadiya -- --headless --data ./data
//! ```

use sim_core::persist::SavedGame;
use sim_core::{ConfigStore, GameSession, HeadlessConfig, HeadlessGame};
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env if present; AI keys only ever come from the environment.
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    if !args.iter().any(|a| a == "--headless") {
        print_help();
        return Ok(());
    }

    let config = match arg_value(&args, "--data") {
        Some(dir) => match ConfigStore::load(&dir) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        },
        None => ConfigStore::builtin(),
    };

    let days: u32 = arg_value(&args, "--days")
        .and_then(|v| v.parse().ok())
        .unwrap_or(1);
    let save_path = arg_value(&args, "--save").map(PathBuf::from);

    let headless = HeadlessConfig {
        days,
        save_path: save_path.clone(),
        chat: !args.iter().any(|a| a == "--no-chat"),
    };

    // Resume from the save file when it already exists.
    let mut game = match &save_path {
        Some(path) if path.exists() => {
            let saved = SavedGame::load(path).await?;
            println!("Resuming from day {}.", saved.day);
            let session = GameSession::resume(config, saved)?;
            HeadlessGame::with_session(session, headless)
        }
        _ => HeadlessGame::new(config, headless)?,
    };

    game.run().await?;

    for line in game.transcript() {
        println!("{line}");
    }

    let stats = game.session().stats();
    println!();
    println!(
        "Day {} | mood {} | hunger {} | energy {} | German L{} | {:.2} euro",
        game.session().day_number(),
        stats.mood(),
        stats.hunger(),
        stats.energy(),
        stats.german().level,
        stats.money_cents() as f64 / 100.0
    );

    Ok(())
}

/// The value following a `--flag`, if both are present.
fn arg_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn print_help() {
    println!("Nadiya Simulator - headless day-cycle runner");
    println!();
    println!("USAGE:");
    println!("  nadiya --headless [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  -h, --help       Show this help message");
    println!("  --headless       Run the scripted day loop (required)");
    println!("  --days <N>       How many days to play (default: 1)");
    println!("  --data <DIR>     Load balance/dialogue/ai config from DIR");
    println!("                   (default: built-in values)");
    println!("  --save <PATH>    Save at each sleep; resume if PATH exists");
    println!("  --no-chat        Skip the evening chat message");
    println!();
    println!("EXAMPLES:");
    println!("  nadiya --headless                      # One day, built-in config");
    println!("  nadiya --headless --days 7 --save run.json");
}
