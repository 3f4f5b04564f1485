//! Line-oriented play loop.
//!
//! Protocol:
//! - A number picks the matching choice
//! - Lines starting with `#` are commands (restart, status, quit, help)
//! - Any other line is a free-text action
//!
//! Illustration updates arrive in the background and are printed as
//! `[ILLUSTRATION]` lines.

use echoes_core::{
    Game, GameState, GameStatus, GenerationError, Illustration, TurnOutcome, VectorScene,
};
use std::collections::BTreeMap;
use std::io;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

/// Run the game until the player quits or input ends.
pub async fn run(game: Game) -> io::Result<()> {
    println!("=== Echoes of the Bell: A School Rescue ===");
    println!();
    print_commands();
    println!();
    print_title();

    let watcher = watch_illustrations(&game);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = line.strip_prefix('#') {
            match command.trim() {
                "quit" | "exit" => {
                    println!("Goodbye!");
                    break;
                }
                "restart" => {
                    game.restart();
                    print_title();
                }
                "status" => print_status(&game).await,
                "help" => print_commands(),
                other => println!("[ERROR] Unknown command: #{other}"),
            }
            continue;
        }

        let state = game.state();
        match state.status {
            GameStatus::Title => {
                println!("[WAITING] The storyteller is setting the scene...");
                report(&game, game.start().await);
            }
            GameStatus::Playing => {
                let action = resolve_action(&state, line);
                report(&game, game.choose(&action).await);
            }
            GameStatus::GameOver => {
                println!("The story is over. Type #restart to play again.");
            }
        }
    }

    watcher.abort();
    Ok(())
}

/// A choice number becomes that choice; anything else is taken verbatim.
fn resolve_action(state: &GameState, line: &str) -> String {
    line.parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|index| state.choices.get(index))
        .cloned()
        .unwrap_or_else(|| line.to_string())
}

fn report(game: &Game, outcome: TurnOutcome) {
    let state = game.state();
    match outcome {
        TurnOutcome::Advanced(_) => print_turn(&state),
        TurnOutcome::Ended => {
            println!();
            println!("=== GAME OVER ===");
            println!("{}", state.game_over_message);
            println!();
            println!("Type #restart to play again.");
        }
        TurnOutcome::Failed(e) => println!("[ERROR] {e}"),
        TurnOutcome::Ignored => {
            if state.narrative_loading {
                println!("[WAITING] The storyteller is still writing.");
            }
        }
        TurnOutcome::Superseded => {}
    }
}

fn print_title() {
    println!("Lily stands before the silent school. Her friends are trapped inside.");
    println!("Press any key and Enter to begin.");
}

fn print_turn(state: &GameState) {
    // After a choice the tail of the history is "> action" then the story.
    if let Some(story) = state.history.last() {
        println!();
        println!("{story}");
    }
    println!();
    for (i, choice) in state.choices.iter().enumerate() {
        println!("  {}. {choice}", i + 1);
    }
    if state.choices.is_empty() {
        println!("  (no suggestions, describe what Lily does)");
    }
    println!();
}

async fn print_status(game: &Game) {
    let state = game.state();
    println!("[STATUS]");
    println!("  Screen: {:?}", state.status);
    println!("  Turn: {}", state.turn);
    println!("  Story fragments: {}", state.history.len());
    if state.narrative_loading {
        println!("  Storyteller: writing...");
    }
    if let Some(ref e) = state.narrative_error {
        println!("  Last error: {e}");
    }
    if let Some(line) = illustration_line(&state) {
        println!("  {line}");
    }
    println!("  Cached illustrations: {}", game.cached_illustrations().await);
}

fn print_commands() {
    println!("Commands:");
    println!("  <number>  - Pick a listed choice");
    println!("  <text>    - Try your own action");
    println!("  #restart  - Back to the title screen");
    println!("  #status   - Show the current game status");
    println!("  #help     - Show this help");
    println!("  #quit     - Exit the game");
}

/// Print illustration changes as they happen.
fn watch_illustrations(game: &Game) -> JoinHandle<()> {
    let mut rx = game.subscribe();
    tokio::spawn(async move {
        let mut last = illustration_line(&rx.borrow_and_update());
        while rx.changed().await.is_ok() {
            let line = illustration_line(&rx.borrow_and_update());
            if line != last {
                if let Some(ref text) = line {
                    println!("{text}");
                }
                last = line;
            }
        }
    })
}

fn illustration_line(state: &GameState) -> Option<String> {
    if state.status != GameStatus::Playing {
        return None;
    }
    if state.illustration_loading {
        return Some("[ILLUSTRATION] Drawing the scene...".to_string());
    }
    if let Some(ref e) = state.illustration_error {
        return Some(match e {
            GenerationError::InvalidSceneData(_) => format!("[ILLUSTRATION] {e}"),
            GenerationError::Failure(_) => format!("[ILLUSTRATION] Unavailable: {e}"),
        });
    }
    state.illustration.as_ref().map(|illustration| match illustration {
        Illustration::Bitmap(reference) => {
            format!("[ILLUSTRATION] Image: {}", abbreviate(reference, 64))
        }
        Illustration::Vector(scene) => format!("[ILLUSTRATION] {}", summarize(scene)),
    })
}

fn abbreviate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let head: String = text.chars().take(max).collect();
    format!("{head}... ({} bytes)", text.len())
}

fn summarize(scene: &VectorScene) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for element in &scene.elements {
        *counts.entry(element.kind.name()).or_default() += 1;
    }
    let shapes = counts
        .iter()
        .map(|(name, count)| format!("{count} {name}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Vector scene {} on {}: {}",
        scene.view_box,
        scene.background_color,
        if shapes.is_empty() { "empty" } else { shapes.as_str() }
    )
}
