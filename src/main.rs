// src/main.rs
mod cli; // Keep cli module for parsing args

use anyhow::{bail, Context, Result};
use chrono::Utc;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use std::io::{stdout, Write};
use std::thread;
use std::time::Duration;

use gear_session_lib::{
    format_elapsed, ExercisePatch, SessionService, WorkoutExercise, WorkoutSet,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // --- Check for completion generation request FIRST ---
    let cli_args = cli::parse_args(); // Parse arguments once

    if let cli::Commands::GenerateCompletion { shell } = &cli_args.command {
        let mut cmd = cli::build_cli_command(); // Get the command structure
        let bin_name = cmd.get_name().to_string(); // Get the binary name

        eprintln!("Generating completion script for {shell}..."); // Print to stderr
        clap_complete::generate(*shell, &mut cmd, bin_name, &mut stdout()); // Print script to stdout
        return Ok(()); // Exit after generating script
    }

    // Initialize the service (loads config, opens store, rehydrates session)
    let mut service =
        SessionService::initialize().context("Failed to initialize session service")?;

    // --- Execute Commands using SessionService ---
    match cli_args.command {
        cli::Commands::GenerateCompletion { .. } => {
            // This case is handled above, but keep it exhaustive
            unreachable!("Completion generation should have exited already");
        }
        cli::Commands::Start => {
            if service.timer.running() {
                println!(
                    "Session already running ({}).",
                    format_elapsed(service.timer.seconds())
                );
            } else {
                service.timer.start();
                println!(
                    "Session started ({} accumulated).",
                    format_elapsed(service.timer.total_elapsed_seconds())
                );
            }
        }
        cli::Commands::Pause => {
            service.timer.pause();
            println!(
                "Session paused at {}.",
                format_elapsed(service.timer.seconds())
            );
        }
        cli::Commands::Status => {
            service.timer.tick();
            print_status(&service);
        }
        cli::Commands::Watch { duration } => {
            watch(&mut service, duration);
        }
        cli::Commands::Reset => {
            service.timer.reset();
            println!("Session discarded; stored snapshot removed.");
        }
        cli::Commands::Finish => {
            service.timer.pause();
            let elapsed = service.timer.seconds();
            let exercises = service.finish_workout();
            if exercises.is_empty() && elapsed == 0 {
                println!("No workout in progress.");
            } else {
                println!("Workout finished in {}.", format_elapsed(elapsed));
                print_exercise_table(&exercises);
                println!("Session cleared. Submit the workout from the app to save it.");
            }
        }
        cli::Commands::AddExercise {
            name,
            exercise_id,
            workout_exercise_id,
        } => {
            let trimmed_name = name.trim();
            if trimmed_name.is_empty() {
                bail!("Exercise name cannot be empty.");
            }
            let workout_exercise_id = workout_exercise_id
                .unwrap_or_else(|| format!("wx-{}", Utc::now().timestamp_millis()));
            service.timer.add_exercise(WorkoutExercise {
                workout_exercise_id: workout_exercise_id.clone(),
                exercise_id,
                name: trimmed_name.to_string(),
                sets: Vec::new(),
            });
            println!("Added '{trimmed_name}' to the session (id: {workout_exercise_id}).");
        }
        cli::Commands::AddSet {
            workout_exercise_id,
            reps,
            weight,
        } => {
            let Some(exercise) = service
                .timer
                .exercises()
                .iter()
                .find(|e| e.workout_exercise_id == workout_exercise_id)
            else {
                bail!("No exercise with id '{workout_exercise_id}' in the session.");
            };
            let mut sets = exercise.sets.clone();
            sets.push(WorkoutSet { reps, weight });
            let set_count = sets.len();
            service.timer.update_exercise(
                &workout_exercise_id,
                ExercisePatch {
                    sets: Some(sets),
                    ..Default::default()
                },
            );
            println!("Recorded set {set_count} on '{workout_exercise_id}'.");
        }
        cli::Commands::RemoveExercise {
            workout_exercise_id,
        } => {
            let before = service.timer.exercises().len();
            service.timer.remove_exercise(&workout_exercise_id);
            if service.timer.exercises().len() == before {
                println!("No exercise with id '{workout_exercise_id}' in the session.");
            } else {
                println!("Removed '{workout_exercise_id}' from the session.");
            }
        }
        cli::Commands::ShowPlayer { exercise_id } => {
            service.timer.show_player(&exercise_id);
            println!("Player opened on '{exercise_id}'.");
        }
        cli::Commands::HidePlayer => {
            service.timer.hide_player();
            println!("Player closed.");
        }
        cli::Commands::SetTab { tab } => {
            service.timer.set_active_tab(&tab);
            println!("Active tab set to '{tab}'.");
        }
        cli::Commands::SetDebounce { ms } => match service.set_debounce_ms(ms) {
            Ok(()) => println!("Debounce window set to {ms} ms (takes effect on next launch)."),
            Err(e) => bail!("Error setting debounce window: {e}"),
        },
        cli::Commands::SetMaxAge { days } => match service.set_max_snapshot_age_days(days) {
            Ok(()) => println!("Snapshot max age set to {days} day(s)."),
            Err(e) => bail!("Error setting snapshot max age: {e}"),
        },
        cli::Commands::StorePath => {
            println!("{}", service.get_store_path().display());
        }
        cli::Commands::ConfigPath => {
            println!("{}", service.get_config_path().display());
        }
    }

    // The process is about to die: this is the same last-guaranteed write
    // point the mobile client hits when it is backgrounded.
    service.suspend();
    Ok(())
}

fn print_status(service: &SessionService) {
    let timer = &service.timer;
    let state = if timer.running() { "running" } else { "paused" };
    println!(
        "Session {state} — {} elapsed, tab '{}'",
        format_elapsed(timer.seconds()),
        timer.active_tab()
    );
    if timer.player_visible() {
        println!(
            "Player open on '{}'",
            timer.current_exercise_id().unwrap_or("?")
        );
    }
    if timer.exercises().is_empty() {
        println!("No exercises added yet.");
    } else {
        print_exercise_table(timer.exercises());
    }
}

fn print_exercise_table(exercises: &[WorkoutExercise]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID"),
            Cell::new("Exercise"),
            Cell::new("Sets"),
            Cell::new("Complete"),
        ]);
    for exercise in exercises {
        table.add_row(vec![
            Cell::new(&exercise.workout_exercise_id),
            Cell::new(&exercise.name),
            Cell::new(exercise.sets.len()),
            Cell::new(exercise.complete_set_count()),
        ]);
    }
    println!("{table}");
}

/// Drives the tick/debounce loop the way the app's foreground does,
/// repainting elapsed time in place.
fn watch(service: &mut SessionService, duration: Option<u64>) {
    let tick = Duration::from_millis(service.config.tick_ms.max(10));
    let deadline = duration.map(|secs| std::time::Instant::now() + Duration::from_secs(secs));

    println!(
        "Watching session (tick every {} ms, Ctrl-C to stop)...",
        tick.as_millis()
    );
    loop {
        service.timer.tick();
        service.timer.flush_if_due();

        let state = if service.timer.running() {
            "running"
        } else {
            "paused "
        };
        print!(
            "\r{} {} ",
            state,
            format_elapsed(service.timer.seconds())
        );
        let _ = stdout().flush();

        if deadline.is_some_and(|d| std::time::Instant::now() >= d) {
            break;
        }
        thread::sleep(tick);
    }
    println!();
}
