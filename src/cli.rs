// src/cli.rs
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser, Debug)]
#[command(author, version, about = "Track an in-progress workout session", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start (or resume) the session clock
    Start,
    /// Pause the session clock, keeping accumulated time
    Pause,
    /// Show the session: elapsed time, timer state and exercise list
    Status,
    /// Keep the display ticking, printing elapsed time until interrupted
    Watch {
        /// Stop after this many seconds instead of running until Ctrl-C
        #[arg(short, long)]
        duration: Option<u64>,
    },
    /// Discard the session and delete its stored snapshot
    Reset,
    /// Print the finished workout and clear the session
    Finish,
    /// Add an exercise to the session (replaces it if the id already exists)
    AddExercise {
        /// Display name of the exercise (e.g., "Bench Press")
        #[arg(short, long)]
        name: String,
        /// Catalog id of the exercise
        #[arg(short, long)]
        exercise_id: String,
        /// Session-unique id; generated when omitted
        #[arg(short, long)]
        workout_exercise_id: Option<String>,
    },
    /// Append a set to an exercise already in the session
    AddSet {
        /// Session-unique id of the exercise
        workout_exercise_id: String,
        /// Repetitions, free-form text
        #[arg(short, long, default_value = "")]
        reps: String,
        /// Weight, free-form text
        #[arg(short, long, default_value = "")]
        weight: String,
    },
    /// Remove an exercise from the session
    RemoveExercise {
        /// Session-unique id of the exercise
        workout_exercise_id: String,
    },
    /// Open the player on an exercise
    ShowPlayer {
        /// Catalog id of the exercise to play
        exercise_id: String,
    },
    /// Close the player
    HidePlayer,
    /// Record the tab the UI is showing
    SetTab { tab: String },
    /// Set the debounce window for snapshot writes (ms)
    SetDebounce { ms: u64 },
    /// Set how many days a stored snapshot stays restorable
    SetMaxAge { days: u32 },
    /// Show the path to the snapshot store file
    StorePath,
    /// Show the path to the config file
    ConfigPath,
    /// Generate shell completion scripts
    GenerateCompletion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

// Function to parse CLI arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}
