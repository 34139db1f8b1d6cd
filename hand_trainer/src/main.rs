//! hand_trainer — interactive entry point.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use hand_trainer::app::{run, TrainerConfig};
use hand_trainer::report;
use pose_catalog::PoseCatalog;
use pose_history::FileHistory;
use pose_session::SessionConfig;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║        Hand Trainer — Guided Pose-Hold Exercises             ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    #[cfg(feature = "leap")]
    println!("  Mode: LeapMotion hardware");
    #[cfg(not(feature = "leap"))]
    println!("  Mode: Keyboard simulation  (use --features leap for hardware)");
    println!();

    let args: Vec<String> = std::env::args().collect();
    let history_path = arg_value(&args, "--history")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("hand-trainer-log.txt"));

    if args.iter().any(|a| a == "--report") {
        let history = match FileHistory::open(&history_path) {
            Ok(h) => h,
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        };
        if let Err(e) = report::print_report(&history, &PoseCatalog::builtin()) {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
        return;
    }

    let cfg = if args.iter().any(|a| a == "--quick") {
        println!("  Quick-start: built-in poses, 10 rounds per set, 1 s ticks\n");
        TrainerConfig {
            history_path,
            ..TrainerConfig::default()
        }
    } else {
        configure_interactively(history_path)
    };

    println!();
    println!("  Type a shape word and hold it (open/hook/fist/flat/table/none);");
    println!("  p pauses, r resets, q quits.");
    println!();

    if let Err(e) = run(cfg) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn configure_interactively(history_path: PathBuf) -> TrainerConfig {
    let catalog = pick_catalog();

    let rounds_per_set: u32 = read_line("  Rounds per set (default 10): ")
        .trim()
        .parse()
        .unwrap_or(10)
        .max(1);

    let sets_target = {
        let t: u32 = read_line("  Sets before stopping, 0 = endless (default 0): ")
            .trim()
            .parse()
            .unwrap_or(0);
        if t == 0 { None } else { Some(t) }
    };

    let tick_ms: u64 = read_line("  Tick interval ms (default 1000): ")
        .trim()
        .parse()
        .unwrap_or(1000)
        .clamp(50, 5000);

    let warmup_s: u64 = read_line("  Warmup seconds (default 2): ")
        .trim()
        .parse()
        .unwrap_or(2)
        .min(30);

    TrainerConfig {
        catalog,
        session: SessionConfig {
            rounds_per_set,
            sets_target,
        },
        tick: Duration::from_millis(tick_ms),
        warmup: Duration::from_secs(warmup_s),
        history_path,
    }
}

fn pick_catalog() -> PoseCatalog {
    loop {
        println!("  Catalog: 1.Built-in five poses  2.JSON file");
        match read_line("  Choice (1–2, default 1): ").trim() {
            "2" => {
                let path = read_line("  Catalog path: ");
                match PoseCatalog::from_json_file(Path::new(path.trim())) {
                    Ok(catalog) => break catalog,
                    Err(e) => println!("  ⚠  {}", e),
                }
            }
            _ => break PoseCatalog::builtin(),
        }
    }
}

fn arg_value(args: &[String], key: &str) -> Option<String> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    io::stdout().flush().ok();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf
}
