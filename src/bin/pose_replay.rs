use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::{self, BufRead, BufReader};

use pose_coach::config::Config;
use pose_coach::feedback::LogSpeaker;
use pose_coach::pipeline::{DetectionSession, FrameState, FrameStatus};
use pose_coach::pose::Frame;
use pose_coach::session::{JsonFileStore, SessionHistory};

const CONFIG_PATH: &str = "config.toml";

#[derive(Debug, PartialEq)]
enum Command {
    /// フレーム列を再生する（None は標準入力）
    Replay { input: Option<String>, json: bool },
    History,
    ClearHistory,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Command> {
    // Usage: pose_replay [--json] [frames.jsonl]
    //        pose_replay --history | --clear-history
    let mut json = false;
    let mut input = None;
    for arg in args {
        match arg.as_str() {
            "--history" => return Ok(Command::History),
            "--clear-history" => return Ok(Command::ClearHistory),
            "--json" => json = true,
            flag if flag.starts_with("--") => bail!("Unknown option: {}", flag),
            _ if input.is_some() => bail!("Unexpected argument: {}", arg),
            _ => input = Some(arg),
        }
    }
    Ok(Command::Replay { input, json })
}

fn print_status(index: usize, status: &FrameStatus) {
    match status.state {
        FrameState::Classified => {
            let mark = if status.recorded {
                " [REC]"
            } else if status.committed {
                " [LOCK]"
            } else {
                ""
            };
            let angles = status
                .angles
                .map(|a| {
                    format!(
                        " arms=({:.1}, {:.1}) knees=({:.1}, {:.1})",
                        a.left_arm, a.right_arm, a.left_knee, a.right_knee
                    )
                })
                .unwrap_or_default();
            println!(
                "#{:05} {} | Accuracy: {}% | {}{}{}",
                index, status.pose_label, status.accuracy_score, status.feedback_message, mark, angles
            );
        }
        _ => println!("#{:05} {}", index, status.pose_label),
    }
}

fn replay(config: &Config, input: Option<String>, json: bool) -> Result<()> {
    let reader: Box<dyn BufRead> = match &input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Failed to open {}", path))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let store = JsonFileStore::new(&config.session.storage_dir);
    let mut session = DetectionSession::new(config, Box::new(LogSpeaker), Box::new(store));
    session.start();

    let mut frames = 0usize;
    let mut recorded = 0usize;
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read frame input")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        // 不正な行は「人物なし」として扱い、再生は止めない
        let frame: Option<Frame> = match serde_json::from_str(line) {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("line {}: invalid frame: {}", line_no + 1, e);
                None
            }
        };

        let status = session.process(frame.as_ref());
        if status.recorded {
            recorded += 1;
        }
        if json {
            println!("{}", serde_json::to_string(&status)?);
        } else {
            print_status(frames, &status);
        }
        frames += 1;
    }

    session.stop();
    eprintln!("Frames: {}, recorded: {}", frames, recorded);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load_or_default(CONFIG_PATH);
    eprintln!("Pose Replay {}", env!("POSE_COACH_VERSION"));
    eprintln!("Smoothing window: {}", config.smoothing.window);
    eprintln!("Stability threshold: {}", config.stability.threshold);
    eprintln!("Storage: {}", config.session.storage_dir);

    match parse_args(std::env::args().skip(1))? {
        Command::Replay { input, json } => replay(&config, input, json)?,
        Command::History => {
            let store = JsonFileStore::new(&config.session.storage_dir);
            let history = SessionHistory::new(Box::new(store), config.session.min_accuracy);
            let entries = history.list();
            if entries.is_empty() {
                println!("No sessions recorded");
            }
            for entry in &entries {
                println!("{}  {:<12} {:>3}%", entry.time, entry.pose, entry.accuracy);
            }
            for summary in history.summary() {
                println!("{}: {} time(s), best {}%", summary.pose, summary.count, summary.best_accuracy);
            }
        }
        Command::ClearHistory => {
            let store = JsonFileStore::new(&config.session.storage_dir);
            let mut history = SessionHistory::new(Box::new(store), config.session.min_accuracy);
            history.clear();
            println!("Session history cleared");
        }
    }

    Ok(())
}
