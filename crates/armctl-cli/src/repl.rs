//! REPL – the operator's console for the arm.
//!
//! Supported slash-commands:
//!   /help                 – show this list
//!   /status               – state, joints, gripper, end-effector position
//!   /power_on             – off → ready
//!   /power_off            – home, then power down (asks for confirmation)
//!   /start                – ready → running
//!   /pause                – pause or resume a run
//!   /joint <1-6> <deg>    – move one joint (rounded, clamped to 0–180)
//!   /gripper              – open or close the gripper
//!   /home                 – all joints to 0°, gripper open
//!   /reset                – home with a warning record (asks for confirmation)
//!   /estop [reason]       – emergency stop
//!   /clear_fault          – leave emergency; the arm is homed and powered off
//!   /save                 – append the current position to the position log
//!   /style <name>         – normal, precise or rapid
//!   /telemetry            – last motor telemetry frame
//!   /quit | /exit         – leave the console

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use armctl_kinematics::{ChainConfig, forward_kinematics};
use armctl_runtime::{ArmSnapshot, ControllerHandle, UserCommand};
use armctl_types::{ArmError, Feedback, JOINT_COUNT, MovementStyle, TelemetryFrame, Tone};
use colored::{ColoredString, Colorize};

/// A parsed console line.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Help,
    Status,
    Telemetry,
    Quit,
    Control(UserCommand),
}

/// Turn one input line into a command.
pub fn parse(line: &str) -> Result<ReplCommand, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Err("empty command".to_string());
    };
    let args: Vec<&str> = words.collect();

    let control =
        |cmd: UserCommand| -> Result<ReplCommand, String> { Ok(ReplCommand::Control(cmd)) };
    match head {
        "/help" => Ok(ReplCommand::Help),
        "/status" => Ok(ReplCommand::Status),
        "/telemetry" => Ok(ReplCommand::Telemetry),
        "/quit" | "/exit" => Ok(ReplCommand::Quit),
        "/power_on" => control(UserCommand::PowerOn),
        "/power_off" => control(UserCommand::PowerOff),
        "/start" => control(UserCommand::StartRun),
        "/pause" => control(UserCommand::PauseResume),
        "/gripper" => control(UserCommand::ToggleGripper),
        "/home" => control(UserCommand::Home),
        "/reset" => control(UserCommand::Reset),
        "/clear_fault" => control(UserCommand::ClearFault),
        "/save" => control(UserCommand::SavePosition),
        "/estop" => {
            let reason = if args.is_empty() {
                "Operator request".to_string()
            } else {
                args.join(" ")
            };
            control(UserCommand::EmergencyStop(reason))
        }
        "/style" => match args.as_slice() {
            [name] => control(UserCommand::SetStyle(name.parse::<MovementStyle>()?)),
            _ => Err("usage: /style <normal|precise|rapid>".to_string()),
        },
        "/joint" => match args.as_slice() {
            [joint, angle] => {
                let number: usize = joint
                    .parse()
                    .map_err(|_| format!("joint must be 1-{JOINT_COUNT}, got '{joint}'"))?;
                if !(1..=JOINT_COUNT).contains(&number) {
                    return Err(format!("joint must be 1-{JOINT_COUNT}, got {number}"));
                }
                let angle: f64 = angle
                    .parse()
                    .map_err(|_| format!("angle must be a number, got '{angle}'"))?;
                control(UserCommand::SetJoint {
                    index: number - 1,
                    angle,
                })
            }
            _ => Err("usage: /joint <1-6> <degrees>".to_string()),
        },
        other => Err(format!("unknown command '{other}'")),
    }
}

/// Question to ask before delivering `command`, if any.
fn confirmation_for(command: &UserCommand) -> Option<&'static str> {
    match command {
        UserCommand::PowerOff => Some("Power off the arm? It will return home first."),
        UserCommand::Reset => Some("Reset the arm to its home position?"),
        _ => None,
    }
}

/// Read-eval-print until `/quit`, EOF, or `shutdown` is set.
pub fn run(handle: &ControllerHandle, chain: &ChainConfig, shutdown: Arc<AtomicBool>) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        let state = handle.snapshot().state;
        print!(
            "{} {} ",
            format!("[{}]", state.as_str()).color_named(state.indicator_color()),
            "armctl>".bold().cyan()
        );
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }
        if line.trim().is_empty() {
            continue;
        }

        match parse(&line) {
            Ok(ReplCommand::Help) => cmd_help(),
            Ok(ReplCommand::Status) => cmd_status(&handle.snapshot(), chain),
            Ok(ReplCommand::Telemetry) => cmd_telemetry(handle.latest_telemetry()),
            Ok(ReplCommand::Quit) => {
                println!("{}", "Goodbye.".green());
                shutdown.store(true, Ordering::SeqCst);
                break;
            }
            Ok(ReplCommand::Control(command)) => {
                if let Some(question) = confirmation_for(&command)
                    && !confirm(question)
                {
                    println!("  {}", "Cancelled.".dimmed());
                    continue;
                }
                print_result(&handle.blocking_dispatch(command));
            }
            Err(msg) => println!(
                "{} {}. Type {} for available commands.",
                "Error:".red(),
                msg,
                "/help".bold()
            ),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Command handlers
// ─────────────────────────────────────────────────────────────────────────────

fn cmd_help() {
    let rows = [
        ("/status", "state, joints and end-effector position"),
        ("/power_on", "power the arm on"),
        ("/power_off", "home, then power down"),
        ("/start", "start a run"),
        ("/pause", "pause or resume the run"),
        ("/joint <1-6> <deg>", "move one joint (0-180°)"),
        ("/gripper", "open or close the gripper"),
        ("/home", "all joints to 0°, gripper open"),
        ("/reset", "reset the arm to home"),
        ("/estop [reason]", "emergency stop"),
        ("/clear_fault", "leave emergency (arm homed, powered off)"),
        ("/save", "append the position to the position log"),
        ("/style <name>", "normal, precise or rapid"),
        ("/telemetry", "last motor telemetry frame"),
        ("/quit  /exit", "leave the console"),
    ];
    println!();
    println!("{}", "armctl commands".bold().underline());
    for (cmd, what) in rows {
        println!("  {:<20} – {}", cmd.bold().cyan(), what);
    }
    println!();
}

fn cmd_status(snapshot: &ArmSnapshot, chain: &ChainConfig) {
    let state = snapshot.state;
    let pose = forward_kinematics(
        &snapshot.joints.angles(),
        snapshot.joints.gripper_closed(),
        chain,
    );
    println!("  {}", state.label().color_named(state.label_color()).bold());
    let angles: Vec<String> = snapshot
        .joints
        .angles()
        .iter()
        .enumerate()
        .map(|(i, a)| format!("J{}={a}°", i + 1))
        .collect();
    println!("  Joints   : {}", angles.join("  "));
    println!(
        "  Gripper  : {}",
        if snapshot.joints.gripper_closed() { "closed" } else { "open" }
    );
    println!("  Style    : {}", snapshot.movement_style.description());
    println!(
        "  Effector : ({:.1}, {:.1})",
        pose.end_effector.x, pose.end_effector.y
    );
}

fn cmd_telemetry(frame: Option<TelemetryFrame>) {
    let Some(frame) = frame else {
        println!("  {}", "No telemetry yet. Power the arm on first.".dimmed());
        return;
    };
    println!(
        "  Frame #{} at {}",
        frame.sequence,
        frame.captured_at.format("%H:%M:%S")
    );
    println!(
        "  {:<6} {:>9} {:>7} {:>9} {:>7}",
        "Motor".bold(),
        "Temp °C".bold(),
        "Ticks".bold(),
        "Rad".bold(),
        "Deg".bold()
    );
    for s in &frame.samples {
        let temp = format!("{:>9.1}", s.temperature_c);
        println!(
            "  {:<6} {} {:>7} {:>9.3} {:>7}",
            s.motor + 1,
            if s.temperature_c > 40.0 { temp.yellow() } else { temp.normal() },
            s.position_ticks,
            s.position_rad,
            s.position_deg
        );
    }
    println!("  Max temperature: {:.1} °C", frame.max_temperature());
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn print_result(result: &Result<Feedback, ArmError>) {
    let feedback = match result {
        Ok(fb) => fb.clone(),
        Err(err) => Feedback::from(err),
    };
    let marker = if feedback.accepted { "✓" } else { "✗" };
    println!("  {}", paint(&format!("{marker} {}", feedback.message), feedback.tone));
}

/// Colour `text` for `tone`.
pub fn paint(text: &str, tone: Tone) -> ColoredString {
    text.color_named(tone.color_name())
}

trait NamedColor {
    fn color_named(&self, name: &str) -> ColoredString;
}

impl NamedColor for str {
    fn color_named(&self, name: &str) -> ColoredString {
        match name {
            "green" => self.green(),
            "red" => self.red().bold(),
            "blue" => self.blue(),
            "yellow" => self.yellow(),
            "orange" => self.truecolor(255, 165, 0),
            "gray" => self.bright_black(),
            _ => self.normal(),
        }
    }
}

impl NamedColor for String {
    fn color_named(&self, name: &str) -> ColoredString {
        self.as_str().color_named(name)
    }
}

/// y/N prompt; anything but `y`/`yes` is a no.
fn confirm(question: &str) -> bool {
    print!("  {} [y/N]: ", question.yellow());
    io::stdout().flush().ok();
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(_) => matches!(line.trim().to_lowercase().as_str(), "y" | "yes"),
        Err(_) => false,
    }
}
