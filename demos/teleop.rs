// Keyboard teleop: WASD move, Z/X rotate, C toggle robot-centric,
// R/F speed, Q quit
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::time::{Duration, Instant};
use swerve_runtime::config::TOPIC_CMD_DRIVE;
use swerve_runtime::messages::DriveCommand;
use tracing::info;

const POWERS: [f64; 3] = [0.25, 0.5, 1.0]; // fraction of max speed
const INPUT_TIMEOUT_MS: u64 = 100; // Reset powers after this much time with no input

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let publisher = session.declare_publisher(TOPIC_CMD_DRIVE).await?;

    info!("Controls: WASD=move, Z/X=rotate, C=robot-centric, R/F=speed, Q=quit");
    info!("Power: LOW");

    enable_raw_mode()?;
    let result = run_teleop(&publisher).await;
    disable_raw_mode()?;

    result
}

async fn run_teleop(
    publisher: &zenoh::pubsub::Publisher<'_>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut power_idx: usize = 0;
    let mut robot_centric = false;

    // Persistent power state
    let mut x_power = 0.0;
    let mut y_power = 0.0;
    let mut rot_power = 0.0;
    let mut last_movement_input = Instant::now();

    loop {
        // Poll for key with 20ms timeout (50Hz effective rate)
        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                let pressed = kind == KeyEventKind::Press || kind == KeyEventKind::Repeat;

                match code {
                    // Movement - update power and refresh timestamp
                    KeyCode::Char('w') if pressed => {
                        x_power = POWERS[power_idx];
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('s') if pressed => {
                        x_power = -POWERS[power_idx];
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('a') if pressed => {
                        y_power = POWERS[power_idx];
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('d') if pressed => {
                        y_power = -POWERS[power_idx];
                        last_movement_input = Instant::now();
                    }

                    // Rotation
                    KeyCode::Char('z') if pressed => {
                        rot_power = POWERS[power_idx];
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('x') if pressed => {
                        rot_power = -POWERS[power_idx];
                        last_movement_input = Instant::now();
                    }

                    // Frame toggle
                    KeyCode::Char('c') if pressed => {
                        robot_centric = !robot_centric;
                        info!(
                            "Frame: {}",
                            if robot_centric { "robot" } else { "field" }
                        );
                    }

                    // Power control
                    KeyCode::Char('r') if pressed => {
                        power_idx = (power_idx + 1).min(2);
                        print_power(power_idx);
                    }
                    KeyCode::Char('f') if pressed => {
                        power_idx = power_idx.saturating_sub(1);
                        print_power(power_idx);
                    }

                    // Quit
                    KeyCode::Char('q') | KeyCode::Esc if pressed => break,

                    _ => {}
                }
            }
        }

        // Reset powers if no movement input for INPUT_TIMEOUT_MS
        if last_movement_input.elapsed() > Duration::from_millis(INPUT_TIMEOUT_MS) {
            x_power = 0.0;
            y_power = 0.0;
            rot_power = 0.0;
        }

        // Always publish at ~50Hz
        let cmd = DriveCommand::OrientationBased {
            x_power,
            y_power,
            rot_power,
            robot_centric,
        };
        publisher.put(serde_json::to_string(&cmd)?).await?;
    }

    Ok(())
}

fn print_power(idx: usize) {
    let label = ["LOW", "MED", "HIGH"][idx];
    info!("Power: {}", label);
}
