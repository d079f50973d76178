//! Sample app: list animations, then raise and lower the lift.
//!
//! Usage:
//!   cargo run --example sample_app
//!   RUST_LOG=cozmo_link=debug cargo run --example sample_app
//!
//! Expects the engine to be listening on 127.0.0.1:5106.

use std::sync::mpsc;

use cozmo_link::message::{
    AnimationAvailable, EndOfMessage, EndOfMessageType, RequestAvailableAnimations, SetLiftHeight,
};
use cozmo_link::{ActionStatus, Connection, SubscriberId, DEFAULT_HOST, DEFAULT_PORT};
use tracing_subscriber::EnvFilter;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cozmo_link=info")),
        )
        .with_target(false)
        .init();
}

fn lift_to(height_mm: f32) -> SetLiftHeight {
    SetLiftHeight {
        height_mm,
        max_speed_rad_per_sec: 10.0,
        accel_rad_per_sec2: 10.0,
        duration_sec: 0.0,
    }
}

fn main() -> Result<()> {
    init_logging();

    let connection = Connection::connect((DEFAULT_HOST, DEFAULT_PORT))?;
    println!("Connected to robot {:?}", connection.peer_id());

    let me = SubscriberId::next();
    let (tx, rx) = mpsc::channel();

    let names = tx.clone();
    connection.add_callback(me, move |anim: &AnimationAvailable| {
        names.send(Some(anim.anim_name.clone()))?;
        Ok(())
    })?;
    connection.add_callback(me, move |end: &EndOfMessage| {
        if end.message_type == EndOfMessageType::Animation {
            tx.send(None)?;
        }
        Ok(())
    })?;

    connection.send_message(RequestAvailableAnimations)?;

    let mut animations = Vec::new();
    while let Some(name) = rx.recv()? {
        animations.push(name);
    }
    println!("Engine knows {} animations", animations.len());
    for name in animations.iter().take(10) {
        println!("  {}", name);
    }

    connection.remove_callback::<AnimationAvailable>(me)?;
    connection.remove_callback::<EndOfMessage>(me)?;

    for height in [92.0, 32.0] {
        let action = connection.send_action(lift_to(height), 1, false)?;
        match action.wait() {
            ActionStatus::Completed(result) => println!("Lift to {height}mm: {result:?}"),
            other => {
                println!("Lift to {height}mm did not complete: {other:?}");
                break;
            }
        }
    }

    connection.close();
    Ok(())
}
