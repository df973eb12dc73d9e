use std::{env, fs, process::ExitCode};

use servo_dance::{
    config::RobotConfig,
    controller::ServoController,
    playback::{CancelToken, Interpreter},
    program::{reannotate, SequenceProgram},
    proto::Packet,
    transport::{MemorySink, TransportSink, WriteSink},
    Error, Result,
};

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const USAGE: &str = "usage:
    dance play <program> [device]
    dance annotate <program>
    dance init <config> [device]
    dance change-id <new_id> [device]

without a device, frames are printed instead of written";

pub fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    let Some(cmd) = Command::parse(&args) else {
        eprintln!("{}", USAGE);
        return ExitCode::from(2);
    };

    match run(cmd) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Play {
        program: &'a str,
        device: Option<&'a str>,
    },
    Annotate {
        program: &'a str,
    },
    Init {
        config: &'a str,
        device: Option<&'a str>,
    },
    ChangeId {
        new_id: &'a str,
        device: Option<&'a str>,
    },
}

impl<'a> Command<'a> {
    fn parse(args: &[&'a str]) -> Option<Self> {
        let cmd = match *args {
            ["play", program] => Command::Play {
                program,
                device: None,
            },
            ["play", program, device] => Command::Play {
                program,
                device: Some(device),
            },
            ["annotate", program] => Command::Annotate { program },
            ["init", config] => Command::Init {
                config,
                device: None,
            },
            ["init", config, device] => Command::Init {
                config,
                device: Some(device),
            },
            ["change-id", new_id] => Command::ChangeId {
                new_id,
                device: None,
            },
            ["change-id", new_id, device] => Command::ChangeId {
                new_id,
                device: Some(device),
            },
            _ => return None,
        };

        Some(cmd)
    }
}

fn run(cmd: Command<'_>) -> Result<()> {
    match cmd {
        Command::Play { program, device } => {
            let prog = SequenceProgram::parse(&fs::read_to_string(program)?);
            info!(program, lines = prog.len(), "program loaded");
            with_controller(device, |ctrl| {
                Interpreter::new()
                    .run(prog.lines(), ctrl, &CancelToken::never(), |p| {
                        info!(index = p.index + 1, line = %p.line, "step")
                    })
                    .map(|_| ())
            })
        }

        Command::Annotate { program } => {
            let text = fs::read_to_string(program)?;
            fs::write(program, reannotate(&text) + "\n")?;
            info!(program, "annotations refreshed");
            Ok(())
        }

        Command::Init { config, device } => {
            let cfg = RobotConfig::load(config)?;
            with_controller(device, |ctrl| ctrl.init_pose(&cfg).map(|_| ()))
        }

        Command::ChangeId { new_id, device } => {
            let new_id: u8 = new_id
                .parse()
                .map_err(|_| Error::InvalidData(format!("invalid servo id {}", new_id).into()))?;
            with_controller(device, |ctrl| ctrl.send_change_id(new_id))
        }
    }
}

fn with_controller<F>(device: Option<&str>, f: F) -> Result<()>
where
    F: FnOnce(&mut ServoController<Box<dyn TransportSink>>) -> Result<()>,
{
    let memory = MemorySink::new();
    let sink: Box<dyn TransportSink> = match device {
        Some(path) => Box::new(WriteSink::open_path(path)?),
        None => Box::new(memory.clone()),
    };

    let mut ctrl = ServoController::new(sink);
    let res = f(&mut ctrl);

    for sent in memory.take() {
        match Packet::try_from(sent.bytes.as_slice()) {
            Ok(pkt) => match pkt.command() {
                Ok(cmd) => println!("{:<8} {}", format!("{:?}", cmd), pkt),
                Err(_) => println!("{}", pkt),
            },
            Err(_) => println!("{:02X?}", sent.bytes),
        }
    }

    res
}
