use clap::{Parser, Subcommand, ValueEnum};
use backdrop_common::{parse_millis, IpcClient, IpcCommand, IpcResponse, StatusReport};

#[derive(Parser)]
#[command(name = "backdrop-cli")]
#[command(about = "backdrop-cli (rotating background daemon control)")]
#[command(version = "0.1.0")]
struct Cli {
    /// Print the daemon's raw JSON response
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Set the background folder (relative to the vault root)
    Folder { path: String },

    /// Set the background opacity (0.1 to 1.0)
    Opacity { value: f32 },

    /// Set the fade duration ("800", "1s", "1s 500ms")
    Fade {
        #[arg(value_parser = parse_millis)]
        duration: u64,
    },

    /// Set the rotation period ("120000", "2m"); 0 disables rotation
    Period {
        #[arg(value_parser = parse_millis)]
        duration: u64,
    },

    /// Pick images at random or in folder order
    Random { state: Switch },

    /// Apply a background using the saved order setting
    Apply,

    /// Apply a random background and rotate randomly
    ApplyRandom,

    /// Apply the image at INDEX and rotate in folder order
    ApplyOrdered {
        #[arg(default_value_t = 0)]
        index: usize,
    },

    /// Fade out and remove the background
    Delete,

    /// Stop rotating, keep the current background
    Stop,

    /// List the images in the background folder
    List,

    /// Show current status
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Switch {
    On,
    Off,
}

impl Commands {
    fn into_ipc(self) -> IpcCommand {
        match self {
            Commands::Folder { path } => IpcCommand::SetFolder { path },
            Commands::Opacity { value } => IpcCommand::SetOpacity { value },
            Commands::Fade { duration } => IpcCommand::SetFadeDuration { ms: duration },
            Commands::Period { duration } => IpcCommand::SetRotationPeriod { ms: duration },
            Commands::Random { state } => IpcCommand::SetRandom { enabled: state == Switch::On },
            Commands::Apply => IpcCommand::Apply,
            Commands::ApplyRandom => IpcCommand::ApplyRandom,
            Commands::ApplyOrdered { index } => IpcCommand::ApplyOrdered { index },
            Commands::Delete => IpcCommand::Delete,
            Commands::Stop => IpcCommand::Stop,
            Commands::List => IpcCommand::List,
            Commands::Status => IpcCommand::Status,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = IpcClient::new();

    match client.send_command(cli.command.into_ipc()) {
        Ok(response) if cli.json => {
            println!("{}", serde_json::to_string_pretty(&response)?);
            if matches!(response, IpcResponse::Error { .. }) {
                std::process::exit(1);
            }
        }
        Ok(response) => print_response(response),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}

fn format_duration(ms: u64) -> String {
    let seconds = ms / 1000;
    if ms < 1000 {
        format!("{}ms", ms)
    } else if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        let minutes = seconds / 60;
        let secs = seconds % 60;
        if secs == 0 {
            format!("{}m", minutes)
        } else {
            format!("{}m{}s", minutes, secs)
        }
    } else {
        let hours = seconds / 3600;
        let remaining = seconds % 3600;
        let minutes = remaining / 60;
        if minutes == 0 {
            format!("{}h", hours)
        } else {
            format!("{}h{}m", hours, minutes)
        }
    }
}

fn file_name(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

fn print_status(report: &StatusReport) {
    let rotation = match (&report.mode, report.rotation_period_ms) {
        (Some(mode), ms) => format!("{} every {}", mode, format_duration(ms)),
        (None, _) => "stopped".to_string(),
    };
    let current = report.current_image.as_deref().map(file_name).unwrap_or("None");

    println!("backdrop Status:");
    println!("================");
    println!("Folder:   {} ({} images)", report.folder, report.image_count);
    println!("Current:  {} [{}]", current, report.phase);
    println!("Rotation: {}", rotation);
    println!(
        "Settings: opacity {} | fade {} | period {} | random {}",
        report.opacity,
        format_duration(report.fade_duration_ms),
        format_duration(report.rotation_period_ms),
        if report.random_order { "on" } else { "off" }
    );
}

fn print_response(response: IpcResponse) {
    match response {
        IpcResponse::Success { message } => {
            println!("✓ {}", message);
        }

        IpcResponse::Error { message } => {
            eprintln!("✗ Error: {}", message);
            std::process::exit(1);
        }

        IpcResponse::Images { images } => {
            if images.is_empty() {
                println!("No images found");
                return;
            }
            for (i, image) in images.iter().enumerate() {
                println!("{:>3}  {}", i, file_name(image));
            }
        }

        IpcResponse::Status(report) => print_status(&report),
    }
}
